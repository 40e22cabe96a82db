pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod conversation;
pub mod engine;
pub mod knowledge;
pub mod plugins;
pub mod runtime;
pub mod state;
pub mod store;
