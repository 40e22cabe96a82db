//! `ar-domain`: types shared by every AgentRelay crate: the resolved agent
//! tree, tool and model descriptors, configuration, errors and structured
//! trace events.

pub mod agent;
pub mod config;
pub mod error;
pub mod stream;
pub mod tool;
pub mod trace;
