/// Shared error type used across all AgentRelay crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("store: {0}")]
    Store(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("memory service: {0}")]
    Memory(String),

    #[error("knowledge base: {0}")]
    Knowledge(String),

    #[error("plugin: {0}")]
    Plugin(String),

    #[error("template: {0}")]
    Template(String),

    #[error("engine: {0}")]
    Engine(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
