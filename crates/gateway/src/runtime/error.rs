use ar_domain::error::Error;

/// Why a run could not be prepared or relayed.
///
/// `MemoryPreparation` is the only variant the pipeline recovers from (by
/// retrying without memory); the others end the stream with an error frame.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    /// The agent tree, tools or model list could not be resolved.
    #[error("agent configuration: {0}")]
    ConfigResolution(String),

    /// Memory retrieval failed while preparing a memory-enabled run.
    #[error("memory preparation: {0}")]
    MemoryPreparation(String),

    #[error("engine: {0}")]
    Engine(String),

    /// A detached persistence or write-back job failed.
    #[error("background write: {0}")]
    BackgroundWrite(String),
}

impl RunError {
    pub fn config(e: Error) -> Self {
        Self::ConfigResolution(e.to_string())
    }

    pub fn engine(e: Error) -> Self {
        Self::Engine(e.to_string())
    }

    pub fn background(e: Error) -> Self {
        Self::BackgroundWrite(e.to_string())
    }

    /// Reclassify any failure during the memory-enabled attempt so the
    /// pipeline treats it as recoverable.
    pub fn into_memory_preparation(self) -> Self {
        match self {
            Self::MemoryPreparation(msg) => Self::MemoryPreparation(msg),
            other => Self::MemoryPreparation(other.to_string()),
        }
    }
}
