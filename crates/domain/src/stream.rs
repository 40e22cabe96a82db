use std::pin::Pin;

/// A boxed async stream, used for execution-engine output.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// One opaque unit of engine output.
///
/// The orchestration layer never interprets chunks beyond an optional
/// final-answer check; they are forwarded to the client byte-for-byte as
/// the payload of one SSE `data:` frame.
pub type EngineChunk = String;
