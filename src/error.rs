use thiserror::Error;

/// Errors raised by the analysis engine and its frame sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The FFT needs a power-of-two frame of at least two samples.
    #[error("frame length {len} is not a power of two (>= 2)")]
    InvalidFrameSize { len: usize },

    #[error("`{operation}` is not valid while the session is inactive")]
    InvalidStateTransition { operation: &'static str },

    #[error("audio device error: {0}")]
    Device(String),
}
