use core::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    InvalidConfig { field: &'static str, reason: String },
    FrameSizeMismatch { expected: usize, actual: usize },
    UnsupportedChannels { channels: usize },
    EmptyFrame { width: usize, height: usize },
    WorkerPool { reason: String },
    TaskPanicked { failed: usize },
}

impl EngineError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid engine config `{field}`: {reason}")
            }
            Self::FrameSizeMismatch { expected, actual } => write!(
                f,
                "frame buffer size mismatch: expected {expected} bytes, got {actual}"
            ),
            Self::UnsupportedChannels { channels } => {
                write!(f, "unsupported channel count: {channels} (expected 1, 3 or 4)")
            }
            Self::EmptyFrame { width, height } => {
                write!(f, "frame has no pixels: {width}x{height}")
            }
            Self::WorkerPool { reason } => write!(f, "failed to build worker pool: {reason}"),
            Self::TaskPanicked { failed } => {
                write!(f, "{failed} cell evaluation task(s) panicked")
            }
        }
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;
