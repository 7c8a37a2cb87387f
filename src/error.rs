pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("callback must be callable")]
    InvalidCallback,

    #[error("task failed: {0}")]
    TaskFailed(#[from] TaskFailure),

    #[error("task was cancelled before it started")]
    Cancelled,

    #[error("executor error: {0}")]
    Executor(String),

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn telemetry<S: Into<String>>(msg: S) -> Self {
        Error::Telemetry(msg.into())
    }

    /// The captured failure, if this error came out of a running task.
    pub fn as_task_failure(&self) -> Option<&TaskFailure> {
        match self {
            Error::TaskFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A failure caught at a worker or timer thread boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    #[error("panicked: {message}")]
    Panicked { message: String },

    #[error("callback must be callable")]
    EmptyCallback,
}

impl TaskFailure {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };

        TaskFailure::Panicked { message }
    }

    pub fn message(&self) -> &str {
        match self {
            TaskFailure::Panicked { message } => message,
            TaskFailure::EmptyCallback => "callback must be callable",
        }
    }
}
