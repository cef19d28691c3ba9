//! Error kinds shared by the background streams and the core models.

use std::fmt;

/// Why a watch or log stream stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamError {
    /// The stream's cancellation token fired. Always a clean stop.
    Cancelled,
    /// Network or API failure talking to the cluster.
    Transport { message: String },
    /// The remote side closed the stream.
    Closed,
    /// The operation panicked or was aborted before returning.
    Aborted { message: String },
}

impl StreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "stream cancelled"),
            Self::Transport { message } => write!(f, "transport error: {}", message),
            Self::Closed => write!(f, "stream closed by remote"),
            Self::Aborted { message } => write!(f, "stream aborted: {}", message),
        }
    }
}

impl std::error::Error for StreamError {}

/// Broken caller contract on a [`crate::selection::SelectionList`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListError {
    Duplicate { name: String },
    NotFound { name: String },
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { name } => write!(f, "item {} already exists", name),
            Self::NotFound { name } => write!(f, "item {} not found", name),
        }
    }
}

impl std::error::Error for ListError {}

/// Broken caller contract on a [`crate::supervisor::TaskSupervisor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorError {
    AlreadyRunning,
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "task is already started"),
        }
    }
}

impl std::error::Error for SupervisorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancelled_is_cancellation() {
        assert!(StreamError::Cancelled.is_cancellation());
        assert!(!StreamError::Closed.is_cancellation());
        assert!(!StreamError::transport("connection reset").is_cancellation());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            StreamError::transport("eof").to_string(),
            "transport error: eof"
        );
        assert_eq!(
            ListError::Duplicate { name: "web-0".into() }.to_string(),
            "item web-0 already exists"
        );
    }
}
