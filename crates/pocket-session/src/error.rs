use thiserror::Error;

/// User-visible failures of store operations
///
/// Failed conversation turns and unreadable snapshots are recovered inside
/// the store and never show up here.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Missing component: {0}")]
    MissingComponent(&'static str),
}

impl SessionError {
    /// Whether the error should be shown as a banner
    pub fn is_user_visible(&self) -> bool {
        matches!(self, SessionError::Configuration(_) | SessionError::Service(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
