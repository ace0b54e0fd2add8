use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisqueError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid command response. Command {command} got: {body}")]
    InvalidResponse { command: String, body: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DisqueError {
    /// Builds an argument error naming the command that rejected its input.
    pub fn invalid_arguments(command: &str, reason: impl std::fmt::Display) -> Self {
        DisqueError::InvalidArgument(format!("{}: {}", command, reason))
    }

    /// Whether the error came from the link to a node rather than from the
    /// node or the caller. Only these errors make the manager fail over.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DisqueError::Connection(_) | DisqueError::Timeout(_) | DisqueError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DisqueError>;
