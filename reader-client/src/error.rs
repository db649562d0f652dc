use thiserror::Error;

/// How a failure reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected locally; no request was sent.
    Validation,
    /// The request failed or the server answered with something unusable.
    Transport,
    /// The server answered `success: false`.
    Declined,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error(
        "Expected JSON but got: {}. Response: {body}",
        content_type.as_deref().unwrap_or("none")
    )]
    NotJson {
        content_type: Option<String>,
        body: String,
    },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("{0}")]
    Declined(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::ConfigError(_) | Self::Io(_) => ErrorClass::Validation,
            Self::Transport(_) | Self::Server { .. } | Self::NotJson { .. } | Self::Decode(_) => {
                ErrorClass::Transport
            }
            Self::Declined(_) => ErrorClass::Declined,
        }
    }

    /// True when the error was raised before any request left the client.
    pub fn is_local(&self) -> bool {
        self.class() == ErrorClass::Validation
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
