use regent::{ConfigError, EnvelopeError, NodePathError, PageError, TransportError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("undecodable reply: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("bad tree token: {0}")]
    Token(#[from] NodePathError),

    #[error("{renderer} failed: {detail}")]
    Render { renderer: String, detail: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::Config(_) => 3,
            Self::Transport(_) | Self::Render { .. } => 4,
            Self::Envelope(_) | Self::Token(_) => 5,
            Self::Page(_) | Self::Io(_) => 1,
        }
    }
}
