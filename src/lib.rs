pub mod llm;
pub mod render;
pub mod session;
pub mod stream;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParleyError {
    #[error("Empty input: the question is blank")]
    EmptyInput,

    #[error("No stream body: {0}")]
    NoStreamBody(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for ParleyError {
    fn from(e: std::io::Error) -> Self {
        ParleyError::IOError(e.to_string())
    }
}

impl ParleyError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The user just has to speak again
            ParleyError::EmptyInput => true,
            // These end one request; the next question starts clean
            ParleyError::NoStreamBody(_) => true,
            ParleyError::RequestError(_) => true,
            ParleyError::TransportFailure(_) => true,
            ParleyError::ConfigError(_) => false,
            ParleyError::ChannelError(_) => false,
            ParleyError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ParleyError::EmptyInput => "Say something first".to_string(),
            ParleyError::NoStreamBody(_)
            | ParleyError::RequestError(_)
            | ParleyError::TransportFailure(_) => "Streaming failed".to_string(),
            ParleyError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            ParleyError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            ParleyError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
