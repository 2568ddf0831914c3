use thiserror::Error;

#[derive(Debug, Error)]
pub enum PinpostError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PinpostError {
    /// Short error code string, used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            PinpostError::Config(_) => "CONFIG_ERROR",
            PinpostError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PinpostError>;
