//! Error types for SetuIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SetuIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (analog read, pin write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Analog channel not wired on this board
    #[error("Invalid analog channel: {0}")]
    InvalidChannel(u8),

    /// Indicator cell outside the array
    #[error("Indicator index {index} out of range (array has {len} cells)")]
    IndicatorOutOfRange {
        /// Requested cell
        index: usize,
        /// Number of cells in the array
        len: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device was stopped or never started
    #[error("Device not running: {0}")]
    NotRunning(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
