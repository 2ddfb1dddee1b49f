//! Error module for the Rusty HH library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum HHError {
    /// Error for paired sequences of different lengths, e.g., PSD values and time indices.
    LengthMismatch { left: usize, right: usize },
    /// Error for invalid parameters, e.g., a non-positive time step.
    InvalidParameter(String),
    /// Error for an empty signal handed to a transform.
    EmptySignal(String),
    /// Error while computing a matrix decomposition, e.g., the SVD used for orthogonal initialization.
    DecompositionError(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for HHError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HHError::LengthMismatch { left, right } => write!(
                f,
                "Input arrays must have the same length: got {} and {}",
                left, right
            ),
            HHError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            HHError::EmptySignal(e) => write!(f, "Empty signal: {}", e),
            HHError::DecompositionError(e) => write!(f, "Matrix decomposition error: {}", e),
            HHError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for HHError {}

impl From<std::io::Error> for HHError {
    fn from(e: std::io::Error) -> Self {
        HHError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for HHError {
    fn from(e: serde_json::Error) -> Self {
        HHError::IOError(e.to_string())
    }
}
