//! Errors
//!
//! Custom error types used throughout the `logit-trees` crate.
use thiserror::Error;

/// Errors that can occur while building or exporting logit trees.
#[derive(Debug, Error)]
pub enum LogitTreeError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// The weight vector does not line up with the feature catalogue.
    #[error("Weight vector has {found} entries, but the feature set defines {expected} features.")]
    MisalignedWeights { expected: usize, found: usize },
    /// Unable to write tree or config to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read tree or config from file.
    #[error("Unable to read from a file {0}")]
    UnableToRead(String),
}
