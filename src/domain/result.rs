//! Result type alias for Hermes operations

use crate::domain::errors::HermesError;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, HermesError>;
