//! Result type alias for TreeSync operations

use crate::Error;

/// Result type alias for TreeSync operations
pub type Result<T> = std::result::Result<T, Error>;
