//! Error types shared across the challenge crates
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Errors raised while interpreting shared wire values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Unknown leaderboard ordering: {0}")]
    UnknownOrderBy(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_order_by_display() {
        let err = TypeError::UnknownOrderBy("fastest".to_string());
        assert_eq!(err.to_string(), "Unknown leaderboard ordering: fastest");
    }
}
