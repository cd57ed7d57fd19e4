//! Domain parsing errors

/// Failure to parse a domain value from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Not one of the known task frequencies
    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),

    /// Not one of the known rule priorities
    #[error("unknown priority: {0}")]
    UnknownPriority(String),

    /// Not a `#rgb` or `#rrggbb` color
    #[error("invalid color: {0}")]
    InvalidColor(String),
}

/// Result type for domain parsing
pub type DomainResult<T> = Result<T, DomainError>;
