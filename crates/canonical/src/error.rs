use thiserror::Error;

/// Errors surfaced by the parser pool.
///
/// Cancellation is the only way a wait on the pool can end without a parser,
/// so it gets its own variant instead of being folded into a generic fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("parser pool operation cancelled")]
    Cancelled,
}

/// Errors raised while building language resources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LanguageError {
    #[error("unsupported language code: {0}")]
    Unsupported(String),
    #[error("default language {0} is not among the enabled languages")]
    MissingDefault(String),
}
