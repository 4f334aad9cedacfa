//! CLI error types.

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Validation(String),
}
