use thiserror::Error;

/// Construction-time errors.
///
/// Runtime failure surfaces are deliberately absent: refresh failures are
/// contained inside the validator (logged and counted, never propagated to
/// callers), and `validate` is infallible. The only operations that can
/// fail are loading configuration and building the pieces at startup.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
