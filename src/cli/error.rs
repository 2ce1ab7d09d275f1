//! CLI-level errors (top of the error chain)

use thiserror::Error;

use crate::config::SettingsError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Config(#[from] SettingsError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => exitcode::USAGE,
            CliError::Config(_) => exitcode::CONFIG,
            CliError::Domain(e) => match e {
                DomainError::Io(_) => exitcode::IOERR,
                DomainError::Syntax { .. } => exitcode::DATAERR,
                DomainError::NoRoot
                | DomainError::CycleDetected { .. }
                | DomainError::CountMismatch { .. }
                | DomainError::BackrefMismatch { .. }
                | DomainError::SizeExceeded { .. } => exitcode::DATAERR,
                _ => exitcode::SOFTWARE,
            },
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Graphviz { .. } => exitcode::SOFTWARE,
            },
        }
    }
}
