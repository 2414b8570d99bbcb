//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{SourceError, TreeError};
use crate::exitcode;
use crate::i18n::CatalogError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    /// Tree operation refused or failed, with its localized message
    #[error("{message}")]
    Tree {
        message: String,
        #[source]
        source: TreeError,
    },

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<TreeError> for CliError {
    fn from(e: TreeError) -> Self {
        CliError::Tree {
            message: e.to_string(),
            source: e,
        }
    }
}

fn tree_exit_code(e: &TreeError) -> i32 {
    match e {
        TreeError::Source(SourceError::Malformed(_)) => exitcode::PROTOCOL,
        TreeError::Source(_) => exitcode::UNAVAILABLE,
        TreeError::OperationInProgress(_) => exitcode::TEMPFAIL,
        TreeError::DescendantViolation { .. }
        | TreeError::RootNotAllowed { .. }
        | TreeError::Validation(_) => exitcode::DATAERR,
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Tree { source, .. } => tree_exit_code(source),
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Data { .. } => exitcode::DATAERR,
                InfraError::Source(_) => exitcode::UNAVAILABLE,
                InfraError::Application(app) => match app {
                    ApplicationError::Tree(t) => tree_exit_code(t),
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::Catalog(CatalogError::Io { .. }) => exitcode::IOERR,
                    ApplicationError::Catalog(_) => exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => exitcode::IOERR,
                },
            },
        }
    }
}
