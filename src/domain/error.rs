//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{NodeId, Target};

/// Failure of a remote fetch or CRUD call.
///
/// Only ever produced after a request went out. The tree is unchanged when one
/// of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("source returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("source rejected the request: {0}")]
    Rejected(String),
}

/// Which kind of operation tried to attach a node to the root context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootContext {
    Create,
    Move,
}

/// Tree errors represent structural rule violations and remote failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("cannot move {source_id} into its own subtree at {target}")]
    DescendantViolation { source_id: NodeId, target: NodeId },

    #[error("root level attachment not allowed ({context:?})")]
    RootNotAllowed { context: RootContext },

    #[error("operation already in progress on {0}")]
    OperationInProgress(Target),

    #[error("invalid input: {0}")]
    Validation(String),
}

impl TreeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unknown_node(id: &NodeId) -> Self {
        Self::Validation(format!("unknown node: {id}"))
    }

    /// True for errors detected locally, before any remote call.
    pub fn is_local(&self) -> bool {
        !matches!(self, TreeError::Source(_))
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
