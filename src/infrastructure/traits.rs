//! I/O boundary traits for testability
//!
//! These traits abstract the remote source, the transport underneath it, the
//! confirmation surface and the rendering layer's event sink.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::events::TreeEvent;
use crate::domain::{ChildRecord, MovePlan, NodeId, NodeKind, SourceError, Target};

/// Payload shared by the four insert actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePayload {
    /// Node the action was invoked on (root for root-level inserts)
    pub anchor: Target,
    pub parent: Target,
    /// Sibling index under `parent` before re-sorting
    pub position: usize,
    pub name: String,
    pub kind: NodeKind,
}

/// One logical CRUD operation per action kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrudRequest {
    CreateBefore(CreatePayload),
    CreateAfter(CreatePayload),
    CreateFirstChild(CreatePayload),
    CreateLastChild(CreatePayload),
    Update {
        id: NodeId,
        name: String,
        kind: NodeKind,
    },
    Delete {
        id: NodeId,
    },
    Move {
        id: NodeId,
        parent: Target,
        position: usize,
    },
}

impl CrudRequest {
    pub fn from_move(plan: &MovePlan) -> Self {
        CrudRequest::Move {
            id: plan.source.clone(),
            parent: plan.new_parent.clone(),
            position: plan.index,
        }
    }

    /// Wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            CrudRequest::CreateBefore(_) => "createBefore",
            CrudRequest::CreateAfter(_) => "createAfter",
            CrudRequest::CreateFirstChild(_) => "createFirstChild",
            CrudRequest::CreateLastChild(_) => "createLastChild",
            CrudRequest::Update { .. } => "update",
            CrudRequest::Delete { .. } => "delete",
            CrudRequest::Move { .. } => "move",
        }
    }

    pub fn create_payload(&self) -> Option<&CreatePayload> {
        match self {
            CrudRequest::CreateBefore(p)
            | CrudRequest::CreateAfter(p)
            | CrudRequest::CreateFirstChild(p)
            | CrudRequest::CreateLastChild(p) => Some(p),
            _ => None,
        }
    }
}

/// Successful CRUD reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrudReply {
    /// Create succeeded, carrying the id assigned by the source
    Created(NodeId),
    Done,
}

/// Remote data source: child listings plus CRUD.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the direct children of `parent`.
    async fn fetch_children(&self, parent: &Target) -> Result<Vec<ChildRecord>, SourceError>;

    /// Execute one CRUD request.
    async fn execute(&self, request: &CrudRequest) -> Result<CrudReply, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Query parameters, encoded by the transport
    pub query: Vec<(String, String)>,
    /// JSON body for POST
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport abstraction; the concrete client is an external concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request. Errors mean the request never produced a response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SourceError>;
}

/// What the confirmation surface shows before a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub node: NodeId,
    pub name: String,
    /// Nodes removed if confirmed, the node itself included
    pub subtree_size: usize,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

/// Yes/no prompt, blocking from the user's perspective, answered asynchronously.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// Rendering layer hook: receives one event per terminal transition.
pub trait TreeObserver: Send + Sync {
    fn notify(&self, event: &TreeEvent);
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Answers every prompt with a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmation for AutoConfirm {
    async fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        self.0
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl TreeObserver for LogObserver {
    fn notify(&self, event: &TreeEvent) {
        match event {
            TreeEvent::Rejected { reason } => warn!(event = event.name(), %reason),
            TreeEvent::Failed { error } => warn!(event = event.name(), %error),
            other => info!(event = other.name(), ?other),
        }
    }
}
