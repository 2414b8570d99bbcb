//! Remote source speaking the JSON source/CRUD endpoint contract.
//!
//! - `GET <source_url>?id=<node>` returns `[{id, name, kind, hasChildren}]`
//! - `POST <crud_url>` with `{"action": ..., ...}` returns `{success, id?, message?}`

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::domain::{ChildRecord, NodeId, SourceError, Target};
use crate::infrastructure::traits::{
    CrudReply, CrudRequest, HttpMethod, HttpRequest, HttpResponse, RemoteSource, Transport,
};

pub struct HttpSource<T: Transport> {
    transport: T,
    source_url: String,
    crud_url: String,
    root_id: String,
}

impl<T: Transport> HttpSource<T> {
    pub fn new(transport: T, source_url: impl Into<String>, crud_url: impl Into<String>) -> Self {
        Self {
            transport,
            source_url: source_url.into(),
            crud_url: crud_url.into(),
            root_id: "#".to_string(),
        }
    }

    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }

    fn wire_id(&self, target: &Target) -> String {
        match target {
            Target::Root => self.root_id.clone(),
            Target::Node(id) => id.to_string(),
        }
    }

    /// JSON body of a CRUD request.
    pub fn encode(&self, request: &CrudRequest) -> Value {
        let action = request.action();
        match request {
            CrudRequest::CreateBefore(p)
            | CrudRequest::CreateAfter(p)
            | CrudRequest::CreateFirstChild(p)
            | CrudRequest::CreateLastChild(p) => json!({
                "action": action,
                "id": self.wire_id(&p.anchor),
                "parent": self.wire_id(&p.parent),
                "position": p.position,
                "name": p.name,
                "kind": p.kind,
            }),
            CrudRequest::Update { id, name, kind } => json!({
                "action": action,
                "id": id,
                "name": name,
                "kind": kind,
            }),
            CrudRequest::Delete { id } => json!({
                "action": action,
                "id": id,
            }),
            CrudRequest::Move {
                id,
                parent,
                position,
            } => json!({
                "action": action,
                "id": id,
                "parent": self.wire_id(parent),
                "position": position,
            }),
        }
    }
}

fn check_status(response: HttpResponse) -> Result<String, SourceError> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(SourceError::Status {
            code: response.status,
            body: response.body,
        })
    }
}

/// Parse a child listing.
pub fn parse_children(body: &str) -> Result<Vec<ChildRecord>, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Malformed(format!("{e}: {body}")))
}

#[derive(Debug, Deserialize)]
struct WireReply {
    success: bool,
    #[serde(default)]
    id: Option<NodeId>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a CRUD reply; `success: false` becomes [`SourceError::Rejected`].
pub fn parse_crud_reply(body: &str) -> Result<CrudReply, SourceError> {
    let reply: WireReply =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(format!("{e}: {body}")))?;
    if !reply.success {
        return Err(SourceError::Rejected(
            reply.message.unwrap_or_else(|| "request rejected".to_string()),
        ));
    }
    Ok(match reply.id {
        Some(id) => CrudReply::Created(id),
        None => CrudReply::Done,
    })
}

#[async_trait]
impl<T: Transport> RemoteSource for HttpSource<T> {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_children(&self, parent: &Target) -> Result<Vec<ChildRecord>, SourceError> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: self.source_url.clone(),
            query: vec![("id".to_string(), self.wire_id(parent))],
            body: None,
        };
        let body = check_status(self.transport.send(request).await?)?;
        parse_children(&body)
    }

    #[instrument(level = "debug", skip(self), fields(action = request.action()))]
    async fn execute(&self, request: &CrudRequest) -> Result<CrudReply, SourceError> {
        let body = self.encode(request);
        debug!("execute: {body}");
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.crud_url.clone(),
            query: Vec::new(),
            body: Some(body),
        };
        let body = check_status(self.transport.send(request).await?)?;
        parse_crud_reply(&body)
    }
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        let builder = builder.query(&request.query);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };
        let resp = builder
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
