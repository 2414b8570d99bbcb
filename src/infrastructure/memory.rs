//! In-process remote source backed by a JSON data file.
//!
//! Behaves like a well-formed server: it assigns ids, keeps its own sibling
//! order and refuses structurally impossible requests.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::application::{FileAction, IoResultExt};
use crate::domain::{ChildRecord, NodeId, NodeKind, SourceError, Target};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{CreatePayload, CrudReply, CrudRequest, RemoteSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    /// None for root-level nodes
    #[serde(default)]
    pub parent: Option<NodeId>,
}

/// On-disk layout of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    pub next_id: u64,
    pub nodes: Vec<StoredNode>,
}

impl Default for DataFile {
    fn default() -> Self {
        Self {
            next_id: 1,
            nodes: Vec::new(),
        }
    }
}

impl DataFile {
    fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    fn has_target(&self, target: &Target) -> bool {
        match target {
            Target::Root => true,
            Target::Node(id) => self.contains(id),
        }
    }

    fn parent_of(&self, id: &NodeId) -> Option<Option<NodeId>> {
        self.nodes.iter().find(|n| &n.id == id).map(|n| n.parent.clone())
    }

    fn is_child_of(node: &StoredNode, parent: &Target) -> bool {
        node.parent.as_ref() == parent.as_node()
    }

    fn children(&self, parent: &Target) -> Vec<&StoredNode> {
        self.nodes
            .iter()
            .filter(|n| Self::is_child_of(n, parent))
            .collect()
    }

    /// Ids of `id` and everything below it.
    fn subtree(&self, id: &NodeId) -> Vec<NodeId> {
        let mut result = vec![id.clone()];
        let mut i = 0;
        while i < result.len() {
            let current = result[i].clone();
            result.extend(
                self.nodes
                    .iter()
                    .filter(|n| n.parent.as_ref() == Some(&current))
                    .map(|n| n.id.clone()),
            );
            i += 1;
        }
        result
    }

    /// Insert `node` so it becomes the `position`-th child of its parent.
    fn insert_at(&mut self, node: StoredNode, position: usize) {
        let parent: Target = node.parent.clone().into();
        let at = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| Self::is_child_of(n, &parent))
            .map(|(i, _)| i)
            .nth(position)
            .unwrap_or(self.nodes.len());
        self.nodes.insert(at, node);
    }

    fn create(&mut self, payload: &CreatePayload) -> Result<CrudReply, SourceError> {
        if !self.has_target(&payload.anchor) || !self.has_target(&payload.parent) {
            return Err(SourceError::Status {
                code: 404,
                body: format!("unknown node: {}", payload.anchor),
            });
        }
        let mut id = NodeId::from(self.next_id);
        while self.contains(&id) {
            self.next_id += 1;
            id = NodeId::from(self.next_id);
        }
        self.next_id += 1;
        let node = StoredNode {
            id: id.clone(),
            name: payload.name.clone(),
            kind: payload.kind.clone(),
            parent: payload.parent.as_node().cloned(),
        };
        self.insert_at(node, payload.position);
        Ok(CrudReply::Created(id))
    }

    fn apply(&mut self, request: &CrudRequest) -> Result<CrudReply, SourceError> {
        if let Some(payload) = request.create_payload() {
            return self.create(payload);
        }
        match request {
            CrudRequest::Update { id, name, kind } => {
                let node = self
                    .nodes
                    .iter_mut()
                    .find(|n| &n.id == id)
                    .ok_or_else(|| not_found(id))?;
                node.name = name.clone();
                node.kind = kind.clone();
                Ok(CrudReply::Done)
            }
            CrudRequest::Delete { id } => {
                if !self.contains(id) {
                    return Err(not_found(id));
                }
                let doomed = self.subtree(id);
                self.nodes.retain(|n| !doomed.contains(&n.id));
                Ok(CrudReply::Done)
            }
            CrudRequest::Move {
                id,
                parent,
                position,
            } => {
                if !self.contains(id) {
                    return Err(not_found(id));
                }
                if !self.has_target(parent) {
                    return Err(SourceError::Status {
                        code: 404,
                        body: format!("unknown node: {parent}"),
                    });
                }
                if let Target::Node(p) = parent {
                    if self.subtree(id).contains(p) {
                        return Err(SourceError::Rejected(format!(
                            "cannot move {id} into its own subtree"
                        )));
                    }
                }
                let at = self
                    .nodes
                    .iter()
                    .position(|n| &n.id == id)
                    .ok_or_else(|| not_found(id))?;
                let mut node = self.nodes.remove(at);
                node.parent = parent.as_node().cloned();
                self.insert_at(node, *position);
                Ok(CrudReply::Done)
            }
            _ => Err(SourceError::Rejected(format!(
                "unsupported action: {}",
                request.action()
            ))),
        }
    }
}

fn not_found(id: &NodeId) -> SourceError {
    SourceError::Status {
        code: 404,
        body: format!("unknown node: {id}"),
    }
}

#[derive(Debug, Default)]
pub struct MemorySource {
    data: Mutex<DataFile>,
    fetches: AtomicUsize,
    executions: AtomicUsize,
}

impl MemorySource {
    pub fn new(data: DataFile) -> Self {
        Self {
            data: Mutex::new(data),
            ..Self::default()
        }
    }

    fn data(&self) -> MutexGuard<'_, DataFile> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the data file at `path`; a missing file yields an empty store.
    #[instrument(level = "debug")]
    pub fn from_file(path: &Path) -> InfraResult<Self> {
        if !path.exists() {
            debug!("from_file: {} missing, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).with_path_context(FileAction::Read, path)?;
        let data: DataFile = serde_json::from_str(&content).map_err(|e| InfraError::Data {
            context: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(data))
    }

    /// Write the store to `path` atomically.
    #[instrument(level = "debug", skip(self))]
    pub fn save(&self, path: &Path) -> InfraResult<()> {
        let json = serde_json::to_string_pretty(&*self.data()).map_err(|e| InfraError::Data {
            context: path.display().to_string(),
            message: e.to_string(),
        })?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_path_context(FileAction::Stage, dir)?;
        tmp.write_all(json.as_bytes())
            .with_path_context(FileAction::Write, path)?;
        tmp.persist(path)
            .map_err(|e| InfraError::io(format!("persist {}", path.display()), e.error))?;
        Ok(())
    }

    pub fn snapshot(&self) -> DataFile {
        self.data().clone()
    }

    /// Parent of `id` in the store, `Root` for root-level nodes.
    pub fn parent_of(&self, id: &NodeId) -> Option<Target> {
        self.data().parent_of(id).map(Target::from)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn execute_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for MemorySource {
    async fn fetch_children(&self, parent: &Target) -> Result<Vec<ChildRecord>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let data = self.data();
        if !data.has_target(parent) {
            return Err(SourceError::Status {
                code: 404,
                body: format!("unknown node: {parent}"),
            });
        }
        Ok(data
            .children(parent)
            .into_iter()
            .map(|n| ChildRecord {
                id: n.id.clone(),
                name: n.name.clone(),
                kind: n.kind.clone(),
                has_children: data.nodes.iter().any(|c| c.parent.as_ref() == Some(&n.id)),
            })
            .collect())
    }

    async fn execute(&self, request: &CrudRequest) -> Result<CrudReply, SourceError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data();
        let reply = data.apply(request);
        debug!("execute: {} -> {:?}", request.action(), reply);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn node(id: &str, name: &str, parent: Option<&str>) -> StoredNode {
        StoredNode {
            id: id.into(),
            name: name.to_string(),
            kind: NodeKind::default(),
            parent: parent.map(NodeId::from),
        }
    }

    /// 1 ── 2 ── 3
    /// 4
    fn source() -> MemorySource {
        MemorySource::new(DataFile {
            next_id: 5,
            nodes: vec![
                node("1", "one", None),
                node("2", "two", Some("1")),
                node("3", "three", Some("2")),
                node("4", "four", None),
            ],
        })
    }

    fn payload(parent: Target, position: usize) -> CreatePayload {
        CreatePayload {
            anchor: parent.clone(),
            parent,
            position,
            name: "new".to_string(),
            kind: NodeKind::default(),
        }
    }

    #[tokio::test]
    async fn given_store_when_fetching_root_then_has_children_computed() {
        let source = source();
        let children = source.fetch_children(&Target::Root).await.unwrap();
        let flags: Vec<_> = children.iter().map(|c| (c.id.as_str(), c.has_children)).collect();
        assert_eq!(flags, vec![("1", true), ("4", false)]);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn given_stale_next_id_when_creating_then_skips_ids_in_use() {
        let source = MemorySource::new(DataFile {
            next_id: 1,
            nodes: vec![node("1", "one", None), node("2", "two", None)],
        });

        let reply = source
            .execute(&CrudRequest::CreateLastChild(payload(Target::Root, 2)))
            .await
            .unwrap();

        assert_eq!(reply, CrudReply::Created("3".into()));
        let data = source.snapshot();
        assert_eq!(data.next_id, 4);
        let ids: Vec<_> = data.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn given_unknown_parent_when_fetching_then_404() {
        let result = source().fetch_children(&Target::node("99")).await;
        assert!(matches!(result, Err(SourceError::Status { code: 404, .. })));
    }

    #[tokio::test]
    async fn given_create_at_position_when_executing_then_inserted_among_siblings() {
        let source = source();
        let reply = source
            .execute(&CrudRequest::CreateFirstChild(payload(Target::Root, 1)))
            .await
            .unwrap();

        assert_eq!(reply, CrudReply::Created("5".into()));
        let roots: Vec<_> = source
            .fetch_children(&Target::Root)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(roots, vec!["1", "5", "4"]);
        assert_eq!(source.snapshot().next_id, 6);
    }

    #[tokio::test]
    async fn given_delete_when_executing_then_subtree_removed() {
        let source = source();
        source
            .execute(&CrudRequest::Delete { id: "1".into() })
            .await
            .unwrap();
        let ids: Vec<_> = source.snapshot().nodes.into_iter().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, vec!["4"]);
    }

    #[tokio::test]
    async fn given_move_into_own_subtree_when_executing_then_rejected() {
        let source = source();
        let result = source
            .execute(&CrudRequest::Move {
                id: "1".into(),
                parent: Target::node("3"),
                position: 0,
            })
            .await;
        assert!(matches!(result, Err(SourceError::Rejected(_))));
        assert_eq!(source.parent_of(&"1".into()), Some(Target::Root));
    }

    #[tokio::test]
    async fn given_move_when_executing_then_reparented() {
        let source = source();
        source
            .execute(&CrudRequest::Move {
                id: "4".into(),
                parent: Target::node("1"),
                position: 0,
            })
            .await
            .unwrap();
        assert_eq!(source.parent_of(&"4".into()), Some(Target::node("1")));
        let children = source.fetch_children(&Target::node("1")).await.unwrap();
        assert_eq!(children[0].id, NodeId::from("4"));
    }

    #[test]
    fn given_saved_store_when_loading_then_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.json");
        let original = source();

        original.save(&path).unwrap();
        let loaded = MemorySource::from_file(&path).unwrap();

        assert_eq!(loaded.snapshot(), original.snapshot());
    }

    #[test]
    fn given_missing_file_when_loading_then_empty_store() {
        let dir = TempDir::new().unwrap();
        let loaded = MemorySource::from_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.snapshot(), DataFile::default());
    }

    #[test]
    fn given_corrupt_file_when_loading_then_data_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            MemorySource::from_file(&path),
            Err(InfraError::Data { .. })
        ));
    }
}
