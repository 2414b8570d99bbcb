//! Domain entities: core data structures

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque node identity, unique within one tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

// Sources commonly send numeric ids; accept both and keep them opaque.
impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => NodeId(s),
            RawId::Number(n) => NodeId(n.to_string()),
        })
    }
}

/// Node kind. Extensible; `default` and `folder` are the well-known ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKind(String);

impl NodeKind {
    pub const DEFAULT: &'static str = "default";
    pub const FOLDER: &'static str = "folder";

    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn folder() -> Self {
        Self::new(Self::FOLDER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeKind {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Either the single logical root context or a concrete node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Root,
    Node(NodeId),
}

impl Target {
    pub fn node(id: impl Into<NodeId>) -> Self {
        Self::Node(id.into())
    }

    pub fn as_node(&self) -> Option<&NodeId> {
        match self {
            Target::Root => None,
            Target::Node(id) => Some(id),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Target::Root)
    }
}

impl From<Option<NodeId>> for Target {
    fn from(value: Option<NodeId>) -> Self {
        value.map(Target::Node).unwrap_or(Target::Root)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Root => f.write_str("<root>"),
            Target::Node(id) => write!(f, "{id}"),
        }
    }
}

/// Drop position of a drag-and-drop gesture relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Before,
    After,
    Into,
}

/// The four insert actions of the node menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateAction {
    CreateBefore,
    CreateAfter,
    CreateFirstChild,
    CreateLastChild,
}

/// Every action the node menu and the CRUD endpoint know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    CreateBefore,
    CreateAfter,
    CreateFirstChild,
    CreateLastChild,
    Update,
    Delete,
    Move,
}

impl ActionKind {
    /// Actions offered in the per-node menu, in menu order.
    pub const MENU: [ActionKind; 6] = [
        ActionKind::CreateBefore,
        ActionKind::CreateAfter,
        ActionKind::CreateFirstChild,
        ActionKind::CreateLastChild,
        ActionKind::Update,
        ActionKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateBefore => "createBefore",
            ActionKind::CreateAfter => "createAfter",
            ActionKind::CreateFirstChild => "createFirstChild",
            ActionKind::CreateLastChild => "createLastChild",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Move => "move",
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self, ActionKind::Delete)
    }
}

impl From<CreateAction> for ActionKind {
    fn from(value: CreateAction) -> Self {
        match value {
            CreateAction::CreateBefore => ActionKind::CreateBefore,
            CreateAction::CreateAfter => ActionKind::CreateAfter,
            CreateAction::CreateFirstChild => ActionKind::CreateFirstChild,
            CreateAction::CreateLastChild => ActionKind::CreateLastChild,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One child entry as returned by the source endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub has_children: bool,
}

impl ChildRecord {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::default(),
            has_children: false,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<NodeKind>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_children(mut self) -> Self {
        self.has_children = true;
        self
    }
}

/// Read-only snapshot of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// None for root-level nodes
    pub parent: Option<NodeId>,
    /// Child ids in sibling order
    pub children: Vec<NodeId>,
    /// Children fetched from the source (false means "not yet queried")
    pub children_loaded: bool,
    /// Source hint that children exist
    pub has_children: bool,
}

/// Result of an accepted move: where the source ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub source: NodeId,
    pub old_parent: Target,
    pub new_parent: Target,
    /// Insertion index in the new parent's sibling list, source excluded
    pub index: usize,
}

/// Result of an accepted create placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub parent: Target,
    pub index: usize,
}

/// Kind to icon mapping used by renderers. A non-empty map also restricts
/// which kinds may be created.
pub type KindIcons = std::collections::BTreeMap<NodeKind, String>;
