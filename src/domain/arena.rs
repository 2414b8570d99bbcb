//! Arena-backed node model.
//!
//! Nodes live in a generational arena; a side map resolves opaque node ids to
//! arena indices. Root-level nodes hang off an implicit root context with its
//! own loaded flag.

use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::{Arena, Index};
use termtree::Tree;
use tracing::instrument;

use crate::domain::entities::{ChildRecord, Node, NodeId, NodeKind, Target};
use crate::domain::error::{TreeError, TreeResult};
use crate::domain::sorter::Sorter;

/// Data payload for tree nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Source hint that children exist, used before they are loaded
    pub has_children: bool,
}

impl From<ChildRecord> for NodeData {
    fn from(record: ChildRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            kind: record.kind,
            has_children: record.has_children,
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for root-level nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in sibling order
    pub children: Vec<Index>,
    pub children_loaded: bool,
}

/// Arena-based forest under one logical root context.
#[derive(Debug, Default)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    ids: HashMap<NodeId, Index>,
    roots: Vec<Index>,
    roots_loaded: bool,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains_key(id)
    }

    /// True if `target` is the root context or a known node.
    pub fn has_target(&self, target: &Target) -> bool {
        match target {
            Target::Root => true,
            Target::Node(id) => self.contains(id),
        }
    }

    fn index_of(&self, id: &NodeId) -> TreeResult<Index> {
        self.ids
            .get(id)
            .copied()
            .ok_or_else(|| TreeError::unknown_node(id))
    }

    fn node(&self, idx: Index) -> TreeResult<&TreeNode> {
        self.arena
            .get(idx)
            .ok_or_else(|| TreeError::validation("stale arena index"))
    }

    fn node_mut(&mut self, idx: Index) -> TreeResult<&mut TreeNode> {
        self.arena
            .get_mut(idx)
            .ok_or_else(|| TreeError::validation("stale arena index"))
    }

    pub fn data(&self, id: &NodeId) -> Option<&NodeData> {
        let idx = self.ids.get(id)?;
        self.arena.get(*idx).map(|n| &n.data)
    }

    /// Snapshot of one node.
    pub fn get(&self, id: &NodeId) -> Option<Node> {
        let idx = *self.ids.get(id)?;
        self.snapshot(idx)
    }

    fn snapshot(&self, idx: Index) -> Option<Node> {
        let node = self.arena.get(idx)?;
        Some(Node {
            id: node.data.id.clone(),
            name: node.data.name.clone(),
            kind: node.data.kind.clone(),
            parent: node
                .parent
                .and_then(|p| self.arena.get(p))
                .map(|p| p.data.id.clone()),
            children: self.ids_of(&node.children),
            children_loaded: node.children_loaded,
            has_children: node.data.has_children,
        })
    }

    fn ids_of(&self, indices: &[Index]) -> Vec<NodeId> {
        indices
            .iter()
            .filter_map(|&i| self.arena.get(i))
            .map(|n| n.data.id.clone())
            .collect()
    }

    fn child_indices(&self, parent: &Target) -> TreeResult<&Vec<Index>> {
        match parent {
            Target::Root => Ok(&self.roots),
            Target::Node(id) => Ok(&self.node(self.index_of(id)?)?.children),
        }
    }

    fn child_indices_mut(&mut self, parent: &Target) -> TreeResult<&mut Vec<Index>> {
        match parent {
            Target::Root => Ok(&mut self.roots),
            Target::Node(id) => {
                let idx = self.index_of(id)?;
                Ok(&mut self.node_mut(idx)?.children)
            }
        }
    }

    /// Ordered children of `parent`; empty when not loaded.
    #[instrument(level = "trace", skip(self))]
    pub fn get_children(&self, parent: &Target) -> Vec<Node> {
        self.child_indices(parent)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|&i| self.snapshot(i))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn child_ids(&self, parent: &Target) -> Vec<NodeId> {
        self.child_indices(parent)
            .map(|children| self.ids_of(children))
            .unwrap_or_default()
    }

    pub fn is_loaded(&self, parent: &Target) -> bool {
        match parent {
            Target::Root => self.roots_loaded,
            Target::Node(id) => self
                .ids
                .get(id)
                .and_then(|&i| self.arena.get(i))
                .map(|n| n.children_loaded)
                .unwrap_or(false),
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn set_children_loaded(&mut self, parent: &Target) -> TreeResult<()> {
        match parent {
            Target::Root => self.roots_loaded = true,
            Target::Node(id) => {
                let idx = self.index_of(id)?;
                self.node_mut(idx)?.children_loaded = true;
            }
        }
        Ok(())
    }

    pub fn parent_of(&self, id: &NodeId) -> TreeResult<Target> {
        let node = self.node(self.index_of(id)?)?;
        Ok(match node.parent {
            None => Target::Root,
            Some(p) => Target::Node(self.node(p)?.data.id.clone()),
        })
    }

    /// Position of `id` within its parent's sibling list.
    pub fn position_in_parent(&self, id: &NodeId) -> TreeResult<usize> {
        let idx = self.index_of(id)?;
        let parent = self.parent_of(id)?;
        self.child_indices(&parent)?
            .iter()
            .position(|&i| i == idx)
            .ok_or_else(|| TreeError::validation(format!("{id} missing from its parent")))
    }

    /// Ancestor ids of `id`, nearest first.
    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self
            .ids
            .get(id)
            .and_then(|&i| self.arena.get(i))
            .and_then(|n| n.parent);
        while let Some(idx) = current {
            match self.arena.get(idx) {
                Some(node) => {
                    result.push(node.data.id.clone());
                    current = node.parent;
                }
                None => break,
            }
        }
        result
    }

    /// True if `id` sits somewhere below `ancestor`.
    pub fn is_descendant(&self, id: &NodeId, ancestor: &NodeId) -> bool {
        self.ancestors(id).iter().any(|a| a == ancestor)
    }

    /// True if `id` is inside the subtree rooted at `scope` (inclusive).
    pub fn is_within(&self, id: &NodeId, scope: &Target) -> bool {
        match scope {
            Target::Root => true,
            Target::Node(s) => id == s || self.is_descendant(id, s),
        }
    }

    /// Number of nodes in the subtree rooted at `id`, itself included.
    pub fn subtree_size(&self, id: &NodeId) -> usize {
        self.ids
            .get(id)
            .map(|&idx| self.collect_subtree(idx).len())
            .unwrap_or(0)
    }

    fn collect_subtree(&self, root: Index) -> Vec<Index> {
        let mut result = Vec::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.arena.get(idx) {
                result.push(idx);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        result
    }

    /// Insert a new node under a loaded parent.
    ///
    /// `index` is clamped to the sibling count; `None` appends.
    #[instrument(level = "trace", skip(self))]
    pub fn create_node(
        &mut self,
        record: ChildRecord,
        parent: &Target,
        index: Option<usize>,
    ) -> TreeResult<()> {
        if self.contains(&record.id) {
            return Err(TreeError::validation(format!(
                "duplicate node id: {}",
                record.id
            )));
        }
        if !self.has_target(parent) {
            return Err(TreeError::validation(format!("unknown parent: {parent}")));
        }
        if !self.is_loaded(parent) {
            return Err(TreeError::validation(format!(
                "children of {parent} not loaded"
            )));
        }
        self.insert_unchecked(record.into(), parent, index)
    }

    fn insert_unchecked(
        &mut self,
        data: NodeData,
        parent: &Target,
        index: Option<usize>,
    ) -> TreeResult<()> {
        let parent_idx = match parent {
            Target::Root => None,
            Target::Node(id) => Some(self.index_of(id)?),
        };
        let id = data.id.clone();
        let node_idx = self.arena.insert(TreeNode {
            data,
            parent: parent_idx,
            children: Vec::new(),
            children_loaded: false,
        });
        self.ids.insert(id, node_idx);

        if let Some(p) = parent_idx {
            self.node_mut(p)?.data.has_children = true;
        }
        let siblings = self.child_indices_mut(parent)?;
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, node_idx);
        Ok(())
    }

    /// Remove `id` and its entire subtree. Returns the number of removed nodes.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_node(&mut self, id: &NodeId) -> TreeResult<usize> {
        let idx = self.index_of(id)?;
        self.unlink(idx)?;
        Ok(self.drop_subtree(idx))
    }

    fn unlink(&mut self, idx: Index) -> TreeResult<()> {
        let parent = self.node(idx)?.parent;
        match parent {
            None => self.roots.retain(|&i| i != idx),
            Some(p) => {
                let parent_node = self.node_mut(p)?;
                parent_node.children.retain(|&i| i != idx);
                if parent_node.children_loaded {
                    parent_node.data.has_children = !parent_node.children.is_empty();
                }
            }
        }
        Ok(())
    }

    fn drop_subtree(&mut self, root: Index) -> usize {
        let doomed = self.collect_subtree(root);
        for idx in &doomed {
            if let Some(node) = self.arena.remove(*idx) {
                self.ids.remove(&node.data.id);
            }
        }
        doomed.len()
    }

    /// Replace the whole child list of `parent` with `records` and mark it loaded.
    ///
    /// Rejects payloads with duplicate ids, or ids already used outside the
    /// subtree being replaced. On error nothing is changed.
    #[instrument(level = "debug", skip(self, records), fields(count = records.len()))]
    pub fn replace_children(
        &mut self,
        parent: &Target,
        records: Vec<ChildRecord>,
    ) -> TreeResult<()> {
        if !self.has_target(parent) {
            return Err(TreeError::validation(format!("unknown parent: {parent}")));
        }
        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(&record.id) {
                return Err(TreeError::validation(format!(
                    "duplicate id in payload: {}",
                    record.id
                )));
            }
            if self.contains(&record.id) && !self.is_strictly_below(&record.id, parent) {
                return Err(TreeError::validation(format!(
                    "id {} already exists elsewhere in the tree",
                    record.id
                )));
            }
        }

        let old = std::mem::take(self.child_indices_mut(parent)?);
        for idx in old {
            self.drop_subtree(idx);
        }
        for record in records {
            self.insert_unchecked(record.into(), parent, None)?;
        }
        if let Target::Node(id) = parent {
            let idx = self.index_of(id)?;
            let node = self.node_mut(idx)?;
            node.data.has_children = !node.children.is_empty();
        }
        self.set_children_loaded(parent)
    }

    fn is_strictly_below(&self, id: &NodeId, parent: &Target) -> bool {
        match parent {
            Target::Root => true,
            Target::Node(p) => self.is_descendant(id, p),
        }
    }

    /// Unlink `id` from its parent's child list, keeping its subtree in the tree.
    ///
    /// A detached node reports no parent until [`TreeArena::attach_at`] places it again.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, id: &NodeId) -> TreeResult<()> {
        let idx = self.index_of(id)?;
        self.unlink(idx)?;
        self.node_mut(idx)?.parent = None;
        Ok(())
    }

    /// Insert the detached node `id` into the loaded child list of `parent` at `index` (clamped).
    #[instrument(level = "trace", skip(self))]
    pub fn attach_at(&mut self, id: &NodeId, parent: &Target, index: usize) -> TreeResult<()> {
        let idx = self.index_of(id)?;
        if self.roots.contains(&idx) || self.node(idx)?.parent.is_some() {
            return Err(TreeError::validation(format!("{id} is still attached")));
        }
        let parent_idx = match parent {
            Target::Root => None,
            Target::Node(p) => {
                if p == id || self.is_descendant(p, id) {
                    return Err(TreeError::DescendantViolation {
                        source_id: id.clone(),
                        target: p.clone(),
                    });
                }
                Some(self.index_of(p)?)
            }
        };
        if !self.is_loaded(parent) {
            return Err(TreeError::validation(format!("children of {parent} not loaded")));
        }

        self.node_mut(idx)?.parent = parent_idx;
        if let Some(p) = parent_idx {
            self.node_mut(p)?.data.has_children = true;
        }
        let siblings = self.child_indices_mut(parent)?;
        let at = index.min(siblings.len());
        siblings.insert(at, idx);
        Ok(())
    }

    /// Move `id` under `new_parent` at `index` (clamped).
    ///
    /// An unloaded destination does not receive the node: the subtree is dropped
    /// locally and the destination is flagged as having children, so it shows
    /// up on first expansion. Returns the number of nodes dropped that way.
    #[instrument(level = "trace", skip(self))]
    pub fn move_node(&mut self, id: &NodeId, new_parent: &Target, index: usize) -> TreeResult<usize> {
        let idx = self.index_of(id)?;
        if let Target::Node(p) = new_parent {
            if p == id || self.is_descendant(p, id) {
                return Err(TreeError::DescendantViolation {
                    source_id: id.clone(),
                    target: p.clone(),
                });
            }
        }
        if !self.has_target(new_parent) {
            return Err(TreeError::validation(format!("unknown parent: {new_parent}")));
        }

        self.detach(id)?;
        if !self.is_loaded(new_parent) {
            if let Target::Node(p) = new_parent {
                let p_idx = self.index_of(p)?;
                self.node_mut(p_idx)?.data.has_children = true;
            }
            return Ok(self.drop_subtree(idx));
        }
        self.attach_at(id, new_parent, index)?;
        Ok(0)
    }

    /// Change name and kind of an existing node.
    pub fn update_node(&mut self, id: &NodeId, name: String, kind: NodeKind) -> TreeResult<()> {
        let idx = self.index_of(id)?;
        let data = &mut self.node_mut(idx)?.data;
        data.name = name;
        data.kind = kind;
        Ok(())
    }

    pub fn set_has_children(&mut self, id: &NodeId, value: bool) -> TreeResult<()> {
        let idx = self.index_of(id)?;
        self.node_mut(idx)?.data.has_children = value;
        Ok(())
    }

    /// Reorder the children of `parent` according to `sorter`.
    #[instrument(level = "trace", skip(self, sorter))]
    pub fn sort_children(&mut self, parent: &Target, sorter: &Sorter) -> TreeResult<()> {
        let current = self.child_indices(parent)?.clone();
        let snapshots: Vec<(Index, Node)> = current
            .iter()
            .filter_map(|&i| self.snapshot(i).map(|n| (i, n)))
            .collect();
        let order: HashMap<NodeId, Index> = snapshots
            .iter()
            .map(|(i, n)| (n.id.clone(), *i))
            .collect();
        let sorted = sorter.sort(snapshots.into_iter().map(|(_, n)| n).collect());
        let reordered: Vec<Index> = sorted.iter().filter_map(|n| order.get(&n.id).copied()).collect();
        *self.child_indices_mut(parent)? = reordered;
        Ok(())
    }

    /// Depth-first, pre-order walk over all loaded nodes with their depth.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Number of levels in the loaded forest.
    pub fn depth(&self) -> usize {
        self.iter().map(|(depth, _)| depth + 1).max().unwrap_or(0)
    }

    /// Render the loaded forest for terminal display.
    pub fn to_tree_string<F>(&self, root_label: &str, label: F) -> Tree<String>
    where
        F: Fn(&TreeNode) -> String,
    {
        fn build<F: Fn(&TreeNode) -> String>(arena: &TreeArena, idx: Index, label: &F) -> Option<Tree<String>> {
            let node = arena.arena.get(idx)?;
            let leaves: Vec<_> = node
                .children
                .iter()
                .filter_map(|&c| build(arena, c, label))
                .collect();
            Some(Tree::new(label(node)).with_leaves(leaves))
        }

        let leaves: Vec<_> = self
            .roots
            .iter()
            .filter_map(|&r| build(self, r, &label))
            .collect();
        Tree::new(root_label.to_string()).with_leaves(leaves)
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<(usize, Index)>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena) -> Self {
        // Push in reverse for left-to-right traversal
        let stack = arena.roots.iter().rev().map(|&r| (0, r)).collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (usize, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, idx)) = self.stack.pop() {
            if let Some(node) = self.arena.arena.get(idx) {
                for &child in node.children.iter().rev() {
                    self.stack.push((depth + 1, child));
                }
                return Some((depth, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_arena() -> TreeArena {
        // 1 ── 2 ── 3
        // └─── 4
        // 5
        let mut arena = TreeArena::new();
        arena
            .replace_children(
                &Target::Root,
                vec![ChildRecord::new("1", "one").with_children(), ChildRecord::new("5", "five")],
            )
            .unwrap();
        arena
            .replace_children(
                &Target::node("1"),
                vec![ChildRecord::new("2", "two").with_children(), ChildRecord::new("4", "four")],
            )
            .unwrap();
        arena
            .replace_children(&Target::node("2"), vec![ChildRecord::new("3", "three")])
            .unwrap();
        arena
    }

    #[test]
    fn given_nested_nodes_when_removing_then_cascades_subtree() {
        let mut arena = loaded_arena();
        let removed = arena.remove_node(&"1".into()).unwrap();

        assert_eq!(removed, 4);
        assert_eq!(arena.len(), 1);
        assert!(!arena.contains(&"3".into()));
        assert_eq!(arena.child_ids(&Target::Root), vec![NodeId::from("5")]);
    }

    #[test]
    fn given_unloaded_parent_when_creating_then_rejects() {
        let mut arena = loaded_arena();
        let result = arena.create_node(ChildRecord::new("9", "nine"), &Target::node("4"), None);

        assert!(matches!(result, Err(TreeError::Validation(_))));
        assert!(arena.get_children(&Target::node("4")).is_empty());
    }

    #[test]
    fn given_empty_leaf_when_marking_loaded_then_creates_allowed() {
        let mut arena = loaded_arena();
        arena.set_children_loaded(&Target::node("4")).unwrap();

        assert!(arena.is_loaded(&Target::node("4")));
        arena
            .create_node(ChildRecord::new("9", "nine"), &Target::node("4"), None)
            .unwrap();
        assert_eq!(arena.child_ids(&Target::node("4")), vec![NodeId::from("9")]);
    }

    #[test]
    fn given_deep_node_when_listing_ancestors_then_nearest_first() {
        let arena = loaded_arena();
        assert_eq!(
            arena.ancestors(&"3".into()),
            vec![NodeId::from("2"), NodeId::from("1")]
        );
        assert!(arena.is_descendant(&"3".into(), &"1".into()));
        assert!(!arena.is_descendant(&"1".into(), &"3".into()));
        assert_eq!(arena.subtree_size(&"1".into()), 4);
    }

    #[test]
    fn given_payload_with_foreign_id_when_replacing_then_unchanged() {
        let mut arena = loaded_arena();
        let result = arena.replace_children(&Target::node("4"), vec![ChildRecord::new("5", "dup")]);

        assert!(result.is_err());
        assert!(!arena.is_loaded(&Target::node("4")));
        assert_eq!(arena.len(), 5);
    }

    #[test]
    fn given_reload_with_same_ids_when_replacing_then_accepts() {
        let mut arena = loaded_arena();
        arena
            .replace_children(&Target::node("1"), vec![ChildRecord::new("2", "two again")])
            .unwrap();

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.data(&"2".into()).unwrap().name, "two again");
        assert!(!arena.is_loaded(&Target::node("2")));
    }

    #[test]
    fn given_unloaded_destination_when_moving_then_drops_subtree_and_flags_children() {
        let mut arena = loaded_arena();
        let dropped = arena.move_node(&"2".into(), &Target::node("5"), 0).unwrap();

        assert_eq!(dropped, 2);
        assert!(arena.data(&"5".into()).unwrap().has_children);
        assert_eq!(arena.child_ids(&Target::node("1")), vec![NodeId::from("4")]);
    }

    #[test]
    fn given_detached_node_when_attaching_then_placed_at_index() {
        let mut arena = loaded_arena();
        arena.detach(&"4".into()).unwrap();
        arena.attach_at(&"4".into(), &Target::Root, 0).unwrap();

        assert_eq!(
            arena.child_ids(&Target::Root),
            vec![NodeId::from("4"), NodeId::from("1"), NodeId::from("5")]
        );
        assert_eq!(arena.parent_of(&"4".into()).unwrap(), Target::Root);
        assert!(matches!(
            arena.attach_at(&"4".into(), &Target::node("2"), 0),
            Err(TreeError::Validation(_))
        ));
    }

    #[test]
    fn given_detached_subtree_when_attaching_below_itself_then_descendant_violation() {
        let mut arena = loaded_arena();
        arena.detach(&"1".into()).unwrap();

        let result = arena.attach_at(&"1".into(), &Target::node("2"), 0);

        assert!(matches!(result, Err(TreeError::DescendantViolation { .. })));
    }

    #[test]
    fn given_loaded_forest_when_iterating_then_preorder_with_depth() {
        let arena = loaded_arena();
        let visited: Vec<(usize, String)> = arena
            .iter()
            .map(|(d, n)| (d, n.data.id.to_string()))
            .collect();

        assert_eq!(
            visited,
            vec![
                (0, "1".to_string()),
                (1, "2".to_string()),
                (2, "3".to_string()),
                (1, "4".to_string()),
                (0, "5".to_string()),
            ]
        );
        assert_eq!(arena.depth(), 3);
    }
}
