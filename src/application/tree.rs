//! Tree coordinator: the sans-IO core of a tree-table instance.
//!
//! Every mutation runs in two phases. `begin_*` validates the request, locks
//! the nodes it touches and hands out a [`Ticket`]; the caller performs the
//! remote call and passes the reply to [`Tree::complete`], which applies it.
//! Local state only changes in `complete`, and only on a successful reply.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::application::events::TreeEvent;
use crate::domain::{
    validate_fields, ActionKind, ChildRecord, CreateAction, KindIcons, MovePlan, MoveValidator,
    Node, NodeId, NodeKind, Placement, Position, SourceError, Sorter, Target, TreeArena,
    TreeError, TreeResult,
};
use crate::infrastructure::traits::{CreatePayload, CrudReply, CrudRequest, TreeObserver};

/// Behavioral options of one tree instance.
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub sorter: Sorter,
    pub types: KindIcons,
    /// Whether nodes may be created at or moved to the root level
    pub allow_root: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            sorter: Sorter::default(),
            types: KindIcons::new(),
            allow_root: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(Uuid);

impl OperationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-invocation action state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Confirming,
    Requesting,
    Applied,
    Failed,
}

/// What an outstanding operation will do once its reply arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Load {
        parent: Target,
    },
    Create {
        action: CreateAction,
        anchor: Target,
        placement: Placement,
        name: String,
        kind: NodeKind,
    },
    Update {
        id: NodeId,
        name: String,
        kind: NodeKind,
    },
    Delete {
        id: NodeId,
        name: String,
        subtree_size: usize,
    },
    Move(MovePlan),
}

impl Request {
    pub fn action(&self) -> Option<ActionKind> {
        match self {
            Request::Load { .. } => None,
            Request::Create { action, .. } => Some((*action).into()),
            Request::Update { .. } => Some(ActionKind::Update),
            Request::Delete { .. } => Some(ActionKind::Delete),
            Request::Move(_) => Some(ActionKind::Move),
        }
    }

    /// Nodes this request touches; `true` marks a whole-subtree lock.
    fn scope(&self) -> Vec<(Target, bool)> {
        let mut scope = match self {
            Request::Load { parent } => vec![(parent.clone(), true)],
            Request::Create {
                anchor, placement, ..
            } => vec![(anchor.clone(), false), (placement.parent.clone(), false)],
            Request::Update { id, .. } => vec![(Target::Node(id.clone()), false)],
            Request::Delete { id, .. } => vec![(Target::Node(id.clone()), true)],
            Request::Move(plan) => vec![
                (Target::Node(plan.source.clone()), true),
                (plan.new_parent.clone(), false),
            ],
        };
        scope.dedup_by(|a, b| a.0 == b.0);
        scope
    }
}

/// Handle of one outstanding operation. Consumed by [`Tree::complete`].
#[derive(Debug)]
pub struct Ticket {
    id: OperationId,
    request: Request,
    state: ActionState,
}

impl Ticket {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// The CRUD call to send; `None` for loads.
    pub fn crud_request(&self) -> Option<CrudRequest> {
        match &self.request {
            Request::Load { .. } => None,
            Request::Create {
                action,
                anchor,
                placement,
                name,
                kind,
            } => {
                let payload = CreatePayload {
                    anchor: anchor.clone(),
                    parent: placement.parent.clone(),
                    position: placement.index,
                    name: name.clone(),
                    kind: kind.clone(),
                };
                Some(match action {
                    CreateAction::CreateBefore => CrudRequest::CreateBefore(payload),
                    CreateAction::CreateAfter => CrudRequest::CreateAfter(payload),
                    CreateAction::CreateFirstChild => CrudRequest::CreateFirstChild(payload),
                    CreateAction::CreateLastChild => CrudRequest::CreateLastChild(payload),
                })
            }
            Request::Update { id, name, kind } => Some(CrudRequest::Update {
                id: id.clone(),
                name: name.clone(),
                kind: kind.clone(),
            }),
            Request::Delete { id, .. } => Some(CrudRequest::Delete { id: id.clone() }),
            Request::Move(plan) => Some(CrudRequest::from_move(plan)),
        }
    }
}

/// Result of starting a load.
#[derive(Debug)]
pub enum LoadStart {
    /// Children already loaded, nothing to fetch
    Cached(Vec<Node>),
    Fetch(Ticket),
}

/// Result of answering the delete confirmation.
#[derive(Debug)]
pub enum Confirmed {
    Proceed(Ticket),
    Declined,
    Abandoned,
}

/// Successful reply of the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Children(Vec<ChildRecord>),
    Crud(CrudReply),
}

/// Terminal outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Loaded { parent: Target, children: Vec<Node> },
    Created { id: NodeId, parent: Target },
    Updated { id: NodeId },
    Deleted { id: NodeId, removed: usize },
    Moved { plan: MovePlan },
    Declined,
    Abandoned,
}

#[derive(Debug, Clone, Copy)]
struct Lock {
    op: OperationId,
    subtree: bool,
}

/// One tree-table instance.
pub struct Tree {
    arena: TreeArena,
    options: TreeOptions,
    locks: HashMap<Target, Lock>,
    active: HashMap<OperationId, Vec<Target>>,
    abandoned: HashSet<OperationId>,
    drag_source: Option<NodeId>,
    drop_candidate: Option<(Target, Position)>,
    observers: Vec<Arc<dyn TreeObserver>>,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.arena.len())
            .field("pending", &self.active.len())
            .field("drag_source", &self.drag_source)
            .finish()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(TreeOptions::default())
    }
}

impl Tree {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            arena: TreeArena::new(),
            options,
            locks: HashMap::new(),
            active: HashMap::new(),
            abandoned: HashSet::new(),
            drag_source: None,
            drop_candidate: None,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn TreeObserver>) {
        self.observers.push(observer);
    }

    pub fn arena(&self) -> &TreeArena {
        &self.arena
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn get(&self, id: &NodeId) -> Option<Node> {
        self.arena.get(id)
    }

    pub fn get_children(&self, parent: &Target) -> Vec<Node> {
        self.arena.get_children(parent)
    }

    pub fn is_locked(&self, target: &Target) -> bool {
        self.locks.contains_key(target)
    }

    pub fn pending(&self) -> usize {
        self.active.len()
    }

    pub fn drag_source(&self) -> Option<&NodeId> {
        self.drag_source.as_ref()
    }

    pub fn drop_candidate(&self) -> Option<&(Target, Position)> {
        self.drop_candidate.as_ref()
    }

    fn emit(&self, event: TreeEvent) {
        debug!("emit: {}", event.name());
        for observer in &self.observers {
            observer.notify(&event);
        }
    }

    fn reject<T>(&self, reason: TreeError) -> TreeResult<T> {
        self.emit(TreeEvent::Rejected {
            reason: reason.clone(),
        });
        Err(reason)
    }

    // ------------------------------------------------------------
    // locking
    // ------------------------------------------------------------

    fn target_within(&self, inner: &Target, outer: &Target) -> bool {
        match (inner, outer) {
            (_, Target::Root) => true,
            (Target::Root, Target::Node(_)) => false,
            (Target::Node(id), scope) => self.arena.is_within(id, scope),
        }
    }

    fn check_scope(&self, scope: &[(Target, bool)]) -> TreeResult<()> {
        for (target, subtree) in scope {
            if self.locks.contains_key(target) {
                return Err(TreeError::OperationInProgress(target.clone()));
            }
            let inside_locked_subtree = self
                .locks
                .iter()
                .any(|(locked, lock)| lock.subtree && self.target_within(target, locked));
            let covers_locked_node = *subtree
                && self
                    .locks
                    .keys()
                    .any(|locked| self.target_within(locked, target));
            if inside_locked_subtree || covers_locked_node {
                return Err(TreeError::OperationInProgress(target.clone()));
            }
        }
        Ok(())
    }

    fn issue(&mut self, request: Request, state: ActionState) -> TreeResult<Ticket> {
        let scope = request.scope();
        if let Err(e) = self.check_scope(&scope) {
            return self.reject(e);
        }
        let id = OperationId::new();
        for (target, subtree) in &scope {
            self.locks.insert(target.clone(), Lock { op: id, subtree: *subtree });
        }
        self.active
            .insert(id, scope.into_iter().map(|(t, _)| t).collect());
        debug!("issue: op={id} request={request:?}");
        Ok(Ticket { id, request, state })
    }

    fn release(&mut self, op: OperationId) -> bool {
        match self.active.remove(&op) {
            Some(targets) => {
                for target in targets {
                    if self.locks.get(&target).map(|l| l.op) == Some(op) {
                        self.locks.remove(&target);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Give up on an outstanding operation. Its locks are released at once and
    /// its eventual reply is ignored.
    #[instrument(level = "debug", skip(self))]
    pub fn abandon(&mut self, op: OperationId) -> bool {
        if self.release(op) {
            self.abandoned.insert(op);
            true
        } else {
            false
        }
    }

    /// Drop every trace of `op`: its locks and any pending abandonment.
    ///
    /// Used when the ticket itself is gone and no reply can ever arrive.
    pub(crate) fn discard(&mut self, op: OperationId) {
        self.release(op);
        self.abandoned.remove(&op);
    }

    /// Number of abandoned operations whose reply is still expected.
    pub fn abandoned(&self) -> usize {
        self.abandoned.len()
    }

    /// Abandon whatever operation currently holds a lock on `target`.
    pub fn abandon_target(&mut self, target: &Target) -> Option<OperationId> {
        let op = self.locks.get(target)?.op;
        self.abandon(op).then_some(op)
    }

    // ------------------------------------------------------------
    // begin
    // ------------------------------------------------------------

    #[instrument(level = "debug", skip(self))]
    pub fn begin_load(&mut self, parent: &Target, force_reload: bool) -> TreeResult<LoadStart> {
        if !self.arena.has_target(parent) {
            return self.reject(TreeError::validation(format!("unknown node: {parent}")));
        }
        if self.arena.is_loaded(parent) && !force_reload {
            debug!("begin_load: {parent} cached");
            return Ok(LoadStart::Cached(self.arena.get_children(parent)));
        }
        let ticket = self.issue(
            Request::Load {
                parent: parent.clone(),
            },
            ActionState::Requesting,
        )?;
        Ok(LoadStart::Fetch(ticket))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn begin_create(
        &mut self,
        action: CreateAction,
        anchor: &Target,
        name: &str,
        kind: NodeKind,
    ) -> TreeResult<Ticket> {
        let checked = validate_fields(name, &kind, &self.options.types).and_then(|_| {
            MoveValidator::new(&self.arena, self.options.allow_root).place_create(action, anchor)
        });
        let placement = match checked {
            Ok(p) => p,
            Err(e) => return self.reject(e),
        };
        self.issue(
            Request::Create {
                action,
                anchor: anchor.clone(),
                placement,
                name: name.to_string(),
                kind,
            },
            ActionState::Requesting,
        )
    }

    #[instrument(level = "debug", skip(self))]
    pub fn begin_update(&mut self, id: &NodeId, name: &str, kind: NodeKind) -> TreeResult<Ticket> {
        if !self.arena.contains(id) {
            return self.reject(TreeError::unknown_node(id));
        }
        if let Err(e) = validate_fields(name, &kind, &self.options.types) {
            return self.reject(e);
        }
        self.issue(
            Request::Update {
                id: id.clone(),
                name: name.to_string(),
                kind,
            },
            ActionState::Requesting,
        )
    }

    /// Start a delete. The ticket waits in `Confirming` until [`Tree::confirm`].
    #[instrument(level = "debug", skip(self))]
    pub fn begin_delete(&mut self, id: &NodeId) -> TreeResult<Ticket> {
        let Some(data) = self.arena.data(id) else {
            return self.reject(TreeError::unknown_node(id));
        };
        let request = Request::Delete {
            id: id.clone(),
            name: data.name.clone(),
            subtree_size: self.arena.subtree_size(id),
        };
        self.issue(request, ActionState::Confirming)
    }

    /// Answer the confirmation of a delete ticket.
    #[instrument(level = "debug", skip(self, ticket), fields(op = %ticket.id))]
    pub fn confirm(&mut self, mut ticket: Ticket, accepted: bool) -> Confirmed {
        if self.abandoned.remove(&ticket.id) {
            return Confirmed::Abandoned;
        }
        if !accepted {
            debug!("confirm: declined, back to idle");
            self.release(ticket.id);
            ticket.state = ActionState::Idle;
            return Confirmed::Declined;
        }
        ticket.state = ActionState::Requesting;
        Confirmed::Proceed(ticket)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn begin_move(
        &mut self,
        source: &NodeId,
        target: &Target,
        position: Position,
    ) -> TreeResult<Ticket> {
        let plan = match MoveValidator::new(&self.arena, self.options.allow_root)
            .validate_move(source, target, position)
        {
            Ok(plan) => plan,
            Err(e) => return self.reject(e),
        };
        self.issue(Request::Move(plan), ActionState::Requesting)
    }

    // ------------------------------------------------------------
    // drag and drop
    // ------------------------------------------------------------

    pub fn start_drag(&mut self, source: &NodeId) -> TreeResult<()> {
        if !self.arena.contains(source) {
            return Err(TreeError::unknown_node(source));
        }
        self.drag_source = Some(source.clone());
        self.drop_candidate = None;
        Ok(())
    }

    /// Validate hovering over `target`; a legal spot becomes the drop candidate.
    pub fn drag_over(&mut self, target: &Target, position: Position) -> TreeResult<MovePlan> {
        let source = self
            .drag_source
            .clone()
            .ok_or_else(|| TreeError::validation("no drag in progress"))?;
        let result = MoveValidator::new(&self.arena, self.options.allow_root)
            .validate_move(&source, target, position);
        self.drop_candidate = result.is_ok().then(|| (target.clone(), position));
        result
    }

    pub fn cancel_drag(&mut self) {
        self.drag_source = None;
        self.drop_candidate = None;
    }

    /// Turn the current drag gesture into a move ticket.
    pub fn drop_dragged(&mut self) -> TreeResult<Ticket> {
        let source = self.drag_source.take();
        let candidate = self.drop_candidate.take();
        match (source, candidate) {
            (Some(source), Some((target, position))) => self.begin_move(&source, &target, position),
            _ => self.reject(TreeError::validation("no valid drop target")),
        }
    }

    // ------------------------------------------------------------
    // complete
    // ------------------------------------------------------------

    /// Apply the remote reply of `ticket`.
    ///
    /// On any error the tree is left exactly as it was.
    #[instrument(level = "debug", skip(self, ticket, reply), fields(op = %ticket.id))]
    pub fn complete(
        &mut self,
        mut ticket: Ticket,
        reply: Result<Reply, SourceError>,
    ) -> TreeResult<Outcome> {
        if self.abandoned.remove(&ticket.id) {
            debug!("complete: reply of abandoned operation ignored");
            return Ok(Outcome::Abandoned);
        }
        if ticket.state == ActionState::Confirming {
            return Err(TreeError::validation(format!(
                "operation {} awaits confirmation",
                ticket.id
            )));
        }
        if !self.release(ticket.id) {
            return Err(TreeError::validation(format!(
                "operation {} is not outstanding",
                ticket.id
            )));
        }

        let applied = reply.and_then(|reply| self.apply(&ticket.request, reply));
        match applied {
            Ok((outcome, event)) => {
                ticket.state = ActionState::Applied;
                self.emit(event);
                Ok(outcome)
            }
            Err(error) => {
                ticket.state = ActionState::Failed;
                warn!("complete: {} failed: {}", ticket.id, error);
                self.emit(TreeEvent::Failed {
                    error: error.clone(),
                });
                Err(TreeError::Source(error))
            }
        }
    }

    fn apply(&mut self, request: &Request, reply: Reply) -> Result<(Outcome, TreeEvent), SourceError> {
        match (request, reply) {
            (Request::Load { parent }, Reply::Children(records)) => {
                self.arena
                    .replace_children(parent, records)
                    .map_err(malformed)?;
                self.resort(parent);
                let children = self.arena.get_children(parent);
                let event = TreeEvent::Loaded {
                    parent: parent.clone(),
                    count: children.len(),
                };
                Ok((
                    Outcome::Loaded {
                        parent: parent.clone(),
                        children,
                    },
                    event,
                ))
            }
            (
                Request::Create {
                    placement,
                    name,
                    kind,
                    ..
                },
                Reply::Crud(CrudReply::Created(id)),
            ) => {
                if self.arena.contains(&id) {
                    return Err(SourceError::Malformed(format!(
                        "source assigned an id already in use: {id}"
                    )));
                }
                let parent = &placement.parent;
                if self.arena.is_loaded(parent) {
                    let record = ChildRecord {
                        id: id.clone(),
                        name: name.clone(),
                        kind: kind.clone(),
                        has_children: false,
                    };
                    self.arena
                        .create_node(record, parent, Some(placement.index))
                        .map_err(malformed)?;
                    self.resort(parent);
                } else if let Target::Node(p) = parent {
                    // shows up on first expansion
                    self.arena.set_has_children(p, true).map_err(malformed)?;
                }
                Ok((
                    Outcome::Created {
                        id: id.clone(),
                        parent: parent.clone(),
                    },
                    TreeEvent::Created {
                        id,
                        parent: parent.clone(),
                    },
                ))
            }
            (Request::Create { .. }, Reply::Crud(CrudReply::Done)) => Err(SourceError::Malformed(
                "create reply carries no id".to_string(),
            )),
            (Request::Update { id, name, kind }, Reply::Crud(_)) => {
                let parent = self.arena.parent_of(id).map_err(malformed)?;
                self.arena
                    .update_node(id, name.clone(), kind.clone())
                    .map_err(malformed)?;
                self.resort(&parent);
                Ok((
                    Outcome::Updated { id: id.clone() },
                    TreeEvent::Updated { id: id.clone() },
                ))
            }
            (Request::Delete { id, .. }, Reply::Crud(_)) => {
                let parent = self.arena.parent_of(id).map_err(malformed)?;
                let removed = self.arena.remove_node(id).map_err(malformed)?;
                self.resort(&parent);
                Ok((
                    Outcome::Deleted {
                        id: id.clone(),
                        removed,
                    },
                    TreeEvent::Deleted {
                        id: id.clone(),
                        removed,
                    },
                ))
            }
            (Request::Move(plan), Reply::Crud(_)) => {
                let old_parent = self.arena.parent_of(&plan.source).map_err(malformed)?;
                self.arena
                    .move_node(&plan.source, &plan.new_parent, plan.index)
                    .map_err(malformed)?;
                self.resort(&old_parent);
                self.resort(&plan.new_parent);
                Ok((
                    Outcome::Moved { plan: plan.clone() },
                    TreeEvent::Moved { plan: plan.clone() },
                ))
            }
            (request, reply) => Err(SourceError::Malformed(format!(
                "unexpected reply {reply:?} for {:?}",
                request.action()
            ))),
        }
    }

    fn resort(&mut self, parent: &Target) {
        if !self.arena.has_target(parent) || !self.arena.is_loaded(parent) {
            return;
        }
        if let Err(e) = self.arena.sort_children(parent, &self.options.sorter) {
            warn!("resort: {parent}: {e}");
        }
    }
}

fn malformed(e: TreeError) -> SourceError {
    SourceError::Malformed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RootContext;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<TreeEvent>>);

    impl TreeObserver for Recorder {
        fn notify(&self, event: &TreeEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    impl Recorder {
        fn names(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().iter().map(|e| e.name()).collect()
        }
    }

    fn load(tree: &mut Tree, parent: Target, records: Vec<ChildRecord>) {
        let LoadStart::Fetch(ticket) = tree.begin_load(&parent, false).unwrap() else {
            panic!("expected fetch");
        };
        tree.complete(ticket, Ok(Reply::Children(records))).unwrap();
    }

    /// 1 "B" ── 3 "c" ── 4 "d"
    /// 2 "a"
    fn tree_with_observer() -> (Tree, Arc<Recorder>) {
        let mut tree = Tree::default();
        let recorder = Arc::new(Recorder::default());
        tree.subscribe(recorder.clone());
        load(
            &mut tree,
            Target::Root,
            vec![ChildRecord::new(1u64, "B").with_children(), ChildRecord::new(2u64, "a")],
        );
        load(&mut tree, Target::node("1"), vec![ChildRecord::new(3u64, "c").with_children()]);
        load(&mut tree, Target::node("3"), vec![ChildRecord::new(4u64, "d")]);
        (tree, recorder)
    }

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn given_root_payload_when_loaded_then_sorted_case_insensitive() {
        let (tree, _) = tree_with_observer();
        assert_eq!(names(&tree.get_children(&Target::Root)), vec!["a", "B"]);
    }

    #[test]
    fn given_loaded_node_when_loading_without_force_then_cached() {
        let (mut tree, _) = tree_with_observer();
        let start = tree.begin_load(&Target::node("1"), false).unwrap();
        assert!(matches!(start, LoadStart::Cached(children) if children.len() == 1));
        assert_eq!(tree.pending(), 0);
    }

    #[test]
    fn given_failed_first_load_when_completing_then_node_stays_unloaded() {
        let (mut tree, recorder) = tree_with_observer();
        let LoadStart::Fetch(ticket) = tree.begin_load(&Target::node("2"), false).unwrap() else {
            panic!("expected fetch");
        };

        let result = tree.complete(
            ticket,
            Err(SourceError::Status {
                code: 500,
                body: "boom".to_string(),
            }),
        );

        assert!(matches!(result, Err(TreeError::Source(SourceError::Status { code: 500, .. }))));
        assert!(!tree.arena().is_loaded(&Target::node("2")));
        assert!(!tree.is_locked(&Target::node("2")));
        assert_eq!(recorder.names().last(), Some(&"failed"));
    }

    #[test]
    fn given_move_into_descendant_when_beginning_then_rejected_and_unchanged() {
        let (mut tree, recorder) = tree_with_observer();
        let before: Vec<_> = tree.arena().iter().map(|(d, n)| (d, n.data.clone())).collect();

        let result = tree.begin_move(&"1".into(), &Target::node("4"), Position::Into);

        assert!(matches!(result, Err(TreeError::DescendantViolation { .. })));
        let after: Vec<_> = tree.arena().iter().map(|(d, n)| (d, n.data.clone())).collect();
        assert_eq!(before, after);
        assert_eq!(tree.pending(), 0);
        assert_eq!(recorder.names().last(), Some(&"rejected"));
    }

    #[test]
    fn given_pending_delete_when_touching_subtree_then_operation_in_progress() {
        let (mut tree, _) = tree_with_observer();
        let delete = tree.begin_delete(&"3".into()).unwrap();
        assert_eq!(delete.state(), ActionState::Confirming);

        let update = tree.begin_update(&"4".into(), "x", NodeKind::default());
        let reload_parent = tree.begin_load(&Target::node("1"), true);
        let unrelated = tree.begin_update(&"2".into(), "x", NodeKind::default());

        assert!(matches!(update, Err(TreeError::OperationInProgress(_))));
        assert!(matches!(reload_parent, Err(TreeError::OperationInProgress(_))));
        assert!(unrelated.is_ok());
    }

    #[test]
    fn given_declined_delete_when_confirming_then_idle_and_unlocked() {
        let (mut tree, recorder) = tree_with_observer();
        let before = recorder.names().len();
        let ticket = tree.begin_delete(&"3".into()).unwrap();

        let confirmed = tree.confirm(ticket, false);

        assert!(matches!(confirmed, Confirmed::Declined));
        assert!(tree.get(&"3".into()).is_some());
        assert_eq!(tree.pending(), 0);
        assert_eq!(recorder.names().len(), before);
    }

    #[test]
    fn given_confirmed_delete_when_completed_then_subtree_removed() {
        let (mut tree, recorder) = tree_with_observer();
        let ticket = tree.begin_delete(&"3".into()).unwrap();
        let Confirmed::Proceed(ticket) = tree.confirm(ticket, true) else {
            panic!("expected proceed");
        };
        assert_eq!(ticket.state(), ActionState::Requesting);

        let outcome = tree
            .complete(ticket, Ok(Reply::Crud(CrudReply::Done)))
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Deleted {
                id: "3".into(),
                removed: 2
            }
        );
        assert!(tree.get(&"4".into()).is_none());
        assert!(!tree.get(&"1".into()).unwrap().has_children);
        assert_eq!(recorder.names().last(), Some(&"deleted"));
    }

    #[test]
    fn given_abandoned_operation_when_reply_arrives_then_ignored() {
        let (mut tree, recorder) = tree_with_observer();
        let before = recorder.names().len();
        let ticket = tree.begin_update(&"2".into(), "renamed", NodeKind::default()).unwrap();

        assert_eq!(tree.abandon_target(&Target::node("2")), Some(ticket.id()));
        assert!(tree.begin_update(&"2".into(), "again", NodeKind::default()).is_ok());

        let outcome = tree
            .complete(ticket, Ok(Reply::Crud(CrudReply::Done)))
            .unwrap();

        assert_eq!(outcome, Outcome::Abandoned);
        assert_eq!(tree.get(&"2".into()).unwrap().name, "a");
        assert_eq!(recorder.names().len(), before);
    }

    #[test]
    fn given_unconfirmed_delete_when_completing_then_refused_and_still_locked() {
        let (mut tree, _) = tree_with_observer();
        let ticket = tree.begin_delete(&"1".into()).unwrap();
        let op = ticket.id();

        let result = tree.complete(ticket, Ok(Reply::Crud(CrudReply::Done)));

        assert!(matches!(result, Err(TreeError::Validation(_))));
        assert!(tree.get(&"3".into()).is_some());
        assert!(tree.is_locked(&Target::node("1")));
        assert!(tree.abandon(op));
    }

    #[test]
    fn given_abandoned_ticket_when_discarded_then_nothing_retained() {
        let (mut tree, _) = tree_with_observer();
        for _ in 0..100 {
            let ticket = tree.begin_update(&"2".into(), "x", NodeKind::default()).unwrap();
            tree.abandon(ticket.id());
            tree.discard(ticket.id());
        }

        assert_eq!(tree.abandoned(), 0);
        assert_eq!(tree.pending(), 0);
    }

    #[test]
    fn given_create_into_unloaded_parent_when_completed_then_only_flagged() {
        let (mut tree, _) = tree_with_observer();
        let ticket = tree
            .begin_create(CreateAction::CreateLastChild, &Target::node("2"), "new", NodeKind::default())
            .unwrap();

        let outcome = tree
            .complete(ticket, Ok(Reply::Crud(CrudReply::Created("9".into()))))
            .unwrap();

        assert!(matches!(outcome, Outcome::Created { .. }));
        assert!(tree.get(&"9".into()).is_none());
        let parent = tree.get(&"2".into()).unwrap();
        assert!(parent.has_children);
        assert!(parent.children.is_empty());
        assert!(!parent.children_loaded);
    }

    #[test]
    fn given_create_when_reply_lacks_id_then_failed_and_unchanged() {
        let (mut tree, _) = tree_with_observer();
        let count = tree.arena().len();
        let ticket = tree
            .begin_create(CreateAction::CreateAfter, &Target::node("2"), "new", NodeKind::default())
            .unwrap();

        let result = tree.complete(ticket, Ok(Reply::Crud(CrudReply::Done)));

        assert!(matches!(result, Err(TreeError::Source(SourceError::Malformed(_)))));
        assert_eq!(tree.arena().len(), count);
    }

    #[test]
    fn given_root_disabled_when_creating_at_root_then_rejected_locally() {
        let mut tree = Tree::new(TreeOptions {
            allow_root: false,
            ..TreeOptions::default()
        });
        let result = tree.begin_create(
            CreateAction::CreateFirstChild,
            &Target::Root,
            "x",
            NodeKind::default(),
        );
        assert_eq!(
            result.map(|t| t.id()),
            Err(TreeError::RootNotAllowed {
                context: RootContext::Create
            })
        );
    }

    #[test]
    fn given_drag_over_invalid_target_when_dropping_then_rejected() {
        let (mut tree, _) = tree_with_observer();
        tree.start_drag(&"1".into()).unwrap();

        assert!(tree.drag_over(&Target::node("3"), Position::Into).is_err());
        assert!(tree.drop_candidate().is_none());
        assert!(tree.drop_dragged().is_err());
        assert!(tree.drag_source().is_none());
    }

    #[test]
    fn given_drag_over_valid_target_when_dropping_then_move_ticket() {
        let (mut tree, _) = tree_with_observer();
        tree.start_drag(&"2".into()).unwrap();
        tree.drag_over(&Target::node("3"), Position::Into).unwrap();

        let ticket = tree.drop_dragged().unwrap();
        let outcome = tree
            .complete(ticket, Ok(Reply::Crud(CrudReply::Done)))
            .unwrap();

        assert!(matches!(outcome, Outcome::Moved { .. }));
        assert_eq!(names(&tree.get_children(&Target::node("3"))), vec!["a", "d"]);
        assert_eq!(names(&tree.get_children(&Target::Root)), vec!["B"]);
    }
}
