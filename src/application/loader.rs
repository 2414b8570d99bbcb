//! Lazy loading of child lists from the remote source.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument};

use crate::application::tree::{LoadStart, OperationId, Outcome, Reply, Tree};
use crate::domain::{Node, Target, TreeResult};
use crate::infrastructure::traits::RemoteSource;

pub(crate) fn lock(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Discards its operation when dropped while still armed.
///
/// Dropping the future of an in-flight request therefore releases the locks
/// it held. The ticket goes down with the future, so nothing is kept around
/// for a reply that can no longer be applied.
pub(crate) struct PendingGuard<'a> {
    tree: &'a Mutex<Tree>,
    op: Option<OperationId>,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(tree: &'a Mutex<Tree>, op: OperationId) -> Self {
        Self { tree, op: Some(op) }
    }

    pub(crate) fn disarm(mut self) {
        self.op = None;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(op) = self.op.take() {
            debug!("pending guard: discarding {op}");
            lock(self.tree).discard(op);
        }
    }
}

pub struct Loader {
    source: Arc<dyn RemoteSource>,
}

impl Loader {
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self { source }
    }

    /// Children of `parent`, fetched once and cached afterwards.
    ///
    /// `force_reload` always fetches and replaces the cached list.
    #[instrument(level = "debug", skip(self, tree))]
    pub async fn load_children(
        &self,
        tree: &Mutex<Tree>,
        parent: &Target,
        force_reload: bool,
    ) -> TreeResult<Vec<Node>> {
        let ticket = match lock(tree).begin_load(parent, force_reload)? {
            LoadStart::Cached(children) => return Ok(children),
            LoadStart::Fetch(ticket) => ticket,
        };

        let guard = PendingGuard::new(tree, ticket.id());
        let reply = self.source.fetch_children(parent).await;
        guard.disarm();

        let outcome = lock(tree).complete(ticket, reply.map(Reply::Children))?;
        match outcome {
            Outcome::Loaded { children, .. } => Ok(children),
            _ => Ok(lock(tree).get_children(parent)),
        }
    }

    /// Load every reachable node breadth-first, down to `max_depth` levels
    /// below the root (`None` means unbounded).
    ///
    /// Only nodes flagged with children are queried. Stops at the first error.
    #[instrument(level = "debug", skip(self, tree))]
    pub async fn expand_all(&self, tree: &Mutex<Tree>, max_depth: Option<usize>) -> TreeResult<usize> {
        let mut queue = VecDeque::from([(Target::Root, 0usize)]);
        let mut loaded = 0;
        while let Some((parent, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            let children = self.load_children(tree, &parent, false).await?;
            loaded += children.len();
            queue.extend(
                children
                    .into_iter()
                    .filter(|c| c.has_children)
                    .map(|c| (Target::Node(c.id), depth + 1)),
            );
        }
        debug!("expand_all: {loaded} nodes");
        Ok(loaded)
    }
}
