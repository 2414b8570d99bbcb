//! Async facade over one tree instance.
//!
//! Each [`TreeTable`] is an explicit, self-contained instance; any number of
//! them may coexist. The inner mutex is never held across an await.

use std::sync::{Arc, Mutex};

use tracing::instrument;

use crate::application::dispatcher::ActionDispatcher;
use crate::application::loader::{lock, Loader};
use crate::application::tree::{OperationId, Outcome, Tree, TreeOptions};
use crate::config::Settings;
use crate::domain::{
    CreateAction, KindIcons, MovePlan, Node, NodeId, NodeKind, Position, Sorter, Target,
    TreeError, TreeResult,
};
use crate::i18n::{Catalog, Locale, FALLBACK_LOCALE};
use crate::infrastructure::traits::{Confirmation, RemoteSource, TreeObserver};

/// Construction-time configuration of a tree-table.
#[derive(Clone)]
pub struct TreeConfig {
    pub source: Arc<dyn RemoteSource>,
    pub sort: Sorter,
    /// Kind to icon; non-empty restricts the allowed kinds
    pub types: KindIcons,
    pub allow_root: bool,
}

impl TreeConfig {
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self {
            source,
            sort: Sorter::default(),
            types: KindIcons::new(),
            allow_root: true,
        }
    }

    pub fn from_settings(settings: &Settings, source: Arc<dyn RemoteSource>) -> Self {
        Self {
            source,
            sort: Sorter::from_order(settings.sort),
            types: settings.types.clone(),
            allow_root: settings.allow_root,
        }
    }

    pub fn with_sorter(mut self, sort: Sorter) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_types(mut self, types: KindIcons) -> Self {
        self.types = types;
        self
    }

    pub fn with_allow_root(mut self, allow_root: bool) -> Self {
        self.allow_root = allow_root;
        self
    }
}

pub struct TreeTable {
    tree: Mutex<Tree>,
    loader: Loader,
    dispatcher: ActionDispatcher,
    locale: Locale,
}

impl TreeTable {
    pub fn new(config: TreeConfig, confirmation: Arc<dyn Confirmation>) -> Self {
        let locale = Catalog::builtin()
            .unwrap_or_else(|_| Catalog::empty())
            .resolve(FALLBACK_LOCALE);
        let options = TreeOptions {
            sorter: config.sort,
            types: config.types,
            allow_root: config.allow_root,
        };
        Self {
            tree: Mutex::new(Tree::new(options)),
            loader: Loader::new(config.source.clone()),
            dispatcher: ActionDispatcher::new(config.source, confirmation),
            locale,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn subscribe(&self, observer: Arc<dyn TreeObserver>) {
        lock(&self.tree).subscribe(observer);
    }

    pub async fn load_children(&self, parent: &Target, force_reload: bool) -> TreeResult<Vec<Node>> {
        self.loader
            .load_children(&self.tree, parent, force_reload)
            .await
    }

    pub async fn expand_all(&self, max_depth: Option<usize>) -> TreeResult<usize> {
        self.loader.expand_all(&self.tree, max_depth).await
    }

    pub async fn create(
        &self,
        action: CreateAction,
        anchor: &Target,
        name: &str,
        kind: NodeKind,
    ) -> TreeResult<Outcome> {
        self.dispatcher
            .create(&self.tree, action, anchor, name, kind)
            .await
    }

    pub async fn update(&self, id: &NodeId, name: &str, kind: NodeKind) -> TreeResult<Outcome> {
        self.dispatcher.update(&self.tree, id, name, kind).await
    }

    pub async fn delete(&self, id: &NodeId) -> TreeResult<Outcome> {
        self.dispatcher.delete(&self.tree, id, &self.locale).await
    }

    pub async fn move_node(
        &self,
        source: &NodeId,
        target: &Target,
        position: Position,
    ) -> TreeResult<Outcome> {
        self.dispatcher
            .move_node(&self.tree, source, target, position)
            .await
    }

    pub fn start_drag(&self, source: &NodeId) -> TreeResult<()> {
        lock(&self.tree).start_drag(source)
    }

    pub fn drag_over(&self, target: &Target, position: Position) -> TreeResult<MovePlan> {
        lock(&self.tree).drag_over(target, position)
    }

    pub fn cancel_drag(&self) {
        lock(&self.tree).cancel_drag();
    }

    pub async fn drop_dragged(&self) -> TreeResult<Outcome> {
        self.dispatcher.drop_dragged(&self.tree).await
    }

    /// Abandon the operation holding `target`, if any.
    #[instrument(level = "debug", skip(self))]
    pub fn abandon(&self, target: &Target) -> Option<OperationId> {
        lock(&self.tree).abandon_target(target)
    }

    pub fn get(&self, id: &NodeId) -> Option<Node> {
        lock(&self.tree).get(id)
    }

    pub fn children(&self, parent: &Target) -> Vec<Node> {
        lock(&self.tree).get_children(parent)
    }

    pub fn len(&self) -> usize {
        lock(&self.tree).arena().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the coordinator.
    pub fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(&lock(&self.tree))
    }

    /// Localized text for an error, falling back to its display form.
    pub fn message_for(&self, error: &TreeError) -> String {
        self.locale
            .message_for(error)
            .map(String::from)
            .unwrap_or_else(|| error.to_string())
    }

    /// Loaded forest as an indented tree, nodes with unfetched children marked `…`.
    pub fn render(&self, root_label: &str) -> String {
        let tree = lock(&self.tree);
        let types = &tree.options().types;
        tree.arena()
            .to_tree_string(root_label, |node| {
                let icon = types
                    .get(&node.data.kind)
                    .map(|i| format!("{i} "))
                    .unwrap_or_default();
                let more = if node.data.has_children && !node.children_loaded {
                    " …"
                } else {
                    ""
                };
                format!("{icon}{} [{}]{more}", node.data.name, node.data.id)
            })
            .to_string()
    }
}
