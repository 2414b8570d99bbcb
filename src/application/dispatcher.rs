//! Maps a node action to its confirmation step and CRUD request.

use std::sync::{Arc, Mutex};

use tracing::{debug, instrument};

use crate::application::loader::{lock, PendingGuard};
use crate::application::tree::{Confirmed, Outcome, Reply, Request, Ticket, Tree};
use crate::domain::{CreateAction, NodeId, NodeKind, Position, Target, TreeError, TreeResult};
use crate::i18n::Locale;
use crate::infrastructure::traits::{ConfirmPrompt, Confirmation, RemoteSource};

pub struct ActionDispatcher {
    source: Arc<dyn RemoteSource>,
    confirmation: Arc<dyn Confirmation>,
}

impl ActionDispatcher {
    pub fn new(source: Arc<dyn RemoteSource>, confirmation: Arc<dyn Confirmation>) -> Self {
        Self {
            source,
            confirmation,
        }
    }

    /// Send the ticket's CRUD request and apply the reply.
    async fn run(&self, tree: &Mutex<Tree>, ticket: Ticket) -> TreeResult<Outcome> {
        let request = ticket
            .crud_request()
            .ok_or_else(|| TreeError::validation("ticket carries no CRUD request"))?;
        debug!("run: {} op={}", request.action(), ticket.id());

        let guard = PendingGuard::new(tree, ticket.id());
        let reply = self.source.execute(&request).await;
        guard.disarm();

        lock(tree).complete(ticket, reply.map(Reply::Crud))
    }

    #[instrument(level = "debug", skip(self, tree))]
    pub async fn create(
        &self,
        tree: &Mutex<Tree>,
        action: CreateAction,
        anchor: &Target,
        name: &str,
        kind: NodeKind,
    ) -> TreeResult<Outcome> {
        let ticket = lock(tree).begin_create(action, anchor, name, kind)?;
        self.run(tree, ticket).await
    }

    #[instrument(level = "debug", skip(self, tree))]
    pub async fn update(
        &self,
        tree: &Mutex<Tree>,
        id: &NodeId,
        name: &str,
        kind: NodeKind,
    ) -> TreeResult<Outcome> {
        let ticket = lock(tree).begin_update(id, name, kind)?;
        self.run(tree, ticket).await
    }

    /// Ask for confirmation, then delete `id` with its whole subtree.
    ///
    /// A declined prompt sends nothing and yields [`Outcome::Declined`].
    #[instrument(level = "debug", skip(self, tree, locale))]
    pub async fn delete(&self, tree: &Mutex<Tree>, id: &NodeId, locale: &Locale) -> TreeResult<Outcome> {
        let ticket = lock(tree).begin_delete(id)?;
        let prompt = match ticket.request() {
            Request::Delete {
                id,
                name,
                subtree_size,
            } => ConfirmPrompt {
                node: id.clone(),
                name: name.clone(),
                subtree_size: *subtree_size,
                message: locale.delete_prompt(name, *subtree_size),
                confirm_label: locale.actions.delete.clone(),
                cancel_label: locale.cancel.clone(),
            },
            other => {
                let error = TreeError::validation(format!("expected delete ticket, got {other:?}"));
                lock(tree).discard(ticket.id());
                return Err(error);
            }
        };

        let guard = PendingGuard::new(tree, ticket.id());
        let accepted = self.confirmation.confirm(&prompt).await;
        guard.disarm();

        let confirmed = lock(tree).confirm(ticket, accepted);
        match confirmed {
            Confirmed::Proceed(ticket) => self.run(tree, ticket).await,
            Confirmed::Declined => Ok(Outcome::Declined),
            Confirmed::Abandoned => Ok(Outcome::Abandoned),
        }
    }

    #[instrument(level = "debug", skip(self, tree))]
    pub async fn move_node(
        &self,
        tree: &Mutex<Tree>,
        source: &NodeId,
        target: &Target,
        position: Position,
    ) -> TreeResult<Outcome> {
        let ticket = lock(tree).begin_move(source, target, position)?;
        self.run(tree, ticket).await
    }

    /// Complete the current drag gesture at its recorded drop candidate.
    pub async fn drop_dragged(&self, tree: &Mutex<Tree>) -> TreeResult<Outcome> {
        let ticket = lock(tree).drop_dragged()?;
        self.run(tree, ticket).await
    }
}
