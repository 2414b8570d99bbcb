//! Application layer: tree coordination and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod dispatcher;
pub mod error;
pub mod error_ext;
pub mod events;
pub mod loader;
pub mod table;
pub mod tree;

pub use dispatcher::ActionDispatcher;
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{FileAction, IoResultExt};
pub use events::TreeEvent;
pub use loader::Loader;
pub use table::{TreeConfig, TreeTable};
pub use tree::{
    ActionState, Confirmed, LoadStart, OperationId, Outcome, Reply, Request, Ticket, Tree,
    TreeOptions,
};
