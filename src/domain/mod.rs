//! Domain layer: entities and structural rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod sorter;
pub mod validator;

pub use arena::{NodeData, TreeArena, TreeNode};
pub use entities::*;
pub use error::{RootContext, SourceError, TreeError, TreeResult};
pub use sorter::{SortOrder, Sorter};
pub use validator::{validate_fields, MoveValidator};
