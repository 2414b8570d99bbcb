//! Hierarchical tree-table manager.
//!
//! Lazily loads children from a remote source, keeps sibling order sorted,
//! validates drag-and-drop moves and dispatches create/update/delete/move
//! actions with per-subtree operation locks.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod i18n;
pub mod infrastructure;
pub mod util;
