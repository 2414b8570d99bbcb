//! Path context for failed data-file I/O.

use std::fmt;
use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Step of reading or saving a data file that touched the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Read,
    /// Creating the temp file a save is staged in
    Stage,
    Write,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileAction::Read => "read data file",
            FileAction::Stage => "stage data file in",
            FileAction::Write => "write data file",
        })
    }
}

pub trait IoResultExt<T> {
    /// Attach the failed step and its path to an I/O error.
    ///
    /// ```ignore
    /// let content = std::fs::read_to_string(path).with_path_context(FileAction::Read, path)?;
    /// ```
    fn with_path_context(self, action: FileAction, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: FileAction, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{action}: {}", path.display()),
            source: Box::new(e),
        })
    }
}
