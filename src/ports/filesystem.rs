//! Filesystem port for reading configuration and policy files.

use std::path::Path;

use super::BoxError;

/// Read-only filesystem access.
///
/// Config and policy loading go through this trait so they can be tested
/// without touching the real disk. Nothing in the crate writes files through
/// it; the jsonl event log owns its own append handle.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, BoxError>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;
}
