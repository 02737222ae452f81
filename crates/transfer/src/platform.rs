//! Operating system capabilities consumed by the transfer state machine.
//!
//! Implementors provide the filesystem and desktop-session access; the
//! registry only sequences calls. Default implementations live in
//! `vdxfer-file-ops`; tests substitute in-memory or tempdir-backed fakes.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Filesystem access for destination files.
pub trait Storage {
    /// Open handle to a destination file. Dropping it closes the file.
    type File: Write;

    /// Returns the directory incoming files are written to.
    ///
    /// Called once per transfer; implementations must not cache the result
    /// since the interactive user may change between transfers.
    fn downloads_dir(&self) -> Option<PathBuf>;

    /// Returns the bytes available to the user in `dir`.
    fn free_space(&self, dir: &Path) -> io::Result<u64>;

    /// Creates `path`, failing with [`io::ErrorKind::AlreadyExists`] if it exists.
    fn create_exclusive(&self, path: &Path) -> io::Result<Self::File>;

    /// Deletes a destination file.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Access to the interactive desktop user.
pub trait UserSession {
    /// Held while acting as the interactive user; dropping it reverts.
    type Guard;

    /// Starts acting as the logged-in desktop user.
    fn acquire_context(&self) -> io::Result<Self::Guard>;

    /// Shows `dir` to the user, typically in a file manager window.
    fn reveal(&self, dir: &Path) -> io::Result<()>;
}
