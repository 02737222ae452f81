//! Local implementations of the transfer platform traits.
//!
//! [`LocalStorage`] writes into the user's downloads directory and
//! [`DesktopSession`] opens finished downloads in the file manager.

mod session;
mod storage;

use std::path::PathBuf;

pub use session::{DesktopSession, UserContext};
pub use storage::{LocalStorage, default_download_dir};

/// Expands a `~` prefix to the user's home directory.
///
/// Paths without the prefix, or with no known home, pass through unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        (None, Some(home)) if path == "~" => home,
        _ => PathBuf::from(path),
    }
}
