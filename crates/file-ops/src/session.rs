//! The interactive desktop user.
//!
//! The agent runs inside the user's desktop session, so the interactive
//! context is the current process identity. Acquiring it only confirms a
//! home directory exists to write into.

use std::io;
use std::path::{Path, PathBuf};

use vdxfer_transfer::UserSession;

/// Proof of an interactive user, held while acting on their behalf.
#[derive(Debug)]
pub struct UserContext {
    home: PathBuf,
}

impl UserContext {
    pub fn home(&self) -> &Path {
        &self.home
    }
}

/// Session of the logged-in desktop user.
#[derive(Debug, Clone)]
pub struct DesktopSession {
    reveal: bool,
}

impl DesktopSession {
    /// `reveal` controls whether finished downloads are shown in the file manager.
    pub fn new(reveal: bool) -> Self {
        Self { reveal }
    }
}

impl Default for DesktopSession {
    fn default() -> Self {
        Self::new(true)
    }
}

impl UserSession for DesktopSession {
    type Guard = UserContext;

    fn acquire_context(&self) -> io::Result<UserContext> {
        let home = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no home directory for current user")
        })?;
        tracing::trace!(home = %home.display(), "acting as desktop user");
        Ok(UserContext { home })
    }

    fn reveal(&self, dir: &Path) -> io::Result<()> {
        if !self.reveal {
            tracing::debug!(dir = %dir.display(), "folder reveal disabled");
            return Ok(());
        }
        open::that(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_points_at_home() {
        let session = DesktopSession::default();
        match (session.acquire_context(), dirs::home_dir()) {
            (Ok(ctx), Some(home)) => assert_eq!(ctx.home(), home),
            (Err(e), None) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            (result, home) => panic!("context {result:?} disagrees with home {home:?}"),
        }
    }

    #[test]
    fn disabled_reveal_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let session = DesktopSession::new(false);
        session.reveal(tmp.path()).unwrap();
    }
}
