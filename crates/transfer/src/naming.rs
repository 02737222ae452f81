//! Collision-free destination names.
//!
//! When the requested name is taken the resolver retries with a numbered
//! suffix before the extension: `report.pdf`, `report (1).pdf`, ...
//! `report (63).pdf`. The numbering is shared with the agent on other
//! platforms, so the visible names must stay identical.

use std::io;
use std::path::{Path, PathBuf};

/// Total number of names tried: the original plus 63 numbered copies.
pub const MAX_ATTEMPTS: u32 = 64;

/// Errors from destination name resolution.
#[derive(Debug, thiserror::Error)]
pub enum NameError {
    #[error("failed creating {name}: more than {} copies exist", MAX_ATTEMPTS - 1)]
    Exhausted { name: String },

    #[error("failed creating {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },
}

/// Returns the file name to try on the given attempt.
///
/// The extension starts at the last `.`; a name without one gets the
/// suffix appended. A leading-dot name such as `.bashrc` is all extension.
pub fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let (base, extension) = match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    };
    format!("{base} ({attempt}){extension}")
}

/// Creates a new file under `dir`, retrying numbered names on collision.
///
/// `create` must fail with [`io::ErrorKind::AlreadyExists`] when the path is
/// taken; that is the only error that moves on to the next name. Any other
/// error aborts immediately.
pub fn create_unique<T, F>(dir: &Path, name: &str, mut create: F) -> Result<(PathBuf, T), NameError>
where
    F: FnMut(&Path) -> io::Result<T>,
{
    for attempt in 0..MAX_ATTEMPTS {
        let path = dir.join(candidate_name(name, attempt));
        match create(&path) {
            Ok(handle) => return Ok((path, handle)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), attempt, "destination exists, trying next name");
            }
            Err(source) => return Err(NameError::Create { path, source }),
        }
    }

    Err(NameError::Exhausted {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs::{File, OpenOptions};

    use super::*;

    fn create_new(path: &Path) -> io::Result<File> {
        OpenOptions::new().write(true).create_new(true).open(path)
    }

    #[test]
    fn first_attempt_keeps_name() {
        assert_eq!(candidate_name("report.pdf", 0), "report.pdf");
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(candidate_name("report.pdf", 1), "report (1).pdf");
        assert_eq!(candidate_name("report.pdf", 63), "report (63).pdf");
    }

    #[test]
    fn only_last_extension_counts() {
        assert_eq!(candidate_name("archive.tar.gz", 2), "archive.tar (2).gz");
    }

    #[test]
    fn no_extension_appends_suffix() {
        assert_eq!(candidate_name("Makefile", 3), "Makefile (3)");
    }

    #[test]
    fn dotfile_is_all_extension() {
        assert_eq!(candidate_name(".bashrc", 1), " (1).bashrc");
    }

    #[test]
    fn trailing_dot() {
        assert_eq!(candidate_name("notes.", 1), "notes (1).");
    }

    #[test]
    fn creates_original_name_when_free() {
        let tmp = tempfile::tempdir().unwrap();
        let (path, _file) = create_unique(tmp.path(), "a.txt", create_new).unwrap();
        assert_eq!(path, tmp.path().join("a.txt"));
        assert!(path.exists());
    }

    #[test]
    fn skips_taken_names() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("a.txt")).unwrap();
        File::create(tmp.path().join("a (1).txt")).unwrap();

        let (path, _file) = create_unique(tmp.path(), "a.txt", create_new).unwrap();
        assert_eq!(path, tmp.path().join("a (2).txt"));
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let tmp = tempfile::tempdir().unwrap();
        let mut seen = HashSet::new();
        let result: Result<(PathBuf, ()), _> = create_unique(tmp.path(), "a.txt", |path| {
            seen.insert(path.to_path_buf());
            Err(io::Error::from(io::ErrorKind::AlreadyExists))
        });

        assert!(matches!(result, Err(NameError::Exhausted { .. })));
        assert_eq!(seen.len(), MAX_ATTEMPTS as usize);
        assert!(seen.contains(&tmp.path().join("a (63).txt")));
        assert!(!seen.contains(&tmp.path().join("a (64).txt")));
    }

    #[test]
    fn other_errors_abort_immediately() {
        let mut calls = 0;
        let result: Result<(PathBuf, ()), _> = create_unique(Path::new("/dest"), "a.txt", |_| {
            calls += 1;
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        });

        assert_eq!(calls, 1);
        match result {
            Err(NameError::Create { path, source }) => {
                assert_eq!(path, Path::new("/dest/a.txt"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected Create error, got {other:?}"),
        }
    }

    #[test]
    fn missing_directory_is_not_retried() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone");
        let result = create_unique(&missing, "a.txt", create_new);
        assert!(matches!(result, Err(NameError::Create { .. })));
    }
}
