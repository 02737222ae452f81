use crate::TransferError;

/// Characters that may not appear anywhere in an incoming file name.
///
/// - `:` streams and devices
/// - `/` `\` path separators
/// - `?` `*` wildcards
/// - `<` `>` `"` `|` reserved by the shell
pub const RESERVED_CHARS: &[char] = &[':', '/', '\\', '?', '*', '<', '>', '"', '|'];

/// Validates a file name announced by the host.
///
/// The name must be a single plain path component. Any reserved character
/// invalidates the whole name; nothing is stripped or truncated.
///
/// Rejects:
/// - Empty names, `.` and `..`
/// - Names containing NUL
/// - Names containing any of [`RESERVED_CHARS`]
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }

    if name == "." || name == ".." {
        return Err(TransferError::InvalidName(format!(
            "directory reference not allowed: {name}"
        )));
    }

    if name.contains('\0') {
        return Err(TransferError::InvalidName("name contains NUL".into()));
    }

    if let Some(c) = name.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(TransferError::InvalidName(format!(
            "reserved character {c:?} in {name}"
        )));
    }

    Ok(())
}
