//! Minimal key file reader for transfer metadata.
//!
//! The host describes a file as a key file blob:
//!
//! ```text
//! [vdagent-file-xfer]
//! name=report.pdf
//! size=1024
//! ```
//!
//! Only `key=value` lines without surrounding spaces are understood. The
//! blob comes from an untrusted peer, so every lookup is bounded by an
//! explicit capacity.

use vdxfer_protocol::constants::METADATA_GROUP;

use crate::TransferError;

/// Capacity of the file name field; values must be strictly shorter.
pub const NAME_CAPACITY: usize = 260;

/// Capacity of any other value (numeric fields included).
pub const VALUE_CAPACITY: usize = 256;

/// Name and declared size of an incoming file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMetadata {
    pub name: String,
    pub size: u64,
}

impl TransferMetadata {
    /// Extracts `name` and `size` from a raw start payload.
    ///
    /// The blob ends at its first NUL byte (if any) and must be UTF-8.
    pub fn parse(blob: &[u8]) -> Result<Self, TransferError> {
        let end = blob.iter().position(|&b| b == 0).unwrap_or(blob.len());
        let text = std::str::from_utf8(&blob[..end])
            .map_err(|e| TransferError::InvalidMetadata(format!("not UTF-8: {e}")))?;

        let name = key_string(text, METADATA_GROUP, "name", NAME_CAPACITY)
            .ok_or_else(|| TransferError::InvalidMetadata("missing or oversized name".into()))?;
        let size = key_u64(text, METADATA_GROUP, "size")
            .ok_or_else(|| TransferError::InvalidMetadata("missing or malformed size".into()))?;

        Ok(Self {
            name: name.to_string(),
            size,
        })
    }
}

/// Looks up `key` inside the first `[group]` section of `data`.
///
/// The value runs from after `key=` to the next line break. Returns `None`
/// when the group or key is missing, the key belongs to a later group, the
/// line is not terminated, or the value would not fit in `capacity`.
pub fn key_string<'a>(data: &'a str, group: &str, key: &str, capacity: usize) -> Option<&'a str> {
    let group_prefix = format!("[{group}]");
    let section = &data[data.find(&group_prefix)?..];

    let key_prefix = format!("\n{key}=");
    let key_pos = section.find(&key_prefix)?;

    let header_end = group_prefix.len();
    if let Some(next_group) = section[header_end..].find("\n[")
        && key_pos > header_end + next_group
    {
        return None;
    }

    let start = key_pos + key_prefix.len();
    let len = section[start..].find('\n')?;
    if len >= capacity {
        return None;
    }
    Some(&section[start..start + len])
}

/// Looks up `key` and parses it as a base-10 `u64`.
pub fn key_u64(data: &str, group: &str, key: &str) -> Option<u64> {
    key_string(data, group, key, VALUE_CAPACITY)?.parse().ok()
}
