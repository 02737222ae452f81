//! Host-to-guest file transfer handling.
//!
//! A [`TransferRegistry`] receives start, data and status messages from the
//! host, validates the announced file, creates it under a collision-free
//! name in the user's downloads directory and streams chunks into it.
//! Filesystem and user-session access go through the [`platform`] traits.

mod metadata;
mod naming;
pub mod platform;
mod registry;
mod task;
mod validation;

use std::path::PathBuf;

use vdxfer_protocol::ReplyResult;

pub use metadata::{NAME_CAPACITY, TransferMetadata, VALUE_CAPACITY, key_string, key_u64};
pub use naming::{MAX_ATTEMPTS, NameError, candidate_name, create_unique};
pub use platform::{Storage, UserSession};
pub use registry::{Dispatch, TransferRegistry};
pub use task::{Outcome, Progress, TransferTask};
pub use validation::{RESERVED_CHARS, validate_file_name};

/// Errors produced by the transfer crate.
///
/// Every variant is local to one transfer; the host only ever sees the
/// coarse [`ReplyResult`] from [`TransferError::reply`].
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("interactive user context unavailable: {0}")]
    UserContext(#[source] std::io::Error),

    #[error("no destination directory available")]
    NoDestination,

    #[error("failed querying free space of {}: {source}", path.display())]
    FreeSpace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("insufficient disk space: {free} bytes free, {required} required")]
    NotEnoughSpace { free: u64, required: u64 },

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("transfer longer than expected: {attempted} bytes, declared {expected}")]
    Overrun { expected: u64, attempted: u64 },

    #[error("short write: {written} of {len} bytes")]
    ShortWrite { written: usize, len: usize },

    #[error("transfer already finalized")]
    Finalized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Maps the error to the result reported to the host.
    pub fn reply(&self) -> ReplyResult {
        match self {
            TransferError::NotEnoughSpace { free, .. } => ReplyResult::NotEnoughSpace {
                disk_free_space: *free,
            },
            _ => ReplyResult::Error,
        }
    }
}
