use std::io::Write;
use std::path::{Path, PathBuf};

use vdxfer_protocol::TransferId;

use crate::TransferError;
use crate::platform::Storage;

/// How a transfer ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Close the handle and keep the file.
    Success,
    /// Close the handle and delete the partial file.
    Abort,
}

/// Accounting state after an accepted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More bytes are expected.
    Pending,
    /// Exactly the declared size has been written.
    Complete,
}

/// One in-flight transfer: an open destination file and its byte count.
///
/// The handle is owned exclusively by the task until [`finalize`] runs,
/// which happens at most once.
///
/// [`finalize`]: TransferTask::finalize
#[derive(Debug)]
pub struct TransferTask<F> {
    id: TransferId,
    file: Option<F>,
    expected_size: u64,
    bytes_written: u64,
    path: PathBuf,
}

impl<F: Write> TransferTask<F> {
    /// Wraps a freshly created destination file.
    pub fn new(id: TransferId, file: F, expected_size: u64, path: PathBuf) -> Self {
        Self {
            id,
            file: Some(file),
            expected_size,
            bytes_written: 0,
            path,
        }
    }

    /// Appends one chunk.
    ///
    /// A chunk that would exceed the declared size is rejected before any
    /// byte is written. The byte count only advances after a full write, so
    /// `bytes_written <= expected_size` holds after every accepted chunk.
    pub fn append(&mut self, chunk: &[u8]) -> Result<Progress, TransferError> {
        let file = self.file.as_mut().ok_or(TransferError::Finalized)?;

        let attempted = self.bytes_written.saturating_add(chunk.len() as u64);
        if attempted > self.expected_size {
            return Err(TransferError::Overrun {
                expected: self.expected_size,
                attempted,
            });
        }

        let written = file.write(chunk)?;
        if written != chunk.len() {
            return Err(TransferError::ShortWrite {
                written,
                len: chunk.len(),
            });
        }

        self.bytes_written = attempted;
        tracing::trace!(id = self.id, bytes_written = attempted, "chunk written");

        if attempted == self.expected_size {
            Ok(Progress::Complete)
        } else {
            Ok(Progress::Pending)
        }
    }

    /// Closes the handle and keeps or deletes the file.
    ///
    /// Returns `false` if the task was already finalized; the second call
    /// has no effect.
    pub fn finalize<S>(&mut self, outcome: Outcome, storage: &S) -> bool
    where
        S: Storage<File = F>,
    {
        let Some(file) = self.file.take() else {
            return false;
        };
        drop(file);

        if outcome == Outcome::Abort
            && let Err(e) = storage.remove(&self.path)
        {
            tracing::warn!(
                id = self.id,
                path = %self.path.display(),
                error = %e,
                "failed to delete partial file"
            );
        }
        true
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns `true` until the task is finalized.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}
