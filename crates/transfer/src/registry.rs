//! Dispatch of inbound transfer messages.
//!
//! Every message is handled to completion before the next one, so the
//! registry needs no locking: all mutation goes through `&mut self`.

use std::collections::HashMap;
use std::path::Path;

use vdxfer_protocol::{
    AgentMessage, MessageType, ReplyResult, StatusReply, TransferId, XferMessage, XferStatus,
};

use crate::TransferError;
use crate::metadata::TransferMetadata;
use crate::naming::create_unique;
use crate::platform::{Storage, UserSession};
use crate::task::{Outcome, Progress, TransferTask};
use crate::validation::validate_file_name;

/// Result of dispatching one framed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// `false` for message types this registry does not process.
    pub handled: bool,
    /// Status to send back to the host, if any.
    pub reply: Option<StatusReply>,
}

impl Dispatch {
    fn unhandled() -> Self {
        Self {
            handled: false,
            reply: None,
        }
    }
}

/// Active transfers keyed by the host-assigned id.
pub struct TransferRegistry<S: Storage, U: UserSession> {
    storage: S,
    session: U,
    tasks: HashMap<TransferId, TransferTask<S::File>>,
}

impl<S: Storage, U: UserSession> TransferRegistry<S, U> {
    pub fn new(storage: S, session: U) -> Self {
        Self {
            storage,
            session,
            tasks: HashMap::new(),
        }
    }

    /// Decodes and dispatches a framed message.
    ///
    /// Non-transfer message types and undecodable payloads are not handled
    /// and produce no reply.
    pub fn dispatch_frame(&mut self, frame: &AgentMessage) -> Dispatch {
        match frame.xfer() {
            Ok(Some(message)) => {
                tracing::trace!(id = message.id(), kind = %message.message_type(), "dispatching");
                Dispatch {
                    handled: true,
                    reply: self.dispatch(message),
                }
            }
            Ok(None) => {
                tracing::debug!(
                    msg_type = frame.msg_type,
                    size = frame.data.len(),
                    "unsupported message type"
                );
                Dispatch::unhandled()
            }
            Err(e) => {
                let kind = MessageType::from_code(frame.msg_type);
                tracing::warn!(?kind, error = %e, "malformed file transfer message");
                Dispatch::unhandled()
            }
        }
    }

    /// Handles one transfer message and returns the status to send, if any.
    pub fn dispatch(&mut self, message: XferMessage) -> Option<StatusReply> {
        match message {
            XferMessage::Start { id, metadata } => Some(self.handle_start(id, &metadata)),
            XferMessage::Data { id, data } => self.handle_data(id, &data),
            XferMessage::Status { id, result } => {
                self.handle_status(id, result);
                None
            }
        }
    }

    /// Aborts every active transfer, deleting the partial files.
    ///
    /// Returns the number of transfers aborted.
    pub fn reset(&mut self) -> usize {
        let count = self.tasks.len();
        for (id, mut task) in self.tasks.drain() {
            tracing::info!(id, path = %task.path().display(), "aborting transfer on reset");
            task.finalize(Outcome::Abort, &self.storage);
        }
        count
    }

    /// Number of transfers currently in flight.
    pub fn active_transfers(&self) -> usize {
        self.tasks.len()
    }

    pub fn contains(&self, id: TransferId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Returns the in-flight task for `id`.
    pub fn task(&self, id: TransferId) -> Option<&TransferTask<S::File>> {
        self.tasks.get(&id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn session(&self) -> &U {
        &self.session
    }

    fn handle_start(&mut self, id: TransferId, metadata: &[u8]) -> StatusReply {
        let task = match self.open_destination(id, metadata) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(id, error = %e, "file transfer rejected");
                return StatusReply::new(id, e.reply());
            }
        };

        tracing::info!(
            id,
            path = %task.path().display(),
            size = task.expected_size(),
            "receiving file"
        );
        // A reused id replaces the older transfer.
        if let Some(mut displaced) = self.tasks.insert(id, task) {
            tracing::warn!(
                id,
                path = %displaced.path().display(),
                "transfer id reused while active, aborting previous transfer"
            );
            displaced.finalize(Outcome::Abort, &self.storage);
        }
        StatusReply::new(id, ReplyResult::CanSendData)
    }

    /// Runs the start checks in order; the first failure wins.
    fn open_destination(
        &self,
        id: TransferId,
        metadata: &[u8],
    ) -> Result<TransferTask<S::File>, TransferError> {
        let meta = TransferMetadata::parse(metadata)?;
        tracing::info!(id, name = %meta.name, size = meta.size, "file transfer requested");

        validate_file_name(&meta.name)?;

        let _context = self
            .session
            .acquire_context()
            .map_err(TransferError::UserContext)?;

        let dir = self
            .storage
            .downloads_dir()
            .ok_or(TransferError::NoDestination)?;

        let free = self
            .storage
            .free_space(&dir)
            .map_err(|source| TransferError::FreeSpace {
                path: dir.clone(),
                source,
            })?;
        if free < meta.size {
            return Err(TransferError::NotEnoughSpace {
                free,
                required: meta.size,
            });
        }

        let (path, file) = create_unique(&dir, &meta.name, |path| {
            self.storage.create_exclusive(path)
        })?;

        Ok(TransferTask::new(id, file, meta.size, path))
    }

    fn handle_data(&mut self, id: TransferId, data: &[u8]) -> Option<StatusReply> {
        let Some(task) = self.tasks.get_mut(&id) else {
            tracing::debug!(id, "data for unknown transfer ignored");
            return None;
        };

        match task.append(data) {
            Ok(Progress::Pending) => None,
            Ok(Progress::Complete) => {
                let mut task = self.tasks.remove(&id)?;
                task.finalize(Outcome::Success, &self.storage);
                tracing::info!(id, path = %task.path().display(), size = task.bytes_written(), "transfer completed");
                self.reveal(task.path());
                Some(StatusReply::new(id, ReplyResult::Success))
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "transfer failed");
                if let Some(mut task) = self.tasks.remove(&id) {
                    task.finalize(Outcome::Abort, &self.storage);
                }
                Some(StatusReply::new(id, ReplyResult::Error))
            }
        }
    }

    fn handle_status(&mut self, id: TransferId, result: XferStatus) {
        tracing::info!(id, %result, "transfer status received");
        if result != XferStatus::Cancelled {
            tracing::warn!(id, %result, "only cancel is permitted, status ignored");
            return;
        }

        match self.tasks.remove(&id) {
            Some(mut task) => {
                task.finalize(Outcome::Abort, &self.storage);
                tracing::info!(id, path = %task.path().display(), "transfer cancelled by host");
            }
            None => tracing::warn!(id, "cancel for unknown transfer ignored"),
        }
    }

    /// Shows the folder holding a finished file; failures are only logged.
    fn reveal(&self, path: &Path) {
        let Some(dir) = path.parent() else {
            return;
        };
        let _context = match self.session.acquire_context() {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "cannot reveal download folder");
                return;
            }
        };
        if let Err(e) = self.session.reveal(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to open download folder");
        }
    }
}
