//! File transfer payloads: start, data and status.
//!
//! ```text
//! START:  [4 bytes LE: id][metadata text, usually NUL-terminated]
//! STATUS: [4 bytes LE: id][4 bytes LE: result][8 bytes LE: disk_free_space, NotEnoughSpace only]
//! DATA:   [4 bytes LE: id][8 bytes LE: size][size bytes: chunk]
//! ```

use std::fmt;

use crate::constants::MessageType;

/// Sender-chosen identifier scoping one file transfer.
pub type TransferId = u32;

/// Result code carried by a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XferStatus {
    CanSendData,
    Cancelled,
    Error,
    Success,
    NotEnoughSpace,
    /// A result code this agent does not interpret.
    Other(u32),
}

impl XferStatus {
    /// Returns the numeric result code used on the wire.
    pub const fn code(self) -> u32 {
        match self {
            XferStatus::CanSendData => 0,
            XferStatus::Cancelled => 1,
            XferStatus::Error => 2,
            XferStatus::Success => 3,
            XferStatus::NotEnoughSpace => 4,
            XferStatus::Other(code) => code,
        }
    }

    /// Maps a wire result code, preserving unknown codes.
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => XferStatus::CanSendData,
            1 => XferStatus::Cancelled,
            2 => XferStatus::Error,
            3 => XferStatus::Success,
            4 => XferStatus::NotEnoughSpace,
            other => XferStatus::Other(other),
        }
    }
}

impl fmt::Display for XferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XferStatus::CanSendData => write!(f, "can-send-data"),
            XferStatus::Cancelled => write!(f, "cancelled"),
            XferStatus::Error => write!(f, "error"),
            XferStatus::Success => write!(f, "success"),
            XferStatus::NotEnoughSpace => write!(f, "not-enough-space"),
            XferStatus::Other(code) => write!(f, "unknown({code})"),
        }
    }
}

/// An inbound file transfer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XferMessage {
    /// Announces a new transfer; `metadata` is the raw key file text.
    Start { id: TransferId, metadata: Vec<u8> },
    /// One chunk of file content, appended in order.
    Data { id: TransferId, data: Vec<u8> },
    /// Peer-initiated status change (only cancel is meaningful).
    Status { id: TransferId, result: XferStatus },
}

impl XferMessage {
    /// Returns the transfer this message belongs to.
    pub fn id(&self) -> TransferId {
        match self {
            XferMessage::Start { id, .. }
            | XferMessage::Data { id, .. }
            | XferMessage::Status { id, .. } => *id,
        }
    }

    /// Returns the wire type of this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            XferMessage::Start { .. } => MessageType::FileXferStart,
            XferMessage::Data { .. } => MessageType::FileXferData,
            XferMessage::Status { .. } => MessageType::FileXferStatus,
        }
    }

    /// Decodes a payload of the given type.
    pub fn parse(msg_type: MessageType, payload: &[u8]) -> Result<Self, ParseError> {
        let mut rest = payload;
        let id = take_u32(&mut rest, msg_type)?;
        match msg_type {
            MessageType::FileXferStart => Ok(XferMessage::Start {
                id,
                metadata: rest.to_vec(),
            }),
            MessageType::FileXferStatus => {
                let result = XferStatus::from_code(take_u32(&mut rest, msg_type)?);
                Ok(XferMessage::Status { id, result })
            }
            MessageType::FileXferData => {
                let declared = take_u64(&mut rest, msg_type)?;
                let size = usize::try_from(declared)
                    .ok()
                    .filter(|&size| size <= rest.len())
                    .ok_or(ParseError::DataTruncated {
                        declared,
                        got: rest.len(),
                    })?;
                Ok(XferMessage::Data {
                    id,
                    data: rest[..size].to_vec(),
                })
            }
        }
    }

    /// Encodes the payload (without frame header).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            XferMessage::Start { id, metadata } => {
                let mut buf = Vec::with_capacity(4 + metadata.len());
                buf.extend_from_slice(&id.to_le_bytes());
                buf.extend_from_slice(metadata);
                buf
            }
            XferMessage::Data { id, data } => {
                let mut buf = Vec::with_capacity(12 + data.len());
                buf.extend_from_slice(&id.to_le_bytes());
                buf.extend_from_slice(&(data.len() as u64).to_le_bytes());
                buf.extend_from_slice(data);
                buf
            }
            XferMessage::Status { id, result } => {
                let mut buf = Vec::with_capacity(8);
                buf.extend_from_slice(&id.to_le_bytes());
                buf.extend_from_slice(&result.code().to_le_bytes());
                buf
            }
        }
    }
}

/// Outcome reported back to the host for one transfer.
///
/// The free space figure only exists alongside `NotEnoughSpace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyResult {
    CanSendData,
    Success,
    Error,
    Cancelled,
    NotEnoughSpace { disk_free_space: u64 },
}

impl ReplyResult {
    /// Returns the status code for this result.
    pub fn status(&self) -> XferStatus {
        match self {
            ReplyResult::CanSendData => XferStatus::CanSendData,
            ReplyResult::Success => XferStatus::Success,
            ReplyResult::Error => XferStatus::Error,
            ReplyResult::Cancelled => XferStatus::Cancelled,
            ReplyResult::NotEnoughSpace { .. } => XferStatus::NotEnoughSpace,
        }
    }
}

/// Status message sent from the agent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReply {
    pub id: TransferId,
    pub result: ReplyResult,
}

impl StatusReply {
    pub fn new(id: TransferId, result: ReplyResult) -> Self {
        Self { id, result }
    }

    /// Encodes the reply as a status payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.result.status().code().to_le_bytes());
        if let ReplyResult::NotEnoughSpace { disk_free_space } = self.result {
            buf.extend_from_slice(&disk_free_space.to_le_bytes());
        }
        buf
    }
}

/// Errors from payload decoding.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{kind} payload too short: need {need} bytes, got {got}")]
    TooShort {
        kind: MessageType,
        need: usize,
        got: usize,
    },

    #[error("data chunk truncated: declared {declared} bytes, got {got}")]
    DataTruncated { declared: u64, got: usize },
}

fn take_u32(buf: &mut &[u8], kind: MessageType) -> Result<u32, ParseError> {
    let (head, tail) = buf.split_first_chunk::<4>().ok_or(ParseError::TooShort {
        kind,
        need: 4,
        got: buf.len(),
    })?;
    *buf = tail;
    Ok(u32::from_le_bytes(*head))
}

fn take_u64(buf: &mut &[u8], kind: MessageType) -> Result<u64, ParseError> {
    let (head, tail) = buf.split_first_chunk::<8>().ok_or(ParseError::TooShort {
        kind,
        need: 8,
        got: buf.len(),
    })?;
    *buf = tail;
    Ok(u64::from_le_bytes(*head))
}
