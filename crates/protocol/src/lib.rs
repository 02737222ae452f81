//! Wire protocol for host-to-guest file transfers.
//!
//! Frames use the guest agent message layout: a fixed little-endian header
//! followed by a typed payload. See [`envelope`] for framing and
//! [`messages`] for the file transfer payloads.

pub mod constants;
pub mod envelope;
pub mod messages;

// Re-export primary types for convenience.
pub use constants::MessageType;
pub use envelope::{AgentMessage, read_frame, write_frame};
pub use messages::{ParseError, ReplyResult, StatusReply, TransferId, XferMessage, XferStatus};

/// Errors produced while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported protocol version {0}")]
    ProtocolVersion(u32),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: u32 },
}
