use std::fmt;

/// Protocol version carried in every frame header.
pub const AGENT_PROTOCOL: u32 = 1;

/// Size of the frame header: protocol, type, opaque, size.
pub const FRAME_HEADER_LEN: usize = 4 + 4 + 8 + 4;

/// Largest payload accepted in a single frame (64 MiB).
///
/// Data chunks from the host are far smaller; anything above this is a
/// corrupt length field rather than a real message.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Metadata group that describes an incoming file.
pub const METADATA_GROUP: &str = "vdagent-file-xfer";

/// Agent message type identifier.
///
/// Only the file transfer family is modelled; other agent message types
/// are reported as unsupported by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    FileXferStart,
    FileXferStatus,
    FileXferData,
}

impl MessageType {
    /// Returns the numeric type code used on the wire.
    pub const fn code(self) -> u32 {
        match self {
            MessageType::FileXferStart => 11,
            MessageType::FileXferStatus => 12,
            MessageType::FileXferData => 13,
        }
    }

    /// Maps a wire type code to a known message type.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            11 => Some(MessageType::FileXferStart),
            12 => Some(MessageType::FileXferStatus),
            13 => Some(MessageType::FileXferData),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::FileXferStart => write!(f, "file_xfer_start"),
            MessageType::FileXferStatus => write!(f, "file_xfer_status"),
            MessageType::FileXferData => write!(f, "file_xfer_data"),
        }
    }
}
