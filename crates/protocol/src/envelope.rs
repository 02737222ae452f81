//! Frame layer shared by every agent message.
//!
//! ```text
//! [4 bytes LE: protocol][4 bytes LE: type][8 bytes LE: opaque][4 bytes LE: size]
//! [size bytes: payload]
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::WireError;
use crate::constants::{AGENT_PROTOCOL, FRAME_HEADER_LEN, MAX_FRAME_SIZE, MessageType};
use crate::messages::{ParseError, XferMessage};

/// One framed agent message with its payload still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMessage {
    pub msg_type: u32,
    pub opaque: u64,
    pub data: Vec<u8>,
}

impl AgentMessage {
    /// Decodes the payload if this is a file transfer message.
    ///
    /// Returns `Ok(None)` for message types outside the file transfer family.
    pub fn xfer(&self) -> Result<Option<XferMessage>, ParseError> {
        match MessageType::from_code(self.msg_type) {
            Some(kind) => XferMessage::parse(kind, &self.data).map(Some),
            None => Ok(None),
        }
    }
}

/// Reads one frame from the stream.
///
/// Returns `None` when the stream ends cleanly on a frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<AgentMessage>, WireError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let n = reader.read(&mut header).await?;
    if n == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut header[n..]).await?;

    let mut fields = &header[..];
    let protocol = fields.read_u32_le().await?;
    let msg_type = fields.read_u32_le().await?;
    let opaque = fields.read_u64_le().await?;
    let size = fields.read_u32_le().await?;

    if protocol != AGENT_PROTOCOL {
        return Err(WireError::ProtocolVersion(protocol));
    }
    if size > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: u64::from(size),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut data = vec![0u8; size as usize];
    reader.read_exact(&mut data).await?;

    Ok(Some(AgentMessage {
        msg_type,
        opaque,
        data,
    }))
}

/// Writes one frame and flushes the stream.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg_type: MessageType,
    payload: &[u8],
) -> Result<(), WireError> {
    let size = match u32::try_from(payload.len()) {
        Ok(size) if size <= MAX_FRAME_SIZE => size,
        _ => {
            return Err(WireError::FrameTooLarge {
                size: payload.len() as u64,
                max: MAX_FRAME_SIZE,
            });
        }
    };

    writer.write_u32_le(AGENT_PROTOCOL).await?;
    writer.write_u32_le(msg_type.code()).await?;
    writer.write_u64_le(0).await?;
    writer.write_u32_le(size).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
