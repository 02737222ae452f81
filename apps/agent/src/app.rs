//! Frame loop between the host channel and the transfer registry.

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use vdxfer_file_ops::{DesktopSession, LocalStorage};
use vdxfer_protocol::{MessageType, read_frame, write_frame};
use vdxfer_transfer::{Storage, TransferRegistry, UserSession};

use crate::config::Config;

/// Runs the agent until the channel closes or shutdown is requested.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let port = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&config.port_path)
        .await
        .with_context(|| format!("failed to open {}", config.port_path.display()))?;
    let (mut reader, mut writer) = tokio::io::split(port);

    let storage = LocalStorage::new(config.download_dir());
    let session = DesktopSession::new(config.reveal_on_success);
    let mut registry = TransferRegistry::new(storage, session);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received, shutting down");
            shutdown.cancel();
        }
    });

    tracing::info!("agent ready");
    serve(&mut reader, &mut writer, &mut registry, &cancel).await
}

/// Dispatches inbound frames and writes status replies back.
///
/// Returns when the channel reaches end of stream, `cancel` fires or the
/// channel fails. Every transfer still in flight is aborted on the way out.
pub async fn serve<R, W, S, U>(
    reader: &mut R,
    writer: &mut W,
    registry: &mut TransferRegistry<S, U>,
    cancel: &CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Storage,
    U: UserSession,
{
    let result = pump(reader, writer, registry, cancel).await;

    let aborted = registry.reset();
    if aborted > 0 {
        tracing::warn!(aborted, "incomplete transfers aborted");
    }
    result
}

async fn pump<R, W, S, U>(
    reader: &mut R,
    writer: &mut W,
    registry: &mut TransferRegistry<S, U>,
    cancel: &CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Storage,
    U: UserSession,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("shutdown signal received");
                return Ok(());
            }
            frame = read_frame(reader) => frame.context("failed to read frame")?,
        };

        let Some(frame) = frame else {
            tracing::info!("host channel closed");
            return Ok(());
        };

        let dispatch = registry.dispatch_frame(&frame);
        if let Some(reply) = dispatch.reply {
            tracing::debug!(id = reply.id, result = %reply.result.status(), "sending status");
            write_frame(writer, MessageType::FileXferStatus, &reply.encode())
                .await
                .context("failed to write status reply")?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use tokio::io::AsyncWriteExt;
    use vdxfer_protocol::{XferMessage, XferStatus};

    use super::*;

    struct HeadlessSession;

    impl UserSession for HeadlessSession {
        type Guard = ();

        fn acquire_context(&self) -> io::Result<()> {
            Ok(())
        }

        fn reveal(&self, _dir: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn registry(dir: &Path) -> TransferRegistry<LocalStorage, HeadlessSession> {
        TransferRegistry::new(LocalStorage::new(Some(dir.to_path_buf())), HeadlessSession)
    }

    async fn send(writer: &mut (impl AsyncWrite + Unpin), msg: &XferMessage) {
        write_frame(writer, msg.message_type(), &msg.encode())
            .await
            .unwrap();
    }

    fn start(id: u32, name: &str, size: u64) -> XferMessage {
        XferMessage::Start {
            id,
            metadata: format!("[vdagent-file-xfer]\nname={name}\nsize={size}\n\0").into_bytes(),
        }
    }

    async fn next_status(reader: &mut (impl AsyncRead + Unpin)) -> XferMessage {
        let frame = read_frame(reader).await.unwrap().unwrap();
        assert_eq!(frame.msg_type, MessageType::FileXferStatus.code());
        frame.xfer().unwrap().unwrap()
    }

    #[tokio::test]
    async fn transfer_over_channel() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent, host) = tokio::io::duplex(64 * 1024);
        let (mut agent_r, mut agent_w) = tokio::io::split(agent);
        let (mut host_r, mut host_w) = tokio::io::split(host);

        send(&mut host_w, &start(1, "hello.txt", 5)).await;
        send(
            &mut host_w,
            &XferMessage::Data {
                id: 1,
                data: b"hello".to_vec(),
            },
        )
        .await;
        host_w.shutdown().await.unwrap();

        let mut reg = registry(tmp.path());
        let cancel = CancellationToken::new();
        serve(&mut agent_r, &mut agent_w, &mut reg, &cancel)
            .await
            .unwrap();

        assert_eq!(
            next_status(&mut host_r).await,
            XferMessage::Status {
                id: 1,
                result: XferStatus::CanSendData
            }
        );
        assert_eq!(
            next_status(&mut host_r).await,
            XferMessage::Status {
                id: 1,
                result: XferStatus::Success
            }
        );
        assert_eq!(std::fs::read(tmp.path().join("hello.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn channel_close_aborts_pending_transfers() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent, host) = tokio::io::duplex(64 * 1024);
        let (mut agent_r, mut agent_w) = tokio::io::split(agent);
        let (_host_r, mut host_w) = tokio::io::split(host);

        send(&mut host_w, &start(2, "partial.bin", 100)).await;
        send(
            &mut host_w,
            &XferMessage::Data {
                id: 2,
                data: vec![0; 10],
            },
        )
        .await;
        host_w.shutdown().await.unwrap();

        let mut reg = registry(tmp.path());
        serve(&mut agent_r, &mut agent_w, &mut reg, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reg.active_transfers(), 0);
        assert!(!tmp.path().join("partial.bin").exists());
    }

    #[tokio::test]
    async fn not_enough_space_reply_carries_free_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent, host) = tokio::io::duplex(64 * 1024);
        let (mut agent_r, mut agent_w) = tokio::io::split(agent);
        let (mut host_r, mut host_w) = tokio::io::split(host);

        send(&mut host_w, &start(3, "huge.img", u64::MAX)).await;
        host_w.shutdown().await.unwrap();

        let mut reg = registry(tmp.path());
        serve(&mut agent_r, &mut agent_w, &mut reg, &CancellationToken::new())
            .await
            .unwrap();

        let frame = read_frame(&mut host_r).await.unwrap().unwrap();
        assert_eq!(
            frame.xfer().unwrap(),
            Some(XferMessage::Status {
                id: 3,
                result: XferStatus::NotEnoughSpace
            })
        );
        // id, result, then the free byte count.
        assert_eq!(frame.data.len(), 16);
        assert!(!tmp.path().join("huge.img").exists());
    }

    #[tokio::test]
    async fn unknown_frames_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent, host) = tokio::io::duplex(64 * 1024);
        let (mut agent_r, mut agent_w) = tokio::io::split(agent);
        let (mut host_r, mut host_w) = tokio::io::split(host);

        // A clipboard grab, which this agent does not handle.
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&7u32.to_le_bytes());
        raw.extend_from_slice(&0u64.to_le_bytes());
        raw.extend_from_slice(&4u32.to_le_bytes());
        raw.extend_from_slice(&[0; 4]);
        host_w.write_all(&raw).await.unwrap();
        send(&mut host_w, &start(4, "after.txt", 1)).await;
        host_w.shutdown().await.unwrap();

        let mut reg = registry(tmp.path());
        serve(&mut agent_r, &mut agent_w, &mut reg, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            next_status(&mut host_r).await,
            XferMessage::Status {
                id: 4,
                result: XferStatus::CanSendData
            }
        );
    }

    #[tokio::test]
    async fn cancellation_stops_idle_loop() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent, _host) = tokio::io::duplex(1024);
        let (mut agent_r, mut agent_w) = tokio::io::split(agent);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut reg = registry(tmp.path());
        serve(&mut agent_r, &mut agent_w, &mut reg, &cancel)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bad_protocol_version_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let (agent, host) = tokio::io::duplex(1024);
        let (mut agent_r, mut agent_w) = tokio::io::split(agent);
        let (_host_r, mut host_w) = tokio::io::split(host);

        let mut raw = Vec::new();
        raw.extend_from_slice(&9u32.to_le_bytes());
        raw.extend_from_slice(&11u32.to_le_bytes());
        raw.extend_from_slice(&0u64.to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());
        host_w.write_all(&raw).await.unwrap();

        let mut reg = registry(tmp.path());
        let result = serve(&mut agent_r, &mut agent_w, &mut reg, &CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
