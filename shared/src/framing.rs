//! Length-prefixed framing for the TCP stream.
//!
//! ```text
//! +-------------------+--------------------+
//! | length (4 bytes)  |   payload          |
//! | u32 little-endian |   bincode message  |
//! +-------------------+--------------------+
//! ```
//!
//! The length does not include the prefix itself.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Upper bound for one payload. Larger frames end the connection.
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: u32, max: u32 },

    /// The peer closed the connection before a complete frame arrived.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Reads one frame and returns its payload.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::ConnectionClosed);
        }
        Err(e) => return Err(FrameError::Io(e)),
    }

    let payload_len = u32::from_le_bytes(len_buf);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FrameError::ConnectionClosed
            } else {
                FrameError::Io(e)
            }
        })?;
    }

    Ok(payload)
}

/// Writes one frame and flushes.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), FrameError> {
    let len = payload.len() as u32;
    if len > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    writer.write_all(&len.to_le_bytes()).await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    writer.flush().await?;

    Ok(())
}

/// Reads and decodes one message.
pub async fn read_message<T, R>(reader: &mut R) -> Result<T, FrameError>
where
    T: DeserializeOwned,
    R: AsyncReadExt + Unpin,
{
    let payload = read_frame(reader).await?;
    Ok(bincode::deserialize(&payload)?)
}

/// Encodes and writes one message.
pub async fn write_message<T, W>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    T: Serialize,
    W: AsyncWriteExt + Unpin,
{
    let payload = bincode::serialize(message)?;
    write_frame(writer, &payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ClientMessage;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_message_roundtrip() {
        let (mut client, mut server) = duplex(8192);
        let message = ClientMessage::ChatMessage("hello".to_string());

        write_message(&mut client, &message).await.unwrap();
        let received: ClientMessage = read_message(&mut server).await.unwrap();
        assert_eq!(received, message);
    }

    #[tokio::test]
    async fn test_multiple_frames_in_order() {
        let (mut client, mut server) = duplex(8192);
        for i in 0..3u8 {
            write_frame(&mut client, &[i; 5]).await.unwrap();
        }
        for i in 0..3u8 {
            assert_eq!(read_frame(&mut server).await.unwrap(), vec![i; 5]);
        }
    }

    #[tokio::test]
    async fn test_oversized_length_prefix_rejected() {
        let (mut client, mut server) = duplex(64);
        client
            .write_all(&(MAX_PAYLOAD_SIZE + 1).to_le_bytes())
            .await
            .unwrap();

        match read_frame(&mut server).await {
            Err(FrameError::PayloadTooLarge { size, max }) => {
                assert_eq!(size, MAX_PAYLOAD_SIZE + 1);
                assert_eq!(max, MAX_PAYLOAD_SIZE);
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_mid_frame() {
        let (mut client, mut server) = duplex(64);
        client.write_all(&10u32.to_le_bytes()).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);

        assert!(matches!(
            read_frame(&mut server).await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_garbage_payload_is_codec_error() {
        let (mut client, mut server) = duplex(64);
        write_frame(&mut client, &[0xFF, 0xFF, 0xFF, 0xFF]).await.unwrap();

        let result: Result<ClientMessage, _> = read_message(&mut server).await;
        assert!(matches!(result, Err(FrameError::Codec(_))));
    }
}
