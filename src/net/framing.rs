//! Length-prefixed framing for stream transports
//!
//! Format: `[4 bytes little-endian length][bincode payload]`.

use std::io;

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::game::constants::net::MAX_MESSAGE_SIZE;
use crate::net::protocol::{decode, encode, DecodeError, EncodeError};

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Message too large: {0} bytes (max {1})")]
    MessageTooLarge(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

fn closed_on_eof(e: io::Error) -> FramingError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        FramingError::ConnectionClosed
    } else {
        FramingError::Io(e)
    }
}

/// Read one raw frame
pub async fn read_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(closed_on_eof)?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(len, MAX_MESSAGE_SIZE));
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.map_err(closed_on_eof)?;
    Ok(buf)
}

/// Write one raw frame and flush
pub async fn write_message<W: AsyncWrite + Unpin>(
    stream: &mut W,
    data: &[u8],
) -> Result<(), FramingError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(data.len(), MAX_MESSAGE_SIZE));
    }
    stream.write_all(&(data.len() as u32).to_le_bytes()).await?;
    stream.write_all(data).await?;
    stream.flush().await?;
    Ok(())
}

/// Read and decode one typed frame
pub async fn read_frame<T, R>(stream: &mut R) -> Result<T, FramingError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let bytes = read_message(stream).await?;
    Ok(decode(&bytes)?)
}

/// Encode and write one typed frame
pub async fn write_frame<T, W>(stream: &mut W, message: &T) -> Result<(), FramingError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let bytes = encode(message)?;
    write_message(stream, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{ClientMessage, PlayerInput};
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_write_message() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, b"arena").await.unwrap();
        assert_eq!(&buffer[..4], &5u32.to_le_bytes());

        let mut cursor = Cursor::new(buffer);
        assert_eq!(read_message(&mut cursor).await.unwrap(), b"arena");
    }

    #[tokio::test]
    async fn test_empty_message() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, b"").await.unwrap();
        let mut cursor = Cursor::new(buffer);
        assert!(read_message(&mut cursor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let large = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let result = write_message(&mut Vec::new(), &large).await;
        assert!(matches!(result, Err(FramingError::MessageTooLarge(_, _))));

        let mut header = Cursor::new(((MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes().to_vec());
        let result = read_message(&mut header).await;
        assert!(matches!(result, Err(FramingError::MessageTooLarge(_, _))));
    }

    #[tokio::test]
    async fn test_truncated_frames_read_as_closed() {
        let mut short_len = Cursor::new(vec![0u8; 2]);
        assert!(matches!(
            read_message(&mut short_len).await,
            Err(FramingError::ConnectionClosed)
        ));

        let mut buffer = Vec::new();
        buffer.extend_from_slice(&10u32.to_le_bytes());
        buffer.extend_from_slice(&[1, 2, 3]);
        let mut short_payload = Cursor::new(buffer);
        assert!(matches!(
            read_message(&mut short_payload).await,
            Err(FramingError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let payload = encode(&ClientMessage::Goodbye).unwrap();
        let len = (payload.len() as u32).to_le_bytes();
        // Header and payload arrive in separate chunks
        let mut stream = tokio_test::io::Builder::new()
            .read(&len[..2])
            .read(&len[2..])
            .read(&payload)
            .build();
        let got: ClientMessage = read_frame(&mut stream).await.unwrap();
        assert_eq!(got, ClientMessage::Goodbye);
    }

    #[tokio::test]
    async fn test_typed_frames_in_sequence() {
        let messages = vec![
            ClientMessage::Hello {
                peer_id: uuid::Uuid::new_v4(),
            },
            ClientMessage::Input(PlayerInput {
                right: true,
                ..Default::default()
            }),
            ClientMessage::Goodbye,
        ];

        let mut buffer = Vec::new();
        for msg in &messages {
            write_frame(&mut buffer, msg).await.unwrap();
        }

        let mut cursor = Cursor::new(buffer);
        for expected in &messages {
            let got: ClientMessage = read_frame(&mut cursor).await.unwrap();
            assert_eq!(&got, expected);
        }
    }
}
