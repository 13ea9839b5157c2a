// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame a JSON payload over any `AsyncRead + AsyncWrite`. Byte-stream
//! transports carry either newline-delimited or length-prefixed frames;
//! the codec must accept both (§6), so framing is a property of the
//! listener/connection, not something sniffed per message.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CodecError;

/// Default ceiling on a single frame's payload size, protecting against a
/// peer claiming an absurd length prefix or never sending a newline.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Each JSON object followed by `\n`.
    NewlineDelimited,
    /// 4-byte big-endian length prefix, then exactly that many bytes.
    LengthPrefixed,
}

/// Read one frame's raw bytes (JSON payload, no delimiter/prefix).
pub async fn read_frame<R>(
    reader: &mut R,
    framing: Framing,
    max_len: usize,
) -> Result<Vec<u8>, CodecError>
where
    R: AsyncRead + Unpin,
{
    match framing {
        Framing::NewlineDelimited => read_newline_frame(reader, max_len).await,
        Framing::LengthPrefixed => read_length_prefixed_frame(reader, max_len).await,
    }
}

/// Write one frame (JSON payload already serialized).
pub async fn write_frame<W>(
    writer: &mut W,
    framing: Framing,
    payload: &[u8],
) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    match framing {
        Framing::NewlineDelimited => {
            writer.write_all(payload).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::LengthPrefixed => {
            let len: u32 = payload
                .len()
                .try_into()
                .map_err(|_| CodecError::InvalidFrameLength(u32::MAX))?;
            writer.write_all(&len.to_be_bytes()).await?;
            writer.write_all(payload).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

async fn read_newline_frame<R>(reader: &mut R, max_len: usize) -> Result<Vec<u8>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(CodecError::Eof);
        }
        if byte[0] == b'\n' {
            return Ok(buf);
        }
        if buf.len() >= max_len {
            return Err(CodecError::FrameTooLarge { max: max_len });
        }
        buf.push(byte[0]);
    }
}

async fn read_length_prefixed_frame<R>(
    reader: &mut R,
    max_len: usize,
) -> Result<Vec<u8>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::Eof
        } else {
            CodecError::Io(e)
        }
    })?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_len {
        return Err(CodecError::FrameTooLarge { max: max_len });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn newline_frame_round_trips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, Framing::NewlineDelimited, b"{}").await.unwrap();
        assert_eq!(buf, b"{}\n");

        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor, Framing::NewlineDelimited, 1024).await.unwrap();
        assert_eq!(frame, b"{}");
    }

    #[tokio::test]
    async fn length_prefixed_frame_round_trips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, Framing::LengthPrefixed, b"{\"a\":1}").await.unwrap();
        assert_eq!(&buf[..4], &7u32.to_be_bytes());

        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor, Framing::LengthPrefixed, 1024).await.unwrap();
        assert_eq!(frame, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn oversized_newline_frame_is_rejected() {
        let mut cursor = std::io::Cursor::new(b"0123456789\n".to_vec());
        let err = read_frame(&mut cursor, Framing::NewlineDelimited, 4).await.unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { max: 4 }));
    }

    #[tokio::test]
    async fn empty_stream_is_eof() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let err = read_frame(&mut cursor, Framing::NewlineDelimited, 1024).await.unwrap_err();
        assert!(matches!(err, CodecError::Eof));
    }
}
