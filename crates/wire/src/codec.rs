// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Combines framing with JSON (de)serialization to move whole protocol
//! messages across a connection.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::CodecError;
use crate::framing::{self, Framing, DEFAULT_MAX_FRAME_BYTES};
use crate::request::RequestMessage;
use crate::reply::ReplyMessage;

/// Read and decode one inbound request.
pub async fn read_request<R>(
    reader: &mut R,
    framing: Framing,
) -> Result<RequestMessage, CodecError>
where
    R: AsyncRead + Unpin,
{
    let bytes = framing::read_frame(reader, framing, DEFAULT_MAX_FRAME_BYTES).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encode and write one outbound reply.
pub async fn write_reply<W>(
    writer: &mut W,
    framing: Framing,
    reply: &ReplyMessage,
) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = serde_json::to_vec(reply)?;
    framing::write_frame(writer, framing, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::reply::ReplyBody;

    #[tokio::test]
    async fn writes_and_reads_back_a_request() {
        let json = serde_json::json!({
            "ta-cmd": "ping",
            "ta-id": 5,
            "msg-type": "request",
        });
        let mut buf = serde_json::to_vec(&json).unwrap();
        buf.push(b'\n');
        let mut cursor = std::io::Cursor::new(buf);
        let msg = read_request(&mut cursor, Framing::NewlineDelimited).await.unwrap();
        assert_eq!(msg.ta_id, 5);
    }

    #[tokio::test]
    async fn writes_a_reply_length_prefixed() {
        let reply =
            ReplyMessage { ta_id: 1, ta_cmd: Command::Ping, body: ReplyBody::Complete };
        let mut buf = Vec::new();
        write_reply(&mut buf, Framing::LengthPrefixed, &reply).await.unwrap();
        let len = u32::from_be_bytes(buf[..4].try_into().unwrap()) as usize;
        assert_eq!(buf.len(), 4 + len);
    }
}
