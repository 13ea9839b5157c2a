// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codec and framing failures. Per the protocol's error-handling design
//! these are *fatal to the connection* — the caller logs the event and
//! closes the transport rather than trying to recover in place.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message exceeds the maximum allowed frame size of {max} bytes")]
    FrameTooLarge { max: usize },

    #[error("transport closed")]
    Eof,

    #[error("length-prefixed frame length {0} is not representable")]
    InvalidFrameLength(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
