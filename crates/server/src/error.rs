// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors that are bugs or fatal-to-the-connection conditions, as opposed
//! to `fail-reason`s, which are expected per-transaction outcomes carried
//! in-band (see [`pathfinder_wire::FailReason`]).

use thiserror::Error;

/// Conditions the protocol spec marks fatal to the connection: the
/// session's message loop returns this, the caller logs it, and the
/// transport is dropped without a `fail` message.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("codec error: {0}")]
    Codec(#[from] pathfinder_wire::CodecError),

    #[error("duplicate transaction id {0} on this connection")]
    DuplicateTransactionId(u64),

    #[error("no hello received within the grace period")]
    HelloGraceExpired,

    #[error("idle-time liveness check failed")]
    LivenessTimeout,

    #[error("message type {0:?} is not valid as an inbound message")]
    UnexpectedMessageType(pathfinder_wire::MsgType),

    #[error("a second hello did not match the first")]
    HelloMismatch,

    #[error("internal invariant violated: {0}")]
    InvariantViolation(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: Box<toml::de::Error> },

    #[error("idle.min must be >= 1, got {0}")]
    IdleMinTooSmall(u64),

    #[error("idle.min ({min}) must be <= idle.max ({max})")]
    IdleRangeInverted { min: u64, max: u64 },

    #[error("protocol_version.min ({min}) must be <= protocol_version.max ({max})")]
    ProtocolVersionRangeInverted { min: u8, max: u8 },

    #[error("protocol version range must fall within 2..=3, got {min}..={max}")]
    ProtocolVersionOutOfBounds { min: u8, max: u8 },

    #[error("listener address '{0}' is not a recognised scheme (expected ux:, tcp:, tls:, or utls:)")]
    BadListenAddr(String),

    #[error("domain '{0}' declares no sockets")]
    NoSockets(String),

    #[error("{0}")]
    MissingTlsMaterial(String),
}
