// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pathfinder-wire: the JSON message codec and framing for the
//! Pathfinder protocol — typed request/reply messages plus the two
//! framing strategies byte-stream transports may use.

mod codec;
mod command;
mod error;
mod fail_reason;
mod framing;
mod properties_codec;
mod reply;
mod request;

pub use codec::{read_request, write_reply};
pub use command::{Command, MsgType};
pub use error::CodecError;
pub use fail_reason::FailReason;
pub use framing::{Framing, DEFAULT_MAX_FRAME_BYTES};
pub use properties_codec::WireProperties;
pub use reply::{
    ClientNotify, FailBody, MatchType, NotifyBody, ReplyBody, ReplyMessage, ServiceNotify,
    SubscriptionNotify, TrackNotify,
};
pub use request::{
    HelloBody, PublishBody, Request, RequestMessage, ServicesBody, SubscribeBody, TrackBody,
    TrackType, UnpublishBody, UnsubscribeBody,
};
