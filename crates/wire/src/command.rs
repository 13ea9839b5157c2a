// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ta-cmd` and `msg-type` vocabularies every protocol message is
//! built from.

use serde::{Deserialize, Serialize};

/// The ten commands a client may address to a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Hello,
    Ping,
    Publish,
    Unpublish,
    Subscribe,
    Unsubscribe,
    Services,
    Subscriptions,
    Clients,
    Track,
}

impl Command {
    /// Single-response commands terminate `REQUEST_RECEIVED -> (complete |
    /// fail) -> TERMINATED`; multi-response commands pass through
    /// `ACCEPTED` and may emit any number of `notify` messages first.
    pub fn is_multi_response(self) -> bool {
        matches!(
            self,
            Command::Subscribe
                | Command::Services
                | Command::Subscriptions
                | Command::Clients
                | Command::Track
        )
    }
}

/// The `msg-type` vocabulary. `TrackReply` is a v3 extension scoped to the
/// `track` command only: the client's answer to a server-originated
/// liveness probe, carried as its own message rather than as a `request`
/// or `complete` because it doesn't fit either of those established
/// transaction roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MsgType {
    Request,
    Accept,
    Notify,
    Complete,
    Fail,
    TrackReply,
}
