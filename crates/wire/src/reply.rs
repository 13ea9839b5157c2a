// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound `accept` / `notify` / `complete` / `fail` / `track-reply`
//! messages.

use pathfinder_core::{ClientId, ServiceId, SubscriptionId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::fail_reason::FailReason;
use crate::properties_codec::WireProperties;
use crate::request::TrackType;

/// The envelope every outbound reply shares: `ta-id`, `ta-cmd` (which
/// transaction this reply belongs to), and the msg-type-tagged body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(rename = "ta-id")]
    pub ta_id: TransactionId,
    #[serde(rename = "ta-cmd")]
    pub ta_cmd: Command,
    #[serde(flatten)]
    pub body: ReplyBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg-type", rename_all = "kebab-case")]
pub enum ReplyBody {
    Accept,
    Complete,
    Fail(FailBody),
    Notify(NotifyBody),
    TrackReply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailBody {
    #[serde(rename = "fail-reason")]
    pub fail_reason: FailReason,
}

/// The shape of a `notify` payload depends on which command the
/// transaction belongs to (the sibling `ta-cmd` on [`ReplyMessage`]); this
/// relies on the variants' field sets being mutually exclusive enough for
/// `untagged` matching to pick the right one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotifyBody {
    Service(ServiceNotify),
    Subscription(SubscriptionNotify),
    Client(ClientNotify),
    Track(TrackNotify),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Appeared,
    Modified,
    Disappeared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceNotify {
    #[serde(rename = "match-type")]
    pub match_type: MatchType,
    #[serde(rename = "service-id")]
    pub service_id: ServiceId,
    pub generation: u64,
    pub properties: WireProperties,
    pub ttl: u64,
    #[serde(rename = "orphan-since", default, skip_serializing_if = "Option::is_none")]
    pub orphan_since: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionNotify {
    #[serde(rename = "subscription-id")]
    pub subscription_id: SubscriptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientNotify {
    #[serde(rename = "client-id")]
    pub client_id: ClientId,
    #[serde(rename = "protocol-version", default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<u8>,
    #[serde(rename = "idle-time-ms", default, skip_serializing_if = "Option::is_none")]
    pub idle_time_ms: Option<u64>,
    #[serde(
        rename = "last-ping-latency-ms",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_ping_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackNotify {
    #[serde(rename = "track-type")]
    pub track_type: TrackType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fail_reply() {
        let msg = ReplyMessage {
            ta_id: 7,
            ta_cmd: Command::Publish,
            body: ReplyBody::Fail(FailBody { fail_reason: FailReason::OldGeneration }),
        };
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded["msg-type"], "fail");
        assert_eq!(encoded["fail-reason"], "old-generation");
    }

    #[test]
    fn decodes_service_notify() {
        let json = serde_json::json!({
            "ta-id": 3,
            "ta-cmd": "subscribe",
            "msg-type": "notify",
            "match-type": "appeared",
            "service-id": 4711,
            "generation": 0,
            "properties": { "name": ["foo"] },
            "ttl": 30,
        });
        let msg: ReplyMessage = serde_json::from_value(json).unwrap();
        match msg.body {
            ReplyBody::Notify(NotifyBody::Service(s)) => {
                assert_eq!(s.match_type, MatchType::Appeared);
            }
            other => panic!("expected a service notify, got {other:?}"),
        }
    }

    #[test]
    fn round_trips_accept_and_complete() {
        for body in [ReplyBody::Accept, ReplyBody::Complete, ReplyBody::TrackReply] {
            let msg = ReplyMessage { ta_id: 1, ta_cmd: Command::Subscribe, body };
            let encoded = serde_json::to_string(&msg).unwrap();
            let decoded: ReplyMessage = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, msg);
        }
    }
}
