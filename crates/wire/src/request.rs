// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound `request` messages, one variant per command.
//!
//! Each variant's struct is `deny_unknown_fields`: together with the
//! mandatory fields on [`RequestMessage`] this is what rejects "any
//! message containing a field not listed in the per-command... table".

use pathfinder_core::{ClientId, ServiceId, SubscriptionId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::command::MsgType;
use crate::properties_codec::WireProperties;

/// The envelope every inbound request shares: `ta-id`, `msg-type`
/// (always `"request"`), and the command-tagged body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    #[serde(rename = "ta-id")]
    pub ta_id: TransactionId,
    #[serde(rename = "msg-type")]
    pub msg_type: MsgType,
    #[serde(flatten)]
    pub body: Request,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ta-cmd", rename_all = "kebab-case")]
pub enum Request {
    Hello(HelloBody),
    Ping,
    Publish(PublishBody),
    Unpublish(UnpublishBody),
    Subscribe(SubscribeBody),
    Unsubscribe(UnsubscribeBody),
    Services(ServicesBody),
    Subscriptions,
    Clients,
    Track(TrackBody),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelloBody {
    #[serde(rename = "client-id")]
    pub client_id: ClientId,
    #[serde(rename = "protocol-minimum-version")]
    pub protocol_minimum_version: u8,
    #[serde(rename = "protocol-maximum-version")]
    pub protocol_maximum_version: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishBody {
    #[serde(rename = "service-id")]
    pub service_id: ServiceId,
    pub generation: u64,
    pub properties: WireProperties,
    pub ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnpublishBody {
    #[serde(rename = "service-id")]
    pub service_id: ServiceId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscribeBody {
    #[serde(rename = "subscription-id")]
    pub subscription_id: SubscriptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnsubscribeBody {
    #[serde(rename = "subscription-id")]
    pub subscription_id: SubscriptionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// `track-type = query` on the request itself is the client symmetrically
/// probing the server (§4.6); its absence just establishes the
/// liveness-tracking transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackBody {
    #[serde(default, rename = "track-type", skip_serializing_if = "Option::is_none")]
    pub track_type: Option<TrackType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackType {
    Query,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hello_request() {
        let json = serde_json::json!({
            "ta-cmd": "hello",
            "ta-id": 1,
            "msg-type": "request",
            "client-id": 42,
            "protocol-minimum-version": 2,
            "protocol-maximum-version": 3,
        });
        let msg: RequestMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg.ta_id, 1);
        assert!(matches!(msg.body, Request::Hello(_)));
    }

    #[test]
    fn rejects_unknown_field() {
        let json = serde_json::json!({
            "ta-cmd": "ping",
            "ta-id": 1,
            "msg-type": "request",
            "bogus": true,
        });
        assert!(serde_json::from_value::<RequestMessage>(json).is_err());
    }

    #[test]
    fn rejects_missing_mandatory_field() {
        let json = serde_json::json!({
            "ta-cmd": "publish",
            "ta-id": 1,
            "msg-type": "request",
            "service-id": 1,
            "generation": 0,
            // missing `properties` and `ttl`
        });
        assert!(serde_json::from_value::<RequestMessage>(json).is_err());
    }
}
