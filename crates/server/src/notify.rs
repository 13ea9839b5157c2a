// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notifications the domain store computes synchronously as a side
//! effect of a mutation. These are domain-level facts, not wire
//! messages — the session layer turns each into a `notify` on the
//! subscription's owning connection, and may coalesce
//! `(subscription_id, service_id)` pairs that arrive within the
//! configured window before doing so (§4.4 "Notification delay").

use pathfinder_core::{ClientId, Properties, ServiceId, SubscriptionId};
use pathfinder_wire::MatchType;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceMatch {
    pub subscription_id: SubscriptionId,
    /// The connection the notification is delivered on.
    pub recipient: ClientId,
    pub match_type: MatchType,
    pub service_id: ServiceId,
    pub generation: u64,
    pub properties: Properties,
    pub ttl_secs: u64,
    pub orphan_since: Option<u64>,
}

/// A coalescing key: notifications for the same subscription/service pair
/// within the window collapse to one, carrying the *final* state (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoalesceKey {
    pub subscription_id: SubscriptionId,
    pub service_id: ServiceId,
}

impl ServiceMatch {
    pub fn coalesce_key(&self) -> CoalesceKey {
        CoalesceKey { subscription_id: self.subscription_id, service_id: self.service_id }
    }
}
