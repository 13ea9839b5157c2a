// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A published service record (§3).

use pathfinder_core::{ClientId, Properties, ServiceId};

use super::client::UserIdentity;

#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub generation: u64,
    pub properties: Properties,
    pub ttl_secs: u64,
    /// Lookup key, never an ownership handle (§3 "Ownership stated
    /// abstractly").
    pub owner: ClientId,
    /// The owning client's user, kept here rather than re-derived from
    /// `Domain.clients` so per-user counters can still be adjusted once
    /// the owner has disconnected (the service outlives the client as an
    /// orphan, per I4).
    pub owner_user: UserIdentity,
    /// `None` while the owner is connected; an epoch timestamp once it
    /// has disconnected (I4).
    pub orphan_since: Option<u64>,
}

impl Service {
    pub fn is_orphan(&self) -> bool {
        self.orphan_since.is_some()
    }

    /// (I3) whether this orphan is past its TTL as of `now` (epoch secs).
    pub fn orphan_expired(&self, now: u64) -> bool {
        self.orphan_since.is_some_and(|since| now.saturating_sub(since) >= self.ttl_secs)
    }
}
