// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A connected client (session) as the domain store sees it: everything
//! about negotiated protocol state and liveness bookkeeping, but *not*
//! the transport itself (that's owned by the session task, looked up by
//! id — see §3 "Ownership stated abstractly").

use std::collections::HashSet;
use std::time::Instant;

use pathfinder_core::{ClientId, ServiceId, SubscriptionId};

/// Identifies the principal a connection authenticated as, for per-user
/// resource accounting. X.509 subject-key-id for TLS, peer IP for TCP, a
/// single synthetic identity for all local-socket peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserIdentity(pub String);

impl UserIdentity {
    /// The single synthetic identity shared by every local-socket peer.
    pub fn local_socket() -> Self {
        UserIdentity("local".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub user: UserIdentity,
    pub protocol_version: u8,
    pub connected_at: Instant,
    pub last_activity: Instant,
    /// Services this client currently owns (lookup keys only, per §3).
    pub owned_services: HashSet<ServiceId>,
    /// Subscriptions this client currently owns.
    pub owned_subscriptions: HashSet<SubscriptionId>,
}

impl Client {
    pub fn new(id: ClientId, user: UserIdentity, protocol_version: u8, now: Instant) -> Self {
        Client {
            id,
            user,
            protocol_version,
            connected_at: now,
            last_activity: now,
            owned_services: HashSet::new(),
            owned_subscriptions: HashSet::new(),
        }
    }
}
