// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Everything the sessions of one domain share: the locked [`Domain`]
//! itself, the registry of outbound notification queues, and the
//! negotiated policy (idle range, protocol version range, coalescing
//! window) that every session on this domain enforces identically.
//!
//! `domain` is never held locked across an `.await` — a handler locks
//! it, mutates, drains the resulting notifications into the recipients'
//! queues, and drops the guard before doing any socket I/O. This is the
//! realization of "all store mutations execute to completion between
//! loop turns" (§5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use pathfinder_core::{ClientId, ServiceId};

use crate::config::{DomainConfig, IdlePolicy, ProtocolVersionRange, ResourcesConfig};
use crate::domain::Domain;
use crate::notify::{CoalesceKey, ServiceMatch};

pub const NOTIFY_QUEUE_DEPTH: usize = 256;

pub struct DomainRuntime {
    pub domain: Mutex<Domain>,
    outboxes: Mutex<HashMap<ClientId, mpsc::Sender<ServiceMatch>>>,
    /// Notifications buffered for a `(recipient, subscription, service)`
    /// pair awaiting the coalescing window (§4.4 "Notification delay").
    /// Each key has at most one flush task in flight; a later write
    /// within the window just replaces the buffered value in place so
    /// the flush delivers the final state.
    pending: Mutex<HashMap<(ClientId, CoalesceKey), ServiceMatch>>,
    pub idle: IdlePolicy,
    pub protocol_version: ProtocolVersionRange,
    pub coalesce_window: Duration,
    pub name: Option<String>,
}

impl DomainRuntime {
    pub fn new(domain_config: &DomainConfig, resources: &ResourcesConfig, coalesce_window_ms: u64) -> Self {
        DomainRuntime {
            domain: Mutex::new(Domain::new(resources.total, resources.user, resources.cross_user_removal)),
            outboxes: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            idle: domain_config.idle,
            protocol_version: domain_config.protocol_version,
            coalesce_window: Duration::from_millis(coalesce_window_ms),
            name: domain_config.name.clone(),
        }
    }

    /// Registers the channel a session's notifications should be pushed
    /// onto. Called once `hello` has assigned the session a client-id.
    pub fn register(&self, client_id: ClientId) -> mpsc::Receiver<ServiceMatch> {
        let (tx, rx) = mpsc::channel(NOTIFY_QUEUE_DEPTH);
        self.outboxes.lock().insert(client_id, tx);
        rx
    }

    pub fn unregister(&self, client_id: ClientId) {
        self.outboxes.lock().remove(&client_id);
    }

    /// Fans a batch of notifications out to each recipient, coalescing
    /// same-pair notifications that arrive within `coalesce_window`
    /// (§4.4). A window of zero disables coalescing entirely and
    /// delivers immediately, matching a from-config opt-out.
    pub fn deliver(self: &Arc<Self>, notifications: Vec<ServiceMatch>) {
        if self.coalesce_window.is_zero() {
            self.deliver_now(notifications);
            return;
        }
        for notification in notifications {
            let key = (notification.recipient, notification.coalesce_key());
            let ttl_secs = notification.ttl_secs;
            let already_pending = { self.pending.lock().insert(key, notification).is_some() };
            if !already_pending {
                self.schedule_flush(key, ttl_secs);
            }
        }
    }

    fn deliver_now(&self, notifications: Vec<ServiceMatch>) {
        let outboxes = self.outboxes.lock();
        for notification in notifications {
            if let Some(tx) = outboxes.get(&notification.recipient) {
                if let Err(err) = tx.try_send(notification) {
                    tracing::warn!(error = %err, "dropping notification: recipient queue full or closed");
                }
            }
        }
    }

    /// MUST NOT delay a notification longer than the service's TTL
    /// (§4.4): the flush delay is the coalescing window, capped to the
    /// service's remaining TTL.
    fn schedule_flush(self: &Arc<Self>, key: (ClientId, CoalesceKey), ttl_secs: u64) {
        let runtime = Arc::clone(self);
        let delay = self.coalesce_window.min(Duration::from_secs(ttl_secs));
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let notification = runtime.pending.lock().remove(&key);
            if let Some(notification) = notification {
                runtime.deliver_now(vec![notification]);
            }
        });
    }

    /// Schedules a one-shot `reap_orphan` against `service_id` after its
    /// TTL. A `tokio::time::sleep`-backed task, not a handle into the
    /// store: if the service was reclaimed or the domain torn down by
    /// the time it fires, `reap_orphan` is a no-op (§5).
    pub fn schedule_reap(self: &Arc<Self>, service_id: ServiceId, ttl_secs: u64) {
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(ttl_secs)).await;
            let notifications = {
                let mut domain = runtime.domain.lock();
                domain.reap_orphan(service_id, epoch_now())
            };
            if let Some(notifications) = notifications {
                runtime.deliver(notifications);
            }
        });
    }
}

fn epoch_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathfinder_core::{Properties, ServiceId, SubscriptionId};
    use pathfinder_wire::MatchType;
    use std::time::Duration as StdDuration;

    fn runtime(coalesce_window_ms: u64) -> Arc<DomainRuntime> {
        let domain_config = DomainConfig::default();
        let resources = ResourcesConfig::default();
        Arc::new(DomainRuntime::new(&domain_config, &resources, coalesce_window_ms))
    }

    fn notification(recipient: ClientId, ttl_secs: u64, match_type: MatchType) -> ServiceMatch {
        ServiceMatch {
            subscription_id: SubscriptionId::new(1).expect("in range"),
            recipient,
            match_type,
            service_id: ServiceId::new(1).expect("in range"),
            generation: 1,
            properties: Properties::new(),
            ttl_secs,
            orphan_since: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_window_delivers_immediately() {
        let runtime = runtime(0);
        let client = ClientId::new(1).expect("in range");
        let mut rx = runtime.register(client);

        runtime.deliver(vec![notification(client, 30, MatchType::Appeared)]);

        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn same_pair_within_window_coalesces_to_the_final_state() {
        let runtime = runtime(200);
        let client = ClientId::new(1).expect("in range");
        let mut rx = runtime.register(client);

        runtime.deliver(vec![notification(client, 30, MatchType::Appeared)]);
        runtime.deliver(vec![notification(client, 30, MatchType::Modified)]);

        assert!(rx.try_recv().is_err(), "first write should still be buffered");

        tokio::time::advance(StdDuration::from_millis(250)).await;
        tokio::task::yield_now().await;

        let delivered = rx.try_recv().expect("flushed notification");
        assert_eq!(delivered.match_type, MatchType::Modified);
        assert!(rx.try_recv().is_err(), "only one notification should have been delivered");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_delay_is_capped_to_the_service_ttl() {
        let runtime = runtime(60_000);
        let client = ClientId::new(1).expect("in range");
        let mut rx = runtime.register(client);

        runtime.deliver(vec![notification(client, 2, MatchType::Appeared)]);

        tokio::time::advance(StdDuration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert!(rx.try_recv().is_ok(), "flush must not wait past the service's TTL");
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_reap_is_a_no_op_once_the_service_is_gone() {
        let runtime = runtime(0);
        let user = crate::domain::UserIdentity::local_socket();
        let client = ClientId::new(1).expect("in range");
        {
            let mut domain = runtime.domain.lock();
            domain.admit_client(client, user.clone(), 3, std::time::Instant::now()).expect("admit");
            domain
                .publish(client, &user, ServiceId::new(1).expect("in range"), 1, Properties::new(), 1)
                .expect("publish");
            domain.unpublish(client, &user, ServiceId::new(1).expect("in range")).expect("unpublish");
        }

        runtime.schedule_reap(ServiceId::new(1).expect("in range"), 1);
        tokio::time::advance(StdDuration::from_secs(2)).await;
        tokio::task::yield_now().await;
        // No panic, no stray notification: the service was already gone.
    }
}

/// A domain plus the accepted listener sockets bound to it; owned by the
/// top-level server for the lifetime of the process.
pub struct DomainHandle {
    pub runtime: Arc<DomainRuntime>,
}

impl DomainHandle {
    pub fn new(domain_config: &DomainConfig, resources: &ResourcesConfig, coalesce_window_ms: u64) -> Self {
        DomainHandle { runtime: Arc::new(DomainRuntime::new(domain_config, resources, coalesce_window_ms)) }
    }
}
