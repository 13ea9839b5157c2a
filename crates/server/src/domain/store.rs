// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The domain store: the authoritative in-memory model of one service
//! discovery domain, and the match engine that keeps subscriptions'
//! matched sets in sync with service mutations (§4.4).
//!
//! Every public method here runs to completion synchronously — no
//! `.await` inside a mutation — which is what makes "all store mutations
//! execute to completion between loop turns" (§5) true by construction.

use std::collections::HashMap;
use std::time::Instant;

use pathfinder_core::{ClientId, Filter, Properties, ServiceId, SubscriptionId};
use pathfinder_wire::{FailReason, MatchType};

use super::client::{Client, UserIdentity};
use super::service::Service;
use super::subscription::Subscription;
use crate::config::ResourceCaps;
use crate::notify::ServiceMatch;

#[derive(Debug, Clone, Copy, Default)]
struct UserCounts {
    clients: u64,
    services: u64,
    subscriptions: u64,
}

pub struct Domain {
    clients: HashMap<ClientId, Client>,
    services: HashMap<ServiceId, Service>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    user_counters: HashMap<UserIdentity, UserCounts>,
    domain_caps: ResourceCaps,
    user_caps: ResourceCaps,
    /// Resolves the open question on non-owner `unpublish`/ownership
    /// transfer: `false` requires the caller's user identity to match
    /// the current owner's.
    pub cross_user_removal: bool,
}

impl Domain {
    pub fn new(domain_caps: ResourceCaps, user_caps: ResourceCaps, cross_user_removal: bool) -> Self {
        Domain {
            clients: HashMap::new(),
            services: HashMap::new(),
            subscriptions: HashMap::new(),
            user_counters: HashMap::new(),
            domain_caps,
            user_caps,
            cross_user_removal,
        }
    }

    fn user_counts(&self, user: &UserIdentity) -> UserCounts {
        self.user_counters.get(user).copied().unwrap_or_default()
    }

    fn under_cap(&self, domain_count: u64, domain_cap: Option<u64>, user_count: u64, user_cap: Option<u64>) -> bool {
        domain_cap.map_or(true, |cap| domain_count < cap) && user_cap.map_or(true, |cap| user_count < cap)
    }

    // -- clients ------------------------------------------------------

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn client_id_in_use(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Records that `client` was just heard from, for the `clients`
    /// command's `idle-time-ms` (§4.5).
    pub fn touch_activity(&mut self, client: ClientId, now: Instant) {
        if let Some(client) = self.clients.get_mut(&client) {
            client.last_activity = now;
        }
    }

    /// The tightest TTL among the services `client` currently owns, used
    /// to tighten the idle-time liveness deadline (§4.6).
    pub fn min_owned_service_ttl(&self, client: ClientId) -> Option<u64> {
        self.clients
            .get(&client)?
            .owned_services
            .iter()
            .filter_map(|id| self.services.get(id))
            .map(|s| s.ttl_secs)
            .min()
    }

    /// Admits a new client at `hello`. Fails `insufficient-resources` if
    /// either cap is exceeded.
    pub fn admit_client(
        &mut self,
        id: ClientId,
        user: UserIdentity,
        protocol_version: u8,
        now: Instant,
    ) -> Result<(), FailReason> {
        let counts = self.user_counts(&user);
        if !self.under_cap(
            self.clients.len() as u64,
            self.domain_caps.clients,
            counts.clients,
            self.user_caps.clients,
        ) {
            return Err(FailReason::InsufficientResources);
        }
        self.clients.insert(id, Client::new(id, user.clone(), protocol_version, now));
        self.user_counters.entry(user).or_default().clients += 1;
        Ok(())
    }

    /// Removes a client and everything it owns: services become orphans
    /// (with `modified` notifications), subscriptions are cancelled
    /// silently (§4.4 "Client disconnect"). The second return value is
    /// the `(service_id, ttl_secs)` of each newly orphaned service, for
    /// the caller to schedule a `reap_orphan` timer against (§5).
    pub fn remove_client(&mut self, id: ClientId, now_epoch: u64) -> (Vec<ServiceMatch>, Vec<(ServiceId, u64)>) {
        let Some(client) = self.clients.remove(&id) else {
            return (Vec::new(), Vec::new());
        };
        if let Some(counts) = self.user_counters.get_mut(&client.user) {
            counts.clients = counts.clients.saturating_sub(1);
        }

        let mut notifications = Vec::new();
        let mut orphaned = Vec::new();
        for service_id in client.owned_services {
            if let Some(service) = self.services.get_mut(&service_id) {
                service.orphan_since = Some(now_epoch);
                notifications.extend(self.matching_subscribers(service_id, MatchType::Modified));
                orphaned.push((service_id, service.ttl_secs));
            }
        }
        for subscription_id in client.owned_subscriptions {
            self.subscriptions.remove(&subscription_id);
        }
        (notifications, orphaned)
    }

    // -- services / publish / unpublish ---------------------------------

    pub fn service(&self, id: ServiceId) -> Option<&Service> {
        self.services.get(&id)
    }

    pub fn services_snapshot(&self, filter: Option<&Filter>) -> Vec<&Service> {
        self.services
            .values()
            .filter(|s| filter.map_or(true, |f| f.matches(&s.properties)))
            .collect()
    }

    /// Build the `ServiceMatch` list for every subscription currently
    /// matching `service_id`, all tagged with the same `match_type`.
    fn matching_subscribers(&self, service_id: ServiceId, match_type: MatchType) -> Vec<ServiceMatch> {
        let Some(service) = self.services.get(&service_id) else {
            return Vec::new();
        };
        self.subscriptions
            .values()
            .filter(|sub| sub.matched.contains(&service_id))
            .filter_map(|sub| self.clients.get(&sub.owner).map(|_| sub))
            .map(|sub| ServiceMatch {
                subscription_id: sub.id,
                recipient: sub.owner,
                match_type,
                service_id,
                generation: service.generation,
                properties: service.properties.clone(),
                ttl_secs: service.ttl_secs,
                orphan_since: service.orphan_since,
            })
            .collect()
    }

    /// Recompute membership of every subscription against `service_id`'s
    /// current properties, comparing against each subscription's prior
    /// matched-set membership, and return the resulting notifications
    /// (§4.4: appeared / modified / disappeared).
    fn recompute_membership(&mut self, service_id: ServiceId) -> Vec<ServiceMatch> {
        let Some(service) = self.services.get(&service_id).cloned() else {
            return Vec::new();
        };
        let mut notifications = Vec::new();
        for sub in self.subscriptions.values_mut() {
            let was_matched = sub.matched.contains(&service_id);
            let now_matches = sub.matches(&service.properties);
            let match_type = match (was_matched, now_matches) {
                (false, true) => {
                    sub.matched.insert(service_id);
                    Some(MatchType::Appeared)
                }
                (true, true) => Some(MatchType::Modified),
                (true, false) => {
                    sub.matched.remove(&service_id);
                    Some(MatchType::Disappeared)
                }
                (false, false) => None,
            };
            if let Some(match_type) = match_type {
                notifications.push(ServiceMatch {
                    subscription_id: sub.id,
                    recipient: sub.owner,
                    match_type,
                    service_id,
                    generation: service.generation,
                    properties: service.properties.clone(),
                    ttl_secs: service.ttl_secs,
                    orphan_since: service.orphan_since,
                });
            }
        }
        notifications
    }

    /// Insert-or-overwrite per §4.4 "Publish".
    pub fn publish(
        &mut self,
        caller: ClientId,
        caller_user: &UserIdentity,
        service_id: ServiceId,
        generation: u64,
        properties: Properties,
        ttl_secs: u64,
    ) -> Result<Vec<ServiceMatch>, FailReason> {
        let Some(existing) = self.services.get(&service_id) else {
            let counts = self.user_counts(caller_user);
            if !self.under_cap(
                self.services.len() as u64,
                self.domain_caps.services,
                counts.services,
                self.user_caps.services,
            ) {
                return Err(FailReason::InsufficientResources);
            }
            let service = Service {
                id: service_id,
                generation,
                properties,
                ttl_secs,
                owner: caller,
                owner_user: caller_user.clone(),
                orphan_since: None,
            };
            self.services.insert(service_id, service);
            self.user_counters.entry(caller_user.clone()).or_default().services += 1;
            if let Some(client) = self.clients.get_mut(&caller) {
                client.owned_services.insert(service_id);
            }
            return Ok(self.recompute_membership(service_id));
        };

        let owner_differs = existing.owner != caller;
        if owner_differs && !self.cross_user_removal && existing.owner_user != *caller_user {
            return Err(FailReason::PermissionDenied);
        }

        if generation == existing.generation {
            if existing.properties != properties || existing.ttl_secs != ttl_secs {
                return Err(FailReason::SameGenerationButDifferent);
            }
            if !owner_differs && existing.orphan_since.is_none() {
                // Fully idempotent republish (P7): no notifications.
                return Ok(Vec::new());
            }
        } else if generation < existing.generation {
            return Err(FailReason::OldGeneration);
        }

        self.transfer_ownership_if_needed(service_id, caller, caller_user);
        if let Some(service) = self.services.get_mut(&service_id) {
            service.generation = generation;
            service.properties = properties;
            service.ttl_secs = ttl_secs;
            service.owner = caller;
            service.owner_user = caller_user.clone();
            service.orphan_since = None;
        }
        if let Some(client) = self.clients.get_mut(&caller) {
            client.owned_services.insert(service_id);
        }
        Ok(self.recompute_membership(service_id))
    }

    fn transfer_ownership_if_needed(&mut self, service_id: ServiceId, new_owner: ClientId, new_owner_user: &UserIdentity) {
        let Some(service) = self.services.get(&service_id) else { return };
        if service.owner == new_owner {
            return;
        }
        if service.owner_user != *new_owner_user {
            if let Some(counts) = self.user_counters.get_mut(&service.owner_user) {
                counts.services = counts.services.saturating_sub(1);
            }
            self.user_counters.entry(new_owner_user.clone()).or_default().services += 1;
        }
        if let Some(old_client) = self.clients.get_mut(&service.owner) {
            old_client.owned_services.remove(&service_id);
        }
    }

    /// Per §4.4 "Unpublish".
    pub fn unpublish(
        &mut self,
        caller: ClientId,
        caller_user: &UserIdentity,
        service_id: ServiceId,
    ) -> Result<Vec<ServiceMatch>, FailReason> {
        let Some(service) = self.services.get(&service_id) else {
            return Err(FailReason::NonExistentServiceId);
        };
        if service.owner != caller && !self.cross_user_removal && service.owner_user != *caller_user {
            return Err(FailReason::PermissionDenied);
        }

        let notifications = self.matching_subscribers(service_id, MatchType::Disappeared);
        for sub in self.subscriptions.values_mut() {
            sub.matched.remove(&service_id);
        }
        let Some(service) = self.services.remove(&service_id) else {
            return Ok(notifications);
        };
        if let Some(counts) = self.user_counters.get_mut(&service.owner_user) {
            counts.services = counts.services.saturating_sub(1);
        }
        if let Some(client) = self.clients.get_mut(&service.owner) {
            client.owned_services.remove(&service_id);
        }
        Ok(notifications)
    }

    /// Reap an orphaned service on TTL expiry (§4.4). No-op (returns
    /// `None`) if the service is gone or has been reclaimed, matching
    /// "a late-firing timer whose target has vanished is a no-op" (§5).
    pub fn reap_orphan(&mut self, service_id: ServiceId, now_epoch: u64) -> Option<Vec<ServiceMatch>> {
        let service = self.services.get(&service_id)?;
        if !service.orphan_expired(now_epoch) {
            return None;
        }
        let notifications = self.matching_subscribers(service_id, MatchType::Disappeared);
        for sub in self.subscriptions.values_mut() {
            sub.matched.remove(&service_id);
        }
        if let Some(service) = self.services.remove(&service_id) {
            if let Some(counts) = self.user_counters.get_mut(&service.owner_user) {
                counts.services = counts.services.saturating_sub(1);
            }
        }
        Some(notifications)
    }

    // -- subscriptions --------------------------------------------------

    pub fn subscription(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(&id)
    }

    pub fn subscriptions_snapshot(&self) -> Vec<&Subscription> {
        self.subscriptions.values().collect()
    }

    pub fn clients_snapshot(&self) -> Vec<&Client> {
        self.clients.values().collect()
    }

    pub fn subscription_id_in_use(&self, id: SubscriptionId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    /// Install a subscription and return the initial `appeared` backlog
    /// (§4.4 "Subscribe-initial-backlog").
    pub fn subscribe(
        &mut self,
        caller: ClientId,
        caller_user: &UserIdentity,
        subscription_id: SubscriptionId,
        filter: Option<Filter>,
        filter_source: Option<String>,
    ) -> Result<Vec<ServiceMatch>, FailReason> {
        if self.subscription_id_in_use(subscription_id) {
            return Err(FailReason::SubscriptionIdExists);
        }
        let counts = self.user_counts(caller_user);
        if !self.under_cap(
            self.subscriptions.len() as u64,
            self.domain_caps.subscriptions,
            counts.subscriptions,
            self.user_caps.subscriptions,
        ) {
            return Err(FailReason::InsufficientResources);
        }

        let mut matched = std::collections::HashSet::new();
        let mut notifications = Vec::new();
        for service in self.services.values() {
            let is_match = match &filter {
                Some(f) => f.matches(&service.properties),
                None => true,
            };
            if is_match {
                matched.insert(service.id);
                notifications.push(ServiceMatch {
                    subscription_id,
                    recipient: caller,
                    match_type: MatchType::Appeared,
                    service_id: service.id,
                    generation: service.generation,
                    properties: service.properties.clone(),
                    ttl_secs: service.ttl_secs,
                    orphan_since: service.orphan_since,
                });
            }
        }

        self.subscriptions.insert(
            subscription_id,
            Subscription { id: subscription_id, owner: caller, filter, filter_source, matched },
        );
        self.user_counters.entry(caller_user.clone()).or_default().subscriptions += 1;
        if let Some(client) = self.clients.get_mut(&caller) {
            client.owned_subscriptions.insert(subscription_id);
        }
        Ok(notifications)
    }

    /// Per §4.4: removing a subscription emits no notifications.
    pub fn unsubscribe(
        &mut self,
        caller: ClientId,
        caller_user: &UserIdentity,
        subscription_id: SubscriptionId,
    ) -> Result<(), FailReason> {
        let Some(sub) = self.subscriptions.get(&subscription_id) else {
            return Err(FailReason::NonExistentSubscriptionId);
        };
        if sub.owner != caller {
            return Err(FailReason::NonExistentSubscriptionId);
        }
        self.subscriptions.remove(&subscription_id);
        if let Some(client) = self.clients.get_mut(&caller) {
            client.owned_subscriptions.remove(&subscription_id);
        }
        if let Some(counts) = self.user_counters.get_mut(caller_user) {
            counts.subscriptions = counts.subscriptions.saturating_sub(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathfinder_core::Properties;

    fn caps() -> ResourceCaps {
        ResourceCaps::default()
    }

    fn user() -> UserIdentity {
        UserIdentity("test".to_string())
    }

    fn ids(n: i64) -> ClientId {
        ClientId::new(n).expect("in range")
    }

    #[test]
    fn remove_client_orphans_owned_services_and_returns_their_ttls() {
        let mut domain = Domain::new(caps(), caps(), false);
        let client = ids(1);
        domain.admit_client(client, user(), 3, Instant::now()).expect("admit");
        domain
            .publish(client, &user(), ServiceId::new(10).expect("in range"), 1, Properties::new(), 30)
            .expect("publish");

        let (notifications, orphaned) = domain.remove_client(client, 1_000);

        assert_eq!(orphaned, vec![(ServiceId::new(10).expect("in range"), 30)]);
        assert!(domain.service(ServiceId::new(10).expect("in range")).expect("still present").is_orphan());
        assert!(notifications.is_empty(), "no subscribers were watching");
    }

    #[test]
    fn remove_client_is_a_no_op_for_an_unknown_id() {
        let mut domain = Domain::new(caps(), caps(), false);
        let (notifications, orphaned) = domain.remove_client(ids(7), 1_000);
        assert!(notifications.is_empty());
        assert!(orphaned.is_empty());
    }

    #[test]
    fn touch_activity_advances_last_activity() {
        let mut domain = Domain::new(caps(), caps(), false);
        let client = ids(1);
        let start = Instant::now();
        domain.admit_client(client, user(), 3, start).expect("admit");

        std::thread::sleep(std::time::Duration::from_millis(5));
        let later = Instant::now();
        domain.touch_activity(client, later);

        assert_eq!(domain.client(client).expect("present").last_activity, later);
    }

    #[test]
    fn touch_activity_on_unknown_client_is_a_no_op() {
        let mut domain = Domain::new(caps(), caps(), false);
        domain.touch_activity(ids(42), Instant::now());
    }
}
