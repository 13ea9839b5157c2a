// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An installed subscription (§3).

use std::collections::HashSet;

use pathfinder_core::{ClientId, Filter, ServiceId, SubscriptionId};

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub owner: ClientId,
    /// Absent means match-all.
    pub filter: Option<Filter>,
    /// The filter exactly as the client sent it, kept only to echo back
    /// verbatim from the `subscriptions` command (`Filter` has no
    /// `Display` impl to reconstruct it from).
    pub filter_source: Option<String>,
    pub matched: HashSet<ServiceId>,
}

impl Subscription {
    pub fn matches(&self, properties: &pathfinder_core::Properties) -> bool {
        match &self.filter {
            Some(filter) => filter.matches(properties),
            None => true,
        }
    }
}
