// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain identifiers: client-id, service-id, subscription-id.
//!
//! All three share the same wire representation (a JSON number, 63-bit
//! non-negative) but are distinct Rust types so a service-id can't be
//! passed where a subscription-id is expected.

use std::fmt;

/// A value didn't fit in the 63-bit non-negative range the protocol
/// requires for client/service/subscription/transaction ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRangeError {
    pub value: i64,
}

impl fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a valid 63-bit non-negative integer", self.value)
    }
}

impl std::error::Error for OutOfRangeError {}

crate::define_int_id! {
    /// Identity of a connected client, chosen by the peer at `hello` and
    /// unique within the domain while the session is live.
    pub struct ClientId;
}

crate::define_int_id! {
    /// Identity of a published service record, globally unique within the
    /// domain for the record's whole lifetime (I1: never reassigned).
    pub struct ServiceId;
}

crate::define_int_id! {
    /// Identity of an installed subscription, unique within the domain
    /// while the subscription is live.
    pub struct SubscriptionId;
}

/// A transaction id: non-negative, unique among a connection's
/// non-terminated transactions, but *not* globally unique (each connection
/// has its own id space) so it is not defined via [`crate::define_int_id!`].
pub type TransactionId = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative() {
        assert!(ClientId::new(-1).is_err());
    }

    #[test]
    fn rejects_too_large() {
        assert!(ServiceId::new(i64::MAX).is_err());
        assert!(ServiceId::new(ServiceId::MAX).is_ok());
    }

    #[test]
    fn distinct_types_dont_coerce() {
        let c = ClientId::new(4711).unwrap();
        let s = ServiceId::new(4711).unwrap();
        assert_eq!(c.get(), s.get());
    }

    #[test]
    fn round_trips_through_json() {
        let id = SubscriptionId::new(99).unwrap();
        let encoded = serde_json::to_string(&id).unwrap();
        assert_eq!(encoded, "99");
        let decoded: SubscriptionId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, id);
    }
}
