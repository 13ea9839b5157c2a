// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-readable `fail-reason` values. These are not Rust errors — a
//! `fail` message is an expected, recoverable per-transaction outcome, so
//! this type carries no `std::error::Error` impl.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailReason {
    NoHello,
    ClientIdExists,
    UnsupportedProtocolVersion,
    PermissionDenied,
    InsufficientResources,
    SubscriptionIdExists,
    NonExistentSubscriptionId,
    NonExistentServiceId,
    OldGeneration,
    SameGenerationButDifferent,
    InvalidFilterSyntax,
}
