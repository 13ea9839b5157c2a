// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.
//!
//! - [`define_int_id!`] — a `Copy` newtype over a 63-bit non-negative `i64`,
//!   with the validation, `Display`, and `serde` impls every domain id needs.

/// Define a newtype id wrapping a 63-bit non-negative `i64`.
///
/// Client-ids, service-ids, and subscription-ids are all "a 63-bit
/// non-negative integer chosen by the peer" per the protocol spec; this
/// macro gives each its own type so they can't be mixed up at call sites
/// while sharing one validated representation.
///
/// ```ignore
/// define_int_id! {
///     /// Doc comment for the id type.
///     pub struct ClientId;
/// }
/// ```
#[macro_export]
macro_rules! define_int_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            /// Largest value a 63-bit non-negative integer can hold.
            pub const MAX: i64 = i64::MAX >> 1;

            /// Construct from a raw integer, rejecting negative values and
            /// values that don't fit in 63 bits.
            pub fn new(value: i64) -> Result<Self, $crate::id::OutOfRangeError> {
                if (0..=Self::MAX).contains(&value) {
                    Ok(Self(value))
                } else {
                    Err($crate::id::OutOfRangeError { value })
                }
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i64(self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = i64::deserialize(deserializer)?;
                $name::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}
