// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire encoding of the property multimap: a JSON object mapping
//! `string -> array of (string | integer)`. The array form preserves
//! whatever duplicates the peer sent; folding it into
//! [`pathfinder_core::Properties`]' set semantics is what makes the
//! result "a deterministic sort-independent multimap" regardless of the
//! array's element order.

use pathfinder_core::{Properties, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireProperties(pub HashMap<String, Vec<Scalar>>);

impl From<&Properties> for WireProperties {
    fn from(props: &Properties) -> Self {
        let mut map = HashMap::new();
        for (key, values) in props.iter() {
            let mut values: Vec<Scalar> = values.iter().cloned().collect();
            values.sort_by_key(ToString::to_string);
            map.insert(key.to_string(), values);
        }
        WireProperties(map)
    }
}

impl From<WireProperties> for Properties {
    fn from(wire: WireProperties) -> Self {
        wire.0.into_iter().flat_map(|(key, values)| values.into_iter().map(move |v| (key.clone(), v))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_folds_duplicates_into_a_set() {
        let wire = WireProperties(HashMap::from([(
            "name".to_string(),
            vec![Scalar::String("foo".into()), Scalar::String("foo".into())],
        )]));
        let props: Properties = wire.into();
        assert_eq!(props.get("name").map(|v| v.len()), Some(1));
    }

    #[test]
    fn decode_is_sort_independent() {
        let forward = WireProperties(HashMap::from([(
            "tags".to_string(),
            vec![Scalar::String("a".into()), Scalar::String("b".into())],
        )]));
        let backward = WireProperties(HashMap::from([(
            "tags".to_string(),
            vec![Scalar::String("b".into()), Scalar::String("a".into())],
        )]));
        let props_a: Properties = forward.into();
        let props_b: Properties = backward.into();
        assert_eq!(props_a, props_b);
    }

    #[test]
    fn round_trips_through_json() {
        let mut props = Properties::new();
        props.insert("ver", Scalar::Int(10));
        props.insert("name", Scalar::String("foo".into()));
        let wire = WireProperties::from(&props);
        let encoded = serde_json::to_string(&wire).unwrap();
        let decoded: WireProperties = serde_json::from_str(&encoded).unwrap();
        let round_tripped: Properties = decoded.into();
        assert_eq!(props, round_tripped);
    }
}
