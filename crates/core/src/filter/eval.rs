// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluating a parsed [`Filter`] against a service's [`Properties`].

use super::ast::{CompareOp, Filter};
use crate::properties::Properties;

impl Filter {
    /// True iff `properties` satisfies this filter.
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            Filter::And(list) => list.iter().all(|f| f.matches(properties)),
            Filter::Or(list) => list.iter().any(|f| f.matches(properties)),
            Filter::Not(inner) => !inner.matches(properties),
            Filter::Present { key } => properties.has_key(key),
            Filter::Substring { key, pattern } => properties.substring_matches(key, pattern),
            Filter::Simple { key, op, value } => match op {
                CompareOp::Eq => properties.equals(key, value),
                CompareOp::Lt => value.as_int().is_some_and(|v| properties.less_than(key, v)),
                CompareOp::Gt => value.as_int().is_some_and(|v| properties.greater_than(key, v)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use crate::properties::Properties;
    use crate::scalar::Scalar;
    use proptest::prelude::*;

    fn props(pairs: &[(&str, Scalar)]) -> Properties {
        let mut p = Properties::new();
        for (k, v) in pairs {
            p.insert(*k, v.clone());
        }
        p
    }

    #[test]
    fn scenario_filter_semantics() {
        // services (name=foo, ver=10) and (name=foo, ver=20); subscribing
        // to (&(name=foo)(ver>15)) should match only the ver=20 service.
        let low = props(&[("name", Scalar::String("foo".into())), ("ver", Scalar::Int(10))]);
        let high = props(&[("name", Scalar::String("foo".into())), ("ver", Scalar::Int(20))]);
        let filter = parse("(&(name=foo)(ver>15))").unwrap();
        assert!(!filter.matches(&low));
        assert!(filter.matches(&high));
    }

    #[test]
    fn presence_and_empty_substring_are_equivalent() {
        // P10: a substring filter without chunks (k=*) is equivalent to a
        // presence test.
        let with_value = props(&[("name", Scalar::String("foo".into()))]);
        let without = Properties::new();

        let presence = parse("(name=*)").unwrap();
        assert!(presence.matches(&with_value));
        assert!(!presence.matches(&without));
    }

    #[test]
    fn and_of_one_is_identity() {
        // P9: (& filter) == filter
        let service = props(&[("name", Scalar::String("foo".into()))]);
        let plain = parse("(name=foo)").unwrap();
        let wrapped = parse("(&(name=foo))").unwrap();
        assert_eq!(plain.matches(&service), wrapped.matches(&service));
    }

    #[test]
    fn double_negation_is_identity() {
        // P9: (! ! filter) == filter
        let service = props(&[("name", Scalar::String("foo".into()))]);
        let plain = parse("(name=foo)").unwrap();
        let double_negated = parse("(!(!(name=foo)))").unwrap();
        assert_eq!(plain.matches(&service), double_negated.matches(&service));
    }

    proptest! {
        #[test]
        fn double_negation_identity_holds_for_any_name(name in "[a-z]{1,8}", candidate in "[a-z]{1,8}") {
            let service = props(&[("name", Scalar::String(candidate.clone()))]);
            let raw = format!("(name={name})");
            let plain = parse(&raw).unwrap();
            let double_negated = parse(&format!("(!(!{raw}))")).unwrap();
            prop_assert_eq!(plain.matches(&service), double_negated.matches(&service));
        }
    }
}
