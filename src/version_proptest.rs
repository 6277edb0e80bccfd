//! Property-based tests for release tag selection.
//!
//! These tests use proptest to generate random tag lists and verify that
//! `highest_tag` always returns a present, maximal release.

#[cfg(test)]
mod proptest_tests {
    use crate::version::{highest_tag, parse_release_tag};
    use proptest::prelude::*;
    use semver::Version;

    /// A reference that may or may not be a parseable release tag.
    fn reference() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u64..50, 0u64..50, 0u64..50)
                .prop_map(|(major, minor, patch)| format!("refs/tags/v{}.{}.{}", major, minor, patch)),
            (0u64..50, 0u64..50).prop_map(|(major, minor)| format!("refs/tags/v{}.{}", major, minor)),
            "[a-z]{1,8}".prop_map(|name| format!("refs/tags/{}", name)),
            (0u64..50, 0u64..50, 0u64..50)
                .prop_map(|(major, minor, patch)| format!("v{}.{}.{}-rc.1", major, minor, patch)),
        ]
    }

    proptest! {
        /// Property: the result parses and is present in the input
        #[test]
        fn highest_tag_is_present(refs in prop::collection::vec(reference(), 0..20)) {
            if let Some(tag) = highest_tag(&refs) {
                prop_assert!(parse_release_tag(&tag).is_some());
                prop_assert!(
                    refs.iter().any(|r| r.ends_with(&format!("/{}", tag)) || *r == tag),
                    "{} not found in {:?}",
                    tag,
                    refs
                );
            }
        }

        /// Property: no parseable entry is greater than the result
        #[test]
        fn highest_tag_is_maximal(refs in prop::collection::vec(reference(), 0..20)) {
            let parsed: Vec<Version> = refs.iter().filter_map(|r| parse_release_tag(r)).collect();
            match highest_tag(&refs) {
                Some(tag) => {
                    let best = parse_release_tag(&tag).unwrap();
                    for version in &parsed {
                        prop_assert!(*version <= best);
                    }
                }
                None => prop_assert!(parsed.is_empty()),
            }
        }

        /// Property: input order does not change the selected version
        #[test]
        fn highest_tag_is_order_independent(refs in prop::collection::vec(reference(), 1..20)) {
            let mut reversed = refs.clone();
            reversed.reverse();
            let forward = highest_tag(&refs).and_then(|t| parse_release_tag(&t));
            let backward = highest_tag(&reversed).and_then(|t| parse_release_tag(&t));
            prop_assert_eq!(forward, backward);
        }
    }
}
