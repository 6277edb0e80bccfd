//! # Release Tag Selection
//!
//! This module picks the most recent release from a list of version-control
//! references, such as the ref column of `git ls-remote --tags`.
//!
//! ## Parsing
//!
//! A reference is reduced to its last path segment (`refs/tags/v1.2.3`
//! becomes `v1.2.3`), a leading `v` is dropped, and the rest must be a plain
//! `MAJOR.MINOR.PATCH` release. Anything else is skipped rather than read as
//! version zero:
//!
//! - branch names and free-form tags (`main`, `latest`)
//! - incomplete versions (`v1.2`) or extra components (`v1.2.3.4`)
//! - pre-releases and build metadata (`v1.2.3-rc.1`, `v1.2.3+build.5`)
//!
//! ## Ordering
//!
//! Releases compare numerically by major, then minor, then patch, so
//! `v20.1.2` beats `v20.0.1` and `v0.10.0` beats `v0.3.1`.

use semver::Version;

/// Parse a reference into a release version.
///
/// Returns `None` for references that are not plain `MAJOR.MINOR.PATCH`
/// releases.
pub fn parse_release_tag(reference: &str) -> Option<Version> {
    let name = tag_name(reference);
    let version_str = name.strip_prefix('v').unwrap_or(name);
    let version = Version::parse(version_str).ok()?;
    (version.pre.is_empty() && version.build.is_empty()).then_some(version)
}

/// Return the tag name of the highest release in `refs`.
///
/// The structural prefix is removed from the result (`refs/tags/v20.1.2`
/// yields `v20.1.2`). When several references hold the same version, the
/// first one wins. Returns `None` when nothing parses.
pub fn highest_tag<S>(refs: &[S]) -> Option<String>
where
    S: AsRef<str>,
{
    let mut highest: Option<(&str, Version)> = None;

    for reference in refs {
        let reference = reference.as_ref();
        let Some(version) = parse_release_tag(reference) else {
            continue;
        };
        match &highest {
            Some((_, current)) if *current >= version => {}
            _ => highest = Some((tag_name(reference), version)),
        }
    }

    highest.map(|(tag, _)| tag.to_string())
}

/// The last path segment of a reference.
fn tag_name(reference: &str) -> &str {
    reference
        .trim()
        .rsplit_once('/')
        .map_or(reference.trim(), |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_tag_orders_numerically() {
        let tags = vec![
            "refs/tags/v0.0.1",
            "refs/tags/v0.0.2",
            "refs/tags/v0.10.0",
            "refs/tags/v20.0.1",
            "refs/tags/v0.3.1",
            "refs/tags/v20.1.2",
            "refs/tags/v0.5.1",
        ];
        assert_eq!(highest_tag(&tags), Some("v20.1.2".to_string()));
    }

    #[test]
    fn test_highest_tag_minor_beats_lexicographic_order() {
        let tags = ["v0.3.1", "v0.10.0", "v0.9.9"];
        assert_eq!(highest_tag(&tags), Some("v0.10.0".to_string()));
    }

    #[test]
    fn test_highest_tag_skips_unparseable() {
        let tags = [
            "refs/tags/main",
            "refs/tags/v1.2",
            "refs/tags/v1.2.3.4",
            "refs/tags/vX.1.0",
            "refs/tags/v3.0.0-rc.1",
            "refs/tags/v2.9.0",
            "refs/heads/feature/v9",
        ];
        assert_eq!(highest_tag(&tags), Some("v2.9.0".to_string()));
    }

    #[test]
    fn test_highest_tag_empty_or_unparseable_is_none() {
        let empty: [&str; 0] = [];
        assert_eq!(highest_tag(&empty), None);
        assert_eq!(highest_tag(&["main", "latest", "v1"]), None);
    }

    #[test]
    fn test_highest_tag_first_of_equal_versions_wins() {
        let tags = ["refs/tags/1.0.0", "refs/tags/v1.0.0"];
        assert_eq!(highest_tag(&tags), Some("1.0.0".to_string()));
    }

    #[test]
    fn test_highest_tag_accepts_owned_strings() {
        let tags = vec!["v1.0.0".to_string(), "v1.1.0".to_string()];
        assert_eq!(highest_tag(&tags), Some("v1.1.0".to_string()));
    }

    #[test]
    fn test_parse_release_tag() {
        assert_eq!(
            parse_release_tag("refs/tags/v20.1.2"),
            Some(Version::new(20, 1, 2))
        );
        assert_eq!(parse_release_tag("1.0.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse_release_tag("v1.0.0+build.1"), None);
        assert_eq!(parse_release_tag("v1.0.0-alpha"), None);
        assert_eq!(parse_release_tag("v"), None);
        assert_eq!(parse_release_tag(""), None);
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(tag_name("refs/tags/v1.0.0"), "v1.0.0");
        assert_eq!(tag_name("v1.0.0"), "v1.0.0");
        assert_eq!(tag_name(" refs/tags/v1.0.0 \n"), "v1.0.0");
    }
}
