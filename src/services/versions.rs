//! Version detection for `check`.
//!
//! Known limitation: newness is judged on timestamps alone. An object whose
//! ETag changes while its last-modified time does not strictly advance
//! (clock skew, coarse store timestamps) is not reported.

use crate::models::{object::ObjectRecord, version::Version};

/// Versions in `listing` that are new relative to `prior`, oldest first.
///
/// With no prior version every object is new. With one, objects identical to
/// it (same path and ETag) and objects not strictly newer than it are
/// dropped; if nothing remains the result is exactly `[prior]`, since the
/// driver treats an empty answer as a lost cursor.
pub fn detect_new_versions(listing: &[ObjectRecord], prior: Option<&Version>) -> Vec<Version> {
    let mut versions: Vec<Version> = listing
        .iter()
        .map(ObjectRecord::to_version)
        .filter(|candidate| match prior {
            None => true,
            Some(prior) => {
                !candidate.same_object(prior) && candidate.last_modified > prior.last_modified
            }
        })
        .collect();

    versions.sort_by(Version::chronological);

    match prior {
        Some(prior) if versions.is_empty() => vec![prior.clone()],
        _ => versions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn object(key: &str, etag: &str, d: u32) -> ObjectRecord {
        ObjectRecord::new(key, etag, day(d), 10)
    }

    fn version(path: &str, etag: &str, d: u32) -> Version {
        Version {
            path: path.into(),
            etag: etag.into(),
            last_modified: day(d),
        }
    }

    #[test]
    fn cold_start_returns_everything_oldest_first() {
        let listing = vec![object("data/x.txt", "e1", 2), object("data/y.txt", "e2", 1)];
        let versions = detect_new_versions(&listing, None);
        assert_eq!(
            versions,
            vec![version("data/y.txt", "e2", 1), version("data/x.txt", "e1", 2)]
        );
    }

    #[test]
    fn only_strictly_newer_objects_after_prior() {
        let listing = vec![
            object("data/x.txt", "e1", 2),
            object("data/y.txt", "e2", 1),
            object("data/z.txt", "e3", 3),
        ];
        let prior = version("data/x.txt", "e1", 2);
        let versions = detect_new_versions(&listing, Some(&prior));
        assert_eq!(versions, vec![version("data/z.txt", "e3", 3)]);
    }

    #[test]
    fn nothing_new_echoes_prior() {
        let listing = vec![object("data/x.txt", "e1", 2), object("data/y.txt", "e2", 1)];
        let prior = version("data/x.txt", "e1", 2);
        assert_eq!(detect_new_versions(&listing, Some(&prior)), vec![prior.clone()]);
        assert_eq!(detect_new_versions(&[], Some(&prior)), vec![prior]);
    }

    #[test]
    fn empty_listing_without_prior_is_empty() {
        assert!(detect_new_versions(&[], None).is_empty());
    }

    #[test]
    fn same_timestamp_different_etag_is_not_new() {
        let listing = vec![object("data/x.txt", "changed", 2)];
        let prior = version("data/x.txt", "e1", 2);
        assert_eq!(detect_new_versions(&listing, Some(&prior)), vec![prior]);
    }

    #[test]
    fn ties_sorted_by_path() {
        let listing = vec![
            object("data/b", "1", 5),
            object("data/a", "2", 5),
            object("data/c", "3", 4),
        ];
        let paths: Vec<String> = detect_new_versions(&listing, None)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert_eq!(paths, vec!["data/c", "data/a", "data/b"]);
    }

    #[test]
    fn results_never_contain_prior_and_are_idempotent() {
        let listing = vec![
            object("data/x.txt", "e1", 2),
            object("data/x.txt", "e9", 4),
            object("data/w.txt", "e4", 3),
            object("data/v.txt", "e5", 1),
        ];
        let prior = version("data/x.txt", "e1", 2);

        let first = detect_new_versions(&listing, Some(&prior));
        let second = detect_new_versions(&listing, Some(&prior));
        assert_eq!(first, second);
        assert!(!first.is_empty());
        for v in &first {
            assert!(!v.same_object(&prior));
            assert!(v.last_modified > prior.last_modified);
        }
        assert_eq!(
            first,
            vec![version("data/w.txt", "e4", 3), version("data/x.txt", "e9", 4)]
        );
    }
}
