//! Property-based tests for the package-set and path helpers.

use proptest::prelude::*;

use crate::closure::{parent_packages, PackageSet};
use crate::gitcmd::remote_name;

/// Strategy for plausible import paths: a dotted host followed by one to
/// four path segments.
fn import_path() -> impl Strategy<Value = String> {
    (
        "[a-z]{2,8}\\.[a-z]{2,3}",
        prop::collection::vec("[a-z0-9-]{1,10}", 1..5),
    )
        .prop_map(|(host, segments)| format!("{}/{}", host, segments.join("/")))
}

proptest! {
    #[test]
    fn parent_packages_contains_pkg_itself(pkg in import_path()) {
        let parents = parent_packages("", &pkg);
        prop_assert!(parents.contains(&pkg));
    }

    #[test]
    fn parent_packages_are_all_prefixes(pkg in import_path()) {
        for parent in parent_packages("", &pkg).iter() {
            prop_assert!(
                pkg == parent || pkg.starts_with(&format!("{}/", parent)),
                "'{}' is not a prefix of '{}'",
                parent,
                pkg
            );
        }
    }

    #[test]
    fn parent_packages_stop_at_root(pkg in import_path()) {
        let root = match pkg.rfind('/') {
            Some(idx) => pkg[..idx].to_string(),
            None => return Ok(()),
        };
        let scoped = parent_packages(&root, &pkg);
        prop_assert_eq!(scoped.len(), 1);
        prop_assert!(scoped.contains(&pkg));
    }

    #[test]
    fn merge_is_a_union(
        a in prop::collection::btree_set(import_path(), 0..10),
        b in prop::collection::btree_set(import_path(), 0..10),
    ) {
        let mut merged: PackageSet = a.iter().cloned().collect();
        merged.merge(b.iter().cloned().collect());

        for pkg in a.iter().chain(b.iter()) {
            prop_assert!(merged.contains(pkg));
        }
        prop_assert_eq!(merged.len(), a.union(&b).count());
    }

    #[test]
    fn merge_is_idempotent(a in prop::collection::btree_set(import_path(), 0..10)) {
        let mut merged: PackageSet = a.iter().cloned().collect();
        let again: PackageSet = a.iter().cloned().collect();
        let before = merged.len();
        merged.merge(again);
        prop_assert_eq!(merged.len(), before);
    }

    #[test]
    fn remote_name_is_short_lowercase_hex(url in "[ -~]{0,80}") {
        let name = remote_name(Some(&url));
        if url.is_empty() {
            prop_assert_eq!(name, "origin");
        } else {
            prop_assert_eq!(name.len(), 7);
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn remote_name_is_deterministic(url in "[ -~]{1,80}") {
        prop_assert_eq!(remote_name(Some(&url)), remote_name(Some(&url)));
    }
}
