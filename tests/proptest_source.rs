//! Property-based tests for source resolution.

use devloop::source::{escape_for_os, resolve};
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn segment() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,11}").expect("Valid regex")
}

fn git_ref() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9][a-zA-Z0-9._-]{0,15}").expect("Valid regex")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn vendor_name_is_remote(vendor in segment(), name in segment()) {
        let empty = TempDir::new().unwrap();
        let source = resolve(empty.path(), &format!("{}/{}", vendor, name)).unwrap();

        prop_assert!(!source.local);
        prop_assert_eq!(source.runtime_name(), name.clone());
        prop_assert_eq!(source.runtime_source(), format!("{}/{}", vendor, name));
        prop_assert_eq!(source.reference.as_str(), "latest");
    }

    #[test]
    fn explicit_ref_becomes_version(vendor in segment(), name in segment(), r in git_ref()) {
        let empty = TempDir::new().unwrap();
        let source = resolve(empty.path(), &format!("{}/{}@{}", vendor, name, r)).unwrap();

        prop_assert_eq!(&source.reference, &r);
        prop_assert_eq!(source.runtime_name(), name);
    }

    #[test]
    fn folder_names_the_service(
        vendor in segment(),
        repo in segment(),
        folders in prop::collection::vec(segment(), 1..4),
    ) {
        let empty = TempDir::new().unwrap();
        let reference = format!("github.com/{}/{}/{}", vendor, repo, folders.join("/"));
        let source = resolve(empty.path(), &reference).unwrap();

        prop_assert!(!source.local);
        prop_assert_eq!(source.runtime_name(), folders.last().unwrap().clone());
        prop_assert_eq!(source.runtime_source(), reference);
    }

    #[test]
    fn existing_directory_is_local(name in segment()) {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(&name)).unwrap();

        let source = resolve(temp.path(), &format!("./{}", name)).unwrap();

        prop_assert!(source.local);
        prop_assert_eq!(source.runtime_name(), name);
        let runtime_source = source.runtime_source();
        let path = Path::new(&runtime_source);
        prop_assert!(path.is_absolute());
        prop_assert!(path.is_dir());
    }

    #[test]
    fn windows_escaping_drops_only_the_first_colon(s in "[a-zA-Z:/\\\\]{0,20}") {
        let escaped = escape_for_os(&s, Some("windows"));

        if let Some(idx) = s.find(':') {
            prop_assert_eq!(escaped.len(), s.len() - 1);
            prop_assert_eq!(&escaped[..idx], &s[..idx]);
            prop_assert_eq!(&escaped[idx..], &s[idx + 1..]);
        } else {
            prop_assert_eq!(&escaped, &s);
        }
        prop_assert_eq!(escape_for_os(&s, Some("linux")), s.clone());
        prop_assert_eq!(escape_for_os(&s, None), s);
    }
}
