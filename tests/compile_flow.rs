//! End-to-end cache behaviour of `compile_package`
//!
//! Each test drives the real cache and pipeline against a fake fetcher and
//! shell-script toolchain, across several build directories sharing one
//! cache directory, the way consecutive deploys do.

#![cfg(unix)]

mod common;

use common::{FakeFetcher, pipeline, request};
use slugforge::cache::{
    self, ArtifactCache, CONFIGURE_OPTIONS_FILE, METADATA_DIR, SECONDARY_VERSION_FILE,
};
use slugforge::build::compile_package;
use slugforge::fingerprint::{Decision, Fingerprint, RebuildReason};
use slugforge::package::PackageProfile;
use std::fs;

#[test]
fn test_first_build_fetches_compiles_and_stores() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let build_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);

    let req = request(&profile, &[("NGINX_VERSION", "1.7.9")]);
    let outcome =
        compile_package(&profile, &req, build_dir.path(), &cache, &pipeline(&profile, fetcher.clone()))
            .unwrap();

    assert_eq!(outcome.decision, Decision::Rebuild(RebuildReason::NoCache));
    assert_eq!(
        fetcher.fetched(),
        vec![
            "https://fake.invalid/nginx-1.7.9.tar.gz".to_string(),
            "https://fake.invalid/pcre-8.36.tar.gz".to_string(),
        ]
    );
    assert_eq!(fetcher.compile_count(), 1);
    assert_eq!(fetcher.configure_log(), vec!["--with-pcre=pcre-8.36".to_string()]);

    let expected = Fingerprint::new("1.7.9", "8.36", "");
    let stored = cache::read_metadata(&cache.metadata_dir()).unwrap().unwrap();
    assert_eq!(stored, expected);
    let mirrored = cache::read_metadata(&build_dir.path().join(METADATA_DIR))
        .unwrap()
        .unwrap();
    assert_eq!(mirrored, expected);

    assert!(cache.binary_path().is_file());
    assert_eq!(
        fs::read_to_string(profile.vendor_bin_dir(build_dir.path()).join("nginx")).unwrap(),
        "nginx-binary"
    );
    assert!(!profile.workspace_dir(build_dir.path()).exists());
}

#[test]
fn test_identical_request_restores_without_compiling() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);
    let req = request(&profile, &[("NGINX_VERSION", "1.7.9")]);

    let first = tempfile::tempdir().unwrap();
    compile_package(&profile, &req, first.path(), &cache, &pipeline(&profile, fetcher.clone()))
        .unwrap();

    let again = request(&profile, &[("NGINX_VERSION", "1.7.9")]);
    let second = tempfile::tempdir().unwrap();
    let outcome =
        compile_package(&profile, &again, second.path(), &cache, &pipeline(&profile, fetcher.clone()))
            .unwrap();

    assert_eq!(outcome.decision, Decision::Reuse);
    assert_eq!(fetcher.fetched().len(), 2);
    assert_eq!(fetcher.compile_count(), 1);
    assert!(outcome.binary_path.is_file());
    assert_eq!(outcome.binary_path, profile.vendor_bin_dir(second.path()).join("nginx"));
    let mirrored = cache::read_metadata(&second.path().join(METADATA_DIR))
        .unwrap()
        .unwrap();
    assert_eq!(mirrored, Fingerprint::new("1.7.9", "8.36", ""));
}

#[test]
fn test_changed_options_purge_and_rebuild() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);

    let first = tempfile::tempdir().unwrap();
    let req = request(&profile, &[("NGINX_VERSION", "1.7.9")]);
    compile_package(&profile, &req, first.path(), &cache, &pipeline(&profile, fetcher.clone()))
        .unwrap();

    // A leftover file proves the old entry is purged, not merged into.
    fs::write(cache.bin_dir().join("stale"), "old").unwrap();

    let second = tempfile::tempdir().unwrap();
    let changed = request(
        &profile,
        &[("NGINX_VERSION", "1.7.9"), ("NGINX_CONFIGURE_OPTIONS", "--with-foo")],
    );
    let outcome =
        compile_package(&profile, &changed, second.path(), &cache, &pipeline(&profile, fetcher.clone()))
            .unwrap();

    match outcome.decision {
        Decision::Rebuild(RebuildReason::Changed { previous }) => {
            assert_eq!(previous, Fingerprint::new("1.7.9", "8.36", ""));
        }
        other => panic!("expected rebuild, got {other:?}"),
    }
    assert_eq!(fetcher.compile_count(), 2);
    assert_eq!(
        fetcher.configure_log().last().unwrap(),
        "--with-pcre=pcre-8.36 --with-foo"
    );
    assert_eq!(
        cache::read_metadata(&cache.metadata_dir()).unwrap().unwrap(),
        Fingerprint::new("1.7.9", "8.36", "--with-foo")
    );
    assert!(!cache.bin_dir().join("stale").exists());
}

#[test]
fn test_each_single_field_change_rebuilds() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);

    let sequence: [&[(&str, &str)]; 4] = [
        &[("NGINX_VERSION", "1.7.9"), ("PCRE_VERSION", "8.36")],
        &[("NGINX_VERSION", "1.7.10"), ("PCRE_VERSION", "8.36")],
        &[("NGINX_VERSION", "1.7.10"), ("PCRE_VERSION", "8.35")],
        &[
            ("NGINX_VERSION", "1.7.10"),
            ("PCRE_VERSION", "8.35"),
            ("NGINX_CONFIGURE_OPTIONS", "--with-http_ssl_module"),
        ],
    ];
    for (i, pairs) in sequence.iter().enumerate() {
        let build = tempfile::tempdir().unwrap();
        let req = request(&profile, pairs);
        let outcome =
            compile_package(&profile, &req, build.path(), &cache, &pipeline(&profile, fetcher.clone()))
                .unwrap();
        assert!(!outcome.decision.is_reuse(), "step {i}");
        assert_eq!(fetcher.compile_count(), i + 1);
    }
}

#[test]
fn test_system_secondary_skips_fetch_and_flag() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let build_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);

    let req = request(
        &profile,
        &[
            ("NGINX_VERSION", "1.7.9"),
            ("PCRE_VERSION", "system"),
            ("NGINX_CONFIGURE_OPTIONS", "--with-http_ssl_module"),
        ],
    );
    compile_package(&profile, &req, build_dir.path(), &cache, &pipeline(&profile, fetcher.clone()))
        .unwrap();

    assert_eq!(
        fetcher.fetched(),
        vec!["https://fake.invalid/nginx-1.7.9.tar.gz".to_string()]
    );
    assert_eq!(fetcher.configure_log(), vec!["--with-http_ssl_module".to_string()]);
    assert_eq!(
        cache::read_metadata(&cache.metadata_dir()).unwrap().unwrap(),
        Fingerprint::new("1.7.9", "system", "--with-http_ssl_module")
    );
}

#[test]
fn test_missing_metadata_file_forces_rebuild() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);
    let req = request(&profile, &[("NGINX_VERSION", "1.7.9")]);

    let first = tempfile::tempdir().unwrap();
    compile_package(&profile, &req, first.path(), &cache, &pipeline(&profile, fetcher.clone()))
        .unwrap();
    fs::remove_file(cache.metadata_dir().join(SECONDARY_VERSION_FILE)).unwrap();

    let second = tempfile::tempdir().unwrap();
    let outcome =
        compile_package(&profile, &req, second.path(), &cache, &pipeline(&profile, fetcher.clone()))
            .unwrap();
    assert!(matches!(
        outcome.decision,
        Decision::Rebuild(RebuildReason::MissingMetadata(_))
    ));
    assert_eq!(fetcher.compile_count(), 2);
}

#[test]
fn test_unsafe_range_builds_default_version() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let build_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);

    let req = request(&profile, &[("NGINX_VERSION", ">1.7")]);
    compile_package(&profile, &req, build_dir.path(), &cache, &pipeline(&profile, fetcher.clone()))
        .unwrap();
    assert_eq!(
        fetcher.fetched()[0],
        format!("https://fake.invalid/nginx-{}.tar.gz", profile.default_version)
    );
}

#[test]
fn test_corrupt_metadata_rebuilds_instead_of_failing() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);
    let req = request(&profile, &[("NGINX_VERSION", "1.7.9")]);

    let first = tempfile::tempdir().unwrap();
    compile_package(&profile, &req, first.path(), &cache, &pipeline(&profile, fetcher.clone()))
        .unwrap();
    fs::write(cache.metadata_dir().join(CONFIGURE_OPTIONS_FILE), [0xc3, 0x28]).unwrap();

    let second = tempfile::tempdir().unwrap();
    let outcome =
        compile_package(&profile, &req, second.path(), &cache, &pipeline(&profile, fetcher.clone()))
            .unwrap();
    assert_eq!(
        outcome.decision,
        Decision::Rebuild(RebuildReason::MissingMetadata(vec![CONFIGURE_OPTIONS_FILE]))
    );
    assert_eq!(fetcher.compile_count(), 2);
    assert_eq!(
        cache::read_metadata(&cache.metadata_dir()).unwrap().unwrap(),
        Fingerprint::new("1.7.9", "8.36", "")
    );
}

#[test]
fn test_padded_options_stored_byte_exact() {
    let profile = PackageProfile::nginx();
    let cache_dir = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let fetcher = FakeFetcher::new(logs.path());
    let cache = ArtifactCache::new(cache_dir.path(), &profile);

    let first = tempfile::tempdir().unwrap();
    let padded = request(
        &profile,
        &[("NGINX_VERSION", "1.7.9"), ("NGINX_CONFIGURE_OPTIONS", " --with-foo ")],
    );
    compile_package(&profile, &padded, first.path(), &cache, &pipeline(&profile, fetcher.clone()))
        .unwrap();
    assert_eq!(
        fs::read(cache.metadata_dir().join(CONFIGURE_OPTIONS_FILE)).unwrap(),
        b" --with-foo "
    );

    let second = tempfile::tempdir().unwrap();
    let tight = request(
        &profile,
        &[("NGINX_VERSION", "1.7.9"), ("NGINX_CONFIGURE_OPTIONS", "--with-foo")],
    );
    let outcome =
        compile_package(&profile, &tight, second.path(), &cache, &pipeline(&profile, fetcher.clone()))
            .unwrap();
    assert!(matches!(
        outcome.decision,
        Decision::Rebuild(RebuildReason::Changed { .. })
    ));
}
