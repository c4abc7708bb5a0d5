//! Unit tests for package installation and deletion.

use std::fs;
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::registry::InMemoryRegistry;
use crate::tests::support::{manifest_json, zip_archive};

struct InstallerFixture {
    installer: PackageInstaller,
    registry: Arc<InMemoryRegistry>,
    root: TempDir,
}

#[fixture]
fn fixture() -> InstallerFixture {
    let root = TempDir::new().expect("create temp dir");
    let registry = Arc::new(InMemoryRegistry::new());
    let installer = PackageInstaller::new(
        PackageStore::new(root.path()),
        Arc::clone(&registry) as Arc<dyn RegistryAdapter>,
        1024 * 1024,
    );
    InstallerFixture {
        installer,
        registry,
        root,
    }
}

fn package_count(root: &TempDir) -> usize {
    fs::read_dir(root.path())
        .expect("read plugin root")
        .count()
}

// ---------------------------------------------------------------------------
// Successful installs
// ---------------------------------------------------------------------------

#[rstest]
fn install_commits_package_and_record(fixture: InstallerFixture) {
    let archive = zip_archive(&[
        ("plugin.json", &manifest_json("resize")),
        ("main.lua", "function run(input) return input end"),
    ]);
    let record = fixture.installer.install(&archive).expect("install");

    assert_eq!(record.name(), "resize");
    assert_eq!(record.entry_point(), "main.run");
    assert!(record.enabled());

    let dir = fixture.installer.store().package_dir(record.id());
    assert!(dir.join("plugin.json").is_file());
    assert!(dir.join("main.lua").is_file());
    assert!(
        fixture
            .registry
            .get(record.id())
            .expect("lookup")
            .is_some()
    );
}

#[rstest]
fn install_preserves_nested_directories(fixture: InstallerFixture) {
    let archive = zip_archive(&[
        ("plugin.json", &manifest_json("nested")),
        ("main.lua", "function run(input) return 1 end"),
        ("lib/helpers.lua", "return {}"),
    ]);
    let record = fixture.installer.install(&archive).expect("install");
    let dir = fixture.installer.store().package_dir(record.id());
    assert!(dir.join("lib").join("helpers.lua").is_file());
}

#[rstest]
fn install_assigns_unique_identifiers(fixture: InstallerFixture) {
    let first = fixture
        .installer
        .install(&zip_archive(&[
            ("plugin.json", &manifest_json("one")),
            ("main.lua", ""),
        ]))
        .expect("install one");
    let second = fixture
        .installer
        .install(&zip_archive(&[
            ("plugin.json", &manifest_json("two")),
            ("main.lua", ""),
        ]))
        .expect("install two");
    assert_ne!(first.id(), second.id());
}

// ---------------------------------------------------------------------------
// Validation failures are all-or-nothing
// ---------------------------------------------------------------------------

#[rstest]
fn missing_metadata_file_rolls_back(fixture: InstallerFixture) {
    let archive = zip_archive(&[("main.lua", "function run(input) return 1 end")]);
    let err = fixture.installer.install(&archive).expect_err("reject");
    assert!(matches!(err, PluginError::Validation { .. }), "got: {err}");
    assert!(err.to_string().contains("plugin.json"), "got: {err}");
    assert_eq!(package_count(&fixture.root), 0);
    assert!(fixture.registry.list().expect("list").is_empty());
}

#[rstest]
fn metadata_without_name_rolls_back(fixture: InstallerFixture) {
    let archive = zip_archive(&[
        ("plugin.json", r#"{"version": "1.0"}"#),
        ("main.lua", ""),
    ]);
    let err = fixture.installer.install(&archive).expect_err("reject");
    assert!(matches!(err, PluginError::Validation { .. }), "got: {err}");
    assert_eq!(package_count(&fixture.root), 0);
    assert!(fixture.registry.list().expect("list").is_empty());
}

#[rstest]
fn duplicate_name_rolls_back_second_install(fixture: InstallerFixture) {
    let archive = zip_archive(&[
        ("plugin.json", &manifest_json("resize")),
        ("main.lua", ""),
    ]);
    fixture.installer.install(&archive).expect("first install");
    let err = fixture
        .installer
        .install(&archive)
        .expect_err("second install must fail");
    assert!(matches!(err, PluginError::DuplicateName { .. }), "got: {err}");
    // Only the first package remains on disk.
    assert_eq!(package_count(&fixture.root), 1);
    assert_eq!(fixture.registry.list().expect("list").len(), 1);
}

#[rstest]
fn traversal_entry_is_fatal(fixture: InstallerFixture) {
    let archive = zip_archive(&[
        ("plugin.json", &manifest_json("evil")),
        ("../escape.lua", "function run(input) return 1 end"),
    ]);
    let err = fixture.installer.install(&archive).expect_err("reject");
    assert!(matches!(err, PluginError::Validation { .. }), "got: {err}");
    assert!(err.to_string().contains("escapes"), "got: {err}");
    assert_eq!(package_count(&fixture.root), 0);
    assert!(!fixture.root.path().join("..").join("escape.lua").exists());
}

#[rstest]
#[case::garbage(b"not a zip archive".to_vec())]
#[case::empty_zip(zip_archive(&[]))]
fn malformed_archives_are_rejected(fixture: InstallerFixture, #[case] archive: Vec<u8>) {
    let err = fixture.installer.install(&archive).expect_err("reject");
    assert!(matches!(err, PluginError::Validation { .. }), "got: {err}");
    assert_eq!(package_count(&fixture.root), 0);
}

#[rstest]
fn oversized_archive_is_rejected_before_extraction(fixture: InstallerFixture) {
    let installer = PackageInstaller::new(
        PackageStore::new(fixture.root.path()),
        Arc::clone(&fixture.registry) as Arc<dyn RegistryAdapter>,
        16,
    );
    let archive = zip_archive(&[("plugin.json", &manifest_json("big"))]);
    let err = installer.install(&archive).expect_err("reject");
    assert!(matches!(err, PluginError::Validation { .. }), "got: {err}");
    assert!(err.to_string().contains("limit"), "got: {err}");
    assert_eq!(package_count(&fixture.root), 0);
}

// ---------------------------------------------------------------------------
// Deletion keeps package and record in lockstep
// ---------------------------------------------------------------------------

#[rstest]
fn delete_removes_both_artifacts(fixture: InstallerFixture) {
    let record = fixture
        .installer
        .install(&zip_archive(&[
            ("plugin.json", &manifest_json("resize")),
            ("main.lua", ""),
        ]))
        .expect("install");
    let removed = fixture.installer.delete(record.id()).expect("delete");
    assert_eq!(removed.id(), record.id());
    assert_eq!(package_count(&fixture.root), 0);
    assert!(fixture.registry.get(record.id()).expect("lookup").is_none());
}

#[rstest]
fn delete_unknown_id_reports_not_found(fixture: InstallerFixture) {
    let err = fixture.installer.delete("ghost").expect_err("reject");
    assert!(matches!(err, PluginError::NotFound { .. }), "got: {err}");
}

#[rstest]
fn delete_retry_tolerates_missing_directory(fixture: InstallerFixture) {
    let record = fixture
        .installer
        .install(&zip_archive(&[
            ("plugin.json", &manifest_json("resize")),
            ("main.lua", ""),
        ]))
        .expect("install");
    // Simulate a partial prior failure where only the directory was removed.
    fs::remove_dir_all(fixture.installer.store().package_dir(record.id()))
        .expect("remove package dir");
    fixture.installer.delete(record.id()).expect("retry delete");
    assert!(fixture.registry.get(record.id()).expect("lookup").is_none());
}

// ---------------------------------------------------------------------------
// Metadata read-through
// ---------------------------------------------------------------------------

#[rstest]
fn read_manifest_returns_ui_schema_verbatim(fixture: InstallerFixture) {
    let manifest = r#"{
        "name": "resize",
        "description": "Resizes images",
        "ui_schema": [{"field": "width", "type": "number"}]
    }"#;
    let record = fixture
        .installer
        .install(&zip_archive(&[("plugin.json", manifest), ("main.lua", "")]))
        .expect("install");
    let parsed = fixture
        .installer
        .read_manifest(record.id())
        .expect("read manifest");
    assert_eq!(parsed.name(), "resize");
    assert_eq!(
        parsed.ui_schema(),
        &[serde_json::json!({"field": "width", "type": "number"})]
    );
}

#[rstest]
fn read_manifest_unknown_id_reports_not_found(fixture: InstallerFixture) {
    let err = fixture.installer.read_manifest("ghost").expect_err("reject");
    assert!(matches!(err, PluginError::NotFound { .. }), "got: {err}");
}

#[rstest]
fn read_manifest_with_vanished_metadata_reports_not_found(fixture: InstallerFixture) {
    let record = fixture
        .installer
        .install(&zip_archive(&[
            ("plugin.json", &manifest_json("resize")),
            ("main.lua", ""),
        ]))
        .expect("install");
    // A record can outlive its package when the directory is tampered with.
    fs::remove_file(fixture.installer.store().metadata_path(record.id()))
        .expect("remove metadata file");
    let err = fixture
        .installer
        .read_manifest(record.id())
        .expect_err("reject");
    assert!(matches!(err, PluginError::NotFound { .. }), "got: {err}");
    assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
}
