// tests/mirror_workflow.rs

//! End-to-end tests of sync, refresh, validation and purge against a fake
//! manifest tree and an in-memory transfer.

mod common;

use common::{open, setup_project, FakeTransfer, ManifestTree, TEST_REVISION};
use std::fs;
use winget_mirror::hash::sha256;
use winget_mirror::state::{MirrorState, STATE_FILE};
use winget_mirror::{FileStatus, PackageFilter, PackageIdentity, PackageStatus, VerifyStatus};

fn contoso_app() -> PackageIdentity {
    PackageIdentity::new("Contoso", "App")
}

#[test]
fn test_sync_two_installers_then_validate() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();

    let x64 = sha256(b"x64 installer");
    let arm = sha256(b"arm64 installer");
    ManifestTree::new(&mirror).add_version(
        &id,
        "1.0.0",
        &[
            ("https://dl.contoso.com/app-x64.msi", Some(x64.to_uppercase().as_str())),
            ("https://dl.contoso.com/app-arm64.msi", Some(arm.as_str())),
        ],
    );
    let transfer = FakeTransfer::new()
        .serve("https://dl.contoso.com/app-x64.msi", b"x64 installer")
        .serve("https://dl.contoso.com/app-arm64.msi", b"arm64 installer");

    let summary = mirror
        .sync(&PackageFilter::parse("contoso").unwrap(), TEST_REVISION, &transfer)
        .unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.downloaded, 1);
    assert!(summary.failed.is_empty());

    let record = mirror.state().record(&id).unwrap();
    assert_eq!(record.files.len(), 2);
    assert_eq!(record.files["app-x64.msi"], x64);
    assert_eq!(record.git_revision, TEST_REVISION);

    let report = mirror.verify(&id).unwrap();
    assert_eq!(report.status, VerifyStatus::Checked);
    assert!(report.valid);
    assert!(report.files.values().all(|c| c.status == FileStatus::Match));

    // Persisted and visible to a fresh session
    let reloaded = MirrorState::load(&project.join(STATE_FILE)).unwrap();
    assert_eq!(reloaded.record(&id), mirror.state().record(&id));
    assert!(reloaded.last_sync.is_some());
}

#[test]
fn test_declared_hash_mismatch_still_verifies() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();

    ManifestTree::new(&mirror).add_version(
        &id,
        "2.1",
        &[("https://dl.contoso.com/setup.exe", Some("ab".repeat(32).as_str()))],
    );
    let transfer = FakeTransfer::new().serve("https://dl.contoso.com/setup.exe", b"served bytes");

    let summary = mirror
        .sync(&PackageFilter::parse("Contoso/App").unwrap(), TEST_REVISION, &transfer)
        .unwrap();
    assert_eq!(summary.downloaded, 1);
    assert_eq!(
        mirror.state().record(&id).unwrap().files["setup.exe"],
        sha256(b"served bytes")
    );

    let report = mirror.verify(&id).unwrap();
    assert!(report.valid);
    assert_eq!(report.files["setup.exe"].status, FileStatus::Match);
}

#[test]
fn test_deleted_file_is_reported_missing() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();

    ManifestTree::new(&mirror).add_version(&id, "1.0", &[("https://e.com/a.zip", None)]);
    let transfer = FakeTransfer::new().serve("https://e.com/a.zip", b"zip");
    mirror
        .sync(&PackageFilter::parse("Contoso").unwrap(), TEST_REVISION, &transfer)
        .unwrap();

    fs::remove_file(mirror.layout().download_dir(&id, "1.0").join("a.zip")).unwrap();

    let summary = mirror.verify_all();
    assert!(!summary.all_valid);
    let report = &summary.packages["Contoso.App"];
    assert_eq!(report.missing_files, vec!["a.zip"]);
    assert!(!report.valid);
}

#[test]
fn test_second_sync_is_noop() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();

    ManifestTree::new(&mirror).add_version(&id, "1.0", &[("https://e.com/a.msi", None)]);
    let transfer = FakeTransfer::new().serve("https://e.com/a.msi", b"a");
    let filter = PackageFilter::parse("Contoso").unwrap();

    mirror.sync(&filter, TEST_REVISION, &transfer).unwrap();
    let before = mirror.state().record(&id).cloned();

    let summary = mirror.sync(&filter, "another-revision", &transfer).unwrap();
    assert_eq!(summary.up_to_date, 1);
    assert_eq!(summary.downloaded, 0);
    assert_eq!(transfer.calls().len(), 1);
    assert_eq!(mirror.state().record(&id).cloned(), before);
}

#[test]
fn test_refresh_moves_to_newer_version() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();
    let tree = ManifestTree::new(&mirror);

    tree.add_version(&id, "1.0", &[("https://e.com/1.0/app.exe", None)]);
    let transfer = FakeTransfer::new()
        .serve("https://e.com/1.0/app.exe", b"one")
        .serve("https://e.com/1.1/app.exe", b"one-one");
    mirror
        .sync(&PackageFilter::parse("Contoso").unwrap(), "rev-a", &transfer)
        .unwrap();

    // Nothing newer yet
    let summary = mirror.refresh("rev-a", &transfer).unwrap();
    assert!(summary.updated.is_empty());

    tree.add_version(&id, "1.1", &[("https://e.com/1.1/app.exe", None)]);
    let summary = mirror.refresh("rev-b", &transfer).unwrap();
    assert_eq!(
        summary.updated,
        vec![("Contoso.App".to_string(), "1.0".to_string(), "1.1".to_string())]
    );

    let record = mirror.state().record(&id).unwrap();
    assert_eq!(record.version, "1.1");
    assert_eq!(record.git_revision, "rev-b");
    assert_eq!(record.files["app.exe"], sha256(b"one-one"));
    assert!(mirror.verify(&id).unwrap().valid);
}

#[test]
fn test_sync_keeps_newer_record_when_tree_is_older() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();
    let tree = ManifestTree::new(&mirror);
    let filter = PackageFilter::parse("Contoso").unwrap();

    tree.add_version(&id, "2.0", &[("https://e.com/2.0/app.exe", None)]);
    let transfer = FakeTransfer::new()
        .serve("https://e.com/2.0/app.exe", b"two")
        .serve("https://e.com/1.0/app.exe", b"one");
    mirror.sync(&filter, "rev-new", &transfer).unwrap();

    // Tree checked out at an older revision that only knows 1.0
    let v2_manifests = mirror.layout().primary_manifest_path(&id, "2.0");
    fs::remove_dir_all(v2_manifests.parent().unwrap()).unwrap();
    tree.add_version(&id, "1.0", &[("https://e.com/1.0/app.exe", None)]);

    let summary = mirror.sync(&filter, "rev-old", &transfer).unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(transfer.calls().len(), 1);

    let record = mirror.state().record(&id).unwrap();
    assert_eq!(record.version, "2.0");
    assert_eq!(record.git_revision, "rev-new");
    assert!(mirror.layout().download_dir(&id, "2.0").join("app.exe").is_file());
    assert!(mirror.verify(&id).unwrap().valid);
}

#[test]
fn test_latest_version_with_mixed_version_names() {
    let (_tmp, project) = setup_project();
    let mirror = open(&project);
    let id = contoso_app();
    let tree = ManifestTree::new(&mirror);

    for version in ["1.1.0.0", "1.5-1", "1.2"] {
        tree.add_version(&id, version, &[]);
    }
    assert_eq!(mirror.resolver().latest_version(&id).unwrap(), "1.5-1");
}

#[test]
fn test_transfer_failure_does_not_abort_batch() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let broken = PackageIdentity::new("Contoso", "Broken");
    let good = contoso_app();
    let tree = ManifestTree::new(&mirror);

    tree.add_version(&broken, "1.0", &[("https://e.com/missing.exe", None)]);
    tree.add_version(&good, "1.0", &[("https://e.com/good.exe", None)]);
    let transfer = FakeTransfer::new().serve("https://e.com/good.exe", b"good");

    let summary = mirror
        .sync(&PackageFilter::parse("Contoso").unwrap(), TEST_REVISION, &transfer)
        .unwrap();
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "Contoso.Broken");

    assert!(mirror.state().record(&broken).unwrap().files.is_empty());
    assert_eq!(mirror.state().record(&good).unwrap().files.len(), 1);
}

#[test]
fn test_unsupported_manifest_is_skipped() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = PackageIdentity::new("Contoso", "Legacy");
    ManifestTree::new(&mirror).write(
        mirror.layout().primary_manifest_path(&id, "3.0"),
        "ManifestVersion: 0.1.0\nInstallers:\n  - InstallerUrl: https://e.com/legacy.exe\n",
    );

    let transfer = FakeTransfer::new();
    let summary = mirror
        .sync(&PackageFilter::parse("Contoso").unwrap(), TEST_REVISION, &transfer)
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert!(transfer.calls().is_empty());
    assert!(mirror.state().record(&id).is_none());
}

#[test]
fn test_purge_twice() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();

    ManifestTree::new(&mirror).add_version(&id, "1.0", &[("https://e.com/a.msi", None)]);
    let transfer = FakeTransfer::new().serve("https://e.com/a.msi", b"a");
    mirror
        .sync(&PackageFilter::parse("Contoso").unwrap(), TEST_REVISION, &transfer)
        .unwrap();

    let targets = mirror.tracked_matching("cont");
    assert_eq!(targets, vec![id.clone()]);
    assert_eq!(mirror.purge(&targets).unwrap(), 1);
    assert!(!mirror.layout().download_dir(&id, "1.0").exists());
    assert!(mirror.state().record(&id).is_none());
    assert_eq!(mirror.verify(&id).unwrap().status, VerifyStatus::NotTracked);

    assert_eq!(mirror.purge(&targets).unwrap(), 0);
}

#[test]
fn test_search_reports_status() {
    let (_tmp, project) = setup_project();
    let mut mirror = open(&project);
    let synced = contoso_app();
    let other = PackageIdentity::new("Contoso", "Other");
    let tree = ManifestTree::new(&mirror);

    tree.add_version(&synced, "1.0", &[("https://e.com/a.msi", None)]);
    tree.add_version(&other, "4.2", &[("https://e.com/o.msi", None)]);
    let transfer = FakeTransfer::new().serve("https://e.com/a.msi", b"a");
    mirror
        .sync(&PackageFilter::parse("Contoso/App").unwrap(), TEST_REVISION, &transfer)
        .unwrap();

    let rows = mirror.search("contoso");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].identity, synced);
    assert_eq!(rows[0].status, PackageStatus::Downloaded);
    assert_eq!(rows[0].version.as_deref(), Some("1.0"));
    assert_eq!(rows[1].status, PackageStatus::NotDownloaded);
}

#[test]
fn test_patch_repo_rewrites_installer_urls() {
    let (tmp, project) = setup_project();
    let mut mirror = open(&project);
    let id = contoso_app();

    ManifestTree::new(&mirror).add_version(&id, "1.0", &[("https://e.com/dl/app.msi", None)]);
    let transfer = FakeTransfer::new().serve("https://e.com/dl/app.msi", b"a");
    mirror
        .sync(&PackageFilter::parse("Contoso").unwrap(), TEST_REVISION, &transfer)
        .unwrap();

    let output = tmp.path().join("patched");
    let patched = mirror
        .patch_repo(&output, Some("https://mirror.example.com/"))
        .unwrap();
    assert_eq!(patched, 1);

    let content = fs::read_to_string(
        output.join("manifests/c/Contoso/App/1.0/Contoso.App.yaml"),
    )
    .unwrap();
    assert!(content.contains("https://mirror.example.com/downloads/Contoso/App/1.0/app.msi"));
    assert!(!content.contains("https://e.com/dl/app.msi"));
}
