/// Integration tests for artifact persistence: idempotent writes, overwrite
/// on re-run, and the fatal no-partial-artifact failure path.
mod common;

use common::{fake_device, temp_store};
use std::fs;
use usb_trim::rules::{ArtifactStore, RuleSynthesizer};
use usb_trim::{
    DiscardParameters, HardwareIdentity, IdentityConfidence, TrimError,
};

fn params() -> DiscardParameters {
    DiscardParameters {
        block_size_bytes: 512,
        discard_max_bytes: 2_147_483_648,
    }
}

fn identity() -> HardwareIdentity {
    HardwareIdentity::known(
        "152d".to_string(),
        "0578".to_string(),
        IdentityConfidence::Exact,
    )
}

#[test]
fn test_persist_writes_artifact_to_rules_dir() {
    let (_tmp, store) = temp_store();
    let artifacts =
        RuleSynthesizer::synthesize_into(store.root(), &identity(), &params(), &fake_device());

    let status = store.persist(&artifacts[0]).expect("persist succeeds");
    assert!(status.written);
    assert!(status.destination.exists());
    assert_eq!(
        status.destination.file_name().unwrap(),
        "99-usb-trim-152d-0578.rules"
    );

    let content = fs::read_to_string(&status.destination).unwrap();
    assert_eq!(content, artifacts[0].payload);
}

#[test]
fn test_persist_rerun_is_byte_identical() {
    let (_tmp, store) = temp_store();
    let artifacts =
        RuleSynthesizer::synthesize_into(store.root(), &identity(), &params(), &fake_device());

    let first = store.persist(&artifacts[0]).unwrap();
    let first_bytes = fs::read(&first.destination).unwrap();

    // Re-running with identical inputs overwrites rather than duplicates
    let again =
        RuleSynthesizer::synthesize_into(store.root(), &identity(), &params(), &fake_device());
    let second = store.persist(&again[0]).unwrap();
    let second_bytes = fs::read(&second.destination).unwrap();

    assert_eq!(first.destination, second.destination);
    assert_eq!(first_bytes, second_bytes);

    let entries: Vec<_> = fs::read_dir(store.root()).unwrap().collect();
    assert_eq!(entries.len(), 1, "re-run must not leave extra files");
}

#[test]
fn test_persist_leaves_no_temp_file_behind() {
    let (_tmp, store) = temp_store();
    let artifacts =
        RuleSynthesizer::synthesize_into(store.root(), &identity(), &params(), &fake_device());
    store.persist(&artifacts[0]).unwrap();

    for entry in fs::read_dir(store.root()).unwrap() {
        let name = entry.unwrap().file_name();
        assert!(
            !name.to_string_lossy().ends_with(".tmp"),
            "temporary file {} left behind",
            name.to_string_lossy()
        );
    }
}

#[test]
fn test_persist_fails_when_rules_dir_cannot_be_created() {
    // A plain file where the rules directory should go makes directory
    // creation fail for any caller, privileged or not
    let tmp = tempfile::TempDir::new().unwrap();
    let blocker = tmp.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let store = ArtifactStore::new(blocker.join("rules.d"));
    let artifacts =
        RuleSynthesizer::synthesize_into(store.root(), &identity(), &params(), &fake_device());

    let err = store.persist(&artifacts[0]).expect_err("persist must fail");
    assert!(
        matches!(err, TrimError::ArtifactWrite(_)),
        "expected ArtifactWrite, got {:?}",
        err
    );

    // No partial artifact may be left for that unit
    assert!(!store.root().exists());
}
