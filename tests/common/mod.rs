/// Shared helpers for integration tests.
///
/// The fake device deliberately points at a node that cannot exist so every
/// external probe fails cleanly and runs are deterministic on any machine.
use tempfile::TempDir;
use usb_trim::rules::ArtifactStore;
use usb_trim::schedule::ScheduleConfigurator;
use usb_trim::{DeviceRef, Transport};

pub fn fake_device() -> DeviceRef {
    DeviceRef {
        path: "/dev/usb-trim-itest-missing".to_string(),
        base_name: "usb-trim-itest-missing".to_string(),
        transport: Transport::Usb,
    }
}

/// An artifact store plus the tempdir that owns its rules directory.
pub fn temp_store() -> (TempDir, ArtifactStore) {
    let tmp = TempDir::new().expect("create tempdir");
    let store = ArtifactStore::new(tmp.path().join("rules.d"));
    (tmp, store)
}

/// A schedule configurator pointed at a throwaway drop-in directory.
#[allow(dead_code)]
pub fn temp_schedule() -> (TempDir, ScheduleConfigurator) {
    let tmp = TempDir::new().expect("create tempdir");
    let configurator = ScheduleConfigurator::new(tmp.path().join("fstrim.timer.d"));
    (tmp, configurator)
}
