// Tests for mount table inspection used by the live verification pass.

use crate::verify::find_mount_point;
use crate::{DeviceRef, Transport};

fn usb_device(path: &str, base: &str) -> DeviceRef {
    DeviceRef {
        path: path.to_string(),
        base_name: base.to_string(),
        transport: Transport::Usb,
    }
}

const MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
/dev/sdb1 /media/usb-ssd ext4 rw,relatime 0 0
tmpfs /run tmpfs rw,nosuid,nodev 0 0
";

#[test]
fn test_find_mount_point_for_partition() {
    let device = usb_device("/dev/sdb", "sdb");
    assert_eq!(
        find_mount_point(MOUNTS, &device),
        Some("/media/usb-ssd".to_string())
    );
}

#[test]
fn test_find_mount_point_for_exact_path() {
    let mounts = "/dev/sdc /mnt/raw ext4 rw 0 0\n";
    let device = usb_device("/dev/sdc", "sdc");
    assert_eq!(find_mount_point(mounts, &device), Some("/mnt/raw".to_string()));
}

#[test]
fn test_find_mount_point_none_when_not_mounted() {
    let device = usb_device("/dev/sdz", "sdz");
    assert_eq!(find_mount_point(MOUNTS, &device), None);
}

#[test]
fn test_find_mount_point_ignores_unrelated_devices() {
    // sdb must not match the nvme root filesystem
    let device = usb_device("/dev/sdb", "sdb");
    let found = find_mount_point(MOUNTS, &device).unwrap();
    assert_ne!(found, "/");
}

#[test]
fn test_find_mount_point_empty_table() {
    let device = usb_device("/dev/sdb", "sdb");
    assert_eq!(find_mount_point("", &device), None);
}
