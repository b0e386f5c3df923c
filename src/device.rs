use crate::{DeviceRef, Transport, TrimError, TrimResult};
use log::debug;
use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// Resolve a user-supplied device path into a validated DeviceRef.
///
/// The path must exist, be a block device node, and sit on a USB transport;
/// anything else is rejected before any probe runs.
pub fn resolve(path: &str) -> TrimResult<DeviceRef> {
    let metadata = fs::metadata(path).map_err(|_| TrimError::NotFound(path.to_string()))?;

    if !metadata.file_type().is_block_device() {
        return Err(TrimError::InvalidDevice(format!(
            "{} is not a block device",
            path
        )));
    }

    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TrimError::InvalidDevice(format!("{} has no device name", path)))?;

    if should_skip_device(name) {
        return Err(TrimError::InvalidDevice(format!(
            "{} is a virtual or optical device",
            path
        )));
    }

    let base_name = base_name(name);
    let transport = transport_of(&base_name);
    debug!("resolved {} -> base {} ({:?})", path, base_name, transport);

    if transport != Transport::Usb {
        return Err(TrimError::InvalidDevice(format!(
            "{} is not USB-attached ({:?}); this tool only configures removable USB devices",
            path, transport
        )));
    }

    Ok(DeviceRef {
        path: path.to_string(),
        base_name,
        transport,
    })
}

/// Devices that are never configuration targets: loop devices, ram disks,
/// device mapper nodes, optical drives.
pub(crate) fn should_skip_device(device_name: &str) -> bool {
    device_name.starts_with("loop")
        || device_name.starts_with("ram")
        || device_name.starts_with("dm-")
        || device_name.starts_with("sr")
        || device_name.starts_with("zram")
}

/// Strip a partition suffix from a kernel device name: sdb1 -> sdb,
/// nvme0n1p2 -> nvme0n1. Names without a partition suffix pass through.
pub(crate) fn base_name(name: &str) -> String {
    if let Some(rest) = name.strip_prefix("sd") {
        let letters: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if !letters.is_empty() {
            return format!("sd{}", letters);
        }
    }

    // nvme0n1p2 / mmcblk0p1 style: trailing "p<digits>" after a digit
    if let Some(pos) = name.rfind('p') {
        let tail = &name[pos + 1..];
        if pos > 0
            && !tail.is_empty()
            && tail.chars().all(|c| c.is_ascii_digit())
            && name[..pos].ends_with(|c: char| c.is_ascii_digit())
        {
            return name[..pos].to_string();
        }
    }

    name.to_string()
}

/// Classify the transport of a base device from its sysfs backing link.
pub(crate) fn transport_of(base_name: &str) -> Transport {
    let sys_path = format!("/sys/block/{}/device", base_name);
    let Ok(real_path) = fs::read_link(&sys_path) else {
        return Transport::Other;
    };
    classify_link(&real_path.to_string_lossy(), base_name)
}

pub(crate) fn classify_link(link: &str, base_name: &str) -> Transport {
    if link.contains("usb") {
        Transport::Usb
    } else if base_name.starts_with("nvme") {
        Transport::Nvme
    } else if link.contains("ata") {
        Transport::Ata
    } else {
        Transport::Other
    }
}

/// One attached disk found by the /sys/block scan, for interactive selection.
#[derive(Debug, Clone)]
pub struct DiskCandidate {
    pub path: String,
    pub base_name: String,
    pub model: String,
    pub size_bytes: u64,
}

/// Scan /sys/block for USB-attached disks.
pub fn scan_usb_disks() -> TrimResult<Vec<DiskCandidate>> {
    let mut disks = Vec::new();

    for entry in fs::read_dir("/sys/block")? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy().to_string();

        if should_skip_device(&name) {
            continue;
        }
        if transport_of(&name) != Transport::Usb {
            continue;
        }

        let device_path = format!("/dev/{}", name);
        if !Path::new(&device_path).exists() {
            continue;
        }

        let model = fs::read_to_string(format!("/sys/block/{}/device/model", name))
            .map(|m| m.trim().to_string())
            .unwrap_or_else(|_| "Unknown".to_string());

        // /sys/block/<dev>/size counts 512-byte sectors regardless of the
        // device's logical block size
        let size_bytes = fs::read_to_string(format!("/sys/block/{}/size", name))
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|sectors| sectors * 512)
            .unwrap_or(0);

        disks.push(DiskCandidate {
            path: device_path,
            base_name: name,
            model,
            size_bytes,
        });
    }

    disks.sort_by(|a, b| a.base_name.cmp(&b.base_name));
    Ok(disks)
}
