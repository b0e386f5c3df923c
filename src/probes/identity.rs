use crate::probes::runner;
use crate::{DeviceRef, HardwareIdentity, IdentityConfidence};
use log::{debug, info};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Resolves a stable USB vendor:product identity for a device.
///
/// Strategies are tried in decreasing order of trust; the first one that
/// yields a well-formed pair wins. Total failure is a valid outcome
/// (confidence `None`), never an error.
pub struct IdentityResolver;

type Strategy = fn(&DeviceRef) -> Option<(String, String)>;

impl IdentityResolver {
    pub fn resolve(device: &DeviceRef) -> HardwareIdentity {
        let strategies: [(&str, Strategy, IdentityConfidence); 3] = [
            (
                "device property query",
                Self::query_device_properties,
                IdentityConfidence::Exact,
            ),
            (
                "topology traversal",
                Self::walk_usb_topology,
                IdentityConfidence::Derived,
            ),
            (
                "scsi/usb text correlation",
                Self::correlate_scsi_usb,
                IdentityConfidence::Heuristic,
            ),
        ];

        for (name, strategy, confidence) in strategies {
            if let Some((vendor, product)) = strategy(device) {
                info!(
                    "identity {}:{} resolved via {} ({:?})",
                    vendor, product, name, confidence
                );
                return HardwareIdentity::known(vendor, product, confidence);
            }
            debug!("identity strategy '{}' yielded nothing", name);
        }

        info!("hardware identity could not be resolved for {}", device.path);
        HardwareIdentity::unknown()
    }

    /// Strategy 1: structured property query via udevadm.
    ///
    /// Accepts a pair only if both values are well-formed 4-hex-digit
    /// strings; partial or malformed matches are rejected silently.
    fn query_device_properties(device: &DeviceRef) -> Option<(String, String)> {
        let output = runner::run(
            "udevadm",
            &[
                "info",
                "--query=property",
                &format!("--name={}", device.base_name),
            ],
        );
        if !output.ok() {
            return None;
        }
        parse_udevadm_properties(&output.stdout)
    }

    /// Strategy 2: resolve the sysfs backing link and walk the USB topology
    /// upward looking for idVendor/idProduct attribute files.
    fn walk_usb_topology(device: &DeviceRef) -> Option<(String, String)> {
        let link = PathBuf::from(format!("/sys/block/{}/device", device.base_name));
        let start = fs::canonicalize(&link).ok()?;
        walk_for_identity(&start, Path::new("/sys"))
    }

    /// Strategy 3: heuristic free-text correlation between lsscsi and lsusb.
    fn correlate_scsi_usb(device: &DeviceRef) -> Option<(String, String)> {
        let scsi = runner::run("lsscsi", &[]);
        if !scsi.ok() {
            return None;
        }
        let usb = runner::run("lsusb", &[]);
        if !usb.ok() {
            return None;
        }
        correlate_listings(&scsi.stdout, &usb.stdout, &device.base_name)
    }
}

fn hex4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{4}$").unwrap())
}

fn id_pair_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9a-fA-F]{4}):([0-9a-fA-F]{4})").unwrap())
}

/// Well-formed 4-hex-digit identifier check, used by strategy 1 and by
/// manual identity entry.
pub fn is_hex4(value: &str) -> bool {
    hex4_regex().is_match(value)
}

/// Extract ID_VENDOR_ID / ID_MODEL_ID from `udevadm info --query=property`
/// output. Both must be present and well-formed.
pub(crate) fn parse_udevadm_properties(output: &str) -> Option<(String, String)> {
    let mut vendor = None;
    let mut product = None;

    for line in output.lines() {
        if let Some(value) = line.strip_prefix("ID_VENDOR_ID=") {
            vendor = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("ID_MODEL_ID=") {
            product = Some(value.trim().to_string());
        }
    }

    match (vendor, product) {
        (Some(v), Some(p)) if is_hex4(&v) && is_hex4(&p) => Some((v, p)),
        _ => None,
    }
}

/// Walk from `start` up to `root`, checking each node and its immediate
/// parent for identity attribute files. USB interface vs device nodes vary
/// in depth, which is why the sibling parent is checked at every step.
pub(crate) fn walk_for_identity(start: &Path, root: &Path) -> Option<(String, String)> {
    let mut node = start.to_path_buf();

    while node.starts_with(root) && node != root {
        if let Some(pair) = read_identity_attrs(&node) {
            return Some(pair);
        }
        let parent = node.parent()?.to_path_buf();
        if parent.starts_with(root) {
            if let Some(pair) = read_identity_attrs(&parent) {
                return Some(pair);
            }
        }
        node = parent;
    }

    None
}

fn read_identity_attrs(dir: &Path) -> Option<(String, String)> {
    let vendor = fs::read_to_string(dir.join("idVendor")).ok()?;
    let product = fs::read_to_string(dir.join("idProduct")).ok()?;
    let vendor = vendor.trim().to_string();
    let product = product.trim().to_string();
    (is_hex4(&vendor) && is_hex4(&product)).then_some((vendor, product))
}

/// Correlate the lsscsi row for `base_name` with the lsusb device listing:
/// pull a vendor/model substring from the SCSI row, then take the first
/// syntactic xxxx:xxxx pair on a lsusb line containing that substring
/// (case-insensitive).
pub(crate) fn correlate_listings(
    lsscsi: &str,
    lsusb: &str,
    base_name: &str,
) -> Option<(String, String)> {
    let device_node = format!("/dev/{}", base_name);
    let row = lsscsi
        .lines()
        .find(|line| line.split_whitespace().any(|field| field == device_node))?;

    for needle in scsi_row_keywords(row) {
        let needle_lower = needle.to_lowercase();
        for line in lsusb.lines() {
            if !line.to_lowercase().contains(&needle_lower) {
                continue;
            }
            if let Some(caps) = id_pair_regex().captures(line) {
                return Some((caps[1].to_string(), caps[2].to_string()));
            }
        }
    }

    None
}

/// Candidate vendor/model substrings from one lsscsi row. Layout is
/// `[H:C:T:L] disk VENDOR MODEL REV /dev/sdX`; the vendor and model fields
/// are the most distinctive tokens.
fn scsi_row_keywords(row: &str) -> Vec<String> {
    row.split_whitespace()
        .skip(2)
        .filter(|field| !field.starts_with("/dev/"))
        .filter(|field| field.len() >= 3)
        .map(|field| field.to_string())
        .collect()
}
