use crate::probes::runner;
use crate::DeviceRef;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;

/// Result of the live verification pass, for the final report.
///
/// Verification never alters prior decisions: a failure here commonly
/// means the new rules have not been applied yet (activation may require a
/// fresh attach event), not that the configuration is wrong.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub attempted: bool,
    pub succeeded: bool,
    pub detail: String,
}

impl VerificationOutcome {
    fn skipped(detail: &str) -> Self {
        Self {
            attempted: false,
            succeeded: false,
            detail: detail.to_string(),
        }
    }
}

/// Attempts to exercise the configured discard behavior live.
pub struct VerificationRunner;

impl VerificationRunner {
    /// Run a one-shot discard pass against a mounted filesystem of the
    /// device, if any.
    pub fn verify(device: &DeviceRef) -> VerificationOutcome {
        let mounts = match fs::read_to_string("/proc/mounts") {
            Ok(mounts) => mounts,
            Err(e) => {
                warn!("cannot read mount table: {}", e);
                return VerificationOutcome::skipped("mount table unavailable");
            }
        };

        let Some(mount_point) = find_mount_point(&mounts, device) else {
            info!("no mounted filesystem on {}; skipping live check", device.path);
            return VerificationOutcome::skipped(
                "no mounted filesystem on the device; mount one and re-run to verify",
            );
        };

        let output = runner::run("fstrim", &["-v", &mount_point]);
        if output.ok() {
            VerificationOutcome {
                attempted: true,
                succeeded: true,
                detail: output.stdout.trim().to_string(),
            }
        } else {
            // Typical pre-reboot failure: "the discard operation is not
            // supported" until the rules apply on the next attach
            let text = if output.stderr.trim().is_empty() {
                "discard pass failed".to_string()
            } else {
                output.stderr.trim().to_string()
            };
            warn!("live discard pass on {} failed: {}", mount_point, text);
            VerificationOutcome {
                attempted: true,
                succeeded: false,
                detail: text,
            }
        }
    }
}

/// Find a mount point backed by the device or one of its partitions.
pub(crate) fn find_mount_point(mounts: &str, device: &DeviceRef) -> Option<String> {
    let base_node = format!("/dev/{}", device.base_name);

    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let (Some(source), Some(target)) = (fields.next(), fields.next()) else {
            continue;
        };
        if source == device.path || source.starts_with(&base_node) {
            return Some(target.to_string());
        }
    }

    None
}
