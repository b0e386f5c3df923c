use crate::probes::runner;
use crate::{
    ArtifactSelector, ArtifactStatus, ConfigArtifact, DeviceRef, DiscardParameters,
    HardwareIdentity, TrimError, TrimResult,
};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory the rule engine watches for declarative configuration.
pub const RULES_DIR: &str = "/etc/udev/rules.d";

/// Renders identity + capability + parameter facts into declarative rule
/// artifacts. Pure: no I/O beyond returning data; persistence and
/// activation are separate steps owned by the orchestrator.
pub struct RuleSynthesizer;

impl RuleSynthesizer {
    /// Synthesize artifacts targeting the system rules directory.
    pub fn synthesize(
        identity: &HardwareIdentity,
        params: &DiscardParameters,
        device: &DeviceRef,
    ) -> Vec<ConfigArtifact> {
        Self::synthesize_into(Path::new(RULES_DIR), identity, params, device)
    }

    /// Synthesize artifacts with an explicit destination directory.
    ///
    /// Identity-selector artifacts are preferred whenever the identity is
    /// known; the name-selector form is the fallback and carries its own
    /// warning about kernel-name instability. Output is deterministic:
    /// identical inputs produce byte-identical payloads and paths.
    pub fn synthesize_into(
        rules_dir: &Path,
        identity: &HardwareIdentity,
        params: &DiscardParameters,
        device: &DeviceRef,
    ) -> Vec<ConfigArtifact> {
        let artifact = match (&identity.vendor_id, &identity.product_id, identity.is_known()) {
            (Some(vendor), Some(product), true) => ConfigArtifact {
                selector: ArtifactSelector::Identity {
                    vendor: vendor.clone(),
                    product: product.clone(),
                },
                payload: render_identity_rule(vendor, product, params.discard_max_bytes),
                destination: rules_dir.join(format!("99-usb-trim-{}-{}.rules", vendor, product)),
            },
            _ => ConfigArtifact {
                selector: ArtifactSelector::Name {
                    kernel_name: device.base_name.clone(),
                },
                payload: render_name_rule(&device.base_name, params.discard_max_bytes),
                destination: rules_dir.join(format!("99-usb-trim-{}.rules", device.base_name)),
            },
        };

        vec![artifact]
    }
}

/// Identity-selector rule: match on USB vendor/product attributes, set the
/// discard limit on the block queue and the provisioning mode on the
/// scsi_disk node.
fn render_identity_rule(vendor: &str, product: &str, discard_max_bytes: u64) -> String {
    format!(
        "# TRIM/unmap configuration for USB device {vendor}:{product}\n\
         # Managed by usb-trim; re-running the tool overwrites this file.\n\
         ACTION==\"add|change\", ATTRS{{idVendor}}==\"{vendor}\", ATTRS{{idProduct}}==\"{product}\", SUBSYSTEM==\"block\", ATTR{{queue/discard_max_bytes}}=\"{discard_max_bytes}\"\n\
         ACTION==\"add|change\", ATTRS{{idVendor}}==\"{vendor}\", ATTRS{{idProduct}}==\"{product}\", SUBSYSTEM==\"scsi_disk\", ATTR{{provisioning_mode}}=\"unmap\"\n"
    )
}

/// Name-selector rule: same two effects keyed on the kernel device name.
/// Only emitted when no hardware identity could be resolved.
fn render_name_rule(kernel_name: &str, discard_max_bytes: u64) -> String {
    format!(
        "# TRIM/unmap configuration for device name \"{kernel_name}\"\n\
         # Managed by usb-trim; re-running the tool overwrites this file.\n\
         # WARNING: matched by kernel device name, which is not a stable\n\
         # hardware identifier. Re-attaching on another port may assign a\n\
         # different name and leave this rule inert or misapplied.\n\
         ACTION==\"add|change\", KERNEL==\"{kernel_name}\", SUBSYSTEM==\"block\", ATTR{{queue/discard_max_bytes}}=\"{discard_max_bytes}\"\n\
         ACTION==\"add|change\", KERNELS==\"{kernel_name}\", SUBSYSTEM==\"scsi_disk\", ATTR{{provisioning_mode}}=\"unmap\"\n"
    )
}

/// Persists configuration artifacts.
///
/// Writes go through a temporary file renamed into place so a failed write
/// never leaves a partial artifact behind. Re-running with identical inputs
/// rewrites the same bytes at the same path.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn system() -> Self {
        Self::new(PathBuf::from(RULES_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one artifact to its destination. Directory creation or write
    /// failure is fatal for the run.
    pub fn persist(&self, artifact: &ConfigArtifact) -> TrimResult<ArtifactStatus> {
        fs::create_dir_all(&self.root).map_err(|e| {
            TrimError::ArtifactWrite(format!(
                "cannot create rules directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let file_name = artifact
            .destination
            .file_name()
            .ok_or_else(|| TrimError::ArtifactWrite("artifact has no file name".to_string()))?;
        let final_path = self.root.join(file_name);
        let tmp_path = self.root.join(format!("{}.tmp", file_name.to_string_lossy()));

        fs::write(&tmp_path, &artifact.payload).map_err(|e| {
            // Leave nothing half-written behind
            let _ = fs::remove_file(&tmp_path);
            TrimError::ArtifactWrite(format!("cannot write {}: {}", tmp_path.display(), e))
        })?;
        fs::rename(&tmp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            TrimError::ArtifactWrite(format!("cannot install {}: {}", final_path.display(), e))
        })?;

        info!("wrote configuration artifact {}", final_path.display());
        Ok(ArtifactStatus {
            destination: final_path,
            written: true,
            detail: None,
        })
    }
}

/// Ask the rule engine to re-read its rule files. Best-effort.
pub fn reload_rules() {
    let output = runner::run("udevadm", &["control", "--reload-rules"]);
    if !output.ok() {
        warn!("udev rules reload failed: {}", output.stderr.trim());
    }
}

/// Ask the rule engine to re-evaluate rules for the target device so the
/// new configuration applies without a re-attach. Best-effort: activation
/// commonly needs a fresh attach event, so failure here is reported, not
/// fatal.
pub fn trigger_device(device: &DeviceRef) {
    let output = runner::run(
        "udevadm",
        &["trigger", "--action=change", &format!("--name-match={}", device.path)],
    );
    if !output.ok() {
        warn!(
            "udev re-evaluation for {} failed: {}",
            device.path,
            output.stderr.trim()
        );
    }
}
