use crate::probes::runner;
use crate::{CapabilityVerdict, DeviceRef, VerdictSource, DEFAULT_UNMAP_LBA_COUNT};
use log::{info, warn};

/// Determines whether the device/transport reports TRIM/unmap support.
///
/// Never fails: a missing probe tool degrades confidence, it does not
/// abort the run.
pub struct CapabilityProber;

impl CapabilityProber {
    /// Probe the device and produce a capability verdict.
    ///
    /// The primary path queries the SCSI block-limits and logical-block
    /// provisioning pages; the fallback is an hdparm identification scan
    /// for a free-text TRIM marker. The fallback can flip a negative
    /// primary result to positive, but never revisits an established
    /// positive one.
    pub fn probe(device: &DeviceRef) -> CapabilityVerdict {
        let bl = runner::run("sg_vpd", &["--page=bl", &device.path]);
        let count = if bl.ok() {
            parse_max_unmap_count(&bl.stdout).unwrap_or_else(|| {
                warn!("block limits page had no parseable unmap count");
                0
            })
        } else {
            warn!("block limits query unavailable for {}", device.path);
            0
        };

        let lbpv = runner::run("sg_vpd", &["--page=lbpv", &device.path]);
        let flag = if lbpv.ok() {
            parse_lbpu_flag(&lbpv.stdout).unwrap_or(false)
        } else {
            warn!("logical block provisioning query unavailable for {}", device.path);
            false
        };

        // Fallback only consulted when the primary signals disagree or a
        // query failed outright.
        let fallback_indicated = if count == 0 || !flag || !bl.ok() || !lbpv.ok() {
            let ident = runner::run("hdparm", &["-I", &device.path]);
            ident.ok() && hdparm_indicates_trim(&ident.stdout)
        } else {
            false
        };

        let mut verdict = verdict_from_signals(flag, count, fallback_indicated);

        // The fallback cannot raise the unmap count on its own; when it
        // alone established support, substitute the conservative default.
        if verdict.supported && verdict.max_unmap_lba_count == 0 {
            info!(
                "fallback indicated support with zero unmap count; substituting default {}",
                DEFAULT_UNMAP_LBA_COUNT
            );
            substitute_default_count(&mut verdict);
        }

        verdict
    }
}

/// Combine the three capability signals into a verdict.
///
/// `supported = (flag AND count > 0) OR fallback`. The primary path
/// requires both signals to agree; the fallback path alone can override a
/// negative primary result but never a positive one already established.
pub fn verdict_from_signals(flag: bool, count: u64, fallback_indicated: bool) -> CapabilityVerdict {
    let primary = flag && count > 0;
    let supported = primary || fallback_indicated;

    let source = if primary {
        VerdictSource::ProtocolPrimary
    } else if fallback_indicated {
        VerdictSource::ProtocolFallback
    } else {
        VerdictSource::None
    };

    CapabilityVerdict {
        supported,
        max_unmap_lba_count: count,
        source,
    }
}

/// Replace a zero unmap count with the conservative default. No-op when a
/// real count is already known.
pub fn substitute_default_count(verdict: &mut CapabilityVerdict) {
    if verdict.max_unmap_lba_count == 0 {
        verdict.max_unmap_lba_count = DEFAULT_UNMAP_LBA_COUNT;
    }
}

/// Extract the labeled "Maximum unmap LBA count" field from a block-limits
/// VPD page dump.
pub(crate) fn parse_max_unmap_count(output: &str) -> Option<u64> {
    parse_labeled_number(output, "Maximum unmap LBA count")
}

/// Extract the labeled LBPU boolean from a logical-block-provisioning VPD
/// page dump. Ambiguous or missing output is `None`.
pub(crate) fn parse_lbpu_flag(output: &str) -> Option<bool> {
    for line in output.lines() {
        let line = line.trim();
        if !line.contains("Unmap command supported (LBPU)") {
            continue;
        }
        let value = line.rsplit(':').next()?.trim();
        return match value {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        };
    }
    None
}

/// Free-text TRIM capability marker in `hdparm -I` identification output.
pub(crate) fn hdparm_indicates_trim(output: &str) -> bool {
    output.contains("Data Set Management TRIM supported")
        || output.contains("TRIM supported")
        || output.contains("Deterministic read data after TRIM")
}

/// Parse `<label>: <n>` from a labeled probe dump, tolerating indentation.
fn parse_labeled_number(output: &str, label: &str) -> Option<u64> {
    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(label) {
            let value = rest.trim_start_matches(':').trim();
            let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                return digits.parse().ok();
            }
        }
    }
    None
}
