use crate::probes::runner;
use crate::{
    CapabilityVerdict, DeviceRef, DiscardParameters, DEFAULT_BLOCK_SIZE_BYTES,
    DISCARD_MAX_BYTES_CEILING,
};
use log::{debug, warn};

/// Converts capability hints into a bounded byte-level discard limit.
pub struct ParameterCalculator;

impl ParameterCalculator {
    /// Determine the logical block size, then derive the discard limit.
    pub fn calculate(device: &DeviceRef, verdict: &CapabilityVerdict) -> DiscardParameters {
        let block_size_bytes = Self::probe_block_size(device);
        let discard_max_bytes = discard_limit_bytes(verdict.max_unmap_lba_count, block_size_bytes);
        debug!(
            "parameters: block size {} B, discard limit {} B",
            block_size_bytes, discard_max_bytes
        );
        DiscardParameters {
            block_size_bytes,
            discard_max_bytes,
        }
    }

    /// Query the capacity page for the logical block length; default to 512
    /// on any failure or non-positive parse.
    fn probe_block_size(device: &DeviceRef) -> u32 {
        let output = runner::run("sg_readcap", &["--long", &device.path]);
        if !output.ok() {
            warn!(
                "capacity query unavailable for {}; assuming {}-byte blocks",
                device.path, DEFAULT_BLOCK_SIZE_BYTES
            );
            return DEFAULT_BLOCK_SIZE_BYTES;
        }
        match parse_logical_block_length(&output.stdout) {
            Some(size) if size > 0 => size,
            _ => {
                warn!(
                    "capacity page had no usable block length; assuming {}",
                    DEFAULT_BLOCK_SIZE_BYTES
                );
                DEFAULT_BLOCK_SIZE_BYTES
            }
        }
    }
}

/// Derive the byte-level discard limit from an unmap unit count and block
/// size.
///
/// A zero unit count is a valid "no discard limit benefit" outcome, not an
/// error, and always yields zero. Otherwise the product is computed in
/// 128-bit arithmetic so it cannot overflow, then clamped to the ceiling to
/// avoid passing degenerate values to the kernel-facing attribute.
pub fn discard_limit_bytes(max_unmap_lba_count: u64, block_size_bytes: u32) -> u64 {
    if max_unmap_lba_count == 0 {
        return 0;
    }
    let product = max_unmap_lba_count as u128 * block_size_bytes as u128;
    product.min(DISCARD_MAX_BYTES_CEILING as u128) as u64
}

/// Extract the labeled "Logical block length" field from a long-form
/// capacity dump, e.g. "   Logical block length=512 bytes".
pub(crate) fn parse_logical_block_length(output: &str) -> Option<u32> {
    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Logical block length") {
            let value = rest.trim_start_matches(['=', ':']).trim();
            let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                return digits.parse().ok();
            }
        }
    }
    None
}
