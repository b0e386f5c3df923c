// Tests for discard parameter derivation: block size parsing, the
// zero-count rule, ceiling clamping, and overflow behavior.

use crate::params::*;
use crate::{DEFAULT_BLOCK_SIZE_BYTES, DISCARD_MAX_BYTES_CEILING};
use test_case::test_case;

// ============================================================================
// Logical Block Length Parsing Tests
// ============================================================================

#[test]
fn test_parse_logical_block_length_from_readcap_output() {
    let output = r#"Read Capacity results:
   Protection: prot_en=0, p_type=0, p_i_exponent=0
   Logical block provisioning: lbpme=1, lbprz=1
   Last LBA=976773167 (0x3a386f2f), Number of logical blocks=976773168
   Logical block length=512 bytes
   Logical blocks per physical block exponent=3 [so physical block length=4096 bytes]
   Lowest aligned LBA=0
Hence:
   Device size: 500107862016 bytes, 476940.0 MiB, 500.11 GB
"#;

    assert_eq!(parse_logical_block_length(output), Some(512));
}

#[test]
fn test_parse_logical_block_length_4k_device() {
    let output = "   Logical block length=4096 bytes\n";
    assert_eq!(parse_logical_block_length(output), Some(4096));
}

#[test]
fn test_parse_logical_block_length_missing_or_garbage() {
    assert_eq!(parse_logical_block_length(""), None);
    assert_eq!(parse_logical_block_length("no capacity data here"), None);
    assert_eq!(
        parse_logical_block_length("Logical block length=banana bytes"),
        None
    );
}

#[test]
fn test_default_block_size_is_positive_power_of_two() {
    assert!(DEFAULT_BLOCK_SIZE_BYTES > 0);
    assert!(DEFAULT_BLOCK_SIZE_BYTES.is_power_of_two());
}

// ============================================================================
// Discard Limit Derivation Tests
// ============================================================================

#[test_case(512; "512 byte blocks")]
#[test_case(4096; "4k blocks")]
#[test_case(1; "degenerate 1 byte blocks")]
fn test_zero_count_always_yields_zero_bytes(block_size: u32) {
    // A zero unit count is a valid "no discard limit benefit" outcome
    assert_eq!(discard_limit_bytes(0, block_size), 0);
}

#[test]
fn test_discard_limit_basic_product() {
    assert_eq!(discard_limit_bytes(8, 512), 4096);
    assert_eq!(discard_limit_bytes(65535, 512), 33_553_920);
}

#[test]
fn test_discard_limit_two_gib_case() {
    // 4_194_304 units of 512 bytes = 2 GiB, under the ceiling
    assert_eq!(discard_limit_bytes(4_194_304, 512), 2_147_483_648);
}

#[test]
fn test_discard_limit_clamped_to_ceiling() {
    // 8_388_608 * 512 = 4 GiB, one past the ceiling
    assert_eq!(
        discard_limit_bytes(8_388_608, 512),
        DISCARD_MAX_BYTES_CEILING
    );

    // Just below the ceiling is not clamped
    assert_eq!(discard_limit_bytes(8_388_607, 512), 8_388_607 * 512);
}

#[test]
fn test_discard_limit_overflow_safe() {
    // The raw product overflows u64; the widened computation must not wrap
    assert_eq!(
        discard_limit_bytes(u64::MAX, 4096),
        DISCARD_MAX_BYTES_CEILING
    );
    assert_eq!(
        discard_limit_bytes(u64::MAX, u32::MAX),
        DISCARD_MAX_BYTES_CEILING
    );
}

#[test]
fn test_discard_limit_idempotent() {
    let first = discard_limit_bytes(4_194_304, 512);
    let second = discard_limit_bytes(4_194_304, 512);
    assert_eq!(first, second, "identical inputs must give identical output");
}
