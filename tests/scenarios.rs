/// End-to-end scenarios over the engine's decision pipeline.
///
/// Probes against the fake device fail cleanly everywhere, so the full runs
/// below exercise the degraded paths deterministically: no identity, no
/// reported capability, and either an abort at the confirmation gate or a
/// forced configuration with the conservative defaults.
mod common;

use common::{fake_device, temp_schedule, temp_store};
use std::fs;
use usb_trim::params::discard_limit_bytes;
use usb_trim::probes::capability::{substitute_default_count, verdict_from_signals};
use usb_trim::{
    Orchestrator, RunOptions, RunStage, VerdictSource, DEFAULT_UNMAP_LBA_COUNT,
};

fn options(assume_yes: bool) -> RunOptions {
    RunOptions {
        schedule: None,
        assume_yes,
        // Never prompt from a test run
        interactive: false,
    }
}

// ============================================================================
// Scenario A: healthy primary probe, no clamping
// ============================================================================

#[test]
fn test_scenario_a_primary_verdict_to_discard_limit() {
    let verdict = verdict_from_signals(true, 4_194_304, false);
    assert!(verdict.supported);
    assert_eq!(verdict.source, VerdictSource::ProtocolPrimary);

    let bytes = discard_limit_bytes(verdict.max_unmap_lba_count, 512);
    assert_eq!(bytes, 2_147_483_648, "2 GiB, under the ceiling, unclamped");
}

// ============================================================================
// Scenario B: fallback-only support, default count substituted
// ============================================================================

#[test]
fn test_scenario_b_fallback_substitutes_default_count() {
    let mut verdict = verdict_from_signals(false, 0, true);
    assert!(verdict.supported);
    assert_eq!(verdict.source, VerdictSource::ProtocolFallback);
    assert_eq!(verdict.max_unmap_lba_count, 0);

    substitute_default_count(&mut verdict);
    assert_eq!(verdict.max_unmap_lba_count, DEFAULT_UNMAP_LBA_COUNT);

    let bytes = discard_limit_bytes(verdict.max_unmap_lba_count, 512);
    assert_eq!(bytes, DEFAULT_UNMAP_LBA_COUNT * 512);
}

// ============================================================================
// Scenario C: nothing reports support, gate declines, nothing written
// ============================================================================

#[test]
fn test_scenario_c_declined_unsupported_writes_nothing() {
    let (_tmp, store) = temp_store();
    let (_stmp, schedule) = temp_schedule();
    let rules_dir = store.root().to_path_buf();

    let mut orchestrator =
        Orchestrator::with_stores(fake_device(), options(false), store, schedule);
    orchestrator.run().expect("declining is a normal exit");

    let state = orchestrator.state();
    assert_eq!(state.stage, RunStage::AbortedUnsupported);
    assert!(!state.verdict.supported);
    assert!(state.artifacts.is_empty());
    assert!(
        !rules_dir.exists() || fs::read_dir(&rules_dir).unwrap().next().is_none(),
        "no artifact may be written before the gate is passed"
    );
}

// ============================================================================
// Forced run: gate accepted, conservative defaults, artifact on disk
// ============================================================================

#[test]
fn test_forced_run_configures_with_conservative_defaults() {
    let (_tmp, store) = temp_store();
    let (_stmp, schedule) = temp_schedule();

    let mut orchestrator =
        Orchestrator::with_stores(fake_device(), options(true), store, schedule);
    orchestrator.run().expect("forced run completes");

    let state = orchestrator.state();
    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.verdict.max_unmap_lba_count, DEFAULT_UNMAP_LBA_COUNT);

    let params = state.parameters.expect("parameters computed");
    assert_eq!(params.block_size_bytes, 512, "default block size");
    assert_eq!(params.discard_max_bytes, 2_147_483_648);

    // No identity can resolve for the fake device, so the artifact must be
    // the name-selector form
    assert_eq!(state.artifacts.len(), 1);
    let written = &state.artifacts[0];
    assert!(written.written);
    let content = fs::read_to_string(&written.destination).unwrap();
    assert!(content.contains("KERNEL==\"usb-trim-itest-missing\""));
    assert!(content.contains("ATTR{queue/discard_max_bytes}=\"2147483648\""));
    assert!(content.contains("ATTR{provisioning_mode}=\"unmap\""));

    // Schedule was not requested and verification had nothing to mount
    assert!(state.schedule.is_none());
    let verification = state.verification.as_ref().expect("verification recorded");
    assert!(!verification.attempted);

    // Re-running the whole engine is idempotent at the artifact level
    let first_bytes = fs::read(&written.destination).unwrap();
    let (_tmp2, store2) = common::temp_store();
    let (_stmp2, schedule2) = common::temp_schedule();
    let mut rerun = Orchestrator::with_stores(fake_device(), options(true), store2, schedule2);
    rerun.run().expect("re-run completes");
    let second_bytes = fs::read(&rerun.state().artifacts[0].destination).unwrap();
    assert_eq!(first_bytes, second_bytes, "byte-identical on identical inputs");
}
