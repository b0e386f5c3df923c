use crate::orchestrator::{RunStage, RunState};
use crate::{IdentityConfidence, VerdictSource};

/// Print the final human-readable summary of one run.
///
/// Ambiguous states are shown as "unknown"/"failed" rather than silently
/// defaulted, so the operator can tell a degraded run from a clean one.
pub fn print_summary(state: &RunState) {
    println!("\n{}", "=".repeat(60));
    println!("USB TRIM configuration summary");
    println!(
        "Completed: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("{}", "=".repeat(60));

    println!("Device: {} ({})", state.device.path, state.device.base_name);

    match (&state.identity.vendor_id, &state.identity.product_id) {
        (Some(vendor), Some(product)) => {
            println!(
                "Identity: {}:{} (confidence: {})",
                vendor,
                product,
                confidence_label(state.identity.confidence)
            );
        }
        _ => println!("Identity: unknown"),
    }

    let verdict = &state.verdict;
    println!(
        "TRIM capability: {} (source: {})",
        if verdict.supported {
            "supported"
        } else {
            "not reported"
        },
        source_label(verdict.source)
    );
    println!("Max unmap LBA count: {}", verdict.max_unmap_lba_count);

    match &state.parameters {
        Some(params) => {
            println!("Logical block size: {} bytes", params.block_size_bytes);
            println!("Discard limit: {} bytes", params.discard_max_bytes);
        }
        None => println!("Discard parameters: not computed"),
    }

    println!("\nConfiguration artifacts:");
    if state.artifacts.is_empty() {
        println!("  (none written)");
    }
    for artifact in &state.artifacts {
        let status = if artifact.written {
            "written"
        } else {
            "FAILED"
        };
        match &artifact.detail {
            Some(detail) => println!("  {} - {} ({})", artifact.destination.display(), status, detail),
            None => println!("  {} - {}", artifact.destination.display(), status),
        }
    }

    match &state.schedule {
        Some(Ok(outcome)) => {
            println!(
                "\nPeriodic schedule: {} ({}) enabled={} active={}",
                outcome.period,
                outcome.override_path.display(),
                outcome.enabled,
                outcome.active
            );
        }
        Some(Err(detail)) => println!("\nPeriodic schedule: FAILED ({})", detail),
        None => println!("\nPeriodic schedule: not requested"),
    }

    match &state.verification {
        Some(v) if v.attempted && v.succeeded => {
            println!("Live verification: passed ({})", v.detail);
        }
        Some(v) if v.attempted => {
            println!("Live verification: failed ({})", v.detail);
            println!("  Rules usually apply on the next attach; re-plug the device and re-check.");
        }
        Some(v) => println!("Live verification: skipped ({})", v.detail),
        None => println!("Live verification: not run"),
    }

    if state.stage == RunStage::AbortedUnsupported {
        println!("\nRun aborted at the capability gate; no configuration was written.");
    }
    println!("{}", "=".repeat(60));
}

fn confidence_label(confidence: IdentityConfidence) -> &'static str {
    match confidence {
        IdentityConfidence::Exact => "exact",
        IdentityConfidence::Derived => "derived",
        IdentityConfidence::Heuristic => "heuristic",
        IdentityConfidence::None => "none",
    }
}

fn source_label(source: VerdictSource) -> &'static str {
    match source {
        VerdictSource::ProtocolPrimary => "protocol primary",
        VerdictSource::ProtocolFallback => "identification fallback",
        VerdictSource::None => "none",
    }
}
