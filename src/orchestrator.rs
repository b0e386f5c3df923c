use crate::probes::{capability, CapabilityProber, IdentityResolver};
use crate::rules::{self, ArtifactStore, RuleSynthesizer};
use crate::schedule::{ScheduleConfigurator, ScheduleOutcome, SchedulePeriod};
use crate::ui;
use crate::verify::{VerificationOutcome, VerificationRunner};
use crate::{
    ArtifactStatus, CapabilityVerdict, DeviceRef, DiscardParameters, HardwareIdentity,
    IdentityConfidence, TrimResult, VerdictSource,
};
use crate::params::ParameterCalculator;
use log::info;
use serde::{Deserialize, Serialize};

/// Progress of one run through the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunStage {
    Init,
    IdentityResolved,
    CapabilityKnown,
    ParametersComputed,
    Configured,
    ScheduleConfigured,
    Verified,
    Done,
    /// Normal, non-error exit: the device reported no TRIM support and the
    /// user declined to proceed anyway.
    AbortedUnsupported,
}

/// Caller-facing knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub schedule: Option<SchedulePeriod>,
    /// Assume "yes" at the unsupported-capability confirmation gate.
    pub assume_yes: bool,
    /// Whether prompts may be shown at all (stdin is a terminal).
    pub interactive: bool,
}

/// The working record of one run. Created at run start, mutated only by
/// the orchestrator, discarded at process exit; only the artifacts it
/// produced persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub stage: RunStage,
    pub device: DeviceRef,
    pub identity: HardwareIdentity,
    pub verdict: CapabilityVerdict,
    pub parameters: Option<DiscardParameters>,
    pub artifacts: Vec<ArtifactStatus>,
    pub schedule: Option<Result<ScheduleOutcome, String>>,
    pub verification: Option<VerificationOutcome>,
}

impl RunState {
    fn new(device: DeviceRef) -> Self {
        Self {
            stage: RunStage::Init,
            device,
            identity: HardwareIdentity::unknown(),
            verdict: CapabilityVerdict {
                supported: false,
                max_unmap_lba_count: 0,
                source: VerdictSource::None,
            },
            parameters: None,
            artifacts: Vec::new(),
            schedule: None,
            verification: None,
        }
    }
}

/// Sequences detection, calculation, synthesis, and activation for a
/// single device. One run per process invocation; nothing here is shared
/// or concurrent.
pub struct Orchestrator {
    state: RunState,
    options: RunOptions,
    store: ArtifactStore,
    schedule: ScheduleConfigurator,
}

impl Orchestrator {
    pub fn new(device: DeviceRef, options: RunOptions) -> Self {
        Self::with_stores(
            device,
            options,
            ArtifactStore::system(),
            ScheduleConfigurator::system(),
        )
    }

    /// Construct against explicit artifact/schedule destinations.
    pub fn with_stores(
        device: DeviceRef,
        options: RunOptions,
        store: ArtifactStore,
        schedule: ScheduleConfigurator,
    ) -> Self {
        Self {
            state: RunState::new(device),
            options,
            store,
            schedule,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Execute the run to completion.
    ///
    /// Identity and capability resolution always succeed (possibly with
    /// "unknown"/"unsupported" outcomes); artifact persistence failure is
    /// fatal; schedule and verification failures are recorded and reported
    /// but never unwind configuration already written.
    pub fn run(&mut self) -> TrimResult<()> {
        let device = self.state.device.clone();

        println!("\nPhase 1: Hardware identity");
        self.state.identity = IdentityResolver::resolve(&device);
        if !self.state.identity.is_known() && self.options.interactive {
            if let Some((vendor, product)) = ui::prompt_manual_identity() {
                self.state.identity =
                    HardwareIdentity::known(vendor, product, IdentityConfidence::Exact);
            }
        }
        self.state.stage = RunStage::IdentityResolved;

        println!("\nPhase 2: TRIM capability");
        let mut verdict = CapabilityProber::probe(&device);
        self.state.stage = RunStage::CapabilityKnown;

        if !verdict.supported {
            println!(
                "{} does not report TRIM/unmap support over its transport.",
                device.path
            );
            println!("Configuring it anyway may have no effect, or may misbehave on");
            println!("bridges that mishandle unmap commands.");

            let proceed = gate_decision(self.options.assume_yes, self.options.interactive, || {
                ui::confirm("Configure TRIM for this device anyway?")
            });
            if !proceed {
                info!("user declined to configure an unsupported device");
                self.state.verdict = verdict;
                self.state.stage = RunStage::AbortedUnsupported;
                return Ok(());
            }
            // Forced past the gate: give the device a usable unit count
            capability::substitute_default_count(&mut verdict);
        }
        self.state.verdict = verdict;

        println!("\nPhase 3: Discard parameters");
        let params = ParameterCalculator::calculate(&device, &self.state.verdict);
        self.state.parameters = Some(params);
        self.state.stage = RunStage::ParametersComputed;

        println!("\nPhase 4: Configuration artifacts");
        let artifacts = RuleSynthesizer::synthesize_into(
            self.store.root(),
            &self.state.identity,
            &params,
            &device,
        );
        for artifact in artifacts {
            match self.store.persist(&artifact) {
                Ok(status) => {
                    println!("  wrote {}", status.destination.display());
                    self.state.artifacts.push(status);
                }
                Err(e) => {
                    // Partial configuration stays in place; the report
                    // enumerates confirmed vs missing artifacts.
                    self.state.artifacts.push(ArtifactStatus {
                        destination: artifact.destination.clone(),
                        written: false,
                        detail: Some(e.to_string()),
                    });
                    return Err(e);
                }
            }
        }
        rules::reload_rules();
        rules::trigger_device(&device);
        self.state.stage = RunStage::Configured;

        if let Some(period) = self.options.schedule {
            println!("\nPhase 5: Periodic schedule");
            match self.schedule.apply(period) {
                Ok(outcome) => {
                    println!("  fstrim.timer set to {}", outcome.period);
                    self.state.schedule = Some(Ok(outcome));
                    self.state.stage = RunStage::ScheduleConfigured;
                }
                Err(e) => {
                    // Best-effort: reported, independently retryable, and
                    // never unwinds the artifacts written above
                    eprintln!("  schedule configuration failed: {}", e);
                    self.state.schedule = Some(Err(e.to_string()));
                }
            }
        }

        println!("\nPhase 6: Live verification");
        let verification = VerificationRunner::verify(&device);
        if verification.attempted && verification.succeeded {
            self.state.stage = RunStage::Verified;
        }
        self.state.verification = Some(verification);

        self.state.stage = RunStage::Done;
        Ok(())
    }
}

/// Decision at the unsupported-capability gate. Non-interactive runs
/// without --yes always abort rather than configure a device that did not
/// ask for it.
pub(crate) fn gate_decision(
    assume_yes: bool,
    interactive: bool,
    confirm: impl FnOnce() -> bool,
) -> bool {
    if assume_yes {
        true
    } else if interactive {
        confirm()
    } else {
        false
    }
}
