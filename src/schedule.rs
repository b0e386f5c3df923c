use crate::probes::runner;
use crate::{TrimError, TrimResult};
use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Drop-in override directory for the periodic maintenance timer.
pub const DROPIN_DIR: &str = "/etc/systemd/system/fstrim.timer.d";

/// Override file name inside the drop-in directory.
pub const OVERRIDE_FILE: &str = "schedule.conf";

/// The three fixed maintenance periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SchedulePeriod {
    Daily,
    Weekly,
    Monthly,
}

impl SchedulePeriod {
    fn calendar_spec(self) -> &'static str {
        match self {
            SchedulePeriod::Daily => "daily",
            SchedulePeriod::Weekly => "weekly",
            SchedulePeriod::Monthly => "monthly",
        }
    }
}

impl fmt::Display for SchedulePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.calendar_spec())
    }
}

/// Result of applying the schedule override, for the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub period: SchedulePeriod,
    pub override_path: PathBuf,
    pub enabled: bool,
    pub active: bool,
}

/// Render the timer override. The empty OnCalendar= line clears any
/// previously configured schedule before the new one is set.
pub fn render_override(period: SchedulePeriod) -> String {
    format!(
        "# Managed by usb-trim; re-running the tool overwrites this file.\n\
         [Timer]\n\
         OnCalendar=\n\
         OnCalendar={}\n",
        period.calendar_spec()
    )
}

/// Renders and activates the periodic-maintenance schedule override.
///
/// Independent of device configuration: failures here are reported but
/// never unwind previously written artifacts, and the whole step is
/// idempotent and retryable.
pub struct ScheduleConfigurator {
    dropin_dir: PathBuf,
}

impl ScheduleConfigurator {
    pub fn new(dropin_dir: PathBuf) -> Self {
        Self { dropin_dir }
    }

    pub fn system() -> Self {
        Self::new(PathBuf::from(DROPIN_DIR))
    }

    /// Write the override and ask the schedule collaborator to pick it up.
    pub fn apply(&self, period: SchedulePeriod) -> TrimResult<ScheduleOutcome> {
        let override_path = self.write_override(period)?;

        for (action, args) in [
            ("reload", vec!["daemon-reload"]),
            ("enable", vec!["enable", "fstrim.timer"]),
            ("restart", vec!["restart", "fstrim.timer"]),
        ] {
            let output = runner::run("systemctl", &args);
            if !output.ok() {
                return Err(TrimError::ScheduleFailed(format!(
                    "systemctl {} failed: {}",
                    action,
                    output.stderr.trim()
                )));
            }
        }

        let outcome = ScheduleOutcome {
            period,
            override_path,
            enabled: Self::query_state("is-enabled"),
            active: Self::query_state("is-active"),
        };
        info!(
            "fstrim.timer configured ({}): enabled={} active={}",
            period, outcome.enabled, outcome.active
        );
        Ok(outcome)
    }

    fn write_override(&self, period: SchedulePeriod) -> TrimResult<PathBuf> {
        fs::create_dir_all(&self.dropin_dir).map_err(|e| {
            TrimError::ScheduleFailed(format!(
                "cannot create drop-in directory {}: {}",
                self.dropin_dir.display(),
                e
            ))
        })?;

        let path = self.dropin_dir.join(OVERRIDE_FILE);
        let tmp = self.dropin_dir.join(format!("{}.tmp", OVERRIDE_FILE));
        fs::write(&tmp, render_override(period)).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            TrimError::ScheduleFailed(format!("cannot write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            TrimError::ScheduleFailed(format!("cannot install {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    fn query_state(verb: &str) -> bool {
        let output = runner::run("systemctl", &[verb, "fstrim.timer"]);
        if output.status == crate::probes::ProbeStatus::Unavailable {
            warn!("cannot query timer state: systemctl unavailable");
        }
        output.ok()
    }
}
