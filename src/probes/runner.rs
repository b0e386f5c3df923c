use log::{debug, warn};
use std::process::Command;

/// Outcome of one external probe invocation.
///
/// A probe that cannot be spawned at all (tool not installed) reports
/// `Unavailable`; a probe that ran but exited non-zero reports `Failed`.
/// Both are treated as "probe unavailable" by the interpreters, never as
/// a parse error or a fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Success,
    Failed(i32),
    Unavailable,
}

/// Raw text output of one external probe invocation.
#[derive(Debug, Clone)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ProbeStatus,
}

impl ProbeOutput {
    pub fn ok(&self) -> bool {
        self.status == ProbeStatus::Success
    }

    fn unavailable() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            status: ProbeStatus::Unavailable,
        }
    }
}

/// Run one external diagnostic command to completion and capture its output.
///
/// Never fails: spawn errors and non-zero exits are folded into the returned
/// status so callers decide how much confidence to lose.
pub fn run(tool: &str, args: &[&str]) -> ProbeOutput {
    debug!("probe: {} {}", tool, args.join(" "));

    let output = match Command::new(tool).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            warn!("probe tool {} unavailable: {}", tool, e);
            return ProbeOutput::unavailable();
        }
    };

    let status = if output.status.success() {
        ProbeStatus::Success
    } else {
        let code = output.status.code().unwrap_or(-1);
        debug!("probe {} exited with status {}", tool, code);
        ProbeStatus::Failed(code)
    };

    ProbeOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status,
    }
}
