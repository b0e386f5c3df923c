use crate::{TrimError, TrimResult};
use log::{info, warn};
use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

/// One external tool this engine invokes, with the package that provides it.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub package: &'static str,
    /// Required tools are hard dependencies; missing optional tools only
    /// degrade probe confidence.
    pub required: bool,
}

/// Probe and collaborator tools, hard dependencies first. udevadm is the
/// rule-engine collaborator itself, not an optional probe.
pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "udevadm",
        package: "systemd",
        required: true,
    },
    ToolSpec {
        name: "sg_vpd",
        package: "sg3-utils",
        required: false,
    },
    ToolSpec {
        name: "sg_readcap",
        package: "sg3-utils",
        required: false,
    },
    ToolSpec {
        name: "hdparm",
        package: "hdparm",
        required: false,
    },
    ToolSpec {
        name: "lsscsi",
        package: "lsscsi",
        required: false,
    },
    ToolSpec {
        name: "lsusb",
        package: "usbutils",
        required: false,
    },
    ToolSpec {
        name: "fstrim",
        package: "util-linux",
        required: false,
    },
    ToolSpec {
        name: "systemctl",
        package: "systemd",
        required: false,
    },
];

/// Check whether a tool is reachable through PATH.
pub fn is_available(tool: &str) -> bool {
    let Some(path_var) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path_var).any(|dir| is_executable(&dir.join(tool)))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Verify tool availability, optionally installing missing packages first.
///
/// A missing hard dependency is fatal; missing optional tools are reported
/// and the run continues with reduced confidence.
pub fn check_all(auto_install: bool) -> TrimResult<Vec<&'static ToolSpec>> {
    let mut missing: Vec<&'static ToolSpec> =
        TOOLS.iter().filter(|t| !is_available(t.name)).collect();

    if !missing.is_empty() && auto_install {
        install_packages(&missing);
        missing.retain(|t| !is_available(t.name));
    }

    for tool in &missing {
        if tool.required {
            return Err(TrimError::MissingDependency(format!(
                "{} (package {})",
                tool.name, tool.package
            )));
        }
        warn!(
            "optional tool {} not found (package {}); probe confidence reduced",
            tool.name, tool.package
        );
    }

    Ok(missing)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageManager {
    Apt,
    Dnf,
    Pacman,
}

impl PackageManager {
    fn detect() -> Option<Self> {
        if is_available("apt-get") {
            Some(PackageManager::Apt)
        } else if is_available("dnf") {
            Some(PackageManager::Dnf)
        } else if is_available("pacman") {
            Some(PackageManager::Pacman)
        } else {
            None
        }
    }

    /// Distro package name for one of our tool packages.
    fn translate(self, package: &str) -> &str {
        match (self, package) {
            // Fedora and Arch ship sg3_utils with an underscore
            (PackageManager::Dnf | PackageManager::Pacman, "sg3-utils") => "sg3_utils",
            _ => package,
        }
    }

    fn install(self, packages: &[&str]) -> bool {
        let (program, base_args): (&str, &[&str]) = match self {
            PackageManager::Apt => ("apt-get", &["install", "-y"]),
            PackageManager::Dnf => ("dnf", &["install", "-y"]),
            PackageManager::Pacman => ("pacman", &["-S", "--noconfirm"]),
        };

        info!("installing packages via {}: {}", program, packages.join(" "));
        match Command::new(program).args(base_args).args(packages).status() {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("package installation failed to start: {}", e);
                false
            }
        }
    }
}

fn install_packages(missing: &[&'static ToolSpec]) {
    let Some(manager) = PackageManager::detect() else {
        warn!("no supported package manager found; skipping auto-install");
        return;
    };

    let mut packages: Vec<&str> = missing
        .iter()
        .map(|t| manager.translate(t.package))
        .collect();
    packages.sort_unstable();
    packages.dedup();

    if !manager.install(&packages) {
        warn!("package installation did not complete; continuing with what is present");
    }
}
