// Allow uppercase acronyms for industry-standard terms like LBA, USB, SCSI
#![allow(clippy::upper_case_acronyms)]

pub mod deps;
pub mod device;
pub mod orchestrator;
pub mod params;
pub mod probes;
pub mod report;
pub mod rules;
pub mod schedule;
pub mod ui;
pub mod verify;

// Re-export the orchestrator entry point for convenience
pub use orchestrator::{Orchestrator, RunOptions, RunStage, RunState};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Default logical block size when the capacity probe cannot determine one.
pub const DEFAULT_BLOCK_SIZE_BYTES: u32 = 512;

/// Conservative unmap unit count substituted when only the fallback probe
/// reported support: 4_194_304 units of 512 bytes, roughly 2 GiB per command.
pub const DEFAULT_UNMAP_LBA_COUNT: u64 = 4_194_304;

/// Ceiling for the kernel-facing discard_max_bytes attribute (4 GiB - 1).
/// The sysfs attribute is a 32-bit quantity; anything above is degenerate.
pub const DISCARD_MAX_BYTES_CEILING: u64 = 4_294_967_295;

// Enhanced error types for better error handling
#[derive(Error, Debug)]
pub enum TrimError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Not a usable device: {0}")]
    InvalidDevice(String),

    #[error("Missing required dependency: {0}")]
    MissingDependency(String),

    #[error("Failed to write configuration artifact: {0}")]
    ArtifactWrite(String),

    #[error("Schedule configuration failed: {0}")]
    ScheduleFailed(String),

    #[error("Log initialization failed: {0}")]
    LogInit(String),

    #[error("Operation declined by user")]
    Declined,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type TrimResult<T> = Result<T, TrimError>;

/// Process exit codes. Fixed enumeration so scripts can distinguish outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitStatus {
    Success = 0,
    NotRoot = 1,
    BadArguments = 2,
    MissingDependency = 3,
    DeviceNotFound = 4,
    InvalidDevice = 5,
    DeclinedUnsupported = 6,
    ArtifactWriteFailed = 7,
    ScheduleFailed = 8,
    LogInitFailed = 9,
    Internal = 10,
}

impl ExitStatus {
    /// Map a run error to its exit code.
    pub fn from_error(err: &TrimError) -> Self {
        match err {
            TrimError::NotFound(_) => ExitStatus::DeviceNotFound,
            TrimError::InvalidDevice(_) => ExitStatus::InvalidDevice,
            TrimError::MissingDependency(_) => ExitStatus::MissingDependency,
            TrimError::ArtifactWrite(_) | TrimError::IoError(_) => ExitStatus::ArtifactWriteFailed,
            TrimError::ScheduleFailed(_) => ExitStatus::ScheduleFailed,
            TrimError::LogInit(_) => ExitStatus::LogInitFailed,
            TrimError::Declined => ExitStatus::DeclinedUnsupported,
            TrimError::Internal(_) => ExitStatus::Internal,
        }
    }
}

/// Transport class of a block device. Only USB-attached devices are acted on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Transport {
    Usb,
    Ata,
    Nvme,
    Other,
}

/// Opaque handle to the target block device. Immutable once resolved for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRef {
    /// Full device node path, e.g. /dev/sdb or /dev/sdb1
    pub path: String,
    /// Kernel base name with any partition suffix stripped, e.g. sdb
    pub base_name: String,
    pub transport: Transport,
}

/// Which strategy produced the identity, in decreasing order of trust.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdentityConfidence {
    Exact,
    Derived,
    Heuristic,
    None,
}

/// USB vendor:product identity. Absence is a valid terminal state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardwareIdentity {
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub confidence: IdentityConfidence,
}

impl HardwareIdentity {
    pub fn known(vendor_id: String, product_id: String, confidence: IdentityConfidence) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            product_id: Some(product_id),
            confidence,
        }
    }

    pub fn unknown() -> Self {
        Self {
            vendor_id: None,
            product_id: None,
            confidence: IdentityConfidence::None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.confidence != IdentityConfidence::None
    }
}

/// Which probe path established the capability verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerdictSource {
    ProtocolPrimary,
    ProtocolFallback,
    None,
}

/// TRIM/unmap capability as reported over the attached transport.
///
/// `max_unmap_lba_count` is a count of addressable units, not bytes. It may
/// be zero even when `supported` is true if only the fallback probe
/// succeeded; the conservative default count is substituted in that case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityVerdict {
    pub supported: bool,
    pub max_unmap_lba_count: u64,
    pub source: VerdictSource,
}

/// Byte-level discard limit derived from the capability hints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscardParameters {
    pub block_size_bytes: u32,
    pub discard_max_bytes: u64,
}

/// Match predicate of a configuration artifact. Exactly one form per artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArtifactSelector {
    /// Binds on USB vendor/product attributes; stable across re-attach.
    Identity { vendor: String, product: String },
    /// Binds on the kernel-visible device name; not stable across re-attach.
    Name { kernel_name: String },
}

/// A named configuration unit. Writing it is idempotent: identical inputs
/// must produce byte-identical content at the same path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigArtifact {
    pub selector: ArtifactSelector,
    pub payload: String,
    pub destination: PathBuf,
}

/// Persistence status of one artifact, for the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactStatus {
    pub destination: PathBuf,
    pub written: bool,
    pub detail: Option<String>,
}



#[cfg(test)]
mod params_tests;



#[cfg(test)]
mod verify_tests;
