use clap::{ArgAction, ArgGroup, Parser};
use log::LevelFilter;
use std::fs::File;
use std::path::PathBuf;
use std::process;
use usb_trim::schedule::SchedulePeriod;
use usb_trim::{deps, device, report, ui};
use usb_trim::{ExitStatus, Orchestrator, RunOptions, RunStage, TrimError};

#[derive(Parser)]
#[command(name = "usb-trim")]
#[command(about = "Detect and persistently enable TRIM/unmap support for USB-attached SSDs")]
#[command(version = "1.0.0")]
#[command(group(ArgGroup::new("target").required(true).args(["device", "select"])))]
struct Cli {
    /// Target block device path (e.g. /dev/sdb)
    #[arg(short, long)]
    device: Option<String>,

    /// Interactively select among attached USB disks
    #[arg(short, long)]
    select: bool,

    /// Also configure the periodic fstrim timer
    #[arg(long, value_enum)]
    schedule: Option<SchedulePeriod>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write the run log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Install missing probe tools with the system package manager
    #[arg(long)]
    auto_install: bool,

    /// Assume "yes" at the unsupported-capability confirmation gate
    #[arg(short = 'y', long)]
    yes: bool,
}

fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> Result<(), TrimError> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp_secs();

    if let Some(path) = log_file {
        let file = File::create(path)
            .map_err(|e| TrimError::LogInit(format!("cannot open {}: {}", path.display(), e)))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|e| TrimError::LogInit(e.to_string()))
}

fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are argument handling too, but exit clean
            let code = if e.use_stderr() {
                ExitStatus::BadArguments
            } else {
                ExitStatus::Success
            };
            let _ = e.print();
            process::exit(code as i32);
        }
    };

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_ref()) {
        eprintln!("Error: {}", e);
        process::exit(ExitStatus::LogInitFailed as i32);
    }

    if !is_root() {
        eprintln!("Error: this program requires root privileges.");
        eprintln!("Please run with sudo or as root user.");
        process::exit(ExitStatus::NotRoot as i32);
    }

    let status = run(cli);
    process::exit(status as i32);
}

fn run(cli: Cli) -> ExitStatus {
    if let Err(e) = deps::check_all(cli.auto_install) {
        eprintln!("Error: {}", e);
        return ExitStatus::from_error(&e);
    }

    let device = match &cli.device {
        Some(path) => device::resolve(path),
        None => ui::select_device(),
    };
    let device = match device {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitStatus::from_error(&e);
        }
    };

    println!("Target device: {} ({})", device.path, device.base_name);

    let options = RunOptions {
        schedule: cli.schedule,
        assume_yes: cli.yes,
        interactive: ui::stdin_is_tty(),
    };

    let mut orchestrator = Orchestrator::new(device, options);
    let result = orchestrator.run();
    let state = orchestrator.state();

    report::print_summary(state);

    match result {
        Ok(()) => {
            if state.stage == RunStage::AbortedUnsupported {
                return ExitStatus::DeclinedUnsupported;
            }
            // Schedule failures do not unwind configuration, but they are
            // surfaced in the exit code when everything else succeeded
            if matches!(state.schedule, Some(Err(_))) {
                return ExitStatus::ScheduleFailed;
            }
            ExitStatus::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitStatus::from_error(&e)
        }
    }
}
