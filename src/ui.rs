use crate::device::{self, DiskCandidate};
use crate::probes::identity::is_hex4;
use crate::{DeviceRef, TrimError, TrimResult};
use std::io::{self, Write};

/// True when stdin is a terminal, i.e. prompts can actually be answered.
pub fn stdin_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

/// Yes/no confirmation prompt. Defaults to "no" on anything but y/yes.
pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Last-resort manual identity entry: a vvvv:pppp pair, validated before
/// acceptance. Empty input falls back to "unknown".
pub fn prompt_manual_identity() -> Option<(String, String)> {
    println!("\nNo hardware identity could be resolved automatically.");
    println!("Enter the USB vendor:product pair (as shown by lsusb, e.g. 152d:0578),");
    println!("or press Enter to continue without one.");
    print!("vendor:product> ");
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return None;
    }
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match input.split_once(':') {
        Some((vendor, product)) if is_hex4(vendor) && is_hex4(product) => {
            Some((vendor.to_lowercase(), product.to_lowercase()))
        }
        _ => {
            eprintln!("'{}' is not a well-formed xxxx:xxxx pair; ignoring.", input);
            None
        }
    }
}

/// Interactive device selection among attached USB disks.
pub fn select_device() -> TrimResult<DeviceRef> {
    let disks = device::scan_usb_disks()?;
    if disks.is_empty() {
        return Err(TrimError::NotFound(
            "no USB-attached disks detected".to_string(),
        ));
    }

    println!("\nAttached USB disks:");
    println!("{:<4} {:<12} {:<24} {:>10}", "#", "Device", "Model", "Size");
    println!("{}", "-".repeat(54));
    for (index, disk) in disks.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:<24} {:>10}",
            index + 1,
            disk.path,
            truncate(&disk.model, 24),
            format_size(disk.size_bytes)
        );
    }

    let choice = loop {
        print!("\nSelect a device [1-{}] (or q to quit): ", disks.len());
        let _ = io::stdout().flush();

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.eq_ignore_ascii_case("q") {
            return Err(TrimError::Declined);
        }
        match input.parse::<usize>() {
            Ok(n) if (1..=disks.len()).contains(&n) => break n - 1,
            _ => println!("Invalid selection."),
        }
    };

    let DiskCandidate { path, .. } = &disks[choice];
    device::resolve(path)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        "?".to_string()
    } else if bytes >= 1024 * 1024 * 1024 {
        format!("{} GB", bytes / (1024 * 1024 * 1024))
    } else {
        format!("{} MB", bytes / (1024 * 1024))
    }
}
