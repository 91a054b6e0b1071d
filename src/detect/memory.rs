use crate::command::CommandRunner;
use crate::decode::{self, strip_label, strip_suffix_and_scale};
use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;

/// One populated DIMM slot from `dmidecode -t memory`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemorySlot {
    /// Slot label (`Locator:`), e.g. `Controller0-ChannelA-DIMM0`.
    pub slot: Option<String>,
    pub bank_locator: Option<String>,
    pub form_factor: Option<String>,
    pub memory_type: Option<String>,
    pub type_detail: Option<String>,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
    pub part_number: Option<String>,
    pub asset_tag: Option<String>,
    pub technology: Option<String>,
    pub operating_mode: Option<String>,
    pub size_mb: u64,
    /// MT/s (reported as MHz on older firmware).
    pub speed: Option<u64>,
    pub configured_speed: Option<u64>,
    pub rank: Option<u32>,
    pub configured_voltage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryInfo {
    pub slots: Vec<MemorySlot>,
    pub total_mb: u64,
}

impl MemoryInfo {
    /// Run `dmidecode -t memory` and parse its output.
    pub fn detect(runner: &dyn CommandRunner) -> Result<Self> {
        if !nix::unistd::geteuid().is_root() {
            tracing::warn!("dmidecode usually needs root; memory slots may be missing");
        }
        let output = runner.run("dmidecode", &["-t", "memory"])?;
        Ok(Self::from_slots(parse_dmidecode(&output)))
    }

    pub fn from_slots(slots: Vec<MemorySlot>) -> Self {
        let total_mb = slots.iter().map(|s| s.size_mb).sum();
        Self { slots, total_mb }
    }

    pub fn total_gib(&self) -> f64 {
        self.total_mb as f64 / 1024.0
    }
}

/// Parse `dmidecode -t memory` text into populated slots.
///
/// Only `Memory Device` blocks are read; a blank line (or end of input) closes
/// the block. Empty slots and repeated slot labels are dropped.
pub fn parse_dmidecode(text: &str) -> Vec<MemorySlot> {
    let mut slots = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Option<MemorySlot> = None;

    for line in text.lines() {
        let line = line.trim();

        if line == "Memory Device" {
            if let Some(slot) = current.take() {
                keep_slot(slot, &mut slots, &mut seen);
            }
            current = Some(MemorySlot::default());
            continue;
        }

        if line.is_empty() {
            if let Some(slot) = current.take() {
                keep_slot(slot, &mut slots, &mut seen);
            }
            continue;
        }

        if let Some(slot) = current.as_mut() {
            apply_line(slot, line);
        }
    }

    if let Some(slot) = current.take() {
        keep_slot(slot, &mut slots, &mut seen);
    }

    slots
}

fn keep_slot(slot: MemorySlot, slots: &mut Vec<MemorySlot>, seen: &mut HashSet<Option<String>>) {
    if slot.size_mb == 0 {
        return;
    }
    if !seen.insert(slot.slot.clone()) {
        tracing::debug!(slot = ?slot.slot, "duplicate memory slot ignored");
        return;
    }
    slots.push(slot);
}

fn apply_line(slot: &mut MemorySlot, line: &str) {
    let labels: [(&str, &mut Option<String>); 11] = [
        ("Locator:", &mut slot.slot),
        ("Bank Locator:", &mut slot.bank_locator),
        ("Form Factor:", &mut slot.form_factor),
        ("Type:", &mut slot.memory_type),
        ("Type Detail:", &mut slot.type_detail),
        ("Manufacturer:", &mut slot.manufacturer),
        ("Serial Number:", &mut slot.serial_number),
        ("Part Number:", &mut slot.part_number),
        ("Asset Tag:", &mut slot.asset_tag),
        ("Memory Technology:", &mut slot.technology),
        ("Memory Operating Mode Capability:", &mut slot.operating_mode),
    ];
    for (label, field) in labels {
        if line.starts_with(label) {
            *field = strip_label(line, label);
            return;
        }
    }

    if line.starts_with("Size:") {
        slot.size_mb = parse_size_mb(line).unwrap_or(0);
    } else if line.starts_with("Speed:") {
        slot.speed = strip_suffix_and_scale(line, "Speed:", &["MT/s", "MHz"], 1);
    } else if line.starts_with("Configured Memory Speed:") {
        slot.configured_speed =
            strip_suffix_and_scale(line, "Configured Memory Speed:", &["MT/s", "MHz"], 1);
    } else if line.starts_with("Rank:") {
        slot.rank = strip_label(line, "Rank:").and_then(|v| decode::as_int(&v).ok());
    } else if line.starts_with("Configured Voltage:") {
        slot.configured_voltage = strip_label(line, "Configured Voltage:")
            .and_then(|v| decode::as_float(v.trim_end_matches('V')).ok())
            .filter(|v| *v > 0.0);
    }
}

/// `Size:` in megabytes; dmidecode prints MB, GB or TB depending on the module.
fn parse_size_mb(line: &str) -> Option<u64> {
    strip_suffix_and_scale(line, "Size:", &["GB"], 1024)
        .or_else(|| strip_suffix_and_scale(line, "Size:", &["MB"], 1))
        .or_else(|| strip_suffix_and_scale(line, "Size:", &["TB"], 1024 * 1024))
}
