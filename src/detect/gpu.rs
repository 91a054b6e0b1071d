use super::Extraction;
use crate::command::CommandRunner;
use crate::error::{DecodeError, Error, Result};
use crate::sysfs::SysfsRoot;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::LazyLock;

const DRM_BASE: &str = "sys/class/drm";

static PCI_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{4}:[0-9a-fA-F]{2}:[0-9a-fA-F]{2}\.[0-7]$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Nvidia,
    Intel,
    Amd,
}

impl GpuVendor {
    /// Vendor implied by the kernel driver bound to the card.
    pub fn from_driver(driver: &str) -> Option<Self> {
        match driver {
            "nvidia" => Some(GpuVendor::Nvidia),
            "i915" | "xe" => Some(GpuVendor::Intel),
            "amdgpu" | "radeon" => Some(GpuVendor::Amd),
            _ => None,
        }
    }

    fn version_path(self) -> &'static str {
        match self {
            GpuVendor::Nvidia => "proc/driver/nvidia/version",
            GpuVendor::Intel => "sys/module/i915/version",
            GpuVendor::Amd => "sys/module/amdgpu/version",
        }
    }
}

impl std::fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuVendor::Nvidia => write!(f, "nvidia"),
            GpuVendor::Intel => write!(f, "intel"),
            GpuVendor::Amd => write!(f, "amd"),
        }
    }
}

/// Fields of `device/uevent` for a DRM card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UeventInfo {
    pub driver: Option<String>,
    /// `0x`-prefixed, lower case.
    pub vendor_id: Option<String>,
    pub device_id: Option<String>,
    pub pci_slot: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpuInfo {
    pub card: String,
    pub model: String,
    /// Vendor name as lspci prints it.
    pub vendor: String,
    pub vendor_kind: Option<GpuVendor>,
    pub vendor_id: Option<String>,
    pub device_id: Option<String>,
    pub pci_slot: String,
    pub driver: Option<String>,
    pub version: Option<String>,
    /// Connected outputs, e.g. `eDP-1`, `HDMI-A-1`.
    pub outputs: Vec<String>,
}

pub fn is_valid_pci_slot(slot: &str) -> bool {
    PCI_SLOT.is_match(slot)
}

fn hex_id(part: &str, value: &str) -> std::result::Result<String, DecodeError> {
    if part.len() != 4 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::Invalid {
            what: "PCI_ID",
            value: value.to_string(),
        });
    }
    Ok(format!("0x{}", part.to_ascii_lowercase()))
}

/// Parse a DRM card's uevent. A malformed `PCI_ID` or `PCI_SLOT_NAME`, or a
/// missing slot, is an error.
pub fn parse_uevent(text: &str) -> std::result::Result<UeventInfo, DecodeError> {
    let mut info = UeventInfo::default();
    let mut slot = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(driver) = line.strip_prefix("DRIVER=") {
            info.driver = Some(driver.to_string());
        } else if let Some(id) = line.strip_prefix("PCI_ID=") {
            let (vendor, device) = id.split_once(':').ok_or_else(|| DecodeError::Invalid {
                what: "PCI_ID",
                value: id.to_string(),
            })?;
            info.vendor_id = Some(hex_id(vendor, id)?);
            info.device_id = Some(hex_id(device, id)?);
        } else if let Some(name) = line.strip_prefix("PCI_SLOT_NAME=") {
            if !is_valid_pci_slot(name) {
                return Err(DecodeError::Invalid {
                    what: "PCI_SLOT_NAME",
                    value: name.to_string(),
                });
            }
            slot = Some(name.to_string());
        }
    }

    info.pci_slot = slot.ok_or(DecodeError::Missing("PCI_SLOT_NAME"))?;
    Ok(info)
}

/// Drop the ` [10de]` id that `lspci -nn` appends to names.
fn strip_pci_id(name: &str) -> &str {
    if let Some(open) = name.rfind(" [")
        && let Some(inner) = name[open + 2..].strip_suffix(']')
        && inner.len() == 4
        && inner.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return &name[..open];
    }
    name
}

/// `(vendor, model)` from one line of `lspci -mm -nn`, the 4th and 6th
/// `"`-separated segments.
pub fn parse_lspci(output: &str) -> std::result::Result<(String, String), DecodeError> {
    let output = output.trim();
    if output.is_empty() {
        return Err(DecodeError::Missing("lspci device line"));
    }
    let parts: Vec<&str> = output.split('"').collect();
    if parts.len() < 6 {
        return Err(DecodeError::Invalid {
            what: "lspci output",
            value: output.to_string(),
        });
    }
    Ok((
        strip_pci_id(parts[3]).to_string(),
        strip_pci_id(parts[5]).to_string(),
    ))
}

/// Driver version for a vendor. The NVIDIA file is prose; the version is the
/// second token after `for`.
pub fn read_driver_version(sysfs: &SysfsRoot, vendor: GpuVendor) -> Result<String> {
    let path = vendor.version_path();
    let text = sysfs.read(path)?;
    if vendor != GpuVendor::Nvidia {
        return Ok(text);
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens
        .iter()
        .position(|t| *t == "for")
        .and_then(|i| tokens.get(i + 2))
        .map(|v| v.to_string())
        .ok_or_else(|| Error::Parse {
            path: sysfs.path(path),
            source: DecodeError::Invalid {
                what: "nvidia version",
                value: text.clone(),
            },
        })
}

/// Outputs of `card` whose connector reports `connected`.
pub fn list_connectors(sysfs: &SysfsRoot, card: &str) -> Vec<String> {
    let prefix = format!("{}-", card);
    let Ok(entries) = sysfs.list_names(DRM_BASE) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let output = entry.strip_prefix(&prefix)?.to_string();
            match sysfs.read(format!("{}/{}/status", DRM_BASE, entry)) {
                Ok(status) if status == "connected" => Some(output),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(connector = %entry, error = %e, "connector status unreadable");
                    None
                }
            }
        })
        .collect()
}

fn is_card(name: &str) -> bool {
    name.strip_prefix("card")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

pub fn list_cards(sysfs: &SysfsRoot) -> Result<Vec<String>> {
    Ok(sysfs
        .list_names(DRM_BASE)?
        .into_iter()
        .filter(|name| is_card(name))
        .collect())
}

impl GpuInfo {
    /// Read one card. uevent and lspci failures are fatal for the card;
    /// driver version and outputs degrade to absent/empty.
    pub fn read(sysfs: &SysfsRoot, runner: &dyn CommandRunner, card: &str) -> Result<Self> {
        let base = sysfs.child(DRM_BASE, card)?;
        let uevent = sysfs.read_with(format!("{}/device/uevent", base), parse_uevent)?;

        let output = runner.run("lspci", &["-mm", "-nn", "-D", "-s", uevent.pci_slot.as_str()])?;
        let (vendor, model) = parse_lspci(&output).map_err(|source| Error::Parse {
            path: PathBuf::from(format!("lspci -s {}", uevent.pci_slot)),
            source,
        })?;

        let vendor_kind = uevent.driver.as_deref().and_then(GpuVendor::from_driver);
        let version = vendor_kind.and_then(|v| match read_driver_version(sysfs, v) {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::debug!(card, error = %e, "driver version unavailable");
                None
            }
        });

        Ok(Self {
            card: card.to_string(),
            model,
            vendor,
            vendor_kind,
            vendor_id: uevent.vendor_id,
            device_id: uevent.device_id,
            pci_slot: uevent.pci_slot,
            driver: uevent.driver,
            version,
            outputs: list_connectors(sysfs, card),
        })
    }
}

/// All DRM cards. Fails when `/sys/class/drm` is unreadable or when cards
/// exist but none could be read.
pub fn detect(sysfs: &SysfsRoot, runner: &dyn CommandRunner) -> Result<Extraction<GpuInfo>> {
    let mut extraction = Extraction::new();
    for card in list_cards(sysfs)? {
        extraction.push_result(&card, GpuInfo::read(sysfs, runner, &card));
    }

    if extraction.units.is_empty() && !extraction.errors.is_empty() {
        let details: Vec<String> = extraction
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.unit, e.message))
            .collect();
        return Err(Error::Detection(format!(
            "no GPU card could be read ({})",
            details.join("; ")
        )));
    }

    Ok(extraction)
}
