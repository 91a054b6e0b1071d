use super::Extraction;
use crate::decode;
use crate::error::Result;
use crate::sysfs::SysfsRoot;
use serde::Serialize;

const BLOCK_BASE: &str = "sys/block";

/// Virtual block devices that are never physical disks.
const EXCLUDED_PREFIXES: &[&str] = &["loop", "zram", "ram"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskKind {
    Ssd,
    Hdd,
}

impl std::fmt::Display for DiskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskKind::Ssd => write!(f, "SSD"),
            DiskKind::Hdd => write!(f, "HDD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskInfo {
    pub name: String,
    pub vendor: Option<String>,
    pub model: String,
    pub kind: DiskKind,
    pub size_bytes: u64,
    pub partitions: Vec<String>,
}

impl DiskInfo {
    /// Read one block device. `size`, `queue/rotational` and `device/model`
    /// are required.
    pub fn read(sysfs: &SysfsRoot, name: &str) -> Result<Self> {
        let base = sysfs.child(BLOCK_BASE, name)?;

        let sectors: u64 = sysfs.read_int(format!("{}/size", base))?;
        // Only an explicit "0" means solid state; anything else counts as spinning.
        let rotational = sysfs.read(format!("{}/queue/rotational", base))?;
        let kind = if rotational == "0" {
            DiskKind::Ssd
        } else {
            DiskKind::Hdd
        };

        let vendor = sysfs.read_lenient_text(format!("{}/device/vendor", base));
        let model = sysfs.read(format!("{}/device/model", base))?;

        // Some SATA bridges report "VENDOR_MODEL" in `model` with no `vendor`.
        let (vendor, model) = match vendor {
            Some(v) => (Some(v), model),
            None => match model.split_once('_') {
                Some((v, m)) => (decode::as_optional_string(v), m.to_string()),
                None => (None, model),
            },
        };

        Ok(Self {
            name: name.to_string(),
            vendor,
            model,
            kind,
            size_bytes: sectors.saturating_mul(512),
            partitions: list_partitions(sysfs, name)?,
        })
    }

    /// Decimal gigabytes.
    pub fn size_gb(&self) -> f64 {
        self.size_bytes as f64 / 1e9
    }
}

/// Physical block devices under `/sys/block`.
pub fn list_disks(sysfs: &SysfsRoot) -> Result<Vec<String>> {
    Ok(sysfs
        .list_names(BLOCK_BASE)?
        .into_iter()
        .filter(|name| !EXCLUDED_PREFIXES.iter().any(|p| name.starts_with(p)))
        .collect())
}

fn is_partition_of(disk: &str, entry: &str) -> bool {
    let Some(rest) = entry.strip_prefix(disk) else {
        return false;
    };
    let digits = rest.strip_prefix('p').unwrap_or(rest);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Partition subdirectories of `disk`, e.g. `sda1` or `nvme0n1p2`.
pub fn list_partitions(sysfs: &SysfsRoot, disk: &str) -> Result<Vec<String>> {
    let base = sysfs.child(BLOCK_BASE, disk)?;
    Ok(sysfs
        .list_names(&base)?
        .into_iter()
        .filter(|entry| is_partition_of(disk, entry))
        .filter(|entry| sysfs.is_dir(format!("{}/{}", base, entry)))
        .collect())
}

/// Every disk that could be read. Only an unreadable `/sys/block` fails the call.
pub fn detect(sysfs: &SysfsRoot) -> Result<Extraction<DiskInfo>> {
    let mut extraction = Extraction::new();
    for name in list_disks(sysfs)? {
        extraction.push_result(&name, DiskInfo::read(sysfs, &name));
    }
    Ok(extraction)
}
