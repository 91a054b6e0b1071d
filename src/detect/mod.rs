pub mod battery;
pub mod cpu;
pub mod disk;
pub mod gpu;
pub mod memory;
pub mod network;
pub mod ports;

use crate::command::CommandRunner;
use crate::error::Result;
use crate::sysfs::SysfsRoot;
use serde::{Serialize, Serializer};

/// A unit that could not be read, kept alongside the ones that could.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitError {
    pub unit: String,
    pub message: String,
}

/// Partial result of a domain with several physical units (disks, cards,
/// interfaces). One bad unit never hides the others.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction<T> {
    pub units: Vec<T>,
    pub errors: Vec<UnitError>,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> Extraction<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&mut self, unit: &str, result: Result<T>) {
        match result {
            Ok(value) => self.units.push(value),
            Err(e) => {
                tracing::warn!(unit, error = %e, "skipping unit");
                self.errors.push(UnitError {
                    unit: unit.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.errors.is_empty()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome<'a, T> {
    Ok(&'a T),
    Error(String),
}

/// Serialize a domain result as `{"ok": ...}` or `{"error": "..."}`.
pub(crate) fn serialize_result<T, S>(
    value: &Result<T>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Ok(v) => Outcome::Ok(v).serialize(serializer),
        Err(e) => Outcome::<T>::Error(e.to_string()).serialize(serializer),
    }
}

/// All detected hardware information. Each domain is probed on its own, so a
/// failure in one leaves the rest intact.
#[derive(Debug, Serialize)]
pub struct HardwareInfo {
    #[serde(serialize_with = "serialize_result")]
    pub cpu: Result<cpu::CpuInfo>,
    #[serde(serialize_with = "serialize_result")]
    pub memory: Result<memory::MemoryInfo>,
    #[serde(serialize_with = "serialize_result")]
    pub disks: Result<Extraction<disk::DiskInfo>>,
    #[serde(serialize_with = "serialize_result")]
    pub gpus: Result<Extraction<gpu::GpuInfo>>,
    #[serde(serialize_with = "serialize_result")]
    pub battery: Result<battery::BatteryInfo>,
    #[serde(serialize_with = "serialize_result")]
    pub network: Result<Extraction<network::NetworkInterface>>,
    pub ports: ports::PortsInfo,
}

impl HardwareInfo {
    /// `battery` is passed in so its resolved supply outlives a single inventory.
    pub fn detect(
        sysfs: &SysfsRoot,
        runner: &dyn CommandRunner,
        battery: &battery::BatteryProbe,
    ) -> Self {
        Self {
            cpu: cpu::CpuInfo::detect(sysfs),
            memory: memory::MemoryInfo::detect(runner),
            disks: disk::detect(sysfs),
            gpus: gpu::detect(sysfs, runner),
            battery: battery.probe(),
            network: network::detect(sysfs),
            ports: ports::PortsInfo::detect(sysfs),
        }
    }
}
