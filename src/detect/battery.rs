use crate::decode;
use crate::error::{DecodeError, Error, Result};
use crate::sysfs::SysfsRoot;
use serde::Serialize;
use std::sync::OnceLock;

const POWER_SUPPLY: &str = "sys/class/power_supply";

/// Charging state as the kernel spells it in `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    Charging,
    Discharging,
    Full,
    NotCharging,
}

impl std::str::FromStr for BatteryStatus {
    type Err = DecodeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Charging" => Ok(BatteryStatus::Charging),
            "Discharging" => Ok(BatteryStatus::Discharging),
            "Full" => Ok(BatteryStatus::Full),
            "Not charging" => Ok(BatteryStatus::NotCharging),
            _ => Err(DecodeError::Invalid {
                what: "battery status",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatteryStatus::Charging => write!(f, "Charging"),
            BatteryStatus::Discharging => write!(f, "Discharging"),
            BatteryStatus::Full => write!(f, "Full"),
            BatteryStatus::NotCharging => write!(f, "Not charging"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatteryInfo {
    pub supply_name: String,
    pub capacity_percent: u8,
    /// Raw `status` text; see [`BatteryInfo::status_kind`].
    pub status: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub technology: Option<String>,
    pub cycle_count: Option<u32>,
    pub voltage_now_uv: Option<u64>,
    pub voltage_min_design_uv: Option<u64>,
    pub energy_full_uwh: Option<u64>,
    pub energy_full_design_uwh: Option<u64>,
    pub charge_full_uah: Option<u64>,
    pub charge_full_design_uah: Option<u64>,
    /// Full capacity in mAh, derived from energy and minimum design voltage.
    pub energy_mah: Option<f64>,
}

impl BatteryInfo {
    /// Current full capacity as a percentage of design capacity. Energy counters
    /// are preferred; batteries that only report charge fall back to those.
    pub fn health_percent(&self) -> Option<f64> {
        let ratio = |full: Option<u64>, design: Option<u64>| match (full, design) {
            (Some(full), Some(design)) if design > 0 => {
                Some(full as f64 / design as f64 * 100.0)
            }
            _ => None,
        };
        ratio(self.energy_full_uwh, self.energy_full_design_uwh)
            .or_else(|| ratio(self.charge_full_uah, self.charge_full_design_uah))
    }

    pub fn status_kind(&self) -> Option<BatteryStatus> {
        self.status.parse().ok()
    }

    pub fn is_discharging(&self) -> bool {
        self.status_kind() == Some(BatteryStatus::Discharging)
    }
}

/// `(energy / 1e6) Wh * 1000 / (voltage / 1e6) V`, i.e. mAh.
fn energy_mah(energy_uwh: Option<u64>, voltage_uv: Option<u64>) -> Option<f64> {
    let energy = energy_uwh?;
    let voltage = voltage_uv.filter(|v| *v > 0)?;
    Some((energy as f64 / 1e6) * 1000.0 / (voltage as f64 / 1e6))
}

/// Battery reader that remembers which `BAT*` directory it found.
///
/// The directory is resolved on the first successful probe and reused after
/// that; a failed lookup is retried next time.
#[derive(Debug)]
pub struct BatteryProbe {
    sysfs: SysfsRoot,
    path: OnceLock<String>,
}

impl BatteryProbe {
    pub fn new(sysfs: SysfsRoot) -> Self {
        Self {
            sysfs,
            path: OnceLock::new(),
        }
    }

    fn find_battery(&self) -> Result<String> {
        let entries = self.sysfs.list_names(POWER_SUPPLY)?;
        let name = entries
            .into_iter()
            .find(|e| e.starts_with("BAT"))
            .ok_or_else(|| Error::Detection("no battery found".to_string()))?;
        self.sysfs.child(POWER_SUPPLY, &name)
    }

    fn battery_path(&self) -> Result<String> {
        if let Some(path) = self.path.get() {
            return Ok(path.clone());
        }
        let found = self.find_battery()?;
        tracing::debug!(path = %found, "battery located");
        Ok(self.path.get_or_init(|| found).clone())
    }

    pub fn probe(&self) -> Result<BatteryInfo> {
        let base = self.battery_path()?;
        let sysfs = &self.sysfs;
        let attr = |name: &str| format!("{}/{}", base, name);
        let text = |name: &str| sysfs.read_lenient_text(attr(name));
        let number = |name: &str| sysfs.read_lenient(attr(name), decode::as_int::<u64>);

        let supply_name = base
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let mut info = BatteryInfo {
            supply_name,
            capacity_percent: sysfs.read_int(attr("capacity"))?,
            status: sysfs.read(attr("status"))?,
            manufacturer: text("manufacturer"),
            model: text("model_name"),
            serial: text("serial_number"),
            technology: text("technology"),
            cycle_count: sysfs.read_lenient(attr("cycle_count"), decode::as_int::<u32>),
            voltage_now_uv: number("voltage_now"),
            voltage_min_design_uv: number("voltage_min_design"),
            energy_full_uwh: number("energy_full"),
            energy_full_design_uwh: number("energy_full_design"),
            charge_full_uah: number("charge_full"),
            charge_full_design_uah: number("charge_full_design"),
            energy_mah: None,
        };
        info.energy_mah = energy_mah(
            info.energy_full_uwh.or(info.energy_full_design_uwh),
            info.voltage_min_design_uv,
        );

        Ok(info)
    }
}
