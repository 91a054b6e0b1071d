use super::{Extraction, serialize_result};
use crate::decode;
use crate::error::Result;
use crate::sysfs::SysfsRoot;
use serde::Serialize;

const USB_DEVICES: &str = "sys/bus/usb/devices";
const TYPEC_BASE: &str = "sys/class/typec";
const PCI_DEVICES: &str = "sys/bus/pci/devices";
const TTY_BASE: &str = "sys/class/tty";

/// PCI base class 0x0c (serial bus), subclass 0x03 (USB).
const USB_CONTROLLER_CLASS: &str = "0x0c03";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsbDevice {
    /// Topology name, e.g. `1-4` or `3-1.2`.
    pub name: String,
    /// Negotiated speed in Mb/s as the kernel prints it (`1.5`, `480`, ...).
    pub speed: Option<String>,
    pub speed_class: Option<String>,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
    pub bus_num: Option<u32>,
    pub dev_num: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsbCPort {
    pub name: String,
    pub power_role: Option<String>,
    pub data_role: Option<String>,
    pub power_operation_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UsbControllerKind {
    Uhci,
    Ohci,
    Ehci,
    Xhci,
    Usb4,
    Unknown,
}

impl UsbControllerKind {
    /// Programming interface: the last byte of the PCI class code.
    pub fn from_class(class: &str) -> Self {
        let class = class.to_ascii_lowercase();
        match class.get(class.len().saturating_sub(2)..) {
            Some("00") => UsbControllerKind::Uhci,
            Some("10") => UsbControllerKind::Ohci,
            Some("20") => UsbControllerKind::Ehci,
            Some("30") => UsbControllerKind::Xhci,
            Some("40") => UsbControllerKind::Usb4,
            _ => UsbControllerKind::Unknown,
        }
    }
}

impl std::fmt::Display for UsbControllerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UsbControllerKind::Uhci => "USB 1.1 (UHCI)",
            UsbControllerKind::Ohci => "USB 1.1 (OHCI)",
            UsbControllerKind::Ehci => "USB 2.0 (EHCI)",
            UsbControllerKind::Xhci => "USB 3.0 (xHCI)",
            UsbControllerKind::Usb4 => "USB4",
            UsbControllerKind::Unknown => "USB (unknown)",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsbController {
    pub pci_address: String,
    pub kind: UsbControllerKind,
    pub max_child_bus: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerialPort {
    pub name: String,
    pub driver: Option<String>,
    /// Device node, e.g. `/dev/ttyS0`.
    pub device: String,
}

/// Everything port-related. Each list is probed independently, and within a
/// list one unreadable device never hides its siblings.
#[derive(Debug, Serialize)]
pub struct PortsInfo {
    #[serde(serialize_with = "serialize_result")]
    pub usb_devices: Result<Extraction<UsbDevice>>,
    #[serde(serialize_with = "serialize_result")]
    pub usbc_ports: Result<Extraction<UsbCPort>>,
    #[serde(serialize_with = "serialize_result")]
    pub controllers: Result<Extraction<UsbController>>,
    #[serde(serialize_with = "serialize_result")]
    pub serial_ports: Result<Vec<SerialPort>>,
}

impl PortsInfo {
    pub fn detect(sysfs: &SysfsRoot) -> Self {
        Self {
            usb_devices: list_usb_devices(sysfs),
            usbc_ports: list_usbc_ports(sysfs),
            controllers: list_usb_controllers(sysfs),
            serial_ports: list_serial_ports(sysfs),
        }
    }
}

pub fn speed_class(speed: &str) -> String {
    match speed {
        "1.5" | "12" => "USB 2.0".to_string(),
        "480" => "USB 2.0 High-Speed".to_string(),
        "5000" => "USB 3.0".to_string(),
        "10000" => "USB 3.1".to_string(),
        "20000" => "USB 3.2".to_string(),
        other => format!("USB {} Mbps", other),
    }
}

impl UsbDevice {
    pub fn read(sysfs: &SysfsRoot, name: &str) -> Result<Self> {
        let base = sysfs.child(USB_DEVICES, name)?;
        let speed = sysfs.read_lenient_text(format!("{}/speed", base));

        Ok(Self {
            name: name.to_string(),
            speed_class: speed.as_deref().map(speed_class),
            speed,
            product: sysfs.read_lenient_text(format!("{}/product", base)),
            manufacturer: sysfs.read_lenient_text(format!("{}/manufacturer", base)),
            bus_num: sysfs.read_lenient(format!("{}/busnum", base), decode::as_int),
            dev_num: sysfs.read_lenient(format!("{}/devnum", base), decode::as_int),
        })
    }
}

/// Attached devices; root hubs (`usbN`) and interfaces (`1-4:1.0`) are skipped.
pub fn list_usb_devices(sysfs: &SysfsRoot) -> Result<Extraction<UsbDevice>> {
    let mut devices = Extraction::new();
    for name in sysfs.list_names(USB_DEVICES)? {
        if name.starts_with("usb") || name.contains(':') {
            continue;
        }
        devices.push_result(&name, UsbDevice::read(sysfs, &name));
    }
    Ok(devices)
}

impl UsbCPort {
    pub fn read(sysfs: &SysfsRoot, name: &str) -> Result<Self> {
        let base = sysfs.child(TYPEC_BASE, name)?;
        Ok(Self {
            name: name.to_string(),
            power_role: sysfs.read_lenient_text(format!("{}/power_role", base)),
            data_role: sysfs.read_lenient_text(format!("{}/data_role", base)),
            power_operation_mode: sysfs
                .read_lenient_text(format!("{}/power_operation_mode", base)),
        })
    }
}

/// Type-C ports (`portN`); partners and cables are skipped. A missing
/// `/sys/class/typec` means no ports.
pub fn list_usbc_ports(sysfs: &SysfsRoot) -> Result<Extraction<UsbCPort>> {
    let mut ports = Extraction::new();
    if !sysfs.exists(TYPEC_BASE) {
        return Ok(ports);
    }
    for name in sysfs.list_names(TYPEC_BASE)? {
        if !name.starts_with("port") || name.contains('-') {
            continue;
        }
        ports.push_result(&name, UsbCPort::read(sysfs, &name));
    }
    Ok(ports)
}

impl UsbController {
    /// `Ok(None)` for PCI functions that are not USB host controllers.
    pub fn read(sysfs: &SysfsRoot, address: &str) -> Result<Option<Self>> {
        let base = sysfs.child(PCI_DEVICES, address)?;
        let class = match sysfs.read(format!("{}/class", base)) {
            Ok(class) => class,
            Err(e) => {
                tracing::debug!(device = %address, error = %e, "pci class unreadable");
                return Ok(None);
            }
        };
        if !class.to_ascii_lowercase().starts_with(USB_CONTROLLER_CLASS) {
            return Ok(None);
        }

        Ok(Some(Self {
            pci_address: address.to_string(),
            kind: UsbControllerKind::from_class(&class),
            max_child_bus: sysfs
                .read_lenient(format!("{}/max_child_bus_number", base), decode::as_int),
        }))
    }
}

/// PCI functions with class `0x0c03xx`.
pub fn list_usb_controllers(sysfs: &SysfsRoot) -> Result<Extraction<UsbController>> {
    let mut controllers = Extraction::new();
    for address in sysfs.list_names(PCI_DEVICES)? {
        match UsbController::read(sysfs, &address) {
            Ok(None) => {}
            Ok(Some(controller)) => controllers.units.push(controller),
            Err(e) => controllers.push_result(&address, Err(e)),
        }
    }
    Ok(controllers)
}

/// Virtual consoles `tty`, `tty0`..`tty9` and `console`.
fn is_virtual_tty(name: &str) -> bool {
    if name == "console" || name == "tty" {
        return true;
    }
    name.strip_prefix("tty")
        .is_some_and(|n| n.len() == 1 && n.bytes().all(|b| b.is_ascii_digit()))
}

/// TTYs backed by a device; pseudo-terminals and virtual consoles are skipped.
pub fn list_serial_ports(sysfs: &SysfsRoot) -> Result<Vec<SerialPort>> {
    let mut ports = Vec::new();

    for name in sysfs.list_names(TTY_BASE)? {
        if is_virtual_tty(&name) {
            continue;
        }
        let base = sysfs.child(TTY_BASE, &name)?;
        if !sysfs.exists(format!("{}/device", base)) {
            continue;
        }
        ports.push(SerialPort {
            driver: sysfs.link_name(format!("{}/device/driver", base)),
            device: format!("/dev/{}", name),
            name,
        });
    }

    Ok(ports)
}
