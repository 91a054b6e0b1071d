use super::Extraction;
use crate::decode;
use crate::error::{DecodeError, Result};
use crate::sysfs::SysfsRoot;
use serde::Serialize;

const NET_BASE: &str = "sys/class/net";

/// ARPHRD_LOOPBACK from `<linux/if_arp.h>`.
const ARPHRD_LOOPBACK: u32 = 772;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Wifi,
    Ethernet,
    Loopback,
    /// No backing device: bridges, tunnels, veth, docker0 and friends.
    Virtual,
}

impl std::fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterfaceKind::Wifi => write!(f, "wifi"),
            InterfaceKind::Ethernet => write!(f, "ethernet"),
            InterfaceKind::Loopback => write!(f, "loopback"),
            InterfaceKind::Virtual => write!(f, "virtual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInterface {
    pub name: String,
    pub mac: Option<String>,
    pub kind: InterfaceKind,
    pub driver: Option<String>,
    pub operstate: Option<String>,
    pub carrier: Option<bool>,
    /// Link speed in Mb/s; absent while the link is down.
    pub speed_mbps: Option<u32>,
}

impl NetworkInterface {
    pub fn read(sysfs: &SysfsRoot, name: &str) -> Result<Self> {
        let base = sysfs.child(NET_BASE, name)?;

        let arp_type = sysfs.read_optional_with(format!("{}/type", base), decode::as_int::<u32>)?;
        let kind = if arp_type == Some(ARPHRD_LOOPBACK) {
            InterfaceKind::Loopback
        } else if sysfs.is_dir(format!("{}/wireless", base))
            || sysfs.exists(format!("{}/phy80211", base))
        {
            InterfaceKind::Wifi
        } else if sysfs.exists(format!("{}/device", base)) {
            InterfaceKind::Ethernet
        } else {
            InterfaceKind::Virtual
        };

        let mac = sysfs
            .read_lenient_text(format!("{}/address", base))
            .filter(|m| m != "00:00:00:00:00:00");

        Ok(Self {
            name: name.to_string(),
            mac,
            kind,
            driver: sysfs.link_name(format!("{}/device/driver", base)),
            operstate: sysfs.read_lenient_text(format!("{}/operstate", base)),
            carrier: link_attr(sysfs, &format!("{}/carrier", base), decode::as_bool)?,
            speed_mbps: link_attr(sysfs, &format!("{}/speed", base), decode::as_int::<i64>)?
                .filter(|s| *s > 0)
                .and_then(|s| u32::try_from(s).ok()),
        })
    }

    pub fn is_up(&self) -> bool {
        self.operstate.as_deref() == Some("up")
    }
}

/// `carrier` and `speed` answer EINVAL while the interface is down.
fn link_attr<T>(
    sysfs: &SysfsRoot,
    path: &str,
    decode: impl FnOnce(&str) -> std::result::Result<T, DecodeError>,
) -> Result<Option<T>> {
    match sysfs.read_optional_with(path, decode) {
        Err(e) if e.is_invalid_input() => Ok(None),
        other => other,
    }
}

pub fn detect(sysfs: &SysfsRoot) -> Result<Extraction<NetworkInterface>> {
    let mut extraction = Extraction::new();
    for name in sysfs.list_names(NET_BASE)? {
        extraction.push_result(&name, NetworkInterface::read(sysfs, &name));
    }
    Ok(extraction)
}
