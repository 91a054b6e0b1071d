use crate::decode;
use crate::error::Result;
use crate::sysfs::{MAX_PROC_FILE_SIZE, SysfsRoot};
use serde::Serialize;
use std::collections::HashSet;

const CPUINFO: &str = "proc/cpuinfo";
const CPU_BASE: &str = "sys/devices/system/cpu";

/// Identity of one physical cache. Every logical CPU sharing a cache exposes
/// its own `index*` entry for it, all with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheId {
    pub level: u32,
    pub kind: String,
    pub shared_cpus: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub level: u32,
    pub kind: String,
    pub size_bytes: u64,
    pub shared_cpus: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuInfo {
    pub arch: String,
    pub vendor_id: Option<String>,
    pub model_name: Option<String>,
    /// Physical cores per package, as `/proc/cpuinfo` reports them.
    pub cores: Option<u32>,
    pub logical_cpus: u32,
    /// Distinct physical caches.
    pub caches: Vec<CacheInfo>,
    pub cache_size_bytes: u64,
    pub freq_min_mhz: Option<f64>,
    pub freq_max_mhz: Option<f64>,
}

impl CpuInfo {
    /// Fails only if `/proc/cpuinfo` cannot be read; caches and frequencies
    /// degrade to empty/absent.
    pub fn detect(sysfs: &SysfsRoot) -> Result<Self> {
        let cpuinfo = sysfs.read_limited(CPUINFO, MAX_PROC_FILE_SIZE)?;
        let mut info = parse_cpuinfo(&cpuinfo);
        info.arch = std::env::consts::ARCH.to_string();

        let cpus = list_cpus(sysfs);
        info.logical_cpus = cpus.len() as u32;

        info.caches = collect_caches(sysfs, &cpus);
        info.cache_size_bytes = info.caches.iter().map(|c| c.size_bytes).sum();

        let freq = format!("{}/cpu0/cpufreq", CPU_BASE);
        info.freq_min_mhz = read_khz(sysfs, &format!("{}/cpuinfo_min_freq", freq));
        info.freq_max_mhz = read_khz(sysfs, &format!("{}/cpuinfo_max_freq", freq));

        Ok(info)
    }

    pub fn cache_size_mib(&self) -> f64 {
        self.cache_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// First occurrence wins for every key; later processors repeat the same values.
pub fn parse_cpuinfo(text: &str) -> CpuInfo {
    let mut info = CpuInfo::default();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "vendor_id" if info.vendor_id.is_none() => {
                info.vendor_id = decode::as_optional_string(value);
            }
            "model name" if info.model_name.is_none() => {
                info.model_name = decode::as_optional_string(value);
            }
            "cpu cores" if info.cores.is_none() => {
                info.cores = decode::as_int(value).ok();
            }
            _ => {}
        }
    }

    info
}

fn is_cpu_dir(name: &str) -> bool {
    name.strip_prefix("cpu")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn is_cache_index(name: &str) -> bool {
    name.strip_prefix("index")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn list_cpus(sysfs: &SysfsRoot) -> Vec<String> {
    match sysfs.list_names(CPU_BASE) {
        Ok(entries) => entries.into_iter().filter(|e| is_cpu_dir(e)).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "cannot list cpus");
            Vec::new()
        }
    }
}

/// Walk every `cpuN/cache/indexM` and keep one entry per [`CacheId`].
/// Entries with an unreadable field are skipped.
fn collect_caches(sysfs: &SysfsRoot, cpus: &[String]) -> Vec<CacheInfo> {
    let mut seen = HashSet::new();
    let mut caches = Vec::new();

    for cpu in cpus {
        let cache_dir = format!("{}/{}/cache", CPU_BASE, cpu);
        let Ok(entries) = sysfs.list_names(&cache_dir) else {
            continue;
        };

        for index in entries.iter().filter(|e| is_cache_index(e)) {
            let base = format!("{}/{}", cache_dir, index);
            match read_cache_index(sysfs, &base, &mut seen) {
                Ok(Some(cache)) => caches.push(cache),
                Ok(None) => {}
                Err(e) => tracing::debug!(index = %base, error = %e, "skipping cache entry"),
            }
        }
    }

    caches
}

/// `Ok(None)` when the cache was already counted through another CPU.
fn read_cache_index(
    sysfs: &SysfsRoot,
    base: &str,
    seen: &mut HashSet<CacheId>,
) -> Result<Option<CacheInfo>> {
    let id = CacheId {
        level: sysfs.read_int(format!("{}/level", base))?,
        kind: sysfs.read(format!("{}/type", base))?,
        shared_cpus: sysfs.read(format!("{}/shared_cpu_list", base))?,
    };
    if seen.contains(&id) {
        return Ok(None);
    }

    let size_bytes = sysfs.read_with(format!("{}/size", base), decode::size_with_unit)?;
    let cache = CacheInfo {
        level: id.level,
        kind: id.kind.clone(),
        size_bytes,
        shared_cpus: id.shared_cpus.clone(),
    };
    seen.insert(id);
    Ok(Some(cache))
}

fn read_khz(sysfs: &SysfsRoot, path: &str) -> Option<f64> {
    sysfs
        .read_optional_with(path, decode::as_int::<u64>)
        .unwrap_or_else(|e| {
            tracing::debug!(path, error = %e, "cpu frequency unavailable");
            None
        })
        .map(decode::mhz_from_khz)
}
