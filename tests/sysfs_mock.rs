use hwgrade::command::CommandRunner;
use hwgrade::config::GradingConfig;
use hwgrade::detect::HardwareInfo;
use hwgrade::detect::battery::BatteryProbe;
use hwgrade::detect::disk::{self, DiskKind};
use hwgrade::detect::gpu::GpuVendor;
use hwgrade::detect::network::InterfaceKind;
use hwgrade::error::{Error, Result};
use hwgrade::grade::{self, Grade, TestStatus};
use hwgrade::sysfs::SysfsRoot;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use tempfile::TempDir;

/// Canned stdout keyed by the full command line.
#[derive(Default)]
struct FakeRunner {
    outputs: HashMap<String, String>,
}

impl FakeRunner {
    fn with(mut self, cmdline: &str, stdout: &str) -> Self {
        self.outputs.insert(cmdline.to_string(), stdout.to_string());
        self
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let mut cmdline = program.to_string();
        for arg in args {
            cmdline.push(' ');
            cmdline.push_str(arg);
        }
        self.outputs.get(&cmdline).cloned().ok_or(Error::Command {
            program: program.to_string(),
            detail: "not found in PATH".to_string(),
        })
    }
}

const DMIDECODE: &str = "\
# dmidecode 3.5
Getting SMBIOS data from sysfs.
SMBIOS 3.3.0 present.

Handle 0x0010, DMI type 17, 92 bytes
Memory Device
\tArray Handle: 0x000F
\tSize: 16 GB
\tForm Factor: SODIMM
\tLocator: DIMM 0
\tBank Locator: P0 CHANNEL A
\tType: DDR5
\tSpeed: 5600 MT/s
\tManufacturer: Micron Technology
\tPart Number: CT16G56C46S5.M8G1
\tConfigured Memory Speed: 5600 MT/s

Handle 0x0011, DMI type 17, 92 bytes
Memory Device
\tArray Handle: 0x000F
\tSize: 16384 MB
\tForm Factor: SODIMM
\tLocator: DIMM 1
\tBank Locator: P0 CHANNEL B
\tType: DDR5
\tSpeed: 5600 MT/s
\tManufacturer: Micron Technology
\tConfigured Memory Speed: 5600 MT/s
";

const LSPCI_IGPU: &str = "0000:c1:00.0 \"VGA compatible controller [0300]\" \"Advanced Micro Devices, Inc. [AMD/ATI] [1002]\" \"Phoenix1 [15bf]\" -rc1 \"Framework Computer Inc. [f111]\" \"Device [0007]\"\n";

fn write(path: &Path, value: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("{}\n", value)).unwrap();
}

fn runner() -> FakeRunner {
    FakeRunner::default()
        .with("dmidecode -t memory", DMIDECODE)
        .with("lspci -mm -nn -D -s 0000:c1:00.0", LSPCI_IGPU)
}

/// Mock sysfs tree of a Framework 16 AMD laptop: 8 cores with SMT, one NVMe
/// disk in use plus a blank SATA SSD, an AMD iGPU, a worn battery, wifi and
/// a handful of ports.
fn create_framework16_fixture(root: &Path) {
    // CPU
    let cpuinfo = "processor\t: 0\nvendor_id\t: AuthenticAMD\ncpu family\t: 25\nmodel name\t: AMD Ryzen 9 7940HS w/ Radeon 780M Graphics\ncpu cores\t: 8\n\nprocessor\t: 1\nvendor_id\t: AuthenticAMD\nmodel name\t: AMD Ryzen 9 7940HS w/ Radeon 780M Graphics\ncpu cores\t: 8\n";
    write(&root.join("proc/cpuinfo"), cpuinfo);

    let cpu_base = root.join("sys/devices/system/cpu");
    for cpu in 0..16u32 {
        let core = cpu / 2;
        let siblings = format!("{}-{}", core * 2, core * 2 + 1);
        let cache = cpu_base.join(format!("cpu{}/cache", cpu));
        for (index, level, kind, shared, size) in [
            (0, 1, "Data", siblings.as_str(), "32K"),
            (1, 1, "Instruction", siblings.as_str(), "32K"),
            (2, 2, "Unified", siblings.as_str(), "1024K"),
            (3, 3, "Unified", "0-15", "16384K"),
        ] {
            let dir = cache.join(format!("index{}", index));
            write(&dir.join("level"), &level.to_string());
            write(&dir.join("type"), kind);
            write(&dir.join("shared_cpu_list"), shared);
            write(&dir.join("size"), size);
        }
    }
    write(&cpu_base.join("cpu0/cpufreq/cpuinfo_min_freq"), "400000");
    write(&cpu_base.join("cpu0/cpufreq/cpuinfo_max_freq"), "5263000");

    // Disks: nvme0n1 with an OS on it, an empty SATA SSD, and virtual devices
    let nvme = root.join("sys/block/nvme0n1");
    write(&nvme.join("size"), "1953525168");
    write(&nvme.join("queue/rotational"), "0");
    write(&nvme.join("device/model"), "WD_BLACK SN850X 1000GB");
    fs::create_dir_all(nvme.join("nvme0n1p1")).unwrap();
    fs::create_dir_all(nvme.join("nvme0n1p2")).unwrap();

    let sda = root.join("sys/block/sda");
    write(&sda.join("size"), "500118192");
    write(&sda.join("queue/rotational"), "0");
    write(&sda.join("device/vendor"), "ATA");
    write(&sda.join("device/model"), "Samsung SSD 870");

    write(&root.join("sys/block/loop0/size"), "0");
    write(&root.join("sys/block/zram0/size"), "16777216");

    // GPU (AMD iGPU) with the internal panel connected
    write(
        &root.join("sys/class/drm/card1/device/uevent"),
        "DRIVER=amdgpu\nPCI_CLASS=30000\nPCI_ID=1002:15BF\nPCI_SUBSYS_ID=F111:0007\nPCI_SLOT_NAME=0000:c1:00.0",
    );
    write(&root.join("sys/class/drm/card1-eDP-1/status"), "connected");
    write(&root.join("sys/class/drm/card1-DP-1/status"), "disconnected");
    write(&root.join("sys/class/drm/renderD128/dev"), "226:128");
    write(&root.join("sys/module/amdgpu/version"), "3.57.0");

    // Battery
    let bat = root.join("sys/class/power_supply/BAT1");
    write(&bat.join("status"), "Discharging");
    write(&bat.join("capacity"), "75");
    write(&bat.join("manufacturer"), "NVT");
    write(&bat.join("model_name"), "Framewo");
    write(&bat.join("technology"), "Li-ion");
    write(&bat.join("cycle_count"), "420");
    write(&bat.join("voltage_min_design"), "15480000");
    write(&bat.join("voltage_now"), "16100000");
    write(&bat.join("energy_full"), "64050000");
    write(&bat.join("energy_full_design"), "85000000");
    fs::create_dir_all(root.join("sys/class/power_supply/ACAD")).unwrap();

    // Network
    let net = root.join("sys/class/net");
    write(&net.join("lo/type"), "772");
    write(&net.join("lo/operstate"), "unknown");
    write(&net.join("wlp1s0/type"), "1");
    write(&net.join("wlp1s0/address"), "a8:3b:76:00:11:22");
    write(&net.join("wlp1s0/operstate"), "up");
    write(&net.join("wlp1s0/carrier"), "1");
    fs::create_dir_all(net.join("wlp1s0/wireless")).unwrap();
    let mt = root.join("sys/bus/pci/drivers/mt7921e");
    fs::create_dir_all(&mt).unwrap();
    fs::create_dir_all(net.join("wlp1s0/device")).unwrap();
    symlink(&mt, net.join("wlp1s0/device/driver")).unwrap();

    // USB controllers on PCI
    let pci = root.join("sys/bus/pci/devices");
    write(&pci.join("0000:c1:00.0/class"), "0x030000");
    write(&pci.join("0000:c1:00.3/class"), "0x0c0330");
    write(&pci.join("0000:c1:00.3/max_child_bus_number"), "1");
    write(&pci.join("0000:c3:00.5/class"), "0x0c0340");

    // USB devices: root hub, interface, webcam
    let usb = root.join("sys/bus/usb/devices");
    write(&usb.join("usb1/speed"), "480");
    write(&usb.join("1-4:1.0/bInterfaceClass"), "0e");
    write(&usb.join("1-4/speed"), "480");
    write(&usb.join("1-4/product"), "Laptop Camera");
    write(&usb.join("1-4/busnum"), "1");
    write(&usb.join("1-4/devnum"), "2");

    // USB-C
    let typec = root.join("sys/class/typec");
    write(&typec.join("port0/power_role"), "source [sink]");
    write(&typec.join("port0/data_role"), "host [device]");
    write(&typec.join("port0/power_operation_mode"), "usb_power_delivery");
    write(&typec.join("port1/power_role"), "[source] sink");

    // TTYs: one real UART, virtual consoles
    let tty = root.join("sys/class/tty");
    fs::create_dir_all(tty.join("ttyS0/device")).unwrap();
    fs::create_dir_all(tty.join("tty1")).unwrap();
    fs::create_dir_all(tty.join("console")).unwrap();
}

fn fixture() -> (TempDir, SysfsRoot) {
    let tmp = TempDir::new().unwrap();
    create_framework16_fixture(tmp.path());
    let sysfs = SysfsRoot::new(tmp.path());
    (tmp, sysfs)
}

#[test]
fn test_framework16_inventory() {
    let (_tmp, sysfs) = fixture();
    let battery = BatteryProbe::new(sysfs.clone());
    let hw = HardwareInfo::detect(&sysfs, &runner(), &battery);

    let cpu = hw.cpu.as_ref().unwrap();
    assert_eq!(cpu.vendor_id.as_deref(), Some("AuthenticAMD"));
    assert_eq!(cpu.cores, Some(8));
    assert_eq!(cpu.logical_cpus, 16);
    assert_eq!(cpu.freq_max_mhz, Some(5263.0));

    let memory = hw.memory.as_ref().unwrap();
    assert_eq!(memory.slots.len(), 2);
    assert_eq!(memory.total_mb, 32768);

    let disks = hw.disks.as_ref().unwrap();
    let names: Vec<&str> = disks.units.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["nvme0n1", "sda"]);
    assert!(disks.errors.is_empty());

    let gpus = hw.gpus.as_ref().unwrap();
    assert_eq!(gpus.units.len(), 1);

    let battery = hw.battery.as_ref().unwrap();
    assert_eq!(battery.supply_name, "BAT1");

    let network = hw.network.as_ref().unwrap();
    assert_eq!(network.units.len(), 2);

    assert_eq!(hw.ports.usb_devices.as_ref().unwrap().units.len(), 1);
    assert_eq!(hw.ports.usbc_ports.as_ref().unwrap().units.len(), 2);
    assert_eq!(hw.ports.controllers.as_ref().unwrap().units.len(), 2);
    assert_eq!(hw.ports.serial_ports.as_ref().unwrap().len(), 1);
}

#[test]
fn test_shared_caches_counted_once() {
    let (_tmp, sysfs) = fixture();
    let cpu = hwgrade::detect::cpu::CpuInfo::detect(&sysfs).unwrap();

    // 8 private L1d + 8 private L1i + 8 L2 per core pair, one L3 for all.
    assert_eq!(cpu.caches.len(), 25);
    let expected = 8 * 32 * 1024 + 8 * 32 * 1024 + 8 * 1024 * 1024 + 16 * 1024 * 1024;
    assert_eq!(cpu.cache_size_bytes, expected);
}

#[test]
fn test_disk_details() {
    let (_tmp, sysfs) = fixture();
    let disks = disk::detect(&sysfs).unwrap();

    let nvme = &disks.units[0];
    assert_eq!(nvme.kind, DiskKind::Ssd);
    assert_eq!(nvme.vendor.as_deref(), Some("WD"));
    assert_eq!(nvme.model, "BLACK SN850X 1000GB");
    assert_eq!(nvme.partitions, vec!["nvme0n1p1", "nvme0n1p2"]);

    let sda = &disks.units[1];
    assert_eq!(sda.vendor.as_deref(), Some("ATA"));
    assert!(sda.partitions.is_empty());
    assert!((sda.size_gb() - 256.06).abs() < 0.01);
}

#[test]
fn test_gpu_details() {
    let (_tmp, sysfs) = fixture();
    let gpus = hwgrade::detect::gpu::detect(&sysfs, &runner()).unwrap();
    let gpu = &gpus.units[0];

    assert_eq!(gpu.card, "card1");
    assert_eq!(gpu.vendor, "Advanced Micro Devices, Inc. [AMD/ATI]");
    assert_eq!(gpu.model, "Phoenix1");
    assert_eq!(gpu.vendor_kind, Some(GpuVendor::Amd));
    assert_eq!(gpu.vendor_id.as_deref(), Some("0x1002"));
    assert_eq!(gpu.device_id.as_deref(), Some("0x15bf"));
    assert_eq!(gpu.version.as_deref(), Some("3.57.0"));
    assert_eq!(gpu.outputs, vec!["eDP-1"]);
}

#[test]
fn test_network_details() {
    let (_tmp, sysfs) = fixture();
    let network = hwgrade::detect::network::detect(&sysfs).unwrap();

    let wifi = network.units.iter().find(|i| i.name == "wlp1s0").unwrap();
    assert_eq!(wifi.kind, InterfaceKind::Wifi);
    assert_eq!(wifi.driver.as_deref(), Some("mt7921e"));
    assert!(wifi.is_up());
    assert_eq!(wifi.carrier, Some(true));

    let lo = network.units.iter().find(|i| i.name == "lo").unwrap();
    assert_eq!(lo.kind, InterfaceKind::Loopback);
}

#[test]
fn test_missing_tools_only_affect_their_domains() {
    let (_tmp, sysfs) = fixture();
    let battery = BatteryProbe::new(sysfs.clone());
    let hw = HardwareInfo::detect(&sysfs, &FakeRunner::default(), &battery);

    assert!(matches!(hw.memory, Err(Error::Command { .. })));
    assert!(matches!(hw.gpus, Err(Error::Detection(_))));
    assert!(hw.cpu.is_ok());
    assert!(hw.disks.is_ok());
    assert!(hw.battery.is_ok());
    assert!(hw.network.is_ok());
}

#[test]
fn test_battery_supply_shared_across_inventories() {
    let (tmp, sysfs) = fixture();
    let battery = BatteryProbe::new(sysfs.clone());

    let first = HardwareInfo::detect(&sysfs, &FakeRunner::default(), &battery);
    assert_eq!(first.battery.as_ref().unwrap().supply_name, "BAT1");

    // BAT0 sorts first, but the supply resolved by the first inventory sticks.
    let bat0 = tmp.path().join("sys/class/power_supply/BAT0");
    fs::create_dir_all(&bat0).unwrap();
    fs::write(bat0.join("capacity"), "10\n").unwrap();
    fs::write(bat0.join("status"), "Full\n").unwrap();

    let second = HardwareInfo::detect(&sysfs, &FakeRunner::default(), &battery);
    assert_eq!(second.battery.as_ref().unwrap().supply_name, "BAT1");
    assert_eq!(BatteryProbe::new(sysfs).probe().unwrap().supply_name, "BAT0");
}

#[test]
fn test_battery_grading_end_to_end() {
    let (_tmp, sysfs) = fixture();
    let config = GradingConfig::default();
    let info = BatteryProbe::new(sysfs).probe().unwrap();

    // 64.05 / 85 Wh = 75.4% health -> B; 420 cycles -> B.
    let test = grade::battery::run(&info, &config.battery).unwrap();
    assert_eq!(test.grade, Grade::B);
    assert_eq!(test.status, TestStatus::Passed);
    assert!(test.issues.is_empty());
    assert!((test.health_percent - 75.35).abs() < 0.01);

    let mah = info.energy_mah.unwrap();
    assert!((mah - 4137.6).abs() < 0.1, "got {mah}");
}

#[test]
fn test_disk_grading_end_to_end() {
    let (_tmp, sysfs) = fixture();
    let config = GradingConfig::default();
    let disks = disk::detect(&sysfs).unwrap();

    let results: Vec<_> = disks
        .units
        .iter()
        .map(|d| grade::disk::run(d, &config.disk))
        .collect();

    // The NVMe still carries an OS.
    assert_eq!(results[0].grade, Grade::F);
    assert_eq!(results[0].status, TestStatus::Failed);
    assert_eq!(
        results[0].issues,
        vec!["residual partitions detected: [nvme0n1p1, nvme0n1p2]"]
    );

    // Blank 256 GB SSD.
    assert_eq!(results[1].grade, Grade::A);
    assert_eq!(results[1].status, TestStatus::Passed);

    let overall = Grade::worst_of(results.iter().map(|r| r.grade));
    assert_eq!(overall, Some(Grade::F));
}

#[test]
fn test_hostile_entry_names_never_opened() {
    let (tmp, sysfs) = fixture();
    fs::create_dir_all(tmp.path().join("sys/block/sd b")).unwrap();
    fs::write(tmp.path().join("sys/block/sd b/size"), "1\n").unwrap();

    let disks = disk::detect(&sysfs).unwrap();
    assert!(disks.units.iter().all(|d| d.name != "sd b"));
    assert!(disks.errors.is_empty());

    let fresh = SysfsRoot::new(tmp.path());
    assert!(matches!(
        disk::DiskInfo::read(&fresh, "../../etc/passwd"),
        Err(Error::Validation { .. })
    ));
    assert_eq!(fresh.files_opened(), 0);
}

#[test]
fn test_inventory_serializes_to_json() {
    let (_tmp, sysfs) = fixture();
    let battery = BatteryProbe::new(sysfs.clone());
    let hw = HardwareInfo::detect(&sysfs, &FakeRunner::default(), &battery);
    let json = serde_json::to_value(&hw).unwrap();

    assert_eq!(json["cpu"]["ok"]["logical_cpus"], 16);
    assert_eq!(json["disks"]["ok"]["units"][1]["kind"], "ssd");
    assert!(json["memory"]["error"].as_str().unwrap().contains("dmidecode"));
    assert_eq!(json["battery"]["ok"]["status"], "Discharging");
}
