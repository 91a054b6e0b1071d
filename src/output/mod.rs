use crate::detect::battery::BatteryInfo;
use crate::detect::cpu::CpuInfo;
use crate::detect::disk::DiskInfo;
use crate::detect::gpu::GpuInfo;
use crate::detect::memory::MemoryInfo;
use crate::detect::network::NetworkInterface;
use crate::detect::ports::PortsInfo;
use crate::detect::{Extraction, HardwareInfo, UnitError};
use crate::error::{Error, Result};
use crate::grade::battery::BatteryHealthTest;
use crate::grade::disk::DiskHealthTest;
use crate::grade::{Grade, TestStatus};
use colored::{ColoredString, Colorize};
use serde::Serialize;

const LABEL_W: usize = 18;

type Row = (String, String);

fn row(label: impl Into<String>, value: impl Into<String>) -> Row {
    (label.into(), value.into())
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or("Unknown").to_string()
}

/// Pretty-print any record as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a titled box of label/value rows.
pub fn print_box(title: &str, rows: &[Row]) {
    // Box width from content
    let inner_w = rows
        .iter()
        .map(|(l, v)| l.len().max(LABEL_W) + 2 + v.len())
        .max()
        .unwrap_or(40)
        .max(title.len() + 2);

    let fill = inner_w.saturating_sub(1 + title.len());
    println!("╭─ {} {}╮", title.bold(), "─".repeat(fill));

    for (label, value) in rows {
        let padded = format!("{:<w$}", label, w = LABEL_W);
        let pad = inner_w.saturating_sub(padded.len() + 2 + value.len());
        println!("│ {}  {}{} │", padded.dimmed(), value, " ".repeat(pad));
    }

    println!("╰{}╯", "─".repeat(inner_w + 2));
}

pub fn colored_grade(grade: Grade) -> ColoredString {
    let s = grade.to_string();
    match grade {
        Grade::A => s.green().bold(),
        Grade::B => s.cyan().bold(),
        Grade::C => s.yellow().bold(),
        Grade::F => s.red().bold(),
    }
}

pub fn colored_status(status: TestStatus) -> ColoredString {
    let s = status.to_string().to_uppercase();
    match status {
        TestStatus::Passed => s.green(),
        TestStatus::Warning => s.yellow(),
        TestStatus::Failed => s.red(),
    }
}

pub fn print_domain_error(domain: &str, err: &Error) {
    println!("  {} {}: {}", "error".red().bold(), domain, err);
}

pub fn print_unit_errors(errors: &[UnitError]) {
    for e in errors {
        println!("  {} {}: {}", "skipped".yellow(), e.unit, e.message.dimmed());
    }
}

pub fn cpu_rows(cpu: &CpuInfo) -> Vec<Row> {
    let mut rows = vec![
        row("Model", or_unknown(cpu.model_name.as_deref())),
        row("Vendor", or_unknown(cpu.vendor_id.as_deref())),
        row("Architecture", cpu.arch.clone()),
        row(
            "Cores / Threads",
            format!(
                "{} / {}",
                cpu.cores.map_or("?".to_string(), |c| c.to_string()),
                cpu.logical_cpus
            ),
        ),
        row("Cache (total)", format!("{:.1} MiB", cpu.cache_size_mib())),
    ];
    for cache in &cpu.caches {
        rows.push(row(
            format!("  L{} {}", cache.level, cache.kind),
            format!("{} KiB (cpus {})", cache.size_bytes / 1024, cache.shared_cpus),
        ));
    }
    if let (Some(min), Some(max)) = (cpu.freq_min_mhz, cpu.freq_max_mhz) {
        rows.push(row("Frequency", format!("{:.0}-{:.0} MHz", min, max)));
    }
    rows
}

pub fn print_cpu(cpu: &CpuInfo) {
    print_box("CPU", &cpu_rows(cpu));
}

pub fn memory_rows(memory: &MemoryInfo) -> Vec<Row> {
    let mut rows = vec![row(
        "Total",
        format!("{:.1} GiB in {} module(s)", memory.total_gib(), memory.slots.len()),
    )];
    for slot in &memory.slots {
        let mut desc = format!(
            "{} MB {}",
            slot.size_mb,
            slot.memory_type.as_deref().unwrap_or("")
        );
        if let Some(speed) = slot.configured_speed.or(slot.speed) {
            desc.push_str(&format!(" @ {} MT/s", speed));
        }
        if let Some(m) = &slot.manufacturer {
            desc.push_str(&format!(" ({})", m));
        }
        rows.push(row(or_unknown(slot.slot.as_deref()), desc));
    }
    rows
}

pub fn print_memory(memory: &MemoryInfo) {
    print_box("Memory", &memory_rows(memory));
}

fn disk_rows(disk: &DiskInfo) -> Vec<Row> {
    let model = match &disk.vendor {
        Some(v) => format!("{} {}", v, disk.model),
        None => disk.model.clone(),
    };
    vec![
        row("Model", model),
        row("Type", disk.kind.to_string()),
        row("Size", format!("{:.1} GB", disk.size_gb())),
        row(
            "Partitions",
            if disk.partitions.is_empty() {
                "none".to_string()
            } else {
                disk.partitions.join(", ")
            },
        ),
    ]
}

pub fn print_disks(disks: &Extraction<DiskInfo>) {
    if disks.is_empty() {
        println!("  {}", "No disks found.".yellow());
    }
    for disk in &disks.units {
        print_box(&format!("Disk {}", disk.name), &disk_rows(disk));
    }
    print_unit_errors(&disks.errors);
}

fn gpu_rows(gpu: &GpuInfo) -> Vec<Row> {
    let ids = match (&gpu.vendor_id, &gpu.device_id) {
        (Some(v), Some(d)) => format!("{}:{}", v, d),
        _ => "Unknown".to_string(),
    };
    vec![
        row("Model", gpu.model.clone()),
        row("Vendor", gpu.vendor.clone()),
        row("PCI", format!("{} [{}]", gpu.pci_slot, ids)),
        row(
            "Driver",
            format!(
                "{} {}",
                or_unknown(gpu.driver.as_deref()),
                gpu.version.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string(),
        ),
        row(
            "Outputs",
            if gpu.outputs.is_empty() {
                "none connected".to_string()
            } else {
                gpu.outputs.join(", ")
            },
        ),
    ]
}

pub fn print_gpus(gpus: &Extraction<GpuInfo>) {
    if gpus.is_empty() {
        println!("  {}", "No GPU found.".yellow());
    }
    for gpu in &gpus.units {
        print_box(&format!("GPU {}", gpu.card), &gpu_rows(gpu));
    }
    print_unit_errors(&gpus.errors);
}

pub fn battery_rows(battery: &BatteryInfo) -> Vec<Row> {
    let mut rows = vec![
        row(
            "Model",
            format!(
                "{} {}",
                or_unknown(battery.manufacturer.as_deref()),
                battery.model.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string(),
        ),
        row("Status", battery.status.clone()),
        row("Charge", format!("{}%", battery.capacity_percent)),
    ];
    if let Some(tech) = &battery.technology {
        rows.push(row("Technology", tech.clone()));
    }
    if let Some(health) = battery.health_percent() {
        rows.push(row("Health", format!("{:.0}%", health)));
    }
    if let Some(mah) = battery.energy_mah {
        rows.push(row("Capacity", format!("{:.0} mAh", mah)));
    }
    if let Some(cycles) = battery.cycle_count {
        rows.push(row("Cycles", cycles.to_string()));
    }
    rows
}

pub fn print_battery(battery: &BatteryInfo) {
    print_box(&format!("Battery {}", battery.supply_name), &battery_rows(battery));
}

fn network_value(iface: &NetworkInterface) -> String {
    let mut value = format!("{} {}", iface.kind, iface.operstate.as_deref().unwrap_or("?"));
    if let Some(speed) = iface.speed_mbps {
        value.push_str(&format!(" {} Mb/s", speed));
    }
    if let Some(driver) = &iface.driver {
        value.push_str(&format!(" ({})", driver));
    }
    if let Some(mac) = &iface.mac {
        value.push_str(&format!(" {}", mac));
    }
    value
}

pub fn print_network(ifaces: &Extraction<NetworkInterface>) {
    let rows: Vec<Row> = ifaces
        .units
        .iter()
        .map(|i| row(i.name.clone(), network_value(i)))
        .collect();
    print_box("Network", &rows);
    print_unit_errors(&ifaces.errors);
}

fn push_list<T>(rows: &mut Vec<Row>, result: &Result<Vec<T>>, describe: impl Fn(&T) -> Row) {
    match result {
        Ok(items) => rows.extend(items.iter().map(describe)),
        Err(e) => rows.push(row("error", e.to_string())),
    }
}

/// Like [`push_list`], with each skipped unit listed after the readable ones.
fn push_units<T>(
    rows: &mut Vec<Row>,
    result: &Result<Extraction<T>>,
    describe: impl Fn(&T) -> Row,
) {
    match result {
        Ok(ex) => {
            rows.extend(ex.units.iter().map(describe));
            rows.extend(
                ex.errors
                    .iter()
                    .map(|e| row(e.unit.clone(), format!("unreadable: {}", e.message))),
            );
        }
        Err(e) => rows.push(row("error", e.to_string())),
    }
}

pub fn print_ports(ports: &PortsInfo) {
    let mut rows = Vec::new();
    push_units(&mut rows, &ports.controllers, |c| {
        row(c.pci_address.clone(), c.kind.to_string())
    });
    print_box("USB Controllers", &rows);

    let mut rows = Vec::new();
    push_units(&mut rows, &ports.usb_devices, |d| {
        row(
            d.name.clone(),
            format!(
                "{} [{}]",
                or_unknown(d.product.as_deref()),
                d.speed_class.as_deref().unwrap_or("?")
            ),
        )
    });
    print_box("USB Devices", &rows);

    let mut rows = Vec::new();
    push_units(&mut rows, &ports.usbc_ports, |p| {
        row(
            p.name.clone(),
            format!(
                "power {} / data {}",
                p.power_role.as_deref().unwrap_or("?"),
                p.data_role.as_deref().unwrap_or("?")
            ),
        )
    });
    push_list(&mut rows, &ports.serial_ports, |s| {
        row(s.name.clone(), or_unknown(s.driver.as_deref()))
    });
    print_box("USB-C / Serial", &rows);
}

/// Full inventory, one box per domain; failed domains print their error.
pub fn print_inventory(hw: &HardwareInfo) {
    match &hw.cpu {
        Ok(cpu) => print_cpu(cpu),
        Err(e) => print_domain_error("cpu", e),
    }
    match &hw.memory {
        Ok(memory) => print_memory(memory),
        Err(e) => print_domain_error("memory", e),
    }
    match &hw.disks {
        Ok(disks) => print_disks(disks),
        Err(e) => print_domain_error("disk", e),
    }
    match &hw.gpus {
        Ok(gpus) => print_gpus(gpus),
        Err(e) => print_domain_error("gpu", e),
    }
    match &hw.battery {
        Ok(battery) => print_battery(battery),
        Err(e) => print_domain_error("battery", e),
    }
    match &hw.network {
        Ok(ifaces) => print_network(ifaces),
        Err(e) => print_domain_error("network", e),
    }
    print_ports(&hw.ports);
}

fn print_issues(issues: &[String]) {
    for issue in issues {
        println!("    {} {}", "•".yellow(), issue);
    }
}

pub fn print_battery_test(test: &BatteryHealthTest) {
    println!(
        "  {} {}  {}  health {:.0}%, cycles {}",
        "Battery".bold(),
        colored_grade(test.grade),
        colored_status(test.status),
        test.health_percent,
        test.cycle_count.map_or("unknown".to_string(), |c| c.to_string())
    );
    print_issues(&test.issues);
}

pub fn print_disk_test(test: &DiskHealthTest) {
    println!(
        "  {} {}  {}  {} {:.1} GB",
        format!("Disk {}", test.disk).bold(),
        colored_grade(test.grade),
        colored_status(test.status),
        test.kind,
        test.size_gb
    );
    print_issues(&test.issues);
}

/// Worst grade across every test, shown as the machine's overall grade.
pub fn print_overall(grades: &[Grade]) {
    match Grade::worst_of(grades.iter().copied()) {
        Some(grade) => println!("{}", format!("  Overall: {}", colored_grade(grade)).bold()),
        None => println!("  {}", "Nothing to grade.".yellow()),
    }
}
