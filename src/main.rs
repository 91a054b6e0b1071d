use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use hwgrade::cli::{Cli, Command, Component};
use hwgrade::command::SystemRunner;
use hwgrade::config::GradingConfig;
use hwgrade::detect::battery::BatteryProbe;
use hwgrade::detect::{self, HardwareInfo, cpu, disk, gpu, memory, network, ports};
use hwgrade::grade::{self, Grade};
use hwgrade::output;
use hwgrade::sysfs::SysfsRoot;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let sysfs = SysfsRoot::system();
    let battery = BatteryProbe::new(sysfs.clone());
    let json = cli.json;

    match cli.command {
        Command::Inventory => cmd_inventory(&sysfs, &battery, json)?,
        Command::Cpu => cmd_cpu(&sysfs, json)?,
        Command::Memory => cmd_memory(json)?,
        Command::Disk => cmd_disk(&sysfs, json)?,
        Command::Gpu => cmd_gpu(&sysfs, json)?,
        Command::Battery => cmd_battery(&battery, json)?,
        Command::Network => cmd_network(&sysfs, json)?,
        Command::Ports => cmd_ports(&sysfs, json)?,
        Command::Grade { component } => {
            let config = hwgrade::config::load(cli.config.as_ref());
            cmd_grade(&sysfs, &battery, &config, component, json)?
        }
        Command::Completions { shell } => hwgrade::cli::print_completions(shell),
    }

    Ok(())
}

/// RUST_LOG wins; otherwise -v/-vv raise the default `warn` level. Logs go to
/// stderr so JSON on stdout stays parseable.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_inventory(sysfs: &SysfsRoot, battery: &BatteryProbe, json: bool) -> Result<()> {
    let hw = HardwareInfo::detect(sysfs, &SystemRunner, battery);
    if json {
        output::print_json(&hw)?;
    } else {
        output::print_inventory(&hw);
    }
    Ok(())
}

fn cmd_cpu(sysfs: &SysfsRoot, json: bool) -> Result<()> {
    let info = cpu::CpuInfo::detect(sysfs).context("reading CPU information")?;
    if json {
        output::print_json(&info)?;
    } else {
        output::print_cpu(&info);
    }
    Ok(())
}

fn cmd_memory(json: bool) -> Result<()> {
    let info = memory::MemoryInfo::detect(&SystemRunner).context("reading memory modules")?;
    if json {
        output::print_json(&info)?;
    } else {
        output::print_memory(&info);
        if info.slots.is_empty() {
            println!(
                "  {} dmidecode reported no modules. Try {}.",
                "Note:".yellow(),
                "sudo hwgrade memory".cyan()
            );
        }
    }
    Ok(())
}

fn cmd_disk(sysfs: &SysfsRoot, json: bool) -> Result<()> {
    let disks = disk::detect(sysfs).context("listing block devices")?;
    if json {
        output::print_json(&disks)?;
    } else {
        output::print_disks(&disks);
    }
    Ok(())
}

fn cmd_gpu(sysfs: &SysfsRoot, json: bool) -> Result<()> {
    let gpus = gpu::detect(sysfs, &SystemRunner).context("reading graphics cards")?;
    if json {
        output::print_json(&gpus)?;
    } else {
        output::print_gpus(&gpus);
    }
    Ok(())
}

fn cmd_battery(battery: &BatteryProbe, json: bool) -> Result<()> {
    let info = battery.probe().context("reading battery")?;
    if json {
        output::print_json(&info)?;
    } else {
        output::print_battery(&info);
    }
    Ok(())
}

fn cmd_network(sysfs: &SysfsRoot, json: bool) -> Result<()> {
    let ifaces = network::detect(sysfs).context("listing network interfaces")?;
    if json {
        output::print_json(&ifaces)?;
    } else {
        output::print_network(&ifaces);
    }
    Ok(())
}

fn cmd_ports(sysfs: &SysfsRoot, json: bool) -> Result<()> {
    let info = ports::PortsInfo::detect(sysfs);
    if json {
        output::print_json(&info)?;
    } else {
        output::print_ports(&info);
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct GradeReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    battery: Option<grade::battery::BatteryHealthTest>,
    disks: Vec<grade::disk::DiskHealthTest>,
    skipped: Vec<detect::UnitError>,
    overall: Option<Grade>,
}

fn cmd_grade(
    sysfs: &SysfsRoot,
    battery: &BatteryProbe,
    config: &GradingConfig,
    component: Option<Component>,
    json: bool,
) -> Result<()> {
    let wants = |c: Component| component.is_none_or(|only| only == c);
    let mut report = GradeReport {
        battery: None,
        disks: Vec::new(),
        skipped: Vec::new(),
        overall: None,
    };

    if wants(Component::Battery) {
        let graded = battery
            .probe()
            .and_then(|info| grade::battery::run(&info, &config.battery));
        match graded {
            Ok(test) => report.battery = Some(test),
            Err(e) if component == Some(Component::Battery) => {
                return Err(e).context("grading battery");
            }
            Err(e) => report.skipped.push(detect::UnitError {
                unit: "battery".to_string(),
                message: e.to_string(),
            }),
        }
    }

    if wants(Component::Disk) {
        let disks = disk::detect(sysfs).context("listing block devices")?;
        report.disks = disks
            .units
            .iter()
            .map(|d| grade::disk::run(d, &config.disk))
            .collect();
        report.skipped.extend(disks.errors);
    }

    let grades: Vec<Grade> = report
        .battery
        .iter()
        .map(|t| t.grade)
        .chain(report.disks.iter().map(|t| t.grade))
        .collect();
    report.overall = Grade::worst_of(grades.iter().copied());

    if json {
        output::print_json(&report)?;
        return Ok(());
    }

    if let Some(test) = &report.battery {
        output::print_battery_test(test);
    }
    for test in &report.disks {
        output::print_disk_test(test);
    }
    output::print_unit_errors(&report.skipped);
    println!();
    output::print_overall(&grades);

    Ok(())
}
