use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hwgrade",
    about = "Hardware inventory and A/B/C/F health grading for Linux machines",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON instead of formatted tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Read grading thresholds from this file instead of
    /// /etc/hwgrade/config.toml and ~/.config/hwgrade/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Probe every hardware domain and print a full inventory
    Inventory,

    /// Processor model, caches and frequency range
    Cpu,

    /// Installed memory modules (runs dmidecode, usually needs root)
    Memory,

    /// Physical disks and their partitions
    Disk,

    /// Graphics cards, drivers and connected outputs (runs lspci)
    Gpu,

    /// Battery identity, capacity and wear
    Battery,

    /// Network interfaces and link state
    Network,

    /// USB devices, USB-C ports, USB controllers and serial ports
    Ports,

    /// Grade battery and disks against the configured thresholds
    Grade {
        /// Only grade this component (default: all)
        #[arg(value_enum)]
        component: Option<Component>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (auto-detected if omitted)
        shell: Option<Shell>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Component {
    Battery,
    Disk,
}

/// Print shell completions to stdout.
pub fn print_completions(shell: Option<Shell>) {
    let shell = shell.or_else(Shell::from_env).unwrap_or_else(|| {
        eprintln!(
            "Could not detect shell. Specify one: hwgrade completions bash|zsh|fish|elvish|powershell"
        );
        std::process::exit(1);
    });
    clap_complete::generate(shell, &mut Cli::command(), "hwgrade", &mut std::io::stdout());
}
