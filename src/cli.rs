//! Command-line interface for unitg.
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{config::Overrides, systemctl::Escalation};

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogLevelArg(pub LevelFilter);

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        trimmed
            .parse::<LevelFilter>()
            .map(LogLevelArg)
            .map_err(|_| format!("invalid log level '{trimmed}' (expected a name or 0-5)"))
    }
}

/// Installs a systemd unit file, enables it and starts it.
#[derive(Parser)]
#[command(name = "unitg", version, author)]
#[command(
    about = "Install a systemd unit file, enable it and start it",
    long_about = None
)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Path to the configuration file (defaults to `unitg.yaml` if present).
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Unit file to install.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub source: Option<String>,

    /// Directory the service manager loads units from.
    #[arg(short, long = "dest-dir", value_name = "DIR", global = true)]
    pub dest_dir: Option<String>,

    /// Logical service name; `.service` is appended when no unit suffix is given.
    #[arg(short, long, value_name = "NAME", global = true)]
    pub name: Option<String>,

    /// Program used to talk to the service manager.
    #[arg(long, value_name = "PROGRAM", global = true)]
    pub systemctl: Option<String>,

    /// How privileged commands are run: `none` or `sudo` (per command).
    #[arg(short, long, value_name = "MODE", global = true)]
    pub escalation: Option<Escalation>,

    /// The command to execute (defaults to `install`).
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Configuration values given on the command line.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            source_path: self.source.clone(),
            destination_dir: self.dest_dir.clone(),
            service_name: self.name.clone(),
            systemctl: self.systemctl.clone(),
            escalation: self.escalation,
        }
    }
}

/// Available commands for unitg.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Copy the unit file, reload the service manager, enable and start the unit.
    Install,

    /// Stop and disable the unit, remove its file and reload the service manager.
    Uninstall,

    /// Show whether the unit is installed, enabled and active.
    Status {
        /// Emit machine-readable JSON output instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the follow-up commands for managing the unit.
    Hints,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
