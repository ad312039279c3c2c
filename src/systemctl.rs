//! Access to the host service manager.
//!
//! Everything unitg asks of systemd goes through the [`ServiceManager`] trait so
//! the install pipeline can run against the real `systemctl` or a stand-in.
use serde::Deserialize;
use std::{
    ffi::OsStr,
    process::{Command, Stdio},
};
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::{
    config::InstallConfig,
    constants::{SUDO, UNKNOWN_STATE},
    error::CommandError,
};

/// How privileged commands are executed.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Escalation {
    /// Run commands directly; unitg itself is expected to be privileged.
    #[default]
    None,
    /// Prefix every privileged command with `sudo`.
    Sudo,
}

impl Escalation {
    /// Builds a command for `program`, wrapped in `sudo` when escalating.
    pub fn command(&self, program: impl AsRef<OsStr>) -> Command {
        match self {
            Escalation::None => Command::new(program),
            Escalation::Sudo => {
                let mut cmd = Command::new(SUDO);
                cmd.arg(program);
                cmd
            }
        }
    }
}

/// Operations the installer needs from the service manager.
pub trait ServiceManager {
    /// Reloads the unit database so new or changed unit files are seen.
    fn daemon_reload(&self) -> Result<(), CommandError>;

    /// Marks the unit to start at boot.
    fn enable(&self, unit: &str) -> Result<(), CommandError>;

    /// Removes the unit's boot-time activation.
    fn disable(&self, unit: &str) -> Result<(), CommandError>;

    /// Starts the unit now.
    fn start(&self, unit: &str) -> Result<(), CommandError>;

    /// Stops the unit now.
    fn stop(&self, unit: &str) -> Result<(), CommandError>;

    /// Enablement state as reported by the manager (`enabled`, `disabled`, ...).
    fn is_enabled(&self, unit: &str) -> Result<String, CommandError>;

    /// Activity state as reported by the manager (`active`, `inactive`, ...).
    fn is_active(&self, unit: &str) -> Result<String, CommandError>;
}

/// [`ServiceManager`] backed by the `systemctl` program.
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: String,
    escalation: Escalation,
}

impl Systemctl {
    pub fn new(program: impl Into<String>, escalation: Escalation) -> Self {
        Self {
            program: program.into(),
            escalation,
        }
    }

    pub fn from_config(config: &InstallConfig) -> Self {
        Self::new(config.systemctl.clone(), config.escalation)
    }

    /// Builds the privileged command for `args`, without running it.
    pub fn control_command(&self, args: &[&str]) -> Command {
        let mut cmd = self.escalation.command(&self.program);
        cmd.args(args);
        cmd
    }

    fn control(&self, args: &[&str]) -> Result<(), CommandError> {
        run_command(self.control_command(args))
    }

    // Queries are read-only and never escalated. A non-zero exit is how
    // systemctl says "disabled" or "inactive", so only stdout matters.
    fn query(&self, verb: &str, unit: &str) -> Result<String, CommandError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(verb).arg(unit);
        cmd.stdin(Stdio::null()).stderr(Stdio::null());

        let rendered = render_command(&cmd);
        debug!("Executing query: {rendered}");

        let output = cmd.output().map_err(|source| CommandError::Spawn {
            command: rendered,
            source,
        })?;

        let state = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        if state.is_empty() {
            Ok(UNKNOWN_STATE.to_string())
        } else {
            Ok(state)
        }
    }
}

impl ServiceManager for Systemctl {
    fn daemon_reload(&self) -> Result<(), CommandError> {
        self.control(&["daemon-reload"])
    }

    fn enable(&self, unit: &str) -> Result<(), CommandError> {
        self.control(&["enable", unit])
    }

    fn disable(&self, unit: &str) -> Result<(), CommandError> {
        self.control(&["disable", unit])
    }

    fn start(&self, unit: &str) -> Result<(), CommandError> {
        self.control(&["start", unit])
    }

    fn stop(&self, unit: &str) -> Result<(), CommandError> {
        self.control(&["stop", unit])
    }

    fn is_enabled(&self, unit: &str) -> Result<String, CommandError> {
        self.query("is-enabled", unit)
    }

    fn is_active(&self, unit: &str) -> Result<String, CommandError> {
        self.query("is-active", unit)
    }
}

/// Runs `cmd` with the terminal inherited and waits for it. Whatever the
/// command prints reaches the user unchanged.
pub fn run_command(mut cmd: Command) -> Result<(), CommandError> {
    let rendered = render_command(&cmd);
    debug!("Executing command: {rendered}");

    let status = cmd.status().map_err(|source| CommandError::Spawn {
        command: rendered.clone(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(CommandError::from_status(rendered, status))
    }
}

/// Runs `cmd` and returns its stdout. Stderr still reaches the terminal.
pub fn capture_command(mut cmd: Command) -> Result<Vec<u8>, CommandError> {
    let rendered = render_command(&cmd);
    debug!("Executing command: {rendered}");

    cmd.stdin(Stdio::null()).stderr(Stdio::inherit());
    let output = cmd.output().map_err(|source| CommandError::Spawn {
        command: rendered.clone(),
        source,
    })?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(CommandError::from_status(rendered, output.status))
    }
}

/// Space-joined program and arguments, for logs and error messages.
pub fn render_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
