//! The install pipeline: copy, reload, enable, start, then print hints.
use nix::unistd::Uid;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use strum_macros::Display;
use tracing::{debug, info, warn};

use crate::{
    config::InstallConfig,
    constants::{COPY_PROGRAM, JOURNALCTL, READ_PROGRAM, REMOVE_PROGRAM},
    error::{CopyFailure, InstallError},
    systemctl::{Escalation, ServiceManager, capture_command, run_command},
};

/// One discrete, checkable side effect of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    /// Copy the unit file into the destination directory.
    Copy,
    /// Reload the service manager's unit database.
    Reload,
    /// Enable the unit for boot-time start.
    Enable,
    /// Start the unit now.
    Start,
}

impl Step {
    /// Steps in the order they run. The first failure halts the rest.
    pub const PIPELINE: [Step; 4] = [Step::Copy, Step::Reload, Step::Enable, Step::Start];
}

/// Outcome of a successful installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Unit name as the service manager knows it.
    pub unit: String,
    /// The installed unit file.
    pub destination: PathBuf,
    /// SHA-256 of the installed unit file.
    pub digest: String,
    /// Whether the installed file differs from what was there before.
    pub changed: bool,
    /// Steps that completed, in order.
    pub completed: Vec<Step>,
}

/// Outcome of an uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub unit: String,
    /// False when there was no installed unit file to begin with.
    pub removed: bool,
}

/// Unit state as reported by the service manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub unit: String,
    pub installed: bool,
    pub unit_file: PathBuf,
    pub enabled: String,
    pub active: String,
}

struct CopyOutcome {
    digest: String,
    changed: bool,
}

/// Runs installation operations for one configured unit against a
/// [`ServiceManager`].
pub struct Installer<M: ServiceManager> {
    config: InstallConfig,
    manager: M,
}

impl<M: ServiceManager> Installer<M> {
    pub fn new(config: InstallConfig, manager: M) -> Self {
        Self { config, manager }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Copies, reloads, enables and starts the unit, stopping at the first
    /// failure. Rerunning after a failure or a success is safe.
    pub fn install(&self) -> Result<InstallReport, InstallError> {
        self.check_privileges();

        let unit = self.config.unit_name();
        let destination = self.config.destination_path();
        let mut report = InstallReport {
            unit: unit.clone(),
            destination: destination.clone(),
            digest: String::new(),
            changed: false,
            completed: Vec::with_capacity(Step::PIPELINE.len()),
        };

        for step in Step::PIPELINE {
            debug!("Running step '{step}' for {unit}");
            match step {
                Step::Copy => {
                    info!(
                        "Copying {} to {}",
                        self.config.source_path.display(),
                        destination.display()
                    );
                    let outcome = self.copy_unit(&destination)?;
                    if !outcome.changed {
                        info!("Unit file {} is unchanged", destination.display());
                    }
                    report.digest = outcome.digest;
                    report.changed = outcome.changed;
                }
                Step::Reload => {
                    info!("Reloading service manager units");
                    self.manager
                        .daemon_reload()
                        .map_err(InstallError::ReloadError)?;
                }
                Step::Enable => {
                    info!("Enabling {unit}");
                    self.manager.enable(&unit).map_err(|source| {
                        InstallError::EnableError {
                            unit: unit.clone(),
                            source,
                        }
                    })?;
                }
                Step::Start => {
                    info!("Starting {unit}");
                    self.manager
                        .start(&unit)
                        .map_err(|source| InstallError::StartError {
                            unit: unit.clone(),
                            source,
                        })?;
                }
            }
            report.completed.push(step);
        }

        Ok(report)
    }

    /// Stops and disables the unit, removes its file and reloads the manager.
    /// Does nothing if the unit file is not installed.
    pub fn uninstall(&self) -> Result<UninstallReport, InstallError> {
        self.check_privileges();

        let unit = self.config.unit_name();
        let destination = self.config.destination_path();

        if !destination.exists() {
            info!("{} is not installed; nothing to remove", destination.display());
            return Ok(UninstallReport {
                unit,
                removed: false,
            });
        }

        info!("Stopping {unit}");
        self.manager
            .stop(&unit)
            .map_err(|source| InstallError::StopError {
                unit: unit.clone(),
                source,
            })?;

        info!("Disabling {unit}");
        self.manager
            .disable(&unit)
            .map_err(|source| InstallError::DisableError {
                unit: unit.clone(),
                source,
            })?;

        info!("Removing {}", destination.display());
        self.remove_unit(&destination)
            .map_err(|reason| InstallError::RemoveError {
                path: destination.clone(),
                reason,
            })?;

        info!("Reloading service manager units");
        self.manager
            .daemon_reload()
            .map_err(InstallError::ReloadError)?;

        Ok(UninstallReport {
            unit,
            removed: true,
        })
    }

    /// Reports whether the unit file is present and what the manager says
    /// about enablement and activity.
    pub fn status(&self) -> Result<UnitStatus, InstallError> {
        let unit = self.config.unit_name();
        let unit_file = self.config.destination_path();
        let query_error = |source| InstallError::QueryError {
            unit: unit.clone(),
            source,
        };

        let enabled = self.manager.is_enabled(&unit).map_err(query_error)?;
        let active = self.manager.is_active(&unit).map_err(query_error)?;

        Ok(UnitStatus {
            installed: unit_file.is_file(),
            unit: unit.clone(),
            unit_file,
            enabled,
            active,
        })
    }

    fn check_privileges(&self) {
        if self.config.escalation == Escalation::None && !Uid::effective().is_root() {
            warn!(
                "Not running as root; writing to {} and controlling units may fail (try --escalation sudo)",
                self.config.destination_dir.display()
            );
        }
    }

    fn copy_unit(&self, destination: &Path) -> Result<CopyOutcome, InstallError> {
        let source = &self.config.source_path;
        let fail = |reason: CopyFailure| InstallError::CopyError {
            from: source.clone(),
            to: destination.to_path_buf(),
            reason,
        };

        // Only stat the source here; its contents may be readable by root alone.
        if !source.is_file() {
            return Err(fail(CopyFailure::MissingSource));
        }

        let previous = if destination.is_file() {
            self.read_digest(destination).ok()
        } else {
            None
        };

        if is_same_file(source, destination) {
            debug!("Source is already the installed unit file; skipping copy");
            return Ok(CopyOutcome {
                digest: self.read_digest(source).map_err(fail)?,
                changed: false,
            });
        }

        match self.config.escalation {
            Escalation::None => {
                fs::copy(source, destination).map_err(|e| fail(e.into()))?;
            }
            escalation => {
                let mut cmd = escalation.command(COPY_PROGRAM);
                cmd.arg("--").arg(source).arg(destination);
                run_command(cmd).map_err(|e| fail(e.into()))?;
            }
        }

        let source_digest = self.read_digest(source).map_err(fail)?;
        let installed = self.read_digest(destination).map_err(fail)?;
        if installed != source_digest {
            return Err(fail(CopyFailure::DigestMismatch {
                source_digest,
                destination: installed,
            }));
        }

        Ok(CopyOutcome {
            changed: previous.as_deref() != Some(installed.as_str()),
            digest: installed,
        })
    }

    /// Digest of `path`, read through the escalation program when the
    /// calling user may not read it.
    fn read_digest(&self, path: &Path) -> Result<String, CopyFailure> {
        match (self.config.escalation, file_digest(path)) {
            (Escalation::None, result) => Ok(result?),
            (escalation, Err(err)) if err.kind() == io::ErrorKind::PermissionDenied => {
                debug!("{} is not readable; reading it with {escalation}", path.display());
                let mut cmd = escalation.command(READ_PROGRAM);
                cmd.arg("--").arg(path);
                Ok(digest_bytes(&capture_command(cmd)?))
            }
            (_, result) => Ok(result?),
        }
    }

    fn remove_unit(&self, destination: &Path) -> Result<(), CopyFailure> {
        match self.config.escalation {
            Escalation::None => match fs::remove_file(destination) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            },
            escalation => {
                let mut cmd = escalation.command(REMOVE_PROGRAM);
                cmd.arg("-f").arg("--").arg(destination);
                Ok(run_command(cmd)?)
            }
        }
    }
}

/// Hex-encoded SHA-256 of a file's contents.
pub fn file_digest(path: &Path) -> io::Result<String> {
    Ok(digest_bytes(&fs::read(path)?))
}

fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Follow-up commands printed after a successful install.
pub fn follow_up_hints(unit: &str) -> Vec<(String, &'static str)> {
    vec![
        (format!("sudo systemctl status {unit}"), "check status"),
        (format!("sudo systemctl stop {unit}"), "stop the service"),
        (format!("sudo systemctl start {unit}"), "start the service"),
        (format!("sudo systemctl restart {unit}"), "restart the service"),
        (format!("sudo {JOURNALCTL} -u {unit} -f"), "follow the logs"),
    ]
}

/// Renders the follow-up hints as the block printed to the terminal.
pub fn render_hints(unit: &str) -> String {
    let hints = follow_up_hints(unit);
    let width = hints.iter().map(|(cmd, _)| cmd.len()).max().unwrap_or(0);

    let mut out = String::from("Useful commands:\n");
    for (cmd, what) in hints {
        out.push_str(&format!("  {cmd:<width$}  # {what}\n"));
    }
    out
}
