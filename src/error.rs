//! Error handling for unitg.
use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Exit code used for failures that happen inside unitg itself rather than in
/// an external command.
pub const INTERNAL_FAILURE_CODE: i32 = 1;

/// Exit code reported when the external program could not be found.
pub const COMMAND_NOT_FOUND_CODE: i32 = 127;

/// Exit code reported when the external program exists but cannot be run.
pub const COMMAND_NOT_EXECUTABLE_CODE: i32 = 126;

/// Errors raised while loading or validating the installer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading the configuration file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// The configuration references an environment variable that is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// The service name cannot be used as a unit file name.
    #[error("Invalid service name '{0}'")]
    InvalidServiceName(String),
}

impl ConfigError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        INTERNAL_FAILURE_CODE
    }
}

/// A failed external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be launched at all.
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// The underlying launch error.
        #[source]
        source: io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("`{command}` exited with status {code}")]
    Exited {
        /// Rendered command line.
        command: String,
        /// Exit code, or 128 + signal number when the command was killed.
        code: i32,
    },
}

impl CommandError {
    /// Builds an [`CommandError::Exited`] from a non-successful status.
    pub fn from_status(command: String, status: ExitStatus) -> Self {
        CommandError::Exited {
            command,
            code: status_code(status),
        }
    }

    /// Process exit code to propagate for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Spawn { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => COMMAND_NOT_FOUND_CODE,
                io::ErrorKind::PermissionDenied => COMMAND_NOT_EXECUTABLE_CODE,
                _ => INTERNAL_FAILURE_CODE,
            },
            CommandError::Exited { code, .. } => *code,
        }
    }

    /// Whether the command already printed its own diagnostics.
    pub fn reported_by_command(&self) -> bool {
        matches!(self, CommandError::Exited { .. })
    }
}

/// Maps an exit status to the code a shell would report for it.
pub fn status_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => INTERNAL_FAILURE_CODE,
    }
}

/// Why the copy step failed.
#[derive(Debug, Error)]
pub enum CopyFailure {
    /// The source artifact does not exist or is not a regular file.
    #[error("source unit file does not exist")]
    MissingSource,

    /// Filesystem error while reading or writing.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The escalated copy command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The destination does not match the source after copying.
    #[error("destination digest {destination} does not match source digest {source_digest}")]
    DigestMismatch {
        /// SHA-256 of the source artifact.
        source_digest: String,
        /// SHA-256 of the installed copy.
        destination: String,
    },
}

/// Defines all possible errors of the install pipeline and its companions.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Copying the unit file into the destination directory failed.
    #[error("Failed to copy '{}' to '{}': {reason}", .from.display(), .to.display())]
    CopyError {
        /// The source artifact.
        from: PathBuf,
        /// The destination unit file.
        to: PathBuf,
        /// The underlying failure.
        #[source]
        reason: CopyFailure,
    },

    /// The service manager could not reload its unit database.
    #[error("Failed to reload service manager: {0}")]
    ReloadError(#[source] CommandError),

    /// The unit could not be enabled.
    #[error("Failed to enable unit '{unit}': {source}")]
    EnableError {
        /// The unit being enabled.
        unit: String,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },

    /// The unit could not be started.
    #[error("Failed to start unit '{unit}': {source}")]
    StartError {
        /// The unit being started.
        unit: String,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },

    /// The unit could not be stopped during uninstall.
    #[error("Failed to stop unit '{unit}': {source}")]
    StopError {
        /// The unit being stopped.
        unit: String,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },

    /// The unit could not be disabled during uninstall.
    #[error("Failed to disable unit '{unit}': {source}")]
    DisableError {
        /// The unit being disabled.
        unit: String,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },

    /// The installed unit file could not be removed.
    #[error("Failed to remove '{}': {reason}", .path.display())]
    RemoveError {
        /// The installed unit file.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        reason: CopyFailure,
    },

    /// Querying the unit state failed.
    #[error("Failed to query unit '{unit}': {source}")]
    QueryError {
        /// The unit being queried.
        unit: String,
        /// The underlying command failure.
        #[source]
        source: CommandError,
    },
}

impl InstallError {
    /// Process exit code for this error, propagated from the failing command
    /// where there is one.
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::CopyError { reason, .. }
            | InstallError::RemoveError { reason, .. } => match reason {
                CopyFailure::Command(err) => err.exit_code(),
                _ => INTERNAL_FAILURE_CODE,
            },
            InstallError::ReloadError(source)
            | InstallError::EnableError { source, .. }
            | InstallError::StartError { source, .. }
            | InstallError::StopError { source, .. }
            | InstallError::DisableError { source, .. }
            | InstallError::QueryError { source, .. } => source.exit_code(),
        }
    }

    /// Whether the failing command already wrote its diagnostics to the
    /// terminal, in which case nothing more should be printed.
    pub fn reported_by_command(&self) -> bool {
        match self {
            InstallError::CopyError { reason, .. }
            | InstallError::RemoveError { reason, .. } => match reason {
                CopyFailure::Command(err) => err.reported_by_command(),
                _ => false,
            },
            InstallError::ReloadError(source)
            | InstallError::EnableError { source, .. }
            | InstallError::StartError { source, .. }
            | InstallError::StopError { source, .. }
            | InstallError::DisableError { source, .. }
            | InstallError::QueryError { source, .. } => source.reported_by_command(),
        }
    }
}

/// Any failure of a unitg invocation, as seen by the binary.
#[derive(Debug, Error)]
pub enum UnitgError {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An install, uninstall or status operation failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// Status output could not be rendered.
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl UnitgError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            UnitgError::Config(err) => err.exit_code(),
            UnitgError::Install(err) => err.exit_code(),
            UnitgError::Output(_) => INTERNAL_FAILURE_CODE,
        }
    }

    /// Whether a failing external command already printed the diagnostics.
    pub fn reported_by_command(&self) -> bool {
        matches!(self, UnitgError::Install(err) if err.reported_by_command())
    }
}
