//! Constants and default configuration values for unitg.

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Configuration file picked up from the working directory when `--config` is
/// not given.
pub const DEFAULT_CONFIG_FILE: &str = "unitg.yaml";

/// Directory the service manager loads system units from.
pub const DEFAULT_DESTINATION_DIR: &str = "/etc/systemd/system";

/// Logical name of the service installed when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "clio-daemon";

/// Program used to talk to the service manager.
pub const DEFAULT_SYSTEMCTL: &str = "systemctl";

// ============================================================================
// Unit Naming
// ============================================================================

/// Suffix appended to bare service names.
pub const SERVICE_SUFFIX: &str = ".service";

/// Unit type suffixes recognised as already-complete unit names.
pub const UNIT_SUFFIXES: &[&str] = &[
    ".service",
    ".socket",
    ".timer",
    ".path",
    ".target",
    ".mount",
    ".automount",
    ".swap",
    ".slice",
];

// ============================================================================
// External Programs
// ============================================================================

/// Program used for per-command privilege escalation.
pub const SUDO: &str = "sudo";

/// Program used to copy the unit file when escalating per command.
pub const COPY_PROGRAM: &str = "cp";

/// Program used to read files the calling user cannot, when escalating.
pub const READ_PROGRAM: &str = "cat";

/// Program used to remove the unit file when escalating per command.
pub const REMOVE_PROGRAM: &str = "rm";

/// Program suggested for following service logs.
pub const JOURNALCTL: &str = "journalctl";

/// Reported by status queries when the manager printed nothing.
pub const UNKNOWN_STATE: &str = "unknown";
