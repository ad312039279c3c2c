//! unitg installs a unit file into the systemd unit directory, reloads the
//! service manager, enables the unit for boot and starts it, failing fast on
//! the first step that does not succeed.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Constants and defaults.
pub mod constants;

/// Error handling.
pub mod error;

/// The install pipeline.
pub mod installer;

/// Service manager access.
pub mod systemctl;

#[doc(hidden)]
pub mod test_utils;
