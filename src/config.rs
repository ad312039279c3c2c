//! Configuration management for unitg.
use regex::{Captures, Regex};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};
use tracing::debug;

use crate::{
    constants::{
        DEFAULT_CONFIG_FILE, DEFAULT_DESTINATION_DIR, DEFAULT_SERVICE_NAME,
        DEFAULT_SYSTEMCTL, SERVICE_SUFFIX, UNIT_SUFFIXES,
    },
    error::ConfigError,
    systemctl::Escalation,
};

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("env var pattern is valid")
});

/// Represents the structure of the configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Location of the unit descriptor to install.
    pub source_path: Option<String>,
    /// The service manager's unit directory.
    pub destination_dir: Option<String>,
    /// Logical identifier of the service.
    pub service_name: Option<String>,
    /// Program used to talk to the service manager.
    pub systemctl: Option<String>,
    /// How privileged commands are run.
    pub escalation: Option<Escalation>,
}

/// Values given on the command line; these win over the configuration file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub source_path: Option<String>,
    pub destination_dir: Option<String>,
    pub service_name: Option<String>,
    pub systemctl: Option<String>,
    pub escalation: Option<Escalation>,
}

/// Fully resolved installer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    /// Location of the unit descriptor to install.
    pub source_path: PathBuf,
    /// The service manager's unit directory.
    pub destination_dir: PathBuf,
    /// Logical identifier of the service, validated.
    pub service_name: String,
    /// Program used to talk to the service manager.
    pub systemctl: String,
    /// How privileged commands are run.
    pub escalation: Escalation,
}

impl ConfigFile {
    fn expand_env(self) -> Result<Self, ConfigError> {
        let expand =
            |value: Option<String>| value.map(|raw| expand_env_vars(&raw)).transpose();

        Ok(ConfigFile {
            source_path: expand(self.source_path)?,
            destination_dir: expand(self.destination_dir)?,
            service_name: expand(self.service_name)?,
            systemctl: expand(self.systemctl)?,
            escalation: self.escalation,
        })
    }
}

impl InstallConfig {
    /// Merges a parsed file with command-line overrides. Relative paths coming
    /// from the file are resolved against `base`, the file's directory.
    pub fn resolve(
        file: ConfigFile,
        base: Option<&Path>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let from_file = |value: Option<String>| {
            value.map(|raw| match base {
                Some(base) if Path::new(&raw).is_relative() => base.join(raw),
                _ => PathBuf::from(raw),
            })
        };

        let service_name = overrides
            .service_name
            .or(file.service_name)
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        validate_service_name(&service_name)?;

        let source_path = overrides
            .source_path
            .map(PathBuf::from)
            .or_else(|| from_file(file.source_path))
            .unwrap_or_else(|| PathBuf::from(unit_file_name(&service_name)));

        let destination_dir = overrides
            .destination_dir
            .map(PathBuf::from)
            .or_else(|| from_file(file.destination_dir))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION_DIR));

        Ok(InstallConfig {
            source_path,
            destination_dir,
            service_name,
            systemctl: overrides
                .systemctl
                .or(file.systemctl)
                .unwrap_or_else(|| DEFAULT_SYSTEMCTL.to_string()),
            escalation: overrides.escalation.or(file.escalation).unwrap_or_default(),
        })
    }

    /// Name of the unit as the service manager knows it (e.g. `foo.service`).
    pub fn unit_name(&self) -> String {
        unit_file_name(&self.service_name)
    }

    /// Path of the installed unit file.
    pub fn destination_path(&self) -> PathBuf {
        self.destination_dir.join(self.unit_name())
    }
}

/// Appends `.service` to bare names; names that already carry a unit type
/// suffix are kept as they are.
pub fn unit_file_name(service_name: &str) -> String {
    if UNIT_SUFFIXES
        .iter()
        .any(|suffix| service_name.len() > suffix.len() && service_name.ends_with(suffix))
    {
        service_name.to_string()
    } else {
        format!("{service_name}{SERVICE_SUFFIX}")
    }
}

fn validate_service_name(name: &str) -> Result<(), ConfigError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('-')
        || name.contains('/')
        || name.chars().any(|c| c.is_whitespace() || c.is_control());
    if invalid {
        return Err(ConfigError::InvalidServiceName(name.to_string()));
    }
    Ok(())
}

/// Expands `$VAR` and `${VAR}` references from the environment.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing = None;
    let expanded = ENV_VAR.replace_all(input, |caps: &Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| {
            missing.get_or_insert_with(|| var_name.to_string());
            String::new()
        })
    });

    match missing {
        Some(name) => Err(ConfigError::MissingEnvVar(name)),
        None => Ok(expanded.into_owned()),
    }
}

/// Parses configuration file contents, then expands environment variables in
/// the string values. Comments are never expanded.
pub fn parse_config(content: &str) -> Result<ConfigFile, ConfigError> {
    let blank = content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(ConfigFile::default());
    }

    let file: ConfigFile = serde_yaml::from_str(content)?;
    file.expand_env()
}

/// Loads the configuration file (explicit path, else `unitg.yaml` in the
/// working directory if present, else built-in defaults) and applies
/// command-line overrides.
pub fn load_config(
    config_path: Option<&str>,
    overrides: Overrides,
) -> Result<InstallConfig, ConfigError> {
    let config_path = match config_path {
        Some(path) => Some(Path::new(path)),
        None => Some(Path::new(DEFAULT_CONFIG_FILE)).filter(|path| path.exists()),
    };

    let Some(config_path) = config_path else {
        debug!("No configuration file found; using defaults");
        return InstallConfig::resolve(ConfigFile::default(), None, overrides);
    };

    let content = fs::read_to_string(config_path).map_err(|e| {
        ConfigError::ReadError(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, config_path.display()),
        ))
    })?;
    debug!("Loaded configuration from {}", config_path.display());

    let file = parse_config(&content)?;
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    InstallConfig::resolve(file, Some(base), overrides)
}
