//! Helpers shared by unit tests.
use std::{
    cell::RefCell,
    collections::HashSet,
    sync::{Mutex, MutexGuard, OnceLock},
};

use crate::{error::CommandError, systemctl::ServiceManager};

/// Global lock for environment variable modifications in tests.
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A service-manager control call seen by [`RecordingManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DaemonReload,
    Enable(String),
    Disable(String),
    Start(String),
    Stop(String),
}

/// In-memory [`ServiceManager`] that records control calls, tracks
/// enabled/active units and can fail one verb with a chosen exit code.
#[derive(Debug, Default)]
pub struct RecordingManager {
    calls: RefCell<Vec<Call>>,
    enabled: RefCell<HashSet<String>>,
    active: RefCell<HashSet<String>>,
    failure: Option<(&'static str, i32)>,
}

impl RecordingManager {
    pub fn failing_on(verb: &'static str, code: i32) -> Self {
        Self {
            failure: Some((verb, code)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, verb: &str, call: Call) -> Result<(), CommandError> {
        self.calls.borrow_mut().push(call);
        match self.failure {
            Some((failing, code)) if failing == verb => Err(CommandError::Exited {
                command: format!("systemctl {verb}"),
                code,
            }),
            _ => Ok(()),
        }
    }
}

impl ServiceManager for RecordingManager {
    fn daemon_reload(&self) -> Result<(), CommandError> {
        self.record("daemon-reload", Call::DaemonReload)
    }

    fn enable(&self, unit: &str) -> Result<(), CommandError> {
        self.record("enable", Call::Enable(unit.to_string()))?;
        self.enabled.borrow_mut().insert(unit.to_string());
        Ok(())
    }

    fn disable(&self, unit: &str) -> Result<(), CommandError> {
        self.record("disable", Call::Disable(unit.to_string()))?;
        self.enabled.borrow_mut().remove(unit);
        Ok(())
    }

    fn start(&self, unit: &str) -> Result<(), CommandError> {
        self.record("start", Call::Start(unit.to_string()))?;
        self.active.borrow_mut().insert(unit.to_string());
        Ok(())
    }

    fn stop(&self, unit: &str) -> Result<(), CommandError> {
        self.record("stop", Call::Stop(unit.to_string()))?;
        self.active.borrow_mut().remove(unit);
        Ok(())
    }

    fn is_enabled(&self, unit: &str) -> Result<String, CommandError> {
        let state = if self.enabled.borrow().contains(unit) {
            "enabled"
        } else {
            "disabled"
        };
        Ok(state.to_string())
    }

    fn is_active(&self, unit: &str) -> Result<String, CommandError> {
        let state = if self.active.borrow().contains(unit) {
            "active"
        } else {
            "inactive"
        };
        Ok(state.to_string())
    }
}
