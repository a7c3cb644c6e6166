//! Alerts raised for the host application.
//!
//! The client raises [`Alert::LoginNeeded`] when it has no usable
//! credentials and [`Alert::ServerUnreachable`] when a connect attempt
//! fails, and clears each once the condition is gone.

use std::collections::HashSet;
use std::sync::Mutex;

/// Conditions the host should surface to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alert {
    /// Stored credentials are missing or were rejected.
    LoginNeeded,
    /// The last connect attempt failed.
    ServerUnreachable,
}

/// Receives alert transitions. Raising an active alert or clearing an
/// inactive one must be harmless.
pub trait AlertSink: Send + Sync {
    /// Show the alert.
    fn raise(&self, alert: Alert);
    /// Withdraw the alert.
    fn clear(&self, alert: Alert);
}

/// Ignores all alerts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAlerts;

impl AlertSink for NoAlerts {
    fn raise(&self, _alert: Alert) {}
    fn clear(&self, _alert: Alert) {}
}

/// Tracks which alerts are currently raised.
#[derive(Debug, Default)]
pub struct ActiveAlerts {
    active: Mutex<HashSet<Alert>>,
}

impl ActiveAlerts {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `alert` is raised.
    pub fn is_active(&self, alert: Alert) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&alert)
    }
}

impl AlertSink for ActiveAlerts {
    fn raise(&self, alert: Alert) {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).insert(alert);
    }

    fn clear(&self, alert: Alert) {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).remove(&alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_alerts_raise_and_clear() {
        let alerts = ActiveAlerts::new();
        alerts.raise(Alert::LoginNeeded);
        alerts.raise(Alert::LoginNeeded);
        assert!(alerts.is_active(Alert::LoginNeeded));
        assert!(!alerts.is_active(Alert::ServerUnreachable));

        alerts.clear(Alert::LoginNeeded);
        alerts.clear(Alert::ServerUnreachable);
        assert!(!alerts.is_active(Alert::LoginNeeded));
    }
}
