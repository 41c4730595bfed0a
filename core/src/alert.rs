//! Single-slot notification surface.
//!
//! Every component reports its outcome here. There is no queue: a new alert
//! replaces whatever is currently visible.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertChannel {
    slot: Arc<RwLock<Option<Alert>>>,
}

impl AlertChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the visible alert.
    pub fn show(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Error => log::error!("❌ {message}"),
            Severity::Warning => log::warn!("⚠️ {message}"),
            Severity::Info => log::info!("ℹ️ {message}"),
            Severity::Success => log::info!("✅ {message}"),
        }
        *self.slot.write() = Some(Alert { message, severity, raised_at: Utc::now() });
    }

    pub fn hide(&self) {
        self.slot.write().take();
    }

    pub fn current(&self) -> Option<Alert> {
        self.slot.read().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.slot.read().is_some()
    }
}
