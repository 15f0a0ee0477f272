//! The automation gate.
//!
//! One boolean, read on every request and flipped by configuration reloads.
//! This is the only place the enable flag is enforced; library
//! implementations never re-check it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared enable/disable switch for the whole automation API.
#[derive(Debug, Clone, Default)]
pub struct AutomationGate {
    enabled: Arc<AtomicBool>,
}

impl AutomationGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Set the flag, returning the previous value.
    pub fn set(&self, enabled: bool) -> bool {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::info!(enabled, "Automation gate changed");
        }
        previous
    }
}
