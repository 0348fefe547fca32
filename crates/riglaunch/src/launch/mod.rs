//! Runs the attribution pipeline once per launch and turns its result into a
//! single signal for the presentation layer.

pub mod orchestrator;

pub use orchestrator::LaunchOrchestrator;

use serde::Serialize;

use crate::pipeline::Outcome;

/// What the presentation layer should show right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum LaunchSignal {
    Pending,
    /// Connectivity dropped before an outcome was reached. Cleared when the
    /// connection returns.
    Offline,
    Resolved(Outcome),
}

impl LaunchSignal {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LaunchSignal::Resolved(_))
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            LaunchSignal::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// The user's answer to the notification permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allowed,
    Denied,
    /// Dismissed without deciding; asked again after the cooldown.
    Deferred,
}

impl PermissionDecision {
    /// Stored (granted, blocked) flags.
    pub fn flags(self) -> (bool, bool) {
        match self {
            PermissionDecision::Allowed => (true, false),
            PermissionDecision::Denied => (false, true),
            PermissionDecision::Deferred => (false, false),
        }
    }
}
