use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::error::PipelineWarning;
use super::step::StepFlow;
use crate::store::StoredData;

pub const ORGANIC_STATUS: &str = "Organic";
pub const STATUS_KEY: &str = "af_status";
pub const ACTIVE_MODE: &str = "Active";

/// Terminal decision of a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Outcome {
    Pending,
    GoToWeb(String),
    GoToMain,
    ShowPermission(String),
    Offline,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }

    /// The web destination, for outcomes that lead to one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Outcome::GoToWeb(url) | Outcome::ShowPermission(url) => Some(url),
            _ => None,
        }
    }
}

pub struct PipelineContext {
    // Step 1 results
    pub attribution: HashMap<String, String>,
    pub deeplink: HashMap<String, String>,
    pub resolved_url: Option<String>,
    pub resolved_mode: Option<String>,
    pub is_first_run: bool,
    pub perm_granted: bool,
    pub perm_blocked: bool,
    pub perm_date: Option<DateTime<Utc>>,

    // Set exactly once by the step that halts
    outcome: Outcome,

    permission_cooldown: Duration,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(Duration::days(3))
    }
}

impl PipelineContext {
    pub fn new(permission_cooldown: Duration) -> Self {
        Self {
            attribution: HashMap::new(),
            deeplink: HashMap::new(),
            resolved_url: None,
            resolved_mode: None,
            is_first_run: true,
            perm_granted: false,
            perm_blocked: false,
            perm_date: None,
            outcome: Outcome::Pending,
            permission_cooldown,
            warnings: Vec::new(),
        }
    }

    pub fn apply_stored(&mut self, data: StoredData) {
        self.attribution = data.attribution;
        self.deeplink = data.deeplink;
        self.resolved_url = data.url;
        self.resolved_mode = data.mode;
        self.is_first_run = data.is_first_run;
        self.perm_granted = data.perm_granted;
        self.perm_blocked = data.perm_blocked;
        self.perm_date = data.perm_date;
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn has_attribution(&self) -> bool {
        !self.attribution.is_empty()
    }

    pub fn is_organic(&self) -> bool {
        self.attribution.get(STATUS_KEY).map(String::as_str) == Some(ORGANIC_STATUS)
    }

    pub fn can_ask_permission(&self) -> bool {
        self.can_ask_permission_at(Utc::now())
    }

    pub fn can_ask_permission_at(&self, now: DateTime<Utc>) -> bool {
        if self.perm_granted || self.perm_blocked {
            return false;
        }
        match self.perm_date {
            Some(date) => now.signed_duration_since(date) >= self.permission_cooldown,
            None => true,
        }
    }

    /// The outcome for a known destination: prompt first when allowed.
    pub fn destination_outcome(&self, url: String) -> Outcome {
        if self.can_ask_permission() {
            Outcome::ShowPermission(url)
        } else {
            Outcome::GoToWeb(url)
        }
    }

    /// Records the terminal outcome and halts the chain. An outcome that is
    /// already set is never replaced.
    pub fn conclude(&mut self, outcome: Outcome) -> StepFlow {
        if self.outcome.is_terminal() {
            tracing::warn!(
                existing = ?self.outcome,
                rejected = ?outcome,
                "Outcome already set, keeping the first one"
            );
        } else {
            self.outcome = outcome;
        }
        StepFlow::Halt
    }
}
