use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a target takes part in probing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    #[default]
    Enabled,
    Disabled,
}

impl TargetMode {
    pub fn is_enabled(self) -> bool {
        self == TargetMode::Enabled
    }

    pub fn toggled(self) -> Self {
        match self {
            TargetMode::Enabled => TargetMode::Disabled,
            TargetMode::Disabled => TargetMode::Enabled,
        }
    }
}

impl std::fmt::Display for TargetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetMode::Enabled => write!(f, "enabled"),
            TargetMode::Disabled => write!(f, "disabled"),
        }
    }
}

/// One monitored HTTP(S) endpoint as configured by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Display label
    pub name: String,

    /// Health-check endpoint; validated lazily at probe time
    pub url: String,

    /// Disabled targets stay visible but are excluded from probing
    /// and from the aggregate up-count
    #[serde(default)]
    pub mode: TargetMode,
}

/// Runtime view of a target, owned exclusively by the engine
#[derive(Debug, Clone, Default)]
pub struct TargetStatus {
    /// Last known health result; false until the first probe completes
    pub is_up: bool,

    /// Diagnostic from the most recent failed probe; a successful probe
    /// clears it
    pub last_error: Option<String>,

    /// When the most recent probe result was applied
    pub last_checked: Option<DateTime<Utc>>,
}

/// Outcome of a single probe
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub ok: bool,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn up() -> Self {
        Self { ok: true, error: None }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self { ok: false, error: Some(error.into()) }
    }
}

/// Immutable copy of one target's configuration and current status
#[derive(Debug, Clone)]
pub struct TargetView {
    pub name: String,
    pub url: String,
    pub mode: TargetMode,
    pub is_up: bool,
    pub last_error: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
}

/// Full engine state as published to observers. Snapshots are copies;
/// observers never hold references into live state.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Targets in configuration order (insertion order is display order)
    pub targets: Vec<TargetView>,

    /// Enabled targets whose most recent probe was healthy
    pub up_count: usize,

    /// When false no probing occurs and every target displays as disabled
    pub monitoring_enabled: bool,

    /// Last configuration load error; while set the target list is empty
    pub config_error: Option<String>,

    /// Effective polling interval in seconds, always within [1, 60]
    pub interval_secs: u64,

    /// Remaining burst time when the startup watch is active
    pub startup_watch_remaining_secs: Option<u64>,

    pub symbol_up: String,
    pub symbol_down: String,
    pub symbol_disabled: String,
}

/// Events published on the engine bus
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Target list, per-target statuses, or the aggregate up-count changed
    Targets(StatusSnapshot),

    /// Configuration error surfaced or cleared
    ConfigError(Option<String>),

    /// Startup watch entered, ticked, or ended
    StartupWatch { active: bool, remaining_secs: Option<u64> },

    /// Polling interval changed (already clamped)
    IntervalChanged(u64),
}
