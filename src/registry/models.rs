//! Registry entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque stable identifier for a monitored entity. Assigned once at
/// creation and never reused, even after removal.
pub type TargetId = u64;

/// Reachability status of a monitored entity.
///
/// Every entity starts out `Pending` and leaves it on the first recorded
/// probe outcome; it never becomes `Pending` again afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Up,
    Down,
}

/// Grouping for general targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Internal,
    External,
}

impl Classification {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Internal" => Some(Self::Internal),
            "External" => Some(Self::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal => write!(f, "Internal"),
            Self::External => write!(f, "External"),
        }
    }
}

/// Category for device entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Firewall,
    Switch,
}

impl DeviceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Firewall" => Some(Self::Firewall),
            "Switch" => Some(Self::Switch),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Firewall => write!(f, "Firewall"),
            Self::Switch => write!(f, "Switch"),
        }
    }
}

/// One recorded status transition.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub status: Status,
    pub observed_at: DateTime<Utc>,
}

/// A general monitored target (internal host, external host, DNS resolver).
#[derive(Debug, Clone, Serialize)]
pub struct MonitoredTarget {
    pub id: TargetId,
    pub address: String,
    pub label: Option<String>,
    pub classification: Classification,
    pub status: Status,
    pub last_successful_contact: Option<DateTime<Utc>>,
    /// Appended only on observed transitions, never on every poll.
    pub history: Vec<HistoryEntry>,
}

impl MonitoredTarget {
    pub fn new(
        id: TargetId,
        address: String,
        classification: Classification,
        label: Option<String>,
    ) -> Self {
        Self {
            id,
            address,
            label,
            classification,
            status: Status::Pending,
            last_successful_contact: None,
            history: Vec::new(),
        }
    }
}

/// A modeled network device. Unlike general targets a device always carries
/// a label and does not keep a transition history.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: TargetId,
    pub address: String,
    pub label: String,
    pub model: Option<String>,
    pub kind: DeviceKind,
    pub status: Status,
    pub last_successful_contact: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(
        id: TargetId,
        address: String,
        kind: DeviceKind,
        label: String,
        model: Option<String>,
    ) -> Self {
        Self {
            id,
            address,
            label,
            model,
            kind,
            status: Status::Pending,
            last_successful_contact: None,
        }
    }
}

/// Advisory notification emitted on every mutation attempt, consumed by the
/// presentation layer for transient toasts.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub message: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Error,
}

/// Per-pool status counts for the dashboard charts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub up: usize,
    pub down: usize,
    pub pending: usize,
}

impl StatusCounts {
    pub fn tally(statuses: impl Iterator<Item = Status>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                Status::Up => counts.up += 1,
                Status::Down => counts.down += 1,
                Status::Pending => counts.pending += 1,
            }
        }
        counts
    }

}
