//! Target registry: the authoritative owner of all monitored entity state.
//!
//! All mutation funnels through one lock, so entities are never written by
//! two writers at once. The poll scheduler feeds probe outcomes back in via
//! [`Registry::apply_outcome`], which keys strictly by id and silently
//! ignores ids that were removed while a probe was in flight.

mod models;
mod reconcile;

pub use models::*;
pub use reconcile::{apply_to_device, apply_to_target, reconcile, TransitionEvent};

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::probe::Outcome;

/// Registry error types.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid IP address format: {0}")]
    InvalidAddress(String),
    #[error("'{0}' already exists")]
    DuplicateAddress(String),
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("device name is required")]
    MissingLabel,
}

/// Dotted-quad check: four dot-separated groups of 1-3 digits.
///
/// Deliberately does NOT range-check octets, so "999.999.999.999" passes.
/// This reproduces the source system's validation gap; tightening it would
/// reject addresses the original accepted.
pub fn is_valid_address(address: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$").unwrap());
    re.is_match(address)
}

struct Inner {
    targets: Vec<MonitoredTarget>,
    devices: Vec<Device>,
}

/// The authoritative mapping of monitored entity -> current state.
pub struct Registry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
    events: broadcast::Sender<Notification>,
}

impl Registry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(Inner {
                targets: Vec::new(),
                devices: Vec::new(),
            }),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Subscribe to advisory add/remove notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    fn notify(&self, message: String, tone: Tone) {
        // Best-effort: nobody listening is fine.
        let _ = self.events.send(Notification { message, tone });
    }

    fn allocate_id(&self) -> TargetId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // --- General targets ---

    /// Add a general target. The address pool is shared across both
    /// classifications, so an address can exist only once regardless of
    /// Internal/External pairing.
    pub fn add_target(
        &self,
        address: &str,
        classification: Classification,
        label: Option<&str>,
    ) -> Result<TargetId, RegistryError> {
        if !is_valid_address(address) {
            self.notify(
                format!("Invalid IP address format: {}", address),
                Tone::Error,
            );
            return Err(RegistryError::InvalidAddress(address.to_string()));
        }

        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        let mut inner = self.inner.write().unwrap();
        if inner.targets.iter().any(|t| t.address == address) {
            drop(inner);
            self.notify(format!("'{}' already exists.", address), Tone::Error);
            return Err(RegistryError::DuplicateAddress(address.to_string()));
        }

        let id = self.allocate_id();
        inner.targets.push(MonitoredTarget::new(
            id,
            address.to_string(),
            classification,
            label,
        ));
        drop(inner);

        tracing::info!("Registry: added {} target {}", classification, address);
        self.notify(
            format!("{} target '{}' added successfully.", classification, address),
            Tone::Success,
        );
        Ok(id)
    }

    /// Remove the target matching both address and classification.
    ///
    /// Absent targets yield `NotFound` as a value, never a panic; a second
    /// remove of the same address is therefore a harmless no-op error.
    pub fn remove_target(
        &self,
        address: &str,
        classification: Classification,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.targets.len();
        inner
            .targets
            .retain(|t| !(t.address == address && t.classification == classification));
        let removed = inner.targets.len() < before;
        drop(inner);

        if removed {
            tracing::info!("Registry: removed {} target {}", classification, address);
            self.notify(
                format!(
                    "{} target '{}' removed successfully.",
                    classification, address
                ),
                Tone::Success,
            );
            Ok(())
        } else {
            self.notify(format!("'{}' not found.", address), Tone::Error);
            Err(RegistryError::NotFound(address.to_string()))
        }
    }

    /// Point-in-time snapshot of general targets, insertion order preserved.
    pub fn list_targets(&self, classification: Option<Classification>) -> Vec<MonitoredTarget> {
        let inner = self.inner.read().unwrap();
        inner
            .targets
            .iter()
            .filter(|t| classification.map_or(true, |c| t.classification == c))
            .cloned()
            .collect()
    }

    // --- Devices ---

    /// Add a device. The device pool has its own uniqueness scope,
    /// independent of the general target pool.
    pub fn add_device(
        &self,
        address: &str,
        kind: DeviceKind,
        label: &str,
        model: Option<&str>,
    ) -> Result<TargetId, RegistryError> {
        if !is_valid_address(address) {
            self.notify(
                format!("Invalid IP address format: {}", address),
                Tone::Error,
            );
            return Err(RegistryError::InvalidAddress(address.to_string()));
        }

        let label = label.trim();
        if label.is_empty() {
            self.notify("Device name is required.".to_string(), Tone::Error);
            return Err(RegistryError::MissingLabel);
        }
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let mut inner = self.inner.write().unwrap();
        if inner.devices.iter().any(|d| d.address == address) {
            drop(inner);
            self.notify(format!("'{}' already exists.", address), Tone::Error);
            return Err(RegistryError::DuplicateAddress(address.to_string()));
        }

        let id = self.allocate_id();
        inner.devices.push(Device::new(
            id,
            address.to_string(),
            kind,
            label.to_string(),
            model,
        ));
        drop(inner);

        tracing::info!("Registry: added {} device {} ({})", kind, label, address);
        self.notify(
            format!("{} '{}' added successfully.", kind, label),
            Tone::Success,
        );
        Ok(id)
    }

    pub fn remove_device(&self, address: &str, kind: DeviceKind) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.devices.len();
        inner
            .devices
            .retain(|d| !(d.address == address && d.kind == kind));
        let removed = inner.devices.len() < before;
        drop(inner);

        if removed {
            tracing::info!("Registry: removed {} device {}", kind, address);
            self.notify(
                format!("{} '{}' removed successfully.", kind, address),
                Tone::Success,
            );
            Ok(())
        } else {
            self.notify(format!("'{}' not found.", address), Tone::Error);
            Err(RegistryError::NotFound(address.to_string()))
        }
    }

    pub fn list_devices(&self, kind: Option<DeviceKind>) -> Vec<Device> {
        let inner = self.inner.read().unwrap();
        inner
            .devices
            .iter()
            .filter(|d| kind.map_or(true, |k| d.kind == k))
            .cloned()
            .collect()
    }

    // --- Poll cycle integration ---

    /// Atomic snapshot of every entity's (id, address) for one poll cycle.
    pub fn probe_snapshot(&self) -> Vec<(TargetId, String)> {
        let inner = self.inner.read().unwrap();
        inner
            .targets
            .iter()
            .map(|t| (t.id, t.address.clone()))
            .chain(inner.devices.iter().map(|d| (d.id, d.address.clone())))
            .collect()
    }

    /// Fold a probe outcome into the entity with the given id.
    ///
    /// Unknown ids (entity removed while its probe was in flight) are a
    /// silent no-op. Returns a transition event only when the status
    /// actually changed.
    pub fn apply_outcome(
        &self,
        id: TargetId,
        outcome: Outcome,
        observed_at: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        let mut inner = self.inner.write().unwrap();
        let event = if let Some(target) = inner.targets.iter_mut().find(|t| t.id == id) {
            apply_to_target(target, outcome, observed_at)
        } else if let Some(device) = inner.devices.iter_mut().find(|d| d.id == id) {
            apply_to_device(device, outcome, observed_at)
        } else {
            None
        };
        drop(inner);

        if let Some(ref ev) = event {
            tracing::info!(
                "Registry: {} went {:?} -> {:?}",
                ev.address,
                ev.from,
                ev.to
            );
        }
        event
    }

    /// Status counts per pool for the dashboard charts.
    pub fn summary(&self) -> RegistrySummary {
        let inner = self.inner.read().unwrap();
        RegistrySummary {
            internal: StatusCounts::tally(
                inner
                    .targets
                    .iter()
                    .filter(|t| t.classification == Classification::Internal)
                    .map(|t| t.status),
            ),
            external: StatusCounts::tally(
                inner
                    .targets
                    .iter()
                    .filter(|t| t.classification == Classification::External)
                    .map(|t| t.status),
            ),
            devices: StatusCounts::tally(inner.devices.iter().map(|d| d.status)),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RegistrySummary {
    pub internal: StatusCounts,
    pub external: StatusCounts,
    pub devices: StatusCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_validation_accepts_dotted_quads() {
        assert!(is_valid_address("192.168.1.1"));
        assert!(is_valid_address("1.1.1.1"));
        assert!(is_valid_address("208.67.222.222"));
        // Known gap: octet range is not enforced.
        assert!(is_valid_address("999.999.999.999"));
    }

    #[test]
    fn address_validation_rejects_malformed_literals() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("192.168.1"));
        assert!(!is_valid_address("192.168.1.1.1"));
        assert!(!is_valid_address("1234.1.1.1"));
        assert!(!is_valid_address("a.b.c.d"));
        assert!(!is_valid_address("192.168.1.1 "));
        assert!(!is_valid_address("example.com"));
    }

    #[test]
    fn add_starts_pending_with_empty_history() {
        let registry = Registry::new();
        let id = registry
            .add_target("192.168.1.1", Classification::Internal, None)
            .unwrap();

        let targets = registry.list_targets(Some(Classification::Internal));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, id);
        assert_eq!(targets[0].status, Status::Pending);
        assert!(targets[0].history.is_empty());
        assert!(targets[0].last_successful_contact.is_none());
        assert!(targets[0].label.is_none());
    }

    #[test]
    fn add_rejects_invalid_address_without_partial_insert() {
        let registry = Registry::new();
        let err = registry
            .add_target("not-an-ip", Classification::Internal, None)
            .unwrap_err();
        assert_eq!(err, RegistryError::InvalidAddress("not-an-ip".to_string()));
        assert!(registry.list_targets(None).is_empty());
    }

    #[test]
    fn duplicate_address_rejected_across_classifications() {
        let registry = Registry::new();
        registry
            .add_target("1.1.1.1", Classification::External, Some("Cloudflare DNS"))
            .unwrap();

        let err = registry
            .add_target("1.1.1.1", Classification::Internal, None)
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAddress("1.1.1.1".to_string()));
        assert_eq!(registry.list_targets(None).len(), 1);
    }

    #[test]
    fn ids_are_unique_and_never_reused() {
        let registry = Registry::new();
        let first = registry
            .add_target("10.0.0.1", Classification::Internal, None)
            .unwrap();
        registry
            .remove_target("10.0.0.1", Classification::Internal)
            .unwrap();
        let second = registry
            .add_target("10.0.0.1", Classification::Internal, None)
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn remove_twice_is_a_noop_not_a_fault() {
        let registry = Registry::new();
        registry
            .add_target("10.0.0.5", Classification::Internal, None)
            .unwrap();

        assert!(registry
            .remove_target("10.0.0.5", Classification::Internal)
            .is_ok());
        let err = registry
            .remove_target("10.0.0.5", Classification::Internal)
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound("10.0.0.5".to_string()));
        assert!(registry.list_targets(None).is_empty());
    }

    #[test]
    fn remove_requires_matching_classification() {
        let registry = Registry::new();
        registry
            .add_target("10.0.0.5", Classification::Internal, None)
            .unwrap();

        assert!(registry
            .remove_target("10.0.0.5", Classification::External)
            .is_err());
        assert_eq!(registry.list_targets(None).len(), 1);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let registry = Registry::new();
        for address in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            registry
                .add_target(address, Classification::Internal, None)
                .unwrap();
        }
        let addresses: Vec<_> = registry
            .list_targets(None)
            .into_iter()
            .map(|t| t.address)
            .collect();
        assert_eq!(addresses, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn labels_are_trimmed_and_blank_means_unlabeled() {
        let registry = Registry::new();
        registry
            .add_target("1.1.1.1", Classification::External, Some("  Cloudflare DNS  "))
            .unwrap();
        registry
            .add_target("8.8.8.8", Classification::External, Some("   "))
            .unwrap();

        let targets = registry.list_targets(Some(Classification::External));
        assert_eq!(targets[0].label.as_deref(), Some("Cloudflare DNS"));
        assert!(targets[1].label.is_none());
    }

    #[test]
    fn apply_outcome_reachable_sets_up_and_last_contact() {
        let registry = Registry::new();
        let id = registry
            .add_target("1.1.1.1", Classification::External, Some("Cloudflare DNS"))
            .unwrap();
        let now = Utc::now();

        let event = registry
            .apply_outcome(id, Outcome::Reachable, now)
            .expect("transition");
        assert_eq!(event.to, Status::Up);

        let target = &registry.list_targets(None)[0];
        assert_eq!(target.status, Status::Up);
        assert_eq!(target.last_successful_contact, Some(now));
        assert_eq!(target.history.len(), 1);
    }

    #[test]
    fn apply_outcome_for_unknown_id_is_silent() {
        let registry = Registry::new();
        let id = registry
            .add_target("10.0.0.5", Classification::Internal, None)
            .unwrap();
        registry
            .remove_target("10.0.0.5", Classification::Internal)
            .unwrap();

        // The probe was in flight when the target was removed.
        assert!(registry
            .apply_outcome(id, Outcome::Reachable, Utc::now())
            .is_none());
        assert!(registry.list_targets(None).is_empty());
    }

    #[test]
    fn device_pool_uniqueness_is_independent() {
        let registry = Registry::new();
        registry
            .add_target("192.168.1.254", Classification::Internal, None)
            .unwrap();

        // Same address is fine in the device pool...
        registry
            .add_device("192.168.1.254", DeviceKind::Firewall, "Edge FW", Some("PA-220"))
            .unwrap();
        // ...but not twice within it.
        let err = registry
            .add_device("192.168.1.254", DeviceKind::Switch, "Core Switch", None)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateAddress("192.168.1.254".to_string())
        );
    }

    #[test]
    fn device_requires_a_label() {
        let registry = Registry::new();
        assert!(registry
            .add_device("192.168.1.254", DeviceKind::Firewall, "   ", None)
            .is_err());
        assert!(registry.list_devices(None).is_empty());
    }

    #[test]
    fn probe_snapshot_covers_both_pools() {
        let registry = Registry::new();
        registry
            .add_target("10.0.0.5", Classification::Internal, None)
            .unwrap();
        registry
            .add_device("192.168.1.254", DeviceKind::Firewall, "Edge FW", None)
            .unwrap();

        let snapshot = registry.probe_snapshot();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn summary_tallies_per_pool() {
        let registry = Registry::new();
        let up = registry
            .add_target("10.0.0.1", Classification::Internal, None)
            .unwrap();
        registry
            .add_target("10.0.0.2", Classification::Internal, None)
            .unwrap();
        registry
            .add_target("1.1.1.1", Classification::External, None)
            .unwrap();
        registry.apply_outcome(up, Outcome::Reachable, Utc::now());

        let summary = registry.summary();
        assert_eq!(summary.internal.up, 1);
        assert_eq!(summary.internal.pending, 1);
        assert_eq!(summary.external.pending, 1);
        assert_eq!(summary.devices.up, 0);
        assert_eq!(summary.devices.down, 0);
        assert_eq!(summary.devices.pending, 0);
    }

    #[test]
    fn mutations_emit_notifications() {
        let registry = Registry::new();
        let mut rx = registry.subscribe();

        registry
            .add_target("10.0.0.5", Classification::Internal, None)
            .unwrap();
        let ok = rx.try_recv().unwrap();
        assert_eq!(ok.tone, Tone::Success);

        let _ = registry.add_target("10.0.0.5", Classification::Internal, None);
        let dup = rx.try_recv().unwrap();
        assert_eq!(dup.tone, Tone::Error);
    }
}
