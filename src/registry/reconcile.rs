//! Status reconciliation.
//!
//! Pure folding of a probe outcome into an entity's status. The registry is
//! the only caller; keeping the transformation free of locking makes the
//! transition rules directly testable.

use chrono::{DateTime, Utc};

use super::models::{Device, HistoryEntry, MonitoredTarget, Status, TargetId};
use crate::probe::Outcome;

/// A recorded status change, produced only when the new status differs from
/// the previous one.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransitionEvent {
    pub id: TargetId,
    pub address: String,
    pub from: Status,
    pub to: Status,
    pub at: DateTime<Utc>,
}

/// Map a probe outcome onto the current status.
///
/// Returns the new status and whether a transition occurred. The first
/// outcome always transitions (Pending is never an outcome's result).
pub fn reconcile(current: Status, outcome: Outcome) -> (Status, bool) {
    let new_status = match outcome {
        Outcome::Reachable => Status::Up,
        Outcome::Unreachable => Status::Down,
    };
    (new_status, new_status != current)
}

/// Fold an outcome into a general target, appending to its history on
/// transition.
pub fn apply_to_target(
    target: &mut MonitoredTarget,
    outcome: Outcome,
    observed_at: DateTime<Utc>,
) -> Option<TransitionEvent> {
    let (new_status, transitioned) = reconcile(target.status, outcome);
    let previous = target.status;

    target.status = new_status;
    if outcome == Outcome::Reachable {
        target.last_successful_contact = Some(observed_at);
    }

    if !transitioned {
        return None;
    }

    target.history.push(HistoryEntry {
        status: new_status,
        observed_at,
    });

    Some(TransitionEvent {
        id: target.id,
        address: target.address.clone(),
        from: previous,
        to: new_status,
        at: observed_at,
    })
}

/// Fold an outcome into a device. Devices keep no history.
pub fn apply_to_device(
    device: &mut Device,
    outcome: Outcome,
    observed_at: DateTime<Utc>,
) -> Option<TransitionEvent> {
    let (new_status, transitioned) = reconcile(device.status, outcome);
    let previous = device.status;

    device.status = new_status;
    if outcome == Outcome::Reachable {
        device.last_successful_contact = Some(observed_at);
    }

    if !transitioned {
        return None;
    }

    Some(TransitionEvent {
        id: device.id,
        address: device.address.clone(),
        from: previous,
        to: new_status,
        at: observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::models::Classification;

    fn target() -> MonitoredTarget {
        MonitoredTarget::new(1, "10.0.0.5".to_string(), Classification::Internal, None)
    }

    #[test]
    fn reachable_always_yields_up() {
        for current in [Status::Pending, Status::Up, Status::Down] {
            let (status, _) = reconcile(current, Outcome::Reachable);
            assert_eq!(status, Status::Up);
        }
    }

    #[test]
    fn unreachable_always_yields_down() {
        for current in [Status::Pending, Status::Up, Status::Down] {
            let (status, _) = reconcile(current, Outcome::Unreachable);
            assert_eq!(status, Status::Down);
        }
    }

    #[test]
    fn first_outcome_transitions_out_of_pending() {
        assert!(reconcile(Status::Pending, Outcome::Reachable).1);
        assert!(reconcile(Status::Pending, Outcome::Unreachable).1);
    }

    #[test]
    fn repeated_outcome_does_not_transition() {
        assert!(!reconcile(Status::Up, Outcome::Reachable).1);
        assert!(!reconcile(Status::Down, Outcome::Unreachable).1);
    }

    #[test]
    fn reachable_updates_last_contact_and_history() {
        let mut t = target();
        let now = Utc::now();

        let event = apply_to_target(&mut t, Outcome::Reachable, now).expect("transition");
        assert_eq!(event.from, Status::Pending);
        assert_eq!(event.to, Status::Up);
        assert_eq!(t.status, Status::Up);
        assert_eq!(t.last_successful_contact, Some(now));
        assert_eq!(t.history.len(), 1);
        assert_eq!(t.history[0].status, Status::Up);
    }

    #[test]
    fn unreachable_leaves_last_contact_unchanged() {
        let mut t = target();
        let first = Utc::now();
        apply_to_target(&mut t, Outcome::Reachable, first);

        let later = first + chrono::Duration::seconds(5);
        let event = apply_to_target(&mut t, Outcome::Unreachable, later).expect("transition");
        assert_eq!(event.to, Status::Down);
        assert_eq!(t.last_successful_contact, Some(first));
        assert_eq!(t.history.len(), 2);
    }

    #[test]
    fn repeated_outcome_appends_nothing() {
        let mut t = target();
        let now = Utc::now();
        apply_to_target(&mut t, Outcome::Unreachable, now);
        assert_eq!(t.history.len(), 1);

        let again = now + chrono::Duration::seconds(5);
        assert!(apply_to_target(&mut t, Outcome::Unreachable, again).is_none());
        assert_eq!(t.history.len(), 1);
    }

    #[test]
    fn repeated_reachable_still_refreshes_last_contact() {
        let mut t = target();
        let first = Utc::now();
        apply_to_target(&mut t, Outcome::Reachable, first);

        let later = first + chrono::Duration::seconds(30);
        assert!(apply_to_target(&mut t, Outcome::Reachable, later).is_none());
        assert_eq!(t.last_successful_contact, Some(later));
    }

    #[test]
    fn device_transitions_without_history() {
        let mut d = Device::new(
            7,
            "192.168.1.254".to_string(),
            crate::registry::models::DeviceKind::Firewall,
            "Edge Firewall".to_string(),
            None,
        );
        let now = Utc::now();

        let event = apply_to_device(&mut d, Outcome::Reachable, now).expect("transition");
        assert_eq!(event.to, Status::Up);
        assert_eq!(d.status, Status::Up);
        assert_eq!(d.last_successful_contact, Some(now));

        assert!(apply_to_device(&mut d, Outcome::Reachable, now).is_none());
    }
}
