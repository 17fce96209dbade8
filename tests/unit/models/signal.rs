//! Unit tests for the signal state machine

use equitrix::models::SignalStatus;

const ALL: [SignalStatus; 6] = [
    SignalStatus::Pending,
    SignalStatus::Approved,
    SignalStatus::Rejected,
    SignalStatus::Expired,
    SignalStatus::Executed,
    SignalStatus::Failed,
];

#[test]
fn test_pending_transitions() {
    assert!(SignalStatus::Pending.can_transition(SignalStatus::Approved));
    assert!(SignalStatus::Pending.can_transition(SignalStatus::Rejected));
    assert!(SignalStatus::Pending.can_transition(SignalStatus::Expired));
    assert!(!SignalStatus::Pending.can_transition(SignalStatus::Executed));
    assert!(!SignalStatus::Pending.can_transition(SignalStatus::Failed));
    assert!(!SignalStatus::Pending.can_transition(SignalStatus::Pending));
}

#[test]
fn test_approved_transitions() {
    assert!(SignalStatus::Approved.can_transition(SignalStatus::Executed));
    assert!(SignalStatus::Approved.can_transition(SignalStatus::Failed));
    assert!(!SignalStatus::Approved.can_transition(SignalStatus::Pending));
    assert!(!SignalStatus::Approved.can_transition(SignalStatus::Rejected));
    assert!(!SignalStatus::Approved.can_transition(SignalStatus::Expired));
}

#[test]
fn test_terminal_statuses_accept_no_transitions() {
    for from in ALL {
        if !from.is_terminal() {
            continue;
        }
        for to in ALL {
            assert!(
                !from.can_transition(to),
                "terminal {:?} must not transition to {:?}",
                from,
                to
            );
        }
    }
}

#[test]
fn test_active_statuses() {
    assert!(SignalStatus::Pending.is_active());
    assert!(SignalStatus::Approved.is_active());
    for status in [
        SignalStatus::Rejected,
        SignalStatus::Expired,
        SignalStatus::Executed,
        SignalStatus::Failed,
    ] {
        assert!(!status.is_active());
        assert!(status.is_terminal());
    }
}
