use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::models::ContestStatus;

/// In-process view of a contest during finalization.
///
/// `Closing` and `Failed` only exist inside a finalize call; storage only
/// ever sees `open` or `closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Open,
    Closing,
    Closed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("contest {contest_id} cannot move from {from:?} to {to:?}")]
pub struct TransitionError {
    pub contest_id: Uuid,
    pub from: LifecyclePhase,
    pub to: LifecyclePhase,
}

#[derive(Debug, Clone)]
pub struct ContestLifecycle {
    contest_id: Uuid,
    phase: LifecyclePhase,
}

impl ContestLifecycle {
    pub fn from_status(contest_id: Uuid, status: ContestStatus) -> Self {
        let phase = match status {
            ContestStatus::Open => LifecyclePhase::Open,
            ContestStatus::Closed => LifecyclePhase::Closed,
        };
        Self { contest_id, phase }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Open -> Closing. Anything else is a conflict and leaves the phase as is.
    pub fn begin_closing(&mut self) -> Result<(), TransitionError> {
        self.transition(LifecyclePhase::Open, LifecyclePhase::Closing)
    }

    /// Closing -> Closed, once every write has been committed
    pub fn complete(&mut self) -> Result<ContestStatus, TransitionError> {
        self.transition(LifecyclePhase::Closing, LifecyclePhase::Closed)?;
        Ok(ContestStatus::Closed)
    }

    /// Closing -> Failed. The stored status is still `open`.
    pub fn fail(&mut self) -> Result<ContestStatus, TransitionError> {
        self.transition(LifecyclePhase::Closing, LifecyclePhase::Failed)?;
        Ok(self.persisted_status())
    }

    /// Status as observed from outside the finalize call
    pub fn persisted_status(&self) -> ContestStatus {
        match self.phase {
            LifecyclePhase::Closed => ContestStatus::Closed,
            LifecyclePhase::Open | LifecyclePhase::Closing | LifecyclePhase::Failed => {
                ContestStatus::Open
            }
        }
    }

    fn transition(
        &mut self,
        from: LifecyclePhase,
        to: LifecyclePhase,
    ) -> Result<(), TransitionError> {
        if self.phase != from {
            return Err(TransitionError {
                contest_id: self.contest_id,
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a finalization for contest {0} is already in progress")]
pub struct AlreadyInFlight(pub Uuid);

/// Contests currently being finalized by this process.
#[derive(Debug, Clone, Default)]
pub struct InFlightContests {
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightContests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `contest_id` until the returned guard is dropped
    pub fn try_acquire(&self, contest_id: Uuid) -> Result<InFlightGuard, AlreadyInFlight> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(contest_id) {
            return Err(AlreadyInFlight(contest_id));
        }
        Ok(InFlightGuard {
            contest_id,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_in_flight(&self, contest_id: Uuid) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&contest_id)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    contest_id: Uuid,
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.contest_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_close() {
        let mut lifecycle = ContestLifecycle::from_status(Uuid::new_v4(), ContestStatus::Open);
        lifecycle.begin_closing().unwrap();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Closing);
        assert_eq!(lifecycle.persisted_status(), ContestStatus::Open);
        assert_eq!(lifecycle.complete().unwrap(), ContestStatus::Closed);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Closed);
    }

    #[test]
    fn test_failed_close_reports_open() {
        let mut lifecycle = ContestLifecycle::from_status(Uuid::new_v4(), ContestStatus::Open);
        lifecycle.begin_closing().unwrap();
        assert_eq!(lifecycle.fail().unwrap(), ContestStatus::Open);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Failed);
    }

    #[test]
    fn test_closed_contest_cannot_begin_closing() {
        let mut lifecycle = ContestLifecycle::from_status(Uuid::new_v4(), ContestStatus::Closed);
        let err = lifecycle.begin_closing().unwrap_err();
        assert_eq!(err.from, LifecyclePhase::Closed);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Closed);
    }

    #[test]
    fn test_complete_requires_closing() {
        let mut lifecycle = ContestLifecycle::from_status(Uuid::new_v4(), ContestStatus::Open);
        assert!(lifecycle.complete().is_err());
        assert!(lifecycle.fail().is_err());
        assert_eq!(lifecycle.phase(), LifecyclePhase::Open);
    }

    #[test]
    fn test_in_flight_guard_is_exclusive_per_contest() {
        let registry = InFlightContests::new();
        let contest = Uuid::new_v4();
        let other = Uuid::new_v4();

        let guard = registry.try_acquire(contest).unwrap();
        assert_eq!(registry.try_acquire(contest).unwrap_err(), AlreadyInFlight(contest));
        let _other_guard = registry.try_acquire(other).unwrap();

        drop(guard);
        assert!(!registry.is_in_flight(contest));
        assert!(registry.try_acquire(contest).is_ok());
    }
}
