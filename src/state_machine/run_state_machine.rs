use super::{
    errors::{invalid_transition, StateMachineResult},
    events::RunEvent,
    states::RunStatus,
};

/// Transition table for publication runs. Terminal runs accept no events.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStateMachine;

impl RunStateMachine {
    pub fn determine_target_state(
        &self,
        current: RunStatus,
        event: &RunEvent,
    ) -> StateMachineResult<RunStatus> {
        let target = match (current, event) {
            (RunStatus::Queued | RunStatus::Processing, RunEvent::StartProcessing) => {
                RunStatus::Processing
            }
            (RunStatus::Queued | RunStatus::Processing, RunEvent::Complete) => {
                RunStatus::Completed
            }
            (RunStatus::Queued | RunStatus::Processing, RunEvent::Fail(_)) => RunStatus::Failed,
            (from, _) => return Err(invalid_transition(from, event.event_type())),
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_run_transitions() {
        let sm = RunStateMachine;
        assert_eq!(
            sm.determine_target_state(RunStatus::Queued, &RunEvent::StartProcessing)
                .unwrap(),
            RunStatus::Processing
        );
        assert_eq!(
            sm.determine_target_state(RunStatus::Processing, &RunEvent::StartProcessing)
                .unwrap(),
            RunStatus::Processing
        );
        assert_eq!(
            sm.determine_target_state(RunStatus::Processing, &RunEvent::Complete)
                .unwrap(),
            RunStatus::Completed
        );
        assert_eq!(
            sm.determine_target_state(RunStatus::Queued, &RunEvent::Fail("bad".into()))
                .unwrap(),
            RunStatus::Failed
        );
    }

    #[test]
    fn test_terminal_runs_are_immutable() {
        let sm = RunStateMachine;
        for status in [RunStatus::Completed, RunStatus::Failed] {
            assert!(sm
                .determine_target_state(status, &RunEvent::StartProcessing)
                .is_err());
            assert!(sm.determine_target_state(status, &RunEvent::Complete).is_err());
        }
    }
}
