use super::{
    errors::{invalid_transition, StateMachineError, StateMachineResult},
    events::StepEvent,
    states::StepStatus,
};

/// Outcome of applying a [`StepEvent`] to a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTransition {
    pub from: StepStatus,
    pub to: StepStatus,
    /// Retry count after the transition
    pub retry_count: i32,
    /// The retry budget is spent; the owning run must fail
    pub exhausted: bool,
}

impl StepTransition {
    /// The step goes back to `pending` for verbatim redelivery
    pub fn is_requeue(&self) -> bool {
        self.from == StepStatus::Pending && self.to == StepStatus::Pending
    }
}

/// Bounded-retry transition table for steps.
///
/// Each reported failure or timeout increments `retry_count`. Below the
/// ceiling the step returns to `pending`; reaching it makes the step
/// terminal (`failed` for reports, `timeout` for sweeps).
#[derive(Debug, Clone, Copy)]
pub struct StepStateMachine {
    max_retries: i32,
}

impl StepStateMachine {
    /// Create a new step state machine with the given retry ceiling
    pub fn new(max_retries: i32) -> StateMachineResult<Self> {
        if max_retries < 1 {
            return Err(StateMachineError::InvalidRetryLimit(max_retries));
        }
        Ok(Self { max_retries })
    }

    pub fn max_retries(&self) -> i32 {
        self.max_retries
    }

    /// Determine the transition for `event` given the step's current state
    pub fn determine_transition(
        &self,
        current: StepStatus,
        retry_count: i32,
        event: &StepEvent,
    ) -> StateMachineResult<StepTransition> {
        if current.is_terminal() {
            return Err(invalid_transition(current, event.event_type()));
        }

        let transition = match event {
            StepEvent::Succeed(_) => StepTransition {
                from: current,
                to: StepStatus::Success,
                retry_count,
                exhausted: false,
            },
            StepEvent::Fail(_) | StepEvent::TimeOut(_) => {
                let retry_count = retry_count.saturating_add(1).min(self.max_retries);
                let exhausted = retry_count >= self.max_retries;
                let to = match (exhausted, event) {
                    (false, _) => StepStatus::Pending,
                    (true, StepEvent::TimeOut(_)) => StepStatus::Timeout,
                    (true, _) => StepStatus::Failed,
                };
                StepTransition {
                    from: current,
                    to,
                    retry_count,
                    exhausted,
                }
            }
        };

        Ok(transition)
    }
}
