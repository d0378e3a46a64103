// State machine module for publication orchestration
//
// Pure transition tables for Runs and Steps. Persistence and locking live in
// the store and orchestration layers; nothing here performs I/O.

pub mod errors;
pub mod events;
pub mod run_state_machine;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{RunEvent, StepEvent};
pub use run_state_machine::RunStateMachine;
pub use states::{RunStatus, StepStatus};
pub use step_state_machine::{StepStateMachine, StepTransition};
