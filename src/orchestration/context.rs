//! Shared dependencies of the orchestration components.

use std::sync::Arc;

use crate::config::ExecutionConfig;
use crate::error::OrchestratorResult;
use crate::events::EventPublisher;
use crate::executor::{ExecutorLink, NoopExecutorLink};
use crate::orchestration::run_locks::RunLocks;
use crate::orchestration::step_generator::StepGenerator;
use crate::providers::ProductCatalog;
use crate::state_machine::{RunStateMachine, StepStateMachine};
use crate::store::PublicationStore;

pub struct OrchestrationContext {
    pub store: Arc<dyn PublicationStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub generator: StepGenerator,
    pub step_machine: StepStateMachine,
    pub run_machine: RunStateMachine,
    pub locks: RunLocks,
    pub events: EventPublisher,
    pub executor_link: Arc<dyn ExecutorLink>,
    pub execution: ExecutionConfig,
}

impl std::fmt::Debug for OrchestrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationContext")
            .field("generator", &self.generator)
            .field("execution", &self.execution)
            .field("executor_link", &self.executor_link)
            .field("held_locks", &self.locks.len())
            .finish()
    }
}

impl OrchestrationContext {
    pub fn new(
        store: Arc<dyn PublicationStore>,
        catalog: Arc<dyn ProductCatalog>,
        generator: StepGenerator,
        execution: ExecutionConfig,
    ) -> OrchestratorResult<Self> {
        Ok(Self {
            store,
            catalog,
            generator,
            step_machine: StepStateMachine::new(execution.max_retries)?,
            run_machine: RunStateMachine,
            locks: RunLocks::new(),
            events: EventPublisher::default(),
            executor_link: Arc::new(NoopExecutorLink),
            execution,
        })
    }

    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn with_executor_link(mut self, link: Arc<dyn ExecutorLink>) -> Self {
        self.executor_link = link;
        self
    }

    pub fn max_retries(&self) -> i32 {
        self.step_machine.max_retries()
    }
}
