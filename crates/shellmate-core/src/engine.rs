use serde::Serialize;

use super::actions::WorkflowAction;
use super::reducer::reduce;
use super::reducer::WorkflowEffect;
use super::sanitizer::is_runnable_command;
use super::state::EngineState;
use super::state::LastError;
use super::state::Stage;

/// Owned, read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    pub query: Option<String>,
    pub command: Option<String>,
    pub last_error: Option<LastError>,
    /// Oldest first.
    pub history: Vec<String>,
    pub can_execute: bool,
    pub can_explain: bool,
    pub busy: bool,
}

/// Single owner of the workflow state. All mutation goes through
/// [`WorkflowEngine::dispatch`].
#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    state: EngineState,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: impl Into<WorkflowAction>) -> Vec<WorkflowEffect> {
        reduce(&mut self.state, action.into())
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let workflow = &self.state.workflow;
        let actionable = !self.state.is_busy()
            && workflow.stage == Stage::Ready
            && workflow.command.as_deref().is_some_and(is_runnable_command);
        WorkflowSnapshot {
            stage: workflow.stage,
            query: workflow.query.clone(),
            command: workflow.command.clone(),
            last_error: workflow.last_error.clone(),
            history: self.state.history.list(),
            can_execute: actionable,
            can_explain: actionable,
            busy: self.state.is_busy(),
        }
    }
}
