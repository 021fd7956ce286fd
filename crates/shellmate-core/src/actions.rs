use super::state::ExecutionOutcome;
use super::state::GatewayFailure;

#[derive(Debug, Clone)]
pub enum WorkflowAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

/// Events sent by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Submit(String),
    SelectFromHistory(String),
    Explain,
    Execute,
    Copy,
    QuickScan,
    Clear,
}

/// Completions posted back by workers. `op_id` echoes the dispatching effect.
#[derive(Debug, Clone)]
pub enum RuntimeAction {
    GenerationFinished {
        op_id: u64,
        response: Result<String, GatewayFailure>,
    },
    ExplanationFinished {
        op_id: u64,
        response: Result<String, GatewayFailure>,
    },
    ExecutionFinished {
        op_id: u64,
        outcome: ExecutionOutcome,
    },
    /// Outcome of a clipboard write; not an in-flight operation.
    CopyFinished {
        result: Result<(), String>,
    },
}

impl From<UserAction> for WorkflowAction {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}

impl From<RuntimeAction> for WorkflowAction {
    fn from(action: RuntimeAction) -> Self {
        Self::Runtime(action)
    }
}
