use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::WorkflowEffect;
pub(super) use super::QUICK_SCAN_PHRASE;
pub(super) use super::QUICK_SCAN_PLACEHOLDER;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::actions::WorkflowAction;
pub(super) use crate::profile::InstructionProfile;
pub(super) use crate::state::EngineState;
pub(super) use crate::state::ErrorKind;
pub(super) use crate::state::ExecutionOutcome;
pub(super) use crate::state::FailureKind;
pub(super) use crate::state::GatewayFailure;
pub(super) use crate::state::OperationKind;
pub(super) use crate::state::OutputLevel;
pub(super) use crate::state::Stage;

mod explain_execute;
mod history_selection;
mod invariants;
mod stale_operations;

fn state() -> EngineState {
    EngineState::new()
}

fn user(state: &mut EngineState, action: UserAction) -> Vec<WorkflowEffect> {
    let effects = reduce(state, WorkflowAction::User(action));
    assert_consistent(state);
    effects
}

fn run_runtime(state: &mut EngineState, action: RuntimeAction) {
    let effects = reduce(state, WorkflowAction::Runtime(action));
    assert!(effects.is_empty());
    assert_consistent(state);
}

/// Submits `query` and returns the op id of the generation effect.
fn submit(state: &mut EngineState, query: &str) -> u64 {
    let effects = user(state, UserAction::Submit(query.to_string()));
    match effects.as_slice() {
        [WorkflowEffect::Generate { op_id, .. }] => *op_id,
        other => panic!("expected a single generate effect, got {other:?}"),
    }
}

fn generate(state: &mut EngineState, query: &str, raw: &str) {
    let op_id = submit(state, query);
    run_runtime(
        state,
        RuntimeAction::GenerationFinished {
            op_id,
            response: Ok(raw.to_string()),
        },
    );
}

fn ready_with(state: &mut EngineState, command: &str) {
    user(state, UserAction::SelectFromHistory(command.to_string()));
    assert_eq!(state.workflow.stage, Stage::Ready);
}

fn last_output(state: &EngineState) -> (OutputLevel, String) {
    let entry = state.output.last().expect("output entry");
    (entry.level, entry.message.clone())
}

fn output_messages(state: &EngineState) -> Vec<String> {
    state
        .output
        .iter()
        .map(|entry| entry.message.clone())
        .collect()
}

fn assert_consistent(state: &EngineState) {
    assert_eq!(state.invariant_violation(), None, "state: {state:?}");
}
