use super::*;
use pretty_assertions::assert_eq;

#[test]
fn completion_with_unknown_op_id_is_ignored() {
    let mut state = state();
    let op_id = submit(&mut state, "list files");

    run_runtime(
        &mut state,
        RuntimeAction::GenerationFinished {
            op_id: op_id + 10,
            response: Ok("rm -rf /".to_string()),
        },
    );
    assert_eq!(state.workflow.stage, Stage::Generating);
    assert_eq!(state.workflow.command, None);
    assert!(state.history.is_empty());
}

#[test]
fn completion_of_wrong_kind_is_ignored() {
    let mut state = state();
    ready_with(&mut state, "ls");
    let effects = user(&mut state, UserAction::Execute);
    let op_id = effects[0].op_id().expect("op id");

    run_runtime(
        &mut state,
        RuntimeAction::ExplanationFinished {
            op_id,
            response: Ok("not for you".to_string()),
        },
    );
    assert_eq!(state.workflow.stage, Stage::Executing);
    assert_eq!(state.in_flight.map(|op| op.kind), Some(OperationKind::Execution));
}

#[test]
fn clear_during_generation_drops_late_result() {
    let mut state = state();
    let op_id = submit(&mut state, "list files");
    user(&mut state, UserAction::Clear);
    assert_eq!(state.workflow.stage, Stage::Idle);
    assert!(state.is_busy());

    let effects = user(&mut state, UserAction::Submit("show date".to_string()));
    assert!(effects.is_empty());

    run_runtime(
        &mut state,
        RuntimeAction::GenerationFinished {
            op_id,
            response: Ok("ls".to_string()),
        },
    );
    assert_eq!(state.workflow.stage, Stage::Idle);
    assert_eq!(state.workflow.command, None);
    assert!(state.history.is_empty());
    assert!(!state.is_busy());

    assert_eq!(submit(&mut state, "show date"), op_id + 1);
}

#[test]
fn duplicate_completion_is_applied_once() {
    let mut state = state();
    ready_with(&mut state, "echo hi");
    let effects = user(&mut state, UserAction::Execute);
    let op_id = effects[0].op_id().expect("op id");
    let outcome = ExecutionOutcome::Completed {
        stdout: "hi".to_string(),
        stderr: String::new(),
        exit_code: Some(0),
    };

    run_runtime(
        &mut state,
        RuntimeAction::ExecutionFinished {
            op_id,
            outcome: outcome.clone(),
        },
    );
    let after_first = state.output.len();
    run_runtime(&mut state, RuntimeAction::ExecutionFinished { op_id, outcome });
    assert_eq!(state.output.len(), after_first);
}
