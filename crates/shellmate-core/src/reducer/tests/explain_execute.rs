use super::*;
use pretty_assertions::assert_eq;

fn explain_op(state: &mut EngineState) -> u64 {
    match user(state, UserAction::Explain).as_slice() {
        [WorkflowEffect::Explain {
            op_id,
            prompt,
            profile,
        }] => {
            assert_eq!(*profile, InstructionProfile::CommandExplanation);
            assert_eq!(Some(prompt.as_str()), state.workflow.command.as_deref());
            *op_id
        }
        other => panic!("expected explain effect, got {other:?}"),
    }
}

fn execute_op(state: &mut EngineState) -> u64 {
    match user(state, UserAction::Execute).as_slice() {
        [WorkflowEffect::RunCommand { op_id, command }] => {
            assert_eq!(Some(command.as_str()), state.workflow.command.as_deref());
            *op_id
        }
        other => panic!("expected run effect, got {other:?}"),
    }
}

#[test]
fn explanation_is_surfaced_and_command_kept() {
    let mut state = state();
    ready_with(&mut state, "find . -name '*.py' | wc -l");
    let op_id = explain_op(&mut state);
    assert_eq!(state.workflow.stage, Stage::Explaining);

    run_runtime(
        &mut state,
        RuntimeAction::ExplanationFinished {
            op_id,
            response: Ok("Summary: counts python files.".to_string()),
        },
    );

    assert_eq!(state.workflow.stage, Stage::Ready);
    assert_eq!(
        state.workflow.command.as_deref(),
        Some("find . -name '*.py' | wc -l")
    );
    let messages = output_messages(&state);
    assert_eq!(
        messages[messages.len() - 3..].to_vec(),
        vec![
            "--- AI EXPLANATION ---".to_string(),
            "Summary: counts python files.".to_string(),
            "--- END OF EXPLANATION ---".to_string(),
        ]
    );
    assert!(state.history.is_empty());
}

#[test]
fn failed_explanation_returns_to_ready() {
    let mut state = state();
    ready_with(&mut state, "ls");
    let op_id = explain_op(&mut state);
    run_runtime(
        &mut state,
        RuntimeAction::ExplanationFinished {
            op_id,
            response: Err(GatewayFailure::new(FailureKind::Network, "timed out")),
        },
    );

    assert_eq!(state.workflow.stage, Stage::Ready);
    assert_eq!(state.workflow.last_error, None);
    let (level, message) = last_output(&state);
    assert_eq!(level, OutputLevel::Error);
    assert!(message.starts_with("Error explaining command:"));
}

#[test]
fn execution_output_is_framed_and_stage_returns_to_ready() {
    let mut state = state();
    ready_with(&mut state, "ls missing; echo done");
    let op_id = execute_op(&mut state);
    assert_eq!(state.workflow.stage, Stage::Executing);
    assert_eq!(
        last_output(&state).1,
        "Executing: ls missing; echo done".to_string()
    );

    run_runtime(
        &mut state,
        RuntimeAction::ExecutionFinished {
            op_id,
            outcome: ExecutionOutcome::Completed {
                stdout: "done\n".to_string(),
                stderr: "ls: missing: No such file\n".to_string(),
                exit_code: Some(2),
            },
        },
    );

    assert_eq!(state.workflow.stage, Stage::Ready);
    let messages = output_messages(&state);
    assert_eq!(
        messages[messages.len() - 7..].to_vec(),
        vec![
            "--- COMMAND OUTPUT (stdout) ---".to_string(),
            "done".to_string(),
            "--- END OF OUTPUT ---".to_string(),
            "--- COMMAND ERROR (stderr) ---".to_string(),
            "ls: missing: No such file".to_string(),
            "--- END OF ERROR ---".to_string(),
            "Command execution finished. (exit code 2)".to_string(),
        ]
    );
}

#[test]
fn silent_success_logs_only_completion() {
    let mut state = state();
    ready_with(&mut state, "true");
    let before = state.output.len();
    let op_id = execute_op(&mut state);
    run_runtime(
        &mut state,
        RuntimeAction::ExecutionFinished {
            op_id,
            outcome: ExecutionOutcome::Completed {
                stdout: String::new(),
                stderr: "  \n".to_string(),
                exit_code: Some(0),
            },
        },
    );
    assert_eq!(state.output.len(), before + 2);
    assert_eq!(last_output(&state).1, "Command execution finished.");
}

#[test]
fn launch_failure_is_output_not_engine_error() {
    let mut state = state();
    ready_with(&mut state, "ls");
    let op_id = execute_op(&mut state);
    run_runtime(
        &mut state,
        RuntimeAction::ExecutionFinished {
            op_id,
            outcome: ExecutionOutcome::LaunchFailure {
                reason: "interpreter not found".to_string(),
            },
        },
    );

    assert_eq!(state.workflow.stage, Stage::Ready);
    assert_eq!(state.workflow.last_error, None);
    assert_eq!(
        last_output(&state),
        (
            OutputLevel::Error,
            "Execution failed: interpreter not found".to_string()
        )
    );
    assert_eq!(execute_op(&mut state), op_id + 1);
}
