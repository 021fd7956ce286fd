use super::*;
use pretty_assertions::assert_eq;

fn completion_for(effect: &WorkflowEffect) -> Option<RuntimeAction> {
    match effect {
        WorkflowEffect::Generate { op_id, .. } => Some(RuntimeAction::GenerationFinished {
            op_id: *op_id,
            response: Ok("```bash\nls -la\n```".to_string()),
        }),
        WorkflowEffect::Explain { op_id, .. } => Some(RuntimeAction::ExplanationFinished {
            op_id: *op_id,
            response: Ok("Summary: lists files.".to_string()),
        }),
        WorkflowEffect::RunCommand { op_id, .. } => Some(RuntimeAction::ExecutionFinished {
            op_id: *op_id,
            outcome: ExecutionOutcome::Completed {
                stdout: "a\nb".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            },
        }),
        WorkflowEffect::CopyToClipboard(_) => None,
    }
}

#[test]
fn invariants_hold_across_a_mixed_session() {
    let mut state = state();
    let script = [
        UserAction::Execute,
        UserAction::Submit("list files".to_string()),
        UserAction::Explain,
        UserAction::Execute,
        UserAction::Copy,
        UserAction::Submit("   ".to_string()),
        UserAction::QuickScan,
        UserAction::SelectFromHistory("ls -la".to_string()),
        UserAction::Execute,
        UserAction::Clear,
        UserAction::Explain,
        UserAction::Submit(QUICK_SCAN_PHRASE.to_string()),
    ];

    let mut dispatched = 0;
    for action in script {
        let effects = user(&mut state, action);
        for effect in &effects {
            if let Some(completion) = completion_for(effect) {
                dispatched += 1;
                run_runtime(&mut state, completion);
            }
        }
    }

    assert_eq!(dispatched, 4);
    assert_eq!(state.workflow.stage, Stage::Idle);
    assert_eq!(state.history.list(), vec!["ls -la".to_string()]);
    assert!(!state.is_busy());
}

#[test]
fn only_one_operation_is_ever_in_flight() {
    let mut state = state();
    ready_with(&mut state, "ls");
    let mut in_flight = 0;
    for action in [
        UserAction::Explain,
        UserAction::Execute,
        UserAction::Submit("x".to_string()),
        UserAction::Explain,
    ] {
        in_flight += user(&mut state, action).len();
    }
    assert_eq!(in_flight, 1);
}
