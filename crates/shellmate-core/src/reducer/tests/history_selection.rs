use super::*;
use pretty_assertions::assert_eq;

#[test]
fn selection_bypasses_gateway_and_history() {
    let mut state = state();
    let effects = user(
        &mut state,
        UserAction::SelectFromHistory("git status".to_string()),
    );
    assert!(effects.is_empty());
    assert_eq!(state.workflow.stage, Stage::Ready);
    assert_eq!(state.workflow.command.as_deref(), Some("git status"));
    assert!(state.history.is_empty());
    assert_eq!(state.next_op_id, 1);
}

#[test]
fn selection_recovers_from_error_stage() {
    let mut state = state();
    generate(&mut state, "ls", "ls");
    generate(&mut state, "rm everything", "# Cannot fulfill request.");
    assert_eq!(state.workflow.stage, Stage::Error);

    user(&mut state, UserAction::SelectFromHistory("ls".to_string()));
    assert_eq!(state.workflow.stage, Stage::Ready);
    assert_eq!(state.workflow.last_error, None);
    assert_eq!(user(&mut state, UserAction::Execute).len(), 1);
}

#[test]
fn twenty_one_generations_keep_latest_twenty() {
    let mut state = state();
    for idx in 0..21 {
        generate(&mut state, &format!("echo {idx}"), &format!("echo {idx}"));
    }
    let history = state.history.list();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0], "echo 1");
    assert_eq!(history[19], "echo 20");
}
