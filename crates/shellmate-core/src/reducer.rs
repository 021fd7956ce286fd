use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::actions::WorkflowAction;
use super::error::ValidationError;
use super::profile::InstructionProfile;
use super::sanitizer::classify;
use super::sanitizer::is_runnable_command;
use super::sanitizer::strip_fences;
use super::state::EngineState;
use super::state::ErrorKind;
use super::state::ExecutionOutcome;
use super::state::GatewayFailure;
use super::state::GenerationResult;
use super::state::InFlight;
use super::state::LastError;
use super::state::OperationKind;
use super::state::Stage;
use super::state::WorkflowState;

pub const QUICK_SCAN_PHRASE: &str = "run quick scan";

pub const QUICK_SCAN_PLACEHOLDER: &str = "# Security monitor received request.\n\
# Note: Security monitoring features are under development.\n\
# This is a placeholder for future security features.";

/// Work the host must perform on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEffect {
    Generate {
        op_id: u64,
        prompt: String,
        profile: InstructionProfile,
    },
    Explain {
        op_id: u64,
        prompt: String,
        profile: InstructionProfile,
    },
    RunCommand {
        op_id: u64,
        command: String,
    },
    CopyToClipboard(String),
}

impl WorkflowEffect {
    pub fn op_id(&self) -> Option<u64> {
        match self {
            Self::Generate { op_id, .. }
            | Self::Explain { op_id, .. }
            | Self::RunCommand { op_id, .. } => Some(*op_id),
            Self::CopyToClipboard(_) => None,
        }
    }
}

pub fn reduce(state: &mut EngineState, action: WorkflowAction) -> Vec<WorkflowEffect> {
    match action {
        WorkflowAction::User(user) => reduce_user(state, user),
        WorkflowAction::Runtime(runtime) => {
            reduce_runtime(state, runtime);
            Vec::new()
        }
    }
}

fn reduce_user(state: &mut EngineState, action: UserAction) -> Vec<WorkflowEffect> {
    match action {
        UserAction::Submit(query) => submit(state, query),
        UserAction::SelectFromHistory(command) => {
            if let Err(err) = ensure_settled(state) {
                return reject(state, "select", err);
            }
            if !is_runnable_command(&command) {
                return reject(state, "select", ValidationError::InvalidCommand("select"));
            }
            let command = command.trim().to_string();
            debug!(command = %command, "command selected from history");
            state.workflow.command = Some(command);
            state.workflow.last_error = None;
            state.workflow.stage = Stage::Ready;
            Vec::new()
        }
        UserAction::Explain => {
            let command = match runnable_command(state, "explain") {
                Ok(command) => command,
                Err(err) => return reject(state, "explain", err),
            };
            let op_id = begin(state, OperationKind::Explanation, Stage::Explaining);
            info!(op_id, command = %command, "explanation requested");
            vec![WorkflowEffect::Explain {
                op_id,
                prompt: command,
                profile: InstructionProfile::CommandExplanation,
            }]
        }
        UserAction::Execute => {
            let command = match runnable_command(state, "execute") {
                Ok(command) => command,
                Err(err) => return reject(state, "execute", err),
            };
            state.output.info(format!("Executing: {command}"));
            let op_id = begin(state, OperationKind::Execution, Stage::Executing);
            info!(op_id, command = %command, "execution requested");
            vec![WorkflowEffect::RunCommand { op_id, command }]
        }
        UserAction::Copy => match state.workflow.command.as_deref() {
            Some(command) if is_runnable_command(command) => {
                vec![WorkflowEffect::CopyToClipboard(command.to_string())]
            }
            _ => {
                state.output.error("Error: Nothing valid to copy.");
                Vec::new()
            }
        },
        UserAction::QuickScan => {
            if let Err(err) = ensure_settled(state) {
                return reject(state, "quick scan", err);
            }
            quick_scan(state);
            Vec::new()
        }
        UserAction::Clear => {
            state.workflow = WorkflowState::default();
            if let Some(in_flight) = state.in_flight.as_mut() {
                in_flight.orphaned = true;
                debug!(
                    op_id = in_flight.op_id,
                    kind = in_flight.kind.label(),
                    "cleared while an operation is in flight"
                );
            }
            state.output.info("Query and Command boxes cleared.");
            Vec::new()
        }
    }
}

fn submit(state: &mut EngineState, query: String) -> Vec<WorkflowEffect> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return reject(state, "submit", ValidationError::EmptyQuery);
    }
    if let Err(err) = ensure_settled(state) {
        return reject(state, "submit", err);
    }

    state.workflow.query = Some(query.clone());
    state.workflow.command = None;
    state.workflow.last_error = None;

    if query == QUICK_SCAN_PHRASE {
        quick_scan(state);
        return Vec::new();
    }

    let op_id = begin(state, OperationKind::Generation, Stage::Generating);
    info!(op_id, query = %query, "generation requested");
    vec![WorkflowEffect::Generate {
        op_id,
        prompt: query,
        profile: InstructionProfile::CommandGeneration,
    }]
}

fn quick_scan(state: &mut EngineState) {
    info!("quick scan requested; returning placeholder");
    state.workflow.command = None;
    state.workflow.last_error = None;
    state.workflow.stage = Stage::Idle;
    state.output.info(QUICK_SCAN_PLACEHOLDER);
}

fn reduce_runtime(state: &mut EngineState, action: RuntimeAction) {
    match action {
        RuntimeAction::GenerationFinished { op_id, response } => {
            if !finish(state, op_id, OperationKind::Generation) {
                return;
            }
            let result = match response {
                Ok(raw) => classify(&raw),
                Err(failure) => GenerationResult::Error(failure),
            };
            apply_generation(state, op_id, result);
        }
        RuntimeAction::ExplanationFinished { op_id, response } => {
            if !finish(state, op_id, OperationKind::Explanation) {
                return;
            }
            apply_explanation(state, op_id, response);
        }
        RuntimeAction::ExecutionFinished { op_id, outcome } => {
            if !finish(state, op_id, OperationKind::Execution) {
                return;
            }
            apply_execution(state, op_id, outcome);
        }
        RuntimeAction::CopyFinished { result } => match result {
            Ok(()) => state.output.info("Command copied to clipboard."),
            Err(reason) => {
                warn!(reason = %reason, "clipboard write failed");
                state.output.error(format!("Error: failed to copy: {reason}"));
            }
        },
    }
}

fn apply_generation(state: &mut EngineState, op_id: u64, result: GenerationResult) {
    match result {
        GenerationResult::Command(command) => {
            let stored = state.history.add(command.clone());
            info!(op_id, command = %command, stored, "command generated");
            state.workflow.command = Some(command);
            state.workflow.last_error = None;
            state.workflow.stage = Stage::Ready;
            state.output.info("Command generated successfully.");
        }
        GenerationResult::Refusal(text) => {
            info!(op_id, response = %text, "model declined the request");
            state.output.error(format!("AI returned an error: {text}"));
            enter_error(state, ErrorKind::Refusal, text);
        }
        GenerationResult::Error(failure) => {
            error!(op_id, kind = failure.kind.label(), message = %failure.message, "generation failed");
            state.output.error(format!("AI returned an error: {failure}"));
            enter_error(state, ErrorKind::Failure(failure.kind), failure.message);
        }
    }
}

fn apply_explanation(state: &mut EngineState, op_id: u64, response: Result<String, GatewayFailure>) {
    state.workflow.stage = Stage::Ready;
    match response {
        Ok(text) => {
            debug!(op_id, "explanation received");
            state.output.info("--- AI EXPLANATION ---");
            state.output.info(strip_fences(&text));
            state.output.info("--- END OF EXPLANATION ---");
        }
        Err(failure) => {
            warn!(op_id, kind = failure.kind.label(), message = %failure.message, "explanation failed");
            state
                .output
                .error(format!("Error explaining command: {failure}"));
        }
    }
}

fn apply_execution(state: &mut EngineState, op_id: u64, outcome: ExecutionOutcome) {
    state.workflow.stage = Stage::Ready;
    match outcome {
        ExecutionOutcome::Completed {
            stdout,
            stderr,
            exit_code,
        } => {
            let stdout = stdout.trim();
            let stderr = stderr.trim();
            if !stdout.is_empty() {
                state.output.info("--- COMMAND OUTPUT (stdout) ---");
                state.output.info(stdout);
                state.output.info("--- END OF OUTPUT ---");
            }
            if !stderr.is_empty() {
                state.output.error("--- COMMAND ERROR (stderr) ---");
                state.output.error(stderr);
                state.output.error("--- END OF ERROR ---");
            }
            info!(op_id, ?exit_code, "execution finished");
            match exit_code {
                Some(code) if code != 0 => state
                    .output
                    .info(format!("Command execution finished. (exit code {code})")),
                _ => state.output.info("Command execution finished."),
            }
        }
        ExecutionOutcome::LaunchFailure { reason } => {
            warn!(op_id, reason = %reason, "execution could not start");
            state.output.error(format!("Execution failed: {reason}"));
        }
    }
}

fn enter_error(state: &mut EngineState, kind: ErrorKind, message: String) {
    state.workflow.command = None;
    state.workflow.last_error = Some(LastError { kind, message });
    state.workflow.stage = Stage::Error;
}

fn ensure_settled(state: &EngineState) -> Result<(), ValidationError> {
    match state.in_flight {
        Some(in_flight) => Err(ValidationError::Busy(in_flight.kind)),
        None => Ok(()),
    }
}

fn runnable_command(state: &EngineState, verb: &'static str) -> Result<String, ValidationError> {
    ensure_settled(state)?;
    match state.workflow.command.as_deref() {
        Some(command) if state.workflow.stage == Stage::Ready && is_runnable_command(command) => {
            Ok(command.to_string())
        }
        _ => Err(ValidationError::InvalidCommand(verb)),
    }
}

fn reject(state: &mut EngineState, event: &'static str, err: ValidationError) -> Vec<WorkflowEffect> {
    warn!(event, stage = state.workflow.stage.label(), reason = %err, "event rejected");
    state.output.error(err.to_string());
    Vec::new()
}

fn begin(state: &mut EngineState, kind: OperationKind, stage: Stage) -> u64 {
    let op_id = state.next_op_id;
    state.next_op_id += 1;
    state.in_flight = Some(InFlight {
        op_id,
        kind,
        orphaned: false,
    });
    state.workflow.stage = stage;
    op_id
}

/// Consumes the in-flight record for `op_id`. Returns `true` when the
/// completion should be applied to the visible state.
fn finish(state: &mut EngineState, op_id: u64, kind: OperationKind) -> bool {
    match state.in_flight {
        Some(in_flight) if in_flight.op_id == op_id && in_flight.kind == kind => {
            state.in_flight = None;
            if in_flight.orphaned {
                debug!(op_id, kind = kind.label(), "discarding completion after clear");
                return false;
            }
            true
        }
        _ => {
            debug!(op_id, kind = kind.label(), "ignoring stale completion");
            false
        }
    }
}

#[cfg(test)]
mod tests;
