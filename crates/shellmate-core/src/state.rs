use std::collections::VecDeque;
use std::fmt;

use chrono::DateTime;
use chrono::Local;
use serde::Serialize;

use super::history::HistoryStore;

pub const OUTPUT_LOG_CAPACITY: usize = 2_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Generating,
    Ready,
    Error,
    Explaining,
    Executing,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Generating => "Generating command...",
            Self::Ready => "Ready",
            Self::Error => "Error",
            Self::Explaining => "AI is explaining...",
            Self::Executing => "Executing command...",
        }
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Generating | Self::Explaining | Self::Executing)
    }

    /// Stages in which `command` must be present.
    pub fn holds_command(self) -> bool {
        matches!(self, Self::Ready | Self::Explaining | Self::Executing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Service,
    Parse,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Service => "service",
            Self::Parse => "parse",
        }
    }
}

/// A request-gateway failure as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GatewayFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind.label(), self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Command(String),
    Refusal(String),
    Error(GatewayFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "failure")]
pub enum ErrorKind {
    Refusal,
    Failure(FailureKind),
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Refusal => "refusal",
            Self::Failure(kind) => kind.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    LaunchFailure {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Generation,
    Explanation,
    Execution,
}

impl OperationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Explanation => "explanation",
            Self::Execution => "execution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub op_id: u64,
    pub kind: OperationKind,
    /// Set when the visible state was cleared after dispatch; the completion
    /// is still awaited but no longer rendered.
    pub orphaned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub stage: Stage,
    pub query: Option<String>,
    pub command: Option<String>,
    pub last_error: Option<LastError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct OutputEntry {
    pub seq: u64,
    pub level: OutputLevel,
    pub at: DateTime<Local>,
    pub message: String,
}

/// User-facing output area. Bounded; oldest lines fall off first.
#[derive(Debug, Clone)]
pub struct OutputLog {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<OutputEntry>,
}

impl OutputLog {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            next_seq: 1,
            buf: VecDeque::with_capacity(cap.min(256)),
        }
    }

    pub fn push(&mut self, level: OutputLevel, message: impl Into<String>) {
        let entry = OutputEntry {
            seq: self.next_seq,
            level,
            at: Local::now(),
            message: message.into(),
        };
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(entry);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(OutputLevel::Info, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(OutputLevel::Error, message);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &OutputEntry> {
        self.buf.iter()
    }

    pub fn last(&self) -> Option<&OutputEntry> {
        self.buf.back()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new(OUTPUT_LOG_CAPACITY)
    }
}

#[derive(Debug, Clone)]
pub struct EngineState {
    pub workflow: WorkflowState,
    pub history: HistoryStore,
    pub output: OutputLog,
    pub in_flight: Option<InFlight>,
    pub next_op_id: u64,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            workflow: WorkflowState::default(),
            history: HistoryStore::default(),
            output: OutputLog::default(),
            in_flight: None,
            next_op_id: 1,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Reports the first violated state invariant, if any.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        let workflow = &self.workflow;
        let has_command = workflow
            .command
            .as_deref()
            .is_some_and(|command| !command.trim().is_empty());
        if workflow.stage.holds_command() && !has_command {
            return Some("stage requires a non-blank command");
        }
        if !workflow.stage.holds_command() && workflow.command.is_some() {
            return Some("command set outside Ready/Explaining/Executing");
        }
        if (workflow.stage == Stage::Error) != workflow.last_error.is_some() {
            return Some("last_error must be set exactly in the Error stage");
        }
        if workflow.stage.is_in_flight() && self.in_flight.is_none() {
            return Some("in-flight stage without an in-flight operation");
        }
        if let Some(in_flight) = self.in_flight {
            if !in_flight.orphaned && !workflow.stage.is_in_flight() {
                return Some("operation in flight but stage is settled");
            }
        }
        None
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}
