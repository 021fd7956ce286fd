use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use shellmate_core::actions::RuntimeAction;
use shellmate_core::actions::UserAction;
use shellmate_core::actions::WorkflowAction;
use shellmate_core::engine::WorkflowEngine;
use shellmate_core::engine::WorkflowSnapshot;
use shellmate_core::reducer::WorkflowEffect;
use shellmate_core::state::GatewayFailure;
use shellmate_core::state::OutputEntry;
use shellmate_exec::gateway::TextGenerator;
use shellmate_exec::runner::CommandRunner;
use tracing::debug;

/// Destination for the Copy action.
pub trait ClipboardSink: Send + Sync {
    fn set_text(&self, text: &str) -> anyhow::Result<()>;
}

/// The desktop clipboard. A fresh handle per write; some platforms drop
/// ownership of the contents when the handle is released.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn set_text(&self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
        clipboard
            .set_text(text.to_string())
            .context("failed to set clipboard text")
    }
}

/// Performs engine effects off the caller's thread. Each asynchronous
/// operation gets its own worker; completions come back on the channel.
pub struct EffectDispatcher<G, R> {
    generator: Arc<G>,
    runner: Arc<R>,
    clipboard: Arc<dyn ClipboardSink>,
    tx: Sender<RuntimeAction>,
}

impl<G, R> EffectDispatcher<G, R>
where
    G: TextGenerator + 'static,
    R: CommandRunner + 'static,
{
    pub fn new(
        generator: Arc<G>,
        runner: Arc<R>,
        clipboard: Arc<dyn ClipboardSink>,
        tx: Sender<RuntimeAction>,
    ) -> Self {
        Self {
            generator,
            runner,
            clipboard,
            tx,
        }
    }

    /// Starts `effect`. Synchronous effects return their outcome directly
    /// for the caller to feed back into the engine.
    pub fn dispatch(&self, effect: WorkflowEffect) -> Option<RuntimeAction> {
        match effect {
            WorkflowEffect::Generate {
                op_id,
                prompt,
                profile,
            } => {
                let generator = Arc::clone(&self.generator);
                self.spawn(op_id, move || RuntimeAction::GenerationFinished {
                    op_id,
                    response: generator
                        .send(&prompt, &profile)
                        .map_err(GatewayFailure::from),
                });
                None
            }
            WorkflowEffect::Explain {
                op_id,
                prompt,
                profile,
            } => {
                let generator = Arc::clone(&self.generator);
                self.spawn(op_id, move || RuntimeAction::ExplanationFinished {
                    op_id,
                    response: generator
                        .send(&prompt, &profile)
                        .map_err(GatewayFailure::from),
                });
                None
            }
            WorkflowEffect::RunCommand { op_id, command } => {
                let runner = Arc::clone(&self.runner);
                self.spawn(op_id, move || RuntimeAction::ExecutionFinished {
                    op_id,
                    outcome: runner.run(&command),
                });
                None
            }
            WorkflowEffect::CopyToClipboard(text) => Some(RuntimeAction::CopyFinished {
                result: self
                    .clipboard
                    .set_text(&text)
                    .map_err(|err| format!("{err:#}")),
            }),
        }
    }

    fn spawn<F>(&self, op_id: u64, work: F)
    where
        F: FnOnce() -> RuntimeAction + Send + 'static,
    {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let action = work();
            if tx.send(action).is_err() {
                debug!(op_id, "result channel closed; dropping completion");
            }
        });
    }
}

/// Engine plus dispatcher plus the completion channel: one interactive
/// session, driven either by the terminal UI or headlessly.
pub struct Session<G, R> {
    engine: WorkflowEngine,
    dispatcher: EffectDispatcher<G, R>,
    rx: Receiver<RuntimeAction>,
}

impl<G, R> Session<G, R>
where
    G: TextGenerator + 'static,
    R: CommandRunner + 'static,
{
    pub fn new(generator: Arc<G>, runner: Arc<R>) -> Self {
        Self::with_clipboard(generator, runner, Arc::new(SystemClipboard))
    }

    pub fn with_clipboard(
        generator: Arc<G>,
        runner: Arc<R>,
        clipboard: Arc<dyn ClipboardSink>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            engine: WorkflowEngine::new(),
            dispatcher: EffectDispatcher::new(generator, runner, clipboard, tx),
            rx,
        }
    }

    pub fn submit(&mut self, action: UserAction) {
        let mut pending: Vec<WorkflowAction> = vec![action.into()];
        while let Some(action) = pending.pop() {
            for effect in self.engine.dispatch(action) {
                if let Some(outcome) = self.dispatcher.dispatch(effect) {
                    pending.push(outcome.into());
                }
            }
        }
    }

    /// Applies every completion that has already arrived.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(action) = self.rx.try_recv() {
            self.engine.dispatch(action);
            applied += 1;
        }
        applied
    }

    /// Blocks until no operation is in flight. `None` waits indefinitely.
    /// Returns `false` when the limit elapsed first.
    pub fn wait_idle(&mut self, limit: Option<Duration>) -> bool {
        let deadline = limit.map(|limit| Instant::now() + limit);
        while self.engine.is_busy() {
            let action = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match self.rx.recv_timeout(remaining) {
                        Ok(action) => action,
                        Err(RecvTimeoutError::Timeout) => return false,
                        Err(RecvTimeoutError::Disconnected) => return false,
                    }
                }
                None => match self.rx.recv() {
                    Ok(action) => action,
                    Err(_) => return false,
                },
            };
            self.engine.dispatch(action);
        }
        true
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.engine.snapshot()
    }

    /// Output entries appended after sequence number `after`.
    pub fn output_since(&self, after: u64) -> Vec<OutputEntry> {
        self.engine
            .state()
            .output
            .iter()
            .filter(|entry| entry.seq > after)
            .cloned()
            .collect()
    }

    pub fn last_output_seq(&self) -> u64 {
        self.engine
            .state()
            .output
            .last()
            .map(|entry| entry.seq)
            .unwrap_or(0)
    }
}
