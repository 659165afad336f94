//! Pipeline executor: drives a container's stages to completion or first failure.
//!
//! Each run is a small state machine stepped by a loop:
//! 1. `Running { index }`: log the stage at `index`, report it, call its transform.
//! 2. On success move to `index + 1`; on failure stop with the failure and
//!    leave the failed stage at the head of the pending queue.
//! 3. `Done`: clear the queue if asked, report the outcome, notify subscribers.
//!
//! Transform errors and panics never leave the executor. They become the
//! terminal status of the run and the payload stays as the last good step
//! left it.
//!
//! Edits arrive as [`PipelineEvent`]s on the container's queue and are applied
//! by [`Container::process_events`], which re-runs from the earliest edited
//! stage. A run never starts another run from inside itself.

use crate::pipeline::container::{Container, PipelineEvent};
use crate::pipeline::error::PipelineError;
use crate::pipeline::id::RunId;
use crate::pipeline::log::{EntryOutcome, LogEntry};
use crate::pipeline::node::Node;
use crate::pipeline::payload::Payload;
use crate::pipeline::status::PipelineStatus;
use chrono::{DateTime, Utc};
use std::panic::{self, AssertUnwindSafe};

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    Failed {
        node: String,
        message: String,
        trace: String,
    },
}

/// Executor state between steps.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Running { index: usize },
    Done(RunOutcome),
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run: RunId,
    /// Stage position the run started from.
    pub start: usize,
    pub outcome: RunOutcome,
    /// Stages that completed during this run.
    pub executed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

/// A contained transform failure: one-line message and full diagnostic text.
struct StepFailure {
    message: String,
    trace: String,
}

impl From<PipelineError> for StepFailure {
    fn from(e: PipelineError) -> Self {
        Self {
            message: e.to_string(),
            trace: format!("{:?}", e),
        }
    }
}

impl Container {
    /// Run every chained stage from the first one.
    ///
    /// With `clear`, the queue is emptied once the run ends, successfully or not.
    pub fn execute_pipeline(&mut self, clear: bool) -> RunReport {
        self.run_from(0, clear)
    }

    /// Run the stages not yet reached by the cursor.
    pub fn run_pending(&mut self, clear: bool) -> RunReport {
        self.run_from(self.cursor, clear)
    }

    /// Run from stage `start` onward.
    ///
    /// The payload is first restored to what stage `start` received when it last
    /// ran. A start past the stages that have run is pulled back to the first
    /// stage that has not.
    pub fn run_from(&mut self, start: usize, clear: bool) -> RunReport {
        let start = start.min(self.checkpoints.len());
        if let Some(input) = self.checkpoints.get(start) {
            self.payload = input.clone();
        }
        self.checkpoints.truncate(start);
        self.cursor = start;

        let run = self.last_run.next();
        self.last_run = run;
        let started_at = Utc::now();
        tracing::info!(
            "Run {:?} starting at stage {} ({} pending)",
            run,
            start,
            self.stages.len().saturating_sub(start)
        );

        let mut executed = 0;
        let mut state = RunState::Running { index: start };
        let outcome = loop {
            match state {
                RunState::Running { index } => {
                    state = self.step(index, run);
                    if matches!(state, RunState::Running { .. }) {
                        executed += 1;
                    }
                }
                RunState::Done(outcome) => break outcome,
            }
        };

        self.finish(&outcome, clear);

        let report = RunReport {
            run,
            start,
            outcome,
            executed,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            "Run {:?} finished: {} stage(s) in {} ms",
            run,
            report.executed,
            (report.finished_at - report.started_at).num_milliseconds()
        );

        if report.is_success() {
            for subscriber in &self.subscribers {
                subscriber(self);
            }
        }
        report
    }

    /// Apply every queued edit with a single non-clearing run from the earliest
    /// edited stage. Returns `None` when there was nothing to re-run.
    pub fn process_events(&mut self) -> Option<RunReport> {
        let mut earliest: Option<usize> = None;
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                PipelineEvent::Rerun(id) => match self.position(id) {
                    Some(pos) => {
                        tracing::trace!("Rerun requested for node {} at stage {}", id, pos);
                        earliest = Some(earliest.map_or(pos, |e| e.min(pos)));
                    }
                    None => tracing::debug!("Ignoring rerun for node {} (not chained)", id),
                },
            }
        }
        earliest.map(|start| self.run_from(start, false))
    }

    /// Re-run from the stage holding `node`.
    pub fn rerun_node(&mut self, node: &Node) -> Result<RunReport, PipelineError> {
        let start = self
            .position(node.id())
            .ok_or(PipelineError::NodeNotQueued(node.id()))?;
        Ok(self.run_from(start, false))
    }

    fn step(&mut self, index: usize, run: RunId) -> RunState {
        let Some(node) = self.stages.get(index).cloned() else {
            return RunState::Done(RunOutcome::Completed);
        };

        // Leaves the pending queue at the moment it enters the log.
        self.cursor = index + 1;
        self.checkpoints.push(self.payload.clone());
        self.record(&node, index, run);
        self.status.set(PipelineStatus::Processing {
            node: node.name().to_string(),
        });
        tracing::debug!("Processing node '{}' (stage {})", node.name(), index);

        match invoke(&node, &self.payload) {
            Ok(next) => {
                let expected = node.factory().output_kind(self.payload.kind());
                if next.kind() != expected {
                    tracing::warn!(
                        "Node '{}' produced a {} payload but declares {}",
                        node.name(),
                        next.kind(),
                        expected
                    );
                }
                self.payload = next;
                self.log.finish_last(EntryOutcome::Completed);
                RunState::Running { index: index + 1 }
            }
            Err(failure) => {
                // The failed stage stays pending; its input is the current payload.
                self.cursor = index;
                self.checkpoints.pop();
                self.log.finish_last(EntryOutcome::Failed);
                tracing::warn!("Node '{}' failed: {}", node.name(), failure.message);
                RunState::Done(RunOutcome::Failed {
                    node: node.name().to_string(),
                    message: failure.message,
                    trace: failure.trace,
                })
            }
        }
    }

    fn record(&mut self, node: &Node, stage: usize, run: RunId) {
        let factory = node.factory();
        if !self.functions.contains_key(node.name()) {
            self.functions.insert(node.name().to_string(), factory.record());
        }
        self.log.push(LogEntry {
            run,
            stage,
            node_id: node.id(),
            name: node.name().to_string(),
            transform: factory.name().to_string(),
            params: node.params(),
            positional: node.args().len(),
            fingerprint: factory.fingerprint().to_string(),
            logged_at: Utc::now(),
            outcome: EntryOutcome::Running,
        });
    }

    fn finish(&mut self, outcome: &RunOutcome, clear: bool) {
        if clear {
            self.clear_pipeline();
        }
        let status = match outcome {
            RunOutcome::Completed => PipelineStatus::Completed,
            RunOutcome::Failed { node, message, trace } => PipelineStatus::Failed {
                message: format!("node '{}' failed: {}", node, message),
                trace: trace.clone(),
            },
        };
        self.status.set(status);
    }
}

/// Bind the node's parameters and call its transform, containing errors and panics.
fn invoke(node: &Node, payload: &Payload) -> Result<Payload, StepFailure> {
    let factory = node.factory();
    if !factory.accepts(payload.kind()) {
        return Err(PipelineError::IncompatiblePayload {
            node: node.name().to_string(),
            accepts: factory.accepts_label(),
            found: payload.kind(),
        }
        .into());
    }

    let params = node.bind()?;

    match panic::catch_unwind(AssertUnwindSafe(|| factory.call(payload, &params))) {
        Ok(Ok(next)) => Ok(next),
        Ok(Err(e)) => Err(StepFailure {
            message: format!("{:#}", e),
            trace: format!("{:?}", e),
        }),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "transform panicked".to_string());
            Err(StepFailure {
                trace: format!("panic in transform '{}': {}", factory.name(), message),
                message,
            })
        }
    }
}
