//! Status text reported while a pipeline runs.
//!
//! The container always knows its latest status; any number of
//! [`StatusSink`]s can be attached to mirror it somewhere visible.

use std::collections::VecDeque;
use std::fmt;

/// Status of the most recent run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStatus {
    Idle,
    Processing { node: String },
    Completed,
    Failed { message: String, trace: String },
}

impl PipelineStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineStatus::Failed { .. })
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Idle => write!(f, "Idle"),
            PipelineStatus::Processing { node } => write!(f, "Processing node: {}", node),
            PipelineStatus::Completed => write!(f, "Pipeline completed successfully"),
            PipelineStatus::Failed { message, trace } => {
                write!(f, "Failure: {}\n\n{}", message, trace)
            }
        }
    }
}

/// Receives every status change.
#[cfg_attr(test, mockall::automock)]
pub trait StatusSink {
    fn update(&self, status: &PipelineStatus);
}

/// Forwards status changes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn update(&self, status: &PipelineStatus) {
        match status {
            PipelineStatus::Failed { message, .. } => tracing::warn!("Pipeline failed: {}", message),
            other => tracing::info!("{}", other),
        }
    }
}

/// Latest status plus a bounded history, fanned out to the attached sinks.
pub struct StatusBoard {
    current: PipelineStatus,
    history: VecDeque<PipelineStatus>,
    capacity: usize,
    sinks: Vec<Box<dyn StatusSink>>,
}

impl StatusBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            current: PipelineStatus::Idle,
            history: VecDeque::with_capacity(capacity),
            capacity,
            sinks: Vec::new(),
        }
    }

    pub fn current(&self) -> &PipelineStatus {
        &self.current
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &PipelineStatus> {
        self.history.iter()
    }

    pub fn attach(&mut self, sink: Box<dyn StatusSink>) {
        self.sinks.push(sink);
    }

    pub fn set(&mut self, status: PipelineStatus) {
        for sink in &self.sinks {
            sink.update(&status);
        }
        if self.capacity > 0 {
            if self.history.len() >= self.capacity {
                self.history.pop_front();
            }
            self.history.push_back(status.clone());
        }
        self.current = status;
    }
}

impl fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBoard")
            .field("current", &self.current)
            .field("history", &self.history.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
