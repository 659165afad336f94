//! Provenance: which nodes ran, with which parameters, backed by which function.
//!
//! The execution log is append-only. A re-run appends fresh entries; it never
//! rewrites an entry already recorded, so parameters seen in the log are the
//! ones the transform was actually called with.
//!
//! The log and the function cache can be written to a JSON provenance file
//! and later turned back into a pipeline with
//! [`Container::replay`](crate::pipeline::Container::replay).

use crate::error::Result;
use crate::pipeline::id::{NodeId, RunId};
use crate::pipeline::value::Params;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Provenance file format version.
pub const PROVENANCE_VERSION: u32 = 1;

/// How far a logged node got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    /// Logged, transform not yet returned.
    Running,
    Completed,
    Failed,
}

/// One executed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub run: RunId,
    /// Chained position of the node within its pipeline.
    #[serde(default)]
    pub stage: usize,
    pub node_id: NodeId,
    pub name: String,
    /// Name of the transform backing the node (differs from `name` for renamed nodes).
    pub transform: String,
    pub params: Params,
    /// Positional argument count the node was built with.
    pub positional: usize,
    pub fingerprint: String,
    pub logged_at: DateTime<Utc>,
    pub outcome: EntryOutcome,
}

impl LogEntry {
    pub fn is_completed(&self) -> bool {
        self.outcome == EntryOutcome::Completed
    }
}

/// Identifies the function behind a node name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub version: u32,
    pub fingerprint: String,
    /// Literal source, when the transform was registered with one.
    pub source: Option<String>,
}

/// Ordered record of executed nodes.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Settle the outcome of the most recent entry.
    pub(crate) fn finish_last(&mut self, outcome: EntryOutcome) {
        if let Some(last) = self.entries.last_mut() {
            last.outcome = outcome;
        }
    }

    pub fn completed(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.is_completed())
    }

    /// Entries labeled `<name>.<k>`, where `k` counts earlier entries with the same name.
    pub fn entries_named(&self) -> Vec<(String, &LogEntry)> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.entries
            .iter()
            .map(|entry| {
                let count = seen.entry(entry.name.as_str()).or_insert(0);
                let label = format!("{}.{}", entry.name, count);
                *count += 1;
                (label, entry)
            })
            .collect()
    }

    /// Entries of a single run.
    pub fn run(&self, run: RunId) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.run == run)
    }
}

/// Execution log and function cache as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceFile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub entries: Vec<LogEntry>,
    pub functions: BTreeMap<String, FunctionRecord>,
}

impl ProvenanceFile {
    pub fn new(log: &ExecutionLog, functions: &BTreeMap<String, FunctionRecord>) -> Self {
        Self {
            version: PROVENANCE_VERSION,
            saved_at: Utc::now(),
            entries: log.entries().to_vec(),
            functions: functions.clone(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        tracing::info!(
            "Saved provenance ({} entries, {} functions) to {:?}",
            self.entries.len(),
            self.functions.len(),
            path.as_ref()
        );
        Ok(())
    }

    /// Entries of the most recent run only.
    pub fn last_run(&self) -> Vec<&LogEntry> {
        match self.entries.iter().map(|e| e.run).max() {
            Some(last) => self.entries.iter().filter(|e| e.run == last).collect(),
            None => Vec::new(),
        }
    }

    /// The pipeline as it stood after the last logged run.
    ///
    /// A re-run from stage `k` only logs stages `k..`, so each entry replaces
    /// whatever was recorded at its position. Stages before `k` keep the entry
    /// of the run that last reached them. A run that completes also marks the
    /// end of the pipeline; a failed one leaves the stages after it in place.
    pub fn pipeline(&self) -> Vec<&LogEntry> {
        let mut stages: Vec<&LogEntry> = Vec::new();
        let mut entries = self.entries.iter().peekable();
        while let Some(entry) = entries.next() {
            match stages.get_mut(entry.stage) {
                Some(slot) => *slot = entry,
                None => stages.push(entry),
            }
            let run_ends = entries.peek().map_or(true, |next| next.run != entry.run);
            if run_ends && entry.is_completed() {
                stages.truncate(entry.stage + 1);
            }
        }
        stages
    }
}
