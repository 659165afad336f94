//! Container: the payload being transformed plus everything attached to it.
//!
//! A container owns:
//! - the payload
//! - the chained stages and a cursor marking the next one to run
//! - the execution log and the function cache
//! - completion subscribers, the status board and the edit-event queue
//!
//! Nodes are appended with the chain operator:
//!
//! ```ignore
//! let mut container = Container::new(table) >> splice.node(args!["trace", 0, 256]) >> normalize;
//! let report = container.execute_pipeline(true);
//! ```
//!
//! Stages stay chained after a non-clearing run so that an edit to any of
//! them can re-run the pipeline from that stage onward. The pending queue is
//! the part of the stages the cursor has not reached yet.

use crate::config::SessionConfig;
use crate::controls::{ControlBinder, ControlSpec};
use crate::error::Result;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::factory::TransformRegistry;
use crate::pipeline::id::{NodeId, RunId};
use crate::pipeline::log::{ExecutionLog, FunctionRecord, ProvenanceFile};
use crate::pipeline::node::{Node, SubscriptionId};
use crate::pipeline::payload::{Payload, PayloadKind};
use crate::pipeline::status::{PipelineStatus, StatusBoard, StatusSink};
use crossbeam_channel::{Receiver, Sender};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Shr;
use std::path::Path;
use std::rc::Rc;

/// Queued by a node's re-run trigger when one of its parameters changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    Rerun(NodeId),
}

/// Called with the container after a run drains the queue without failure.
pub type CompletionSubscriber = Box<dyn Fn(&Container)>;

/// Shared handle to the binder that receives control specs at chain time.
pub type SharedBinder = Rc<RefCell<dyn ControlBinder>>;

pub struct Container {
    pub(super) payload: Payload,
    pub(super) stages: Vec<Node>,
    /// Index of the next stage to run. `stages[cursor..]` is the pending queue.
    pub(super) cursor: usize,
    /// Input payload of every stage before `cursor`.
    pub(super) checkpoints: Vec<Payload>,
    pub(super) log: ExecutionLog,
    pub(super) functions: BTreeMap<String, FunctionRecord>,
    pub(super) subscribers: Vec<CompletionSubscriber>,
    pub(super) status: StatusBoard,
    pub(super) last_run: RunId,
    pub(super) event_rx: Receiver<PipelineEvent>,
    event_tx: Sender<PipelineEvent>,
    /// Re-run triggers this container registered on its chained nodes.
    triggers: Vec<(Node, SubscriptionId)>,
    config: SessionConfig,
    binder: Option<SharedBinder>,
}

impl Container {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self::with_config(payload, SessionConfig::default())
    }

    pub fn with_config(payload: impl Into<Payload>, config: SessionConfig) -> Self {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        Self {
            payload: payload.into(),
            stages: Vec::new(),
            cursor: 0,
            checkpoints: Vec::new(),
            log: ExecutionLog::new(),
            functions: BTreeMap::new(),
            subscribers: Vec::new(),
            status: StatusBoard::new(config.status_history),
            last_run: RunId::default(),
            event_rx,
            event_tx,
            triggers: Vec::new(),
            config,
            binder: None,
        }
    }

    /// Load the payload stored under `key` in a payload file.
    pub fn from_file(path: impl AsRef<Path>, key: &str, config: SessionConfig) -> Result<Self> {
        Ok(Self::with_config(Payload::from_file(path, key)?, config))
    }

    /// Store the current payload under `key`.
    pub fn save_payload(&self, path: impl AsRef<Path>, key: &str) -> Result<()> {
        self.payload.to_file(path, key)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(mut self) -> Payload {
        std::mem::take(&mut self.payload)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_binder(&mut self, binder: SharedBinder) {
        self.binder = Some(binder);
    }

    // ── Building ──

    /// Append `node` to the pending queue and wire its re-run trigger.
    pub fn chain(&mut self, node: &Node) -> &mut Self {
        let resolved = node.resolve();
        tracing::debug!("Chained node '{}' {}", node.name(), resolved);

        self.stages.push(node.clone());

        let tx = self.event_tx.clone();
        let id = node.id();
        let trigger = node.subscribe(move || {
            if tx.send(PipelineEvent::Rerun(id)).is_err() {
                tracing::trace!("Dropped rerun event for node {}", id);
            }
        });
        self.triggers.push((node.clone(), trigger));

        if self.config.show_controls {
            match &self.binder {
                Some(binder) => binder.borrow_mut().bind(node, ControlSpec::for_node(node)),
                None => tracing::debug!("Controls enabled but no binder is set"),
            }
        }

        if let Err(e) = self.check_compatibility() {
            tracing::warn!("{}", e);
        }

        self
    }

    /// Register a completion subscriber.
    pub fn connect(&mut self, callback: impl Fn(&Container) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    pub fn attach_status_sink(&mut self, sink: Box<dyn StatusSink>) {
        self.status.attach(sink);
    }

    /// Walk the pending queue with the declared payload kinds, starting from the
    /// current payload, and report the first node that would not accept its input.
    pub fn check_compatibility(&self) -> PipelineResult<PayloadKind> {
        let mut kind = self.payload.kind();
        for node in self.pending() {
            let factory = node.factory();
            if !factory.accepts(kind) {
                return Err(PipelineError::IncompatiblePayload {
                    node: node.name().to_string(),
                    accepts: factory.accepts_label(),
                    found: kind,
                });
            }
            kind = factory.output_kind(kind);
        }
        Ok(kind)
    }

    // ── Inspection ──

    /// Nodes not yet run in the current run.
    pub fn pending(&self) -> &[Node] {
        &self.stages[self.cursor.min(self.stages.len())..]
    }

    /// Every chained node, including those already run since the last clear.
    pub fn stages(&self) -> &[Node] {
        &self.stages
    }

    /// First chained position of `id`.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.stages.iter().position(|n| n.id() == id)
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Provenance record of every node name logged so far.
    pub fn functions(&self) -> &BTreeMap<String, FunctionRecord> {
        &self.functions
    }

    pub fn status(&self) -> &PipelineStatus {
        self.status.current()
    }

    pub fn status_history(&self) -> impl Iterator<Item = &PipelineStatus> {
        self.status.history()
    }

    pub fn last_run(&self) -> RunId {
        self.last_run
    }

    /// Number of edit events waiting to be processed.
    pub fn queued_events(&self) -> usize {
        self.event_rx.len()
    }

    // ── Housekeeping ──

    /// Drop every chained stage, its re-run trigger and the checkpoints kept for re-runs.
    pub fn clear_pipeline(&mut self) {
        self.release_triggers();
        self.stages.clear();
        self.checkpoints.clear();
        self.cursor = 0;
    }

    fn release_triggers(&mut self) {
        for (node, trigger) in self.triggers.drain(..) {
            node.unsubscribe(trigger);
        }
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.functions.clear();
    }

    pub fn provenance(&self) -> ProvenanceFile {
        ProvenanceFile::new(&self.log, &self.functions)
    }

    pub fn save_provenance(&self, path: impl AsRef<Path>) -> Result<()> {
        self.provenance().save(path)
    }

    /// Chain the pipeline recorded in `provenance`, each node with the
    /// parameters it last ran with. Partial re-runs are laid over the stages
    /// they did not reach. Returns the number of nodes chained.
    pub fn replay(&mut self, registry: &TransformRegistry, provenance: &ProvenanceFile) -> PipelineResult<usize> {
        let entries = provenance.pipeline();
        if entries.is_empty() {
            return Err(PipelineError::Replay("provenance holds no runs".to_string()));
        }

        let mut nodes = Vec::with_capacity(entries.len());
        for entry in entries {
            let factory = registry
                .get(&entry.transform)
                .ok_or_else(|| PipelineError::UnknownTransform(entry.transform.clone()))?;

            if factory.fingerprint() != entry.fingerprint {
                tracing::warn!(
                    "Transform '{}' changed since '{}' was logged (fingerprint {} != {})",
                    entry.transform,
                    entry.name,
                    factory.fingerprint(),
                    entry.fingerprint
                );
            }

            let mut node = factory.node_with(Vec::new(), entry.params.clone());
            if entry.name != entry.transform {
                node = node.with_name(entry.name.clone());
            }
            nodes.push(node);
        }

        for node in &nodes {
            self.chain(node);
        }
        tracing::info!("Replayed {} node(s) from provenance", nodes.len());
        Ok(nodes.len())
    }
}

impl Shr<Node> for Container {
    type Output = Container;

    fn shr(mut self, node: Node) -> Container {
        self.chain(&node);
        self
    }
}

impl Shr<&Node> for Container {
    type Output = Container;

    fn shr(mut self, node: &Node) -> Container {
        self.chain(node);
        self
    }
}

impl<'a> Shr<Node> for &'a mut Container {
    type Output = &'a mut Container;

    fn shr(self, node: Node) -> &'a mut Container {
        self.chain(&node)
    }
}

impl<'a> Shr<&Node> for &'a mut Container {
    type Output = &'a mut Container;

    fn shr(self, node: &Node) -> &'a mut Container {
        self.chain(node)
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.release_triggers();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("payload", &self.payload.kind())
            .field("stages", &self.stages.len())
            .field("cursor", &self.cursor)
            .field("log", &self.log.len())
            .field("status", self.status.current())
            .finish()
    }
}
