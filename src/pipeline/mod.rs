//! Linear, parameter-editable processing pipelines.
//!
//! A [`Container`] carries a [`Payload`] through an ordered list of [`Node`]s.
//! Each node is built by a [`NodeFactory`] from positional and keyword
//! arguments, which are resolved against the factory's declared [`Signature`].
//!
//! # Architecture
//!
//! ```text
//! Container ──chain──► [splice] ──► [normalize] ──► [rfft]
//!     │                    ▲
//!     │ edit events        │ set_param
//!     └────────────────────┴── ControlBinder / user code
//! ```
//!
//! # Design
//!
//! - **Iterative executor**: a run is a `RunState` loop, not recursion.
//! - **Edits are events**: `set_param` queues a re-run on a crossbeam channel;
//!   the host drains it with `Container::process_events`.
//! - **Checkpointed stages**: a re-run restores the payload the edited stage
//!   originally received.
//! - **Failure containment**: transform errors and panics end the run with a
//!   failure status; the payload stays at the last good step.
//! - **Append-only provenance**: every executed node is logged with the
//!   parameters it ran with and its transform's fingerprint.

pub mod container;
pub mod error;
pub mod executor;
pub mod factory;
pub mod id;
pub mod log;
pub mod node;
pub mod payload;
pub mod signature;
pub mod status;
pub mod store;
pub mod value;

pub use container::{CompletionSubscriber, Container, PipelineEvent, SharedBinder};
pub use error::{PipelineError, PipelineResult};
pub use executor::{RunOutcome, RunReport, RunState};
pub use factory::{NodeFactory, NodeFactoryBuilder, Produces, TransformFn, TransformRegistry};
pub use id::{NodeId, RunId};
pub use log::{EntryOutcome, ExecutionLog, FunctionRecord, LogEntry, ProvenanceFile, PROVENANCE_VERSION};
pub use node::{Node, ParamSubscriber, SubscriptionId};
pub use payload::{ArrayPayload, Cell, Column, Payload, PayloadKind, TablePayload, ARRAY_KEY, TABLE_KEY};
pub use signature::{BoundParams, ParamDescriptor, Signature};
pub use status::{PipelineStatus, StatusBoard, StatusSink, TracingStatusSink};
pub use store::PayloadStore;
pub use value::{Param, ParamKind, ParamValue, Params};
