//! Pipeline-specific error types.

use crate::pipeline::id::NodeId;
use crate::pipeline::payload::PayloadKind;
use crate::pipeline::value::ParamKind;
use thiserror::Error;

/// Errors that can occur while building, binding or replaying a pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Unknown transform: {0}")]
    UnknownTransform(String),

    #[error("Node '{node}' has no parameter named '{param}'")]
    UnknownParameter { node: String, param: String },

    #[error("Node '{node}' takes {expected} positional argument(s) but {given} were given")]
    TooManyArguments {
        node: String,
        expected: usize,
        given: usize,
    },

    #[error("Node '{node}' is missing required argument '{param}'")]
    MissingArgument { node: String, param: String },

    #[error("Node '{node}' parameter '{param}' expects {expected}, got {found}")]
    ParamType {
        node: String,
        param: String,
        expected: ParamKind,
        found: ParamKind,
    },

    #[error("Node '{node}' accepts {accepts} payloads but received {found}")]
    IncompatiblePayload {
        node: String,
        accepts: String,
        found: PayloadKind,
    },

    #[error("Node {0} is not in the pending queue")]
    NodeNotQueued(NodeId),

    #[error("Replay error: {0}")]
    Replay(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
