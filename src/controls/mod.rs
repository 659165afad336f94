//! Interactive controls for node parameters.
//!
//! When a container chains a node with controls enabled, it describes the
//! node's editable parameters as a [`ControlSpec`] and hands it, together with
//! the node handle, to its [`ControlBinder`]. The binder renders one control per
//! field and writes edits back with [`Node::set_param`], which queues a re-run
//! on every container the node is chained to.
//!
//! Only string, integer and float parameters are representable. Other kinds
//! are listed in [`ControlSpec::skipped`] and get no control.

pub mod egui_panel;

pub use egui_panel::EguiControlPanel;

use crate::pipeline::id::NodeId;
use crate::pipeline::node::Node;
use crate::pipeline::value::{ParamKind, ParamValue};

/// Widget family for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Integer,
    Float,
}

impl ControlKind {
    pub fn for_param(kind: ParamKind) -> Option<Self> {
        match kind {
            ParamKind::Str => Some(ControlKind::Text),
            ParamKind::Int => Some(ControlKind::Integer),
            ParamKind::Float => Some(ControlKind::Float),
            ParamKind::Bool | ParamKind::FloatList => None,
        }
    }
}

/// One editable parameter, pre-filled with the node's current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlField {
    pub name: String,
    pub kind: ControlKind,
    pub value: ParamValue,
}

/// Everything a binder needs to render controls for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub node_id: NodeId,
    pub title: String,
    pub controls: Vec<ControlField>,
    /// Declared parameters with no representable control.
    pub skipped: Vec<String>,
}

impl ControlSpec {
    pub fn for_node(node: &Node) -> Self {
        let mut controls = Vec::new();
        let mut skipped = Vec::new();

        for descriptor in node.factory().signature().descriptors() {
            let Some(kind) = ControlKind::for_param(descriptor.kind) else {
                tracing::debug!(
                    "No control for '{}.{}' ({})",
                    node.name(),
                    descriptor.name,
                    descriptor.kind
                );
                skipped.push(descriptor.name.clone());
                continue;
            };

            let value = node
                .param(&descriptor.name)
                .or_else(|| descriptor.default.clone())
                .unwrap_or_else(|| empty_value(kind));

            controls.push(ControlField {
                name: descriptor.name.clone(),
                kind,
                value,
            });
        }

        Self {
            node_id: node.id(),
            title: node.name().to_string(),
            controls,
            skipped,
        }
    }

    pub fn field(&self, name: &str) -> Option<&ControlField> {
        self.controls.iter().find(|c| c.name == name)
    }
}

fn empty_value(kind: ControlKind) -> ParamValue {
    match kind {
        ControlKind::Text => ParamValue::Str(String::new()),
        ControlKind::Integer => ParamValue::Int(0),
        ControlKind::Float => ParamValue::Float(0.0),
    }
}

/// Receives control specs as nodes are chained.
#[cfg_attr(test, mockall::automock)]
pub trait ControlBinder {
    fn bind(&mut self, node: &Node, spec: ControlSpec);
}

/// Keeps every spec it is given; used by headless sessions and tests.
#[derive(Debug, Default)]
pub struct RecordingBinder {
    specs: Vec<ControlSpec>,
    nodes: Vec<Node>,
}

impl RecordingBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn specs(&self) -> &[ControlSpec] {
        &self.specs
    }

    /// Bound node handles, in binding order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Write `value` through the node bound under `node_id`, as a control would.
    pub fn edit(&self, node_id: NodeId, name: &str, value: impl Into<ParamValue>) -> bool {
        match self.nodes.iter().find(|n| n.id() == node_id) {
            Some(node) => {
                node.set_param(name, value);
                true
            }
            None => false,
        }
    }
}

impl ControlBinder for RecordingBinder {
    fn bind(&mut self, node: &Node, spec: ControlSpec) {
        self.specs.push(spec);
        self.nodes.push(node.clone());
    }
}
