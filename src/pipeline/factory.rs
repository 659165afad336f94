//! Node factories: turning a transform function into Node constructors.
//!
//! A [`NodeFactory`] owns one transform function together with everything the
//! engine needs to know about it up front: its name, declared parameters,
//! which payload kinds it accepts and produces, and its provenance (version,
//! optional source text, fingerprint).
//!
//! ```ignore
//! let scale = NodeFactory::builder("scale")
//!     .param(ParamDescriptor::required("factor", ParamKind::Float))
//!     .accepts(&[PayloadKind::Array])
//!     .build(|payload, params| { /* ... */ });
//!
//! let node = scale.node(args![2.0]);
//! ```

use crate::pipeline::log::FunctionRecord;
use crate::pipeline::node::Node;
use crate::pipeline::payload::{Payload, PayloadKind};
use crate::pipeline::signature::{BoundParams, ParamDescriptor, Signature};
use crate::pipeline::value::{ParamValue, Params};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Signature every transform function has: borrow the incoming payload, return the next one.
pub type TransformFn = dyn Fn(&Payload, &BoundParams) -> anyhow::Result<Payload> + Send + Sync;

/// Which payload kind a transform hands to the next node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produces {
    /// Same kind as it received.
    Same,
    Kind(PayloadKind),
}

struct FactoryInner {
    name: String,
    version: u32,
    signature: Signature,
    /// Empty = any kind.
    accepts: Vec<PayloadKind>,
    produces: Produces,
    source: Option<String>,
    fingerprint: String,
    func: Box<TransformFn>,
}

/// A registered transform that produces [`Node`]s.
#[derive(Clone)]
pub struct NodeFactory {
    inner: Arc<FactoryInner>,
}

impl NodeFactory {
    pub fn builder(name: impl Into<String>) -> NodeFactoryBuilder {
        NodeFactoryBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn version(&self) -> u32 {
        self.inner.version
    }

    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    pub fn source(&self) -> Option<&str> {
        self.inner.source.as_deref()
    }

    pub fn produces(&self) -> Produces {
        self.inner.produces
    }

    /// Hex SHA-256 over name, version and source (or the signature when there is no source).
    pub fn fingerprint(&self) -> &str {
        &self.inner.fingerprint
    }

    pub fn accepts(&self, kind: PayloadKind) -> bool {
        self.inner.accepts.is_empty() || self.inner.accepts.contains(&kind)
    }

    /// Human-readable list of accepted kinds, for error messages.
    pub fn accepts_label(&self) -> String {
        if self.inner.accepts.is_empty() {
            return "any".to_string();
        }
        self.inner
            .accepts
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Kind this transform hands on when given `input`.
    pub fn output_kind(&self, input: PayloadKind) -> PayloadKind {
        match self.inner.produces {
            Produces::Same => input,
            Produces::Kind(k) => k,
        }
    }

    /// Create a Node from positional arguments.
    pub fn node(&self, args: Vec<ParamValue>) -> Node {
        Node::new(self.clone(), args, Params::new())
    }

    /// Create a Node from positional and keyword arguments.
    pub fn node_with(&self, args: Vec<ParamValue>, kwargs: Params) -> Node {
        Node::new(self.clone(), args, kwargs)
    }

    pub(crate) fn call(&self, payload: &Payload, params: &BoundParams) -> anyhow::Result<Payload> {
        (self.inner.func)(payload, params)
    }

    pub fn record(&self) -> FunctionRecord {
        FunctionRecord {
            name: self.inner.name.clone(),
            version: self.inner.version,
            fingerprint: self.inner.fingerprint.clone(),
            source: self.inner.source.clone(),
        }
    }
}

impl fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeFactory")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version)
            .field("signature", &self.inner.signature)
            .field("produces", &self.inner.produces)
            .finish()
    }
}

/// Builder for [`NodeFactory`].
pub struct NodeFactoryBuilder {
    name: String,
    version: u32,
    signature: Signature,
    accepts: Vec<PayloadKind>,
    produces: Produces,
    source: Option<String>,
}

impl NodeFactoryBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            signature: Signature::default(),
            accepts: Vec::new(),
            produces: Produces::Same,
            source: None,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn param(mut self, descriptor: ParamDescriptor) -> Self {
        self.signature = self.signature.param(descriptor);
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn accepts(mut self, kinds: &[PayloadKind]) -> Self {
        self.accepts = kinds.to_vec();
        self
    }

    pub fn produces(mut self, produces: Produces) -> Self {
        self.produces = produces;
        self
    }

    /// Literal source text kept in the provenance log.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn build<F>(self, func: F) -> NodeFactory
    where
        F: Fn(&Payload, &BoundParams) -> anyhow::Result<Payload> + Send + Sync + 'static,
    {
        let fingerprint = compute_fingerprint(&self.name, self.version, &self.signature, self.source.as_deref());
        NodeFactory {
            inner: Arc::new(FactoryInner {
                name: self.name,
                version: self.version,
                signature: self.signature,
                accepts: self.accepts,
                produces: self.produces,
                source: self.source,
                fingerprint,
                func: Box::new(func),
            }),
        }
    }
}

fn compute_fingerprint(name: &str, version: u32, signature: &Signature, source: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(version.to_le_bytes());
    match source {
        Some(src) => hasher.update(src.as_bytes()),
        None => {
            for d in signature.descriptors() {
                hasher.update(d.name.as_bytes());
                hasher.update(d.kind.display_name().as_bytes());
            }
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Name → factory lookup, used to rebuild pipelines from saved logs.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    factories: BTreeMap<String, NodeFactory>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one with the same name.
    pub fn register(&mut self, factory: NodeFactory) -> &mut Self {
        if self.factories.contains_key(factory.name()) {
            tracing::debug!("Replacing registered transform '{}'", factory.name());
        }
        self.factories.insert(factory.name().to_string(), factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<&NodeFactory> {
        self.factories.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::value::ParamKind;

    fn identity(name: &str) -> NodeFactory {
        NodeFactory::builder(name)
            .param(ParamDescriptor::required("a", ParamKind::Int))
            .build(|p, _| Ok(p.clone()))
    }

    #[test]
    fn test_accepts_defaults_to_any() {
        let f = identity("id");
        assert!(f.accepts(PayloadKind::Table));
        assert!(f.accepts(PayloadKind::Array));
        assert_eq!(f.accepts_label(), "any");
        assert_eq!(f.output_kind(PayloadKind::Array), PayloadKind::Array);
    }

    #[test]
    fn test_declared_kinds() {
        let f = NodeFactory::builder("to_array")
            .accepts(&[PayloadKind::Table])
            .produces(Produces::Kind(PayloadKind::Array))
            .build(|p, _| Ok(p.clone()));
        assert!(!f.accepts(PayloadKind::Array));
        assert_eq!(f.accepts_label(), "table");
        assert_eq!(f.output_kind(PayloadKind::Table), PayloadKind::Array);
    }

    #[test]
    fn test_fingerprint_tracks_source_and_version() {
        let a = NodeFactory::builder("f").source("x + 1").build(|p, _| Ok(p.clone()));
        let b = NodeFactory::builder("f").source("x + 2").build(|p, _| Ok(p.clone()));
        let c = NodeFactory::builder("f").source("x + 1").version(2).build(|p, _| Ok(p.clone()));
        let a2 = NodeFactory::builder("f").source("x + 1").build(|p, _| Ok(p.clone()));

        assert_eq!(a.fingerprint(), a2.fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_registry_lookup() {
        let mut reg = TransformRegistry::new();
        reg.register(identity("one")).register(identity("two"));
        assert_eq!(reg.len(), 2);
        assert!(reg.get("one").is_some());
        assert!(reg.get("three").is_none());
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["one", "two"]);
    }
}
