//! Node: one parameterized step of a pipeline.
//!
//! A `Node` is a cheap-to-clone handle. The same handle is held by the
//! container's pending queue, by any control bound to it and by user code,
//! so an edit made through one of them is seen by all.
//!
//! Construction-time arguments never change. The resolved parameter mapping
//! is re-derived from them whenever the node is chained, and mutated by
//! [`Node::set_param`] afterwards.

use crate::controls::ControlSpec;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::factory::NodeFactory;
use crate::pipeline::id::NodeId;
use crate::pipeline::signature::BoundParams;
use crate::pipeline::value::{ParamValue, Params};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Callback run after every parameter change.
pub type ParamSubscriber = Rc<dyn Fn()>;

/// Returned by [`Node::subscribe`]; hands the subscription back to [`Node::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct NodeInner {
    id: NodeId,
    name: String,
    factory: NodeFactory,
    args: Vec<ParamValue>,
    kwargs: Params,
    params: RefCell<Params>,
    subscribers: RefCell<Vec<(SubscriptionId, ParamSubscriber)>>,
    next_subscription: Cell<u64>,
}

/// Handle to a pipeline step.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

impl Node {
    pub(crate) fn new(factory: NodeFactory, args: Vec<ParamValue>, kwargs: Params) -> Self {
        let name = factory.name().to_string();
        Self::build(name, factory, args, kwargs)
    }

    fn build(name: String, factory: NodeFactory, args: Vec<ParamValue>, kwargs: Params) -> Self {
        let params = factory.signature().resolve(&args, &kwargs);
        Self {
            inner: Rc::new(NodeInner {
                id: NodeId::next(),
                name,
                factory,
                args,
                kwargs,
                params: RefCell::new(params),
                subscribers: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
            }),
        }
    }

    /// A copy of this node under a different display name (new identity, no subscribers).
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self::build(
            name.into(),
            self.inner.factory.clone(),
            self.inner.args.clone(),
            self.inner.kwargs.clone(),
        )
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn factory(&self) -> &NodeFactory {
        &self.inner.factory
    }

    pub fn args(&self) -> &[ParamValue] {
        &self.inner.args
    }

    pub fn kwargs(&self) -> &Params {
        &self.inner.kwargs
    }

    /// Snapshot of the current resolved parameters.
    pub fn params(&self) -> Params {
        self.inner.params.borrow().clone()
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.inner.params.borrow().get(name).cloned()
    }

    /// Re-derive the resolved parameters from the construction arguments.
    ///
    /// Discards edits made through [`Node::set_param`].
    pub fn resolve(&self) -> Params {
        let resolved = self
            .inner
            .factory
            .signature()
            .resolve(&self.inner.args, &self.inner.kwargs);
        *self.inner.params.borrow_mut() = resolved.clone();
        resolved
    }

    /// Update one parameter, then notify every subscriber in registration order.
    pub fn set_param(&self, name: &str, value: impl Into<ParamValue>) -> Option<ParamValue> {
        let value = value.into();
        tracing::debug!(node = %self.inner.name, param = name, %value, "Parameter edited");
        let previous = self.inner.params.borrow_mut().insert(name, value);

        // Clone the list so a subscriber may subscribe further callbacks.
        let subscribers: Vec<ParamSubscriber> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, sub)| sub.clone())
            .collect();
        for sub in subscribers {
            sub();
        }
        previous
    }

    pub fn subscribe(&self, callback: impl Fn() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner.subscribers.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Check the current parameters against the declared signature.
    pub fn bind(&self) -> PipelineResult<BoundParams> {
        let params = self.inner.params.borrow();
        self.inner
            .factory
            .signature()
            .bind(&self.inner.name, &params, self.inner.args.len())
    }

    /// Editable parameters of this node, as handed to a control binder.
    pub fn control_spec(&self) -> ControlSpec {
        ControlSpec::for_node(self)
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("params", &*self.inner.params.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::signature::ParamDescriptor;
    use crate::pipeline::value::ParamKind;

    fn factory() -> NodeFactory {
        NodeFactory::builder("f")
            .param(ParamDescriptor::required("a", ParamKind::Str))
            .param(ParamDescriptor::optional("b", ParamKind::Int, 10))
            .build(|p, _| Ok(p.clone()))
    }

    #[test]
    fn test_node_takes_factory_name_and_resolves() {
        let node = factory().node(vec!["x".into(), 3.into()]);
        assert_eq!(node.name(), "f");
        assert_eq!(node.param("a"), Some(ParamValue::from("x")));
        assert_eq!(node.param("b"), Some(ParamValue::Int(3)));
    }

    #[test]
    fn test_nodes_from_same_factory_do_not_share_params() {
        let f = factory();
        let n1 = f.node(vec!["x".into()]);
        let n2 = f.node(vec!["y".into()]);
        n1.set_param("a", "changed");
        assert_eq!(n2.param("a"), Some(ParamValue::from("y")));
        assert_ne!(n1.id(), n2.id());
    }

    #[test]
    fn test_set_param_notifies_in_order() {
        let node = factory().node(vec!["x".into()]);
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            node.subscribe(move || log.borrow_mut().push(i));
        }
        let prev = node.set_param("b", 5);
        assert_eq!(prev, None);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(node.param("b"), Some(ParamValue::Int(5)));
    }

    #[test]
    fn test_subscriber_may_subscribe_during_notification() {
        let node = factory().node(vec!["x".into()]);
        let calls = Rc::new(Cell::new(0));
        let handle = node.clone();
        let c = calls.clone();
        node.subscribe(move || {
            c.set(c.get() + 1);
            handle.subscribe(|| {});
        });
        node.set_param("a", "y");
        assert_eq!(calls.get(), 1);
        assert_eq!(node.subscriber_count(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let node = factory().node(vec!["x".into()]);
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let first = node.subscribe(move || c.set(c.get() + 1));
        let second = node.subscribe(|| {});
        assert_ne!(first, second);

        assert!(node.unsubscribe(first));
        assert!(!node.unsubscribe(first));
        node.set_param("b", 1);
        assert_eq!(calls.get(), 0);
        assert_eq!(node.subscriber_count(), 1);
    }

    #[test]
    fn test_resolve_discards_edits() {
        let node = factory().node(vec!["x".into()]);
        node.set_param("a", "edited");
        node.resolve();
        assert_eq!(node.param("a"), Some(ParamValue::from("x")));
    }

    #[test]
    fn test_with_name_gets_new_identity() {
        let node = factory().node(vec!["x".into()]);
        let id = node.id();
        let renamed = node.with_name("custom");
        assert_eq!(renamed.name(), "custom");
        assert_ne!(renamed.id(), id);
    }
}
