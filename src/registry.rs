//! In-memory runtime type-registry: the reference implementation of the
//! introspection capability.
//!
//! Hosts register each cloneable kind once ([`Metadata`]), create instances,
//! and read/write attributes over the [`Value`] vocabulary. Named ordering
//! rules for sorted containers are registered as comparator functions that
//! receive the registry itself, so a rule can order nodes by their
//! attributes.
//!
//! Persistence frameworks or code generators can supply their own
//! [`ObjectModel`] instead; nothing in the engine depends on this one.

use crate::model::{InstantiationError, Metadata, NodeId, ObjectModel, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Comparator = Box<dyn Fn(&Registry, &Value, &Value) -> Ordering + Send + Sync>;

/// One stored object: its kind name and attribute map.
#[derive(Debug, Clone)]
struct Instance {
    kind: String,
    attrs: HashMap<String, Value>,
}

/// An id-allocating store of typed instances.
///
/// # Invariants
/// - Node ids are unique and never reused within a registry.
/// - An instance's kind never changes after creation.
#[derive(Default)]
pub struct Registry {
    /// Kind name → registered metadata.
    kinds: HashMap<String, Arc<Metadata>>,
    /// Ordering rule name → comparator.
    comparators: HashMap<String, Comparator>,
    /// Node id → stored instance.
    instances: HashMap<NodeId, Instance>,
    /// Next available node id.
    next_id: u64,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds.len())
            .field("comparators", &self.comparators.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cloneable kind. Re-registering a kind replaces its
    /// metadata.
    pub fn register(&mut self, meta: Metadata) {
        self.kinds.insert(meta.kind().to_string(), Arc::new(meta));
    }

    /// Registers a named ordering rule for sorted containers.
    pub fn register_comparator<C>(&mut self, rule: impl Into<String>, cmp: C)
    where
        C: Fn(&Registry, &Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.comparators.insert(rule.into(), Box::new(cmp));
    }

    /// Creates a blank instance of `kind` and returns its id.
    ///
    /// The kind does not need to be registered: instances of unregistered
    /// kinds have no metadata and pass through cloning unchanged.
    pub fn create(&mut self, kind: impl Into<String>) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.instances.insert(
            id,
            Instance {
                kind: kind.into(),
                attrs: HashMap::new(),
            },
        );
        id
    }

    /// Writes an attribute. Writes addressed at unknown nodes are ignored.
    pub fn put(&mut self, node: NodeId, name: &str, value: Value) {
        if let Some(instance) = self.instances.get_mut(&node) {
            instance.attrs.insert(name.to_string(), value);
        }
    }

    /// Reads an attribute; `None` means absent (or unknown node).
    pub fn value(&self, node: NodeId, name: &str) -> Option<Value> {
        self.instances.get(&node)?.attrs.get(name).cloned()
    }

    /// Returns the kind name of a node.
    pub fn kind_of(&self, node: NodeId) -> Option<&str> {
        self.instances.get(&node).map(|instance| instance.kind.as_str())
    }

    /// Checks whether a node exists.
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.instances.contains_key(&node)
    }

    /// Returns the number of stored instances.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.instances.len()
    }
}

impl ObjectModel for Registry {
    fn metadata(&self, node: NodeId) -> Option<Arc<Metadata>> {
        let instance = self.instances.get(&node)?;
        self.kinds.get(&instance.kind).cloned()
    }

    fn get(&self, node: NodeId, name: &str) -> Option<Value> {
        self.value(node, name)
    }

    fn set(&mut self, node: NodeId, name: &str, value: Value) {
        self.put(node, name, value);
    }

    fn construct(&mut self, like: NodeId) -> Result<NodeId, InstantiationError> {
        let kind = self
            .instances
            .get(&like)
            .map(|instance| instance.kind.clone())
            .ok_or_else(|| {
                InstantiationError::new(
                    "<unknown>",
                    format!("{} is not an instance of this registry", like),
                )
            })?;
        Ok(self.create(kind))
    }

    fn compare_named(&self, rule: &str, a: &Value, b: &Value) -> Option<Ordering> {
        self.comparators.get(rule).map(|cmp| cmp(self, a, b))
    }
}
