//! Object-model vocabulary and the capability traits consumed by the engine.
//!
//! The cloning engine never inspects host objects directly. Hosts describe
//! their objects through an [`ObjectModel`]: per-kind [`Metadata`] (which
//! attribute names are scalars, which are relations, which relations own
//! their targets), attribute access over a small [`Value`] vocabulary, and
//! blank-instance construction. Cloning decisions are delegated to a
//! [`PropertyFilter`].
//!
//! Rust has no reflection, so introspection is an explicit capability:
//! per-type registration or a runtime type-registry (see `registry`), never
//! source-level magic.
//!
//! # Citations
//! - Identity-bearing domain objects: Fowler, "Patterns of Enterprise
//!   Application Architecture", Identity Map / Data Mapper (2002)
//! - Capability-style object access: Mark S. Miller, "Robust Composition" (2006)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Identity of a cloneable object within its object model.
///
/// Uses a transparent `u64` wrapper for efficient comparison and hashing.
///
/// # Invariant
/// - `NodeId`s are unique within a given object model.
/// - Equality and hash are based solely on the inner `u64`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new `NodeId` from a raw `u64`.
    ///
    /// The caller must ensure uniqueness within the object model; prefer the
    /// model's own node-creation methods.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw `u64` representation.
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// An opaque leaf value.
///
/// Scalars are shared between original and clone, never deep-copied; the
/// engine only moves them around. Hosts with richer value types map them
/// onto this vocabulary (or onto `Bytes`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Text value.
    Text(String),
    /// Uninterpreted bytes.
    Bytes(Vec<u8>),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Text(t) => write!(f, "{:?}", t),
            Scalar::Bytes(b) => write!(f, "{} bytes", b.len()),
        }
    }
}

/// Ordering rule carried by sorted containers.
///
/// A clone of a sorted container carries the *same* rule as the original;
/// this is what "preserve the ordering rule" means. `Named` rules are
/// resolved through [`ObjectModel::compare_named`]: closures cannot be
/// compared, hashed, or carried by value data, so the rule travels as a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending natural order of [`Value`]s (scalars by value, nodes by id).
    Natural,
    /// Descending natural order.
    Reversed,
    /// A host-defined rule, resolved by the object model.
    Named(String),
}

/// An attribute value.
///
/// The container kinds form a closed taxonomy: ordered sequence, unordered
/// set, sorted set, unordered map, sorted map. Sorted containers carry
/// their [`SortOrder`]. Container elements are expected to be `Node` or
/// `Scalar`; anything else passes through cloning unchanged.
///
/// # Invariants
/// - `Set` holds no two equal values; `Seq` may.
/// - `SortedSet` items and `SortedMap` entries are in rule order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Opaque leaf value, shared on clone.
    Scalar(Scalar),
    /// Reference to an object of the model.
    Node(NodeId),
    /// Ordered sequence; element order is significant and preserved.
    Seq(Vec<Value>),
    /// Unordered set; rebuilt deduplicated.
    Set(Vec<Value>),
    /// Sorted set with an ordering rule.
    SortedSet {
        /// Rule the items are ordered by.
        order: SortOrder,
        /// Items in rule order.
        items: Vec<Value>,
    },
    /// Unordered map of key/value pairs.
    Map(Vec<(Value, Value)>),
    /// Sorted map with an ordering rule over keys.
    SortedMap {
        /// Rule the keys are ordered by.
        order: SortOrder,
        /// Entries in key rule order.
        entries: Vec<(Value, Value)>,
    },
}

impl Value {
    /// Returns the node id if this value is a node reference.
    #[inline]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Convenience constructor for a text scalar.
    #[inline]
    pub fn text(t: impl Into<String>) -> Self {
        Value::Scalar(Scalar::Text(t.into()))
    }

    /// Convenience constructor for an integer scalar.
    #[inline]
    pub fn int(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }
}

impl From<NodeId> for Value {
    #[inline]
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

/// A member of a traversal working set.
///
/// Working sets hold the objects a pattern step operates on: graph nodes,
/// opaque scalars (which explore to nothing), and map-entry pseudo-objects
/// produced by exploring a map relation. An entry exposes exactly two
/// component names, `"key"` and `"value"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    /// A cloneable (or pass-through) object of the model.
    Node(NodeId),
    /// An opaque leaf reached through a relation.
    Scalar(Scalar),
    /// A map entry; its components are the *original* key and value.
    Entry {
        /// Original key of the entry.
        key: Box<Value>,
        /// Original value of the entry.
        value: Box<Value>,
    },
}

impl Item {
    /// Converts a container component into a working-set item.
    ///
    /// Components are `Node` or `Scalar` in practice; a nested container
    /// cannot be explored any further and converts to `None`.
    pub fn from_component(value: &Value) -> Option<Item> {
        match value {
            Value::Node(id) => Some(Item::Node(*id)),
            Value::Scalar(s) => Some(Item::Scalar(s.clone())),
            _ => None,
        }
    }

    /// Returns the node id if this item is a node.
    #[inline]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Item::Node(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<NodeId> for Item {
    #[inline]
    fn from(id: NodeId) -> Self {
        Item::Node(id)
    }
}

/// Per-kind introspection data.
///
/// Attribute names are partitioned into scalars (copied by value when the
/// filter approves) and relations (populated only when reached by a pattern
/// or approved by a deep-clone filter). A relation may carry an inverse
/// name: the back-pointer attribute set on cloned targets to reference the
/// owning clone (owned one-to-many semantics).
///
/// # Invariants
/// - `scalars` and `relations` are disjoint name sets.
/// - Every key of `inverses` is a member of `relations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Kind (type) name.
    kind: String,
    /// Scalar attribute names, sorted.
    scalars: BTreeSet<String>,
    /// Relation attribute names, sorted.
    relations: BTreeSet<String>,
    /// Relation name → inverse (back-pointer) name on the target kind.
    inverses: BTreeMap<String, String>,
    /// Whether the engine may construct blank instances of this kind.
    constructible: bool,
}

impl Metadata {
    /// Creates metadata for a constructible kind with no attributes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            scalars: BTreeSet::new(),
            relations: BTreeSet::new(),
            inverses: BTreeMap::new(),
            constructible: true,
        }
    }

    /// Adds a scalar attribute name.
    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.scalars.insert(name.into());
        self
    }

    /// Adds a relation attribute name.
    pub fn relation(mut self, name: impl Into<String>) -> Self {
        self.relations.insert(name.into());
        self
    }

    /// Adds an owned relation: targets reached through `name` get their
    /// `inverse` attribute pointed back at the owning clone.
    pub fn owned_relation(mut self, name: impl Into<String>, inverse: impl Into<String>) -> Self {
        let name = name.into();
        self.relations.insert(name.clone());
        self.inverses.insert(name, inverse.into());
        self
    }

    /// Marks the kind as non-constructible.
    ///
    /// Cloning an instance of a sealed kind fails with
    /// [`InstantiationError`]; use for kinds the engine must never copy.
    pub fn sealed(mut self) -> Self {
        self.constructible = false;
        self
    }

    /// Returns the kind name.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the scalar attribute names in sorted order.
    pub fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.scalars.iter().map(String::as_str)
    }

    /// Returns the relation attribute names in sorted order.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.iter().map(String::as_str)
    }

    /// Checks whether `name` is a relation of this kind.
    #[inline]
    pub fn is_relation(&self, name: &str) -> bool {
        self.relations.contains(name)
    }

    /// Returns the inverse (back-pointer) name of an owned relation.
    #[inline]
    pub fn inverse_of(&self, relation: &str) -> Option<&str> {
        self.inverses.get(relation).map(String::as_str)
    }

    /// Returns whether the engine may construct blank instances.
    #[inline]
    pub fn is_constructible(&self) -> bool {
        self.constructible
    }
}

/// Error returned when a blank instance cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantiationError {
    /// Kind that failed to construct.
    kind: String,
    /// Host-supplied reason.
    reason: String,
}

impl InstantiationError {
    /// Creates a new instantiation error.
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Returns the kind that failed to construct.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the host-supplied reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for InstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot construct instance of {:?}: {}", self.kind, self.reason)
    }
}

impl std::error::Error for InstantiationError {}

/// The introspection capability consumed by the engine.
///
/// # Semantic contract
/// - `metadata` returns `None` for nodes that are not a cloneable kind;
///   such nodes pass through cloning unchanged (shared, not copied).
/// - `get` returns `None` for an absent attribute; the engine leaves the
///   corresponding attribute of the clone unset.
/// - `construct` produces a blank instance of the same kind as `like`,
///   with every attribute unset.
/// - `compare_named` resolves host-defined ordering rules; returning `None`
///   tells the engine the rule is unknown, which aborts reconstruction of
///   the sorted container referencing it.
pub trait ObjectModel {
    /// Returns the metadata of `node`, or `None` for non-cloneable kinds.
    fn metadata(&self, node: NodeId) -> Option<Arc<Metadata>>;

    /// Reads an attribute; `None` means absent/unset.
    fn get(&self, node: NodeId, name: &str) -> Option<Value>;

    /// Writes an attribute.
    fn set(&mut self, node: NodeId, name: &str, value: Value);

    /// Constructs a blank instance of the same kind as `like`.
    fn construct(&mut self, like: NodeId) -> Result<NodeId, InstantiationError>;

    /// Resolves a named ordering rule. `None` means the rule is unknown.
    fn compare_named(&self, _rule: &str, _a: &Value, _b: &Value) -> Option<Ordering> {
        None
    }

    /// Compares two values under a sort order.
    ///
    /// `Natural` and `Reversed` use the total order of [`Value`]; `Named`
    /// delegates to [`ObjectModel::compare_named`].
    fn compare(&self, order: &SortOrder, a: &Value, b: &Value) -> Option<Ordering> {
        match order {
            SortOrder::Natural => Some(a.cmp(b)),
            SortOrder::Reversed => Some(b.cmp(a)),
            SortOrder::Named(rule) => self.compare_named(rule, a, b),
        }
    }
}

/// The filter capability: decides, per (object, attribute name), whether a
/// scalar is copied or a relation is followed during deep cloning.
///
/// Implementations must be pure; the engine may evaluate each pair at most
/// once per session and reuse the answer.
pub trait PropertyFilter {
    /// Returns whether the attribute `name` of `node` is approved.
    fn approves(&self, node: NodeId, name: &str) -> bool;
}

/// The default filter: approves every attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PropertyFilter for AllowAll {
    #[inline]
    fn approves(&self, _node: NodeId, _name: &str) -> bool {
        true
    }
}

impl<F> PropertyFilter for F
where
    F: Fn(NodeId, &str) -> bool,
{
    #[inline]
    fn approves(&self, node: NodeId, name: &str) -> bool {
        self(node, name)
    }
}
