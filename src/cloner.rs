//! The clone engine: identity-mapped construction, scalar copy, container
//! reconstruction, and inverse relinking.
//!
//! A [`Cloner`] is one clone session: an exclusive borrow of the object
//! model plus the per-session state (identity map, explored cache,
//! deep-clone visited set). It implements the [`Explorer`] capability, so
//! the same session serves both pattern-driven and filter-driven traversal.
//! Sessions are cheap; the public functions build a fresh one per call (or
//! per batch), which is what makes them safe to use from many threads. The
//! session itself must never be shared.
//!
//! The cycle breaker is an ordering rule: a blank instance is constructed
//! and registered in the identity map *before* any of its relations are
//! explored. A reentrant request for the same original, even one made while
//! populating that original's own relations, finds the registered clone and
//! stops recursing.
//!
//! # Citations
//! - Identity Map: Fowler, "Patterns of Enterprise Application
//!   Architecture" (2002)

use crate::explore::{deep_explore, Explorer, GraphExplorer};
use crate::model::{
    AllowAll, InstantiationError, Item, NodeId, ObjectModel, PropertyFilter, SortOrder, Value,
};
use crate::pattern::PatternSyntaxError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Error type for clone operations.
///
/// Every variant is local to one clone invocation; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloneError {
    /// The pattern string failed to compile.
    Pattern(PatternSyntaxError),
    /// A map entry was asked for a component other than `"key"`/`"value"`.
    UnsupportedProperty {
        /// The rejected component name.
        property: String,
    },
    /// A sorted container cannot be rebuilt because its ordering rule is
    /// unknown to the object model; the engine will not guess a substitute.
    UnsupportedContainer {
        /// Relation holding the container.
        relation: String,
        /// The unresolvable rule.
        rule: String,
    },
    /// A blank instance could not be constructed; aborts the session.
    Instantiation(InstantiationError),
}

impl fmt::Display for CloneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloneError::Pattern(err) => write!(f, "invalid pattern: {}", err),
            CloneError::UnsupportedProperty { property } => {
                write!(
                    f,
                    "map entries expose only \"key\" and \"value\", not {:?}",
                    property
                )
            }
            CloneError::UnsupportedContainer { relation, rule } => {
                write!(
                    f,
                    "relation {:?} uses ordering rule {:?} unknown to the object model",
                    relation, rule
                )
            }
            CloneError::Instantiation(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CloneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CloneError::Pattern(err) => Some(err),
            CloneError::Instantiation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PatternSyntaxError> for CloneError {
    fn from(err: PatternSyntaxError) -> Self {
        CloneError::Pattern(err)
    }
}

impl From<InstantiationError> for CloneError {
    fn from(err: InstantiationError) -> Self {
        CloneError::Instantiation(err)
    }
}

/// One clone session over an object model.
///
/// # Invariants
/// - The identity map never holds two clones for one original.
/// - The explored cache entry for `(item, relation)` is computed at most
///   once per session, including absent (`None`) results.
/// - Not safe to share across threads; build one per logical clone call.
pub struct Cloner<'m, M, F = AllowAll> {
    model: &'m mut M,
    filter: F,
    /// Original → clone.
    identity: HashMap<NodeId, NodeId>,
    /// (item, relation) → explored originals, memoized.
    explored: HashMap<(Item, String), Option<Vec<Item>>>,
    /// Deep-clone cycle guard, shared across a batch of roots.
    visited: HashSet<Item>,
}

impl<'m, M: ObjectModel> Cloner<'m, M, AllowAll> {
    /// Creates a session that copies every scalar attribute.
    pub fn new(model: &'m mut M) -> Self {
        Self::with_filter(model, AllowAll)
    }
}

impl<'m, M: ObjectModel, F: PropertyFilter> Cloner<'m, M, F> {
    /// Creates a session with a property filter.
    pub fn with_filter(model: &'m mut M, filter: F) -> Self {
        Self {
            model,
            filter,
            identity: HashMap::new(),
            explored: HashMap::new(),
            visited: HashSet::new(),
        }
    }

    /// Clones `root`, populating the relations reached by `patterns`.
    ///
    /// Patterns are applied in order against the same session, so their
    /// reached sets overlay; scalar copying is governed by the filter.
    pub fn clone_node(&mut self, root: NodeId, patterns: &[&str]) -> Result<NodeId, CloneError> {
        debug!(root = %root, patterns = patterns.len(), "pattern clone");
        for pattern in patterns {
            let explorer = GraphExplorer::new(pattern)?;
            explorer.explore(Item::Node(root), self)?;
        }
        self.clone_of(root)
    }

    /// Clones `root`, populating every relation the filter approves, to
    /// unbounded depth.
    pub fn deep_clone_node(&mut self, root: NodeId) -> Result<NodeId, CloneError> {
        debug!(root = %root, "deep clone");
        let mut visited = std::mem::take(&mut self.visited);
        let walked = deep_explore(Item::Node(root), &mut visited, self);
        self.visited = visited;
        walked?;
        self.clone_of(root)
    }

    /// Returns (or makes) the clone of `original`.
    ///
    /// Non-cloneable originals (no metadata) pass through unchanged. For
    /// cloneable ones: construct a blank instance, copy the filter-approved
    /// scalars, register original→clone, return. Registration happens
    /// before any relation of the clone is populated.
    pub fn clone_of(&mut self, original: NodeId) -> Result<NodeId, CloneError> {
        if let Some(&clone) = self.identity.get(&original) {
            return Ok(clone);
        }
        let Some(meta) = self.model.metadata(original) else {
            return Ok(original);
        };
        if !meta.is_constructible() {
            return Err(InstantiationError::new(meta.kind(), "kind is sealed").into());
        }
        let clone = self.model.construct(original)?;
        for name in meta.scalar_names() {
            if self.filter.approves(original, name) {
                if let Some(value) = self.model.get(original, name) {
                    self.model.set(clone, name, value);
                }
            }
        }
        self.identity.insert(original, clone);
        Ok(clone)
    }

    /// Returns the original→clone map accumulated by this session.
    pub fn identity_map(&self) -> &HashMap<NodeId, NodeId> {
        &self.identity
    }

    /// Consumes the session, yielding the original→clone map.
    pub fn into_identity_map(self) -> HashMap<NodeId, NodeId> {
        self.identity
    }

    /// Clones a value: node references resolve through the identity map,
    /// everything else is shared.
    fn clone_value(&mut self, value: &Value) -> Result<Value, CloneError> {
        match value {
            Value::Node(id) => Ok(Value::Node(self.clone_of(*id)?)),
            other => Ok(other.clone()),
        }
    }

    /// Points the inverse relation of a cloned element back at the owning
    /// clone. Applies only when the element was actually cloned; elements
    /// that passed through unchanged keep their own links.
    fn relink(&mut self, original: &Value, cloned: &Value, inverse: Option<&str>, owner: NodeId) {
        if let (Some(inverse), Value::Node(cloned_id)) = (inverse, cloned) {
            if cloned != original {
                self.model.set(*cloned_id, inverse, Value::Node(owner));
            }
        }
    }

    fn compare(
        &self,
        relation: &str,
        order: &SortOrder,
        a: &Value,
        b: &Value,
    ) -> Result<Ordering, CloneError> {
        self.model.compare(order, a, b).ok_or_else(|| {
            let rule = match order {
                SortOrder::Named(rule) => rule.clone(),
                other => format!("{:?}", other),
            };
            CloneError::UnsupportedContainer {
                relation: relation.to_string(),
                rule,
            }
        })
    }

    /// Inserts into a rule-ordered vector; rule-equal duplicates collapse.
    fn sorted_insert(
        &self,
        relation: &str,
        order: &SortOrder,
        out: &mut Vec<Value>,
        value: Value,
    ) -> Result<(), CloneError> {
        let mut at = out.len();
        for (i, existing) in out.iter().enumerate() {
            match self.compare(relation, order, &value, existing)? {
                Ordering::Less => {
                    at = i;
                    break;
                }
                Ordering::Equal => return Ok(()),
                Ordering::Greater => {}
            }
        }
        out.insert(at, value);
        Ok(())
    }

    /// Inserts into a key-ordered entry vector; rule-equal keys collapse.
    fn sorted_insert_entry(
        &self,
        relation: &str,
        order: &SortOrder,
        out: &mut Vec<(Value, Value)>,
        entry: (Value, Value),
    ) -> Result<(), CloneError> {
        let mut at = out.len();
        for (i, (key, _)) in out.iter().enumerate() {
            match self.compare(relation, order, &entry.0, key)? {
                Ordering::Less => {
                    at = i;
                    break;
                }
                Ordering::Equal => return Ok(()),
                Ordering::Greater => {}
            }
        }
        out.insert(at, entry);
        Ok(())
    }

    fn explore_uncached(
        &mut self,
        item: &Item,
        relation: &str,
    ) -> Result<Option<Vec<Item>>, CloneError> {
        match item {
            Item::Entry { key, value } => match relation {
                "key" => Ok(Item::from_component(key).map(|component| vec![component])),
                "value" => Ok(Item::from_component(value).map(|component| vec![component])),
                other => Err(CloneError::UnsupportedProperty {
                    property: other.to_string(),
                }),
            },
            Item::Scalar(_) => Ok(None),
            Item::Node(id) => self.explore_node(*id, relation),
        }
    }

    /// Explores one relation of a node: obtains the owner's clone, rebuilds
    /// the relation value as a fresh container of the matching kind, writes
    /// it onto the clone, and returns the *original* discovered objects.
    fn explore_node(
        &mut self,
        original: NodeId,
        relation: &str,
    ) -> Result<Option<Vec<Item>>, CloneError> {
        let Some(meta) = self.model.metadata(original) else {
            return Ok(None);
        };
        if !meta.is_relation(relation) {
            return Ok(None);
        }
        let owner = self.clone_of(original)?;
        let Some(value) = self.model.get(original, relation) else {
            return Ok(None);
        };
        let inverse = meta.inverse_of(relation);

        let (rebuilt, discovered) = match value {
            Value::Seq(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                let mut discovered = Vec::with_capacity(items.len());
                for element in &items {
                    let copy = self.clone_value(element)?;
                    self.relink(element, &copy, inverse, owner);
                    cloned.push(copy);
                    discovered.extend(Item::from_component(element));
                }
                (Value::Seq(cloned), discovered)
            }
            Value::Set(items) => {
                let mut present = HashSet::new();
                let mut cloned = Vec::with_capacity(items.len());
                let mut discovered = Vec::with_capacity(items.len());
                for element in &items {
                    let copy = self.clone_value(element)?;
                    self.relink(element, &copy, inverse, owner);
                    if present.insert(copy.clone()) {
                        cloned.push(copy);
                    }
                    discovered.extend(Item::from_component(element));
                }
                (Value::Set(cloned), discovered)
            }
            Value::SortedSet { order, items } => {
                if let Some(first) = items.first() {
                    // Resolve the rule before rebuilding.
                    self.compare(relation, &order, first, first)?;
                }
                let mut cloned = Vec::with_capacity(items.len());
                let mut discovered = Vec::with_capacity(items.len());
                for element in &items {
                    let copy = self.clone_value(element)?;
                    self.relink(element, &copy, inverse, owner);
                    self.sorted_insert(relation, &order, &mut cloned, copy)?;
                    discovered.extend(Item::from_component(element));
                }
                (
                    Value::SortedSet {
                        order,
                        items: cloned,
                    },
                    discovered,
                )
            }
            Value::Map(entries) => {
                let mut present = HashSet::new();
                let mut cloned = Vec::with_capacity(entries.len());
                let mut discovered = Vec::with_capacity(entries.len());
                for (key, val) in &entries {
                    let cloned_key = self.clone_value(key)?;
                    let cloned_val = self.clone_value(val)?;
                    // Owned one-to-many over a map relinks the value side.
                    self.relink(val, &cloned_val, inverse, owner);
                    if present.insert(cloned_key.clone()) {
                        cloned.push((cloned_key, cloned_val));
                    }
                    discovered.push(Item::Entry {
                        key: Box::new(key.clone()),
                        value: Box::new(val.clone()),
                    });
                }
                (Value::Map(cloned), discovered)
            }
            Value::SortedMap { order, entries } => {
                if let Some((first_key, _)) = entries.first() {
                    self.compare(relation, &order, first_key, first_key)?;
                }
                let mut cloned = Vec::with_capacity(entries.len());
                let mut discovered = Vec::with_capacity(entries.len());
                for (key, val) in &entries {
                    let cloned_key = self.clone_value(key)?;
                    let cloned_val = self.clone_value(val)?;
                    self.relink(val, &cloned_val, inverse, owner);
                    self.sorted_insert_entry(
                        relation,
                        &order,
                        &mut cloned,
                        (cloned_key, cloned_val),
                    )?;
                    discovered.push(Item::Entry {
                        key: Box::new(key.clone()),
                        value: Box::new(val.clone()),
                    });
                }
                (
                    Value::SortedMap {
                        order,
                        entries: cloned,
                    },
                    discovered,
                )
            }
            Value::Node(target) => {
                let copy = self.clone_of(target)?;
                (Value::Node(copy), vec![Item::Node(target)])
            }
            Value::Scalar(scalar) => {
                let discovered = vec![Item::Scalar(scalar.clone())];
                (Value::Scalar(scalar), discovered)
            }
        };

        self.model.set(owner, relation, rebuilt);
        Ok(Some(discovered))
    }
}

impl<'m, M: ObjectModel, F: PropertyFilter> Explorer for Cloner<'m, M, F> {
    fn explore(&mut self, item: &Item, relation: &str) -> Result<Option<Vec<Item>>, CloneError> {
        let key = (item.clone(), relation.to_string());
        if let Some(cached) = self.explored.get(&key) {
            return Ok(cached.clone());
        }
        let result = self.explore_uncached(item, relation)?;
        self.explored.insert(key, result.clone());
        Ok(result)
    }

    fn approved_relations(&self, item: &Item) -> Vec<String> {
        let Some(node) = item.as_node() else {
            return Vec::new();
        };
        let Some(meta) = self.model.metadata(node) else {
            return Vec::new();
        };
        meta.relation_names()
            .filter(|name| self.filter.approves(node, name))
            .map(str::to_string)
            .collect()
    }
}

/// Clones `root` with all scalars copied and relations populated per
/// `patterns`. Builds a fresh session, so concurrent calls over disjoint
/// models are independent.
pub fn clone_node<M: ObjectModel>(
    model: &mut M,
    root: NodeId,
    patterns: &[&str],
) -> Result<NodeId, CloneError> {
    Cloner::new(model).clone_node(root, patterns)
}

/// Clones `root` with scalar copying governed by `filter` and relations
/// populated per `patterns`.
pub fn clone_node_with<M: ObjectModel, F: PropertyFilter>(
    model: &mut M,
    root: NodeId,
    filter: F,
    patterns: &[&str],
) -> Result<NodeId, CloneError> {
    Cloner::with_filter(model, filter).clone_node(root, patterns)
}

/// Clones a batch of roots in one session; overlapping subgraphs share
/// clones across the whole batch. Clones are returned in root order.
pub fn clone_nodes<M: ObjectModel>(
    model: &mut M,
    roots: &[NodeId],
    patterns: &[&str],
) -> Result<Vec<NodeId>, CloneError> {
    let mut cloner = Cloner::new(model);
    roots
        .iter()
        .map(|&root| cloner.clone_node(root, patterns))
        .collect()
}

/// Batch variant of [`clone_node_with`]: one session, one filter.
pub fn clone_nodes_with<M: ObjectModel, F: PropertyFilter>(
    model: &mut M,
    roots: &[NodeId],
    filter: F,
    patterns: &[&str],
) -> Result<Vec<NodeId>, CloneError> {
    let mut cloner = Cloner::with_filter(model, filter);
    roots
        .iter()
        .map(|&root| cloner.clone_node(root, patterns))
        .collect()
}

/// Clones `root` by filter alone: every approved relation is followed to
/// unbounded depth.
pub fn deep_clone_node<M: ObjectModel, F: PropertyFilter>(
    model: &mut M,
    root: NodeId,
    filter: F,
) -> Result<NodeId, CloneError> {
    Cloner::with_filter(model, filter).deep_clone_node(root)
}

/// Batch variant of [`deep_clone_node`]: one session and one shared visited
/// set for the whole batch.
pub fn deep_clone_nodes<M: ObjectModel, F: PropertyFilter>(
    model: &mut M,
    roots: &[NodeId],
    filter: F,
) -> Result<Vec<NodeId>, CloneError> {
    let mut cloner = Cloner::with_filter(model, filter);
    roots
        .iter()
        .map(|&root| cloner.deep_clone_node(root))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, Scalar};
    use crate::registry::Registry;

    /// A person kind with a scalar, a singular relation, and an owned list.
    fn person_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(
            Metadata::new("person")
                .scalar("name")
                .scalar("secret")
                .relation("partner")
                .owned_relation("children", "parent")
                .relation("parent"),
        );
        registry
    }

    fn person(registry: &mut Registry, name: &str) -> NodeId {
        let node = registry.create("person");
        registry.put(node, "name", Value::text(name));
        node
    }

    #[test]
    fn scalars_copied_relations_left_unset() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        let bob = person(&mut registry, "bob");
        registry.put(alice, "partner", Value::Node(bob));

        let clone = clone_node(&mut registry, alice, &[]).expect("clones");
        assert_ne!(clone, alice);
        assert_eq!(registry.value(clone, "name"), Some(Value::text("alice")));
        // No pattern reached "partner": the clone's relation stays unset.
        assert_eq!(registry.value(clone, "partner"), None);
    }

    #[test]
    fn filter_vetoes_scalar_copy() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        registry.put(alice, "secret", Value::text("hunter2"));

        let filter = |_: NodeId, name: &str| name != "secret";
        let clone = clone_node_with(&mut registry, alice, filter, &[]).expect("clones");
        assert_eq!(registry.value(clone, "name"), Some(Value::text("alice")));
        // The vetoed scalar keeps its post-construction default (unset).
        assert_eq!(registry.value(clone, "secret"), None);
    }

    #[test]
    fn singular_relation_cloned_directly() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        let bob = person(&mut registry, "bob");
        registry.put(alice, "partner", Value::Node(bob));

        let clone = clone_node(&mut registry, alice, &["partner"]).expect("clones");
        let partner = registry
            .value(clone, "partner")
            .and_then(|v| v.as_node())
            .expect("partner populated");
        assert_ne!(partner, bob);
        assert_eq!(registry.value(partner, "name"), Some(Value::text("bob")));
    }

    #[test]
    fn self_reference_terminates_and_points_at_clone() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        registry.put(alice, "partner", Value::Node(alice));

        let clone = clone_node(&mut registry, alice, &["partner"]).expect("clones");
        // The reentrant clone request found the registered clone.
        assert_eq!(registry.value(clone, "partner"), Some(Value::Node(clone)));
    }

    #[test]
    fn mutual_cycle_terminates() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        let bob = person(&mut registry, "bob");
        registry.put(alice, "partner", Value::Node(bob));
        registry.put(bob, "partner", Value::Node(alice));

        let mut cloner = Cloner::new(&mut registry);
        let alice_clone = cloner.clone_node(alice, &["partner+"]).expect("clones");
        let bob_clone = *cloner.identity_map().get(&bob).expect("bob cloned");
        drop(cloner);
        assert_eq!(registry.value(alice_clone, "partner"), Some(Value::Node(bob_clone)));
        assert_eq!(registry.value(bob_clone, "partner"), Some(Value::Node(alice_clone)));
    }

    #[test]
    fn identity_map_is_single_valued_over_diamonds() {
        let mut registry = person_registry();
        let root = person(&mut registry, "root");
        let left = person(&mut registry, "left");
        let right = person(&mut registry, "right");
        let shared = person(&mut registry, "shared");
        registry.put(root, "children", Value::Seq(vec![Value::Node(left), Value::Node(right)]));
        registry.put(left, "partner", Value::Node(shared));
        registry.put(right, "partner", Value::Node(shared));

        let mut cloner = Cloner::new(&mut registry);
        let root_clone = cloner.clone_node(root, &["children.partner"]).expect("clones");
        let shared_clone = *cloner.identity_map().get(&shared).expect("shared cloned");
        let left_clone = *cloner.identity_map().get(&left).expect("left cloned");
        let right_clone = *cloner.identity_map().get(&right).expect("right cloned");
        drop(cloner);

        // Both paths resolve to the same clone instance.
        assert_eq!(registry.value(left_clone, "partner"), Some(Value::Node(shared_clone)));
        assert_eq!(registry.value(right_clone, "partner"), Some(Value::Node(shared_clone)));
        assert_ne!(root_clone, root);
    }

    #[test]
    fn owned_sequence_relinks_inverse_and_keeps_order() {
        let mut registry = person_registry();
        let parent = person(&mut registry, "parent");
        let first = person(&mut registry, "first");
        let second = person(&mut registry, "second");
        registry.put(
            parent,
            "children",
            Value::Seq(vec![Value::Node(first), Value::Node(second)]),
        );

        let clone = clone_node(&mut registry, parent, &["children"]).expect("clones");
        let Some(Value::Seq(children)) = registry.value(clone, "children") else {
            panic!("children rebuilt as a sequence");
        };
        assert_eq!(children.len(), 2);
        let first_clone = children[0].as_node().expect("node");
        let second_clone = children[1].as_node().expect("node");
        assert_eq!(registry.value(first_clone, "name"), Some(Value::text("first")));
        assert_eq!(registry.value(second_clone, "name"), Some(Value::text("second")));
        // Inverse relation points back at the owning clone, not the original.
        assert_eq!(registry.value(first_clone, "parent"), Some(Value::Node(clone)));
        assert_eq!(registry.value(second_clone, "parent"), Some(Value::Node(clone)));
        // Originals are untouched.
        assert_eq!(registry.value(first, "parent"), None);
    }

    #[test]
    fn set_rebuilt_with_same_cardinality() {
        let mut registry = person_registry();
        let parent = person(&mut registry, "parent");
        let a = person(&mut registry, "a");
        let b = person(&mut registry, "b");
        let c = person(&mut registry, "c");
        registry.put(
            parent,
            "children",
            Value::Set(vec![Value::Node(a), Value::Node(b), Value::Node(c)]),
        );

        let clone = clone_node(&mut registry, parent, &["children"]).expect("clones");
        let Some(Value::Set(children)) = registry.value(clone, "children") else {
            panic!("children rebuilt as a set");
        };
        assert_eq!(children.len(), 3);
        for child in &children {
            let id = child.as_node().expect("node");
            assert_ne!(id, a);
            assert_ne!(id, b);
            assert_ne!(id, c);
        }
    }

    #[test]
    fn sorted_set_preserves_rule_on_cloned_elements() {
        let mut registry = person_registry();
        registry.register_comparator("by_name", |registry: &Registry, a: &Value, b: &Value| {
            let name_of = |v: &Value| {
                v.as_node()
                    .and_then(|id| registry.value(id, "name"))
                    .unwrap_or(Value::Scalar(Scalar::Text(String::new())))
            };
            name_of(a).cmp(&name_of(b))
        });
        let parent = person(&mut registry, "parent");
        let zoe = person(&mut registry, "zoe");
        let ada = person(&mut registry, "ada");
        let mia = person(&mut registry, "mia");
        registry.put(
            parent,
            "children",
            Value::SortedSet {
                order: SortOrder::Named("by_name".into()),
                items: vec![Value::Node(ada), Value::Node(mia), Value::Node(zoe)],
            },
        );

        let clone = clone_node(&mut registry, parent, &["children"]).expect("clones");
        let Some(Value::SortedSet { order, items }) = registry.value(clone, "children") else {
            panic!("children rebuilt as a sorted set");
        };
        // Same rule token, and the cloned elements honor it.
        assert_eq!(order, SortOrder::Named("by_name".into()));
        let names: Vec<Value> = items
            .iter()
            .map(|v| registry.value(v.as_node().expect("node"), "name").expect("named"))
            .collect();
        assert_eq!(
            names,
            vec![Value::text("ada"), Value::text("mia"), Value::text("zoe")]
        );
    }

    #[test]
    fn unknown_ordering_rule_is_refused() {
        let mut registry = person_registry();
        let parent = person(&mut registry, "parent");
        let child = person(&mut registry, "child");
        registry.put(
            parent,
            "children",
            Value::SortedSet {
                order: SortOrder::Named("nobody_registered_this".into()),
                items: vec![Value::Node(child)],
            },
        );

        let err = clone_node(&mut registry, parent, &["children"]).expect_err("refused");
        assert_eq!(
            err,
            CloneError::UnsupportedContainer {
                relation: "children".into(),
                rule: "nobody_registered_this".into(),
            }
        );
    }

    #[test]
    fn map_explored_as_entries_with_key_value_components() {
        let mut registry = person_registry();
        registry.register(Metadata::new("roster").relation("members"));
        let roster = registry.create("roster");
        let alice = person(&mut registry, "alice");
        registry.put(
            roster,
            "members",
            Value::Map(vec![(Value::text("lead"), Value::Node(alice))]),
        );

        let clone = clone_node(&mut registry, roster, &["members.value"]).expect("clones");
        let Some(Value::Map(entries)) = registry.value(clone, "members") else {
            panic!("members rebuilt as a map");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Value::text("lead"));
        let member_clone = entries[0].1.as_node().expect("node");
        assert_ne!(member_clone, alice);
        assert_eq!(registry.value(member_clone, "name"), Some(Value::text("alice")));
    }

    #[test]
    fn sorted_map_keeps_rule_and_key_order() {
        let mut registry = person_registry();
        registry.register(Metadata::new("roster").relation("members"));
        let roster = registry.create("roster");
        let third = person(&mut registry, "third");
        let second = person(&mut registry, "second");
        let first = person(&mut registry, "first");
        registry.put(
            roster,
            "members",
            Value::SortedMap {
                order: SortOrder::Reversed,
                entries: vec![
                    (Value::int(3), Value::Node(third)),
                    (Value::int(2), Value::Node(second)),
                    (Value::int(1), Value::Node(first)),
                ],
            },
        );

        let clone = clone_node(&mut registry, roster, &["members"]).expect("clones");
        let Some(Value::SortedMap { order, entries }) = registry.value(clone, "members") else {
            panic!("members rebuilt as a sorted map");
        };
        assert_eq!(order, SortOrder::Reversed);
        let keys: Vec<&Value> = entries.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![&Value::int(3), &Value::int(2), &Value::int(1)]);
        for (key, val) in &entries {
            let member = val.as_node().expect("node");
            assert_ne!(member, first, "value cloned for key {:?}", key);
            assert_ne!(member, second);
            assert_ne!(member, third);
            assert!(registry.value(member, "name").is_some());
        }
    }

    #[test]
    fn map_entry_rejects_other_components() {
        let mut registry = person_registry();
        registry.register(Metadata::new("roster").relation("members"));
        let roster = registry.create("roster");
        let alice = person(&mut registry, "alice");
        registry.put(
            roster,
            "members",
            Value::Map(vec![(Value::text("lead"), Value::Node(alice))]),
        );

        let err = clone_node(&mut registry, roster, &["members.surprise"]).expect_err("refused");
        assert_eq!(
            err,
            CloneError::UnsupportedProperty {
                property: "surprise".into(),
            }
        );
    }

    #[test]
    fn sealed_kind_aborts_with_instantiation_error() {
        let mut registry = person_registry();
        registry.register(Metadata::new("ledger").scalar("id").sealed());
        let parent = person(&mut registry, "parent");
        let ledger = registry.create("ledger");
        registry.put(parent, "partner", Value::Node(ledger));

        let err = clone_node(&mut registry, parent, &["partner"]).expect_err("refused");
        assert!(matches!(err, CloneError::Instantiation(_)));
    }

    #[test]
    fn unregistered_kind_passes_through_shared() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        let opaque = registry.create("opaque_blob");
        registry.put(alice, "partner", Value::Node(opaque));

        let clone = clone_node(&mut registry, alice, &["partner"]).expect("clones");
        // Not a recognized cloneable kind: shared, not copied.
        assert_eq!(registry.value(clone, "partner"), Some(Value::Node(opaque)));
    }

    #[test]
    fn exploration_is_memoized_per_session() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        let bob = person(&mut registry, "bob");
        registry.put(alice, "partner", Value::Node(bob));

        let mut cloner = Cloner::new(&mut registry);
        let first = cloner
            .explore(&Item::Node(alice), "partner")
            .expect("explores");
        let again = cloner
            .explore(&Item::Node(alice), "partner")
            .expect("explores");
        assert_eq!(first, again);
        // Absent results are memoized too.
        assert_eq!(cloner.explore(&Item::Node(alice), "children").expect("explores"), None);
        assert_eq!(cloner.explore(&Item::Node(alice), "children").expect("explores"), None);
    }

    #[test]
    fn batch_clone_shares_one_session() {
        let mut registry = person_registry();
        let alice = person(&mut registry, "alice");
        let bob = person(&mut registry, "bob");
        let shared = person(&mut registry, "shared");
        registry.put(alice, "partner", Value::Node(shared));
        registry.put(bob, "partner", Value::Node(shared));

        let clones = clone_nodes(&mut registry, &[alice, bob], &["partner"]).expect("clones");
        assert_eq!(clones.len(), 2);
        let shared_via_alice = registry.value(clones[0], "partner");
        let shared_via_bob = registry.value(clones[1], "partner");
        assert_eq!(shared_via_alice, shared_via_bob);
    }
}
