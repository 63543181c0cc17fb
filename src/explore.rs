//! Graph exploration: pattern interpretation and filter-driven traversal.
//!
//! The [`GraphExplorer`] interprets a compiled [`PathExpr`] against a root,
//! driving an [`Explorer`] capability (implemented by the clone engine) at
//! every relation step. Working sets are insertion-ordered and
//! duplicate-free, so exploration order is deterministic for a given graph.
//! [`deep_explore`] is the pattern-free mode: it follows every relation the
//! active filter approves, to unbounded depth, with an explicit work-list.
//!
//! Repetition (`x+`) is computed as a fixed point: each round explores only
//! the previous round's fresh discoveries, and the loop stops when a round
//! yields nothing new. Termination on cyclic graphs follows from the
//! seen-set; the explorer's memoization makes re-queries cheap.
//!
//! # Citations
//! - Fixed-point iteration to a stable set: Kleene iteration; Nielson,
//!   Nielson & Hankin, "Principles of Program Analysis", Chapter 2 (1999)
//! - Work-list traversal: Kildall, "A unified approach to global program
//!   optimization" (1973)

use crate::cloner::CloneError;
use crate::model::Item;
use crate::pattern::{PathExpr, PatternSyntaxError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// The exploration capability driven by the traversal, implemented by the
/// clone engine.
pub trait Explorer {
    /// Explores one relation step from `item`.
    ///
    /// Returns the *original* objects discovered through the relation
    /// (collection elements, map entries, the singular target), or `None`
    /// when there is nothing to explore: the item is an opaque scalar, the
    /// name is not a relation of its kind, or the relation is unset.
    fn explore(&mut self, item: &Item, relation: &str) -> Result<Option<Vec<Item>>, CloneError>;

    /// Relation names of `item` that the active filter approves.
    ///
    /// Used only by [`deep_explore`]; the names come from introspection and
    /// the approval from the filter capability.
    fn approved_relations(&self, item: &Item) -> Vec<String>;
}

/// An insertion-ordered, duplicate-free working set of [`Item`]s.
///
/// Iteration order is the order of first insertion, which keeps traversal
/// deterministic for a given graph and pattern.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    items: Vec<Item>,
    index: HashSet<Item>,
}

impl ItemSet {
    /// Creates an empty set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding a single item.
    pub fn singleton(item: Item) -> Self {
        let mut set = Self::new();
        set.insert(item);
        set
    }

    /// Inserts an item; returns `true` if it was not present.
    pub fn insert(&mut self, item: Item) -> bool {
        if self.index.insert(item.clone()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    /// Checks membership.
    #[inline]
    pub fn contains(&self, item: &Item) -> bool {
        self.index.contains(item)
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in insertion order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }
}

impl Extend<Item> for ItemSet {
    fn extend<I: IntoIterator<Item = Item>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for ItemSet {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Interpreter for one compiled path expression.
///
/// Cheap to construct (the expression is shared from the process-wide
/// cache) and stateless across calls; all traversal state lives in the
/// explorer capability and the working sets.
#[derive(Debug, Clone)]
pub struct GraphExplorer {
    expr: Arc<PathExpr>,
}

impl GraphExplorer {
    /// Compiles (or fetches from the cache) the given pattern.
    pub fn new(pattern: &str) -> Result<Self, PatternSyntaxError> {
        Ok(Self {
            expr: crate::cache::compiled(pattern)?,
        })
    }

    /// Wraps an already-compiled expression.
    pub fn from_expr(expr: Arc<PathExpr>) -> Self {
        Self { expr }
    }

    /// Returns the compiled expression.
    pub fn expr(&self) -> &PathExpr {
        &self.expr
    }

    /// Interprets the expression against `root`, driving `explorer` at
    /// every relation step. Returns the final working set.
    pub fn explore<E: Explorer>(&self, root: Item, explorer: &mut E) -> Result<ItemSet, CloneError> {
        eval(&self.expr, &ItemSet::singleton(root), explorer)
    }
}

/// Evaluates `expr` over `input`, producing the next working set.
fn eval<E: Explorer>(
    expr: &PathExpr,
    input: &ItemSet,
    explorer: &mut E,
) -> Result<ItemSet, CloneError> {
    match expr {
        PathExpr::Name(name) => {
            let mut out = ItemSet::new();
            for item in input.iter() {
                if let Some(found) = explorer.explore(item, name)? {
                    out.extend(found);
                }
            }
            Ok(out)
        }
        PathExpr::Seq(parts) => {
            let mut current = input.clone();
            for part in parts {
                if current.is_empty() {
                    break;
                }
                current = eval(part, &current, explorer)?;
            }
            Ok(current)
        }
        PathExpr::Alt(parts) => {
            // Every alternative sees the same input; outputs merge into the
            // set any subsequent sequence step consumes.
            let mut out = ItemSet::new();
            for part in parts {
                out.extend(eval(part, input, explorer)?);
            }
            Ok(out)
        }
        PathExpr::Repeat(inner) => {
            let mut reached = ItemSet::new();
            let mut frontier = input.clone();
            let mut round = 0usize;
            loop {
                let mut fresh = ItemSet::new();
                for item in eval(inner, &frontier, explorer)? {
                    // Items seen in a prior round of this repetition
                    // instance are discarded; this is what terminates the
                    // loop on cycles.
                    if reached.insert(item.clone()) {
                        fresh.insert(item);
                    }
                }
                if fresh.is_empty() {
                    break;
                }
                round += 1;
                trace!(round, discovered = fresh.len(), "repetition round");
                frontier = fresh;
            }
            Ok(reached)
        }
    }
}

/// Filter-driven traversal: visits `root` and, transitively, everything
/// reachable through approved relations, ignoring patterns entirely.
///
/// Uses an explicit work-list rather than call-stack recursion, so depth is
/// bounded by heap only. `visited` is the cycle guard; a batch of roots
/// shares one visited set so overlapping subgraphs are walked once.
pub fn deep_explore<E: Explorer>(
    root: Item,
    visited: &mut HashSet<Item>,
    explorer: &mut E,
) -> Result<(), CloneError> {
    let mut work = vec![root];
    while let Some(item) = work.pop() {
        if !visited.insert(item.clone()) {
            continue;
        }
        for name in explorer.approved_relations(&item) {
            if let Some(found) = explorer.explore(&item, &name)? {
                for next in found {
                    if !visited.contains(&next) {
                        work.push(next);
                    }
                }
            }
        }
    }
    Ok(())
}
