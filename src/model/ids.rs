// Identity types for the editing document
//
// Identity is what undo relies on: a node restored by undo carries the same
// id it had before, so later commands in the history still find it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn generate_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identifies one structural node for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn generate() -> Self {
        Self(generate_id())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identifies one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(u64);

impl ParameterId {
    pub fn generate() -> Self {
        Self(generate_id())
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parameter#{}", self.0)
    }
}

/// Identifies one parameter set instance.
///
/// A node gets a new parameter set every time its type changes; undoing the
/// change restores the previous instance, which keeps its old id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParametersId(u64);

impl ParametersId {
    pub fn generate() -> Self {
        Self(generate_id())
    }
}

/// Identifies one linked parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkedParameterId(u64);

impl LinkedParameterId {
    pub fn generate() -> Self {
        Self(generate_id())
    }
}

impl fmt::Display for LinkedParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "linked#{}", self.0)
    }
}
