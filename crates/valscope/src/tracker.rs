use crate::value::Identity;
use std::collections::HashSet;

/// Identities of the composites currently on the traversal stack.
///
/// One tracker lives for one top-level parse; a composite found while its
/// own identity is still present is a cycle.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    active: HashSet<Identity>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-insert. `false` when `identity` is already on the stack.
    pub fn enter(&mut self, identity: Identity) -> bool {
        self.active.insert(identity)
    }

    pub fn leave(&mut self, identity: Identity) {
        self.active.remove(&identity);
    }

    pub fn contains(&self, identity: Identity) -> bool {
        self.active.contains(&identity)
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
