use std::collections::HashMap;

use crate::{id::NodeId, node::NodeRef};

/// The answer to "have we seen this node before".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    /// First sighting; visit it.
    New,
    /// Finished earlier with the visit-once flag cleared; reopened.
    Revisit,
    /// Currently somewhere on the stack below us. A cycle.
    Busy,
    /// Finished and visit-once; skip.
    Done,
}

#[derive(Debug)]
struct VisitInfo {
    done: bool,
    visit_once: bool,
}

/// Per-pass visit memo for read-only traversal.
#[derive(Debug, Default)]
pub struct VisitTracker {
    visited: HashMap<NodeId, VisitInfo>,
}

impl VisitTracker {
    pub fn new() -> Self {
        Self {
            visited: HashMap::with_capacity(16),
        }
    }

    /// Begins tracking `n`; pair with `finish(n)` once its visit completes.
    #[must_use]
    pub fn try_start(&mut self, n: &NodeRef, default_visit_once: bool) -> VisitStatus {
        match self.visited.entry(n.id()) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(VisitInfo {
                    done: false,
                    visit_once: default_visit_once,
                });
                VisitStatus::New
            }
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let info = entry.get_mut();
                if !info.done {
                    VisitStatus::Busy
                } else if info.visit_once {
                    VisitStatus::Done
                } else {
                    info.done = false;
                    VisitStatus::Revisit
                }
            }
        }
    }

    pub fn finish(&mut self, n: &NodeRef) {
        match self.visited.get_mut(&n.id()) {
            Some(info) => info.done = true,
            None => crate::bug!("visitor state tracker corrupted"),
        }
    }

    /// Forgets finished nodes so the next descent reopens them. Nodes still
    /// in progress are kept.
    pub fn revisit_visited(&mut self) {
        self.visited.retain(|_, info| !info.done);
    }

    pub fn busy(&self, n: &NodeRef) -> bool {
        self.visited.get(&n.id()).is_some_and(|info| !info.done)
    }

    pub fn done(&self, n: &NodeRef) -> bool {
        self.visited
            .get(&n.id())
            .is_some_and(|info| info.done && info.visit_once)
    }

    pub fn set_visit_once(&mut self, n: &NodeRef, visit_once: bool) {
        match self.visited.get_mut(&n.id()) {
            Some(info) => info.visit_once = visit_once,
            None => crate::bug!("visitor state tracker corrupted"),
        }
    }
}

#[derive(Debug)]
struct RewriteInfo {
    in_progress: bool,
    visit_once: bool,
    /// The rewrite published for this node; `None` once the node has been
    /// removed from the tree.
    result: Option<NodeRef>,
}

/// Per-pass visit memo for the rewriting disciplines, additionally carrying
/// each node's rewrite result.
#[derive(Debug)]
pub struct RewriteTracker {
    force_clone: bool,
    visited: HashMap<NodeId, RewriteInfo>,
}

impl RewriteTracker {
    pub fn new(force_clone: bool) -> Self {
        Self {
            force_clone,
            visited: HashMap::with_capacity(16),
        }
    }

    #[must_use]
    pub fn try_start(&mut self, n: &NodeRef, default_visit_once: bool) -> VisitStatus {
        match self.visited.entry(n.id()) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(RewriteInfo {
                    in_progress: true,
                    visit_once: default_visit_once,
                    result: Some(n.clone()),
                });
                VisitStatus::New
            }
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let info = entry.get_mut();
                if info.in_progress {
                    VisitStatus::Busy
                } else if info.visit_once {
                    VisitStatus::Done
                } else {
                    info.in_progress = true;
                    VisitStatus::Revisit
                }
            }
        }
    }

    /// Ends the visit of `orig` with `final_node` as its outcome, `None`
    /// meaning the node was removed from the tree.
    ///
    /// A changed result is registered as finished itself, as if it had been
    /// started and finished in turn. When the result merely coalesces with a
    /// node visited earlier, the coalesce is preserved, and it wins over a
    /// forced clone.
    ///
    /// Returns whether the tree changed under `orig`.
    pub fn finish(&mut self, orig: &NodeRef, final_node: Option<NodeRef>) -> bool {
        let orig_id = orig.id();
        let visit_once = match self.visited.get_mut(&orig_id) {
            Some(info) => {
                info.in_progress = false;
                info.visit_once
            }
            None => crate::bug!("visitor state tracker corrupted"),
        };

        let Some(final_node) = final_node else {
            self.visited
                .get_mut(&orig_id)
                .expect("entry checked above")
                .result = None;
            return true;
        };

        let final_id = final_node.id();
        if final_id != orig_id && self.visited.contains_key(&final_id) {
            self.visited
                .get_mut(&orig_id)
                .expect("entry checked above")
                .result = Some(final_node);
            return true;
        }
        if self.force_clone || (final_id != orig_id && *final_node != **orig) {
            self.visited
                .get_mut(&orig_id)
                .expect("entry checked above")
                .result = Some(final_node.clone());
            self.visited.insert(
                final_id,
                RewriteInfo {
                    in_progress: false,
                    visit_once,
                    result: Some(final_node),
                },
            );
            return true;
        }
        false
    }

    /// The (possibly intermediate) result of visiting `n`: the node itself
    /// when it was never started, `None` when it was removed.
    pub fn result(&self, n: &NodeRef) -> Option<NodeRef> {
        match self.visited.get(&n.id()) {
            Some(info) => info.result.clone(),
            None => Some(n.clone()),
        }
    }

    /// The settled rewrite of `n`: only present once `n` is done and its
    /// result is a node still in the tree.
    pub fn final_result(&self, n: &NodeRef) -> Option<NodeRef> {
        let info = self.visited.get(&n.id())?;
        if info.in_progress || !info.visit_once {
            return None;
        }
        info.result.clone()
    }

    pub fn revisit_visited(&mut self) {
        self.visited.retain(|_, info| info.in_progress);
    }

    pub fn busy(&self, n: &NodeRef) -> bool {
        self.visited
            .get(&n.id())
            .is_some_and(|info| info.in_progress)
    }

    pub fn done(&self, n: &NodeRef) -> bool {
        self.visited
            .get(&n.id())
            .is_some_and(|info| !info.in_progress && info.visit_once)
    }

    pub fn should_visit_once(&self, n: &NodeRef) -> bool {
        match self.visited.get(&n.id()) {
            Some(info) => info.visit_once,
            None => crate::bug!("visitor state tracker corrupted"),
        }
    }

    pub fn set_visit_once(&mut self, n: &NodeRef, visit_once: bool) {
        match self.visited.get_mut(&n.id()) {
            Some(info) => info.visit_once = visit_once,
            None => crate::bug!("visitor state tracker corrupted"),
        }
    }
}
