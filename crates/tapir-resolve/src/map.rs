use std::collections::{HashMap, HashSet};

use tapir_ir::{NodeId, NodeRef};

/// The artifact of reference resolution: a binding from every path node to
/// the declaration it names, plus the set of names the program uses.
///
/// Keyed by node identity and rebuilt from scratch whenever the root
/// changes; later passes treat it as read-only.
#[derive(Debug, Default)]
pub struct ReferenceMap {
    is_v1: bool,
    root: Option<NodeId>,
    bindings: HashMap<NodeId, NodeRef>,
    used_names: HashSet<String>,
}

impl ReferenceMap {
    pub fn new(is_v1: bool) -> Self {
        Self {
            is_v1,
            ..Self::default()
        }
    }

    /// Whether names resolve without regard to declaration order.
    pub fn is_v1(&self) -> bool {
        self.is_v1
    }

    /// Whether this map was last built for exactly this root.
    pub fn check_map(&self, root: &NodeRef) -> bool {
        self.root == Some(root.id())
    }

    pub fn update_map(&mut self, root: &NodeRef) {
        self.root = Some(root.id());
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.bindings.clear();
        self.used_names.clear();
    }

    pub fn set_declaration(&mut self, path: &NodeRef, declaration: NodeRef) {
        self.bindings.insert(path.id(), declaration);
    }

    pub fn declaration(&self, path: &NodeRef) -> Option<&NodeRef> {
        self.bindings.get(&path.id())
    }

    pub fn used_name(&mut self, name: impl Into<String>) {
        self.used_names.insert(name.into());
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used_names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
