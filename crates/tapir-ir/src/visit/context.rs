use crate::node::{NodeKind, NodeRef};

/// One step of the current descent.
///
/// `original` is the node as it appears in the input tree and is what
/// trackers and resolution key on. `current` differs from it only when a
/// transform substituted the node before descending into it; ancestors are
/// otherwise exposed in their original form while a rewrite is assembling
/// their replacements.
#[derive(Debug, Clone)]
pub struct Frame {
    pub original: NodeRef,
    pub current: NodeRef,
    /// Index of the child currently being visited.
    pub child_index: usize,
    /// Slot name of the child currently being visited.
    pub child_name: Option<&'static str>,
}

/// The ancestor chain of the node being visited.
///
/// Nodes do not store parent links; this stack, alive exactly for one
/// `apply`, is the only way a pass asks what encloses it.
#[derive(Debug, Default)]
pub struct Frames {
    stack: Vec<Frame>,
}

impl Frames {
    /// Deeper nesting than this is a runaway traversal.
    pub const MAX_DEPTH: usize = 10_000;

    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, n: &NodeRef) {
        if self.stack.len() >= Self::MAX_DEPTH {
            crate::bug!("context stack overflow at depth {}", self.stack.len());
        }
        self.stack.push(Frame {
            original: n.clone(),
            current: n.clone(),
            child_index: 0,
            child_name: None,
        });
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Frame> {
        self.stack.last_mut()
    }

    pub(crate) fn set_current(&mut self, n: &NodeRef) {
        if let Some(frame) = self.stack.last_mut() {
            frame.current = n.clone();
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The frame of the node currently being visited.
    pub fn current(&self) -> Option<&Frame> {
        self.stack.last()
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.stack.len().checked_sub(2).map(|i| &self.stack[i])
    }

    /// Frames from the innermost outward, the current node's own included.
    pub fn iter_outward(&self) -> impl Iterator<Item = &Frame> {
        self.stack.iter().rev()
    }

    /// The nearest enclosing node of the given variant, the current node
    /// included.
    pub fn enclosing<T>(&self) -> Option<&NodeRef>
    where
        NodeKind: tapir_utils::TryAsRef<T>,
    {
        self.iter_outward()
            .map(|f| &f.original)
            .find(|n| n.is::<T>())
    }

    pub fn is_in<T>(&self) -> bool
    where
        NodeKind: tapir_utils::TryAsRef<T>,
    {
        self.enclosing::<T>().is_some()
    }
}
