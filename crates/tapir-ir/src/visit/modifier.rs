use std::rc::Rc;
use std::time::Instant;

use log::debug;

use crate::node::{Node, NodeRef, NodeTag, with_node_variants};
use crate::visit::{Frames, RewriteTracker, VisitStatus};

/// What a [`Modifier`] hook sees of the traversal.
pub struct ModifyCtx<'a> {
    pub frames: &'a Frames,
    pub(crate) tracker: &'a mut RewriteTracker,
}

impl ModifyCtx<'_> {
    pub fn visit_once(&mut self) {
        if let Some(frame) = self.frames.current() {
            self.tracker.set_visit_once(&frame.original, true);
        }
    }

    pub fn visit_again(&mut self) {
        if let Some(frame) = self.frames.current() {
            self.tracker.set_visit_once(&frame.original, false);
        }
    }

    pub fn revisit_visited(&mut self) {
        self.tracker.revisit_visited();
    }

    pub fn visit_in_progress(&self, n: &NodeRef) -> bool {
        self.tracker.busy(n)
    }
}

macro_rules! define_modifier {
    ($($variant:ident),* $(,)?) => {
        paste::paste! {
            /// The in-place rewriting discipline.
            ///
            /// Each visited node is cloned and the hooks edit the clone;
            /// the engine publishes it only if it ended up structurally
            /// different from the original (or a clone was forced), so an
            /// identity pass leaves the tree untouched. `revisit` receives
            /// the result an earlier visit settled on, `None` when the node
            /// was removed.
            pub trait Modifier {
                fn name(&self) -> &'static str
                where
                    Self: Sized,
                {
                    std::any::type_name::<Self>()
                }

                fn visit_dag_once(&self) -> bool {
                    true
                }

                /// Whether children already rewritten under an earlier
                /// sibling are forwarded into the clone before preorder.
                fn forward_children(&self) -> bool {
                    true
                }

                /// Publish a clone even when a node came through unchanged,
                /// regenerating its identity.
                fn force_clone(&self) -> bool {
                    false
                }

                fn init(&mut self, _root: &NodeRef) {}

                fn end(&mut self, _root: &NodeRef) {}

                fn pre_default(&mut self, _n: &mut Node, _visit: &mut ModifyCtx<'_>) -> bool {
                    true
                }

                fn post_default(&mut self, _n: &mut Node, _visit: &mut ModifyCtx<'_>) {}

                fn revisit_default(
                    &mut self,
                    _orig: &NodeRef,
                    _result: Option<&NodeRef>,
                    _visit: &mut ModifyCtx<'_>,
                ) {
                }

                fn loop_default(&mut self, _n: &NodeRef, _visit: &mut ModifyCtx<'_>) {}

                $(
                    fn [<pre_ $variant:snake>](&mut self, n: &mut Node, visit: &mut ModifyCtx<'_>) -> bool {
                        self.pre_default(n, visit)
                    }

                    fn [<post_ $variant:snake>](&mut self, n: &mut Node, visit: &mut ModifyCtx<'_>) {
                        self.post_default(n, visit)
                    }

                    fn [<revisit_ $variant:snake>](
                        &mut self,
                        orig: &NodeRef,
                        result: Option<&NodeRef>,
                        visit: &mut ModifyCtx<'_>,
                    ) {
                        self.revisit_default(orig, result, visit)
                    }

                    fn [<loop_ $variant:snake>](&mut self, n: &NodeRef, visit: &mut ModifyCtx<'_>) {
                        self.loop_default(n, visit)
                    }
                )*

                /// Runs this modifier over a tree, returning the rewritten
                /// root. The root itself cannot be removed by a modifier.
                fn apply(&mut self, root: &NodeRef) -> NodeRef
                where
                    Self: Sized,
                {
                    match Modification::new(self).run(root) {
                        Some(result) => result,
                        None => crate::bug!("modifier removed the root node"),
                    }
                }
            }

            pub(crate) fn dispatch_preorder<V: Modifier + ?Sized>(
                v: &mut V,
                n: &mut Node,
                visit: &mut ModifyCtx<'_>,
            ) -> bool {
                match n.tag() {
                    $(NodeTag::$variant => v.[<pre_ $variant:snake>](n, visit),)*
                }
            }

            pub(crate) fn dispatch_postorder<V: Modifier + ?Sized>(
                v: &mut V,
                n: &mut Node,
                visit: &mut ModifyCtx<'_>,
            ) {
                match n.tag() {
                    $(NodeTag::$variant => v.[<post_ $variant:snake>](n, visit),)*
                }
            }

            pub(crate) fn dispatch_revisit<V: Modifier + ?Sized>(
                v: &mut V,
                orig: &NodeRef,
                result: Option<&NodeRef>,
                visit: &mut ModifyCtx<'_>,
            ) {
                match orig.tag() {
                    $(NodeTag::$variant => v.[<revisit_ $variant:snake>](orig, result, visit),)*
                }
            }

            pub(crate) fn dispatch_loop<V: Modifier + ?Sized>(
                v: &mut V,
                n: &NodeRef,
                visit: &mut ModifyCtx<'_>,
            ) {
                match n.tag() {
                    $(NodeTag::$variant => v.[<loop_ $variant:snake>](n, visit),)*
                }
            }
        }
    };
}

with_node_variants!(define_modifier);

/// Drives one [`Modifier`] over one tree.
pub struct Modification<'v, V: Modifier + ?Sized> {
    visitor: &'v mut V,
    frames: Frames,
    tracker: RewriteTracker,
}

impl<'v, V: Modifier + ?Sized> Modification<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        let force_clone = visitor.force_clone();
        Self {
            visitor,
            frames: Frames::new(),
            tracker: RewriteTracker::new(force_clone),
        }
    }

    pub fn run(mut self, root: &NodeRef) -> Option<NodeRef> {
        let started = Instant::now();
        self.visitor.init(root);
        let result = self.visit_node(root, None);
        if let Some(result) = &result {
            self.visitor.end(result);
        }
        debug!("modification finished in {:?}", started.elapsed());
        result
    }

    fn visit_node(&mut self, n: &NodeRef, name: Option<&'static str>) -> Option<NodeRef> {
        if let Some(parent) = self.frames.last_mut() {
            parent.child_name = name;
        }
        self.frames.push(n);

        let out = match self.tracker.try_start(n, self.visitor.visit_dag_once()) {
            VisitStatus::Busy => {
                dispatch_loop(
                    &mut *self.visitor,
                    n,
                    &mut ModifyCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                    },
                );
                Some(n.clone())
            }
            VisitStatus::Done => {
                let result = self.tracker.result(n);
                dispatch_revisit(
                    &mut *self.visitor,
                    n,
                    result.as_ref(),
                    &mut ModifyCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                    },
                );
                result
            }
            VisitStatus::New | VisitStatus::Revisit => {
                let mut copy = n.shallow_clone();
                if self.visitor.forward_children() {
                    self.forward_children(&mut copy);
                }

                let descend = dispatch_preorder(
                    &mut *self.visitor,
                    &mut copy,
                    &mut ModifyCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                    },
                );
                if descend {
                    copy.rewrite_children(&mut |name, child| self.visit_node(child, Some(name)));
                    dispatch_postorder(
                        &mut *self.visitor,
                        &mut copy,
                        &mut ModifyCtx {
                            frames: &self.frames,
                            tracker: &mut self.tracker,
                        },
                    );
                }

                let candidate = Rc::new(copy);
                if self.tracker.finish(n, Some(candidate.clone())) {
                    candidate.validate();
                    Some(candidate)
                } else {
                    Some(n.clone())
                }
            }
        };

        self.frames.pop();
        if let Some(parent) = self.frames.last_mut() {
            parent.child_index += 1;
        }
        out
    }

    /// Replaces children whose originals an earlier branch already rewrote,
    /// so each rewrite propagates exactly once per descent.
    fn forward_children(&mut self, copy: &mut Node) {
        let tracker = &self.tracker;
        copy.rewrite_children(&mut |_, child| match tracker.final_result(child) {
            Some(result) => Some(result),
            None => Some(child.clone()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BlockStatement, Constant, Node, node};

    fn constant(value: i64) -> NodeRef {
        node(Constant { value, width: None })
    }

    /// A modifier whose hooks do nothing.
    struct Identity {
        force: bool,
    }

    impl Modifier for Identity {
        fn force_clone(&self) -> bool {
            self.force
        }
    }

    struct Increment;

    impl Modifier for Increment {
        fn pre_constant(&mut self, n: &mut Node, _visit: &mut ModifyCtx<'_>) -> bool {
            if let Some(c) = n.get_mut::<Constant>() {
                c.value += 1;
            }
            true
        }
    }

    #[test]
    fn identity_pass_returns_the_original_root() {
        let root = node(BlockStatement {
            components: vec![constant(1), constant(2)],
        });

        let result = Identity { force: false }.apply(&root);
        assert_eq!(result.id(), root.id());
    }

    #[test]
    fn force_clone_regenerates_identity() {
        let root = node(BlockStatement {
            components: vec![constant(1)],
        });

        let result = Identity { force: true }.apply(&root);
        assert_ne!(result.id(), root.id());
        assert_eq!(*result, *root);
    }

    #[test]
    fn changed_nodes_are_published_with_their_ancestors() {
        let untouched = node(crate::node::EmptyStatement {});
        let root = node(BlockStatement {
            components: vec![constant(1), untouched.clone()],
        });

        let result = Increment.apply(&root);
        assert_ne!(result.id(), root.id());

        let block = result.get::<BlockStatement>().unwrap();
        assert_eq!(block.components[0].get::<Constant>().unwrap().value, 2);
        // the sibling off the rewrite path keeps its identity
        assert_eq!(block.components[1].id(), untouched.id());
        // the input tree is untouched
        assert_eq!(
            root.get::<BlockStatement>().unwrap().components[0]
                .get::<Constant>()
                .unwrap()
                .value,
            1
        );
    }

    #[test]
    fn shared_children_are_rewritten_once_and_forwarded() {
        let shared = constant(10);
        let root = node(BlockStatement {
            components: vec![shared.clone(), shared.clone()],
        });

        let result = Increment.apply(&root);
        let block = result.get::<BlockStatement>().unwrap();

        assert_eq!(block.components[0].get::<Constant>().unwrap().value, 11);
        // both occurrences resolve to the same rewritten node
        assert_eq!(block.components[0].id(), block.components[1].id());
    }
}
