use std::time::Instant;

use log::debug;

use crate::node::{NodeRef, NodeTag, with_node_variants};
use crate::visit::{Frames, VisitStatus, VisitTracker};

/// What an [`Inspector`] hook sees of the traversal: the ancestor chain and
/// the visit memo.
pub struct InspectCtx<'a> {
    pub frames: &'a Frames,
    pub(crate) tracker: &'a mut VisitTracker,
}

impl InspectCtx<'_> {
    /// Suppress re-entry of the node currently being visited.
    pub fn visit_once(&mut self) {
        if let Some(frame) = self.frames.current() {
            self.tracker.set_visit_once(&frame.original, true);
        }
    }

    /// Let the node currently being visited be visited again when reached
    /// through another path.
    pub fn visit_again(&mut self) {
        if let Some(frame) = self.frames.current() {
            self.tracker.set_visit_once(&frame.original, false);
        }
    }

    /// Forget finished nodes so a later descent reopens them. Useful between
    /// the sub-passes of one apply.
    pub fn revisit_visited(&mut self) {
        self.tracker.revisit_visited();
    }

    pub fn visit_in_progress(&self, n: &NodeRef) -> bool {
        self.tracker.busy(n)
    }
}

macro_rules! define_inspector {
    ($($variant:ident),* $(,)?) => {
        paste::paste! {
            /// The read-only traversal discipline.
            ///
            /// A pass overrides the hooks of the variants it cares about; the
            /// defaults route every variant to the `*_default` catch-alls.
            /// Preorder returning false skips the node's children. `revisit`
            /// fires for nodes already visited, `loop_*` when a node is
            /// reached while still being visited further up the stack.
            pub trait Inspector {
                fn name(&self) -> &'static str
                where
                    Self: Sized,
                {
                    std::any::type_name::<Self>()
                }

                /// Visit each shared node once per apply. Cleared, every
                /// occurrence is visited independently.
                fn visit_dag_once(&self) -> bool {
                    true
                }

                fn init(&mut self, _root: &NodeRef) {}

                fn end(&mut self, _root: &NodeRef) {}

                fn pre_default(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) -> bool {
                    true
                }

                fn post_default(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) {}

                fn revisit_default(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) {}

                fn loop_default(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) {}

                $(
                    fn [<pre_ $variant:snake>](&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
                        self.pre_default(n, visit)
                    }

                    fn [<post_ $variant:snake>](&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) {
                        self.post_default(n, visit)
                    }

                    fn [<revisit_ $variant:snake>](&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) {
                        self.revisit_default(n, visit)
                    }

                    fn [<loop_ $variant:snake>](&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) {
                        self.loop_default(n, visit)
                    }
                )*

                /// Runs this inspector over a tree.
                fn apply(&mut self, root: &NodeRef)
                where
                    Self: Sized,
                {
                    Inspection::new(self).run(root);
                }
            }

            pub(crate) fn dispatch_preorder<V: Inspector + ?Sized>(
                v: &mut V,
                n: &NodeRef,
                visit: &mut InspectCtx<'_>,
            ) -> bool {
                match n.tag() {
                    $(NodeTag::$variant => v.[<pre_ $variant:snake>](n, visit),)*
                }
            }

            pub(crate) fn dispatch_postorder<V: Inspector + ?Sized>(
                v: &mut V,
                n: &NodeRef,
                visit: &mut InspectCtx<'_>,
            ) {
                match n.tag() {
                    $(NodeTag::$variant => v.[<post_ $variant:snake>](n, visit),)*
                }
            }

            pub(crate) fn dispatch_revisit<V: Inspector + ?Sized>(
                v: &mut V,
                n: &NodeRef,
                visit: &mut InspectCtx<'_>,
            ) {
                match n.tag() {
                    $(NodeTag::$variant => v.[<revisit_ $variant:snake>](n, visit),)*
                }
            }

            pub(crate) fn dispatch_loop<V: Inspector + ?Sized>(
                v: &mut V,
                n: &NodeRef,
                visit: &mut InspectCtx<'_>,
            ) {
                match n.tag() {
                    $(NodeTag::$variant => v.[<loop_ $variant:snake>](n, visit),)*
                }
            }
        }
    };
}

with_node_variants!(define_inspector);

/// Drives one [`Inspector`] over one tree. Owns the context stack and the
/// visit memo, both released when the apply returns.
pub struct Inspection<'v, V: Inspector + ?Sized> {
    visitor: &'v mut V,
    frames: Frames,
    tracker: VisitTracker,
}

impl<'v, V: Inspector + ?Sized> Inspection<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        Self {
            visitor,
            frames: Frames::new(),
            tracker: VisitTracker::new(),
        }
    }

    pub fn run(mut self, root: &NodeRef) {
        let started = Instant::now();
        self.visitor.init(root);
        self.visit_node(root, None);
        self.visitor.end(root);
        debug!("inspection finished in {:?}", started.elapsed());
    }

    fn visit_node(&mut self, n: &NodeRef, name: Option<&'static str>) {
        if let Some(parent) = self.frames.last_mut() {
            parent.child_name = name;
        }
        self.frames.push(n);

        match self.tracker.try_start(n, self.visitor.visit_dag_once()) {
            VisitStatus::Busy => {
                dispatch_loop(
                    &mut *self.visitor,
                    n,
                    &mut InspectCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                    },
                );
            }
            VisitStatus::Done => {
                dispatch_revisit(
                    &mut *self.visitor,
                    n,
                    &mut InspectCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                    },
                );
            }
            VisitStatus::New | VisitStatus::Revisit => {
                let descend = dispatch_preorder(
                    &mut *self.visitor,
                    n,
                    &mut InspectCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                    },
                );
                if descend {
                    self.visit_children(n);
                    dispatch_postorder(
                        &mut *self.visitor,
                        n,
                        &mut InspectCtx {
                            frames: &self.frames,
                            tracker: &mut self.tracker,
                        },
                    );
                }
                self.tracker.finish(n);
            }
        }

        self.frames.pop();
        if let Some(parent) = self.frames.last_mut() {
            parent.child_index += 1;
        }
    }

    fn visit_children(&mut self, n: &NodeRef) {
        let node = n.clone();
        node.for_each_child(&mut |name, child| self.visit_node(child, Some(name)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::node::{BlockStatement, Constant, Path, PathExpression, Variable, node};

    fn constant(value: i64) -> NodeRef {
        node(Constant { value, width: None })
    }

    #[derive(Default)]
    struct Recorder {
        order: Vec<(&'static str, &'static str)>,
        revisits: usize,
        dag_once: bool,
    }

    impl Inspector for Recorder {
        fn visit_dag_once(&self) -> bool {
            self.dag_once
        }

        fn pre_default(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) -> bool {
            self.order.push(("pre", n.kind_name()));
            true
        }

        fn post_default(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) {
            self.order.push(("post", n.kind_name()));
        }

        fn revisit_default(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) {
            self.revisits += 1;
        }
    }

    fn sample_tree() -> NodeRef {
        node(BlockStatement {
            components: vec![
                constant(1),
                node(PathExpression {
                    path: node(Path::new("x")),
                }),
            ],
        })
    }

    fn collect_ids(root: &NodeRef) -> Vec<NodeId> {
        let mut ids = vec![root.id()];
        root.for_each_child(&mut |_, c| ids.extend(collect_ids(c)));
        ids
    }

    #[test]
    fn preorder_precedes_children_precedes_postorder() {
        let root = sample_tree();
        let mut v = Recorder {
            dag_once: true,
            ..Default::default()
        };
        v.apply(&root);

        assert_eq!(
            v.order,
            vec![
                ("pre", "BlockStatement"),
                ("pre", "Constant"),
                ("post", "Constant"),
                ("pre", "PathExpression"),
                ("pre", "Path"),
                ("post", "Path"),
                ("post", "PathExpression"),
                ("post", "BlockStatement"),
            ]
        );
    }

    #[test]
    fn inspection_preserves_every_node_identity() {
        let root = sample_tree();
        let before = collect_ids(&root);

        let mut v = Recorder {
            dag_once: true,
            ..Default::default()
        };
        v.apply(&root);

        assert_eq!(collect_ids(&root), before);
    }

    #[test]
    fn shared_nodes_are_visited_once_or_per_occurrence() {
        // one declaration referenced from two sibling statements
        let shared = node(Variable {
            name: "d".into(),
            ty: node(crate::node::BitsType { width: 8 }),
            initializer: None,
        });
        let root = node(BlockStatement {
            components: vec![shared.clone(), shared.clone()],
        });

        let mut once = Recorder {
            dag_once: true,
            ..Default::default()
        };
        once.apply(&root);
        let pre_vars = once
            .order
            .iter()
            .filter(|(phase, kind)| *phase == "pre" && *kind == "Variable")
            .count();
        assert_eq!(pre_vars, 1);
        assert_eq!(once.revisits, 1);

        let mut twice = Recorder {
            dag_once: false,
            ..Default::default()
        };
        twice.apply(&root);
        let pre_vars = twice
            .order
            .iter()
            .filter(|(phase, kind)| *phase == "pre" && *kind == "Variable")
            .count();
        assert_eq!(pre_vars, 2);
        assert_eq!(twice.revisits, 0);
    }

    #[test]
    fn pruned_subtrees_see_no_postorder() {
        struct PruneConstants {
            posts: usize,
        }

        impl Inspector for PruneConstants {
            fn pre_constant(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) -> bool {
                false
            }

            fn post_constant(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) {
                self.posts += 1;
            }
        }

        let root = sample_tree();
        let mut v = PruneConstants { posts: 0 };
        v.apply(&root);
        assert_eq!(v.posts, 0);
    }

    #[test]
    fn frames_expose_the_ancestor_chain() {
        struct FindParent {
            inside_block: bool,
        }

        impl Inspector for FindParent {
            fn pre_constant(&mut self, _n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
                self.inside_block = visit.frames.is_in::<BlockStatement>();
                assert_eq!(visit.frames.current().unwrap().child_name, None);
                assert_eq!(visit.frames.parent().unwrap().child_name, Some("components"));
                true
            }
        }

        let root = sample_tree();
        let mut v = FindParent {
            inside_block: false,
        };
        v.apply(&root);
        assert!(v.inside_block);
    }
}
