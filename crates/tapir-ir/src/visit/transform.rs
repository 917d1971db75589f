use std::rc::Rc;
use std::time::Instant;

use log::debug;

use crate::node::{Node, NodeRef, NodeTag, with_node_variants};
use crate::visit::{Frames, RewriteTracker, VisitStatus};

/// The outcome a [`Transform`] hook reports for the node it was given.
#[derive(Debug, Clone)]
pub enum Rewrite {
    /// Keep going with the working clone, including any edits made to it.
    Proceed,
    /// Substitute a different subtree for this node.
    Replace(NodeRef),
    /// Remove this subtree from the parent.
    Remove,
}

/// What a [`Transform`] hook sees of the traversal.
pub struct TransformCtx<'a> {
    pub frames: &'a Frames,
    pub(crate) tracker: &'a mut RewriteTracker,
    prune: &'a mut bool,
}

impl TransformCtx<'_> {
    /// Skip the children and postorder of the node currently being visited,
    /// keeping the preorder result as-is.
    pub fn prune(&mut self) {
        *self.prune = true;
    }

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

macro_rules! define_transform {
    ($($variant:ident),* $(,)?) => {
        paste::paste! {
            /// The substituting rewrite discipline.
            ///
            /// Like [`Modifier`](crate::visit::Modifier), but preorder and
            /// postorder may replace the node with a different subtree or
            /// remove it. Substitutions made in preorder are visited in
            /// turn; a postorder result that ends up structurally equal to a
            /// preorder substitute canonicalizes back to the substitute, so
            /// its identity is preserved.
            pub trait Transform {
                fn name(&self) -> &'static str
                where
                    Self: Sized,
                {
                    std::any::type_name::<Self>()
                }

                fn visit_dag_once(&self) -> bool {
                    true
                }

                fn forward_children(&self) -> bool {
                    true
                }

                fn force_clone(&self) -> bool {
                    false
                }

                fn init(&mut self, _root: &NodeRef) {}

                fn end(&mut self, _root: &NodeRef) {}

                fn pre_default(&mut self, _n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
                    Rewrite::Proceed
                }

                fn post_default(&mut self, _n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
                    Rewrite::Proceed
                }

                fn revisit_default(
                    &mut self,
                    _orig: &NodeRef,
                    _result: Option<&NodeRef>,
                    _visit: &mut TransformCtx<'_>,
                ) {
                }

                fn loop_default(&mut self, _n: &NodeRef, _visit: &mut TransformCtx<'_>) {}

                $(
                    fn [<pre_ $variant:snake>](&mut self, n: &mut Node, visit: &mut TransformCtx<'_>) -> Rewrite {
                        self.pre_default(n, visit)
                    }

                    fn [<post_ $variant:snake>](&mut self, n: &mut Node, visit: &mut TransformCtx<'_>) -> Rewrite {
                        self.post_default(n, visit)
                    }

                    fn [<revisit_ $variant:snake>](
                        &mut self,
                        orig: &NodeRef,
                        result: Option<&NodeRef>,
                        visit: &mut TransformCtx<'_>,
                    ) {
                        self.revisit_default(orig, result, visit)
                    }

                    fn [<loop_ $variant:snake>](&mut self, n: &NodeRef, visit: &mut TransformCtx<'_>) {
                        self.loop_default(n, visit)
                    }
                )*

                /// Runs this transform over a tree. `None` means the root
                /// itself was removed.
                fn apply(&mut self, root: &NodeRef) -> Option<NodeRef>
                where
                    Self: Sized,
                {
                    Transformation::new(self).run(root)
                }
            }

            pub(crate) fn dispatch_preorder<V: Transform + ?Sized>(
                v: &mut V,
                n: &mut Node,
                visit: &mut TransformCtx<'_>,
            ) -> Rewrite {
                match n.tag() {
                    $(NodeTag::$variant => v.[<pre_ $variant:snake>](n, visit),)*
                }
            }

            pub(crate) fn dispatch_postorder<V: Transform + ?Sized>(
                v: &mut V,
                n: &mut Node,
                visit: &mut TransformCtx<'_>,
            ) -> Rewrite {
                match n.tag() {
                    $(NodeTag::$variant => v.[<post_ $variant:snake>](n, visit),)*
                }
            }

            pub(crate) fn dispatch_revisit<V: Transform + ?Sized>(
                v: &mut V,
                orig: &NodeRef,
                result: Option<&NodeRef>,
                visit: &mut TransformCtx<'_>,
            ) {
                match orig.tag() {
                    $(NodeTag::$variant => v.[<revisit_ $variant:snake>](orig, result, visit),)*
                }
            }

            pub(crate) fn dispatch_loop<V: Transform + ?Sized>(
                v: &mut V,
                n: &NodeRef,
                visit: &mut TransformCtx<'_>,
            ) {
                match n.tag() {
                    $(NodeTag::$variant => v.[<loop_ $variant:snake>](n, visit),)*
                }
            }
        }
    };
}

with_node_variants!(define_transform);

/// Drives one [`Transform`] over one tree.
pub struct Transformation<'v, V: Transform + ?Sized> {
    visitor: &'v mut V,
    frames: Frames,
    tracker: RewriteTracker,
    prune: bool,
}

impl<'v, V: Transform + ?Sized> Transformation<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        let force_clone = visitor.force_clone();
        Self {
            visitor,
            frames: Frames::new(),
            tracker: RewriteTracker::new(force_clone),
            prune: false,
        }
    }

    pub fn run(mut self, root: &NodeRef) -> Option<NodeRef> {
        let started = Instant::now();
        self.visitor.init(root);
        let result = self.visit_node(root, None);
        if let Some(result) = &result {
            self.visitor.end(result);
        }
        debug!("transformation finished in {:?}", started.elapsed());
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
                    &mut TransformCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                        prune: &mut self.prune,
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
                    &mut TransformCtx {
                        frames: &self.frames,
                        tracker: &mut self.tracker,
                        prune: &mut self.prune,
                    },
                );
                result
            }
            VisitStatus::New | VisitStatus::Revisit => self.rewrite_node(n),
        };

        self.frames.pop();
        if let Some(parent) = self.frames.last_mut() {
            parent.child_index += 1;
        }
        out
    }

    fn rewrite_node(&mut self, n: &NodeRef) -> Option<NodeRef> {
        let mut copy = n.shallow_clone();
        if self.visitor.forward_children() {
            let tracker = &self.tracker;
            copy.rewrite_children(&mut |_, child| match tracker.final_result(child) {
                Some(result) => Some(result),
                None => Some(child.clone()),
            });
        }

        let saved_prune = self.prune;
        self.prune = false;

        // `substitute` is the node preorder swapped in, `settled` a result
        // the tracker already had for it. `extra_clone` marks a substitute
        // whose own visit we opened here and must close alongside `n`.
        let mut substitute: Option<NodeRef> = None;
        let mut settled: Option<Option<NodeRef>> = None;
        let mut extra_clone = false;

        let pre = dispatch_preorder(
            &mut *self.visitor,
            &mut copy,
            &mut TransformCtx {
                frames: &self.frames,
                tracker: &mut self.tracker,
                prune: &mut self.prune,
            },
        );
        match pre {
            Rewrite::Proceed => {}
            Rewrite::Remove => {
                self.prune = true;
                settled = Some(None);
            }
            Rewrite::Replace(p) => {
                if p.id() == n.id() {
                    crate::bug!("transform preorder returned the node it was visiting");
                }
                if self.tracker.done(&p) {
                    settled = Some(self.tracker.result(&p));
                    self.prune = true;
                } else {
                    let once = self.tracker.should_visit_once(n);
                    if self.tracker.try_start(&p, once) == VisitStatus::Busy {
                        crate::bug!("IR loop detected");
                    }
                    copy = p.shallow_clone();
                    self.frames.set_current(&p);
                    substitute = Some(p);
                    extra_clone = true;
                }
            }
        }

        let final_node: Option<NodeRef> = if self.prune {
            match settled {
                Some(result) => result,
                None => match &substitute {
                    Some(p) => Some(p.clone()),
                    None => Some(Rc::new(copy)),
                },
            }
        } else {
            copy.rewrite_children(&mut |name, child| self.visit_node(child, Some(name)));
            let post = dispatch_postorder(
                &mut *self.visitor,
                &mut copy,
                &mut TransformCtx {
                    frames: &self.frames,
                    tracker: &mut self.tracker,
                    prune: &mut self.prune,
                },
            );
            match post {
                Rewrite::Proceed => match &substitute {
                    // nothing changed under the substitute; keep its identity
                    Some(p) if copy == **p => Some(p.clone()),
                    _ => Some(Rc::new(copy)),
                },
                Rewrite::Remove => None,
                Rewrite::Replace(q) => Some(q),
            }
        };
        self.prune = saved_prune;

        let result = if self.tracker.finish(n, final_node.clone()) {
            if let Some(published) = &final_node {
                published.validate();
            }
            final_node
        } else {
            Some(n.clone())
        };
        if extra_clone {
            if let Some(p) = &substitute {
                self.tracker.finish(p, result.clone());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        AssignmentStatement, BlockStatement, Constant, Node, Path, PathExpression, node,
    };

    fn constant(value: i64) -> NodeRef {
        node(Constant { value, width: None })
    }

    fn path_expr(name: &str) -> NodeRef {
        node(PathExpression {
            path: node(Path::new(name)),
        })
    }

    /// Replaces every constant `n` with `n + 1`, recording what postorder
    /// observes.
    #[derive(Default)]
    struct IncrementConstants {
        seen_by_postorder: Vec<i64>,
    }

    impl Transform for IncrementConstants {
        fn pre_constant(&mut self, n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
            let c = n.get::<Constant>().map(|c| Constant {
                value: c.value + 1,
                width: c.width,
            });
            match c {
                Some(c) => Rewrite::Replace(node(c)),
                None => Rewrite::Proceed,
            }
        }

        fn post_block_statement(&mut self, n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
            if let Some(block) = n.get::<BlockStatement>() {
                self.seen_by_postorder = block
                    .components
                    .iter()
                    .filter_map(|c| c.get::<Constant>().map(|c| c.value))
                    .collect();
            }
            Rewrite::Proceed
        }
    }

    #[test]
    fn constants_are_replaced_and_the_parent_cloned_once() {
        let stray = path_expr("x");
        let root = node(BlockStatement {
            components: vec![constant(1), constant(2), constant(3), stray.clone()],
        });

        let mut pass = IncrementConstants::default();
        let result = pass.apply(&root).unwrap();

        // postorder already saw the rewritten children
        assert_eq!(pass.seen_by_postorder, vec![2, 3, 4]);

        let block = result.get::<BlockStatement>().unwrap();
        let values: Vec<i64> = block
            .components
            .iter()
            .filter_map(|c| c.get::<Constant>().map(|c| c.value))
            .collect();
        assert_eq!(values, vec![2, 3, 4]);

        // the parent is a fresh clone, the untouched sibling is shared
        assert_ne!(result.id(), root.id());
        assert_eq!(block.components[3].id(), stray.id());
        // the original tree still holds the old constants
        assert_eq!(
            root.get::<BlockStatement>().unwrap().components[0]
                .get::<Constant>()
                .unwrap()
                .value,
            1
        );
    }

    #[test]
    fn removal_drops_list_children() {
        struct DropConstants;

        impl Transform for DropConstants {
            fn pre_constant(&mut self, _n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
                Rewrite::Remove
            }
        }

        let root = node(BlockStatement {
            components: vec![constant(1), path_expr("keep"), constant(2)],
        });

        let result = DropConstants.apply(&root).unwrap();
        let block = result.get::<BlockStatement>().unwrap();
        assert_eq!(block.components.len(), 1);
        assert!(block.components[0].is::<PathExpression>());
    }

    #[test]
    fn prune_skips_children_and_postorder() {
        #[derive(Default)]
        struct PruneBlocks {
            constants_seen: usize,
        }

        impl Transform for PruneBlocks {
            fn pre_block_statement(
                &mut self,
                _n: &mut Node,
                visit: &mut TransformCtx<'_>,
            ) -> Rewrite {
                visit.prune();
                Rewrite::Proceed
            }

            fn pre_constant(&mut self, _n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
                self.constants_seen += 1;
                Rewrite::Proceed
            }
        }

        let root = node(BlockStatement {
            components: vec![constant(1)],
        });

        let mut pass = PruneBlocks::default();
        let result = pass.apply(&root).unwrap();
        assert_eq!(pass.constants_seen, 0);
        assert_eq!(result.id(), root.id());
    }

    #[test]
    fn unchanged_substitutes_keep_their_identity() {
        struct SwapRight {
            replacement: NodeRef,
        }

        impl Transform for SwapRight {
            fn pre_constant(&mut self, _n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
                Rewrite::Replace(self.replacement.clone())
            }
        }

        let replacement = path_expr("y");
        let root = node(AssignmentStatement {
            left: path_expr("x"),
            right: constant(0),
        });

        let mut pass = SwapRight {
            replacement: replacement.clone(),
        };
        let result = pass.apply(&root).unwrap();
        let assign = result.get::<AssignmentStatement>().unwrap();

        // nothing under the substitute changed, so it canonicalizes back to
        // the node the visitor handed over
        assert_eq!(assign.right.id(), replacement.id());
    }

    #[test]
    #[should_panic(expected = "IR loop detected")]
    fn substituting_a_busy_ancestor_is_reported() {
        struct Loop;

        impl Transform for Loop {
            fn pre_constant(&mut self, _n: &mut Node, visit: &mut TransformCtx<'_>) -> Rewrite {
                let root = visit.frames.enclosing::<BlockStatement>().unwrap().clone();
                Rewrite::Replace(root)
            }
        }

        let root = node(BlockStatement {
            components: vec![constant(1)],
        });
        let _ = Loop.apply(&root);
    }

    #[test]
    fn revisit_receives_the_settled_result() {
        #[derive(Default)]
        struct Recording {
            revisited_with: Option<i64>,
        }

        impl Transform for Recording {
            fn pre_constant(&mut self, n: &mut Node, _visit: &mut TransformCtx<'_>) -> Rewrite {
                if let Some(c) = n.get_mut::<Constant>() {
                    c.value += 10;
                }
                Rewrite::Proceed
            }

            fn revisit_constant(
                &mut self,
                _orig: &NodeRef,
                result: Option<&NodeRef>,
                _visit: &mut TransformCtx<'_>,
            ) {
                self.revisited_with = result
                    .and_then(|n| n.get::<Constant>())
                    .map(|c| c.value);
            }
        }

        let shared = constant(1);
        let root = node(BlockStatement {
            components: vec![shared.clone(), shared.clone()],
        });

        let mut pass = Recording::default();
        let result = pass.apply(&root).unwrap();

        assert_eq!(pass.revisited_with, Some(11));
        let block = result.get::<BlockStatement>().unwrap();
        assert_eq!(block.components[0].id(), block.components[1].id());
    }
}
