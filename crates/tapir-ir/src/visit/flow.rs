use std::collections::HashMap;
use std::time::Instant;

use log::debug;

use crate::id::NodeId;
use crate::node::NodeRef;
use crate::visit::inspector::{
    dispatch_loop, dispatch_postorder, dispatch_preorder, dispatch_revisit,
};
use crate::visit::{Frames, InspectCtx, Inspector, VisitStatus, VisitTracker};

/// How a [`Dataflow`] visitor wants the children of a branching node
/// visited: the sequential prefix first, then each arm on an independent
/// clone of the visitor state.
#[derive(Debug, Clone, Default)]
pub struct FlowSplit {
    pub sequential: Vec<NodeRef>,
    pub arms: Vec<Vec<NodeRef>>,
}

/// An inspector that carries dataflow state through branches and merges it
/// where control flow rejoins.
///
/// A setup pre-pass counts how often each node is reached; nodes reached
/// through more than one edge become join points. Arrivals at a join point
/// park their state in an accumulator until the last in-edge arrives, which
/// merges the accumulator into its own state and proceeds through the node.
/// Stalled arrivals meanwhile advance any parallel arms still pending, so
/// the join completes without ever visiting the node twice.
pub trait Dataflow: Inspector {
    /// Snapshot of the user-visible visitor state.
    type State: Clone;

    fn state(&self) -> Self::State;

    /// Join `other` into the current state at a control-flow confluence.
    fn merge(&mut self, other: &Self::State);

    /// Replace the current state wholesale.
    fn restore(&mut self, state: Self::State);

    /// Declare the control-flow edges of `n`. Nodes without a split visit
    /// their children sequentially on the shared state.
    fn flow_split(&self, _n: &NodeRef) -> Option<FlowSplit> {
        None
    }

    /// Narrow which multiply-reached nodes count as join points.
    fn is_join_candidate(&self, _n: &NodeRef) -> bool {
        true
    }

    /// Compatibility switch for clients depending on the old stall-only
    /// behavior, which skipped a join point until its last in-edge without
    /// driving pending arms. Leave off.
    fn legacy_stall(&self) -> bool {
        false
    }

    fn apply_flow(&mut self, root: &NodeRef)
    where
        Self: Sized,
    {
        FlowInspection::new(self).run(root);
    }
}

#[derive(Debug)]
struct JoinInfo<S> {
    /// In-edges still expected beyond the first; goes negative when the
    /// last one arrives.
    count: i64,
    accumulator: Option<S>,
    done: bool,
}

struct SplitFrame<S> {
    arms: Vec<Vec<NodeRef>>,
    next: usize,
    entry: S,
    merged: Option<S>,
}

/// Drives one [`Dataflow`] visitor over one tree.
pub struct FlowInspection<'v, V: Dataflow + ?Sized> {
    visitor: &'v mut V,
    frames: Frames,
    tracker: VisitTracker,
    joins: HashMap<NodeId, JoinInfo<V::State>>,
    splits: Vec<SplitFrame<V::State>>,
}

impl<'v, V: Dataflow + ?Sized> FlowInspection<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        Self {
            visitor,
            frames: Frames::new(),
            tracker: VisitTracker::new(),
            joins: HashMap::new(),
            splits: Vec::new(),
        }
    }

    pub fn run(mut self, root: &NodeRef) {
        let started = Instant::now();
        self.setup_join_points(root);
        self.visitor.init(root);
        self.visit_node(root, None);
        self.visitor.end(root);
        debug!("flow inspection finished in {:?}", started.elapsed());
    }

    /// Counts how often each node is reachable and records those reached
    /// more than once as join points awaiting `arrivals - 1` further
    /// in-edges.
    fn setup_join_points(&mut self, root: &NodeRef) {
        fn count(n: &NodeRef, arrivals: &mut HashMap<NodeId, (NodeRef, usize)>) {
            let first = {
                let entry = arrivals.entry(n.id()).or_insert_with(|| (n.clone(), 0));
                entry.1 += 1;
                entry.1 == 1
            };
            if first {
                let node = n.clone();
                node.for_each_child(&mut |_, child| count(child, arrivals));
            }
        }

        let mut arrivals = HashMap::new();
        count(root, &mut arrivals);

        for (id, (node, times)) in arrivals {
            if times > 1 && self.visitor.is_join_candidate(&node) {
                self.joins.insert(
                    id,
                    JoinInfo {
                        count: times as i64 - 1,
                        accumulator: None,
                        done: false,
                    },
                );
            }
        }
    }

    fn visit_node(&mut self, n: &NodeRef, name: Option<&'static str>) {
        if let Some(parent) = self.frames.last_mut() {
            parent.child_name = name;
        }
        if self.join_flows(n) {
            if let Some(parent) = self.frames.last_mut() {
                parent.child_index += 1;
            }
            return;
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

        self.post_join_flows(n);
        self.frames.pop();
        if let Some(parent) = self.frames.last_mut() {
            parent.child_index += 1;
        }
    }

    fn visit_children(&mut self, n: &NodeRef) {
        let Some(split) = self.visitor.flow_split(n) else {
            let node = n.clone();
            node.for_each_child(&mut |name, child| self.visit_node(child, Some(name)));
            return;
        };

        for child in &split.sequential {
            self.visit_node(child, None);
        }

        let entry = self.visitor.state();
        self.splits.push(SplitFrame {
            arms: split.arms,
            next: 0,
            entry,
            merged: None,
        });
        let idx = self.splits.len() - 1;
        while self.splits[idx].next < self.splits[idx].arms.len() {
            self.advance_arm(idx);
        }
        let frame = self.splits.pop().expect("split frame pushed above");
        if let Some(merged) = frame.merged {
            self.visitor.restore(merged);
        }
    }

    /// Visits the next pending arm of the given split on a clone of the
    /// state the split was entered with, folding the arm's end state into
    /// the split's merge.
    fn advance_arm(&mut self, idx: usize) {
        let (arm, entry) = {
            let frame = &mut self.splits[idx];
            let arm = frame.arms[frame.next].clone();
            frame.next += 1;
            (arm, frame.entry.clone())
        };

        self.visitor.restore(entry);
        for child in &arm {
            self.visit_node(child, None);
        }

        match self.splits[idx].merged.take() {
            None => self.splits[idx].merged = Some(self.visitor.state()),
            Some(merged) => {
                self.visitor.merge(&merged);
                self.splits[idx].merged = Some(self.visitor.state());
            }
        }
    }

    /// Returns true when `n` should not be visited by this arrival.
    fn join_flows(&mut self, n: &NodeRef) -> bool {
        let id = n.id();
        if !self.joins.contains_key(&id) {
            return false;
        }

        let info = self.joins.get_mut(&id).expect("join point checked above");
        info.count -= 1;
        if info.count < 0 {
            // the last in-edge: absorb what the others accumulated and
            // proceed through the node
            if let Some(accumulator) = info.accumulator.clone() {
                self.visitor.merge(&accumulator);
            }
            return false;
        }

        // stalled on unvisited in-edges: fold this state into the
        // accumulator
        let current = self.visitor.state();
        match info.accumulator.take() {
            Some(accumulator) => {
                self.visitor.restore(accumulator);
                self.visitor.merge(&current);
                info.accumulator = Some(self.visitor.state());
                self.visitor.restore(current);
            }
            None => info.accumulator = Some(current),
        }

        if self.visitor.legacy_stall() {
            return true;
        }

        // drive pending parallel arms until the join completes under one of
        // them
        loop {
            if self.joins[&id].count < 0 {
                break;
            }
            let Some(idx) = self.splits.iter().rposition(|s| s.next < s.arms.len()) else {
                break;
            };
            self.advance_arm(idx);
        }

        let info = &self.joins[&id];
        if !(info.count < 0 && info.done) {
            crate::bug!("parallel branches left flow join point {} unfinished", n);
        }
        let merged = info
            .accumulator
            .clone()
            .unwrap_or_else(|| crate::bug!("flow join point {} lost its state", n));
        self.visitor.restore(merged);
        true
    }

    fn post_join_flows(&mut self, n: &NodeRef) {
        let id = n.id();
        let Some(info) = self.joins.get_mut(&id) else {
            return;
        };
        if info.done {
            crate::bug!("flow join point visited more than once: {}", n);
        }
        info.done = true;
        info.accumulator = Some(self.visitor.state());
    }
}
