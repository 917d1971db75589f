//! The traversal engine.
//!
//! Three disciplines walk a shared tree with the same outer control flow:
//! [`Inspector`] reads, [`Modifier`] edits a clone of each node in place,
//! and [`Transform`] may substitute whole subtrees. All three memoize visits
//! per original node, forward earlier rewrites exactly once per descent, and
//! expose the ancestor chain through a per-traversal context stack.
//! [`Dataflow`] layers control-flow state merging on top of inspection.

pub use context::{Frame, Frames};
pub use flow::{Dataflow, FlowInspection, FlowSplit};
pub use inspector::{InspectCtx, Inspection, Inspector};
pub use modifier::{Modification, Modifier, ModifyCtx};
pub use tracker::{RewriteTracker, VisitStatus, VisitTracker};
pub use transform::{Rewrite, Transform, TransformCtx, Transformation};

mod context;
mod flow;
mod inspector;
mod modifier;
mod tracker;
mod transform;
