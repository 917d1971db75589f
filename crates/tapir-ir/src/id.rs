use std::{
    fmt,
    sync::atomic::{AtomicU32, Ordering},
};

static GENERATOR: AtomicU32 = AtomicU32::new(0);

/// The identity of one node allocation.
///
/// Every node minted during a compiler run gets a fresh id, including clones
/// of existing nodes. Trackers, reference maps and join tables key on this;
/// structural equality ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn fresh() -> Self {
        Self(GENERATOR.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
