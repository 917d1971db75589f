use ariadne::Cache;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};

pub type Source = ariadne::Source<Arc<str>>;

/// Identifies one source text registered in a [`SourceCache`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SourceId(u32);

impl SourceId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src{}", self.0)
    }
}

/// Holds the source texts diagnostics may point into.
///
/// Programs usually arrive as serialized trees, so the cache may well be
/// empty; diagnostics whose source is unknown fall back to a plain rendering.
#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    names: HashMap<SourceId, String>,
    sources: HashMap<SourceId, Source>,
    next: u32,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source text under the given display name.
    pub fn add(&mut self, name: impl Into<String>, text: impl Into<Arc<str>>) -> SourceId {
        let id = SourceId(self.next);
        self.next += 1;
        self.names.insert(id, name.into());
        self.sources.insert(id, Source::from(text.into()));
        id
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(&id)
    }

    pub fn name(&self, id: SourceId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}

impl Cache<SourceId> for &SourceCache {
    type Storage = Arc<str>;

    fn fetch(&mut self, id: &SourceId) -> Result<&Source, impl fmt::Debug> {
        self.sources.get(id).ok_or("source id not found")
    }

    fn display<'a>(&self, id: &'a SourceId) -> Option<impl fmt::Display + 'a> {
        Some(match self.names.get(id) {
            Some(name) => name.clone(),
            None => id.to_string(),
        })
    }
}
