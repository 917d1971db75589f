use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range};

use crate::{Span, source::SourceId};

pub type Located<T> = (T, Loc);

/// A span paired with the source it points into.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub source: SourceId,
    pub span: Span,
}

impl fmt::Debug for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { source, span } = self;
        write!(f, "{span} in {source}")
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { source, span } = self;
        write!(f, "{span} in {source}")
    }
}

impl Loc {
    #[inline]
    pub fn new(source: SourceId, span: Span) -> Self {
        Self { source, span }
    }

    #[inline]
    pub fn from_range(source: SourceId, range: Range<usize>) -> Self {
        Self::new(source, Span::from(range))
    }

    #[inline]
    pub fn source(self) -> SourceId {
        self.source
    }

    #[inline]
    pub fn span(self) -> Span {
        self.span
    }

    /// Whether this location begins at or before `other`.
    ///
    /// Locations in different sources are not ordered; they compare as before.
    #[inline]
    pub fn starts_before(self, other: Self) -> bool {
        self.source != other.source || self.span.start <= other.span.start
    }

    /// Returns the union of two locs (smallest loc that contains both).
    #[inline]
    pub fn union(self, other: Self) -> Self {
        debug_assert_eq!(self.source, other.source);

        Self::new(self.source, self.span.union(&other.span))
    }
}

impl ariadne::Span for Loc {
    type SourceId = SourceId;

    fn source(&self) -> &Self::SourceId {
        &self.source
    }

    fn start(&self) -> usize {
        self.span.start
    }

    fn end(&self) -> usize {
        self.span.end
    }
}

impl From<Loc> for Range<usize> {
    fn from(value: Loc) -> Self {
        value.span.into()
    }
}
