pub use diag::{Diagnostic, IntoDiagnostic, IntoIssue, Issue, Report, Severity};
pub use loc::{Loc, Located};
pub use source::{SourceCache, SourceId};
pub use span::Span;

mod diag;
mod loc;
mod source;
mod span;
