use std::collections::HashMap;

use tapir_span::{Report, SourceCache};

use crate::Options;

/// How an annotation encountered on the context path affects the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOption {
    /// `@noWarn("<warning>")` suppresses the named warning within the
    /// annotated scope.
    NoWarn,
}

/// The state threaded through every pass: options, the diagnostic report,
/// the source cache for rendering, and the registered option-bearing
/// annotations.
///
/// There is exactly one per compiler run and it is passed explicitly; the
/// core keeps no global state across invocations.
#[derive(Debug, Default)]
pub struct CompilerContext {
    pub options: Options,
    pub report: Report,
    pub sources: SourceCache,
    annotation_options: HashMap<&'static str, AnnotationOption>,
}

impl CompilerContext {
    pub fn new(options: Options) -> Self {
        let mut annotation_options = HashMap::new();
        annotation_options.insert("noWarn", AnnotationOption::NoWarn);

        Self {
            options,
            report: Report::new(),
            sources: SourceCache::new(),
            annotation_options,
        }
    }

    pub fn annotation_option(&self, name: &str) -> Option<AnnotationOption> {
        self.annotation_options.get(name).copied()
    }

    pub fn error_count(&self) -> usize {
        self.report.error_count()
    }

    /// Whether the named warning is enabled, taking the global suppression
    /// list into account. Scope-local `@noWarn` annotations are checked by
    /// the pass that holds the context path.
    pub fn warning_enabled(&self, warning: &str) -> bool {
        !self.options.nowarn.iter().any(|w| w == warning)
    }
}
