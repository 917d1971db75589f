//! The tapir compiler front- and mid-end.
//!
//! This crate wires the phases together: it loads serialized program trees,
//! runs reference resolution over them, and reports diagnostics. The heavy
//! lifting lives in the member crates re-exported below.

use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use log::info;

pub use tapir_core::{CompilerContext, LanguageVersion, Options};
pub use tapir_ir as ir;
pub use tapir_resolve as resolve;
pub use tapir_span as span;

use tapir_ir::NodeRef;
use tapir_ir::visit::Inspector;
use tapir_resolve::{ReferenceMap, ResolveReferences};
use tapir_span::IntoIssue;

/// Runs compiler phases against one [`CompilerContext`], stopping at the
/// first phase that left errors behind.
pub struct Driver {
    pub context: CompilerContext,
}

impl Driver {
    pub fn new(options: Options) -> Self {
        Self {
            context: CompilerContext::new(options),
        }
    }

    /// Loads a serialized program tree. An unreadable or malformed input
    /// ends the run early with a diagnostic.
    pub fn load_program(&mut self, path: &Utf8Path) -> Option<NodeRef> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(error) => {
                self.context.report.add_issue(
                    error
                        .into_issue()
                        .with_help(format!("while opening '{path}'")),
                );
                return None;
            }
        };
        match tapir_ir::load(BufReader::new(file)) {
            Ok(root) => Some(root),
            Err(error) => {
                self.context
                    .report
                    .add_issue(tapir_span::Issue::error(error.to_string()));
                None
            }
        }
    }

    /// Resolves every reference in the program. `None` when diagnostics
    /// with error severity fired; the report holds them.
    pub fn resolve(&mut self, root: &NodeRef) -> Option<ReferenceMap> {
        let is_v1 = self.context.options.is_v1();
        let mut refs = ReferenceMap::new(is_v1);
        ResolveReferences::new(&mut refs, &mut self.context).apply(root);

        if self.context.error_count() > 0 {
            return None;
        }
        info!("resolved {} references", refs.len());
        Some(refs)
    }

    pub fn had_errors(&self) -> bool {
        self.context.error_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapir_ir::{BlockStatement, Path, PathExpression, Program, node};

    #[test]
    fn resolution_errors_gate_the_phase() {
        let root = node(Program {
            objects: vec![node(BlockStatement {
                components: vec![node(PathExpression {
                    path: node(Path::new("undefined")),
                })],
            })],
        });

        let mut driver = Driver::new(Options::default());
        assert!(driver.resolve(&root).is_none());
        assert!(driver.had_errors());
    }

    #[test]
    fn a_clean_program_yields_a_reference_map() {
        let root = node(Program {
            objects: Vec::new(),
        });

        let mut driver = Driver::new(Options::default());
        let refs = driver.resolve(&root).unwrap();
        assert!(refs.check_map(&root));
        assert!(!driver.had_errors());
    }
}
