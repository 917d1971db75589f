use thiserror::Error;

use tapir_ir::Ident;
use tapir_span::{Diagnostic, Loc};

/// Resolution failures. These are user diagnostics: the pass reports them
/// and keeps going so one run surfaces as many as possible.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    #[error("{name}: declaration not found")]
    NotFound { name: Ident },

    #[error("{name}: multiple matching declarations")]
    Ambiguous {
        name: Ident,
        candidates: Vec<(String, Option<Loc>)>,
    },

    #[error("self-referencing types not supported: '{name}' within '{decl}'")]
    SelfReferentialType { name: Ident, decl: String },

    #[error("'this' can only be used in the definition of an abstract method")]
    InvalidThis { loc: Option<Loc> },
}

impl From<ResolveError> for Diagnostic {
    fn from(error: ResolveError) -> Self {
        match &error {
            ResolveError::NotFound { name } => Diagnostic::error(name.loc, error.to_string()),
            ResolveError::Ambiguous { name, candidates } => {
                let mut diagnostic = Diagnostic::error(name.loc, error.to_string());
                diagnostic.trace = candidates
                    .iter()
                    .filter_map(|(label, loc)| loc.map(|l| (format!("candidate: {label}"), l)))
                    .collect();
                diagnostic.notes = candidates
                    .iter()
                    .filter(|(_, loc)| loc.is_none())
                    .map(|(label, _)| format!("candidate: {label}"))
                    .collect();
                diagnostic
            }
            ResolveError::SelfReferentialType { name, .. } => {
                Diagnostic::error(name.loc, error.to_string())
            }
            ResolveError::InvalidThis { loc } => Diagnostic::error(*loc, error.to_string()),
        }
    }
}
