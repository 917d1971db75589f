pub use context::{AnnotationOption, CompilerContext};
pub use options::{LanguageVersion, Options};

mod context;
mod options;
