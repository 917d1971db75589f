/// The accepted revisions of the packet-processing language.
///
/// The legacy revision resolves names without regard to declaration order;
/// the current one requires declaration before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageVersion {
    V1,
    #[default]
    V1_6,
}

/// Options that reach the traversal and resolution core.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub version: LanguageVersion,
    /// Report declarations that hide declarations of enclosing scopes.
    pub check_shadowing: bool,
    /// Force rewriting passes to publish a clone even when nothing changed,
    /// regenerating node identity for downstream passes.
    pub force_clone: bool,
    /// Warning names suppressed globally, in addition to per-scope
    /// `@noWarn` annotations.
    pub nowarn: Vec<String>,
}

impl Options {
    pub fn is_v1(&self) -> bool {
        self.version == LanguageVersion::V1
    }
}
