use serde::{Deserialize, Serialize};

use crate::node::{Ident, NodeRef, impl_children};

/// The root of a compiled unit. Its objects are the top-level declarations
/// and match-kind groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub objects: Vec<NodeRef>,
}

impl_children!(Program { list objects });

/// `@name` or `@name(argument)` attached to a node. The argument, when
/// present, is a string or integer literal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: Ident,
    pub value: Option<NodeRef>,
}

impl_children!(Annotation { opt value });

impl Annotation {
    /// The annotation's argument as a string, if it is a string literal.
    pub fn string_value(&self) -> Option<&str> {
        let value = self.value.as_ref()?;
        let literal = value.get::<crate::node::StringLiteral>()?;
        Some(&literal.value)
    }
}
