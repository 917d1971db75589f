use serde::{Deserialize, Serialize};

use crate::node::{Ident, NodeRef, impl_children};

/// A syntactic occurrence of a name. Every path reachable from the program
/// root is bound to a declaration by reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub name: Ident,
    /// Absolute paths (`.name`) resolve from the program root rather than
    /// the innermost scope.
    pub absolute: bool,
}

impl_children!(Path {});

impl Path {
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            absolute: false,
        }
    }
}

/// A path in expression position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathExpression {
    pub path: NodeRef,
}

impl_children!(PathExpression { node path });

/// The current instance, legal only inside an abstract method
/// implementation of an instantiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct This {}

impl_children!(This {});

/// `expression.member`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub expression: NodeRef,
    pub member: Ident,
}

impl_children!(Member { node expression });

/// An integer literal, optionally width-annotated as in `8w0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub value: i64,
    pub width: Option<u32>,
}

impl_children!(Constant {});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolLiteral {
    pub value: bool,
}

impl_children!(BoolLiteral {});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLiteral {
    pub value: String,
}

impl_children!(StringLiteral {});

/// A call. The callee is a path or member expression; its name
/// disambiguates overloads by the argument vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCallExpression {
    pub method: NodeRef,
    pub type_args: Vec<NodeRef>,
    pub arguments: Vec<NodeRef>,
}

impl_children!(MethodCallExpression {
    node method,
    list type_args,
    list arguments,
});

/// One call or instantiation argument, optionally named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: Option<Ident>,
    pub value: NodeRef,
}

impl_children!(Argument { node value });

/// The branching expression of a parser state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectExpression {
    pub select: Vec<NodeRef>,
    pub cases: Vec<NodeRef>,
}

impl_children!(SelectExpression {
    list select,
    list cases,
});

/// One arm of a select: a keyset and the state it transfers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectCase {
    pub keyset: NodeRef,
    pub state: NodeRef,
}

impl_children!(SelectCase {
    node keyset,
    node state,
});
