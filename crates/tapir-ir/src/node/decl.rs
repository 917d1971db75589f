use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::{Ident, NodeRef, impl_children};

/// Parameter passing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    None,
    In,
    Out,
    InOut,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::None => Ok(()),
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
            Direction::InOut => write!(f, "inout"),
        }
    }
}

/// A control block: the match-action half of a pipeline.
///
/// Scopes its type parameters, apply parameters, constructor parameters and
/// locals; the apply body is a block with its own scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub name: Ident,
    pub type_params: NodeRef,
    pub apply_params: NodeRef,
    pub constructor_params: NodeRef,
    pub locals: Vec<NodeRef>,
    pub body: NodeRef,
}

impl_children!(Control {
    node type_params,
    node apply_params,
    node constructor_params,
    list locals,
    node body,
});

/// The type signature of a control, as used by package declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlType {
    pub name: Ident,
    pub type_params: NodeRef,
    pub apply_params: NodeRef,
}

impl_children!(ControlType {
    node type_params,
    node apply_params,
});

/// A parser block with its states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parser {
    pub name: Ident,
    pub type_params: NodeRef,
    pub apply_params: NodeRef,
    pub constructor_params: NodeRef,
    pub locals: Vec<NodeRef>,
    pub states: Vec<NodeRef>,
}

impl_children!(Parser {
    node type_params,
    node apply_params,
    node constructor_params,
    list locals,
    list states,
});

/// The type signature of a parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserType {
    pub name: Ident,
    pub type_params: NodeRef,
    pub apply_params: NodeRef,
}

impl_children!(ParserType {
    node type_params,
    node apply_params,
});

/// A package declaration wiring parsers and controls together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: Ident,
    pub type_params: NodeRef,
    pub constructor_params: NodeRef,
}

impl_children!(Package {
    node type_params,
    node constructor_params,
});

/// One parser state. States may refer to each other ahead of their
/// declaration, so resolution exempts them from ordering checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserState {
    pub name: Ident,
    pub components: Vec<NodeRef>,
    pub transition: Option<NodeRef>,
}

impl_children!(ParserState {
    list components,
    opt transition,
});

/// An action: a straight-line body parameterized by data- and control-plane
/// arguments. Actions with the same name overload by arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: Ident,
    pub params: NodeRef,
    pub body: NodeRef,
}

impl_children!(Action {
    node params,
    node body,
});

/// A match-action table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: Ident,
    pub properties: NodeRef,
}

impl_children!(Table { node properties });

/// The property block of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProperties {
    pub properties: Vec<NodeRef>,
}

impl_children!(TableProperties { list properties });

/// One table property, e.g. `key`, `actions` or `default_action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProperty {
    pub name: Ident,
    pub value: NodeRef,
}

impl_children!(TableProperty { node value });

/// The value of a table's `key` property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub elements: Vec<NodeRef>,
}

impl_children!(Key { list elements });

/// One key element: an expression matched under a match kind.
///
/// The match type is resolved against the program's flat match-kind
/// namespace rather than lexical scope, so it is carried out of band of the
/// traversed children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyElement {
    pub expression: NodeRef,
    pub match_type: NodeRef,
}

impl_children!(KeyElement { node expression });

/// The value of a table's `actions` property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionList {
    pub elements: Vec<NodeRef>,
}

impl_children!(ActionList { list elements });

/// One entry of an action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRef {
    pub expression: NodeRef,
}

impl_children!(ActionRef { node expression });

/// An extern object type with its methods. Methods overload, so the extern
/// lists declarations that may repeat a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extern {
    pub name: Ident,
    pub type_params: NodeRef,
    pub methods: Vec<NodeRef>,
}

impl_children!(Extern {
    node type_params,
    list methods,
});

/// An extern method prototype. Its parameters may be referenced from
/// annotations written ahead of the method, which exempts them from
/// declaration-order checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: Ident,
    pub return_type: NodeRef,
    pub type_params: NodeRef,
    pub params: NodeRef,
}

impl_children!(Method {
    node return_type,
    node type_params,
    node params,
});

/// A free-standing or instance-initializer function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: Ident,
    pub return_type: NodeRef,
    pub type_params: NodeRef,
    pub params: NodeRef,
    pub body: NodeRef,
}

impl_children!(Function {
    node return_type,
    node type_params,
    node params,
    node body,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    pub name: Ident,
    pub fields: Vec<NodeRef>,
}

impl_children!(Struct { list fields });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub name: Ident,
    pub fields: Vec<NodeRef>,
}

impl_children!(Header { list fields });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: Ident,
    pub ty: NodeRef,
}

impl_children!(StructField { node ty });

/// An instantiation, e.g. of an extern or a control. The initializer holds
/// the implementations of abstract methods; `this` inside them refers to the
/// instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: Ident,
    pub ty: NodeRef,
    pub arguments: Vec<NodeRef>,
    pub initializer: Vec<NodeRef>,
}

impl_children!(Instance {
    node ty,
    list arguments,
    list initializer,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: Ident,
    pub ty: NodeRef,
    pub initializer: Option<NodeRef>,
}

impl_children!(Variable {
    node ty,
    opt initializer,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDecl {
    pub name: Ident,
    pub ty: NodeRef,
    pub value: NodeRef,
}

impl_children!(ConstantDecl {
    node ty,
    node value,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub direction: Direction,
    pub ty: NodeRef,
}

impl_children!(Param { node ty });

/// An ordered parameter list; a namespace answering by-name lookups in one
/// step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamList {
    pub params: Vec<NodeRef>,
}

impl_children!(ParamList { list params });

/// A type variable. May be referenced ahead of its declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: Ident,
}

impl_children!(TypeParam {});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParamList {
    pub params: Vec<NodeRef>,
}

impl_children!(TypeParamList { list params });

/// A `match_kind { ... }` group. Match kinds live in their own flat
/// namespace keyed from table key elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchKindGroup {
    pub members: Vec<NodeRef>,
}

impl_children!(MatchKindGroup { list members });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchKindName {
    pub name: Ident,
}

impl_children!(MatchKindName {});
