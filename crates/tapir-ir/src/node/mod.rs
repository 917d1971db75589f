use derive_more::{From, TryInto};
use serde::{Deserialize, Serialize};
use std::{fmt, rc::Rc};

use tapir_span::Loc;
use tapir_utils::impl_try_as;

use crate::id::NodeId;

mod decl;
mod expr;
mod program;
mod stmt;
mod ty;

pub use decl::*;
pub use expr::*;
pub use program::*;
pub use stmt::*;
pub use ty::*;

/// A shared handle to a node. Unchanged subtrees are forwarded by handle, so
/// a rewritten tree shares structure with its predecessor on every path the
/// rewrite did not touch.
pub type NodeRef = Rc<Node>;

/// A name occurrence, carrying the location of its spelling.
///
/// Equality and hashing look at the text only; the location serves
/// declaration-order checks and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub loc: Option<Loc>,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loc: None,
        }
    }

    pub fn at(name: impl Into<String>, loc: Loc) -> Self {
        Self {
            name: name.into(),
            loc: Some(loc),
        }
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Ident {}

impl PartialEq<str> for Ident {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl std::hash::Hash for Ident {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Implements ordered child access for a node payload.
///
/// Each field is listed with its shape: `node` for a required child, `opt`
/// for an optional one, `list` for a sequence. Fields not listed are plain
/// data and never traversed.
macro_rules! impl_children {
    ($ty:ident { $($slot:ident $field:ident),* $(,)? }) => {
        impl $ty {
            pub(crate) fn for_each_child(&self, _f: &mut dyn FnMut(&'static str, &NodeRef)) {
                $( impl_children!(@visit self, _f, $slot $field); )*
            }

            pub(crate) fn rewrite_children(
                &mut self,
                _f: &mut dyn FnMut(&'static str, &NodeRef) -> Option<NodeRef>,
            ) {
                $( impl_children!(@rewrite $ty, self, _f, $slot $field); )*
            }
        }
    };
    (@visit $self:ident, $f:ident, node $field:ident) => {
        $f(stringify!($field), &$self.$field);
    };
    (@visit $self:ident, $f:ident, opt $field:ident) => {
        if let Some(child) = &$self.$field {
            $f(stringify!($field), child);
        }
    };
    (@visit $self:ident, $f:ident, list $field:ident) => {
        for child in &$self.$field {
            $f(stringify!($field), child);
        }
    };
    (@rewrite $ty:ident, $self:ident, $f:ident, node $field:ident) => {
        match $f(stringify!($field), &$self.$field) {
            Some(next) => $self.$field = next,
            None => $crate::bug!(
                "cannot remove required child '{}' of {}",
                stringify!($field),
                stringify!($ty)
            ),
        }
    };
    (@rewrite $ty:ident, $self:ident, $f:ident, opt $field:ident) => {
        if let Some(child) = $self.$field.clone() {
            $self.$field = $f(stringify!($field), &child);
        }
    };
    (@rewrite $ty:ident, $self:ident, $f:ident, list $field:ident) => {
        let mut next = Vec::with_capacity($self.$field.len());
        for child in &$self.$field {
            if let Some(kept) = $f(stringify!($field), child) {
                next.push(kept);
            }
        }
        $self.$field = next;
    };
}

pub(crate) use impl_children;

/// Invokes a macro with the full list of node variants, so the algebra is
/// declared in exactly one place.
macro_rules! with_node_variants {
    ($callback:ident) => {
        $callback! {
            Program,
            Control,
            ControlType,
            Parser,
            ParserType,
            Package,
            ParserState,
            Action,
            Table,
            TableProperties,
            TableProperty,
            Key,
            KeyElement,
            ActionList,
            ActionRef,
            Extern,
            Method,
            Function,
            Struct,
            Header,
            StructField,
            Instance,
            Variable,
            ConstantDecl,
            Param,
            ParamList,
            TypeParam,
            TypeParamList,
            MatchKindGroup,
            MatchKindName,
            TypeName,
            SpecializedType,
            BitsType,
            BoolType,
            VoidType,
            Path,
            PathExpression,
            This,
            Member,
            Constant,
            BoolLiteral,
            StringLiteral,
            MethodCallExpression,
            Argument,
            SelectExpression,
            SelectCase,
            BlockStatement,
            AssignmentStatement,
            IfStatement,
            MethodCallStatement,
            ReturnStatement,
            EmptyStatement,
            Annotation,
        }
    };
}

pub(crate) use with_node_variants;

macro_rules! define_nodes {
    ($($variant:ident),* $(,)?) => {
        /// Fieldless discriminants of the node algebra.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum NodeTag {
            $($variant),*
        }

        impl NodeTag {
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        /// The variant payloads of the node algebra.
        #[derive(Debug, Clone, PartialEq, From, TryInto, Serialize, Deserialize)]
        pub enum NodeKind {
            $($variant($variant)),*
        }

        impl NodeKind {
            pub fn tag(&self) -> NodeTag {
                match self {
                    $(Self::$variant(_) => NodeTag::$variant),*
                }
            }

            pub(crate) fn for_each_child(&self, f: &mut dyn FnMut(&'static str, &NodeRef)) {
                match self {
                    $(Self::$variant(inner) => inner.for_each_child(f)),*
                }
            }

            pub(crate) fn rewrite_children(
                &mut self,
                f: &mut dyn FnMut(&'static str, &NodeRef) -> Option<NodeRef>,
            ) {
                match self {
                    $(Self::$variant(inner) => inner.rewrite_children(f)),*
                }
            }
        }

        impl_try_as!(NodeKind, $($variant($variant)),*);
    };
}

with_node_variants!(define_nodes);

/// One node of the program tree.
///
/// Nodes are immutable once reachable from a published tree; the only way to
/// change one is to clone it and publish the clone. Identity is per
/// allocation, so a clone is equal to but never identical with its source.
#[derive(Debug, Serialize, Deserialize)]
pub struct Node {
    #[serde(skip, default = "NodeId::fresh")]
    id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loc: Option<Loc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<NodeRef>,
    kind: NodeKind,
}

impl Node {
    pub fn new(kind: impl Into<NodeKind>) -> Self {
        Self {
            id: NodeId::fresh(),
            loc: None,
            annotations: Vec::new(),
            kind: kind.into(),
        }
    }

    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = NodeRef>) -> Self {
        self.annotations = annotations.into_iter().collect();
        self
    }

    pub fn build(self) -> NodeRef {
        Rc::new(self)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn loc(&self) -> Option<Loc> {
        self.loc
    }

    pub fn annotations(&self) -> &[NodeRef] {
        &self.annotations
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }

    /// The variant name, for diagnostics and dumps.
    pub fn kind_name(&self) -> &'static str {
        self.tag().name()
    }

    /// Downcast to a variant payload.
    pub fn get<T>(&self) -> Option<&T>
    where
        NodeKind: tapir_utils::TryAsRef<T>,
    {
        tapir_utils::TryAsRef::try_as_ref(&self.kind)
    }

    pub fn get_mut<T>(&mut self) -> Option<&mut T>
    where
        NodeKind: tapir_utils::TryAsMut<T>,
    {
        tapir_utils::TryAsMut::try_as_mut(&mut self.kind)
    }

    pub fn is<T>(&self) -> bool
    where
        NodeKind: tapir_utils::TryAsRef<T>,
    {
        self.get::<T>().is_some()
    }

    /// A copy with fresh identity whose children are shared by handle.
    ///
    /// This is the clone the rewriting disciplines assemble results in:
    /// publishing it costs one allocation, and children it leaves untouched
    /// keep their identity.
    pub fn shallow_clone(&self) -> Node {
        Node {
            id: NodeId::fresh(),
            loc: self.loc,
            annotations: self.annotations.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Visits annotations and variant children in declared order, passing
    /// each slot's name.
    pub fn for_each_child(&self, f: &mut dyn FnMut(&'static str, &NodeRef)) {
        for annotation in &self.annotations {
            f("annotations", annotation);
        }
        self.kind.for_each_child(f);
    }

    /// Rewrites each child slot through `f`. Returning `None` removes the
    /// child; removal of a required scalar child is a compiler bug.
    pub fn rewrite_children(
        &mut self,
        f: &mut dyn FnMut(&'static str, &NodeRef) -> Option<NodeRef>,
    ) {
        let mut annotations = Vec::with_capacity(self.annotations.len());
        for annotation in &self.annotations {
            if let Some(kept) = f("annotations", annotation) {
                annotations.push(kept);
            }
        }
        self.annotations = annotations;
        self.kind.rewrite_children(f);
    }

    /// Asserts variant invariants after a rewriting pass has published this
    /// node. Violations are compiler bugs.
    pub fn validate(&self) {
        match &self.kind {
            NodeKind::Path(path) => {
                if path.name.name.is_empty() {
                    crate::bug!("Path with an empty name");
                }
            }
            NodeKind::PathExpression(expr) => {
                if !expr.path.is::<Path>() {
                    crate::bug!("PathExpression holding a {}", expr.path.kind_name());
                }
            }
            NodeKind::TypeName(ty) => {
                if !ty.path.is::<Path>() {
                    crate::bug!("TypeName holding a {}", ty.path.kind_name());
                }
            }
            NodeKind::KeyElement(key) => {
                if !key.match_type.is::<TypeName>() {
                    crate::bug!("KeyElement match type is a {}", key.match_type.kind_name());
                }
            }
            NodeKind::MethodCallStatement(stmt) => {
                if !stmt.call.is::<MethodCallExpression>() {
                    crate::bug!("MethodCallStatement wrapping a {}", stmt.call.kind_name());
                }
            }
            NodeKind::ParamList(list) => {
                if let Some(stray) = list.params.iter().find(|p| !p.is::<Param>()) {
                    crate::bug!("ParamList containing a {}", stray.kind_name());
                }
            }
            NodeKind::TypeParamList(list) => {
                if let Some(stray) = list.params.iter().find(|p| !p.is::<TypeParam>()) {
                    crate::bug!("TypeParamList containing a {}", stray.kind_name());
                }
            }
            _ => {}
        }
    }
}

/// Structural equality: variant payloads and annotations, recursively
/// through shared child handles. Identity and source locations are ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.annotations == other.annotations && self.kind == other.kind
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.declared_name() {
            Some(name) => write!(f, "{} '{}' [{}]", self.kind_name(), name, self.id),
            None => write!(f, "{} [{}]", self.kind_name(), self.id),
        }
    }
}

/// Builds a node handle with neither location nor annotations.
pub fn node(kind: impl Into<NodeKind>) -> NodeRef {
    Node::new(kind).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: i64) -> NodeRef {
        node(Constant { value, width: None })
    }

    #[test]
    fn structural_equality_ignores_identity() {
        let a = constant(4);
        let b = constant(4);
        assert_ne!(a.id(), b.id());
        assert_eq!(*a, *b);

        let c = constant(5);
        assert_ne!(*a, *c);
    }

    #[test]
    fn shallow_clone_is_equal_but_not_identical() {
        let block = node(BlockStatement {
            components: vec![constant(1), constant(2)],
        });
        let copy = block.shallow_clone();

        assert_eq!(*block, copy);
        assert_ne!(block.id(), copy.id());

        // children are shared, not duplicated
        let orig = block.get::<BlockStatement>().unwrap();
        let cloned = copy.get::<BlockStatement>().unwrap();
        assert_eq!(orig.components[0].id(), cloned.components[0].id());
    }

    #[test]
    fn children_are_visited_in_declared_order() {
        let stmt = node(AssignmentStatement {
            left: node(PathExpression {
                path: node(Path {
                    name: "x".into(),
                    absolute: false,
                }),
            }),
            right: constant(1),
        });

        let mut slots = Vec::new();
        stmt.for_each_child(&mut |name, _| slots.push(name));
        assert_eq!(slots, vec!["left", "right"]);
    }

    #[test]
    fn rewrite_refuses_to_remove_required_child() {
        let mut stmt = node(AssignmentStatement {
            left: constant(0),
            right: constant(1),
        })
        .shallow_clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            stmt.rewrite_children(&mut |_, _| None);
        }));
        assert!(result.is_err());
    }
}
