//! Capability views over the node algebra.
//!
//! Nodes advertise what they can do through tag inspection: a variant either
//! is a declaration, scopes declarations, or supports overload matching, and
//! passes discover this by pattern match rather than virtual dispatch.

use crate::node::{
    Argument, Ident, Instance, MatchKindGroup, Method, Node, NodeKind, NodeRef, Param, ParamList,
    Table, TypeParamList,
};

/// How a namespace answers lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    /// Answers a by-name query in one step; names are unique.
    Simple,
    /// Exposes a declaration sequence that may repeat names; callers filter.
    General,
}

impl Node {
    /// The name this node binds, if it is a declaration.
    pub fn declared_name(&self) -> Option<&Ident> {
        match self.kind() {
            NodeKind::Control(n) => Some(&n.name),
            NodeKind::ControlType(n) => Some(&n.name),
            NodeKind::Parser(n) => Some(&n.name),
            NodeKind::ParserType(n) => Some(&n.name),
            NodeKind::Package(n) => Some(&n.name),
            NodeKind::ParserState(n) => Some(&n.name),
            NodeKind::Action(n) => Some(&n.name),
            NodeKind::Table(n) => Some(&n.name),
            NodeKind::TableProperty(n) => Some(&n.name),
            NodeKind::Extern(n) => Some(&n.name),
            NodeKind::Method(n) => Some(&n.name),
            NodeKind::Function(n) => Some(&n.name),
            NodeKind::Struct(n) => Some(&n.name),
            NodeKind::Header(n) => Some(&n.name),
            NodeKind::StructField(n) => Some(&n.name),
            NodeKind::Instance(n) => Some(&n.name),
            NodeKind::Variable(n) => Some(&n.name),
            NodeKind::ConstantDecl(n) => Some(&n.name),
            NodeKind::Param(n) => Some(&n.name),
            NodeKind::TypeParam(n) => Some(&n.name),
            NodeKind::MatchKindName(n) => Some(&n.name),
            _ => None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.declared_name().is_some()
    }

    /// Whether this node opens a lexical scope, either with declarations of
    /// its own or through nested namespaces.
    pub fn is_namespace(&self) -> bool {
        self.namespace_kind().is_some() || !self.nested_namespaces().is_empty()
    }

    pub fn namespace_kind(&self) -> Option<NamespaceKind> {
        match self.kind() {
            NodeKind::ParamList(_)
            | NodeKind::TypeParamList(_)
            | NodeKind::Method(_)
            | NodeKind::Table(_)
            | NodeKind::MatchKindGroup(_)
            | NodeKind::Instance(_) => Some(NamespaceKind::Simple),
            NodeKind::Program(_)
            | NodeKind::Control(_)
            | NodeKind::Parser(_)
            | NodeKind::ParserState(_)
            | NodeKind::BlockStatement(_)
            | NodeKind::TableProperties(_)
            | NodeKind::Struct(_)
            | NodeKind::Header(_)
            | NodeKind::Extern(_) => Some(NamespaceKind::General),
            _ => None,
        }
    }

    /// The declarations this namespace contributes directly, in declaration
    /// order. Contributions of nested namespaces are not included.
    pub fn own_declarations(&self) -> Vec<NodeRef> {
        fn declared(nodes: &[NodeRef]) -> Vec<NodeRef> {
            nodes
                .iter()
                .filter(|n| n.is_declaration())
                .cloned()
                .collect()
        }

        match self.kind() {
            NodeKind::Program(n) => declared(&n.objects),
            NodeKind::Control(n) => n.locals.clone(),
            NodeKind::Parser(n) => {
                let mut decls = n.locals.clone();
                decls.extend(n.states.iter().cloned());
                decls
            }
            NodeKind::ParserState(n) => declared(&n.components),
            NodeKind::BlockStatement(n) => declared(&n.components),
            NodeKind::TableProperties(n) => n.properties.clone(),
            NodeKind::Struct(n) => n.fields.clone(),
            NodeKind::Header(n) => n.fields.clone(),
            NodeKind::Extern(n) => n.methods.clone(),
            NodeKind::ParamList(n) => n.params.clone(),
            NodeKind::TypeParamList(n) => n.params.clone(),
            NodeKind::Method(n) => {
                let mut decls = list_of(&n.params);
                decls.extend(list_of(&n.type_params));
                decls
            }
            NodeKind::Table(n) => match n.properties.get::<crate::node::TableProperties>() {
                Some(props) => props.properties.clone(),
                None => Vec::new(),
            },
            NodeKind::MatchKindGroup(n) => n.members.clone(),
            NodeKind::Instance(n) => declared(&n.initializer),
            _ => Vec::new(),
        }
    }

    /// One-step lookup for simple namespaces. `None` either means the name
    /// is absent or the node is not a simple namespace.
    pub fn declaration_by_name(&self, name: &str) -> Option<NodeRef> {
        fn by_name(nodes: &[NodeRef], name: &str) -> Option<NodeRef> {
            nodes
                .iter()
                .find(|n| n.declared_name().is_some_and(|id| id.name == name))
                .cloned()
        }

        match self.kind() {
            NodeKind::ParamList(ParamList { params }) => by_name(params, name),
            NodeKind::TypeParamList(TypeParamList { params }) => by_name(params, name),
            NodeKind::Method(Method {
                params,
                type_params,
                ..
            }) => by_name(&list_of(params), name).or_else(|| by_name(&list_of(type_params), name)),
            NodeKind::Table(Table { properties, .. }) => {
                let props = properties.get::<crate::node::TableProperties>()?;
                by_name(&props.properties, name)
            }
            NodeKind::MatchKindGroup(MatchKindGroup { members }) => by_name(members, name),
            NodeKind::Instance(Instance { initializer, .. }) => by_name(initializer, name),
            _ => None,
        }
    }

    /// The inner namespaces searched after this node's own declarations, in
    /// declaration order. Resolution walks them in reverse, so the last one
    /// listed wins.
    pub fn nested_namespaces(&self) -> Vec<NodeRef> {
        match self.kind() {
            NodeKind::Control(n) => vec![
                n.type_params.clone(),
                n.apply_params.clone(),
                n.constructor_params.clone(),
            ],
            NodeKind::Parser(n) => vec![
                n.type_params.clone(),
                n.apply_params.clone(),
                n.constructor_params.clone(),
            ],
            NodeKind::ControlType(n) => vec![n.type_params.clone(), n.apply_params.clone()],
            NodeKind::ParserType(n) => vec![n.type_params.clone(), n.apply_params.clone()],
            NodeKind::Package(n) => vec![n.type_params.clone(), n.constructor_params.clone()],
            NodeKind::Function(n) => vec![n.type_params.clone(), n.params.clone()],
            NodeKind::Extern(n) => vec![n.type_params.clone()],
            NodeKind::Action(n) => vec![n.params.clone()],
            _ => Vec::new(),
        }
    }

    /// Overload matching: whether this declaration accepts the given
    /// positional argument vector. `None` means the node is not callable.
    pub fn call_matches(&self, args: &[NodeRef]) -> Option<bool> {
        let params = match self.kind() {
            NodeKind::Action(n) => &n.params,
            NodeKind::Function(n) => &n.params,
            NodeKind::Method(n) => &n.params,
            NodeKind::Control(n) => &n.constructor_params,
            NodeKind::Parser(n) => &n.constructor_params,
            NodeKind::Package(n) => &n.constructor_params,
            _ => return None,
        };
        let Some(list) = params.get::<ParamList>() else {
            return Some(false);
        };

        if args.len() != list.params.len() {
            return Some(false);
        }
        for arg in args {
            if let Some(Argument {
                name: Some(name), ..
            }) = arg.get::<Argument>()
            {
                let known = list
                    .params
                    .iter()
                    .any(|p| p.get::<Param>().is_some_and(|p| p.name == *name));
                if !known {
                    return Some(false);
                }
            }
        }
        Some(true)
    }

    /// Whether this declaration names a type.
    pub fn is_type_decl(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::Struct(_)
                | NodeKind::Header(_)
                | NodeKind::Extern(_)
                | NodeKind::ControlType(_)
                | NodeKind::ParserType(_)
                | NodeKind::Package(_)
                | NodeKind::TypeParam(_)
        )
    }

    /// Type declarations that introduce a named nominal type; type variables
    /// are excluded.
    pub fn is_named_type_decl(&self) -> bool {
        self.is_type_decl() && !self.is::<crate::node::TypeParam>()
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::PathExpression(_)
                | NodeKind::This(_)
                | NodeKind::Member(_)
                | NodeKind::Constant(_)
                | NodeKind::BoolLiteral(_)
                | NodeKind::StringLiteral(_)
                | NodeKind::MethodCallExpression(_)
                | NodeKind::SelectExpression(_)
        )
    }

    pub fn is_type_node(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::TypeName(_)
                | NodeKind::SpecializedType(_)
                | NodeKind::BitsType(_)
                | NodeKind::BoolType(_)
                | NodeKind::VoidType(_)
        )
    }

    /// The `@noWarn("...")` suppressions attached to this node.
    pub fn suppressed_warnings(&self) -> impl Iterator<Item = &str> {
        self.annotations().iter().filter_map(|a| {
            let annotation = a.get::<crate::node::Annotation>()?;
            if annotation.name.name != "noWarn" {
                return None;
            }
            annotation.string_value()
        })
    }
}

fn list_of(list: &NodeRef) -> Vec<NodeRef> {
    match list.kind() {
        NodeKind::ParamList(l) => l.params.clone(),
        NodeKind::TypeParamList(l) => l.params.clone(),
        _ => Vec::new(),
    }
}
