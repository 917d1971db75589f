use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace};

use tapir_ir::visit::Frames;
use tapir_ir::{
    Ident, Instance, MatchKindGroup, Member, Method, MethodCallExpression, MethodCallStatement,
    NamespaceKind, NodeId, NodeRef, ParserState, Path, PathExpression, Program, SpecializedType,
    TypeName, TypeParam,
};
use tapir_utils::Errors;

use crate::error::ResolveError;

/// What a name occurrence may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    Any,
    Type,
    TypeVariable,
}

/// Scoped lookup against the traversal's ancestor chain.
///
/// Lazily flattens each namespace into a declaration list and a name bucket,
/// both keyed by node identity, so repeated lookups in the same scope stay
/// cheap. Failures accumulate in `errors` for the owning pass to report.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    any_order: bool,
    declarations: HashMap<NodeId, Rc<Vec<NodeRef>>>,
    buckets: HashMap<NodeId, Rc<IndexMap<String, Vec<NodeRef>>>>,
    pub errors: Errors<ResolveError>,
}

impl ResolutionContext {
    pub fn new(any_order: bool) -> Self {
        Self {
            any_order,
            ..Self::default()
        }
    }

    pub fn set_any_order(&mut self, any_order: bool) {
        self.any_order = any_order;
    }

    /// The declarations visible inside `ns`: contributions of its nested
    /// namespaces first, its own after, memoized per namespace.
    pub fn declarations(&mut self, ns: &NodeRef) -> Rc<Vec<NodeRef>> {
        if let Some(cached) = self.declarations.get(&ns.id()) {
            return cached.clone();
        }
        let mut decls = Vec::new();
        for nested in ns.nested_namespaces() {
            decls.extend(nested.own_declarations());
        }
        decls.extend(ns.own_declarations());

        let decls = Rc::new(decls);
        self.declarations.insert(ns.id(), decls.clone());
        decls
    }

    fn declarations_by_name(&mut self, ns: &NodeRef) -> Rc<IndexMap<String, Vec<NodeRef>>> {
        if let Some(cached) = self.buckets.get(&ns.id()) {
            return cached.clone();
        }
        let mut bucket: IndexMap<String, Vec<NodeRef>> = IndexMap::new();
        for decl in self.declarations(ns).iter() {
            if let Some(name) = decl.declared_name() {
                bucket
                    .entry(name.name.clone())
                    .or_insert_with(Vec::new)
                    .push(decl.clone());
            }
        }

        let bucket = Rc::new(bucket);
        self.buckets.insert(ns.id(), bucket.clone());
        bucket
    }

    /// Walks the ancestor chain outward, answering from the innermost
    /// namespace that knows the name. An `Any` lookup that comes up empty
    /// falls back to the match-kind namespace.
    pub fn resolve(&mut self, name: &Ident, kind: ResolutionKind, frames: &Frames) -> Vec<NodeRef> {
        for frame in frames.iter_outward() {
            if !frame.original.is_namespace() {
                continue;
            }
            let found = self.lookup(&frame.original, name, kind, frames);
            if !found.is_empty() {
                return found;
            }
        }
        if kind == ResolutionKind::Any {
            return self.lookup_match_kind(name, frames);
        }
        Vec::new()
    }

    /// Looks `name` up inside one namespace, filtering by kind and, outside
    /// the any-order mode, by declaration-before-use. Nested namespaces are
    /// searched in reverse declaration order when the namespace itself has
    /// no answer.
    pub fn lookup(
        &mut self,
        ns: &NodeRef,
        name: &Ident,
        kind: ResolutionKind,
        frames: &Frames,
    ) -> Vec<NodeRef> {
        trace!("looking up '{name}' in {ns}");

        match ns.namespace_kind() {
            Some(NamespaceKind::General) => {
                let bucket = self.declarations_by_name(ns);
                let mut decls = bucket.get(&name.name).cloned().unwrap_or_default();
                decls.retain(|d| matches_kind(d, kind));
                if !self.any_order && name.loc.is_some() {
                    decls.retain(|d| self.declared_before_use(d, name, kind, frames, true));
                }
                if !decls.is_empty() {
                    trace!("resolved '{name}' in {ns}");
                    return decls;
                }
            }
            Some(NamespaceKind::Simple) => {
                let mut decl = ns
                    .declaration_by_name(&name.name)
                    .filter(|d| matches_kind(d, kind));
                if let Some(d) = decl.clone() {
                    // parameters of a method may be referenced from
                    // annotations written ahead of it
                    let order_exempt = ns.is::<Method>();
                    if !self.any_order
                        && name.loc.is_some()
                        && !order_exempt
                        && !self.declared_before_use(&d, name, kind, frames, false)
                    {
                        decl = None;
                    }
                }
                if let Some(d) = decl {
                    trace!("resolved '{name}' in {ns}");
                    return vec![d];
                }
            }
            None => {}
        }

        for nested in ns.nested_namespaces().iter().rev() {
            let found = self.lookup(nested, name, kind, frames);
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Whether `d` may answer a use at `name`'s position. Type variables
    /// and parser states are referenced ahead of their declarations by
    /// design; a declaration never answers a use inside its own
    /// initializer, and a type name referring to the type being declared is
    /// diagnosed.
    fn declared_before_use(
        &mut self,
        d: &NodeRef,
        name: &Ident,
        kind: ResolutionKind,
        frames: &Frames,
        check_self_type: bool,
    ) -> bool {
        if d.is::<TypeParam>() || d.is::<ParserState>() {
            return true;
        }
        let Some(use_loc) = name.loc else {
            return true;
        };

        let mut before = match d.loc() {
            Some(decl_loc) => decl_loc.starts_before(use_loc),
            None => true,
        };
        trace!("position test for '{name}': before = {before}");

        match kind {
            ResolutionKind::Type if check_self_type => {
                let enclosing = frames
                    .iter_outward()
                    .map(|f| &f.original)
                    .find(|n| n.is_named_type_decl());
                if let Some(enclosing) = enclosing {
                    if enclosing.id() == d.id() {
                        self.errors.push(ResolveError::SelfReferentialType {
                            name: name.clone(),
                            decl: enclosing.to_string(),
                        });
                    }
                }
            }
            ResolutionKind::Any => {
                let enclosing = frames
                    .iter_outward()
                    .map(|f| &f.original)
                    .find(|n| n.is_declaration());
                if let Some(enclosing) = enclosing {
                    if enclosing.id() == d.id() {
                        before = false;
                    }
                }
            }
            _ => {}
        }
        before
    }

    /// Match kinds live in a flat namespace of their own: the union of the
    /// program's match-kind groups.
    pub fn lookup_match_kind(&mut self, name: &Ident, frames: &Frames) -> Vec<NodeRef> {
        debug!("resolving '{name}' as match kind");
        let Some(program) = frames.enclosing::<Program>().cloned() else {
            return Vec::new();
        };
        let Some(objects) = program.get::<Program>().map(|p| p.objects.clone()) else {
            return Vec::new();
        };
        for object in &objects {
            if object.is::<MatchKindGroup>() {
                let found = self.lookup(object, name, ResolutionKind::Any, frames);
                if !found.is_empty() {
                    return found;
                }
            }
        }
        Vec::new()
    }

    /// The argument vector of the nearest enclosing call or instantiation
    /// whose callee is `name`, used to pick between overloads. The walk
    /// only crosses expression and type frames.
    pub fn method_arguments(&self, name: &str, frames: &Frames) -> Option<Vec<NodeRef>> {
        for frame in frames.iter_outward() {
            let node = &frame.original;

            let call = match node.get::<MethodCallStatement>() {
                Some(stmt) => stmt.call.get::<MethodCallExpression>(),
                None => node.get::<MethodCallExpression>(),
            };
            if let Some(call) = call {
                if let Some(member) = call.method.get::<Member>() {
                    if member.member.name == name {
                        return Some(call.arguments.clone());
                    }
                }
                if let Some(callee) = call.method.get::<PathExpression>() {
                    if path_name(&callee.path) == Some(name) {
                        return Some(call.arguments.clone());
                    }
                }
                return None;
            }

            if let Some(instance) = node.get::<Instance>() {
                if instance.name.name == name {
                    return Some(instance.arguments.clone());
                }
                if let Some(ty) = instance.ty.get::<TypeName>() {
                    if path_name(&ty.path) == Some(name) {
                        return Some(instance.arguments.clone());
                    }
                }
                if let Some(specialized) = instance.ty.get::<SpecializedType>() {
                    if let Some(base) = specialized.base.get::<TypeName>() {
                        if path_name(&base.path) == Some(name) {
                            return Some(instance.arguments.clone());
                        }
                    }
                }
                return None;
            }

            if !(frame.current.is_expression() || frame.current.is_type_node()) {
                return None;
            }
        }
        None
    }

    /// Resolves to exactly one declaration, filtering overload sets through
    /// the argument vector in context. Failures are recorded in `errors`.
    pub fn resolve_unique(
        &mut self,
        name: &Ident,
        kind: ResolutionKind,
        ns: Option<&NodeRef>,
        frames: &Frames,
    ) -> Option<NodeRef> {
        debug!(
            "resolving '{name}' as {}",
            match kind {
                ResolutionKind::Type => "type",
                _ => "identifier",
            }
        );

        let mut decls = match ns {
            Some(ns) => self.lookup(ns, name, kind, frames),
            None => self.resolve(name, kind, frames),
        };
        trace!("lookup found {} declarations", decls.len());

        if decls.len() > 1 {
            if let Some(args) = self.method_arguments(&name.name, frames) {
                decls.retain(|d| d.call_matches(&args).unwrap_or(true));
            }
        }

        match decls.len() {
            0 => {
                self.errors.push(ResolveError::NotFound { name: name.clone() });
                None
            }
            1 => Some(decls.remove(0)),
            _ => {
                let candidates = decls.iter().map(|d| (d.to_string(), d.loc())).collect();
                self.errors.push(ResolveError::Ambiguous {
                    name: name.clone(),
                    candidates,
                });
                None
            }
        }
    }

    /// Resolves a path node: absolute paths start from the program root,
    /// and type position narrows the kind.
    pub fn resolve_path(
        &mut self,
        path: &NodeRef,
        is_type: bool,
        frames: &Frames,
    ) -> Option<NodeRef> {
        let p = path.get::<Path>()?;
        let kind = if is_type {
            ResolutionKind::Type
        } else {
            ResolutionKind::Any
        };
        let root = if p.absolute {
            frames.enclosing::<Program>().cloned()
        } else {
            None
        };
        self.resolve_unique(&p.name, kind, root.as_ref(), frames)
    }
}

fn matches_kind(d: &NodeRef, kind: ResolutionKind) -> bool {
    match kind {
        ResolutionKind::Any => true,
        ResolutionKind::Type => d.is_type_decl(),
        ResolutionKind::TypeVariable => d.is::<TypeParam>(),
    }
}

fn path_name(path: &NodeRef) -> Option<&str> {
    path.get::<Path>().map(|p| p.name.name.as_str())
}
