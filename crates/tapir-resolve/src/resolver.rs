use std::collections::HashMap;

use log::debug;

use tapir_core::CompilerContext;
use tapir_ir::visit::{Frames, InspectCtx, Inspector};
use tapir_ir::{
    Control, Extern, Function, Instance, KeyElement, Method, NodeRef, Package, Param, Parser,
    Path, PathExpression, Program, StructField, TypeName,
};
use tapir_span::Diagnostic;

use crate::context::{ResolutionContext, ResolutionKind};
use crate::error::ResolveError;
use crate::map::ReferenceMap;

/// Binds every path reachable from the program root to a declaration,
/// recording the bindings in a [`ReferenceMap`].
///
/// Declarations are referenced from many places, so the pass visits every
/// occurrence of a shared node. Unresolved names, ambiguous overloads and
/// shadowing findings are diagnostics; the pass always runs to completion.
pub struct ResolveReferences<'a> {
    refs: &'a mut ReferenceMap,
    ctx: &'a mut CompilerContext,
    resolution: ResolutionContext,
    check_shadow: bool,
}

impl<'a> ResolveReferences<'a> {
    pub fn new(refs: &'a mut ReferenceMap, ctx: &'a mut CompilerContext) -> Self {
        let check_shadow = ctx.options.check_shadowing;
        let any_order = ctx.options.is_v1();
        Self {
            refs,
            ctx,
            resolution: ResolutionContext::new(any_order),
            check_shadow,
        }
    }

    fn resolve_path(&mut self, path: &NodeRef, is_type: bool, frames: &Frames) {
        match self.resolution.resolve_path(path, is_type, frames) {
            Some(declaration) => self.refs.set_declaration(path, declaration),
            None => {
                if let Some(p) = path.get::<Path>() {
                    self.refs.used_name(p.name.name.clone());
                }
            }
        }
        self.flush_errors();
    }

    fn flush_errors(&mut self) {
        for error in self.resolution.errors.take() {
            self.ctx.report.add_diagnostic(error.into());
        }
    }

    fn scope_name(&mut self, n: &NodeRef) {
        if let Some(name) = n.declared_name() {
            self.refs.used_name(name.name.clone());
        }
    }

    fn shadow_warning_enabled(&self, frames: &Frames) -> bool {
        if !self.ctx.warning_enabled("shadow") {
            return false;
        }
        frames
            .iter_outward()
            .all(|f| !f.original.suppressed_warnings().any(|w| w == "shadow"))
    }

    /// Flags name collisions within `ns` and against enclosing scopes.
    ///
    /// Methods and functions overload, constructors share their type's
    /// name, and struct fields never hide anything; those stay silent.
    /// Hiding a parameter is an error, every other collision a warning.
    fn check_shadowing(&mut self, ns: &NodeRef, frames: &Frames) {
        if !self.check_shadow {
            return;
        }
        let warn_enabled = self.shadow_warning_enabled(frames);
        let decls = self.resolution.declarations(ns);
        let mut prev_in_scope: HashMap<String, NodeRef> = HashMap::new();

        for decl in decls.iter() {
            if decl.is::<StructField>() {
                continue;
            }
            if decl.is::<Param>() && frames.is_in::<Method>() {
                continue;
            }
            let Some(name) = decl.declared_name().cloned() else {
                continue;
            };

            if let Some(previous) = prev_in_scope.get(&name.name) {
                if warn_enabled {
                    self.warn_shadowing(decl, previous);
                }
            } else if !decl.is::<Method>() && !decl.is::<Function>() {
                prev_in_scope.insert(name.name.clone(), decl.clone());
            }

            for previous in self.hidden_declarations(ns, &name, decl, frames) {
                if (previous.is::<Method>() || previous.is::<Extern>() || previous.is::<Program>())
                    && (decl.is::<Method>()
                        || decl.is::<Function>()
                        || decl.is::<Control>()
                        || decl.is::<Parser>()
                        || decl.is::<Package>())
                {
                    // overloads, and constructors named after their type
                    continue;
                }
                if previous.is::<Param>() && !decl.is::<Param>() {
                    self.ctx.report.add_diagnostic(error_shadows_param(decl, &previous));
                }
                if warn_enabled {
                    self.warn_shadowing(decl, &previous);
                }
            }
        }
        self.flush_errors();
    }

    /// The declarations `decl` hides: other bindings of the same name in
    /// `ns` itself, plus the innermost answer of the scopes enclosing `ns`.
    fn hidden_declarations(
        &mut self,
        ns: &NodeRef,
        name: &tapir_ir::Ident,
        decl: &NodeRef,
        frames: &Frames,
    ) -> Vec<NodeRef> {
        let mut hidden: Vec<NodeRef> = self
            .resolution
            .lookup(ns, name, ResolutionKind::Any, frames)
            .into_iter()
            .filter(|p| p.id() != decl.id())
            .collect();

        let mut past_ns = false;
        for frame in frames.iter_outward() {
            if !past_ns {
                past_ns = frame.original.id() == ns.id();
                continue;
            }
            if !frame.original.is_namespace() {
                continue;
            }
            let outer = self
                .resolution
                .lookup(&frame.original, name, ResolutionKind::Any, frames);
            if !outer.is_empty() {
                hidden.extend(outer.into_iter().filter(|p| p.id() != decl.id()));
                break;
            }
        }
        hidden
    }

    fn warn_shadowing(&mut self, decl: &NodeRef, previous: &NodeRef) {
        let mut diagnostic =
            Diagnostic::warn(decl.loc(), format!("'{decl}' shadows '{previous}'"));
        if let Some(loc) = previous.loc() {
            diagnostic = diagnostic.with_trace([("hidden declaration".to_owned(), loc)]);
        }
        self.ctx.report.add_diagnostic(diagnostic);
    }
}

fn error_shadows_param(decl: &NodeRef, param: &NodeRef) -> Diagnostic {
    let mut diagnostic = Diagnostic::error(
        decl.loc(),
        format!("declaration of '{decl}' shadows a parameter '{param}'"),
    );
    if let Some(loc) = param.loc() {
        diagnostic = diagnostic.with_trace([("parameter declared here".to_owned(), loc)]);
    }
    diagnostic
}

impl Inspector for ResolveReferences<'_> {
    fn visit_dag_once(&self) -> bool {
        false
    }

    fn init(&mut self, root: &NodeRef) {
        self.resolution.set_any_order(self.refs.is_v1());
        // shadow findings are re-checked even when the map is current
        if !self.refs.check_map(root) || self.check_shadow {
            self.refs.clear();
        }
    }

    fn end(&mut self, root: &NodeRef) {
        self.refs.update_map(root);
    }

    fn pre_program(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) -> bool {
        !self.refs.check_map(n)
    }

    fn post_program(&mut self, _n: &NodeRef, _visit: &mut InspectCtx<'_>) {
        debug!("reference map holds {} bindings", self.refs.len());
    }

    fn pre_path_expression(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        if let Some(expr) = n.get::<PathExpression>() {
            let path = expr.path.clone();
            self.resolve_path(&path, false, visit.frames);
        }
        true
    }

    fn pre_type_name(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        if let Some(ty) = n.get::<TypeName>() {
            let path = ty.path.clone();
            self.resolve_path(&path, true, visit.frames);
        }
        true
    }

    fn pre_this(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        let instance = visit.frames.enclosing::<Instance>().cloned();
        let inside_function = visit.frames.is_in::<Function>();
        match instance {
            Some(instance) if inside_function => {
                self.refs.set_declaration(n, instance);
                true
            }
            _ => {
                self.ctx
                    .report
                    .add_diagnostic(ResolveError::InvalidThis { loc: n.loc() }.into());
                false
            }
        }
    }

    /// The match type names a match kind, not a lexically scoped
    /// declaration, so it is bound here rather than by the type-name hook.
    fn pre_key_element(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        let Some(element) = n.get::<KeyElement>() else {
            return true;
        };
        let Some(match_type) = element.match_type.get::<TypeName>() else {
            return true;
        };
        let path = match_type.path.clone();
        let Some(name) = path.get::<Path>().map(|p| p.name.clone()) else {
            return true;
        };

        let matches = self.resolution.lookup_match_kind(&name, visit.frames);
        match matches.len() {
            0 => {
                self.resolution
                    .errors
                    .push(ResolveError::NotFound { name: name.clone() });
                self.refs.used_name(name.name.clone());
            }
            1 => self.refs.set_declaration(&path, matches[0].clone()),
            _ => {
                let candidates = matches.iter().map(|d| (d.to_string(), d.loc())).collect();
                self.resolution
                    .errors
                    .push(ResolveError::Ambiguous { name, candidates });
            }
        }
        self.flush_errors();
        true
    }

    fn pre_control(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_parser(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_function(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_action(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_extern(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_method(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_parser_state(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_struct(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_header(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_table(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        true
    }

    fn pre_table_properties(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_block_statement(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.check_shadowing(n, visit.frames);
        true
    }

    fn pre_instance(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) -> bool {
        self.scope_name(n);
        true
    }

    fn pre_control_type(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.check_shadowing(n, visit.frames);
        true
    }

    fn post_control_type(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) {
        self.scope_name(n);
    }

    fn pre_parser_type(&mut self, n: &NodeRef, visit: &mut InspectCtx<'_>) -> bool {
        self.check_shadowing(n, visit.frames);
        true
    }

    fn post_parser_type(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) {
        self.scope_name(n);
    }

    fn post_package(&mut self, n: &NodeRef, _visit: &mut InspectCtx<'_>) {
        // packages have no body, so there is nothing to shadow
        self.scope_name(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapir_core::Options;
    use tapir_ir::{
        Action, Annotation, Argument, AssignmentStatement, BitsType, BlockStatement, Constant,
        Direction, Ident, Key, MatchKindGroup, MatchKindName, MethodCallExpression,
        MethodCallStatement, Node, ParamList, ParserState, ReturnStatement, StringLiteral, Struct,
        Table, TableProperties, TableProperty, This, TypeParamList, Variable, node,
    };
    use tapir_span::{Loc, SourceId};

    fn loc(pos: usize) -> Loc {
        Loc::from_range(SourceId::new(0), pos..pos + 1)
    }

    fn ident(name: &str, pos: usize) -> Ident {
        Ident::at(name, loc(pos))
    }

    fn at(kind: impl Into<tapir_ir::NodeKind>, pos: usize) -> NodeRef {
        Node::new(kind).with_loc(loc(pos)).build()
    }

    fn no_params() -> NodeRef {
        node(ParamList { params: Vec::new() })
    }

    fn no_type_params() -> NodeRef {
        node(TypeParamList { params: Vec::new() })
    }

    fn bits(width: u32) -> NodeRef {
        node(BitsType { width })
    }

    fn path_node(name: &str, pos: usize) -> NodeRef {
        at(
            Path {
                name: ident(name, pos),
                absolute: false,
            },
            pos,
        )
    }

    fn path_expr(path: NodeRef) -> NodeRef {
        node(PathExpression { path })
    }

    fn param(name: &str, pos: usize, width: u32) -> NodeRef {
        at(
            Param {
                name: ident(name, pos),
                direction: Direction::None,
                ty: bits(width),
            },
            pos,
        )
    }

    fn action(name: &str, pos: usize, params: Vec<NodeRef>) -> NodeRef {
        at(
            Action {
                name: ident(name, pos),
                params: node(ParamList { params }),
                body: node(BlockStatement {
                    components: Vec::new(),
                }),
            },
            pos,
        )
    }

    fn variable(name: &str, pos: usize) -> NodeRef {
        at(
            Variable {
                name: ident(name, pos),
                ty: bits(8),
                initializer: None,
            },
            pos,
        )
    }

    fn call_statement(path: NodeRef, arguments: Vec<NodeRef>) -> NodeRef {
        node(MethodCallStatement {
            call: node(MethodCallExpression {
                method: path_expr(path),
                type_args: Vec::new(),
                arguments,
            }),
        })
    }

    fn control(name: &str, pos: usize, locals: Vec<NodeRef>, body: Vec<NodeRef>) -> NodeRef {
        at(
            Control {
                name: ident(name, pos),
                type_params: no_type_params(),
                apply_params: no_params(),
                constructor_params: no_params(),
                locals,
                body: node(BlockStatement { components: body }),
            },
            pos,
        )
    }

    fn program(objects: Vec<NodeRef>) -> NodeRef {
        node(Program { objects })
    }

    fn resolve(root: &NodeRef, options: Options) -> (ReferenceMap, CompilerContext) {
        let is_v1 = options.is_v1();
        let mut ctx = CompilerContext::new(options);
        let mut refs = ReferenceMap::new(is_v1);
        ResolveReferences::new(&mut refs, &mut ctx).apply(root);
        (refs, ctx)
    }

    #[test]
    fn call_sites_bind_to_the_matching_overload() {
        let nullary = action("a", 10, Vec::new());
        let unary = action("a", 20, vec![param("x", 21, 8)]);

        let call_empty_path = path_node("a", 30);
        let call_arg_path = path_node("a", 40);
        let argument = node(Argument {
            name: None,
            value: node(Constant {
                value: 0,
                width: Some(8),
            }),
        });

        let root = program(vec![control(
            "c",
            1,
            vec![nullary.clone(), unary.clone()],
            vec![
                call_statement(call_empty_path.clone(), Vec::new()),
                call_statement(call_arg_path.clone(), vec![argument]),
            ],
        )]);

        let (refs, ctx) = resolve(&root, Options::default());

        assert_eq!(ctx.error_count(), 0);
        assert_eq!(refs.declaration(&call_empty_path).unwrap().id(), nullary.id());
        assert_eq!(refs.declaration(&call_arg_path).unwrap().id(), unary.id());
    }

    #[test]
    fn equally_matching_overloads_are_ambiguous() {
        let first = action("a", 10, Vec::new());
        let second = action("a", 20, Vec::new());
        let call_path = path_node("a", 30);

        let root = program(vec![control(
            "c",
            1,
            vec![first, second],
            vec![call_statement(call_path.clone(), Vec::new())],
        )]);

        let (refs, ctx) = resolve(&root, Options::default());

        assert_eq!(ctx.error_count(), 1);
        assert!(refs.declaration(&call_path).is_none());
        assert!(refs.is_used("a"));
    }

    #[test]
    fn uses_do_not_see_later_declarations() {
        let use_path = path_node("x", 10);
        let assignment = node(AssignmentStatement {
            left: path_expr(use_path.clone()),
            right: node(Constant {
                value: 1,
                width: None,
            }),
        });

        let root = program(vec![control(
            "c",
            1,
            Vec::new(),
            vec![assignment, variable("x", 20)],
        )]);

        let (refs, ctx) = resolve(&root, Options::default());
        assert_eq!(ctx.error_count(), 1);
        assert!(refs.declaration(&use_path).is_none());
        assert!(refs.is_used("x"));
    }

    #[test]
    fn the_legacy_dialect_resolves_in_any_order() {
        let use_path = path_node("x", 10);
        let assignment = node(AssignmentStatement {
            left: path_expr(use_path.clone()),
            right: node(Constant {
                value: 1,
                width: None,
            }),
        });
        let declaration = variable("x", 20);

        let root = program(vec![control(
            "c",
            1,
            Vec::new(),
            vec![assignment, declaration.clone()],
        )]);

        let options = Options {
            version: tapir_core::LanguageVersion::V1,
            ..Options::default()
        };
        let (refs, ctx) = resolve(&root, options);

        assert_eq!(ctx.error_count(), 0);
        assert_eq!(refs.declaration(&use_path).unwrap().id(), declaration.id());
    }

    #[test]
    fn shadowing_is_reported_only_when_asked_for() {
        let outer = variable("h", 5);
        let inner = variable("h", 15);
        let nested_block = node(BlockStatement {
            components: vec![inner],
        });

        let root = program(vec![control(
            "c",
            1,
            vec![outer],
            vec![nested_block],
        )]);

        let (_, quiet) = resolve(&root, Options::default());
        assert_eq!(quiet.report.warning_count(), 0);

        let options = Options {
            check_shadowing: true,
            ..Options::default()
        };
        let (_, ctx) = resolve(&root, options);
        assert_eq!(ctx.error_count(), 0);
        assert_eq!(ctx.report.warning_count(), 1);
        let warning = &ctx.report.diagnostics[0];
        assert!(warning.message.contains("'Variable 'h'"));
        assert!(warning.message.contains("shadows"));
        assert_eq!(warning.trace.len(), 1);
    }

    #[test]
    fn no_warn_annotations_silence_shadow_warnings() {
        let outer = variable("h", 5);
        let inner = variable("h", 15);
        let nested_block = node(BlockStatement {
            components: vec![inner],
        });
        let suppression = node(Annotation {
            name: "noWarn".into(),
            value: Some(node(StringLiteral {
                value: "shadow".into(),
            })),
        });
        let shadowing_control = Node::new(Control {
            name: ident("c", 1),
            type_params: no_type_params(),
            apply_params: no_params(),
            constructor_params: no_params(),
            locals: vec![outer],
            body: node(BlockStatement {
                components: vec![nested_block],
            }),
        })
        .with_annotations([suppression])
        .build();

        let root = program(vec![shadowing_control]);
        let options = Options {
            check_shadowing: true,
            ..Options::default()
        };
        let (_, ctx) = resolve(&root, options);
        assert_eq!(ctx.report.warning_count(), 0);
    }

    #[test]
    fn hiding_a_parameter_is_an_error() {
        let hidden = param("x", 2, 8);
        let local = variable("x", 10);
        let shadowing_control = at(
            Control {
                name: ident("c", 1),
                type_params: no_type_params(),
                apply_params: node(ParamList {
                    params: vec![hidden],
                }),
                constructor_params: no_params(),
                locals: vec![local],
                body: node(BlockStatement {
                    components: Vec::new(),
                }),
            },
            1,
        );

        let root = program(vec![shadowing_control]);
        let options = Options {
            check_shadowing: true,
            ..Options::default()
        };
        let (_, ctx) = resolve(&root, options);

        assert_eq!(ctx.error_count(), 1);
        let error = ctx
            .report
            .diagnostics
            .iter()
            .find(|d| d.is_error())
            .unwrap();
        assert!(error.message.contains("shadows a parameter"));
    }

    #[test]
    fn key_elements_resolve_their_match_kind() {
        let exact = at(
            MatchKindName {
                name: ident("exact", 2),
            },
            2,
        );
        let kinds = node(MatchKindGroup {
            members: vec![exact.clone()],
        });

        let key_var = variable("v", 5);
        let match_type_path = path_node("exact", 31);
        let expr_path = path_node("v", 30);
        let table = at(
            Table {
                name: ident("t", 20),
                properties: node(TableProperties {
                    properties: vec![node(TableProperty {
                        name: ident("key", 25),
                        value: node(Key {
                            elements: vec![node(KeyElement {
                                expression: path_expr(expr_path.clone()),
                                match_type: node(TypeName {
                                    path: match_type_path.clone(),
                                }),
                            })],
                        }),
                    })],
                }),
            },
            20,
        );

        let root = program(vec![
            kinds,
            control("c", 4, vec![key_var.clone(), table], Vec::new()),
        ]);

        let (refs, ctx) = resolve(&root, Options::default());

        assert_eq!(ctx.error_count(), 0);
        assert_eq!(refs.declaration(&match_type_path).unwrap().id(), exact.id());
        assert_eq!(refs.declaration(&expr_path).unwrap().id(), key_var.id());
    }

    #[test]
    fn unknown_match_kinds_are_not_found() {
        let match_type_path = path_node("fuzzy", 31);
        let key_var = variable("v", 5);
        let expr_path = path_node("v", 30);
        let table = at(
            Table {
                name: ident("t", 20),
                properties: node(TableProperties {
                    properties: vec![node(TableProperty {
                        name: ident("key", 25),
                        value: node(Key {
                            elements: vec![node(KeyElement {
                                expression: path_expr(expr_path),
                                match_type: node(TypeName {
                                    path: match_type_path.clone(),
                                }),
                            })],
                        }),
                    })],
                }),
            },
            20,
        );

        let root = program(vec![control("c", 4, vec![key_var, table], Vec::new())]);
        let (refs, ctx) = resolve(&root, Options::default());

        assert_eq!(ctx.error_count(), 1);
        assert!(refs.declaration(&match_type_path).is_none());
        assert!(refs.is_used("fuzzy"));
    }

    #[test]
    fn this_binds_to_the_enclosing_instance() {
        let extern_decl = at(
            Extern {
                name: ident("E", 1),
                type_params: no_type_params(),
                methods: Vec::new(),
            },
            1,
        );
        let this_node = node(This {});
        let abstract_method = at(
            Function {
                name: ident("f", 11),
                return_type: bits(8),
                type_params: no_type_params(),
                params: no_params(),
                body: node(BlockStatement {
                    components: vec![node(ReturnStatement {
                        value: Some(this_node.clone()),
                    })],
                }),
            },
            11,
        );
        let instance = at(
            Instance {
                name: ident("i", 10),
                ty: node(TypeName {
                    path: path_node("E", 10),
                }),
                arguments: Vec::new(),
                initializer: vec![abstract_method],
            },
            10,
        );

        let root = program(vec![extern_decl, instance.clone()]);
        let (refs, ctx) = resolve(&root, Options::default());

        assert_eq!(ctx.error_count(), 0);
        assert_eq!(refs.declaration(&this_node).unwrap().id(), instance.id());
    }

    #[test]
    fn this_outside_an_abstract_method_is_invalid() {
        let this_node = node(This {});
        let root = program(vec![control(
            "c",
            1,
            Vec::new(),
            vec![node(ReturnStatement {
                value: Some(this_node.clone()),
            })],
        )]);

        let (refs, ctx) = resolve(&root, Options::default());
        assert_eq!(ctx.error_count(), 1);
        assert!(refs.declaration(&this_node).is_none());
    }

    #[test]
    fn self_referential_types_are_diagnosed() {
        let field_type_path = path_node("S", 10);
        let recursive = at(
            Struct {
                name: ident("S", 5),
                fields: vec![at(
                    StructField {
                        name: ident("f", 9),
                        ty: node(TypeName {
                            path: field_type_path,
                        }),
                    },
                    9,
                )],
            },
            5,
        );

        let root = program(vec![recursive]);
        let (_, ctx) = resolve(&root, Options::default());

        assert_eq!(ctx.error_count(), 1);
        assert!(
            ctx.report.diagnostics[0]
                .message
                .contains("Self-referencing")
                || ctx.report.diagnostics[0]
                    .message
                    .contains("self-referencing")
        );
    }

    #[test]
    fn parser_states_may_be_referenced_ahead() {
        let next_path = path_node("s1", 12);
        let start = at(
            ParserState {
                name: ident("s0", 10),
                components: Vec::new(),
                transition: Some(path_expr(next_path.clone())),
            },
            10,
        );
        let next = at(
            ParserState {
                name: ident("s1", 20),
                components: Vec::new(),
                transition: None,
            },
            20,
        );
        let parser = at(
            Parser {
                name: ident("p", 1),
                type_params: no_type_params(),
                apply_params: no_params(),
                constructor_params: no_params(),
                locals: Vec::new(),
                states: vec![start, next.clone()],
            },
            1,
        );

        let root = program(vec![parser]);
        let (refs, ctx) = resolve(&root, Options::default());

        assert_eq!(ctx.error_count(), 0);
        assert_eq!(refs.declaration(&next_path).unwrap().id(), next.id());
    }

    #[test]
    fn every_path_is_bound_or_recorded_after_resolution() {
        let use_path = path_node("v", 30);
        let missing_path = path_node("nowhere", 40);
        let root = program(vec![control(
            "c",
            1,
            vec![variable("v", 5)],
            vec![
                node(AssignmentStatement {
                    left: path_expr(use_path.clone()),
                    right: node(Constant {
                        value: 1,
                        width: None,
                    }),
                }),
                node(AssignmentStatement {
                    left: path_expr(missing_path.clone()),
                    right: node(Constant {
                        value: 2,
                        width: None,
                    }),
                }),
            ],
        )]);

        let (refs, _) = resolve(&root, Options::default());

        let mut paths = Vec::new();
        collect_paths(&root, &mut paths);
        for path in paths {
            let bound = refs.declaration(&path).is_some();
            let recorded = path
                .get::<Path>()
                .is_some_and(|p| refs.is_used(&p.name.name));
            assert!(bound || recorded, "unaccounted path {path}");
        }
        assert!(refs.declaration(&use_path).is_some());
        assert!(refs.declaration(&missing_path).is_none());
    }

    fn collect_paths(n: &NodeRef, out: &mut Vec<NodeRef>) {
        if n.is::<Path>() {
            out.push(n.clone());
        }
        n.for_each_child(&mut |_, child| collect_paths(child, out));
    }

    #[test]
    fn a_settled_map_short_circuits_the_next_run() {
        let use_path = path_node("v", 30);
        let root = program(vec![control(
            "c",
            1,
            vec![variable("v", 5)],
            vec![node(AssignmentStatement {
                left: path_expr(use_path.clone()),
                right: node(Constant {
                    value: 1,
                    width: None,
                }),
            })],
        )]);

        let mut ctx = CompilerContext::new(Options::default());
        let mut refs = ReferenceMap::new(false);
        ResolveReferences::new(&mut refs, &mut ctx).apply(&root);
        assert!(refs.check_map(&root));
        let bindings = refs.len();

        // a second run over the same root keeps the map as it is
        ResolveReferences::new(&mut refs, &mut ctx).apply(&root);
        assert_eq!(refs.len(), bindings);
        assert_eq!(ctx.error_count(), 0);
    }
}
