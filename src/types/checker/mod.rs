/// Lumen static type checker.
///
/// Walks the AST recursively, passing a type environment and an optional
/// expected type used for local inference. Every check returns a semantic
/// type; a `Type::Error` halts the current statement chain and is reported
/// through the module loader, which attaches source context.
///
/// Split:
/// - `infer` — expression checking
/// - `calls` — call sites, constructors, member access, trait dispatch
/// - `patterns` — `match`/`when` checking and exhaustiveness
/// - `builtins` — hardwired builtin signatures and the prelude
mod builtins;
mod calls;
mod infer;
mod patterns;

pub use builtins::{seed_prelude, Prelude};

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{
    Expr, FunctionLit, ImplDecl, LetTarget, Param, Program, Stmt, TypeExpr, TypeParam,
};
use crate::lexer::Token;
use crate::loader::ModuleLoader;
use crate::types::env::{ImplEntry, TypeEnv};
use crate::types::subst::Subst;
use crate::types::unify::unify;
use crate::types::{RecordType, SumType, TraitType, Type};

/// A semantic error extracted from a `Type::Error`, ready for rendering.
#[derive(Debug, Clone)]
pub struct SemanticError {
    pub message: String,
    pub token: Option<Token>,
}

pub struct Checker<'a> {
    pub(crate) loader: &'a mut ModuleLoader,
    fresh: usize,
}

/// Check a whole program against `env`. The first semantic error aborts.
pub fn check_program(
    program: &Program,
    env: &TypeEnv,
    loader: &mut ModuleLoader,
) -> Result<(), SemanticError> {
    let mut checker = Checker::new(loader);
    for (index, stmt) in program.statements.iter().enumerate() {
        let ty = checker.check_stmt(stmt, env, index == 0);
        if let Type::Error { message, token } = ty {
            return Err(SemanticError { message, token });
        }
    }
    Ok(())
}

/// Check a single statement against a persistent environment (REPL use).
pub fn check_stmt_in(
    stmt: &Stmt,
    env: &TypeEnv,
    loader: &mut ModuleLoader,
) -> Result<Type, SemanticError> {
    let mut checker = Checker::new(loader);
    match checker.check_stmt(stmt, env, false) {
        Type::Error { message, token } => Err(SemanticError { message, token }),
        ty => Ok(ty),
    }
}

impl<'a> Checker<'a> {
    pub fn new(loader: &'a mut ModuleLoader) -> Self {
        Checker { loader, fresh: 0 }
    }

    /// Fresh type variables use a leading quote so they can never collide
    /// with a user-written name.
    pub(crate) fn fresh_var_bounded(&mut self, bounds: Vec<Type>) -> Type {
        self.fresh += 1;
        Type::Var {
            name: format!("'t{}", self.fresh),
            bounds,
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    pub(crate) fn check_stmt(&mut self, stmt: &Stmt, env: &TypeEnv, first: bool) -> Type {
        match stmt {
            Stmt::Let {
                token,
                mutable,
                target,
                annotation,
                value,
            } => self.check_let(token, *mutable, target, annotation, value, env),
            Stmt::Return { token, value } => self.check_return(token, value.as_ref(), env),
            Stmt::TypeDecl {
                token,
                name,
                type_params,
                variants,
            } => self.check_type_decl(token, name, type_params, variants, env),
            Stmt::RecordDecl {
                token,
                name,
                type_params,
                fields,
            } => self.check_record_decl(token, name, type_params, fields, env),
            Stmt::TraitDecl {
                token,
                name,
                type_params,
                methods,
            } => self.check_trait_decl(token, name, type_params, methods, env),
            Stmt::Impl(decl) => self.check_impl(decl, env),
            Stmt::ModuleDecl {
                token,
                name: _,
                exposing,
            } => {
                if !first {
                    return Type::error(
                        "a module header must be the first statement in a file",
                        token,
                    );
                }
                env.set_exposed(exposing.clone());
                Type::Null
            }
            Stmt::Use {
                token,
                path,
                alias,
                exposing,
            } => self.check_use(token, path, alias.as_deref(), exposing.as_deref(), env),
            Stmt::Expr { expr, .. } => {
                let ty = self.check_expr(expr, env, None);
                if ty.is_error() {
                    return ty;
                }
                // A named function literal in statement position binds its name.
                if let Expr::Function(lit) = expr {
                    if let Some(name) = &lit.name {
                        env.define(name.clone(), ty.clone(), false);
                    }
                }
                ty
            }
        }
    }

    fn check_let(
        &mut self,
        token: &Token,
        mutable: bool,
        target: &LetTarget,
        annotation: &Option<TypeExpr>,
        value: &Expr,
        env: &TypeEnv,
    ) -> Type {
        let declared = match annotation {
            Some(te) => {
                let ty = self.resolve_type_expr(te, env);
                if ty.is_error() {
                    return ty;
                }
                Some(ty)
            }
            None => None,
        };

        // A fully-annotated function literal is pre-bound under the let name
        // so its body can recurse.
        if let (LetTarget::Ident(name), Expr::Function(lit)) = (target, value) {
            if let Some(fn_ty) = self.declared_fn_type(lit, env) {
                env.define(name.clone(), fn_ty, mutable);
            }
        }

        let value_ty = self.check_expr(value, env, declared.as_ref());
        if value_ty.is_error() {
            return value_ty;
        }

        let bound_ty = match &declared {
            Some(decl_ty) => {
                let mut subst = Subst::new();
                if !unify(&value_ty, decl_ty, &mut subst) {
                    return Type::error(
                        format!(
                            "type mismatch in let binding: declared {}, found {}",
                            decl_ty, value_ty
                        ),
                        token,
                    );
                }
                decl_ty.clone()
            }
            None => value_ty.clone(),
        };

        match target {
            LetTarget::Ident(name) => {
                env.define(name.clone(), bound_ty, mutable);
                Type::Null
            }
            LetTarget::Tuple(names) => match &bound_ty {
                Type::Tuple(elements) if elements.len() == names.len() => {
                    for (name, ty) in names.iter().zip(elements) {
                        env.define(name.clone(), ty.clone(), mutable);
                    }
                    Type::Null
                }
                other => Type::error(
                    format!(
                        "cannot destructure {} into a tuple of {} names",
                        other,
                        names.len()
                    ),
                    token,
                ),
            },
            LetTarget::Array { elements, rest } => match &bound_ty {
                Type::Array(el) => {
                    for name in elements {
                        env.define(name.clone(), (**el).clone(), mutable);
                    }
                    if let Some(rest_name) = rest {
                        env.define(rest_name.clone(), Type::Array(el.clone()), mutable);
                    }
                    Type::Null
                }
                other => Type::error(
                    format!("cannot destructure {} with an array pattern", other),
                    token,
                ),
            },
            LetTarget::ActivePattern(cases) => {
                self.register_active_pattern(token, cases, &bound_ty, env)
            }
        }
    }

    /// `let (|Even|Odd|) = fn ...` — the bound function must take one
    /// argument and return a sum whose variant names are exactly the cases.
    fn register_active_pattern(
        &mut self,
        token: &Token,
        cases: &[String],
        fn_ty: &Type,
        env: &TypeEnv,
    ) -> Type {
        let ret = match fn_ty {
            Type::Function { params, ret, .. } if params.len() == 1 => ret.as_ref().clone(),
            other => {
                return Type::error(
                    format!(
                        "an active pattern must be a one-argument function, found {}",
                        other
                    ),
                    token,
                )
            }
        };
        match &ret {
            Type::Sum { decl, .. } => {
                for case in cases {
                    if decl.variant(case).is_none() {
                        return Type::error(
                            format!("'{}' is not a variant of {}", case, decl.name),
                            token,
                        );
                    }
                }
            }
            other => {
                return Type::error(
                    format!("an active pattern function must return a sum type, found {}", other),
                    token,
                )
            }
        }
        for case in cases {
            env.register_active_pattern(case.clone(), fn_ty.clone());
        }
        Type::Null
    }

    fn check_return(&mut self, token: &Token, value: Option<&Expr>, env: &TypeEnv) -> Type {
        let frame = match env.current_ret() {
            Some(frame) => frame,
            None => return Type::error("'return' outside of a function", token),
        };
        let value_ty = match value {
            Some(expr) => self.check_expr(expr, env, frame.as_ref()),
            None => Type::Null,
        };
        if value_ty.is_error() {
            return value_ty;
        }
        if let Some(expected) = frame {
            let mut subst = Subst::new();
            if !unify(&value_ty, &expected, &mut subst) {
                return Type::error(
                    format!(
                        "return type mismatch: function declares {}, found {}",
                        expected, value_ty
                    ),
                    token,
                );
            }
        }
        // `return` diverges; Any unifies with any surrounding branch type.
        Type::Any
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// Child scope with the declaration's type parameters visible as type
    /// variables (carrying their trait bounds).
    fn param_scope(&mut self, type_params: &[TypeParam], env: &TypeEnv) -> Result<TypeEnv, Type> {
        let scope = env.child();
        for tp in type_params {
            let mut bounds = Vec::new();
            for bound_name in &tp.bounds {
                match env.lookup_type(bound_name) {
                    Some(t @ Type::Trait { .. }) => bounds.push(t),
                    Some(other) => {
                        return Err(Type::error(
                            format!("'{}' is not a trait (it is {})", bound_name, other),
                            &tp.token,
                        ))
                    }
                    None => {
                        return Err(Type::error(
                            format!("unknown trait '{}' in bound", bound_name),
                            &tp.token,
                        ))
                    }
                }
            }
            scope.define_type(
                tp.name.clone(),
                Type::Var {
                    name: tp.name.clone(),
                    bounds,
                },
            );
        }
        Ok(scope)
    }

    pub(crate) fn param_vars(type_params: &[TypeParam]) -> Vec<Type> {
        type_params.iter().map(|tp| Type::var(&tp.name)).collect()
    }

    fn check_type_decl(
        &mut self,
        _token: &Token,
        name: &str,
        type_params: &[TypeParam],
        variants: &[crate::ast::VariantDecl],
        env: &TypeEnv,
    ) -> Type {
        let decl = Rc::new(SumType {
            name: name.to_string(),
            type_params: type_params.iter().map(|tp| tp.name.clone()).collect(),
            variants: RefCell::new(Vec::new()),
        });
        let generic_args = Self::param_vars(type_params);
        // Register before resolving payloads so recursive references work.
        env.define_type(
            name.to_string(),
            Type::Sum {
                decl: Rc::clone(&decl),
                type_args: generic_args.clone(),
            },
        );

        let scope = match self.param_scope(type_params, env) {
            Ok(s) => s,
            Err(e) => return e,
        };

        for variant in variants {
            if decl.variant(&variant.name).is_some() {
                return Type::error(
                    format!("duplicate variant '{}' in type {}", variant.name, name),
                    &variant.token,
                );
            }
            let mut payload = Vec::new();
            for te in &variant.params {
                let ty = self.resolve_type_expr(te, &scope);
                if ty.is_error() {
                    return ty;
                }
                payload.push(ty);
            }
            decl.variants
                .borrow_mut()
                .push((variant.name.clone(), payload));
        }

        // Each variant is usable by its unqualified name in expression
        // position, as a constructor function (or bare value when it has no
        // payload).
        let bound_params: Vec<(String, Vec<Type>)> = type_params
            .iter()
            .map(|tp| (tp.name.clone(), Vec::new()))
            .collect();
        for (vname, payload) in decl.variants.borrow().iter() {
            env.define_ctor(
                vname.clone(),
                Type::Function {
                    params: payload.clone(),
                    ret: Box::new(Type::Sum {
                        decl: Rc::clone(&decl),
                        type_args: generic_args.clone(),
                    }),
                    type_params: bound_params.clone(),
                },
            );
        }
        Type::Null
    }

    fn check_record_decl(
        &mut self,
        token: &Token,
        name: &str,
        type_params: &[TypeParam],
        fields: &[(String, TypeExpr)],
        env: &TypeEnv,
    ) -> Type {
        let decl = Rc::new(RecordType {
            name: name.to_string(),
            type_params: type_params.iter().map(|tp| tp.name.clone()).collect(),
            fields: RefCell::new(Vec::new()),
        });
        let generic_args = Self::param_vars(type_params);
        env.define_type(
            name.to_string(),
            Type::Record {
                decl: Rc::clone(&decl),
                type_args: generic_args.clone(),
            },
        );

        let scope = match self.param_scope(type_params, env) {
            Ok(s) => s,
            Err(e) => return e,
        };
        for (fname, te) in fields {
            if decl.field(fname).is_some() {
                return Type::error(
                    format!("duplicate field '{}' in record {}", fname, name),
                    token,
                );
            }
            let ty = self.resolve_type_expr(te, &scope);
            if ty.is_error() {
                return ty;
            }
            decl.fields.borrow_mut().push((fname.clone(), ty));
        }

        let field_types: Vec<Type> = decl
            .fields
            .borrow()
            .iter()
            .map(|(_, t)| t.clone())
            .collect();
        env.define_ctor(
            name.to_string(),
            Type::Function {
                params: field_types,
                ret: Box::new(Type::Record {
                    decl,
                    type_args: generic_args,
                }),
                type_params: type_params
                    .iter()
                    .map(|tp| (tp.name.clone(), Vec::new()))
                    .collect(),
            },
        );
        Type::Null
    }

    fn check_trait_decl(
        &mut self,
        _token: &Token,
        name: &str,
        type_params: &[TypeParam],
        methods: &[crate::ast::TraitMethod],
        env: &TypeEnv,
    ) -> Type {
        let decl = Rc::new(TraitType {
            name: name.to_string(),
            type_params: type_params.iter().map(|tp| tp.name.clone()).collect(),
            methods: RefCell::new(Vec::new()),
        });
        env.define_type(
            name.to_string(),
            Type::Trait {
                decl: Rc::clone(&decl),
                type_args: Self::param_vars(type_params),
            },
        );

        let scope = match self.param_scope(type_params, env) {
            Ok(s) => s,
            Err(e) => return e,
        };
        scope.define_type("Self".to_string(), Type::var("Self"));

        for method in methods {
            let mut params = Vec::new();
            for (i, p) in method.params.iter().enumerate() {
                if i == 0 && p.name == "self" && p.annotation.is_none() {
                    params.push(Type::var("Self"));
                    continue;
                }
                match &p.annotation {
                    Some(te) => {
                        let ty = self.resolve_type_expr(te, &scope);
                        if ty.is_error() {
                            return ty;
                        }
                        params.push(ty);
                    }
                    None => {
                        return Type::error(
                            format!(
                                "trait method parameter '{}' requires a type annotation",
                                p.name
                            ),
                            &p.token,
                        )
                    }
                }
            }
            let ret = match &method.return_type {
                Some(te) => {
                    let ty = self.resolve_type_expr(te, &scope);
                    if ty.is_error() {
                        return ty;
                    }
                    ty
                }
                None => Type::Null,
            };
            decl.methods.borrow_mut().push((
                method.name.clone(),
                Type::function(params, ret),
            ));
        }
        Type::Null
    }

    fn check_impl(&mut self, decl: &ImplDecl, env: &TypeEnv) -> Type {
        let trait_ty = match env.lookup_type(&decl.trait_name) {
            Some(t @ Type::Trait { .. }) => t,
            Some(other) => {
                return Type::error(
                    format!("'{}' is not a trait (it is {})", decl.trait_name, other),
                    &decl.token,
                )
            }
            None => {
                return Type::error(
                    format!("unknown trait '{}'", decl.trait_name),
                    &decl.token,
                )
            }
        };
        let trait_decl = match &trait_ty {
            Type::Trait { decl, .. } => Rc::clone(decl),
            _ => unreachable!(),
        };

        let scope = match self.param_scope(&decl.type_params, env) {
            Ok(s) => s,
            Err(e) => return e,
        };
        let target = self.resolve_type_expr(&decl.target, &scope);
        if target.is_error() {
            return target;
        }

        let mut trait_args = Vec::new();
        for te in &decl.trait_args {
            let ty = self.resolve_type_expr(te, &scope);
            if ty.is_error() {
                return ty;
            }
            trait_args.push(ty);
        }
        if trait_args.len() != trait_decl.type_params.len() {
            return Type::error(
                format!(
                    "trait {} expects {} type argument(s), got {}",
                    trait_decl.name,
                    trait_decl.type_params.len(),
                    trait_args.len()
                ),
                &decl.token,
            );
        }

        // Register first so method bodies can dispatch through the receiver.
        let entry = ImplEntry {
            decl: Rc::new(decl.clone()),
            env: env.clone(),
        };
        env.add_impl(target.base_name(), entry);

        // Substitute the trait's parameters and `Self`, then verify each
        // method against the provided signature.
        let mut subst = Subst::new();
        subst.insert("Self", target.clone());
        for (param, arg) in trait_decl.type_params.iter().zip(&trait_args) {
            subst.insert(param.clone(), arg.clone());
        }

        let trait_methods = trait_decl.methods.borrow().clone();
        for (mname, sig) in &trait_methods {
            let expected = subst.apply(sig);
            let provided = match decl
                .methods
                .iter()
                .find(|m| m.name.as_deref() == Some(mname.as_str()))
            {
                Some(m) => m,
                None => {
                    return Type::error(
                        format!(
                            "impl of {} for {} is missing method '{}'",
                            trait_decl.name, target, mname
                        ),
                        &decl.token,
                    )
                }
            };
            let provided_ty = self.check_impl_method(provided, &target, &scope);
            if provided_ty.is_error() {
                return provided_ty;
            }
            let mut method_subst = Subst::new();
            if !unify(&provided_ty, &expected, &mut method_subst) {
                return Type::error(
                    format!(
                        "method '{}' does not match the trait signature: expected {}, found {}",
                        mname, expected, provided_ty
                    ),
                    &provided.token,
                );
            }
        }

        for m in &decl.methods {
            let name = m.name.as_deref().unwrap_or_default();
            if trait_decl.method(name).is_none() {
                return Type::error(
                    format!("'{}' is not a method of trait {}", name, trait_decl.name),
                    &m.token,
                );
            }
        }
        Type::Null
    }

    /// Type-check an impl method body with `self` bound to the target type,
    /// returning the method's function type (including `self`).
    fn check_impl_method(&mut self, lit: &FunctionLit, target: &Type, env: &TypeEnv) -> Type {
        let scope = env.child();
        let mut params = Vec::new();
        for (i, p) in lit.params.iter().enumerate() {
            let ty = if i == 0 && p.name == "self" && p.annotation.is_none() {
                target.clone()
            } else {
                match &p.annotation {
                    Some(te) => {
                        let t = self.resolve_type_expr(te, env);
                        if t.is_error() {
                            return t;
                        }
                        t
                    }
                    None => {
                        return Type::error(
                            format!("impl method parameter '{}' requires a type annotation", p.name),
                            &p.token,
                        )
                    }
                }
            };
            scope.define(p.name.clone(), ty.clone(), false);
            params.push(ty);
        }

        let declared_ret = match &lit.return_type {
            Some(te) => {
                let t = self.resolve_type_expr(te, env);
                if t.is_error() {
                    return t;
                }
                Some(t)
            }
            None => None,
        };
        scope.set_current_ret(declared_ret.clone());

        let body_ty = self.check_expr(&lit.body, &scope, declared_ret.as_ref());
        if body_ty.is_error() {
            return body_ty;
        }
        let ret = match declared_ret {
            Some(declared) => {
                let mut subst = Subst::new();
                if !unify(&body_ty, &declared, &mut subst) {
                    return Type::error(
                        format!(
                            "method body has type {}, but the signature declares {}",
                            body_ty, declared
                        ),
                        &lit.token,
                    );
                }
                declared
            }
            None => body_ty,
        };
        // Methods carry `self` in the stored signature; call sites drop it.
        Type::Function {
            params,
            ret: Box::new(ret),
            type_params: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // use
    // -----------------------------------------------------------------------

    fn check_use(
        &mut self,
        token: &Token,
        path: &[String],
        alias: Option<&str>,
        exposing: Option<&[String]>,
        env: &TypeEnv,
    ) -> Type {
        let name = path.join(".");
        let loaded = match self.loader.load(&name) {
            Ok(module) => module,
            Err(err) => return Type::error(err.to_string(), token),
        };
        let module_env = loaded.type_env.clone();

        // Trait implementations always flow to the importer.
        for (base, entries) in module_env.local_impls() {
            for entry in entries {
                env.add_impl(base.clone(), entry);
            }
        }

        if let Some(names) = exposing {
            for n in names {
                if !module_env.is_exposed(n) {
                    return Type::error(
                        format!("'{}' is not exposed by module {}", n, name),
                        token,
                    );
                }
                let mut found = false;
                if let Some(ty) = module_env.ctor(n) {
                    env.define_ctor(n.clone(), ty);
                    found = true;
                }
                if let Some(ty) = module_env.lookup_type(n) {
                    env.define_type(n.clone(), ty);
                    found = true;
                }
                if let Some(binding) = module_env.get(n) {
                    env.define(n.clone(), binding.ty, false);
                    found = true;
                }
                if !found {
                    return Type::error(
                        format!("module {} has no binding named '{}'", name, n),
                        token,
                    );
                }
            }
            return Type::Null;
        }

        let bind_name = alias
            .map(|a| a.to_string())
            .unwrap_or_else(|| path.last().cloned().unwrap_or_default());
        env.define(
            bind_name,
            Type::Module {
                name,
                env: module_env,
            },
            false,
        );
        Type::Null
    }

    // -----------------------------------------------------------------------
    // Type expression resolution
    // -----------------------------------------------------------------------

    pub(crate) fn resolve_type_expr(&mut self, te: &TypeExpr, env: &TypeEnv) -> Type {
        match te {
            TypeExpr::Name { token, name } => match name.as_str() {
                "Integer" => Type::Integer,
                "Double" => Type::Double,
                "Boolean" => Type::Boolean,
                "String" => Type::Str,
                "Null" => Type::Null,
                "Any" => Type::Any,
                _ => match env.lookup_type(name) {
                    Some(ty) => self.check_generic_arity(ty, &[], token),
                    None => Type::error(format!("unknown type '{}'", name), token),
                },
            },
            TypeExpr::Generic { token, name, args } => {
                let mut resolved = Vec::new();
                for arg in args {
                    let ty = self.resolve_type_expr(arg, env);
                    if ty.is_error() {
                        return ty;
                    }
                    resolved.push(ty);
                }
                match name.as_str() {
                    "Array" => {
                        if resolved.len() != 1 {
                            return Type::error("Array expects 1 type argument", token);
                        }
                        Type::Array(Box::new(resolved.pop().unwrap()))
                    }
                    "Hash" => {
                        if resolved.len() != 2 {
                            return Type::error("Hash expects 2 type arguments", token);
                        }
                        let v = resolved.pop().unwrap();
                        let k = resolved.pop().unwrap();
                        Type::Hash(Box::new(k), Box::new(v))
                    }
                    _ => {
                        let base = if name.contains('.') {
                            let segments: Vec<String> =
                                name.split('.').map(|s| s.to_string()).collect();
                            self.resolve_path_type(token, &segments, env)
                        } else {
                            match env.lookup_type(name) {
                                Some(ty) => ty,
                                None => {
                                    return Type::error(
                                        format!("unknown type '{}'", name),
                                        token,
                                    )
                                }
                            }
                        };
                        if base.is_error() {
                            return base;
                        }
                        self.check_generic_arity(base, &resolved, token)
                    }
                }
            }
            TypeExpr::Path { token, segments } => self.resolve_path_type(token, segments, env),
            TypeExpr::Function { params, ret, .. } => {
                let mut ps = Vec::new();
                for p in params {
                    let ty = self.resolve_type_expr(p, env);
                    if ty.is_error() {
                        return ty;
                    }
                    ps.push(ty);
                }
                let r = self.resolve_type_expr(ret, env);
                if r.is_error() {
                    return r;
                }
                Type::function(ps, r)
            }
            TypeExpr::Tuple { elements, .. } => {
                let mut es = Vec::new();
                for e in elements {
                    let ty = self.resolve_type_expr(e, env);
                    if ty.is_error() {
                        return ty;
                    }
                    es.push(ty);
                }
                Type::Tuple(es)
            }
        }
    }

    fn resolve_path_type(&mut self, token: &Token, segments: &[String], env: &TypeEnv) -> Type {
        if segments.len() < 2 {
            return Type::error("a type path needs at least two segments", token);
        }
        let module_name = &segments[0];
        let module_env = match env.get(module_name) {
            Some(binding) => match binding.ty {
                Type::Module { env, .. } => env,
                other => {
                    return Type::error(
                        format!("'{}' is not a module (it is {})", module_name, other),
                        token,
                    )
                }
            },
            None => return Type::error(format!("unknown module '{}'", module_name), token),
        };
        let type_name = &segments[1];
        if !module_env.is_exposed(type_name) {
            return Type::error(
                format!("'{}' is not exposed by module {}", type_name, module_name),
                token,
            );
        }
        match module_env.lookup_type(type_name) {
            Some(ty) => self.check_generic_arity(ty, &[], token),
            None => Type::error(
                format!("module {} has no type named '{}'", module_name, type_name),
                token,
            ),
        }
    }

    /// Generic declarations must be applied to exactly their parameter
    /// count; a bare reference to a generic type is an error.
    fn check_generic_arity(&mut self, base: Type, args: &[Type], token: &Token) -> Type {
        match base {
            Type::Sum { decl, .. } => {
                if decl.type_params.len() != args.len() {
                    return Type::error(
                        format!(
                            "type {} expects {} type argument(s), got {}",
                            decl.name,
                            decl.type_params.len(),
                            args.len()
                        ),
                        token,
                    );
                }
                Type::Sum {
                    decl,
                    type_args: args.to_vec(),
                }
            }
            Type::Record { decl, .. } => {
                if decl.type_params.len() != args.len() {
                    return Type::error(
                        format!(
                            "record {} expects {} type argument(s), got {}",
                            decl.name,
                            decl.type_params.len(),
                            args.len()
                        ),
                        token,
                    );
                }
                Type::Record {
                    decl,
                    type_args: args.to_vec(),
                }
            }
            Type::Trait { decl, .. } => {
                if decl.type_params.len() != args.len() {
                    return Type::error(
                        format!(
                            "trait {} expects {} type argument(s), got {}",
                            decl.name,
                            decl.type_params.len(),
                            args.len()
                        ),
                        token,
                    );
                }
                Type::Trait {
                    decl,
                    type_args: args.to_vec(),
                }
            }
            other => {
                if args.is_empty() {
                    other
                } else {
                    Type::error(format!("type {} takes no type arguments", other), token)
                }
            }
        }
    }

    /// The fully-declared type of a function literal when every parameter is
    /// annotated and a return type is present; enables recursion.
    pub(crate) fn declared_fn_type(&mut self, lit: &FunctionLit, env: &TypeEnv) -> Option<Type> {
        lit.return_type.as_ref()?;
        if !lit.params.iter().all(|p| p.annotation.is_some()) {
            return None;
        }
        let scope = self.param_scope(&lit.type_params, env).ok()?;
        let mut params = Vec::new();
        for p in &lit.params {
            let ty = self.resolve_type_expr(p.annotation.as_ref().unwrap(), &scope);
            if ty.is_error() {
                return None;
            }
            params.push(ty);
        }
        let ret = self.resolve_type_expr(lit.return_type.as_ref().unwrap(), &scope);
        if ret.is_error() {
            return None;
        }
        Some(Type::Function {
            params,
            ret: Box::new(ret),
            type_params: lit
                .type_params
                .iter()
                .map(|tp| {
                    let bounds = tp
                        .bounds
                        .iter()
                        .filter_map(|b| env.lookup_type(b))
                        .collect();
                    (tp.name.clone(), bounds)
                })
                .collect(),
        })
    }

    pub(crate) fn param_scope_for_fn(
        &mut self,
        params: &[TypeParam],
        env: &TypeEnv,
    ) -> Result<TypeEnv, Type> {
        self.param_scope(params, env)
    }

    pub(crate) fn check_param_annotation(
        &mut self,
        p: &Param,
        env: &TypeEnv,
    ) -> Option<Type> {
        p.annotation
            .as_ref()
            .map(|te| self.resolve_type_expr(te, env))
    }
}
