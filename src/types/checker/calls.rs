/// Call sites, constructors, member access, and trait dispatch.
use crate::ast::{Expr, FunctionLit};
use crate::lexer::Token;
use crate::types::env::{ImplEntry, TypeEnv};
use crate::types::subst::Subst;
use crate::types::unify::unify;
use crate::types::Type;

use super::builtins::variadic_builtin;
use super::Checker;

impl Checker<'_> {
    /// Instantiate a generic function type with fresh variables. Returns the
    /// instantiated type and the fresh variables created (with their trait
    /// bounds) for later bound checking.
    pub(crate) fn instantiate_fn(&mut self, ty: &Type) -> (Type, Vec<(String, Vec<Type>)>) {
        match ty {
            Type::Function {
                params,
                ret,
                type_params,
            } if !type_params.is_empty() => {
                let mut subst = Subst::new();
                let mut fresh_vars = Vec::new();
                for (name, bounds) in type_params {
                    let fresh = self.fresh_var_bounded(bounds.clone());
                    if let Type::Var { name: fresh_name, .. } = &fresh {
                        fresh_vars.push((fresh_name.clone(), bounds.clone()));
                    }
                    subst.insert(name.clone(), fresh);
                }
                let instantiated = Type::Function {
                    params: params.iter().map(|p| subst.apply(p)).collect(),
                    ret: Box::new(subst.apply(ret)),
                    type_params: Vec::new(),
                };
                (instantiated, fresh_vars)
            }
            other => (other.clone(), Vec::new()),
        }
    }

    pub(crate) fn check_call(
        &mut self,
        token: &Token,
        callee: &Expr,
        args: &[Expr],
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        // Variadic builtins bypass arity checking.
        if let Expr::Ident { name, .. } = callee {
            if env.get(name).is_some() && env.ctor(name).is_none() {
                if let Some(ret) = variadic_builtin(name) {
                    if name == "strFormat" {
                        if args.is_empty() {
                            return Type::error(
                                "strFormat expects a format string as its first argument",
                                token,
                            );
                        }
                        let fmt_ty = self.check_expr(&args[0], env, Some(&Type::Str));
                        if fmt_ty.is_error() {
                            return fmt_ty;
                        }
                        let mut subst = Subst::new();
                        if !unify(&fmt_ty, &Type::Str, &mut subst) {
                            return Type::error(
                                format!("strFormat expects a String format, found {}", fmt_ty),
                                args[0].token(),
                            );
                        }
                        for arg in &args[1..] {
                            let ty = self.check_expr(arg, env, None);
                            if ty.is_error() {
                                return ty;
                            }
                        }
                    } else {
                        for arg in args {
                            let ty = self.check_expr(arg, env, None);
                            if ty.is_error() {
                                return ty;
                            }
                        }
                    }
                    return ret;
                }
            }
        }

        // Constructors shadow bindings, so resolve the callee through the
        // constructor table first (without collapsing zero-payload variants).
        let callee_ty = match callee {
            Expr::Ident { token, name } => match env.ctor(name) {
                Some(ctor) => ctor,
                None => match env.get(name) {
                    Some(binding) => binding.ty,
                    None => {
                        return Type::error(format!("unknown identifier '{}'", name), token)
                    }
                },
            },
            other => self.check_expr(other, env, None),
        };
        if callee_ty.is_error() {
            return callee_ty;
        }
        if matches!(callee_ty, Type::Any) {
            for arg in args {
                let ty = self.check_expr(arg, env, None);
                if ty.is_error() {
                    return ty;
                }
            }
            return Type::Any;
        }

        let (instantiated, fresh_vars) = self.instantiate_fn(&callee_ty);
        let (params, ret) = match &instantiated {
            Type::Function { params, ret, .. } => (params.clone(), ret.as_ref().clone()),
            other => {
                return Type::error(format!("{} is not callable", other), token);
            }
        };

        if params.len() != args.len() {
            let what = match &ret {
                Type::Sum { decl, .. } => format!("constructor of {}", decl.name),
                Type::Record { decl, .. } => format!("constructor of {}", decl.name),
                _ => "function".to_string(),
            };
            return Type::error(
                format!(
                    "{} expects {} argument(s), got {}",
                    what,
                    params.len(),
                    args.len()
                ),
                token,
            );
        }

        let mut subst = Subst::new();
        // An expected result type drives inference of missing type
        // arguments (e.g. `Ok(3)` where `Result<Integer, String>` is
        // expected).
        if let Some(exp) = expected {
            unify(&ret, exp, &mut subst);
        }

        for (param, arg) in params.iter().zip(args) {
            let param_now = subst.apply(param);
            let arg_ty = self.check_expr(arg, env, Some(&param_now));
            if arg_ty.is_error() {
                return arg_ty;
            }
            if !unify(&arg_ty, &param_now, &mut subst) {
                return Type::error(
                    format!(
                        "argument type mismatch: expected {}, found {}",
                        subst.apply(&param_now),
                        arg_ty
                    ),
                    arg.token(),
                );
            }
        }

        // Remaining bound variables are checked against their trait bounds
        // through the implementation table.
        if let Some(err) = self.check_var_bounds(&fresh_vars, &subst, env, token) {
            return err;
        }

        subst.apply(&ret)
    }

    /// For each instantiated type variable that resolved to a concrete
    /// type, every trait bound must have a matching implementation.
    pub(crate) fn check_var_bounds(
        &mut self,
        fresh_vars: &[(String, Vec<Type>)],
        subst: &Subst,
        env: &TypeEnv,
        token: &Token,
    ) -> Option<Type> {
        for (name, bounds) in fresh_vars {
            if bounds.is_empty() {
                continue;
            }
            let resolved = subst.resolve(&Type::var(name.clone()));
            if matches!(resolved, Type::Var { .. } | Type::Any) {
                continue;
            }
            for bound in bounds {
                let trait_name = match bound {
                    Type::Trait { decl, .. } => decl.name.clone(),
                    other => other.to_string(),
                };
                if !self.type_implements(&resolved, &trait_name, env) {
                    return Some(Type::error(
                        format!("{} does not implement trait {}", resolved, trait_name),
                        token,
                    ));
                }
            }
        }
        None
    }

    fn type_implements(&mut self, ty: &Type, trait_name: &str, env: &TypeEnv) -> bool {
        env.impls_for(&ty.base_name())
            .iter()
            .any(|entry| entry.decl.trait_name == trait_name)
    }

    /// Member access resolution order: module export, record field, hash
    /// field by String key, then trait method on the receiver's base type.
    pub(crate) fn check_member(
        &mut self,
        token: &Token,
        object: &Expr,
        property: &str,
        env: &TypeEnv,
    ) -> Type {
        let obj_ty = self.check_expr(object, env, None);
        if obj_ty.is_error() {
            return obj_ty;
        }

        match &obj_ty {
            Type::Module { name, env: module_env } => {
                if !module_env.is_exposed(property) {
                    return Type::error(
                        format!("'{}' is not exposed by module {}", property, name),
                        token,
                    );
                }
                if let Some(ctor) = module_env.ctor(property) {
                    return self.instantiate_bare_ctor(ctor);
                }
                if let Some(binding) = module_env.get(property) {
                    return binding.ty;
                }
                Type::error(
                    format!("module {} has no binding named '{}'", name, property),
                    token,
                )
            }
            Type::Record { decl, type_args } => {
                if let Some(field) = self.record_field_type(decl, type_args, property) {
                    return field;
                }
                self.method_type(&obj_ty, property, env).unwrap_or_else(|| {
                    Type::error(
                        format!("record {} has no field or method '{}'", decl.name, property),
                        token,
                    )
                })
            }
            Type::Hash(k, v) => {
                if **k == Type::Str {
                    return (**v).clone();
                }
                self.method_type(&obj_ty, property, env).unwrap_or_else(|| {
                    Type::error(
                        format!(
                            "dot access on a hash requires String keys, found {}",
                            k
                        ),
                        token,
                    )
                })
            }
            Type::Any => Type::Any,
            // A bounded type variable dispatches through its trait bounds'
            // signatures; the bound itself is enforced at the call site.
            Type::Var { bounds, .. } if !bounds.is_empty() => {
                for bound in bounds {
                    if let Type::Trait { decl, type_args } = bound {
                        if let Some(sig) = decl.method(property) {
                            let mut subst = Subst::new();
                            subst.insert("Self", obj_ty.clone());
                            for (p, a) in decl.type_params.iter().zip(type_args) {
                                subst.insert(p.clone(), a.clone());
                            }
                            if let Type::Function { params, ret, .. } = subst.apply(&sig) {
                                let rest = params.get(1..).unwrap_or(&[]).to_vec();
                                return Type::function(rest, *ret);
                            }
                        }
                    }
                }
                Type::error(
                    format!("no trait bound of {} provides '{}'", obj_ty, property),
                    token,
                )
            }
            _ => self.method_type(&obj_ty, property, env).unwrap_or_else(|| {
                Type::error(
                    format!("{} has no member '{}'", obj_ty, property),
                    token,
                )
            }),
        }
    }

    /// Search the implementation table for a method named `property` on the
    /// receiver's base type. On a match the impl's target is unified with
    /// the receiver and the method type is returned with `self` removed.
    pub(crate) fn method_type(
        &mut self,
        receiver: &Type,
        property: &str,
        env: &TypeEnv,
    ) -> Option<Type> {
        let entries = env.impls_for(&receiver.base_name());
        for entry in entries {
            if let Some(ty) = self.method_type_in(receiver, property, &entry, env) {
                return Some(ty);
            }
        }
        None
    }

    fn method_type_in(
        &mut self,
        receiver: &Type,
        property: &str,
        entry: &ImplEntry,
        env: &TypeEnv,
    ) -> Option<Type> {
        let method: &FunctionLit = entry
            .decl
            .methods
            .iter()
            .find(|m| m.name.as_deref() == Some(property))?;

        // Re-resolve the impl target with its type parameters as fresh
        // variables, then unify against the receiver to fix them.
        let scope = self.param_scope_for_fn(&entry.decl.type_params, &entry.env).ok()?;
        let mut rename = Subst::new();
        let mut fresh_vars = Vec::new();
        for tp in &entry.decl.type_params {
            let bounds = tp
                .bounds
                .iter()
                .filter_map(|b| entry.env.lookup_type(b))
                .collect::<Vec<_>>();
            let fresh = self.fresh_var_bounded(bounds.clone());
            if let Type::Var { name, .. } = &fresh {
                fresh_vars.push((name.clone(), bounds));
            }
            rename.insert(tp.name.clone(), fresh);
        }

        let target = self.resolve_type_expr(&entry.decl.target, &scope);
        if target.is_error() {
            return None;
        }
        let target = rename.apply(&target);

        let mut subst = Subst::new();
        if !unify(receiver, &target, &mut subst) {
            return None;
        }

        // The method's own signature, with `self` dropped for the caller.
        let mut params = Vec::new();
        for (i, p) in method.params.iter().enumerate() {
            if i == 0 && p.name == "self" && p.annotation.is_none() {
                continue;
            }
            let ty = match &p.annotation {
                Some(te) => self.resolve_type_expr(te, &scope),
                None => Type::Any,
            };
            if ty.is_error() {
                return None;
            }
            params.push(subst.apply(&rename.apply(&ty)));
        }
        let ret = match &method.return_type {
            Some(te) => {
                let ty = self.resolve_type_expr(te, &scope);
                if ty.is_error() {
                    return None;
                }
                subst.apply(&rename.apply(&ty))
            }
            None => Type::Any,
        };

        // Impl-level bounds are enforced transitively at the call site.
        if let Some(err) = self.check_var_bounds(&fresh_vars, &subst, env, &method.token) {
            return Some(err);
        }

        Some(Type::function(params, ret))
    }
}
