/// `match` and `when` checking, including sum-variant exhaustiveness.
use std::collections::HashSet;

use crate::ast::{Expr, MatchArm, Pattern, WhenBranch};
use crate::lexer::Token;
use crate::types::env::TypeEnv;
use crate::types::subst::Subst;
use crate::types::unify::unify;
use crate::types::Type;

use super::Checker;

impl Checker<'_> {
    pub(crate) fn check_match(
        &mut self,
        token: &Token,
        scrutinee: &Expr,
        arms: &[MatchArm],
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        let scrutinee_ty = self.check_expr(scrutinee, env, None);
        if scrutinee_ty.is_error() {
            return scrutinee_ty;
        }
        if arms.is_empty() {
            return Type::error("a match expression needs at least one arm", token);
        }

        let mut covered: HashSet<String> = HashSet::new();
        let mut has_catch_all = false;
        let mut result: Option<Type> = None;

        for arm in arms {
            let scope = env.child();
            if let Some(err) =
                self.bind_pattern(&arm.pattern, &scrutinee_ty, &scope, &mut covered, &mut has_catch_all)
            {
                return err;
            }
            let body_ty = self.check_expr(&arm.body, &scope, expected.or(result.as_ref()));
            if body_ty.is_error() {
                return body_ty;
            }
            result = match result {
                None => Some(body_ty),
                Some(prev) => match self.common_type(&prev, &body_ty) {
                    Some(common) => Some(common),
                    None => {
                        return Type::error(
                            format!(
                                "match arms have incompatible types: {} and {}",
                                prev, body_ty
                            ),
                            &arm.token,
                        )
                    }
                },
            };
        }

        // Exhaustiveness over sum variants.
        if let Type::Sum { decl, .. } = &scrutinee_ty {
            if !has_catch_all {
                let missing: Vec<String> = decl
                    .variant_names()
                    .into_iter()
                    .filter(|v| !covered.contains(v))
                    .collect();
                if !missing.is_empty() {
                    return Type::error(
                        format!(
                            "match on {} is not exhaustive: missing {}",
                            decl.name,
                            missing.join(", ")
                        ),
                        token,
                    );
                }
            }
        }

        result.unwrap_or(Type::Null)
    }

    /// Check a pattern against the scrutinee type, binding names into
    /// `scope`. Returns an error type on mismatch.
    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        scrutinee: &Type,
        scope: &TypeEnv,
        covered: &mut HashSet<String>,
        has_catch_all: &mut bool,
    ) -> Option<Type> {
        match pattern {
            Pattern::Wildcard { .. } => {
                *has_catch_all = true;
                None
            }
            Pattern::Ident { token, name } => {
                // A bare identifier names a zero-payload variant of the
                // scrutinee's sum when one exists; otherwise it binds the
                // scrutinee.
                if let Type::Sum { decl, .. } = scrutinee {
                    if let Some(payload) = decl.variant(name) {
                        if !payload.is_empty() {
                            return Some(Type::error(
                                format!(
                                    "variant {} carries {} value(s); bind them in the pattern",
                                    name,
                                    payload.len()
                                ),
                                token,
                            ));
                        }
                        covered.insert(name.clone());
                        return None;
                    }
                }
                scope.define(name.clone(), scrutinee.clone(), false);
                *has_catch_all = true;
                None
            }
            Pattern::Int { token, .. } => self.literal_pattern(&Type::Integer, scrutinee, token),
            Pattern::Str { token, .. } => self.literal_pattern(&Type::Str, scrutinee, token),
            Pattern::Bool { token, .. } => self.literal_pattern(&Type::Boolean, scrutinee, token),
            Pattern::Variant {
                token,
                name,
                bindings,
            } => self.bind_variant_pattern(token, name, bindings, scrutinee, scope, covered),
            Pattern::Array {
                token,
                elements,
                rest,
            } => match scrutinee {
                Type::Array(el) => {
                    for sub in elements {
                        if let Some(err) =
                            self.bind_pattern(sub, el, scope, covered, &mut false)
                        {
                            return Some(err);
                        }
                    }
                    if let Some(rest_name) = rest {
                        scope.define(rest_name.clone(), Type::Array(el.clone()), false);
                    }
                    None
                }
                Type::Any => {
                    for sub in elements {
                        if let Some(err) =
                            self.bind_pattern(sub, &Type::Any, scope, covered, &mut false)
                        {
                            return Some(err);
                        }
                    }
                    if let Some(rest_name) = rest {
                        scope.define(rest_name.clone(), Type::Array(Box::new(Type::Any)), false);
                    }
                    None
                }
                other => Some(Type::error(
                    format!("an array pattern cannot match {}", other),
                    token,
                )),
            },
            Pattern::Tuple { token, elements } => match scrutinee {
                Type::Tuple(types) if types.len() == elements.len() => {
                    for (sub, ty) in elements.iter().zip(types) {
                        if let Some(err) = self.bind_pattern(sub, ty, scope, covered, &mut false)
                        {
                            return Some(err);
                        }
                    }
                    None
                }
                other => Some(Type::error(
                    format!(
                        "a tuple pattern of {} element(s) cannot match {}",
                        elements.len(),
                        other
                    ),
                    token,
                )),
            },
        }
    }

    fn literal_pattern(&mut self, lit_ty: &Type, scrutinee: &Type, token: &Token) -> Option<Type> {
        let mut subst = Subst::new();
        if unify(lit_ty, scrutinee, &mut subst) || unify(scrutinee, lit_ty, &mut subst) {
            None
        } else {
            Some(Type::error(
                format!("a {} literal pattern cannot match {}", lit_ty, scrutinee),
                token,
            ))
        }
    }

    fn bind_variant_pattern(
        &mut self,
        token: &Token,
        name: &str,
        bindings: &[Pattern],
        scrutinee: &Type,
        scope: &TypeEnv,
        covered: &mut HashSet<String>,
    ) -> Option<Type> {
        // Active patterns: the registered function is applied to the
        // scrutinee and the arm matches its returned variant.
        if let Some(fn_ty) = scope.active_pattern(name) {
            return self.bind_active_pattern(token, name, bindings, scrutinee, &fn_ty, scope, covered);
        }

        let (decl, type_args) = match scrutinee {
            Type::Sum { decl, type_args } => (decl.clone(), type_args.clone()),
            Type::Any => {
                for sub in bindings {
                    if let Some(err) =
                        self.bind_pattern(sub, &Type::Any, scope, covered, &mut false)
                    {
                        return Some(err);
                    }
                }
                return None;
            }
            other => {
                return Some(Type::error(
                    format!("variant pattern '{}' cannot match {}", name, other),
                    token,
                ))
            }
        };

        let payload = match decl.variant(name) {
            Some(p) => p,
            None => {
                return Some(Type::error(
                    format!("'{}' is not a variant of {}", name, decl.name),
                    token,
                ))
            }
        };
        if payload.len() != bindings.len() {
            return Some(Type::error(
                format!(
                    "variant {} carries {} value(s), pattern binds {}",
                    name,
                    payload.len(),
                    bindings.len()
                ),
                token,
            ));
        }

        let mut subst = Subst::new();
        for (param, arg) in decl.type_params.iter().zip(&type_args) {
            subst.insert(param.clone(), arg.clone());
        }
        for (sub, raw_ty) in bindings.iter().zip(&payload) {
            let ty = subst.apply(raw_ty);
            if let Some(err) = self.bind_pattern(sub, &ty, scope, covered, &mut false) {
                return Some(err);
            }
        }
        covered.insert(name.to_string());
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_active_pattern(
        &mut self,
        token: &Token,
        case: &str,
        bindings: &[Pattern],
        scrutinee: &Type,
        fn_ty: &Type,
        scope: &TypeEnv,
        covered: &mut HashSet<String>,
    ) -> Option<Type> {
        let (param, ret) = match fn_ty {
            Type::Function { params, ret, .. } if params.len() == 1 => {
                (params[0].clone(), ret.as_ref().clone())
            }
            other => {
                return Some(Type::error(
                    format!("active pattern '{}' is not a one-argument function: {}", case, other),
                    token,
                ))
            }
        };
        let mut subst = Subst::new();
        if !unify(scrutinee, &param, &mut subst) {
            return Some(Type::error(
                format!(
                    "active pattern '{}' expects {}, but the scrutinee is {}",
                    case, param, scrutinee
                ),
                token,
            ));
        }
        let ret = subst.apply(&ret);
        match &ret {
            Type::Sum { decl, type_args } => {
                let payload = match decl.variant(case) {
                    Some(p) => p,
                    None => {
                        return Some(Type::error(
                            format!("'{}' is not a variant of {}", case, decl.name),
                            token,
                        ))
                    }
                };
                if payload.len() != bindings.len() {
                    return Some(Type::error(
                        format!(
                            "active pattern case {} carries {} value(s), pattern binds {}",
                            case,
                            payload.len(),
                            bindings.len()
                        ),
                        token,
                    ));
                }
                let mut inst = Subst::new();
                for (p, a) in decl.type_params.iter().zip(type_args) {
                    inst.insert(p.clone(), a.clone());
                }
                for (sub, raw_ty) in bindings.iter().zip(&payload) {
                    let ty = inst.apply(raw_ty);
                    if let Some(err) = self.bind_pattern(sub, &ty, scope, covered, &mut false) {
                        return Some(err);
                    }
                }
                None
            }
            other => Some(Type::error(
                format!("active pattern '{}' must return a sum type, found {}", case, other),
                token,
            )),
        }
    }

    /// `when`: with a subject, branch conditions compare by equality or act
    /// as boolean predicates; without one, every condition must be Boolean.
    pub(crate) fn check_when(
        &mut self,
        token: &Token,
        subject: Option<&Expr>,
        branches: &[WhenBranch],
        else_body: &Expr,
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        let subject_ty = match subject {
            Some(s) => {
                let ty = self.check_expr(s, env, None);
                if ty.is_error() {
                    return ty;
                }
                Some(ty)
            }
            None => None,
        };

        let mut result: Option<Type> = None;
        for branch in branches {
            for cond in &branch.conditions {
                let cond_ty = self.check_expr(cond, env, None);
                if cond_ty.is_error() {
                    return cond_ty;
                }
                let ok = match &subject_ty {
                    Some(subject_ty) => {
                        let mut subst = Subst::new();
                        cond_ty == Type::Boolean
                            || matches!(cond_ty, Type::Any)
                            || unify(&cond_ty, subject_ty, &mut subst)
                            || unify(subject_ty, &cond_ty, &mut subst)
                    }
                    None => matches!(cond_ty, Type::Boolean | Type::Any),
                };
                if !ok {
                    return Type::error(
                        match &subject_ty {
                            Some(st) => format!(
                                "a when condition must equal the subject ({}) or be Boolean, found {}",
                                st, cond_ty
                            ),
                            None => format!(
                                "a when condition without a subject must be Boolean, found {}",
                                cond_ty
                            ),
                        },
                        cond.token(),
                    );
                }
            }
            let body_ty = self.check_expr(&branch.body, env, expected.or(result.as_ref()));
            if body_ty.is_error() {
                return body_ty;
            }
            result = match result {
                None => Some(body_ty),
                Some(prev) => match self.common_type(&prev, &body_ty) {
                    Some(common) => Some(common),
                    None => {
                        return Type::error(
                            format!(
                                "when branches have incompatible types: {} and {}",
                                prev, body_ty
                            ),
                            &branch.token,
                        )
                    }
                },
            };
        }

        let else_ty = self.check_expr(else_body, env, expected.or(result.as_ref()));
        if else_ty.is_error() {
            return else_ty;
        }
        match result {
            None => else_ty,
            Some(prev) => match self.common_type(&prev, &else_ty) {
                Some(common) => common,
                None => Type::error(
                    format!(
                        "when branches have incompatible types: {} and {}",
                        prev, else_ty
                    ),
                    token,
                ),
            },
        }
    }
}
