/// Expression checking.
use crate::ast::{Expr, FunctionLit, Stmt, StrPart};
use crate::lexer::Token;
use crate::types::env::TypeEnv;
use crate::types::subst::Subst;
use crate::types::unify::unify;
use crate::types::Type;

use super::Checker;

impl Checker<'_> {
    pub(crate) fn check_expr(
        &mut self,
        expr: &Expr,
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        match expr {
            Expr::Int { .. } => Type::Integer,
            Expr::Double { .. } => Type::Double,
            Expr::Bool { .. } => Type::Boolean,
            Expr::Str { .. } => Type::Str,
            Expr::InterpStr { parts, .. } => {
                for part in parts {
                    if let StrPart::Expr(e) = part {
                        let ty = self.check_expr(e, env, None);
                        if ty.is_error() {
                            return ty;
                        }
                    }
                }
                Type::Str
            }
            Expr::Ident { token, name } => self.check_ident(token, name, env),
            Expr::Array { token, elements } => {
                self.check_array_literal(token, elements, env, expected)
            }
            Expr::Hash { token, pairs } => self.check_hash_literal(token, pairs, env, expected),
            Expr::Tuple { elements, .. } => {
                let mut types = Vec::new();
                for (i, el) in elements.iter().enumerate() {
                    let el_expected = match expected {
                        Some(Type::Tuple(ets)) => ets.get(i),
                        _ => None,
                    };
                    let ty = self.check_expr(el, env, el_expected);
                    if ty.is_error() {
                        return ty;
                    }
                    types.push(ty);
                }
                Type::Tuple(types)
            }
            Expr::Prefix {
                token, op, operand, ..
            } => self.check_prefix(token, op, operand, env),
            Expr::Infix {
                token,
                op,
                left,
                right,
            } => self.check_infix(token, op, left, right, env),
            Expr::Assign {
                token,
                op,
                target,
                value,
            } => self.check_assign(token, op, target, value, env),
            Expr::Call { token, callee, args } => {
                self.check_call(token, callee, args, env, expected)
            }
            Expr::Index { token, object, index } => self.check_index(token, object, index, env),
            Expr::Member {
                token,
                object,
                property,
            } => self.check_member(token, object, property, env),
            Expr::If {
                token,
                condition,
                consequence,
                alternative,
            } => self.check_if(
                token,
                condition,
                consequence,
                alternative.as_deref(),
                env,
                expected,
            ),
            Expr::Match {
                token,
                scrutinee,
                arms,
            } => self.check_match(token, scrutinee, arms, env, expected),
            Expr::When {
                token,
                subject,
                branches,
                else_body,
            } => self.check_when(token, subject.as_deref(), branches, else_body, env, expected),
            Expr::Try { token, operand } => self.check_try(token, operand, env),
            Expr::Function(lit) => self.check_function(lit, env, expected),
            Expr::Block { statements, .. } => self.check_block(statements, env),
        }
    }

    /// Identifiers resolve in the constructor table first (constructors
    /// shadow bindings of the same name), then the binding store.
    fn check_ident(&mut self, token: &Token, name: &str, env: &TypeEnv) -> Type {
        if let Some(ctor) = env.ctor(name) {
            return self.instantiate_bare_ctor(ctor);
        }
        match env.get(name) {
            Some(binding) => binding.ty,
            None => Type::error(format!("unknown identifier '{}'", name), token),
        }
    }

    /// A zero-payload variant constructor in expression position is the sum
    /// value itself (`None`); everything else stays a callable.
    pub(crate) fn instantiate_bare_ctor(&mut self, ctor: Type) -> Type {
        match &ctor {
            Type::Function {
                params,
                ret,
                type_params,
            } if params.is_empty() && matches!(ret.as_ref(), Type::Sum { .. }) => {
                let (instantiated, _) = self.instantiate_fn(
                    &Type::Function {
                        params: params.clone(),
                        ret: ret.clone(),
                        type_params: type_params.clone(),
                    },
                );
                match instantiated {
                    Type::Function { ret, .. } => *ret,
                    other => other,
                }
            }
            _ => ctor,
        }
    }

    fn check_array_literal(
        &mut self,
        token: &Token,
        elements: &[Expr],
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        let expected_el = match expected {
            Some(Type::Array(el)) => Some(el.as_ref().clone()),
            _ => None,
        };
        if elements.is_empty() {
            return match expected_el {
                Some(el) => Type::Array(Box::new(el)),
                None => Type::error(
                    "cannot infer the element type of an empty array; add an annotation",
                    token,
                ),
            };
        }
        let first = self.check_expr(&elements[0], env, expected_el.as_ref());
        if first.is_error() {
            return first;
        }
        // An unresolved variable as the expected element carries no
        // information; prefer the inferred type so the call site can bind
        // the variable against it.
        let element = match expected_el {
            Some(el) if !matches!(el, Type::Var { .. }) => el,
            _ => first,
        };
        for el in &elements[1..] {
            let ty = self.check_expr(el, env, Some(&element));
            if ty.is_error() {
                return ty;
            }
            let mut subst = Subst::new();
            if !unify(&ty, &element, &mut subst) {
                return Type::error(
                    format!(
                        "arrays must be homogeneous: expected {}, found {}",
                        element, ty
                    ),
                    el.token(),
                );
            }
        }
        Type::Array(Box::new(element))
    }

    fn check_hash_literal(
        &mut self,
        token: &Token,
        pairs: &[(Expr, Expr)],
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        let (expected_k, expected_v) = match expected {
            Some(Type::Hash(k, v)) => (Some(k.as_ref().clone()), Some(v.as_ref().clone())),
            _ => (None, None),
        };
        if pairs.is_empty() {
            return match (expected_k, expected_v) {
                (Some(k), Some(v)) => Type::Hash(Box::new(k), Box::new(v)),
                _ => Type::error(
                    "cannot infer the key and value types of an empty hash; add an annotation",
                    token,
                ),
            };
        }

        let first_k = self.check_expr(&pairs[0].0, env, expected_k.as_ref());
        if first_k.is_error() {
            return first_k;
        }
        if !is_hashable(&first_k) {
            return Type::error(
                format!("{} cannot be used as a hash key", first_k),
                pairs[0].0.token(),
            );
        }
        let first_v = self.check_expr(&pairs[0].1, env, expected_v.as_ref());
        if first_v.is_error() {
            return first_v;
        }
        let key = match expected_k {
            Some(k) if !matches!(k, Type::Var { .. }) => k,
            _ => first_k,
        };
        let value = match expected_v {
            Some(v) if !matches!(v, Type::Var { .. }) => v,
            _ => first_v,
        };

        for (k, v) in &pairs[1..] {
            let kt = self.check_expr(k, env, Some(&key));
            if kt.is_error() {
                return kt;
            }
            let mut subst = Subst::new();
            if !unify(&kt, &key, &mut subst) {
                return Type::error(
                    format!("hash keys must share one type: expected {}, found {}", key, kt),
                    k.token(),
                );
            }
            let vt = self.check_expr(v, env, Some(&value));
            if vt.is_error() {
                return vt;
            }
            let mut subst = Subst::new();
            if !unify(&vt, &value, &mut subst) {
                return Type::error(
                    format!(
                        "hash values must share one type: expected {}, found {}",
                        value, vt
                    ),
                    v.token(),
                );
            }
        }
        Type::Hash(Box::new(key), Box::new(value))
    }

    fn check_prefix(&mut self, token: &Token, op: &str, operand: &Expr, env: &TypeEnv) -> Type {
        let ty = self.check_expr(operand, env, None);
        if ty.is_error() {
            return ty;
        }
        match op {
            "-" => match ty {
                Type::Integer | Type::Double | Type::Any => ty,
                other => Type::error(
                    format!("prefix '-' expects a numeric operand, found {}", other),
                    token,
                ),
            },
            "!" => match ty {
                Type::Boolean | Type::Any => Type::Boolean,
                other => Type::error(
                    format!("prefix '!' expects a Boolean operand, found {}", other),
                    token,
                ),
            },
            _ => Type::error(format!("unknown prefix operator '{}'", op), token),
        }
    }

    fn check_infix(
        &mut self,
        token: &Token,
        op: &str,
        left: &Expr,
        right: &Expr,
        env: &TypeEnv,
    ) -> Type {
        let lt = self.check_expr(left, env, None);
        if lt.is_error() {
            return lt;
        }
        let rt = self.check_expr(right, env, None);
        if rt.is_error() {
            return rt;
        }

        match op {
            "+" | "-" | "*" | "/" => {
                if matches!(lt, Type::Any) || matches!(rt, Type::Any) {
                    return Type::Any;
                }
                if op == "+" && lt == Type::Str && rt == Type::Str {
                    return Type::Str;
                }
                if lt.is_numeric() && rt.is_numeric() {
                    return if lt == Type::Double || rt == Type::Double {
                        Type::Double
                    } else {
                        Type::Integer
                    };
                }
                Type::error(
                    format!("operator '{}' cannot combine {} and {}", op, lt, rt),
                    token,
                )
            }
            "%" => {
                if matches!(lt, Type::Any) || matches!(rt, Type::Any) {
                    return Type::Any;
                }
                if lt == Type::Integer && rt == Type::Integer {
                    Type::Integer
                } else {
                    Type::error(
                        format!("operator '%' expects Integer operands, found {} and {}", lt, rt),
                        token,
                    )
                }
            }
            "==" | "!=" => {
                if matches!(lt, Type::Any)
                    || matches!(rt, Type::Any)
                    || lt == Type::Null
                    || rt == Type::Null
                {
                    return Type::Boolean;
                }
                let mut subst = Subst::new();
                if unify(&lt, &rt, &mut subst) || unify(&rt, &lt, &mut subst) {
                    Type::Boolean
                } else {
                    Type::error(
                        format!("cannot compare {} and {} with '{}'", lt, rt, op),
                        token,
                    )
                }
            }
            "<" | ">" | "<=" | ">=" => {
                if matches!(lt, Type::Any) || matches!(rt, Type::Any) {
                    return Type::Boolean;
                }
                if lt.is_numeric() && rt.is_numeric() {
                    Type::Boolean
                } else if lt == Type::Str && rt == Type::Str {
                    Type::Boolean
                } else {
                    Type::error(
                        format!("operator '{}' cannot order {} and {}", op, lt, rt),
                        token,
                    )
                }
            }
            "&&" | "||" => {
                let ok = |t: &Type| matches!(t, Type::Boolean | Type::Any);
                if ok(&lt) && ok(&rt) {
                    Type::Boolean
                } else {
                    Type::error(
                        format!("operator '{}' expects Boolean operands, found {} and {}", op, lt, rt),
                        token,
                    )
                }
            }
            _ => Type::error(format!("unknown operator '{}'", op), token),
        }
    }

    /// Assignment targets: a mutable identifier, a hash index, or a record
    /// field.
    fn check_assign(
        &mut self,
        token: &Token,
        op: &str,
        target: &Expr,
        value: &Expr,
        env: &TypeEnv,
    ) -> Type {
        let target_ty = match target {
            Expr::Ident { token, name } => match env.get(name) {
                Some(binding) => {
                    if !binding.mutable {
                        return Type::error(
                            format!("cannot assign to immutable binding '{}'", name),
                            token,
                        );
                    }
                    binding.ty
                }
                None => {
                    return Type::error(format!("unknown identifier '{}'", name), token)
                }
            },
            Expr::Index { object, index, .. } => {
                let obj_ty = self.check_expr(object, env, None);
                if obj_ty.is_error() {
                    return obj_ty;
                }
                match obj_ty {
                    Type::Hash(k, v) => {
                        let idx_ty = self.check_expr(index, env, Some(&k));
                        if idx_ty.is_error() {
                            return idx_ty;
                        }
                        let mut subst = Subst::new();
                        if !unify(&idx_ty, &k, &mut subst) {
                            return Type::error(
                                format!("hash key type mismatch: expected {}, found {}", k, idx_ty),
                                token,
                            );
                        }
                        *v
                    }
                    Type::Any => Type::Any,
                    other => {
                        return Type::error(
                            format!("cannot assign into an index of {}", other),
                            token,
                        )
                    }
                }
            }
            Expr::Member {
                object, property, ..
            } => {
                let obj_ty = self.check_expr(object, env, None);
                if obj_ty.is_error() {
                    return obj_ty;
                }
                match &obj_ty {
                    Type::Record { decl, type_args } => {
                        match self.record_field_type(decl, type_args, property) {
                            Some(ty) => ty,
                            None => {
                                return Type::error(
                                    format!("record {} has no field '{}'", decl.name, property),
                                    token,
                                )
                            }
                        }
                    }
                    Type::Any => Type::Any,
                    other => {
                        return Type::error(
                            format!("cannot assign to a field of {}", other),
                            token,
                        )
                    }
                }
            }
            _ => {
                return Type::error(
                    "the target of an assignment must be a mutable identifier, a hash index, or a record field",
                    token,
                )
            }
        };

        let value_ty = self.check_expr(value, env, Some(&target_ty));
        if value_ty.is_error() {
            return value_ty;
        }

        if op == "+=" {
            let numeric_ok = |t: &Type| t.is_numeric() || matches!(t, Type::Any);
            if !(numeric_ok(&target_ty) && numeric_ok(&value_ty)) {
                return Type::error(
                    format!("'+=' expects numeric operands, found {} and {}", target_ty, value_ty),
                    token,
                );
            }
            return Type::Null;
        }

        let mut subst = Subst::new();
        if !unify(&value_ty, &target_ty, &mut subst) {
            return Type::error(
                format!("cannot assign {} to a target of type {}", value_ty, target_ty),
                token,
            );
        }
        Type::Null
    }

    fn check_index(&mut self, token: &Token, object: &Expr, index: &Expr, env: &TypeEnv) -> Type {
        let obj_ty = self.check_expr(object, env, None);
        if obj_ty.is_error() {
            return obj_ty;
        }
        match obj_ty {
            Type::Array(el) => {
                let idx = self.check_expr(index, env, Some(&Type::Integer));
                if idx.is_error() {
                    return idx;
                }
                if !matches!(idx, Type::Integer | Type::Any) {
                    return Type::error(
                        format!("array indices must be Integer, found {}", idx),
                        token,
                    );
                }
                *el
            }
            Type::Hash(k, v) => {
                let idx = self.check_expr(index, env, Some(&k));
                if idx.is_error() {
                    return idx;
                }
                let mut subst = Subst::new();
                if !unify(&idx, &k, &mut subst) {
                    return Type::error(
                        format!("hash key type mismatch: expected {}, found {}", k, idx),
                        token,
                    );
                }
                *v
            }
            Type::Any => Type::Any,
            other => Type::error(format!("{} cannot be indexed", other), token),
        }
    }

    fn check_if(
        &mut self,
        token: &Token,
        condition: &Expr,
        consequence: &Expr,
        alternative: Option<&Expr>,
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        let cond = self.check_expr(condition, env, Some(&Type::Boolean));
        if cond.is_error() {
            return cond;
        }
        if !matches!(cond, Type::Boolean | Type::Any) {
            return Type::error(
                format!("an if condition must be Boolean, found {}", cond),
                condition.token(),
            );
        }
        let then_ty = self.check_expr(consequence, env, expected);
        if then_ty.is_error() {
            return then_ty;
        }
        match alternative {
            Some(alt) => {
                let alt_ty = self.check_expr(alt, env, expected);
                if alt_ty.is_error() {
                    return alt_ty;
                }
                match self.common_type(&then_ty, &alt_ty) {
                    Some(common) => common,
                    None => Type::error(
                        format!(
                            "if branches have incompatible types: {} and {}",
                            then_ty, alt_ty
                        ),
                        token,
                    ),
                }
            }
            None => Type::Null,
        }
    }

    /// The operand of `?` must be `Result<O, E>`, the enclosing function
    /// must declare `Result<_, F>` with `E` unifiable into `F`; yields `O`.
    fn check_try(&mut self, token: &Token, operand: &Expr, env: &TypeEnv) -> Type {
        let ty = self.check_expr(operand, env, None);
        if ty.is_error() {
            return ty;
        }
        if matches!(ty, Type::Any) {
            return Type::Any;
        }
        let (ok_ty, err_ty) = match &ty {
            Type::Sum { decl, type_args } if decl.name == "Result" && type_args.len() == 2 => {
                (type_args[0].clone(), type_args[1].clone())
            }
            other => {
                return Type::error(
                    format!("the '?' operator expects a Result, found {}", other),
                    token,
                )
            }
        };
        let ret = match env.current_ret() {
            Some(Some(ty)) => ty,
            _ => {
                return Type::error(
                    "the '?' operator requires an enclosing function with a declared Result return type",
                    token,
                )
            }
        };
        match &ret {
            Type::Sum { decl, type_args } if decl.name == "Result" && type_args.len() == 2 => {
                let mut subst = Subst::new();
                if !unify(&err_ty, &type_args[1], &mut subst) {
                    return Type::error(
                        format!(
                            "the error type {} does not fit the function's declared {}",
                            err_ty, ret
                        ),
                        token,
                    );
                }
            }
            other => {
                return Type::error(
                    format!(
                        "the '?' operator requires the enclosing function to return a Result, but it returns {}",
                        other
                    ),
                    token,
                )
            }
        }
        ok_ty
    }

    fn check_function(
        &mut self,
        lit: &FunctionLit,
        env: &TypeEnv,
        expected: Option<&Type>,
    ) -> Type {
        let scope = match self.param_scope_for_fn(&lit.type_params, env) {
            Ok(s) => s,
            Err(e) => return e,
        };

        // Fully-annotated literal: the signature is established before the
        // body is checked, enabling recursion through the name.
        if let Some(declared) = self.declared_fn_type(lit, env) {
            let (params, ret) = match &declared {
                Type::Function { params, ret, .. } => (params.clone(), ret.as_ref().clone()),
                _ => unreachable!(),
            };
            let body_scope = scope.child();
            if let Some(name) = &lit.name {
                body_scope.define(name.clone(), declared.clone(), false);
            }
            for (p, ty) in lit.params.iter().zip(&params) {
                body_scope.define(p.name.clone(), ty.clone(), false);
            }
            body_scope.set_current_ret(Some(ret.clone()));
            let body_ty = self.check_expr(&lit.body, &body_scope, Some(&ret));
            if body_ty.is_error() {
                return body_ty;
            }
            let mut subst = Subst::new();
            if !unify(&body_ty, &ret, &mut subst) {
                return Type::error(
                    format!(
                        "function body has type {}, but the signature declares {}",
                        body_ty, ret
                    ),
                    &lit.token,
                );
            }
            return declared;
        }

        // Otherwise parameter types come from annotations where present,
        // from the expected function type where not, and default to Any.
        let expected_params = match expected {
            Some(Type::Function { params, .. }) if params.len() == lit.params.len() => {
                Some(params.clone())
            }
            _ => None,
        };
        let body_scope = scope.child();
        let mut param_types = Vec::new();
        for (i, p) in lit.params.iter().enumerate() {
            let ty = match self.check_param_annotation(p, &scope) {
                Some(t) => {
                    if t.is_error() {
                        return t;
                    }
                    t
                }
                None => match expected_params.as_ref().map(|ps| ps[i].clone()) {
                    // An unresolved expected parameter gives the body
                    // nothing to work with; fall back to Any.
                    Some(Type::Var { bounds, .. }) if bounds.is_empty() => Type::Any,
                    Some(ty) => ty,
                    None => Type::Any,
                },
            };
            body_scope.define(p.name.clone(), ty.clone(), false);
            param_types.push(ty);
        }

        let declared_ret = match &lit.return_type {
            Some(te) => {
                let t = self.resolve_type_expr(te, &scope);
                if t.is_error() {
                    return t;
                }
                Some(t)
            }
            None => None,
        };
        body_scope.set_current_ret(declared_ret.clone());

        let expected_ret = match (declared_ret.as_ref(), expected) {
            (Some(r), _) => Some(r.clone()),
            (None, Some(Type::Function { ret, .. })) => Some(ret.as_ref().clone()),
            _ => None,
        };
        let body_ty = self.check_expr(&lit.body, &body_scope, expected_ret.as_ref());
        if body_ty.is_error() {
            return body_ty;
        }

        let ret = match declared_ret {
            Some(declared) => {
                let mut subst = Subst::new();
                if !unify(&body_ty, &declared, &mut subst) {
                    return Type::error(
                        format!(
                            "function body has type {}, but the signature declares {}",
                            body_ty, declared
                        ),
                        &lit.token,
                    );
                }
                declared
            }
            None => body_ty,
        };

        Type::Function {
            params: param_types,
            ret: Box::new(ret),
            type_params: Vec::new(),
        }
    }

    pub(crate) fn check_block(&mut self, statements: &[Stmt], env: &TypeEnv) -> Type {
        let scope = env.child();
        let mut last = Type::Null;
        for stmt in statements {
            // Module headers are only legal at the top of a file.
            let ty = self.check_stmt(stmt, &scope, false);
            if ty.is_error() {
                return ty;
            }
            last = match stmt {
                Stmt::Expr { .. } | Stmt::Return { .. } => ty,
                _ => Type::Null,
            };
        }
        last
    }

    /// The least type both sides fit into, honoring numeric widening; `Any`
    /// absorbs.
    pub(crate) fn common_type(&mut self, a: &Type, b: &Type) -> Option<Type> {
        if matches!(a, Type::Any) {
            return Some(b.clone());
        }
        if matches!(b, Type::Any) {
            return Some(a.clone());
        }
        let mut subst = Subst::new();
        if unify(a, b, &mut subst) {
            return Some(subst.apply(b));
        }
        let mut subst = Subst::new();
        if unify(b, a, &mut subst) {
            return Some(subst.apply(a));
        }
        None
    }

    pub(crate) fn record_field_type(
        &mut self,
        decl: &std::rc::Rc<crate::types::RecordType>,
        type_args: &[Type],
        field: &str,
    ) -> Option<Type> {
        let raw = decl.field(field)?;
        let mut subst = Subst::new();
        for (param, arg) in decl.type_params.iter().zip(type_args) {
            subst.insert(param.clone(), arg.clone());
        }
        Some(subst.apply(&raw))
    }
}

pub(crate) fn is_hashable(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Integer | Type::Double | Type::Str | Type::Boolean | Type::Any
    )
}
