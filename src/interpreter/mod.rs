/// Lumen tree-walking evaluator.
///
/// Walks the same AST the checker validated, over a value environment.
/// Evaluation is strict and single-threaded; short-circuiting applies only
/// to `&&`, `||`, `if`, `when`, and match-arm selection.
///
/// Split:
/// - `ops` — arithmetic, comparison, and logic on values
/// - `patterns` — `match`/`when` runtime matching
/// - `builtins` — the global builtins and service dispatch
mod builtins;
mod ops;
mod patterns;

pub use builtins::seed_value_prelude;

use std::rc::Rc;

use crate::ast::{
    Expr, FunctionLit, ImplDecl, LetTarget, Param, Program, Stmt, StrPart, TypeExpr,
};
use crate::lexer::Token;
use crate::loader::ModuleLoader;
use crate::value::{hash_key, repr, Env, FunctionValue, RuntimeError, Value};

pub struct Interpreter<'a> {
    pub loader: &'a mut ModuleLoader,
}

impl<'a> Interpreter<'a> {
    pub fn new(loader: &'a mut ModuleLoader) -> Self {
        Interpreter { loader }
    }

    /// Evaluate a whole program. Statements run left to right; the value of
    /// the program is the value of its last expression statement.
    pub fn eval_program(&mut self, program: &Program, env: &Env) -> Result<Value, RuntimeError> {
        let mut last = Value::Null;
        for stmt in &program.statements {
            last = self.eval_stmt(stmt, env)?;
        }
        Ok(last)
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    pub fn eval_stmt(&mut self, stmt: &Stmt, env: &Env) -> Result<Value, RuntimeError> {
        match stmt {
            Stmt::Let {
                token,
                mutable,
                target,
                value,
                ..
            } => {
                let val = self.eval_expr(value, env)?;
                self.bind_let_target(token, target, val, *mutable, env)?;
                Ok(Value::Null)
            }
            Stmt::Return { value, .. } => {
                let val = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                Err(RuntimeError::Return(Box::new(val)))
            }
            Stmt::TypeDecl {
                name, variants, ..
            } => {
                for variant in variants {
                    env.map_variant(variant.name.clone(), name.clone());
                    if variant.params.is_empty() {
                        env.define_ctor(
                            variant.name.clone(),
                            Value::sum(name.clone(), variant.name.clone(), vec![]),
                        );
                    } else {
                        env.define_ctor(
                            variant.name.clone(),
                            Value::Builtin(format!(
                                "ctor:{}.{}/{}",
                                name,
                                variant.name,
                                variant.params.len()
                            )),
                        );
                    }
                }
                Ok(Value::Null)
            }
            Stmt::RecordDecl {
                token,
                name,
                fields,
                ..
            } => {
                let params: Vec<Param> = fields
                    .iter()
                    .map(|(fname, _)| Param {
                        token: token.clone(),
                        name: fname.clone(),
                        annotation: None,
                    })
                    .collect();
                env.define_ctor(
                    name.clone(),
                    Value::Function(Rc::new(FunctionValue {
                        name: Some(name.clone()),
                        params,
                        // Never evaluated: record constructors build their
                        // value from the argument list.
                        body: Rc::new(Expr::Tuple {
                            token: token.clone(),
                            elements: vec![],
                        }),
                        env: env.clone(),
                        record_ctor: Some(name.clone()),
                        self_value: None,
                    })),
                );
                Ok(Value::Null)
            }
            Stmt::TraitDecl { .. } => Ok(Value::Null),
            Stmt::Impl(decl) => {
                self.eval_impl(decl, env);
                Ok(Value::Null)
            }
            Stmt::ModuleDecl { exposing, .. } => {
                env.set_exposed(exposing.clone());
                Ok(Value::Null)
            }
            Stmt::Use {
                token,
                path,
                alias,
                exposing,
            } => self.eval_use(token, path, alias.as_deref(), exposing.as_deref(), env),
            Stmt::Expr { expr, .. } => {
                let val = self.eval_expr(expr, env)?;
                if let Expr::Function(lit) = expr {
                    if let Some(name) = &lit.name {
                        env.define(name.clone(), val.clone(), false);
                    }
                }
                Ok(val)
            }
        }
    }

    fn bind_let_target(
        &mut self,
        token: &Token,
        target: &LetTarget,
        value: Value,
        mutable: bool,
        env: &Env,
    ) -> Result<(), RuntimeError> {
        match target {
            LetTarget::Ident(name) => {
                env.define(name.clone(), value, mutable);
                Ok(())
            }
            LetTarget::Tuple(names) => match value {
                Value::Tuple(items) if items.len() == names.len() => {
                    for (name, item) in names.iter().zip(items.iter()) {
                        env.define(name.clone(), item.clone(), mutable);
                    }
                    Ok(())
                }
                other => Err(RuntimeError::at(
                    format!(
                        "cannot destructure {} into a tuple of {} names",
                        other.type_name(),
                        names.len()
                    ),
                    token,
                )),
            },
            LetTarget::Array { elements, rest } => match value {
                Value::Array(items) => {
                    if items.len() < elements.len() {
                        return Err(RuntimeError::at(
                            format!(
                                "array has {} element(s), pattern needs {}",
                                items.len(),
                                elements.len()
                            ),
                            token,
                        ));
                    }
                    for (name, item) in elements.iter().zip(items.iter()) {
                        env.define(name.clone(), item.clone(), mutable);
                    }
                    if let Some(rest_name) = rest {
                        let tail: Vec<Value> = items[elements.len()..].to_vec();
                        env.define(rest_name.clone(), Value::Array(Rc::new(tail)), mutable);
                    }
                    Ok(())
                }
                other => Err(RuntimeError::at(
                    format!("cannot destructure {} with an array pattern", other.type_name()),
                    token,
                )),
            },
            LetTarget::ActivePattern(cases) => {
                for case in cases {
                    env.register_active_pattern(case.clone(), value.clone());
                }
                Ok(())
            }
        }
    }

    fn eval_impl(&mut self, decl: &ImplDecl, env: &Env) {
        let base = impl_target_base(&decl.target);
        for method in &decl.methods {
            let name = method.name.clone().unwrap_or_default();
            let fn_val = Value::Function(Rc::new(FunctionValue {
                name: method.name.clone(),
                params: method.params.clone(),
                body: Rc::new(method.body.as_ref().clone()),
                env: env.clone(),
                record_ctor: None,
                self_value: None,
            }));
            env.define_method(base.clone(), name, fn_val);
        }
    }

    fn eval_use(
        &mut self,
        token: &Token,
        path: &[String],
        alias: Option<&str>,
        exposing: Option<&[String]>,
        env: &Env,
    ) -> Result<Value, RuntimeError> {
        let name = path.join(".");
        let loaded = self
            .loader
            .load(&name)
            .map_err(|e| RuntimeError::at(e.to_string(), token))?;
        let module_env = loaded.value_env.clone();

        // Trait implementations always merge into the importer.
        for (base, methods) in module_env.local_methods() {
            for (mname, fn_val) in methods {
                env.define_method(base.clone(), mname, fn_val);
            }
        }

        if let Some(names) = exposing {
            for n in names {
                if !module_env.is_exposed(n) {
                    return Err(RuntimeError::at(
                        format!("'{}' is not exposed by module {}", n, name),
                        token,
                    ));
                }
                if let Some(ctor) = module_env.ctor(n) {
                    env.define_ctor(n.clone(), ctor);
                    if let Some(sum) = module_env.variant_sum(n) {
                        env.map_variant(n.clone(), sum);
                    }
                    continue;
                }
                match module_env.get(n) {
                    Some(value) => env.define(n.clone(), value, false),
                    None => {
                        return Err(RuntimeError::at(
                            format!("module {} has no binding named '{}'", name, n),
                            token,
                        ))
                    }
                }
            }
            return Ok(Value::Null);
        }

        let bind_name = alias
            .map(|a| a.to_string())
            .unwrap_or_else(|| path.last().cloned().unwrap_or_default());
        env.define(
            bind_name,
            Value::Module {
                name,
                env: module_env,
            },
            false,
        );
        Ok(Value::Null)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub fn eval_expr(&mut self, expr: &Expr, env: &Env) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Int { value, .. } => Ok(Value::Int(*value)),
            Expr::Double { value, .. } => Ok(Value::Double(*value)),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
            Expr::InterpStr { parts, .. } => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        StrPart::Literal(s) => out.push_str(s),
                        StrPart::Expr(e) => {
                            let val = self.eval_expr(e, env)?;
                            out.push_str(&repr(&val));
                        }
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::Ident { token, name } => self.eval_ident(token, name, env),
            Expr::Array { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for el in elements {
                    items.push(self.eval_expr(el, env)?);
                }
                Ok(Value::Array(Rc::new(items)))
            }
            Expr::Tuple { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for el in elements {
                    items.push(self.eval_expr(el, env)?);
                }
                Ok(Value::Tuple(Rc::new(items)))
            }
            Expr::Hash { pairs, .. } => {
                let mut entries = std::collections::BTreeMap::new();
                for (k, v) in pairs {
                    let key = self.eval_expr(k, env)?;
                    let value = self.eval_expr(v, env)?;
                    let hk = hash_key(&key).map_err(|e| reposition(e, k.token()))?;
                    entries.insert(hk, (key, value));
                }
                Ok(Value::Hash(Rc::new(std::cell::RefCell::new(entries))))
            }
            Expr::Prefix {
                token, op, operand, ..
            } => {
                let val = self.eval_expr(operand, env)?;
                ops::prefix(op, val, token)
            }
            Expr::Infix {
                token,
                op,
                left,
                right,
            } => {
                // && and || short-circuit: the left operand is returned when
                // it decides the result.
                if op == "&&" {
                    let lv = self.eval_expr(left, env)?;
                    if !lv.is_truthy() {
                        return Ok(lv);
                    }
                    return self.eval_expr(right, env);
                }
                if op == "||" {
                    let lv = self.eval_expr(left, env)?;
                    if lv.is_truthy() {
                        return Ok(lv);
                    }
                    return self.eval_expr(right, env);
                }
                let lv = self.eval_expr(left, env)?;
                let rv = self.eval_expr(right, env)?;
                ops::binary(op, lv, rv, token)
            }
            Expr::Assign {
                token,
                op,
                target,
                value,
            } => self.eval_assign(token, op, target, value, env),
            Expr::Call { token, callee, args } => {
                let callee_val = self.eval_expr(callee, env)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval_expr(arg, env)?);
                }
                self.call_value(callee_val, arg_vals, token)
            }
            Expr::Index { token, object, index } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                self.eval_index(token, obj, idx)
            }
            Expr::Member {
                token,
                object,
                property,
            } => {
                let obj = self.eval_expr(object, env)?;
                self.eval_member(token, obj, property, env)
            }
            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let cond = self.eval_expr(condition, env)?;
                if cond.is_truthy() {
                    self.eval_expr(consequence, env)
                } else {
                    match alternative {
                        Some(alt) => self.eval_expr(alt, env),
                        None => Ok(Value::Null),
                    }
                }
            }
            Expr::Match {
                token,
                scrutinee,
                arms,
            } => self.eval_match(token, scrutinee, arms, env),
            Expr::When {
                token,
                subject,
                branches,
                else_body,
            } => self.eval_when(token, subject.as_deref(), branches, else_body, env),
            Expr::Try { token, operand } => {
                let val = self.eval_expr(operand, env)?;
                match &val {
                    Value::Sum {
                        type_name,
                        variant,
                        payload,
                    } if type_name == "Result" => {
                        if variant == "Ok" {
                            Ok(payload.first().cloned().unwrap_or(Value::Null))
                        } else {
                            Err(RuntimeError::Return(Box::new(val.clone())))
                        }
                    }
                    other => Err(RuntimeError::at(
                        format!("the '?' operator expects a Result, found {}", other.type_name()),
                        token,
                    )),
                }
            }
            Expr::Function(lit) => Ok(self.make_function(lit, env)),
            Expr::Block { statements, .. } => self.eval_block(statements, env),
        }
    }

    fn eval_ident(&mut self, token: &Token, name: &str, env: &Env) -> Result<Value, RuntimeError> {
        if let Some(ctor) = env.ctor(name) {
            return Ok(ctor);
        }
        env.get(name)
            .ok_or_else(|| RuntimeError::at(format!("undefined identifier '{}'", name), token))
    }

    pub(crate) fn make_function(&mut self, lit: &FunctionLit, env: &Env) -> Value {
        Value::Function(Rc::new(FunctionValue {
            name: lit.name.clone(),
            params: lit.params.clone(),
            body: Rc::new(lit.body.as_ref().clone()),
            env: env.clone(),
            record_ctor: None,
            self_value: None,
        }))
    }

    pub(crate) fn eval_block(&mut self, statements: &[Stmt], env: &Env) -> Result<Value, RuntimeError> {
        let scope = env.child();
        let mut last = Value::Null;
        for stmt in statements {
            last = self.eval_stmt(stmt, &scope)?;
            if !matches!(stmt, Stmt::Expr { .. }) {
                last = Value::Null;
            }
        }
        Ok(last)
    }

    fn eval_assign(
        &mut self,
        token: &Token,
        op: &str,
        target: &Expr,
        value: &Expr,
        env: &Env,
    ) -> Result<Value, RuntimeError> {
        let new_value = |this: &mut Self, current: Option<Value>| -> Result<Value, RuntimeError> {
            let rhs = this.eval_expr(value, env)?;
            if op == "+=" {
                let current = current.ok_or_else(|| {
                    RuntimeError::at("'+=' needs an existing value to add to", token)
                })?;
                ops::binary("+", current, rhs, token)
            } else {
                Ok(rhs)
            }
        };

        match target {
            Expr::Ident { name, .. } => {
                let current = env.get(name);
                let val = new_value(self, current)?;
                if !env.assign(name, val) {
                    return Err(RuntimeError::at(
                        format!("cannot assign to undeclared variable '{}'", name),
                        token,
                    ));
                }
                Ok(Value::Null)
            }
            Expr::Index { object, index, .. } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                match obj {
                    Value::Hash(entries) => {
                        let hk = hash_key(&idx).map_err(|e| reposition(e, token))?;
                        let current = entries.borrow().get(&hk).map(|(_, v)| v.clone());
                        let val = new_value(self, current)?;
                        entries.borrow_mut().insert(hk, (idx, val));
                        Ok(Value::Null)
                    }
                    other => Err(RuntimeError::at(
                        format!("cannot assign into an index of {}", other.type_name()),
                        token,
                    )),
                }
            }
            Expr::Member {
                object, property, ..
            } => {
                let obj = self.eval_expr(object, env)?;
                match obj {
                    Value::Record { fields, .. } => {
                        let current = fields
                            .borrow()
                            .iter()
                            .find(|(n, _)| n == property)
                            .map(|(_, v)| v.clone());
                        let val = new_value(self, current)?;
                        let mut fields = fields.borrow_mut();
                        match fields.iter_mut().find(|(n, _)| n == property) {
                            Some((_, slot)) => {
                                *slot = val;
                                Ok(Value::Null)
                            }
                            None => Err(RuntimeError::at(
                                format!("record has no field '{}'", property),
                                token,
                            )),
                        }
                    }
                    other => Err(RuntimeError::at(
                        format!("cannot assign to a field of {}", other.type_name()),
                        token,
                    )),
                }
            }
            _ => Err(RuntimeError::at(
                "the target of an assignment must be an identifier, a hash index, or a record field",
                token,
            )),
        }
    }

    fn eval_index(&mut self, token: &Token, obj: Value, idx: Value) -> Result<Value, RuntimeError> {
        match (&obj, &idx) {
            (Value::Array(items), Value::Int(i)) => {
                if *i < 0 || *i as usize >= items.len() {
                    return Err(RuntimeError::at(
                        format!("array index {} out of range (length {})", i, items.len()),
                        token,
                    ));
                }
                Ok(items[*i as usize].clone())
            }
            (Value::Tuple(items), Value::Int(i)) => {
                if *i < 0 || *i as usize >= items.len() {
                    return Err(RuntimeError::at(
                        format!("tuple index {} out of range (length {})", i, items.len()),
                        token,
                    ));
                }
                Ok(items[*i as usize].clone())
            }
            (Value::Hash(entries), key) => {
                let hk = hash_key(key).map_err(|e| reposition(e, token))?;
                match entries.borrow().get(&hk) {
                    Some((_, v)) => Ok(v.clone()),
                    None => Err(RuntimeError::at(
                        format!("key not found: {}", repr(key)),
                        token,
                    )),
                }
            }
            (other, _) => Err(RuntimeError::at(
                format!("{} cannot be indexed", other.type_name()),
                token,
            )),
        }
    }

    /// Member access resolves: module export, record field, hash entry by
    /// String key, then method on the implementation table (bound to self).
    fn eval_member(
        &mut self,
        token: &Token,
        obj: Value,
        property: &str,
        env: &Env,
    ) -> Result<Value, RuntimeError> {
        match &obj {
            Value::Module { name, env: module_env } => {
                if !module_env.is_exposed(property) {
                    return Err(RuntimeError::at(
                        format!("'{}' is not exposed by module {}", property, name),
                        token,
                    ));
                }
                if let Some(ctor) = module_env.ctor(property) {
                    return Ok(ctor);
                }
                module_env.get(property).ok_or_else(|| {
                    RuntimeError::at(
                        format!("module {} has no binding named '{}'", name, property),
                        token,
                    )
                })
            }
            Value::Record { fields, .. } => {
                if let Some((_, v)) = fields.borrow().iter().find(|(n, _)| n == property) {
                    return Ok(v.clone());
                }
                self.method_on(&obj, property, env, token)
            }
            Value::Hash(entries) => {
                let hk = format!("String_{}", property);
                if let Some((_, v)) = entries.borrow().get(&hk) {
                    return Ok(v.clone());
                }
                self.method_on(&obj, property, env, token)
            }
            _ => self.method_on(&obj, property, env, token),
        }
    }

    /// Look the method up on the receiver's base type and bind `self` via a
    /// cloned function value.
    fn method_on(
        &mut self,
        receiver: &Value,
        property: &str,
        env: &Env,
        token: &Token,
    ) -> Result<Value, RuntimeError> {
        let base = value_base_name(receiver);
        match env.method(&base, property) {
            Some(Value::Function(f)) => Ok(Value::Function(Rc::new(FunctionValue {
                name: f.name.clone(),
                params: f.params.clone(),
                body: Rc::clone(&f.body),
                env: f.env.clone(),
                record_ctor: f.record_ctor.clone(),
                self_value: Some(receiver.clone()),
            }))),
            Some(other) => Ok(other),
            None => Err(RuntimeError::at(
                format!("{} has no member '{}'", base, property),
                token,
            )),
        }
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    pub fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        token: &Token,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(f) => {
                if let Some(record_name) = &f.record_ctor {
                    if args.len() != f.params.len() {
                        return Err(RuntimeError::at(
                            format!(
                                "constructor of {} expects {} argument(s), got {}",
                                record_name,
                                f.params.len(),
                                args.len()
                            ),
                            token,
                        ));
                    }
                    let fields: Vec<(String, Value)> = f
                        .params
                        .iter()
                        .map(|p| p.name.clone())
                        .zip(args)
                        .collect();
                    return Ok(Value::Record {
                        type_name: record_name.clone(),
                        fields: Rc::new(std::cell::RefCell::new(fields)),
                    });
                }

                // A bound self is prepended to the arguments and consumes
                // the leading `self` parameter.
                let mut params: &[Param] = &f.params;
                let scope = f.env.child();
                if let Some(self_val) = &f.self_value {
                    if params.first().map(|p| p.name.as_str()) == Some("self") {
                        scope.define("self", self_val.clone(), false);
                        params = &params[1..];
                    }
                }
                if args.len() != params.len() {
                    return Err(RuntimeError::at(
                        format!(
                            "{} expects {} argument(s), got {}",
                            f.name
                                .as_deref()
                                .map(|n| format!("'{}'", n))
                                .unwrap_or_else(|| "function".to_string()),
                            params.len(),
                            args.len()
                        ),
                        token,
                    ));
                }
                for (param, arg) in params.iter().zip(args) {
                    scope.define(param.name.clone(), arg, false);
                }
                match self.eval_expr(&f.body, &scope) {
                    Ok(v) => Ok(v),
                    // Early return unwraps at the call site.
                    Err(RuntimeError::Return(v)) => Ok(*v),
                    Err(e) => Err(e),
                }
            }
            Value::Builtin(name) => {
                if let Some(rest) = name.strip_prefix("ctor:") {
                    return call_variant_ctor(rest, args, token);
                }
                self.call_builtin(&name, args, token)
            }
            other => Err(RuntimeError::at(
                format!("{} is not callable", other.type_name()),
                token,
            )),
        }
    }
}

/// `Sum.Variant/arity` — build a SumInstance from the encoded constructor.
fn call_variant_ctor(encoded: &str, args: Vec<Value>, token: &Token) -> Result<Value, RuntimeError> {
    let (path, arity_str) = encoded.split_once('/').unwrap_or((encoded, "0"));
    let (sum, variant) = path.split_once('.').unwrap_or((path, path));
    let arity: usize = arity_str.parse().unwrap_or(0);
    if args.len() != arity {
        return Err(RuntimeError::at(
            format!(
                "constructor {} expects {} argument(s), got {}",
                variant,
                arity,
                args.len()
            ),
            token,
        ));
    }
    Ok(Value::sum(sum, variant, args))
}

/// The implementation-table key for a runtime value.
pub(crate) fn value_base_name(value: &Value) -> String {
    match value {
        Value::Record { type_name, .. } => type_name.clone(),
        Value::Sum { type_name, .. } => type_name.clone(),
        other => other.type_name().to_string(),
    }
}

/// The implementation-table key for an impl target written in source.
pub(crate) fn impl_target_base(te: &TypeExpr) -> String {
    match te {
        TypeExpr::Name { name, .. } => name.clone(),
        TypeExpr::Generic { name, .. } => name.clone(),
        TypeExpr::Path { segments, .. } => segments.last().cloned().unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Re-anchor a spanless runtime error on the given token.
fn reposition(err: RuntimeError, token: &Token) -> RuntimeError {
    match err {
        RuntimeError::Error { message, span: None } => RuntimeError::at(message, token),
        other => other,
    }
}
