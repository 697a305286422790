/// Runtime pattern matching for `match` and `when`.
use std::rc::Rc;

use crate::ast::{Expr, MatchArm, Pattern, WhenBranch};
use crate::lexer::Token;
use crate::value::{Env, RuntimeError, Value};

use super::Interpreter;

impl Interpreter<'_> {
    pub(crate) fn eval_match(
        &mut self,
        token: &Token,
        scrutinee: &Expr,
        arms: &[MatchArm],
        env: &Env,
    ) -> Result<Value, RuntimeError> {
        let value = self.eval_expr(scrutinee, env)?;
        for arm in arms {
            let scope = env.child();
            if self.matches(&arm.pattern, &value, &scope)? {
                return self.eval_expr(&arm.body, &scope);
            }
        }
        Err(RuntimeError::at(
            format!("no pattern matched {}", crate::value::repr(&value)),
            token,
        ))
    }

    /// Test `pattern` against `value`, binding names into `scope` on
    /// success.
    fn matches(
        &mut self,
        pattern: &Pattern,
        value: &Value,
        scope: &Env,
    ) -> Result<bool, RuntimeError> {
        match pattern {
            Pattern::Wildcard { .. } => Ok(true),
            Pattern::Int { value: expected, .. } => {
                Ok(matches!(value, Value::Int(i) if i == expected))
            }
            Pattern::Str { value: expected, .. } => {
                Ok(matches!(value, Value::Str(s) if s == expected))
            }
            Pattern::Bool { value: expected, .. } => {
                Ok(matches!(value, Value::Bool(b) if b == expected))
            }
            Pattern::Ident { name, .. } => {
                // A bare identifier matches a zero-payload variant of the
                // same name; otherwise it binds the scrutinee.
                if let Value::Sum {
                    variant, payload, ..
                } = value
                {
                    if variant == name && payload.is_empty() {
                        return Ok(true);
                    }
                    if scope.variant_sum(name).is_some() && variant != name {
                        return Ok(false);
                    }
                }
                scope.define(name.clone(), value.clone(), false);
                Ok(true)
            }
            Pattern::Variant {
                token,
                name,
                bindings,
            } => {
                // Active patterns run the registered function over the
                // scrutinee and match on the returned variant.
                if let Some(fn_val) = scope.active_pattern(name) {
                    let result = self.call_value(fn_val, vec![value.clone()], token)?;
                    return self.match_sum(name, bindings, &result, scope);
                }
                self.match_sum(name, bindings, value, scope)
            }
            Pattern::Array {
                elements, rest, ..
            } => match value {
                Value::Array(items) => {
                    match rest {
                        Some(_) if items.len() < elements.len() => return Ok(false),
                        None if items.len() != elements.len() => return Ok(false),
                        _ => {}
                    }
                    for (sub, item) in elements.iter().zip(items.iter()) {
                        if !self.matches(sub, item, scope)? {
                            return Ok(false);
                        }
                    }
                    if let Some(rest_name) = rest {
                        let tail: Vec<Value> = items[elements.len()..].to_vec();
                        scope.define(rest_name.clone(), Value::Array(Rc::new(tail)), false);
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            Pattern::Tuple { elements, .. } => match value {
                Value::Tuple(items) if items.len() == elements.len() => {
                    for (sub, item) in elements.iter().zip(items.iter()) {
                        if !self.matches(sub, item, scope)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }

    fn match_sum(
        &mut self,
        name: &str,
        bindings: &[Pattern],
        value: &Value,
        scope: &Env,
    ) -> Result<bool, RuntimeError> {
        match value {
            Value::Sum {
                variant, payload, ..
            } => {
                if variant != name || payload.len() != bindings.len() {
                    return Ok(false);
                }
                for (sub, item) in bindings.iter().zip(payload.iter()) {
                    if !self.matches(sub, item, scope)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// `when` with a subject compares each condition to the subject by
    /// equality, falling back to boolean predicates; without a subject,
    /// every condition is a boolean test.
    pub(crate) fn eval_when(
        &mut self,
        _token: &Token,
        subject: Option<&Expr>,
        branches: &[WhenBranch],
        else_body: &Expr,
        env: &Env,
    ) -> Result<Value, RuntimeError> {
        let subject_val = match subject {
            Some(s) => Some(self.eval_expr(s, env)?),
            None => None,
        };

        for branch in branches {
            for cond in &branch.conditions {
                let cond_val = self.eval_expr(cond, env)?;
                let hit = match &subject_val {
                    Some(subject_val) => {
                        cond_val == *subject_val
                            || (!matches!(subject_val, Value::Bool(_))
                                && matches!(cond_val, Value::Bool(true)))
                    }
                    None => cond_val.is_truthy(),
                };
                if hit {
                    return self.eval_expr(&branch.body, env);
                }
            }
        }
        self.eval_expr(else_body, env)
    }
}
