/// Lumen runtime values and the value environment.
///
/// Lives in its own module so the interpreter and the native service
/// modules can both import it without circular dependencies.
///
/// Early return (`return`, the `?` operator) and runtime failure both travel
/// through `RuntimeError`: the caller recognizes the `Return` case and
/// unwraps it, so no host exception machinery is involved and blocks
/// propagate the signal unchanged.
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{Expr, Param};

// ---------------------------------------------------------------------------
// RuntimeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{message}")]
    Error {
        message: String,
        span: Option<(usize, usize)>,
    },
    /// Internal signal: `return` or `?` on an `Err` — caught at the nearest
    /// call site to perform the early return. Never surfaces to the user.
    #[error("early return")]
    Return(Box<Value>),
}

impl RuntimeError {
    pub fn msg(message: impl Into<String>) -> Self {
        RuntimeError::Error {
            message: message.into(),
            span: None,
        }
    }

    pub fn at(message: impl Into<String>, token: &crate::lexer::Token) -> Self {
        RuntimeError::Error {
            message: message.into(),
            span: Some((token.line, token.column)),
        }
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A user function (or record constructor) value: parameter list, body AST,
/// captured environment, optional record-constructor flag, optional bound
/// self.
#[derive(Debug)]
pub struct FunctionValue {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Rc<Expr>,
    pub env: Env,
    /// Record name when this function is a record constructor; the body is
    /// ignored and a record is built from the arguments.
    pub record_ctor: Option<String>,
    /// Receiver bound by method access.
    pub self_value: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Array(Rc<Vec<Value>>),
    Tuple(Rc<Vec<Value>>),
    /// Keyed by the stable hash string of the key; entries keep the original
    /// key value for display and iteration.
    Hash(Rc<RefCell<BTreeMap<String, (Value, Value)>>>),
    Record {
        type_name: String,
        fields: Rc<RefCell<Vec<(String, Value)>>>,
    },
    /// An instance of a sum variant with its positional payload.
    Sum {
        type_name: String,
        variant: String,
        payload: Rc<Vec<Value>>,
    },
    Function(Rc<FunctionValue>),
    /// Host-backed builtin, dispatched by name.
    Builtin(String),
    Null,
    Module {
        name: String,
        env: Env,
    },
}

impl Value {
    pub fn sum(type_name: impl Into<String>, variant: impl Into<String>, payload: Vec<Value>) -> Value {
        Value::Sum {
            type_name: type_name.into(),
            variant: variant.into(),
            payload: Rc::new(payload),
        }
    }

    pub fn ok(value: Value) -> Value {
        Value::sum("Result", "Ok", vec![value])
    }

    pub fn err(value: Value) -> Value {
        Value::sum("Result", "Err", vec![value])
    }

    pub fn some(value: Value) -> Value {
        Value::sum("Option", "Some", vec![value])
    }

    pub fn none() -> Value {
        Value::sum("Option", "None", vec![])
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Integer",
            Value::Double(_) => "Double",
            Value::Bool(_) => "Boolean",
            Value::Str(_) => "String",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
            Value::Hash(_) => "Hash",
            Value::Record { .. } => "Record",
            Value::Sum { .. } => "Sum",
            Value::Function(_) => "Function",
            Value::Builtin(_) => "Builtin",
            Value::Null => "Null",
            Value::Module { .. } => "Module",
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => *a.borrow() == *b.borrow(),
            (
                Value::Record {
                    type_name: an,
                    fields: af,
                },
                Value::Record {
                    type_name: bn,
                    fields: bf,
                },
            ) => an == bn && *af.borrow() == *bf.borrow(),
            (
                Value::Sum {
                    type_name: at,
                    variant: av,
                    payload: ap,
                },
                Value::Sum {
                    type_name: bt,
                    variant: bv,
                    payload: bp,
                },
            ) => at == bt && av == bv && ap == bp,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Module { name: a, .. }, Value::Module { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// Stable hash-key string: `KindTag_Value` for the four hashable kinds.
pub fn hash_key(value: &Value) -> Result<String, RuntimeError> {
    match value {
        Value::Int(i) => Ok(format!("Integer_{}", i)),
        Value::Double(d) => Ok(format!("Double_{}", d)),
        Value::Str(s) => Ok(format!("String_{}", s)),
        Value::Bool(b) => Ok(format!("Boolean_{}", b)),
        other => Err(RuntimeError::msg(format!(
            "{} cannot be used as a hash key",
            other.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

/// Scoped value environment: a chain of maps to the enclosing scope.
/// Closures hold the `Env` of their definition site, so mutation of
/// enclosing mutable bindings is visible through the shared allocation.
#[derive(Clone)]
pub struct Env(Rc<RefCell<EnvData>>);

struct EnvData {
    store: HashMap<String, Binding>,
    /// Data-constructor name → constructor value.
    ctors: HashMap<String, Value>,
    /// Base type name → method name → function value.
    methods: HashMap<String, Vec<(String, Value)>>,
    /// Variant name → sum type name.
    variant_sums: HashMap<String, String>,
    /// Active-pattern case name → registered function.
    active_patterns: HashMap<String, Value>,
    exposed: Option<HashSet<String>>,
    parent: Option<Env>,
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Env({} bindings)", self.0.borrow().store.len())
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

impl Env {
    pub fn new() -> Self {
        Env(Rc::new(RefCell::new(EnvData {
            store: HashMap::new(),
            ctors: HashMap::new(),
            methods: HashMap::new(),
            variant_sums: HashMap::new(),
            active_patterns: HashMap::new(),
            exposed: None,
            parent: None,
        })))
    }

    pub fn child(&self) -> Env {
        let env = Env::new();
        env.0.borrow_mut().parent = Some(self.clone());
        env
    }

    pub fn define(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.0
            .borrow_mut()
            .store
            .insert(name.into(), Binding { value, mutable });
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(binding) = data.store.get(name) {
            return Some(binding.value.clone());
        }
        data.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Walk up the chain and rebind at the defining frame. Assigning to an
    /// immutable binding is a silent no-op (the type checker already rejects
    /// such programs; this branch stays defensive). Returns whether a
    /// binding was found.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut data = self.0.borrow_mut();
        if let Some(binding) = data.store.get_mut(name) {
            if binding.mutable {
                binding.value = value;
            }
            return true;
        }
        match &data.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    pub fn define_ctor(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().ctors.insert(name.into(), value);
    }

    pub fn ctor(&self, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(v) = data.ctors.get(name) {
            return Some(v.clone());
        }
        data.parent.as_ref().and_then(|p| p.ctor(name))
    }

    pub fn define_method(&self, base: impl Into<String>, method: impl Into<String>, value: Value) {
        self.0
            .borrow_mut()
            .methods
            .entry(base.into())
            .or_default()
            .push((method.into(), value));
    }

    pub fn method(&self, base: &str, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(methods) = data.methods.get(base) {
            if let Some((_, v)) = methods.iter().find(|(n, _)| n == name) {
                return Some(v.clone());
            }
        }
        data.parent.as_ref().and_then(|p| p.method(base, name))
    }

    pub fn local_methods(&self) -> HashMap<String, Vec<(String, Value)>> {
        self.0.borrow().methods.clone()
    }

    pub fn map_variant(&self, variant: impl Into<String>, sum: impl Into<String>) {
        self.0
            .borrow_mut()
            .variant_sums
            .insert(variant.into(), sum.into());
    }

    pub fn variant_sum(&self, variant: &str) -> Option<String> {
        let data = self.0.borrow();
        if let Some(s) = data.variant_sums.get(variant) {
            return Some(s.clone());
        }
        data.parent.as_ref().and_then(|p| p.variant_sum(variant))
    }

    pub fn register_active_pattern(&self, case: impl Into<String>, value: Value) {
        self.0
            .borrow_mut()
            .active_patterns
            .insert(case.into(), value);
    }

    pub fn active_pattern(&self, case: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(v) = data.active_patterns.get(case) {
            return Some(v.clone());
        }
        data.parent.as_ref().and_then(|p| p.active_pattern(case))
    }

    pub fn set_exposed(&self, names: Option<Vec<String>>) {
        self.0.borrow_mut().exposed = names.map(|ns| ns.into_iter().collect());
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        match &self.0.borrow().exposed {
            Some(set) => set.contains(name),
            None => true,
        }
    }

    /// Names bound in this exact frame, sorted (REPL `:env` listing).
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().store.keys().cloned().collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Human-readable representation (used by `writeln` and `toString`).
pub fn repr(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Str(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(repr_quoted).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(repr_quoted).collect();
            format!("({})", parts.join(", "))
        }
        Value::Hash(entries) => {
            let parts: Vec<String> = entries
                .borrow()
                .values()
                .map(|(k, v)| format!("{}: {}", repr_quoted(k), repr_quoted(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Record { type_name, fields } => {
            let parts: Vec<String> = fields
                .borrow()
                .iter()
                .map(|(name, v)| format!("{}: {}", name, repr_quoted(v)))
                .collect();
            format!("{}({})", type_name, parts.join(", "))
        }
        Value::Sum {
            variant, payload, ..
        } => {
            if payload.is_empty() {
                variant.clone()
            } else {
                let parts: Vec<String> = payload.iter().map(repr_quoted).collect();
                format!("{}({})", variant, parts.join(", "))
            }
        }
        Value::Function(f) => match &f.name {
            Some(name) => format!("<fn {}>", name),
            None => "<fn>".to_string(),
        },
        Value::Builtin(name) => format!("<builtin {}>", name),
        Value::Module { name, .. } => format!("<module {}>", name),
    }
}

/// Like `repr`, but strings are quoted — used inside containers.
fn repr_quoted(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("\"{}\"", s),
        other => repr(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_print_like_integers_when_whole() {
        assert_eq!(repr(&Value::Double(3.0)), "3");
        assert_eq!(repr(&Value::Double(3.5)), "3.5");
    }

    #[test]
    fn hash_keys_are_kind_tagged() {
        assert_eq!(hash_key(&Value::Int(5)).unwrap(), "Integer_5");
        assert_eq!(
            hash_key(&Value::Str("a".into())).unwrap(),
            "String_a"
        );
        assert_eq!(hash_key(&Value::Bool(true)).unwrap(), "Boolean_true");
        assert!(hash_key(&Value::Null).is_err());
    }

    #[test]
    fn assign_rebinds_at_defining_frame() {
        let outer = Env::new();
        outer.define("x", Value::Int(1), true);
        let inner = outer.child();
        assert!(inner.assign("x", Value::Int(2)));
        assert_eq!(outer.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn assign_to_immutable_is_a_silent_noop() {
        let env = Env::new();
        env.define("x", Value::Int(1), false);
        assert!(env.assign("x", Value::Int(9)));
        assert_eq!(env.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn mixed_numeric_equality() {
        assert_eq!(Value::Int(3), Value::Double(3.0));
        assert_ne!(Value::Int(3), Value::Double(3.5));
    }

    #[test]
    fn sum_repr() {
        assert_eq!(repr(&Value::ok(Value::Int(5))), "Ok(5)");
        assert_eq!(repr(&Value::none()), "None");
        assert_eq!(
            repr(&Value::err(Value::Str("bad".into()))),
            "Err(\"bad\")"
        );
    }
}
