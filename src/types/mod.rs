/// Lumen semantic types.
///
/// The closed variant set the type checker produces. Sum, record, and trait
/// declarations live in shared `Rc` allocations whose bodies are
/// `RefCell`-populated after allocation, so recursive payload types can refer
/// back to the same allocation; equality and substitution go by name plus
/// type arguments and never recurse into declaration bodies.
///
/// Sub-modules:
/// - `subst` — type-variable substitution maps
/// - `unify` — the unification relation
/// - `env` — scoped type environments
/// - `checker` — the static type checker
pub mod checker;
pub mod env;
pub mod subst;
pub mod unify;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::lexer::Token;

use self::env::TypeEnv;

/// A sum type declaration: name, type parameters, and the variant table.
/// Variant payload types are written in terms of the type parameters.
pub struct SumType {
    pub name: String,
    pub type_params: Vec<String>,
    pub variants: RefCell<Vec<(String, Vec<Type>)>>,
}

impl SumType {
    pub fn variant(&self, name: &str) -> Option<Vec<Type>> {
        self.variants
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, params)| params.clone())
    }

    pub fn variant_names(&self) -> Vec<String> {
        self.variants
            .borrow()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }
}

/// A record type declaration with ordered fields.
pub struct RecordType {
    pub name: String,
    pub type_params: Vec<String>,
    pub fields: RefCell<Vec<(String, Type)>>,
}

impl RecordType {
    pub fn field(&self, name: &str) -> Option<Type> {
        self.fields
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty.clone())
    }
}

/// A trait declaration; method signatures are `Type::Function`s whose `self`
/// parameter is the distinguished type variable `Self`.
pub struct TraitType {
    pub name: String,
    pub type_params: Vec<String>,
    pub methods: RefCell<Vec<(String, Type)>>,
}

impl TraitType {
    pub fn method(&self, name: &str) -> Option<Type> {
        self.methods
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty.clone())
    }
}

// Declaration bodies can refer back to their own allocation (recursive
// sums), so Debug prints names only.
impl fmt::Debug for SumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SumType({})", self.name)
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType({})", self.name)
    }
}

impl fmt::Debug for TraitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraitType({})", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum Type {
    Integer,
    Double,
    Boolean,
    Str,
    Null,
    Any,
    Array(Box<Type>),
    Hash(Box<Type>, Box<Type>),
    Tuple(Vec<Type>),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
        /// Bound type parameters of a generic function, with their trait
        /// bounds.
        type_params: Vec<(String, Vec<Type>)>,
    },
    Record {
        decl: Rc<RecordType>,
        type_args: Vec<Type>,
    },
    Sum {
        decl: Rc<SumType>,
        type_args: Vec<Type>,
    },
    Trait {
        decl: Rc<TraitType>,
        type_args: Vec<Type>,
    },
    /// A type variable; identity is the name, bounds are trait types.
    Var {
        name: String,
        bounds: Vec<Type>,
    },
    /// A loaded module: member access goes through its type environment.
    Module {
        name: String,
        env: TypeEnv,
    },
    /// A semantic error; halts checking of the current statement chain.
    Error {
        message: String,
        token: Option<Token>,
    },
}

impl Type {
    pub fn error(message: impl Into<String>, token: &Token) -> Type {
        Type::Error {
            message: message.into(),
            token: Some(token.clone()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Double)
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function {
            params,
            ret: Box::new(ret),
            type_params: Vec::new(),
        }
    }

    pub fn var(name: impl Into<String>) -> Type {
        Type::Var {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    /// The name the trait-implementation table is keyed by: record or sum
    /// name, literal `Hash`, or the stringified type.
    pub fn base_name(&self) -> String {
        match self {
            Type::Record { decl, .. } => decl.name.clone(),
            Type::Sum { decl, .. } => decl.name.clone(),
            Type::Hash(_, _) => "Hash".to_string(),
            Type::Array(_) => "Array".to_string(),
            other => other.to_string(),
        }
    }
}

/// Structural equality; sums, records, and traits compare by name and type
/// arguments so recursive declarations terminate.
impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Integer, Type::Integer)
            | (Type::Double, Type::Double)
            | (Type::Boolean, Type::Boolean)
            | (Type::Str, Type::Str)
            | (Type::Null, Type::Null)
            | (Type::Any, Type::Any) => true,
            (Type::Array(a), Type::Array(b)) => a == b,
            (Type::Hash(ak, av), Type::Hash(bk, bv)) => ak == bk && av == bv,
            (Type::Tuple(a), Type::Tuple(b)) => a == b,
            (
                Type::Function {
                    params: ap,
                    ret: ar,
                    ..
                },
                Type::Function {
                    params: bp,
                    ret: br,
                    ..
                },
            ) => ap == bp && ar == br,
            (
                Type::Record {
                    decl: ad,
                    type_args: aa,
                },
                Type::Record {
                    decl: bd,
                    type_args: ba,
                },
            ) => ad.name == bd.name && aa == ba,
            (
                Type::Sum {
                    decl: ad,
                    type_args: aa,
                },
                Type::Sum {
                    decl: bd,
                    type_args: ba,
                },
            ) => ad.name == bd.name && aa == ba,
            (
                Type::Trait {
                    decl: ad,
                    type_args: aa,
                },
                Type::Trait {
                    decl: bd,
                    type_args: ba,
                },
            ) => ad.name == bd.name && aa == ba,
            (Type::Var { name: a, .. }, Type::Var { name: b, .. }) => a == b,
            (Type::Module { name: a, .. }, Type::Module { name: b, .. }) => a == b,
            (Type::Error { message: a, .. }, Type::Error { message: b, .. }) => a == b,
            _ => false,
        }
    }
}

fn fmt_args(args: &[Type]) -> String {
    if args.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        format!("<{}>", parts.join(", "))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "Integer"),
            Type::Double => write!(f, "Double"),
            Type::Boolean => write!(f, "Boolean"),
            Type::Str => write!(f, "String"),
            Type::Null => write!(f, "Null"),
            Type::Any => write!(f, "Any"),
            Type::Array(el) => write!(f, "Array<{}>", el),
            Type::Hash(k, v) => write!(f, "Hash<{}, {}>", k, v),
            Type::Tuple(elements) => {
                let parts: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            Type::Function { params, ret, .. } => {
                let ps: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "fn({}) -> {}", ps.join(", "), ret)
            }
            Type::Record { decl, type_args } => {
                write!(f, "{}{}", decl.name, fmt_args(type_args))
            }
            Type::Sum { decl, type_args } => write!(f, "{}{}", decl.name, fmt_args(type_args)),
            Type::Trait { decl, type_args } => {
                write!(f, "{}{}", decl.name, fmt_args(type_args))
            }
            Type::Var { name, .. } => write!(f, "{}", name),
            Type::Module { name, .. } => write!(f, "module {}", name),
            Type::Error { message, .. } => write!(f, "error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(name: &str) -> Rc<SumType> {
        Rc::new(SumType {
            name: name.to_string(),
            type_params: vec!["T".to_string()],
            variants: RefCell::new(Vec::new()),
        })
    }

    #[test]
    fn sum_equality_is_by_name_and_args() {
        let a = Type::Sum {
            decl: sum("Option"),
            type_args: vec![Type::Integer],
        };
        let b = Type::Sum {
            decl: sum("Option"),
            type_args: vec![Type::Integer],
        };
        let c = Type::Sum {
            decl: sum("Option"),
            type_args: vec![Type::Str],
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn recursive_sum_equality_terminates() {
        let list = sum("IntList");
        // Cons(Integer, IntList) | Nil — the payload refers back to the sum.
        let self_ref = Type::Sum {
            decl: Rc::clone(&list),
            type_args: vec![],
        };
        list.variants.borrow_mut().push((
            "Cons".to_string(),
            vec![Type::Integer, self_ref.clone()],
        ));
        list.variants.borrow_mut().push(("Nil".to_string(), vec![]));

        let a = Type::Sum {
            decl: Rc::clone(&list),
            type_args: vec![],
        };
        assert_eq!(a, self_ref);
        assert_eq!(a.to_string(), "IntList");
    }

    #[test]
    fn base_names() {
        assert_eq!(Type::Integer.base_name(), "Integer");
        assert_eq!(
            Type::Hash(Box::new(Type::Str), Box::new(Type::Integer)).base_name(),
            "Hash"
        );
        let s = Type::Sum {
            decl: sum("Shape"),
            type_args: vec![],
        };
        assert_eq!(s.base_name(), "Shape");
    }
}
