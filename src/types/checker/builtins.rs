/// Hardwired builtin signatures and the prelude.
///
/// The prelude is constructed once per loader instance and threaded through
/// module environments; `Result` and `Option` share one declaration so
/// every module sees the same sums.
use std::cell::RefCell;
use std::rc::Rc;

use crate::types::env::TypeEnv;
use crate::types::{SumType, Type};

/// The prelude objects shared by every module of one loader.
#[derive(Debug, Clone)]
pub struct Prelude {
    pub result: Rc<SumType>,
    pub option: Rc<SumType>,
}

impl Default for Prelude {
    fn default() -> Self {
        Prelude::new()
    }
}

impl Prelude {
    pub fn new() -> Self {
        let result = Rc::new(SumType {
            name: "Result".to_string(),
            type_params: vec!["O".to_string(), "E".to_string()],
            variants: RefCell::new(vec![
                ("Ok".to_string(), vec![Type::var("O")]),
                ("Err".to_string(), vec![Type::var("E")]),
            ]),
        });
        let option = Rc::new(SumType {
            name: "Option".to_string(),
            type_params: vec!["T".to_string()],
            variants: RefCell::new(vec![
                ("Some".to_string(), vec![Type::var("T")]),
                ("None".to_string(), vec![]),
            ]),
        });
        Prelude { result, option }
    }
}

/// The return type of the variadic builtins, which bypass arity checking.
pub(crate) fn variadic_builtin(name: &str) -> Option<Type> {
    match name {
        "writeln" | "write" => Some(Type::Null),
        "strFormat" => Some(Type::Str),
        _ => None,
    }
}

fn generic_fn(params: Vec<Type>, ret: Type, type_params: &[&str]) -> Type {
    Type::Function {
        params,
        ret: Box::new(ret),
        type_params: type_params
            .iter()
            .map(|n| (n.to_string(), Vec::new()))
            .collect(),
    }
}

/// Seed a fresh module type environment with the builtins, `Result`,
/// `Option`, and their constructors.
pub fn seed_prelude(env: &TypeEnv, prelude: &Prelude) {
    let arr = |t: Type| Type::Array(Box::new(t));
    let t = || Type::var("T");
    let u = || Type::var("U");

    env.define("len", Type::function(vec![Type::Any], Type::Integer), false);
    env.define("toString", Type::function(vec![Type::Any], Type::Str), false);
    // Variadic: the parameter list here is nominal; call sites special-case
    // these names.
    env.define("writeln", Type::function(vec![Type::Any], Type::Null), false);
    env.define("write", Type::function(vec![Type::Any], Type::Null), false);
    env.define(
        "strFormat",
        Type::function(vec![Type::Str], Type::Str),
        false,
    );
    env.define(
        "map",
        generic_fn(
            vec![arr(t()), Type::function(vec![t()], u())],
            arr(u()),
            &["T", "U"],
        ),
        false,
    );
    env.define(
        "filter",
        generic_fn(
            vec![arr(t()), Type::function(vec![t()], Type::Boolean)],
            arr(t()),
            &["T"],
        ),
        false,
    );
    env.define(
        "reduce",
        generic_fn(
            vec![arr(t()), u(), Type::function(vec![u(), t()], u())],
            u(),
            &["T", "U"],
        ),
        false,
    );
    env.define("first", generic_fn(vec![arr(t())], t(), &["T"]), false);
    env.define("rest", generic_fn(vec![arr(t())], arr(t()), &["T"]), false);
    env.define(
        "prepend",
        generic_fn(vec![t(), arr(t())], arr(t()), &["T"]),
        false,
    );
    env.define("NULL", Type::Null, false);

    // Result<O, E> and Option<T>, with their constructors bound by
    // unqualified name.
    env.define_type(
        "Result",
        Type::Sum {
            decl: Rc::clone(&prelude.result),
            type_args: vec![Type::var("O"), Type::var("E")],
        },
    );
    env.define_type(
        "Option",
        Type::Sum {
            decl: Rc::clone(&prelude.option),
            type_args: vec![Type::var("T")],
        },
    );
    env.define_ctor(
        "Ok",
        Type::Function {
            params: vec![Type::var("O")],
            ret: Box::new(Type::Sum {
                decl: Rc::clone(&prelude.result),
                type_args: vec![Type::var("O"), Type::var("E")],
            }),
            type_params: vec![("O".to_string(), vec![]), ("E".to_string(), vec![])],
        },
    );
    env.define_ctor(
        "Err",
        Type::Function {
            params: vec![Type::var("E")],
            ret: Box::new(Type::Sum {
                decl: Rc::clone(&prelude.result),
                type_args: vec![Type::var("O"), Type::var("E")],
            }),
            type_params: vec![("O".to_string(), vec![]), ("E".to_string(), vec![])],
        },
    );
    env.define_ctor(
        "Some",
        Type::Function {
            params: vec![Type::var("T")],
            ret: Box::new(Type::Sum {
                decl: Rc::clone(&prelude.option),
                type_args: vec![Type::var("T")],
            }),
            type_params: vec![("T".to_string(), vec![])],
        },
    );
    env.define_ctor(
        "None",
        Type::Function {
            params: vec![],
            ret: Box::new(Type::Sum {
                decl: Rc::clone(&prelude.option),
                type_args: vec![Type::var("T")],
            }),
            type_params: vec![("T".to_string(), vec![])],
        },
    );
}
