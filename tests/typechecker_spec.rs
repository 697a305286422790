/// Spec tests for the Lumen type checker: unification, inference,
/// declarations, trait dispatch, exhaustiveness, and mutation discipline.
use lumen::loader::ModuleLoader;
use lumen::parser;
use lumen::types::checker::{check_program, SemanticError};
use lumen::types::subst::Subst;
use lumen::types::unify::unify;
use lumen::types::Type;
use pretty_assertions::assert_eq;

fn check(src: &str) -> Result<(), SemanticError> {
    let program = parser::parse(src).expect("parse failed");
    let mut loader = ModuleLoader::new(".");
    let (type_env, _) = loader.prelude_envs();
    check_program(&program, &type_env, &mut loader)
}

fn check_err(src: &str) -> String {
    match check(src) {
        Err(e) => e.message,
        Ok(()) => panic!("expected a type error for {:?}", src),
    }
}

// ---------------------------------------------------------------------------
// Unification law
// ---------------------------------------------------------------------------

#[test]
fn unify_success_implies_substituted_equality() {
    let cases = vec![
        (Type::var("a"), Type::Integer),
        (
            Type::function(vec![Type::var("a")], Type::var("b")),
            Type::function(vec![Type::Str], Type::Boolean),
        ),
        (
            Type::Array(Box::new(Type::var("a"))),
            Type::Array(Box::new(Type::Tuple(vec![Type::Integer, Type::var("c")]))),
        ),
        (
            Type::Hash(Box::new(Type::Str), Box::new(Type::var("v"))),
            Type::Hash(Box::new(Type::var("k")), Box::new(Type::Null)),
        ),
    ];
    for (a, b) in cases {
        let mut subst = Subst::new();
        assert!(unify(&a, &b, &mut subst), "unify failed for {} ~ {}", a, b);
        assert_eq!(subst.apply(&a), subst.apply(&b));
    }
}

#[test]
fn numeric_relaxation_is_one_way() {
    let mut s = Subst::new();
    assert!(unify(&Type::Integer, &Type::Double, &mut s));
    assert!(!unify(&Type::Double, &Type::Integer, &mut s));
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[test]
fn arithmetic_widening_and_modulo() {
    assert!(check("let a = 1 + 2;").is_ok());
    assert!(check("let b = 1 + 2.5;").is_ok());
    assert!(check("let c = 7 % 2;").is_ok());
    assert!(check_err("let d = 7.5 % 2;").contains("'%'"));
    assert!(check_err("let e = 1 + \"x\";").contains("'+'"));
}

#[test]
fn logic_requires_booleans() {
    assert!(check("let a = true && false;").is_ok());
    assert!(check_err("let b = 1 && true;").contains("'&&'"));
}

#[test]
fn equality_allows_null_on_either_side() {
    assert!(check("let a = NULL == 1;").is_ok());
    assert!(check("let b = \"s\" == NULL;").is_ok());
    assert!(check_err("let c = 1 == \"s\";").contains("cannot compare"));
}

#[test]
fn unknown_identifier_is_an_error() {
    assert!(check_err("ghost;").contains("unknown identifier 'ghost'"));
}

#[test]
fn empty_collections_need_an_annotation() {
    assert!(check_err("let xs = [];").contains("empty array"));
    assert!(check("let xs: Array<Integer> = [];").is_ok());
    assert!(check("let h: Hash<String, Integer> = {};").is_ok());
}

#[test]
fn collections_must_be_homogeneous() {
    assert!(check_err("let xs = [1, \"two\"];").contains("homogeneous"));
    assert!(check("let xs = [1.0, 2];").is_ok()); // Integer widens into Double
    assert!(check_err("let h = {\"a\": 1, \"b\": \"x\"};").contains("hash values"));
}

#[test]
fn hash_keys_must_be_hashable() {
    assert!(check_err("let h = {[1]: 1};").contains("hash key"));
}

#[test]
fn annotations_are_enforced() {
    assert!(check("let x: Integer = 1;").is_ok());
    assert!(check("let x: Double = 1;").is_ok()); // widening into the annotation
    assert!(check_err("let x: Integer = \"s\";").contains("mismatch"));
}

// ---------------------------------------------------------------------------
// Mutation discipline
// ---------------------------------------------------------------------------

#[test]
fn immutable_rebinding_is_rejected() {
    assert_eq!(
        check_err("let x = 1; x = 2;"),
        "cannot assign to immutable binding 'x'"
    );
}

#[test]
fn mutable_rebinding_is_allowed() {
    assert!(check("let mut x = 1; x = 2; x += 3;").is_ok());
}

#[test]
fn plus_assign_requires_numerics() {
    assert!(check_err("let mut s = \"a\"; s += \"b\";").contains("'+='"));
}

#[test]
fn hash_index_assignment_is_allowed() {
    assert!(check("let h = {\"a\": 1}; h[\"b\"] = 2;").is_ok());
    assert!(check_err("let h = {\"a\": 1}; h[\"b\"] = \"x\";").contains("assign"));
}

// ---------------------------------------------------------------------------
// Functions and calls
// ---------------------------------------------------------------------------

#[test]
fn declared_signature_enables_recursion() {
    assert!(check(
        "let fact = fn fact(n: Integer) -> Integer {\n\
           if n < 2: 1 else: n * fact(n - 1);\n\
         };"
    )
    .is_ok());
}

#[test]
fn body_must_match_declared_return_type() {
    assert!(check_err("let f = (n: Integer) -> String => n;").contains("declares"));
}

#[test]
fn arity_is_checked() {
    assert!(check_err("let f = (a, b) => a; f(1);").contains("2 argument(s)"));
}

#[test]
fn generic_builtins_infer_through_calls() {
    assert!(check("let doubled = map([1, 2], (x) => x * 2);").is_ok());
    assert!(check("let n = reduce([1, 2], 0, (a, b) => a + b);").is_ok());
    assert!(check_err("let bad = map(3, (x) => x);").contains("argument type mismatch"));
}

#[test]
fn non_function_call_is_an_error() {
    assert!(check_err("let x = 1; x(2);").contains("not callable"));
}

// ---------------------------------------------------------------------------
// Sums, records, match
// ---------------------------------------------------------------------------

const SHAPE: &str = "type Shape = Square(Integer) | Circle(Integer);\n";

#[test]
fn variant_constructors_build_the_sum() {
    assert!(check(&format!("{}let s: Shape = Square(4);", SHAPE)).is_ok());
    assert!(check_err(&format!("{}let s = Square(\"x\");", SHAPE))
        .contains("argument type mismatch"));
    assert!(check_err(&format!("{}let s = Square(1, 2);", SHAPE)).contains("argument(s)"));
}

#[test]
fn expected_type_drives_constructor_inference() {
    assert!(check("let r: Result<Integer, String> = Ok(3);").is_ok());
    assert!(check_err("let r: Result<Integer, String> = Ok(\"no\");").contains("mismatch"));
}

#[test]
fn match_is_exhaustiveness_checked() {
    let missing = check_err(&format!(
        "{}let f = (s: Shape) => match (s) {{ Square(n) => n }};",
        SHAPE
    ));
    assert!(missing.contains("not exhaustive"));
    assert!(missing.contains("Circle"));

    assert!(check(&format!(
        "{}let f = (s: Shape) => match (s) {{ Square(n) => n, Circle(r) => r }};",
        SHAPE
    ))
    .is_ok());
    // A wildcard covers the remainder.
    assert!(check(&format!(
        "{}let f = (s: Shape) => match (s) {{ Square(n) => n, _ => 0 }};",
        SHAPE
    ))
    .is_ok());
}

#[test]
fn match_arms_must_share_a_type() {
    assert!(check_err(&format!(
        "{}let f = (s: Shape) => match (s) {{ Square(n) => n, Circle(r) => \"big\" }};",
        SHAPE
    ))
    .contains("incompatible"));
}

#[test]
fn foreign_variant_in_match_is_an_error() {
    assert!(check_err(&format!(
        "{}let f = (s: Shape) => match (s) {{ Ok(v) => v, _ => 0 }};",
        SHAPE
    ))
    .contains("not a variant of Shape"));
}

#[test]
fn record_fields_are_typed() {
    let src = "record Dog(name: String, age: Integer);\nlet d = Dog(\"rex\", 3);\n";
    assert!(check(&format!("{}let n: String = d.name;", src)).is_ok());
    assert!(check_err(&format!("{}let n: Integer = d.name;", src)).contains("mismatch"));
    assert!(check_err(&format!("{}d.tail;", src)).contains("no field or method 'tail'"));
}

#[test]
fn generic_record_instantiates_from_arguments() {
    let src = "record Pair<A, B>(left: A, right: B);\nlet p = Pair(1, \"x\");\n";
    assert!(check(&format!("{}let l: Integer = p.left;", src)).is_ok());
    assert!(check_err(&format!("{}let r: Integer = p.right;", src)).contains("mismatch"));
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

const GREET: &str = "trait Greet { fn hello(self) -> String; }\nrecord Dog(name: String);\n";

#[test]
fn impl_provides_methods_for_dispatch() {
    assert!(check(&format!(
        "{}impl Greet for Dog {{ fn hello(self) -> String => self.name; }}\n\
         let s: String = Dog(\"rex\").hello();",
        GREET
    ))
    .is_ok());
}

#[test]
fn missing_trait_method_is_an_error() {
    assert!(check_err(&format!("{}impl Greet for Dog {{ }}", GREET))
        .contains("missing method 'hello'"));
}

#[test]
fn method_signature_mismatch_is_an_error() {
    assert!(check_err(&format!(
        "{}impl Greet for Dog {{ fn hello(self) -> Integer => 1; }}",
        GREET
    ))
    .contains("does not match the trait signature"));
}

#[test]
fn extra_method_not_in_trait_is_an_error() {
    assert!(check_err(&format!(
        "{}impl Greet for Dog {{ fn hello(self) -> String => \"\"; fn bark(self) -> String => \"\"; }}",
        GREET
    ))
    .contains("not a method of trait"));
}

#[test]
fn trait_bounds_are_enforced_at_call_sites() {
    let base = format!(
        "{}impl Greet for Dog {{ fn hello(self) -> String => self.name; }}\n\
         record Cat(lives: Integer);\n\
         let greet = fn greet<T: Greet>(v: T) -> String {{ v.hello() }};\n",
        GREET
    );
    assert!(check(&format!("{}greet(Dog(\"rex\"));", base)).is_ok());
    assert!(check_err(&format!("{}greet(Cat(9));", base))
        .contains("does not implement trait Greet"));
}

#[test]
fn impl_type_param_bounds_check_transitively() {
    let base = format!(
        "{}impl Greet for Dog {{ fn hello(self) -> String => self.name; }}\n\
         record Cat(lives: Integer);\n\
         record Box<T>(item: T);\n\
         impl<U: Greet> Greet for Box<U> {{ fn hello(self) -> String => \"boxed\"; }}\n",
        GREET
    );
    assert!(check(&format!("{}Box(Dog(\"rex\")).hello();", base)).is_ok());
    assert!(check_err(&format!("{}Box(Cat(9)).hello();", base)).contains("does not implement"));
}

// ---------------------------------------------------------------------------
// The ? operator
// ---------------------------------------------------------------------------

#[test]
fn try_requires_result_operand_and_result_return() {
    assert!(check(
        "let half = (n: Integer) -> Result<Integer, String> => {\n\
           if n % 2 == 0: Ok(n / 2) else: Err(\"odd\");\n\
         };\n\
         let twice = (n: Integer) -> Result<Integer, String> => {\n\
           let h = half(n)?;\n\
           Ok(h + h);\n\
         };"
    )
    .is_ok());

    assert!(check_err("let x = 1?;").contains("expects a Result"));
    assert!(check_err(
        "let half = (n: Integer) -> Result<Integer, String> => Ok(n);\n\
         let f = (n: Integer) -> Integer => half(n)?;"
    )
    .contains("return a Result"));
    assert!(check_err(
        "let half = (n: Integer) -> Result<Integer, String> => Ok(n);\n\
         let f = (n: Integer) => half(n)?;"
    )
    .contains("declared Result return type"));
}

#[test]
fn try_error_types_must_unify() {
    assert!(check_err(
        "let a = (n: Integer) -> Result<Integer, Integer> => Ok(n);\n\
         let b = (n: Integer) -> Result<Integer, String> => Ok(a(n)?);"
    )
    .contains("error type"));
}

// ---------------------------------------------------------------------------
// Return statements
// ---------------------------------------------------------------------------

#[test]
fn return_outside_function_is_an_error() {
    assert!(check_err("return 1;").contains("outside of a function"));
}

#[test]
fn return_must_match_declared_type() {
    assert!(check("let f = (n: Integer) -> Integer => { return n; };").is_ok());
    assert!(
        check_err("let f = (n: Integer) -> Integer => { return \"s\"; };").contains("return type")
    );
}

// ---------------------------------------------------------------------------
// when
// ---------------------------------------------------------------------------

#[test]
fn when_conditions_match_subject_or_boolean() {
    assert!(check("let x = 5; let s = when (x) { | 1, 2 => \"low\", | x > 3 => \"big\", else => \"mid\" };").is_ok());
    assert!(check_err("let x = 5; when (x) { | \"one\" => 1, else => 0 };")
        .contains("when condition"));
    assert!(check_err("when { | 1 => 1, else => 0 };").contains("must be Boolean"));
}

#[test]
fn when_branches_share_a_type() {
    assert!(check_err("let x = 1; when (x) { | 1 => 1, else => \"s\" };")
        .contains("incompatible"));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn checking_is_deterministic() {
    let src = "type Shape = Square(Integer) | Circle(Integer);\n\
               let f = (s: Shape) => match (s) { Square(n) => n };";
    let first = check_err(src);
    for _ in 0..5 {
        assert_eq!(check_err(src), first);
    }
}
