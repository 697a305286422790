/// Spec tests for the Lumen evaluator.
///
/// Programs are parsed, type-checked against a prelude environment, then
/// evaluated; the asserted value is the program's final expression value.
use lumen::interpreter::Interpreter;
use lumen::loader::ModuleLoader;
use lumen::parser;
use lumen::types::checker::check_program;
use lumen::value::{repr, RuntimeError, Value};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> Value {
    try_eval(src).unwrap_or_else(|e| panic!("eval failed for {:?}: {}", src, e))
}

fn try_eval(src: &str) -> Result<Value, RuntimeError> {
    let program = parser::parse(src).expect("parse failed");
    let mut loader = ModuleLoader::new(".");
    let (type_env, value_env) = loader.prelude_envs();
    check_program(&program, &type_env, &mut loader)
        .unwrap_or_else(|e| panic!("type check failed for {:?}: {}", src, e.message));
    let mut interp = Interpreter::new(&mut loader);
    interp.eval_program(&program, &value_env)
}

fn eval_err(src: &str) -> String {
    let program = parser::parse(src).expect("parse failed");
    let mut loader = ModuleLoader::new(".");
    let (type_env, value_env) = loader.prelude_envs();
    check_program(&program, &type_env, &mut loader)
        .unwrap_or_else(|e| panic!("type check failed for {:?}: {}", src, e.message));
    let mut interp = Interpreter::new(&mut loader);
    match interp.eval_program(&program, &value_env) {
        Err(e) => e.to_string(),
        Ok(v) => panic!("expected a runtime error, got {}", repr(&v)),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic and logic
// ---------------------------------------------------------------------------

#[test]
fn integer_arithmetic() {
    assert_eq!(eval("2 + 3 * 4"), Value::Int(14));
    assert_eq!(eval("10 / 3"), Value::Int(3));
    assert_eq!(eval("10 % 3"), Value::Int(1));
}

#[test]
fn arithmetic_widening() {
    assert_eq!(eval("1 + 2.0"), Value::Double(3.0));
    assert_eq!(repr(&eval("1 + 2.0")), "3");
    assert_eq!(eval("1.5 * 2"), Value::Double(3.0));
}

#[test]
fn division_and_modulo_by_zero_are_runtime_errors() {
    assert!(eval_err("let f = (n: Integer) => 1 / n; f(0);").contains("division by zero"));
    assert!(eval_err("let f = (n: Integer) => 1 % n; f(0);").contains("modulo by zero"));
}

#[test]
fn string_concatenation_and_comparison() {
    assert_eq!(eval("\"foo\" + \"bar\""), Value::Str("foobar".into()));
    assert_eq!(eval("\"abc\" < \"abd\""), Value::Bool(true));
}

#[test]
fn short_circuit_returns_the_deciding_operand() {
    // The right side would divide by zero if evaluated.
    assert_eq!(
        eval("let f = (n: Integer) => false && 1 / n == 1; f(0);"),
        Value::Bool(false)
    );
    assert_eq!(
        eval("let f = (n: Integer) => true || 1 / n == 1; f(0);"),
        Value::Bool(true)
    );
}

#[test]
fn prefix_operators() {
    assert_eq!(eval("-(3 + 4)"), Value::Int(-7));
    assert_eq!(eval("!false"), Value::Bool(true));
}

// ---------------------------------------------------------------------------
// Bindings, mutation, closures
// ---------------------------------------------------------------------------

#[test]
fn mutable_rebinding_is_visible_to_later_reads() {
    assert_eq!(eval("let mut x = 1; x = 2; x + 1"), Value::Int(3));
    assert_eq!(eval("let mut x = 1; x += 4; x"), Value::Int(5));
}

#[test]
fn closure_captures_and_mutates_enclosing_binding() {
    assert_eq!(
        eval("let mut c = 0; let bump = () => { c = c + 1; c }; bump(); bump(); c"),
        Value::Int(2)
    );
}

#[test]
fn higher_order_closure_capture() {
    assert_eq!(
        eval("let mkAdder = (n) => (x) => x + n; let add3 = mkAdder(3); add3(4)"),
        Value::Int(7)
    );
}

#[test]
fn tuple_and_array_destructuring() {
    assert_eq!(eval("let (a, b) = (1, 2); a + b"), Value::Int(3));
    assert_eq!(
        eval("let [h, ...t] = [1, 2, 3]; h + len(t)"),
        Value::Int(3)
    );
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[test]
fn array_indexing_and_bounds() {
    assert_eq!(eval("[10, 20, 30][1]"), Value::Int(20));
    assert!(eval_err("let i = 2 + 1; [10, 20, 30][i]").contains("out of range"));
}

#[test]
fn hash_literal_index_and_mutation() {
    assert_eq!(eval("let h = {\"a\": 1, \"b\": 2}; h[\"b\"]"), Value::Int(2));
    assert_eq!(
        eval("let h = {\"a\": 1}; h[\"a\"] = 5; h[\"a\"]"),
        Value::Int(5)
    );
    assert_eq!(eval("let h = {\"a\": 1}; h[\"a\"] += 2; h[\"a\"]"), Value::Int(3));
    assert!(eval_err("let h = {\"a\": 1}; h[\"missing\"]").contains("key not found"));
}

#[test]
fn hash_aliasing_is_observable() {
    assert_eq!(
        eval("let h = {\"a\": 1}; let g = h; g[\"a\"] = 9; h[\"a\"]"),
        Value::Int(9)
    );
}

#[test]
fn dot_access_on_string_keyed_hash() {
    assert_eq!(eval("let h = {\"name\": \"ada\"}; h.name"), Value::Str("ada".into()));
}

#[test]
fn builtin_array_functions() {
    assert_eq!(
        repr(&eval("map([1, 2, 3], (x) => x * 2)")),
        "[2, 4, 6]"
    );
    assert_eq!(
        repr(&eval("filter([1, 2, 3, 4], (x) => x % 2 == 0)")),
        "[2, 4]"
    );
    assert_eq!(eval("reduce([1, 2, 3], 0, (a, b) => a + b)"), Value::Int(6));
    assert_eq!(eval("first([7, 8])"), Value::Int(7));
    assert_eq!(repr(&eval("rest([7, 8, 9])")), "[8, 9]");
    assert_eq!(repr(&eval("prepend(1, [2, 3])")), "[1, 2, 3]");
    assert_eq!(eval("len(\"abc\") + len([1])"), Value::Int(4));
}

#[test]
fn to_string_and_str_format() {
    assert_eq!(eval("toString(12)"), Value::Str("12".into()));
    assert_eq!(
        eval("strFormat(\"{?} and {?}\", 1, \"two\")"),
        Value::Str("1 and two".into())
    );
    // Surplus placeholders stay verbatim.
    assert_eq!(
        eval("strFormat(\"{?} and {?}\", 1)"),
        Value::Str("1 and {?}".into())
    );
}

#[test]
fn interpolated_strings_splice_expressions() {
    assert_eq!(
        eval("let x = 6; `x is {x + 1}!`"),
        Value::Str("x is 7!".into())
    );
}

// ---------------------------------------------------------------------------
// Sums, records, pattern matching
// ---------------------------------------------------------------------------

const SHAPE: &str = "type Shape = Square(Integer) | Circle(Integer);\n";

#[test]
fn sum_pattern_match() {
    assert_eq!(
        eval(&format!(
            "{}let area = (s) => match (s) {{ Square(n) => n * n, Circle(r) => 3 * r * r }};\n\
             area(Square(4))",
            SHAPE
        )),
        Value::Int(16)
    );
}

#[test]
fn match_literals_wildcards_and_bindings() {
    assert_eq!(
        eval("match (3) { 1 => \"one\", 3 => \"three\", _ => \"other\" }"),
        Value::Str("three".into())
    );
    assert_eq!(eval("match (42) { n => n + 1 }"), Value::Int(43));
    assert_eq!(
        eval("match ([1, 2, 3]) { [a, ...rest] => a + len(rest), _ => 0 }"),
        Value::Int(3)
    );
    assert_eq!(
        eval("match ((1, 2)) { (a, b) => a + b }"),
        Value::Int(3)
    );
}

#[test]
fn no_matching_pattern_is_a_runtime_error() {
    assert!(eval_err("match (3) { 1 => 1, 2 => 2 }").contains("no pattern matched"));
}

#[test]
fn records_construct_and_access() {
    assert_eq!(
        eval("record Dog(name: String, age: Integer);\nDog(\"rex\", 3).age"),
        Value::Int(3)
    );
}

#[test]
fn record_field_mutation_aliases() {
    assert_eq!(
        eval(
            "record Counter(n: Integer);\n\
             let c = Counter(0); let d = c; d.n = 5; c.n"
        ),
        Value::Int(5)
    );
}

#[test]
fn option_constructors_in_prelude() {
    assert_eq!(repr(&eval("Some(3)")), "Some(3)");
    assert_eq!(repr(&eval("None")), "None");
    assert_eq!(
        eval("match (Some(3)) { Some(v) => v, None => 0 }"),
        Value::Int(3)
    );
    assert_eq!(
        eval("let o: Option<Integer> = None; match (o) { Some(v) => v, None => 0 }"),
        Value::Int(0)
    );
}

#[test]
fn active_patterns_dispatch_through_the_registry() {
    let src = "type Parity = Even(Integer) | Odd(Integer);\n\
               let (|Even|Odd|) = (n: Integer) -> Parity => {\n\
                 if n % 2 == 0: Even(n / 2) else: Odd(n);\n\
               };\n\
               match (10) { Even(half) => half, Odd(n) => 0 - n }";
    assert_eq!(eval(src), Value::Int(5));
}

// ---------------------------------------------------------------------------
// when
// ---------------------------------------------------------------------------

#[test]
fn when_with_subject_compares_and_tests() {
    let src = "let classify = (x: Integer) => when (x) {\n\
               | 1, 2 => \"low\",\n\
               | x > 10 => \"big\",\n\
               else => \"mid\"\n\
               };\n";
    assert_eq!(eval(&format!("{}classify(2)", src)), Value::Str("low".into()));
    assert_eq!(eval(&format!("{}classify(11)", src)), Value::Str("big".into()));
    assert_eq!(eval(&format!("{}classify(5)", src)), Value::Str("mid".into()));
}

#[test]
fn when_without_subject_is_a_condition_chain() {
    assert_eq!(
        eval("let a = 4; when { | a > 10 => \"big\", | a > 3 => \"some\", else => \"few\" }"),
        Value::Str("some".into())
    );
}

// ---------------------------------------------------------------------------
// Result propagation
// ---------------------------------------------------------------------------

const HALF: &str = "let half = (n: Integer) -> Result<Integer, String> => {\n\
                      if n % 2 == 0: Ok(n / 2) else: Err(\"odd\");\n\
                    };\n\
                    let twice = (n: Integer) -> Result<Integer, String> => {\n\
                      let h = half(n)?;\n\
                      Ok(h + h);\n\
                    };\n";

#[test]
fn try_unwraps_ok() {
    assert_eq!(
        eval(&format!(
            "{}match (twice(10)) {{ Ok(v) => v, Err(m) => 0 - len(m) }}",
            HALF
        )),
        Value::Int(10)
    );
}

#[test]
fn try_propagates_err_without_running_the_rest() {
    assert_eq!(
        repr(&eval(&format!("{}twice(7)", HALF))),
        "Err(\"odd\")"
    );
    // The statement after `?` must not execute on the Err path.
    let src = "let mut ran = 0;\n\
               let f = (n: Integer) -> Result<Integer, String> => {\n\
                 let v = Err(\"stop\")?;\n\
                 ran = 1;\n\
                 Ok(v);\n\
               };\n\
               f(1); ran";
    assert_eq!(eval(src), Value::Int(0));
}

#[test]
fn return_exits_the_function_early() {
    assert_eq!(
        eval(
            "let f = (n: Integer) -> Integer => {\n\
               if n > 0 { return n; }\n\
               0 - n;\n\
             };\n\
             f(5) + f(-4)"
        ),
        Value::Int(9)
    );
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[test]
fn trait_method_dispatch_binds_self() {
    assert_eq!(
        eval(
            "trait Greet { fn hello(self) -> String; }\n\
             record Dog(name: String);\n\
             impl Greet for Dog { fn hello(self) -> String => strFormat(\"woof, {?}\", self.name); }\n\
             Dog(\"rex\").hello()"
        ),
        Value::Str("woof, rex".into())
    );
}

#[test]
fn methods_take_arguments_after_self() {
    assert_eq!(
        eval(
            "trait Scale { fn by(self, k: Integer) -> Integer; }\n\
             record Box(n: Integer);\n\
             impl Scale for Box { fn by(self, k: Integer) -> Integer => self.n * k; }\n\
             Box(6).by(7)"
        ),
        Value::Int(42)
    );
}

#[test]
fn generic_function_dispatches_through_bounds() {
    assert_eq!(
        eval(
            "trait Greet { fn hello(self) -> String; }\n\
             record Dog(name: String);\n\
             impl Greet for Dog { fn hello(self) -> String => self.name; }\n\
             let greet = fn greet<T: Greet>(v: T) -> String { v.hello() };\n\
             greet(Dog(\"ada\"))"
        ),
        Value::Str("ada".into())
    );
}

// ---------------------------------------------------------------------------
// Pipes
// ---------------------------------------------------------------------------

#[test]
fn pipe_chaining() {
    assert_eq!(
        eval("let double = (x) => x * 2; [1, 2, 3] |> map(double) |> reduce(0, (a, b) => a + b)"),
        Value::Int(12)
    );
}

#[test]
fn pipe_into_literal() {
    assert_eq!(eval("5 |> (n) => n + 1"), Value::Int(6));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn evaluation_is_deterministic() {
    let src = "let h = {\"b\": 2, \"a\": 1};\n\
               let ks = reduce([\"x\", \"y\"], \"\", (acc, s) => acc + s);\n\
               strFormat(\"{?} {?}\", toString(h), ks)";
    let first = repr(&eval(src));
    for _ in 0..5 {
        assert_eq!(repr(&eval(src)), first);
    }
}

#[test]
fn if_without_else_yields_null() {
    assert_eq!(eval("if 1 > 2 { 3 }"), Value::Null);
}
