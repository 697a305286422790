/// Spec tests for the Lumen parser: precedence, statement forms, the
/// round-trip property, and best-effort error accumulation.
use lumen::ast::{Expr, LetTarget, Pattern, Stmt};
use lumen::parser::{parse, Parser};
use pretty_assertions::assert_eq;

fn parse_ok(src: &str) -> Vec<Stmt> {
    parse(src).expect("parse failed").statements
}

fn first_expr(src: &str) -> Expr {
    match parse_ok(src).into_iter().next().expect("no statements") {
        Stmt::Expr { expr, .. } => expr,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

/// The canonical printing of the first expression, parens marking grouping.
fn printed(src: &str) -> String {
    first_expr(src).to_string()
}

// ---------------------------------------------------------------------------
// Precedence
// ---------------------------------------------------------------------------

#[test]
fn product_binds_tighter_than_sum() {
    assert_eq!(printed("1 + 2 * 3"), "(1 + (2 * 3))");
    assert_eq!(printed("1 * 2 + 3"), "((1 * 2) + 3)");
}

#[test]
fn comparison_and_logic_layers() {
    assert_eq!(printed("a < b == c"), "((a < b) == c)");
    assert_eq!(printed("a && b || c"), "((a && b) || c)");
    assert_eq!(printed("!a && b"), "((!a) && b)");
    assert_eq!(printed("a == b && c == d"), "((a == b) && (c == d))");
}

#[test]
fn prefix_binds_tighter_than_product() {
    assert_eq!(printed("-a * b"), "((-a) * b)");
}

#[test]
fn call_index_member_chain() {
    assert_eq!(printed("f(1)[2].g"), "f(1)[2].g");
    assert_eq!(printed("a.b.c(d)"), "a.b.c(d)");
}

#[test]
fn try_is_postfix_and_tightest() {
    assert_eq!(printed("f(x)? + 1"), "(f(x)? + 1)");
}

#[test]
fn modulo_in_product_layer() {
    assert_eq!(printed("a % 2 == 0"), "((a % 2) == 0)");
}

// ---------------------------------------------------------------------------
// Pipe rewriting
// ---------------------------------------------------------------------------

#[test]
fn pipe_becomes_a_call() {
    assert_eq!(printed("x |> f"), "f(x)");
}

#[test]
fn pipe_into_call_prepends_the_argument() {
    assert_eq!(printed("x |> g(a, b)"), "g(x, a, b)");
}

#[test]
fn pipe_chains_left_to_right() {
    assert_eq!(printed("x |> f |> g"), "g(f(x))");
}

#[test]
fn pipe_into_function_literal_calls_it_directly() {
    let expr = first_expr("x |> (n) => n + 1");
    match expr {
        Expr::Call { callee, args, .. } => {
            assert!(matches!(*callee, Expr::Function(_)));
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected a call, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Lambdas and functions
// ---------------------------------------------------------------------------

#[test]
fn bare_identifier_lambda() {
    let expr = first_expr("x => x + 1");
    match expr {
        Expr::Function(lit) => {
            assert_eq!(lit.params.len(), 1);
            assert_eq!(lit.params[0].name, "x");
        }
        other => panic!("expected a function, got {:?}", other),
    }
}

#[test]
fn annotated_paren_lambda_with_return_type() {
    let expr = first_expr("(n: Integer) -> Result<Integer, String> => { Ok(n) }");
    match expr {
        Expr::Function(lit) => {
            assert!(lit.params[0].annotation.is_some());
            assert!(lit.return_type.is_some());
            assert!(matches!(*lit.body, Expr::Block { .. }));
        }
        other => panic!("expected a function, got {:?}", other),
    }
}

#[test]
fn named_fn_with_colon_body() {
    let expr = first_expr("fn double(x: Integer) -> Integer : x * 2");
    match expr {
        Expr::Function(lit) => {
            assert_eq!(lit.name.as_deref(), Some("double"));
        }
        other => panic!("expected a function, got {:?}", other),
    }
}

#[test]
fn generic_fn_with_bounds() {
    let expr = first_expr("fn show<T: Show>(v: T) -> String : v.show()");
    match expr {
        Expr::Function(lit) => {
            assert_eq!(lit.type_params[0].name, "T");
            assert_eq!(lit.type_params[0].bounds, vec!["Show".to_string()]);
        }
        other => panic!("expected a function, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[test]
fn let_forms() {
    let stmts = parse_ok(
        "let x = 1; let mut y: Integer = 2; let (a, b) = p; let [h, ...t] = xs; let (|Even|Odd|) = f;",
    );
    assert!(matches!(
        &stmts[0],
        Stmt::Let { mutable: false, target: LetTarget::Ident(n), .. } if n == "x"
    ));
    assert!(matches!(
        &stmts[1],
        Stmt::Let { mutable: true, annotation: Some(_), .. }
    ));
    assert!(matches!(&stmts[2], Stmt::Let { target: LetTarget::Tuple(_), .. }));
    assert!(matches!(
        &stmts[3],
        Stmt::Let { target: LetTarget::Array { rest: Some(_), .. }, .. }
    ));
    assert!(matches!(
        &stmts[4],
        Stmt::Let { target: LetTarget::ActivePattern(cases), .. } if cases.len() == 2
    ));
}

#[test]
fn annotation_on_destructuring_is_an_error() {
    assert!(parse("let (a, b): Integer = p;").is_err());
}

#[test]
fn type_record_trait_impl_declarations() {
    let stmts = parse_ok(
        "type Shape<T> = Square(T) | Dot;\n\
         record Pair<A, B>(left: A, right: B);\n\
         trait Greet { fn hello(self) -> String; }\n\
         impl Greet for Pair { fn hello(self) -> String => \"hi\"; }",
    );
    assert!(matches!(&stmts[0], Stmt::TypeDecl { variants, .. } if variants.len() == 2));
    assert!(matches!(&stmts[1], Stmt::RecordDecl { fields, .. } if fields.len() == 2));
    assert!(matches!(&stmts[2], Stmt::TraitDecl { methods, .. } if methods.len() == 1));
    assert!(matches!(&stmts[3], Stmt::Impl(decl) if decl.methods.len() == 1));
}

#[test]
fn module_and_use_forms() {
    let stmts = parse_ok(
        "module geometry exposing (area, Shape);\n\
         use net.http as web;\n\
         use geometry exposing (area);\n\
         use math;",
    );
    assert!(matches!(
        &stmts[0],
        Stmt::ModuleDecl { exposing: Some(names), .. } if names.len() == 2
    ));
    assert!(matches!(
        &stmts[1],
        Stmt::Use { path, alias: Some(a), .. } if path.len() == 2 && a == "web"
    ));
    assert!(matches!(&stmts[2], Stmt::Use { exposing: Some(_), .. }));
    assert!(matches!(&stmts[3], Stmt::Use { alias: None, exposing: None, .. }));
}

#[test]
fn semicolons_are_optional() {
    assert_eq!(parse_ok("let x = 1\nlet y = 2").len(), 2);
}

// ---------------------------------------------------------------------------
// Grouping, collections, match, when
// ---------------------------------------------------------------------------

#[test]
fn grouping_unit_single_and_tuple() {
    assert!(matches!(first_expr("()"), Expr::Tuple { elements, .. } if elements.is_empty()));
    assert_eq!(printed("(1 + 2)"), "(1 + 2)");
    assert!(matches!(first_expr("(1, 2, 3)"), Expr::Tuple { elements, .. } if elements.len() == 3));
}

#[test]
fn array_and_hash_literals() {
    assert!(matches!(first_expr("[1, 2, 3]"), Expr::Array { elements, .. } if elements.len() == 3));
    assert!(matches!(first_expr("{\"a\": 1, \"b\": 2}"), Expr::Hash { pairs, .. } if pairs.len() == 2));
    assert!(matches!(first_expr("{}"), Expr::Hash { pairs, .. } if pairs.is_empty()));
}

#[test]
fn match_with_pattern_kinds() {
    let expr = first_expr(
        "match (s) { Square(n) => n, [a, ...rest] => a, (x, y) => x, \"lit\" => 0, _ => 1 }",
    );
    match expr {
        Expr::Match { arms, .. } => {
            assert_eq!(arms.len(), 5);
            assert!(matches!(&arms[0].pattern, Pattern::Variant { bindings, .. } if bindings.len() == 1));
            assert!(matches!(&arms[1].pattern, Pattern::Array { rest: Some(_), .. }));
            assert!(matches!(&arms[2].pattern, Pattern::Tuple { .. }));
            assert!(matches!(&arms[3].pattern, Pattern::Str { .. }));
            assert!(matches!(&arms[4].pattern, Pattern::Wildcard { .. }));
        }
        other => panic!("expected a match, got {:?}", other),
    }
}

#[test]
fn multi_scrutinee_match_is_a_tuple() {
    let expr = first_expr("match (a, b) { (x, y) => x, _ => 0 }");
    match expr {
        Expr::Match { scrutinee, .. } => assert!(matches!(*scrutinee, Expr::Tuple { .. })),
        other => panic!("expected a match, got {:?}", other),
    }
}

#[test]
fn when_with_and_without_subject() {
    let expr = first_expr("when (x) { | 1, 2 => \"low\", | x > 10 => \"big\", else => \"mid\" }");
    match expr {
        Expr::When { subject, branches, .. } => {
            assert!(subject.is_some());
            assert_eq!(branches.len(), 2);
            assert_eq!(branches[0].conditions.len(), 2);
        }
        other => panic!("expected a when, got {:?}", other),
    }
    let expr = first_expr("when { | a > b => a, else => b }");
    assert!(matches!(expr, Expr::When { subject: None, .. }));
}

#[test]
fn when_requires_else() {
    assert!(parse("when (x) { | 1 => 2 }").is_err());
}

#[test]
fn if_colon_and_block_forms() {
    assert!(matches!(
        first_expr("if x > 0: 1 else: 2"),
        Expr::If { alternative: Some(_), .. }
    ));
    assert!(matches!(
        first_expr("if x { 1 } else if y { 2 } else { 3 }"),
        Expr::If { .. }
    ));
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn printed_programs_reparse_cleanly() {
    let sources = [
        "let x = 1 + 2 * 3;",
        "let mut total = 0; total += 5; total;",
        "let f = (a, b) => a + b; f(1, 2);",
        "type Shape = Square(Integer) | Circle(Integer);",
        "record Dog(name: String, age: Integer);",
        "trait Greet { fn hello(self) -> String; }",
        "impl Greet for Dog { fn hello(self) -> String => \"woof\"; }",
        "let area = (s) => match (s) { Square(n) => n * n, Circle(r) => 3 * r * r };",
        "when (x) { | 1 => \"one\", else => \"many\" };",
        "if x > 0 { writeln(x); } else { writeln(0 - x); }",
        "use geometry as geo exposing (area);",
        "module main exposing (run);",
        "let h = {\"a\": 1}; h[\"a\"] = 2;",
        "let p = (1, \"two\", true);",
        "fn half(n: Integer) -> Result<Integer, String> { Ok(n / 2); }",
        "let r = half(10)?;",
    ];
    for src in sources {
        let program = parse(src).unwrap_or_else(|e| panic!("seed parse failed for {:?}: {:?}", src, e));
        let printed = program.to_string();
        let reparsed = lumen::parser::parse(&printed)
            .unwrap_or_else(|e| panic!("reparse failed for {:?}: {:?}", printed, e));
        // Printing is canonical: printing the reparse is a fixpoint.
        assert_eq!(printed, reparsed.to_string(), "not a fixpoint for {:?}", src);
    }
}

// ---------------------------------------------------------------------------
// Error accumulation
// ---------------------------------------------------------------------------

#[test]
fn errors_accumulate_and_parsing_continues() {
    let mut parser = Parser::from_source("let = 1; let ok = 2; ] let fine = 3;");
    let program = parser.parse_program();
    assert!(parser.errors().len() >= 2);
    // The well-formed statements in between still parse.
    assert!(program
        .statements
        .iter()
        .any(|s| matches!(s, Stmt::Let { target: LetTarget::Ident(n), .. } if n == "ok")));
}

#[test]
fn illegal_character_surfaces_as_parse_error() {
    assert!(parse("let x = @;").is_err());
}
