/// Spec tests for the Lumen lexer: token kinds, positions, and the
/// never-fails contract.
use lumen::lexer::{Lexer, Token, TokenKind};

fn lex(src: &str) -> Vec<Token> {
    Lexer::new(src).tokenize()
}

fn kinds(src: &str) -> Vec<TokenKind> {
    lex(src).into_iter().map(|t| t.kind).collect()
}

// ---------------------------------------------------------------------------
// Token kinds
// ---------------------------------------------------------------------------

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        kinds("let mut x fn type record trait impl match when use as"),
        vec![
            TokenKind::Let,
            TokenKind::Mut,
            TokenKind::Ident,
            TokenKind::Fn,
            TokenKind::Type,
            TokenKind::Record,
            TokenKind::Trait,
            TokenKind::Impl,
            TokenKind::Match,
            TokenKind::When,
            TokenKind::Use,
            TokenKind::As,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn underscore_starts_an_identifier() {
    let toks = lex("_tmp _ x_1");
    assert_eq!(toks[0].kind, TokenKind::Ident);
    assert_eq!(toks[0].literal, "_tmp");
    assert_eq!(toks[1].literal, "_");
    assert_eq!(toks[2].literal, "x_1");
}

#[test]
fn booleans_are_keywords() {
    assert_eq!(
        kinds("true false"),
        vec![TokenKind::True, TokenKind::False, TokenKind::Eof]
    );
}

#[test]
fn double_requires_digit_after_dot() {
    // `1.foo` is member access on an integer, not a malformed double.
    assert_eq!(
        kinds("1.foo"),
        vec![
            TokenKind::Int,
            TokenKind::Dot,
            TokenKind::Ident,
            TokenKind::Eof
        ]
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("1 // to end of line\n2 /* block\nspanning */ 3"),
        vec![
            TokenKind::Int,
            TokenKind::Int,
            TokenKind::Int,
            TokenKind::Eof
        ]
    );
}

#[test]
fn nonbreaking_space_is_whitespace() {
    assert_eq!(
        kinds("1\u{a0}2"),
        vec![TokenKind::Int, TokenKind::Int, TokenKind::Eof]
    );
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[test]
fn columns_monotonic_within_line_and_reset_after_newline() {
    let src = "let x = 1 + 2\nlet longer = \"abc\"\n  x";
    let toks = lex(src);
    let mut line = 1;
    let mut col = 0;
    for tok in &toks {
        if tok.kind == TokenKind::Eof {
            break;
        }
        if tok.line == line {
            assert!(
                tok.column > col,
                "column went backwards at {:?} ({}:{})",
                tok.literal,
                tok.line,
                tok.column
            );
        } else {
            assert!(tok.line > line, "line went backwards at {:?}", tok.literal);
            line = tok.line;
            col = 0;
        }
        col = tok.column;
    }
    // The indented token on line 3 starts past column 1.
    let last = toks.iter().rev().find(|t| t.kind == TokenKind::Ident).unwrap();
    assert_eq!((last.line, last.column), (3, 3));
}

#[test]
fn multiline_string_advances_lines() {
    let toks = lex("\"\"\"a\nb\"\"\" x");
    assert_eq!(toks[0].kind, TokenKind::Str);
    assert_eq!(toks[1].line, 2);
}

// ---------------------------------------------------------------------------
// Never fails
// ---------------------------------------------------------------------------

#[test]
fn illegal_tokens_do_not_stop_the_stream() {
    let toks = lex("let @ # x");
    let illegal: Vec<&Token> = toks.iter().filter(|t| t.kind == TokenKind::Illegal).collect();
    assert_eq!(illegal.len(), 2);
    assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
}

#[test]
fn unterminated_string_reaches_eof() {
    let toks = lex("\"oops");
    assert_eq!(toks[0].kind, TokenKind::Str);
    assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
}

// ---------------------------------------------------------------------------
// Re-lexing printed programs
// ---------------------------------------------------------------------------

#[test]
fn relexing_printed_source_preserves_kinds() {
    // Canonical printing rewrites sugar (`=>` lambdas become `fn` forms), so
    // the corpus here sticks to forms the printer preserves.
    let sources = [
        "let x = 1 + 2 * 3;",
        "type Shape = Square(Integer) | Circle(Integer);",
        "let mut total = 0;",
        "match (x) { Square(n) => n, _ => 0 }",
    ];
    for src in sources {
        let program = lumen::parser::parse(src).expect("parse failed");
        let printed = program.to_string();
        let original: Vec<TokenKind> = kinds(src)
            .into_iter()
            .filter(|k| *k != TokenKind::Semicolon)
            .collect();
        let reprinted: Vec<TokenKind> = kinds(&printed)
            .into_iter()
            .filter(|k| !matches!(k, TokenKind::Semicolon | TokenKind::LParen | TokenKind::RParen))
            .collect();
        // Printing adds grouping parens; compare the paren-free projection.
        let original: Vec<TokenKind> = original
            .into_iter()
            .filter(|k| !matches!(k, TokenKind::LParen | TokenKind::RParen))
            .collect();
        assert_eq!(original, reprinted, "kind drift for {:?}", src);
    }
}
