/// Lumen lexer.
///
/// Converts source text into a stream of tagged tokens with 1-based
/// line/column positions. The lexer never fails: unrecognized characters
/// become `TokenKind::Illegal` tokens that surface as parse errors
/// downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int,
    Double,
    Str,
    /// Backtick-delimited interpolated string; parts carry (is_expr, text).
    InterpStr(Vec<(bool, String)>),
    Ident,
    // Keywords
    Fn,
    Let,
    Mut,
    Type,
    Record,
    Trait,
    Impl,
    For,
    If,
    Else,
    Match,
    When,
    Return,
    Module,
    Exposing,
    Use,
    As,
    True,
    False,
    // Operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    Eq,        // ==
    Neq,       // !=
    Lt,        // <
    Gt,        // >
    Lte,       // <=
    Gte,       // >=
    And,       // &&
    Or,        // ||
    Bang,      // !
    Assign,    // =
    PlusEq,    // +=
    Arrow,     // ->
    FatArrow,  // =>
    PipeOp,    // |>
    Bar,       // |
    Amp,       // &
    Question,  // ?
    Dot,       // .
    Ellipsis,  // ...
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    // Structure
    Illegal,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn eof(line: usize, column: usize) -> Self {
        Token {
            kind: TokenKind::Eof,
            literal: String::new(),
            line,
            column,
        }
    }
}

fn keyword(s: &str) -> Option<TokenKind> {
    match s {
        "fn" => Some(TokenKind::Fn),
        "let" => Some(TokenKind::Let),
        "mut" => Some(TokenKind::Mut),
        "type" => Some(TokenKind::Type),
        "record" => Some(TokenKind::Record),
        "trait" => Some(TokenKind::Trait),
        "impl" => Some(TokenKind::Impl),
        "for" => Some(TokenKind::For),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "match" => Some(TokenKind::Match),
        "when" => Some(TokenKind::When),
        "return" => Some(TokenKind::Return),
        "module" => Some(TokenKind::Module),
        "exposing" => Some(TokenKind::Exposing),
        "use" => Some(TokenKind::Use),
        "as" => Some(TokenKind::As),
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        _ => None,
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Lex the entire buffer. The final token is always `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        tokens
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.current() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') | Some('\u{a0}') => {
                    self.advance();
                }
                Some('/') if self.peek(1) == Some('/') => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    while let Some(c) = self.current() {
                        if c == '*' && self.peek(1) == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let line = self.line;
        let column = self.column;

        let ch = match self.current() {
            Some(c) => c,
            None => return Token::eof(line, column),
        };

        if ch.is_ascii_digit() {
            return self.scan_number(line, column);
        }
        if ch.is_alphabetic() || ch == '_' {
            return self.scan_identifier(line, column);
        }
        if ch == '"' {
            return self.scan_string(line, column);
        }
        if ch == '`' {
            return self.scan_interp_string(line, column);
        }

        self.scan_operator(line, column)
    }

    fn scan_number(&mut self, line: usize, column: usize) -> Token {
        let mut literal = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                literal.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if self.current() == Some('.') && self.peek(1).map_or(false, |c| c.is_ascii_digit()) {
            literal.push('.');
            self.advance();
            while let Some(c) = self.current() {
                if c.is_ascii_digit() {
                    literal.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return Token {
                kind: TokenKind::Double,
                literal,
                line,
                column,
            };
        }

        Token {
            kind: TokenKind::Int,
            literal,
            line,
            column,
        }
    }

    fn scan_identifier(&mut self, line: usize, column: usize) -> Token {
        let mut literal = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                literal.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = keyword(&literal).unwrap_or(TokenKind::Ident);
        Token {
            kind,
            literal,
            line,
            column,
        }
    }

    fn scan_string(&mut self, line: usize, column: usize) -> Token {
        // Triple-quoted: raw content, newlines preserved.
        if self.peek(1) == Some('"') && self.peek(2) == Some('"') {
            self.advance();
            self.advance();
            self.advance();
            let mut literal = String::new();
            loop {
                match self.current() {
                    None => break,
                    Some('"') if self.peek(1) == Some('"') && self.peek(2) == Some('"') => {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    Some(c) => {
                        literal.push(c);
                        self.advance();
                    }
                }
            }
            return Token {
                kind: TokenKind::Str,
                literal,
                line,
                column,
            };
        }

        self.advance(); // opening "
        let mut literal = String::new();
        loop {
            match self.current() {
                None | Some('\n') => break, // unterminated: surfaces at the parser
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => literal.push('\n'),
                        Some('t') => literal.push('\t'),
                        Some('r') => literal.push('\r'),
                        Some('"') => literal.push('"'),
                        Some('\\') => literal.push('\\'),
                        // Unknown escape passes through literally.
                        Some(c) => {
                            literal.push('\\');
                            literal.push(c);
                        }
                        None => break,
                    }
                }
                Some(c) => {
                    literal.push(c);
                    self.advance();
                }
            }
        }
        Token {
            kind: TokenKind::Str,
            literal,
            line,
            column,
        }
    }

    /// Backtick strings: literal text with `{expr}` splices. The raw splice
    /// text is captured here; the parser sub-parses it into expressions.
    fn scan_interp_string(&mut self, line: usize, column: usize) -> Token {
        self.advance(); // opening `
        let mut parts: Vec<(bool, String)> = Vec::new();
        let mut current = String::new();
        let mut raw = String::new();

        loop {
            match self.current() {
                None => break,
                Some('`') => {
                    self.advance();
                    break;
                }
                Some('{') => {
                    raw.push('{');
                    if !current.is_empty() {
                        parts.push((false, std::mem::take(&mut current)));
                    }
                    self.advance();
                    let mut expr_text = String::new();
                    let mut depth = 1usize;
                    while let Some(c) = self.current() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    self.advance();
                                    break;
                                }
                            }
                            _ => {}
                        }
                        expr_text.push(c);
                        self.advance();
                    }
                    raw.push_str(&expr_text);
                    raw.push('}');
                    parts.push((true, expr_text));
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => current.push('\n'),
                        Some('t') => current.push('\t'),
                        Some('`') => current.push('`'),
                        Some('\\') => current.push('\\'),
                        Some(c) => {
                            current.push('\\');
                            current.push(c);
                        }
                        None => break,
                    }
                }
                Some(c) => {
                    current.push(c);
                    raw.push(c);
                    self.advance();
                }
            }
        }
        if !current.is_empty() {
            parts.push((false, current));
        }

        Token {
            kind: TokenKind::InterpStr(parts),
            literal: raw,
            line,
            column,
        }
    }

    fn scan_operator(&mut self, line: usize, column: usize) -> Token {
        let ch = self.advance().unwrap();
        let mut literal = ch.to_string();

        let mut two = |lexer: &mut Lexer, second: char, kind: TokenKind, lit: &mut String| {
            if lexer.current() == Some(second) {
                lit.push(second);
                lexer.advance();
                Some(kind)
            } else {
                None
            }
        };

        let kind = match ch {
            '.' => {
                if self.current() == Some('.') && self.peek(1) == Some('.') {
                    self.advance();
                    self.advance();
                    literal = "...".to_string();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }
            '=' => two(self, '=', TokenKind::Eq, &mut literal)
                .or_else(|| two(self, '>', TokenKind::FatArrow, &mut literal))
                .unwrap_or(TokenKind::Assign),
            '!' => two(self, '=', TokenKind::Neq, &mut literal).unwrap_or(TokenKind::Bang),
            '<' => two(self, '=', TokenKind::Lte, &mut literal).unwrap_or(TokenKind::Lt),
            '>' => two(self, '=', TokenKind::Gte, &mut literal).unwrap_or(TokenKind::Gt),
            '&' => two(self, '&', TokenKind::And, &mut literal).unwrap_or(TokenKind::Amp),
            '|' => two(self, '|', TokenKind::Or, &mut literal)
                .or_else(|| two(self, '>', TokenKind::PipeOp, &mut literal))
                .unwrap_or(TokenKind::Bar),
            '-' => two(self, '>', TokenKind::Arrow, &mut literal).unwrap_or(TokenKind::Minus),
            '+' => two(self, '=', TokenKind::PlusEq, &mut literal).unwrap_or(TokenKind::Plus),
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '?' => TokenKind::Question,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            _ => TokenKind::Illegal,
        };

        Token {
            kind,
            literal,
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_operators_longest_first() {
        assert_eq!(
            kinds("... == != <= >= && || -> |> => += |"),
            vec![
                TokenKind::Ellipsis,
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Lte,
                TokenKind::Gte,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Arrow,
                TokenKind::PipeOp,
                TokenKind::FatArrow,
                TokenKind::PlusEq,
                TokenKind::Bar,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        let toks = Lexer::new("42 3.14 7.").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Int);
        assert_eq!(toks[0].literal, "42");
        assert_eq!(toks[1].kind, TokenKind::Double);
        assert_eq!(toks[1].literal, "3.14");
        // `7.` is an Int followed by a Dot — the dot needs a digit after it.
        assert_eq!(toks[2].kind, TokenKind::Int);
        assert_eq!(toks[3].kind, TokenKind::Dot);
    }

    #[test]
    fn lexes_string_escapes() {
        let toks = Lexer::new(r#""a\nb\t\"q\" \x""#).tokenize();
        assert_eq!(toks[0].literal, "a\nb\t\"q\" \\x");
    }

    #[test]
    fn lexes_triple_quoted() {
        let toks = Lexer::new("\"\"\"line1\nline2\"\"\"").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].literal, "line1\nline2");
    }

    #[test]
    fn interp_string_parts() {
        let toks = Lexer::new("`x = {x + 1}!`").tokenize();
        match &toks[0].kind {
            TokenKind::InterpStr(parts) => {
                assert_eq!(parts[0], (false, "x = ".to_string()));
                assert_eq!(parts[1], (true, "x + 1".to_string()));
                assert_eq!(parts[2], (false, "!".to_string()));
            }
            other => panic!("expected InterpStr, got {:?}", other),
        }
    }

    #[test]
    fn plain_strings_do_not_interpolate() {
        let toks = Lexer::new(r#""woof, {?}""#).tokenize();
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].literal, "woof, {?}");
    }

    #[test]
    fn tracks_line_and_column() {
        let toks = Lexer::new("let x = 1\nlet y = 2").tokenize();
        assert_eq!((toks[0].line, toks[0].column), (1, 1));
        assert_eq!((toks[1].line, toks[1].column), (1, 5));
        assert_eq!((toks[4].line, toks[4].column), (2, 1));
        assert_eq!((toks[5].line, toks[5].column), (2, 5));
    }

    #[test]
    fn illegal_character_does_not_stop_lexing() {
        let toks = Lexer::new("a @ b").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Ident);
        assert_eq!(toks[1].kind, TokenKind::Illegal);
        assert_eq!(toks[2].kind, TokenKind::Ident);
    }

    #[test]
    fn skips_block_comments() {
        assert_eq!(
            kinds("1 /* skip /* not nested */ 2"),
            vec![TokenKind::Int, TokenKind::Int, TokenKind::Eof]
        );
    }
}
