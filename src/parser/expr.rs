use super::{token_prec, ParseError, Parser, Prec};
use crate::ast::{Expr, FunctionLit, MatchArm, Param, StrPart, WhenBranch};
use crate::lexer::{Token, TokenKind};

impl Parser {
    pub(super) fn parse_expr(&mut self, min_prec: Prec) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let prec = token_prec(&self.current().kind);
            if prec <= min_prec {
                break;
            }
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    // -----------------------------------------------------------------------
    // Prefix position
    // -----------------------------------------------------------------------

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Int => {
                let token = self.advance();
                let value = token.literal.parse::<i64>().map_err(|_| ParseError {
                    message: format!("integer literal '{}' is out of range", token.literal),
                    line: token.line,
                    column: token.column,
                })?;
                Ok(Expr::Int { token, value })
            }
            TokenKind::Double => {
                let token = self.advance();
                let value = token.literal.parse::<f64>().map_err(|_| ParseError {
                    message: format!("invalid double literal '{}'", token.literal),
                    line: token.line,
                    column: token.column,
                })?;
                Ok(Expr::Double { token, value })
            }
            TokenKind::Str => {
                let token = self.advance();
                let value = token.literal.clone();
                Ok(Expr::Str { token, value })
            }
            TokenKind::InterpStr(parts) => {
                let token = self.advance();
                let parts = self.parse_interp_parts(&token, parts)?;
                Ok(Expr::InterpStr { token, parts })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                let value = token.kind == TokenKind::True;
                Ok(Expr::Bool { token, value })
            }
            TokenKind::Ident => {
                let token = self.advance();
                let name = token.literal.clone();
                Ok(Expr::Ident { token, name })
            }
            TokenKind::Minus | TokenKind::Bang => {
                let token = self.advance();
                let op = token.literal.clone();
                let operand = self.parse_expr(Prec::Prefix)?;
                Ok(Expr::Prefix {
                    token,
                    op,
                    operand: Box::new(operand),
                })
            }
            TokenKind::LParen => self.parse_grouped(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            TokenKind::If => self.parse_if(),
            TokenKind::Match => self.parse_match(),
            TokenKind::When => self.parse_when(),
            TokenKind::Fn => Ok(Expr::Function(self.parse_function_literal()?)),
            _ => Err(self.error_here(format!(
                "unexpected '{}' in expression position",
                self.describe_current()
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Infix position
    // -----------------------------------------------------------------------

    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ParseError> {
        match self.current().kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Eq
            | TokenKind::Neq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Lte
            | TokenKind::Gte
            | TokenKind::And
            | TokenKind::Or => {
                let token = self.advance();
                let op = token.literal.clone();
                let prec = token_prec(&token.kind);
                let right = self.parse_expr(prec)?;
                Ok(Expr::Infix {
                    token,
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            TokenKind::Assign | TokenKind::PlusEq => {
                let token = self.advance();
                let op = token.literal.clone();
                // Right-associative: `a = b = c` groups as `a = (b = c)`.
                let value = self.parse_expr(Prec::Pipe)?;
                Ok(Expr::Assign {
                    token,
                    op,
                    target: Box::new(left),
                    value: Box::new(value),
                })
            }
            TokenKind::FatArrow => self.parse_arrow_lambda(left),
            TokenKind::PipeOp => self.parse_pipe(left),
            TokenKind::Question => {
                let token = self.advance();
                Ok(Expr::Try {
                    token,
                    operand: Box::new(left),
                })
            }
            TokenKind::LParen => {
                let token = self.advance();
                let args = self.parse_call_args()?;
                Ok(Expr::Call {
                    token,
                    callee: Box::new(left),
                    args,
                })
            }
            TokenKind::LBracket => {
                let token = self.advance();
                let index = self.parse_expr(Prec::Lowest)?;
                self.expect(&TokenKind::RBracket, "']' closing the index")?;
                Ok(Expr::Index {
                    token,
                    object: Box::new(left),
                    index: Box::new(index),
                })
            }
            TokenKind::Dot => {
                let token = self.advance();
                let property = self.expect_ident("a member name after '.'")?.literal;
                Ok(Expr::Member {
                    token,
                    object: Box::new(left),
                    property,
                })
            }
            _ => Err(self.error_here(format!(
                "'{}' cannot be used as an infix operator",
                self.describe_current()
            ))),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr(Prec::Lowest)?);
            while self.eat(&TokenKind::Comma) {
                args.push(self.parse_expr(Prec::Lowest)?);
            }
        }
        self.expect(&TokenKind::RParen, "')' closing the argument list")?;
        Ok(args)
    }

    /// `x |> f` desugars to `f(x)`; `x |> g(a)` to `g(x, a)`. A function
    /// literal on the right becomes a direct call on the literal.
    fn parse_pipe(&mut self, left: Expr) -> Result<Expr, ParseError> {
        let token = self.advance();
        let right = self.parse_expr(Prec::Pipe)?;
        Ok(match right {
            Expr::Call {
                token: call_token,
                callee,
                mut args,
            } => {
                args.insert(0, left);
                Expr::Call {
                    token: call_token,
                    callee,
                    args,
                }
            }
            other => Expr::Call {
                token,
                callee: Box::new(other),
                args: vec![left],
            },
        })
    }

    /// `x => body` where the left side is an identifier (parenthesized lists
    /// are handled by `parse_grouped`).
    fn parse_arrow_lambda(&mut self, left: Expr) -> Result<Expr, ParseError> {
        let token = self.advance();
        let params = match &left {
            Expr::Ident { token, name } => vec![Param {
                token: token.clone(),
                name: name.clone(),
                annotation: None,
            }],
            Expr::Tuple { elements, .. } => {
                let mut params = Vec::new();
                for el in elements {
                    match el {
                        Expr::Ident { token, name } => params.push(Param {
                            token: token.clone(),
                            name: name.clone(),
                            annotation: None,
                        }),
                        _ => {
                            return Err(self.error_here(
                                "the left side of '=>' must be an identifier or a list of identifiers"
                                    .into(),
                            ))
                        }
                    }
                }
                params
            }
            _ => {
                return Err(self.error_here(
                    "the left side of '=>' must be an identifier or a list of identifiers".into(),
                ))
            }
        };
        let body = self.parse_lambda_body()?;
        Ok(Expr::Function(FunctionLit {
            token,
            name: None,
            type_params: Vec::new(),
            params,
            return_type: None,
            body: Box::new(body),
        }))
    }

    fn parse_lambda_body(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LBrace) {
            self.parse_block()
        } else {
            self.parse_expr(Prec::Lowest)
        }
    }

    /// `(` — unit tuple, grouped expression, tuple literal, or a lambda
    /// parameter list when the matching `)` is followed by `=>` or `->`.
    fn parse_grouped(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        if self.looks_like_lambda_params() {
            return self.parse_paren_lambda();
        }
        self.advance(); // (

        if self.eat(&TokenKind::RParen) {
            return Ok(Expr::Tuple {
                token,
                elements: Vec::new(),
            });
        }

        let first = self.parse_expr(Prec::Lowest)?;
        if self.eat(&TokenKind::Comma) {
            let mut elements = vec![first];
            if !self.check(&TokenKind::RParen) {
                elements.push(self.parse_expr(Prec::Lowest)?);
                while self.eat(&TokenKind::Comma) {
                    elements.push(self.parse_expr(Prec::Lowest)?);
                }
            }
            self.expect(&TokenKind::RParen, "')' closing the tuple")?;
            Ok(Expr::Tuple { token, elements })
        } else {
            self.expect(&TokenKind::RParen, "')' closing the grouping")?;
            Ok(first)
        }
    }

    /// Scan ahead from a `(`: if the matching `)` is directly followed by
    /// `=>` or `->`, the parenthesized run is a lambda parameter list.
    fn looks_like_lambda_params(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 0usize;
        loop {
            let tok = self.peek(offset);
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        let next = &self.peek(offset + 1).kind;
                        return matches!(next, TokenKind::FatArrow | TokenKind::Arrow);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    /// `(a, b: T) [-> R] => body`
    fn parse_paren_lambda(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance(); // (
        let params = self.parse_param_list()?;
        let return_type = if self.eat(&TokenKind::Arrow) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        self.expect(&TokenKind::FatArrow, "'=>' before the lambda body")?;
        let body = self.parse_lambda_body()?;
        Ok(Expr::Function(FunctionLit {
            token,
            name: None,
            type_params: Vec::new(),
            params,
            return_type,
            body: Box::new(body),
        }))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let mut elements = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_expr(Prec::Lowest)?);
            while self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_expr(Prec::Lowest)?);
            }
        }
        self.expect(&TokenKind::RBracket, "']' closing the array literal")?;
        Ok(Expr::Array { token, elements })
    }

    /// `{ key: value, ... }`. Keys parse at `Annotate` precedence so the
    /// colon stays a separator.
    fn parse_hash_literal(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_expr(Prec::Annotate)?;
            self.expect(&TokenKind::Colon, "':' between hash key and value")?;
            let value = self.parse_expr(Prec::Lowest)?;
            pairs.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}' closing the hash literal")?;
        Ok(Expr::Hash { token, pairs })
    }

    pub(super) fn parse_block(&mut self) -> Result<Expr, ParseError> {
        let token = self.expect(&TokenKind::LBrace, "'{' opening a block")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace, "'}' closing the block")?;
        Ok(Expr::Block { token, statements })
    }

    /// `if cond { .. } else { .. }`, with `: expr` single-expression bodies
    /// and `else if` chains.
    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        // The condition stops below `Annotate` so the `:` of the
        // single-expression form stays a delimiter.
        let condition = self.parse_expr(Prec::Annotate)?;

        let consequence = if self.check(&TokenKind::LBrace) {
            self.parse_block()?
        } else {
            self.expect(&TokenKind::Colon, "'{' or ':' after the if condition")?;
            self.parse_expr(Prec::Lowest)?
        };

        let alternative = if self.eat(&TokenKind::Else) {
            Some(Box::new(if self.check(&TokenKind::If) {
                self.parse_if()?
            } else if self.check(&TokenKind::LBrace) {
                self.parse_block()?
            } else {
                self.expect(&TokenKind::Colon, "'{', ':' or 'if' after 'else'")?;
                self.parse_expr(Prec::Lowest)?
            }))
        } else {
            None
        };

        Ok(Expr::If {
            token,
            condition: Box::new(condition),
            consequence: Box::new(consequence),
            alternative,
        })
    }

    /// `match (scrutinee) { pattern => body, ... }`. A comma-separated
    /// scrutinee list is the ordinary tuple grouping.
    fn parse_match(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        self.expect(&TokenKind::LParen, "'(' after 'match'")?;
        let scrutinee_token = self.current().clone();
        let mut scrutinees = vec![self.parse_expr(Prec::Lowest)?];
        while self.eat(&TokenKind::Comma) {
            scrutinees.push(self.parse_expr(Prec::Lowest)?);
        }
        self.expect(&TokenKind::RParen, "')' after the match scrutinee")?;
        let scrutinee = if scrutinees.len() == 1 {
            scrutinees.pop().unwrap()
        } else {
            Expr::Tuple {
                token: scrutinee_token,
                elements: scrutinees,
            }
        };

        self.expect(&TokenKind::LBrace, "'{' opening the match arms")?;
        let mut arms = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let arm_token = self.current().clone();
            let pattern = self.parse_pattern()?;
            self.expect(&TokenKind::FatArrow, "'=>' after the match pattern")?;
            let body = if self.check(&TokenKind::LBrace) {
                self.parse_block()?
            } else {
                self.parse_expr(Prec::Lowest)?
            };
            arms.push(MatchArm {
                token: arm_token,
                pattern,
                body,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}' closing the match arms")?;

        Ok(Expr::Match {
            token,
            scrutinee: Box::new(scrutinee),
            arms,
        })
    }

    /// `when [(subject)] { | c1, c2 => body, | c3 => body, else => body }`
    fn parse_when(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let subject = if self.check(&TokenKind::LParen) {
            self.advance();
            let s = self.parse_expr(Prec::Lowest)?;
            self.expect(&TokenKind::RParen, "')' after the when subject")?;
            Some(Box::new(s))
        } else {
            None
        };

        self.expect(&TokenKind::LBrace, "'{' opening the when branches")?;
        let mut branches = Vec::new();
        let mut else_body = None;
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            if self.eat(&TokenKind::Else) {
                self.expect(&TokenKind::FatArrow, "'=>' after 'else'")?;
                let body = if self.check(&TokenKind::LBrace) {
                    self.parse_block()?
                } else {
                    self.parse_expr(Prec::Lowest)?
                };
                else_body = Some(body);
                self.eat(&TokenKind::Comma);
                continue;
            }
            let branch_token = self.expect(&TokenKind::Bar, "'|' opening a when branch")?;
            // Conditions parse below `=>` so the arrow stays a separator.
            let mut conditions = vec![self.parse_expr(Prec::Assign)?];
            while self.eat(&TokenKind::Comma) {
                conditions.push(self.parse_expr(Prec::Assign)?);
            }
            self.expect(&TokenKind::FatArrow, "'=>' after the when conditions")?;
            let body = if self.check(&TokenKind::LBrace) {
                self.parse_block()?
            } else {
                self.parse_expr(Prec::Lowest)?
            };
            branches.push(WhenBranch {
                token: branch_token,
                conditions,
                body,
            });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RBrace, "'}' closing the when branches")?;

        let else_body = else_body
            .ok_or_else(|| self.error_here("a when expression requires an 'else' branch".into()))?;

        Ok(Expr::When {
            token,
            subject,
            branches,
            else_body: Box::new(else_body),
        })
    }

    /// Sub-parse the expression splices captured by the lexer inside a
    /// backtick string.
    fn parse_interp_parts(
        &mut self,
        token: &Token,
        raw: Vec<(bool, String)>,
    ) -> Result<Vec<StrPart>, ParseError> {
        let mut parts = Vec::new();
        for (is_expr, text) in raw {
            if !is_expr {
                parts.push(StrPart::Literal(text));
                continue;
            }
            let mut sub = Parser::from_source(&text);
            let expr = sub.parse_expr(Prec::Lowest).map_err(|e| ParseError {
                message: format!("in string interpolation: {}", e.message),
                line: token.line,
                column: token.column,
            })?;
            if !sub.at_eof() {
                return Err(ParseError {
                    message: format!("trailing input in string interpolation '{}'", text),
                    line: token.line,
                    column: token.column,
                });
            }
            parts.push(StrPart::Expr(Box::new(expr)));
        }
        Ok(parts)
    }
}
