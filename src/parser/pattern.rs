use super::{ParseError, Parser};
use crate::ast::Pattern;
use crate::lexer::TokenKind;

impl Parser {
    /// Parse a `match` arm pattern: literal, wildcard, identifier, variant
    /// constructor, array pattern, or tuple pattern. Whether a bare
    /// identifier binds the scrutinee or names a variant is resolved later
    /// against the environment.
    pub(super) fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Int => {
                let token = self.advance();
                let value = token.literal.parse::<i64>().map_err(|_| ParseError {
                    message: format!("integer literal '{}' is out of range", token.literal),
                    line: token.line,
                    column: token.column,
                })?;
                Ok(Pattern::Int { token, value })
            }
            TokenKind::Minus => {
                let token = self.advance();
                let num = self.expect(&TokenKind::Int, "an integer after '-'")?;
                let value = -num.literal.parse::<i64>().map_err(|_| ParseError {
                    message: format!("integer literal '{}' is out of range", num.literal),
                    line: num.line,
                    column: num.column,
                })?;
                Ok(Pattern::Int { token, value })
            }
            TokenKind::Str => {
                let token = self.advance();
                let value = token.literal.clone();
                Ok(Pattern::Str { token, value })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                let value = token.kind == TokenKind::True;
                Ok(Pattern::Bool { token, value })
            }
            TokenKind::Ident => {
                let token = self.advance();
                let name = token.literal.clone();
                if name == "_" {
                    return Ok(Pattern::Wildcard { token });
                }
                if self.eat(&TokenKind::LParen) {
                    let mut bindings = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        bindings.push(self.parse_pattern()?);
                        while self.eat(&TokenKind::Comma) {
                            bindings.push(self.parse_pattern()?);
                        }
                    }
                    self.expect(&TokenKind::RParen, "')' closing the variant pattern")?;
                    return Ok(Pattern::Variant {
                        token,
                        name,
                        bindings,
                    });
                }
                Ok(Pattern::Ident { token, name })
            }
            TokenKind::LBracket => {
                let token = self.advance();
                let mut elements = Vec::new();
                let mut rest = None;
                while !self.check(&TokenKind::RBracket) {
                    if self.eat(&TokenKind::Ellipsis) {
                        rest = Some(self.expect_ident("a rest binding name")?.literal);
                        break;
                    }
                    elements.push(self.parse_pattern()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket, "']' closing the array pattern")?;
                Ok(Pattern::Array {
                    token,
                    elements,
                    rest,
                })
            }
            TokenKind::LParen => {
                let token = self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    elements.push(self.parse_pattern()?);
                    while self.eat(&TokenKind::Comma) {
                        elements.push(self.parse_pattern()?);
                    }
                }
                self.expect(&TokenKind::RParen, "')' closing the tuple pattern")?;
                Ok(Pattern::Tuple { token, elements })
            }
            _ => Err(self.error_here(format!(
                "expected a pattern, found '{}'",
                self.describe_current()
            ))),
        }
    }
}
