use super::{ParseError, Parser};
use crate::ast::TypeExpr;
use crate::lexer::TokenKind;

impl Parser {
    /// Type expressions: identifiers, dotted paths, generic applications,
    /// function types `fn(T) -> U`, and tuple types `(T, U)`.
    pub(super) fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        match self.current().kind {
            TokenKind::Fn => {
                let token = self.advance();
                self.expect(&TokenKind::LParen, "'(' in function type")?;
                let mut params = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    params.push(self.parse_type()?);
                    while self.eat(&TokenKind::Comma) {
                        params.push(self.parse_type()?);
                    }
                }
                self.expect(&TokenKind::RParen, "')' in function type")?;
                self.expect(&TokenKind::Arrow, "'->' in function type")?;
                let ret = self.parse_type()?;
                Ok(TypeExpr::Function {
                    token,
                    params,
                    ret: Box::new(ret),
                })
            }
            TokenKind::LParen => {
                let token = self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    elements.push(self.parse_type()?);
                    while self.eat(&TokenKind::Comma) {
                        elements.push(self.parse_type()?);
                    }
                }
                self.expect(&TokenKind::RParen, "')' closing the tuple type")?;
                Ok(TypeExpr::Tuple { token, elements })
            }
            TokenKind::Ident => {
                let token = self.advance();
                let mut segments = vec![token.literal.clone()];
                while self.check(&TokenKind::Dot) && self.peek(1).kind == TokenKind::Ident {
                    self.advance();
                    segments.push(self.advance().literal);
                }

                if self.eat(&TokenKind::Lt) {
                    let mut args = vec![self.parse_type()?];
                    while self.eat(&TokenKind::Comma) {
                        args.push(self.parse_type()?);
                    }
                    self.expect(&TokenKind::Gt, "'>' closing the type arguments")?;
                    return Ok(TypeExpr::Generic {
                        token,
                        name: segments.join("."),
                        args,
                    });
                }

                if segments.len() > 1 {
                    Ok(TypeExpr::Path { token, segments })
                } else {
                    let name = segments.pop().unwrap();
                    Ok(TypeExpr::Name { token, name })
                }
            }
            _ => Err(self.error_here(format!(
                "expected a type, found '{}'",
                self.describe_current()
            ))),
        }
    }
}
