use super::{ParseError, Parser, Prec};
use crate::ast::{
    FunctionLit, ImplDecl, LetTarget, Param, Stmt, TraitMethod, TypeExpr, TypeParam, VariantDecl,
};
use crate::lexer::TokenKind;

impl Parser {
    pub(super) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let stmt = match self.current().kind {
            TokenKind::Module => self.parse_module_decl(),
            TokenKind::Use => self.parse_use(),
            TokenKind::Let => self.parse_let(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Type => self.parse_type_decl(),
            TokenKind::Record => self.parse_record_decl(),
            TokenKind::Trait => self.parse_trait_decl(),
            TokenKind::Impl => self.parse_impl_decl(),
            _ => {
                let token = self.current().clone();
                let expr = self.parse_expr(Prec::Lowest)?;
                Ok(Stmt::Expr { token, expr })
            }
        }?;
        // Trailing semicolons are consumed where present but never required.
        self.eat(&TokenKind::Semicolon);
        Ok(stmt)
    }

    fn parse_module_decl(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let mut name = self.expect_ident("a module name")?.literal;
        while self.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_ident("a module path segment")?.literal);
        }
        let exposing = self.parse_exposing_clause()?;
        Ok(Stmt::ModuleDecl {
            token,
            name,
            exposing,
        })
    }

    fn parse_use(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let mut path = vec![self.expect_ident("a module path")?.literal];
        while self.eat(&TokenKind::Dot) {
            path.push(self.expect_ident("a module path segment")?.literal);
        }
        let alias = if self.eat(&TokenKind::As) {
            Some(self.expect_ident("an alias name")?.literal)
        } else {
            None
        };
        let exposing = self.parse_exposing_clause()?;
        Ok(Stmt::Use {
            token,
            path,
            alias,
            exposing,
        })
    }

    fn parse_exposing_clause(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        if !self.eat(&TokenKind::Exposing) {
            return Ok(None);
        }
        self.expect(&TokenKind::LParen, "'(' after 'exposing'")?;
        let mut names = Vec::new();
        if !self.check(&TokenKind::RParen) {
            names.push(self.expect_ident("an exposed name")?.literal);
            while self.eat(&TokenKind::Comma) {
                names.push(self.expect_ident("an exposed name")?.literal);
            }
        }
        self.expect(&TokenKind::RParen, "')' closing the exposing list")?;
        Ok(Some(names))
    }

    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let mutable = self.eat(&TokenKind::Mut);
        let target = self.parse_let_target()?;

        let annotation = if self.eat(&TokenKind::Colon) {
            if !matches!(target, LetTarget::Ident(_)) {
                return Err(self
                    .error_here("type annotations are not allowed on destructuring patterns".into()));
            }
            Some(self.parse_type_expr()?)
        } else {
            None
        };

        self.expect(&TokenKind::Assign, "'=' in let binding")?;
        let value = self.parse_expr(Prec::Lowest)?;
        Ok(Stmt::Let {
            token,
            mutable,
            target,
            annotation,
            value,
        })
    }

    fn parse_let_target(&mut self) -> Result<LetTarget, ParseError> {
        match self.current().kind {
            TokenKind::Ident => Ok(LetTarget::Ident(self.advance().literal)),
            TokenKind::LParen => {
                self.advance();
                // Active pattern: (|Case1|Case2|)
                if self.check(&TokenKind::Bar) {
                    self.advance();
                    let mut cases = vec![self.expect_ident("an active pattern case")?.literal];
                    while self.eat(&TokenKind::Bar) {
                        if self.check(&TokenKind::RParen) {
                            break;
                        }
                        cases.push(self.expect_ident("an active pattern case")?.literal);
                    }
                    self.expect(&TokenKind::RParen, "')' closing the active pattern")?;
                    return Ok(LetTarget::ActivePattern(cases));
                }
                let mut names = vec![self.expect_ident("a binding name")?.literal];
                while self.eat(&TokenKind::Comma) {
                    names.push(self.expect_ident("a binding name")?.literal);
                }
                self.expect(&TokenKind::RParen, "')' closing the tuple pattern")?;
                Ok(LetTarget::Tuple(names))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                let mut rest = None;
                while !self.check(&TokenKind::RBracket) {
                    if self.eat(&TokenKind::Ellipsis) {
                        rest = Some(self.expect_ident("a rest binding name")?.literal);
                        break;
                    }
                    elements.push(self.expect_ident("a binding name")?.literal);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket, "']' closing the array pattern")?;
                Ok(LetTarget::Array { elements, rest })
            }
            _ => Err(self.error_here(format!(
                "expected a binding pattern after 'let', found '{}'",
                self.describe_current()
            ))),
        }
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let value = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.at_eof()
        {
            None
        } else {
            Some(self.parse_expr(Prec::Lowest)?)
        };
        Ok(Stmt::Return { token, value })
    }

    /// `type Name<T> = V1(t, u) | V2 | V3(v)`
    fn parse_type_decl(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let name = self.expect_ident("a type name")?.literal;
        let type_params = self.parse_type_param_list()?;
        self.expect(&TokenKind::Assign, "'=' in type declaration")?;

        let mut variants = vec![self.parse_variant_decl()?];
        while self.eat(&TokenKind::Bar) {
            variants.push(self.parse_variant_decl()?);
        }
        Ok(Stmt::TypeDecl {
            token,
            name,
            type_params,
            variants,
        })
    }

    fn parse_variant_decl(&mut self) -> Result<VariantDecl, ParseError> {
        let token = self.current().clone();
        let name = self.expect_ident("a variant name")?.literal;
        let mut params = Vec::new();
        if self.eat(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                params.push(self.parse_type_expr()?);
                while self.eat(&TokenKind::Comma) {
                    params.push(self.parse_type_expr()?);
                }
            }
            self.expect(&TokenKind::RParen, "')' closing the variant payload")?;
        }
        Ok(VariantDecl {
            token,
            name,
            params,
        })
    }

    /// `record Name<T>(field: Type, ...)`
    fn parse_record_decl(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let name = self.expect_ident("a record name")?.literal;
        let type_params = self.parse_type_param_list()?;
        self.expect(&TokenKind::LParen, "'(' opening the record fields")?;
        let mut fields = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let fname = self.expect_ident("a field name")?.literal;
                self.expect(&TokenKind::Colon, "':' after the field name")?;
                let ftype = self.parse_type_expr()?;
                fields.push((fname, ftype));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' closing the record fields")?;
        Ok(Stmt::RecordDecl {
            token,
            name,
            type_params,
            fields,
        })
    }

    /// `trait Name<T> { fn m(self, x: T) -> U; ... }`
    fn parse_trait_decl(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let name = self.expect_ident("a trait name")?.literal;
        let type_params = self.parse_type_param_list()?;
        self.expect(&TokenKind::LBrace, "'{' opening the trait body")?;

        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let mtoken = self.expect(&TokenKind::Fn, "'fn' starting a trait method")?;
            let mname = self.expect_ident("a method name")?.literal;
            self.expect(&TokenKind::LParen, "'(' opening the method parameters")?;
            let params = self.parse_param_list()?;
            let return_type = if self.eat(&TokenKind::Arrow) {
                Some(self.parse_type_expr()?)
            } else {
                None
            };
            self.eat(&TokenKind::Semicolon);
            methods.push(TraitMethod {
                token: mtoken,
                name: mname,
                params,
                return_type,
            });
        }
        self.expect(&TokenKind::RBrace, "'}' closing the trait body")?;
        Ok(Stmt::TraitDecl {
            token,
            name,
            type_params,
            methods,
        })
    }

    /// `impl [<U>] Trait[<Args>] for Target { fn m(self) ... }`
    fn parse_impl_decl(&mut self) -> Result<Stmt, ParseError> {
        let token = self.advance();
        let type_params = self.parse_type_param_list()?;
        let trait_name = self.expect_ident("a trait name")?.literal;
        let mut trait_args = Vec::new();
        if self.eat(&TokenKind::Lt) {
            trait_args.push(self.parse_type_expr()?);
            while self.eat(&TokenKind::Comma) {
                trait_args.push(self.parse_type_expr()?);
            }
            self.expect(&TokenKind::Gt, "'>' closing the trait arguments")?;
        }
        self.expect(&TokenKind::For, "'for' in impl declaration")?;
        let target = self.parse_type_expr()?;
        self.expect(&TokenKind::LBrace, "'{' opening the impl body")?;

        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            let lit = self.parse_function_literal()?;
            if lit.name.is_none() {
                return Err(self.error_here("impl methods must be named".into()));
            }
            methods.push(lit);
            self.eat(&TokenKind::Comma);
            self.eat(&TokenKind::Semicolon);
        }
        self.expect(&TokenKind::RBrace, "'}' closing the impl body")?;
        Ok(Stmt::Impl(ImplDecl {
            token,
            type_params,
            trait_name,
            trait_args,
            target,
            methods,
        }))
    }

    /// `<T, U: Show + Eq>` after a declaration name; empty when absent.
    pub(super) fn parse_type_param_list(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        let mut params = Vec::new();
        if self.eat(&TokenKind::Lt) {
            params.push(self.parse_type_param()?);
            while self.eat(&TokenKind::Comma) {
                params.push(self.parse_type_param()?);
            }
            self.expect(&TokenKind::Gt, "'>' closing the type parameters")?;
        }
        Ok(params)
    }

    fn parse_type_param(&mut self) -> Result<TypeParam, ParseError> {
        let token = self.current().clone();
        let name = self.expect_ident("a type parameter")?.literal;
        let mut bounds = Vec::new();
        if self.eat(&TokenKind::Colon) {
            bounds.push(self.expect_ident("a trait bound")?.literal);
            while self.eat(&TokenKind::Plus) {
                bounds.push(self.expect_ident("a trait bound")?.literal);
            }
        }
        Ok(TypeParam {
            token,
            name,
            bounds,
        })
    }

    /// Comma-separated `name [: Type]` list, consuming the closing paren.
    pub(super) fn parse_param_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let token = self.current().clone();
                let name = self.expect_ident("a parameter name")?.literal;
                let annotation = if self.eat(&TokenKind::Colon) {
                    Some(self.parse_type_expr()?)
                } else {
                    None
                };
                params.push(Param {
                    token,
                    name,
                    annotation,
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' closing the parameter list")?;
        Ok(params)
    }

    /// `fn [name][<T>](params) [-> T] { body } | : expr | => expr`
    pub(super) fn parse_function_literal(&mut self) -> Result<FunctionLit, ParseError> {
        let token = self.expect(&TokenKind::Fn, "'fn'")?;
        let name = if self.check(&TokenKind::Ident) {
            Some(self.advance().literal)
        } else {
            None
        };
        let type_params = self.parse_type_param_list()?;
        self.expect(&TokenKind::LParen, "'(' opening the parameter list")?;
        let params = self.parse_param_list()?;
        let return_type = if self.eat(&TokenKind::Arrow) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };

        let body = if self.check(&TokenKind::LBrace) {
            self.parse_block()?
        } else if self.eat(&TokenKind::Colon) || self.eat(&TokenKind::FatArrow) {
            if self.check(&TokenKind::LBrace) {
                self.parse_block()?
            } else {
                self.parse_expr(Prec::Lowest)?
            }
        } else {
            return Err(self.error_here(format!(
                "expected a function body, found '{}'",
                self.describe_current()
            )));
        };

        Ok(FunctionLit {
            token,
            name,
            type_params,
            params,
            return_type,
            body: Box::new(body),
        })
    }

    pub(super) fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        self.parse_type()
    }
}
