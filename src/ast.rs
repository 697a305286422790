/// Lumen abstract syntax tree.
///
/// A closed family of variants in three categories: statements,
/// expressions, and patterns. Every node carries its originating token so
/// diagnostics can point back into the source. `Display` renders canonical
/// source text that reparses to the same tree (modulo whitespace).
use std::fmt;

use crate::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            writeln!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// Binding target of a `let` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum LetTarget {
    Ident(String),
    /// `let (a, b) = ...`
    Tuple(Vec<String>),
    /// `let [a, b, ...rest] = ...`
    Array {
        elements: Vec<String>,
        rest: Option<String>,
    },
    /// Active pattern: `let (|Even|Odd|) = ...`
    ActivePattern(Vec<String>),
}

impl fmt::Display for LetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetTarget::Ident(name) => write!(f, "{}", name),
            LetTarget::Tuple(names) => write!(f, "({})", names.join(", ")),
            LetTarget::Array { elements, rest } => {
                let mut parts: Vec<String> = elements.clone();
                if let Some(r) = rest {
                    parts.push(format!("...{}", r));
                }
                write!(f, "[{}]", parts.join(", "))
            }
            LetTarget::ActivePattern(cases) => write!(f, "(|{}|)", cases.join("|")),
        }
    }
}

/// A declared type parameter with optional trait bounds: `T` or `T: Show + Eq`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub token: Token,
    pub name: String,
    pub bounds: Vec<String>,
}

impl fmt::Display for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bounds.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.bounds.join(" + "))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDecl {
    pub token: Token,
    pub name: String,
    pub params: Vec<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitMethod {
    pub token: Token,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImplDecl {
    pub token: Token,
    /// Type parameters of the impl itself: `impl<U> Show for Pair<U>`.
    pub type_params: Vec<TypeParam>,
    pub trait_name: String,
    pub trait_args: Vec<TypeExpr>,
    pub target: TypeExpr,
    pub methods: Vec<FunctionLit>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        token: Token,
        mutable: bool,
        target: LetTarget,
        annotation: Option<TypeExpr>,
        value: Expr,
    },
    Return {
        token: Token,
        value: Option<Expr>,
    },
    /// `type Name<T> = V1(t) | V2`
    TypeDecl {
        token: Token,
        name: String,
        type_params: Vec<TypeParam>,
        variants: Vec<VariantDecl>,
    },
    /// `record Name<T>(f: T, ...)`
    RecordDecl {
        token: Token,
        name: String,
        type_params: Vec<TypeParam>,
        fields: Vec<(String, TypeExpr)>,
    },
    /// `trait Name<T> { fn m(self, ...) -> T; }`
    TraitDecl {
        token: Token,
        name: String,
        type_params: Vec<TypeParam>,
        methods: Vec<TraitMethod>,
    },
    Impl(ImplDecl),
    /// `module Name [exposing (a, b)]`
    ModuleDecl {
        token: Token,
        name: String,
        exposing: Option<Vec<String>>,
    },
    /// `use a.b [as alias] [exposing (x, y)]`
    Use {
        token: Token,
        path: Vec<String>,
        alias: Option<String>,
        exposing: Option<Vec<String>>,
    },
    Expr {
        token: Token,
        expr: Expr,
    },
}

impl Stmt {
    pub fn token(&self) -> &Token {
        match self {
            Stmt::Let { token, .. }
            | Stmt::Return { token, .. }
            | Stmt::TypeDecl { token, .. }
            | Stmt::RecordDecl { token, .. }
            | Stmt::TraitDecl { token, .. }
            | Stmt::ModuleDecl { token, .. }
            | Stmt::Use { token, .. }
            | Stmt::Expr { token, .. } => token,
            Stmt::Impl(decl) => &decl.token,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Let {
                mutable,
                target,
                annotation,
                value,
                ..
            } => {
                write!(f, "let ")?;
                if *mutable {
                    write!(f, "mut ")?;
                }
                write!(f, "{}", target)?;
                if let Some(ann) = annotation {
                    write!(f, ": {}", ann)?;
                }
                write!(f, " = {};", value)
            }
            Stmt::Return { value, .. } => match value {
                Some(v) => write!(f, "return {};", v),
                None => write!(f, "return;"),
            },
            Stmt::TypeDecl {
                name,
                type_params,
                variants,
                ..
            } => {
                write!(f, "type {}{} = ", name, fmt_type_params(type_params))?;
                let vs: Vec<String> = variants
                    .iter()
                    .map(|v| {
                        if v.params.is_empty() {
                            v.name.clone()
                        } else {
                            let ps: Vec<String> =
                                v.params.iter().map(|p| p.to_string()).collect();
                            format!("{}({})", v.name, ps.join(", "))
                        }
                    })
                    .collect();
                write!(f, "{};", vs.join(" | "))
            }
            Stmt::RecordDecl {
                name,
                type_params,
                fields,
                ..
            } => {
                let fs: Vec<String> = fields
                    .iter()
                    .map(|(n, t)| format!("{}: {}", n, t))
                    .collect();
                write!(
                    f,
                    "record {}{}({});",
                    name,
                    fmt_type_params(type_params),
                    fs.join(", ")
                )
            }
            Stmt::TraitDecl {
                name,
                type_params,
                methods,
                ..
            } => {
                writeln!(f, "trait {}{} {{", name, fmt_type_params(type_params))?;
                for m in methods {
                    let ps: Vec<String> = m.params.iter().map(|p| p.to_string()).collect();
                    write!(f, "  fn {}({})", m.name, ps.join(", "))?;
                    if let Some(ret) = &m.return_type {
                        write!(f, " -> {}", ret)?;
                    }
                    writeln!(f, ";")?;
                }
                write!(f, "}}")
            }
            Stmt::Impl(decl) => {
                write!(f, "impl")?;
                if !decl.type_params.is_empty() {
                    write!(f, "{}", fmt_type_params(&decl.type_params))?;
                }
                write!(f, " {}", decl.trait_name)?;
                if !decl.trait_args.is_empty() {
                    let args: Vec<String> =
                        decl.trait_args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                writeln!(f, " for {} {{", decl.target)?;
                for m in &decl.methods {
                    writeln!(f, "  {}", Expr::Function(m.clone()))?;
                }
                write!(f, "}}")
            }
            Stmt::ModuleDecl { name, exposing, .. } => {
                write!(f, "module {}", name)?;
                if let Some(names) = exposing {
                    write!(f, " exposing ({})", names.join(", "))?;
                }
                write!(f, ";")
            }
            Stmt::Use {
                path,
                alias,
                exposing,
                ..
            } => {
                write!(f, "use {}", path.join("."))?;
                if let Some(a) = alias {
                    write!(f, " as {}", a)?;
                }
                if let Some(names) = exposing {
                    write!(f, " exposing ({})", names.join(", "))?;
                }
                write!(f, ";")
            }
            Stmt::Expr { expr, .. } => write!(f, "{};", expr),
        }
    }
}

fn fmt_type_params(params: &[TypeParam]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        let ps: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        format!("<{}>", ps.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    Literal(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub token: Token,
    pub name: String,
    pub annotation: Option<TypeExpr>,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.annotation {
            Some(ann) => write!(f, "{}: {}", self.name, ann),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLit {
    pub token: Token,
    pub name: Option<String>,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub token: Token,
    pub pattern: Pattern,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenBranch {
    pub token: Token,
    pub conditions: Vec<Expr>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int {
        token: Token,
        value: i64,
    },
    Double {
        token: Token,
        value: f64,
    },
    Bool {
        token: Token,
        value: bool,
    },
    Str {
        token: Token,
        value: String,
    },
    InterpStr {
        token: Token,
        parts: Vec<StrPart>,
    },
    Array {
        token: Token,
        elements: Vec<Expr>,
    },
    Hash {
        token: Token,
        pairs: Vec<(Expr, Expr)>,
    },
    /// `(a, b)`; zero elements is the unit tuple `()`.
    Tuple {
        token: Token,
        elements: Vec<Expr>,
    },
    Ident {
        token: Token,
        name: String,
    },
    Prefix {
        token: Token,
        op: String,
        operand: Box<Expr>,
    },
    Infix {
        token: Token,
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `target = value` / `target += value`
    Assign {
        token: Token,
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        token: Token,
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        token: Token,
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        token: Token,
        object: Box<Expr>,
        property: String,
    },
    If {
        token: Token,
        condition: Box<Expr>,
        consequence: Box<Expr>,
        alternative: Option<Box<Expr>>,
    },
    Match {
        token: Token,
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    When {
        token: Token,
        subject: Option<Box<Expr>>,
        branches: Vec<WhenBranch>,
        else_body: Box<Expr>,
    },
    /// Postfix `?`.
    Try {
        token: Token,
        operand: Box<Expr>,
    },
    Function(FunctionLit),
    Block {
        token: Token,
        statements: Vec<Stmt>,
    },
}

impl Expr {
    pub fn token(&self) -> &Token {
        match self {
            Expr::Int { token, .. }
            | Expr::Double { token, .. }
            | Expr::Bool { token, .. }
            | Expr::Str { token, .. }
            | Expr::InterpStr { token, .. }
            | Expr::Array { token, .. }
            | Expr::Hash { token, .. }
            | Expr::Tuple { token, .. }
            | Expr::Ident { token, .. }
            | Expr::Prefix { token, .. }
            | Expr::Infix { token, .. }
            | Expr::Assign { token, .. }
            | Expr::Call { token, .. }
            | Expr::Index { token, .. }
            | Expr::Member { token, .. }
            | Expr::If { token, .. }
            | Expr::Match { token, .. }
            | Expr::When { token, .. }
            | Expr::Try { token, .. }
            | Expr::Block { token, .. } => token,
            Expr::Function(lit) => &lit.token,
        }
    }
}

fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int { value, .. } => write!(f, "{}", value),
            Expr::Double { value, .. } => {
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Expr::Bool { value, .. } => write!(f, "{}", value),
            Expr::Str { value, .. } => write!(f, "\"{}\"", escape_str(value)),
            Expr::InterpStr { parts, .. } => {
                write!(f, "`")?;
                for part in parts {
                    match part {
                        StrPart::Literal(s) => write!(f, "{}", s)?,
                        StrPart::Expr(e) => write!(f, "{{{}}}", e)?,
                    }
                }
                write!(f, "`")
            }
            Expr::Array { elements, .. } => {
                let es: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", es.join(", "))
            }
            Expr::Hash { pairs, .. } => {
                let ps: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                write!(f, "{{{}}}", ps.join(", "))
            }
            Expr::Tuple { elements, .. } => {
                if elements.len() == 1 {
                    write!(f, "({},)", elements[0])
                } else {
                    let es: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                    write!(f, "({})", es.join(", "))
                }
            }
            Expr::Ident { name, .. } => write!(f, "{}", name),
            Expr::Prefix { op, operand, .. } => write!(f, "({}{})", op, operand),
            Expr::Infix {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op, right),
            Expr::Assign {
                op, target, value, ..
            } => write!(f, "{} {} {}", target, op, value),
            Expr::Call { callee, args, .. } => {
                let a: Vec<String> = args.iter().map(|x| x.to_string()).collect();
                write!(f, "{}({})", callee, a.join(", "))
            }
            Expr::Index { object, index, .. } => write!(f, "{}[{}]", object, index),
            Expr::Member {
                object, property, ..
            } => write!(f, "{}.{}", object, property),
            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                match consequence.as_ref() {
                    Expr::Block { .. } => write!(f, "if {} {}", condition, consequence)?,
                    other => write!(f, "if {}: {}", condition, other)?,
                }
                if let Some(alt) = alternative {
                    match alt.as_ref() {
                        Expr::Block { .. } | Expr::If { .. } => write!(f, " else {}", alt)?,
                        other => write!(f, " else: {}", other)?,
                    }
                }
                Ok(())
            }
            Expr::Match {
                scrutinee, arms, ..
            } => {
                write!(f, "match ({}) {{ ", scrutinee)?;
                let parts: Vec<String> = arms
                    .iter()
                    .map(|arm| format!("{} => {}", arm.pattern, arm.body))
                    .collect();
                write!(f, "{} }}", parts.join(", "))
            }
            Expr::When {
                subject,
                branches,
                else_body,
                ..
            } => {
                write!(f, "when ")?;
                if let Some(s) = subject {
                    write!(f, "({}) ", s)?;
                }
                write!(f, "{{ ")?;
                for branch in branches {
                    let cs: Vec<String> =
                        branch.conditions.iter().map(|c| c.to_string()).collect();
                    write!(f, "| {} => {}, ", cs.join(", "), branch.body)?;
                }
                write!(f, "else => {} }}", else_body)
            }
            Expr::Try { operand, .. } => write!(f, "{}?", operand),
            Expr::Function(lit) => {
                write!(f, "fn")?;
                if let Some(name) = &lit.name {
                    write!(f, " {}", name)?;
                }
                if !lit.type_params.is_empty() {
                    write!(f, "{}", fmt_type_params(&lit.type_params))?;
                }
                let ps: Vec<String> = lit.params.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", ps.join(", "))?;
                if let Some(ret) = &lit.return_type {
                    write!(f, " -> {}", ret)?;
                }
                match lit.body.as_ref() {
                    Expr::Block { .. } => write!(f, " {}", lit.body),
                    other => write!(f, ": {}", other),
                }
            }
            Expr::Block { statements, .. } => {
                writeln!(f, "{{")?;
                for stmt in statements {
                    writeln!(f, "{}", stmt)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident {
        token: Token,
        name: String,
    },
    Wildcard {
        token: Token,
    },
    Int {
        token: Token,
        value: i64,
    },
    Str {
        token: Token,
        value: String,
    },
    Bool {
        token: Token,
        value: bool,
    },
    /// Variant constructor applied to sub-patterns: `Circle(r)`.
    Variant {
        token: Token,
        name: String,
        bindings: Vec<Pattern>,
    },
    /// `[a, b, ...rest]`
    Array {
        token: Token,
        elements: Vec<Pattern>,
        rest: Option<String>,
    },
    Tuple {
        token: Token,
        elements: Vec<Pattern>,
    },
}

impl Pattern {
    pub fn token(&self) -> &Token {
        match self {
            Pattern::Ident { token, .. }
            | Pattern::Wildcard { token }
            | Pattern::Int { token, .. }
            | Pattern::Str { token, .. }
            | Pattern::Bool { token, .. }
            | Pattern::Variant { token, .. }
            | Pattern::Array { token, .. }
            | Pattern::Tuple { token, .. } => token,
        }
    }

    /// All names this pattern binds, in source order.
    pub fn bound_names(&self) -> Vec<String> {
        match self {
            Pattern::Ident { name, .. } => vec![name.clone()],
            Pattern::Variant { bindings, .. } => {
                bindings.iter().flat_map(|p| p.bound_names()).collect()
            }
            Pattern::Array { elements, rest, .. } => {
                let mut names: Vec<String> =
                    elements.iter().flat_map(|p| p.bound_names()).collect();
                if let Some(r) = rest {
                    names.push(r.clone());
                }
                names
            }
            Pattern::Tuple { elements, .. } => {
                elements.iter().flat_map(|p| p.bound_names()).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Ident { name, .. } => write!(f, "{}", name),
            Pattern::Wildcard { .. } => write!(f, "_"),
            Pattern::Int { value, .. } => write!(f, "{}", value),
            Pattern::Str { value, .. } => write!(f, "\"{}\"", escape_str(value)),
            Pattern::Bool { value, .. } => write!(f, "{}", value),
            Pattern::Variant { name, bindings, .. } => {
                if bindings.is_empty() {
                    write!(f, "{}", name)
                } else {
                    let bs: Vec<String> = bindings.iter().map(|b| b.to_string()).collect();
                    write!(f, "{}({})", name, bs.join(", "))
                }
            }
            Pattern::Array { elements, rest, .. } => {
                let mut parts: Vec<String> =
                    elements.iter().map(|e| e.to_string()).collect();
                if let Some(r) = rest {
                    parts.push(format!("...{}", r));
                }
                write!(f, "[{}]", parts.join(", "))
            }
            Pattern::Tuple { elements, .. } => {
                let es: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", es.join(", "))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Type expressions (surface syntax of types)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Name {
        token: Token,
        name: String,
    },
    /// Dotted path: `geometry.Shape`.
    Path {
        token: Token,
        segments: Vec<String>,
    },
    Generic {
        token: Token,
        name: String,
        args: Vec<TypeExpr>,
    },
    /// `fn(T, U) -> V`
    Function {
        token: Token,
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    /// `(T, U)`
    Tuple {
        token: Token,
        elements: Vec<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn token(&self) -> &Token {
        match self {
            TypeExpr::Name { token, .. }
            | TypeExpr::Path { token, .. }
            | TypeExpr::Generic { token, .. }
            | TypeExpr::Function { token, .. }
            | TypeExpr::Tuple { token, .. } => token,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name { name, .. } => write!(f, "{}", name),
            TypeExpr::Path { segments, .. } => write!(f, "{}", segments.join(".")),
            TypeExpr::Generic { name, args, .. } => {
                let a: Vec<String> = args.iter().map(|x| x.to_string()).collect();
                write!(f, "{}<{}>", name, a.join(", "))
            }
            TypeExpr::Function { params, ret, .. } => {
                let ps: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "fn({}) -> {}", ps.join(", "), ret)
            }
            TypeExpr::Tuple { elements, .. } => {
                let es: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", es.join(", "))
            }
        }
    }
}
