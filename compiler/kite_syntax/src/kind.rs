//! Syntax node kinds.

/// Kind tag of a syntax node.
///
/// The set is closed: every query over the tree matches on it exhaustively.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // Tokens
    LParen,
    RParen,
    LBrace,
    RBrace,
    LAngle,
    RAngle,
    Comma,
    Star,
    Eq,
    Arrow,
    Whitespace,
    /// An identifier that is not itself an expression (parameter or
    /// argument names).
    Ident,
    /// `label@` prefix of a label-qualified expression.
    LabelQualifier,

    // Expressions
    /// Reference to a variable or function by name.
    NameRef,
    IntLiteral,
    StringLiteral,
    /// `callee(args) { trailing }`
    CallExpr,
    /// `{ params -> body }`
    FunctionLiteral,
    /// `label@expr`
    LabeledExpr,
    /// `(expr)`
    ParenExpr,

    // Structure
    /// `<T, U>` after a callee.
    TypeArgumentList,
    /// One entry of a type-argument list.
    TypeProjection,
    /// `(a, b = c, *d)` after a callee.
    ValueArgumentList,
    /// One entry of a value-argument list.
    ValueArgument,
    /// A function-literal parameter.
    Parameter,
    /// `val name = init`
    VariableDecl,
    /// Root of a parsed file.
    SourceFile,
}

impl SyntaxKind {
    /// Returns `true` for kinds that are expressions.
    #[inline]
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            SyntaxKind::NameRef
                | SyntaxKind::IntLiteral
                | SyntaxKind::StringLiteral
                | SyntaxKind::CallExpr
                | SyntaxKind::FunctionLiteral
                | SyntaxKind::LabeledExpr
                | SyntaxKind::ParenExpr
        )
    }

    /// Fixed source text of punctuation tokens.
    pub fn punctuation(self) -> Option<&'static str> {
        Some(match self {
            SyntaxKind::LParen => "(",
            SyntaxKind::RParen => ")",
            SyntaxKind::LBrace => "{",
            SyntaxKind::RBrace => "}",
            SyntaxKind::LAngle => "<",
            SyntaxKind::RAngle => ">",
            SyntaxKind::Comma => ",",
            SyntaxKind::Star => "*",
            SyntaxKind::Eq => "=",
            SyntaxKind::Arrow => "->",
            SyntaxKind::Whitespace => " ",
            _ => return None,
        })
    }
}
