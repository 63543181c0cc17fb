//! Path-pattern mini-language: grammar, AST, and compiler.
//!
//! A pattern names which relations to follow from a root and how many hops:
//! `"department+.(boss|employees).address"`. Compilation is pure and
//! produces an immutable [`PathExpr`] that is safe to share across threads
//! and invocations; the process-wide cache lives in the `cache` module.
//!
//! # Grammar
//! ```text
//! expr   := term ('|' term)*
//! term   := factor ('.' factor)*
//! factor := NAME | '(' expr ')'
//! factor := factor '+'
//! ```
//! `NAME` is one or more of `[A-Za-z0-9_$]`; ASCII whitespace between
//! tokens is ignored. `X+` follows `X` one or more times, to a fixed point.
//!
//! # Citations
//! - Regular path queries: Mendelzon & Wood, "Finding regular simple paths
//!   in graph databases" (1995)
//! - Recursive descent: Wirth, "Compiler Construction", Chapter 4 (1996)

use serde::{Deserialize, Serialize};
use std::fmt;

/// A compiled path expression.
///
/// Immutable once compiled; interpretation lives in the `explore` module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathExpr {
    /// A single relation or map-entry component name.
    Name(String),
    /// Ordered composition: `a.b.c`.
    Seq(Vec<PathExpr>),
    /// Set of alternatives: `a|b`.
    Alt(Vec<PathExpr>),
    /// One-or-more repetition to a fixed point: `a+`.
    Repeat(Box<PathExpr>),
}

// Display precedence: Alt < Seq < Repeat/Name. Sub-expressions are
// parenthesized when their precedence is below the context's.
const PREC_ALT: u8 = 0;
const PREC_SEQ: u8 = 1;
const PREC_UNIT: u8 = 2;

impl PathExpr {
    fn prec(&self) -> u8 {
        match self {
            PathExpr::Alt(_) => PREC_ALT,
            PathExpr::Seq(_) => PREC_SEQ,
            PathExpr::Name(_) | PathExpr::Repeat(_) => PREC_UNIT,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        let parens = self.prec() < min;
        if parens {
            f.write_str("(")?;
        }
        match self {
            PathExpr::Name(name) => f.write_str(name)?,
            PathExpr::Seq(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    part.fmt_prec(f, PREC_SEQ)?;
                }
            }
            PathExpr::Alt(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    part.fmt_prec(f, PREC_SEQ)?;
                }
            }
            PathExpr::Repeat(inner) => {
                inner.fmt_prec(f, PREC_UNIT)?;
                f.write_str("+")?;
            }
        }
        if parens {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathExpr {
    /// Round-trips to pattern syntax (modulo whitespace and redundant
    /// parentheses).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, PREC_ALT)
    }
}

/// Error type for pattern compilation.
///
/// Raised only at compile time; a previously compiled expression never
/// fails at traversal time. Positions are byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternSyntaxError {
    /// The pattern is empty or whitespace-only.
    Empty,
    /// A parenthesized group contains nothing: `"a.()"`.
    EmptyGroup {
        /// Offset of the opening parenthesis.
        at: usize,
    },
    /// A character outside the pattern alphabet.
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Its offset.
        at: usize,
    },
    /// The pattern ended where a name or group was required.
    UnexpectedEnd,
    /// An opening parenthesis without a matching close, or a stray close.
    UnbalancedGroup {
        /// Offset of the offending parenthesis.
        at: usize,
    },
    /// An alternative with no content: `"a||b"`, `"|a"`, `"a|"`.
    EmptyAlternative {
        /// Offset of the offending `|`.
        at: usize,
    },
    /// A `.` or `+` with no operand: `".a"`, `"a."`, `"+a"`.
    DanglingOperator {
        /// The operator.
        op: char,
        /// Its offset.
        at: usize,
    },
    /// Well-formed expression followed by leftover input: `"a b"`.
    TrailingInput {
        /// Offset of the first unconsumed token.
        at: usize,
    },
}

impl fmt::Display for PatternSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSyntaxError::Empty => write!(f, "empty pattern"),
            PatternSyntaxError::EmptyGroup { at } => write!(f, "empty group at offset {}", at),
            PatternSyntaxError::UnexpectedChar { ch, at } => {
                write!(f, "unexpected character {:?} at offset {}", ch, at)
            }
            PatternSyntaxError::UnexpectedEnd => write!(f, "unexpected end of pattern"),
            PatternSyntaxError::UnbalancedGroup { at } => {
                write!(f, "unbalanced group at offset {}", at)
            }
            PatternSyntaxError::EmptyAlternative { at } => {
                write!(f, "empty alternative at offset {}", at)
            }
            PatternSyntaxError::DanglingOperator { op, at } => {
                write!(f, "dangling {:?} at offset {}", op, at)
            }
            PatternSyntaxError::TrailingInput { at } => {
                write!(f, "trailing input at offset {}", at)
            }
        }
    }
}

impl std::error::Error for PatternSyntaxError {}

/// Compiles a pattern string into a [`PathExpr`].
///
/// Pure: no side effects beyond the returned AST. Callers that want the
/// process-wide compile-once cache should go through `cache::compiled`.
pub fn compile(pattern: &str) -> Result<PathExpr, PatternSyntaxError> {
    let tokens = tokenize(pattern)?;
    if tokens.is_empty() {
        return Err(PatternSyntaxError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(&Token::RParen(at)) => Err(PatternSyntaxError::UnbalancedGroup { at }),
        Some(tok) => Err(PatternSyntaxError::TrailingInput { at: tok.at() }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String, usize),
    Dot(usize),
    Pipe(usize),
    Plus(usize),
    LParen(usize),
    RParen(usize),
}

impl Token {
    fn at(&self) -> usize {
        match self {
            Token::Name(_, at)
            | Token::Dot(at)
            | Token::Pipe(at)
            | Token::Plus(at)
            | Token::LParen(at)
            | Token::RParen(at) => *at,
        }
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, PatternSyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = pattern.char_indices().peekable();
    while let Some((at, ch)) = chars.next() {
        match ch {
            '.' => tokens.push(Token::Dot(at)),
            '|' => tokens.push(Token::Pipe(at)),
            '+' => tokens.push(Token::Plus(at)),
            '(' => tokens.push(Token::LParen(at)),
            ')' => tokens.push(Token::RParen(at)),
            _ if ch.is_ascii_whitespace() => {}
            _ if is_name_char(ch) => {
                let mut name = String::new();
                name.push(ch);
                while let Some(&(_, next)) = chars.peek() {
                    if is_name_char(next) {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name, at));
            }
            _ => return Err(PatternSyntaxError::UnexpectedChar { ch, at }),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// `expr := term ('|' term)*`
    fn expr(&mut self) -> Result<PathExpr, PatternSyntaxError> {
        let mut alternatives = vec![self.term()?];
        while let Some(&Token::Pipe(at)) = self.peek() {
            self.pos += 1;
            // A pipe must be followed by a term; anything that cannot start
            // one makes the alternative empty.
            match self.peek() {
                None | Some(Token::Pipe(_)) | Some(Token::RParen(_)) => {
                    return Err(PatternSyntaxError::EmptyAlternative { at });
                }
                _ => alternatives.push(self.term()?),
            }
        }
        if alternatives.len() == 1 {
            Ok(alternatives.pop().expect("one alternative"))
        } else {
            Ok(PathExpr::Alt(alternatives))
        }
    }

    /// `term := factor ('.' factor)*`
    fn term(&mut self) -> Result<PathExpr, PatternSyntaxError> {
        let mut factors = vec![self.factor()?];
        while let Some(&Token::Dot(at)) = self.peek() {
            self.pos += 1;
            match self.peek() {
                None | Some(Token::RParen(_)) => {
                    return Err(PatternSyntaxError::DanglingOperator { op: '.', at });
                }
                _ => factors.push(self.factor()?),
            }
        }
        if factors.len() == 1 {
            Ok(factors.pop().expect("one factor"))
        } else {
            Ok(PathExpr::Seq(factors))
        }
    }

    /// `factor := (NAME | '(' expr ')') '+'*`
    fn factor(&mut self) -> Result<PathExpr, PatternSyntaxError> {
        let mut expr = match self.bump() {
            Some(Token::Name(name, _)) => PathExpr::Name(name),
            Some(Token::LParen(at)) => {
                if let Some(Token::RParen(_)) = self.peek() {
                    return Err(PatternSyntaxError::EmptyGroup { at });
                }
                let inner = self.expr()?;
                match self.bump() {
                    Some(Token::RParen(_)) => inner,
                    _ => return Err(PatternSyntaxError::UnbalancedGroup { at }),
                }
            }
            Some(Token::Pipe(at)) => return Err(PatternSyntaxError::EmptyAlternative { at }),
            Some(Token::Dot(at)) => {
                return Err(PatternSyntaxError::DanglingOperator { op: '.', at })
            }
            Some(Token::Plus(at)) => {
                return Err(PatternSyntaxError::DanglingOperator { op: '+', at })
            }
            Some(Token::RParen(at)) => return Err(PatternSyntaxError::UnbalancedGroup { at }),
            None => return Err(PatternSyntaxError::UnexpectedEnd),
        };
        while let Some(Token::Plus(_)) = self.peek() {
            self.pos += 1;
            expr = PathExpr::Repeat(Box::new(expr));
        }
        Ok(expr)
    }
}
