//! Deterministic textual encoding of IR terms and patterns.
//!
//! The encoding is the stable form used for hashing and cache keys: two
//! structurally equal terms always serialize to the same bytes, and
//! [`parse`] inverts [`serialize`] exactly. The shape is a flat
//! constructor syntax, `Node(child,child,...)`, with single-quoted
//! strings escaping `'` and `\`.
//!
//! `Struct` and `PositionalStruct` carry their family token right after
//! the tag so the encoding stays invertible, and optional indices are
//! rendered `None` / `Some(n)`.

use std::fmt::Write as _;
use std::str::FromStr;

use num_bigint::BigInt;
use thiserror::Error;

use rill_intern::{PackageName, Symbol, TypeRef};

use crate::expr::{DataFamily, Expr, Lit};
use crate::pattern::{ListPart, Pattern, PatternError, StrPart};

/// Errors produced when reading the textual encoding back.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input ended in the middle of a term.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// An unexpected character.
    #[error("unexpected character {found:?} at byte {at}")]
    Unexpected {
        /// The offending character.
        found: char,
        /// Byte offset into the input.
        at: usize,
    },

    /// An unknown node name.
    #[error("unknown node name {0:?}")]
    UnknownTag(String),

    /// An integer field failed to parse.
    #[error("invalid integer at byte {at}")]
    InvalidInteger {
        /// Byte offset into the input.
        at: usize,
    },

    /// A match node with no branches.
    #[error("match must have at least one branch")]
    EmptyMatch,

    /// Input continued past the end of the term.
    #[error("trailing input after term")]
    Trailing,

    /// The text described a pattern that violates a construction
    /// invariant.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Serialize an expression to its stable text form.
#[must_use]
pub fn serialize(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

/// Serialize a pattern to its stable text form.
#[must_use]
pub fn serialize_pattern(pattern: &Pattern) -> String {
    let mut out = String::new();
    write_pattern(&mut out, pattern);
    out
}

/// Parse an expression from its stable text form.
///
/// # Errors
///
/// Returns [`ParseError`] on malformed input or trailing text.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut reader = Reader::new(input);
    let expr = reader.expr()?;
    reader.finish()?;
    Ok(expr)
}

/// Parse a pattern from its stable text form.
///
/// # Errors
///
/// Returns [`ParseError`] on malformed input or trailing text.
pub fn parse_pattern(input: &str) -> Result<Pattern, ParseError> {
    let mut reader = Reader::new(input);
    let pattern = reader.pattern()?;
    reader.finish()?;
    Ok(pattern)
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::App(func, arg) => {
            out.push_str("App(");
            write_expr(out, func);
            out.push(',');
            write_expr(out, arg);
            out.push(')');
        }
        Expr::External(pack, name, typ) => {
            out.push_str("ExternalVar(");
            write_quoted(out, pack.as_str());
            out.push(',');
            write_quoted(out, name.as_str());
            out.push(',');
            write_quoted(out, typ.as_str());
            out.push(')');
        }
        Expr::Match(arg, branches) => {
            out.push_str("Match(");
            write_expr(out, arg);
            for (pattern, body) in branches {
                out.push(',');
                write_pattern(out, pattern);
                out.push(',');
                write_expr(out, body);
            }
            out.push(')');
        }
        Expr::LambdaVar(idx) => {
            let _ = write!(out, "LambdaVar({idx})");
        }
        Expr::Lambda(body) => {
            out.push_str("Lambda(");
            write_expr(out, body);
            out.push(')');
        }
        Expr::Struct(tag, args, family) => {
            let _ = write!(out, "Struct({tag},{family}");
            for arg in args {
                out.push(',');
                write_expr(out, arg);
            }
            out.push(')');
        }
        Expr::Literal(lit) => write_literal(out, lit),
        Expr::Recursion(inner) => {
            out.push_str("Recursion(");
            write_expr(out, inner);
            out.push(')');
        }
    }
}

fn write_pattern(out: &mut String, pattern: &Pattern) {
    match pattern {
        Pattern::WildCard => out.push_str("WildCard"),
        Pattern::Literal(lit) => write_literal(out, lit),
        Pattern::Var(slot) => {
            let _ = write!(out, "Var({slot})");
        }
        Pattern::Named(slot, inner) => {
            let _ = write!(out, "Named({slot},");
            write_pattern(out, inner);
            out.push(')');
        }
        Pattern::ListPat(parts) => {
            out.push_str("ListPat(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                match part {
                    ListPart::Splice(None) => out.push_str("Left(None)"),
                    ListPart::Splice(Some(slot)) => {
                        let _ = write!(out, "Left(Some({slot}))");
                    }
                    ListPart::Item(pat) => {
                        out.push_str("Right(");
                        write_pattern(out, pat);
                        out.push(')');
                    }
                }
            }
            out.push(')');
        }
        Pattern::PositionalStruct { tag, params, family } => {
            out.push_str("PositionalStruct(");
            match tag {
                None => out.push_str("None"),
                Some(idx) => {
                    let _ = write!(out, "Some({idx})");
                }
            }
            let _ = write!(out, ",{family}");
            for pat in params {
                out.push(',');
                write_pattern(out, pat);
            }
            out.push(')');
        }
        Pattern::Union(head, rest) => {
            out.push_str("Union(");
            write_pattern(out, head);
            for pat in rest {
                out.push(',');
                write_pattern(out, pat);
            }
            out.push(')');
        }
        Pattern::StrPat(parts) => {
            out.push_str("StrPat(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                match part {
                    StrPart::WildStr => out.push_str("WildStr"),
                    StrPart::NamedStr(slot) => {
                        let _ = write!(out, "NamedStr({slot})");
                    }
                    StrPart::LitStr(text) => {
                        out.push_str("LitStr(");
                        write_quoted(out, text);
                        out.push(')');
                    }
                }
            }
            out.push(')');
        }
    }
}

fn write_literal(out: &mut String, lit: &Lit) {
    match lit {
        Lit::Integer(n) => {
            let _ = write!(out, "Literal({n})");
        }
        Lit::Str(s) => {
            out.push_str("Literal(");
            write_quoted(out, s);
            out.push(')');
        }
    }
}

fn write_quoted(out: &mut String, text: &str) {
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('\'');
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Result<char, ParseError> {
        let c = self.peek().ok_or(ParseError::UnexpectedEnd)?;
        self.pos += c.len_utf8();
        Ok(c)
    }

    fn eat(&mut self, expected: char) -> Result<(), ParseError> {
        let at = self.pos;
        let found = self.bump()?;
        if found == expected {
            Ok(())
        } else {
            Err(ParseError::Unexpected { found, at })
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(ParseError::Trailing)
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn digits(&mut self) -> Result<&'a str, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(ParseError::InvalidInteger { at: start });
        }
        Ok(&self.src[start..self.pos])
    }

    fn index(&mut self) -> Result<usize, ParseError> {
        let at = self.pos;
        self.digits()?
            .parse()
            .map_err(|_| ParseError::InvalidInteger { at })
    }

    fn tag(&mut self) -> Result<u32, ParseError> {
        let at = self.pos;
        self.digits()?
            .parse()
            .map_err(|_| ParseError::InvalidInteger { at })
    }

    fn bigint(&mut self) -> Result<BigInt, ParseError> {
        let at = self.pos;
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        self.digits()?;
        BigInt::from_str(&self.src[start..self.pos])
            .map_err(|_| ParseError::InvalidInteger { at })
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        self.eat('\'')?;
        let mut text = String::new();
        loop {
            let at = self.pos;
            match self.bump()? {
                '\'' => return Ok(text),
                '\\' => match self.bump()? {
                    c @ ('\'' | '\\') => text.push(c),
                    found => return Err(ParseError::Unexpected { found, at }),
                },
                other => text.push(other),
            }
        }
    }

    fn opt_tag(&mut self) -> Result<Option<u32>, ParseError> {
        let at = self.pos;
        match self.ident().as_str() {
            "None" => Ok(None),
            "Some" => {
                self.eat('(')?;
                let value = self.tag()?;
                self.eat(')')?;
                Ok(Some(value))
            }
            found => Err(ParseError::Unexpected {
                found: found.chars().next().unwrap_or('\0'),
                at,
            }),
        }
    }

    fn opt_index(&mut self) -> Result<Option<usize>, ParseError> {
        let at = self.pos;
        match self.ident().as_str() {
            "None" => Ok(None),
            "Some" => {
                self.eat('(')?;
                let value = self.index()?;
                self.eat(')')?;
                Ok(Some(value))
            }
            found => Err(ParseError::Unexpected {
                found: found.chars().next().unwrap_or('\0'),
                at,
            }),
        }
    }

    fn family(&mut self) -> Result<DataFamily, ParseError> {
        let name = self.ident();
        match name.as_str() {
            "Enum" => Ok(DataFamily::Enum),
            "Struct" => Ok(DataFamily::Struct),
            "Nat" => Ok(DataFamily::Nat),
            other => Err(ParseError::UnknownTag(other.to_string())),
        }
    }

    fn literal(&mut self) -> Result<Lit, ParseError> {
        self.eat('(')?;
        let lit = if self.peek() == Some('\'') {
            Lit::Str(self.quoted()?)
        } else {
            Lit::Integer(self.bigint()?)
        };
        self.eat(')')?;
        Ok(lit)
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let name = self.ident();
        match name.as_str() {
            "App" => {
                self.eat('(')?;
                let func = self.expr()?;
                self.eat(',')?;
                let arg = self.expr()?;
                self.eat(')')?;
                Ok(Expr::app(func, arg))
            }
            "ExternalVar" => {
                self.eat('(')?;
                let pack = self.quoted()?;
                self.eat(',')?;
                let var = self.quoted()?;
                self.eat(',')?;
                let typ = self.quoted()?;
                self.eat(')')?;
                Ok(Expr::External(
                    PackageName::new(&pack),
                    Symbol::intern(&var),
                    TypeRef::new(&typ),
                ))
            }
            "Match" => {
                self.eat('(')?;
                let arg = self.expr()?;
                let mut branches = Vec::new();
                while self.peek() == Some(',') {
                    self.pos += 1;
                    let pattern = self.pattern()?;
                    self.eat(',')?;
                    let body = self.expr()?;
                    branches.push((pattern, body));
                }
                self.eat(')')?;
                if branches.is_empty() {
                    return Err(ParseError::EmptyMatch);
                }
                Ok(Expr::Match(Box::new(arg), branches))
            }
            "LambdaVar" => {
                self.eat('(')?;
                let idx = self.index()?;
                self.eat(')')?;
                Ok(Expr::LambdaVar(idx))
            }
            "Lambda" => {
                self.eat('(')?;
                let body = self.expr()?;
                self.eat(')')?;
                Ok(Expr::lambda(body))
            }
            "Struct" => {
                self.eat('(')?;
                let tag = self.tag()?;
                self.eat(',')?;
                let family = self.family()?;
                let mut args = Vec::new();
                while self.peek() == Some(',') {
                    self.pos += 1;
                    args.push(self.expr()?);
                }
                self.eat(')')?;
                Ok(Expr::Struct(tag, args, family))
            }
            "Literal" => Ok(Expr::Literal(self.literal()?)),
            "Recursion" => {
                self.eat('(')?;
                let inner = self.expr()?;
                self.eat(')')?;
                Ok(Expr::Recursion(Box::new(inner)))
            }
            other => Err(ParseError::UnknownTag(other.to_string())),
        }
    }

    fn pattern(&mut self) -> Result<Pattern, ParseError> {
        let name = self.ident();
        match name.as_str() {
            "WildCard" => Ok(Pattern::WildCard),
            "Literal" => Ok(Pattern::Literal(self.literal()?)),
            "Var" => {
                self.eat('(')?;
                let slot = self.index()?;
                self.eat(')')?;
                Ok(Pattern::Var(slot))
            }
            "Named" => {
                self.eat('(')?;
                let slot = self.index()?;
                self.eat(',')?;
                let inner = self.pattern()?;
                self.eat(')')?;
                Ok(Pattern::Named(slot, Box::new(inner)))
            }
            "ListPat" => {
                self.eat('(')?;
                let mut parts = Vec::new();
                if self.peek() != Some(')') {
                    loop {
                        parts.push(self.list_part()?);
                        if self.peek() == Some(',') {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.eat(')')?;
                Ok(Pattern::list(parts)?)
            }
            "PositionalStruct" => {
                self.eat('(')?;
                let tag = self.opt_tag()?;
                self.eat(',')?;
                let family = self.family()?;
                let mut params = Vec::new();
                while self.peek() == Some(',') {
                    self.pos += 1;
                    params.push(self.pattern()?);
                }
                self.eat(')')?;
                Ok(Pattern::PositionalStruct { tag, params, family })
            }
            "Union" => {
                self.eat('(')?;
                let head = self.pattern()?;
                let mut rest = Vec::new();
                while self.peek() == Some(',') {
                    self.pos += 1;
                    rest.push(self.pattern()?);
                }
                self.eat(')')?;
                Ok(Pattern::union(head, rest)?)
            }
            "StrPat" => {
                self.eat('(')?;
                let mut parts = Vec::new();
                if self.peek() != Some(')') {
                    loop {
                        parts.push(self.str_part()?);
                        if self.peek() == Some(',') {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.eat(')')?;
                Ok(Pattern::string(parts)?)
            }
            other => Err(ParseError::UnknownTag(other.to_string())),
        }
    }

    fn list_part(&mut self) -> Result<ListPart, ParseError> {
        let name = self.ident();
        match name.as_str() {
            "Left" => {
                self.eat('(')?;
                let slot = self.opt_index()?;
                self.eat(')')?;
                Ok(ListPart::Splice(slot))
            }
            "Right" => {
                self.eat('(')?;
                let pattern = self.pattern()?;
                self.eat(')')?;
                Ok(ListPart::Item(pattern))
            }
            other => Err(ParseError::UnknownTag(other.to_string())),
        }
    }

    fn str_part(&mut self) -> Result<StrPart, ParseError> {
        let name = self.ident();
        match name.as_str() {
            "WildStr" => Ok(StrPart::WildStr),
            "NamedStr" => {
                self.eat('(')?;
                let slot = self.index()?;
                self.eat(')')?;
                Ok(StrPart::NamedStr(slot))
            }
            "LitStr" => {
                self.eat('(')?;
                let text = self.quoted()?;
                self.eat(')')?;
                Ok(StrPart::LitStr(text))
            }
            other => Err(ParseError::UnknownTag(other.to_string())),
        }
    }
}
