//! The let-free expression IR.
//!
//! Expressions are an untyped lambda calculus with de Bruijn indices:
//! `LambdaVar(0)` refers to the nearest enclosing binder. Multi-argument
//! functions are curried, `let` has been compiled away by the converter,
//! and recursive values are wrapped in an explicit [`Expr::Recursion`]
//! fixpoint node. Data constructor applications become [`Expr::Struct`]
//! nodes tagged with their constructor index.

use std::fmt;

use num_bigint::BigInt;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use rill_intern::{PackageName, Symbol, TypeRef};

use crate::pattern::Pattern;

/// Which kind of data declaration a structured value came from.
///
/// This is an advisory marker for downstream consumers (a code generator
/// may unbox `Nat`s, or skip the tag word for single-constructor
/// `Struct`s); it never affects reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFamily {
    /// A multi-constructor enum; the tag selects the constructor.
    Enum,
    /// A single-constructor struct.
    Struct,
    /// A natural number declared in unary style (zero/successor).
    Nat,
}

impl fmt::Display for DataFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum => f.write_str("Enum"),
            Self::Struct => f.write_str("Struct"),
            Self::Nat => f.write_str("Nat"),
        }
    }
}

/// A literal value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lit {
    /// An arbitrary-precision integer.
    Integer(BigInt),
    /// A unicode string.
    Str(String),
}

impl Lit {
    /// Create an integer literal from anything convertible to a [`BigInt`].
    pub fn integer(n: impl Into<BigInt>) -> Self {
        Self::Integer(n.into())
    }

    /// Create a string literal.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
}

/// A let-free IR expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Function application.
    App(Box<Expr>, Box<Expr>),

    /// A reference to an externally-defined value, carrying its package,
    /// name and rendered type.
    External(PackageName, Symbol, TypeRef),

    /// A pattern match. Branches are ordered and nonempty; each branch
    /// body is wrapped in one [`Expr::Lambda`] per name its pattern binds,
    /// innermost lambda for slot 0.
    Match(Box<Expr>, Vec<(Pattern, Expr)>),

    /// A de Bruijn index; `0` is the innermost enclosing binder.
    LambdaVar(usize),

    /// A single-argument function.
    Lambda(Box<Expr>),

    /// A constructed value: constructor tag, arguments in declaration
    /// order, and the advisory family marker.
    Struct(u32, Vec<Expr>, DataFamily),

    /// A literal.
    Literal(Lit),

    /// The fixpoint operator. The inner expression is a [`Expr::Lambda`]
    /// binding the self-reference in well-formed input.
    Recursion(Box<Expr>),
}

impl Expr {
    /// Build an application node.
    #[must_use]
    pub fn app(func: Expr, arg: Expr) -> Self {
        Self::App(Box::new(func), Box::new(arg))
    }

    /// Build a lambda node.
    #[must_use]
    pub fn lambda(body: Expr) -> Self {
        Self::Lambda(Box::new(body))
    }

    /// Build an integer literal.
    pub fn integer(n: impl Into<BigInt>) -> Self {
        Self::Literal(Lit::Integer(n.into()))
    }

    /// Build a string literal.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Lit::Str(s.into()))
    }

    /// The empty cons-list.
    #[must_use]
    pub fn nil_list() -> Self {
        Self::Struct(0, Vec::new(), DataFamily::Enum)
    }

    /// A cons cell `head : tail`.
    #[must_use]
    pub fn cons_list(head: Expr, tail: Expr) -> Self {
        Self::Struct(1, vec![head, tail], DataFamily::Enum)
    }

    /// Build a cons-list from items, front to back.
    #[must_use]
    pub fn from_items(items: Vec<Expr>) -> Self {
        items
            .into_iter()
            .rev()
            .fold(Self::nil_list(), |tail, head| Self::cons_list(head, tail))
    }

    /// The largest index of a free `LambdaVar` in this term, or `None`
    /// when the term has no free lambda variable at all.
    ///
    /// Passing under a [`Expr::Lambda`] decrements the measure, so the
    /// value can go negative: a term is closed iff the result is `None`
    /// or negative (see [`Expr::is_closed`]). Match branch bodies carry
    /// their own lambda wrappers, so they contribute structurally.
    #[must_use]
    pub fn max_lambda_var(&self) -> Option<i64> {
        match self {
            Self::App(func, arg) => opt_max(func.max_lambda_var(), arg.max_lambda_var()),
            Self::External(..) | Self::Literal(_) => None,
            Self::Match(arg, branches) => branches
                .iter()
                .map(|(_, body)| body.max_lambda_var())
                .fold(arg.max_lambda_var(), opt_max),
            Self::LambdaVar(idx) => Some(*idx as i64),
            Self::Lambda(body) => body.max_lambda_var().map(|v| v - 1),
            Self::Struct(_, args, _) => args
                .iter()
                .map(Expr::max_lambda_var)
                .fold(None, opt_max),
            Self::Recursion(inner) => inner.max_lambda_var(),
        }
    }

    /// Whether this term references no enclosing binder.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self.max_lambda_var() {
            None => true,
            Some(v) => v < 0,
        }
    }

    /// The set of free de Bruijn indices in this term.
    ///
    /// Under `Lambda` and `Recursion` the indices shift down by one,
    /// dropping index 0; match branch bodies contribute through their own
    /// lambda wrappers, which realizes the shift by the pattern's
    /// bound-variable count.
    #[must_use]
    pub fn var_set(&self) -> FxHashSet<usize> {
        match self {
            Self::App(func, arg) => {
                let mut set = func.var_set();
                set.extend(arg.var_set());
                set
            }
            Self::External(..) | Self::Literal(_) => FxHashSet::default(),
            Self::Match(arg, branches) => {
                let mut set = arg.var_set();
                for (_, body) in branches {
                    set.extend(body.var_set());
                }
                set
            }
            Self::LambdaVar(idx) => {
                let mut set = FxHashSet::default();
                set.insert(*idx);
                set
            }
            Self::Lambda(body) => shift_down(body.var_set()),
            Self::Struct(_, args, _) => {
                let mut set = FxHashSet::default();
                for arg in args {
                    set.extend(arg.var_set());
                }
                set
            }
            Self::Recursion(inner) => shift_down(inner.var_set()),
        }
    }

    /// This term plus every structural descendant, as a set.
    ///
    /// Used to close an expression tag over all of its sub-IRs so a cache
    /// can enumerate every inner expression worth hashing.
    #[must_use]
    pub fn subterms(&self) -> FxHashSet<Expr> {
        let mut set = FxHashSet::default();
        self.collect_subterms(&mut set);
        set
    }

    fn collect_subterms(&self, set: &mut FxHashSet<Expr>) {
        if !set.insert(self.clone()) {
            return;
        }
        match self {
            Self::App(func, arg) => {
                func.collect_subterms(set);
                arg.collect_subterms(set);
            }
            Self::Match(arg, branches) => {
                arg.collect_subterms(set);
                for (_, body) in branches {
                    body.collect_subterms(set);
                }
            }
            Self::Lambda(body) | Self::Recursion(body) => body.collect_subterms(set),
            Self::Struct(_, args, _) => {
                for arg in args {
                    arg.collect_subterms(set);
                }
            }
            Self::External(..) | Self::Literal(_) | Self::LambdaVar(_) => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::serialize::serialize(self))
    }
}

fn opt_max(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (some @ Some(_), None) | (None, some @ Some(_)) => some,
        (None, None) => None,
    }
}

fn shift_down(set: FxHashSet<usize>) -> FxHashSet<usize> {
    set.into_iter()
        .filter(|&idx| idx > 0)
        .map(|idx| idx - 1)
        .collect()
}
