//! # Rill Core IR
//!
//! The let-free intermediate representation at the heart of the Rill
//! middle-end: an untyped lambda calculus with de Bruijn indices, extended
//! with structured data, literals, pattern matching and an explicit
//! fixpoint operator.
//!
//! ## Components
//!
//! - [`Expr`] / [`Pattern`]: the algebraic data model ([`expr`], [`pattern`])
//! - Capture-avoiding substitution and index shifting ([`subst`])
//! - A three-valued pattern matcher over pluggable value views ([`matcher`])
//! - Head reduction and normal-order reduction to fixpoint ([`normalize`])
//! - A round-trippable textual encoding used for cache keys ([`serialize`])
//! - Exhaustiveness diagnostics over normalized terms ([`diagnostics`])
//!
//! The IR is immutable: every rewrite returns fresh values, and terms are
//! compared structurally. Reduction is purely functional and single
//! threaded; the only resource is the rewrite step budget threaded through
//! [`normalize`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diagnostics;
pub mod expr;
pub mod matcher;
pub mod normalize;
pub mod pattern;
pub mod serialize;
pub mod subst;

pub use diagnostics::{check_exhaustive, NonExhaustiveMatch};
pub use expr::{DataFamily, Expr, Lit};
pub use matcher::{find_match, match_one, solve_match, Env, MatchValue, PatternMatch};
pub use normalize::{head_reduce, normalize, Budget, NormalizeConfig, NormalizeError};
pub use pattern::{ListPart, Pattern, PatternError, StrPart};
pub use serialize::{parse, parse_pattern, serialize, serialize_pattern, ParseError};
pub use subst::{shift, substitute};
