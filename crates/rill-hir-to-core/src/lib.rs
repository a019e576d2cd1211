//! # HIR to Core Lowering
//!
//! This crate transforms the typed, name-resolved AST into the let-free
//! core IR and normalizes every top-level binding.
//!
//! ## Key Transformations
//!
//! - **Name elimination**: lambda and let binders become de Bruijn
//!   indices; `let` disappears entirely (non-recursive bindings are
//!   carried in the conversion environment, recursive ones become
//!   explicit fixpoint nodes)
//! - **Branch binding**: each match branch body is wrapped in one lambda
//!   per bound pattern name, so match reduction is plain application
//! - **Constructor synthesis**: constructor references become
//!   eta-expanded lambda terms producing tagged structures
//! - **Tagging**: every lowered binding carries its normalized IR plus
//!   the set of reachable sub-IRs, for downstream caching
//!
//! Lowering is memoized per `(package, name)` and each top-level binding
//! gets its own rewrite budget.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod expr;
mod pattern;
pub mod synth;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use rill_core::{NormalizeConfig, NormalizeError, PatternError};
use rill_hir::{Package, PackageMap, RecursionKind, TypedExpr};
use rill_intern::{PackageName, Symbol};

pub use context::{ExprTag, LowerContext};

/// Errors that can occur during lowering.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum LowerError {
    /// A name that resolves to nothing in its package.
    #[error("unknown name `{name}` in package `{package}`")]
    UnknownName {
        /// The package the name was used in.
        package: PackageName,
        /// The unresolved name.
        name: Symbol,
    },

    /// A constructor pattern naming no known constructor.
    #[error("unknown constructor `{name}` in package `{package}`")]
    UnknownConstructor {
        /// The package the constructor was looked up in.
        package: PackageName,
        /// The unknown constructor name.
        name: Symbol,
    },

    /// A reference to a package the map does not contain.
    #[error("unknown package `{0}`")]
    UnknownPackage(PackageName),

    /// A constructor pattern with the wrong number of arguments.
    #[error("constructor `{name}` expects {expected} pattern arguments, found {found}")]
    PatternArity {
        /// The constructor's name.
        name: Symbol,
        /// Its declared arity.
        expected: usize,
        /// The number of sub-patterns supplied.
        found: usize,
    },

    /// Top-level bindings that refer to each other in a cycle.
    #[error("circular reference while lowering `{package}::{name}`")]
    CircularReference {
        /// The package of the re-entered binding.
        package: PackageName,
        /// The re-entered binding's name.
        name: Symbol,
    },

    /// The rewrite budget ran out while normalizing a binding.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// A surface pattern violated a construction invariant.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Result type for lowering operations.
pub type LowerResult<T> = Result<T, LowerError>;

/// A lowered top-level binding: the original typed expression plus its
/// normalized IR tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedBinding {
    /// The binding's name.
    pub name: Symbol,
    /// The binding's recursion kind.
    pub kind: RecursionKind,
    /// The typed expression as received from the type checker.
    pub source: TypedExpr,
    /// The normalized IR and its reachable sub-IRs.
    pub tag: ExprTag,
}

/// A fully lowered package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedPackage {
    /// The package's name.
    pub name: PackageName,
    /// Lowered bindings, in declaration order.
    pub bindings: Vec<TaggedBinding>,
}

/// Lower every package in the map, in insertion order.
///
/// # Errors
///
/// Returns the first [`LowerError`] encountered.
pub fn lower_package_map(
    map: &PackageMap,
    config: NormalizeConfig,
) -> LowerResult<Vec<TaggedPackage>> {
    let mut ctx = LowerContext::new(map, config);
    map.iter()
        .map(|package| lower_package_with(&mut ctx, package))
        .collect()
}

/// Lower a single package by name.
///
/// # Errors
///
/// Returns [`LowerError::UnknownPackage`] if the map has no such
/// package, or the first lowering error inside it.
pub fn lower_package(
    map: &PackageMap,
    name: PackageName,
    config: NormalizeConfig,
) -> LowerResult<TaggedPackage> {
    let package = map.get(name).ok_or(LowerError::UnknownPackage(name))?;
    let mut ctx = LowerContext::new(map, config);
    lower_package_with(&mut ctx, package)
}

#[instrument(skip(ctx, package), fields(package = %package.name))]
fn lower_package_with(
    ctx: &mut LowerContext<'_>,
    package: &Package,
) -> LowerResult<TaggedPackage> {
    let mut bindings = Vec::with_capacity(package.lets.len());
    for (name, kind, source) in &package.lets {
        let tag = ctx.lower_top_binding(package.name, *name, *kind, source)?;
        bindings.push(TaggedBinding {
            name: *name,
            kind: *kind,
            source: source.clone(),
            tag,
        });
    }
    Ok(TaggedPackage {
        name: package.name,
        bindings,
    })
}
