//! Lowering context: conversion environment, memoization and budget.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use rill_core::{normalize, shift, Budget, Expr, NormalizeConfig};
use rill_hir::{PackageMap, RecursionKind, TypedExpr};
use rill_intern::{PackageName, Symbol};

use crate::expr::lower_expr;
use crate::synth::constructor_expr;
use crate::{LowerError, LowerResult};

/// The tag computed for a lowered expression: its normalized IR plus the
/// set of sub-IRs reachable from it.
///
/// Downstream systems use the children set to enumerate every inner
/// expression worth hashing. For a top-level binding the set closes over
/// all structural subterms of the normalized IR as well as the IRs of
/// every conversion step that fed into it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprTag {
    /// The normalized IR.
    pub ir: Expr,
    /// Sub-IRs reachable from this binding.
    pub children: FxHashSet<Expr>,
}

impl ExprTag {
    /// A tag with no recorded children.
    #[must_use]
    pub fn leaf(ir: Expr) -> Self {
        Self {
            ir,
            children: FxHashSet::default(),
        }
    }

    /// The tag as seen from under one additional binder: every free
    /// index in the IR and its children moves up by one.
    fn shifted(&self) -> Self {
        Self {
            ir: shift(&self.ir, 0),
            children: self.children.iter().map(|c| shift(c, 0)).collect(),
        }
    }
}

/// The conversion environment: known names and their tags.
///
/// Entering a binder shifts every known tag outward (their free indices
/// now reach across one more lambda) and binds the new names to fresh
/// indices. The environment is a value; branches and lambda bodies get
/// their own extended copies.
#[derive(Clone, Default)]
pub(crate) struct Env {
    names: FxHashMap<Symbol, ExprTag>,
}

impl Env {
    pub(crate) fn lookup(&self, name: Symbol) -> Option<&ExprTag> {
        self.names.get(&name)
    }

    /// Extend with a value binding (a non-recursive let); no binder is
    /// introduced, so nothing shifts.
    pub(crate) fn bind_value(&self, name: Symbol, tag: ExprTag) -> Env {
        let mut names = self.names.clone();
        names.insert(name, tag);
        Env { names }
    }

    /// Enter `binders.len()` new binders at once, as a match branch does:
    /// existing tags shift outward once per binder, and `binders[i]`
    /// becomes `LambdaVar(i)`, so the first name is the innermost binder.
    pub(crate) fn bind_binders(&self, binders: &[Symbol]) -> Env {
        let mut names: FxHashMap<Symbol, ExprTag> = self
            .names
            .iter()
            .map(|(name, tag)| {
                let mut shifted = tag.clone();
                for _ in 0..binders.len() {
                    shifted = shifted.shifted();
                }
                (*name, shifted)
            })
            .collect();
        for (slot, name) in binders.iter().enumerate() {
            names.insert(*name, ExprTag::leaf(Expr::LambdaVar(slot)));
        }
        Env { names }
    }

    /// Enter a single lambda binder.
    pub(crate) fn bind_lambda(&self, arg: Symbol) -> Env {
        self.bind_binders(&[arg])
    }
}

/// State for lowering one package map: the memo table, the per-binding
/// rewrite budget, and the configuration.
pub struct LowerContext<'a> {
    pub(crate) packages: &'a PackageMap,
    config: NormalizeConfig,
    memo: FxHashMap<(PackageName, Symbol), ExprTag>,
    in_progress: FxHashSet<(PackageName, Symbol)>,
    budget: Budget,
}

impl<'a> LowerContext<'a> {
    /// Create a context over a package map.
    #[must_use]
    pub fn new(packages: &'a PackageMap, config: NormalizeConfig) -> Self {
        Self {
            packages,
            config,
            memo: FxHashMap::default(),
            in_progress: FxHashSet::default(),
            budget: Budget::new(config),
        }
    }

    /// Normalize against the current binding's budget.
    pub(crate) fn normalize(&mut self, expr: &Expr) -> LowerResult<Expr> {
        Ok(normalize(expr, &mut self.budget)?)
    }

    /// Lower one top-level binding, memoized by `(package, name)`.
    ///
    /// Each binding gets a fresh rewrite budget; a binding referenced
    /// while it is itself being lowered is a cycle the fixpoint wrapper
    /// cannot express, and is reported as an error.
    pub(crate) fn lower_top_binding(
        &mut self,
        pack: PackageName,
        name: Symbol,
        kind: RecursionKind,
        source: &TypedExpr,
    ) -> LowerResult<ExprTag> {
        let key = (pack, name);
        if let Some(tag) = self.memo.get(&key) {
            return Ok(tag.clone());
        }
        if !self.in_progress.insert(key) {
            return Err(LowerError::CircularReference {
                package: pack,
                name,
            });
        }

        let outer_budget = std::mem::replace(&mut self.budget, Budget::new(self.config));
        let result = self.lower_binding_value(pack, name, kind, source);
        let steps_left = self.budget.remaining();
        self.budget = outer_budget;
        self.in_progress.remove(&key);

        let tag = result?;
        debug!(package = %pack, name = %name, steps_left, "lowered binding");
        self.memo.insert(key, tag.clone());
        Ok(tag)
    }

    fn lower_binding_value(
        &mut self,
        pack: PackageName,
        name: Symbol,
        kind: RecursionKind,
        source: &TypedExpr,
    ) -> LowerResult<ExprTag> {
        let tag = match kind {
            RecursionKind::NonRecursive => lower_expr(self, pack, &Env::default(), source)?,
            RecursionKind::Recursive => {
                // The binding may reference itself: convert under a
                // binder for the name and close it with a fixpoint.
                let env = Env::default().bind_lambda(name);
                let inner = lower_expr(self, pack, &env, source)?;
                let raw = Expr::Recursion(Box::new(Expr::lambda(inner.ir.clone())));
                let ir = self.normalize(&raw)?;
                let mut children = inner.children;
                children.insert(inner.ir);
                ExprTag { ir, children }
            }
        };

        // Close the children set over everything structurally reachable
        // from the normalized IR, so a cache can enumerate it all.
        let mut children = tag.children;
        children.extend(tag.ir.subterms());
        Ok(ExprTag {
            ir: tag.ir,
            children,
        })
    }

    /// Resolve a name at package level: top-level lets, externals,
    /// constructors, then imports.
    pub(crate) fn resolve_name(
        &mut self,
        pack: PackageName,
        name: Symbol,
    ) -> LowerResult<ExprTag> {
        let packages = self.packages;
        let package = packages.get(pack).ok_or(LowerError::UnknownPackage(pack))?;

        if let Some((kind, source)) = package.let_binding(name) {
            return self.lower_top_binding(pack, name, kind, source);
        }
        if let Some(typ) = package.external(name) {
            return Ok(ExprTag::leaf(Expr::External(pack, name, typ)));
        }
        if let Some((data, index)) = package.constructor(name) {
            return Ok(ExprTag::leaf(constructor_expr(data, index)));
        }
        if let Some(import) = package.import(name) {
            return self.resolve_name(import.from, import.original);
        }
        Err(LowerError::UnknownName {
            package: pack,
            name,
        })
    }
}
