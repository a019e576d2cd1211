//! Head reduction and normal-order reduction to fixpoint.
//!
//! [`head_reduce`] rewrites the leftmost-outermost redex until the head
//! is stable, trying the rules in a fixed order: beta, match, fixpoint
//! unfold, eta. [`normalize`] alternates head reduction with structural
//! descent into children and repeats until nothing changes; a child that
//! normalizes to a constructor can re-enable a match at the head, so the
//! outer loop is a genuine fixpoint.
//!
//! Reduction terminates on well-typed input, but every head step spends
//! from a [`Budget`] so malformed or adversarial terms fail with
//! [`NormalizeError::BudgetExceeded`] instead of looping.

use thiserror::Error;
use tracing::trace;

use crate::expr::Expr;
use crate::matcher::{find_match, solve_match};
use crate::subst::substitute;

/// Tunables for normalization.
#[derive(Clone, Copy, Debug)]
pub struct NormalizeConfig {
    /// Maximum number of head-reduction steps per top-level binding.
    pub max_steps: u64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { max_steps: 10_000 }
    }
}

/// Errors produced by the rewriter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The step budget ran out before a normal form was reached.
    #[error("rewrite budget exceeded after {limit} steps")]
    BudgetExceeded {
        /// The configured step limit.
        limit: u64,
    },
}

/// A countdown of rewrite steps.
///
/// One budget covers all the normalization a single top-level binding
/// needs; it is decremented before each head-reduction step.
#[derive(Clone, Copy, Debug)]
pub struct Budget {
    limit: u64,
    remaining: u64,
}

impl Budget {
    /// Create a budget from a configuration.
    #[must_use]
    pub fn new(config: NormalizeConfig) -> Self {
        Self {
            limit: config.max_steps,
            remaining: config.max_steps,
        }
    }

    /// Steps left before the budget is exhausted.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Spend one step.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::BudgetExceeded`] once the budget is
    /// exhausted.
    pub fn spend(&mut self) -> Result<(), NormalizeError> {
        if self.remaining == 0 {
            return Err(NormalizeError::BudgetExceeded { limit: self.limit });
        }
        self.remaining -= 1;
        Ok(())
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(NormalizeConfig::default())
    }
}

impl From<NormalizeConfig> for Budget {
    fn from(config: NormalizeConfig) -> Self {
        Self::new(config)
    }
}

/// Apply one head rule if any fires.
///
/// Rule order is fixed: beta, match, fixpoint unfold, eta. The fixpoint
/// and eta rules require the inner term to be closed under the enclosing
/// binder, otherwise removing the binder would capture.
fn head_step(expr: &Expr) -> Option<Expr> {
    // Beta: (\. b) a  →  b[0 := a]
    if let Expr::App(func, arg) = expr {
        if let Expr::Lambda(body) = func.as_ref() {
            trace!(rule = "beta", "head step");
            return Some(substitute(body, Some(arg), 0));
        }
    }

    // Match: rewrite to the first provably matching branch, applied to
    // its bindings. An undecidable branch leaves the match in place.
    if let Expr::Match(arg, branches) = expr {
        if let Some((pattern, env, body)) = find_match(arg.as_ref(), branches) {
            trace!(rule = "match", "head step");
            return Some(solve_match(&env, pattern, body));
        }
    }

    // Fixpoint unfold: drop an unused self-reference.
    if let Expr::Recursion(inner) = expr {
        if let Expr::Lambda(body) = inner.as_ref() {
            if body.is_closed() {
                trace!(rule = "fix", "head step");
                return Some(substitute(body, None, 0));
            }
        }
    }

    // Eta: \. (f 0)  →  f, when f does not use the binder.
    if let Expr::Lambda(body) = expr {
        if let Expr::App(func, arg) = body.as_ref() {
            if matches!(arg.as_ref(), Expr::LambdaVar(0)) && func.is_closed() {
                trace!(rule = "eta", "head step");
                return Some(substitute(func, Some(&Expr::LambdaVar(0)), 0));
            }
        }
    }

    None
}

/// Rewrite the head of `expr` until no head rule fires.
///
/// # Errors
///
/// Returns [`NormalizeError::BudgetExceeded`] if the budget runs out.
pub fn head_reduce(expr: &Expr, budget: &mut Budget) -> Result<Expr, NormalizeError> {
    let mut current = expr.clone();
    while let Some(next) = head_step(&current) {
        budget.spend()?;
        current = next;
    }
    Ok(current)
}

/// Reduce `expr` to normal form under normal-order reduction.
///
/// Head-reduces, then normalizes each child, and repeats while the term
/// keeps changing: a normalized scrutinee may become a constructor and
/// re-enable a match at the head. The outer fixpoint is iterative.
///
/// # Errors
///
/// Returns [`NormalizeError::BudgetExceeded`] if the budget runs out.
pub fn normalize(expr: &Expr, budget: &mut Budget) -> Result<Expr, NormalizeError> {
    let mut current = expr.clone();
    loop {
        let head = head_reduce(&current, budget)?;
        let descended = normalize_children(&head, budget)?;
        if descended == head {
            return Ok(descended);
        }
        current = descended;
    }
}

fn normalize_children(expr: &Expr, budget: &mut Budget) -> Result<Expr, NormalizeError> {
    Ok(match expr {
        Expr::App(func, arg) => Expr::app(normalize(func, budget)?, normalize(arg, budget)?),
        Expr::Match(arg, branches) => {
            let arg = normalize(arg, budget)?;
            let branches = branches
                .iter()
                .map(|(pat, body)| Ok((pat.clone(), normalize(body, budget)?)))
                .collect::<Result<Vec<_>, NormalizeError>>()?;
            Expr::Match(Box::new(arg), branches)
        }
        Expr::Lambda(body) => Expr::lambda(normalize(body, budget)?),
        Expr::Recursion(inner) => Expr::Recursion(Box::new(normalize(inner, budget)?)),
        Expr::Struct(tag, args, family) => {
            let args = args
                .iter()
                .map(|arg| normalize(arg, budget))
                .collect::<Result<Vec<_>, NormalizeError>>()?;
            Expr::Struct(*tag, args, *family)
        }
        Expr::External(..) | Expr::Literal(_) | Expr::LambdaVar(_) => expr.clone(),
    })
}
