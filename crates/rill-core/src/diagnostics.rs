//! Diagnostics over normalized terms.
//!
//! The rewriter never fails on an unmatched scrutinee; it simply leaves
//! the `Match` in place. When the scrutinee is a fully-known value that
//! still matches no branch, that is a genuine non-exhaustive match worth
//! reporting. This pass finds those nodes and returns them as values so
//! a driver can render them however it likes.

use crate::expr::Expr;
use crate::matcher::find_match;

/// A match over a fully-known value that no branch provably accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonExhaustiveMatch {
    /// The fully-known scrutinee.
    pub scrutinee: Expr,
    /// How many branches the match carried.
    pub branch_count: usize,
}

/// Scan a term for non-exhaustive matches over fully-known values.
///
/// A value is fully known when it is built from `Struct` and `Literal`
/// nodes alone; matches over anything opaque are legitimately
/// undecidable and not reported.
#[must_use]
pub fn check_exhaustive(expr: &Expr) -> Vec<NonExhaustiveMatch> {
    let mut found = Vec::new();
    scan(expr, &mut found);
    found
}

fn scan(expr: &Expr, found: &mut Vec<NonExhaustiveMatch>) {
    match expr {
        Expr::App(func, arg) => {
            scan(func, found);
            scan(arg, found);
        }
        Expr::Match(arg, branches) => {
            if is_known_value(arg) && find_match(arg.as_ref(), branches).is_none() {
                found.push(NonExhaustiveMatch {
                    scrutinee: arg.as_ref().clone(),
                    branch_count: branches.len(),
                });
            }
            scan(arg, found);
            for (_, body) in branches {
                scan(body, found);
            }
        }
        Expr::Lambda(body) | Expr::Recursion(body) => scan(body, found),
        Expr::Struct(_, args, _) => {
            for arg in args {
                scan(arg, found);
            }
        }
        Expr::External(..) | Expr::Literal(_) | Expr::LambdaVar(_) => {}
    }
}

fn is_known_value(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::Struct(_, args, _) => args.iter().all(is_known_value),
        _ => false,
    }
}
