//! Index shifting and capture-avoiding substitution.
//!
//! Both operations are plain structural recursion over [`Expr`]. A
//! [`Expr::Lambda`] adjusts the cutoff/target index on the way down;
//! match branch bodies carry their own lambda wrappers (one per bound
//! pattern slot), so at the `Match` node itself nothing special happens.

use crate::expr::Expr;

/// Shift every free `LambdaVar(i)` with `i >= cutoff` up by one.
///
/// Used when an expression moves under one additional binder.
#[must_use]
pub fn shift(expr: &Expr, cutoff: usize) -> Expr {
    match expr {
        Expr::App(func, arg) => Expr::app(shift(func, cutoff), shift(arg, cutoff)),
        Expr::External(..) | Expr::Literal(_) => expr.clone(),
        Expr::Match(arg, branches) => Expr::Match(
            Box::new(shift(arg, cutoff)),
            branches
                .iter()
                .map(|(pat, body)| (pat.clone(), shift(body, cutoff)))
                .collect(),
        ),
        Expr::LambdaVar(idx) => {
            if *idx >= cutoff {
                Expr::LambdaVar(idx + 1)
            } else {
                expr.clone()
            }
        }
        Expr::Lambda(body) => Expr::lambda(shift(body, cutoff + 1)),
        Expr::Struct(tag, args, family) => Expr::Struct(
            *tag,
            args.iter().map(|arg| shift(arg, cutoff)).collect(),
            *family,
        ),
        Expr::Recursion(inner) => Expr::Recursion(Box::new(shift(inner, cutoff))),
    }
}

/// Substitute for the free variable `idx`, compressing the hole.
///
/// `LambdaVar(idx)` becomes `replacement`; indices above `idx` shift down
/// by one; indices below are untouched. Under a lambda the target index
/// grows and the replacement is shifted to avoid capture.
///
/// A `None` replacement is only legal when the callers have established
/// that `LambdaVar(idx)` cannot occur (the fixpoint unfold checks the
/// body is closed first), so hitting the hole with no replacement is a
/// rewriter bug and panics.
#[must_use]
pub fn substitute(expr: &Expr, replacement: Option<&Expr>, idx: usize) -> Expr {
    match expr {
        Expr::App(func, arg) => Expr::app(
            substitute(func, replacement, idx),
            substitute(arg, replacement, idx),
        ),
        Expr::External(..) | Expr::Literal(_) => expr.clone(),
        Expr::Match(arg, branches) => Expr::Match(
            Box::new(substitute(arg, replacement, idx)),
            branches
                .iter()
                .map(|(pat, body)| (pat.clone(), substitute(body, replacement, idx)))
                .collect(),
        ),
        Expr::LambdaVar(var) => {
            if *var == idx {
                replacement
                    .expect("substitution hole reached with no replacement")
                    .clone()
            } else if *var > idx {
                Expr::LambdaVar(var - 1)
            } else {
                expr.clone()
            }
        }
        Expr::Lambda(body) => {
            let shifted = replacement.map(|r| shift(r, 0));
            Expr::lambda(substitute(body, shifted.as_ref(), idx + 1))
        }
        Expr::Struct(tag, args, family) => Expr::Struct(
            *tag,
            args.iter()
                .map(|arg| substitute(arg, replacement, idx))
                .collect(),
            *family,
        ),
        Expr::Recursion(inner) => Expr::Recursion(Box::new(substitute(inner, replacement, idx))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_var(idx: usize) -> Expr {
        Expr::LambdaVar(idx)
    }

    #[test]
    fn test_shift_respects_cutoff() {
        assert_eq!(shift(&mk_var(0), 0), mk_var(1));
        assert_eq!(shift(&mk_var(0), 1), mk_var(0));
        assert_eq!(shift(&mk_var(3), 2), mk_var(4));
    }

    #[test]
    fn test_shift_under_lambda() {
        // \. (0 1): 0 is bound, 1 is free and shifts
        let e = Expr::lambda(Expr::app(mk_var(0), mk_var(1)));
        let shifted = shift(&e, 0);
        assert_eq!(shifted, Expr::lambda(Expr::app(mk_var(0), mk_var(2))));
    }

    #[test]
    fn test_substitute_hits_target() {
        let result = substitute(&mk_var(0), Some(&Expr::integer(42)), 0);
        assert_eq!(result, Expr::integer(42));
    }

    #[test]
    fn test_substitute_compresses_above() {
        assert_eq!(substitute(&mk_var(3), Some(&Expr::integer(1)), 1), mk_var(2));
        assert_eq!(substitute(&mk_var(0), Some(&Expr::integer(1)), 1), mk_var(0));
    }

    #[test]
    fn test_substitute_avoids_capture() {
        // (\. 1)[0 := 0]: the replacement must shift under the binder,
        // so the free 1 becomes the shifted replacement.
        let body = Expr::lambda(mk_var(1));
        let result = substitute(&body, Some(&mk_var(0)), 0);
        assert_eq!(result, Expr::lambda(mk_var(1)));
    }

    #[test]
    fn test_substitute_none_decrements() {
        // With no replacement, indices above the hole still compress.
        let e = Expr::app(mk_var(1), mk_var(2));
        let result = substitute(&e, None, 0);
        assert_eq!(result, Expr::app(mk_var(0), mk_var(1)));
    }
}
