//! Constructor synthesis.
//!
//! A constructor reference lowers to an eta-expanded lambda term that
//! builds the tagged structure: one lambda per argument, with the struct
//! referencing the binders in declaration order. Partial applications
//! then reduce by ordinary beta steps.

use rill_core::Expr;
use rill_hir::DataType;

/// The lambda term for constructor `index` of `data`.
///
/// For arity `a` the term is `a` nested lambdas around
/// `Struct(index, [LambdaVar(a-1), ..., LambdaVar(0)], family)`, so the
/// first-declared argument binds outermost. A zero-arity constructor is
/// just the bare struct.
#[must_use]
pub fn constructor_expr(data: &DataType, index: usize) -> Expr {
    let arity = data.constructors[index].arity;
    let args = (0..arity).rev().map(Expr::LambdaVar).collect();
    let mut expr = Expr::Struct(index as u32, args, data.family);
    for _ in 0..arity {
        expr = Expr::lambda(expr);
    }
    expr
}
