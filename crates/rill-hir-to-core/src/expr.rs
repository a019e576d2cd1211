//! Expression lowering: typed AST to let-free IR, normalizing as it
//! goes.

use rustc_hash::FxHashSet;

use rill_core::Expr;
use rill_hir::{RecursionKind, TypedExpr};
use rill_intern::PackageName;

use crate::context::{Env, ExprTag, LowerContext};
use crate::pattern::lower_pattern;
use crate::LowerResult;

/// Lower one typed expression in the given environment.
///
/// Every constructed node is normalized immediately; the tag's children
/// accumulate the IRs (and transitive children) of the conversion steps
/// that fed into it.
pub(crate) fn lower_expr(
    ctx: &mut LowerContext<'_>,
    pack: PackageName,
    env: &Env,
    expr: &TypedExpr,
) -> LowerResult<ExprTag> {
    match expr {
        TypedExpr::Local(name) => {
            if let Some(tag) = env.lookup(*name) {
                return Ok(tag.clone());
            }
            ctx.resolve_name(pack, *name)
        }

        TypedExpr::Global(package, name) => ctx.resolve_name(*package, *name),

        TypedExpr::Lambda(arg, body) => {
            let body_tag = lower_expr(ctx, pack, &env.bind_lambda(*arg), body)?;
            let raw = Expr::lambda(body_tag.ir.clone());
            finish(ctx, raw, vec![body_tag])
        }

        TypedExpr::App(func, arg) => {
            let func_tag = lower_expr(ctx, pack, env, func)?;
            let arg_tag = lower_expr(ctx, pack, env, arg)?;
            let raw = Expr::app(func_tag.ir.clone(), arg_tag.ir.clone());
            finish(ctx, raw, vec![func_tag, arg_tag])
        }

        TypedExpr::Let {
            name,
            value,
            body,
            kind: RecursionKind::NonRecursive,
        } => {
            // The IR is let-free: the value's tag rides along in the
            // environment and appears wherever the name is used.
            let value_tag = lower_expr(ctx, pack, env, value)?;
            lower_expr(ctx, pack, &env.bind_value(*name, value_tag), body)
        }

        TypedExpr::Let {
            name,
            value,
            body,
            kind: RecursionKind::Recursive,
        } => {
            let value_env = env.bind_lambda(*name);
            let value_tag = lower_expr(ctx, pack, &value_env, value)?;
            let raw = Expr::Recursion(Box::new(Expr::lambda(value_tag.ir.clone())));
            let rec_tag = finish(ctx, raw, vec![value_tag])?;
            lower_expr(ctx, pack, &env.bind_value(*name, rec_tag), body)
        }

        TypedExpr::Match(scrutinee, branches) => {
            let scrutinee_tag = lower_expr(ctx, pack, env, scrutinee)?;
            let mut child_tags = vec![scrutinee_tag.clone()];
            let mut core_branches = Vec::with_capacity(branches.len());
            for (hir_pattern, hir_body) in branches {
                let names = hir_pattern.names();
                let pattern = lower_pattern(ctx.packages, pack, hir_pattern, &names)?;
                let body_tag = lower_expr(ctx, pack, &env.bind_binders(&names), hir_body)?;
                // One lambda per bound name; slot 0 is the innermost.
                let wrapped = (0..names.len())
                    .fold(body_tag.ir.clone(), |body, _| Expr::lambda(body));
                child_tags.push(ExprTag {
                    ir: wrapped.clone(),
                    children: body_tag.children,
                });
                core_branches.push((pattern, wrapped));
            }
            let raw = Expr::Match(Box::new(scrutinee_tag.ir.clone()), core_branches);
            finish(ctx, raw, child_tags)
        }

        TypedExpr::Literal(lit) => Ok(ExprTag::leaf(Expr::Literal(lit.clone()))),
    }
}

/// Normalize a freshly built node and fold its children's tags into the
/// result: the new children set is the union of each child's children
/// plus the child's own IR.
fn finish(
    ctx: &mut LowerContext<'_>,
    raw: Expr,
    child_tags: Vec<ExprTag>,
) -> LowerResult<ExprTag> {
    let ir = ctx.normalize(&raw)?;
    let mut children = FxHashSet::default();
    for tag in child_tags {
        children.extend(tag.children);
        children.insert(tag.ir);
    }
    Ok(ExprTag { ir, children })
}
