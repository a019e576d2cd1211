//! Three-valued pattern matching.
//!
//! Matching a value against a pattern can succeed, fail, or be
//! undecidable at compile time (the value's head is not a constructor).
//! All three verdicts are sound: `Matches` means the value definitely
//! matches, `NoMatch` means it definitely does not, and `NotProvable`
//! blocks the rewriter from reducing past an opaque scrutinee.
//!
//! Values are inspected only through the [`MatchValue`] capability hooks,
//! so the same matcher works on IR terms here and on runtime values in an
//! evaluator.

use rustc_hash::FxHashMap;

use crate::expr::{DataFamily, Expr, Lit};
use crate::pattern::{ListPart, Pattern};

/// Bindings produced by a successful (or in-progress) match: pattern slot
/// index to matched substructure.
pub type Env<V> = FxHashMap<usize, V>;

/// The verdict of matching one value against one pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternMatch<E> {
    /// The value definitely matches; `E` carries the bindings.
    Matches(E),
    /// The value definitely does not match.
    NoMatch,
    /// The matcher cannot decide at this level.
    NotProvable,
}

impl<E> PatternMatch<E> {
    /// Whether this is a definite match.
    #[must_use]
    pub fn is_matches(&self) -> bool {
        matches!(self, Self::Matches(_))
    }

    /// Map the bindings of a definite match.
    pub fn map<F, T>(self, f: F) -> PatternMatch<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            Self::Matches(env) => PatternMatch::Matches(f(env)),
            Self::NoMatch => PatternMatch::NoMatch,
            Self::NotProvable => PatternMatch::NotProvable,
        }
    }
}

/// Capability hooks the matcher needs from a value representation.
pub trait MatchValue: Clone {
    /// View the value as a literal, if its head is one.
    fn as_literal(&self) -> Option<&Lit>;

    /// View the value as a constructed value of the given family,
    /// yielding the constructor tag and arguments.
    fn as_struct(&self, family: DataFamily) -> Option<(u32, Vec<Self>)>;

    /// View the value as a fully-known cons-list.
    fn as_list(&self) -> Option<Vec<Self>>;

    /// Build a cons-list value from items, front to back. Used to bind
    /// the prefix of a splice match.
    fn from_list(items: &[Self]) -> Self;
}

impl MatchValue for Expr {
    fn as_literal(&self) -> Option<&Lit> {
        match self {
            Expr::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    // The family marker is advisory and never affects reduction, so the
    // IR view matches on tag and arity structure alone.
    fn as_struct(&self, _family: DataFamily) -> Option<(u32, Vec<Expr>)> {
        match self {
            Expr::Struct(tag, args, _) => Some((*tag, args.clone())),
            _ => None,
        }
    }

    fn as_list(&self) -> Option<Vec<Expr>> {
        let mut items = Vec::new();
        let mut current = self;
        loop {
            match current {
                Expr::Struct(0, args, _) if args.is_empty() => return Some(items),
                Expr::Struct(1, args, _) if args.len() == 2 => {
                    items.push(args[0].clone());
                    current = &args[1];
                }
                _ => return None,
            }
        }
    }

    fn from_list(items: &[Expr]) -> Expr {
        Expr::from_items(items.to_vec())
    }
}

/// Match one value against one pattern, extending `env` with bindings.
#[must_use]
pub fn match_one<V: MatchValue>(
    pattern: &Pattern,
    value: &V,
    mut env: Env<V>,
) -> PatternMatch<Env<V>> {
    match pattern {
        Pattern::WildCard => PatternMatch::Matches(env),

        Pattern::Literal(expected) => match value.as_literal() {
            Some(found) if found == expected => PatternMatch::Matches(env),
            Some(_) => PatternMatch::NoMatch,
            None => PatternMatch::NotProvable,
        },

        Pattern::Var(slot) => {
            env.insert(*slot, value.clone());
            PatternMatch::Matches(env)
        }

        Pattern::Named(slot, inner) => match match_one(inner, value, env) {
            PatternMatch::Matches(mut env) => {
                env.insert(*slot, value.clone());
                PatternMatch::Matches(env)
            }
            other => other,
        },

        Pattern::PositionalStruct { tag, params, family } => {
            match value.as_struct(*family) {
                None => PatternMatch::NotProvable,
                Some((found_tag, args)) => {
                    if let Some(required) = tag {
                        if *required != found_tag {
                            return PatternMatch::NoMatch;
                        }
                    }
                    debug_assert_eq!(params.len(), args.len());
                    match_positional(params.iter().zip(args.iter()), env)
                }
            }
        }

        Pattern::ListPat(parts) => match_list(parts, value, env),

        Pattern::Union(head, rest) => {
            for arm in std::iter::once(head.as_ref()).chain(rest.iter()) {
                match match_one(arm, value, env.clone()) {
                    PatternMatch::NoMatch => {}
                    other => return other,
                }
            }
            PatternMatch::NoMatch
        }

        // String matching is decided by a later phase.
        Pattern::StrPat(_) => PatternMatch::NotProvable,
    }
}

/// Find the first branch whose pattern provably matches the scrutinee.
///
/// Branches are tried in order. A definite failure moves on; a definite
/// match stops with the branch's pattern, bindings and body; an
/// undecidable branch stops the whole search with `None`, because
/// committing to any later branch would require deciding this one first.
#[must_use]
pub fn find_match<'a, V: MatchValue, B>(
    scrutinee: &V,
    branches: &'a [(Pattern, B)],
) -> Option<(&'a Pattern, Env<V>, &'a B)> {
    for (pattern, body) in branches {
        match match_one(pattern, scrutinee, Env::default()) {
            PatternMatch::Matches(env) => return Some((pattern, env, body)),
            PatternMatch::NoMatch => {}
            PatternMatch::NotProvable => return None,
        }
    }
    None
}

/// Apply a matched branch body to its bindings.
///
/// The converter wraps each branch body in one lambda per bound slot,
/// innermost lambda for slot 0, so the body is applied to
/// `env[k-1], ..., env[0]` and downstream beta reduction performs the
/// binding.
#[must_use]
pub fn solve_match(env: &Env<Expr>, pattern: &Pattern, body: &Expr) -> Expr {
    let count = pattern.var_count();
    let mut expr = body.clone();
    for slot in (0..count).rev() {
        let arg = env
            .get(&slot)
            .expect("match environment must bind every pattern slot");
        expr = Expr::app(expr, arg.clone());
    }
    expr
}

/// Fold a sequence of (pattern, value) pairs left to right.
///
/// A definite failure anywhere rejects the whole sequence, even when an
/// earlier position was undecidable; an undecidable position downgrades
/// the final verdict but the scan continues so a later failure can still
/// prove rejection.
fn match_positional<'p, 'v, V, I>(pairs: I, env: Env<V>) -> PatternMatch<Env<V>>
where
    V: MatchValue + 'v,
    I: Iterator<Item = (&'p Pattern, &'v V)>,
{
    let mut current = env;
    let mut provable = true;
    for (pattern, value) in pairs {
        match match_one(pattern, value, current.clone()) {
            PatternMatch::Matches(env) => current = env,
            PatternMatch::NoMatch => return PatternMatch::NoMatch,
            PatternMatch::NotProvable => provable = false,
        }
    }
    if provable {
        PatternMatch::Matches(current)
    } else {
        PatternMatch::NotProvable
    }
}

fn match_list<V: MatchValue>(
    parts: &[ListPart],
    value: &V,
    mut env: Env<V>,
) -> PatternMatch<Env<V>> {
    match parts {
        // The empty pattern requires nil.
        [] => match value.as_struct(DataFamily::Enum) {
            Some((0, _)) => PatternMatch::Matches(env),
            Some((1, _)) => PatternMatch::NoMatch,
            _ => PatternMatch::NotProvable,
        },

        // A trailing splice matches any remaining list.
        [ListPart::Splice(slot)] => {
            if let Some(slot) = slot {
                env.insert(*slot, value.clone());
            }
            PatternMatch::Matches(env)
        }

        // A leading item requires a cons cell; match head then tail.
        [ListPart::Item(head_pat), rest @ ..] => match value.as_struct(DataFamily::Enum) {
            Some((1, args)) if args.len() == 2 => {
                let mut provable = true;
                match match_one(head_pat, &args[0], env.clone()) {
                    PatternMatch::Matches(extended) => env = extended,
                    PatternMatch::NoMatch => return PatternMatch::NoMatch,
                    PatternMatch::NotProvable => provable = false,
                }
                match match_list(rest, &args[1], env) {
                    PatternMatch::Matches(env) if provable => PatternMatch::Matches(env),
                    PatternMatch::Matches(_) => PatternMatch::NotProvable,
                    PatternMatch::NoMatch => PatternMatch::NoMatch,
                    PatternMatch::NotProvable => PatternMatch::NotProvable,
                }
            }
            Some((0, _)) => PatternMatch::NoMatch,
            _ => PatternMatch::NotProvable,
        },

        // A leading splice needs the whole list: the items after the
        // splice match an exact tail, and the prefix binds to the splice.
        [ListPart::Splice(slot), rest @ ..] => {
            let Some(items) = value.as_list() else {
                return PatternMatch::NotProvable;
            };
            if items.len() < rest.len() {
                return PatternMatch::NoMatch;
            }
            let split = items.len() - rest.len();
            let (prefix, tail) = items.split_at(split);
            let tail_patterns = rest.iter().map(|part| match part {
                ListPart::Item(pat) => pat,
                ListPart::Splice(_) => unreachable!("list pattern has at most one splice"),
            });
            match_positional(tail_patterns.zip(tail.iter()), env).map(|mut env| {
                if let Some(slot) = slot {
                    env.insert(*slot, V::from_list(prefix));
                }
                env
            })
        }
    }
}
