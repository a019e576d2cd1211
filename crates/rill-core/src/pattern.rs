//! Structured patterns for the IR.
//!
//! Pattern variables are slot indices into the branch's bound-variable
//! array (the converter assigns them densely in first-occurrence order),
//! so a pattern's bound-variable count is `1 + max slot`. Construction
//! invariants (at most one splice per list pattern, nonempty union tails
//! and string parts) are enforced by the smart constructors and reported
//! as [`PatternError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{DataFamily, Lit};

/// A pattern that failed its construction-time invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A list pattern may bind at most one splice.
    #[error("list pattern has more than one splice")]
    MultipleSplices,

    /// A union pattern needs at least two arms.
    #[error("union pattern needs at least two arms")]
    EmptyUnion,

    /// A string pattern needs at least one part.
    #[error("string pattern needs at least one part")]
    EmptyString,
}

/// One element of a list pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListPart {
    /// A `*_` or `*name` element binding the rest of the list.
    Splice(Option<usize>),
    /// A positional item pattern.
    Item(Pattern),
}

/// One element of a string pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrPart {
    /// Matches any (possibly empty) run of characters.
    WildStr,
    /// Matches any run of characters and binds it.
    NamedStr(usize),
    /// Matches a literal segment.
    LitStr(String),
}

/// A structured pattern over IR values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    /// Matches anything, binds nothing.
    WildCard,

    /// Matches an equal literal.
    Literal(Lit),

    /// Matches anything, binding it to a slot.
    Var(usize),

    /// Binds the whole value to a slot and keeps matching the inner
    /// pattern.
    Named(usize, Box<Pattern>),

    /// Matches a cons-list. At most one part is a [`ListPart::Splice`];
    /// use [`Pattern::list`] to construct.
    ListPat(Vec<ListPart>),

    /// Matches a constructed value positionally. A `None` tag matches any
    /// constructor of the family (a single-constructor struct); `Some(k)`
    /// requires constructor index `k`.
    PositionalStruct {
        /// Required constructor index, if any.
        tag: Option<u32>,
        /// Positional sub-patterns.
        params: Vec<Pattern>,
        /// Advisory family marker, forwarded to the value view.
        family: DataFamily,
    },

    /// First-match alternation. Kept flat: use [`Pattern::union`] to
    /// construct, which flattens nested unions. All arms bind the same
    /// slots by construction.
    Union(Box<Pattern>, Vec<Pattern>),

    /// A string pattern; deciding these is deferred to a later phase, so
    /// the core matcher reports them as not provable.
    StrPat(Vec<StrPart>),
}

impl Pattern {
    /// Build a list pattern, rejecting more than one splice.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::MultipleSplices`] if `parts` contains two
    /// or more splices.
    pub fn list(parts: Vec<ListPart>) -> Result<Self, PatternError> {
        let splices = parts
            .iter()
            .filter(|p| matches!(p, ListPart::Splice(_)))
            .count();
        if splices > 1 {
            return Err(PatternError::MultipleSplices);
        }
        Ok(Self::ListPat(parts))
    }

    /// Build a union pattern, flattening nested unions.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::EmptyUnion`] if the flattened union has
    /// fewer than two arms.
    pub fn union(head: Pattern, rest: Vec<Pattern>) -> Result<Self, PatternError> {
        let mut arms = Vec::with_capacity(1 + rest.len());
        flatten_union(head, &mut arms);
        for arm in rest {
            flatten_union(arm, &mut arms);
        }
        let mut iter = arms.into_iter();
        let head = iter.next().expect("flatten always yields one arm");
        let tail: Vec<Pattern> = iter.collect();
        if tail.is_empty() {
            return Err(PatternError::EmptyUnion);
        }
        Ok(Self::Union(Box::new(head), tail))
    }

    /// Build a string pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::EmptyString`] if `parts` is empty.
    pub fn string(parts: Vec<StrPart>) -> Result<Self, PatternError> {
        if parts.is_empty() {
            return Err(PatternError::EmptyString);
        }
        Ok(Self::StrPat(parts))
    }

    /// The number of slots this pattern binds: one more than the largest
    /// slot index it mentions, or zero if it binds nothing.
    ///
    /// Union arms bind the same slots by construction, so only the head
    /// arm is consulted.
    #[must_use]
    pub fn var_count(&self) -> usize {
        match self {
            Self::WildCard | Self::Literal(_) => 0,
            Self::Var(slot) => slot + 1,
            Self::Named(slot, inner) => (slot + 1).max(inner.var_count()),
            Self::ListPat(parts) => parts
                .iter()
                .map(|part| match part {
                    ListPart::Splice(Some(slot)) => slot + 1,
                    ListPart::Splice(None) => 0,
                    ListPart::Item(pat) => pat.var_count(),
                })
                .max()
                .unwrap_or(0),
            Self::PositionalStruct { params, .. } => params
                .iter()
                .map(Pattern::var_count)
                .max()
                .unwrap_or(0),
            Self::Union(head, _) => head.var_count(),
            Self::StrPat(parts) => parts
                .iter()
                .map(|part| match part {
                    StrPart::NamedStr(slot) => slot + 1,
                    StrPart::WildStr | StrPart::LitStr(_) => 0,
                })
                .max()
                .unwrap_or(0),
        }
    }

    /// The set of slot indices this pattern actually binds.
    #[must_use]
    pub fn named_slots(&self) -> Vec<usize> {
        let mut slots = Vec::new();
        self.collect_slots(&mut slots);
        slots.sort_unstable();
        slots.dedup();
        slots
    }

    fn collect_slots(&self, slots: &mut Vec<usize>) {
        match self {
            Self::WildCard | Self::Literal(_) => {}
            Self::Var(slot) => slots.push(*slot),
            Self::Named(slot, inner) => {
                slots.push(*slot);
                inner.collect_slots(slots);
            }
            Self::ListPat(parts) => {
                for part in parts {
                    match part {
                        ListPart::Splice(Some(slot)) => slots.push(*slot),
                        ListPart::Splice(None) => {}
                        ListPart::Item(pat) => pat.collect_slots(slots),
                    }
                }
            }
            Self::PositionalStruct { params, .. } => {
                for pat in params {
                    pat.collect_slots(slots);
                }
            }
            Self::Union(head, _) => head.collect_slots(slots),
            Self::StrPat(parts) => {
                for part in parts {
                    if let StrPart::NamedStr(slot) = part {
                        slots.push(*slot);
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::serialize::serialize_pattern(self))
    }
}

fn flatten_union(pat: Pattern, arms: &mut Vec<Pattern>) {
    match pat {
        Pattern::Union(head, rest) => {
            flatten_union(*head, arms);
            for arm in rest {
                flatten_union(arm, arms);
            }
        }
        other => arms.push(other),
    }
}
