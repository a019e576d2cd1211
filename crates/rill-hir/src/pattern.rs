//! Surface patterns with names.
//!
//! These mirror the core IR patterns but bind source-level names instead
//! of slot indices; the converter assigns slots by each name's position
//! in [`HirPattern::names`].

use serde::{Deserialize, Serialize};

use rill_core::Lit;
use rill_intern::{PackageName, Symbol};

/// One element of a surface list pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HirListPart {
    /// A `*_` or `*name` element binding the rest of the list.
    Splice(Option<Symbol>),
    /// A positional item pattern.
    Item(HirPattern),
}

/// One element of a surface string pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HirStrPart {
    /// Matches any run of characters.
    WildStr,
    /// Matches any run of characters and binds it.
    NamedStr(Symbol),
    /// Matches a literal segment.
    LitStr(String),
}

/// A named surface pattern, as produced by the type checker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HirPattern {
    /// Matches anything, binds nothing.
    WildCard,

    /// Matches an equal literal.
    Literal(Lit),

    /// Matches anything, binding it to a name.
    Var(Symbol),

    /// Binds the whole value and keeps matching the inner pattern.
    Named(Symbol, Box<HirPattern>),

    /// Matches a cons-list; at most one part is a splice.
    ListPat(Vec<HirListPart>),

    /// Matches a value built by the named constructor.
    PositionalStruct {
        /// The constructor, package-qualified.
        constructor: (PackageName, Symbol),
        /// Positional sub-patterns.
        params: Vec<HirPattern>,
    },

    /// First-match alternation; all arms bind the same names.
    Union(Box<HirPattern>, Vec<HirPattern>),

    /// A string pattern.
    StrPat(Vec<HirStrPart>),
}

impl HirPattern {
    /// The names this pattern binds, in first-occurrence order.
    ///
    /// The converter assigns each name the slot equal to its position in
    /// this list, which makes the core pattern's slot numbering dense.
    /// Union arms bind the same names by construction, so only the head
    /// arm contributes.
    #[must_use]
    pub fn names(&self) -> Vec<Symbol> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<Symbol>) {
        let mut push = |name: Symbol, names: &mut Vec<Symbol>| {
            if !names.contains(&name) {
                names.push(name);
            }
        };
        match self {
            Self::WildCard | Self::Literal(_) => {}
            Self::Var(name) => push(*name, names),
            Self::Named(name, inner) => {
                push(*name, names);
                inner.collect_names(names);
            }
            Self::ListPat(parts) => {
                for part in parts {
                    match part {
                        HirListPart::Splice(Some(name)) => push(*name, names),
                        HirListPart::Splice(None) => {}
                        HirListPart::Item(pat) => pat.collect_names(names),
                    }
                }
            }
            Self::PositionalStruct { params, .. } => {
                for pat in params {
                    pat.collect_names(names);
                }
            }
            Self::Union(head, _) => head.collect_names(names),
            Self::StrPat(parts) => {
                for part in parts {
                    if let HirStrPart::NamedStr(name) = part {
                        push(*name, names);
                    }
                }
            }
        }
    }
}
