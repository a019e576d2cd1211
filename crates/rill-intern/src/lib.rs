//! String interning for efficient name handling.
//!
//! This crate provides interned strings (symbols) that enable O(1) equality
//! comparisons, plus the newtypes the rest of the compiler uses for names:
//! [`PackageName`] for package identity and [`TypeRef`] for opaque rendered
//! type annotations attached to external definitions.

#![warn(missing_docs)]

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::LazyLock;

/// The global interner for symbols.
static INTERNER: LazyLock<Interner> = LazyLock::new(Interner::default);

/// An interned string symbol.
///
/// Symbols are cheap to copy and compare (O(1) equality).
/// The actual string data is stored in a global interner.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    /// Intern a string and return its symbol.
    #[must_use]
    pub fn intern(s: &str) -> Self {
        INTERNER.intern(s)
    }

    /// Get the string value of this symbol.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        INTERNER.get(self)
    }

    /// Get the raw index of this symbol.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if this symbol is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// The global symbol table.
///
/// Interning happens almost exclusively while a package map is being
/// lowered, which is single-threaded per map, so one mutex over the
/// whole table is enough; there is no separate read path to optimize.
#[derive(Default)]
struct Interner {
    table: Mutex<SymbolTable>,
}

/// Index and storage for interned strings. `Symbol(n)` is the `n`th
/// entry of `entries`; `lookup` maps each stored string back to it.
#[derive(Default)]
struct SymbolTable {
    lookup: FxHashMap<&'static str, Symbol>,
    entries: Vec<&'static str>,
}

impl Interner {
    fn intern(&self, text: &str) -> Symbol {
        let mut table = self.table.lock();
        if let Some(&sym) = table.lookup.get(text) {
            return sym;
        }
        // Entries are never removed: leaking the copy is what allows
        // `Symbol::as_str` to hand out `&'static str`.
        let stored: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let sym = Symbol(table.entries.len() as u32);
        table.entries.push(stored);
        table.lookup.insert(stored, sym);
        sym
    }

    fn get(&self, sym: Symbol) -> &'static str {
        self.table.lock().entries[sym.0 as usize]
    }
}

/// The name of a package.
///
/// Package names are interned and compared by identity, like any other
/// symbol. They key the package map and qualify external references.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct PackageName(pub Symbol);

impl PackageName {
    /// Create a package name from a string.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self(Symbol::intern(s))
    }

    /// The builtin package that defines the list type.
    #[must_use]
    pub fn predef() -> Self {
        Self(*kw::PREDEF)
    }

    /// Get the string value of this package name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.0.as_str()
    }
}

impl fmt::Debug for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageName({:?})", self.0.as_str())
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An opaque, rendered type annotation.
///
/// The middle-end never inspects types; it only carries them through on
/// external definitions so downstream consumers can recover the signature.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct TypeRef(pub Symbol);

impl TypeRef {
    /// Create a type reference from its rendered form.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self(Symbol::intern(s))
    }

    /// Get the rendered form of this type reference.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.0.as_str()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({:?})", self.0.as_str())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

/// Pre-interned symbols for names the middle-end itself needs.
pub mod kw {
    use super::Symbol;
    use std::sync::LazyLock;

    macro_rules! define_names {
        ($($name:ident => $string:literal),* $(,)?) => {
            $(
                #[doc = concat!("The `", $string, "` name.")]
                pub static $name: LazyLock<Symbol> = LazyLock::new(|| Symbol::intern($string));
            )*

            /// Intern all builtin names. Call this at startup for better performance.
            pub fn intern_all() {
                $(
                    let _ = *$name;
                )*
            }
        };
    }

    define_names! {
        // The builtin package and its list type
        PREDEF => "Rill/Predef",
        LIST => "List",
        EMPTY_LIST => "EmptyList",
        NON_EMPTY_LIST => "NonEmptyList",

        // Underscore, the conventional wildcard name
        UNDERSCORE => "_",
    }
}
