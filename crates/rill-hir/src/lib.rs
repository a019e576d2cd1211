//! # Rill Typed AST
//!
//! The typed, name-resolved program representation handed to the
//! middle-end by the type checker. The middle-end consumes it through a
//! narrow surface: per-package let-bindings in declaration order with
//! their recursion kind, constructor lookups with tag and arity, external
//! definitions with their rendered type, and import resolution.
//!
//! This crate defines only that surface; parsing, inference and
//! diagnostics all live upstream.

#![warn(missing_docs)]

mod pattern;

use serde::{Deserialize, Serialize};

use rill_intern::{PackageName, Symbol, TypeRef};
use rustc_hash::FxHashMap;

pub use pattern::{HirListPart, HirPattern, HirStrPart};
pub use rill_core::{DataFamily, Lit};

/// Whether a let-binding may refer to itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecursionKind {
    /// The binding's value may reference the bound name.
    Recursive,
    /// The binding's value cannot reference the bound name.
    NonRecursive,
}

impl RecursionKind {
    /// Whether this is the recursive kind.
    #[must_use]
    pub fn is_recursive(self) -> bool {
        matches!(self, Self::Recursive)
    }
}

/// A typed, name-resolved expression.
///
/// Lambdas are single-argument (the front end curries); `Local` names
/// resolve within the current package through lambda binders, let
/// bindings, top-level definitions, constructors, externals and imports,
/// in that order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedExpr {
    /// A reference resolved within the current package.
    Local(Symbol),

    /// A reference to a top-level name of a specific package.
    Global(PackageName, Symbol),

    /// A single-argument function.
    Lambda(Symbol, Box<TypedExpr>),

    /// Function application.
    App(Box<TypedExpr>, Box<TypedExpr>),

    /// A let binding.
    Let {
        /// The bound name.
        name: Symbol,
        /// The bound value.
        value: Box<TypedExpr>,
        /// The body the binding scopes over.
        body: Box<TypedExpr>,
        /// Whether `value` may reference `name`.
        kind: RecursionKind,
    },

    /// A pattern match with ordered, nonempty branches.
    Match(Box<TypedExpr>, Vec<(HirPattern, TypedExpr)>),

    /// A literal.
    Literal(Lit),
}

impl TypedExpr {
    /// Build an application node.
    #[must_use]
    pub fn app(func: TypedExpr, arg: TypedExpr) -> Self {
        Self::App(Box::new(func), Box::new(arg))
    }

    /// Build a lambda node.
    #[must_use]
    pub fn lambda(arg: &str, body: TypedExpr) -> Self {
        Self::Lambda(Symbol::intern(arg), Box::new(body))
    }

    /// Build a local reference.
    #[must_use]
    pub fn local(name: &str) -> Self {
        Self::Local(Symbol::intern(name))
    }

    /// Build an integer literal.
    pub fn integer(n: impl Into<num_bigint::BigInt>) -> Self {
        Self::Literal(Lit::Integer(n.into()))
    }

    /// Build a string literal.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Lit::Str(s.into()))
    }
}

/// One constructor of a data type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constructor {
    /// The constructor's name.
    pub name: Symbol,
    /// How many arguments it takes.
    pub arity: usize,
}

/// A data type declaration: a family marker plus its constructors in
/// declaration order. A constructor's tag is its position in this list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    /// The type's name.
    pub name: Symbol,
    /// The family marker forwarded onto constructed values.
    pub family: DataFamily,
    /// The constructors, in declaration order.
    pub constructors: Vec<Constructor>,
}

impl DataType {
    /// The tag of the named constructor, if this type declares it.
    #[must_use]
    pub fn constructor_index(&self, name: Symbol) -> Option<usize> {
        self.constructors.iter().position(|c| c.name == name)
    }

    /// Whether this type has exactly one constructor.
    #[must_use]
    pub fn is_single_constructor(&self) -> bool {
        self.constructors.len() == 1
    }
}

/// An imported name: `local` in the importing package refers to
/// `original` in package `from`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// The name as visible in the importing package.
    pub local: Symbol,
    /// The package the name comes from.
    pub from: PackageName,
    /// The name in the origin package.
    pub original: Symbol,
}

/// A type-checked package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// The package's name.
    pub name: PackageName,
    /// Top-level let bindings, in declaration order.
    pub lets: Vec<(Symbol, RecursionKind, TypedExpr)>,
    /// Externally-defined values with their rendered types.
    pub externals: Vec<(Symbol, TypeRef)>,
    /// Data type declarations.
    pub types: Vec<DataType>,
    /// Imported names.
    pub imports: Vec<Import>,
}

impl Package {
    /// Create an empty package.
    #[must_use]
    pub fn new(name: PackageName) -> Self {
        Self {
            name,
            lets: Vec::new(),
            externals: Vec::new(),
            types: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Look up a top-level let binding by name.
    #[must_use]
    pub fn let_binding(&self, name: Symbol) -> Option<(RecursionKind, &TypedExpr)> {
        self.lets
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, kind, expr)| (*kind, expr))
    }

    /// Look up an external definition by name.
    #[must_use]
    pub fn external(&self, name: Symbol) -> Option<TypeRef> {
        self.externals
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, typ)| *typ)
    }

    /// Look up a constructor by name, yielding its data type and tag.
    #[must_use]
    pub fn constructor(&self, name: Symbol) -> Option<(&DataType, usize)> {
        self.types
            .iter()
            .find_map(|dt| dt.constructor_index(name).map(|idx| (dt, idx)))
    }

    /// Look up an import by its local name.
    #[must_use]
    pub fn import(&self, name: Symbol) -> Option<&Import> {
        self.imports.iter().find(|imp| imp.local == name)
    }
}

/// All packages of a program, keyed by name, iterable in insertion
/// order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMap {
    order: Vec<PackageName>,
    packages: FxHashMap<PackageName, Package>,
}

impl PackageMap {
    /// Create an empty package map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a package map seeded with the builtin package.
    #[must_use]
    pub fn with_predef() -> Self {
        let mut map = Self::new();
        map.insert(predef());
        map
    }

    /// Insert a package, replacing any previous package of the same name.
    pub fn insert(&mut self, package: Package) {
        if !self.packages.contains_key(&package.name) {
            self.order.push(package.name);
        }
        self.packages.insert(package.name, package);
    }

    /// Look up a package by name.
    #[must_use]
    pub fn get(&self, name: PackageName) -> Option<&Package> {
        self.packages.get(&name)
    }

    /// Look up a constructor by package and name.
    #[must_use]
    pub fn constructor(&self, pack: PackageName, name: Symbol) -> Option<(&DataType, usize)> {
        self.get(pack)?.constructor(name)
    }

    /// Iterate packages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.order.iter().filter_map(|name| self.packages.get(name))
    }
}

/// The builtin package defining the list type.
///
/// Lists are cons-lists: `EmptyList` is tag 0 with no arguments,
/// `NonEmptyList` is tag 1 with a head and a tail.
#[must_use]
pub fn predef() -> Package {
    let mut package = Package::new(PackageName::predef());
    package.types.push(DataType {
        name: *rill_intern::kw::LIST,
        family: DataFamily::Enum,
        constructors: vec![
            Constructor {
                name: *rill_intern::kw::EMPTY_LIST,
                arity: 0,
            },
            Constructor {
                name: *rill_intern::kw::NON_EMPTY_LIST,
                arity: 2,
            },
        ],
    });
    package
}
