//! End-to-end lowering tests: typed programs in, normalized IR out.

use rill_core::{
    normalize, Budget, DataFamily, Expr, ListPart, NormalizeConfig, NormalizeError, Pattern,
};
use rill_hir::{
    Constructor, DataType, HirListPart, HirPattern, Import, Package, PackageMap, RecursionKind,
    TypedExpr,
};
use rill_hir_to_core::{lower_package, lower_package_map, ExprTag, LowerError, TaggedPackage};
use rill_intern::{PackageName, Symbol, TypeRef};

fn sym(s: &str) -> Symbol {
    Symbol::intern(s)
}

fn main_pack() -> PackageName {
    PackageName::new("Demo/Main")
}

/// A package pre-wired with list imports and a couple of data types.
fn demo_package() -> Package {
    let mut package = Package::new(main_pack());
    for name in ["EmptyList", "NonEmptyList"] {
        package.imports.push(Import {
            local: sym(name),
            from: PackageName::predef(),
            original: sym(name),
        });
    }
    package.types.push(DataType {
        name: sym("Shape"),
        family: DataFamily::Enum,
        constructors: vec![
            Constructor { name: sym("Dot"), arity: 0 },
            Constructor { name: sym("Mark"), arity: 1 },
            Constructor { name: sym("Arrow"), arity: 1 },
            Constructor { name: sym("Line"), arity: 2 },
        ],
    });
    package.externals
        .push((sym("f"), TypeRef::new("Int -> Int")));
    package
}

fn lower_demo(package: Package) -> TaggedPackage {
    let mut map = PackageMap::with_predef();
    map.insert(package);
    lower_package(&map, main_pack(), NormalizeConfig::default()).unwrap()
}

fn tag_of<'a>(package: &'a TaggedPackage, name: &str) -> &'a ExprTag {
    &package
        .bindings
        .iter()
        .find(|b| b.name == sym(name))
        .unwrap_or_else(|| panic!("no binding named {name}"))
        .tag
}

/// `[a, b, ...]` as a typed expression via the list constructors.
fn hir_list(items: Vec<TypedExpr>) -> TypedExpr {
    items.into_iter().rev().fold(
        TypedExpr::local("EmptyList"),
        |tail, head| {
            TypedExpr::app(
                TypedExpr::app(TypedExpr::local("NonEmptyList"), head),
                tail,
            )
        },
    )
}

fn let_nonrec(name: &str, expr: TypedExpr, package: &mut Package) {
    package
        .lets
        .push((sym(name), RecursionKind::NonRecursive, expr));
}

fn let_rec(name: &str, expr: TypedExpr, package: &mut Package) {
    package.lets.push((sym(name), RecursionKind::Recursive, expr));
}

#[test]
fn test_applied_identity_reduces_to_argument() {
    let mut package = demo_package();
    let_nonrec(
        "value",
        TypedExpr::app(
            TypedExpr::lambda("x", TypedExpr::local("x")),
            TypedExpr::integer(42),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "value").ir, Expr::integer(42));
}

#[test]
fn test_wrapper_eta_reduces_to_external() {
    let mut package = demo_package();
    let_nonrec(
        "wrap",
        TypedExpr::lambda(
            "x",
            TypedExpr::app(TypedExpr::local("f"), TypedExpr::local("x")),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(
        tag_of(&lowered, "wrap").ir,
        Expr::External(main_pack(), sym("f"), TypeRef::new("Int -> Int"))
    );
}

#[test]
fn test_match_on_known_list_decides_branch() {
    let mut package = demo_package();
    let_nonrec(
        "choose",
        TypedExpr::Match(
            Box::new(TypedExpr::local("EmptyList")),
            vec![
                (HirPattern::ListPat(vec![]), TypedExpr::integer(1)),
                (HirPattern::WildCard, TypedExpr::integer(2)),
            ],
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "choose").ir, Expr::integer(1));
}

#[test]
fn test_match_on_opaque_scrutinee_survives() {
    let mut package = demo_package();
    let_nonrec(
        "opaque",
        TypedExpr::lambda(
            "l",
            TypedExpr::Match(
                Box::new(TypedExpr::local("l")),
                vec![
                    (HirPattern::ListPat(vec![]), TypedExpr::integer(1)),
                    (HirPattern::WildCard, TypedExpr::integer(2)),
                ],
            ),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    let expected = Expr::lambda(Expr::Match(
        Box::new(Expr::LambdaVar(0)),
        vec![
            (Pattern::list(vec![]).unwrap(), Expr::integer(1)),
            (Pattern::WildCard, Expr::integer(2)),
        ],
    ));
    assert_eq!(tag_of(&lowered, "opaque").ir, expected);
}

#[test]
fn test_splice_match_picks_middle_element() {
    let mut package = demo_package();
    let_nonrec(
        "second",
        TypedExpr::Match(
            Box::new(hir_list(vec![
                TypedExpr::integer(10),
                TypedExpr::integer(20),
                TypedExpr::integer(30),
            ])),
            vec![
                (
                    HirPattern::ListPat(vec![
                        HirListPart::Item(HirPattern::WildCard),
                        HirListPart::Item(HirPattern::Var(sym("x"))),
                        HirListPart::Splice(None),
                    ]),
                    TypedExpr::local("x"),
                ),
                (HirPattern::WildCard, TypedExpr::integer(0)),
            ],
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "second").ir, Expr::integer(20));
}

#[test]
fn test_union_pattern_first_match() {
    let mut package = demo_package();
    let_nonrec(
        "pick",
        TypedExpr::Match(
            Box::new(TypedExpr::integer(2)),
            vec![
                (
                    HirPattern::Union(
                        Box::new(HirPattern::Literal(rill_core::Lit::integer(1))),
                        vec![HirPattern::Literal(rill_core::Lit::integer(2))],
                    ),
                    TypedExpr::integer(100),
                ),
                (HirPattern::WildCard, TypedExpr::integer(200)),
            ],
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "pick").ir, Expr::integer(100));
}

#[test]
fn test_recursive_binding_without_self_reference_unfolds() {
    let mut package = demo_package();
    let_rec("seven", TypedExpr::integer(7), &mut package);
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "seven").ir, Expr::integer(7));
}

#[test]
fn test_recursive_binding_with_self_reference_stays_wrapped() {
    let mut package = demo_package();
    let_rec(
        "loop",
        TypedExpr::lambda(
            "x",
            TypedExpr::app(TypedExpr::local("loop"), TypedExpr::local("x")),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    let expected = Expr::Recursion(Box::new(Expr::lambda(Expr::lambda(Expr::app(
        Expr::LambdaVar(1),
        Expr::LambdaVar(0),
    )))));
    assert_eq!(tag_of(&lowered, "loop").ir, expected);
}

#[test]
fn test_constructor_reference_is_synthesized_term() {
    let mut package = demo_package();
    let_nonrec("line", TypedExpr::local("Line"), &mut package);
    let lowered = lower_demo(package);
    assert_eq!(
        tag_of(&lowered, "line").ir,
        Expr::lambda(Expr::lambda(Expr::Struct(
            3,
            vec![Expr::LambdaVar(1), Expr::LambdaVar(0)],
            DataFamily::Enum,
        )))
    );
}

#[test]
fn test_applied_constructor_builds_struct() {
    let mut package = demo_package();
    let_nonrec(
        "built",
        TypedExpr::app(
            TypedExpr::app(TypedExpr::local("Line"), TypedExpr::integer(10)),
            TypedExpr::integer(20),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(
        tag_of(&lowered, "built").ir,
        Expr::Struct(
            3,
            vec![Expr::integer(10), Expr::integer(20)],
            DataFamily::Enum,
        )
    );
}

#[test]
fn test_compose_gets_standard_indices() {
    let mut package = demo_package();
    let_nonrec(
        "compose",
        TypedExpr::lambda(
            "f",
            TypedExpr::lambda(
                "g",
                TypedExpr::lambda(
                    "x",
                    TypedExpr::app(
                        TypedExpr::local("f"),
                        TypedExpr::app(TypedExpr::local("g"), TypedExpr::local("x")),
                    ),
                ),
            ),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    let expected = Expr::lambda(Expr::lambda(Expr::lambda(Expr::app(
        Expr::LambdaVar(2),
        Expr::app(Expr::LambdaVar(1), Expr::LambdaVar(0)),
    ))));
    assert_eq!(tag_of(&lowered, "compose").ir, expected);
}

#[test]
fn test_nonrecursive_let_is_inlined() {
    let mut package = demo_package();
    let_nonrec(
        "value",
        TypedExpr::Let {
            name: sym("y"),
            value: Box::new(TypedExpr::integer(41)),
            body: Box::new(TypedExpr::app(
                TypedExpr::lambda("x", TypedExpr::local("y")),
                TypedExpr::integer(1),
            )),
            kind: RecursionKind::NonRecursive,
        },
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "value").ir, Expr::integer(41));
}

#[test]
fn test_recursive_let_wraps_fixpoint() {
    let mut package = demo_package();
    let_nonrec(
        "forever",
        TypedExpr::Let {
            name: sym("go"),
            value: Box::new(TypedExpr::lambda(
                "x",
                TypedExpr::app(TypedExpr::local("go"), TypedExpr::local("x")),
            )),
            body: Box::new(TypedExpr::local("go")),
            kind: RecursionKind::Recursive,
        },
        &mut package,
    );
    let lowered = lower_demo(package);
    let expected = Expr::Recursion(Box::new(Expr::lambda(Expr::lambda(Expr::app(
        Expr::LambdaVar(1),
        Expr::LambdaVar(0),
    )))));
    assert_eq!(tag_of(&lowered, "forever").ir, expected);
}

#[test]
fn test_match_binds_struct_fields() {
    let mut package = demo_package();
    let_nonrec(
        "from_line",
        TypedExpr::Match(
            Box::new(TypedExpr::app(
                TypedExpr::app(TypedExpr::local("Line"), TypedExpr::integer(1)),
                TypedExpr::integer(2),
            )),
            vec![
                (
                    HirPattern::PositionalStruct {
                        constructor: (main_pack(), sym("Line")),
                        params: vec![
                            HirPattern::Var(sym("from")),
                            HirPattern::Var(sym("to")),
                        ],
                    },
                    TypedExpr::local("from"),
                ),
                (HirPattern::WildCard, TypedExpr::integer(0)),
            ],
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "from_line").ir, Expr::integer(1));
}

#[test]
fn test_globals_and_imports_resolve_across_packages() {
    let lib = PackageName::new("Demo/Lib");
    let mut lib_package = Package::new(lib);
    lib_package
        .lets
        .push((sym("answer"), RecursionKind::NonRecursive, TypedExpr::integer(42)));

    let mut main_package = demo_package();
    main_package.imports.push(Import {
        local: sym("ans"),
        from: lib,
        original: sym("answer"),
    });
    let_nonrec("use_global", TypedExpr::Global(lib, sym("answer")), &mut main_package);
    let_nonrec("use_import", TypedExpr::local("ans"), &mut main_package);

    let mut map = PackageMap::with_predef();
    map.insert(lib_package);
    map.insert(main_package);
    let lowered = lower_package_map(&map, NormalizeConfig::default()).unwrap();
    let main_lowered = lowered
        .iter()
        .find(|p| p.name == main_pack())
        .unwrap();
    assert_eq!(tag_of(main_lowered, "use_global").ir, Expr::integer(42));
    assert_eq!(tag_of(main_lowered, "use_import").ir, Expr::integer(42));
}

#[test]
fn test_unknown_name_reported() {
    let mut package = demo_package();
    let_nonrec("bad", TypedExpr::local("missing"), &mut package);
    let mut map = PackageMap::with_predef();
    map.insert(package);
    let err = lower_package(&map, main_pack(), NormalizeConfig::default()).unwrap_err();
    assert_eq!(
        err,
        LowerError::UnknownName {
            package: main_pack(),
            name: sym("missing"),
        }
    );
}

#[test]
fn test_mutual_top_level_cycle_reported() {
    let mut package = demo_package();
    let_nonrec("a", TypedExpr::local("b"), &mut package);
    let_nonrec("b", TypedExpr::local("a"), &mut package);
    let mut map = PackageMap::with_predef();
    map.insert(package);
    let err = lower_package(&map, main_pack(), NormalizeConfig::default()).unwrap_err();
    assert_eq!(
        err,
        LowerError::CircularReference {
            package: main_pack(),
            name: sym("a"),
        }
    );
}

#[test]
fn test_budget_exhaustion_surfaces() {
    let mut package = demo_package();
    let omega_half = TypedExpr::lambda(
        "x",
        TypedExpr::app(TypedExpr::local("x"), TypedExpr::local("x")),
    );
    let_nonrec(
        "omega",
        TypedExpr::app(omega_half.clone(), omega_half),
        &mut package,
    );
    let mut map = PackageMap::with_predef();
    map.insert(package);
    let err =
        lower_package(&map, main_pack(), NormalizeConfig { max_steps: 50 }).unwrap_err();
    assert_eq!(
        err,
        LowerError::Normalize(NormalizeError::BudgetExceeded { limit: 50 })
    );
}

#[test]
fn test_all_binding_tags_are_closed() {
    let mut package = demo_package();
    let_nonrec(
        "wrap",
        TypedExpr::lambda(
            "x",
            TypedExpr::app(TypedExpr::local("f"), TypedExpr::local("x")),
        ),
        &mut package,
    );
    let_rec(
        "loop",
        TypedExpr::lambda(
            "x",
            TypedExpr::app(TypedExpr::local("loop"), TypedExpr::local("x")),
        ),
        &mut package,
    );
    let_nonrec(
        "opaque",
        TypedExpr::lambda(
            "l",
            TypedExpr::Match(
                Box::new(TypedExpr::local("l")),
                vec![
                    (HirPattern::ListPat(vec![]), TypedExpr::integer(1)),
                    (
                        HirPattern::ListPat(vec![
                            HirListPart::Item(HirPattern::Var(sym("h"))),
                            HirListPart::Splice(Some(sym("t"))),
                        ]),
                        TypedExpr::local("h"),
                    ),
                ],
            ),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    for binding in &lowered.bindings {
        assert!(
            binding.tag.ir.is_closed(),
            "binding {} is open: {}",
            binding.name,
            binding.tag.ir
        );
        assert!(
            binding.tag.ir.var_set().is_empty(),
            "binding {} has free indices",
            binding.name
        );
    }
}

#[test]
fn test_normalization_of_tags_is_idempotent() {
    let mut package = demo_package();
    let_nonrec(
        "second",
        TypedExpr::Match(
            Box::new(hir_list(vec![TypedExpr::integer(1), TypedExpr::integer(2)])),
            vec![
                (
                    HirPattern::ListPat(vec![
                        HirListPart::Item(HirPattern::WildCard),
                        HirListPart::Item(HirPattern::Var(sym("x"))),
                        HirListPart::Splice(None),
                    ]),
                    TypedExpr::local("x"),
                ),
                (HirPattern::WildCard, TypedExpr::integer(0)),
            ],
        ),
        &mut package,
    );
    let_nonrec("line", TypedExpr::local("Line"), &mut package);
    let lowered = lower_demo(package);
    for binding in &lowered.bindings {
        let again = normalize(&binding.tag.ir, &mut Budget::default()).unwrap();
        assert_eq!(again, binding.tag.ir, "binding {} not stable", binding.name);
    }
}

#[test]
fn test_tag_children_close_over_subterms() {
    let mut package = demo_package();
    let_nonrec(
        "built",
        TypedExpr::app(
            TypedExpr::app(TypedExpr::local("Line"), TypedExpr::integer(10)),
            TypedExpr::integer(20),
        ),
        &mut package,
    );
    let_nonrec(
        "opaque",
        TypedExpr::lambda(
            "l",
            TypedExpr::Match(
                Box::new(TypedExpr::local("l")),
                vec![
                    (HirPattern::ListPat(vec![]), TypedExpr::integer(1)),
                    (HirPattern::WildCard, TypedExpr::integer(2)),
                ],
            ),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    for binding in &lowered.bindings {
        for sub in binding.tag.ir.subterms() {
            assert!(
                binding.tag.children.contains(&sub),
                "binding {} children missing {}",
                binding.name,
                sub
            );
        }
    }
}

#[test]
fn test_earlier_bindings_visible_to_later_ones() {
    let mut package = demo_package();
    let_nonrec("base", TypedExpr::integer(5), &mut package);
    let_nonrec(
        "use_base",
        TypedExpr::app(
            TypedExpr::lambda("x", TypedExpr::local("x")),
            TypedExpr::local("base"),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    assert_eq!(tag_of(&lowered, "use_base").ir, Expr::integer(5));
}

#[test]
fn test_list_pattern_lowering_shape() {
    // The lowered match keeps the core pattern with dense slots.
    let mut package = demo_package();
    let_nonrec(
        "shape",
        TypedExpr::lambda(
            "l",
            TypedExpr::Match(
                Box::new(TypedExpr::local("l")),
                vec![
                    (
                        HirPattern::ListPat(vec![
                            HirListPart::Item(HirPattern::Var(sym("h"))),
                            HirListPart::Splice(Some(sym("t"))),
                        ]),
                        TypedExpr::local("h"),
                    ),
                    (HirPattern::WildCard, TypedExpr::integer(0)),
                ],
            ),
        ),
        &mut package,
    );
    let lowered = lower_demo(package);
    let expected = Expr::lambda(Expr::Match(
        Box::new(Expr::LambdaVar(0)),
        vec![
            (
                Pattern::list(vec![
                    ListPart::Item(Pattern::Var(0)),
                    ListPart::Splice(Some(1)),
                ])
                .unwrap(),
                Expr::lambda(Expr::lambda(Expr::LambdaVar(0))),
            ),
            (Pattern::WildCard, Expr::integer(0)),
        ],
    ));
    assert_eq!(tag_of(&lowered, "shape").ir, expected);
}
