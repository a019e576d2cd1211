//! Surface pattern lowering: names become slot indices, constructor
//! references become tags.

use rill_core::{ListPart, Pattern, StrPart};
use rill_hir::{HirListPart, HirPattern, HirStrPart, PackageMap};
use rill_intern::{PackageName, Symbol};

use crate::{LowerError, LowerResult};

/// Lower a surface pattern, assigning each bound name the slot equal to
/// its position in `names` (the pattern's bound-name list in
/// first-occurrence order).
///
/// Constructor patterns resolve through the package map: the tag is the
/// constructor's declaration index, elided for single-constructor types
/// so the pattern matches the family's only shape.
pub(crate) fn lower_pattern(
    packages: &PackageMap,
    pack: PackageName,
    pattern: &HirPattern,
    names: &[Symbol],
) -> LowerResult<Pattern> {
    let slot = |name: Symbol| -> usize {
        names
            .iter()
            .position(|n| *n == name)
            .expect("bound name is collected from this pattern")
    };

    match pattern {
        HirPattern::WildCard => Ok(Pattern::WildCard),

        HirPattern::Literal(lit) => Ok(Pattern::Literal(lit.clone())),

        HirPattern::Var(name) => Ok(Pattern::Var(slot(*name))),

        HirPattern::Named(name, inner) => Ok(Pattern::Named(
            slot(*name),
            Box::new(lower_pattern(packages, pack, inner, names)?),
        )),

        HirPattern::ListPat(parts) => {
            let parts = parts
                .iter()
                .map(|part| {
                    Ok(match part {
                        HirListPart::Splice(name) => ListPart::Splice(name.map(&slot)),
                        HirListPart::Item(pat) => {
                            ListPart::Item(lower_pattern(packages, pack, pat, names)?)
                        }
                    })
                })
                .collect::<LowerResult<Vec<_>>>()?;
            Ok(Pattern::list(parts)?)
        }

        HirPattern::PositionalStruct {
            constructor: (con_pack, con_name),
            params,
        } => {
            let (data, index) = packages.constructor(*con_pack, *con_name).ok_or(
                LowerError::UnknownConstructor {
                    package: *con_pack,
                    name: *con_name,
                },
            )?;
            let arity = data.constructors[index].arity;
            if arity != params.len() {
                return Err(LowerError::PatternArity {
                    name: *con_name,
                    expected: arity,
                    found: params.len(),
                });
            }
            let tag = if data.is_single_constructor() {
                None
            } else {
                Some(index as u32)
            };
            let params = params
                .iter()
                .map(|pat| lower_pattern(packages, pack, pat, names))
                .collect::<LowerResult<Vec<_>>>()?;
            Ok(Pattern::PositionalStruct {
                tag,
                params,
                family: data.family,
            })
        }

        HirPattern::Union(head, rest) => {
            let head = lower_pattern(packages, pack, head, names)?;
            let rest = rest
                .iter()
                .map(|pat| lower_pattern(packages, pack, pat, names))
                .collect::<LowerResult<Vec<_>>>()?;
            Ok(Pattern::union(head, rest)?)
        }

        HirPattern::StrPat(parts) => {
            let parts = parts
                .iter()
                .map(|part| match part {
                    HirStrPart::WildStr => StrPart::WildStr,
                    HirStrPart::NamedStr(name) => StrPart::NamedStr(slot(*name)),
                    HirStrPart::LitStr(text) => StrPart::LitStr(text.clone()),
                })
                .collect();
            Ok(Pattern::string(parts)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::DataFamily;
    use rill_hir::{Constructor, DataType, Package};

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    fn demo_map() -> PackageMap {
        let mut package = Package::new(PackageName::new("Demo"));
        package.types.push(DataType {
            name: sym("Shape"),
            family: DataFamily::Enum,
            constructors: vec![
                Constructor { name: sym("Dot"), arity: 0 },
                Constructor { name: sym("Line"), arity: 2 },
            ],
        });
        package.types.push(DataType {
            name: sym("Wrap"),
            family: DataFamily::Struct,
            constructors: vec![Constructor { name: sym("Wrap"), arity: 1 }],
        });
        let mut map = PackageMap::with_predef();
        map.insert(package);
        map
    }

    fn lower(pattern: &HirPattern) -> LowerResult<Pattern> {
        let names = pattern.names();
        lower_pattern(&demo_map(), PackageName::new("Demo"), pattern, &names)
    }

    #[test]
    fn test_names_become_dense_slots() {
        let pattern = HirPattern::PositionalStruct {
            constructor: (PackageName::new("Demo"), sym("Line")),
            params: vec![
                HirPattern::Var(sym("from")),
                HirPattern::Var(sym("to")),
            ],
        };
        let lowered = lower(&pattern).unwrap();
        assert_eq!(
            lowered,
            Pattern::PositionalStruct {
                tag: Some(1),
                params: vec![Pattern::Var(0), Pattern::Var(1)],
                family: DataFamily::Enum,
            }
        );
    }

    #[test]
    fn test_single_constructor_elides_tag() {
        let pattern = HirPattern::PositionalStruct {
            constructor: (PackageName::new("Demo"), sym("Wrap")),
            params: vec![HirPattern::WildCard],
        };
        let lowered = lower(&pattern).unwrap();
        assert_eq!(
            lowered,
            Pattern::PositionalStruct {
                tag: None,
                params: vec![Pattern::WildCard],
                family: DataFamily::Struct,
            }
        );
    }

    #[test]
    fn test_unknown_constructor_reported() {
        let pattern = HirPattern::PositionalStruct {
            constructor: (PackageName::new("Demo"), sym("Circle")),
            params: vec![],
        };
        let err = lower(&pattern).unwrap_err();
        assert_eq!(
            err,
            LowerError::UnknownConstructor {
                package: PackageName::new("Demo"),
                name: sym("Circle"),
            }
        );
    }

    #[test]
    fn test_arity_mismatch_reported() {
        let pattern = HirPattern::PositionalStruct {
            constructor: (PackageName::new("Demo"), sym("Line")),
            params: vec![HirPattern::WildCard],
        };
        let err = lower(&pattern).unwrap_err();
        assert_eq!(
            err,
            LowerError::PatternArity {
                name: sym("Line"),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_splice_and_named_share_slot_space() {
        let pattern = HirPattern::ListPat(vec![
            HirListPart::Item(HirPattern::Var(sym("head"))),
            HirListPart::Splice(Some(sym("tail"))),
        ]);
        let lowered = lower(&pattern).unwrap();
        assert_eq!(
            lowered,
            Pattern::ListPat(vec![
                ListPart::Item(Pattern::Var(0)),
                ListPart::Splice(Some(1)),
            ])
        );
    }

    #[test]
    fn test_union_arms_use_shared_names() {
        // Both arms bind `n`; the head's name list drives both slots.
        let pattern = HirPattern::Union(
            Box::new(HirPattern::Named(
                sym("n"),
                Box::new(HirPattern::Literal(rill_core::Lit::integer(1))),
            )),
            vec![HirPattern::Named(
                sym("n"),
                Box::new(HirPattern::Literal(rill_core::Lit::integer(2))),
            )],
        );
        let lowered = lower(&pattern).unwrap();
        assert_eq!(
            lowered,
            Pattern::union(
                Pattern::Named(0, Box::new(Pattern::Literal(rill_core::Lit::integer(1)))),
                vec![Pattern::Named(0, Box::new(Pattern::Literal(rill_core::Lit::integer(2))))],
            )
            .unwrap()
        );
    }
}
