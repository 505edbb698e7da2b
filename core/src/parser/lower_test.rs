use pretty_assertions::assert_eq;

use crate::parser::{ParseErrorKind, parse_into_arena};
use crate::tree::{ArenaError, TreeArena};
use crate::units::parse_unit;

fn lowered(source: &str) -> String {
    let mut arena = TreeArena::default();
    let root = parse_into_arena(&mut arena, source)
        .unwrap_or_else(|e| panic!("failed to lower {source:?}: {e}"));
    arena.extract(root).to_string()
}

fn error_kind(source: &str) -> ParseErrorKind {
    let mut arena = TreeArena::default();
    parse_into_arena(&mut arena, source)
        .expect_err("expected an error")
        .kind
}

#[test]
fn test_associative_chains_flatten() {
    assert_eq!(lowered("1+2+3"), "Add(3)[1, 2, 3]");
    assert_eq!(lowered("(1+2)+3"), "Add(2)[Parenthesis[Add(2)[1, 2]], 3]");
    assert_eq!(lowered("2*3/4"), "Div[Mult(2)[2, 3], 4]");
    assert_eq!(lowered("1-2+3"), "Add(2)[Sub[1, 2], 3]");
}

#[test]
fn test_literals() {
    assert_eq!(lowered("3.14"), "Decimal(e2)[314]");
    assert_eq!(lowered("2.0"), "Decimal(e1)[20]");
    assert_eq!(lowered("true"), "True");
    assert_eq!(lowered("pi"), "Pi");
    assert_eq!(lowered("∞"), "Infinity");
}

#[test]
fn test_negation_binds_looser_than_power() {
    assert_eq!(lowered("-2^2"), "Opposite[Pow[2, 2]]");
}

#[test]
fn test_bound_variables() {
    assert_eq!(lowered("sum(k^2, k, 1, 10)"), "Sum[1, 10, Pow[Var(0), 2]]");
    assert_eq!(
        lowered("sum(sum(j*k, j, 1, k), k, 1, 3)"),
        "Sum[1, 3, Sum[1, Var(0), Mult(2)[Var(0), Var(1)]]]"
    );
    assert_eq!(
        lowered("sequence(k, k, 3)"),
        "ListSequence[Var(0), 3]"
    );
    // Outside its construct the name is an ordinary symbol.
    assert_eq!(
        lowered("sum(k, k, 1, 2)+k"),
        "Add(2)[Sum[1, 2, Var(0)], UserSymbol(\"k\")]"
    );
}

#[test]
fn test_user_calls() {
    assert_eq!(lowered("x+1"), "Add(2)[UserSymbol(\"x\"), 1]");
    assert_eq!(lowered("f(2)"), "UserFunction(\"f\")[2]");
    assert_eq!(lowered("u(3)"), "UserSequence(\"u\")[3]");
}

#[test]
fn test_builtin_calls() {
    assert_eq!(lowered("log(8, 2)"), "LogBase[8, 2]");
    assert_eq!(lowered("log(8)"), "Log[8]");
    assert_eq!(lowered("round(2.5)"), "Round[Decimal(e1)[25], 0]");
    assert_eq!(lowered("gcd(4, 6, 8)"), "Gcd(3)[4, 6, 8]");
    assert_eq!(lowered("sum({1, 2})"), "ListSum[List(2)[1, 2]]");
    assert_eq!(lowered("randint(1, 6)"), "RandInt[0][1, 6]");
}

#[test]
fn test_list_access() {
    assert_eq!(lowered("{1, 2}(1)"), "ListElement[List(2)[1, 2], 1]");
    assert_eq!(lowered("{1, 2, 3}(1, 2)"), "ListSlice[List(3)[1, 2, 3], 1, 2]");
}

#[test]
fn test_matrix_and_point() {
    assert_eq!(lowered("[[1, 2][3, 4]]"), "Matrix(2x2)[1, 2, 3, 4]");
    assert_eq!(lowered("(1, 2)"), "Point[1, 2]");
}

#[test]
fn test_percent_addition() {
    assert_eq!(lowered("5+10%"), "PercentAddition[5, 10]");
    assert_eq!(lowered("5-10%"), "PercentAddition[5, Opposite[10]]");
    assert_eq!(lowered("10%"), "Percent[10]");
}

#[test]
fn test_units() {
    let (rep, prefix) = parse_unit("km").unwrap();
    assert_eq!(
        lowered("3_km"),
        format!("Mult(2)[3, Unit({}, {})]", rep, prefix)
    );
    let (m_rep, m_prefix) = parse_unit("m").unwrap();
    assert_eq!(
        lowered("1_m→_km"),
        format!(
            "UnitConversion[Mult(2)[1, Unit({}, {})], Unit({}, {})]",
            m_rep, m_prefix, rep, prefix
        )
    );
}

#[test]
fn test_logic_and_comparisons() {
    assert_eq!(
        lowered("1<2 and not 3≥4"),
        "LogicalAnd[Less[1, 2], LogicalNot[GreaterOrEqual[3, 4]]]"
    );
}

#[test]
fn test_lowering_errors() {
    assert!(matches!(error_kind("_zz"), ParseErrorKind::UnknownUnit { .. }));
    assert_eq!(
        error_kind("sin(1, 2)"),
        ParseErrorKind::WrongArgumentCount {
            function: "sin".to_string(),
            expected: "1",
            found: 2,
        }
    );
    assert!(matches!(
        error_kind("sum(1, 2, 3, 4)"),
        ParseErrorKind::ExpectedVariable { .. }
    ));
    assert!(matches!(
        error_kind("sum(k, pi, 1, 2)"),
        ParseErrorKind::ExpectedVariable { .. }
    ));
}

#[test]
fn test_arena_exhaustion() {
    let mut arena = TreeArena::with_capacity(2);
    let error = parse_into_arena(&mut arena, "1+2+3").unwrap_err();
    assert_eq!(
        error.kind,
        ParseErrorKind::Arena(ArenaError::Exhausted { capacity: 2 })
    );
}
