use super::*;
use crate::ToString;
use crate::approximation::ComplexFormat;
use crate::interrupt::CancellationToken;
use crate::projection::{ProjectionContext, deep_system_project};
use crate::test_utils::parse_into;
use crate::units::AngleUnit;
use pretty_assertions::assert_eq;

fn projected(source: &str) -> (TreeArena, usize) {
    let (mut arena, root) = parse_into(source);
    let context = ProjectionContext {
        complex_format: ComplexFormat::Cartesian,
        angle_unit: AngleUnit::Radian,
        ..ProjectionContext::default()
    };
    deep_system_project(&mut arena, root, &context).unwrap();
    (arena, root)
}

fn reduced(source: &str) -> String {
    let (mut arena, root) = projected(source);
    let reduction = deep_systematic_reduce(&mut arena, root, &mut Budget::unlimited());
    assert_eq!(reduction.failure, None, "{source}");
    arena.extract(root).to_string()
}

#[test]
fn test_constant_folding() {
    assert_eq!(reduced("2+3*4"), "14");
    assert_eq!(reduced("1/3+1/6"), "1/2");
    assert_eq!(reduced("2^(-2)"), "1/4");
    assert_eq!(reduced("(2/3)^3"), "8/27");
}

#[test]
fn test_neutral_elements() {
    assert_eq!(reduced("x+0"), "UserSymbol(\"x\")");
    assert_eq!(reduced("1*x*1"), "UserSymbol(\"x\")");
    assert_eq!(reduced("x^1"), "UserSymbol(\"x\")");
    assert_eq!(reduced("x-x*0"), "Add(2)[UserSymbol(\"x\"), Mult(2)[0, UserSymbol(\"x\")]]");
}

#[test]
fn test_flattening() {
    assert_eq!(reduced("(x+1)+2"), "Add(2)[3, UserSymbol(\"x\")]");
    assert_eq!(
        reduced("2*(x*y)"),
        "Mult(3)[2, UserSymbol(\"x\"), UserSymbol(\"y\")]"
    );
}

#[test]
fn test_zero_product() {
    assert_eq!(reduced("0*π"), "0");
    assert_eq!(reduced("0*cos(3)"), "0");
    // ln(0) is undefined and must stay visible.
    assert_eq!(reduced("0*ln(0)"), "Mult(2)[0, Ln[0]]");
}

#[test]
fn test_undefined_powers_are_left_alone() {
    assert_eq!(reduced("0^0"), "Pow[0, 0]");
    assert_eq!(reduced("0^(-1)"), "Pow[0, -1]");
}

#[test]
fn test_unit_ratios_collapse() {
    assert_eq!(reduced("(12_km)/(6_mm)"), "2000000");
    assert_eq!(reduced("3_km"), "3000");
}

#[test]
fn test_overflow_keeps_best_effort_tree() {
    let (mut arena, root) = projected("1 + 99999999999^3");
    let reduction = deep_systematic_reduce(&mut arena, root, &mut Budget::unlimited());
    assert_eq!(reduction.failure, Some(ReductionFailure::Overflow));
    assert_eq!(arena.extract(root).to_string(), "Add(2)[1, Pow[99999999999, 3]]");
}

#[test]
fn test_budget_stops_reduction() {
    let (mut arena, root) = projected("1+2+3+4");
    let mut budget = Budget::new(CancellationToken::new(), 2, usize::MAX);
    let reduction = deep_systematic_reduce(&mut arena, root, &mut budget);
    assert_eq!(
        reduction.failure,
        Some(ReductionFailure::Aborted(AbortReason::IterationLimit { limit: 2 }))
    );
    assert!(reduction.failed());

    let token = CancellationToken::new();
    token.cancel();
    let (mut arena, root) = projected("1+2");
    let reduction = deep_systematic_reduce(
        &mut arena,
        root,
        &mut Budget::new(token, u64::MAX, usize::MAX),
    );
    assert_eq!(
        reduction.failure,
        Some(ReductionFailure::Aborted(AbortReason::Cancelled))
    );
    assert_eq!(arena.extract(root).to_string(), "Add(2)[1, 2]");
}

#[test]
fn test_reduction_preserves_values() {
    use crate::approximation::{Context, Outcome, to_complex};
    for source in ["2^10 - 3/7", "(1+2)*(x*0+4)", "sum(k^2, k, 1, 4)/3", "cos(1)*2*3"] {
        let (arena, root) = projected(source);
        let before = to_complex(&arena, root, &mut Context::<f64>::default()).unwrap();
        let (mut reduced, root) = projected(source);
        deep_systematic_reduce(&mut reduced, root, &mut Budget::unlimited());
        let after = to_complex(&reduced, root, &mut Context::<f64>::default()).unwrap();
        match (before, after) {
            (Outcome::Value(a), Outcome::Value(b)) => {
                assert!((a - b).norm() <= 1e-12 * a.norm().max(1.0), "{source}")
            }
            (a, b) => assert_eq!(a, b, "{source}"),
        }
    }
}
