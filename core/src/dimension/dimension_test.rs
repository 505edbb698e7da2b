use super::*;
use crate::test_utils::parse_into;
use crate::units::{Family, id};
use pretty_assertions::assert_eq;

fn dimension_of(source: &str) -> Dimension {
    let (arena, root) = parse_into(source);
    assert!(deep_check(&arena, root), "{source} should pass the deep check");
    get_dimension(&arena, root)
}

fn rejects(source: &str) -> bool {
    let (arena, root) = parse_into(source);
    !deep_check(&arena, root)
}

fn length_of(source: &str) -> Option<usize> {
    let (arena, root) = parse_into(source);
    list_length(&arena, root)
}

#[test]
fn test_scalars_and_booleans() {
    assert_eq!(dimension_of("2+3*4"), Dimension::Scalar);
    assert_eq!(dimension_of("1<2 and true"), Dimension::Boolean);
    assert_eq!(dimension_of("(1, 2)"), Dimension::Point);
}

#[test]
fn test_matrix_shapes() {
    assert_eq!(
        dimension_of("[[1,2,3][4,5,6]]"),
        Dimension::Matrix { rows: 2, cols: 3 }
    );
    assert_eq!(
        dimension_of("transpose([[1,2,3][4,5,6]])"),
        Dimension::Matrix { rows: 3, cols: 2 }
    );
    assert_eq!(
        dimension_of("[[1,2][3,4]]*[[1][2]]"),
        Dimension::Matrix { rows: 2, cols: 1 }
    );
    assert_eq!(dimension_of("identity(3)"), Dimension::Matrix { rows: 3, cols: 3 });
    assert!(rejects("[[1,2][3,4]]*[[1,2,3]]"));
    assert!(rejects("det([[1,2,3]])"));
    assert!(rejects("[[1,2][3,4]]+1"));
    assert!(rejects("cos([[1]])"));
    assert!(rejects("2/[[1,2][3,4]]"));
}

#[test]
fn test_units_combine() {
    assert_eq!(
        dimension_of("3_m/_s"),
        Dimension::Unit {
            vector: Family::Speed.si_vector(),
            representative: Some(id::SECOND),
        }
    );
    assert_eq!(dimension_of("12_km/(6_mm)"), Dimension::Scalar);
    assert_eq!(
        dimension_of("(2_m)^2"),
        Dimension::Unit {
            vector: Family::Surface.si_vector(),
            representative: Some(id::METER),
        }
    );
    assert!(rejects("1_m+1_s"));
    assert!(rejects("1_m+1"));
    assert!(rejects("_m^(1/2)"));
    assert!(rejects("_m^x"));
    assert!(rejects("ln(3_m)"));
    assert!(rejects("_m*[[1,2]]"));
}

#[test]
fn test_units_in_functions() {
    assert!(!rejects("cos(90_°)"));
    assert!(!rejects("abs(-3_m)"));
    assert!(rejects("cos(3_m)"));
    assert!(rejects("cos(_rad^2)"));
}

#[test]
fn test_temperatures() {
    assert!(!rejects("20_°C"));
    assert!(!rejects("20_°C→_K"));
    assert!(!rejects("300_K→_°F"));
    assert!(rejects("20_°C+5_°C"));
    assert!(rejects("20_°C*_m"));
    assert!(rejects("_°C^2"));
    assert!(rejects("1/_°C"));
    assert!(rejects("abs(_°C)"));
    // Kelvin is an ordinary unit.
    assert!(!rejects("_K^2"));
}

#[test]
fn test_unit_conversion() {
    assert!(!rejects("3_km→_mi"));
    assert!(!rejects("1.5→_°"));
    assert!(rejects("3_km→_s"));
    assert!(rejects("3_km→2_mi"));
}

#[test]
fn test_temperature_equality_uses_representative() {
    assert_ne!(Dimension::unit(id::CELSIUS), Dimension::unit(id::KELVIN));
    assert_eq!(Dimension::unit(id::METER), Dimension::unit(id::MILE));
}

#[test]
fn test_lists() {
    assert_eq!(length_of("{1,2,3}"), Some(3));
    assert_eq!(length_of("{1,2,3}+1"), Some(3));
    assert_eq!(length_of("sequence(k^2, k, 4)"), Some(4));
    assert_eq!(length_of("randintnorep(1, 10, 5)"), Some(5));
    assert_eq!(length_of("{4,5,6,7}(2, 3)"), Some(2));
    assert_eq!(length_of("mean({1,2})"), None);
    assert_eq!(length_of("3"), None);
    assert_eq!(dimension_of("{(1,2),(3,4)}"), Dimension::Point);
    assert!(rejects("{1,2}+{1,2,3}"));
    assert!(rejects("{{1},{2}}"));
    assert!(rejects("{1,true}"));
    assert!(rejects("sampstddev({1})"));
    assert!(rejects("{1,2}*_m"));
}

#[test]
fn test_booleans_and_points_are_confined() {
    assert!(rejects("true+1"));
    assert!(rejects("not 3"));
    assert!(rejects("(1,2)+1"));
    assert!(!rejects("piecewise(1, x<0, 2)"));
    assert!(rejects("piecewise(1, 2, 3)"));
    assert!(rejects("piecewise(1, x<0, [[1]])"));
    assert!(!rejects("(true)"));
}

#[test]
fn test_parametric_bounds() {
    assert!(!rejects("sum(k, k, 1, 10)"));
    assert!(rejects("sum(k, k, 1, [[1]])"));
    assert_eq!(
        dimension_of("product([[1,0][0,k]], k, 1, 3)"),
        Dimension::Matrix { rows: 2, cols: 2 }
    );
}
