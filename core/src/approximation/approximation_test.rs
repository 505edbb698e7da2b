use super::*;
use crate::interrupt::{AbortReason, Budget, CancellationToken};
use crate::test_utils::parse_into;
use crate::units::AngleUnit;
use pretty_assertions::assert_eq;

fn real_of(source: &str) -> Outcome<f64> {
    let (arena, root) = parse_into(source);
    let mut context = Context::<f64>::default();
    to_real(&arena, root, &mut context).unwrap()
}

fn complex_of(source: &str) -> Outcome<Complex<f64>> {
    let (arena, root) = parse_into(source);
    let mut context = Context::<f64>::new(
        AngleUnit::Radian,
        ComplexFormat::Cartesian,
        0,
        Budget::unlimited(),
    );
    to_complex(&arena, root, &mut context).unwrap()
}

fn assert_close(outcome: Outcome<f64>, expected: f64) {
    match outcome {
        Outcome::Value(v) => assert!(
            (v - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "expected {expected}, got {v}"
        ),
        other => panic!("expected {expected}, got {other:?}"),
    }
}

#[test]
fn test_arithmetic() {
    assert_eq!(real_of("2+3*4"), Outcome::Value(14.0));
    assert_eq!(real_of("7-2/4"), Outcome::Value(6.5));
    assert_eq!(real_of("-3^2"), Outcome::Value(-9.0));
    assert_eq!(real_of("5!"), Outcome::Value(120.0));
    assert_eq!(real_of("1/0"), Outcome::Undefined);
    assert_eq!(real_of("0^0"), Outcome::Undefined);
}

#[test]
fn test_cos_of_right_angle_is_exact_in_degrees() {
    assert_eq!(real_of("cos(90)"), Outcome::Value(0.0));
    assert_eq!(real_of("sin(90)"), Outcome::Value(1.0));
    assert_close(real_of("acos(0)"), 90.0);
    assert_eq!(real_of("tan(90)"), Outcome::Undefined);
}

#[test]
fn test_inverse_tangent_in_current_angle_unit() {
    assert_close(real_of("atan(1)"), 45.0);
    assert_close(real_of("atan(-1)"), -45.0);
    let Outcome::Value(angle) = complex_of("atan(1)") else {
        panic!("value expected");
    };
    assert!((angle.re - core::f64::consts::FRAC_PI_4).abs() < 1e-12 && angle.im == 0.0);
}

#[test]
fn test_angle_unit_in_argument_overrides_context() {
    assert_eq!(real_of("cos(π_rad)"), Outcome::Value(-1.0));
    assert_close(real_of("sin(100_gon)"), 1.0);
}

#[test]
fn test_real_mode_rejects_complex_values() {
    assert_eq!(real_of("sqrt(-4)"), Outcome::NonReal);
    assert_eq!(real_of("ln(-1)"), Outcome::NonReal);
    let Outcome::Value(root) = complex_of("sqrt(-4)") else {
        panic!("complex root expected");
    };
    assert!(root.re.abs() < 1e-12 && (root.im - 2.0).abs() < 1e-12);
    assert_eq!(complex_of("i^2"), Outcome::Value(Complex::new(-1.0, 0.0)));
}

#[test]
fn test_real_root_of_negative_base() {
    assert_close(real_of("(-8)^(1/3)"), -2.0);
    assert_close(real_of("(-8)^(2/3)"), 4.0);
    assert_eq!(real_of("(-8)^(1/2)"), Outcome::NonReal);
    // Cartesian mode keeps the principal root.
    let Outcome::Value(principal) = complex_of("(-8)^(1/3)") else {
        panic!("principal root should exist");
    };
    assert!((principal.re - 1.0).abs() < 1e-12);
    assert!((principal.im - 3f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_logarithms() {
    assert_eq!(real_of("ln(0)"), Outcome::Undefined);
    assert_close(real_of("log(1000)"), 3.0);
    assert_close(real_of("log(8, 2)"), 3.0);
}

#[test]
fn test_integer_functions() {
    assert_eq!(real_of("floor(0.29*100)"), Outcome::Value(29.0));
    assert_eq!(real_of("ceil(-1.5)"), Outcome::Value(-1.0));
    assert_eq!(real_of("rem(-7, 3)"), Outcome::Value(2.0));
    assert_eq!(real_of("quo(-7, 3)"), Outcome::Value(-3.0));
    assert_eq!(real_of("gcd(12, 18, 30)"), Outcome::Value(6.0));
    assert_eq!(real_of("lcm(4, 6)"), Outcome::Value(12.0));
    assert_eq!(real_of("binomial(5, 2)"), Outcome::Value(10.0));
    assert_eq!(real_of("permute(5, 2)"), Outcome::Value(20.0));
    assert_eq!(real_of("(-1)!"), Outcome::Undefined);
    assert_eq!(real_of("round(3.14159, 2)"), Outcome::Value(3.14));
}

#[test]
fn test_parametric_constructs() {
    assert_eq!(real_of("sum(k, k, 1, 10)"), Outcome::Value(55.0));
    assert_eq!(real_of("product(k, k, 1, 5)"), Outcome::Value(120.0));
    assert_eq!(real_of("sum(k, k, 3, 1)"), Outcome::Value(0.0));
    assert_eq!(real_of("sum(1/(k-2), k, 1, 3)"), Outcome::Undefined);
    assert_close(real_of("int(x^2, x, 0, 3)"), 9.0);
    assert_close(real_of("int(x, x, 0, 1)"), 0.5);
    assert_eq!(real_of("int(x, x, 2, 2)"), Outcome::Value(0.0));
}

#[test]
fn test_nested_sums_bind_innermost_variable() {
    assert_eq!(real_of("sum(sum(j, j, 1, k), k, 1, 3)"), Outcome::Value(10.0));
    assert_eq!(real_of("sum(sum(k, j, 1, 2), k, 1, 3)"), Outcome::Value(12.0));
}

#[test]
fn test_list_statistics() {
    assert_eq!(real_of("mean({1,2,3,4})"), Outcome::Value(2.5));
    assert_eq!(real_of("median({3,1,2})"), Outcome::Value(2.0));
    assert_eq!(real_of("min({3,1,2})"), Outcome::Value(1.0));
    assert_eq!(real_of("sum({1,2,3})"), Outcome::Value(6.0));
    assert_eq!(real_of("{4,5,6,7}(2)"), Outcome::Value(5.0));
    assert_eq!(real_of("{4,5,6,7}(5)"), Outcome::Undefined);
    assert_eq!(real_of("dim({4,5,6})"), Outcome::Value(3.0));
    assert_eq!(real_of("mean({1,1/0})"), Outcome::Undefined);
}

#[test]
fn test_list_keeps_other_elements_when_one_is_undefined() {
    let (arena, root) = parse_into("{1,2,4}^(-1)*2");
    let mut context = Context::<f64>::default();
    let list = to_list(&arena, root, &mut context).unwrap();
    assert_eq!(
        list,
        Outcome::Value(vec![
            Outcome::Value(Element::Number(Complex::new(2.0, 0.0))),
            Outcome::Value(Element::Number(Complex::new(1.0, 0.0))),
            Outcome::Value(Element::Number(Complex::new(0.5, 0.0))),
        ])
    );

    let (arena, root) = parse_into("1/{1,0,2}");
    let list = to_list(&arena, root, &mut context).unwrap();
    assert_eq!(
        list,
        Outcome::Value(vec![
            Outcome::Value(Element::Number(Complex::new(1.0, 0.0))),
            Outcome::Undefined,
            Outcome::Value(Element::Number(Complex::new(0.5, 0.0))),
        ])
    );
}

#[test]
fn test_sequences_and_slices() {
    let (arena, root) = parse_into("sequence(k^2, k, 4)(2, 3)");
    let mut context = Context::<f64>::default();
    let list = to_list(&arena, root, &mut context).unwrap();
    assert_eq!(
        list,
        Outcome::Value(vec![
            Outcome::Value(Element::Number(Complex::new(4.0, 0.0))),
            Outcome::Value(Element::Number(Complex::new(9.0, 0.0))),
        ])
    );
    assert_eq!(real_of("sort({3,1,2})(1)"), Outcome::Value(1.0));
}

#[test]
fn test_booleans_and_piecewise() {
    let boolean = |source: &str| {
        let (arena, root) = parse_into(source);
        to_boolean(&arena, root, &mut Context::<f64>::default()).unwrap()
    };
    assert_eq!(boolean("1<2 and 3≥3"), Outcome::Value(true));
    assert_eq!(boolean("0.1+0.2=0.3"), Outcome::Value(true));
    assert_eq!(boolean("not (1=1) or 2≠2"), Outcome::Value(false));
    assert_eq!(boolean("true xor true"), Outcome::Value(false));
    assert_eq!(boolean("1/0<2"), Outcome::Undefined);

    assert_eq!(real_of("piecewise(1, 2<1, 3)"), Outcome::Value(3.0));
    assert_eq!(real_of("piecewise(1, 1<2, 3)"), Outcome::Value(1.0));
    assert_eq!(real_of("piecewise(1, 2<1)"), Outcome::Undefined);
}

#[test]
fn test_points() {
    let (arena, root) = parse_into("(1+1, 3)");
    let point = to_point(&arena, root, &mut Context::<f64>::default()).unwrap();
    assert_eq!(point, Outcome::Value((2.0, 3.0)));
}

#[test]
fn test_matrices() {
    assert_close(real_of("det([[1,2][3,4]])"), -2.0);
    assert_eq!(real_of("trace([[1,2][3,4]])"), Outcome::Value(5.0));
    assert_eq!(real_of("norm([[3,4]])"), Outcome::Value(5.0));
    assert_eq!(real_of("dot([[1,2,3]], [[4,5,6]])"), Outcome::Value(32.0));

    let (arena, root) = parse_into("[[1,2][3,4]]*[[1][1]]+[[1][0]]");
    let matrix = to_matrix(&arena, root, &mut Context::<f64>::default()).unwrap();
    let Outcome::Value(matrix) = matrix else {
        panic!("matrix expected");
    };
    assert_eq!((matrix.rows, matrix.cols), (2, 1));
    assert_eq!(
        matrix.entries,
        vec![Complex::new(4.0, 0.0), Complex::new(7.0, 0.0)]
    );

    let (arena, root) = parse_into("inverse([[1,2][2,4]])");
    let singular = to_matrix(&arena, root, &mut Context::<f64>::default()).unwrap();
    assert_eq!(singular, Outcome::Undefined);
}

#[test]
fn test_approximate_dispatches_on_dimension() {
    let (arena, root) = parse_into("1<2");
    let value = approximate(&arena, root, &mut Context::<f64>::default()).unwrap();
    assert_eq!(value, Outcome::Value(Value::Boolean(true)));

    let (arena, root) = parse_into("transpose([[1,2]])");
    let value = approximate(&arena, root, &mut Context::<f64>::default()).unwrap();
    assert!(matches!(value, Outcome::Value(Value::Matrix(m)) if m.rows == 2 && m.cols == 1));
}

#[test]
fn test_root_guard() {
    assert_eq!(real_of("1_m+1_s"), Outcome::Undefined);

    let (mut arena, root) = parse_into("1+2");
    let two = arena.child(root, 1);
    arena
        .replace_with_node(two, crate::tree::Node::leaf(NodeKind::Forbidden))
        .unwrap();
    let mut context = Context::<f64>::default();
    assert_eq!(to_real(&arena, root, &mut context).unwrap(), Outcome::Forbidden);
}

#[test]
fn test_random_draws_are_consistent_within_evaluation() {
    let (arena, root) = parse_into("{randint(1, 100), randint(1, 100)}");
    let mut context = Context::<f64>::new(
        AngleUnit::Degree,
        ComplexFormat::Real,
        42,
        Budget::unlimited(),
    );
    let first = to_list(&arena, root, &mut context).unwrap();
    let again = to_list(&arena, root, &mut context).unwrap();
    assert_eq!(first, again);

    let (arena, root) = parse_into("randintnorep(1, 10, 10)");
    let Outcome::Value(draws) = to_list(&arena, root, &mut context).unwrap() else {
        panic!("draws expected");
    };
    let mut values: Vec<i64> = draws
        .into_iter()
        .map(|d| match d {
            Outcome::Value(Element::Number(v)) => v.re as i64,
            other => panic!("unexpected draw {other:?}"),
        })
        .collect();
    values.sort();
    assert_eq!(values, (1..=10).collect::<Vec<_>>());

    assert_eq!(real_of("randint(5, 5)"), Outcome::Value(5.0));
    assert_eq!(real_of("randint(5, 1)"), Outcome::Undefined);
}

#[test]
fn test_cancellation_aborts() {
    let (arena, root) = parse_into("sum(k, k, 1, 1000000)");
    let token = CancellationToken::new();
    token.cancel();
    let mut context = Context::<f64>::new(
        AngleUnit::Degree,
        ComplexFormat::Real,
        0,
        Budget::new(token, u64::MAX, usize::MAX),
    );
    let aborted = to_real(&arena, root, &mut context).unwrap_err();
    assert_eq!(aborted.reason, AbortReason::Cancelled);
}

#[test]
fn test_iteration_limit() {
    let (arena, root) = parse_into("sum(k, k, 1, 1000)");
    let mut context = Context::<f64>::new(
        AngleUnit::Degree,
        ComplexFormat::Real,
        0,
        Budget::new(CancellationToken::new(), 100, usize::MAX),
    );
    let aborted = to_real(&arena, root, &mut context).unwrap_err();
    assert_eq!(aborted.reason, AbortReason::IterationLimit { limit: 100 });
}

#[test]
fn test_long_lists_are_rejected_before_allocation() {
    let budget = || Budget::new(CancellationToken::new(), 1000, usize::MAX);
    let (arena, root) = parse_into("sequence(k, k, 10^15)");
    let mut context = Context::<f64>::new(AngleUnit::Degree, ComplexFormat::Real, 0, budget());
    let aborted = to_list(&arena, root, &mut context).unwrap_err();
    assert_eq!(aborted.reason, AbortReason::IterationLimit { limit: 1000 });

    let (arena, root) = parse_into("mean(sequence(k, k, 10^15))");
    let mut context = Context::<f64>::new(AngleUnit::Degree, ComplexFormat::Real, 0, budget());
    let aborted = to_real(&arena, root, &mut context).unwrap_err();
    assert_eq!(aborted.reason, AbortReason::IterationLimit { limit: 1000 });

    let (arena, root) = parse_into("sequence(k, k, 10)");
    let mut context = Context::<f64>::new(AngleUnit::Degree, ComplexFormat::Real, 0, budget());
    assert!(matches!(to_list(&arena, root, &mut context), Ok(Outcome::Value(v)) if v.len() == 10));
}

#[test]
fn test_single_precision() {
    let (arena, root) = parse_into("1/3");
    let mut context = Context::<f32>::default();
    let Outcome::Value(third) = to_real(&arena, root, &mut context).unwrap() else {
        panic!("value expected");
    };
    assert!((third - 1.0 / 3.0).abs() < 1e-6);
}

#[test]
fn test_approximate_integer() {
    let (arena, root) = parse_into("2*3+1");
    assert_eq!(approximate_integer(&arena, root), Some(7));
    let (arena, root) = parse_into("1/2");
    assert_eq!(approximate_integer(&arena, root), None);
}
