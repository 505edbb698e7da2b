use super::*;
use crate::approximation::{ComplexFormat, Element};
use crate::interrupt::AbortReason;
use crate::projection::ProjectionPolicy;
use crate::tree::DecodeError;
use crate::units::AngleUnit;
use pretty_assertions::assert_eq;

fn engine() -> Engine {
    crate::test_utils::init_test_logging();
    Engine::new(EngineOptions::default())
}

fn engine_with(preferences: Preferences) -> Engine {
    let mut engine = engine();
    engine.set_preferences(preferences);
    engine
}

fn approximate(engine: &mut Engine, source: &str) -> String {
    let evaluation = engine
        .evaluate(source)
        .unwrap_or_else(|e| panic!("failed to evaluate {source:?}: {e}"));
    evaluation.approximate.unwrap()
}

#[test]
fn test_scenarios() {
    let mut engine = engine();
    assert_eq!(approximate(&mut engine, "2+3*4"), "14");
    assert_eq!(approximate(&mut engine, "cos(90)"), "0");
    assert_eq!(approximate(&mut engine, "(12_km)/(6_mm)"), "2000000");
    assert_eq!(approximate(&mut engine, "1_m + 1_yd"), "1.9144_m");
}

#[test]
fn test_exact_and_approximate_forms() {
    let mut engine = engine();
    let evaluation = engine.evaluate("1/3").unwrap();
    assert_eq!(evaluation.exact.as_deref(), Some("1/3"));
    assert_eq!(evaluation.approximate.unwrap(), "0.3333333333");

    let evaluation = engine.evaluate("2^10-24").unwrap();
    assert_eq!(evaluation.exact.as_deref(), Some("1000"));
}

#[test]
fn test_exact_form_only_for_closed_forms() {
    let mut engine = engine();
    for source in ["asin(0.5)", "cosh(0)", "log(100)", "arsinh(0)", "randint(1,6)-randint(1,6)"] {
        let evaluation = engine.evaluate(source).unwrap();
        assert_eq!(evaluation.exact, None, "{source}");
        assert!(evaluation.outcome.is_value(), "{source}");
    }
    assert_eq!(approximate(&mut engine, "asin(0.5)"), "30");
    assert_eq!(approximate(&mut engine, "log(100)"), "2");

    let evaluation = engine.evaluate("1/2+1/3").unwrap();
    assert_eq!(evaluation.exact.as_deref(), Some("5/6"));
}

#[test]
fn test_exam_mode_hides_exact_results() {
    let mut engine = engine_with(Preferences {
        policy: ProjectionPolicy {
            forbid_exact_results: true,
            ..ProjectionPolicy::default()
        },
        ..Preferences::default()
    });
    let evaluation = engine.evaluate("1/3").unwrap();
    assert_eq!(evaluation.exact, None);
    assert_eq!(evaluation.approximate.unwrap(), "0.3333333333");
}

#[test]
fn test_exam_mode_forbids_units() {
    let mut engine = engine_with(Preferences {
        policy: ProjectionPolicy {
            forbid_units: true,
            ..ProjectionPolicy::default()
        },
        ..Preferences::default()
    });
    let evaluation = engine.evaluate("3_m").unwrap();
    assert_eq!(evaluation.outcome, Outcome::Forbidden);
    assert_eq!(evaluation.approximate.unwrap(), "forbidden");
}

#[test]
fn test_unit_conversions() {
    let mut engine = engine();
    assert_eq!(approximate(&mut engine, "3_km→_m"), "3000_m");
    assert_eq!(approximate(&mut engine, "1_h->_min"), "60_min");
    assert_eq!(approximate(&mut engine, "100_°C→_°F"), "212_°F");
    assert_eq!(approximate(&mut engine, "1_in→_cm"), "2.54_cm");

    let evaluation = engine.evaluate("3_km→_m").unwrap();
    assert!(evaluation.outcome.is_value());
    assert_eq!(evaluation.exact, None);
}

#[test]
fn test_invalid_dimensions_are_undefined() {
    let mut engine = engine();
    let evaluation = engine.evaluate("1_m + 1_s").unwrap();
    assert_eq!(evaluation.outcome, Outcome::Undefined);
    assert_eq!(evaluation.approximate.unwrap(), "undef");
}

#[test]
fn test_complex_formats() {
    let mut engine = engine();
    assert_eq!(approximate(&mut engine, "sqrt(-4)"), "nonreal");

    engine.set_preferences(Preferences {
        complex_format: ComplexFormat::Cartesian,
        ..Preferences::default()
    });
    assert_eq!(approximate(&mut engine, "sqrt(-4)"), "2*i");
}

#[test]
fn test_lists_keep_defined_elements() {
    let mut engine = engine();
    let evaluation = engine.evaluate("{1, 1/0, 3}").unwrap();
    let Outcome::Value(Value::List(elements)) = &evaluation.outcome else {
        panic!("expected a list, got {:?}", evaluation.outcome);
    };
    assert_eq!(elements[1], Outcome::Undefined);
    assert!(matches!(elements[2], Outcome::Value(Element::Number(_))));
    assert_eq!(evaluation.approximate.unwrap(), "{1, undef, 3}");
}

#[test]
fn test_symbols_and_functions() {
    let mut engine = engine();
    engine.define_symbol("a", "5").unwrap();
    engine.define_function("f", "x", "x^2+a").unwrap();
    assert_eq!(approximate(&mut engine, "f(3)"), "14");

    // Symbols stay by name inside definitions.
    engine.define_symbol("a", "1").unwrap();
    assert_eq!(approximate(&mut engine, "f(3)"), "10");

    assert_eq!(approximate(&mut engine, "b+1"), "undef");
    assert_eq!(engine.symbols().len(), 2);
}

#[test]
fn test_circular_definitions() {
    let mut engine = engine();
    engine.define_symbol("a", "b+1").unwrap();
    engine.define_symbol("b", "2*a").unwrap();
    assert_eq!(
        engine.evaluate("a"),
        Err(Error::CircularDefinition { name: "a".into() })
    );
}

#[test]
fn test_syntax_errors() {
    let mut engine = engine();
    assert!(matches!(engine.evaluate("2+"), Err(Error::Syntax(_))));
    assert!(matches!(engine.define_symbol("a", "(1"), Err(Error::Syntax(_))));
    assert!(engine.symbols().is_empty());
}

#[test]
fn test_cancellation_rolls_back() {
    let mut engine = engine();
    let token = engine.cancellation_token();
    token.cancel();
    assert_eq!(
        engine.evaluate("1+2"),
        Err(Error::ComputationAborted(AbortReason::Cancelled))
    );
    assert_eq!(engine.arena.len(), 0);

    token.reset();
    assert_eq!(approximate(&mut engine, "1+2"), "3");
    assert_eq!(engine.arena.len(), 0);
}

#[test]
fn test_iteration_limit() {
    let mut engine = Engine::new(EngineOptions {
        evaluation: EvaluationOptions {
            max_iterations: 100,
            ..EvaluationOptions::default()
        },
        ..EngineOptions::default()
    });
    assert!(matches!(
        engine.evaluate("sum(k, k, 1, 1000)"),
        Err(Error::ComputationAborted(AbortReason::IterationLimit { .. }))
    ));
    assert_eq!(approximate(&mut engine, "sum(k, k, 1, 10)"), "55");
}

#[test]
fn test_huge_sequences_abort() {
    let mut engine = engine();
    assert!(matches!(
        engine.evaluate("sequence(k, k, 10^15)"),
        Err(Error::ComputationAborted(AbortReason::IterationLimit { .. }))
    ));
    assert!(matches!(
        engine.evaluate("randintnorep(1, 10^15, 10^12)"),
        Err(Error::ComputationAborted(AbortReason::IterationLimit { .. }))
    ));
    assert_eq!(engine.arena.len(), 0);
    assert_eq!(approximate(&mut engine, "sequence(k, k, 3)"), "{1, 2, 3}");
}

#[test]
fn test_arena_exhaustion() {
    let mut engine = Engine::new(EngineOptions {
        arena_capacity: 8,
        ..EngineOptions::default()
    });
    assert_eq!(
        engine.evaluate("1+2+3+4+5+6+7+8+9"),
        Err(Error::ArenaExhausted { capacity: 8 })
    );
    assert_eq!(engine.arena.len(), 0);
    assert_eq!(approximate(&mut engine, "1+2"), "3");
}

#[test]
fn test_random_draws_advance_per_evaluation() {
    let draws = |engine: &mut Engine| {
        [approximate(engine, "random()"), approximate(engine, "random()")]
    };
    let first = draws(&mut engine());
    assert_ne!(first[0], first[1]);
    // A fresh engine with the same seed replays the session.
    assert_eq!(draws(&mut engine()), first);
}

#[test]
fn test_serialized_trees_evaluate() {
    let mut engine = engine_with(Preferences {
        angle_unit: AngleUnit::Radian,
        ..Preferences::default()
    });
    let bytes = engine.serialize("2+3*cos(0)").unwrap();
    let evaluation = engine.evaluate_bytes(&bytes).unwrap();
    assert_eq!(evaluation.approximate.unwrap(), "5");

    assert_eq!(
        engine.evaluate_bytes(&[]),
        Err(Error::Decode(DecodeError::Empty))
    );
}

#[test]
fn test_length_budget() {
    let mut engine = engine_with(Preferences {
        max_length: 4,
        ..Preferences::default()
    });
    let evaluation = engine.evaluate("123456789").unwrap();
    assert_eq!(evaluation.approximate, Ok("1ᴇ8".into()));
    assert_eq!(evaluation.exact, None);
}

#[test]
fn test_parse_does_not_keep_nodes() {
    let mut engine = engine();
    let tree = engine.parse("1+x").unwrap();
    assert_eq!(tree.to_string(), "Add(2)[1, UserSymbol(\"x\")]");
    assert_eq!(engine.arena.len(), 0);
}
