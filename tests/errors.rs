use abacus::{
    AbortReason, Engine, EngineOptions, Error, EvaluationOptions, render_error_to_string_no_color,
};
use pretty_assertions::assert_eq;

#[test]
fn syntax_errors_point_at_the_input() {
    let mut engine = Engine::new(EngineOptions::default());
    let source = "2*(3+";
    let error = engine.evaluate(source).unwrap_err();
    assert!(matches!(error, Error::Syntax(_)));

    let output = render_error_to_string_no_color(&error, source);
    assert!(output.contains("Error"), "{output}");
    assert!(output.contains(source), "{output}");
}

#[test]
fn circular_definitions() {
    let mut engine = Engine::new(EngineOptions::default());
    engine.define_symbol("a", "b+1").unwrap();
    engine.define_symbol("b", "a+1").unwrap();
    let error = engine.evaluate("a").unwrap_err();
    assert_eq!(
        render_error_to_string_no_color(&error, "a"),
        "Error: Circular definition of 'a'\n"
    );
}

#[test]
fn cancellation_is_recoverable() {
    let mut engine = Engine::new(EngineOptions::default());
    let token = engine.cancellation_token();
    token.cancel();
    assert_eq!(
        engine.evaluate("sum(k, k, 1, 100)").unwrap_err(),
        Error::ComputationAborted(AbortReason::Cancelled)
    );
    token.reset();
    assert_eq!(
        engine.evaluate("sum(k, k, 1, 100)").unwrap().approximate.unwrap(),
        "5050"
    );
}

#[test]
fn iteration_budget() {
    let mut engine = Engine::new(EngineOptions {
        evaluation: EvaluationOptions {
            max_iterations: 50,
            ..EvaluationOptions::default()
        },
        ..EngineOptions::default()
    });
    let error = engine.evaluate("sum(k, k, 1, 100000)").unwrap_err();
    let output = render_error_to_string_no_color(&error, "");
    assert!(output.starts_with("Resource limit exceeded"), "{output}");
}
