mod cases;

use abacus::{Engine, EngineOptions};
use cases::SCENARIOS;
use pretty_assertions::assert_eq;

#[test]
fn scenarios() {
    for scenario in SCENARIOS.iter() {
        let mut engine = Engine::new(EngineOptions {
            default_preferences: scenario.preferences,
            ..EngineOptions::default()
        });
        let evaluation = engine
            .evaluate(scenario.input)
            .unwrap_or_else(|e| panic!("{}: {e}", scenario.name));
        assert_eq!(
            evaluation.approximate.as_deref(),
            Ok(scenario.approximate),
            "{}",
            scenario.name
        );
        if let Some(exact) = scenario.exact {
            assert_eq!(evaluation.exact.as_deref(), Some(exact), "{}", scenario.name);
        }
    }
}

#[test]
fn exam_mode_hides_exact_forms() {
    for scenario in SCENARIOS.iter().filter(|s| s.preferences.policy.forbid_exact_results) {
        let mut engine = Engine::new(EngineOptions::default());
        engine.set_preferences(scenario.preferences);
        let evaluation = engine.evaluate(scenario.input).unwrap();
        assert_eq!(evaluation.exact, None, "{}", scenario.name);
    }
}
