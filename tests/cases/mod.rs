use abacus::{AngleUnit, ComplexFormat, Preferences};
use once_cell::sync::Lazy;

pub struct Scenario {
    pub name: &'static str,
    pub input: &'static str,
    pub preferences: Preferences,
    pub approximate: &'static str,
    pub exact: Option<&'static str>,
}

fn radians() -> Preferences {
    Preferences {
        angle_unit: AngleUnit::Radian,
        ..Preferences::default()
    }
}

fn exam() -> Preferences {
    let mut preferences = Preferences::default();
    preferences.policy.forbid_exact_results = true;
    preferences
}

pub static SCENARIOS: Lazy<Vec<Scenario>> = Lazy::new(|| {
    vec![
        Scenario {
            name: "precedence",
            input: "2+3*4",
            preferences: Preferences::default(),
            approximate: "14",
            exact: Some("14"),
        },
        Scenario {
            name: "right_angle_in_degrees",
            input: "cos(90)",
            preferences: Preferences::default(),
            approximate: "0",
            exact: None,
        },
        Scenario {
            name: "dimensionless_ratio",
            input: "(12_km)/(6_mm)",
            preferences: Preferences::default(),
            approximate: "2000000",
            exact: None,
        },
        Scenario {
            name: "mixed_length_units",
            input: "1_m + 1_yd",
            preferences: Preferences::default(),
            approximate: "1.9144_m",
            exact: None,
        },
        Scenario {
            name: "exam_mode_third",
            input: "1/3",
            preferences: exam(),
            approximate: "0.3333333333",
            exact: None,
        },
        Scenario {
            name: "exact_third",
            input: "1/3",
            preferences: Preferences::default(),
            approximate: "0.3333333333",
            exact: Some("1/3"),
        },
        Scenario {
            name: "pi_in_radians",
            input: "cos(π)",
            preferences: radians(),
            approximate: "-1",
            exact: None,
        },
        Scenario {
            name: "cartesian_root",
            input: "sqrt(-1)",
            preferences: Preferences {
                complex_format: ComplexFormat::Cartesian,
                ..Preferences::default()
            },
            approximate: "i",
            exact: None,
        },
        Scenario {
            name: "real_root",
            input: "sqrt(-1)",
            preferences: Preferences::default(),
            approximate: "nonreal",
            exact: None,
        },
        Scenario {
            name: "division_by_zero",
            input: "1/0",
            preferences: Preferences::default(),
            approximate: "undef",
            exact: None,
        },
        Scenario {
            name: "temperature_conversion",
            input: "100_°C→_°F",
            preferences: Preferences::default(),
            approximate: "212_°F",
            exact: None,
        },
    ]
});
