use super::*;
use crate::ToString;
use crate::approximation::to_real;
use crate::test_utils::parse_into;
use crate::tree::Tree;
use pretty_assertions::assert_eq;

fn cartesian(angle_unit: AngleUnit) -> ProjectionContext {
    ProjectionContext {
        complex_format: ComplexFormat::Cartesian,
        angle_unit,
        ..ProjectionContext::default()
    }
}

fn projected_with(source: &str, context: &ProjectionContext) -> String {
    let (mut arena, root) = parse_into(source);
    deep_system_project(&mut arena, root, context).unwrap();
    arena.extract(root).to_string()
}

fn projected(source: &str) -> String {
    projected_with(source, &cartesian(AngleUnit::Radian))
}

fn real_value(arena: &TreeArena, root: usize) -> Outcome<f64> {
    let mut context = Context::<f64>::default();
    to_real(arena, root, &mut context).unwrap()
}

fn tree_of(source: &str) -> Tree {
    let (arena, root) = parse_into(source);
    arena.extract(root)
}

#[test]
fn test_syntax_sugar() {
    assert_eq!(projected("sqrt(2)"), "Pow[2, 1/2]");
    assert_eq!(projected("2-3"), "Add(2)[2, Mult(2)[-1, 3]]");
    assert_eq!(projected("2/3"), "Mult(2)[2, Pow[3, -1]]");
    assert_eq!(projected("(1+2)*3"), "Mult(2)[Add(2)[1, 2], 3]");
    assert_eq!(projected("1.5"), "Mult(2)[15, Pow[10, -1]]");
    assert_eq!(projected("e^2"), "Exp[2]");
}

#[test]
fn test_real_mode_powers_and_logarithms() {
    let real = ProjectionContext::default();
    assert_eq!(projected_with("2^3", &real), "PowReal[2, 3]");
    assert_eq!(projected_with("ln(2)", &real), "LnReal[2]");
    assert_eq!(projected("ln(2)"), "Ln[2]");
}

#[test]
fn test_direct_trigonometry_converts_angle() {
    assert_eq!(projected("cos(x)"), "Trig[UserSymbol(\"x\"), 0]");
    assert_eq!(
        projected_with("sin(90)", &cartesian(AngleUnit::Degree)),
        "Trig[Mult(2)[90, Mult(2)[Pi, Pow[180, -1]]], 1]"
    );
    // An explicit angle unit already is the conversion.
    let explicit = projected_with("cos(π_rad)", &cartesian(AngleUnit::Degree));
    assert!(explicit.starts_with("Trig[Mult(2)[Pi, Mult(2)[1, "), "{explicit}");
    assert_eq!(projected("tan(x)"), "TanRad[UserSymbol(\"x\")]");
}

#[test]
fn test_inverse_trigonometry_depends_on_domain_in_real_mode() {
    let real_radians = ProjectionContext {
        angle_unit: AngleUnit::Radian,
        ..ProjectionContext::default()
    };
    assert_eq!(
        projected_with("acos(x)", &real_radians),
        "Dependency[ATrig[UserSymbol(\"x\"), 0], \
         DependencyList(1)[LessOrEqual[Abs[UserSymbol(\"x\")], 1]]]"
    );
    assert_eq!(projected("asin(x)"), "ATrig[UserSymbol(\"x\"), 1]");
    assert_eq!(projected_with("atan(x)", &real_radians), "ATanRad[UserSymbol(\"x\")]");

    let (mut arena, root) = parse_into("acos(2)");
    deep_system_project(&mut arena, root, &ProjectionContext::default()).unwrap();
    assert_eq!(real_value(&arena, root), Outcome::Undefined);
}

#[test]
fn test_projection_preserves_values() {
    for source in [
        "cos(90)",
        "sin(30)",
        "tan(45)",
        "acos(1/2)",
        "asec(2)",
        "acot(1)",
        "cot(45)",
        "log(8, 2)",
        "log(1000)",
        "cosh(1)",
        "sinh(1)",
        "tanh(1/2)",
        "arcosh(2)",
        "arsinh(1)",
        "artanh(1/2)",
        "ceil(2.5)",
        "frac(-2.25)",
        "5+10%",
        "root(27, 3)",
        "sqrt(16)/2",
    ] {
        let (arena, root) = parse_into(source);
        let expected = real_value(&arena, root);
        let (mut projected, root) = parse_into(source);
        deep_system_project(&mut projected, root, &ProjectionContext::default()).unwrap();
        let actual = real_value(&projected, root);
        match (expected, actual) {
            (Outcome::Value(a), Outcome::Value(b)) => {
                assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0), "{source}: {a} vs {b}")
            }
            (a, b) => assert_eq!(a, b, "{source}"),
        }
    }
}

#[test]
fn test_logic_sugar() {
    assert_eq!(
        projected("true nor false"),
        "LogicalNot[LogicalOr[True, False]]"
    );
    let (mut arena, root) = parse_into("false nand true");
    deep_system_project(&mut arena, root, &ProjectionContext::default()).unwrap();
    let mut context = Context::<f64>::default();
    assert_eq!(
        approximation::to_boolean(&arena, root, &mut context).unwrap(),
        Outcome::Value(true)
    );
}

#[test]
fn test_policy_forbids_constructs() {
    let context = ProjectionContext {
        policy: ProjectionPolicy {
            forbid_units: true,
            forbid_logarithm_with_base: true,
            ..ProjectionPolicy::default()
        },
        ..ProjectionContext::default()
    };
    assert!(context.policy.is_exam_mode());
    assert!(!ProjectionPolicy::default().is_exam_mode());
    assert_eq!(projected_with("log(8, 2)", &context), "Forbidden");
    assert_eq!(projected_with("3_m", &context), "Mult(2)[3, Forbidden]");

    let (mut arena, root) = parse_into("1 + 3_m");
    deep_system_project(&mut arena, root, &context).unwrap();
    assert_eq!(real_value(&arena, root), Outcome::Forbidden);
}

#[test]
fn test_conversion_target_stays_a_unit() {
    let (mut arena, root) = parse_into("3_km → _m");
    deep_system_project(&mut arena, root, &ProjectionContext::default()).unwrap();
    assert_eq!(arena.kind(root), NodeKind::UnitConversion);
    assert_eq!(arena.kind(arena.child(root, 1)), NodeKind::Unit);
}

#[test]
fn test_approximate_to_float() {
    let context = ProjectionContext {
        strategy: ProjectionStrategy::ApproximateToFloat,
        ..cartesian(AngleUnit::Radian)
    };
    let (mut arena, root) = parse_into("1/3");
    deep_system_project(&mut arena, root, &context).unwrap();
    assert_eq!(arena.kind(root), NodeKind::Float);

    assert_eq!(
        projected_with("x + 1/4", &context),
        "Add(2)[UserSymbol(\"x\"), 0.25]"
    );
    // Exponents stay exact.
    assert_eq!(
        projected_with("x^(1/2)", &context),
        "Pow[UserSymbol(\"x\"), Mult(2)[1, Pow[2, -1]]]"
    );
}

#[test]
fn test_random_nodes_are_seeded_before_rules_copy_them() {
    let (mut arena, root) = parse_into("cosh(random())");
    deep_system_project(&mut arena, root, &cartesian(AngleUnit::Radian)).unwrap();
    let seeds: Vec<u8> = arena
        .tree_nodes(root)
        .iter()
        .filter_map(|node| node.seed())
        .collect();
    assert_eq!(seeds, vec![1, 1]);
}

// ============================================================================
// Symbols
// ============================================================================

fn symbols() -> SymbolTable {
    let mut table = SymbolTable::new();
    table.define_symbol("x", tree_of("3"));
    table.define_function("f", parameterize(&tree_of("t^2+1"), "t"));
    table
}

fn replaced(source: &str, table: &SymbolTable, policy: SymbolicComputation) -> String {
    let (mut arena, root) = parse_into(source);
    deep_replace_user_named(&mut arena, root, table, policy).unwrap();
    arena.extract(root).to_string()
}

#[test]
fn test_symbol_policies() {
    use SymbolicComputation::*;
    let table = symbols();
    assert_eq!(
        replaced("x+y", &table, ReplaceAllSymbolsWithDefinitionsOrUndefined),
        "Add(2)[3, Undefined]"
    );
    assert_eq!(
        replaced("x+y", &table, ReplaceDefinedSymbolsWithDefinitions),
        "Add(2)[3, UserSymbol(\"y\")]"
    );
    assert_eq!(
        replaced("x+f(2)", &table, ReplaceDefinedFunctionsWithDefinitions),
        "Add(2)[UserSymbol(\"x\"), Add(2)[Pow[2, 2], 1]]"
    );
    assert_eq!(
        replaced("x+y", &table, DoNotReplaceAnySymbol),
        "Add(2)[UserSymbol(\"x\"), UserSymbol(\"y\")]"
    );
    assert_eq!(
        replaced("x+y", &table, ReplaceAllSymbolsWithUndefined),
        "Add(2)[Undefined, Undefined]"
    );
}

#[test]
fn test_function_argument_is_resolved_first() {
    let table = symbols();
    assert_eq!(
        replaced(
            "f(x)",
            &table,
            SymbolicComputation::ReplaceAllSymbolsWithDefinitionsOrUndefined
        ),
        "Add(2)[Pow[3, 2], 1]"
    );
}

#[test]
fn test_parameterize() {
    let tree = parameterize(&tree_of("t*u+t"), "t");
    assert_eq!(
        tree.to_string(),
        "Add(2)[Mult(2)[Parameter, UserSymbol(\"u\")], Parameter]"
    );
}

#[test]
fn test_circular_definition() {
    let mut table = SymbolTable::new();
    table.define_symbol("a", tree_of("b+1"));
    table.define_symbol("b", tree_of("2*a"));
    let (mut arena, root) = parse_into("a");
    let error = deep_replace_user_named(
        &mut arena,
        root,
        &table,
        SymbolicComputation::ReplaceAllSymbolsWithDefinitionsOrUndefined,
    )
    .unwrap_err();
    assert_eq!(error, ProjectionError::CircularDefinition { name: "a".into() });
}

#[test]
fn test_symbol_table_bookkeeping() {
    let mut table = symbols();
    assert_eq!(table.len(), 2);
    assert!(table.contains("f"));
    assert!(table.definition(NodeKind::UserSymbol, "f").is_none());
    assert!(table.remove("f").is_some());
    assert!(!table.contains("f"));
    table.clear();
    assert!(table.is_empty());
}
