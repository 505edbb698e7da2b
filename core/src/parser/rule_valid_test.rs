// Tests with valid expressions for each rule in the parser.

use crate::parser::{ExpressionParser, Rule};
use pest::Parser;
use pest::iterators::Pair;

fn contains_rule(pair: Pair<Rule>, target: Rule) -> bool {
    if pair.as_rule() == target {
        return true;
    }
    for inner in pair.into_inner() {
        if contains_rule(inner, target) {
            return true;
        }
    }
    false
}

macro_rules! rule_examples {
    ( $($rule:ident => [$($expr:expr),* $(,)?]),* $(,)? ) => {
        $(
            #[test]
            fn $rule() {
                let inputs = vec![$($expr),*];
                for input in inputs {
                    let result = ExpressionParser::parse(Rule::main, input)
                        .unwrap_or_else(|e| panic!("Failed to parse '{}': {}", input, e));
                    let root = result.into_iter().next().unwrap();
                    assert!(
                        contains_rule(root.clone(), Rule::$rule),
                        "Expected to find rule {:?} in parse tree for input '{}'",
                        Rule::$rule,
                        input
                    );
                }
            }
        )*
    };
}

rule_examples! {
    integer => ["42", "-99", "0", "3_m"],
    decimal => ["3.14", "-0.001", "2.", ".5", "6.022e23", "1.6E-19", "6.02ᴇ23", "1e−3"],
    boolean => ["true", "false", "not true"],
    unit => ["_m", "3_km", "2_°C", "5_'", "1_\"", "1_m→_km", "_Ω"],
    infinity => ["∞", "-∞"],
    ident => ["x", "pi", "π", "order", "android", "x2", "cos(x)"],
    grouped => ["(1)", "(a + b) * c", "((1))", "(1, 2)"],
    list => ["{}", "{1}", "{1, 2, 3}", "{{1}, {2}}"],
    matrix => ["[[1]]", "[[1, 2][3, 4]]", "[[a]]"],
    row => ["[[1, 2]]", "[[1][2]]"],
    call_op => ["f()", "f(1)", "gcd(1, 2, 3)", "{1, 2}(1)", "f(1)(2)"],
    add => ["1 + 2", "a * (b + c)"],
    sub => ["1 - 2", "1 − 2"],
    mul => ["1 * 2", "2 × 3", "2 · 3"],
    div => ["1 / 2", "1 ÷ 2"],
    pow => ["2 ^ 3", "a ^ b"],
    implicit_mul => ["3_m", "2.5_km", "(1 + 2)_s"],
    convert => ["1_km → _m", "1_km -> _m"],
    eq => ["1 = 1"],
    ne => ["1 ≠ 2", "1 != 2"],
    lt => ["1 < 2"],
    gt => ["2 > 1"],
    le => ["1 ≤ 2", "1 <= 2"],
    ge => ["2 ≥ 1", "2 >= 1"],
    and => ["true and false", "a and b"],
    or => ["true or false"],
    xor => ["true xor false"],
    nand => ["true nand false"],
    nor => ["true nor false"],
    not => ["not true", "not (1 = 2)"],
    neg => ["- 1", "-a", "2 * -3", "--1"],
    factorial => ["5!", "(3)!", "3! = 6"],
    percent => ["10%", "5 + 10%"],
}
