//! The calculator engine: one owner for the arena, the symbol store and the
//! preferences, with the whole evaluation pipeline behind one call.

use tracing::{debug, warn};

use super::{EngineOptions, Error, EvaluationOptions, Preferences};
use crate::approximation::{self, Context, Outcome, Value};
use crate::dimension::{Dimension, deep_check, get_dimension};
use crate::interrupt::{Budget, CancellationToken};
use crate::parser;
use crate::projection::{
    SymbolTable, SymbolicComputation, deep_replace_user_named, deep_system_project, parameterize,
};
use crate::reduction::{ReductionFailure, deep_systematic_reduce};
use crate::render::{self, LengthExceeded};
use crate::tree::{NodeKind, Tree, TreeArena, decode, encode};
use crate::units::display::{self, DisplayRequest, DisplayTerms, ExtractedUnits, UnitDisplay};
use crate::units::{SIVector, remove_temperature_unit};
use crate::{String, Vec};

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outcome: Outcome<Value<f64>>,
    /// Display units of a physical quantity, with values in those units.
    pub units: Option<DisplayTerms>,
    /// Exact form of the result, e.g. `1/3`. Absent when the reduced tree
    /// is not exact, when the result has units, or when the policy forbids
    /// exact results.
    pub exact: Option<String>,
    /// Approximate form of the result, rendered with the preferences.
    pub approximate: Result<String, LengthExceeded>,
    /// Set when reduction stopped early on overflow; the result is then
    /// computed from the partly reduced tree.
    pub reduction_failure: Option<ReductionFailure>,
}

/// The calculator engine.
///
/// The engine owns all state a computation touches. Each evaluation works
/// above an arena checkpoint and rolls back when it ends, so the arena
/// only ever holds one computation.
///
/// # Example
///
/// ```
/// use abacus_core::api::{Engine, EngineOptions};
///
/// let mut engine = Engine::new(EngineOptions::default());
/// engine.define_symbol("a", "2").unwrap();
///
/// let evaluation = engine.evaluate("a+3*4").unwrap();
/// assert_eq!(evaluation.approximate.unwrap(), "14");
/// assert_eq!(evaluation.exact.as_deref(), Some("14"));
/// ```
#[derive(Debug)]
pub struct Engine {
    arena: TreeArena,
    symbols: SymbolTable,
    preferences: Preferences,
    evaluation: EvaluationOptions,
    token: CancellationToken,
    /// Evaluations started so far; advances the random seed.
    evaluations: u64,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            arena: TreeArena::with_capacity(options.arena_capacity),
            symbols: SymbolTable::new(),
            preferences: options.default_preferences,
            evaluation: options.evaluation,
            token: CancellationToken::new(),
            evaluations: 0,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// A clone of the engine's cancellation flag for the host to trip.
    ///
    /// A tripped flag stays tripped: every evaluation fails with
    /// [`AbortReason::Cancelled`](crate::interrupt::AbortReason::Cancelled)
    /// until the host calls [`CancellationToken::reset`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Parse `source` into an owned tree without evaluating it.
    pub fn parse(&mut self, source: &str) -> Result<Tree, Error> {
        let checkpoint = self.arena.checkpoint();
        let result = parser::parse_into_arena(&mut self.arena, source)
            .map(|root| self.arena.extract(root));
        self.arena.rollback(checkpoint);
        Ok(result?)
    }

    /// Define (or redefine) the symbol `name` as the expression `source`.
    ///
    /// Functions already defined are expanded into the definition, symbols
    /// stay by name, so redefining a symbol later changes this one too.
    pub fn define_symbol(&mut self, name: &str, source: &str) -> Result<(), Error> {
        let definition = self.parse_definition(source)?;
        debug!(name, "symbol defined");
        self.symbols.define_symbol(name, definition);
        Ok(())
    }

    /// Define the function `name(parameter) = source`.
    pub fn define_function(
        &mut self,
        name: &str,
        parameter: &str,
        source: &str,
    ) -> Result<(), Error> {
        let definition = self.parse_definition(source)?;
        debug!(name, parameter, "function defined");
        self.symbols.define_function(name, parameterize(&definition, parameter));
        Ok(())
    }

    fn parse_definition(&mut self, source: &str) -> Result<Tree, Error> {
        self.with_checkpoint(|engine| {
            let root = parser::parse_into_arena(&mut engine.arena, source)?;
            deep_replace_user_named(
                &mut engine.arena,
                root,
                &engine.symbols,
                SymbolicComputation::ReplaceDefinedFunctionsWithDefinitions,
            )?;
            Ok(engine.arena.extract(root))
        })
    }

    /// Parse, substitute and project `source`, and serialize the canonical
    /// tree for storage.
    pub fn serialize(&mut self, source: &str) -> Result<Vec<u8>, Error> {
        self.with_checkpoint(|engine| {
            let root = parser::parse_into_arena(&mut engine.arena, source)?;
            engine.substitute(root)?;
            let context = engine.preferences.projection_context();
            deep_system_project(&mut engine.arena, root, &context)?;
            Ok(encode(&engine.arena.extract(root)))
        })
    }

    /// Evaluate a tree previously produced by [`Engine::serialize`].
    pub fn evaluate_bytes(&mut self, bytes: &[u8]) -> Result<Evaluation, Error> {
        let tree = decode(bytes)?;
        self.evaluate_tree(&tree)
    }

    /// Run the full pipeline on `source`.
    pub fn evaluate(&mut self, source: &str) -> Result<Evaluation, Error> {
        self.with_checkpoint(|engine| {
            let root = parser::parse_into_arena(&mut engine.arena, source)?;
            engine.run(root)
        })
    }

    pub fn evaluate_tree(&mut self, tree: &Tree) -> Result<Evaluation, Error> {
        self.with_checkpoint(|engine| {
            let root = engine.arena.push_tree(tree)?;
            engine.run(root)
        })
    }

    /// Run `f` above a checkpoint and roll the arena back afterwards,
    /// whatever the result.
    fn with_checkpoint<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let checkpoint = self.arena.checkpoint();
        let result = f(self);
        self.arena.rollback(checkpoint);
        if let Err(error) = &result {
            match error {
                Error::ArenaExhausted { .. } | Error::ComputationAborted(_) => {
                    warn!(%error, "evaluation rolled back");
                }
                _ => debug!(%error, "evaluation failed"),
            }
        }
        result
    }

    fn substitute(&mut self, root: usize) -> Result<bool, Error> {
        Ok(deep_replace_user_named(
            &mut self.arena,
            root,
            &self.symbols,
            self.preferences.symbolic_computation,
        )?)
    }

    fn budget(&self, max_iterations: u64) -> Budget {
        Budget::new(self.token.clone(), max_iterations, self.evaluation.max_depth)
    }

    /// input → substitution → dimension check → projection → reduction →
    /// approximation → unit display → rendering.
    fn run(&mut self, root: usize) -> Result<Evaluation, Error> {
        let seed = self.evaluation.random_seed.wrapping_add(self.evaluations);
        self.evaluations += 1;
        let preferences = self.preferences;
        let options = preferences.render_options();

        self.substitute(root)?;
        if !deep_check(&self.arena, root) {
            debug!(root, "rejected by dimension check");
            return Ok(Evaluation::unavailable(Outcome::Undefined));
        }

        // Unit structure is read before projection turns units into ratios.
        let dimension = get_dimension(&self.arena, root);
        let conversion = (self.arena.kind(root) == NodeKind::UnitConversion)
            .then(|| self.arena.child(root, 1));
        let random = self.arena.any_descendant(root, |node| node.kind.is_random());
        let rewritten = self
            .arena
            .any_descendant(root, |node| is_rewritten_by_projection(node.kind));
        let extracted = ExtractedUnits::from_tree(&self.arena, conversion.unwrap_or(root));
        let quantity = if conversion.is_some() { root + 1 } else { root };
        let temperature = remove_temperature_unit(&mut self.arena, quantity)?;

        deep_system_project(&mut self.arena, root, &preferences.projection_context())?;

        let mut budget = self.budget(self.evaluation.max_iterations);
        let reduction = deep_systematic_reduce(&mut self.arena, root, &mut budget);
        if let Some(error) = reduction.failure.as_ref().and_then(Error::from_reduction) {
            return Err(error);
        }

        let remaining = self.evaluation.max_iterations.saturating_sub(budget.iterations());
        let mut context = Context::new(
            preferences.angle_unit,
            preferences.complex_format,
            seed,
            self.budget(remaining),
        );
        let outcome = approximation::approximate(&self.arena, root, &mut context)?;

        let units = match (&outcome, dimension, conversion) {
            (Outcome::Value(Value::Number(value)), _, Some(_)) => {
                Some((value.re, None, UnitDisplay::AutomaticInput))
            }
            (
                Outcome::Value(Value::Number(value)),
                Dimension::Unit { representative, .. },
                None,
            ) => Some((value.re, representative, preferences.unit_display_strategy())),
            _ => None,
        };
        let units = match units {
            Some((si_value, representative, strategy)) => {
                let request = DisplayRequest {
                    si_value,
                    vector: match dimension {
                        Dimension::Unit { vector, .. } => vector,
                        _ => SIVector::EMPTY,
                    },
                    representative: temperature.or(representative),
                    extracted: &extracted,
                    angle_unit: preferences.angle_unit,
                };
                match display::display(&request, strategy) {
                    Some(terms) => Some(terms),
                    None => return Ok(Evaluation::unavailable(Outcome::Undefined)),
                }
            }
            None => None,
        };

        // Random draws change from one evaluation to the next, and functions
        // rewritten by projection only read back well once reduced to numbers.
        let exact = (!preferences.policy.forbid_exact_results
            && units.is_none()
            && outcome.is_value()
            && !random
            && is_closed_form(&self.arena, root, rewritten))
        .then(|| render::render_tree(&self.arena, root, &options).ok())
        .flatten();

        let approximate = match (&units, &outcome) {
            (Some(terms), _) => render::render_unit_terms(terms, &options),
            (None, Outcome::Value(value)) => {
                render::render_value(value, preferences.complex_format, &options)
            }
            (None, marker) => Ok(marker_text(marker).into()),
        };

        debug!(root, seed, "evaluated");
        Ok(Evaluation {
            outcome,
            units,
            exact,
            approximate,
            reduction_failure: reduction.failure,
        })
    }
}

/// Whether a reduced tree reads as a closed form. With `numbers_only`, only
/// exact numbers and structures of them qualify.
fn is_closed_form(arena: &TreeArena, index: usize, numbers_only: bool) -> bool {
    use NodeKind::*;
    let children = || {
        (0..arena.child_count(index))
            .all(|n| is_closed_form(arena, arena.child(index, n), numbers_only))
    };
    match arena.kind(index) {
        Zero | One | Two | MinusOne | Half | IntegerLiteral | Rational | True | False => true,
        Decimal | Opposite | Parenthesis | List | Matrix | Point => children(),
        Dependency => is_closed_form(arena, index + 1, numbers_only),
        Pi | EulerE | ImaginaryUnit => !numbers_only,
        Add | Mult | Sub | Div | Pow => !numbers_only && children(),
        _ => false,
    }
}

/// Functions that projection expresses through other functions, such as
/// `log(x)` becoming `ln(x)/ln(10)` or degrees becoming radians.
fn is_rewritten_by_projection(kind: NodeKind) -> bool {
    use NodeKind::*;
    matches!(
        kind,
        Cos | Sin | Tan | Sec | Csc | Cot | ACos | ASin | ATan | ASec | ACsc | ACot
            | CosH | SinH | TanH | ArCosH | ArSinH | ArTanH | Exp | Log | LogBase
    )
}

fn marker_text<V>(outcome: &Outcome<V>) -> &'static str {
    match outcome {
        Outcome::Value(_) | Outcome::Undefined => "undef",
        Outcome::NonReal => "nonreal",
        Outcome::Forbidden => "forbidden",
    }
}

impl Evaluation {
    fn unavailable(outcome: Outcome<Value<f64>>) -> Self {
        Self {
            approximate: Ok(marker_text(&outcome).into()),
            outcome,
            units: None,
            exact: None,
            reduction_failure: None,
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
