
use std::collections::HashMap;
use std::f32::consts;

use tracing::debug;

pub mod parameters;
use parameters::ParameterRegistry;

pub mod evaluator;
use evaluator::Evaluator;

use crate::cache::cache_info::CacheInfo;
use crate::cache::{Cache, UnboundedCache};
use crate::error::{EngineError, Result};
use crate::parser::functions::{FunctionTable, MAX_ARITY};
use crate::parser::{Program, ShuntingYard};
use crate::pool::BufferPool;

//..................................................................

/// Engine is the facade over the whole evaluation pipeline. It owns the
/// function table, the parameter and formula registries, the result cache
/// and the buffer pool, and exposes the registration and evaluation entry
/// points.
///
/// Raw text given to `evaluate` is tokenized and converted on every call;
/// formulas registered with `register_formula` are compiled once and
/// evaluated from their stored postfix program. The `*_with_caching`
/// variants consult and populate the result cache around that same path; a
/// cache hit short-circuits evaluation entirely and does not notice that
/// parameters may have changed since the value was computed. Staleness is
/// the caller's responsibility, managed with `remove_cache_for` and
/// `clear_cache`.
///
/// An Engine is single-threaded: nothing inside is synchronized. Callers
/// that need concurrent evaluation use one engine per thread or serialize
/// access externally. Teardown is ownership: dropping the engine releases
/// the pooled buffers and every registry.
pub struct Engine {
    functions: FunctionTable,

    parameters: ParameterRegistry,

    formulas: HashMap<String, Program>,

    results: UnboundedCache<String, f32>,

    pool: BufferPool,
}

impl Engine {
    /// Construct an engine with the standard function table, the standard
    /// constants `pi` and `e` pre-registered as parameters, and empty
    /// formula and result stores.
    pub fn new() -> Self {
        let mut parameters = ParameterRegistry::new();
        parameters.register_value("pi", consts::PI);
        parameters.register_value("e", consts::E);
        Engine {
            functions: FunctionTable::standard(),
            parameters,
            formulas: HashMap::new(),
            results: UnboundedCache::new(),
            pool: BufferPool::new(),
        }
    }

    //..................................................................

    // Registration

    /// Register a constant-valued parameter, silently replacing any previous
    /// registration under the same name.
    pub fn register_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        self.register_parameter_provider(name, move || value)
    }

    /// Register a parameter backed by a provider closure, invoked fresh on
    /// every occurrence of the name during evaluation.
    pub fn register_parameter_provider<F>(&mut self, name: &str, provider: F) -> Result<()>
    where F: Fn() -> f32 + 'static {
        if name.is_empty() {
            return Err(EngineError::InvalidArgument(
                "parameter name may not be empty".to_string(),
            ));
        }
        self.parameters.register(name, provider);
        Ok(())
    }

    /// Remove a parameter. Returns true if it was present.
    pub fn unregister_parameter(&mut self, name: &str) -> bool {
        self.parameters.unregister(name)
    }

    /// Add a function to the function table, callable from any expression
    /// compiled afterwards.
    pub fn register_function<F>(&mut self, name: &str, arity: usize, body: F) -> Result<()>
    where F: Fn(&[f32]) -> f32 + 'static {
        if name.is_empty() {
            return Err(EngineError::InvalidArgument(
                "function name may not be empty".to_string(),
            ));
        }
        if arity == 0 || arity > MAX_ARITY {
            return Err(EngineError::InvalidArgument(format!(
                "function arity must be between 1 and {}",
                MAX_ARITY
            )));
        }
        self.functions.register(name, arity, body);
        Ok(())
    }

    /// Compile an expression eagerly and store it under the given name.
    /// Parse errors surface here, not on first use. Registering a name that
    /// is already taken silently replaces the previous formula, the same way
    /// parameter registration replaces.
    pub fn register_formula(&mut self, name: &str, expression: &str) -> Result<()> {
        if name.is_empty() {
            return Err(EngineError::InvalidArgument(
                "formula name may not be empty".to_string(),
            ));
        }
        if expression.is_empty() {
            return Err(EngineError::InvalidArgument(
                "formula expression may not be empty".to_string(),
            ));
        }
        let program =
            ShuntingYard::new(expression, &self.functions, &self.formulas, &self.pool).compile()?;
        debug!(
            "compiled formula '{}' to {} postfix tokens",
            name,
            program.postfix().len()
        );
        self.formulas.insert(name.to_string(), program);
        Ok(())
    }

    /// Remove a formula and its compiled program together.
    /// Returns true if it was present.
    pub fn try_unregister_formula(&mut self, name: &str) -> bool {
        self.formulas.remove(name).is_some()
    }

    //..................................................................

    // Evaluation

    /// Tokenize, convert and evaluate the expression, bypassing the result
    /// cache entirely.
    pub fn evaluate(&mut self, expression: &str) -> Result<f32> {
        self.evaluate_internal(expression, false)
    }

    /// Like `evaluate`, but consult the result cache first, keyed by the raw
    /// expression text, and store the computed value on a miss.
    pub fn evaluate_with_caching(&mut self, expression: &str) -> Result<f32> {
        let key = expression.to_string();
        if let Some(hit) = self.results.get(&key) {
            debug!("result cache hit for expression '{}'", expression);
            return Ok(hit);
        }
        let value = self.evaluate_internal(expression, true)?;
        self.results.add_or_replace(&key, &value);
        Ok(value)
    }

    /// Evaluate a registered formula from its stored program.
    pub fn evaluate_by_name(&mut self, name: &str) -> Result<f32> {
        self.evaluate_by_name_internal(name, false)
    }

    /// Like `evaluate_by_name`, but consult the result cache first, keyed by
    /// the formula name, and store the computed value on a miss.
    pub fn evaluate_by_name_with_caching(&mut self, name: &str) -> Result<f32> {
        let key = name.to_string();
        if let Some(hit) = self.results.get(&key) {
            debug!("result cache hit for formula '{}'", name);
            return Ok(hit);
        }
        let value = self.evaluate_by_name_internal(name, true)?;
        self.results.add_or_replace(&key, &value);
        Ok(value)
    }

    fn evaluate_internal(&mut self, expression: &str, with_caching: bool) -> Result<f32> {
        let Engine { functions, parameters, formulas, results, pool } = self;
        let pool: &BufferPool = pool;
        let mut postfix = pool.token_list();
        ShuntingYard::new(expression, functions, formulas, pool).compile_into(&mut postfix)?;
        let cache = if with_caching { Some(&mut *results) } else { None };
        let mut evaluator = Evaluator::new(functions, parameters, formulas, pool, cache);
        evaluator.run(&postfix, expression)
    }

    fn evaluate_by_name_internal(&mut self, name: &str, with_caching: bool) -> Result<f32> {
        let Engine { functions, parameters, formulas, results, pool } = self;
        let cache = if with_caching { Some(&mut *results) } else { None };
        let mut evaluator = Evaluator::new(functions, parameters, formulas, pool, cache);
        evaluator.run_formula(name)
    }

    //..................................................................

    // Cache management

    /// Forget the cached result for one formula name or raw expression.
    /// A key with no cached result is a no-op.
    pub fn remove_cache_for(&mut self, key: &str) {
        self.results.remove(&key.to_string());
    }

    /// Empty the compiled-formula registry and the result cache.
    pub fn clear_cache(&mut self) {
        self.formulas.clear();
        self.results.clear();
    }

    /// Empty everything: formulas, cached results and parameters.
    pub fn clear_all(&mut self) {
        self.clear_cache();
        self.parameters.clear();
    }

    /// Hit and miss statistics for the result cache.
    pub fn cache_info(&self) -> CacheInfo {
        self.results.info()
    }

    //..................................................................

    // Diagnostics

    /// Render the compiled program for a registered formula as JSON, for
    /// logging and troubleshooting.
    pub fn dump_formula(&self, name: &str) -> Result<String> {
        match self.formulas.get(name) {
            Some(program) => Ok(serde_json::to_string(program)?),
            None => Err(EngineError::FormulaNotFound(name.to_string())),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

//..................................................................

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::rc::Rc;

    #[allow(unused_imports)]
    use spectral::prelude::*;

    /// Tolerance comparison in which NaN equals NaN, since NaN is the
    /// defined result of a zero divisor.
    fn assert_close(actual: f32, expected: f32, context: &str) {
        if expected.is_nan() {
            assert!(actual.is_nan(), "{} should be NaN, was {}", context, actual);
        } else {
            assert!(
                (actual - expected).abs() < 1e-3,
                "{} should be {}, was {}",
                context,
                expected,
                actual
            );
        }
    }

    fn assert_evaluates_to(engine: &mut Engine, expression: &str, expected: f32) {
        match engine.evaluate(expression) {
            Ok(actual) => assert_close(actual, expected, expression),
            Err(e) => panic!("evaluation of '{}' failed: {}", expression, e),
        }
    }

    /// Verify the precedence rules, including that power binds tighter than
    /// multiply and nests to the right.
    #[test]
    fn precedence() {
        let mut engine = Engine::new();
        assert_evaluates_to(&mut engine, "2 + 3 * 4", 14.0);
        assert_evaluates_to(&mut engine, "2 ^ 3 * 4", 32.0);
        assert_evaluates_to(&mut engine, "2 * 3 ^ 2", 18.0);
        assert_evaluates_to(&mut engine, "2 ^ 3 ^ 2", 512.0);
    }

    #[test]
    fn grouping() {
        let mut engine = Engine::new();
        assert_evaluates_to(&mut engine, "(2 + 3) * 4", 20.0);
        assert_evaluates_to(&mut engine, "((2 + 3) * 4) / 2", 10.0);
    }

    #[test]
    fn function_evaluation() {
        let mut engine = Engine::new();
        assert_evaluates_to(&mut engine, "clamp(25, 10, 20)", 20.0);
        assert_evaluates_to(&mut engine, "lerp(10, 20, 0.3)", 13.0);
        assert_evaluates_to(&mut engine, "if(gt(10, 5), 100, 200)", 100.0);
        assert_evaluates_to(&mut engine, "min(3, max(1, 2))", 2.0);
    }

    #[test]
    fn boolean_logic() {
        let mut engine = Engine::new();
        engine.register_parameter("x", 3.0).unwrap();
        engine.register_parameter("y", 4.0).unwrap();
        assert_evaluates_to(&mut engine, "true & false", 0.0);
        assert_evaluates_to(&mut engine, "false | 1", 1.0);
        assert_evaluates_to(&mut engine, "and(or(eq(x, y), gt(x, 0)), false)", 0.0);
    }

    /// Verify unary minus on a parenthesized expression and on a parameter.
    /// Both forms reach the evaluator as a Subtract with a single operand.
    #[test]
    fn unary_minus() {
        let mut engine = Engine::new();
        engine.register_parameter("p", 5.0).unwrap();
        assert_evaluates_to(&mut engine, "-(2 + 3)", -5.0);
        assert_evaluates_to(&mut engine, "-p", -5.0);
        assert_evaluates_to(&mut engine, "10 - 3", 7.0);
    }

    /// Division and modulo by zero evaluate to NaN, never an error.
    #[test]
    fn zero_divisors_produce_nan() {
        let mut engine = Engine::new();
        assert_evaluates_to(&mut engine, "5 / 0", f32::NAN);
        assert_evaluates_to(&mut engine, "5 % 0", f32::NAN);
        assert_evaluates_to(&mut engine, "1 + 5 / 0", f32::NAN);
    }

    /// Boolean literals are numeric one and zero in any case mixture.
    #[test]
    fn boolean_literals() {
        let mut engine = Engine::new();
        assert_evaluates_to(&mut engine, "true", 1.0);
        assert_evaluates_to(&mut engine, "FALSE", 0.0);
        assert_evaluates_to(&mut engine, "True + True", 2.0);
    }

    /// Unrecognized characters are skipped; a lone period parses as zero.
    #[test]
    fn permissive_tokenizing() {
        let mut engine = Engine::new();
        assert_evaluates_to(&mut engine, "2 @# + $3", 5.0);
        assert_evaluates_to(&mut engine, ".", 0.0);
    }

    #[test]
    fn parameter_providers_run_fresh_without_caching() {
        let counter = Rc::new(Cell::new(0.0_f32));
        let seen = counter.clone();
        let mut engine = Engine::new();
        engine
            .register_parameter_provider("ticks", move || {
                seen.set(seen.get() + 1.0);
                seen.get()
            })
            .unwrap();
        assert_evaluates_to(&mut engine, "ticks", 1.0);
        assert_evaluates_to(&mut engine, "ticks", 2.0);
    }

    /// The cached value is returned verbatim even after the underlying
    /// parameter changes: the cache is stale by design.
    #[test]
    fn cached_results_are_stale_by_design() {
        let current = Rc::new(Cell::new(10.0_f32));
        let live = current.clone();
        let mut engine = Engine::new();
        engine
            .register_parameter_provider("reading", move || live.get())
            .unwrap();

        let first = engine.evaluate_with_caching("reading * 2").unwrap();
        assert_close(first, 20.0, "first pass");

        current.set(50.0);
        let second = engine.evaluate_with_caching("reading * 2").unwrap();
        assert_close(second, 20.0, "cached pass");

        // Dropping the cache entry picks up the live value again.
        engine.remove_cache_for("reading * 2");
        let third = engine.evaluate_with_caching("reading * 2").unwrap();
        assert_close(third, 100.0, "refreshed pass");
    }

    #[test]
    fn cache_statistics() {
        let mut engine = Engine::new();
        engine.evaluate_with_caching("1 + 1").unwrap();
        engine.evaluate_with_caching("1 + 1").unwrap();
        let info = engine.cache_info();
        assert_eq!(info.size, 1);
        assert_eq!(info.hits, 1);
        assert_eq!(info.misses, 1);
    }

    /// Registering a formula and evaluating it by name yields the same value
    /// as evaluating its raw text directly.
    #[test]
    fn formula_round_trip() {
        let mut engine = Engine::new();
        engine.register_parameter("radius", 2.0).unwrap();
        engine
            .register_formula("area", "pi * radius ^ 2")
            .unwrap();
        let by_name = engine.evaluate_by_name("area").unwrap();
        let raw = engine.evaluate("pi * radius ^ 2").unwrap();
        assert_close(by_name, raw, "area by name vs raw");
    }

    /// Formulas may reference other formulas; the reference is resolved at
    /// evaluation time against the registry.
    #[test]
    fn nested_formulas() {
        let mut engine = Engine::new();
        engine.register_parameter("base", 3.0).unwrap();
        engine.register_formula("doubled", "base * 2").unwrap();
        engine.register_formula("tripled", "doubled * 3").unwrap();
        assert_close(engine.evaluate_by_name("tripled").unwrap(), 18.0, "tripled");
    }

    /// A formula name shadows a parameter of the same name at tokenization
    /// time.
    #[test]
    fn formula_shadows_parameter() {
        let mut engine = Engine::new();
        engine.register_parameter("rate", 100.0).unwrap();
        engine.register_formula("rate", "1 + 1").unwrap();
        assert_evaluates_to(&mut engine, "rate * 3", 6.0);
    }

    /// Re-registering a formula name replaces the stored program; the engine
    /// deliberately does not raise an already-registered error for the
    /// duplicate, mirroring parameter registration.
    #[test]
    fn formula_reregistration_replaces() {
        let mut engine = Engine::new();
        engine.register_formula("f", "1 + 1").unwrap();
        assert_close(engine.evaluate_by_name("f").unwrap(), 2.0, "first f");
        engine.register_formula("f", "2 + 2").unwrap();
        assert_close(engine.evaluate_by_name("f").unwrap(), 4.0, "replaced f");
    }

    /// A formula that comes to reference itself, directly or transitively,
    /// fails with a circular-reference error instead of overflowing the
    /// stack.
    #[test]
    fn circular_references_are_refused() {
        let mut engine = Engine::new();
        engine.register_formula("f", "1").unwrap();
        engine.register_formula("f", "f + 1").unwrap();
        match engine.evaluate_by_name("f") {
            Err(EngineError::CircularReference(name)) => assert_eq!(name, "f"),
            other => panic!("expected circular reference, got {:?}", other),
        }

        engine.register_formula("a", "1").unwrap();
        engine.register_formula("b", "a + 1").unwrap();
        engine.register_formula("a", "b + 1").unwrap();
        match engine.evaluate_by_name("a") {
            Err(EngineError::CircularReference(_)) => (),
            other => panic!("expected circular reference, got {:?}", other),
        }
    }

    #[test]
    fn unbalanced_parentheses_fail() {
        let mut engine = Engine::new();
        match engine.evaluate("(2 + 3") {
            Err(EngineError::UnbalancedParentheses { .. }) => (),
            other => panic!("expected unbalanced parentheses, got {:?}", other),
        }
    }

    #[test]
    fn unknown_parameter_fails() {
        let mut engine = Engine::new();
        match engine.evaluate("unregistered_param + 1") {
            Err(EngineError::UnknownParameter { name, .. }) => {
                // Identifiers stop at the underscore, so only the leading
                // letters form the name.
                assert_eq!(name, "unregistered");
            }
            other => panic!("expected unknown parameter, got {:?}", other),
        }
    }

    #[test]
    fn unknown_formula_fails() {
        let mut engine = Engine::new();
        match engine.evaluate_by_name("nope") {
            Err(EngineError::FormulaNotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("expected formula not found, got {:?}", other),
        }
    }

    /// An operator with too few operands fails, except for the unary-minus
    /// case handled by the evaluator.
    #[test]
    fn starved_operator_fails() {
        let mut engine = Engine::new();
        match engine.evaluate("* 2") {
            Err(EngineError::InsufficientOperands { .. }) => (),
            other => panic!("expected insufficient operands, got {:?}", other),
        }
    }

    /// Two operands with no operator between them leave two values on the
    /// stack.
    #[test]
    fn leftover_operands_fail() {
        let mut engine = Engine::new();
        match engine.evaluate("2 3") {
            Err(EngineError::InvalidExpressionResult { count, .. }) => assert_eq!(count, 2),
            other => panic!("expected invalid expression result, got {:?}", other),
        }
    }

    #[test]
    fn empty_names_are_invalid() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.register_parameter("", 1.0),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.register_formula("", "1 + 1"),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.register_formula("f", ""),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.register_function("", 1, |args| args[0]),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.register_function("wide", 4, |args| args[0]),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    /// A formula with a syntax error is rejected at registration, not on
    /// first use.
    #[test]
    fn formula_parse_errors_surface_at_registration() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.register_formula("broken", "(1 + 2"),
            Err(EngineError::UnbalancedParentheses { .. })
        ));
        assert!(matches!(
            engine.evaluate_by_name("broken"),
            Err(EngineError::FormulaNotFound(_))
        ));
    }

    #[test]
    fn unregistering_removes_name_and_program() {
        let mut engine = Engine::new();
        engine.register_formula("f", "1 + 1").unwrap();
        assert!(engine.try_unregister_formula("f"));
        assert!(!engine.try_unregister_formula("f"));
        assert!(matches!(
            engine.evaluate_by_name("f"),
            Err(EngineError::FormulaNotFound(_))
        ));

        engine.register_parameter("p", 1.0).unwrap();
        assert!(engine.unregister_parameter("p"));
        assert!(!engine.unregister_parameter("p"));
        assert!(matches!(
            engine.evaluate("p"),
            Err(EngineError::UnknownParameter { .. })
        ));
    }

    /// `clear_cache` forgets formulas and cached results but keeps
    /// parameters; `clear_all` forgets parameters too.
    #[test]
    fn clearing() {
        let mut engine = Engine::new();
        engine.register_parameter("x", 1.0).unwrap();
        engine.register_formula("f", "x + 1").unwrap();
        engine.evaluate_by_name_with_caching("f").unwrap();

        engine.clear_cache();
        assert!(matches!(
            engine.evaluate_by_name("f"),
            Err(EngineError::FormulaNotFound(_))
        ));
        assert_evaluates_to(&mut engine, "x + 1", 2.0);

        engine.clear_all();
        assert!(matches!(
            engine.evaluate("x + 1"),
            Err(EngineError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn by_name_caching_is_idempotent() {
        let current = Rc::new(Cell::new(1.0_f32));
        let live = current.clone();
        let mut engine = Engine::new();
        engine
            .register_parameter_provider("signal", move || live.get())
            .unwrap();
        engine.register_formula("reading", "signal * 10").unwrap();

        let first = engine.evaluate_by_name_with_caching("reading").unwrap();
        current.set(9.0);
        let second = engine.evaluate_by_name_with_caching("reading").unwrap();
        assert_close(first, 10.0, "first cached read");
        assert_close(second, 10.0, "second cached read");
        // The uncached path sees the new value.
        assert_close(engine.evaluate_by_name("reading").unwrap(), 90.0, "uncached read");
    }

    /// During a cached evaluation, formula references consult the result
    /// cache before re-running their programs.
    #[test]
    fn nested_formula_references_consult_cache() {
        let current = Rc::new(Cell::new(2.0_f32));
        let live = current.clone();
        let mut engine = Engine::new();
        engine
            .register_parameter_provider("raw", move || live.get())
            .unwrap();
        engine.register_formula("inner", "raw * 10").unwrap();
        engine.register_formula("outer", "inner + 1").unwrap();

        // Populate the cache entry for the inner formula, then change the
        // parameter underneath it.
        engine.evaluate_by_name_with_caching("inner").unwrap();
        current.set(100.0);

        let outer = engine.evaluate_by_name_with_caching("outer").unwrap();
        assert_close(outer, 21.0, "outer over cached inner");
    }

    #[test]
    fn custom_functions_are_callable() {
        let mut engine = Engine::new();
        engine
            .register_function("hypot", 2, |args| {
                (args[0] * args[0] + args[1] * args[1]).sqrt()
            })
            .unwrap();
        assert_evaluates_to(&mut engine, "hypot(3, 4)", 5.0);
    }

    #[test]
    fn dump_formula_renders_json() {
        let mut engine = Engine::new();
        engine.register_formula("f", "1 + 2").unwrap();
        let dumped = engine.dump_formula("f").unwrap();
        assert_that(&dumped.as_str()).contains("postfix");
        assert_that(&dumped.as_str()).contains("Add");
        assert!(matches!(
            engine.dump_formula("missing"),
            Err(EngineError::FormulaNotFound(_))
        ));
    }

    #[test]
    fn standard_constants_are_available() {
        let mut engine = Engine::new();
        assert_evaluates_to(&mut engine, "cos(pi)", -1.0);
        assert_evaluates_to(&mut engine, "e", std::f32::consts::E);
    }
}
