
use std::collections::HashMap;

use crate::cache::{Cache, UnboundedCache};
use crate::error::{EngineError, Result};
use crate::parser::functions::FunctionTable;
use crate::parser::operator::Operator;
use crate::parser::token::Token;
use crate::parser::Program;
use crate::pool::BufferPool;

use super::parameters::ParameterRegistry;

//..................................................................

/// Evaluator executes a postfix token sequence against the engine's
/// registries, using a single operand stack borrowed from the buffer pool.
///
/// One Evaluator lives for one top-level evaluation. Formula tokens recurse
/// back into the same Evaluator, which threads two pieces of state through
/// the recursion: the optional result cache (consulted before re-running a
/// formula's program when the entry point asked for caching) and the list of
/// formula names currently being expanded, used to refuse circular
/// references instead of overflowing the call stack.
pub struct Evaluator<'e> {
    functions: &'e FunctionTable,

    parameters: &'e ParameterRegistry,

    formulas: &'e HashMap<String, Program>,

    pool: &'e BufferPool,

    cache: Option<&'e mut UnboundedCache<String, f32>>,

    /// Names of the formulas currently being expanded, outermost first.
    in_flight: Vec<String>,
}

impl<'e> Evaluator<'e> {
    pub fn new(
        functions: &'e FunctionTable,
        parameters: &'e ParameterRegistry,
        formulas: &'e HashMap<String, Program>,
        pool: &'e BufferPool,
        cache: Option<&'e mut UnboundedCache<String, f32>>,
    ) -> Evaluator<'e> {
        Evaluator {
            functions,
            parameters,
            formulas,
            pool,
            cache,
            in_flight: Vec::new(),
        }
    }

    /// Execute a postfix token sequence and return the single value it
    /// reduces to. `source` is the expression text, carried for error
    /// context only.
    pub fn run(&mut self, postfix: &[Token], source: &str) -> Result<f32> {
        let mut operands = self.pool.operand_stack();
        for token in postfix {
            match token {
                Token::Number(value) => operands.push(*value),

                Token::Boolean(value) => operands.push(if *value { 1.0 } else { 0.0 }),

                Token::Identifier(name) => match self.parameters.get(name) {
                    Some(value) => operands.push(value),
                    None => {
                        return Err(EngineError::UnknownParameter {
                            name: name.clone(),
                            expression: source.to_string(),
                        })
                    }
                },

                Token::Operator(op) => Self::apply_operator(*op, &mut operands, source)?,

                Token::Function(name) => self.call_function(name, &mut operands, source)?,

                Token::Formula(name) => {
                    let value = self.run_formula(name)?;
                    operands.push(value);
                }

                // Punctuation never survives the conversion to postfix.
                Token::OpenParenthesis | Token::CloseParenthesis | Token::Comma => (),
            }
        }
        match operands.len() {
            1 => Ok(operands[0]),
            count => Err(EngineError::InvalidExpressionResult {
                expression: source.to_string(),
                count,
            }),
        }
    }

    /// Evaluate a registered formula by name, consulting the result cache
    /// first when the entry point requested caching.
    pub fn run_formula(&mut self, name: &str) -> Result<f32> {
        if self.in_flight.iter().any(|expanding| expanding == name) {
            return Err(EngineError::CircularReference(name.to_string()));
        }
        if let Some(cache) = self.cache.as_mut() {
            if let Some(hit) = cache.get(&name.to_string()) {
                return Ok(hit);
            }
        }
        let program = match self.formulas.get(name) {
            Some(program) => program,
            None => return Err(EngineError::FormulaNotFound(name.to_string())),
        };
        self.in_flight.push(name.to_string());
        let result = self.run(program.postfix(), program.source());
        self.in_flight.pop();
        result
    }

    /// Pop two operands and push the operator's result. With only one
    /// operand available, a Subtract negates it. That is how unary minus on
    /// parenthesized expressions, parameters and function results is
    /// realized, since unary minus on literals was already folded by the
    /// tokenizer. Any other operator without two operands is an error.
    fn apply_operator(op: Operator, operands: &mut Vec<f32>, source: &str) -> Result<()> {
        if operands.len() >= op.arguments() {
            if let (Some(right), Some(left)) = (operands.pop(), operands.pop()) {
                operands.push(op.apply(left, right));
                return Ok(());
            }
        }
        match (op, operands.pop()) {
            (Operator::Subtract, Some(operand)) => {
                operands.push(-operand);
                Ok(())
            }
            _ => Err(EngineError::InsufficientOperands {
                operation: op.symbol().to_string(),
                expression: source.to_string(),
            }),
        }
    }

    /// Pop exactly arity operands, reverse them back into call order, and
    /// push the function's result.
    fn call_function(&mut self, name: &str, operands: &mut Vec<f32>, source: &str) -> Result<()> {
        let def = match self.functions.get(name) {
            Some(def) => def,
            None => {
                return Err(EngineError::UnknownFunction {
                    name: name.to_string(),
                    expression: source.to_string(),
                })
            }
        };
        let mut args = self.pool.argument_buffer();
        for _ in 0..def.arity() {
            match operands.pop() {
                Some(value) => args.push(value),
                None => {
                    return Err(EngineError::InsufficientOperands {
                        operation: name.to_string(),
                        expression: source.to_string(),
                    })
                }
            }
        }
        args.reverse();
        operands.push(def.call(&args));
        Ok(())
    }
}
