
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub mod token;
use token::Token;

pub mod associativity;
use associativity::Associativity;

pub mod operator;
use operator::Operator;

pub mod functions;
use functions::FunctionTable;

use crate::error::{EngineError, Result};
use crate::lexer::Tokenizer;
use crate::pool::BufferPool;

//..................................................................

/// Implements the shunting yard algorithm for converting a series of tokens
/// in infix order into a series of tokens in postfix order. Once reordered,
/// the expression may be efficiently computed with a single operand stack.
///
/// The converter holds no long-lived state of its own: the working stack is
/// borrowed from the buffer pool for the duration of one conversion.
pub struct ShuntingYard<'e> {
    /// The input expression prior to parsing.
    expression_source: &'e str,

    functions: &'e FunctionTable,

    formulas: &'e HashMap<String, Program>,

    pool: &'e BufferPool,
}

impl<'e> ShuntingYard<'e> {
    pub fn new(
        expression_source: &'e str,
        functions: &'e FunctionTable,
        formulas: &'e HashMap<String, Program>,
        pool: &'e BufferPool,
    ) -> ShuntingYard<'e> {
        ShuntingYard { expression_source, functions, formulas, pool }
    }

    /// Tokenize the expression and rearrange the tokens into postfix order,
    /// returning a compiled Program that owns its source text.
    pub fn compile(self) -> Result<Program> {
        let source = self.expression_source.to_string();
        let mut postfix = Vec::new();
        self.compile_into(&mut postfix)?;
        Ok(Program { source, postfix })
    }

    /// Tokenize the expression and write the postfix token sequence into the
    /// given buffer, which the caller typically borrows from the pool. This
    /// is the allocation-free path used for one-shot evaluation of raw text.
    pub fn compile_into(self, postfix: &mut Vec<Token>) -> Result<()> {
        let mut working = self.pool.token_list();
        for token in Tokenizer::new(self.expression_source, self.functions, self.formulas) {
            match token {
                // Value Rule: operands are copied straight to the output.
                Token::Number(_) | Token::Boolean(_) | Token::Identifier(_) | Token::Formula(_) => {
                    postfix.push(token)
                }

                // Functions wait on the working stack until their argument
                // list has been emitted; parentheses wait for their match.
                Token::Function(_) | Token::OpenParenthesis => working.push(token),

                // Precedence & Associativity Rules:
                Token::Operator(op) => {
                    Self::reduce(op, &mut working, postfix);
                    working.push(token)
                }

                // Right Parenthesis Rule: pop operators to the output until
                // the matching left parenthesis, which is discarded.
                Token::CloseParenthesis => {
                    loop {
                        match working.pop() {
                            Some(Token::OpenParenthesis) => break,
                            Some(shunted) => postfix.push(shunted),
                            None => {
                                return Err(EngineError::UnbalancedParentheses {
                                    expression: self.expression_source.to_string(),
                                })
                            }
                        }
                    }
                    // A function just beneath the parentheses attaches to the
                    // argument list that was emitted inside them.
                    if let Some(Token::Function(_)) = working.last() {
                        if let Some(function) = working.pop() {
                            postfix.push(function);
                        }
                    }
                }

                // Comma Rule: flush the finished argument to the output, but
                // leave the left parenthesis for the eventual close.
                Token::Comma => loop {
                    match working.last() {
                        Some(Token::OpenParenthesis) | None => break,
                        Some(_) => {
                            if let Some(shunted) = working.pop() {
                                postfix.push(shunted);
                            }
                        }
                    }
                },
            }
        }

        // End of Input Rule: transfer the remaining operators to the output.
        // A surviving left parenthesis was never matched.
        loop {
            match working.pop() {
                Some(Token::OpenParenthesis) => {
                    return Err(EngineError::UnbalancedParentheses {
                        expression: self.expression_source.to_string(),
                    })
                }
                Some(shunted) => postfix.push(shunted),
                None => break,
            }
        }
        Ok(())
    }

    /// Apply the rules for precedence and associativity: move operators from
    /// the working stack to the output while the stack top binds at least as
    /// tightly as the incoming operator. The equal-precedence case moves the
    /// stack top only for left-associative incoming operators, which is what
    /// makes `2 ^ 3 ^ 2` nest to the right while `2 - 3 - 4` runs left.
    fn reduce(incoming: Operator, working: &mut Vec<Token>, postfix: &mut Vec<Token>) {
        loop {
            let top = match working.last() {
                Some(Token::Operator(op)) => *op,
                _ => break,
            };
            let yields = top.precedence() > incoming.precedence()
                || (top.precedence() == incoming.precedence()
                    && incoming.associativity() == Associativity::Left);
            if !yields {
                break;
            }
            postfix.push(Token::Operator(top));
            working.pop();
        }
    }
}

//..................................................................

/// A compiled expression: its source text and its tokens in postfix order.
/// The postfix sequence is immutable once compiled; formulas stored in the
/// registry are evaluated from this form without reparsing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Program {
    source: String,
    postfix: Vec<Token>,
}

impl Program {
    /// The infix expression as a string, before it was compiled.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The tokens rearranged into postfix order by the shunting yard.
    pub fn postfix(&self) -> &[Token] {
        &self.postfix
    }

    /// Build a one-token program directly, bypassing the tokenizer.
    #[cfg(test)]
    pub fn constant_for_test(source: &str, value: f32) -> Program {
        Program {
            source: source.to_string(),
            postfix: vec![Token::Number(value)],
        }
    }
}

//..................................................................
