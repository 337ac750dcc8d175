
use std::fmt::{Display, Formatter, Result};
use serde::{Deserialize, Serialize};
use super::operator::Operator;

/*
    Data used by the tokenizer, the shunting yard converter and the evaluator:

        - Operator (used by Token)
        - Token (produced by the Tokenizer, rearranged by ShuntingYard,
          consumed by the Evaluator)

    1. The Tokenizer reads a string and yields Tokens in infix order.
    2. ShuntingYard resequences the Tokens from infix to postfix order.
    3. The Evaluator walks the postfix Tokens with a single operand stack.
*/

//..................................................................

// Truthiness for the logical operators and functions: any nonzero value is
// true, zero is false.

pub fn is_truthy(value: f32) -> bool {
    value != 0.0
}

pub fn is_falsey(value: f32) -> bool {
    !is_truthy(value)
}

/// Render a boolean back into the numeric domain as 1 or 0.
pub fn truth_value(truthy: bool) -> f32 {
    if truthy { 1.0 } else { 0.0 }
}

//..................................................................

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
/// A Token is one lexical element of an expression.
///
/// The same type serves both orders: the Tokenizer yields Tokens in infix
/// order, and the shunting yard converter re-emits them in postfix order,
/// where the punctuation variants no longer appear (parentheses and commas
/// only steer the conversion; they carry no value).
pub enum Token {
    /// A numeric literal, including a folded leading minus sign.
    Number(f32),

    /// A `true` or `false` literal, numerically one or zero.
    Boolean(bool),

    /// The name of a parameter to be read from the parameter registry.
    Identifier(String),

    Operator(Operator),

    /// The name of a function, recognized by call syntax: `name(`.
    Function(String),

    /// The name of a registered formula whose compiled program will be
    /// evaluated in place of this token.
    Formula(String),

    OpenParenthesis,
    CloseParenthesis,
    Comma,
}

impl Token {
    /// The name of the enum variant.
    pub fn name(&self) -> &'static str {
        match self {
            Token::Number(_) => "Number",
            Token::Boolean(_) => "Boolean",
            Token::Identifier(_) => "Identifier",
            Token::Operator(_) => "Operator",
            Token::Function(_) => "Function",
            Token::Formula(_) => "Formula",
            Token::OpenParenthesis => "OpenParenthesis",
            Token::CloseParenthesis => "CloseParenthesis",
            Token::Comma => "Comma",
        }
    }

    /// The literal value carried by a Number or Boolean token, or None.
    pub fn literal_value(&self) -> Option<f32> {
        match self {
            Token::Number(value) => Some(*value),
            Token::Boolean(value) => Some(truth_value(*value)),
            _ => None,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            Token::Number(value) => write!(f, "{}", value),
            Token::Boolean(value) => write!(f, "{}", value),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Function(name) => write!(f, "{}", name),
            Token::Formula(name) => write!(f, "{}", name),
            Token::OpenParenthesis => write!(f, "("),
            Token::CloseParenthesis => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

//..................................................................
