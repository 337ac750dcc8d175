
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result};
use serde::{Deserialize, Serialize};
use super::associativity::Associativity;
use super::token::{is_truthy, truth_value};

//..................................................................

lazy_static! {
    /// The eight operator symbols recognized in expression text.
    /// Built once at startup and never mutated.
    static ref OPERATOR_FOR_SYMBOL: HashMap<char, Operator> = {
        let mut table = HashMap::new();
        table.insert('+', Operator::Add);
        table.insert('-', Operator::Subtract);
        table.insert('*', Operator::Multiply);
        table.insert('/', Operator::Divide);
        table.insert('%', Operator::Mod);
        table.insert('^', Operator::Power);
        table.insert('&', Operator::And);
        table.insert('|', Operator::Or);
        table
    };
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
/// An Operator is a binary operation that may be applied to two operands.
/// Each Operator has a precedence; all are left associative except Power.
/// The logical operators treat any nonzero operand as true and yield 1 or 0.
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Power,
    And,
    Or,
}

impl Operator {
    /// Look up the operator for one of the recognized symbol characters.
    pub fn from_symbol(symbol: char) -> Option<Operator> {
        OPERATOR_FOR_SYMBOL.get(&symbol).copied()
    }

    /// The symbol for the operator as it appears in expression text.
    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
            Operator::Mod => '%',
            Operator::Power => '^',
            Operator::And => '&',
            Operator::Or => '|',
        }
    }

    /// Return the precedence of an operator, where a higher number means that
    /// the operator binds more tightly. The logical operators are evaluated
    /// last of all, after any comparison functions have produced 0/1 values.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Power => 3,
            Operator::Multiply => 2,
            Operator::Divide => 2,
            Operator::Mod => 2,
            Operator::Add => 1,
            Operator::Subtract => 1,
            Operator::And => 0,
            Operator::Or => 0,
        }
    }

    pub fn associativity(&self) -> Associativity {
        match self {
            Operator::Power => Associativity::Right,
            _ => Associativity::Left,
        }
    }

    /// Number of operands that each operator takes.
    pub fn arguments(&self) -> usize {
        2
    }

    /// Apply the operator to its two operands.
    /// Division and modulo by zero yield NaN rather than raising an error.
    pub fn apply(&self, left: f32, right: f32) -> f32 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => {
                if right == 0.0 { f32::NAN } else { left / right }
            }
            Operator::Mod => {
                if right == 0.0 { f32::NAN } else { left % right }
            }
            Operator::Power => left.powf(right),
            Operator::And => truth_value(is_truthy(left) && is_truthy(right)),
            Operator::Or => truth_value(is_truthy(left) || is_truthy(right)),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}", self.symbol())
    }
}

//..................................................................
