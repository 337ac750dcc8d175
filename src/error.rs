use thiserror::Error;

//..................................................................

/// Errors raised by the engine. All are raised synchronously at the point of
/// failure; evaluation-time variants carry the text of the expression that was
/// being evaluated. Numeric trouble (division by zero, square root of a
/// negative number) is never an error: it produces NaN and propagates.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A registration was given an empty name, an empty expression, or an
    /// unusable function definition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unbalanced parentheses in expression '{expression}'")]
    UnbalancedParentheses { expression: String },

    #[error("unknown parameter '{name}' in expression '{expression}'")]
    UnknownParameter { name: String, expression: String },

    #[error("unknown function '{name}' in expression '{expression}'")]
    UnknownFunction { name: String, expression: String },

    /// An operator or function found fewer operands on the stack than it
    /// consumes. The lone exception, a single operand beneath a minus sign,
    /// is handled by the evaluator as unary negation before this is raised.
    #[error("not enough operands for '{operation}' in expression '{expression}'")]
    InsufficientOperands { operation: String, expression: String },

    #[error("expression '{expression}' left {count} values on the stack instead of one")]
    InvalidExpressionResult { expression: String, count: usize },

    #[error("no formula registered under the name '{0}'")]
    FormulaNotFound(String),

    /// A formula referenced itself, directly or through other formulas.
    #[error("circular reference detected while evaluating formula '{0}'")]
    CircularReference(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
