use crate::ast::Expression;
use thiserror::Error as ThisError;

///
/// ExpressionError
///
/// Verification or rewrite failure. Carries the offending node so callers can
/// attribute the failure to a schema and field.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("invalid expression '{expression}': {message}")]
pub struct ExpressionError {
    pub expression: Box<Expression>,
    pub message: String,
}

impl ExpressionError {
    pub fn new(expression: &Expression, message: impl Into<String>) -> Self {
        Self {
            expression: Box::new(expression.clone()),
            message: message.into(),
        }
    }
}
