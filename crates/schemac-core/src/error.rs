use derive_more::Display;
use schemac_expr::ExpressionError;
use thiserror::Error as ThisError;

///
/// CompileError
///
/// Hard failure of a compilation run. Names the schema, the field when one
/// is involved, and the rule category that was violated. A failed run
/// leaves the schema graph in an unspecified state.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("For schema '{schema}'{}: {message}", field_label(.field))]
pub struct CompileError {
    pub class: ErrorClass,
    pub schema: String,
    pub field: Option<String>,
    pub message: String,
}

impl CompileError {
    pub fn new(class: ErrorClass, schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class,
            schema: schema.into(),
            field: None,
            message: message.into(),
        }
    }

    /// Construct a structural failure (missing blocks, reserved or illegal names).
    pub fn structural(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Structural, schema, message)
    }

    /// Construct a failure for one name used with incompatible types.
    pub fn type_consistency(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::TypeConsistency, schema, message)
    }

    /// Construct a failure for conflicting summary transforms.
    pub fn transform_consistency(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::TransformConsistency, schema, message)
    }

    /// Construct a failure for a source that does not resolve.
    pub fn source_validity(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::SourceValidity, schema, message)
    }

    /// Construct a failure for an unsupported type/feature combination.
    pub fn shape_validity(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ShapeValidity, schema, message)
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attribute an indexing-expression failure to a schema field.
    pub fn from_expression(
        schema: impl Into<String>,
        field: impl Into<String>,
        err: ExpressionError,
    ) -> Self {
        Self::type_consistency(schema, err.to_string()).with_field(field)
    }
}

fn field_label(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|name| format!(", field '{name}'"))
        .unwrap_or_default()
}

///
/// ErrorClass
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    #[display("shape_validity")]
    ShapeValidity,
    #[display("source_validity")]
    SourceValidity,
    #[display("structural")]
    Structural,
    #[display("transform_consistency")]
    TransformConsistency,
    #[display("type_consistency")]
    TypeConsistency,
}
