//! Static type verification of indexing scripts.
//!
//! Types flow left to right through each statement. Variables are scoped to
//! one script. Field types come from the schema through `FieldTypeAdapter`.

use crate::{
    ast::{Expression, OutputExpression, OutputKind},
    error::ExpressionError,
};
use schemac_types::DataType;
use std::collections::BTreeMap;

///
/// FieldTypeAdapter
///

pub trait FieldTypeAdapter {
    /// Type of a field readable by `input`.
    fn input_type(&self, field: &str) -> Option<DataType>;

    /// Type of the storage target written by an output of `kind`.
    fn output_type(&self, kind: OutputKind, field: &str) -> Option<DataType>;
}

/// Verify a whole script (or a single statement) against the adapter.
pub fn verify(exp: &Expression, adapter: &dyn FieldTypeAdapter) -> Result<(), ExpressionError> {
    let mut verifier = Verifier {
        adapter,
        variables: BTreeMap::new(),
    };
    verifier.exec(exp, None).map(|_| ())
}

/// Whether a produced value may be written to a target of the given type.
#[must_use]
pub fn is_assignable(produced: &DataType, target: &DataType) -> bool {
    produced.matches_ignoring_tag(target)
}

///
/// Verifier
///

struct Verifier<'a> {
    adapter: &'a dyn FieldTypeAdapter,
    variables: BTreeMap<String, DataType>,
}

impl Verifier<'_> {
    fn exec(
        &mut self,
        exp: &Expression,
        current: Option<DataType>,
    ) -> Result<Option<DataType>, ExpressionError> {
        match exp {
            Expression::Script(statements) => {
                self.variables.clear();
                for statement in statements {
                    self.exec(statement, None)?;
                }
                Ok(None)
            }
            Expression::Statement(children) => {
                let mut value = current;
                for child in children {
                    value = self.exec(child, value)?;
                }
                Ok(value)
            }
            Expression::Input(Some(field)) => self
                .adapter
                .input_type(field)
                .map(Some)
                .ok_or_else(|| ExpressionError::new(exp, format!("input field '{field}' not found"))),
            Expression::Input(None) => Err(ExpressionError::new(exp, "input has no field name")),
            Expression::Output(output) => self.exec_output(exp, output, current),
            Expression::ForEach(inner) => {
                let input = require_input(exp, current)?;
                let Some(element) = input.element_type() else {
                    return Err(ExpressionError::new(
                        exp,
                        format!("expected array or weighted set input, got {input}"),
                    ));
                };
                let produced = self.exec(inner, Some(element.clone()))?;

                Ok(Some(input.with_collection_of(
                    produced.unwrap_or_else(|| element.clone()),
                )))
            }
            Expression::SetVar(name) => {
                let value = require_input(exp, current)?;
                self.variables.insert(name.clone(), value.clone());
                Ok(Some(value))
            }
            Expression::GetVar(name) => self
                .variables
                .get(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| ExpressionError::new(exp, format!("variable '{name}' not defined"))),
            Expression::SetValue(constant) => Ok(Some(constant.data_type())),
            Expression::ToArray => Ok(Some(DataType::array(require_input(exp, current)?))),
            leaf => {
                let input = require_input(leaf, current)?;
                if let Some(required) = leaf.required_input_type()
                    && input != required
                {
                    return Err(ExpressionError::new(
                        leaf,
                        format!("expected {required} input, got {input}"),
                    ));
                }

                Ok(leaf.created_output_type().or(Some(input)))
            }
        }
    }

    fn exec_output(
        &self,
        exp: &Expression,
        output: &OutputExpression,
        current: Option<DataType>,
    ) -> Result<Option<DataType>, ExpressionError> {
        let Some(field) = output.field.as_deref() else {
            return Err(ExpressionError::new(exp, "output has no field name"));
        };
        let value = require_input(exp, current)?;
        let Some(target) = self.adapter.output_type(output.kind, field) else {
            return Err(ExpressionError::new(
                exp,
                format!("{} field '{field}' not found", output.kind),
            ));
        };
        if !is_assignable(&value, &target) {
            return Err(ExpressionError::new(
                exp,
                format!(
                    "can not assign {value} to {} field '{field}' which is {target}",
                    output.kind
                ),
            ));
        }

        Ok(Some(value))
    }
}

fn require_input(exp: &Expression, current: Option<DataType>) -> Result<DataType, ExpressionError> {
    current.ok_or_else(|| ExpressionError::new(exp, "expected input, but no input is provided"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fields(Vec<(&'static str, DataType)>);

    impl FieldTypeAdapter for Fields {
        fn input_type(&self, field: &str) -> Option<DataType> {
            self.0
                .iter()
                .find(|(name, _)| *name == field)
                .map(|(_, t)| t.clone())
        }

        fn output_type(&self, _: OutputKind, field: &str) -> Option<DataType> {
            self.input_type(field)
        }
    }

    fn fields() -> Fields {
        Fields(vec![
            ("title", DataType::String),
            ("tags", DataType::array(DataType::String)),
            ("loc", DataType::Position),
            ("loc_zcurve", DataType::Long),
            ("count", DataType::Int),
        ])
    }

    #[test]
    fn accepts_well_typed_script() {
        let script = Expression::script([
            Expression::statement([
                Expression::input("title"),
                Expression::tokenize(true, None),
                Expression::index("title"),
            ]),
            Expression::statement([
                Expression::input("tags"),
                Expression::for_each(Expression::Lowercase),
                Expression::attribute("tags"),
            ]),
            Expression::statement([
                Expression::input("loc"),
                Expression::ZCurve,
                Expression::attribute("loc_zcurve"),
            ]),
        ]);

        verify(&script, &fields()).unwrap();
    }

    #[test]
    fn rejects_type_mismatch_on_output() {
        let script = Expression::script([Expression::statement([
            Expression::input("title"),
            Expression::attribute("count"),
        ])]);

        let err = verify(&script, &fields()).unwrap_err();
        assert_eq!(*err.expression, Expression::attribute("count"));
        assert!(err.message.contains("can not assign string"));
    }

    #[test]
    fn rejects_transform_on_wrong_input() {
        let script = Expression::script([Expression::statement([
            Expression::input("tags"),
            Expression::Lowercase,
            Expression::attribute("tags"),
        ])]);

        let err = verify(&script, &fields()).unwrap_err();
        assert_eq!(*err.expression, Expression::Lowercase);
    }

    #[test]
    fn rejects_unknown_targets_and_missing_input() {
        let unknown = Expression::script([Expression::statement([
            Expression::input("title"),
            Expression::index("body"),
        ])]);
        assert!(
            verify(&unknown, &fields())
                .unwrap_err()
                .message
                .contains("index field 'body' not found")
        );

        let missing = Expression::script([Expression::statement([Expression::summary("title")])]);
        assert!(verify(&missing, &fields()).is_err());
    }

    #[test]
    fn variables_are_scoped_to_the_script() {
        let script = Expression::script([
            Expression::statement([Expression::input("title"), Expression::SetVar("t".into())]),
            Expression::statement([Expression::GetVar("t".into()), Expression::summary("title")]),
        ]);
        verify(&script, &fields()).unwrap();

        let undefined = Expression::script([Expression::statement([
            Expression::GetVar("t".into()),
            Expression::summary("title"),
        ])]);
        assert!(verify(&undefined, &fields()).is_err());
    }
}
