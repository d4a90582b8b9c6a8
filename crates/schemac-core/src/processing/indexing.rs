//! Passes over the indexing scripts themselves: defaulting of inputs and
//! outputs, cleanup, static verification, and protection of document
//! values against rewriting.

use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{all_field_names, all_fields, convert_field_script, try_visit_fields_mut},
    schema::Schema,
};
use schemac_expr::{Converter, Expression, ExpressionError, OutputExpression, OutputKind, verify};

/// Statements that read nothing read the owning field.
pub(crate) fn indexing_inputs(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let known = all_field_names(schema);
    let schema_name = schema.name.clone();

    try_visit_fields_mut(schema, |field| {
        let name = field.name.clone();
        convert_field_script(&schema_name, field, &mut FillInput { field: name.clone() })?;

        let Some(script) = field.indexing.take() else {
            return Ok(());
        };
        let statements = match script {
            Expression::Script(statements) => statements,
            other => vec![other],
        };
        let script = Expression::Script(
            statements
                .into_iter()
                .map(|s| with_default_input(s, &name))
                .collect(),
        );

        if ctx.validate()
            && let Some(unknown) = script
                .input_fields()
                .into_iter()
                .find(|input| !known.iter().any(|k| k == input))
        {
            return Err(CompileError::source_validity(
                &schema_name,
                format!("indexing script refers to field '{unknown}' which does not exist"),
            )
            .with_field(&name));
        }
        field.indexing = Some(script);

        Ok(())
    })
}

fn with_default_input(statement: Expression, field: &str) -> Expression {
    let mut children = match statement {
        Expression::Statement(children) => children,
        other => vec![other],
    };
    let reads = children
        .iter()
        .any(|c| c.contains(|e| matches!(e, Expression::Input(_))));
    let produces = matches!(
        children.first(),
        Some(Expression::SetValue(_) | Expression::GetVar(_))
    );
    if !reads && !produces {
        children.insert(0, Expression::input(field));
    }

    Expression::Statement(children)
}

struct FillInput {
    field: String,
}

impl Converter for FillInput {
    fn should_convert(&self, exp: &Expression) -> bool {
        matches!(exp, Expression::Input(None))
    }

    fn do_convert(&mut self, _: Expression) -> Result<Option<Expression>, ExpressionError> {
        Ok(Some(Expression::input(&self.field)))
    }
}

/// Drop empty and repeated statements, and repeated adjacent outputs.
pub(crate) fn optimize_indexing_scripts(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    try_visit_fields_mut(schema, |field| {
        if let Some(script) = field.indexing.take() {
            field.indexing = Some(optimize(script));
        }
        Ok(())
    })
}

fn optimize(script: Expression) -> Expression {
    let Expression::Script(statements) = script else {
        return script;
    };
    let mut out: Vec<Expression> = Vec::with_capacity(statements.len());

    for statement in statements {
        let statement = match statement {
            Expression::Statement(children) => {
                let mut kept: Vec<Expression> = Vec::with_capacity(children.len());
                for child in children {
                    if child.is_output() && kept.last() == Some(&child) {
                        continue;
                    }
                    kept.push(child);
                }
                Expression::Statement(kept)
            }
            other => other,
        };
        if statement.children().is_empty() || out.contains(&statement) {
            continue;
        }
        out.push(statement);
    }

    Expression::Script(out)
}

/// Unnamed outputs write to the owning field; summary outputs without a
/// summary field to receive them are removed.
pub(crate) fn indexing_outputs(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut summaries = schema.summary_field_names();
    for field in all_fields(schema) {
        summaries.extend(field.summary_fields.keys().cloned());
    }
    let schema_name = schema.name.clone();

    try_visit_fields_mut(schema, |field| {
        let mut converter = FillOutputs {
            field: field.name.clone(),
            summaries: &summaries,
        };
        convert_field_script(&schema_name, field, &mut converter)
    })
}

struct FillOutputs<'a> {
    field: String,
    summaries: &'a [String],
}

impl Converter for FillOutputs<'_> {
    fn should_convert(&self, exp: &Expression) -> bool {
        exp.is_output()
    }

    fn do_convert(&mut self, exp: Expression) -> Result<Option<Expression>, ExpressionError> {
        let Expression::Output(output) = exp else {
            return Ok(None);
        };
        let target = output.field.unwrap_or_else(|| self.field.clone());
        if output.kind == OutputKind::Summary && !self.summaries.contains(&target) {
            return Ok(None);
        }

        Ok(Some(Expression::Output(OutputExpression {
            kind: output.kind,
            field: Some(target),
        })))
    }
}

/// Type-check every script against the schema.
pub(crate) fn indexing_validation(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let schema: &Schema = schema;

    for field in all_fields(schema) {
        if let Some(script) = &field.indexing {
            verify(script, schema)
                .map_err(|err| CompileError::from_expression(&schema.name, &field.name, err))?;
        }
    }

    Ok(())
}

/// Attribute and summary outputs may store a document field's value only
/// as read, never rewritten or read from another field.
pub(crate) fn indexing_values(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let schema: &Schema = schema;

    for field in all_fields(schema) {
        let Some(script) = &field.indexing else {
            continue;
        };
        for statement in script.statements() {
            let mut state = ValueState::default();
            if let Some(target) = state.first_violation(schema, statement.children()) {
                return Err(CompileError::shape_validity(
                    &schema.name,
                    format!(
                        "indexing expression '{statement}' attempts to modify the value of the document field '{target}'; use a field outside the document block instead"
                    ),
                )
                .with_field(&field.name));
            }
        }
    }

    Ok(())
}

#[derive(Default)]
struct ValueState<'a> {
    source: Option<&'a str>,
    modified: bool,
}

impl<'a> ValueState<'a> {
    fn first_violation(&mut self, schema: &Schema, nodes: &'a [Expression]) -> Option<&'a str> {
        for node in nodes {
            match node {
                Expression::Input(source) => {
                    self.source = source.as_deref();
                    self.modified = false;
                }
                Expression::Output(output) => {
                    let Some(target) = output.field.as_deref() else {
                        continue;
                    };
                    if output.kind != OutputKind::Index
                        && schema.is_document_field(target)
                        && (self.modified || self.source != Some(target))
                    {
                        return Some(target);
                    }
                }
                Expression::ForEach(_) | Expression::Statement(_) => {
                    if let Some(target) = self.first_violation(schema, node.children()) {
                        return Some(target);
                    }
                }
                Expression::SetVar(_) | Expression::OptimizePredicate => {}
                annotator if annotator.is_tokenizer() => {}
                _ => {
                    self.source = None;
                    self.modified = true;
                }
            }
        }

        None
    }
}
