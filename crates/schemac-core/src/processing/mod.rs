//! The derivation and validation passes. Every pass has the signature
//! `fn(&mut Schema, &PassContext) -> Result<(), CompileError>` and is
//! dispatched from `PassId::run`.

pub(crate) mod attribute;
pub(crate) mod document;
pub(crate) mod field_set;
pub(crate) mod field_type;
pub(crate) mod harmonizer;
pub(crate) mod imported;
pub(crate) mod index;
pub(crate) mod indexing;
pub(crate) mod matching;
pub(crate) mod position;
pub(crate) mod rank;
pub(crate) mod summary;
pub(crate) mod summary_transform;

use crate::{
    error::CompileError,
    schema::{Field, Schema, SummaryField, SummaryTransform},
};
use schemac_expr::{Converter, convert_script_root};

/// Every concrete field and its members, parents first.
pub(crate) fn all_fields(schema: &Schema) -> Vec<&Field> {
    fn walk<'a>(field: &'a Field, out: &mut Vec<&'a Field>) {
        out.push(field);
        for sub in field.struct_fields.values() {
            walk(sub, out);
        }
    }

    let mut out = Vec::new();
    for field in schema.concrete_fields() {
        walk(field, &mut out);
    }

    out
}

/// Names of every concrete field and member, parents first.
pub(crate) fn all_field_names(schema: &Schema) -> Vec<String> {
    all_fields(schema).into_iter().map(|f| f.name.clone()).collect()
}

/// Replace a field's script with its converted form.
pub(crate) fn convert_field_script<C: Converter>(
    schema: &str,
    field: &mut Field,
    converter: &mut C,
) -> Result<(), CompileError> {
    let Some(script) = field.indexing.take() else {
        return Ok(());
    };
    let converted = convert_script_root(converter, script)
        .map_err(|err| CompileError::from_expression(schema, &field.name, err))?;
    field.indexing = Some(converted);

    Ok(())
}

/// Set a summary transform. A transform, once set, may only be set again to
/// the same value.
pub(crate) fn assign_transform(
    schema: &str,
    summary: &mut SummaryField,
    transform: SummaryTransform,
) -> Result<(), CompileError> {
    if summary.transform.is_none() || summary.transform == transform {
        summary.transform = transform;
        return Ok(());
    }

    Err(CompileError::transform_consistency(
        schema,
        format!(
            "summary field '{}' already has transform '{}', cannot change it to '{transform}'",
            summary.name, summary.transform
        ),
    )
    .with_field(&summary.name))
}

/// Apply a transform to every class entry and field declaration with the
/// given name.
pub(crate) fn assign_transform_everywhere(
    schema: &mut Schema,
    name: &str,
    transform: SummaryTransform,
) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();
    let mut result = Ok(());
    schema.update_summary_fields(name, |summary| {
        if result.is_ok() {
            result = assign_transform(&schema_name, summary, transform);
        }
    });

    result
}

/// Apply `f` to every concrete field and member, parents first, stopping at
/// the first failure.
pub(crate) fn try_visit_fields_mut<F>(schema: &mut Schema, mut f: F) -> Result<(), CompileError>
where
    F: FnMut(&mut Field) -> Result<(), CompileError>,
{
    fn walk<F>(field: &mut Field, f: &mut F) -> Result<(), CompileError>
    where
        F: FnMut(&mut Field) -> Result<(), CompileError>,
    {
        f(field)?;
        for sub in field.struct_fields.values_mut() {
            walk(sub, f)?;
        }

        Ok(())
    }

    for field in schema.concrete_fields_mut() {
        walk(field, &mut f)?;
    }

    Ok(())
}
