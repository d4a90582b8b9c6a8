//! Resolution of fields imported through a document reference.
//!
//! Targets are looked up in the already compiled schema owning the
//! referenced document type. Only attribute-backed targets can be imported;
//! complex targets import the attribute-backed leaves they contain.

use crate::{
    error::{CompileError, ErrorClass},
    pipeline::PassContext,
    schema::{
        Attribute, Field, ImportDeclaration, ImportedComplexField, ImportedField,
        ImportedSimpleField, Schema,
    },
};
use indexmap::IndexMap;
use schemac_types::{DataType, zcurve_field_name};
use std::fmt::Display;

pub(crate) fn resolve_imported_fields(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let declared = schema.imported_fields.declared.clone();

    for declaration in &declared {
        let resolved = if schema
            .imported_fields
            .resolved
            .contains_key(&declaration.local_name)
        {
            Err(CompileError::structural(
                &schema.name,
                format!(
                    "imported field '{}' is declared more than once",
                    declaration.local_name
                ),
            )
            .with_field(&declaration.local_name))
        } else {
            resolve(schema, ctx, declaration)
        };

        match resolved {
            Ok(field) => {
                schema
                    .imported_fields
                    .resolved
                    .insert(declaration.local_name.clone(), field);
            }
            Err(err) if ctx.validate() => return Err(err),
            Err(_) => {}
        }
    }

    Ok(())
}

fn resolve(
    schema: &Schema,
    ctx: &PassContext<'_>,
    declaration: &ImportDeclaration,
) -> Result<ImportedField, CompileError> {
    let fail =
        |class, reason: &dyn Display| import_error(&schema.name, declaration, class, reason);

    let Some(document) = schema.reference_target(&declaration.reference_field) else {
        return Err(fail(
            ErrorClass::SourceValidity,
            &format!("reference field '{}' not found", declaration.reference_field),
        ));
    };
    let Some(target_schema) = ctx.referenced_schema(document) else {
        return Err(fail(
            ErrorClass::SourceValidity,
            &format!("referenced document type '{document}' is not compiled"),
        ));
    };
    let Some(target) = target_schema.get_field(&declaration.target_field) else {
        return Err(fail(
            ErrorClass::SourceValidity,
            &format!(
                "field '{}' not found in schema '{}'",
                declaration.target_field, target_schema.name
            ),
        ));
    };

    if matches!(target.data_type, DataType::Predicate) {
        return Err(fail(
            ErrorClass::ShapeValidity,
            &"is of type 'predicate', which is not supported",
        ));
    }
    if target.does_indexing() {
        return Err(fail(
            ErrorClass::ShapeValidity,
            &"is an index field, which is not supported",
        ));
    }

    let local = declaration.local_name.as_str();
    let reference = declaration.reference_field.as_str();

    if target.data_type.is_position() {
        let zcurve = zcurve_field_name(&target.name);
        let Some(attribute) = target_schema.get_attribute(&zcurve) else {
            return Err(fail(
                ErrorClass::ShapeValidity,
                &"is a position field without an attribute",
            ));
        };
        let zcurve_field = target_schema
            .get_field(&zcurve)
            .cloned()
            .unwrap_or_else(|| Field::new(&zcurve, attribute.data_type.clone()));
        let local_zcurve = zcurve_field_name(local);
        let nested = IndexMap::from([(
            local_zcurve.clone(),
            simple(&local_zcurve, reference, &zcurve_field),
        )]);

        return Ok(complex(local, reference, target, nested));
    }

    if target.data_type.is_complex() || target.data_type.is_collection_of_struct() {
        let nested = import_members(local, reference, &declaration.target_field, target);
        if nested.is_empty() {
            return Err(fail(
                ErrorClass::ShapeValidity,
                &"is a complex field without any attribute-backed members",
            ));
        }
        if target.data_type.is_map_of_primitive() && nested.len() != 2 {
            return Err(fail(
                ErrorClass::ShapeValidity,
                &"is a map field, both key and value must be attributes",
            ));
        }

        return Ok(complex(local, reference, target, nested));
    }

    if target.attribute().is_none() {
        return Err(fail(
            ErrorClass::ShapeValidity,
            &"is not an attribute field. Only attribute fields are supported",
        ));
    }

    Ok(simple(local, reference, target))
}

// Members are named by swapping the target's name prefix for the local one.
fn import_members(
    local: &str,
    reference: &str,
    target_name: &str,
    parent: &Field,
) -> IndexMap<String, ImportedField> {
    let mut out = IndexMap::new();

    for member in parent.struct_fields.values() {
        let name = member.name.strip_prefix(target_name).map_or_else(
            || format!("{local}.{}", member.name),
            |rest| format!("{local}{rest}"),
        );

        if member.struct_fields.is_empty() {
            if member.attribute().is_some() {
                out.insert(name.clone(), simple(&name, reference, member));
            }
        } else {
            let nested = import_members(local, reference, target_name, member);
            if !nested.is_empty() {
                out.insert(name.clone(), complex(&name, reference, member, nested));
            }
        }
    }

    out
}

fn simple(name: &str, reference: &str, target: &Field) -> ImportedField {
    let mut attribute = target
        .attribute()
        .cloned()
        .unwrap_or_else(|| Attribute::new(&target.name, target.data_type.clone()));
    attribute.name = name.to_string();

    ImportedField::Simple(ImportedSimpleField {
        name: name.to_string(),
        reference_field: reference.to_string(),
        target_field: target.clone(),
        attribute,
    })
}

fn complex(
    name: &str,
    reference: &str,
    target: &Field,
    nested: IndexMap<String, ImportedField>,
) -> ImportedField {
    ImportedField::Complex(ImportedComplexField {
        name: name.to_string(),
        reference_field: reference.to_string(),
        target_field: target.clone(),
        nested,
    })
}

fn import_error(
    schema: &str,
    declaration: &ImportDeclaration,
    class: ErrorClass,
    reason: &dyn Display,
) -> CompileError {
    CompileError::new(
        class,
        schema,
        format!(
            "failed to import '{}.{}': {reason}",
            declaration.reference_field, declaration.target_field
        ),
    )
    .with_field(&declaration.local_name)
}
