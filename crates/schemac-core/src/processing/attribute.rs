use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{all_fields, try_visit_fields_mut},
    schema::{Attribute, Field, Schema},
};
use schemac_types::DataType;

/// Dictionary settings need a fast-search attribute of a searchable type,
/// and end up on that attribute.
pub(crate) fn dictionary_processor(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();

    try_visit_fields_mut(schema, |field| {
        let Some(dictionary) = field.dictionary else {
            return Ok(());
        };
        if let Err(reason) = check_dictionary(field, dictionary.kind.has_hash(), dictionary.cased)
        {
            if ctx.validate() {
                return Err(CompileError::shape_validity(&schema_name, reason).with_field(&field.name));
            }
            return Ok(());
        }
        if let Some(attribute) = field.attributes.get_mut(&field.name) {
            attribute.dictionary = Some(dictionary);
        }

        Ok(())
    })
}

fn check_dictionary(field: &Field, hash: bool, cased: bool) -> Result<(), String> {
    if !field.attribute().is_some_and(|a| a.fast_search) {
        return Err("you must specify 'attribute: fast-search' to allow dictionary control".into());
    }
    let basic = field.data_type.primitive_type();
    if !basic.is_numeric() && !basic.is_string() {
        return Err(format!(
            "dictionary control is only supported for numeric and string fields, not {}",
            field.data_type
        ));
    }
    if basic.is_string() && hash && !(cased && field.matching.cased) {
        return Err("a hash dictionary on a string field requires 'match: cased' and a cased dictionary".into());
    }

    Ok(())
}

pub(crate) fn fast_access_validator(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    check_attributes(schema, |attribute| {
        (attribute.fast_access && matches!(attribute.data_type, DataType::Predicate)).then(|| {
            format!(
                "attribute '{}' of type {} does not support 'fast-access'",
                attribute.name, attribute.data_type
            )
        })
    })
}

pub(crate) fn bool_attribute_validator(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    if ctx.flags.allow_array_of_bool_attributes {
        return Ok(());
    }

    check_attributes(schema, |attribute| {
        (!attribute.is_single_value() && matches!(attribute.basic_type(), DataType::Bool)).then(
            || {
                format!(
                    "attribute '{}' has type {}; only single-value bool attributes are supported",
                    attribute.name, attribute.data_type
                )
            },
        )
    })
}

pub(crate) fn paged_attribute_validator(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    check_attributes(schema, |attribute| {
        let supported = match &attribute.data_type {
            DataType::Tensor(tensor) => tensor.is_dense(),
            DataType::Predicate | DataType::Reference(_) => false,
            _ => true,
        };

        (attribute.paged && !supported).then(|| {
            format!(
                "the 'paged' attribute setting is not supported for attribute '{}' of type {}",
                attribute.name, attribute.data_type
            )
        })
    })
}

fn check_attributes(
    schema: &Schema,
    reject: impl Fn(&Attribute) -> Option<String>,
) -> Result<(), CompileError> {
    for field in all_fields(schema) {
        for attribute in field.attributes.values() {
            if let Some(reason) = reject(attribute) {
                return Err(
                    CompileError::shape_validity(&schema.name, reason).with_field(&field.name)
                );
            }
        }
    }

    Ok(())
}
