use crate::{
    error::CompileError,
    pipeline::PassContext,
    schema::{DOCUMENT_FIELD_SET, FieldSet, Schema},
};

/// Longest legal field name.
pub(crate) const MAX_FIELD_NAME_LENGTH: usize = 64;

/// Names the backend claims for itself.
pub(crate) const RESERVED_FIELD_NAMES: &[&str] = &[
    "documentid",
    "matchfeatures",
    "rankfeatures",
    "relevancy",
    "sddocname",
    "summaryfeatures",
];

pub(crate) const RESERVED_DOCUMENT_NAMES: &[&str] = &[
    "annotation",
    "document",
    "field",
    "position",
    "reference",
    "struct",
    "tensor",
];

pub(crate) fn schema_must_have_document(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    if schema.document.is_none() {
        return Err(CompileError::structural(
            &schema.name,
            "a schema must contain a document definition",
        ));
    }

    Ok(())
}

pub(crate) fn field_name_legality(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for field in schema.concrete_fields() {
        let name = field.name.as_str();

        if !is_identifier(name) {
            return Err(CompileError::structural(
                &schema.name,
                format!("'{name}' is not a legal field name"),
            )
            .with_field(name));
        }
        if name.len() > MAX_FIELD_NAME_LENGTH {
            return Err(CompileError::structural(
                &schema.name,
                format!("field name is longer than {MAX_FIELD_NAME_LENGTH} characters"),
            )
            .with_field(name));
        }
        if RESERVED_FIELD_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
            return Err(CompileError::structural(
                &schema.name,
                format!("'{name}' is a reserved field name"),
            )
            .with_field(name));
        }
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn reserved_document_names(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let Some(document) = &schema.document else {
        return Ok(());
    };
    if RESERVED_DOCUMENT_NAMES.contains(&document.name.to_ascii_lowercase().as_str()) {
        return Err(CompileError::structural(
            &schema.name,
            format!("'{}' is a reserved document type name", document.name),
        ));
    }

    Ok(())
}

pub(crate) fn url_field_validator(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for field in schema.concrete_fields() {
        if field.data_type.is_uri() && field.does_attributing() {
            return Err(CompileError::shape_validity(
                &schema.name,
                "uri type fields cannot be attributes",
            )
            .with_field(&field.name));
        }
    }

    Ok(())
}

/// Register `[document]` with every document field.
pub(crate) fn built_in_field_sets(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let names: Vec<String> = schema.document_fields().map(|f| f.name.clone()).collect();
    schema.field_sets.insert(
        DOCUMENT_FIELD_SET.to_string(),
        FieldSet::new(DOCUMENT_FIELD_SET, names),
    );

    Ok(())
}

/// Make extra fields, and summary values that no document field backs,
/// part of the stored document.
pub(crate) fn add_extra_fields_to_document(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    if schema.document.is_none() {
        return Ok(());
    }

    let mut stored = Vec::new();
    for field in schema.extra_fields.values() {
        if !field.is_imported_field {
            stored.push((field.name.clone(), field.data_type.clone()));
        }
    }
    for summary in schema.summaries.values() {
        for entry in summary.fields.values() {
            if entry.transform.is_in_memory() || entry.transform.is_dynamic() {
                continue;
            }
            let Some(data_type) = &entry.data_type else {
                continue;
            };
            let backed = entry
                .source_names()
                .iter()
                .any(|source| schema.get_field(source).is_some());
            if !backed && schema.imported_fields.get(&entry.name).is_none() {
                stored.push((entry.name.clone(), data_type.clone()));
            }
        }
    }

    if let Some(document) = schema.document.as_mut() {
        for (name, data_type) in stored {
            if !document.fields.contains_key(&name) {
                document.extra_stored.entry(name).or_insert(data_type);
            }
        }
    }

    Ok(())
}
