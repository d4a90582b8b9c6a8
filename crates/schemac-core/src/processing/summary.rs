//! Summary classes: implicit entries, bolding, and the checks that every
//! entry reads something real and consistent.

use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{all_fields, assign_transform},
    schema::{
        DEFAULT_SUMMARY, DocumentSummary, RANK_FEATURES, SUMMARY_FEATURES, Schema, SummaryField,
        SummaryTransform,
    },
};
use schemac_types::{
    DOCUMENT_ID_FIELD, DataType, position_distance_summary, position_positions_summary,
};

/// Make sure a `default` class exists and holds every field summary
/// declaration destined for it; other declarations go to their named
/// classes. Every class learns `documentid` through the default class.
pub(crate) fn implicit_summaries(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    if !schema.summaries.contains_key(DEFAULT_SUMMARY) {
        let mut default = DocumentSummary::new(DEFAULT_SUMMARY);
        default.from_disk = true;
        schema
            .summaries
            .shift_insert(0, DEFAULT_SUMMARY.to_string(), default);
    }

    let declarations: Vec<SummaryField> = all_fields(schema)
        .into_iter()
        .flat_map(|f| f.summary_fields.values().cloned())
        .collect();
    for declaration in declarations {
        for class in declaration.destination_classes() {
            match schema.summaries.get_mut(class) {
                Some(summary) => summary.add(declaration.clone()),
                None if ctx.validate() => {
                    return Err(CompileError::structural(
                        &schema.name,
                        format!(
                            "summary field '{}' is declared for summary class '{class}', which does not exist",
                            declaration.name
                        ),
                    )
                    .with_field(&declaration.name));
                }
                None => {}
            }
        }
    }

    for summary in schema.summaries.values_mut() {
        summary.purge_implicits();
    }
    if let Some(default) = schema.summaries.get_mut(DEFAULT_SUMMARY) {
        default.add(SummaryField::implicit(DOCUMENT_ID_FIELD, DataType::String));
    }

    Ok(())
}

pub(crate) fn implicit_summary_fields(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    if !ctx.flags.implicit_feature_summary_fields {
        return Ok(());
    }

    for summary in schema.summaries.values_mut() {
        if summary.omit_summary_features {
            continue;
        }
        for (name, transform) in [
            (RANK_FEATURES, SummaryTransform::RankFeatures),
            (SUMMARY_FEATURES, SummaryTransform::SummaryFeatures),
        ] {
            summary.add(SummaryField::implicit(name, DataType::String).with_transform(transform));
        }
    }

    Ok(())
}

/// Anything a named class returns, the default class returns too.
pub(crate) fn make_default_summary_the_superset(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let missing: Vec<SummaryField> = {
        let Some(default) = schema.summaries.get(DEFAULT_SUMMARY) else {
            return Ok(());
        };
        let mut missing: Vec<SummaryField> = Vec::new();
        for entry in schema
            .summaries
            .values()
            .filter(|s| s.name != DEFAULT_SUMMARY)
            .flat_map(|s| s.fields.values())
        {
            let feature = matches!(entry.name.as_str(), RANK_FEATURES | SUMMARY_FEATURES);
            if feature
                || default.get(&entry.name).is_some()
                || missing.iter().any(|m| m.name == entry.name)
            {
                continue;
            }
            missing.push(SummaryField {
                transform: SummaryTransform::None,
                destinations: Vec::new(),
                implicit: true,
                ..entry.clone()
            });
        }
        missing
    };

    if let Some(default) = schema.summaries.get_mut(DEFAULT_SUMMARY) {
        for entry in missing {
            default.add(entry);
        }
    }

    Ok(())
}

/// `bolding: on` highlights matched terms in every summary of the field.
pub(crate) fn bolding(schema: &mut Schema, ctx: &PassContext<'_>) -> Result<(), CompileError> {
    let bolded: Vec<(String, bool)> = all_fields(schema)
        .into_iter()
        .filter(|f| f.bolding)
        .map(|f| (f.name.clone(), f.data_type.is_string()))
        .collect();

    for (field, is_string) in bolded {
        if !is_string {
            if ctx.validate() {
                return Err(CompileError::shape_validity(
                    &schema.name,
                    "'bolding: on' is only supported for string fields",
                )
                .with_field(&field));
            }
            continue;
        }

        for name in summaries_reading(schema, &field) {
            let schema_name = schema.name.clone();
            let mut result = Ok(());
            schema.update_summary_fields(&name, |summary| {
                if result.is_err() || summary.single_source() != Some(field.as_str()) {
                    return;
                }
                if summary.transform.is_dynamic() {
                    return;
                }
                result = assign_transform(&schema_name, summary, SummaryTransform::Bolded);
            });
            result?;
        }
    }

    Ok(())
}

// Names of class entries and field declarations reading exactly `field`.
fn summaries_reading(schema: &Schema, field: &str) -> Vec<String> {
    let declared = all_fields(schema)
        .into_iter()
        .flat_map(|f| f.summary_fields.values());
    let entries = schema.summaries.values().flat_map(|s| s.fields.values());
    let mut names: Vec<String> = Vec::new();
    for summary in entries.chain(declared) {
        if summary.single_source() == Some(field) && !names.contains(&summary.name) {
            names.push(summary.name.clone());
        }
    }

    names
}

/// Dynamic summaries need plain text; complex sources fall back to the
/// stored value.
pub(crate) fn summary_dynamic_structs_arrays(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut names: Vec<String> = Vec::new();
    for summary in schema.summaries.values().flat_map(|s| s.fields.values()) {
        let complex = summary
            .single_source()
            .and_then(|source| schema.get_field(source))
            .is_some_and(|f| f.data_type.is_complex() || f.data_type.is_struct());
        if complex && summary.transform.is_dynamic() && !names.contains(&summary.name) {
            names.push(summary.name.clone());
        }
    }

    for name in names {
        ctx.warn(
            &schema.name,
            Some(&name),
            format!("dynamic summary is not supported for complex field '{name}', using the stored value"),
        );
        schema.update_summary_fields(&name, |summary| {
            if summary.transform.is_dynamic() {
                summary.transform = SummaryTransform::None;
            }
        });
    }

    Ok(())
}

/// One summary name reads the same sources in every class, and explicit
/// entries may not take a derived geo-position summary name.
pub(crate) fn summary_names_field_collisions(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut seen: Vec<(&str, &str, Vec<&str>)> = Vec::new();

    for summary in schema.summaries.values() {
        for entry in summary.fields.values() {
            let sources = entry.source_names();
            match seen.iter().find(|(name, _, _)| *name == entry.name) {
                Some((_, class, first)) if *first != sources => {
                    return Err(CompileError::structural(
                        &schema.name,
                        format!(
                            "summary field '{}' reads [{}] in summary class '{class}' but [{}] in summary class '{}'",
                            entry.name,
                            first.join(", "),
                            sources.join(", "),
                            summary.name
                        ),
                    )
                    .with_field(&entry.name));
                }
                Some(_) => {}
                None => seen.push((entry.name.as_str(), summary.name.as_str(), sources)),
            }

            if !entry.implicit
                && !ctx.flags.use_v8_geo_positions
                && let Some(position) = derived_position_owner(schema, &entry.name)
            {
                return Err(CompileError::structural(
                    &schema.name,
                    format!(
                        "summary field '{}' in summary class '{}' collides with a summary field derived from position field '{position}'",
                        entry.name, summary.name
                    ),
                )
                .with_field(&entry.name));
            }
        }
    }

    Ok(())
}

fn derived_position_owner<'a>(schema: &Schema, name: &'a str) -> Option<&'a str> {
    let (owner, _) = name.rsplit_once('.')?;
    let is_derived = name == position_distance_summary(owner)
        || name == position_positions_summary(owner);

    (is_derived
        && schema
            .get_concrete_field(owner)
            .is_some_and(|f| f.data_type.is_position()))
    .then_some(owner)
}

/// Every source must be a field, an attribute or an imported field.
pub(crate) fn summary_fields_must_have_valid_source(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for summary in schema.summaries.values() {
        for entry in summary.fields.values() {
            if entry.name == DOCUMENT_ID_FIELD
                || matches!(
                    entry.transform,
                    SummaryTransform::RankFeatures
                        | SummaryTransform::SummaryFeatures
                        | SummaryTransform::DocumentId
                )
            {
                continue;
            }
            for source in entry.source_names() {
                let known = schema.get_field(source).is_some()
                    || schema.get_attribute(source).is_some()
                    || schema.imported_fields.get(source).is_some();
                if !known {
                    return Err(CompileError::source_validity(
                        &schema.name,
                        format!(
                            "summary field '{}' in summary class '{}' has source '{source}', which is not an existing field",
                            entry.name, summary.name
                        ),
                    )
                    .with_field(&entry.name));
                }
            }
        }
    }

    Ok(())
}

/// Classes served from memory should not need the document store.
pub(crate) fn summary_disk_access_validator(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    for summary in schema.summaries.values().filter(|s| !s.from_disk) {
        let on_disk: Vec<&str> = summary
            .fields
            .values()
            .filter(|f| !f.transform.is_in_memory())
            .map(|f| f.name.as_str())
            .collect();
        if on_disk.is_empty() {
            continue;
        }
        ctx.warn(
            &schema.name,
            None,
            format!(
                "summary class '{}' reads [{}] from disk; mark it 'from-disk' if this is intended",
                summary.name,
                on_disk.join(", ")
            ),
        );
    }

    Ok(())
}
