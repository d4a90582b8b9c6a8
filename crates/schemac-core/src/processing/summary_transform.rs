//! Summary transform resolution.
//!
//! Runs in three steps over every summary name: classes first agree on an
//! already chosen transform, then unresolved names derive one from the
//! shape of their source, and finally every entry gets a type. A name never
//! ends up with two different transforms: either the classes agree or
//! resolution fails.

use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{all_fields, assign_transform, assign_transform_everywhere},
    schema::{DEFAULT_SUMMARY, ElementsSelector, ImportedField, Schema, SummaryField, SummaryTransform},
};
use schemac_types::{DOCUMENT_ID_FIELD, DataType};

///
/// SourceShape
///
/// What a summary source looks like in storage.
///

struct SourceShape {
    data_type: DataType,
    attribute: bool,
    complex: bool,
    attribute_leaves: bool,
    indexed: bool,
}

impl SourceShape {
    fn of(schema: &Schema, name: &str) -> Option<Self> {
        if let Some(field) = schema.get_field(name) {
            return Some(Self {
                data_type: field.data_type.clone(),
                attribute: schema.get_attribute(name).is_some(),
                complex: field.data_type.is_complex() || field.data_type.is_struct(),
                attribute_leaves: field.has_only_attribute_leaves(),
                indexed: field.does_indexing(),
            });
        }
        if let Some(imported) = schema.imported_fields.get(name) {
            let complex = matches!(imported, ImportedField::Complex(_));
            return Some(Self {
                data_type: imported.target_field().data_type.clone(),
                attribute: !complex,
                complex,
                attribute_leaves: complex,
                indexed: false,
            });
        }

        schema.get_attribute(name).map(|attribute| Self {
            data_type: attribute.data_type.clone(),
            attribute: true,
            complex: false,
            attribute_leaves: false,
            indexed: false,
        })
    }
}

/// Element selection keeps matched elements only; attribute-backed sources
/// are filtered in memory.
pub(crate) fn matched_elements_only_resolver(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut selected: Vec<(String, String)> = Vec::new();
    {
        let declared = all_fields(schema)
            .into_iter()
            .flat_map(|f| f.summary_fields.values());
        let entries = schema.summaries.values().flat_map(|s| s.fields.values());
        for summary in entries.chain(declared) {
            if summary.elements == ElementsSelector::All
                || selected.iter().any(|(name, _)| *name == summary.name)
            {
                continue;
            }
            if let Some(source) = summary.single_source() {
                selected.push((summary.name.clone(), source.to_string()));
            }
        }
    }

    let schema_name = schema.name.clone();
    for (name, source) in selected {
        let transform = match matched_elements_transform(schema, &name, &source) {
            Ok(transform) => transform,
            Err(err) if ctx.validate() => return Err(err),
            Err(_) => continue,
        };

        let mut result = Ok(());
        schema.update_summary_fields(&name, |summary| {
            if result.is_err() || summary.elements == ElementsSelector::All {
                return;
            }
            if summary.transform == SummaryTransform::MatchedElementsFilter
                && transform == SummaryTransform::MatchedAttributeElementsFilter
            {
                summary.transform = transform;
                return;
            }
            result = assign_transform(&schema_name, summary, transform);
        });
        result?;
    }

    Ok(())
}

fn matched_elements_transform(
    schema: &Schema,
    name: &str,
    source: &str,
) -> Result<SummaryTransform, CompileError> {
    let Some(shape) = SourceShape::of(schema, source) else {
        return Err(CompileError::source_validity(
            &schema.name,
            format!("summary field '{name}' selects elements of '{source}', which is not an existing field"),
        )
        .with_field(name));
    };
    let supported = match &shape.data_type {
        DataType::Array(element) => element.is_primitive() || matches!(**element, DataType::Struct(_)),
        DataType::WeightedSet(wset) => wset.element.is_primitive(),
        DataType::Map { .. } => true,
        _ => false,
    };
    if !supported {
        return Err(CompileError::shape_validity(
            &schema.name,
            format!(
                "'matched-elements-only' is not supported for summary field '{name}' of type {}; supported types are array or weighted set of a primitive, map, and array of struct",
                shape.data_type
            ),
        )
        .with_field(name));
    }

    Ok(if shape.attribute || shape.attribute_leaves {
        SummaryTransform::MatchedAttributeElementsFilter
    } else {
        SummaryTransform::MatchedElementsFilter
    })
}

pub(crate) fn summary_consistency(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let names = schema.summary_field_names();

    for name in &names {
        check_agreement(schema, name)?;
        let winner = authoritative(&labelled(schema, name)).map(|c| c.transform);
        if let Some(transform) = winner {
            schema.update_summary_fields(name, |summary| {
                if summary.transform.is_none() {
                    summary.transform = transform;
                }
            });
        }
    }
    for name in &names {
        resolve_transform(schema, ctx, name)?;
    }
    for name in &names {
        resolve_type(schema, name)?;
    }
    for name in &names {
        check_agreement(schema, name)?;
    }

    Ok(())
}

///
/// Claim
///
/// One declaration of a summary name and where it was made.
///

struct Claim<'a> {
    label: String,
    in_default: bool,
    transform: SummaryTransform,
    field: &'a SummaryField,
}

fn labelled<'a>(schema: &'a Schema, name: &str) -> Vec<Claim<'a>> {
    let mut out: Vec<Claim<'a>> = schema
        .summary_entries(name)
        .into_iter()
        .map(|(class, field)| Claim {
            label: format!("summary class '{class}'"),
            in_default: class == DEFAULT_SUMMARY,
            transform: field.transform,
            field,
        })
        .collect();
    for owner in all_fields(schema) {
        if let Some(field) = owner.summary_fields.get(name) {
            out.push(Claim {
                label: format!("the summary declaration of field '{}'", owner.name),
                in_default: false,
                transform: field.transform,
                field,
            });
        }
    }

    out
}

// The default class decides; without a transform there, the first explicit
// declaration does, then any declaration.
fn authoritative<'c, 'a>(claims: &'c [Claim<'a>]) -> Option<&'c Claim<'a>> {
    let set = |c: &&Claim<'_>| !c.transform.is_none();

    claims
        .iter()
        .filter(set)
        .find(|c| c.in_default)
        .or_else(|| claims.iter().filter(set).find(|c| !c.field.implicit))
        .or_else(|| claims.iter().find(set))
}

fn check_agreement(schema: &Schema, name: &str) -> Result<(), CompileError> {
    let claims = labelled(schema, name);
    let Some(winner) = authoritative(&claims) else {
        return Ok(());
    };

    match claims
        .iter()
        .find(|c| !c.transform.is_none() && c.transform != winner.transform)
    {
        Some(conflict) => Err(CompileError::transform_consistency(
            &schema.name,
            format!(
                "summary field '{name}' has transform '{}' in {} but '{}' in {}",
                winner.transform, winner.label, conflict.transform, conflict.label
            ),
        )
        .with_field(name)),
        None => Ok(()),
    }
}

fn resolve_transform(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
    name: &str,
) -> Result<(), CompileError> {
    let (current, derived) = {
        let Some(entry) = schema.summary_field(name) else {
            return Ok(());
        };
        let derived = match entry.transform {
            SummaryTransform::None => derived_transform(schema, entry),
            SummaryTransform::Tokens => match tokens_transform(schema, entry) {
                Ok(transform) => transform,
                Err(err) if ctx.validate() => return Err(err),
                Err(_) => None,
            },
            _ => None,
        };
        (entry.transform, derived)
    };
    let Some(transform) = derived else {
        return Ok(());
    };

    if current == SummaryTransform::Tokens {
        schema.update_summary_fields(name, |summary| {
            if summary.transform == SummaryTransform::Tokens {
                summary.transform = transform;
            }
        });
        return Ok(());
    }

    assign_transform_everywhere(schema, name, transform)
}

fn derived_transform(schema: &Schema, entry: &SummaryField) -> Option<SummaryTransform> {
    if entry.name == DOCUMENT_ID_FIELD {
        return Some(SummaryTransform::DocumentId);
    }
    let shape = SourceShape::of(schema, entry.single_source()?)?;

    if shape.attribute && !shape.complex {
        Some(SummaryTransform::Attribute)
    } else if shape.complex && shape.attribute_leaves {
        Some(SummaryTransform::AttributeCombiner)
    } else if shape.complex && entry.has_renamed_source() {
        Some(SummaryTransform::Copy)
    } else {
        None
    }
}

// Tokens are served from the index when there is one, from the attribute
// otherwise.
fn tokens_transform(
    schema: &Schema,
    entry: &SummaryField,
) -> Result<Option<SummaryTransform>, CompileError> {
    let Some(source) = entry.single_source() else {
        return Ok(None);
    };
    let Some(shape) = SourceShape::of(schema, source) else {
        return Ok(None);
    };

    match (shape.indexed, shape.attribute) {
        (true, _) => Ok(None),
        (false, true) => Ok(Some(SummaryTransform::AttributeTokens)),
        (false, false) => Err(CompileError::shape_validity(
            &schema.name,
            format!(
                "summary field '{}' uses 'tokens' but its source '{source}' has neither index nor attribute",
                entry.name
            ),
        )
        .with_field(&entry.name)),
    }
}

fn resolve_type(schema: &mut Schema, name: &str) -> Result<(), CompileError> {
    let fallback = schema.summary_field(name).and_then(|entry| {
        if entry.transform == SummaryTransform::DocumentId {
            return Some(DataType::String);
        }
        let source = entry.source_names().into_iter().next()?;
        SourceShape::of(schema, source).map(|shape| shape.data_type)
    });
    if let Some(data_type) = fallback {
        schema.update_summary_fields(name, |summary| {
            if summary.data_type.is_none() {
                summary.data_type = Some(data_type.clone());
            }
        });
    }

    let claims = labelled(schema, name);
    let mut typed = claims
        .iter()
        .filter_map(|c| c.field.data_type.as_ref().map(|t| (c, t)));
    let Some((first, expected)) = typed.next() else {
        return Ok(());
    };
    if let Some((other, found)) = typed.find(|(_, t)| !t.matches_ignoring_tag(expected)) {
        return Err(CompileError::type_consistency(
            &schema.name,
            format!(
                "summary field '{name}' has type {expected} in {} but {found} in {}",
                first.label, other.label
            ),
        )
        .with_field(name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        pipeline::PassId,
        schema::{DocumentSummary, Field},
        test_support::{Run, attribute_field, field, index_field, person_type, schema_with},
    };
    use schemac_expr::OutputKind;

    const RESOLVE: [PassId; 2] = [PassId::ImplicitSummaries, PassId::SummaryConsistency];

    fn transform(schema: &Schema, class: &str, name: &str) -> SummaryTransform {
        schema.summary_field_in(class, name).unwrap().transform
    }

    #[test]
    fn struct_of_attributes_is_combined() {
        let mut person = field("person", person_type(), &[OutputKind::Summary]);
        for leaf in ["person.name", "person.age"] {
            person.sub_field_mut(leaf).unwrap().enable_attribute();
        }
        let mut schema = schema_with("people", [person]);
        Run::only(&RESOLVE).process(&mut schema).unwrap();

        assert_eq!(
            transform(&schema, DEFAULT_SUMMARY, "person"),
            SummaryTransform::AttributeCombiner
        );
    }

    #[test]
    fn attributes_and_document_id_resolve() {
        let mut schema = schema_with(
            "music",
            [
                field("year", DataType::Int, &[OutputKind::Attribute, OutputKind::Summary]),
                field("title", DataType::String, &[OutputKind::Index, OutputKind::Summary]),
            ],
        );
        Run::only(&RESOLVE).process(&mut schema).unwrap();

        assert_eq!(transform(&schema, DEFAULT_SUMMARY, "year"), SummaryTransform::Attribute);
        assert_eq!(transform(&schema, DEFAULT_SUMMARY, "title"), SummaryTransform::None);
        assert_eq!(
            transform(&schema, DEFAULT_SUMMARY, DOCUMENT_ID_FIELD),
            SummaryTransform::DocumentId
        );
        assert_eq!(
            schema.get_concrete_field("year").unwrap().summary_fields["year"].transform,
            SummaryTransform::Attribute
        );
    }

    #[test]
    fn implicit_only_field_never_conflicts() {
        let mut schema = schema_with(
            "music",
            [field("year", DataType::Int, &[OutputKind::Attribute, OutputKind::Summary])],
        );
        schema.add_summary(DocumentSummary::new("short")).unwrap();
        schema
            .get_concrete_field_mut("year")
            .unwrap()
            .summary_fields
            .get_mut("year")
            .unwrap()
            .destinations = vec![DEFAULT_SUMMARY.into(), "short".into()];

        Run::only(&RESOLVE).process(&mut schema).unwrap();
        assert_eq!(transform(&schema, "short", "year"), SummaryTransform::Attribute);
    }

    #[test]
    fn explicit_class_transform_is_adopted() {
        let mut schema = schema_with("music", [index_field("title", DataType::String)]);
        schema
            .add_summary(
                DocumentSummary::new("default").with_field(SummaryField::new("title", None)),
            )
            .unwrap();
        schema
            .add_summary(DocumentSummary::new("short").with_field(
                SummaryField::new("title", None).with_transform(SummaryTransform::DynamicTeaser),
            ))
            .unwrap();
        Run::only(&RESOLVE).process(&mut schema).unwrap();

        assert_eq!(
            transform(&schema, DEFAULT_SUMMARY, "title"),
            SummaryTransform::DynamicTeaser
        );
        assert_eq!(
            schema.summary_field_in(DEFAULT_SUMMARY, "title").unwrap().data_type,
            Some(DataType::String)
        );
    }

    #[test]
    fn conflicting_transforms_name_both_classes() {
        let mut schema = schema_with("music", [index_field("title", DataType::String)]);
        schema
            .add_summary(DocumentSummary::new("default").with_field(
                SummaryField::new("title", None).with_transform(SummaryTransform::Bolded),
            ))
            .unwrap();
        schema
            .add_summary(DocumentSummary::new("short").with_field(
                SummaryField::new("title", None).with_transform(SummaryTransform::DynamicTeaser),
            ))
            .unwrap();

        let err = Run::only(&RESOLVE).process(&mut schema).unwrap_err();
        assert_eq!(err.class, ErrorClass::TransformConsistency);
        assert_eq!(
            err.message,
            "summary field 'title' has transform 'bolded' in summary class 'default' but 'dynamicteaser' in summary class 'short'"
        );
    }

    #[test]
    fn tokens_follow_storage() {
        let tokens = |source: Field| {
            let mut schema = schema_with("music", [source]);
            schema
                .add_summary(DocumentSummary::new("short").with_field(
                    SummaryField::new("words", None)
                        .with_source("title")
                        .with_transform(SummaryTransform::Tokens),
                ))
                .unwrap();
            schema
        };

        let mut schema = tokens(attribute_field("title", DataType::String));
        Run::only(&RESOLVE).process(&mut schema).unwrap();
        assert_eq!(transform(&schema, "short", "words"), SummaryTransform::AttributeTokens);

        let mut schema = tokens(index_field("title", DataType::String));
        Run::only(&RESOLVE).process(&mut schema).unwrap();
        assert_eq!(transform(&schema, "short", "words"), SummaryTransform::Tokens);

        let mut schema = tokens(field("title", DataType::String, &[OutputKind::Summary]));
        let err = Run::only(&RESOLVE).process(&mut schema).unwrap_err();
        assert!(err.message.contains("neither index nor attribute"));
    }

    #[test]
    fn renamed_complex_source_is_copied() {
        let mut schema = schema_with("people", [field("person", person_type(), &[OutputKind::Summary])]);
        schema
            .add_summary(
                DocumentSummary::new("short")
                    .with_field(SummaryField::new("who", None).with_source("person")),
            )
            .unwrap();
        Run::only(&RESOLVE).process(&mut schema).unwrap();

        assert_eq!(transform(&schema, "short", "who"), SummaryTransform::Copy);
        assert_eq!(
            schema.summary_field_in("short", "who").unwrap().data_type,
            Some(person_type())
        );
    }

    #[test]
    fn one_name_has_one_type() {
        let mut schema = schema_with(
            "music",
            [field("year", DataType::Int, &[OutputKind::Attribute, OutputKind::Summary])],
        );
        schema
            .add_summary(
                DocumentSummary::new("short")
                    .with_field(SummaryField::new("year", Some(DataType::String))),
            )
            .unwrap();

        let err = Run::only(&RESOLVE).process(&mut schema).unwrap_err();
        assert_eq!(err.class, ErrorClass::TypeConsistency);
        assert!(err.message.contains("but string in summary class 'short'"));
    }

    #[test]
    fn matched_elements_prefer_attributes() {
        let selected = |source: Field| {
            let mut schema = schema_with("music", [source]);
            let mut entry = SummaryField::new("tags", None);
            entry.elements = ElementsSelector::MatchedElements;
            schema
                .add_summary(DocumentSummary::new("short").with_field(entry))
                .unwrap();
            schema
        };
        let run = Run::only(&[PassId::MatchedElementsOnlyResolver]);

        let mut schema = selected(attribute_field("tags", DataType::array(DataType::String)));
        run.process(&mut schema).unwrap();
        assert_eq!(
            transform(&schema, "short", "tags"),
            SummaryTransform::MatchedAttributeElementsFilter
        );

        let mut schema = selected(index_field("tags", DataType::array(DataType::String)));
        run.process(&mut schema).unwrap();
        assert_eq!(
            transform(&schema, "short", "tags"),
            SummaryTransform::MatchedElementsFilter
        );

        let err = run
            .process(&mut selected(index_field("tags", DataType::String)))
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::ShapeValidity);
    }

    #[test]
    fn matched_elements_filter_upgrades_for_attribute_leaves() {
        let mut people = Field::new("people", DataType::array(person_type()));
        for leaf in ["people.name", "people.age"] {
            people.sub_field_mut(leaf).unwrap().enable_attribute();
        }
        let mut schema = schema_with("people", [people]);
        let mut entry = SummaryField::new("people", None)
            .with_transform(SummaryTransform::MatchedElementsFilter);
        entry.elements = ElementsSelector::MatchedElements;
        schema
            .add_summary(DocumentSummary::new("short").with_field(entry))
            .unwrap();
        Run::only(&[PassId::MatchedElementsOnlyResolver])
            .process(&mut schema)
            .unwrap();

        assert_eq!(
            transform(&schema, "short", "people"),
            SummaryTransform::MatchedAttributeElementsFilter
        );
    }
}
