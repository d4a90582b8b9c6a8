//! Geo-position expansion.
//!
//! A position field is stored as a z-curve encoded long in a derived
//! `<name>_zcurve` attribute. Summaries of the field are served from that
//! attribute, either as the raw position or, in the older representation,
//! through derived `.distance` and `.position` summary fields.

use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{all_fields, convert_field_script},
    schema::{Attribute, Field, Schema, SummaryField, SummaryTransform},
};
use schemac_expr::{Converter, Expression, ExpressionError, OutputKind};
use schemac_types::{
    DataType, position_distance_summary, position_positions_summary, zcurve_field_name,
};

pub(crate) fn create_position_zcurve(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let positions: Vec<String> = schema
        .concrete_fields()
        .filter(|f| f.data_type.is_position() && !f.is_imported_field)
        .map(|f| f.name.clone())
        .collect();

    for name in positions {
        let Some(field) = schema.get_concrete_field(&name) else {
            continue;
        };
        if field.does_indexing() {
            if ctx.validate() {
                return Err(CompileError::shape_validity(
                    &schema.name,
                    "indexing of geo-position fields is not supported, use 'attribute' instead",
                )
                .with_field(&name));
            }
            continue;
        }
        if !field.does_attributing() {
            continue;
        }

        expand(schema, ctx, &name)?;
    }

    Ok(())
}

fn expand(schema: &mut Schema, ctx: &PassContext<'_>, name: &str) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();
    let zcurve = zcurve_field_name(name);
    let Some(field) = schema.get_concrete_field(name) else {
        return Ok(());
    };
    let multi_value = field.data_type.is_multi_value();
    let zcurve_type = if multi_value {
        DataType::array(DataType::Long)
    } else {
        DataType::Long
    };
    let summarying = field.does_summarying();
    let original = field.attribute().cloned();
    let destinations = summary_destinations(schema, field);

    ensure_zcurve_field(schema, name, &zcurve, zcurve_type, original.as_ref())?;

    let Some(field) = schema.get_concrete_field_mut(name) else {
        return Ok(());
    };
    field.attributes.shift_remove(name);
    convert_field_script(
        &schema_name,
        field,
        &mut ZCurveConverter {
            field: name.to_string(),
            zcurve: zcurve.clone(),
            multi_value,
        },
    )?;

    if summarying && !ctx.flags.use_v8_geo_positions {
        let derived = [
            (
                position_distance_summary(name),
                DataType::Int,
                SummaryTransform::Distance,
            ),
            (
                position_positions_summary(name),
                DataType::array(DataType::String),
                SummaryTransform::Positions,
            ),
        ];
        for (summary, data_type, transform) in derived {
            let mut expected = SummaryField::implicit(&summary, data_type)
                .with_transform(transform)
                .with_source(&zcurve);
            expected.destinations.clone_from(&destinations);
            ensure_derived_summary(&schema_name, field, expected)?;
        }
    }

    tracing::debug!(schema = %schema_name, field = name, %zcurve, "expanded geo-position field");

    Ok(())
}

fn ensure_zcurve_field(
    schema: &mut Schema,
    name: &str,
    zcurve: &str,
    zcurve_type: DataType,
    original: Option<&Attribute>,
) -> Result<(), CompileError> {
    if let Some(existing) = schema.get_concrete_field(zcurve) {
        let matches = existing.data_type == zcurve_type
            && existing
                .attributes
                .get(zcurve)
                .is_some_and(|a| a.data_type == zcurve_type && a.is_position);
        if matches {
            return Ok(());
        }

        return Err(CompileError::transform_consistency(
            &schema.name,
            format!(
                "derived field '{zcurve}' already exists and is not the z-curve attribute of '{name}'"
            ),
        )
        .with_field(name));
    }

    let mut attribute = Attribute::new(zcurve, zcurve_type.clone());
    attribute.is_position = true;
    attribute.fast_search = true;
    if let Some(original) = original {
        attribute.fast_access = original.fast_access;
        attribute.paged = original.paged;
    }
    let mut field = Field::new(zcurve, zcurve_type);
    field.attributes.insert(zcurve.to_string(), attribute);

    schema.add_extra_field(field)
}

// Classes already receiving the field, then the field's own declaration.
fn summary_destinations(schema: &Schema, field: &Field) -> Vec<String> {
    let mut out: Vec<String> = schema
        .summaries
        .values()
        .filter(|s| s.get(&field.name).is_some())
        .map(|s| s.name.clone())
        .collect();
    if let Some(declared) = field.summary_fields.get(&field.name) {
        for class in declared.destination_classes() {
            if !out.iter().any(|c| c == class) {
                out.push(class.to_string());
            }
        }
    }

    out
}

fn ensure_derived_summary(
    schema: &str,
    field: &mut Field,
    expected: SummaryField,
) -> Result<(), CompileError> {
    match field.summary_fields.get_mut(&expected.name) {
        Some(existing) => {
            if existing.data_type != expected.data_type
                || existing.transform != expected.transform
                || existing.sources != expected.sources
            {
                return Err(CompileError::transform_consistency(
                    schema,
                    format!(
                        "derived summary field '{}' already exists with a different definition",
                        expected.name
                    ),
                )
                .with_field(&field.name));
            }
            for class in expected.destinations {
                if !existing.destinations.contains(&class) {
                    existing.destinations.push(class);
                }
            }
        }
        None => {
            field.summary_fields.insert(expected.name.clone(), expected);
        }
    }

    Ok(())
}

///
/// ZCurveConverter
///
/// Routes attribute outputs of a position field through `zcurve` into the
/// derived attribute and drops its summary outputs.
///

struct ZCurveConverter {
    field: String,
    zcurve: String,
    multi_value: bool,
}

impl ZCurveConverter {
    fn targets_field(&self, exp: &Expression, kind: OutputKind) -> bool {
        exp.as_output().is_some_and(|o| {
            o.kind == kind && o.field.as_deref().is_none_or(|target| target == self.field)
        })
    }
}

impl Converter for ZCurveConverter {
    fn should_convert(&self, exp: &Expression) -> bool {
        self.targets_field(exp, OutputKind::Attribute) || self.targets_field(exp, OutputKind::Summary)
    }

    fn do_convert(&mut self, exp: Expression) -> Result<Option<Expression>, ExpressionError> {
        if self.targets_field(&exp, OutputKind::Summary) {
            return Ok(None);
        }
        let encode = if self.multi_value {
            Expression::for_each(Expression::ZCurve)
        } else {
            Expression::ZCurve
        };

        Ok(Some(Expression::Statement(vec![
            encode,
            Expression::attribute(&self.zcurve),
        ])))
    }
}

/// Summaries of a position field are served from its z-curve attribute.
/// Untyped and renamed entries are included, as are imported positions.
pub(crate) fn adjust_position_summary_fields(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut pending: Vec<(String, String, DataType)> = Vec::new();
    {
        let declared = all_fields(schema)
            .into_iter()
            .flat_map(|f| f.summary_fields.values());
        let entries = schema.summaries.values().flat_map(|s| s.fields.values());
        for summary in entries.chain(declared) {
            let Some((source, data_type)) = position_source(schema, summary) else {
                continue;
            };
            if !pending.iter().any(|(name, ..)| *name == summary.name) {
                pending.push((summary.name.clone(), source.to_string(), data_type));
            }
        }
    }

    for (name, source, data_type) in pending {
        let zcurve = zcurve_field_name(&source);
        if schema.get_attribute(&zcurve).is_none() {
            if ctx.validate() {
                return Err(CompileError::source_validity(
                    &schema.name,
                    format!(
                        "summary field '{name}' reads position field '{source}', which has no attribute '{zcurve}'"
                    ),
                )
                .with_field(&name));
            }
            continue;
        }

        schema.update_summary_fields(&name, |summary| {
            if matches!(
                summary.transform,
                SummaryTransform::None | SummaryTransform::GeoPos
            ) {
                summary.transform = SummaryTransform::GeoPos;
                summary.sources = vec![zcurve.clone()];
                if summary.data_type.is_none() {
                    summary.data_type = Some(data_type.clone());
                }
            }
        });
    }

    Ok(())
}

// The position field, local or imported, an unresolved summary reads, and
// the field's type.
fn position_source<'a>(
    schema: &Schema,
    summary: &'a SummaryField,
) -> Option<(&'a str, DataType)> {
    if summary.transform != SummaryTransform::None
        || summary.data_type.as_ref().is_some_and(|t| !t.is_position())
    {
        return None;
    }
    let source = summary.single_source()?;
    let data_type = schema
        .get_field(source)
        .map(|f| f.data_type.clone())
        .or_else(|| {
            schema
                .imported_fields
                .get(source)
                .map(|f| f.target_field().data_type.clone())
        })?;

    data_type.is_position().then_some((source, data_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::FeatureFlags,
        error::ErrorClass,
        pipeline::{Mode, PassId},
        schema::{DocumentSummary, ImportDeclaration, SchemaRegistry},
        test_support::{Run, attribute_field, field, schema_with},
    };

    fn loc(data_type: DataType) -> Field {
        let mut loc = field("loc", data_type, &[OutputKind::Attribute, OutputKind::Summary]);
        loc.enable_attribute().fast_search = true;
        loc.enable_attribute().fast_access = true;
        loc
    }

    fn script(schema: &Schema, name: &str) -> String {
        schema.get_concrete_field(name).unwrap().indexing.as_ref().unwrap().to_string()
    }

    #[test]
    fn position_is_stored_as_zcurve() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        Run::only(&[PassId::CreatePositionZCurve])
            .process(&mut schema)
            .unwrap();

        let zcurve = schema.get_attribute("loc_zcurve").unwrap();
        assert_eq!(zcurve.data_type, DataType::Long);
        assert!(zcurve.is_position && zcurve.fast_search && zcurve.fast_access);
        assert!(schema.extra_fields.contains_key("loc_zcurve"));

        let loc = schema.get_concrete_field("loc").unwrap();
        assert!(loc.attributes.is_empty());
        assert_eq!(script(&schema, "loc"), "{ input loc | zcurve | attribute loc_zcurve; }");

        let distance = &loc.summary_fields["loc.distance"];
        assert_eq!(distance.data_type, Some(DataType::Int));
        assert_eq!(distance.transform, SummaryTransform::Distance);
        assert_eq!(distance.sources, vec!["loc_zcurve".to_string()]);
        assert_eq!(distance.destinations, vec!["default".to_string()]);

        let positions = &loc.summary_fields["loc.position"];
        assert_eq!(positions.data_type, Some(DataType::array(DataType::String)));
        assert_eq!(positions.transform, SummaryTransform::Positions);
    }

    #[test]
    fn arrays_encode_each_element() {
        let mut schema = schema_with("places", [loc(DataType::array(DataType::Position))]);
        Run::only(&[PassId::CreatePositionZCurve])
            .process(&mut schema)
            .unwrap();

        assert_eq!(
            schema.get_attribute("loc_zcurve").unwrap().data_type,
            DataType::array(DataType::Long)
        );
        assert_eq!(
            script(&schema, "loc"),
            "{ input loc | for_each { zcurve } | attribute loc_zcurve; }"
        );
    }

    #[test]
    fn v8_positions_have_no_derived_summaries() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        Run::only(&[PassId::CreatePositionZCurve])
            .flags(FeatureFlags {
                use_v8_geo_positions: true,
                ..FeatureFlags::default()
            })
            .process(&mut schema)
            .unwrap();

        let loc = schema.get_concrete_field("loc").unwrap();
        assert!(!loc.summary_fields.contains_key("loc.distance"));
        assert!(!loc.summary_fields.contains_key("loc.position"));
        assert!(schema.get_attribute("loc_zcurve").is_some());
    }

    #[test]
    fn expansion_is_idempotent() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        let run = Run::only(&[PassId::CreatePositionZCurve]);
        run.process(&mut schema).unwrap();
        let once = schema.clone();
        run.process(&mut schema).unwrap();

        assert_eq!(schema, once);
    }

    #[test]
    fn drifted_zcurve_field_fails() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        schema
            .add_extra_field(attribute_field("loc_zcurve", DataType::Int))
            .unwrap();

        let err = Run::only(&[PassId::CreatePositionZCurve])
            .process(&mut schema)
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::TransformConsistency);
    }

    #[test]
    fn drifted_derived_summary_fails() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        schema
            .get_concrete_field_mut("loc")
            .unwrap()
            .summary_fields
            .insert(
                "loc.distance".into(),
                SummaryField::implicit("loc.distance", DataType::Long),
            );

        let err = Run::only(&[PassId::CreatePositionZCurve])
            .process(&mut schema)
            .unwrap_err();
        assert!(err.message.contains("'loc.distance'"));
    }

    #[test]
    fn indexed_positions_fail_unless_best_effort() {
        let indexed = || field("loc", DataType::Position, &[OutputKind::Index]);
        let mut schema = schema_with("places", [indexed()]);
        let err = Run::only(&[PassId::CreatePositionZCurve])
            .process(&mut schema)
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::ShapeValidity);

        let mut schema = schema_with("places", [indexed()]);
        Run::only(&[PassId::CreatePositionZCurve])
            .mode(Mode::best_effort())
            .process(&mut schema)
            .unwrap();
        assert!(schema.get_attribute("loc_zcurve").is_none());
    }

    #[test]
    fn position_summaries_become_geopos() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        Run::only(&[
            PassId::CreatePositionZCurve,
            PassId::ImplicitSummaries,
            PassId::AdjustPositionSummaryFields,
        ])
        .process(&mut schema)
        .unwrap();

        let summary = schema.summary_field_in("default", "loc").unwrap();
        assert_eq!(summary.transform, SummaryTransform::GeoPos);
        assert_eq!(summary.sources, vec!["loc_zcurve".to_string()]);
        assert_eq!(
            schema.summary_field_in("default", "loc.distance").unwrap().transform,
            SummaryTransform::Distance
        );
    }

    #[test]
    fn position_summary_without_zcurve_fails() {
        let mut schema = schema_with(
            "places",
            [field("loc", DataType::Position, &[OutputKind::Summary])],
        );
        let err = Run::only(&[PassId::ImplicitSummaries, PassId::AdjustPositionSummaryFields])
            .process(&mut schema)
            .unwrap_err();

        assert_eq!(err.class, ErrorClass::SourceValidity);
        assert!(err.message.contains("'loc_zcurve'"));
    }

    fn adjusted(schema: &mut Schema, classes: &[DocumentSummary]) {
        for class in classes {
            schema.add_summary(class.clone()).unwrap();
        }
        Run::only(&[
            PassId::CreatePositionZCurve,
            PassId::ImplicitSummaries,
            PassId::AdjustPositionSummaryFields,
        ])
        .process(schema)
        .unwrap();
    }

    #[test]
    fn untyped_class_entry_becomes_geopos() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        adjusted(
            &mut schema,
            &[DocumentSummary::new("short").with_field(SummaryField::new("loc", None))],
        );

        let summary = schema.summary_field_in("short", "loc").unwrap();
        assert_eq!(summary.transform, SummaryTransform::GeoPos);
        assert_eq!(summary.sources, vec!["loc_zcurve".to_string()]);
        assert_eq!(summary.data_type, Some(DataType::Position));
    }

    #[test]
    fn renamed_entry_reads_the_zcurve() {
        let mut schema = schema_with("places", [loc(DataType::Position)]);
        adjusted(
            &mut schema,
            &[DocumentSummary::new("short")
                .with_field(SummaryField::new("where", None).with_source("loc"))],
        );

        let summary = schema.summary_field_in("short", "where").unwrap();
        assert_eq!(summary.transform, SummaryTransform::GeoPos);
        assert_eq!(summary.sources, vec!["loc_zcurve".to_string()]);
        assert_eq!(summary.data_type, Some(DataType::Position));
    }

    #[test]
    fn imported_position_summary_reads_the_imported_zcurve() {
        let mut campaign = schema_with("campaign", [loc(DataType::Position)]);
        Run::only(&[PassId::CreatePositionZCurve])
            .process(&mut campaign)
            .unwrap();
        let mut registry = SchemaRegistry::new();
        registry.insert(campaign);

        let mut ad = schema_with(
            "ad",
            [Field::new(
                "campaign_ref",
                DataType::Reference("campaign".into()),
            )],
        );
        ad.import_field(ImportDeclaration::new("my_loc", "campaign_ref", "loc"));
        ad.add_summary(DocumentSummary::new("short").with_field(SummaryField::new("my_loc", None)))
            .unwrap();
        Run::only(&[
            PassId::ImportedFieldsResolver,
            PassId::AdjustPositionSummaryFields,
        ])
        .registry(registry)
        .process(&mut ad)
        .unwrap();

        let summary = ad.summary_field_in("short", "my_loc").unwrap();
        assert_eq!(summary.transform, SummaryTransform::GeoPos);
        assert_eq!(summary.sources, vec!["my_loc_zcurve".to_string()]);
        assert_eq!(summary.data_type, Some(DataType::Position));
    }
}
