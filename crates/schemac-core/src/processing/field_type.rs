use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{all_fields, convert_field_script},
    schema::{Field, Schema, SummaryTransform},
};
use indexmap::IndexMap;
use schemac_expr::{Converter, Expression, ExpressionError, OutputExpression, OutputKind};
use schemac_types::{DataType, MatchType, RankType};

/// Rewrite legacy `tag` fields to `weightedset<string>` with tag semantics.
pub(crate) fn tag_type(schema: &mut Schema, _: &PassContext<'_>) -> Result<(), CompileError> {
    for field in schema.concrete_fields_mut() {
        field.visit_mut(&mut |field: &mut Field| {
            if !matches!(field.data_type, DataType::Tag) {
                return;
            }
            field.data_type = DataType::tag_set();
            for attribute in field.attributes.values_mut() {
                if matches!(attribute.data_type, DataType::Tag) {
                    attribute.data_type = DataType::tag_set();
                }
            }
            for summary in field.summary_fields.values_mut() {
                if matches!(summary.data_type, Some(DataType::Tag)) {
                    summary.data_type = Some(DataType::tag_set());
                }
            }
            field.rank_type.get_or_insert(RankType::Tags);
            field.matching.match_type.get_or_insert(MatchType::Word);
        });
    }

    for summary in schema.summaries.values_mut() {
        for entry in summary.fields.values_mut() {
            if matches!(entry.data_type, Some(DataType::Tag)) {
                entry.data_type = Some(DataType::tag_set());
            }
        }
    }

    Ok(())
}

/// Numeric values cannot be text indexed; store them as attributes.
pub(crate) fn integer_index_to_attribute(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();

    for field in schema.concrete_fields_mut() {
        if !field.data_type.primitive_type().is_numeric() || !field.does_indexing() {
            continue;
        }

        let has_attribute = field
            .indexing
            .as_ref()
            .is_some_and(|s| s.has_output(OutputKind::Attribute));
        convert_field_script(
            &schema_name,
            field,
            &mut IndexToAttribute {
                drop: has_attribute,
            },
        )?;

        let name = field.name.clone();
        field.indices.shift_remove(&name);
        field.enable_attribute();

        ctx.warn(
            &schema_name,
            Some(&name),
            format!(
                "changed to attribute because numerical indexes (field has type {}) are not supported",
                field.data_type
            ),
        );
    }

    Ok(())
}

struct IndexToAttribute {
    drop: bool,
}

impl Converter for IndexToAttribute {
    fn should_convert(&self, exp: &Expression) -> bool {
        exp.as_output().is_some_and(|o| o.kind == OutputKind::Index)
    }

    fn do_convert(&mut self, exp: Expression) -> Result<Option<Expression>, ExpressionError> {
        if self.drop {
            return Ok(None);
        }

        match exp {
            Expression::Output(output) => Ok(Some(Expression::Output(OutputExpression {
                kind: OutputKind::Attribute,
                field: output.field,
            }))),
            other => Ok(Some(other)),
        }
    }
}

/// Every storage name must have one type across attributes, indexes and
/// field summaries. `tag` and `weightedset<string>` count as equal.
pub(crate) fn validate_field_types(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut seen: IndexMap<String, (DataType, &'static str, String)> = IndexMap::new();

    for field in all_fields(schema) {
        let mut uses: Vec<(String, DataType, &'static str)> = Vec::new();
        for attribute in field.attributes.values() {
            uses.push((attribute.name.clone(), attribute.data_type.clone(), "attribute"));
        }
        for index in field.index_names() {
            uses.push((index, field.data_type.clone(), "index"));
        }
        for summary in field.summary_fields.values() {
            if let Some(data_type) = &summary.data_type {
                uses.push((summary.name.clone(), data_type.clone(), "summary"));
            }
        }

        for (name, data_type, role) in uses {
            match seen.get(&name) {
                Some((expected, first_role, owner)) if !expected.matches_ignoring_tag(&data_type) => {
                    return Err(CompileError::type_consistency(
                        &schema.name,
                        format!(
                            "incompatible types for '{name}': {first_role} of field '{owner}' is {expected}, {role} of field '{}' is {data_type}",
                            field.name
                        ),
                    )
                    .with_field(&field.name));
                }
                Some(_) => {}
                None => {
                    seen.insert(name, (data_type, role, field.name.clone()));
                }
            }
        }
    }

    Ok(())
}

pub(crate) fn disallow_complex_map_and_wset_key_types(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for field in schema.concrete_fields() {
        if let Err(message) = check_key_types(&field.data_type) {
            return Err(CompileError::shape_validity(&schema.name, message).with_field(&field.name));
        }
    }

    Ok(())
}

fn check_key_types(data_type: &DataType) -> Result<(), String> {
    match data_type {
        DataType::Map { key, value } => {
            if !key.is_primitive() {
                return Err(format!("map key type must be a primitive type, got {key}"));
            }
            check_key_types(value)
        }
        DataType::WeightedSet(wset) => {
            if !wset.element.is_primitive() {
                return Err(format!(
                    "weighted set key type must be a primitive type, got {}",
                    wset.element
                ));
            }
            Ok(())
        }
        DataType::Array(element) => check_key_types(element),
        DataType::Struct(st) => st
            .fields
            .iter()
            .try_for_each(|member| check_key_types(&member.data_type)),
        _ => Ok(()),
    }
}

/// Predicate fields are attribute-only and need arity settings. Their
/// values are optimized before being stored.
pub(crate) fn predicate_processor(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();

    for field in schema.concrete_fields_mut() {
        if !matches!(field.data_type, DataType::Predicate) {
            continue;
        }
        if field.does_indexing() && ctx.validate() {
            return Err(CompileError::shape_validity(
                &schema_name,
                "predicate fields cannot be indexed, use 'attribute' instead of 'index'",
            )
            .with_field(&field.name));
        }
        if !field.does_attributing() {
            continue;
        }

        let attribute = field.enable_attribute();
        let (arity, lower, upper) = (attribute.arity, attribute.lower_bound, attribute.upper_bound);
        if ctx.validate() {
            let problem = match (arity, lower, upper) {
                (None, _, _) => Some("missing arity value in predicate field".to_string()),
                (Some(arity), _, _) if arity < 2 => {
                    Some(format!("invalid arity value {arity}, must be at least 2"))
                }
                (_, Some(lower), Some(upper)) if lower > upper => Some(format!(
                    "lower bound {lower} must not be greater than upper bound {upper}"
                )),
                _ => None,
            };
            if let Some(problem) = problem {
                return Err(
                    CompileError::shape_validity(&schema_name, problem).with_field(&field.name)
                );
            }
        }

        let optimized = field
            .indexing
            .as_ref()
            .is_some_and(|s| s.contains(|e| matches!(e, Expression::OptimizePredicate)));
        if !optimized {
            let name = field.name.clone();
            convert_field_script(&schema_name, field, &mut OptimizeBeforeAttribute { field: name })?;
        }
    }

    Ok(())
}

struct OptimizeBeforeAttribute {
    field: String,
}

impl Converter for OptimizeBeforeAttribute {
    fn should_convert(&self, exp: &Expression) -> bool {
        exp.as_output().is_some_and(|o| {
            o.kind == OutputKind::Attribute && o.field.as_deref().is_none_or(|f| f == self.field)
        })
    }

    fn do_convert(&mut self, exp: Expression) -> Result<Option<Expression>, ExpressionError> {
        Ok(Some(Expression::statement([Expression::OptimizePredicate, exp])))
    }
}

/// Tensor fields: no tensor collections, and indexed tensors must fit a
/// nearest-neighbor index and carry its parameters on their attribute.
pub(crate) fn tensor_field_processor(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();

    for field in schema.concrete_fields_mut() {
        if holds_tensor_collection(&field.data_type) && ctx.validate() {
            return Err(CompileError::shape_validity(
                &schema_name,
                format!("a field with collection type of tensor is not supported, got {}", field.data_type),
            )
            .with_field(&field.name));
        }
        let Some(tensor) = field.data_type.as_tensor().cloned() else {
            continue;
        };
        if !field.does_indexing() {
            continue;
        }

        if ctx.validate() {
            if !tensor.is_valid_for_nearest_neighbor() {
                return Err(CompileError::shape_validity(
                    &schema_name,
                    format!(
                        "a tensor with an index must have exactly one bound indexed dimension and at most one mapped dimension, got {tensor}"
                    ),
                )
                .with_field(&field.name));
            }
            if field.attribute().is_none() {
                return Err(CompileError::shape_validity(
                    &schema_name,
                    "a tensor with an index must also be an attribute",
                )
                .with_field(&field.name));
            }
        }

        let name = field.name.clone();
        let hnsw = field
            .indices
            .get(&name)
            .and_then(|index| index.hnsw)
            .unwrap_or_default();
        if let Some(attribute) = field.attributes.get_mut(&name) {
            attribute.hnsw = Some(hnsw);
        }
    }

    Ok(())
}

fn holds_tensor_collection(data_type: &DataType) -> bool {
    match data_type {
        DataType::Array(element) => element.is_tensor() || holds_tensor_collection(element),
        DataType::WeightedSet(wset) => wset.element.is_tensor(),
        DataType::Map { value, .. } => value.is_tensor() || holds_tensor_collection(value),
        _ => false,
    }
}

/// Reference fields are attributes, but their summaries are always read
/// from the document.
pub(crate) fn reference_fields_processor(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let references: Vec<String> = schema
        .concrete_fields()
        .filter(|f| matches!(f.data_type, DataType::Reference(_)))
        .map(|f| f.name.clone())
        .collect();

    for name in &references {
        if ctx.validate()
            && schema
                .get_concrete_field(name)
                .is_some_and(|f| f.indexing.is_some() && !f.does_attributing())
        {
            return Err(CompileError::shape_validity(
                &schema.name,
                "reference fields must be attributes",
            )
            .with_field(name));
        }

        let summaries: Vec<String> = schema
            .summary_fields_sourced_from(name)
            .into_iter()
            .filter(|s| s.transform == SummaryTransform::Attribute)
            .map(|s| s.name.clone())
            .collect();
        for summary in summaries {
            schema.update_summary_fields(&summary, |entry| {
                if entry.transform == SummaryTransform::Attribute {
                    entry.transform = SummaryTransform::None;
                }
            });
        }
    }

    Ok(())
}
