//! Rank-profile passes. They only propagate settings and types from the
//! schema into its profiles; ranking expressions are never evaluated.

use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::all_fields,
    schema::{Attribute, RankProfile, Schema},
};
use schemac_types::TensorType;
use std::collections::BTreeMap;

/// Features a function may not be named after without shadowing them.
pub(crate) const RESERVED_FUNCTION_NAMES: &[&str] = &[
    "age",
    "attribute",
    "bm25",
    "closeness",
    "constant",
    "distance",
    "elementCompleteness",
    "fieldMatch",
    "firstPhase",
    "freshness",
    "matches",
    "nativeRank",
    "now",
    "onnx",
    "query",
    "random",
    "secondPhase",
    "tensor",
    "term",
    "value",
];

///
/// FeatureRef
///
/// A rank feature reference such as `query(q)` or `onnx(model).out`.
///

#[derive(Debug, Eq, PartialEq)]
struct FeatureRef<'a> {
    name: &'a str,
    argument: Option<&'a str>,
    output: Option<&'a str>,
}

impl<'a> FeatureRef<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim();
        let (name, rest) = match text.find('(') {
            Some(open) => (&text[..open], &text[open..]),
            None => (text, ""),
        };
        if !is_feature_name(name) {
            return None;
        }
        if rest.is_empty() {
            return Some(Self {
                name,
                argument: None,
                output: None,
            });
        }

        let close = rest.find(')')?;
        let argument = rest[1..close].trim();
        let tail = &rest[close + 1..];
        let output = match tail.strip_prefix('.') {
            Some(output) if is_feature_name(output) => Some(output),
            Some(_) => return None,
            None if tail.is_empty() => None,
            None => return None,
        };

        Some(Self {
            name,
            argument: (!argument.is_empty()).then_some(argument),
            output,
        })
    }

    /// Normalized text, as used for feature-type keys.
    fn key(&self) -> String {
        let mut key = self.name.to_string();
        if let Some(argument) = self.argument {
            key.push('(');
            key.push_str(argument);
            key.push(')');
        }
        if let Some(output) = self.output {
            key.push('.');
            key.push_str(output);
        }

        key
    }
}

fn is_feature_name(name: &str) -> bool {
    let mut chars = name.chars();

    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fields marked as rank filters, and fields a profile marks as filters,
/// become filter fields of the profile.
pub(crate) fn filter_field_names(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let filters: Vec<String> = all_fields(schema)
        .into_iter()
        .filter(|f| f.ranking.filter)
        .map(|f| f.name.clone())
        .collect();

    for profile in schema.rank_profiles.values_mut() {
        let declared: Vec<String> = profile.filter_settings().map(str::to_string).collect();
        profile.filter_fields.extend(filters.iter().cloned());
        profile.filter_fields.extend(declared);
    }

    Ok(())
}

pub(crate) fn match_phase_settings_validator(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for profile in schema.rank_profiles.values() {
        let Some(settings) = &profile.match_phase else {
            continue;
        };
        let attribute = ordering_attribute(schema, profile, "match-phase", &settings.attribute)?;

        if !attribute.fast_search {
            return Err(CompileError::shape_validity(
                &schema.name,
                format!(
                    "rank profile '{}': match-phase attribute '{}' must be 'fast-search'",
                    profile.name, settings.attribute
                ),
            ));
        }
    }

    Ok(())
}

pub(crate) fn diversity_settings_validator(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for profile in schema.rank_profiles.values() {
        let Some(diversity) = &profile.diversity else {
            continue;
        };
        if profile.match_phase.is_none() {
            return Err(CompileError::shape_validity(
                &schema.name,
                format!(
                    "rank profile '{}' declares diversity without match-phase",
                    profile.name
                ),
            ));
        }
        if diversity.min_groups == 0 {
            return Err(CompileError::shape_validity(
                &schema.name,
                format!(
                    "rank profile '{}': diversity min-groups must be at least 1",
                    profile.name
                ),
            ));
        }

        let attribute = schema.get_attribute(&diversity.attribute).ok_or_else(|| {
            CompileError::source_validity(
                &schema.name,
                format!(
                    "rank profile '{}' uses diversity attribute '{}', which does not exist",
                    profile.name, diversity.attribute
                ),
            )
        })?;
        let basic = attribute.basic_type();
        if !attribute.is_single_value() || !(basic.is_numeric() || basic.is_string()) {
            return Err(CompileError::shape_validity(
                &schema.name,
                format!(
                    "rank profile '{}': diversity attribute '{}' must be single-value numeric or string, but is {}",
                    profile.name, diversity.attribute, attribute.data_type
                ),
            ));
        }
    }

    Ok(())
}

// The attribute a phase orders on: existing, single-value and numeric.
fn ordering_attribute<'a>(
    schema: &'a Schema,
    profile: &RankProfile,
    phase: &str,
    name: &str,
) -> Result<&'a Attribute, CompileError> {
    let attribute = schema.get_attribute(name).ok_or_else(|| {
        CompileError::source_validity(
            &schema.name,
            format!(
                "rank profile '{}' uses {phase} attribute '{name}', which does not exist",
                profile.name
            ),
        )
    })?;
    if !attribute.is_single_value() || !attribute.data_type.is_numeric() {
        return Err(CompileError::shape_validity(
            &schema.name,
            format!(
                "rank profile '{}': {phase} attribute '{name}' must be single-value numeric, but is {}",
                profile.name, attribute.data_type
            ),
        ));
    }

    Ok(attribute)
}

/// Tensor attributes and declared query inputs become feature types of
/// every profile.
pub(crate) fn rank_profile_type_settings(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut attribute_types: BTreeMap<String, TensorType> = BTreeMap::new();
    for field in all_fields(schema) {
        for attribute in field.attributes.values() {
            if let Some(tensor) = attribute.data_type.as_tensor() {
                attribute_types.insert(format!("attribute({})", attribute.name), tensor.clone());
            }
        }
    }
    for imported in schema.imported_fields.simple_fields() {
        if let Some(tensor) = imported.attribute.data_type.as_tensor() {
            attribute_types.insert(format!("attribute({})", imported.name), tensor.clone());
        }
    }

    for profile in schema.rank_profiles.values_mut() {
        profile.feature_types.extend(attribute_types.clone());
        let inputs: Vec<(String, TensorType)> = profile
            .inputs
            .iter()
            .map(|(name, tensor)| (format!("query({name})"), tensor.clone()))
            .collect();
        profile.feature_types.extend(inputs);
    }

    Ok(())
}

pub(crate) fn reserved_function_names(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    for profile in schema.rank_profiles.values() {
        for function in profile.functions.keys() {
            if RESERVED_FUNCTION_NAMES.contains(&function.as_str()) {
                ctx.warn(
                    &schema.name,
                    None,
                    format!(
                        "function '{function}' in rank profile '{}' has a reserved name; it shadows the built-in feature of the same name",
                        profile.name
                    ),
                );
            }
        }
    }

    Ok(())
}

/// Output types of models in the application package. A model file that is
/// not available is left alone.
pub(crate) fn onnx_model_type_resolver(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    for profile in schema.rank_profiles.values_mut() {
        for model in profile.onnx_models.values_mut() {
            let Some(found) = ctx.model_outputs(&model.file) else {
                tracing::debug!(schema = %schema.name, model = %model.name, "model file not available");
                continue;
            };

            if model.outputs.is_empty() {
                model.outputs = found
                    .iter()
                    .map(|(name, tensor)| (name.clone(), Some(tensor.clone())))
                    .collect();
            }
            for (output, slot) in &mut model.outputs {
                match found.get(output) {
                    Some(tensor) => *slot = Some(tensor.clone()),
                    None if ctx.validate() => {
                        return Err(CompileError::source_validity(
                            &schema.name,
                            format!(
                                "onnx model '{}' in rank profile '{}' has no output '{output}'",
                                model.name, profile.name
                            ),
                        ));
                    }
                    None => {}
                }
            }

            for (output, tensor) in &model.outputs {
                if let Some(tensor) = tensor {
                    profile
                        .feature_types
                        .insert(format!("onnx({}).{output}", model.name), tensor.clone());
                }
            }
        }
    }

    Ok(())
}

/// Give functions a return type where their body is a single typed feature
/// or another typed function, and warn about summary features reading
/// undeclared query inputs.
pub(crate) fn ranking_expression_type_resolver(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    for profile in schema.rank_profiles.values_mut() {
        resolve_function_types(&schema.name, profile, ctx.validate())?;

        for feature in &profile.summary_features {
            if let Some(FeatureRef {
                name: "query",
                argument: Some(input),
                ..
            }) = FeatureRef::parse(feature)
                && !profile.inputs.contains_key(input)
            {
                ctx.warn(
                    &schema.name,
                    None,
                    format!(
                        "rank profile '{}' has summary feature '{feature}' reading query input '{input}', which is not declared; it is treated as a scalar",
                        profile.name
                    ),
                );
            }
        }
    }

    Ok(())
}

// Functions may refer to functions declared after them, so keep going until
// nothing changes.
fn resolve_function_types(
    schema: &str,
    profile: &mut RankProfile,
    validate: bool,
) -> Result<(), CompileError> {
    for _ in 0..=profile.functions.len() {
        let mut changed = false;

        for i in 0..profile.functions.len() {
            let Some(inferred) = infer_type(profile, &profile.functions[i].expression) else {
                continue;
            };
            let function = &mut profile.functions[i];
            if function.return_type.is_none() {
                function.return_type = Some(inferred);
                changed = true;
            } else if let Some(declared) = &function.return_type
                && *declared != inferred
                && validate
            {
                return Err(CompileError::type_consistency(
                    schema,
                    format!(
                        "function '{}' in rank profile '{}' is declared to return {declared} but produces {inferred}",
                        function.name, profile.name
                    ),
                ));
            }
        }

        if !changed {
            break;
        }
    }

    Ok(())
}

fn infer_type(profile: &RankProfile, expression: &str) -> Option<TensorType> {
    if expression.trim().parse::<f64>().is_ok() {
        return Some(TensorType::scalar());
    }
    let feature = FeatureRef::parse(expression)?;

    if let Some(tensor) = profile.feature_types.get(&feature.key()) {
        return Some(tensor.clone());
    }
    if feature.argument.is_none() && feature.output.is_none() {
        return profile
            .functions
            .get(feature.name)
            .and_then(|f| f.return_type.clone());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        pipeline::{ModelLookup, Mode, PassId},
        schema::{
            DiversitySettings, MatchPhaseSettings, OnnxModel, RankSetting, RankSettingKind,
        },
        test_support::{Run, attribute_field, index_field, schema_with},
    };
    use indexmap::IndexMap;
    use schemac_types::{DataType, TensorDimension, TensorValueType};

    fn embedding() -> TensorType {
        TensorType::new(TensorValueType::Float, vec![TensorDimension::indexed("x", 4)])
    }

    fn schema_with_profile(profile: RankProfile) -> Schema {
        let mut popularity = attribute_field("popularity", DataType::Int);
        popularity.enable_attribute().fast_search = true;
        let mut title = index_field("title", DataType::String);
        title.ranking.filter = true;

        let mut schema = schema_with(
            "music",
            [
                popularity,
                title,
                attribute_field("tags", DataType::array(DataType::String)),
                attribute_field("artist", DataType::String),
                attribute_field("embedding", DataType::Tensor(embedding())),
            ],
        );
        schema.add_rank_profile(profile).unwrap();
        schema
    }

    #[test]
    fn feature_references_parse() {
        assert_eq!(
            FeatureRef::parse(" onnx(model).score "),
            Some(FeatureRef {
                name: "onnx",
                argument: Some("model"),
                output: Some("score"),
            })
        );
        assert_eq!(FeatureRef::parse("query( q )").unwrap().key(), "query(q)");
        assert_eq!(FeatureRef::parse("helper").unwrap().argument, None);
        assert_eq!(FeatureRef::parse("a + b"), None);
        assert_eq!(FeatureRef::parse("sum(query(q))"), None);
    }

    #[test]
    fn filters_reach_every_profile() {
        let mut profile = RankProfile::new("default");
        profile.rank_settings.push(RankSetting {
            field: "artist".into(),
            kind: RankSettingKind::Filter,
        });
        let mut schema = schema_with_profile(profile);
        Run::only(&[PassId::FilterFieldNames])
            .process(&mut schema)
            .unwrap();

        let filters = &schema.rank_profiles["default"].filter_fields;
        assert!(filters.contains("title"));
        assert!(filters.contains("artist"));
        assert!(!filters.contains("tags"));
    }

    #[test]
    fn match_phase_needs_fast_search_numeric_attribute() {
        let check = |attribute: &str| {
            let mut profile = RankProfile::new("default");
            profile.match_phase = Some(MatchPhaseSettings {
                attribute: attribute.into(),
                ascending: false,
                max_hits: 1000,
            });
            Run::only(&[PassId::MatchPhaseSettingsValidator])
                .process(&mut schema_with_profile(profile))
        };

        check("popularity").unwrap();
        assert_eq!(check("missing").unwrap_err().class, ErrorClass::SourceValidity);
        assert!(check("tags").unwrap_err().message.contains("single-value numeric"));
        assert!(check("artist").unwrap_err().message.contains("single-value numeric"));
    }

    #[test]
    fn diversity_needs_match_phase_and_single_value() {
        let check = |attribute: &str, with_match_phase: bool| {
            let mut profile = RankProfile::new("default");
            profile.diversity = Some(DiversitySettings {
                attribute: attribute.into(),
                min_groups: 10,
            });
            if with_match_phase {
                profile.match_phase = Some(MatchPhaseSettings {
                    attribute: "popularity".into(),
                    ascending: false,
                    max_hits: 1000,
                });
            }
            Run::only(&[PassId::DiversitySettingsValidator])
                .process(&mut schema_with_profile(profile))
        };

        check("artist", true).unwrap();
        assert!(check("artist", false).unwrap_err().message.contains("without match-phase"));
        assert_eq!(check("tags", true).unwrap_err().class, ErrorClass::ShapeValidity);
    }

    #[test]
    fn feature_types_come_from_attributes_and_inputs() {
        let mut profile = RankProfile::new("default");
        profile.inputs.insert("user".into(), embedding());
        let mut schema = schema_with_profile(profile);
        Run::only(&[PassId::RankProfileTypeSettings])
            .process(&mut schema)
            .unwrap();

        let types = &schema.rank_profiles["default"].feature_types;
        assert_eq!(types.get("attribute(embedding)"), Some(&embedding()));
        assert_eq!(types.get("query(user)"), Some(&embedding()));
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn reserved_function_names_warn() {
        let mut profile = RankProfile::new("default");
        profile.add_function("now", "1");
        profile.add_function("recency", "now");
        let mut schema = schema_with_profile(profile);
        let run = Run::only(&[PassId::ReservedFunctionNames]);
        run.process(&mut schema).unwrap();

        assert_eq!(run.sink.warnings().len(), 1);
        assert!(run.has_warning("function 'now' in rank profile 'default' has a reserved name"));
    }

    struct Models;

    impl ModelLookup for Models {
        fn output_types(&self, file: &str) -> Option<IndexMap<String, TensorType>> {
            (file == "models/ranker.onnx").then(|| {
                let mut outputs = IndexMap::new();
                outputs.insert("score".to_string(), TensorType::scalar());
                outputs
            })
        }
    }

    #[test]
    fn onnx_outputs_resolve_from_model_files() {
        let mut profile = RankProfile::new("default");
        profile.onnx_models.insert(
            "ranker".into(),
            OnnxModel::new("ranker", "models/ranker.onnx"),
        );
        profile
            .onnx_models
            .insert("absent".into(), OnnxModel::new("absent", "models/absent.onnx"));
        let mut schema = schema_with_profile(profile);
        Run::only(&[PassId::OnnxModelTypeResolver])
            .models(Models)
            .process(&mut schema)
            .unwrap();

        let profile = &schema.rank_profiles["default"];
        assert_eq!(
            profile.feature_types.get("onnx(ranker).score"),
            Some(&TensorType::scalar())
        );
        assert!(profile.onnx_models["absent"].outputs.is_empty());
    }

    #[test]
    fn undeclared_onnx_output_fails() {
        let mut model = OnnxModel::new("ranker", "models/ranker.onnx");
        model.outputs.insert("logits".into(), None);
        let mut profile = RankProfile::new("default");
        profile.onnx_models.insert("ranker".into(), model);

        let err = Run::only(&[PassId::OnnxModelTypeResolver])
            .models(Models)
            .process(&mut schema_with_profile(profile.clone()))
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::SourceValidity);

        Run::only(&[PassId::OnnxModelTypeResolver])
            .models(Models)
            .mode(Mode::best_effort())
            .process(&mut schema_with_profile(profile))
            .unwrap();
    }

    #[test]
    fn function_types_propagate_in_any_order() {
        let mut profile = RankProfile::new("default");
        profile.inputs.insert("user".into(), embedding());
        profile.add_function("outer", "inner");
        profile.add_function("inner", "query(user)");
        profile.add_function("mixed", "sum(query(user) * attribute(embedding))");
        let mut schema = schema_with_profile(profile);
        Run::only(&[
            PassId::RankProfileTypeSettings,
            PassId::RankingExpressionTypeResolver,
        ])
        .process(&mut schema)
        .unwrap();

        let functions = &schema.rank_profiles["default"].functions;
        assert_eq!(functions["inner"].return_type, Some(embedding()));
        assert_eq!(functions["outer"].return_type, Some(embedding()));
        assert_eq!(functions["mixed"].return_type, None);
    }

    #[test]
    fn declared_return_type_must_match() {
        let mut profile = RankProfile::new("default");
        profile.add_function("vector", "attribute(embedding)");
        profile.functions["vector"].return_type = Some(TensorType::scalar());
        let mut schema = schema_with_profile(profile);

        let err = Run::only(&[
            PassId::RankProfileTypeSettings,
            PassId::RankingExpressionTypeResolver,
        ])
        .process(&mut schema)
        .unwrap_err();
        assert_eq!(err.class, ErrorClass::TypeConsistency);
    }

    #[test]
    fn undeclared_query_input_in_summary_features_warns() {
        let mut profile = RankProfile::new("default");
        profile.inputs.insert("user".into(), embedding());
        profile.summary_features = vec!["query(user)".into(), "query(boost)".into()];
        let mut schema = schema_with_profile(profile);
        let run = Run::only(&[PassId::RankingExpressionTypeResolver]);
        run.process(&mut schema).unwrap();

        assert_eq!(run.sink.warnings().len(), 1);
        assert!(run.has_warning("reading query input 'boost', which is not declared"));
    }
}
