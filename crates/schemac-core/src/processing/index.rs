use crate::{
    error::CompileError,
    pipeline::PassContext,
    schema::{Index, RankSettingKind, Schema},
};
use schemac_expr::Expression;
use schemac_types::Stemming;
use std::collections::BTreeMap;

/// Components of a uri that get an index of their own.
pub(crate) const URI_PARTS: &[&str] = &[
    "scheme", "host", "port", "path", "query", "fragment", "hostname",
];

/// Register field aliases on the indexes they name. An alias may not
/// shadow a field or another alias.
pub(crate) fn make_aliases(schema: &mut Schema, ctx: &PassContext<'_>) -> Result<(), CompileError> {
    let mut used: BTreeMap<String, String> = schema
        .concrete_fields()
        .map(|f| (f.name.clone(), format!("field '{}'", f.name)))
        .collect();
    let declared: Vec<(String, String, String)> = schema
        .concrete_fields()
        .flat_map(|f| {
            f.aliases
                .iter()
                .map(|(alias, index)| (f.name.clone(), alias.clone(), index.clone()))
        })
        .collect();

    for (field, alias, index) in declared {
        if let Some(owner) = used.get(&alias) {
            if ctx.validate() {
                return Err(CompileError::structural(
                    &schema.name,
                    format!("alias '{alias}' for index '{index}' is already used by {owner}"),
                )
                .with_field(field));
            }
            continue;
        }
        used.insert(alias.clone(), format!("an alias of index '{index}'"));

        if let Some(target) = schema
            .get_concrete_field_mut(&field)
            .and_then(|f| f.indices.get_mut(&index))
        {
            target.add_alias(alias);
            continue;
        }
        if let Some(target) = schema.indices.get_mut(&index) {
            target.add_alias(alias);
        }
    }

    Ok(())
}

/// Indexed uri fields also index each uri component.
pub(crate) fn uri_hack(schema: &mut Schema, _: &PassContext<'_>) -> Result<(), CompileError> {
    for field in schema.concrete_fields_mut() {
        if !field.data_type.is_uri() || !field.does_indexing() {
            continue;
        }
        for part in URI_PARTS {
            let name = format!("{}.{part}", field.name);
            field
                .indices
                .entry(name)
                .or_insert_with_key(|name| Index::new(name.as_str()));
        }
        field.stemming.get_or_insert(Stemming::None);
    }

    Ok(())
}

/// Fields ranked with `literal` get a second, unstemmed and unnormalized
/// index `<field>_literal`.
pub(crate) fn literal_boost(schema: &mut Schema, _: &PassContext<'_>) -> Result<(), CompileError> {
    let from_profiles: Vec<String> = schema
        .rank_profiles
        .values()
        .flat_map(|profile| {
            profile
                .rank_settings
                .iter()
                .filter(|s| s.kind == RankSettingKind::Literal)
                .map(|s| s.field.clone())
        })
        .collect();

    for field in schema.concrete_fields_mut() {
        if !(field.ranking.literal || from_profiles.contains(&field.name)) || !field.does_indexing() {
            continue;
        }
        field.ranking.literal = true;

        let literal = format!("{}_literal", field.name);
        if field.indices.contains_key(&literal) {
            continue;
        }
        field.indices.insert(
            literal.clone(),
            Index {
                stemming: Some(Stemming::None),
                normalized: false,
                ..Index::new(&literal)
            },
        );

        let tokenize = Expression::tokenize(false, None);
        let statement = Expression::statement([
            Expression::input(&field.name),
            if field.data_type.is_multi_value() {
                Expression::for_each(tokenize)
            } else {
                tokenize
            },
            Expression::index(&literal),
        ]);
        field.indexing = Some(match field.indexing.take() {
            Some(Expression::Script(mut statements)) => {
                statements.push(statement);
                Expression::Script(statements)
            }
            Some(other) => Expression::script([other, statement]),
            None => Expression::script([statement]),
        });
    }

    Ok(())
}

/// Index-only settings on a field that writes no index are an error.
pub(crate) fn validate_field_with_index_settings_creates_index(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for field in schema.concrete_fields() {
        if field.does_indexing() || field.is_imported_field {
            continue;
        }
        let setting = if field.normalizing.is_some() {
            Some("normalizing")
        } else if schema.indices.contains_key(&field.name) {
            Some("index")
        } else {
            None
        };

        if let Some(setting) = setting {
            return Err(CompileError::shape_validity(
                &schema.name,
                format!("field has '{setting}' settings but does not create an index; add 'index' to its indexing statement"),
            )
            .with_field(&field.name));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        pipeline::{Mode, PassId},
        schema::{Field, RankProfile, RankSetting},
        test_support::{Run, attribute_field, index_field, schema_with},
    };
    use schemac_types::{DataType, NormalizeLevel};

    #[test]
    fn aliases_land_on_their_index() {
        let mut title = index_field("title", DataType::String);
        title.aliases.insert("heading".into(), "title".into());
        let mut schema = schema_with("music", [title]);
        Run::only(&[PassId::MakeAliases]).process(&mut schema).unwrap();

        assert_eq!(schema.get_index("title").unwrap().aliases, vec!["heading"]);
    }

    #[test]
    fn alias_may_not_shadow_a_field() {
        let mut title = index_field("title", DataType::String);
        title.aliases.insert("body".into(), "title".into());
        let mut schema = schema_with("music", [title, index_field("body", DataType::String)]);

        let err = Run::only(&[PassId::MakeAliases])
            .process(&mut schema)
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::Structural);
        assert!(err.message.contains("field 'body'"));

        Run::only(&[PassId::MakeAliases])
            .mode(Mode::best_effort())
            .process(&mut schema)
            .unwrap();
    }

    #[test]
    fn indexed_uri_gets_component_indexes() {
        let mut schema = schema_with("web", [index_field("url", DataType::Uri)]);
        Run::only(&[PassId::UriHack]).process(&mut schema).unwrap();

        let url = schema.get_concrete_field("url").unwrap();
        for part in URI_PARTS {
            assert!(url.indices.contains_key(&format!("url.{part}")));
        }
        assert_eq!(url.stemming, Some(Stemming::None));
    }

    #[test]
    fn literal_ranking_adds_literal_index_statement() {
        let mut schema = schema_with("music", [index_field("title", DataType::String)]);
        let mut profile = RankProfile::new("exactish");
        profile.rank_settings.push(RankSetting {
            field: "title".into(),
            kind: RankSettingKind::Literal,
        });
        schema.add_rank_profile(profile).unwrap();

        let run = Run::only(&[PassId::LiteralBoost]);
        run.process(&mut schema).unwrap();
        run.process(&mut schema).unwrap();

        let title = schema.get_concrete_field("title").unwrap();
        assert!(title.ranking.literal);
        assert!(!title.indices["title_literal"].normalized);
        assert_eq!(
            title.indexing.as_ref().unwrap().to_string(),
            "{ input title | index title; input title | tokenize | index title_literal; }"
        );
    }

    #[test]
    fn normalizing_without_index_fails() {
        let mut year = attribute_field("label", DataType::String);
        year.normalizing = Some(NormalizeLevel::Lowercase);
        let mut schema = schema_with("music", [year]);

        let err = Run::only(&[PassId::ValidateFieldWithIndexSettingsCreatesIndex])
            .process(&mut schema)
            .unwrap_err();
        assert!(err.message.contains("normalizing"));

        let mut schema = schema_with("music", [Field::new("plain", DataType::String)]);
        Run::only(&[PassId::ValidateFieldWithIndexSettingsCreatesIndex])
            .process(&mut schema)
            .unwrap();
    }
}
