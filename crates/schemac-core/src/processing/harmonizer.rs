//! Settings of fields that share an index.
//!
//! Every index name written by two or more fields gets one stemming, one
//! rank type and one set of query commands. The first explicitly set value
//! in field order wins; fields that only had the default adopt it silently,
//! while a conflicting explicit value is overridden with a warning.

use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::all_fields,
    schema::{Field, Schema},
};
use indexmap::IndexMap;
use std::fmt::Display;

pub(crate) fn harmonize_multifield_indices(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for field in all_fields(schema) {
        for index in field.index_names() {
            groups.entry(index).or_default().push(field.name.clone());
        }
    }

    for (index, members) in groups {
        if members.len() > 1 {
            harmonize(schema, ctx, &index, &members);
        }
    }

    Ok(())
}

fn harmonize(schema: &mut Schema, ctx: &PassContext<'_>, index: &str, members: &[String]) {
    let fields: Vec<&Field> = members.iter().filter_map(|m| schema.get_field(m)).collect();

    let stemming = settle(ctx, &schema.name, index, "stemming", &fields, |f| f.stemming);
    let rank_type = settle(ctx, &schema.name, index, "rank type", &fields, |f| f.rank_type);
    let mut commands: Vec<String> = Vec::new();
    for command in fields.iter().flat_map(|f| &f.query_commands) {
        if !commands.contains(command) {
            commands.push(command.clone());
        }
    }

    tracing::debug!(
        schema = %schema.name,
        index,
        fields = members.len(),
        "harmonized shared index"
    );

    for name in members {
        let Some(field) = schema.get_field_mut(name) else {
            continue;
        };
        if stemming.is_some() {
            field.stemming = stemming;
        }
        if rank_type.is_some() {
            field.rank_type = rank_type;
        }
        for command in &commands {
            field.add_query_command(command.clone());
        }
        if let Some(descriptor) = field.indices.get_mut(index)
            && stemming.is_some()
        {
            descriptor.stemming = stemming;
        }
    }
    if let Some(descriptor) = schema.indices.get_mut(index)
        && stemming.is_some()
    {
        descriptor.stemming = stemming;
    }
}

// First explicit value in field order; later explicit values that differ
// are reported.
fn settle<T>(
    ctx: &PassContext<'_>,
    schema: &str,
    index: &str,
    setting: &str,
    fields: &[&Field],
    get: impl Fn(&Field) -> Option<T>,
) -> Option<T>
where
    T: Copy + Display + PartialEq,
{
    let mut winner: Option<(T, &str)> = None;

    for field in fields {
        let Some(value) = get(field) else {
            continue;
        };
        match winner {
            None => winner = Some((value, field.name.as_str())),
            Some((chosen, owner)) if chosen != value => ctx.warn(
                schema,
                Some(&field.name),
                format!(
                    "{setting} '{value}' conflicts with '{chosen}' of field '{owner}' for shared index '{index}'; using '{chosen}'"
                ),
            ),
            Some(_) => {}
        }
    }

    winner.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::PassId,
        schema::Index,
        test_support::{Run, index_field, schema_with},
    };
    use schemac_expr::Expression;
    use schemac_types::{DataType, RankType, Stemming};

    fn heading() -> Field {
        Field::new("heading", DataType::String).with_indexing(Expression::statement([
            Expression::input("heading"),
            Expression::index("title"),
        ]))
    }

    #[test]
    fn explicit_stemming_wins_silently_over_defaults() {
        let mut title = index_field("title", DataType::String);
        title.stemming = Some(Stemming::Best);
        title.add_query_command("phrase-segmenting");
        let mut schema = schema_with("music", [title, heading()]);

        let run = Run::only(&[PassId::MultifieldIndexHarmonizer]);
        run.process(&mut schema).unwrap();

        let heading = schema.get_concrete_field("heading").unwrap();
        assert_eq!(heading.stemming, Some(Stemming::Best));
        assert_eq!(heading.query_commands, vec!["phrase-segmenting".to_string()]);
        assert_eq!(
            schema.get_concrete_field("title").unwrap().indices["title"].stemming,
            Some(Stemming::Best)
        );
        assert!(run.sink.warnings().is_empty());
    }

    #[test]
    fn conflicting_explicit_settings_warn() {
        let mut title = index_field("title", DataType::String);
        title.stemming = Some(Stemming::Best);
        let mut heading = heading();
        heading.stemming = Some(Stemming::None);
        heading.rank_type = Some(RankType::About);
        let mut schema = schema_with("music", [title, heading]);

        let run = Run::only(&[PassId::MultifieldIndexHarmonizer]);
        run.process(&mut schema).unwrap();

        for name in ["title", "heading"] {
            let field = schema.get_concrete_field(name).unwrap();
            assert_eq!(field.stemming, Some(Stemming::Best));
            assert_eq!(field.rank_type, Some(RankType::About));
        }
        assert!(run.has_warning("stemming 'none' conflicts with 'best'"));
    }

    #[test]
    fn descriptors_take_the_harmonized_stemming() {
        let mut title = index_field("title", DataType::String);
        title.stemming = Some(Stemming::Best);
        title.indices["title"].stemming = Some(Stemming::None);
        let mut schema = schema_with("music", [title, heading()]);
        schema
            .add_index(Index {
                stemming: Some(Stemming::Multiple),
                ..Index::new("title")
            })
            .unwrap();
        Run::only(&[PassId::MultifieldIndexHarmonizer])
            .process(&mut schema)
            .unwrap();

        assert_eq!(
            schema.get_concrete_field("title").unwrap().indices["title"].stemming,
            Some(Stemming::Best)
        );
        assert_eq!(schema.indices["title"].stemming, Some(Stemming::Best));
    }

    #[test]
    fn unshared_indices_are_untouched() {
        let mut title = index_field("title", DataType::String);
        title.stemming = Some(Stemming::Multiple);
        let mut schema = schema_with("music", [title, index_field("body", DataType::String)]);
        Run::only(&[PassId::MultifieldIndexHarmonizer])
            .process(&mut schema)
            .unwrap();

        assert_eq!(schema.get_concrete_field("body").unwrap().stemming, None);
    }
}
