use crate::{
    error::CompileError,
    pipeline::PassContext,
    schema::{Field, Schema},
};
use std::fmt::Display;

/// Members must exist. User-declared sets whose members disagree on string
/// settings are accepted with a warning, and the set adopts the first
/// member's match type and query commands when it has none of its own.
pub(crate) fn field_set_settings(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut adopted = Vec::new();

    for set in schema.field_sets.values() {
        let mut members: Vec<&Field> = Vec::new();
        for name in &set.field_names {
            if let Some(field) = schema.get_field(name) {
                members.push(field);
            } else if let Some(imported) = schema.imported_fields.get(name) {
                members.push(imported.target_field());
            } else if ctx.validate() {
                return Err(CompileError::structural(
                    &schema.name,
                    format!("field set '{}' contains unknown field '{name}'", set.name),
                )
                .with_field(name));
            }
        }
        let Some(first) = members.first() else {
            continue;
        };

        if !set.is_built_in() {
            let divergences = [
                divergence("match", &members, Field::match_type),
                divergence("stemming", &members, |f| f.stemming.unwrap_or_default()),
                divergence("normalizing", &members, |f| f.normalizing.unwrap_or_default()),
            ];
            for message in divergences.into_iter().flatten() {
                ctx.warn(
                    &schema.name,
                    None,
                    format!("field set '{}' has inconsistent {message}", set.name),
                );
            }
        }

        let match_type = set.match_type.or(first.matching.match_type);
        let query_commands = if set.query_commands.is_empty() {
            first.query_commands.clone()
        } else {
            set.query_commands.clone()
        };
        adopted.push((set.name.clone(), match_type, query_commands));
    }

    for (name, match_type, query_commands) in adopted {
        if let Some(set) = schema.field_sets.get_mut(&name) {
            set.match_type = match_type;
            set.query_commands = query_commands;
        }
    }

    Ok(())
}

// First member whose setting differs from the first member's.
fn divergence<T: Display + PartialEq>(
    setting: &str,
    members: &[&Field],
    value: impl Fn(&Field) -> T,
) -> Option<String> {
    let (first, rest) = members.split_first()?;
    let expected = value(first);
    let other = rest.iter().find(|f| value(f) != expected)?;

    Some(format!(
        "{setting} settings: field '{}' uses '{expected}' but field '{}' uses '{}'",
        first.name,
        other.name,
        value(other)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        pipeline::{Mode, PassId},
        schema::FieldSet,
        test_support::{Run, index_field, schema_with},
    };
    use schemac_types::{DataType, MatchType, Stemming};

    fn schema(members: &[&str]) -> Schema {
        let mut title = index_field("title", DataType::String);
        title.matching.match_type = Some(MatchType::Word);
        title.add_query_command("phrase-segmenting false");
        let mut body = index_field("body", DataType::String);
        body.stemming = Some(Stemming::None);

        let mut schema = schema_with("music", [title, body]);
        schema
            .add_field_set(FieldSet::new("text", members.iter().copied()))
            .unwrap();
        schema
    }

    #[test]
    fn unknown_member_fails() {
        let mut schema = schema(&["title", "lyrics"]);
        let err = Run::only(&[PassId::FieldSetSettings])
            .process(&mut schema)
            .unwrap_err();

        assert_eq!(err.class, ErrorClass::Structural);
        assert_eq!(err.field.as_deref(), Some("lyrics"));
    }

    #[test]
    fn unknown_member_is_ignored_when_not_validating() {
        let mut schema = schema(&["lyrics", "title"]);
        Run::only(&[PassId::FieldSetSettings])
            .mode(Mode::best_effort())
            .process(&mut schema)
            .unwrap();

        assert_eq!(schema.field_sets["text"].match_type, Some(MatchType::Word));
    }

    #[test]
    fn divergent_members_warn_and_first_member_wins() {
        let mut schema = schema(&["title", "body"]);
        let run = Run::only(&[PassId::FieldSetSettings]);
        run.process(&mut schema).unwrap();

        assert!(run.sink.has_warning(
            "field set 'text' has inconsistent match settings: field 'title' uses 'word' but field 'body' uses 'text'"
        ));
        assert!(run.sink.has_warning("inconsistent stemming settings"));
        assert!(!run.sink.has_warning("inconsistent normalizing"));

        let set = &schema.field_sets["text"];
        assert_eq!(set.match_type, Some(MatchType::Word));
        assert_eq!(set.query_commands, vec!["phrase-segmenting false".to_string()]);
    }

    #[test]
    fn built_in_sets_do_not_warn() {
        let mut schema = schema(&["title"]);
        let run = Run::only(&[PassId::BuiltInFieldSets, PassId::FieldSetSettings]);
        run.process(&mut schema).unwrap();

        assert!(run.sink.warnings().is_empty());
    }
}
