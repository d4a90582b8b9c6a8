//! Match-mode defaults and the tokenizer rewriting that implements them in
//! the indexing scripts.

use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{all_fields, convert_field_script, try_visit_fields_mut},
    schema::{Field, Schema},
};
use indexmap::IndexMap;
use schemac_expr::{Converter, Expression, ExpressionError, OutputKind, TokenizeConfig};
use schemac_types::{DataType, MatchType, NormalizeLevel, RankType, Stemming};

/// Terminator used by exact matching when none is declared.
pub const DEFAULT_EXACT_TERMINATOR: &str = "@@";

/// Gram size used by n-gram matching when none is declared.
pub const DEFAULT_GRAM_SIZE: u32 = 2;

/// Attribute-only fields without a match type match whole values.
pub(crate) fn attributes_implicit_word(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for field in schema.concrete_fields_mut() {
        field.visit_mut(&mut |field: &mut Field| {
            if needs_implicit_word(field) {
                field.matching.match_type = Some(MatchType::Word);
            }
        });
    }

    Ok(())
}

fn needs_implicit_word(field: &Field) -> bool {
    if field.matching.match_type.is_some() || !field.does_attributing() || field.does_indexing() {
        return false;
    }
    let primitive = field.data_type.primitive_type();

    !(primitive.is_numeric()
        || primitive.is_struct()
        || field.data_type.is_complex()
        || matches!(
            primitive,
            DataType::Tensor(_) | DataType::Reference(_) | DataType::Predicate
        ))
}

pub(crate) fn word_match(schema: &mut Schema, _: &PassContext<'_>) -> Result<(), CompileError> {
    for field in schema.concrete_fields_mut() {
        field.visit_mut(&mut |field: &mut Field| {
            if field.matching.match_type != Some(MatchType::Word) {
                return;
            }
            field.stemming = Some(Stemming::None);
            field.normalizing.get_or_insert(NormalizeLevel::Lowercase);
            field.add_query_command("word");
        });
    }

    Ok(())
}

/// Exact and word fields are indexed as whole values.
pub(crate) fn exact_match(schema: &mut Schema, _: &PassContext<'_>) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();

    try_visit_fields_mut(schema, |field| {
        let match_type = field.matching.match_type;
        if !matches!(match_type, Some(MatchType::Exact | MatchType::Word)) {
            return Ok(());
        }
        if match_type == Some(MatchType::Exact) {
            field.stemming = Some(Stemming::None);
            field.normalizing.get_or_insert(NormalizeLevel::Lowercase);
            let command = format!(
                "exact {}",
                field
                    .matching
                    .exact_terminator
                    .as_deref()
                    .unwrap_or(DEFAULT_EXACT_TERMINATOR)
            );
            field.add_query_command(command);
        }
        if !field.data_type.is_string() {
            return Ok(());
        }

        let annotator = Expression::Exact {
            max_token_length: field.matching.max_token_length,
        };
        annotate_index_outputs(&schema_name, field, annotator, true)
    })
}

pub(crate) fn ngram_match(schema: &mut Schema, _: &PassContext<'_>) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();

    try_visit_fields_mut(schema, |field| {
        if field.matching.match_type != Some(MatchType::Gram) {
            return Ok(());
        }
        let size = *field.matching.gram_size.get_or_insert(DEFAULT_GRAM_SIZE);
        field.stemming = Some(Stemming::None);
        field.normalizing.get_or_insert(NormalizeLevel::Lowercase);
        field.add_query_command(format!("ngram {size}"));
        if !field.data_type.is_string() {
            return Ok(());
        }

        annotate_index_outputs(&schema_name, field, Expression::NGram(size), true)
    })
}

/// Text fields are tokenized before indexing, using the stemming settled
/// by index harmonization.
pub(crate) fn text_match(schema: &mut Schema, _: &PassContext<'_>) -> Result<(), CompileError> {
    let schema_name = schema.name.clone();

    try_visit_fields_mut(schema, |field| {
        if field.match_type() != MatchType::Text
            || !field.data_type.is_string()
            || !field.does_indexing()
        {
            return Ok(());
        }
        let stem = match field.stemming.unwrap_or_default() {
            Stemming::None => None,
            stemming => Some(stemming),
        };
        let annotator = Expression::Tokenize(TokenizeConfig {
            normalize: field.normalizing != Some(NormalizeLevel::None),
            stem,
            max_token_length: field.matching.max_token_length,
        });

        annotate_index_outputs(&schema_name, field, annotator, false)
    })
}

fn annotate_index_outputs(
    schema: &str,
    field: &mut Field,
    annotator: Expression,
    replace: bool,
) -> Result<(), CompileError> {
    let mut converter = TokenizerConverter {
        annotator,
        multi_value: field.data_type.is_multi_value(),
        replace,
        seen: false,
    };

    convert_field_script(schema, field, &mut converter)
}

///
/// TokenizerConverter
///
/// Puts `annotator` in front of the first index output of each statement
/// unless the statement already tokenizes. In replace mode, existing
/// tokenizers are swapped for the annotator.
///

#[derive(Clone)]
struct TokenizerConverter {
    annotator: Expression,
    multi_value: bool,
    replace: bool,
    seen: bool,
}

impl Converter for TokenizerConverter {
    fn should_convert(&self, exp: &Expression) -> bool {
        exp.is_tokenizer()
            || (!self.seen && exp.as_output().is_some_and(|o| o.kind == OutputKind::Index))
    }

    fn do_convert(&mut self, exp: Expression) -> Result<Option<Expression>, ExpressionError> {
        self.seen = true;
        if exp.is_tokenizer() {
            return Ok(Some(if self.replace {
                self.annotator.clone()
            } else {
                exp
            }));
        }

        let annotator = if self.multi_value {
            Expression::for_each(self.annotator.clone())
        } else {
            self.annotator.clone()
        };

        Ok(Some(Expression::Statement(vec![annotator, exp])))
    }

    fn branch(&self) -> Option<Self> {
        Some(Self {
            seen: false,
            ..self.clone()
        })
    }
}

/// Every field writing to an index must match it the same way.
pub(crate) fn match_consistency(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    let mut seen: IndexMap<String, (MatchType, &str)> = IndexMap::new();

    for field in all_fields(schema) {
        let match_type = field.match_type();
        for index in field.index_names() {
            match seen.get(&index) {
                Some((expected, owner)) if *expected != match_type => {
                    return Err(CompileError::type_consistency(
                        &schema.name,
                        format!(
                            "the match type for index '{index}' is inconsistent: field '{owner}' has {expected}, field '{}' has {match_type}",
                            field.name
                        ),
                    )
                    .with_field(&field.name));
                }
                Some(_) => {}
                None => {
                    seen.insert(index, (match_type, field.name.as_str()));
                }
            }
        }
    }

    Ok(())
}

pub(crate) fn set_rank_type_empty_on_filters(
    schema: &mut Schema,
    _: &PassContext<'_>,
) -> Result<(), CompileError> {
    for field in schema.concrete_fields_mut() {
        field.visit_mut(&mut |field: &mut Field| {
            if field.ranking.filter {
                field.rank_type = Some(RankType::Empty);
            }
        });
    }

    Ok(())
}

pub(crate) fn string_settings_on_non_string_fields(
    schema: &mut Schema,
    ctx: &PassContext<'_>,
) -> Result<(), CompileError> {
    for field in all_fields(schema) {
        if field.data_type.is_string() || (field.stemming.is_none() && field.normalizing.is_none())
        {
            continue;
        }
        ctx.warn(
            &schema.name,
            Some(&field.name),
            format!(
                "stemming and normalizing settings have no effect on a field of type {}",
                field.data_type
            ),
        );
    }

    Ok(())
}
