use derive_more::Display;
use schemac_types::{DataType, Stemming};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Indexing Expression AST
///
/// A field's indexing script routes the field value through zero or more
/// transforms into attribute, index and summary outputs. Trees are values:
/// every rewrite produces a new tree that replaces the old script wholesale.
///
/// Shape contract:
/// - `Script` holds `Statement`s, evaluated independently
/// - `Statement` is a flat pipeline; nested statements are spliced on rewrite
/// - `ForEach` applies its inner expression to each collection element
///

///
/// OutputKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[display("attribute")]
    Attribute,
    #[display("index")]
    Index,
    #[display("summary")]
    Summary,
}

///
/// OutputExpression
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct OutputExpression {
    pub kind: OutputKind,

    /// Target name; `None` until output defaulting fills in the owning field.
    pub field: Option<String>,
}

impl OutputExpression {
    #[must_use]
    pub fn targets(&self, kind: OutputKind, field: &str) -> bool {
        self.kind == kind && self.field.as_deref() == Some(field)
    }
}

///
/// Constant
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Constant {
    Bool(bool),
    Long(i64),
    String(String),
}

impl Constant {
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Long(_) => DataType::Long,
            Self::String(_) => DataType::String,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}L"),
            Self::String(value) => write!(f, "\"{value}\""),
        }
    }
}

///
/// TokenizeConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TokenizeConfig {
    pub normalize: bool,
    pub stem: Option<Stemming>,
    pub max_token_length: Option<u32>,
}

impl fmt::Display for TokenizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.normalize {
            f.write_str(" normalize")?;
        }
        if let Some(stem) = self.stem {
            write!(f, " stem:\"{stem}\"")?;
        }
        if let Some(max) = self.max_token_length {
            write!(f, " max-token-length:{max}")?;
        }

        Ok(())
    }
}

///
/// Expression
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Expression {
    Input(Option<String>),
    Output(OutputExpression),
    Statement(Vec<Self>),
    Script(Vec<Self>),
    ForEach(Box<Self>),
    SetValue(Constant),
    SetVar(String),
    GetVar(String),

    // transforms
    Exact { max_token_length: Option<u32> },
    NGram(u32),
    Tokenize(TokenizeConfig),
    ZCurve,
    OptimizePredicate,
    Lowercase,
    Normalize,
    ToPosition,
    ToLong,
    ToInt,
    ToString,
    ToArray,
    Flatten,
}

impl Expression {
    #[must_use]
    pub fn input(field: impl Into<String>) -> Self {
        Self::Input(Some(field.into()))
    }

    #[must_use]
    pub fn output(kind: OutputKind, field: impl Into<String>) -> Self {
        Self::Output(OutputExpression {
            kind,
            field: Some(field.into()),
        })
    }

    #[must_use]
    pub fn attribute(field: impl Into<String>) -> Self {
        Self::output(OutputKind::Attribute, field)
    }

    #[must_use]
    pub fn index(field: impl Into<String>) -> Self {
        Self::output(OutputKind::Index, field)
    }

    #[must_use]
    pub fn summary(field: impl Into<String>) -> Self {
        Self::output(OutputKind::Summary, field)
    }

    /// An output whose target is filled in later by output defaulting.
    #[must_use]
    pub const fn unnamed_output(kind: OutputKind) -> Self {
        Self::Output(OutputExpression { kind, field: None })
    }

    #[must_use]
    pub fn statement(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Statement(children.into_iter().collect())
    }

    /// Build a script; non-statement children are wrapped in a statement.
    #[must_use]
    pub fn script(statements: impl IntoIterator<Item = Self>) -> Self {
        Self::Script(
            statements
                .into_iter()
                .map(|s| match s {
                    Self::Statement(_) => s,
                    other => Self::Statement(vec![other]),
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn for_each(inner: Self) -> Self {
        Self::ForEach(Box::new(inner))
    }

    #[must_use]
    pub const fn tokenize(normalize: bool, stem: Option<Stemming>) -> Self {
        Self::Tokenize(TokenizeConfig {
            normalize,
            stem,
            max_token_length: None,
        })
    }

    /// Statements of a script, or an empty slice for any other node.
    #[must_use]
    pub fn statements(&self) -> &[Self] {
        match self {
            Self::Script(statements) => statements,
            _ => &[],
        }
    }

    /// Direct children of a branching node.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Script(children) | Self::Statement(children) => children,
            Self::ForEach(inner) => std::slice::from_ref(&**inner),
            _ => &[],
        }
    }

    #[must_use]
    pub const fn as_output(&self) -> Option<&OutputExpression> {
        match self {
            Self::Output(output) => Some(output),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    /// Transforms that tokenize or otherwise annotate text for an index.
    #[must_use]
    pub const fn is_tokenizer(&self) -> bool {
        matches!(self, Self::Tokenize(_) | Self::Exact { .. } | Self::NGram(_))
    }

    /// Type the node requires as input, for nodes that constrain it.
    #[must_use]
    pub const fn required_input_type(&self) -> Option<DataType> {
        match self {
            Self::Exact { .. }
            | Self::NGram(_)
            | Self::Tokenize(_)
            | Self::Lowercase
            | Self::Normalize
            | Self::Flatten
            | Self::ToPosition => Some(DataType::String),
            Self::ZCurve => Some(DataType::Position),
            Self::OptimizePredicate => Some(DataType::Predicate),
            _ => None,
        }
    }

    /// Type the node produces, for nodes whose output does not depend on
    /// their input or on context.
    #[must_use]
    pub const fn created_output_type(&self) -> Option<DataType> {
        match self {
            Self::Exact { .. }
            | Self::NGram(_)
            | Self::Tokenize(_)
            | Self::Lowercase
            | Self::Normalize
            | Self::Flatten
            | Self::ToString => Some(DataType::String),
            Self::ZCurve | Self::ToLong => Some(DataType::Long),
            Self::ToInt => Some(DataType::Int),
            Self::ToPosition => Some(DataType::Position),
            Self::OptimizePredicate => Some(DataType::Predicate),
            Self::SetValue(constant) => Some(constant.data_type()),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(Some(field)) => write!(f, "input {field}"),
            Self::Input(None) => f.write_str("input"),
            Self::Output(OutputExpression {
                kind,
                field: Some(field),
            }) => write!(f, "{kind} {field}"),
            Self::Output(OutputExpression { kind, field: None }) => write!(f, "{kind}"),
            Self::Statement(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            Self::Script(statements) => {
                f.write_str("{ ")?;
                for statement in statements {
                    write!(f, "{statement}; ")?;
                }
                f.write_str("}")
            }
            Self::ForEach(inner) => write!(f, "for_each {{ {inner} }}"),
            Self::SetValue(constant) => write!(f, "{constant}"),
            Self::SetVar(name) => write!(f, "set_var {name}"),
            Self::GetVar(name) => write!(f, "get_var {name}"),
            Self::Exact {
                max_token_length: Some(max),
            } => write!(f, "exact max-token-length:{max}"),
            Self::Exact {
                max_token_length: None,
            } => f.write_str("exact"),
            Self::NGram(size) => write!(f, "ngram {size}"),
            Self::Tokenize(config) => write!(f, "tokenize{config}"),
            Self::ZCurve => f.write_str("zcurve"),
            Self::OptimizePredicate => f.write_str("optimize_predicate"),
            Self::Lowercase => f.write_str("lowercase"),
            Self::Normalize => f.write_str("normalize"),
            Self::ToPosition => f.write_str("to_pos"),
            Self::ToLong => f.write_str("to_long"),
            Self::ToInt => f.write_str("to_int"),
            Self::ToString => f.write_str("to_string"),
            Self::ToArray => f.write_str("to_array"),
            Self::Flatten => f.write_str("flatten"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_indexing_language() {
        let script = Expression::script([
            Expression::statement([
                Expression::input("title"),
                Expression::tokenize(true, Some(Stemming::Best)),
                Expression::index("title"),
                Expression::summary("title"),
            ]),
            Expression::statement([
                Expression::input("tags"),
                Expression::for_each(Expression::Exact {
                    max_token_length: None,
                }),
                Expression::attribute("tags"),
            ]),
        ]);

        assert_eq!(
            script.to_string(),
            "{ input title | tokenize normalize stem:\"best\" | index title | summary title; \
             input tags | for_each { exact } | attribute tags; }"
        );
    }

    #[test]
    fn script_wraps_bare_children_in_statements() {
        let script = Expression::script([Expression::attribute("a")]);

        assert_eq!(
            script.statements(),
            &[Expression::statement([Expression::attribute("a")])]
        );
    }

    #[test]
    fn leaf_types_are_declared() {
        assert_eq!(Expression::ZCurve.required_input_type(), Some(DataType::Position));
        assert_eq!(Expression::ZCurve.created_output_type(), Some(DataType::Long));
        assert_eq!(Expression::NGram(2).created_output_type(), Some(DataType::String));
        assert_eq!(Expression::input("a").created_output_type(), None);
        assert_eq!(
            Expression::SetValue(Constant::Long(3)).created_output_type(),
            Some(DataType::Long)
        );
    }
}
