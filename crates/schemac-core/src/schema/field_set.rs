use schemac_types::MatchType;
use serde::{Deserialize, Serialize};

/// Name of the built-in field set holding every document field.
pub const DOCUMENT_FIELD_SET: &str = "[document]";

///
/// FieldSet
///
/// Named grouping of fields searched together.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldSet {
    pub name: String,
    pub field_names: Vec<String>,
    #[serde(default)]
    pub query_commands: Vec<String>,
    #[serde(default)]
    pub match_type: Option<MatchType>,
}

impl FieldSet {
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            field_names: field_names.into_iter().map(Into::into).collect(),
            query_commands: Vec::new(),
            match_type: None,
        }
    }

    /// Built-in sets are named in brackets.
    #[must_use]
    pub fn is_built_in(&self) -> bool {
        self.name.starts_with('[')
    }
}
