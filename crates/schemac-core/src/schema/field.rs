use crate::schema::{
    attribute::{Attribute, Dictionary},
    index::Index,
    summary::SummaryField,
};
use indexmap::IndexMap;
use schemac_expr::{Expression, OutputKind};
use schemac_types::{DataType, MatchAlgorithm, MatchType, NormalizeLevel, RankType, Stemming};
use serde::{Deserialize, Serialize};

///
/// Field
///
/// A named, typed value slot. Storage roles (attribute, index, summary) are
/// registered as descriptors on the field; the indexing script routes the
/// value into them. `Option` settings mean "not explicitly set".
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,

    #[serde(default)]
    pub indexing: Option<Expression>,

    #[serde(default)]
    pub matching: Matching,
    #[serde(default)]
    pub stemming: Option<Stemming>,
    #[serde(default)]
    pub normalizing: Option<NormalizeLevel>,
    #[serde(default)]
    pub rank_type: Option<RankType>,
    #[serde(default)]
    pub ranking: Ranking,
    #[serde(default)]
    pub query_commands: Vec<String>,

    /// Alias name to the index it names.
    #[serde(default)]
    pub aliases: IndexMap<String, String>,

    #[serde(default)]
    pub bolding: bool,
    #[serde(default)]
    pub dictionary: Option<Dictionary>,

    /// Struct, map and position members, keyed by full dotted name.
    #[serde(default)]
    pub struct_fields: IndexMap<String, Self>,

    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,
    #[serde(default)]
    pub indices: IndexMap<String, Index>,
    #[serde(default)]
    pub summary_fields: IndexMap<String, SummaryField>,

    #[serde(default)]
    pub is_extra_field: bool,
    #[serde(default)]
    pub is_imported_field: bool,
}

impl Field {
    /// New field with its sub-fields derived from the type.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        let struct_fields = sub_fields(&name, &data_type);

        Self {
            name,
            data_type,
            indexing: None,
            matching: Matching::default(),
            stemming: None,
            normalizing: None,
            rank_type: None,
            ranking: Ranking::default(),
            query_commands: Vec::new(),
            aliases: IndexMap::new(),
            bolding: false,
            dictionary: None,
            struct_fields,
            attributes: IndexMap::new(),
            indices: IndexMap::new(),
            summary_fields: IndexMap::new(),
            is_extra_field: false,
            is_imported_field: false,
        }
    }

    #[must_use]
    pub fn with_indexing(mut self, script: Expression) -> Self {
        self.set_indexing(script);
        self
    }

    /// Install a script and register a storage descriptor for every output
    /// that targets this field, named or not.
    pub fn set_indexing(&mut self, script: Expression) {
        let script = match script {
            Expression::Script(_) => script,
            other => Expression::script([other]),
        };

        let name = self.name.clone();
        for output in script.outputs() {
            if output.field.as_deref().is_some_and(|target| target != name) {
                continue;
            }
            match output.kind {
                OutputKind::Attribute => {
                    self.enable_attribute();
                }
                OutputKind::Index => {
                    self.indices
                        .entry(name.clone())
                        .or_insert_with(|| Index::new(&name));
                }
                OutputKind::Summary => {
                    let data_type = self.data_type.clone();
                    self.summary_fields
                        .entry(name.clone())
                        .or_insert_with(|| SummaryField::implicit(&name, data_type));
                }
            }
        }

        self.indexing = Some(script);
    }

    /// The attribute named after this field, created on first use.
    pub fn enable_attribute(&mut self) -> &mut Attribute {
        let data_type = self.data_type.clone();
        self.attributes
            .entry(self.name.clone())
            .or_insert_with_key(|name| Attribute::new(name, data_type))
    }

    #[must_use]
    pub fn attribute(&self) -> Option<&Attribute> {
        self.attributes.get(&self.name)
    }

    /// Writes to an attribute, through a descriptor or the script.
    #[must_use]
    pub fn does_attributing(&self) -> bool {
        !self.attributes.is_empty() || self.script_has(OutputKind::Attribute)
    }

    #[must_use]
    pub fn does_indexing(&self) -> bool {
        !self.indices.is_empty() || self.script_has(OutputKind::Index)
    }

    #[must_use]
    pub fn does_summarying(&self) -> bool {
        !self.summary_fields.is_empty() || self.script_has(OutputKind::Summary)
    }

    fn script_has(&self, kind: OutputKind) -> bool {
        self.indexing.as_ref().is_some_and(|s| s.has_output(kind))
    }

    /// Every index this field writes to, in first-seen order.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.keys().cloned().collect();
        if let Some(script) = &self.indexing {
            for target in script.output_fields(OutputKind::Index) {
                if !names.iter().any(|n| n == target) {
                    names.push(target.to_string());
                }
            }
        }

        names
    }

    /// Effective match type.
    #[must_use]
    pub fn match_type(&self) -> MatchType {
        self.matching.match_type.unwrap_or_default()
    }

    pub fn add_query_command(&mut self, command: impl Into<String>) {
        let command = command.into();
        if !self.query_commands.contains(&command) {
            self.query_commands.push(command);
        }
    }

    /// Sub-field by full dotted name, at any depth.
    #[must_use]
    pub fn sub_field(&self, full_name: &str) -> Option<&Self> {
        if let Some(field) = self.struct_fields.get(full_name) {
            return Some(field);
        }

        self.struct_fields
            .values()
            .filter(|sub| is_path_prefix(&sub.name, full_name))
            .find_map(|sub| sub.sub_field(full_name))
    }

    pub fn sub_field_mut(&mut self, full_name: &str) -> Option<&mut Self> {
        if self.struct_fields.contains_key(full_name) {
            return self.struct_fields.get_mut(full_name);
        }

        self.struct_fields
            .values_mut()
            .filter(|sub| is_path_prefix(&sub.name, full_name))
            .find_map(|sub| sub.sub_field_mut(full_name))
    }

    /// Sub-fields with no members of their own.
    #[must_use]
    pub fn leaf_sub_fields(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        for sub in self.struct_fields.values() {
            if sub.struct_fields.is_empty() {
                out.push(sub);
            } else {
                out.extend(sub.leaf_sub_fields());
            }
        }

        out
    }

    /// Complex field whose every leaf member is stored as an attribute.
    #[must_use]
    pub fn has_only_attribute_leaves(&self) -> bool {
        let leaves = self.leaf_sub_fields();

        !leaves.is_empty() && leaves.iter().all(|leaf| leaf.attribute().is_some())
    }

    /// Apply `f` to this field and every sub-field, parents first.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Self)) {
        f(self);
        for sub in self.struct_fields.values_mut() {
            sub.visit_mut(f);
        }
    }
}

fn is_path_prefix(prefix: &str, full_name: &str) -> bool {
    full_name
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.'))
}

// Members of struct, position and map types. Members reached through an
// array or map carry the collection's shape.
fn sub_fields(parent: &str, data_type: &DataType) -> IndexMap<String, Field> {
    let (inner, multi) = match data_type {
        DataType::Array(element) => (element.as_ref(), true),
        other => (other, false),
    };

    let members: Vec<(String, DataType)> = match inner {
        DataType::Struct(_) | DataType::Position => inner
            .struct_fields()
            .into_iter()
            .map(|member| (member.name, member.data_type))
            .collect(),
        DataType::Map { key, value } => vec![
            ("key".to_string(), (**key).clone()),
            ("value".to_string(), (**value).clone()),
        ],
        _ => Vec::new(),
    };
    let multi = multi || matches!(inner, DataType::Map { .. });

    members
        .into_iter()
        .map(|(member, member_type)| {
            let full = format!("{parent}.{member}");
            let member_type = if multi {
                DataType::array(member_type)
            } else {
                member_type
            };

            (full.clone(), Field::new(full, member_type))
        })
        .collect()
}

///
/// Matching
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Matching {
    #[serde(default)]
    pub match_type: Option<MatchType>,
    #[serde(default)]
    pub algorithm: MatchAlgorithm,
    #[serde(default)]
    pub gram_size: Option<u32>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub max_token_length: Option<u32>,
    #[serde(default)]
    pub exact_terminator: Option<String>,
    #[serde(default)]
    pub cased: bool,
}

///
/// Ranking
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Ranking {
    #[serde(default)]
    pub filter: bool,
    #[serde(default)]
    pub literal: bool,
}
