use schemac_types::{CollectionType, DataType, DistanceMetric};
use serde::{Deserialize, Serialize};

///
/// Attribute
///
/// In-memory columnar storage of one field value. At most one per
/// (field, storage name).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,

    #[serde(default)]
    pub fast_search: bool,
    #[serde(default)]
    pub fast_access: bool,
    #[serde(default)]
    pub paged: bool,
    #[serde(default)]
    pub mutable: bool,

    /// Set on the derived z-curve attribute of a geo-position field.
    #[serde(default)]
    pub is_position: bool,

    #[serde(default)]
    pub dictionary: Option<Dictionary>,
    #[serde(default)]
    pub hnsw: Option<HnswParams>,
    #[serde(default)]
    pub distance_metric: DistanceMetric,

    // predicate attributes
    #[serde(default)]
    pub arity: Option<u32>,
    #[serde(default)]
    pub lower_bound: Option<i64>,
    #[serde(default)]
    pub upper_bound: Option<i64>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            fast_search: false,
            fast_access: false,
            paged: false,
            mutable: false,
            is_position: false,
            dictionary: None,
            hnsw: None,
            distance_metric: DistanceMetric::default(),
            arity: None,
            lower_bound: None,
            upper_bound: None,
        }
    }

    #[must_use]
    pub fn collection(&self) -> CollectionType {
        self.data_type.collection_type()
    }

    /// Element type for collections, the type itself otherwise.
    #[must_use]
    pub fn basic_type(&self) -> &DataType {
        self.data_type.element_type().unwrap_or(&self.data_type)
    }

    #[must_use]
    pub fn is_single_value(&self) -> bool {
        self.collection() == CollectionType::Single
    }
}

///
/// Dictionary
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Dictionary {
    pub kind: DictionaryKind,
    #[serde(default)]
    pub cased: bool,
}

///
/// DictionaryKind
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryKind {
    #[default]
    Btree,
    Hash,
    BtreeAndHash,
}

impl DictionaryKind {
    #[must_use]
    pub const fn has_hash(self) -> bool {
        matches!(self, Self::Hash | Self::BtreeAndHash)
    }
}

///
/// HnswParams
///
/// Approximate nearest-neighbor graph settings for a tensor attribute.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HnswParams {
    pub max_links_per_node: u32,
    pub neighbors_to_explore_at_insert: u32,
    #[serde(default)]
    pub multi_threaded_indexing: bool,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_links_per_node: 16,
            neighbors_to_explore_at_insert: 200,
            multi_threaded_indexing: true,
        }
    }
}
