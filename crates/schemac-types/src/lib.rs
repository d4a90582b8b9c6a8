//! Type vocabulary shared by the indexing-expression language and the schema
//! graph: declared data types, tensor types, and the closed per-field setting
//! enums.

pub mod data_type;
pub mod settings;
pub mod tensor;

pub use data_type::{CollectionType, DataType, StructField, StructType, WeightedSetType};
pub use settings::{DistanceMetric, MatchAlgorithm, MatchType, NormalizeLevel, RankType, Stemming};
pub use tensor::{DimensionKind, TensorDimension, TensorType, TensorTypeError, TensorValueType};

/// Name of the summary field carrying the document id.
pub const DOCUMENT_ID_FIELD: &str = "documentid";

/// Suffix of the derived sort-key attribute of a geo-position field.
pub const ZCURVE_SUFFIX: &str = "_zcurve";

/// Name of the derived z-curve attribute for a geo-position field.
#[must_use]
pub fn zcurve_field_name(field: &str) -> String {
    format!("{field}{ZCURVE_SUFFIX}")
}

/// Name of the derived distance summary field for a geo-position field.
#[must_use]
pub fn position_distance_summary(field: &str) -> String {
    format!("{field}.distance")
}

/// Name of the derived positions summary field for a geo-position field.
#[must_use]
pub fn position_positions_summary(field: &str) -> String {
    format!("{field}.position")
}
