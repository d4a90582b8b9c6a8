use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// MatchType
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    #[display("text")]
    Text,
    #[display("word")]
    Word,
    #[display("exact")]
    Exact,
    #[display("gram")]
    Gram,
}

///
/// MatchAlgorithm
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchAlgorithm {
    #[default]
    #[display("normal")]
    Normal,
    #[display("prefix")]
    Prefix,
    #[display("substring")]
    Substring,
    #[display("suffix")]
    Suffix,
}

///
/// Stemming
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stemming {
    #[display("none")]
    None,
    #[default]
    #[display("best")]
    Best,
    #[display("shortest")]
    Shortest,
    #[display("multiple")]
    Multiple,
}

///
/// NormalizeLevel
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeLevel {
    #[display("none")]
    None,
    #[display("lowercase")]
    Lowercase,
    #[default]
    #[display("accent")]
    Accent,
    #[display("codepoint")]
    Codepoint,
}

///
/// RankType
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankType {
    #[default]
    #[display("default")]
    Default,
    #[display("about")]
    About,
    #[display("identity")]
    Identity,
    #[display("tags")]
    Tags,
    #[display("empty")]
    Empty,
}

///
/// DistanceMetric
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    #[display("euclidean")]
    Euclidean,
    #[display("angular")]
    Angular,
    #[display("dotproduct")]
    DotProduct,
    #[display("geodegrees")]
    GeoDegrees,
    #[display("hamming")]
    Hamming,
    #[display("innerproduct")]
    InnerProduct,
    #[display("prenormalized-angular")]
    PrenormalizedAngular,
}
