use indexmap::IndexMap;
use schemac_types::{RankType, TensorType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

///
/// RankProfile
///
/// The part of a rank profile that type propagation and rank-setting
/// propagation need. Expressions are kept as text.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RankProfile {
    pub name: String,

    /// Declared query inputs, keyed by the name inside `query(..)`.
    #[serde(default)]
    pub inputs: IndexMap<String, TensorType>,

    #[serde(default)]
    pub functions: IndexMap<String, RankFunction>,

    #[serde(default)]
    pub summary_features: Vec<String>,

    #[serde(default)]
    pub filter_fields: BTreeSet<String>,

    #[serde(default)]
    pub rank_settings: Vec<RankSetting>,

    #[serde(default)]
    pub match_phase: Option<MatchPhaseSettings>,

    #[serde(default)]
    pub diversity: Option<DiversitySettings>,

    #[serde(default)]
    pub onnx_models: IndexMap<String, OnnxModel>,

    /// Resolved feature types, keyed by feature text (`attribute(x)`,
    /// `query(q)`, `onnx(m).out`).
    #[serde(default)]
    pub feature_types: BTreeMap<String, TensorType>,
}

impl RankProfile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_function(&mut self, name: impl Into<String>, expression: impl Into<String>) {
        let name = name.into();
        self.functions.insert(
            name.clone(),
            RankFunction {
                name,
                expression: expression.into(),
                return_type: None,
            },
        );
    }

    /// Fields named by a `filter` rank setting.
    pub fn filter_settings(&self) -> impl Iterator<Item = &str> {
        self.rank_settings
            .iter()
            .filter(|s| s.kind == RankSettingKind::Filter)
            .map(|s| s.field.as_str())
    }

    #[must_use]
    pub fn has_literal_setting(&self, field: &str) -> bool {
        self.rank_settings
            .iter()
            .any(|s| s.field == field && s.kind == RankSettingKind::Literal)
    }
}

///
/// RankFunction
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RankFunction {
    pub name: String,
    pub expression: String,
    #[serde(default)]
    pub return_type: Option<TensorType>,
}

///
/// RankSetting
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RankSetting {
    pub field: String,
    pub kind: RankSettingKind,
}

///
/// RankSettingKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankSettingKind {
    Filter,
    Literal,
    RankType(RankType),
}

///
/// MatchPhaseSettings
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchPhaseSettings {
    pub attribute: String,
    #[serde(default)]
    pub ascending: bool,
    pub max_hits: u64,
}

///
/// DiversitySettings
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DiversitySettings {
    pub attribute: String,
    #[serde(default = "default_min_groups")]
    pub min_groups: u32,
}

const fn default_min_groups() -> u32 {
    1
}

///
/// OnnxModel
///
/// A model stored in the application package. Output types stay unset
/// until the model file has been inspected.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OnnxModel {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub outputs: IndexMap<String, Option<TensorType>>,
}

impl OnnxModel {
    #[must_use]
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            outputs: IndexMap::new(),
        }
    }
}
