use crate::schema::attribute::HnswParams;
use schemac_types::Stemming;
use serde::{Deserialize, Serialize};

///
/// Index
///
/// On-disk inverted-index storage descriptor.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Index {
    pub name: String,

    #[serde(default)]
    pub prefix: bool,
    #[serde(default)]
    pub stemming: Option<Stemming>,
    #[serde(default = "default_normalized")]
    pub normalized: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub hnsw: Option<HnswParams>,
}

impl Index {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: false,
            stemming: None,
            normalized: true,
            aliases: Vec::new(),
            hnsw: None,
        }
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
    }
}

const fn default_normalized() -> bool {
    true
}
