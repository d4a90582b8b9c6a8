use derive_more::Display;
use indexmap::IndexMap;
use schemac_types::DataType;
use serde::{Deserialize, Serialize};

/// Name of the summary class every schema ends up with.
pub const DEFAULT_SUMMARY: &str = "default";

/// Summary field carrying the serialized rank features.
pub const RANK_FEATURES: &str = "rankfeatures";

/// Summary field carrying the profile's summary features.
pub const SUMMARY_FEATURES: &str = "summaryfeatures";

///
/// SummaryTransform
///
/// How a summary value is produced at serving time.
///

#[remain::sorted]
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SummaryTransform {
    #[display("attribute")]
    Attribute,
    #[display("attributecombiner")]
    AttributeCombiner,
    #[display("attribute_tokens")]
    AttributeTokens,
    #[display("bolded")]
    Bolded,
    #[display("copy")]
    Copy,
    #[display("distance")]
    Distance,
    #[display("documentid")]
    DocumentId,
    #[display("dynamicbolded")]
    DynamicBolded,
    #[display("dynamicteaser")]
    DynamicTeaser,
    #[display("geopos")]
    GeoPos,
    #[display("matched_attribute_elements_filter")]
    MatchedAttributeElementsFilter,
    #[display("matched_elements_filter")]
    MatchedElementsFilter,
    #[default]
    #[display("none")]
    None,
    #[display("positions")]
    Positions,
    #[display("rankfeatures")]
    RankFeatures,
    #[display("summaryfeatures")]
    SummaryFeatures,
    #[display("tokens")]
    Tokens,
}

impl SummaryTransform {
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    /// Query-dependent: the value is computed per query from the stored
    /// document field.
    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::Bolded | Self::DynamicBolded | Self::DynamicTeaser)
    }

    /// Served from memory without touching the document store.
    #[must_use]
    pub const fn is_in_memory(self) -> bool {
        matches!(
            self,
            Self::Attribute
                | Self::AttributeCombiner
                | Self::AttributeTokens
                | Self::Distance
                | Self::DocumentId
                | Self::GeoPos
                | Self::MatchedAttributeElementsFilter
                | Self::Positions
                | Self::RankFeatures
                | Self::SummaryFeatures
        )
    }
}

///
/// ElementsSelector
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementsSelector {
    #[default]
    All,

    /// Only elements that matched the query.
    MatchedElements,

    /// Only elements selected by the named summary feature.
    SummaryFeature(String),
}

///
/// SummaryField
///
/// A named output slot of one or more summary classes. An empty `sources`
/// list means the source is the equally named field.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SummaryField {
    pub name: String,

    /// `None` until resolved from the source.
    #[serde(default)]
    pub data_type: Option<DataType>,

    #[serde(default)]
    pub transform: SummaryTransform,
    #[serde(default)]
    pub sources: Vec<String>,

    /// Summary classes this field goes to; empty means the default class.
    #[serde(default)]
    pub destinations: Vec<String>,

    #[serde(default)]
    pub elements: ElementsSelector,

    /// Derived rather than declared by the user.
    #[serde(default)]
    pub implicit: bool,
}

impl SummaryField {
    /// A user-declared summary field.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: Option<DataType>) -> Self {
        Self {
            name: name.into(),
            data_type,
            transform: SummaryTransform::None,
            sources: Vec::new(),
            destinations: Vec::new(),
            elements: ElementsSelector::All,
            implicit: false,
        }
    }

    /// A derived summary field.
    #[must_use]
    pub fn implicit(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            implicit: true,
            ..Self::new(name, Some(data_type))
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: SummaryTransform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    #[must_use]
    pub fn with_destination(mut self, class: impl Into<String>) -> Self {
        self.destinations.push(class.into());
        self
    }

    /// Source names, defaulting to the summary field's own name.
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        if self.sources.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.sources.iter().map(String::as_str).collect()
        }
    }

    /// The source when there is exactly one.
    #[must_use]
    pub fn single_source(&self) -> Option<&str> {
        match self.sources.as_slice() {
            [] => Some(self.name.as_str()),
            [source] => Some(source.as_str()),
            _ => None,
        }
    }

    /// Has an explicitly declared single source with a different name.
    #[must_use]
    pub fn has_renamed_source(&self) -> bool {
        matches!(self.sources.as_slice(), [source] if *source != self.name)
    }

    /// Destination classes, with the empty list meaning the default class.
    #[must_use]
    pub fn destination_classes(&self) -> Vec<&str> {
        if self.destinations.is_empty() {
            vec![DEFAULT_SUMMARY]
        } else {
            self.destinations.iter().map(String::as_str).collect()
        }
    }
}

///
/// DocumentSummary
///
/// A named summary class.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub name: String,
    #[serde(default)]
    pub fields: IndexMap<String, SummaryField>,
    #[serde(default)]
    pub inherits: Option<String>,
    #[serde(default)]
    pub from_disk: bool,
    #[serde(default)]
    pub omit_summary_features: bool,
}

impl DocumentSummary {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            inherits: None,
            from_disk: false,
            omit_summary_features: false,
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: SummaryField) -> Self {
        self.add(field);
        self
    }

    /// Add a field; an existing entry with the same name wins.
    pub fn add(&mut self, field: SummaryField) {
        self.fields.entry(field.name.clone()).or_insert(field);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SummaryField> {
        self.fields.get(name)
    }

    /// Drop implicit fields that another field of this class reads from.
    /// Such fields were only added as sources.
    pub fn purge_implicits(&mut self) {
        let used_as_source: Vec<String> = self
            .fields
            .values()
            .filter(|f| f.has_renamed_source())
            .flat_map(|f| f.sources.iter().cloned())
            .collect();

        self.fields
            .retain(|name, field| !(field.implicit && used_as_source.contains(name)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_classification() {
        assert!(SummaryTransform::DynamicTeaser.is_dynamic());
        assert!(!SummaryTransform::DynamicTeaser.is_in_memory());
        assert!(SummaryTransform::Attribute.is_in_memory());
        assert!(!SummaryTransform::Copy.is_in_memory());
        assert!(SummaryTransform::default().is_none());
    }

    #[test]
    fn sources_default_to_own_name() {
        let field = SummaryField::new("title", None);
        assert_eq!(field.source_names(), vec!["title"]);
        assert_eq!(field.single_source(), Some("title"));
        assert!(!field.has_renamed_source());

        let field = SummaryField::new("short", None).with_source("title");
        assert_eq!(field.single_source(), Some("title"));
        assert!(field.has_renamed_source());

        let field = field.with_source("body");
        assert_eq!(field.single_source(), None);
        assert_eq!(field.destination_classes(), vec![DEFAULT_SUMMARY]);
    }

    #[test]
    fn purge_drops_implicit_sources_only() {
        let mut summary = DocumentSummary::new("short")
            .with_field(SummaryField::implicit("title", DataType::String))
            .with_field(SummaryField::implicit("body", DataType::String))
            .with_field(SummaryField::new("teaser", None).with_source("title"));

        summary.purge_implicits();

        assert_eq!(
            summary.fields.keys().collect::<Vec<_>>(),
            vec!["body", "teaser"]
        );
    }
}
