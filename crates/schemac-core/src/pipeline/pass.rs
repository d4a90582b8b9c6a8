use crate::{
    error::CompileError,
    pipeline::PassContext,
    processing::{
        attribute, document, field_set, field_type, harmonizer, imported, index, indexing,
        matching, position, rank, summary, summary_transform,
    },
    schema::Schema,
};
use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};

///
/// PassId
///
/// The closed set of compilation passes. Declaration order is execution
/// order, and that order is part of the contract: later passes rely on what
/// earlier ones derived.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    FromStr,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum PassId {
    SchemaMustHaveDocument,
    FieldNameLegality,
    ReservedDocumentNames,
    UrlFieldValidator,
    BuiltInFieldSets,
    ImportedFieldsResolver,
    TagType,
    IntegerIndexToAttribute,
    MakeAliases,
    UriHack,
    LiteralBoost,
    ValidateFieldTypes,
    IndexingInputs,
    OptimizeIndexingScripts,
    ValidateFieldWithIndexSettingsCreatesIndex,
    AttributesImplicitWord,
    CreatePositionZCurve,
    DictionaryProcessor,
    ImplicitSummaries,
    ImplicitSummaryFields,
    MakeDefaultSummaryTheSuperSet,
    Bolding,
    SummaryDynamicStructsArrays,
    AdjustPositionSummaryFields,
    MatchedElementsOnlyResolver,
    SummaryConsistency,
    SummaryNamesFieldCollisions,
    SummaryFieldsMustHaveValidSource,
    StringSettingsOnNonStringFields,
    IndexingOutputs,
    SetRankTypeEmptyOnFilters,
    WordMatch,
    ExactMatch,
    NGramMatch,
    MultifieldIndexHarmonizer,
    TextMatch,
    MatchConsistency,
    FilterFieldNames,
    SummaryDiskAccessValidator,
    DisallowComplexMapAndWsetKeyTypes,
    FieldSetSettings,
    AddExtraFieldsToDocument,
    PredicateProcessor,
    TensorFieldProcessor,
    ReferenceFieldsProcessor,
    FastAccessValidator,
    BoolAttributeValidator,
    PagedAttributeValidator,
    MatchPhaseSettingsValidator,
    DiversitySettingsValidator,
    RankProfileTypeSettings,
    ReservedFunctionNames,
    OnnxModelTypeResolver,
    RankingExpressionTypeResolver,
    IndexingValidation,
    IndexingValues,
}

impl PassId {
    /// Every pass, in execution order.
    pub const ALL: [Self; 56] = [
        Self::SchemaMustHaveDocument,
        Self::FieldNameLegality,
        Self::ReservedDocumentNames,
        Self::UrlFieldValidator,
        Self::BuiltInFieldSets,
        Self::ImportedFieldsResolver,
        Self::TagType,
        Self::IntegerIndexToAttribute,
        Self::MakeAliases,
        Self::UriHack,
        Self::LiteralBoost,
        Self::ValidateFieldTypes,
        Self::IndexingInputs,
        Self::OptimizeIndexingScripts,
        Self::ValidateFieldWithIndexSettingsCreatesIndex,
        Self::AttributesImplicitWord,
        Self::CreatePositionZCurve,
        Self::DictionaryProcessor,
        Self::ImplicitSummaries,
        Self::ImplicitSummaryFields,
        Self::MakeDefaultSummaryTheSuperSet,
        Self::Bolding,
        Self::SummaryDynamicStructsArrays,
        Self::AdjustPositionSummaryFields,
        Self::MatchedElementsOnlyResolver,
        Self::SummaryConsistency,
        Self::SummaryNamesFieldCollisions,
        Self::SummaryFieldsMustHaveValidSource,
        Self::StringSettingsOnNonStringFields,
        Self::IndexingOutputs,
        Self::SetRankTypeEmptyOnFilters,
        Self::WordMatch,
        Self::ExactMatch,
        Self::NGramMatch,
        Self::MultifieldIndexHarmonizer,
        Self::TextMatch,
        Self::MatchConsistency,
        Self::FilterFieldNames,
        Self::SummaryDiskAccessValidator,
        Self::DisallowComplexMapAndWsetKeyTypes,
        Self::FieldSetSettings,
        Self::AddExtraFieldsToDocument,
        Self::PredicateProcessor,
        Self::TensorFieldProcessor,
        Self::ReferenceFieldsProcessor,
        Self::FastAccessValidator,
        Self::BoolAttributeValidator,
        Self::PagedAttributeValidator,
        Self::MatchPhaseSettingsValidator,
        Self::DiversitySettingsValidator,
        Self::RankProfileTypeSettings,
        Self::ReservedFunctionNames,
        Self::OnnxModelTypeResolver,
        Self::RankingExpressionTypeResolver,
        Self::IndexingValidation,
        Self::IndexingValues,
    ];

    /// Needed to derive the document type; runs in documents-only mode.
    #[must_use]
    pub const fn is_document_pass(self) -> bool {
        !matches!(
            self,
            Self::FilterFieldNames
                | Self::MatchPhaseSettingsValidator
                | Self::DiversitySettingsValidator
                | Self::RankProfileTypeSettings
                | Self::ReservedFunctionNames
                | Self::OnnxModelTypeResolver
                | Self::RankingExpressionTypeResolver
        )
    }

    /// Pure check; skipped entirely when not validating.
    #[must_use]
    pub const fn is_check(self) -> bool {
        matches!(
            self,
            Self::SchemaMustHaveDocument
                | Self::FieldNameLegality
                | Self::ReservedDocumentNames
                | Self::UrlFieldValidator
                | Self::ValidateFieldTypes
                | Self::ValidateFieldWithIndexSettingsCreatesIndex
                | Self::SummaryNamesFieldCollisions
                | Self::SummaryFieldsMustHaveValidSource
                | Self::MatchConsistency
                | Self::DisallowComplexMapAndWsetKeyTypes
                | Self::FastAccessValidator
                | Self::BoolAttributeValidator
                | Self::PagedAttributeValidator
                | Self::MatchPhaseSettingsValidator
                | Self::DiversitySettingsValidator
                | Self::IndexingValidation
                | Self::IndexingValues
        )
    }

    /// Member of the group re-run by rank-profile reprocessing.
    #[must_use]
    pub const fn is_rank_profile_pass(self) -> bool {
        matches!(
            self,
            Self::FilterFieldNames
                | Self::MatchPhaseSettingsValidator
                | Self::DiversitySettingsValidator
                | Self::RankProfileTypeSettings
                | Self::ReservedFunctionNames
                | Self::OnnxModelTypeResolver
                | Self::RankingExpressionTypeResolver
        )
    }

    pub(crate) fn run(self, schema: &mut Schema, ctx: &PassContext<'_>) -> Result<(), CompileError> {
        match self {
            Self::SchemaMustHaveDocument => document::schema_must_have_document(schema, ctx),
            Self::FieldNameLegality => document::field_name_legality(schema, ctx),
            Self::ReservedDocumentNames => document::reserved_document_names(schema, ctx),
            Self::UrlFieldValidator => document::url_field_validator(schema, ctx),
            Self::BuiltInFieldSets => document::built_in_field_sets(schema, ctx),
            Self::ImportedFieldsResolver => imported::resolve_imported_fields(schema, ctx),
            Self::TagType => field_type::tag_type(schema, ctx),
            Self::IntegerIndexToAttribute => field_type::integer_index_to_attribute(schema, ctx),
            Self::MakeAliases => index::make_aliases(schema, ctx),
            Self::UriHack => index::uri_hack(schema, ctx),
            Self::LiteralBoost => index::literal_boost(schema, ctx),
            Self::ValidateFieldTypes => field_type::validate_field_types(schema, ctx),
            Self::IndexingInputs => indexing::indexing_inputs(schema, ctx),
            Self::OptimizeIndexingScripts => indexing::optimize_indexing_scripts(schema, ctx),
            Self::ValidateFieldWithIndexSettingsCreatesIndex => {
                index::validate_field_with_index_settings_creates_index(schema, ctx)
            }
            Self::AttributesImplicitWord => matching::attributes_implicit_word(schema, ctx),
            Self::CreatePositionZCurve => position::create_position_zcurve(schema, ctx),
            Self::DictionaryProcessor => attribute::dictionary_processor(schema, ctx),
            Self::ImplicitSummaries => summary::implicit_summaries(schema, ctx),
            Self::ImplicitSummaryFields => summary::implicit_summary_fields(schema, ctx),
            Self::MakeDefaultSummaryTheSuperSet => {
                summary::make_default_summary_the_superset(schema, ctx)
            }
            Self::Bolding => summary::bolding(schema, ctx),
            Self::SummaryDynamicStructsArrays => {
                summary::summary_dynamic_structs_arrays(schema, ctx)
            }
            Self::AdjustPositionSummaryFields => {
                position::adjust_position_summary_fields(schema, ctx)
            }
            Self::MatchedElementsOnlyResolver => {
                summary_transform::matched_elements_only_resolver(schema, ctx)
            }
            Self::SummaryConsistency => summary_transform::summary_consistency(schema, ctx),
            Self::SummaryNamesFieldCollisions => {
                summary::summary_names_field_collisions(schema, ctx)
            }
            Self::SummaryFieldsMustHaveValidSource => {
                summary::summary_fields_must_have_valid_source(schema, ctx)
            }
            Self::StringSettingsOnNonStringFields => {
                matching::string_settings_on_non_string_fields(schema, ctx)
            }
            Self::IndexingOutputs => indexing::indexing_outputs(schema, ctx),
            Self::SetRankTypeEmptyOnFilters => {
                matching::set_rank_type_empty_on_filters(schema, ctx)
            }
            Self::WordMatch => matching::word_match(schema, ctx),
            Self::ExactMatch => matching::exact_match(schema, ctx),
            Self::NGramMatch => matching::ngram_match(schema, ctx),
            Self::MultifieldIndexHarmonizer => harmonizer::harmonize_multifield_indices(schema, ctx),
            Self::TextMatch => matching::text_match(schema, ctx),
            Self::MatchConsistency => matching::match_consistency(schema, ctx),
            Self::FilterFieldNames => rank::filter_field_names(schema, ctx),
            Self::SummaryDiskAccessValidator => summary::summary_disk_access_validator(schema, ctx),
            Self::DisallowComplexMapAndWsetKeyTypes => {
                field_type::disallow_complex_map_and_wset_key_types(schema, ctx)
            }
            Self::FieldSetSettings => field_set::field_set_settings(schema, ctx),
            Self::AddExtraFieldsToDocument => document::add_extra_fields_to_document(schema, ctx),
            Self::PredicateProcessor => field_type::predicate_processor(schema, ctx),
            Self::TensorFieldProcessor => field_type::tensor_field_processor(schema, ctx),
            Self::ReferenceFieldsProcessor => field_type::reference_fields_processor(schema, ctx),
            Self::FastAccessValidator => attribute::fast_access_validator(schema, ctx),
            Self::BoolAttributeValidator => attribute::bool_attribute_validator(schema, ctx),
            Self::PagedAttributeValidator => attribute::paged_attribute_validator(schema, ctx),
            Self::MatchPhaseSettingsValidator => rank::match_phase_settings_validator(schema, ctx),
            Self::DiversitySettingsValidator => rank::diversity_settings_validator(schema, ctx),
            Self::RankProfileTypeSettings => rank::rank_profile_type_settings(schema, ctx),
            Self::ReservedFunctionNames => rank::reserved_function_names(schema, ctx),
            Self::OnnxModelTypeResolver => rank::onnx_model_type_resolver(schema, ctx),
            Self::RankingExpressionTypeResolver => {
                rank::ranking_expression_type_resolver(schema, ctx)
            }
            Self::IndexingValidation => indexing::indexing_validation(schema, ctx),
            Self::IndexingValues => indexing::indexing_values(schema, ctx),
        }
    }
}
