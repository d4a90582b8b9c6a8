mod common;

use common::{compile, field, person_type, schema_with};
use schemac::prelude::*;

#[test]
fn attribute_only_text_matches_words() {
    let mut schema = schema_with(
        "music",
        [
            field("artist", DataType::String, &[OutputKind::Attribute]),
            field("year", DataType::Int, &[OutputKind::Attribute]),
        ],
    );
    compile(&mut schema).unwrap();

    let artist = schema.get_concrete_field("artist").unwrap();
    assert_eq!(artist.matching.match_type, Some(MatchType::Word));
    assert!(artist.query_commands.contains(&"word".to_string()));
    assert_eq!(
        schema.get_concrete_field("year").unwrap().matching.match_type,
        None
    );
}

#[test]
fn geo_position_expands_to_zcurve_and_derived_summaries() {
    let mut loc = field(
        "loc",
        DataType::Position,
        &[OutputKind::Attribute, OutputKind::Summary],
    );
    loc.enable_attribute().fast_search = true;
    let mut schema = schema_with("places", [loc]);
    compile(&mut schema).unwrap();

    let zcurve = schema.get_attribute("loc_zcurve").unwrap();
    assert_eq!(zcurve.data_type, DataType::Long);
    assert!(zcurve.is_position);
    assert!(zcurve.fast_search);

    let summary = |name| schema.summary_field_in("default", name).unwrap();
    assert_eq!(summary("loc.distance").data_type, Some(DataType::Int));
    assert_eq!(summary("loc.distance").transform, SummaryTransform::Distance);
    assert_eq!(
        summary("loc.position").data_type,
        Some(DataType::array(DataType::String))
    );
    assert_eq!(summary("loc.position").transform, SummaryTransform::Positions);
    assert_eq!(summary("loc").transform, SummaryTransform::GeoPos);
}

#[test]
fn struct_of_attributes_is_served_by_the_combiner() {
    let mut person = field("person", person_type(), &[OutputKind::Summary]);
    for member in ["person.name", "person.age"] {
        person.sub_field_mut(member).unwrap().enable_attribute();
    }
    let mut schema = schema_with("people", [person]);
    compile(&mut schema).unwrap();

    assert_eq!(
        schema.summary_field_in("default", "person").unwrap().transform,
        SummaryTransform::AttributeCombiner
    );
}

fn shared_index(heading_stemming: Option<Stemming>) -> Schema {
    let mut title = field("title", DataType::String, &[OutputKind::Index]);
    title.stemming = Some(Stemming::Best);
    let mut heading = Field::new("heading", DataType::String).with_indexing(Expression::statement([
        Expression::input("heading"),
        Expression::index("title"),
    ]));
    heading.stemming = heading_stemming;

    schema_with("articles", [title, heading])
}

#[test]
fn shared_index_takes_the_explicit_stemming() {
    let mut schema = shared_index(None);
    let sink = compile(&mut schema).unwrap();

    assert_eq!(
        schema.get_concrete_field("heading").unwrap().stemming,
        Some(Stemming::Best)
    );
    assert!(!sink.has_warning("conflicts"));
}

#[test]
fn conflicting_shared_index_stemming_warns() {
    let mut schema = shared_index(Some(Stemming::None));
    let sink = compile(&mut schema).unwrap();

    assert_eq!(
        schema.get_concrete_field("heading").unwrap().stemming,
        Some(Stemming::Best)
    );
    assert!(sink.has_warning("stemming 'none' conflicts with 'best'"));
}

fn campaign(budget_outputs: &[OutputKind]) -> Schema {
    schema_with("campaign", [field("budget", DataType::Int, budget_outputs)])
}

fn ad() -> Schema {
    let mut ad = schema_with(
        "ad",
        [field(
            "campaign_ref",
            DataType::Reference("campaign".into()),
            &[OutputKind::Attribute],
        )],
    );
    ad.import_field(ImportDeclaration::new("budget", "campaign_ref", "budget"));
    ad
}

#[test]
fn importing_a_non_attribute_fails() {
    let err = Application::new(PipelineOptions::default())
        .compile(vec![ad(), campaign(&[OutputKind::Summary])])
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::ShapeValidity);
    assert_eq!(err.schema, "ad");
    assert!(err.message.contains("campaign_ref.budget"));
    assert!(err.message.contains("not an attribute"));
}

#[test]
fn imported_attributes_serve_summaries() {
    let mut ad = ad();
    ad.add_summary(
        DocumentSummary::new("short").with_field(SummaryField::new("budget", None)),
    )
    .unwrap();

    let registry = Application::new(PipelineOptions::default())
        .compile(vec![ad, campaign(&[OutputKind::Attribute])])
        .unwrap();
    assert_eq!(registry.names(), vec!["campaign", "ad"]);

    let ad = registry.get("ad").unwrap();
    assert!(ad.get_attribute("budget").is_some());
    let budget = ad.summary_field_in("short", "budget").unwrap();
    assert_eq!(budget.transform, SummaryTransform::Attribute);
    assert_eq!(budget.data_type, Some(DataType::Int));
}

fn places() -> Schema {
    let mut loc = field(
        "loc",
        DataType::Position,
        &[OutputKind::Attribute, OutputKind::Summary],
    );
    loc.enable_attribute().fast_search = true;
    schema_with("places", [loc])
}

#[test]
fn named_classes_serve_positions_from_the_zcurve() {
    let mut schema = places();
    schema
        .add_summary(
            DocumentSummary::new("short")
                .with_field(SummaryField::new("loc", None))
                .with_field(SummaryField::new("where", None).with_source("loc")),
        )
        .unwrap();
    compile(&mut schema).unwrap();

    for name in ["loc", "where"] {
        let summary = schema.summary_field_in("short", name).unwrap();
        assert_eq!(summary.transform, SummaryTransform::GeoPos, "{name}");
        assert_eq!(summary.sources, vec!["loc_zcurve".to_string()], "{name}");
        assert_eq!(summary.data_type, Some(DataType::Position), "{name}");
    }
}

#[test]
fn imported_positions_serve_summaries_from_the_zcurve() {
    let mut ad = ad();
    ad.import_field(ImportDeclaration::new("my_loc", "campaign_ref", "loc"));
    ad.add_summary(DocumentSummary::new("short").with_field(SummaryField::new("my_loc", None)))
        .unwrap();
    let mut campaign = campaign(&[OutputKind::Attribute]);
    let mut loc = field("loc", DataType::Position, &[OutputKind::Attribute]);
    loc.enable_attribute().fast_search = true;
    campaign.add_field(loc).unwrap();

    let registry = Application::new(PipelineOptions::default())
        .compile(vec![ad, campaign])
        .unwrap();

    let summary = registry
        .get("ad")
        .unwrap()
        .summary_field_in("short", "my_loc")
        .unwrap();
    assert_eq!(summary.transform, SummaryTransform::GeoPos);
    assert_eq!(summary.sources, vec!["my_loc_zcurve".to_string()]);
}
