//! Visibility projector: visible rows under expansion state, and the
//! filtered search view.

use rstest::{fixture, rstest};

use bomtree::domain::{
    fields, project, project_filtered, BomDocument, BomNode, ExpansionState, FieldFilter, NodeId,
};
use bomtree::util::testing::{self, sample_document, SampleIds};

#[fixture]
fn sample() -> (BomDocument, SampleIds) {
    testing::init_test_setup();
    sample_document()
}

fn numbers<'a>(nodes: impl IntoIterator<Item = &'a BomNode>) -> Vec<String> {
    nodes
        .into_iter()
        .map(|n| n.label(fields::PART_NUMBER))
        .collect()
}

#[rstest]
fn given_nothing_expanded_when_project_then_only_roots_in_order(sample: (BomDocument, SampleIds)) {
    let (doc, _) = sample;

    let visible = numbers(doc.visible());

    assert_eq!(visible, vec!["R1", "R2"]);
}

#[rstest]
fn given_root_expanded_when_project_then_children_follow_parent(sample: (BomDocument, SampleIds)) {
    let (mut doc, ids) = sample;

    doc.toggle_expanded(ids.r1);

    assert_eq!(numbers(doc.visible()), vec!["R1", "C1", "C2", "R2"]);
}

#[rstest]
fn given_child_expanded_under_collapsed_root_when_project_then_hidden(
    sample: (BomDocument, SampleIds),
) {
    let (mut doc, ids) = sample;

    doc.toggle_expanded(ids.c1);

    assert_eq!(numbers(doc.visible()), vec!["R1", "R2"]);

    doc.toggle_expanded(ids.r1);
    assert_eq!(numbers(doc.visible()), vec!["R1", "C1", "G1", "C2", "R2"]);
}

#[rstest]
fn given_same_state_when_projecting_twice_then_identical(sample: (BomDocument, SampleIds)) {
    let (mut doc, _) = sample;
    doc.expand_all();

    let projection = doc.visible();
    let first: Vec<NodeId> = projection.iter().map(|n| n.id).collect();
    let second: Vec<NodeId> = projection.iter().map(|n| n.id).collect();

    assert_eq!(first, second);
    assert_eq!(first, doc.visible().ids());
    assert_eq!(first.len(), 5);
}

#[rstest]
fn given_unknown_expanded_id_when_project_then_ignored(sample: (BomDocument, SampleIds)) {
    let (doc, ids) = sample;
    let expansion: ExpansionState = [ids.r1, NodeId::from_raw_parts(999, 3)]
        .into_iter()
        .collect();

    let visible = numbers(project(doc.tree(), &expansion));

    assert_eq!(visible, vec!["R1", "C1", "C2", "R2"]);
}

#[rstest]
fn given_toggle_twice_when_project_then_collapsed_again(sample: (BomDocument, SampleIds)) {
    let (mut doc, ids) = sample;

    assert!(doc.toggle_expanded(ids.r1));
    assert!(!doc.toggle_expanded(ids.r1));

    assert_eq!(numbers(doc.visible()), vec!["R1", "R2"]);
}

#[rstest]
#[case::roots_only(0, vec!["R1", "C1", "C2", "R2"])]
#[case::all(1, vec!["R1", "C1", "G1", "C2", "R2"])]
fn given_level_when_expand_to_level_then_visible_rows(
    sample: (BomDocument, SampleIds),
    #[case] level: usize,
    #[case] expected: Vec<&str>,
) {
    let (mut doc, _) = sample;

    doc.expand_to_level(level);

    assert_eq!(numbers(doc.visible()), expected);
}

#[rstest]
fn given_all_expanded_when_collapse_from_level_then_deeper_nodes_closed(
    sample: (BomDocument, SampleIds),
) {
    let (mut doc, ids) = sample;
    doc.expand_all();

    doc.collapse_from_level(1);

    assert!(doc.expansion().is_expanded(ids.r1));
    assert!(!doc.expansion().is_expanded(ids.c1));
    assert_eq!(numbers(doc.visible()), vec!["R1", "C1", "C2", "R2"]);
}

// ============================================================
// filtered projection
// ============================================================

#[rstest]
fn given_deep_match_when_filtering_then_ancestors_forced_open(sample: (BomDocument, SampleIds)) {
    // Arrange
    let (doc, ids) = sample;
    let filter = FieldFilter::contains("g1");

    // Act
    let view = project_filtered(doc.tree(), &filter);

    // Assert
    assert_eq!(numbers(view.iter()), vec!["R1", "C1", "G1"]);
    let forced = view.forced_expanded();
    assert!(forced.is_expanded(ids.r1));
    assert!(forced.is_expanded(ids.c1));
    assert!(!forced.is_expanded(ids.g1));
    assert!(doc.expansion().is_empty(), "persisted state untouched");
}

#[rstest]
fn given_regex_on_one_field_when_filtering_then_only_that_field_matched(
    sample: (BomDocument, SampleIds),
) {
    let (doc, _) = sample;
    let filter = FieldFilter::regex("^C")
        .unwrap()
        .in_fields([fields::PART_NUMBER]);

    let view = project_filtered(doc.tree(), &filter);

    assert_eq!(numbers(view.iter()), vec!["R1", "C1", "C2"]);
}

#[rstest]
fn given_closure_predicate_when_filtering_then_used_as_filter(sample: (BomDocument, SampleIds)) {
    let (doc, ids) = sample;
    let deepest = |n: &BomNode| n.level == 2;

    let view = project_filtered(doc.tree(), &deepest);

    assert_eq!(view.ids(), vec![ids.r1, ids.c1, ids.g1]);
    assert!(!view.contains(ids.r2));
}

#[rstest]
fn given_no_match_when_filtering_then_empty(sample: (BomDocument, SampleIds)) {
    let (doc, _) = sample;

    let view = project_filtered(doc.tree(), &FieldFilter::contains("zzz"));

    assert!(view.is_empty());
    assert_eq!(view.iter().count(), 0);
}

#[test]
fn given_bad_pattern_when_building_regex_filter_then_error() {
    assert!(FieldFilter::regex("(").is_err());
}
