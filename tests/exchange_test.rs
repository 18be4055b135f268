//! CSV exchange: export with level + path, import by the last-seen-at-level rule.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use bomtree::application::services::{ExchangeService, ExportScope};
use bomtree::application::ApplicationError;
use bomtree::config::Settings;
use bomtree::domain::{fields, BomDocument, DomainError, FieldValue, Payload};
use bomtree::infrastructure::di::ServiceContainer;
use bomtree::infrastructure::traits::RealFileSystem;
use bomtree::util::testing::{self, labels, sample_document, MemoryFileSystem, SampleIds};

fn service(settings: Settings) -> ExchangeService {
    ExchangeService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

/// (level, parent label, payload) per node in pre-order.
fn shape(doc: &BomDocument) -> Vec<(usize, Option<String>, Payload)> {
    let tree = doc.tree();
    tree.iter()
        .map(|n| {
            (
                n.level,
                n.parent
                    .and_then(|p| tree.get(p))
                    .map(|p| p.label(fields::PART_NUMBER)),
                n.payload.clone(),
            )
        })
        .collect()
}

#[fixture]
fn sample() -> (BomDocument, SampleIds) {
    testing::init_test_setup();
    let (mut doc, ids) = sample_document();
    doc.update_field(ids.g1, fields::QUANTITY, FieldValue::from(4i64))
        .unwrap();
    doc.update_field(ids.c2, "weight", FieldValue::from(0.25))
        .unwrap();
    doc.update_field(ids.c1, "drawingRev", FieldValue::from("4"))
        .unwrap();
    doc.update_field(ids.c1, "remarks", FieldValue::from(""))
        .unwrap();
    doc.update_field(ids.r2, "eoNo", FieldValue::from("'A-12"))
        .unwrap();
    (doc, ids)
}

#[rstest]
fn given_document_when_export_then_import_then_isomorphic(sample: (BomDocument, SampleIds)) {
    // Arrange
    let (doc, _) = sample;
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bom.csv");
    let svc = service(Settings::default());

    // Act
    let written = svc.export_csv(&doc, ExportScope::Full, &path).unwrap();
    let imported = svc.import_csv(&path).unwrap();

    // Assert
    assert_eq!(written, 5);
    assert_eq!(shape(&imported), shape(&doc));
    assert_eq!(labels(&imported), labels(&doc));
    assert!(imported.tree().validate().is_empty());
}

#[rstest]
fn given_document_when_serialized_then_level_and_path_lead(sample: (BomDocument, SampleIds)) {
    let (doc, _) = sample;
    let svc = service(Settings::default());

    let csv = svc.to_csv_string(&doc, ExportScope::Full).unwrap();

    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("level,path,customer,carModel,project,partNumber"));
    assert!(
        header.ends_with(",drawingRev,weight"),
        "extra payload keys go last, sorted: {header}"
    );
    let g1_line = csv.lines().find(|l| l.contains("G1 name")).unwrap();
    assert!(g1_line.starts_with("2,R1 > C1 > G1,"), "{g1_line}");
}

#[rstest]
fn given_collapsed_document_when_export_visible_then_only_roots(sample: (BomDocument, SampleIds)) {
    let (doc, _) = sample;
    let svc = service(Settings::default());

    let rows = svc.rows(&doc, ExportScope::Visible);

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.level == 0));
}

#[rstest]
fn given_exported_file_when_imported_then_all_expanded_and_numbers_parsed(
    sample: (BomDocument, SampleIds),
) {
    let (doc, _) = sample;
    let svc = service(Settings::default());
    let csv = svc.to_csv_string(&doc, ExportScope::Full).unwrap();

    let imported = svc.parse_csv(&csv).unwrap();

    assert_eq!(imported.visible().len(), 5);
    let g1 = imported
        .tree()
        .iter()
        .find(|n| n.label(fields::PART_NUMBER) == "G1")
        .unwrap();
    assert_eq!(g1.field(fields::QUANTITY), Some(&FieldValue::Number(4.0)));
    assert!(imported.columns.get("weight").is_some());
}

#[rstest]
fn given_text_that_looks_numeric_when_round_trip_then_still_text(
    sample: (BomDocument, SampleIds),
) {
    // Arrange
    let (doc, _) = sample;
    let svc = service(Settings::default());

    // Act
    let csv = svc.to_csv_string(&doc, ExportScope::Full).unwrap();
    let imported = svc.parse_csv(&csv).unwrap();

    // Assert
    let c1 = imported
        .tree()
        .iter()
        .find(|n| n.label(fields::PART_NUMBER) == "C1")
        .unwrap();
    assert_eq!(c1.field("drawingRev"), Some(&FieldValue::from("4")));
    assert_eq!(c1.field("remarks"), Some(&FieldValue::from("")));
    let r2 = imported
        .tree()
        .iter()
        .find(|n| n.label(fields::PART_NUMBER) == "R2")
        .unwrap();
    assert_eq!(r2.field("eoNo"), Some(&FieldValue::from("'A-12")));
}

#[rstest]
#[case::path("path")]
#[case::level("level")]
fn given_payload_key_named_like_reserved_column_when_export_then_rejected(
    sample: (BomDocument, SampleIds),
    #[case] key: &str,
) {
    let (mut doc, ids) = sample;
    doc.update_field(ids.r1, key, FieldValue::from("/plant/a"))
        .unwrap();

    let result = service(Settings::default()).to_csv_string(&doc, ExportScope::Full);

    assert!(matches!(result, Err(ApplicationError::ReservedColumn(k)) if k == key));
}

#[test]
fn given_expand_on_import_disabled_when_imported_then_only_roots_visible() {
    let settings = Settings {
        expand_on_import: false,
        ..Settings::default()
    };
    let csv = "level,partNumber\n0,A\n1,B\n0,C\n";

    let doc = service(settings).parse_csv(csv).unwrap();

    assert_eq!(doc.visible().len(), 2);
    assert_eq!(doc.tree().len(), 3);
}

#[test]
fn given_csv_without_level_column_when_imported_then_missing_header() {
    let result = service(Settings::default()).parse_csv("partNumber\nA\n");

    assert!(matches!(result, Err(ApplicationError::MissingHeader(h)) if h == "level"));
}

#[test]
fn given_skipped_level_when_imported_then_invalid_level() {
    let csv = "level,partNumber\n0,A\n2,B\n";

    let result = service(Settings::default()).parse_csv(csv);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidLevel { row: 2, level: 2 }))
    ));
}

#[test]
fn given_non_numeric_level_when_imported_then_invalid_cell() {
    let csv = "level,partNumber\nzero,A\n";

    let result = service(Settings::default()).parse_csv(csv);

    assert!(matches!(
        result,
        Err(ApplicationError::InvalidCell { row: 1, .. })
    ));
}

#[test]
fn given_empty_cells_when_imported_then_fields_absent() {
    let csv = "level,path,partNumber,remarks\n0,A,A,\n";

    let doc = service(Settings::default()).parse_csv(csv).unwrap();

    let node = doc.tree().iter().next().unwrap();
    assert!(node.field("remarks").is_none());
    assert!(node.field("path").is_none());
    assert_eq!(node.field(fields::PART_NUMBER), Some(&FieldValue::from("A")));
}

#[rstest]
fn given_semicolon_settings_when_round_trip_then_delimiter_used(sample: (BomDocument, SampleIds)) {
    // Arrange
    let (doc, _) = sample;
    let mut settings = Settings::default();
    settings.csv.delimiter = ';';
    settings.path_separator = "/".into();
    let svc = service(settings);

    // Act
    let csv = svc.to_csv_string(&doc, ExportScope::Full).unwrap();
    let imported = svc.parse_csv(&csv).unwrap();

    // Assert
    assert!(csv.starts_with("level;path;"));
    assert!(csv.contains("R1/C1/G1"));
    assert_eq!(shape(&imported), shape(&doc));
}

#[test]
fn given_missing_file_when_imported_then_operation_failed_with_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.csv");

    let result = service(Settings::default()).import_csv(&path);

    match result {
        Err(ApplicationError::OperationFailed { context, .. }) => {
            assert!(context.contains("absent.csv"), "{context}")
        }
        other => panic!("unexpected: {:?}", other.map(|d| d.tree().len())),
    }
}

#[rstest]
fn given_nested_output_path_when_export_then_parent_created(sample: (BomDocument, SampleIds)) {
    let (doc, _) = sample;
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out").join("bom.csv");

    service(Settings::default())
        .export_csv(&doc, ExportScope::Full, &path)
        .unwrap();

    assert!(Path::new(&path).exists());
    assert!(fs::read_to_string(&path).unwrap().starts_with("level,path"));
}

#[test]
fn given_memory_filesystem_when_container_round_trips_then_no_disk_access() {
    // Arrange
    let fs = Arc::new(MemoryFileSystem::with_file(
        "/bom/in.csv",
        "level,partNumber,quantity\n0,A,1\n1,B,2\n1,C,3\n",
    ));
    let container = ServiceContainer::with_deps(Settings::default(), fs.clone());

    // Act
    let mut doc = container.exchange.import_csv(Path::new("/bom/in.csv")).unwrap();
    let c = doc.tree().iter().last().unwrap().id;
    doc.indent(c).unwrap();
    container
        .exchange
        .export_csv(&doc, ExportScope::Full, Path::new("/bom/out.csv"))
        .unwrap();

    // Assert
    let written = fs.content(Path::new("/bom/out.csv")).unwrap();
    assert!(written.contains("2,A > B > C,"), "{written}");
    assert!(fs.content(Path::new("in.csv")).is_none());
}
