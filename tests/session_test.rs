//! Edit commands and the shared session handle.

use std::thread;

use rstest::{fixture, rstest};

use bomtree::application::services::{EditCommand, EditOutcome, EditSession};
use bomtree::application::ApplicationError;
use bomtree::domain::{fields, BomDocument, DomainError, FieldValue};
use bomtree::util::testing::{self, labels, payload, sample_document, SampleIds};

#[fixture]
fn sample() -> (BomDocument, SampleIds) {
    testing::init_test_setup();
    sample_document()
}

#[rstest]
fn given_add_root_without_payload_when_applied_then_default_number(
    sample: (BomDocument, SampleIds),
) {
    let (mut doc, _) = sample;

    let outcome = EditCommand::AddRoot { payload: None }.apply(&mut doc).unwrap();

    let EditOutcome::Created(id) = outcome else {
        panic!("expected Created, got {:?}", outcome);
    };
    assert_eq!(doc.get(id).unwrap().label(fields::PART_NUMBER), "NEW-0001");
    assert_eq!(doc.tree().root_ids().last(), Some(&id));
}

#[rstest]
fn given_add_child_with_payload_when_applied_then_parent_expanded(
    sample: (BomDocument, SampleIds),
) {
    let (mut doc, ids) = sample;

    let outcome = EditCommand::AddChild {
        parent: ids.c2,
        payload: Some(payload("G2")),
    }
    .apply(&mut doc)
    .unwrap();

    assert!(matches!(outcome, EditOutcome::Created(_)));
    assert!(doc.expansion().is_expanded(ids.c2));
    assert_eq!(labels(&doc), vec!["R1", "C1", "G1", "C2", "G2", "R2"]);
}

#[rstest]
fn given_same_value_when_set_field_then_unchanged(sample: (BomDocument, SampleIds)) {
    let (mut doc, ids) = sample;
    let command = EditCommand::SetField {
        id: ids.c1,
        key: fields::PART_NAME.to_string(),
        value: FieldValue::from("C1 name"),
    };

    let outcome = command.apply(&mut doc).unwrap();

    assert_eq!(outcome, EditOutcome::Unchanged);
}

#[rstest]
fn given_new_value_when_set_field_then_updated(sample: (BomDocument, SampleIds)) {
    let (mut doc, ids) = sample;
    let command = EditCommand::SetField {
        id: ids.c1,
        key: fields::QUANTITY.to_string(),
        value: FieldValue::from(3i64),
    };

    let outcome = command.apply(&mut doc).unwrap();

    assert_eq!(outcome, EditOutcome::Updated);
    assert_eq!(
        doc.get(ids.c1).unwrap().field(fields::QUANTITY),
        Some(&FieldValue::Number(3.0))
    );
}

#[rstest]
fn given_move_after_itself_when_applied_then_unchanged(sample: (BomDocument, SampleIds)) {
    let (mut doc, ids) = sample;

    let outcome = EditCommand::MoveAfter {
        id: ids.c2,
        after: Some(ids.c2),
    }
    .apply(&mut doc)
    .unwrap();

    assert_eq!(outcome, EditOutcome::Unchanged);
    assert_eq!(labels(&doc), vec!["R1", "C1", "G1", "C2", "R2"]);
}

#[rstest]
fn given_delete_when_applied_then_removed_ids_reported(sample: (BomDocument, SampleIds)) {
    let (mut doc, ids) = sample;

    let outcome = EditCommand::Delete(ids.c1).apply(&mut doc).unwrap();

    assert_eq!(outcome, EditOutcome::Removed(vec![ids.c1, ids.g1]));
    assert_eq!(labels(&doc), vec!["R1", "C2", "R2"]);
}

#[rstest]
fn given_missing_column_when_remove_column_then_unchanged(sample: (BomDocument, SampleIds)) {
    let (mut doc, _) = sample;

    let outcome = EditCommand::RemoveColumn("nope".into()).apply(&mut doc).unwrap();

    assert_eq!(outcome, EditOutcome::Unchanged);
}

#[rstest]
fn given_existing_column_when_add_column_then_duplicate_error(sample: (BomDocument, SampleIds)) {
    let (mut doc, _) = sample;
    let command = EditCommand::AddColumn {
        key: fields::PART_NUMBER.into(),
        label: "Again".into(),
    };

    let result = command.apply(&mut doc);

    assert!(matches!(result, Err(DomainError::DuplicateColumn(_))));
}

#[rstest]
fn given_view_commands_when_applied_then_projection_follows(sample: (BomDocument, SampleIds)) {
    let (doc, ids) = sample;
    let session = EditSession::new(doc);

    session.apply(EditCommand::ExpandToLevel(0)).unwrap();
    assert_eq!(session.visible_ids().unwrap(), vec![ids.r1, ids.c1, ids.c2, ids.r2]);

    session.apply(EditCommand::ToggleExpanded(ids.c1)).unwrap();
    assert_eq!(session.visible_ids().unwrap().len(), 5);

    session.apply(EditCommand::CollapseAll).unwrap();
    assert_eq!(session.visible_ids().unwrap(), vec![ids.r1, ids.r2]);

    session.apply(EditCommand::Select(Some(ids.g1))).unwrap();
    let selected = session.read(|d| d.selection().selected()).unwrap();
    assert_eq!(selected, Some(ids.g1));
}

#[rstest]
fn given_failing_command_when_applied_then_document_untouched(sample: (BomDocument, SampleIds)) {
    // Arrange
    let (doc, ids) = sample;
    let session = EditSession::new(doc);
    let before = session.snapshot().unwrap();

    // Act
    let result = session.apply(EditCommand::MoveTo {
        id: ids.r1,
        parent: Some(ids.g1),
        index: 0,
    });

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::CircularReference { .. }))
    ));
    let after = session.snapshot().unwrap();
    assert_eq!(labels(&after), labels(&before));
    assert_eq!(after.tree().root_ids(), before.tree().root_ids());
}

#[rstest]
fn given_snapshot_when_session_edited_then_snapshot_unaffected(sample: (BomDocument, SampleIds)) {
    let (doc, ids) = sample;
    let session = EditSession::new(doc);
    let snapshot = session.snapshot().unwrap();

    session.apply(EditCommand::Delete(ids.r2)).unwrap();

    assert_eq!(snapshot.tree().len(), 5);
    assert_eq!(session.read(|d| d.tree().len()).unwrap(), 4);
}

#[rstest]
fn given_cloned_handle_when_edited_then_shared(sample: (BomDocument, SampleIds)) {
    let (doc, ids) = sample;
    let session = EditSession::new(doc);
    let other = session.clone();

    other.apply(EditCommand::Indent(ids.c2)).unwrap();

    let parent = session.read(|d| d.get(ids.c2).and_then(|n| n.parent)).unwrap();
    assert_eq!(parent, Some(ids.c1));
}

#[rstest]
fn given_concurrent_readers_when_writer_restructures_then_always_consistent(
    sample: (BomDocument, SampleIds),
) {
    let (doc, ids) = sample;
    let session = EditSession::new(doc);

    thread::scope(|s| {
        let writer = session.clone();
        s.spawn(move || {
            for _ in 0..50 {
                writer.apply(EditCommand::Indent(ids.c2)).unwrap();
                writer.apply(EditCommand::Outdent(ids.c2)).unwrap();
            }
        });
        for _ in 0..4 {
            let reader = session.clone();
            s.spawn(move || {
                for _ in 0..50 {
                    let problems = reader.read(|d| d.tree().validate()).unwrap();
                    assert!(problems.is_empty(), "{:?}", problems);
                    assert_eq!(reader.read(|d| d.tree().len()).unwrap(), 5);
                }
            });
        }
    });

    let final_doc = session.snapshot().unwrap();
    assert_eq!(labels(&final_doc), vec!["R1", "C1", "G1", "C2", "R2"]);
}

#[rstest]
fn given_copied_subtree_when_paste_command_applied_then_created(
    sample: (BomDocument, SampleIds),
) {
    // Arrange
    let (doc, ids) = sample;
    let session = EditSession::new(doc);
    let clipboard = session.copy(ids.c1, true).unwrap();

    // Act
    let outcome = session
        .apply(EditCommand::Paste {
            target: ids.c2,
            clipboard,
            force_level: false,
        })
        .unwrap();

    // Assert
    assert!(matches!(outcome, EditOutcome::Created(_)));
    let after = session.snapshot().unwrap();
    assert_eq!(after.tree().len(), 7);
    assert!(after.tree().validate().is_empty());
}

#[rstest]
fn given_unknown_id_when_copying_through_session_then_domain_error(
    sample: (BomDocument, SampleIds),
) {
    let (mut doc, ids) = sample;
    doc.delete_subtree(ids.r2).unwrap();
    let session = EditSession::new(doc);

    let result = session.copy(ids.r2, false);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::NotFound(id))) if id == ids.r2
    ));
}
