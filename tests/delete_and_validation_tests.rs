//! Integration tests for the delete handler and the bus-exposed queries
//! (`validate:required`, `get:submitData`).

mod common;

use std::sync::Arc;

use common::{TestPage, field, selection, stored};
use field_upload::bus::file_upload::{
    FileUploadEvent, FileUploadReply, FileUploadRequest, UiEvent,
};
use field_upload::bus::BusMessage;
use field_upload::field::{FieldId, FieldModel, FileRecordData, FormId};
use field_upload::upload::{DomContext, UploadController};
use serde_json::{Map, Value, json};

fn validate(page: &TestPage, handle: &field_upload::field::FieldHandle) -> bool {
    match page.controller.reply(FileUploadRequest::ValidateRequired {
        context: None,
        field: Arc::clone(handle),
    }) {
        FileUploadReply::Required(satisfied) => satisfied,
        other => panic!("unexpected reply {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn test_delete_removes_exactly_one_record() {
    let mut page = TestPage::new();
    let handle = page.add_field(field(1, 10));
    page.upload(
        FieldId(1),
        selection(&["a", "b", "c", "d"]),
        Some(stored(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")])),
    );
    page.clear_taps();

    let record = page
        .controller
        .session(FieldId(1))
        .and_then(|s| s.list_view().click_delete(2))
        .expect("row 2");
    assert_eq!(record.name, "c");

    let event = UiEvent::new();
    page.controller.handle(
        FileUploadEvent::DeleteFile {
            event: event.clone(),
            record,
        },
        &mut page.transport,
    );

    assert!(event.is_default_prevented());
    assert_eq!(page.file_names(&handle), vec!["a", "b", "d"]);

    let session = page.controller.session(FieldId(1)).expect("session");
    let rows: Vec<&str> = session.list_view().rows().iter().map(|r| r.name()).collect();
    assert_eq!(rows, vec!["a", "b", "d"]);

    assert_eq!(
        page.fields_tap.drain_messages(),
        vec![BusMessage::ChangeField {
            field_id: FieldId(1),
            context: None
        }]
    );
    assert!(page.forms_tap.is_empty());
}

#[test]
fn test_delete_matches_identity_not_value() {
    let mut page = TestPage::new();
    let handle = page.add_field(field(1, 10));
    page.upload(
        FieldId(1),
        selection(&["same", "same"]),
        Some(stored(&[("same", "t"), ("same", "t")])),
    );

    let second = handle
        .lock()
        .files
        .as_ref()
        .and_then(|files| files.get(1))
        .expect("second record");
    page.controller.delete_file(&UiEvent::new(), &second);

    let files = handle.lock().files.clone().expect("files");
    assert_eq!(files.len(), 1);
    let remaining = files.get(0).expect("first record");
    assert!(!Arc::ptr_eq(&remaining, &second));
}

#[test]
fn test_delete_of_stale_record_still_notifies() {
    let mut page = TestPage::new();
    let handle = page.add_field(field(1, 10));
    page.upload(FieldId(1), selection(&["a"]), Some(stored(&[("a", "1")])));

    let record = handle
        .lock()
        .files
        .as_ref()
        .and_then(|files| files.get(0))
        .expect("record");
    page.controller.delete_file(&UiEvent::new(), &record);
    page.clear_taps();

    page.controller.delete_file(&UiEvent::new(), &record);
    assert!(page.file_names(&handle).is_empty());
    assert_eq!(page.fields_tap.drain_messages().len(), 1);
}

#[test]
fn test_delete_for_unregistered_field_is_ignored() {
    let mut page = TestPage::new();
    let handle = page.add_field(field(1, 10));
    page.upload(FieldId(1), selection(&["a"]), Some(stored(&[("a", "1")])));
    page.clear_taps();

    let record = handle
        .lock()
        .files
        .as_ref()
        .and_then(|files| files.get(0))
        .expect("record");
    page.registry.remove(FieldId(1));

    let event = UiEvent::new();
    page.controller.delete_file(&event, &record);
    assert!(event.is_default_prevented());
    assert_eq!(page.file_names(&handle), vec!["a"]);
    assert!(page.fields_tap.is_empty());
}

// ---------------------------------------------------------------------------
// validate:required
// ---------------------------------------------------------------------------

#[test]
fn test_required_needs_a_file() {
    let mut page = TestPage::new();
    let handle = page.add_field(field(1, 10));

    assert!(!validate(&page, &handle));
    assert!(!validate(&page, &handle));

    page.upload(FieldId(1), selection(&["a"]), Some(stored(&[("a", "1")])));
    assert!(validate(&page, &handle));
    assert!(validate(&page, &handle));

    let record = page
        .controller
        .session(FieldId(1))
        .and_then(|s| s.list_view().click_delete(0))
        .expect("row 0");
    page.controller.delete_file(&UiEvent::new(), &record);
    assert!(!validate(&page, &handle));
}

#[test]
fn test_required_on_uninitialized_field() {
    let model = FieldModel::new(FieldId(3), FormId(1));
    assert!(!UploadController::validate_required(&model));
}

#[test]
fn test_required_with_draft_files() {
    let mut page = TestPage::new();
    let handle = page.add_field(field(1, 10).with_draft_files(vec![FileRecordData {
        name: "saved.pdf".into(),
        tmp_name: "tmp-saved".into(),
        ..Default::default()
    }]));
    let reply = page.controller.reply(FileUploadRequest::ValidateRequired {
        context: Some(DomContext::in_field(FieldId(1))),
        field: handle,
    });
    assert_eq!(reply, FileUploadReply::Required(true));
}

// ---------------------------------------------------------------------------
// get:submitData
// ---------------------------------------------------------------------------

#[test]
fn test_submit_data_attaches_files() {
    let mut page = TestPage::new();
    let handle = page.add_field(field(7, 10));
    page.upload(
        FieldId(7),
        selection(&["a.png", "b.png"]),
        Some(stored(&[("a.png", "tmp1"), ("b.png", "tmp2")])),
    );

    let mut partial = Map::new();
    partial.insert("id".into(), json!(7));
    partial.insert("value".into(), json!(1));

    let reply = page.controller.reply(FileUploadRequest::GetSubmitData {
        field_data: partial,
        field: handle,
    });
    let FileUploadReply::SubmitData(data) = reply else {
        panic!("expected submit data");
    };

    assert_eq!(data["id"], json!(7));
    assert_eq!(data["value"], json!(1));
    let files = data["files"].as_array().expect("files array");
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], json!("a.png"));
    assert_eq!(files[0]["tmp_name"], json!("tmp1"));
    assert_eq!(files[0]["fieldID"], json!(7));
    assert_eq!(files[1]["name"], json!("b.png"));
}

#[test]
fn test_submit_data_is_pure() {
    let mut model = FieldModel::new(FieldId(2), FormId(1));
    let before = UploadController::get_submit_data(Map::new(), &model);
    assert!(before.get("files").is_none());

    page_init(&mut model);
    let first = UploadController::get_submit_data(Map::new(), &model);
    let second = UploadController::get_submit_data(Map::new(), &model);
    assert_eq!(first, second);
    assert_eq!(first["files"], Value::Array(Vec::new()));
}

fn page_init(model: &mut FieldModel) {
    let page = TestPage::new();
    page.controller.init_model(model);
    assert_eq!(model.upload_nonce.as_deref(), Some(common::TEST_NONCE));
    assert!(model.upload_multi);
}
