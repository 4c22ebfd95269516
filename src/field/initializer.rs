//! `init:model` handling: normalizes a raw field model into upload-ready state.

use super::{FieldModel, FileCollection};

/// Prepares field models for uploading.
#[derive(Debug, Clone)]
pub struct FieldInitializer {
    nonce: String,
}

impl FieldInitializer {
    /// `nonce` is the process-wide upload authorization token.
    pub fn new(nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
        }
    }

    /// Mutates `model` in place. Never fails: a missing `files` attribute
    /// becomes an empty collection.
    pub fn init_model(&self, model: &mut FieldModel) {
        model.upload_multi = model.upload_multi_count != Some(1);
        model.upload_nonce = Some(self.nonce.clone());

        let drafts = model.draft_files.take().unwrap_or_default();
        crate::debug_info!(
            "FIELD",
            "init field {} (form {}): multi={} limit={:?} drafts={}",
            model.id,
            model.form_id,
            model.upload_multi,
            model.upload_multi_count,
            drafts.len()
        );
        model.files = Some(FileCollection::from_records(model.id, drafts));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldId, FileRecordData, FormId};

    #[test]
    fn test_single_file_field() {
        let mut model = FieldModel::new(FieldId(1), FormId(1)).with_upload_multi_count(1);
        FieldInitializer::new("nonce").init_model(&mut model);

        assert!(!model.upload_multi);
        assert_eq!(model.upload_nonce.as_deref(), Some("nonce"));
        assert!(model.files.as_ref().is_some_and(|f| f.is_empty()));
    }

    #[test]
    fn test_absent_limit_is_multi() {
        let mut model = FieldModel::new(FieldId(1), FormId(1));
        FieldInitializer::new("nonce").init_model(&mut model);
        assert!(model.upload_multi);
    }

    #[test]
    fn test_wraps_draft_files() {
        let mut model = FieldModel::new(FieldId(4), FormId(1)).with_draft_files(vec![
            FileRecordData {
                name: "cv.pdf".into(),
                tmp_name: "tmp1".into(),
                ..Default::default()
            },
        ]);
        FieldInitializer::new("n").init_model(&mut model);

        let files = model.files.expect("files initialized");
        assert_eq!(files.len(), 1);
        assert_eq!(files.records()[0].field_id, FieldId(4));
        assert!(model.draft_files.is_none());
    }
}
