//! Reactive list of uploaded files for one field.
//!
//! The view shares the field's [`FileCollection`] with the controller and
//! rebuilds its rows whenever the collection changes or the model fires its
//! files-changed signal. Rendering of the actual row markup is up to the host;
//! this binding only keeps the row list current.

use std::sync::Arc;

use crate::field::{FieldId, FileCollection, FileRecord};

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub record: Arc<FileRecord>,
}

impl FileRow {
    pub fn name(&self) -> &str {
        &self.record.name
    }
}

#[derive(Debug)]
pub struct FileListView {
    collection: FileCollection,
    rows: Vec<FileRow>,
    rendered_revision: Option<u64>,
    seen_signal: u64,
    render_count: u64,
}

impl FileListView {
    pub fn new(collection: FileCollection) -> Self {
        let mut view = Self {
            collection,
            rows: Vec::new(),
            rendered_revision: None,
            seen_signal: 0,
            render_count: 0,
        };
        view.render();
        view
    }

    pub fn field_id(&self) -> FieldId {
        self.collection.field_id()
    }

    /// Rebuild every row from the collection.
    pub fn render(&mut self) {
        self.rows = self
            .collection
            .records()
            .into_iter()
            .map(|record| FileRow { record })
            .collect();
        self.rendered_revision = Some(self.collection.revision());
        self.render_count += 1;
    }

    /// Clear the display without touching the collection.
    pub fn empty(&mut self) {
        self.rows.clear();
        self.rendered_revision = None;
    }

    /// Re-render if the collection changed since the last render.
    /// Returns whether a render happened.
    pub fn sync(&mut self) -> bool {
        if self.rendered_revision == Some(self.collection.revision()) {
            return false;
        }
        self.render();
        true
    }

    /// React to the model's files-changed signal counter.
    pub fn on_files_changed(&mut self, signal: u64) {
        if signal != self.seen_signal {
            self.seen_signal = signal;
            self.render();
        }
    }

    pub fn rows(&self) -> &[FileRow] {
        &self.rows
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// The record behind the delete button of row `index`, to be sent as
    /// `click:deleteFile`.
    pub fn click_delete(&self, index: usize) -> Option<Arc<FileRecord>> {
        self.rows.get(index).map(|row| Arc::clone(&row.record))
    }
}
