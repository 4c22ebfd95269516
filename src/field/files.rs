//! Uploaded-file records and the per-field ordered collection.
//!
//! A [`FileCollection`] is a shared handle: clones point at the same
//! underlying list, so the upload controller and the list view observe the
//! same records. Records are immutable once created and are removed by
//! identity, never by value.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::FieldId;

/// One successfully stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Position marker within the owning collection. Not globally unique.
    pub id: u64,
    /// Display filename
    pub name: String,
    /// Server-assigned temporary storage handle
    #[serde(rename = "tmp_name")]
    pub tmp_name: String,
    /// Owning field
    #[serde(rename = "fieldID")]
    pub field_id: FieldId,
}

/// A file record as it arrives from a saved draft, before it is adopted by a
/// collection. Missing attributes are accepted permissively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecordData {
    #[serde(default, deserialize_with = "super::lenient::opt_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "super::lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "super::lenient::string")]
    pub tmp_name: String,
    #[serde(default, rename = "fieldID", deserialize_with = "super::lenient::opt_field_id")]
    pub field_id: Option<FieldId>,
}

#[derive(Debug)]
struct CollectionInner {
    field_id: FieldId,
    records: Vec<Arc<FileRecord>>,
    next_id: u64,
    /// Bumped on every mutation so bindings can detect changes cheaply
    revision: u64,
}

/// Ordered set of [`FileRecord`]s belonging to exactly one field.
#[derive(Debug, Clone)]
pub struct FileCollection {
    inner: Arc<Mutex<CollectionInner>>,
}

impl FileCollection {
    /// Create an empty collection owned by `field_id`.
    pub fn new(field_id: FieldId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CollectionInner {
                field_id,
                records: Vec::new(),
                next_id: 1,
                revision: 0,
            })),
        }
    }

    /// Wrap draft records into a collection owned by `field_id`.
    ///
    /// Records tagged with another field are re-tagged to keep the ownership
    /// invariant; records without an id get the next sequence number.
    pub fn from_records(field_id: FieldId, records: Vec<FileRecordData>) -> Self {
        let collection = Self::new(field_id);
        {
            let mut inner = collection.inner.lock();
            for data in records {
                if let Some(other) = data.field_id
                    && other != field_id
                {
                    log::warn!(
                        "Draft file {:?} tagged with field {} adopted by field {}",
                        data.name,
                        other,
                        field_id
                    );
                }
                let id = match data.id {
                    Some(id) => id,
                    None => inner.next_id,
                };
                inner.next_id = inner.next_id.max(id.saturating_add(1));
                inner.records.push(Arc::new(FileRecord {
                    id,
                    name: data.name,
                    tmp_name: data.tmp_name,
                    field_id,
                }));
            }
        }
        collection
    }

    /// Owning field
    pub fn field_id(&self) -> FieldId {
        self.inner.lock().field_id
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }

    /// Append a newly stored file, tagged with the owning field.
    pub fn add(&self, name: impl Into<String>, tmp_name: impl Into<String>) -> Arc<FileRecord> {
        let mut inner = self.inner.lock();
        let record = Arc::new(FileRecord {
            id: inner.next_id,
            name: name.into(),
            tmp_name: tmp_name.into(),
            field_id: inner.field_id,
        });
        inner.next_id = inner.next_id.saturating_add(1);
        inner.records.push(Arc::clone(&record));
        inner.revision += 1;
        record
    }

    /// Remove exactly `record` (identity, not equality).
    ///
    /// Returns `false` when the record is not a member.
    pub fn remove(&self, record: &Arc<FileRecord>) -> bool {
        let mut inner = self.inner.lock();
        match inner.records.iter().position(|r| Arc::ptr_eq(r, record)) {
            Some(index) => {
                inner.records.remove(index);
                inner.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Drop every record.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.revision += 1;
    }

    /// Snapshot of the records in arrival order.
    pub fn records(&self) -> Vec<Arc<FileRecord>> {
        self.inner.lock().records.clone()
    }

    pub fn get(&self, index: usize) -> Option<Arc<FileRecord>> {
        self.inner.lock().records.get(index).cloned()
    }

    /// Whether two handles share the same underlying collection.
    pub fn ptr_eq(&self, other: &FileCollection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// JSON array of the records, as sent with the form submission.
    pub fn to_json(&self) -> serde_json::Value {
        let inner = self.inner.lock();
        serde_json::Value::Array(
            inner
                .records
                .iter()
                .map(|r| serde_json::to_value(r.as_ref()).unwrap_or(serde_json::Value::Null))
                .collect(),
        )
    }
}
