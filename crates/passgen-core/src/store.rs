//! Record store - label-keyed passwords in a single JSON file
//!
//! The whole mapping lives in memory and is written back in full after every
//! mutation. Writes go to a temp file in the same directory which is then
//! renamed over the store, so a crash mid-write leaves the previous file
//! intact. There is no locking: one process at a time.
//!
//! File layout:
//!
//! ```json
//! {
//!     "gmail": {
//!         "policy": "medium",
//!         "length": 12,
//!         "value": "Ab3xy9Qz1mNp"
//!     }
//! }
//! ```

use crate::policy::{Length, Policy};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store file {} is corrupt: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error("Label already exists: {0}")]
    DuplicateLabel(String),

    #[error("Label not found: {0}")]
    NotFound(String),

    #[error("Label cannot be empty")]
    InvalidLabel,

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Failed to read store file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to persist store file {}; the change was not saved", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A stored password and the options it was generated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct Record {
    policy: Policy,
    length: Length,
    value: String,
}

impl Record {
    /// Build a record, checking that `value` fits `policy` and `length`
    pub fn new(policy: Policy, length: Length, value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into();

        let count = value.chars().count();
        if count != length.get() {
            return Err(StoreError::InvalidRecord(format!(
                "value has {} characters, expected {}",
                count, length
            )));
        }

        if let Some(c) = value.chars().find(|&c| !policy.allows(c)) {
            return Err(StoreError::InvalidRecord(format!(
                "character {:?} is not allowed by policy '{}'",
                c, policy
            )));
        }

        Ok(Self {
            policy,
            length,
            value,
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn length(&self) -> Length {
        self.length
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// On-disk record shape. Also accepts files written by the older
/// `level`/`password` layout, where `length` could be missing.
#[derive(Deserialize)]
struct StoredRecord {
    #[serde(alias = "level")]
    policy: Policy,
    #[serde(default)]
    length: Option<u64>,
    #[serde(alias = "password")]
    value: String,
}

impl TryFrom<StoredRecord> for Record {
    type Error = StoreError;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let n = stored
            .length
            .unwrap_or_else(|| stored.value.chars().count() as u64);
        let length = Length::try_from(n).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        Record::new(stored.policy, length, stored.value)
    }
}

/// File contents: the label map, rejecting repeated or empty labels that a
/// plain map would silently collapse or accept
struct Labels(BTreeMap<String, Record>);

impl<'de> Deserialize<'de> for Labels {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelsVisitor;

        impl<'de> Visitor<'de> for LabelsVisitor {
            type Value = Labels;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of label to record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Labels, A::Error> {
                let mut records = BTreeMap::new();
                while let Some((label, record)) = map.next_entry::<String, Record>()? {
                    if label.is_empty() {
                        return Err(de::Error::custom("empty label"));
                    }
                    if records.contains_key(&label) {
                        return Err(de::Error::custom(format!("duplicate label '{}'", label)));
                    }
                    records.insert(label, record);
                }
                Ok(Labels(records))
            }
        }

        deserializer.deserialize_map(LabelsVisitor)
    }
}

/// Read the persisted mapping. A missing file is an empty store.
pub fn load(path: &Path) -> Result<BTreeMap<String, Record>, StoreError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no store file yet, starting empty");
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    // from_slice also rejects invalid UTF-8
    let Labels(records) =
        serde_json::from_slice(&content).map_err(|e| StoreError::CorruptState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(path = %path.display(), records = records.len(), "loaded store");
    Ok(records)
}

/// Write the full mapping, atomically replacing whatever is at `path`
pub fn save(path: &Path, records: &BTreeMap<String, Record>) -> Result<(), StoreError> {
    let persistence = |source: io::Error| StoreError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(persistence)?;

    // Four-space indent, matching files written by earlier versions
    let mut content = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut content, formatter);
    records
        .serialize(&mut serializer)
        .map_err(|e| persistence(e.into()))?;
    content.push(b'\n');

    // Dropping the temp file on any early return deletes it
    let mut tmp = tempfile::Builder::new()
        .prefix(".passgen-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(persistence)?;
    tmp.write_all(&content).map_err(persistence)?;
    tmp.as_file().sync_all().map_err(persistence)?;
    tmp.persist(path).map_err(|e| persistence(e.error))?;

    debug!(path = %path.display(), records = records.len(), "saved store");
    Ok(())
}

fn check_label(label: &str) -> Result<(), StoreError> {
    if label.is_empty() {
        return Err(StoreError::InvalidLabel);
    }
    Ok(())
}

/// The label -> record store
pub struct RecordStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory copy, kept identical to the file after every call
    records: BTreeMap<String, Record>,
}

impl RecordStore {
    /// Open the store at `path`, loading it if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = load(&path)?;
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &BTreeMap<String, Record> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.records.contains_key(label)
    }

    /// Write the current mapping to disk
    pub fn save(&self) -> Result<(), StoreError> {
        save(&self.path, &self.records)
    }

    /// Save, or run `undo` on the in-memory mapping if saving fails
    fn save_or_undo<F>(&mut self, undo: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, Record>),
    {
        if let Err(e) = save(&self.path, &self.records) {
            undo(&mut self.records);
            return Err(e);
        }
        Ok(())
    }

    /// Add a new record
    pub fn create(
        &mut self,
        label: &str,
        policy: Policy,
        length: Length,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        check_label(label)?;
        if self.contains(label) {
            return Err(StoreError::DuplicateLabel(label.to_string()));
        }
        let record = Record::new(policy, length, value)?;

        self.records.insert(label.to_string(), record);
        self.save_or_undo(|records| {
            records.remove(label);
        })?;

        info!(label, %policy, %length, "created record");
        Ok(())
    }

    /// Look up a record
    pub fn read(&self, label: &str) -> Result<&Record, StoreError> {
        self.records
            .get(label)
            .ok_or_else(|| StoreError::NotFound(label.to_string()))
    }

    /// Move a record to a new label
    pub fn rename_label(&mut self, old_label: &str, new_label: &str) -> Result<(), StoreError> {
        if !self.contains(old_label) {
            return Err(StoreError::NotFound(old_label.to_string()));
        }
        check_label(new_label)?;
        if self.contains(new_label) {
            return Err(StoreError::DuplicateLabel(new_label.to_string()));
        }

        let record = self
            .records
            .remove(old_label)
            .ok_or_else(|| StoreError::NotFound(old_label.to_string()))?;
        self.records.insert(new_label.to_string(), record);
        self.save_or_undo(|records| {
            if let Some(record) = records.remove(new_label) {
                records.insert(old_label.to_string(), record);
            }
        })?;

        info!(from = old_label, to = new_label, "renamed record");
        Ok(())
    }

    /// Replace a record's policy, length and value
    pub fn update_value(
        &mut self,
        label: &str,
        policy: Policy,
        length: Length,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        if !self.contains(label) {
            return Err(StoreError::NotFound(label.to_string()));
        }
        let record = Record::new(policy, length, value)?;

        let previous = self.records.insert(label.to_string(), record);
        self.save_or_undo(|records| {
            if let Some(previous) = previous {
                records.insert(label.to_string(), previous);
            }
        })?;

        info!(label, %policy, %length, "updated record");
        Ok(())
    }

    /// Remove a record
    pub fn delete(&mut self, label: &str) -> Result<(), StoreError> {
        let record = self
            .records
            .remove(label)
            .ok_or_else(|| StoreError::NotFound(label.to_string()))?;

        self.save_or_undo(|records| {
            records.insert(label.to_string(), record);
        })?;

        info!(label, "deleted record");
        Ok(())
    }

    /// All labels, sorted ascending
    pub fn list_labels(&self) -> Vec<String> {
        // BTreeMap iterates in key order
        self.records.keys().cloned().collect()
    }
}
