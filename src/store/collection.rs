//! Ordered, owned list of records of one kind, with no I/O.
//!
//! Remote operations are split in two: `begin_*` flags the record and
//! returns a [`PendingOp`], [`Collection::complete`] applies the response.
//! The target is found again by [`RecordId`], then by key among persisted
//! records that are not busy, so a response that outlives a refresh lands on
//! the right row or is dropped.

use crate::api::RemoteError;
use crate::error::{ConsoleError, Result};
use crate::models::{EntityKind, Operation, Record, RecordId};
use reqwest::Method;
use serde_json::{Map, Value};

/// A request issued for a record and not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOp {
    pub record: RecordId,
    /// Key at the time the request was built.
    pub key: String,
    pub operation: Operation,
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    sent: Map<String, Value>,
}

/// How a response was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The record at `index` now holds the server representation.
    Saved { index: usize },
    /// The record was deleted on the server and dropped locally.
    Removed { key: String },
    /// The record at `index` is flagged with the error.
    Failed { index: usize, error: RemoteError },
    /// The record no longer exists locally; the response was ignored.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct Collection {
    kind: EntityKind,
    records: Vec<Record>,
    next_id: u64,
}

impl Collection {
    pub fn new(kind: EntityKind) -> Collection {
        Collection {
            kind,
            records: Vec::new(),
            next_id: 1,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    fn issue_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Replace every record with freshly fetched ones.
    pub fn replace_all(&mut self, items: Vec<Map<String, Value>>) {
        let kind = self.kind;
        let mut records = Vec::with_capacity(items.len());
        for fields in items {
            records.push(Record::persisted(self.issue_id(), kind, fields));
        }
        self.records = records;
        log::debug!("{kind} collection replaced, {} records", self.records.len());
    }

    /// Append a new, unsaved record. Returns its index.
    pub fn push_new(&mut self, fields: Map<String, Value>) -> usize {
        let id = self.issue_id();
        self.records.push(Record::fresh(id, self.kind, fields));
        self.records.len() - 1
    }

    fn idle_mut(&mut self, index: usize) -> Result<&mut Record> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(ConsoleError::IndexOutOfRange(index))?;
        if record.is_updating() {
            return Err(ConsoleError::Busy(index));
        }
        Ok(record)
    }

    /// Merge `patch` into the record at `index`. Local only.
    pub fn edit(&mut self, index: usize, patch: Map<String, Value>) -> Result<()> {
        self.idle_mut(index)?.apply_patch(patch)
    }

    pub fn toggle_expand(&mut self, index: usize) -> Result<bool> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(ConsoleError::IndexOutOfRange(index))?;
        record.expand = !record.expand;
        Ok(record.expand)
    }

    /// Flag the record as saving and build its create or update request.
    pub fn begin_save(&mut self, index: usize) -> Result<PendingOp> {
        let kind = self.kind;
        let record = self.idle_mut(index)?;
        let key = record.key();
        let sent = record.wire_fields();
        let (method, path) = match (kind.has_item_routes(), record.is_new()) {
            (true, true) => (Method::POST, kind.collection_path().to_string()),
            (true, false) => (Method::PUT, kind.item_path(&key)?),
            (false, _) => (Method::POST, kind.collection_path().to_string()),
        };
        let body = kind.save_body(&key, &sent);
        record.begin(Operation::Save);
        log::debug!("begin save {kind} '{key}' {} {method} {path}", record.id());
        Ok(PendingOp {
            record: record.id(),
            key,
            operation: Operation::Save,
            method,
            path,
            body: Some(body),
            sent,
        })
    }

    /// Drop a new record locally (`None`), or flag a persisted one as
    /// deleting and build its delete request.
    pub fn begin_remove(&mut self, index: usize) -> Result<Option<PendingOp>> {
        let kind = self.kind;
        let record = self.idle_mut(index)?;
        if record.is_new() {
            let removed = self.records.remove(index);
            log::debug!("dropped unsaved {kind} {}", removed.id());
            return Ok(None);
        }
        if !kind.has_item_routes() {
            return Err(ConsoleError::Unsupported {
                kind,
                operation: "delete",
            });
        }
        let key = record.key();
        let path = kind.item_path(&key)?;
        record.begin(Operation::Delete);
        log::debug!("begin delete {kind} '{key}' {}", record.id());
        Ok(Some(PendingOp {
            record: record.id(),
            key,
            operation: Operation::Delete,
            method: Method::DELETE,
            path,
            body: None,
            sent: Map::new(),
        }))
    }

    fn resolve(&self, op: &PendingOp) -> Option<usize> {
        self.position(op.record).or_else(|| {
            if op.key.is_empty() {
                return None;
            }
            // a row with its own request in flight belongs to that request
            self.records
                .iter()
                .position(|r| !r.is_new() && !r.is_updating() && r.key() == op.key)
        })
    }

    /// Apply the settled response of `op`.
    pub fn complete(
        &mut self,
        op: &PendingOp,
        result: std::result::Result<Value, RemoteError>,
    ) -> Completion {
        let kind = self.kind;
        let Some(index) = self.resolve(op) else {
            log::info!(
                "discarding {:?} response for {kind} '{}': record is gone",
                op.operation,
                op.key
            );
            return Completion::Discarded;
        };

        match (op.operation, result) {
            (Operation::Save, Ok(response)) => {
                let fields = kind.fields_from_saved(&op.key, &op.sent, response);
                self.records[index].settle_saved(fields);
                Completion::Saved { index }
            }
            (Operation::Delete, Ok(_)) => {
                let removed = self.records.remove(index);
                Completion::Removed { key: removed.key() }
            }
            (operation, Err(error)) => {
                log::warn!("{operation:?} {kind} '{}' failed: {error}", op.key);
                self.records[index].settle_failed(error.to_string());
                Completion::Failed { index, error }
            }
        }
    }
}
