//! A cached entity with its local lifecycle flags.

use super::kind::{is_reserved, key_string, wire_fields, EntityKind};
use crate::error::{ConsoleError, Result};
use serde_json::{Map, Value};
use std::fmt;

/// Local handle of a record, unique within the collection that issued it.
///
/// Never sent to the server. A collection refresh issues fresh ids, so an
/// id held across a refresh no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Remote operation in flight for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Delete,
}

/// Lifecycle state derived from the record flags.
///
/// `Gone` has no variant: a gone record is no longer in its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    New,
    Clean,
    Dirty,
    Saving,
    Deleting,
    Error,
}

impl RecordState {
    pub fn label(self) -> &'static str {
        match self {
            RecordState::New => "new",
            RecordState::Clean => "clean",
            RecordState::Dirty => "edited",
            RecordState::Saving => "saving",
            RecordState::Deleting => "deleting",
            RecordState::Error => "error",
        }
    }
}

/// One subnet, machine, boot environment or preference.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    kind: EntityKind,
    fields: Map<String, Value>,
    new: bool,
    edited: bool,
    error: Option<String>,
    pending: Option<Operation>,
    /// Presentation toggle only.
    pub expand: bool,
}

impl Record {
    /// A record as fetched from the server.
    pub(crate) fn persisted(id: RecordId, kind: EntityKind, fields: Map<String, Value>) -> Record {
        Record {
            id,
            kind,
            fields,
            new: false,
            edited: false,
            error: None,
            pending: None,
            expand: false,
        }
    }

    /// A record created locally and not yet stored on the server.
    pub(crate) fn fresh(id: RecordId, kind: EntityKind, fields: Map<String, Value>) -> Record {
        Record {
            new: true,
            ..Record::persisted(id, kind, fields)
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value rendered as text, empty when missing or null.
    pub fn field_str(&self, name: &str) -> String {
        key_string(self.fields.get(name))
    }

    /// Value of the kind's key field (`Name` or `Uuid`).
    pub fn key(&self) -> String {
        self.field_str(self.kind.key_field())
    }

    pub fn is_new(&self) -> bool {
        self.new
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_updating(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<Operation> {
        self.pending
    }

    pub fn state(&self) -> RecordState {
        match (self.pending, &self.error) {
            (Some(Operation::Save), _) => RecordState::Saving,
            (Some(Operation::Delete), _) => RecordState::Deleting,
            (None, Some(_)) => RecordState::Error,
            (None, None) if self.new => RecordState::New,
            (None, None) if self.edited => RecordState::Dirty,
            (None, None) => RecordState::Clean,
        }
    }

    /// Whether a save would be offered to the user.
    pub fn needs_save(&self) -> bool {
        (self.new || self.edited) && self.pending.is_none()
    }

    /// Fields as sent to the server.
    pub fn wire_fields(&self) -> Map<String, Value> {
        wire_fields(&self.fields)
    }

    /// Shallow-merge `patch`, skipping reserved keys.
    ///
    /// Clears a previous error; the key field is frozen once persisted.
    pub(crate) fn apply_patch(&mut self, patch: Map<String, Value>) -> Result<()> {
        let key_field = self.kind.key_field();
        if !self.new {
            if let Some(value) = patch.get(key_field) {
                if self.fields.get(key_field) != Some(value) {
                    return Err(ConsoleError::ImmutableKey {
                        field: key_field.to_string(),
                    });
                }
            }
        }
        for (key, value) in patch {
            if !is_reserved(&key) {
                self.fields.insert(key, value);
            }
        }
        self.edited = true;
        self.error = None;
        Ok(())
    }

    pub(crate) fn begin(&mut self, operation: Operation) {
        self.pending = Some(operation);
        self.error = None;
    }

    /// Adopt the server representation after a successful save.
    pub(crate) fn settle_saved(&mut self, fields: Map<String, Value>) {
        self.fields = fields;
        self.new = false;
        self.edited = false;
        self.error = None;
        self.pending = None;
    }

    pub(crate) fn settle_failed(&mut self, message: String) {
        self.pending = None;
        self.error = Some(message);
    }
}
