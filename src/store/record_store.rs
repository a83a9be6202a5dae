//! Record store adapter: one collection kept in sync with its endpoint.

use super::collection::{Collection, Completion, PendingOp};
use crate::api::{ApiClient, RemoteError, RestSource};
use crate::error::{ConsoleError, Result};
use crate::models::{decode, key_string, EntityKind, Interface, Operation, Record, RecordId};
use serde_json::{Map, Value};

const INTERFACES_PATH: &str = "/interfaces";

/// Client-side cache of one entity kind with optimistic create, update and
/// delete.
pub struct RecordStore<S> {
    client: ApiClient<S>,
    collection: Collection,
    interfaces: Vec<Interface>,
}

impl<S: RestSource> RecordStore<S> {
    pub fn new(kind: EntityKind, client: ApiClient<S>) -> RecordStore<S> {
        RecordStore {
            client,
            collection: Collection::new(kind),
            interfaces: Vec::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.collection.kind()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn records(&self) -> &[Record] {
        self.collection.records()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.collection.get(index)
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// Interfaces not yet backing a subnet (subnet stores only).
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Fetch the collection and replace every local record.
    ///
    /// On any failure the previous records and interfaces are kept.
    pub async fn list(&mut self) -> Result<usize> {
        let kind = self.kind();
        let interfaces = match kind {
            EntityKind::Subnet => Some(self.fetch_interfaces().await?),
            _ => None,
        };

        let path = kind.collection_path();
        let what = path.trim_start_matches('/').to_string();
        let body = self.client.get(path).await.map_err(|source| ConsoleError::Fetch {
            what: what.clone(),
            source,
        })?;
        let items = kind
            .records_from_list(body)
            .map_err(|detail| ConsoleError::Fetch {
                what,
                source: RemoteError::malformed(200, &detail),
            })?;

        if let Some(mut interfaces) = interfaces {
            interfaces.retain(|i| !items.iter().any(|f| key_string(f.get("Name")) == i.name));
            self.interfaces = interfaces;
        }
        self.collection.replace_all(items);
        log::info!("listed {} {kind} records", self.collection.len());
        Ok(self.collection.len())
    }

    async fn fetch_interfaces(&self) -> Result<Vec<Interface>> {
        let what = INTERFACES_PATH.trim_start_matches('/').to_string();
        let body = self
            .client
            .get(INTERFACES_PATH)
            .await
            .map_err(|source| ConsoleError::Fetch {
                what: what.clone(),
                source,
            })?;
        decode(body).map_err(|detail| ConsoleError::Fetch {
            what,
            source: RemoteError::malformed(200, &detail),
        })
    }

    /// Append a new record built from the kind defaults and `seed`.
    pub fn add(&mut self, seed: Map<String, Value>) -> Result<usize> {
        let fields = self.kind().build_new(&seed)?;
        let index = self.collection.push_new(fields);
        log::debug!("added new {} at #{index}", self.kind());
        Ok(index)
    }

    /// Append a new subnet templated on one address of a known interface.
    pub fn add_from_interface(&mut self, name: &str, address: &str) -> Result<usize> {
        if self.kind() != EntityKind::Subnet {
            return Err(ConsoleError::Unsupported {
                kind: self.kind(),
                operation: "interface templates",
            });
        }
        let seed = self
            .interfaces
            .iter()
            .find(|i| i.name == name && i.addresses.iter().any(|a| a == address))
            .map(|i| i.subnet_seed(address))
            .ok_or_else(|| {
                ConsoleError::InvalidInput(format!("no interface {name} with address {address}"))
            })?;
        self.add(seed)
    }

    /// Append a new record seeded with the fields of the record at `index`.
    pub fn copy(&mut self, index: usize) -> Result<usize> {
        let seed = self
            .collection
            .get(index)
            .ok_or(ConsoleError::IndexOutOfRange(index))?
            .wire_fields();
        self.add(seed)
    }

    /// Local edit, no network I/O.
    pub fn edit(&mut self, index: usize, patch: Map<String, Value>) -> Result<()> {
        self.collection.edit(index, patch)
    }

    pub fn toggle_expand(&mut self, index: usize) -> Result<bool> {
        self.collection.toggle_expand(index)
    }

    pub fn begin_save(&mut self, index: usize) -> Result<PendingOp> {
        self.collection.begin_save(index)
    }

    pub fn begin_remove(&mut self, index: usize) -> Result<Option<PendingOp>> {
        self.collection.begin_remove(index)
    }

    /// Send the request of `op` without touching local state.
    pub async fn execute(&self, op: &PendingOp) -> std::result::Result<Value, RemoteError> {
        self.client
            .request(op.method.clone(), &op.path, op.body.clone())
            .await
    }

    /// Apply the settled response of `op`.
    ///
    /// A failure has already been recorded on the row when `Save` or
    /// `Delete` is returned.
    pub fn complete(
        &mut self,
        op: &PendingOp,
        result: std::result::Result<Value, RemoteError>,
    ) -> Result<Completion> {
        let kind = self.kind();
        let completion = self.collection.complete(op, result);
        match &completion {
            Completion::Saved { index } if kind == EntityKind::Subnet => {
                let name = self.collection.get(*index).map(Record::key);
                self.interfaces.retain(|i| Some(&i.name) != name.as_ref());
                Ok(completion)
            }
            Completion::Failed { error, .. } => {
                let key = op.key.clone();
                let source = error.clone();
                Err(match op.operation {
                    Operation::Save => ConsoleError::Save { kind, key, source },
                    Operation::Delete => ConsoleError::Delete { kind, key, source },
                })
            }
            _ => Ok(completion),
        }
    }

    /// Create (new record) or update the record at `index` on the server.
    pub async fn save(&mut self, index: usize) -> Result<()> {
        let op = self.collection.begin_save(index)?;
        let result = self.execute(&op).await;
        self.complete(&op, result).map(|_| ())
    }

    /// Delete the record at `index`; an unsaved record is only dropped locally.
    pub async fn remove(&mut self, index: usize) -> Result<()> {
        match self.collection.begin_remove(index)? {
            None => Ok(()),
            Some(op) => {
                let result = self.execute(&op).await;
                self.complete(&op, result).map(|_| ())
            }
        }
    }

    /// Save every new or edited record. Returns the number of failures.
    pub async fn save_all_edited(&mut self) -> usize {
        let ids: Vec<RecordId> = self
            .collection
            .iter()
            .filter(|r| r.needs_save())
            .map(Record::id)
            .collect();
        let mut failures = 0;
        for id in ids {
            let Some(index) = self.collection.position(id) else {
                continue;
            };
            if let Err(e) = self.save(index).await {
                log::warn!("{e}");
                failures += 1;
            }
        }
        failures
    }
}
