//! The console: one store per entity kind sharing a single session.

use crate::api::{login, AccessGrant, ApiClient, Credential, RestSource, Session};
use crate::error::{ConsoleError, Result};
use crate::models::EntityKind;
use crate::store::RecordStore;
use serde_json::Value;
use std::sync::Arc;

pub struct Console<S> {
    client: ApiClient<S>,
    subnets: RecordStore<S>,
    machines: RecordStore<S>,
    bootenvs: RecordStore<S>,
    prefs: RecordStore<S>,
}

impl<S: RestSource> Console<S> {
    pub fn new(source: S) -> Console<S> {
        Console::with_client(ApiClient::new(source))
    }

    pub fn with_client(client: ApiClient<S>) -> Console<S> {
        Console {
            subnets: RecordStore::new(EntityKind::Subnet, client.clone()),
            machines: RecordStore::new(EntityKind::Machine, client.clone()),
            bootenvs: RecordStore::new(EntityKind::BootEnv, client.clone()),
            prefs: RecordStore::new(EntityKind::Pref, client.clone()),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient<S> {
        &self.client
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    pub async fn login(&self, credential: Credential) -> Result<AccessGrant> {
        login(&self.client, credential).await
    }

    pub fn logout(&self) {
        self.session().clear_credential();
    }

    pub fn store(&self, kind: EntityKind) -> &RecordStore<S> {
        match kind {
            EntityKind::Subnet => &self.subnets,
            EntityKind::Machine => &self.machines,
            EntityKind::BootEnv => &self.bootenvs,
            EntityKind::Pref => &self.prefs,
        }
    }

    pub fn store_mut(&mut self, kind: EntityKind) -> &mut RecordStore<S> {
        match kind {
            EntityKind::Subnet => &mut self.subnets,
            EntityKind::Machine => &mut self.machines,
            EntityKind::BootEnv => &mut self.bootenvs,
            EntityKind::Pref => &mut self.prefs,
        }
    }

    /// List every collection concurrently.
    ///
    /// A failed collection keeps its previous records; its error is
    /// returned and the others are still refreshed.
    pub async fn refresh(&mut self) -> Vec<ConsoleError> {
        let (subnets, machines, bootenvs, prefs) = futures::join!(
            self.subnets.list(),
            self.machines.list(),
            self.bootenvs.list(),
            self.prefs.list(),
        );

        if bootenvs.is_ok() {
            let available = self
                .bootenvs
                .records()
                .iter()
                .filter(|r| r.field("Available") == Some(&Value::Bool(true)))
                .map(|r| r.key())
                .collect();
            self.session().set_available_bootenvs(available);
        }

        let errors: Vec<ConsoleError> = [subnets, machines, bootenvs, prefs]
            .into_iter()
            .filter_map(|r| r.err())
            .collect();
        for e in &errors {
            log::warn!("refresh: {e}");
        }
        errors
    }

    /// Save new and edited records of every kind. Returns the number of failures.
    pub async fn save_all_edited(&mut self) -> usize {
        let mut failures = 0;
        for kind in EntityKind::ALL {
            failures += self.store_mut(kind).save_all_edited().await;
        }
        failures
    }
}
