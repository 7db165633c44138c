use std::sync::mpsc::{self, Receiver};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    models::{
        client::{Client, ClientDraft, ClientId, ClientValidationError},
        store::Store,
    },
    storage::{
        Storage,
        writer::{BackgroundWriter, PersistenceEvent},
    },
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Invalid(#[from] ClientValidationError),

    #[error("Client '{0}' not found")]
    ClientNotFound(ClientId),
}

/// In-memory client list backed by a durable store.
///
/// Every mutation updates the list first and then hands a full snapshot to a
/// background writer, so the in-memory list is the source of truth for the
/// session even if a write fails.
pub struct ClientRegistry {
    clients: Vec<Client>,
    writer: BackgroundWriter,
    events: Receiver<PersistenceEvent>,
}

impl ClientRegistry {
    /// Loads the stored list. A load failure is logged and reported as a
    /// [`PersistenceEvent::LoadFailed`]; the registry then starts empty.
    pub fn open<S>(storage: S) -> Self
    where
        S: Storage + Send + 'static,
    {
        let (events_tx, events) = mpsc::channel();

        let clients = match storage.load() {
            Ok(store) => {
                debug!(clients = store.clients.len(), "client list loaded");
                store.clients
            }
            Err(e) => {
                warn!(error = %e, "failed to load client list, starting empty");
                let _ = events_tx.send(PersistenceEvent::LoadFailed {
                    error: e.to_string(),
                });
                Vec::new()
            }
        };

        Self {
            clients,
            writer: BackgroundWriter::spawn(storage, events_tx),
            events,
        }
    }

    pub fn list(&self) -> &[Client] {
        &self.clients
    }

    pub fn get(&self, id: &ClientId) -> Option<&Client> {
        self.clients.iter().find(|client| &client.id == id)
    }

    pub fn add(&mut self, draft: ClientDraft) -> Result<Client, ClientError> {
        draft.validate()?;

        let mut id = ClientId::generate();
        while self.get(&id).is_some() {
            id = ClientId::generate();
        }

        let client = draft.into_client(id, false);
        info!(client_id = %client.id, name = %client.name, "client added");
        self.clients.push(client.clone());
        self.persist();

        Ok(client)
    }

    /// Replaces the fields of an existing client, keeping its id and position.
    pub fn update(&mut self, id: &ClientId, draft: ClientDraft) -> Result<Client, ClientError> {
        draft.validate()?;

        let slot = self
            .clients
            .iter_mut()
            .find(|client| &client.id == id)
            .ok_or_else(|| ClientError::ClientNotFound(id.clone()))?;

        *slot = draft.into_client(id.clone(), slot.payroll_sent);
        let updated = slot.clone();
        info!(client_id = %id, "client updated");
        self.persist();

        Ok(updated)
    }

    /// Removes the client if present. Persists either way.
    pub fn delete(&mut self, id: &ClientId) -> Option<Client> {
        let removed = self
            .clients
            .iter()
            .position(|client| &client.id == id)
            .map(|index| self.clients.remove(index));

        match &removed {
            Some(client) => info!(client_id = %id, name = %client.name, "client deleted"),
            None => debug!(client_id = %id, "delete requested for unknown client"),
        }
        self.persist();

        removed
    }

    /// Waits for queued writes to land.
    pub fn flush(&self) {
        self.writer.flush();
    }

    pub fn drain_events(&self) -> Vec<PersistenceEvent> {
        self.events.try_iter().collect()
    }

    fn persist(&self) {
        self.writer.submit(Store::new(self.clients.clone()));
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveClientError {
    #[error("Client '{0}' not found")]
    NotFound(String),

    #[error("Client name is ambiguous. Multiple clients found: {}", .0.join(", "))]
    Ambiguous(Vec<String>),
}

/// Finds a client by exact id, by 1-based list position, or by a
/// case-insensitive fragment of its name.
pub fn resolve_client<'a>(clients: &'a [Client], query: &str) -> Result<&'a Client, ResolveClientError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ResolveClientError::NotFound(query.to_string()));
    }

    if let Some(client) = clients.iter().find(|client| client.id.as_str() == query) {
        return Ok(client);
    }

    if let Ok(position) = query.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| clients.get(index))
            .ok_or_else(|| ResolveClientError::NotFound(query.to_string()));
    }

    let needle = query.to_lowercase();
    let matching: Vec<_> = clients
        .iter()
        .filter(|client| client.name.to_lowercase().contains(&needle))
        .collect();

    match matching.len() {
        0 => Err(ResolveClientError::NotFound(query.to_string())),
        1 => Ok(matching[0]),
        _ => Err(ResolveClientError::Ambiguous(
            matching.iter().map(|client| client.name.clone()).collect(),
        )),
    }
}
