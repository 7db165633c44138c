use serde::{Deserialize, Serialize};

use crate::models::client::Client;

/// Whole-collection snapshot written to and read from the durable store.
///
/// Serialized as a bare JSON array of clients, in list order.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Store {
    pub clients: Vec<Client>,
}

impl Store {
    pub fn new(clients: Vec<Client>) -> Self {
        Self { clients }
    }
}
