use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use tracing::{debug, warn};

use crate::models::{
    client::{Client, ClientId},
    period::Period,
};

/// Identity of one payroll completion flag: a client in a given month.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusKey {
    pub client_id: ClientId,
    pub period: Period,
}

impl StatusKey {
    pub fn new(client_id: &ClientId, period: Period) -> Self {
        Self {
            client_id: client_id.clone(),
            period,
        }
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.client_id,
            self.period.month_name(),
            self.period.year()
        )
    }
}

/// Per-client, per-month "payroll sent" flags. Absent means not sent; each
/// new month therefore starts with every client pending.
#[derive(Debug, Default)]
pub struct PayrollTracker {
    statuses: HashMap<StatusKey, bool>,
    periods_by_client: HashMap<ClientId, HashSet<Period>>,
}

impl PayrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sent(&self, client_id: &ClientId, period: Period) -> bool {
        self.statuses
            .get(&StatusKey::new(client_id, period))
            .copied()
            .unwrap_or(false)
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&mut self, client_id: &ClientId, period: Period) -> bool {
        let key = StatusKey::new(client_id, period);
        let sent = self.statuses.entry(key.clone()).or_insert(false);
        *sent = !*sent;
        let sent = *sent;

        self.periods_by_client
            .entry(client_id.clone())
            .or_default()
            .insert(period);

        debug!(key = %key, sent, "payroll status toggled");
        sent
    }

    /// Drops every flag recorded for the client, across all months. Returns
    /// how many entries were removed.
    pub fn on_client_deleted(&mut self, client_id: &ClientId) -> usize {
        let Some(periods) = self.periods_by_client.remove(client_id) else {
            return 0;
        };

        periods
            .into_iter()
            .filter(|period| {
                self.statuses
                    .remove(&StatusKey::new(client_id, *period))
                    .is_some()
            })
            .count()
    }

    /// How many of `clients` are marked sent for `period`.
    pub fn sent_count(&self, clients: &[Client], period: Period) -> usize {
        clients
            .iter()
            .filter(|client| self.is_sent(&client.id, period))
            .count()
    }
}

/// The month the operator is currently looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceMonth {
    current: Period,
}

impl ReferenceMonth {
    pub fn starting_at(period: Period) -> Self {
        Self { current: period }
    }

    pub fn current(&self) -> Period {
        self.current
    }

    /// Moves the reference by `delta` months. A move past the supported
    /// calendar range leaves the reference where it was.
    pub fn change_month(&mut self, delta: i32) -> Period {
        match self.current.shift(delta) {
            Ok(period) => self.current = period,
            Err(e) => warn!(error = %e, delta, "cannot move reference month"),
        }
        self.current
    }
}
