//! Leaderboard view state
//!
//! Holds the entries last loaded for the selected order. The list is shown
//! exactly as the service sorted it and is only re-fetched when the order
//! changes (or on an explicit refresh). A failed fetch leaves the previous
//! list in place.

use tracing::{error, info};
use types::leaderboard::{LeaderboardEntry, LeaderboardOrderBy};

use crate::client::RankingClient;
use crate::display::EntryRow;
use crate::error::ClientError;
use crate::names::{NameCache, NameResolver};

pub struct LeaderboardView {
    client: RankingClient,
    order_by: LeaderboardOrderBy,
    /// Order the current `entries` were loaded with.
    loaded_order: Option<LeaderboardOrderBy>,
    entries: Vec<LeaderboardEntry>,
    fetches: u64,
}

impl LeaderboardView {
    pub fn new(client: RankingClient) -> Self {
        Self::with_order(client, LeaderboardOrderBy::default())
    }

    pub fn with_order(client: RankingClient, order_by: LeaderboardOrderBy) -> Self {
        Self {
            client,
            order_by,
            loaded_order: None,
            entries: Vec::new(),
            fetches: 0,
        }
    }

    /// Load the selected order unless it is already loaded.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        if self.loaded_order == Some(self.order_by) {
            return Ok(());
        }
        self.refresh().await
    }

    /// Select an order; fetches only when it differs from what is loaded.
    pub async fn set_order(&mut self, order_by: LeaderboardOrderBy) -> Result<(), ClientError> {
        self.order_by = order_by;
        self.load().await
    }

    /// Fetch the selected order unconditionally.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.fetches += 1;
        match self.client.leaderboard(self.order_by).await {
            Ok(entries) => {
                info!(order_by = %self.order_by, entries = entries.len(), "Leaderboard updated");
                self.entries = entries;
                self.loaded_order = Some(self.order_by);
                Ok(())
            }
            Err(e) => {
                error!(order_by = %self.order_by, error = %e, "Failed to load leaderboard");
                Err(e)
            }
        }
    }

    /// Rows in service order, with resolved names. The row for
    /// `own_address`, if any, is labelled as the user's own.
    pub async fn rows<R: NameResolver>(
        &self,
        names: &mut NameCache<R>,
        own_address: Option<&str>,
    ) -> Vec<EntryRow> {
        let addresses: Vec<String> = self.entries.iter().map(|e| e.address.clone()).collect();
        let labels = names.labels(&addresses, own_address).await;

        self.entries
            .iter()
            .zip(labels)
            .map(|(entry, name)| EntryRow::new(entry, name))
            .collect()
    }

    pub fn order_by(&self) -> LeaderboardOrderBy {
        self.order_by
    }

    pub fn loaded_order(&self) -> Option<LeaderboardOrderBy> {
        self.loaded_order
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Number of fetches attempted.
    pub fn fetches(&self) -> u64 {
        self.fetches
    }
}
