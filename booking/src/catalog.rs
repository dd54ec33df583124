//! Catalog service: per-show seat inventory.
//!
//! The booking service reaches the catalog only through the [`CatalogReader`]
//! and [`CatalogWriter`] capabilities. Both operate on the caller's
//! [`LedgerTransaction`], so a booking's show update commits together with its
//! reservation and quota writes.
//!
//! Show records are keyed by name alone. Upserting a second time slot for the
//! same name replaces the first; the `show~slot` index keeps a sentinel entry
//! for every `(name, slot)` pair ever written.

use crate::error::CatalogError;
use crate::metrics::BookingMetrics;
use crate::types::{SLOT_INDEX_SENTINEL, Show, ShowListing};
use futures::future::BoxFuture;
use seatledger_core::environment::Clock;
use seatledger_core::event::DomainEvent;
use seatledger_core::transaction::LedgerTransaction;
use seatledger_runtime::LedgerSession;
use std::sync::Arc;

/// Read access to show records.
pub trait CatalogReader: Send + Sync {
    /// Point lookup of the show named `name`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record exists; `Ledger` on storage failure.
    fn lookup_show<'a>(
        &'a self,
        tx: &'a mut LedgerTransaction,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Show, CatalogError>>;
}

/// Write access to show records.
pub trait CatalogWriter: Send + Sync {
    /// Overwrite the show named `listing.name` and index its time slot.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name or slot; `Ledger` on storage failure.
    fn upsert_show<'a>(
        &'a self,
        tx: &'a mut LedgerTransaction,
        listing: ShowListing,
    ) -> BoxFuture<'a, Result<Show, CatalogError>>;
}

/// Ledger-backed catalog.
pub struct LedgerCatalog {
    clock: Arc<dyn Clock>,
}

impl LedgerCatalog {
    /// Create a catalog stamping records with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn write(&self, tx: &mut LedgerTransaction, listing: ShowListing) -> Result<Show, CatalogError> {
        if listing.name.trim().is_empty() {
            return Err(CatalogError::Validation("show name must not be empty".to_string()));
        }
        if listing.time_slot.trim().is_empty() {
            return Err(CatalogError::Validation("time slot must not be empty".to_string()));
        }
        let key = Show::key(&listing.name).map_err(|e| CatalogError::Validation(e.to_string()))?;
        let index = Show::slot_index_key(&listing.name, &listing.time_slot)
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let show = Show {
            show_name: listing.name,
            time_slot: listing.time_slot,
            total_capacity: listing.total_capacity,
            remaining_capacity: listing.remaining_capacity,
            sold_out: listing.sold_out,
            last_modified: self.clock.now(),
        };

        tx.put_json(key, &show)?;
        tx.put_state(index, SLOT_INDEX_SENTINEL.to_vec());
        tx.set_event(DomainEvent::ok("record created").with("show", show.show_name.clone()));

        tracing::debug!(
            show = %show.show_name,
            time_slot = %show.time_slot,
            remaining = show.remaining_capacity,
            sold_out = show.sold_out,
            "Show record staged"
        );
        Ok(show)
    }

    async fn read(&self, tx: &mut LedgerTransaction, name: &str) -> Result<Show, CatalogError> {
        let key = Show::key(name).map_err(|e| CatalogError::Validation(e.to_string()))?;
        tx.get_json::<Show>(&key)
            .await?
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
            })
    }
}

impl CatalogReader for LedgerCatalog {
    fn lookup_show<'a>(
        &'a self,
        tx: &'a mut LedgerTransaction,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Show, CatalogError>> {
        Box::pin(self.read(tx, name))
    }
}

impl CatalogWriter for LedgerCatalog {
    fn upsert_show<'a>(
        &'a self,
        tx: &'a mut LedgerTransaction,
        listing: ShowListing,
    ) -> BoxFuture<'a, Result<Show, CatalogError>> {
        Box::pin(async move { self.write(tx, listing) })
    }
}

/// Inventory the catalog can be seeded with: three shows, five slots.
///
/// Records are keyed by name, so after seeding only the last slot listed for
/// each show is retrievable.
#[must_use]
pub fn demo_listings() -> Vec<ShowListing> {
    vec![
        ShowListing::new("The Grudge", "9am-12pm", 100),
        ShowListing::new("The Grudge", "12pm-3pm", 100),
        ShowListing::new("The Grudge", "6pm-9pm", 100).with_remaining(3),
        ShowListing::new("The Godfather", "9am-12pm", 100)
            .with_remaining(0)
            .with_sold_out(true),
        ShowListing::new("The Godfather", "12pm-3pm", 100),
        ShowListing::new("The Dark Knight", "6pm-9pm", 100),
    ]
}

/// Catalog operations invoked directly, each in its own transaction.
#[derive(Clone)]
pub struct CatalogService {
    session: LedgerSession,
    catalog: Arc<LedgerCatalog>,
}

impl CatalogService {
    /// Create the service.
    #[must_use]
    pub fn new(session: LedgerSession, catalog: Arc<LedgerCatalog>) -> Self {
        Self { session, catalog }
    }

    /// Create or overwrite a show.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed listing; `Ledger` if the commit fails.
    pub async fn upsert_show(&self, listing: ShowListing) -> Result<Show, CatalogError> {
        let mut tx = self.session.begin();
        let show = self.catalog.write(&mut tx, listing)?;
        self.session.commit(tx, "upsert_show").await?;

        BookingMetrics::record_show_upserts(1);
        tracing::info!(show = %show.show_name, time_slot = %show.time_slot, "Show record created");
        Ok(show)
    }

    /// Current record of the show named `name`.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `Ledger` on storage failure.
    pub async fn lookup_show(&self, name: &str) -> Result<Show, CatalogError> {
        let mut tx = self.session.begin();
        self.catalog.read(&mut tx, name).await
    }

    /// `true` if `(name, time_slot)` has ever been upserted.
    ///
    /// # Errors
    ///
    /// `Ledger` on storage failure.
    pub async fn is_scheduled(&self, name: &str, time_slot: &str) -> Result<bool, CatalogError> {
        let key = Show::slot_index_key(name, time_slot)
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        let mut tx = self.session.begin();
        Ok(tx.get_state(&key).await?.is_some())
    }

    /// Install [`demo_listings`] in one transaction.
    ///
    /// # Errors
    ///
    /// `Ledger` if the commit fails.
    pub async fn seed_shows(&self) -> Result<Vec<Show>, CatalogError> {
        let mut tx = self.session.begin();
        let mut shows = Vec::new();
        for listing in demo_listings() {
            shows.push(self.catalog.write(&mut tx, listing)?);
        }
        self.session.commit(tx, "seed_shows").await?;

        BookingMetrics::record_show_upserts(shows.len());
        tracing::info!(count = shows.len(), "Catalog seeded");
        Ok(shows)
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService").finish_non_exhaustive()
    }
}
