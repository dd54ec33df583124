//! Application wiring.
//!
//! [`SeatLedgerApp`] builds every service over one ledger, one event
//! publisher, one clock and one id generator, and exposes them through a
//! [`Gateway`].

use crate::booking::{BookingDeps, BookingService};
use crate::catalog::{CatalogReader, CatalogService, CatalogWriter, LedgerCatalog};
use crate::config::Config;
use crate::gateway::Gateway;
use crate::queries::ReservationQueries;
use crate::quota::{QuotaPoolStore, QuotaService};
use seatledger_core::environment::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
use seatledger_core::event::EventPublisher;
use seatledger_core::ledger::Ledger;
use seatledger_runtime::LedgerSession;
use std::sync::Arc;

/// External collaborators the application runs on.
pub struct Environment {
    /// Source of truth.
    pub ledger: Arc<dyn Ledger>,
    /// Sink for committed domain events.
    pub publisher: Arc<dyn EventPublisher>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Identifier source.
    pub ids: Arc<dyn IdGenerator>,
}

impl Environment {
    /// Production clock and UUID ids over `ledger` and `publisher`.
    #[must_use]
    pub fn production(ledger: Arc<dyn Ledger>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            ledger,
            publisher,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGenerator),
        }
    }
}

/// Catalog capabilities handed to the booking service.
///
/// Defaults to the ledger catalog; tests substitute failing or slow doubles.
pub struct CatalogCapabilities {
    /// Show lookups.
    pub reader: Arc<dyn CatalogReader>,
    /// Show updates.
    pub writer: Arc<dyn CatalogWriter>,
}

/// The assembled application.
#[derive(Clone, Debug)]
pub struct SeatLedgerApp {
    gateway: Gateway,
    session: LedgerSession,
}

impl SeatLedgerApp {
    /// Wire the services from `config` over `env`.
    #[must_use]
    pub fn new(config: &Config, env: Environment) -> Self {
        let catalog = Arc::new(LedgerCatalog::new(Arc::clone(&env.clock)));
        let capabilities = CatalogCapabilities {
            reader: catalog.clone(),
            writer: catalog.clone(),
        };
        Self::with_catalog(config, env, catalog, capabilities)
    }

    /// Wire the services with substitute catalog capabilities for bookings.
    ///
    /// Direct catalog calls through the gateway still use the ledger catalog.
    #[must_use]
    pub fn with_capabilities(
        config: &Config,
        env: Environment,
        capabilities: CatalogCapabilities,
    ) -> Self {
        let catalog = Arc::new(LedgerCatalog::new(Arc::clone(&env.clock)));
        Self::with_catalog(config, env, catalog, capabilities)
    }

    fn with_catalog(
        config: &Config,
        env: Environment,
        catalog: Arc<LedgerCatalog>,
        capabilities: CatalogCapabilities,
    ) -> Self {
        let session = LedgerSession::new(env.ledger, env.publisher);
        let quota = Arc::new(QuotaPoolStore::new(
            Arc::clone(&env.clock),
            config.quota.daily_capacity,
            config.quota.decrement,
        ));

        let booking = BookingService::new(
            BookingDeps {
                session: session.clone(),
                reader: capabilities.reader,
                writer: capabilities.writer,
                quota: Arc::clone(&quota),
                clock: Arc::clone(&env.clock),
                ids: env.ids,
            },
            config.booking_settings(),
        );

        let gateway = Gateway::new(
            CatalogService::new(session.clone(), catalog),
            booking,
            ReservationQueries::new(session.clone()),
            QuotaService::new(session.clone(), quota, env.clock),
        );

        tracing::debug!(
            exact_match = %config.booking.exact_match,
            quota_decrement = %config.quota.decrement,
            daily_capacity = config.quota.daily_capacity,
            "Seat ledger services wired"
        );
        Self { gateway, session }
    }

    /// Named-call boundary.
    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Shared transaction session.
    #[must_use]
    pub const fn session(&self) -> &LedgerSession {
        &self.session
    }
}
