//! Shared harness for booking integration tests.

#![allow(dead_code)] // Each test binary uses a different subset
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use seatledger_booking::{
    BookingError, BookingOutcome, CatalogCapabilities, Config, Environment, Gateway, QuotaPool,
    ReservationRequest, SeatLedgerApp, Show, ShowListing,
};
use seatledger_testing::{
    InMemoryLedger, MockClock, RecordingEventPublisher, SequentialIdGenerator, init_test_tracing,
    test_clock,
};
use std::sync::Arc;

/// App over an in-memory ledger with a frozen clock and sequential ids.
pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub events: Arc<RecordingEventPublisher>,
    pub clock: MockClock,
    pub ids: SequentialIdGenerator,
    pub app: SeatLedgerApp,
}

/// Defaults with fast retries.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.max_retries = 100;
    config.retry.initial_delay_ms = 1;
    config.retry.max_delay_ms = 10;
    config
}

impl Harness {
    pub fn new() -> Self {
        Self::build(test_config(), InMemoryLedger::new(), None)
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, InMemoryLedger::new(), None)
    }

    pub fn with_ledger(config: Config, ledger: InMemoryLedger) -> Self {
        Self::build(config, ledger, None)
    }

    /// Bookings go through `capabilities` instead of the ledger catalog.
    pub fn with_capabilities(
        config: Config,
        capabilities: impl FnOnce(&MockClock) -> CatalogCapabilities,
    ) -> Self {
        let clock = test_clock();
        let capabilities = capabilities(&clock);
        Self::build_with_clock(config, InMemoryLedger::new(), clock, Some(capabilities))
    }

    fn build(config: Config, ledger: InMemoryLedger, capabilities: Option<CatalogCapabilities>) -> Self {
        Self::build_with_clock(config, ledger, test_clock(), capabilities)
    }

    fn build_with_clock(
        config: Config,
        ledger: InMemoryLedger,
        clock: MockClock,
        capabilities: Option<CatalogCapabilities>,
    ) -> Self {
        init_test_tracing();
        let ledger = Arc::new(ledger);
        let events = Arc::new(RecordingEventPublisher::new());
        let ids = SequentialIdGenerator::new();
        let env = Environment {
            ledger: ledger.clone(),
            publisher: events.clone(),
            clock: Arc::new(clock.clone()),
            ids: Arc::new(ids.clone()),
        };
        let app = match capabilities {
            Some(capabilities) => SeatLedgerApp::with_capabilities(&config, env, capabilities),
            None => SeatLedgerApp::new(&config, env),
        };
        Self {
            ledger,
            events,
            clock,
            ids,
            app,
        }
    }

    pub fn gateway(&self) -> &Gateway {
        self.app.gateway()
    }

    pub async fn list(&self, name: &str, slot: &str, total: u32, remaining: u32) -> Show {
        self.gateway()
            .catalog()
            .upsert_show(ShowListing::new(name, slot, total).with_remaining(remaining))
            .await
            .unwrap()
    }

    pub async fn book(
        &self,
        requester: &str,
        show: &str,
        slot: &str,
        seats: u32,
    ) -> Result<BookingOutcome, BookingError> {
        self.gateway()
            .booking()
            .reserve_seats(ReservationRequest::new(requester, show, slot, seats))
            .await
    }

    pub async fn init_quota(&self) -> QuotaPool {
        self.gateway().quota().initialize(None).await.unwrap()
    }

    /// Show record as stored, bypassing the services.
    pub fn stored_show(&self, name: &str) -> Option<Show> {
        self.ledger.snapshot_json(&Show::key(name).unwrap())
    }

    /// Quota pool as stored, bypassing the services.
    pub fn stored_pool(&self) -> Option<QuotaPool> {
        self.ledger.snapshot_json(&QuotaPool::key().unwrap())
    }
}

/// Seats booked in `outcome`, zero for non-booking outcomes.
pub fn booked_seats(outcome: &BookingOutcome) -> usize {
    match outcome {
        BookingOutcome::Booked { reservation, .. } => reservation.seats.len(),
        _ => 0,
    }
}
