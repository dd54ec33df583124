//! # Seat Ledger Booking
//!
//! Show catalog, seat booking and a daily bonus quota over a versioned
//! key-value ledger.
//!
//! ## Services
//!
//! - **Catalog**: per-show seat inventory (`upsertShow`, `lookupShowByName`)
//! - **Booking**: the reservation protocol (`reserveSeats`)
//! - **Queries**: reservation lookups by time slot or requester
//! - **Quota**: the daily bonus pool and its rollover
//!
//! Every operation runs in one ledger transaction. A booking's reservation
//! record, show update and quota change commit together; a commit that loses
//! an optimistic race is re-run against fresh state.
//!
//! ## Example
//!
//! ```no_run
//! use seatledger_booking::{Config, Environment, SeatLedgerApp};
//! use seatledger_runtime::TracingEventPublisher;
//! use seatledger_testing::InMemoryLedger;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), seatledger_booking::BookingError> {
//! let env = Environment::production(
//!     Arc::new(InMemoryLedger::new()),
//!     Arc::new(TracingEventPublisher),
//! );
//! let app = SeatLedgerApp::new(&Config::default(), env);
//!
//! app.gateway().invoke("upsertShow", &["Atlas", "6pm-9pm", "100", "3", "false"]).await?;
//! let status = app.gateway().invoke("reserveSeats", &["alice", "Atlas", "6pm-9pm", "2"]).await?;
//! assert!(status.starts_with("Show booked successfully"));
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod queries;
pub mod quota;
pub mod types;

pub use app::{CatalogCapabilities, Environment, SeatLedgerApp};
pub use booking::{BookingOutcome, BookingService, Decision, ExactMatchPolicy, decide};
pub use catalog::{CatalogReader, CatalogService, CatalogWriter, LedgerCatalog};
pub use config::{Config, ConfigError};
pub use error::{BookingError, CatalogError};
pub use gateway::Gateway;
pub use queries::ReservationQueries;
pub use quota::{QuotaDecrement, QuotaPoolStore, QuotaService};
pub use types::{QuotaPool, Reservation, ReservationRequest, Seat, Show, ShowListing};
