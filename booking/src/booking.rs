//! Booking service: the reservation protocol.
//!
//! One call to [`BookingService::reserve_seats`] is one ledger transaction:
//!
//! 1. Look the show up through the [`CatalogReader`] (absent = zero value)
//! 2. Run the pure [`decide`] function over the show and the request
//! 3. Stage the decision's writes: seats with quota checks, the reservation
//!    record, the updated show through the [`CatalogWriter`]
//! 4. Commit atomically and publish the attached events
//!
//! A commit conflict re-runs all four steps against fresh state, so capacity
//! and quota are never spent twice.

use crate::catalog::{CatalogReader, CatalogWriter};
use crate::error::{BookingError, CatalogError};
use crate::metrics::BookingMetrics;
use crate::quota::{QUOTA_ROLLED_OVER, QuotaPoolStore};
use crate::types::{Reservation, ReservationRequest, Seat, Show, ShowListing};
use seatledger_core::environment::{Clock, IdGenerator};
use seatledger_core::event::DomainEvent;
use seatledger_core::transaction::LedgerTransaction;
use seatledger_runtime::{LedgerSession, RetryPolicy, retry_with_predicate, with_deadline};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Name used for the catalog in errors, logs and metrics.
const CATALOG: &str = "catalog";

// ============================================================================
// Decision
// ============================================================================

/// What to do when a request asks for exactly the remaining seats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExactMatchPolicy {
    /// Mark the show sold out and grant nothing.
    #[default]
    MarkSoldOut,
    /// Grant the last seats and mark the show sold out.
    GrantAndMarkSoldOut,
}

impl FromStr for ExactMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sold-out" | "mark-sold-out" => Ok(Self::MarkSoldOut),
            "grant" | "grant-and-mark-sold-out" => Ok(Self::GrantAndMarkSoldOut),
            other => Err(format!("unknown exact match policy: {other}")),
        }
    }
}

impl fmt::Display for ExactMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkSoldOut => write!(f, "sold-out"),
            Self::GrantAndMarkSoldOut => write!(f, "grant"),
        }
    }
}

/// Capacity decision for one request against one show record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Book the seats; rewrite the show with `remaining` and `sold_out`.
    Allocate {
        /// Remaining capacity after the booking.
        remaining: u32,
        /// Whether the booking takes the last seats.
        sold_out: bool,
    },
    /// Not enough seats; nothing changes.
    Limited {
        /// `|remaining - requested|`, the shortfall.
        available: u32,
        /// Seats actually left.
        remaining: u32,
    },
    /// The request matches the remaining seats exactly; mark the show sold out.
    SoldOut,
    /// The show is unknown, in another slot, or already sold out.
    NotAvailable,
}

/// `true` if `show` is the requested, bookable show and slot.
///
/// Names compare case-insensitively, slots exactly.
#[must_use]
pub fn is_eligible(show: &Show, request: &ReservationRequest) -> bool {
    show.show_name.to_uppercase() == request.show_name.to_uppercase()
        && show.time_slot == request.time_slot
        && !show.sold_out
}

/// Decide how to serve `request` given the current `show` record.
#[must_use]
pub fn decide(show: &Show, request: &ReservationRequest, policy: ExactMatchPolicy) -> Decision {
    if !is_eligible(show, request) {
        return Decision::NotAvailable;
    }

    let remaining = show.remaining_capacity;
    let requested = request.requested_seats;

    match remaining.cmp(&requested) {
        Ordering::Greater => Decision::Allocate {
            remaining: remaining - requested,
            sold_out: false,
        },
        Ordering::Less => Decision::Limited {
            available: requested - remaining,
            remaining,
        },
        Ordering::Equal => match policy {
            ExactMatchPolicy::MarkSoldOut => Decision::SoldOut,
            ExactMatchPolicy::GrantAndMarkSoldOut => Decision::Allocate {
                remaining: 0,
                sold_out: true,
            },
        },
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Business result of a reservation call. Every variant is a success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Seats were booked.
    Booked {
        /// The stored reservation.
        reservation: Reservation,
        /// Whether this booking took the last seats.
        sold_out: bool,
    },
    /// Fewer seats remain than requested.
    LimitedAvailability {
        /// Shortfall, `|remaining - requested|`.
        available: u32,
        /// Seats actually left.
        remaining: u32,
    },
    /// The show has just been marked housefull.
    SoldOut {
        /// Show name as requested.
        show_name: String,
    },
    /// The show is unknown, in another slot, or already housefull.
    NotAvailable,
}

impl BookingOutcome {
    /// Human-readable status returned to the caller.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Booked { reservation, .. } => format!(
                "Show booked successfully. Booking ID: {}",
                reservation.reservation_id
            ),
            Self::LimitedAvailability { available, .. } => {
                format!("Only limited seats are available. Remaining seats: {available}")
            }
            Self::SoldOut { show_name } => {
                format!("Selected time slot for {show_name} is housefull already.")
            }
            Self::NotAvailable => "Requested show is not available for booking.".to_string(),
        }
    }

    /// Metrics label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Booked { .. } => "booked",
            Self::LimitedAvailability { .. } => "limited",
            Self::SoldOut { .. } => "sold_out",
            Self::NotAvailable => "not_available",
        }
    }
}

impl fmt::Display for BookingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Collaborators of the booking service.
pub struct BookingDeps {
    /// Transaction source.
    pub session: LedgerSession,
    /// Show lookups.
    pub reader: Arc<dyn CatalogReader>,
    /// Show updates.
    pub writer: Arc<dyn CatalogWriter>,
    /// Bonus budget.
    pub quota: Arc<QuotaPoolStore>,
    /// Booking timestamps.
    pub clock: Arc<dyn Clock>,
    /// Reservation id suffixes and receipt numbers.
    pub ids: Arc<dyn IdGenerator>,
}

/// Tunables of the booking service.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingSettings {
    /// Exact-capacity behaviour.
    pub exact_match: ExactMatchPolicy,
    /// Deadline for each catalog call.
    pub catalog_timeout: Duration,
    /// Conflict retry policy.
    pub retry: RetryPolicy,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            exact_match: ExactMatchPolicy::default(),
            catalog_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

/// Reserves seats against the catalog and the quota pool.
#[derive(Clone)]
pub struct BookingService {
    deps: Arc<BookingDeps>,
    settings: BookingSettings,
}

impl BookingService {
    /// Create the service.
    #[must_use]
    pub fn new(deps: BookingDeps, settings: BookingSettings) -> Self {
        Self {
            deps: Arc::new(deps),
            settings,
        }
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    /// Run the reservation protocol for `request`.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank field or zero seats
    /// - `DependencyTimeout` / `Dependency`: the catalog failed
    /// - `Storage`: the ledger failed, or conflicts outlasted the retry policy
    pub async fn reserve_seats(
        &self,
        request: ReservationRequest,
    ) -> Result<BookingOutcome, BookingError> {
        request.validate().map_err(BookingError::Validation)?;

        tracing::info!(
            requester = %request.requester_id,
            show = %request.show_name,
            time_slot = %request.time_slot,
            requested = request.requested_seats,
            "Reservation requested"
        );

        let result = retry_with_predicate(
            self.settings.retry.clone(),
            |attempt| self.attempt(&request, attempt),
            BookingError::is_retryable,
        )
        .await;

        match &result {
            Ok(outcome) => {
                BookingMetrics::record_outcome(outcome.label());
                tracing::info!(
                    requester = %request.requester_id,
                    outcome = outcome.label(),
                    "{}",
                    outcome.message()
                );
            }
            Err(error) => {
                BookingMetrics::record_outcome("error");
                tracing::warn!(requester = %request.requester_id, %error, "Reservation failed");
            }
        }
        result
    }

    async fn attempt(
        &self,
        request: &ReservationRequest,
        attempt: usize,
    ) -> Result<BookingOutcome, BookingError> {
        let mut tx = self.deps.session.begin();
        let reservation_id = format!("{}_{}", request.requester_id, self.deps.ids.next_id());

        let show = self.fetch_show(&mut tx, &request.show_name).await?;
        let decision = decide(&show, request, self.settings.exact_match);
        tracing::debug!(attempt, ?decision, remaining = show.remaining_capacity, "Capacity decided");

        let outcome = match decision {
            Decision::Allocate {
                remaining,
                sold_out,
            } => {
                let reservation = self
                    .stage_reservation(&mut tx, request, reservation_id)
                    .await?;
                self.store_show(&mut tx, ShowListing::from_show(&show, remaining, sold_out))
                    .await?;

                tx.set_event(
                    DomainEvent::ok("Show booked successfully")
                        .with("reservationId", reservation.reservation_id.clone()),
                );
                if sold_out {
                    tx.set_event(sold_out_event(&show));
                }
                BookingOutcome::Booked {
                    reservation,
                    sold_out,
                }
            }
            Decision::Limited {
                available,
                remaining,
            } => {
                tx.set_event(
                    DomainEvent::ok("Only limited seats are available.")
                        .with("availableSeats", available),
                );
                BookingOutcome::LimitedAvailability {
                    available,
                    remaining,
                }
            }
            Decision::SoldOut => {
                self.store_show(&mut tx, ShowListing::from_show(&show, 0, true))
                    .await?;
                tx.set_event(sold_out_event(&show));
                BookingOutcome::SoldOut {
                    show_name: request.show_name.clone(),
                }
            }
            Decision::NotAvailable => BookingOutcome::NotAvailable,
        };

        let committed = self.deps.session.commit(tx, "reserve_seats").await?;

        match &outcome {
            BookingOutcome::Booked { reservation, .. } => {
                BookingMetrics::record_seats(reservation.requested_seats);
                BookingMetrics::record_quota_grants(reservation.bonus_seats());
                BookingMetrics::record_show_upserts(1);
            }
            BookingOutcome::SoldOut { .. } => BookingMetrics::record_show_upserts(1),
            BookingOutcome::LimitedAvailability { .. } | BookingOutcome::NotAvailable => {}
        }
        for _ in committed
            .events
            .iter()
            .filter(|event| event.message == QUOTA_ROLLED_OVER)
        {
            BookingMetrics::record_quota_rollover();
        }

        Ok(outcome)
    }

    async fn stage_reservation(
        &self,
        tx: &mut LedgerTransaction,
        request: &ReservationRequest,
        reservation_id: String,
    ) -> Result<Reservation, BookingError> {
        let mut seats = Vec::new();
        for index in 0..request.requested_seats {
            let bonus_eligible = self
                .deps
                .quota
                .decrement_if_available(tx, request.requested_seats)
                .await?;
            seats.push(Seat {
                seat_number: index.to_string(),
                receipt_number: self.deps.ids.next_id(),
                bonus_eligible,
            });
        }

        let reservation = Reservation {
            requester_id: request.requester_id.clone(),
            show_name: request.show_name.clone(),
            time_slot: request.time_slot.clone(),
            requested_seats: request.requested_seats,
            reservation_id,
            seats,
            created_at: self.deps.clock.now(),
        };

        let by_requester = Reservation::key(&reservation.requester_id)
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        let by_slot = Reservation::slot_key(&reservation.time_slot)
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        tx.put_json(by_requester, &reservation)?;
        tx.put_json(by_slot, &reservation)?;
        Ok(reservation)
    }

    async fn fetch_show(&self, tx: &mut LedgerTransaction, name: &str) -> Result<Show, BookingError> {
        let lookup = self.deps.reader.lookup_show(tx, name);
        match with_deadline(CATALOG, self.settings.catalog_timeout, lookup).await? {
            Ok(show) => Ok(show),
            Err(CatalogError::NotFound { .. }) => {
                tracing::debug!(show = %name, "Show not in catalog, using empty record");
                Ok(Show::default())
            }
            Err(error) => Err(BookingError::from_dependency(CATALOG, error)),
        }
    }

    async fn store_show(
        &self,
        tx: &mut LedgerTransaction,
        listing: ShowListing,
    ) -> Result<Show, BookingError> {
        let update = self.deps.writer.upsert_show(tx, listing);
        with_deadline(CATALOG, self.settings.catalog_timeout, update)
            .await?
            .map_err(|error| BookingError::from_dependency(CATALOG, error))
    }
}

fn sold_out_event(show: &Show) -> DomainEvent {
    DomainEvent::ok("Show is not available for booking")
        .with("show", show.show_name.clone())
        .with("timeSlot", show.time_slot.clone())
}

impl fmt::Debug for BookingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;

    fn show(remaining: u32, sold_out: bool) -> Show {
        Show {
            show_name: "Atlas".to_string(),
            time_slot: "6pm-9pm".to_string(),
            total_capacity: 100,
            remaining_capacity: remaining,
            sold_out,
            ..Show::default()
        }
    }

    fn request(seats: u32) -> ReservationRequest {
        ReservationRequest::new("alice", "atlas", "6pm-9pm", seats)
    }

    #[test]
    fn allocates_when_more_seats_remain() {
        assert_eq!(
            decide(&show(3, false), &request(2), ExactMatchPolicy::MarkSoldOut),
            Decision::Allocate {
                remaining: 1,
                sold_out: false
            }
        );
    }

    #[test]
    fn exact_match_follows_policy() {
        assert_eq!(
            decide(&show(3, false), &request(3), ExactMatchPolicy::MarkSoldOut),
            Decision::SoldOut
        );
        assert_eq!(
            decide(&show(3, false), &request(3), ExactMatchPolicy::GrantAndMarkSoldOut),
            Decision::Allocate {
                remaining: 0,
                sold_out: true
            }
        );
    }

    #[test]
    fn shortfall_reports_the_difference() {
        assert_eq!(
            decide(&show(3, false), &request(5), ExactMatchPolicy::MarkSoldOut),
            Decision::Limited {
                available: 2,
                remaining: 3
            }
        );
        assert_eq!(
            decide(&show(0, false), &request(4), ExactMatchPolicy::MarkSoldOut),
            Decision::Limited {
                available: 4,
                remaining: 0
            }
        );
    }

    #[test]
    fn gate_rejects_other_slot_sold_out_and_unknown_shows() {
        let policy = ExactMatchPolicy::MarkSoldOut;
        let mut other_slot = show(50, false);
        other_slot.time_slot = "9am-12pm".to_string();

        assert_eq!(decide(&other_slot, &request(1), policy), Decision::NotAvailable);
        assert_eq!(decide(&show(50, true), &request(1), policy), Decision::NotAvailable);
        assert_eq!(decide(&Show::default(), &request(1), policy), Decision::NotAvailable);
    }

    #[test]
    fn slot_comparison_is_exact() {
        let mut request = request(1);
        request.time_slot = "6PM-9PM".to_string();
        assert!(!is_eligible(&show(10, false), &request));
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(
            BookingOutcome::LimitedAvailability {
                available: 2,
                remaining: 3
            }
            .message(),
            "Only limited seats are available. Remaining seats: 2"
        );
        assert_eq!(
            BookingOutcome::SoldOut {
                show_name: "Atlas".to_string()
            }
            .message(),
            "Selected time slot for Atlas is housefull already."
        );
        assert_eq!(
            BookingOutcome::NotAvailable.message(),
            "Requested show is not available for booking."
        );
    }

    #[test]
    fn exact_match_policy_parses() {
        assert_eq!("grant".parse(), Ok(ExactMatchPolicy::GrantAndMarkSoldOut));
        assert_eq!("SOLD-OUT".parse(), Ok(ExactMatchPolicy::MarkSoldOut));
        assert!("maybe".parse::<ExactMatchPolicy>().is_err());
    }

    proptest! {
        /// Allocation never exceeds the remaining seats and keeps the books balanced.
        #[test]
        fn allocation_conserves_seats(remaining in 0u32..500, requested in 1u32..500) {
            let decision = decide(&show(remaining, false), &request(requested), ExactMatchPolicy::GrantAndMarkSoldOut);
            match decision {
                Decision::Allocate { remaining: left, sold_out } => {
                    prop_assert!(requested <= remaining);
                    prop_assert_eq!(left + requested, remaining);
                    prop_assert_eq!(sold_out, left == 0);
                }
                Decision::Limited { available, remaining: left } => {
                    prop_assert!(requested > remaining);
                    prop_assert_eq!(available, requested - remaining);
                    prop_assert_eq!(left, remaining);
                }
                Decision::SoldOut | Decision::NotAvailable => {
                    prop_assert!(false, "unexpected decision {:?}", decision);
                }
            }
        }

        /// Under the default policy, exact requests never allocate.
        #[test]
        fn default_policy_never_empties_by_allocation(remaining in 1u32..500, requested in 1u32..500) {
            let decision = decide(&show(remaining, false), &request(requested), ExactMatchPolicy::MarkSoldOut);
            if let Decision::Allocate { remaining: left, sold_out } = decision {
                prop_assert!(left > 0);
                prop_assert!(!sold_out);
            }
            if requested == remaining {
                prop_assert_eq!(decision, Decision::SoldOut);
            }
        }

        /// A housefull show is never booked, whatever the request.
        #[test]
        fn sold_out_shows_are_never_available(remaining in 0u32..500, requested in 1u32..500) {
            prop_assert_eq!(
                decide(&show(remaining, true), &request(requested), ExactMatchPolicy::GrantAndMarkSoldOut),
                Decision::NotAvailable
            );
        }
    }
}
