//! Domain types for the seat booking system.
//!
//! Every record is stored in the ledger as camel-cased JSON under a key in its
//! own namespace (see [`namespace`]).

use chrono::{DateTime, NaiveDate, Utc};
use seatledger_core::ledger::{KEY_DELIMITER, LedgerError, LedgerKey};
use serde::{Deserialize, Serialize};

/// Ledger namespaces, one per entity kind.
pub mod namespace {
    /// Show records, keyed by show name.
    pub const SHOW: &str = "show";
    /// `(showName, timeSlot)` index entries holding a one-byte sentinel.
    pub const SHOW_BY_SLOT: &str = "show~slot";
    /// Reservations, keyed by requester id.
    pub const RESERVATION: &str = "reservation";
    /// Latest reservation per time slot.
    pub const RESERVATION_BY_SLOT: &str = "reservation~slot";
    /// The quota pool singleton.
    pub const QUOTA: &str = "quota";
}

/// Value stored under every `show~slot` index key.
pub const SLOT_INDEX_SENTINEL: [u8; 1] = [0x00];

/// Fixed id of the quota pool singleton.
const QUOTA_POOL_ID: &str = "pool";

// ============================================================================
// Show
// ============================================================================

/// Per-show seat inventory, owned by the catalog.
///
/// The zero value (empty name and slot) stands in for a show that does not
/// exist; it never passes the booking eligibility check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    /// Show name, the record's key.
    pub show_name: String,
    /// The single time slot this record currently describes.
    pub time_slot: String,
    /// Seats in the venue.
    pub total_capacity: u32,
    /// Seats not yet booked.
    pub remaining_capacity: u32,
    /// Housefull flag. Once set, no booking passes the eligibility check.
    pub sold_out: bool,
    /// Time of the last upsert.
    pub last_modified: DateTime<Utc>,
}

impl Show {
    /// Primary key of the show named `name`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if `name` contains the key delimiter.
    pub fn key(name: &str) -> Result<LedgerKey, LedgerError> {
        LedgerKey::entity(namespace::SHOW, name)
    }

    /// Index key for `(name, time_slot)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if either part contains the key delimiter.
    pub fn slot_index_key(name: &str, time_slot: &str) -> Result<LedgerKey, LedgerError> {
        LedgerKey::composite(namespace::SHOW_BY_SLOT, &[name, time_slot])
    }
}

/// Fields accepted by the catalog's upsert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowListing {
    /// Show name.
    pub name: String,
    /// Time slot, e.g. `"6pm-9pm"`.
    pub time_slot: String,
    /// Seats in the venue.
    pub total_capacity: u32,
    /// Seats still bookable.
    pub remaining_capacity: u32,
    /// Housefull flag.
    pub sold_out: bool,
}

impl ShowListing {
    /// Listing with every seat still available.
    #[must_use]
    pub fn new(name: impl Into<String>, time_slot: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            time_slot: time_slot.into(),
            total_capacity: capacity,
            remaining_capacity: capacity,
            sold_out: false,
        }
    }

    /// Override the remaining seat count.
    #[must_use]
    pub const fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining_capacity = remaining;
        self
    }

    /// Override the housefull flag.
    #[must_use]
    pub const fn with_sold_out(mut self, sold_out: bool) -> Self {
        self.sold_out = sold_out;
        self
    }

    /// The listing an existing show would be rewritten with after a booking.
    #[must_use]
    pub fn from_show(show: &Show, remaining_capacity: u32, sold_out: bool) -> Self {
        Self {
            name: show.show_name.clone(),
            time_slot: show.time_slot.clone(),
            total_capacity: show.total_capacity,
            remaining_capacity,
            sold_out,
        }
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// One booked seat and its receipt.
///
/// Seat numbers restart at `"0"` for every reservation; they are positions
/// within the reservation, not venue seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    /// Zero-based position within the reservation.
    pub seat_number: String,
    /// Unique receipt number.
    pub receipt_number: String,
    /// Whether the quota pool granted a bonus for this seat.
    pub bonus_eligible: bool,
}

/// A requester's booked seats for one show and slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Who booked.
    pub requester_id: String,
    /// Show name as requested.
    pub show_name: String,
    /// Time slot as requested.
    pub time_slot: String,
    /// Number of seats booked.
    pub requested_seats: u32,
    /// `requesterId_<unique suffix>`.
    pub reservation_id: String,
    /// One entry per booked seat.
    pub seats: Vec<Seat>,
    /// Booking time.
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Key of the requester's latest reservation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if `requester_id` contains the key delimiter.
    pub fn key(requester_id: &str) -> Result<LedgerKey, LedgerError> {
        LedgerKey::entity(namespace::RESERVATION, requester_id)
    }

    /// Key of the latest reservation made for `time_slot`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if `time_slot` contains the key delimiter.
    pub fn slot_key(time_slot: &str) -> Result<LedgerKey, LedgerError> {
        LedgerKey::entity(namespace::RESERVATION_BY_SLOT, time_slot)
    }

    /// Number of seats that received a bonus.
    #[must_use]
    pub fn bonus_seats(&self) -> usize {
        self.seats.iter().filter(|seat| seat.bonus_eligible).count()
    }
}

/// Validated booking request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    /// Who is booking.
    pub requester_id: String,
    /// Show to book.
    pub show_name: String,
    /// Slot to book.
    pub time_slot: String,
    /// Seats wanted, at least one.
    pub requested_seats: u32,
}

impl ReservationRequest {
    /// Build a request.
    #[must_use]
    pub fn new(
        requester_id: impl Into<String>,
        show_name: impl Into<String>,
        time_slot: impl Into<String>,
        requested_seats: u32,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            show_name: show_name.into(),
            time_slot: time_slot.into(),
            requested_seats,
        }
    }

    /// Check that every field is present and at least one seat is requested.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("requesterId", &self.requester_id),
            ("showName", &self.show_name),
            ("timeSlot", &self.time_slot),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
            if value.contains(KEY_DELIMITER) {
                return Err(format!("{field} must not contain the key delimiter"));
            }
        }
        if self.requested_seats == 0 {
            return Err("requestedSeats must be a positive integer".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Quota pool
// ============================================================================

/// Daily bonus budget shared by every reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaPool {
    /// Calendar day (UTC) the remaining quota is valid for.
    pub date: NaiveDate,
    /// Bonuses left for `date`. Never negative.
    pub remaining_quota: u32,
}

impl QuotaPool {
    /// Key of the singleton pool record.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the id is a constant.
    pub fn key() -> Result<LedgerKey, LedgerError> {
        LedgerKey::entity(namespace::QUOTA, QUOTA_POOL_ID)
    }

    /// `true` if the pool can grant a bonus on `today`.
    #[must_use]
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.date == today && self.remaining_quota > 0
    }

    /// `true` if the pool ran dry on `today` and must roll to tomorrow.
    #[must_use]
    pub fn is_exhausted_on(&self, today: NaiveDate) -> bool {
        self.date == today && self.remaining_quota == 0
    }
}
