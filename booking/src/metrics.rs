//! Business metrics for the booking system.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_reservations_total{outcome}` - Reservation attempts by outcome
//!   (`booked`, `limited`, `sold_out`, `not_available`, `error`)
//! - `booking_seats_allocated_total` - Seats handed out
//! - `booking_quota_grants_total` - Seats that received a bonus
//! - `booking_quota_rollovers_total` - Quota pool day rollovers
//! - `booking_shows_upserted_total` - Catalog writes

use metrics::{counter, describe_counter};

/// Register all business metric descriptions.
///
/// Call once at startup, before any metric is recorded.
pub fn register_booking_metrics() {
    describe_counter!(
        "booking_reservations_total",
        "Total number of reservation attempts by outcome"
    );
    describe_counter!(
        "booking_seats_allocated_total",
        "Total number of seats allocated"
    );
    describe_counter!(
        "booking_quota_grants_total",
        "Total number of seats granted a bonus from the quota pool"
    );
    describe_counter!(
        "booking_quota_rollovers_total",
        "Total number of quota pool rollovers to the next day"
    );
    describe_counter!(
        "booking_shows_upserted_total",
        "Total number of show records written"
    );

    tracing::info!("Booking metrics registered");
}

/// Booking metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record one reservation attempt and its outcome label.
    pub fn record_outcome(outcome: &'static str) {
        counter!("booking_reservations_total", "outcome" => outcome).increment(1);
    }

    /// Record allocated seats.
    pub fn record_seats(count: u32) {
        counter!("booking_seats_allocated_total").increment(u64::from(count));
    }

    /// Record the seats of one reservation that received a bonus.
    pub fn record_quota_grants(count: usize) {
        counter!("booking_quota_grants_total").increment(saturating_u64(count));
    }

    /// Record a pool rollover.
    pub fn record_quota_rollover() {
        counter!("booking_quota_rollovers_total").increment(1);
    }

    /// Record written show records.
    pub fn record_show_upserts(count: usize) {
        counter!("booking_shows_upserted_total").increment(saturating_u64(count));
    }
}

fn saturating_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}
