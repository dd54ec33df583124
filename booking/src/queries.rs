//! Read-only reservation lookups.

use crate::error::BookingError;
use crate::types::Reservation;
use seatledger_core::ledger::LedgerKey;
use seatledger_runtime::LedgerSession;

/// Point lookups over stored reservations.
#[derive(Clone, Debug)]
pub struct ReservationQueries {
    session: LedgerSession,
}

impl ReservationQueries {
    /// Create the query service.
    #[must_use]
    pub const fn new(session: LedgerSession) -> Self {
        Self { session }
    }

    /// Latest reservation booked for `time_slot`, across all shows.
    ///
    /// # Errors
    ///
    /// `NotFound` if no booking was ever made for the slot.
    pub async fn by_time_slot(&self, time_slot: &str) -> Result<Reservation, BookingError> {
        let key = Reservation::slot_key(time_slot)
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        self.fetch(key, "reservation for time slot", time_slot).await
    }

    /// Latest reservation made by `requester_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the requester never booked.
    pub async fn by_requester(&self, requester_id: &str) -> Result<Reservation, BookingError> {
        let key = Reservation::key(requester_id)
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        self.fetch(key, "reservation for requester", requester_id).await
    }

    async fn fetch(
        &self,
        key: LedgerKey,
        entity: &'static str,
        id: &str,
    ) -> Result<Reservation, BookingError> {
        let mut tx = self.session.begin();
        tx.get_json::<Reservation>(&key)
            .await?
            .ok_or_else(|| BookingError::NotFound {
                entity,
                key: id.to_string(),
            })
    }
}
