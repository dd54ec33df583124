//! String-argument boundary.
//!
//! Callers invoke operations by name with positional string arguments, the
//! way ledger clients submit transactions. The gateway checks argument
//! counts, parses quantities and flags, routes to the services and renders
//! each result as a status line or a JSON document.
//!
//! | Function | Arguments |
//! |----------|-----------|
//! | `upsertShow` | name, timeSlot, totalCapacity, remainingCapacity, soldOut |
//! | `lookupShowByName` | name |
//! | `reserveSeats` | requesterId, showName, timeSlot, requestedSeats |
//! | `lookupReservationByTimeSlot` | timeSlot |
//! | `lookupReservationByRequester` | requesterId |
//! | `seedShows` | |
//! | `initializeQuota` | date (`YYYY-MM-DD` or `today`) |
//! | `rolloverQuota` | date (`YYYY-MM-DD` or `today`) |
//! | `lookupQuotaPool` | |

use crate::booking::BookingService;
use crate::catalog::CatalogService;
use crate::error::BookingError;
use crate::queries::ReservationQueries;
use crate::quota::QuotaService;
use crate::types::{ReservationRequest, ShowListing};
use chrono::NaiveDate;
use seatledger_core::ledger::LedgerError;
use serde::Serialize;

/// Routes named calls to the catalog, booking, query and quota services.
#[derive(Clone, Debug)]
pub struct Gateway {
    catalog: CatalogService,
    booking: BookingService,
    queries: ReservationQueries,
    quota: QuotaService,
}

impl Gateway {
    /// Create a gateway over the four services.
    #[must_use]
    pub const fn new(
        catalog: CatalogService,
        booking: BookingService,
        queries: ReservationQueries,
        quota: QuotaService,
    ) -> Self {
        Self {
            catalog,
            booking,
            queries,
            quota,
        }
    }

    /// Catalog service.
    #[must_use]
    pub const fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Booking service.
    #[must_use]
    pub const fn booking(&self) -> &BookingService {
        &self.booking
    }

    /// Reservation queries.
    #[must_use]
    pub const fn queries(&self) -> &ReservationQueries {
        &self.queries
    }

    /// Quota administration.
    #[must_use]
    pub const fn quota(&self) -> &QuotaService {
        &self.quota
    }

    /// Invoke `function` with positional `args`.
    ///
    /// # Errors
    ///
    /// `Validation` for an unknown function, a wrong argument count or an
    /// unparsable argument; otherwise whatever the routed operation returns.
    pub async fn invoke<S: AsRef<str>>(
        &self,
        function: &str,
        args: &[S],
    ) -> Result<String, BookingError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        tracing::debug!(function, args = args.len(), "Gateway invocation");

        match function {
            "upsertShow" => {
                expect_args(&args, 5)?;
                let listing = ShowListing {
                    name: args[0].to_string(),
                    time_slot: args[1].to_string(),
                    total_capacity: parse_count("totalCapacity", args[2])?,
                    remaining_capacity: parse_count("remainingCapacity", args[3])?,
                    sold_out: parse_flag("soldOut", args[4])?,
                };
                let show = self.catalog.upsert_show(listing).await?;
                Ok(format!("Show record created: {}", show.show_name))
            }
            "lookupShowByName" => {
                expect_args(&args, 1)?;
                to_json(&self.catalog.lookup_show(args[0]).await?)
            }
            "reserveSeats" => {
                expect_args(&args, 4)?;
                let request = ReservationRequest::new(
                    args[0],
                    args[1],
                    args[2],
                    parse_seats(args[3])?,
                );
                Ok(self.booking.reserve_seats(request).await?.message())
            }
            "lookupReservationByTimeSlot" => {
                expect_args(&args, 1)?;
                to_json(&self.queries.by_time_slot(args[0]).await?)
            }
            "lookupReservationByRequester" => {
                expect_args(&args, 1)?;
                to_json(&self.queries.by_requester(args[0]).await?)
            }
            "seedShows" => {
                expect_args(&args, 0)?;
                let shows = self.catalog.seed_shows().await?;
                Ok(format!("Seeded {} show records", shows.len()))
            }
            "initializeQuota" => {
                expect_args(&args, 1)?;
                to_json(&self.quota.initialize(parse_date(args[0])?).await?)
            }
            "rolloverQuota" => {
                expect_args(&args, 1)?;
                to_json(&self.quota.rollover(parse_date(args[0])?).await?)
            }
            "lookupQuotaPool" => {
                expect_args(&args, 0)?;
                to_json(&self.quota.lookup().await?)
            }
            other => {
                tracing::warn!(function = other, "Unknown function invoked");
                Err(BookingError::Validation(
                    "Received unknown function invocation".to_string(),
                ))
            }
        }
    }
}

fn expect_args(args: &[&str], expected: usize) -> Result<(), BookingError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(BookingError::Validation(format!(
            "Incorrect number of arguments. Expecting {expected}"
        )))
    }
}

/// Parse a non-negative decimal count.
pub(crate) fn parse_count(field: &str, value: &str) -> Result<u32, BookingError> {
    let parsed: i64 = value.trim().parse().map_err(|_| {
        BookingError::Validation(format!("Expecting an integer value for {field}"))
    })?;
    if parsed < 0 {
        return Err(BookingError::Validation(format!(
            "{field} must not be negative"
        )));
    }
    u32::try_from(parsed)
        .map_err(|_| BookingError::Validation(format!("{field} is too large")))
}

/// Parse a positive seat count.
pub(crate) fn parse_seats(value: &str) -> Result<u32, BookingError> {
    match parse_count("requestedSeats", value)? {
        0 => Err(BookingError::Validation(
            "requestedSeats must be a positive integer".to_string(),
        )),
        seats => Ok(seats),
    }
}

/// Parse `"true"`/`"false"` in any case.
pub(crate) fn parse_flag(field: &str, value: &str) -> Result<bool, BookingError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(BookingError::Validation(format!(
            "Expecting true or false for {field}"
        ))),
    }
}

/// Parse `YYYY-MM-DD`, or `today` for the service clock's current day.
pub(crate) fn parse_date(value: &str) -> Result<Option<NaiveDate>, BookingError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("today") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| BookingError::Validation(format!("Expecting a YYYY-MM-DD date, got {value:?}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, BookingError> {
    serde_json::to_string(value).map_err(|e| BookingError::Storage(LedgerError::from(e)))
}
