//! Quota pool: a daily bonus budget consumed alongside seat allocation.
//!
//! The pool is one ledger record, `{date, remainingQuota}`. It grants only on
//! the day it is dated for and only while quota remains. When a check finds
//! it dry on its own day, the pool is rolled to the next day with a fresh
//! daily capacity, which becomes grantable once that day arrives.
//!
//! Concurrent reservations never double-spend the pool: every check reads the
//! record through the caller's transaction, so two invocations that decrement
//! from the same version conflict at commit and the loser re-runs.

use crate::error::BookingError;
use crate::metrics::BookingMetrics;
use crate::types::QuotaPool;
use chrono::{Days, NaiveDate};
use seatledger_core::environment::Clock;
use seatledger_core::event::DomainEvent;
use seatledger_core::transaction::LedgerTransaction;
use seatledger_runtime::LedgerSession;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default daily capacity of the pool.
pub const DEFAULT_DAILY_CAPACITY: u32 = 200;

/// Message of the event attached whenever the pool moves to a new day.
pub const QUOTA_ROLLED_OVER: &str = "quota pool rolled over";

/// How much a grant subtracts from the pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuotaDecrement {
    /// Each granted seat subtracts the whole request size.
    #[default]
    PerRequest,
    /// Each granted seat subtracts one.
    PerSeat,
}

impl QuotaDecrement {
    const fn amount(self, requested_seats: u32) -> u32 {
        match self {
            Self::PerRequest => requested_seats,
            Self::PerSeat => 1,
        }
    }
}

impl FromStr for QuotaDecrement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-request" => Ok(Self::PerRequest),
            "per-seat" => Ok(Self::PerSeat),
            other => Err(format!("unknown quota decrement policy: {other}")),
        }
    }
}

impl fmt::Display for QuotaDecrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerRequest => write!(f, "per-request"),
            Self::PerSeat => write!(f, "per-seat"),
        }
    }
}

/// Grant checks and administration of the quota pool record.
pub struct QuotaPoolStore {
    clock: Arc<dyn Clock>,
    daily_capacity: u32,
    decrement: QuotaDecrement,
}

impl QuotaPoolStore {
    /// Create a store refilling to `daily_capacity`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, daily_capacity: u32, decrement: QuotaDecrement) -> Self {
        Self {
            clock,
            daily_capacity,
            decrement,
        }
    }

    /// Capacity written on initialization and rollover.
    #[must_use]
    pub const fn daily_capacity(&self) -> u32 {
        self.daily_capacity
    }

    /// Consult the pool for one seat of a `requested_seats` reservation.
    ///
    /// Grants if the pool is dated today and not empty, subtracting according
    /// to the decrement policy (never below zero). A pool found empty on its
    /// own day is rolled to tomorrow whatever the grant outcome. A missing or
    /// stale pool denies and is left untouched.
    ///
    /// # Errors
    ///
    /// Propagates ledger failures.
    pub async fn decrement_if_available(
        &self,
        tx: &mut LedgerTransaction,
        requested_seats: u32,
    ) -> Result<bool, BookingError> {
        let key = QuotaPool::key()?;
        let today = self.clock.today();

        let Some(pool) = tx.get_json::<QuotaPool>(&key).await? else {
            tracing::debug!("Quota pool not initialized, denying bonus");
            return Ok(false);
        };

        let granted = pool.is_open_on(today);
        if granted {
            let remaining = pool
                .remaining_quota
                .saturating_sub(self.decrement.amount(requested_seats));
            tx.put_json(
                key.clone(),
                &QuotaPool {
                    date: pool.date,
                    remaining_quota: remaining,
                },
            )?;
        }

        if pool.is_exhausted_on(today) {
            let rolled = QuotaPool {
                date: next_day(today)?,
                remaining_quota: self.daily_capacity,
            };
            tx.put_json(key, &rolled)?;
            tx.set_event(
                DomainEvent::ok(QUOTA_ROLLED_OVER)
                    .with("date", rolled.date.to_string())
                    .with("remainingQuota", rolled.remaining_quota),
            );
            tracing::info!(date = %rolled.date, "Quota pool exhausted, rolled to next day");
        }

        tracing::debug!(
            granted,
            pool_date = %pool.date,
            remaining = pool.remaining_quota,
            "Quota pool consulted"
        );
        Ok(granted)
    }

    /// Overwrite the pool with a full budget dated `date`.
    ///
    /// # Errors
    ///
    /// Propagates ledger failures.
    pub fn initialize(&self, tx: &mut LedgerTransaction, date: NaiveDate) -> Result<QuotaPool, BookingError> {
        let pool = QuotaPool {
            date,
            remaining_quota: self.daily_capacity,
        };
        tx.put_json(QuotaPool::key()?, &pool)?;
        tx.set_event(
            DomainEvent::ok("quota pool initialized")
                .with("date", date.to_string())
                .with("remainingQuota", pool.remaining_quota),
        );
        Ok(pool)
    }

    /// Move a missing or older pool to `date` with a full budget.
    ///
    /// A pool already dated `date` or later is returned unchanged, with
    /// `false` in the second position.
    ///
    /// # Errors
    ///
    /// Propagates ledger failures.
    pub async fn rollover(
        &self,
        tx: &mut LedgerTransaction,
        date: NaiveDate,
    ) -> Result<(QuotaPool, bool), BookingError> {
        let key = QuotaPool::key()?;
        if let Some(pool) = tx.get_json::<QuotaPool>(&key).await? {
            if pool.date >= date {
                return Ok((pool, false));
            }
        }

        let pool = QuotaPool {
            date,
            remaining_quota: self.daily_capacity,
        };
        tx.put_json(key, &pool)?;
        tx.set_event(
            DomainEvent::ok(QUOTA_ROLLED_OVER)
                .with("date", date.to_string())
                .with("remainingQuota", pool.remaining_quota),
        );
        Ok((pool, true))
    }

    /// Current pool record.
    ///
    /// # Errors
    ///
    /// Propagates ledger failures.
    pub async fn current(&self, tx: &mut LedgerTransaction) -> Result<Option<QuotaPool>, BookingError> {
        Ok(tx.get_json::<QuotaPool>(&QuotaPool::key()?).await?)
    }
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, BookingError> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| BookingError::Validation(format!("no calendar day follows {date}")))
}

/// Quota administration, each call in its own transaction.
#[derive(Clone)]
pub struct QuotaService {
    session: LedgerSession,
    store: Arc<QuotaPoolStore>,
    clock: Arc<dyn Clock>,
}

impl QuotaService {
    /// Create the service.
    #[must_use]
    pub fn new(session: LedgerSession, store: Arc<QuotaPoolStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            store,
            clock,
        }
    }

    /// Initialize the pool for `date` (today when `None`).
    ///
    /// # Errors
    ///
    /// `Storage` if the commit fails.
    pub async fn initialize(&self, date: Option<NaiveDate>) -> Result<QuotaPool, BookingError> {
        let date = date.unwrap_or_else(|| self.clock.today());
        let mut tx = self.session.begin();
        let pool = self.store.initialize(&mut tx, date)?;
        self.session.commit(tx, "initialize_quota").await?;

        tracing::info!(date = %pool.date, remaining = pool.remaining_quota, "Quota pool initialized");
        Ok(pool)
    }

    /// Roll the pool to `date` (today when `None`) if it is older.
    ///
    /// # Errors
    ///
    /// `Storage` if the commit fails.
    pub async fn rollover(&self, date: Option<NaiveDate>) -> Result<QuotaPool, BookingError> {
        let date = date.unwrap_or_else(|| self.clock.today());
        let mut tx = self.session.begin();
        let (pool, rolled) = self.store.rollover(&mut tx, date).await?;
        self.session.commit(tx, "rollover_quota").await?;

        if rolled {
            BookingMetrics::record_quota_rollover();
            tracing::info!(date = %pool.date, "Quota pool rolled over");
        } else {
            tracing::debug!(date = %pool.date, "Quota pool already current");
        }
        Ok(pool)
    }

    /// Current pool record.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pool was never initialized.
    pub async fn lookup(&self) -> Result<QuotaPool, BookingError> {
        let mut tx = self.session.begin();
        self.store
            .current(&mut tx)
            .await?
            .ok_or_else(|| BookingError::NotFound {
                entity: "quota pool",
                key: "pool".to_string(),
            })
    }
}

impl std::fmt::Debug for QuotaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaService")
            .field("daily_capacity", &self.store.daily_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn decrement_policy_parses_case_insensitively() {
        assert_eq!("Per-Seat".parse(), Ok(QuotaDecrement::PerSeat));
        assert_eq!("per-request".parse(), Ok(QuotaDecrement::PerRequest));
        assert!("each".parse::<QuotaDecrement>().is_err());
        assert_eq!(QuotaDecrement::PerSeat.to_string(), "per-seat");
    }

    #[test]
    fn decrement_amounts() {
        assert_eq!(QuotaDecrement::PerRequest.amount(4), 4);
        assert_eq!(QuotaDecrement::PerSeat.amount(4), 1);
    }

    #[test]
    fn next_day_crosses_month_boundary() {
        let last = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(next_day(last).unwrap().to_string(), "2025-02-01");
    }
}
