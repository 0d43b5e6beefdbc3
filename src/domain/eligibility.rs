//! Eligibility Filter
//!
//! Age-window and exchange-coverage rules applied to aggregated candidates.
//! Pure; takes `today` explicitly so it can be tested without a clock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::candidate::TickerCandidate;

#[derive(Debug, Error, PartialEq)]
pub enum EligibilityError {
    #[error("min_age_days ({min}) must be <= max_age_days ({max})")]
    InvertedWindow { min: i64, max: i64 },

    #[error("min_age_days must be >= 0, got {0}")]
    NegativeMinAge(i64),
}

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooNew { age_days: i64 },
    TooOld { age_days: i64 },
    TooFewExchanges { count: usize },
}

/// Inclusive age window plus minimum exchange coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityFilter {
    pub min_age_days: i64,
    pub max_age_days: i64,
    pub min_exchanges: usize,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self {
            min_age_days: 7,
            max_age_days: 90,
            min_exchanges: 1,
        }
    }
}

impl EligibilityFilter {
    pub fn new(min_age_days: i64, max_age_days: i64, min_exchanges: usize) -> Result<Self, EligibilityError> {
        let filter = Self {
            min_age_days,
            max_age_days,
            min_exchanges,
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<(), EligibilityError> {
        if self.min_age_days < 0 {
            return Err(EligibilityError::NegativeMinAge(self.min_age_days));
        }
        if self.min_age_days > self.max_age_days {
            return Err(EligibilityError::InvertedWindow {
                min: self.min_age_days,
                max: self.max_age_days,
            });
        }
        Ok(())
    }

    /// Check a single candidate
    pub fn check(&self, candidate: &TickerCandidate, today: NaiveDate) -> Result<(), Rejection> {
        let age_days = candidate.age_days(today);

        // Future listings have negative age and fall below the lower bound
        if age_days < self.min_age_days {
            return Err(Rejection::TooNew { age_days });
        }
        if age_days > self.max_age_days {
            return Err(Rejection::TooOld { age_days });
        }
        let count = candidate.exchange_count();
        if count < self.min_exchanges {
            return Err(Rejection::TooFewExchanges { count });
        }
        Ok(())
    }

    /// Whether a listing of the given age is past `max_age_days` and can never pass
    pub fn is_older_than_window(&self, age_days: i64) -> bool {
        age_days > self.max_age_days
    }

    /// Keep candidates passing every rule, preserving input order
    pub fn filter<'a, I>(&self, candidates: I, today: NaiveDate) -> Vec<TickerCandidate>
    where
        I: IntoIterator<Item = &'a TickerCandidate>,
    {
        candidates
            .into_iter()
            .filter(|candidate| match self.check(candidate, today) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::debug!("Rejected {}: {:?}", candidate.symbol, reason);
                    false
                }
            })
            .cloned()
            .collect()
    }
}
