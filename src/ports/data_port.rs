//! Series source port.
//!
//! Implementations may return partial or empty series; callers tolerate both.

use crate::domain::error::InfogainError;
use crate::domain::series::Series;
use chrono::NaiveDate;

pub trait SeriesPort {
    /// Observations of `indicator_id` within `[start, end]`, ascending.
    fn get_series(
        &self,
        indicator_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, InfogainError>;

    /// Daily reference price of `asset` within `[start, end]`, ascending.
    fn get_price_series(
        &self,
        asset: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, InfogainError>;
}
