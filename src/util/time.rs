//! Time utilities: uptime tracking and business date ranges

use std::time::Instant;

use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::validate::ValidationError;

/// Days covered by a report when the caller gives no range
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Current business date (UTC)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Monday on or before `date`; `None` before the first representable Monday
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Fill missing bounds (last [`DEFAULT_RANGE_DAYS`] days ending `today`) and check ordering
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let span = Duration::days(DEFAULT_RANGE_DAYS - 1);
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) => (from, to),
            (Some(from), None) => (from, today.max(from)),
            (None, Some(to)) => (days_before(to, span, "to")?, to),
            (None, None) => (days_before(today, span, "from")?, today),
        };

        if from > to {
            return Err(ValidationError::new("from", "must not be after `to`"));
        }
        Ok(Self { from, to })
    }

    /// PostgREST filter restricting `column` to the range
    pub fn filter(&self, column: &str) -> String {
        format!(
            "{column}=gte.{}&{column}=lte.{}",
            self.from,
            self.to,
            column = column
        )
    }

    /// Same range with `from` moved back to its Monday, for week-keyed rows
    pub fn widened_to_weeks(self) -> Result<Self, ValidationError> {
        let from = week_start(self.from)
            .ok_or_else(|| ValidationError::new("from", "date out of range"))?;
        Ok(Self { from, ..self })
    }
}

fn days_before(date: NaiveDate, span: Duration, field: &'static str) -> Result<NaiveDate, ValidationError> {
    date.checked_sub_signed(span)
        .ok_or_else(|| ValidationError::new(field, "date out of range"))
}
