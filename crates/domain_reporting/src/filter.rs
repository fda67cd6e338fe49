//! Report filters
//!
//! Filtering always runs before grouping and subtotalling, on the raw claim
//! records. Date windows are inclusive at both ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_kernel::{DateRange, EventId, TimeRange, Timezone, UserId};
use domain_reimbursement::{ClaimStatus, ReimbursementClaim};

use crate::error::ReportError;

/// Which submission dates a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateRangeFilter {
    /// No date filtering
    #[default]
    All,
    /// Whole calendar days from `start` through `end`, in the report timezone
    Dates { start: chrono::NaiveDate, end: chrono::NaiveDate },
    /// An explicit window of instants
    Window { start: DateTime<Utc>, end: DateTime<Utc> },
    /// The `days` days up to and including now
    LastDays { days: u32 },
}

impl DateRangeFilter {
    pub fn last30() -> Self {
        DateRangeFilter::LastDays { days: 30 }
    }

    pub fn last90() -> Self {
        DateRangeFilter::LastDays { days: 90 }
    }

    pub fn dates(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Result<Self, ReportError> {
        DateRange::new(start, end)?;
        Ok(DateRangeFilter::Dates { start, end })
    }

    /// Resolves to a concrete window, or `None` for `All`
    pub fn resolve(&self, now: DateTime<Utc>, tz: &Timezone) -> Result<Option<TimeRange>, ReportError> {
        Ok(match *self {
            DateRangeFilter::All => None,
            DateRangeFilter::Dates { start, end } => Some(DateRange::new(start, end)?.to_time_range(tz)),
            DateRangeFilter::Window { start, end } => Some(TimeRange::new(start, end)?),
            DateRangeFilter::LastDays { days } => Some(TimeRange::last_days(now, days)),
        })
    }
}

impl FromStr for DateRangeFilter {
    type Err = ReportError;

    /// Parses the presets offered by the export dialog
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DateRangeFilter::All),
            "last30" => Ok(Self::last30()),
            "last90" => Ok(Self::last90()),
            other => Err(ReportError::invalid_filter(format!("unknown date range preset {other:?}"))),
        }
    }
}

/// Keeps only the claims submitted inside `window`
pub fn filter_by_date_range<'a, I>(claims: I, window: Option<TimeRange>) -> Vec<&'a ReimbursementClaim>
where
    I: IntoIterator<Item = &'a ReimbursementClaim>,
{
    claims
        .into_iter()
        .filter(|c| window.map_or(true, |w| w.contains(c.submitted_at())))
        .collect()
}

/// Everything a report can be narrowed by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub date_range: DateRangeFilter,
    pub status: Option<ClaimStatus>,
    pub event_id: Option<EventId>,
    pub user_id: Option<UserId>,
}

impl ReportFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn date_range(mut self, range: DateRangeFilter) -> Self {
        self.date_range = range;
        self
    }

    pub fn status(mut self, status: ClaimStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn event(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    fn accepts(&self, claim: &ReimbursementClaim, window: Option<TimeRange>) -> bool {
        self.status.map_or(true, |s| claim.status() == s)
            && self.event_id.map_or(true, |e| claim.event_id() == e)
            && self.user_id.map_or(true, |u| claim.submitted_by() == u)
            && window.map_or(true, |w| w.contains(claim.submitted_at()))
    }

    /// Returns the matching claims in their original order
    pub fn apply<'a, I>(&self, claims: I, now: DateTime<Utc>, tz: &Timezone) -> Result<Vec<&'a ReimbursementClaim>, ReportError>
    where
        I: IntoIterator<Item = &'a ReimbursementClaim>,
    {
        let window = self.date_range.resolve(now, tz)?;
        Ok(claims.into_iter().filter(|c| self.accepts(c, window)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_presets() {
        assert_eq!("all".parse::<DateRangeFilter>().unwrap(), DateRangeFilter::All);
        assert_eq!(
            "last90".parse::<DateRangeFilter>().unwrap(),
            DateRangeFilter::LastDays { days: 90 }
        );
        assert!("yesterday".parse::<DateRangeFilter>().is_err());
    }

    #[test]
    fn test_last_days_window() {
        let now = Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap();
        let window = DateRangeFilter::last30()
            .resolve(now, &Timezone::jakarta())
            .unwrap()
            .unwrap();
        assert_eq!(window.end, now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_dates_cover_whole_local_days() {
        let window = DateRangeFilter::dates(date(2025, 5, 1), date(2025, 5, 2))
            .unwrap()
            .resolve(Utc::now(), &Timezone::jakarta())
            .unwrap()
            .unwrap();
        // Jakarta is UTC+7
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 4, 30, 17, 0, 0).unwrap());
        assert!(window.contains(Utc.with_ymd_and_hms(2025, 5, 2, 16, 59, 59).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2025, 5, 2, 17, 0, 0).unwrap()));
    }

    #[test]
    fn test_reversed_dates_rejected() {
        assert!(matches!(
            DateRangeFilter::dates(date(2025, 5, 2), date(2025, 5, 1)),
            Err(ReportError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_filter_json_shape() {
        let filter: ReportFilter =
            serde_json::from_str(r#"{"date_range": {"kind": "last_days", "days": 30}, "status": "approved"}"#).unwrap();
        assert_eq!(filter.date_range, DateRangeFilter::last30());
        assert_eq!(filter.status, Some(ClaimStatus::Approved));
        assert!(filter.event_id.is_none());
    }
}
