//! Report DTOs

use chrono::NaiveDate;
use serde::Deserialize;

use core_kernel::{EventId, UserId};
use domain_reimbursement::ClaimStatus;
use domain_reporting::{DateRangeFilter, GroupKey, ReportFilter};

use crate::error::ApiError;

/// Query string shared by the summary and breakdown endpoints
///
/// Either `start` and `end` (inclusive calendar days) or a `range` preset
/// (`all`, `last30`, `last90`) selects the dates.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub range: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub status: Option<ClaimStatus>,
    pub event_id: Option<EventId>,
    pub user_id: Option<UserId>,
    pub group_by: Option<String>,
}

impl ReportQuery {
    pub fn filter(&self) -> Result<ReportFilter, ApiError> {
        let date_range = match (self.start, self.end, self.range.as_deref()) {
            (Some(start), Some(end), None) => DateRangeFilter::dates(start, end)?,
            (None, None, Some(preset)) => preset.parse()?,
            (None, None, None) => DateRangeFilter::All,
            _ => {
                return Err(ApiError::validation(
                    "give either both start and end, or a range preset",
                ))
            }
        };
        Ok(ReportFilter {
            date_range,
            status: self.status,
            event_id: self.event_id,
            user_id: self.user_id,
        })
    }

    pub fn group_key(&self) -> Result<GroupKey, ApiError> {
        match self.group_by.as_deref() {
            Some(key) => Ok(key.parse()?),
            None => Err(ApiError::validation("group_by is required")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_dates() {
        let query = ReportQuery {
            start: NaiveDate::from_ymd_opt(2025, 4, 1),
            end: NaiveDate::from_ymd_opt(2025, 4, 30),
            ..ReportQuery::default()
        };
        let filter = query.filter().unwrap();
        assert!(matches!(filter.date_range, DateRangeFilter::Dates { .. }));
    }

    #[test]
    fn test_half_open_range_is_refused() {
        let query = ReportQuery {
            start: NaiveDate::from_ymd_opt(2025, 4, 1),
            ..ReportQuery::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn test_presets_and_group_keys() {
        let query = ReportQuery {
            range: Some("last90".to_string()),
            group_by: Some("date".to_string()),
            ..ReportQuery::default()
        };
        assert_eq!(query.filter().unwrap().date_range, DateRangeFilter::last90());
        assert_eq!(query.group_key().unwrap(), GroupKey::Month);
    }
}
