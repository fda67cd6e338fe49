//! Grouping of claim records
//!
//! [`group_by`] is the one partitioning function behind both the on-screen
//! breakdowns and export grouping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use core_kernel::{Currency, EventId, Timezone, UserId, YearMonth};
use domain_reimbursement::{ClaimStatus, ReimbursementClaim};

use crate::error::ReportError;
use crate::rollup::{subtotal, Subtotal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Status,
    User,
    Event,
    /// Calendar month of submission in the report timezone
    #[serde(alias = "date")]
    Month,
}

impl GroupKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKey::Status => "status",
            GroupKey::User => "user",
            GroupKey::Event => "event",
            GroupKey::Month => "month",
        }
    }
}

impl FromStr for GroupKey {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(GroupKey::Status),
            "user" => Ok(GroupKey::User),
            "event" => Ok(GroupKey::Event),
            // the export dialog calls the monthly grouping "date"
            "month" | "date" => Ok(GroupKey::Month),
            other => Err(ReportError::invalid_filter(format!("unknown group key {other:?}"))),
        }
    }
}

/// The value a claim was grouped under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum GroupValue {
    Status(ClaimStatus),
    User(UserId),
    Event(EventId),
    Month(YearMonth),
}

impl GroupValue {
    pub fn of(claim: &ReimbursementClaim, key: GroupKey, tz: &Timezone) -> Self {
        match key {
            GroupKey::Status => GroupValue::Status(claim.status()),
            GroupKey::User => GroupValue::User(claim.submitted_by()),
            GroupKey::Event => GroupValue::Event(claim.event_id()),
            GroupKey::Month => GroupValue::Month(tz.month_of(claim.submitted_at())),
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Status(s) => write!(f, "{s}"),
            GroupValue::User(u) => write!(f, "{u}"),
            GroupValue::Event(e) => write!(f, "{e}"),
            GroupValue::Month(m) => write!(f, "{m}"),
        }
    }
}

/// Partitions claims by `key`; order within each group follows the input
pub fn group_by<'a, I>(claims: I, key: GroupKey, tz: &Timezone) -> BTreeMap<GroupValue, Vec<&'a ReimbursementClaim>>
where
    I: IntoIterator<Item = &'a ReimbursementClaim>,
{
    let mut groups: BTreeMap<GroupValue, Vec<&'a ReimbursementClaim>> = BTreeMap::new();
    for claim in claims {
        groups.entry(GroupValue::of(claim, key, tz)).or_default().push(claim);
    }
    groups
}

/// Subtotal of each group
pub fn subtotals(
    groups: &BTreeMap<GroupValue, Vec<&ReimbursementClaim>>,
    currency: Currency,
) -> Result<BTreeMap<GroupValue, Subtotal>, ReportError> {
    groups
        .iter()
        .map(|(value, claims)| Ok((*value, subtotal(claims.iter().copied(), currency)?)))
        .collect()
}
