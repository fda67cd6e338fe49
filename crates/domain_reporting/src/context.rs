//! Reporting context: currency, timezone and display names

use std::collections::HashMap;

use core_kernel::{Currency, EventId, Timezone, UserId};
use domain_reimbursement::ClaimStatus;

use crate::group::GroupValue;

/// Everything a report needs besides the claims themselves
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub currency: Currency,
    /// Timezone used for date windows, month buckets and rendered dates
    pub timezone: Timezone,
    pub event_names: HashMap<EventId, String>,
    pub user_names: HashMap<UserId, String>,
}

impl Default for ReportContext {
    fn default() -> Self {
        Self::new(Currency::IDR, Timezone::jakarta())
    }
}

impl ReportContext {
    pub fn new(currency: Currency, timezone: Timezone) -> Self {
        Self {
            currency,
            timezone,
            event_names: HashMap::new(),
            user_names: HashMap::new(),
        }
    }

    pub fn with_event(mut self, id: EventId, name: impl Into<String>) -> Self {
        self.event_names.insert(id, name.into());
        self
    }

    pub fn with_user(mut self, id: UserId, name: impl Into<String>) -> Self {
        self.user_names.insert(id, name.into());
        self
    }

    /// Event name, or the id when the event is unknown
    pub fn event_label(&self, id: EventId) -> String {
        self.event_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// User display name, or the id when the user is unknown
    pub fn user_label(&self, id: UserId) -> String {
        self.user_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    pub fn status_label(&self, status: ClaimStatus) -> String {
        status.label().to_string()
    }

    pub fn group_label(&self, value: &GroupValue) -> String {
        match value {
            GroupValue::Status(s) => self.status_label(*s),
            GroupValue::User(u) => self.user_label(*u),
            GroupValue::Event(e) => self.event_label(*e),
            GroupValue::Month(m) => m.to_string(),
        }
    }
}
