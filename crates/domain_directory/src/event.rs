//! Events
//!
//! An event is the organisational context a claim belongs to (a conference,
//! a field trip). It decides which expense categories may be claimed and may
//! carry a budget ceiling for a single claim.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{DateRange, EventId, Money, UserId};

use crate::category::ExpenseCategory;
use crate::error::DirectoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Active,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Active => "active",
            EventStatus::Completed => "completed",
        }
    }
}

/// Which expense categories an event accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFlags {
    #[serde(default = "enabled")]
    pub allow_accommodation: bool,
    #[serde(default = "enabled")]
    pub allow_transportation: bool,
    #[serde(default = "enabled")]
    pub allow_meals: bool,
    #[serde(default)]
    pub allow_other: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CategoryFlags {
    fn default() -> Self {
        Self {
            allow_accommodation: true,
            allow_transportation: true,
            allow_meals: true,
            allow_other: false,
        }
    }
}

impl CategoryFlags {
    pub fn all() -> Self {
        Self {
            allow_other: true,
            ..Self::default()
        }
    }

    pub fn allows(&self, category: ExpenseCategory) -> bool {
        match category {
            ExpenseCategory::Accommodation => self.allow_accommodation,
            ExpenseCategory::Transportation => self.allow_transportation,
            ExpenseCategory::Meals => self.allow_meals,
            ExpenseCategory::Other => self.allow_other,
        }
    }
}

/// An event as stored in the `events` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub categories: CategoryFlags,
    pub budget_limit: Option<Money>,
    pub status: EventStatus,
    pub created_by: UserId,
}

/// Input for creating an event
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewEvent {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub categories: CategoryFlags,
    pub budget_limit: Option<Money>,
    #[serde(default = "default_status")]
    pub status: EventStatus,
}

fn default_status() -> EventStatus {
    EventStatus::Upcoming
}

/// Partial update of an event; absent fields are left as they are
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub categories: Option<CategoryFlags>,
    /// `Some(None)` clears the budget ceiling
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub budget_limit: Option<Option<Money>>,
    pub status: Option<EventStatus>,
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(value: &Option<Option<T>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(d: D) -> Result<Option<Option<T>>, D::Error> {
        Option::<T>::deserialize(d).map(Some)
    }
}

impl Event {
    /// Builds a validated event
    pub fn create(id: EventId, input: NewEvent, created_by: UserId) -> Result<Self, DirectoryError> {
        input
            .validate()
            .map_err(|e| DirectoryError::validation(e.to_string()))?;

        let event = Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description,
            location: input.location.trim().to_string(),
            start_date: input.start_date,
            end_date: input.end_date,
            categories: input.categories,
            budget_limit: input.budget_limit,
            status: input.status,
            created_by,
        };
        event.check()?;
        Ok(event)
    }

    /// Applies a partial update, validating the result as a whole
    pub fn apply(&mut self, update: EventUpdate) -> Result<(), DirectoryError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            next.description = Some(description);
        }
        if let Some(location) = update.location {
            next.location = location.trim().to_string();
        }
        if let Some(start) = update.start_date {
            next.start_date = start;
        }
        if let Some(end) = update.end_date {
            next.end_date = end;
        }
        if let Some(categories) = update.categories {
            next.categories = categories;
        }
        if let Some(limit) = update.budget_limit {
            next.budget_limit = limit;
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        next.check()?;
        *self = next;
        Ok(())
    }

    fn check(&self) -> Result<(), DirectoryError> {
        if self.name.is_empty() {
            return Err(DirectoryError::validation("event name must not be blank"));
        }
        if self.location.is_empty() {
            return Err(DirectoryError::validation("event location must not be blank"));
        }
        DateRange::new(self.start_date, self.end_date)
            .map_err(|e| DirectoryError::validation(e.to_string()))?;
        if let Some(limit) = &self.budget_limit {
            if !limit.is_positive() || !limit.is_whole_minor() {
                return Err(DirectoryError::validation(format!(
                    "budget limit must be a positive whole amount, got {}",
                    limit
                )));
            }
        }
        if ExpenseCategory::ALL.iter().all(|c| !self.categories.allows(*c)) {
            return Err(DirectoryError::validation("event must allow at least one expense category"));
        }
        Ok(())
    }

    pub fn allows(&self, category: ExpenseCategory) -> bool {
        self.categories.allows(category)
    }

    pub fn allowed_categories(&self) -> Vec<ExpenseCategory> {
        ExpenseCategory::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }

    pub fn dates(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}
