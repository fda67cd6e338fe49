//! Test Data Builders
//!
//! Builder patterns for constructing test inputs with sensible defaults.
//! Tests set only the fields they care about; names and emails that do not
//! matter are generated with `fake`.

use chrono::NaiveDate;
use fake::faker::address::en::CityName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;

use core_kernel::{EventId, Money, UserId};
use domain_directory::{CategoryFlags, Event, EventStatus, ExpenseCategory, NewEvent, NewUser, Role};
use domain_reimbursement::{NewClaim, NewExpenseItem};

use crate::fixtures::{receipt, MoneyFixtures, TemporalFixtures};

/// Builder for claim submissions
pub struct NewClaimBuilder {
    event_id: EventId,
    expense_date: NaiveDate,
    description: Option<String>,
    items: Vec<NewExpenseItem>,
}

impl NewClaimBuilder {
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            expense_date: TemporalFixtures::expense_date(),
            description: None,
            items: Vec::new(),
        }
    }

    pub fn with_expense_date(mut self, date: NaiveDate) -> Self {
        self.expense_date = date;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an IDR item with a generated receipt reference
    pub fn with_item(mut self, category: ExpenseCategory, rupiah: i64) -> Self {
        let n = self.items.len() + 1;
        self.items.push(NewExpenseItem::new(
            category,
            MoneyFixtures::idr(rupiah),
            format!("{} #{n}", category.label()),
            receipt(&format!("nota-{n}.jpg")),
        ));
        self
    }

    pub fn with_money_item(mut self, category: ExpenseCategory, amount: Money) -> Self {
        let n = self.items.len() + 1;
        self.items
            .push(NewExpenseItem::new(category, amount, "", receipt(&format!("nota-{n}.jpg"))));
        self
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = NewExpenseItem>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn build(self) -> NewClaim {
        NewClaim {
            event_id: self.event_id,
            expense_date: self.expense_date,
            description: self.description,
            items: self.items,
        }
    }
}

/// Builder for event inputs
pub struct EventBuilder {
    name: String,
    location: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    categories: CategoryFlags,
    budget_limit: Option<Money>,
    status: EventStatus,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBuilder {
    pub fn new() -> Self {
        let city: String = CityName().fake();
        Self {
            name: format!("Rapat Koordinasi {city}"),
            location: city,
            start_date: TemporalFixtures::event_start(),
            end_date: TemporalFixtures::event_end(),
            categories: CategoryFlags::default(),
            budget_limit: None,
            status: EventStatus::Upcoming,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_categories(mut self, categories: CategoryFlags) -> Self {
        self.categories = categories;
        self
    }

    /// Budget ceiling in whole rupiah
    pub fn with_budget(mut self, rupiah: i64) -> Self {
        self.budget_limit = Some(MoneyFixtures::idr(rupiah));
        self
    }

    pub fn with_budget_money(mut self, limit: Money) -> Self {
        self.budget_limit = Some(limit);
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> NewEvent {
        NewEvent {
            name: self.name,
            description: None,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            categories: self.categories,
            budget_limit: self.budget_limit,
            status: self.status,
        }
    }

    /// Builds the event record directly, without a directory
    pub fn build_event(self, id: EventId, created_by: UserId) -> Event {
        Event::create(id, self.build(), created_by).expect("builder produces a valid event")
    }
}

/// Builder for user inputs
pub struct UserBuilder {
    email: String,
    display_name: String,
    role: Role,
    department: Option<String>,
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder {
    pub fn new() -> Self {
        Self {
            email: SafeEmail().fake(),
            display_name: Name().fake(),
            role: Role::User,
            department: Some("Keuangan".to_string()),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_department(mut self, department: Option<&str>) -> Self {
        self.department = department.map(str::to_string);
        self
    }

    pub fn build(self) -> NewUser {
        NewUser {
            email: self.email,
            display_name: self.display_name,
            role: self.role,
            department: self.department,
        }
    }
}
