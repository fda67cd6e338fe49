//! Pre-built Test Fixtures
//!
//! Ready-to-use data and a wired-up in-memory world for lifecycle and
//! reporting tests. Sample data lives here and nowhere in production code.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, RwLock};

use core_kernel::store::mock::{InMemoryFileStore, InMemoryRecordStore};
use core_kernel::{ClaimId, Currency, EventId, Money, ReceiptRef, Timezone, UserId, Versioned};
use domain_directory::{Actor, CategoryFlags, DirectoryService, Event, ExpenseCategory, NewUser, Role};
use domain_reimbursement::{
    BudgetPolicy, ClarificationInput, Clock, LifecycleConfig, NewClaim, NewExpenseItem, ReimbursementClaim,
    ReimbursementService,
};

use crate::builders::{EventBuilder, NewClaimBuilder, UserBuilder};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// An IDR amount in whole rupiah
    pub fn idr(rupiah: i64) -> Money {
        Money::from_minor(rupiah, Currency::IDR)
    }

    pub fn idr_zero() -> Money {
        Money::zero(Currency::IDR)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd(cents: i64) -> Money {
        Money::from_minor(cents, Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// 2025-03-10 09:00 in Jakarta
    pub fn submitted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0).unwrap()
    }

    pub fn expense_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 8).unwrap()
    }

    pub fn event_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 6).unwrap()
    }

    pub fn event_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 8).unwrap()
    }

    pub fn jakarta() -> Timezone {
        Timezone::jakarta()
    }
}

/// A receipt reference that looks like an uploaded file
pub fn receipt(name: &str) -> ReceiptRef {
    ReceiptRef::new(format!("receipts/{name}"))
}

/// The three-item claim used by the mixed outcome scenario
///
/// Accommodation 1 500 000, transportation 850 000 and meals 850 000,
/// for a total of 3 200 000.
pub fn mixed_scenario_items() -> Vec<NewExpenseItem> {
    vec![
        NewExpenseItem::new(ExpenseCategory::Accommodation, MoneyFixtures::idr(1_500_000), "Hotel 2 malam", receipt("hotel.pdf")),
        NewExpenseItem::new(ExpenseCategory::Transportation, MoneyFixtures::idr(850_000), "Tiket kereta", receipt("kereta.pdf")),
        NewExpenseItem::new(ExpenseCategory::Meals, MoneyFixtures::idr(850_000), "Makan malam tim", receipt("makan.jpg")),
    ]
}

/// A settable clock shared between a test and the services it drives
#[derive(Clone)]
pub struct TestClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }

    pub fn as_clock(&self) -> Clock {
        let this = self.clone();
        Arc::new(move || this.now())
    }
}

/// A fully wired in-memory system: stores, services, one actor per role
/// and an upcoming event accepting every category
pub struct TestWorld {
    pub store: Arc<InMemoryRecordStore>,
    pub files: Arc<InMemoryFileStore>,
    pub directory: DirectoryService,
    pub service: ReimbursementService,
    pub clock: TestClock,
    pub admin: Actor,
    pub validator: Actor,
    pub user: Actor,
    pub event: Event,
}

impl TestWorld {
    pub async fn new() -> Self {
        Self::with_config(LifecycleConfig::default()).await
    }

    pub async fn with_budget_policy(policy: BudgetPolicy) -> Self {
        Self::with_config(LifecycleConfig::default().with_budget_policy(policy)).await
    }

    pub async fn with_config(config: LifecycleConfig) -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let files = Arc::new(InMemoryFileStore::default());
        let directory = DirectoryService::new(store.clone());
        let clock = TestClock::at(TemporalFixtures::submitted_at());

        let admin = directory
            .bootstrap_admin(UserBuilder::new().with_name("Admin Keuangan").build())
            .await
            .expect("bootstrap admin")
            .expect("directory starts empty")
            .value
            .actor();
        let validator = directory
            .create_user(&admin, UserBuilder::new().with_name("Budi Validator").with_role(Role::Validator).build())
            .await
            .expect("create validator")
            .value
            .actor();
        let user = directory
            .create_user(&admin, UserBuilder::new().with_name("Siti Rahma").build())
            .await
            .expect("create user")
            .value
            .actor();
        let event = directory
            .create_event(&admin, EventBuilder::new().with_categories(CategoryFlags::all()).build())
            .await
            .expect("create event")
            .value;

        let service = ReimbursementService::new(store.clone(), files.clone(), directory.clone(), config)
            .with_clock(clock.as_clock());

        Self {
            store,
            files,
            directory,
            service,
            clock,
            admin,
            validator,
            user,
            event,
        }
    }

    /// Adds another active user with the given role
    pub async fn add_user(&self, name: &str, role: Role) -> Actor {
        let input: NewUser = UserBuilder::new().with_name(name).with_role(role).build();
        self.directory
            .create_user(&self.admin, input)
            .await
            .expect("create user")
            .value
            .actor()
    }

    /// Adds another event
    pub async fn add_event(&self, builder: EventBuilder) -> Event {
        self.directory
            .create_event(&self.admin, builder.build())
            .await
            .expect("create event")
            .value
    }

    /// A claim builder against the world's event
    pub fn claim(&self) -> NewClaimBuilder {
        NewClaimBuilder::new(self.event.id)
    }

    /// Submits `input` as the world's user
    pub async fn submit(&self, input: NewClaim) -> Versioned<ReimbursementClaim> {
        self.service
            .create_claim(&self.user, input)
            .await
            .expect("submit claim")
    }

    /// Submits the three-item mixed scenario claim as the world's user
    pub async fn submit_mixed(&self) -> Versioned<ReimbursementClaim> {
        self.submit(self.claim().with_items(mixed_scenario_items()).build()).await
    }

    /// Submits a claim and moves it into `needs_clarification`
    pub async fn submit_needing_clarification(&self, message: &str) -> Versioned<ReimbursementClaim> {
        let claim = self.submit(self.claim().with_item(ExpenseCategory::Meals, 250_000).build()).await;
        self.service
            .request_clarification(
                &self.validator,
                claim.value.id(),
                ClarificationInput {
                    message: message.to_string(),
                    ..ClarificationInput::default()
                },
                claim.version,
            )
            .await
            .expect("request clarification")
    }
}

/// Ten claims spread around an inclusive reporting window
///
/// The window runs from `start` through `end`. Two claims sit exactly on
/// `start` and two exactly on `end`; one sits a second before `start` and
/// one a second after `end`; the other four fall strictly inside.
pub struct BoundaryFixture {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub claims: Vec<ReimbursementClaim>,
}

impl BoundaryFixture {
    pub fn new() -> Self {
        let tz = Timezone::jakarta();
        let start = tz.start_of_day(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        let end = tz.end_of_day(NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
        let submitter = Actor::new(UserId::new(), Role::User);
        let other = Actor::new(UserId::new(), Role::User);
        let validator = Actor::new(UserId::new(), Role::Validator);
        let event = EventBuilder::new()
            .with_categories(CategoryFlags::all())
            .build_event(EventId::new(), UserId::new());

        let second = Duration::seconds(1);
        let placements: [(DateTime<Utc>, &Actor, i64, Outcome); 10] = [
            (start - second, &submitter, 100_000, Outcome::Approved),
            (start, &submitter, 200_000, Outcome::Approved),
            (start, &other, 300_000, Outcome::Pending),
            (start + Duration::days(3), &submitter, 400_000, Outcome::Rejected),
            (start + Duration::days(10), &other, 500_000, Outcome::NeedsClarification),
            (start + Duration::days(15), &submitter, 600_000, Outcome::Approved),
            (end - Duration::days(2), &other, 700_000, Outcome::Pending),
            (end, &submitter, 800_000, Outcome::Rejected),
            (end, &other, 900_000, Outcome::Approved),
            (end + second, &submitter, 1_000_000, Outcome::Rejected),
        ];

        let claims = placements
            .into_iter()
            .map(|(at, actor, amount, outcome)| {
                let input = NewClaimBuilder::new(event.id)
                    .with_item(ExpenseCategory::Transportation, amount)
                    .build();
                let claim = ReimbursementClaim::submit(
                    ClaimId::new_v7(),
                    actor,
                    &event,
                    input,
                    Currency::IDR,
                    BudgetPolicy::Enforce,
                    at,
                )
                .expect("fixture claim is valid");
                outcome.apply(claim, &validator, at)
            })
            .collect();

        Self { start, end, claims }
    }

    /// Claims whose submission instant lies within `[start, end]`, found by hand
    pub fn inside(&self) -> Vec<&ReimbursementClaim> {
        self.claims
            .iter()
            .filter(|c| c.submitted_at() >= self.start && c.submitted_at() <= self.end)
            .collect()
    }
}

impl Default for BoundaryFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a fixture claim ends up after review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Approved,
    Rejected,
    NeedsClarification,
}

impl Outcome {
    pub fn apply(self, mut claim: ReimbursementClaim, validator: &Actor, at: DateTime<Utc>) -> ReimbursementClaim {
        let later = at + Duration::hours(1);
        match self {
            Outcome::Pending => {}
            Outcome::Approved => claim.approve(validator, later).expect("approve fixture claim"),
            Outcome::Rejected => claim
                .reject(validator, "Nota tidak sesuai", later)
                .expect("reject fixture claim"),
            Outcome::NeedsClarification => {
                claim
                    .request_clarification(
                        validator,
                        ClarificationInput {
                            message: "Mohon lampirkan nota asli".into(),
                            ..ClarificationInput::default()
                        },
                        later,
                    )
                    .expect("request clarification on fixture claim");
            }
        }
        claim.take_events();
        claim
    }
}
