//! Reporting tests
//!
//! # Test Organization
//!
//! - `aggregation` - rollup sums and bucket properties
//! - `filtering` - inclusive date windows and the boundary fixture
//! - `grouping` - group_by and subtotals
//! - `exporting` - export projection and formatting
//! - `service` - the reporting service over the in-memory world

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use core_kernel::{Currency, Money, Timezone, YearMonth};
use domain_directory::{ExpenseCategory, Role};
use domain_reimbursement::{ClaimStatus, ItemDecision, ReimbursementClaim};
use domain_reporting::{
    filter_by_date_range, group_by, project, subtotal, subtotals, DateRangeFilter, ExportField, ExportOptions,
    GroupKey, GroupValue, ReportContext, ReportError, ReportFilter, ReportingService, Rollup, RowKind,
};
use test_utils::{claims_strategy, submitted_at_strategy, BoundaryFixture, MoneyFixtures, TestWorld};

fn idr(rupiah: i64) -> Money {
    MoneyFixtures::idr(rupiah)
}

fn sum_totals<'a>(claims: impl IntoIterator<Item = &'a ReimbursementClaim>) -> Money {
    let totals: Vec<Money> = claims.into_iter().map(|c| c.total_amount()).collect();
    Money::try_sum(Currency::IDR, &totals).unwrap()
}

// ============================================================================
// AGGREGATION
// ============================================================================

mod aggregation {
    use super::*;

    proptest! {
        #[test]
        fn prop_status_buckets_partition_the_total(claims in claims_strategy(40)) {
            let rollup = Rollup::from_claims(&claims, Currency::IDR).unwrap();

            let bucket_count: usize = rollup.by_status.values().map(|s| s.count).sum();
            let bucket_total = Money::try_sum(Currency::IDR, rollup.by_status.values().map(|s| &s.total_amount)).unwrap();

            prop_assert_eq!(rollup.by_status.len(), 4);
            prop_assert_eq!(bucket_count, claims.len());
            prop_assert_eq!(rollup.overall.count, claims.len());
            prop_assert_eq!(bucket_total, sum_totals(&claims));
            prop_assert_eq!(rollup.overall.total_amount, bucket_total);
        }

        #[test]
        fn prop_event_and_user_buckets_partition_the_total(claims in claims_strategy(40)) {
            let rollup = Rollup::from_claims(&claims, Currency::IDR).unwrap();

            let by_user = Money::try_sum(Currency::IDR, rollup.by_user.values().map(|s| &s.total_amount)).unwrap();
            let by_event = Money::try_sum(Currency::IDR, rollup.by_event.values().map(|s| &s.total_amount)).unwrap();
            let user_count: usize = rollup.by_user.values().map(|s| s.count).sum();

            prop_assert_eq!(by_user, rollup.overall.total_amount);
            prop_assert_eq!(by_event, rollup.overall.total_amount);
            prop_assert_eq!(user_count, claims.len());
        }

        #[test]
        fn prop_approved_amount_never_exceeds_total(claims in claims_strategy(40)) {
            let rollup = Rollup::from_claims(&claims, Currency::IDR).unwrap();
            for sub in rollup.by_status.values() {
                prop_assert!(sub.approved_amount.amount() <= sub.total_amount.amount());
            }
            let pending = rollup.status(ClaimStatus::Pending);
            prop_assert!(pending.approved_amount.is_zero());
        }
    }

    #[test]
    fn test_empty_rollup_is_zero_filled() {
        let rollup = Rollup::from_claims(std::iter::empty(), Currency::IDR).unwrap();

        assert_eq!(rollup.overall.count, 0);
        for status in ClaimStatus::ALL {
            let sub = rollup.status(status);
            assert_eq!(sub.count, 0);
            assert!(sub.total_amount.is_zero());
        }
        assert!(rollup.by_event.is_empty());
    }

    #[test]
    fn test_foreign_currency_claim_fails_aggregation() {
        let fixture = BoundaryFixture::new();
        let err = Rollup::from_claims(&fixture.claims, Currency::USD).unwrap_err();
        assert!(matches!(err, ReportError::Aggregation(_)));
    }
}

// ============================================================================
// FILTERING
// ============================================================================

mod filtering {
    use super::*;

    #[test]
    fn test_boundary_instants_are_included() {
        let fixture = BoundaryFixture::new();
        let window = core_kernel::TimeRange::new(fixture.start, fixture.end).unwrap();

        let kept = filter_by_date_range(&fixture.claims, Some(window));

        assert_eq!(kept.len(), 8);
        assert_eq!(kept, fixture.inside());
        assert_eq!(kept.iter().filter(|c| c.submitted_at() == fixture.start).count(), 2);
        assert_eq!(kept.iter().filter(|c| c.submitted_at() == fixture.end).count(), 2);
        assert!(kept.iter().all(|c| c.submitted_at() != fixture.start - Duration::seconds(1)));
    }

    #[test]
    fn test_all_applies_no_filtering() {
        let fixture = BoundaryFixture::new();
        let kept = ReportFilter::all()
            .apply(&fixture.claims, fixture.end, &Timezone::jakarta())
            .unwrap();
        assert_eq!(kept.len(), 10);
    }

    #[test]
    fn test_calendar_dates_match_instant_window() {
        let fixture = BoundaryFixture::new();
        let by_dates = ReportFilter::all()
            .date_range(
                DateRangeFilter::dates(
                    NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
                )
                .unwrap(),
            )
            .apply(&fixture.claims, fixture.end, &Timezone::jakarta())
            .unwrap();
        assert_eq!(by_dates, fixture.inside());
    }

    #[test]
    fn test_status_and_user_filters_combine() {
        let fixture = BoundaryFixture::new();
        let submitter = fixture.claims[0].submitted_by();
        let filter = ReportFilter::all()
            .date_range(DateRangeFilter::Window {
                start: fixture.start,
                end: fixture.end,
            })
            .status(ClaimStatus::Rejected)
            .user(submitter);

        let kept = filter.apply(&fixture.claims, fixture.end, &Timezone::jakarta()).unwrap();

        let amounts: Vec<_> = kept.iter().map(|c| c.total_amount()).collect();
        assert_eq!(amounts, vec![idr(400_000), idr(800_000)]);
    }

    #[test]
    fn test_last_days_is_relative_to_now() {
        let fixture = BoundaryFixture::new();
        let now = fixture.end;
        let kept = ReportFilter::all()
            .date_range(DateRangeFilter::LastDays { days: 2 })
            .apply(&fixture.claims, now, &Timezone::jakarta())
            .unwrap();

        let amounts: Vec<_> = kept.iter().map(|c| c.total_amount()).collect();
        assert_eq!(amounts, vec![idr(700_000), idr(800_000), idr(900_000)]);
    }

    #[test]
    fn test_reversed_window_is_invalid() {
        let fixture = BoundaryFixture::new();
        let err = ReportFilter::all()
            .date_range(DateRangeFilter::Window {
                start: fixture.end,
                end: fixture.start,
            })
            .apply(&fixture.claims, fixture.end, &Timezone::jakarta())
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidFilter(_)));
    }
}

// ============================================================================
// GROUPING
// ============================================================================

mod grouping {
    use super::*;

    /// Filter then group by status, compared with buckets built by hand
    #[test]
    fn test_boundary_fixture_grouped_by_status() {
        let fixture = BoundaryFixture::new();
        let tz = Timezone::jakarta();
        let window = core_kernel::TimeRange::new(fixture.start, fixture.end).unwrap();

        let groups = group_by(filter_by_date_range(&fixture.claims, Some(window)), GroupKey::Status, &tz);
        let sums = subtotals(&groups, Currency::IDR).unwrap();

        let mut by_hand: BTreeMap<ClaimStatus, Vec<&ReimbursementClaim>> = BTreeMap::new();
        for claim in &fixture.claims {
            if claim.submitted_at() >= fixture.start && claim.submitted_at() <= fixture.end {
                by_hand.entry(claim.status()).or_default().push(claim);
            }
        }

        assert_eq!(groups.len(), by_hand.len());
        for (status, members) in &by_hand {
            let value = GroupValue::Status(*status);
            assert_eq!(groups[&value], *members);
            assert_eq!(sums[&value].count, members.len());
            assert_eq!(sums[&value].total_amount, sum_totals(members.iter().copied()));
        }

        assert_eq!(sums[&GroupValue::Status(ClaimStatus::Approved)].total_amount, idr(1_700_000));
        assert_eq!(sums[&GroupValue::Status(ClaimStatus::Pending)].total_amount, idr(1_000_000));
        assert_eq!(sums[&GroupValue::Status(ClaimStatus::Rejected)].total_amount, idr(1_200_000));
        assert_eq!(sums[&GroupValue::Status(ClaimStatus::NeedsClarification)].count, 1);
    }

    #[test]
    fn test_month_buckets_use_report_timezone() {
        let fixture = BoundaryFixture::new();
        let groups = group_by(&fixture.claims, GroupKey::Month, &Timezone::jakarta());

        let sizes: Vec<_> = groups.iter().map(|(k, v)| (k.to_string(), v.len())).collect();
        assert_eq!(
            sizes,
            vec![("2025-03".to_string(), 1), ("2025-04".to_string(), 8), ("2025-05".to_string(), 1)]
        );

        // Jakarta midnight on the first is still the previous day in UTC
        let utc = Timezone::new(chrono_tz::UTC);
        let in_utc = group_by(&fixture.claims, GroupKey::Month, &utc);
        let march = GroupValue::Month(YearMonth::new(2025, 3).unwrap());
        let april = GroupValue::Month(YearMonth::new(2025, 4).unwrap());
        assert_eq!(in_utc[&march].len(), 3);
        assert_eq!(in_utc[&april].len(), 7);
        assert_eq!(in_utc.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_filter_then_group_matches_group_subtotals(
            claims in claims_strategy(30),
            a in submitted_at_strategy(),
            b in submitted_at_strategy(),
            key in prop_oneof![Just(GroupKey::Status), Just(GroupKey::User), Just(GroupKey::Event), Just(GroupKey::Month)],
        ) {
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            let tz = Timezone::jakarta();
            let window = core_kernel::TimeRange::new(start, end).unwrap();

            let filtered = filter_by_date_range(&claims, Some(window));
            let groups = group_by(filtered.iter().copied(), key, &tz);
            let sums = subtotals(&groups, Currency::IDR).unwrap();

            let grouped_count: usize = sums.values().map(|s| s.count).sum();
            let grouped_total = Money::try_sum(Currency::IDR, sums.values().map(|s| &s.total_amount)).unwrap();
            let direct = subtotal(filtered.iter().copied(), Currency::IDR).unwrap();

            prop_assert_eq!(grouped_count, direct.count);
            prop_assert_eq!(grouped_total, direct.total_amount);
            for (value, members) in &groups {
                for claim in members {
                    prop_assert_eq!(GroupValue::of(claim, key, &tz), *value);
                    prop_assert!(window.contains(claim.submitted_at()));
                }
            }
        }
    }
}

// ============================================================================
// EXPORTING
// ============================================================================

mod exporting {
    use super::*;

    fn context(fixture: &BoundaryFixture) -> ReportContext {
        let first = &fixture.claims[0];
        ReportContext::default()
            .with_event(first.event_id(), "Rakernas Bandung")
            .with_user(first.submitted_by(), "Siti Rahma")
    }

    #[test]
    fn test_flat_export_selects_fields() {
        let fixture = BoundaryFixture::new();
        let ctx = context(&fixture);
        let claims: Vec<_> = fixture.claims.iter().collect();
        let options = ExportOptions::default().fields([ExportField::User, ExportField::Amount, ExportField::Date]);

        let table = project(&claims, &options, &ctx).unwrap();

        assert_eq!(table.headers, vec!["Pengguna", "Jumlah", "Tanggal Pengajuan"]);
        assert_eq!(table.rows.len(), 10);
        let first = &table.rows[0];
        assert_eq!(first.kind, RowKind::Claim);
        assert_eq!(first.cells.len(), 3);
        assert_eq!(first.cell(ExportField::User), Some("Siti Rahma"));
        assert_eq!(first.cell(ExportField::Amount), Some("Rp 100.000"));
        // one second before midnight, Jakarta time
        assert_eq!(first.cell(ExportField::Date), Some("31/03/2025"));
        assert_eq!(table.rows[9].cell(ExportField::Date), Some("01/05/2025"));
        assert_eq!(first.cell(ExportField::Status), None);
    }

    #[test]
    fn test_grouped_export_with_subtotals() {
        let fixture = BoundaryFixture::new();
        let ctx = context(&fixture);
        let options = ExportOptions::default()
            .filter(ReportFilter::all().date_range(DateRangeFilter::Window {
                start: fixture.start,
                end: fixture.end,
            }))
            .fields([ExportField::Status, ExportField::Amount])
            .grouped(GroupKey::Status, true);

        let table = domain_reporting::export(&fixture.claims, &options, &ctx, fixture.end).unwrap();

        assert_eq!(table.claim_rows().count(), 8);
        let subtotal_rows: Vec<_> = table.rows.iter().filter(|r| r.kind == RowKind::Subtotal).collect();
        assert_eq!(subtotal_rows.len(), 4);

        // groups follow lifecycle order: pending, approved, rejected, needs clarification
        let pending = subtotal_rows[0];
        assert_eq!(pending.group.as_deref(), Some("Menunggu"));
        assert_eq!(pending.count, Some(2));
        assert_eq!(pending.cell(ExportField::Amount), Some("Rp 1.000.000"));
        assert_eq!(pending.cell(ExportField::Status), Some("Menunggu"));
        assert_eq!(subtotal_rows[1].cell(ExportField::Amount), Some("Rp 1.700.000"));

        let total = table.rows.last().unwrap();
        assert_eq!(total.kind, RowKind::Total);
        assert_eq!(total.count, Some(8));
        assert_eq!(total.cell(ExportField::Amount), Some("Rp 4.400.000"));

        // each subtotal row directly follows the claims of its group
        let pending_claims: Vec<_> = table.rows[..2].iter().map(|r| r.cell(ExportField::Status)).collect();
        assert_eq!(pending_claims, vec![Some("Menunggu"), Some("Menunggu")]);
        assert_eq!(table.rows[2].kind, RowKind::Subtotal);
    }

    #[test]
    fn test_grouping_without_subtotals_adds_no_summary_rows() {
        let fixture = BoundaryFixture::new();
        let ctx = context(&fixture);
        let claims: Vec<_> = fixture.claims.iter().collect();
        let options = ExportOptions::default().grouped(GroupKey::Event, false);

        let table = project(&claims, &options, &ctx).unwrap();

        assert_eq!(table.rows.len(), 10);
        assert!(table.rows.iter().all(|r| r.group.as_deref() == Some("Rakernas Bandung")));
    }

    #[test]
    fn test_details_and_notes_columns() {
        let fixture = BoundaryFixture::new();
        let ctx = context(&fixture);
        let claims: Vec<_> = fixture.claims.iter().take(1).collect();
        let options = ExportOptions::default().fields([ExportField::Details, ExportField::Notes, ExportField::Id]);

        let table = project(&claims, &options, &ctx).unwrap();
        let row = &table.rows[0];

        assert_eq!(row.cell(ExportField::Details), Some("Transportasi: Rp 100.000"));
        assert_eq!(row.cell(ExportField::Notes), Some(""));
        assert!(row.cell(ExportField::Id).unwrap().starts_with("RB-"));
    }

    #[test]
    fn test_export_rows_serialize_selected_fields_only() {
        let fixture = BoundaryFixture::new();
        let ctx = context(&fixture);
        let claims: Vec<_> = fixture.claims.iter().take(1).collect();
        let options = ExportOptions::default().fields([ExportField::Amount, ExportField::Status]);

        let table = project(&claims, &options, &ctx).unwrap();
        let json = serde_json::to_value(&table.rows[0]).unwrap();

        assert_eq!(json["kind"], "claim");
        assert_eq!(json["amount"], "Rp 100.000");
        assert_eq!(json["status"], "Disetujui");
        assert!(json.get("user").is_none());
    }
}

// ============================================================================
// SERVICE
// ============================================================================

mod service {
    use super::*;

    fn reporting(world: &TestWorld) -> ReportingService {
        ReportingService::new(world.store.clone(), world.directory.clone(), Currency::IDR, Timezone::jakarta())
            .with_clock(world.clock.as_clock())
    }

    #[tokio::test]
    async fn test_summary_after_mixed_outcome() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let meals = claim.value.items()[2].id;
        let decided = world
            .service
            .decide_item(&world.validator, id, meals, ItemDecision::Reject, None, claim.version)
            .await
            .unwrap();
        world.service.approve(&world.validator, id, decided.version).await.unwrap();
        world
            .submit(world.claim().with_item(ExpenseCategory::Meals, 800_000).build())
            .await;

        let summary = reporting(&world).summary(&world.admin, ReportFilter::all()).await.unwrap();
        let stats = &summary.dashboard;

        assert_eq!(stats.claim_count, 2);
        assert_eq!(stats.total_amount, idr(4_000_000));
        assert_eq!(stats.approved_amount, idr(2_350_000));
        assert_eq!(stats.pending_amount, idr(800_000));
        assert!(stats.rejected_amount.is_zero());
        let shares: Vec<_> = stats.by_status.iter().map(|s| (s.label.as_str(), s.share_percent)).collect();
        assert_eq!(
            shares,
            vec![("Menunggu", 20), ("Disetujui", 80), ("Ditolak", 0), ("Perlu Klarifikasi", 0)]
        );
        assert_eq!(stats.by_event.len(), 1);
        assert_eq!(stats.by_event[0].event_name, world.event.name);
    }

    #[tokio::test]
    async fn test_users_see_only_their_own_numbers() {
        let world = TestWorld::new().await;
        let colleague = world.add_user("Andi", Role::User).await;
        world.submit_mixed().await;
        world
            .service
            .create_claim(&colleague, world.claim().with_item(ExpenseCategory::Meals, 75_000).build())
            .await
            .unwrap();

        let service = reporting(&world);
        let mine = service.summary(&world.user, ReportFilter::all()).await.unwrap();
        assert_eq!(mine.dashboard.claim_count, 1);
        assert_eq!(mine.filter.user_id, Some(world.user.user_id));

        let sneaky = ReportFilter::all().user(colleague.user_id);
        let still_mine = service.summary(&world.user, sneaky).await.unwrap();
        assert_eq!(still_mine.dashboard.total_amount, idr(3_200_000));

        let everyone = service.summary(&world.validator, ReportFilter::all()).await.unwrap();
        assert_eq!(everyone.dashboard.claim_count, 2);
    }

    #[tokio::test]
    async fn test_last30_uses_the_clock() {
        let world = TestWorld::new().await;
        world.submit_mixed().await;
        world.clock.advance(Duration::days(45));
        world
            .submit(world.claim().with_item(ExpenseCategory::Transportation, 300_000).build())
            .await;

        let summary = reporting(&world)
            .summary(&world.validator, ReportFilter::all().date_range(DateRangeFilter::last30()))
            .await
            .unwrap();
        assert_eq!(summary.dashboard.claim_count, 1);
        assert_eq!(summary.dashboard.total_amount, idr(300_000));
    }

    #[tokio::test]
    async fn test_breakdown_by_user_uses_display_names() {
        let world = TestWorld::new().await;
        world.submit_mixed().await;

        let groups = reporting(&world)
            .breakdown(&world.validator, ReportFilter::all(), GroupKey::User)
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "Siti Rahma");
        assert_eq!(groups[0].subtotal.total_amount, idr(3_200_000));
    }

    #[tokio::test]
    async fn test_export_requires_reviewer() {
        let world = TestWorld::new().await;
        world.submit_mixed().await;
        let service = reporting(&world);

        let err = service.export(&world.user, &ExportOptions::default()).await.unwrap_err();
        assert!(matches!(err, ReportError::Unauthorized(_)));

        let table = service.export(&world.validator, &ExportOptions::default()).await.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.headers.len(), 8);
        assert_eq!(table.rows[0].cell(ExportField::Event), Some(world.event.name.as_str()));
        assert_eq!(
            table.rows[0].cell(ExportField::Details),
            Some("Akomodasi: Rp 1.500.000; Transportasi: Rp 850.000; Konsumsi: Rp 850.000")
        );
    }

    #[tokio::test]
    async fn test_storage_failure_is_retryable() {
        let world = TestWorld::new().await;
        let service = reporting(&world);
        world.store.set_unavailable(true);

        let err = service.summary(&world.validator, ReportFilter::all()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
