//! Reporting service
//!
//! Reads a snapshot of the claims collection and aggregates it in memory.
//! Reports may lag writes that are still in flight; nothing here takes a
//! lock or blocks a lifecycle operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use core_kernel::{Currency, RecordStore, Timezone};
use domain_directory::{Actor, DirectoryService};
use domain_reimbursement::{ClaimQuery, ClaimRepository, Clock, ReimbursementClaim};

use crate::context::ReportContext;
use crate::dashboard::DashboardStats;
use crate::error::ReportError;
use crate::export::{export, ExportOptions, ExportTable};
use crate::filter::ReportFilter;
use crate::group::{group_by, subtotals, GroupKey, GroupValue};
use crate::rollup::{Rollup, Subtotal};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub filter: ReportFilter,
    pub rollup: Rollup,
    pub dashboard: DashboardStats,
}

/// One group of an on-screen breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub value: GroupValue,
    pub label: String,
    pub subtotal: Subtotal,
}

#[derive(Clone)]
pub struct ReportingService {
    claims: ClaimRepository,
    directory: DirectoryService,
    currency: Currency,
    timezone: Timezone,
    clock: Clock,
}

impl ReportingService {
    pub fn new(store: Arc<dyn RecordStore>, directory: DirectoryService, currency: Currency, timezone: Timezone) -> Self {
        Self {
            claims: ClaimRepository::new(store),
            directory,
            currency,
            timezone,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Currency, timezone and the display names of every event and user
    pub async fn context(&self) -> Result<ReportContext, ReportError> {
        let mut ctx = ReportContext::new(self.currency, self.timezone);
        for event in self.directory.list_events(None).await? {
            ctx = ctx.with_event(event.value.id, event.value.name);
        }
        for user in self.directory.list_users(None).await? {
            ctx = ctx.with_user(user.value.id, user.value.display_name);
        }
        Ok(ctx)
    }

    /// Narrows `filter` to what the actor may see
    async fn scope(&self, actor: &Actor, mut filter: ReportFilter) -> Result<ReportFilter, ReportError> {
        self.directory.ensure_active(actor).await?;
        if !actor.can_review() {
            filter.user_id = Some(actor.user_id);
        }
        Ok(filter)
    }

    /// Loads the claims matching the equality part of `filter`
    async fn load(&self, filter: &ReportFilter) -> Result<Vec<ReimbursementClaim>, ReportError> {
        let query = ClaimQuery {
            status: filter.status,
            submitted_by: filter.user_id,
            event_id: filter.event_id,
        };
        let claims: Vec<ReimbursementClaim> = self
            .claims
            .list(query)
            .await?
            .into_iter()
            .map(|v| v.value)
            .collect();
        debug!(count = claims.len(), "claims loaded for report");
        Ok(claims)
    }

    /// Dashboard rollup of the claims the actor may see
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn summary(&self, actor: &Actor, filter: ReportFilter) -> Result<ReportSummary, ReportError> {
        let filter = self.scope(actor, filter).await?;
        let claims = self.load(&filter).await?;
        let ctx = self.context().await?;

        let selected = filter.apply(&claims, self.now(), &ctx.timezone)?;
        let rollup = Rollup::from_claims(selected.iter().copied(), ctx.currency)?;
        debug!(selected = selected.len(), "summary aggregated");
        let dashboard = DashboardStats::from_rollup(&rollup, &ctx);
        Ok(ReportSummary { filter, rollup, dashboard })
    }

    /// Subtotals per group, in group order
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn breakdown(&self, actor: &Actor, filter: ReportFilter, key: GroupKey) -> Result<Vec<GroupSummary>, ReportError> {
        let filter = self.scope(actor, filter).await?;
        let claims = self.load(&filter).await?;
        let ctx = self.context().await?;

        let selected = filter.apply(&claims, self.now(), &ctx.timezone)?;
        let groups = group_by(selected, key, &ctx.timezone);
        let sums = subtotals(&groups, ctx.currency)?;
        Ok(sums
            .into_iter()
            .map(|(value, subtotal)| GroupSummary {
                label: ctx.group_label(&value),
                value,
                subtotal,
            })
            .collect())
    }

    /// Export rows; validators and admins only
    #[instrument(skip(self, options), fields(actor = %actor.user_id, group_by = ?options.group_by))]
    pub async fn export(&self, actor: &Actor, options: &ExportOptions) -> Result<ExportTable, ReportError> {
        self.directory.ensure_active(actor).await?;
        if !actor.can_review() {
            return Err(ReportError::Unauthorized("export requires the validator or admin role".into()));
        }
        let claims = self.load(&options.filter).await?;
        let ctx = self.context().await?;
        let table = export(&claims, options, &ctx, self.now())?;
        debug!(rows = table.rows.len(), "export built");
        Ok(table)
    }
}
