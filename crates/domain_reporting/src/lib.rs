//! Reporting Domain
//!
//! Aggregation over claim records: filters, single-pass rollups, grouping,
//! subtotals, dashboard statistics and the export projection.
//!
//! Every report follows the same order of steps:
//!
//! ```text
//! filter ──▶ group_by ──▶ subtotal (raw Money) ──▶ format
//! ```
//!
//! On-screen breakdowns and exports share [`group::group_by`], so the two
//! cannot disagree about which claim belongs to which group.

pub mod error;
pub mod filter;
pub mod rollup;
pub mod group;
pub mod context;
pub mod dashboard;
pub mod export;
pub mod service;

pub use error::ReportError;
pub use filter::{filter_by_date_range, DateRangeFilter, ReportFilter};
pub use rollup::{subtotal, Rollup, Subtotal};
pub use group::{group_by, subtotals, GroupKey, GroupValue};
pub use context::ReportContext;
pub use dashboard::{share_percent, DashboardStats, EventShare, StatusShare};
pub use export::{export, project, ExportField, ExportOptions, ExportRow, ExportTable, RowKind};
pub use service::{GroupSummary, ReportSummary, ReportingService};
