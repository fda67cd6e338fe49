//! Export projection
//!
//! The pipeline is fixed: filter, group, subtotal on raw amounts, and only
//! then render cells. Rendering never feeds back into any sum.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

use domain_reimbursement::ReimbursementClaim;

use crate::context::ReportContext;
use crate::error::ReportError;
use crate::filter::ReportFilter;
use crate::group::{group_by, subtotals, GroupKey, GroupValue};
use crate::rollup::{subtotal, Subtotal};

/// A column that can be selected for export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportField {
    Id,
    User,
    Event,
    Amount,
    Status,
    /// Submission date
    Date,
    /// Per-item breakdown
    Details,
    /// Validator note
    Notes,
}

impl ExportField {
    pub const ALL: [ExportField; 8] = [
        ExportField::Id,
        ExportField::User,
        ExportField::Event,
        ExportField::Amount,
        ExportField::Status,
        ExportField::Date,
        ExportField::Details,
        ExportField::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportField::Id => "id",
            ExportField::User => "user",
            ExportField::Event => "event",
            ExportField::Amount => "amount",
            ExportField::Status => "status",
            ExportField::Date => "date",
            ExportField::Details => "details",
            ExportField::Notes => "notes",
        }
    }

    /// Column header
    pub fn header(&self) -> &'static str {
        match self {
            ExportField::Id => "ID",
            ExportField::User => "Pengguna",
            ExportField::Event => "Acara",
            ExportField::Amount => "Jumlah",
            ExportField::Status => "Status",
            ExportField::Date => "Tanggal Pengajuan",
            ExportField::Details => "Detail",
            ExportField::Notes => "Catatan",
        }
    }

    /// The column that carries the group label on subtotal rows
    fn for_group(key: GroupKey) -> ExportField {
        match key {
            GroupKey::Status => ExportField::Status,
            GroupKey::User => ExportField::User,
            GroupKey::Event => ExportField::Event,
            GroupKey::Month => ExportField::Date,
        }
    }
}

impl FromStr for ExportField {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ReportError::invalid_filter(format!("unknown export field {s:?}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    #[serde(flatten)]
    pub filter: ReportFilter,
    #[serde(default = "all_fields")]
    pub fields: Vec<ExportField>,
    #[serde(default)]
    pub group_by: Option<GroupKey>,
    #[serde(default)]
    pub include_subtotals: bool,
}

fn all_fields() -> Vec<ExportField> {
    ExportField::ALL.to_vec()
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            filter: ReportFilter::all(),
            fields: all_fields(),
            group_by: None,
            include_subtotals: false,
        }
    }
}

impl ExportOptions {
    pub fn fields(mut self, fields: impl IntoIterator<Item = ExportField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    pub fn filter(mut self, filter: ReportFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn grouped(mut self, key: GroupKey, include_subtotals: bool) -> Self {
        self.group_by = Some(key);
        self.include_subtotals = include_subtotals;
        self
    }

    /// Selected fields in order, without repeats
    fn columns(&self) -> Result<Vec<ExportField>, ReportError> {
        let mut columns = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if !columns.contains(field) {
                columns.push(*field);
            }
        }
        if columns.is_empty() {
            return Err(ReportError::invalid_filter("select at least one export field"));
        }
        Ok(columns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Claim,
    Subtotal,
    Total,
}

/// One flat output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub kind: RowKind,
    /// Label of the group the row belongs to, when grouping
    pub group: Option<String>,
    /// Number of claims a subtotal or total row covers
    pub count: Option<usize>,
    pub cells: Vec<(ExportField, String)>,
}

impl ExportRow {
    pub fn cell(&self, field: ExportField) -> Option<&str> {
        self.cells
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }
}

impl Serialize for ExportRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let extra = usize::from(self.group.is_some()) + usize::from(self.count.is_some());
        let mut map = serializer.serialize_map(Some(1 + extra + self.cells.len()))?;
        map.serialize_entry("kind", &self.kind)?;
        if let Some(group) = &self.group {
            map.serialize_entry("group", group)?;
        }
        if let Some(count) = self.count {
            map.serialize_entry("count", &count)?;
        }
        for (field, value) in &self.cells {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub fields: Vec<ExportField>,
    pub headers: Vec<&'static str>,
    pub rows: Vec<ExportRow>,
}

impl ExportTable {
    pub fn claim_rows(&self) -> impl Iterator<Item = &ExportRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Claim)
    }
}

fn claim_cell(claim: &ReimbursementClaim, field: ExportField, ctx: &ReportContext) -> String {
    match field {
        ExportField::Id => claim.id().to_string(),
        ExportField::User => ctx.user_label(claim.submitted_by()),
        ExportField::Event => ctx.event_label(claim.event_id()),
        ExportField::Amount => claim.total_amount().format_grouped(),
        ExportField::Status => ctx.status_label(claim.status()),
        ExportField::Date => ctx
            .timezone
            .local_date(claim.submitted_at())
            .format("%d/%m/%Y")
            .to_string(),
        ExportField::Details => claim
            .items()
            .iter()
            .map(|item| format!("{}: {}", item.category.label(), item.amount.format_grouped()))
            .collect::<Vec<_>>()
            .join("; "),
        ExportField::Notes => claim.validator_note().unwrap_or_default().to_string(),
    }
}

fn claim_row(claim: &ReimbursementClaim, columns: &[ExportField], group: Option<String>, ctx: &ReportContext) -> ExportRow {
    ExportRow {
        kind: RowKind::Claim,
        group,
        count: None,
        cells: columns.iter().map(|f| (*f, claim_cell(claim, *f, ctx))).collect(),
    }
}

fn summary_row(
    kind: RowKind,
    label: &str,
    sub: &Subtotal,
    columns: &[ExportField],
    label_column: Option<ExportField>,
) -> ExportRow {
    let cells = columns
        .iter()
        .map(|field| {
            let value = match field {
                ExportField::Amount => sub.total_amount.format_grouped(),
                f if Some(*f) == label_column => label.to_string(),
                ExportField::Id => match kind {
                    RowKind::Total => "Total".to_string(),
                    _ => "Subtotal".to_string(),
                },
                _ => String::new(),
            };
            (*field, value)
        })
        .collect();
    ExportRow {
        kind,
        group: (kind == RowKind::Subtotal).then(|| label.to_string()),
        count: Some(sub.count),
        cells,
    }
}

/// Builds the export table from already-filtered claims
pub fn project(claims: &[&ReimbursementClaim], options: &ExportOptions, ctx: &ReportContext) -> Result<ExportTable, ReportError> {
    let columns = options.columns()?;
    let mut rows = Vec::with_capacity(claims.len());

    match options.group_by {
        None => {
            rows.extend(claims.iter().map(|c| claim_row(c, &columns, None, ctx)));
        }
        Some(key) => {
            let groups: BTreeMap<GroupValue, Vec<&ReimbursementClaim>> =
                group_by(claims.iter().copied(), key, &ctx.timezone);
            let sums = subtotals(&groups, ctx.currency)?;
            for (value, members) in &groups {
                let label = ctx.group_label(value);
                rows.extend(members.iter().map(|c| claim_row(c, &columns, Some(label.clone()), ctx)));
                if options.include_subtotals {
                    if let Some(sub) = sums.get(value) {
                        rows.push(summary_row(
                            RowKind::Subtotal,
                            &label,
                            sub,
                            &columns,
                            Some(ExportField::for_group(key)),
                        ));
                    }
                }
            }
        }
    }

    if options.include_subtotals {
        let total = subtotal(claims.iter().copied(), ctx.currency)?;
        rows.push(summary_row(RowKind::Total, "Total", &total, &columns, None));
    }

    Ok(ExportTable {
        headers: columns.iter().map(|f| f.header()).collect(),
        fields: columns,
        rows,
    })
}

/// Filters, groups, subtotals and renders `claims`
pub fn export<'a, I>(claims: I, options: &ExportOptions, ctx: &ReportContext, now: DateTime<Utc>) -> Result<ExportTable, ReportError>
where
    I: IntoIterator<Item = &'a ReimbursementClaim>,
{
    let selected = options.filter.apply(claims, now, &ctx.timezone)?;
    project(&selected, options, ctx)
}
