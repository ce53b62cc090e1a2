//! Request and response bodies of the dashboard API.
//!
//! Field names are snake_case on the wire. Timestamps are RFC 3339 strings.

use hts_core::{
    ActivityEntry, ChartSeries, DashboardView, FilterSelection, GlobalSummary, OrganisationUnit,
    Session, SkippedPeriod, TableRow,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    /// Base URL of the DHIS2 instance, e.g. `https://play.dhis2.org/demo`.
    pub instance_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub instance_url: String,
    pub username: String,
    pub welcome_name: String,
    /// Size of the organisation unit catalog loaded at login.
    pub organisation_units: usize,
}

impl From<&Session> for LoginRes {
    fn from(session: &Session) -> Self {
        Self {
            instance_url: session.credentials().instance_url().to_string(),
            username: session.credentials().username().to_string(),
            welcome_name: session.profile().display_name(),
            organisation_units: session.organisation_units().len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LogoutRes {
    pub ok: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrganisationUnitRes {
    pub id: String,
    pub display_name: String,
}

impl From<&OrganisationUnit> for OrganisationUnitRes {
    fn from(unit: &OrganisationUnit) -> Self {
        Self {
            id: unit.id.clone(),
            display_name: unit.display_name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListOrganisationUnitsRes {
    pub organisation_units: Vec<OrganisationUnitRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RefreshOrganisationUnitsRes {
    pub count: usize,
}

/// A filter selection, as sent to `POST /dashboard` and returned by `GET /filters/default`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Filters {
    /// Organisation unit ids, or `["ALL"]`.
    pub org_units: Vec<String>,
    pub year: i32,
    /// 1-based month; omit for the whole year.
    #[serde(default)]
    pub month: Option<u32>,
}

impl From<Filters> for FilterSelection {
    fn from(filters: Filters) -> Self {
        FilterSelection {
            org_units: filters.org_units,
            year: filters.year,
            month: filters.month,
        }
    }
}

impl From<&FilterSelection> for Filters {
    fn from(selection: &FilterSelection) -> Self {
        Self {
            org_units: selection.org_units.clone(),
            year: selection.year,
            month: selection.month,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SummaryRes {
    pub total_tested: u64,
    pub positive: u64,
    pub negative: u64,
    pub inconclusive: u64,
    pub average_age: Option<i64>,
    pub counseling_sessions: u64,
    pub individual_sessions: u64,
    pub group_sessions: u64,
    pub couples_sessions: u64,
}

impl From<&GlobalSummary> for SummaryRes {
    fn from(summary: &GlobalSummary) -> Self {
        Self {
            total_tested: summary.total_tested,
            positive: summary.positive,
            negative: summary.negative,
            inconclusive: summary.inconclusive,
            average_age: summary.average_age,
            counseling_sessions: summary.counseling_sessions,
            individual_sessions: summary.counseling.individual,
            group_sessions: summary.counseling.group,
            couples_sessions: summary.counseling.couples,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TableRowRes {
    pub organisation_unit_id: String,
    pub organisation_unit: String,
    pub period: String,
    pub period_label: String,
    pub clients_tested: u64,
    pub positive: u64,
    pub negative: u64,
    pub inconclusive: u64,
    /// Rounded mean age, or `--` when no age was reported.
    pub average_age: String,
    pub counseling_sessions: usize,
}

impl From<&TableRow> for TableRowRes {
    fn from(row: &TableRow) -> Self {
        Self {
            organisation_unit_id: row.organisation_unit_id.clone(),
            organisation_unit: row.organisation_unit.clone(),
            period: row.period.clone(),
            period_label: row.period_label.clone(),
            clients_tested: row.clients_tested,
            positive: row.positive,
            negative: row.negative,
            inconclusive: row.inconclusive,
            average_age: hts_core::report::format_average_age(row.average_age),
            counseling_sessions: row.counseling_sessions,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DatasetRes {
    pub label: String,
    pub data: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartRes {
    /// `doughnut`, `bar` or `line`.
    pub kind: String,
    pub labels: Vec<String>,
    pub datasets: Vec<DatasetRes>,
}

impl From<&ChartSeries> for ChartRes {
    fn from(series: &ChartSeries) -> Self {
        Self {
            kind: series.kind.as_str().to_string(),
            labels: series.labels.clone(),
            datasets: series
                .datasets
                .iter()
                .map(|d| DatasetRes {
                    label: d.label.clone(),
                    data: d.data.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkippedPeriodRes {
    pub period: String,
    pub reason: String,
}

impl From<&SkippedPeriod> for SkippedPeriodRes {
    fn from(skipped: &SkippedPeriod) -> Self {
        Self {
            period: skipped.period.to_string(),
            reason: skipped.reason.clone(),
        }
    }
}

/// One applied dashboard: summary cards, table and the three charts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardRes {
    pub generation: u64,
    pub generated_at: String,
    pub filters: Filters,
    /// Organisation unit ids that were requested.
    pub org_units: Vec<String>,
    /// Periods that were requested, `YYYYMM`.
    pub periods: Vec<String>,
    pub skipped_periods: Vec<SkippedPeriodRes>,
    pub record_count: usize,
    pub names_resolved: bool,
    pub summary: SummaryRes,
    pub table: Vec<TableRowRes>,
    pub results_chart: ChartRes,
    pub counseling_chart: ChartRes,
    pub trend_chart: ChartRes,
}

impl From<&DashboardView> for DashboardRes {
    fn from(view: &DashboardView) -> Self {
        Self {
            generation: view.generation,
            generated_at: view.generated_at.to_rfc3339(),
            filters: Filters::from(&view.selection),
            org_units: view.filters.org_units.clone(),
            periods: view
                .filters
                .periods
                .periods()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            skipped_periods: view.skipped_periods.iter().map(Into::into).collect(),
            record_count: view.record_count,
            names_resolved: view.names_resolved,
            summary: SummaryRes::from(&view.summary),
            table: view.table.iter().map(Into::into).collect(),
            results_chart: ChartRes::from(&view.results_chart),
            counseling_chart: ChartRes::from(&view.counseling_chart),
            trend_chart: ChartRes::from(&view.trend_chart),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityEntryRes {
    pub at: String,
    pub message: String,
}

impl From<&ActivityEntry> for ActivityEntryRes {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            at: entry.at.to_rfc3339(),
            message: entry.message.clone(),
        }
    }
}

/// Activity log, newest entry first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityRes {
    pub entries: Vec<ActivityEntryRes>,
}
