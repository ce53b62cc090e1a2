//! Table rows and chart series shaped from an [`Aggregation`].
//!
//! Chart drawing belongs to the front end. The series here carry exactly what a doughnut, a bar
//! and a line chart need: labels and one or more named datasets.

use crate::aggregation::{Aggregation, GlobalSummary, TrendPoint};
use crate::constants::NO_DATA_PLACEHOLDER;
use hts_types::Period;
use serde::Serialize;
use std::collections::HashMap;

/// One row of the data table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub organisation_unit_id: String,
    /// Display name, or the raw id when no name is known.
    pub organisation_unit: String,
    pub period: String,
    /// Period label such as `Jan 2025`.
    pub period_label: String,
    pub clients_tested: u64,
    pub positive: u64,
    pub negative: u64,
    pub inconclusive: u64,
    pub average_age: Option<i64>,
    pub counseling_sessions: usize,
}

impl TableRow {
    /// Cell texts in column order, as shown in the table and written to CSV.
    pub fn cells(&self) -> [String; 8] {
        [
            self.organisation_unit.clone(),
            self.period_label.clone(),
            self.clients_tested.to_string(),
            self.positive.to_string(),
            self.negative.to_string(),
            self.inconclusive.to_string(),
            format_average_age(self.average_age),
            self.counseling_sessions.to_string(),
        ]
    }
}

/// Builds one row per group, in group order, naming units from `names`.
pub fn build_table(aggregation: &Aggregation, names: &HashMap<String, String>) -> Vec<TableRow> {
    aggregation
        .groups
        .values()
        .map(|group| TableRow {
            organisation_unit_id: group.org_unit.clone(),
            organisation_unit: names
                .get(&group.org_unit)
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| group.org_unit.clone()),
            period: group.period.clone(),
            period_label: Period::label_for(&group.period),
            clients_tested: group.clients_tested,
            positive: group.positive,
            negative: group.negative,
            inconclusive: group.inconclusive,
            average_age: group.average_age(),
            counseling_sessions: group.counseling_sessions(),
        })
        .collect()
}

pub fn format_average_age(average_age: Option<i64>) -> String {
    average_age
        .map(|age| age.to_string())
        .unwrap_or_else(|| NO_DATA_PLACEHOLDER.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Doughnut,
    Bar,
    Line,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doughnut => "doughnut",
            Self::Bar => "bar",
            Self::Line => "line",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<u64>,
}

/// Prepared input for one chart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Positive / negative / inconclusive breakdown.
pub fn results_chart(summary: &GlobalSummary) -> ChartSeries {
    ChartSeries {
        kind: ChartKind::Doughnut,
        labels: labels(&["Positive", "Negative", "Inconclusive"]),
        datasets: vec![Dataset {
            label: "Results".into(),
            data: vec![summary.positive, summary.negative, summary.inconclusive],
        }],
    }
}

/// Counseling sessions by recognised type.
pub fn counseling_chart(summary: &GlobalSummary) -> ChartSeries {
    let tally = &summary.counseling;
    ChartSeries {
        kind: ChartKind::Bar,
        labels: labels(&["Individual", "Group", "Couples"]),
        datasets: vec![Dataset {
            label: "Sessions".into(),
            data: vec![tally.individual, tally.group, tally.couples],
        }],
    }
}

/// Tested, positive and negative counts per period.
pub fn trend_chart(trend: &[TrendPoint]) -> ChartSeries {
    ChartSeries {
        kind: ChartKind::Line,
        labels: trend.iter().map(|p| Period::label_for(&p.period)).collect(),
        datasets: vec![
            Dataset {
                label: "Clients Tested".into(),
                data: trend.iter().map(|p| p.tested).collect(),
            },
            Dataset {
                label: "Positive Results".into(),
                data: trend.iter().map(|p| p.positive).collect(),
            },
            Dataset {
                label: "Negative Results".into(),
                data: trend.iter().map(|p| p.negative).collect(),
            },
        ],
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
