//! Filter resolution.
//!
//! Turns what the user selected (organisation units, a year, maybe a month) into the concrete
//! organisation unit ids and periods the fetcher requests. Everything here runs before any
//! network call, so a bad selection never reaches the server.

use crate::constants::ALL_ORGANISATION_UNITS;
use crate::models::OrganisationUnit;
use crate::validation::validate_identifier;
use crate::{DashboardError, DashboardResult};
use chrono::{Datelike, NaiveDate};
use hts_types::Period;
use serde::{Deserialize, Serialize};

/// Filter state as chosen in the dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Selected organisation unit ids; may contain the `"ALL"` sentinel.
    pub org_units: Vec<String>,
    pub year: i32,
    /// 1-based month; `None` selects the whole year.
    #[serde(default)]
    pub month: Option<u32>,
}

impl FilterSelection {
    /// The filters the dashboard starts from: every unit, the current year, no month.
    pub fn reset(today: NaiveDate) -> Self {
        Self {
            org_units: vec![ALL_ORGANISATION_UNITS.to_string()],
            year: today.year(),
            month: None,
        }
    }

    /// Month part of export file names: two digits, or `all` for a whole year.
    pub fn month_label(&self) -> String {
        match self.month {
            Some(month) => format!("{month:02}"),
            None => "all".to_string(),
        }
    }
}

/// Which periods to request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "periods", rename_all = "snake_case")]
pub enum PeriodSpec {
    /// One month.
    Single(Period),
    /// Every month of a year, January first.
    Year(Vec<Period>),
}

impl PeriodSpec {
    pub fn periods(&self) -> &[Period] {
        match self {
            Self::Single(period) => std::slice::from_ref(period),
            Self::Year(periods) => periods,
        }
    }
}

/// The concrete request targets derived from a [`FilterSelection`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedFilters {
    pub org_units: Vec<String>,
    pub periods: PeriodSpec,
}

/// Resolves a selection against the cached organisation unit catalog.
///
/// # Errors
///
/// - `NoOrganisationUnitsSelected` when nothing is selected, or `"ALL"` is selected while the
///   catalog is empty,
/// - `InvalidInput` when a selected id is not a well-formed identifier,
/// - `Period` when the year or month is out of range.
pub fn resolve(
    selection: &FilterSelection,
    catalog: &[OrganisationUnit],
) -> DashboardResult<ResolvedFilters> {
    let org_units = resolve_org_units(&selection.org_units, catalog)?;
    let periods = resolve_periods(selection.year, selection.month)?;
    Ok(ResolvedFilters { org_units, periods })
}

fn resolve_org_units(
    selected: &[String],
    catalog: &[OrganisationUnit],
) -> DashboardResult<Vec<String>> {
    let org_units: Vec<String> = if selected.iter().any(|id| id == ALL_ORGANISATION_UNITS) {
        catalog.iter().map(|ou| ou.id.clone()).collect()
    } else {
        let mut ids: Vec<String> = Vec::with_capacity(selected.len());
        for id in selected.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
            validate_identifier(id)?;
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        }
        ids
    };

    if org_units.is_empty() {
        return Err(DashboardError::NoOrganisationUnitsSelected);
    }
    Ok(org_units)
}

fn resolve_periods(year: i32, month: Option<u32>) -> DashboardResult<PeriodSpec> {
    Ok(match month {
        Some(month) => PeriodSpec::Single(Period::new(year, month)?),
        None => PeriodSpec::Year(Period::months_of_year(year)?),
    })
}
