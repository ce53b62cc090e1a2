//! Data fetcher.
//!
//! Requests one data value set per period, strictly in order: the next period is not requested
//! until the previous one has answered or failed, so records come back in ascending period order.
//!
//! Failure rule, shared by single-month and whole-year requests: a period that fails is skipped
//! and reported in [`FetchOutcome::skipped_periods`]. The fetch as a whole fails only when every
//! requested period failed.

use crate::client::Dhis2Client;
use crate::filters::PeriodSpec;
use crate::models::DataRecord;
use crate::session::Session;
use crate::{DashboardError, DashboardResult};
use hts_types::Period;
use serde::Serialize;

/// A period whose request failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedPeriod {
    pub period: Period,
    pub reason: String,
}

/// Concatenated records of every period that answered.
#[derive(Clone, Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<DataRecord>,
    pub fetched_periods: Vec<Period>,
    pub skipped_periods: Vec<SkippedPeriod>,
}

/// Fetches the data values for `org_units` over `periods`.
///
/// # Errors
///
/// For a single period, that period's own error. For several periods, `AllPeriodsFailed` when
/// none of them answered.
pub async fn fetch_records(
    client: &Dhis2Client,
    session: &Session,
    data_elements: &[&str],
    org_units: &[String],
    periods: &PeriodSpec,
) -> DashboardResult<FetchOutcome> {
    let requested = periods.periods();
    let mut outcome = FetchOutcome::default();
    let mut last_error: Option<DashboardError> = None;

    if requested.len() > 1 {
        tracing::info!("fetching data for {} months", requested.len());
    }

    for period in requested {
        match client
            .data_values(session, data_elements, org_units, period)
            .await
        {
            Ok(records) => {
                tracing::debug!("{}: {} data values", period, records.len());
                outcome.records.extend(records);
                outcome.fetched_periods.push(period.clone());
            }
            Err(e) => {
                tracing::warn!("skipping period {}: {}", period, e);
                outcome.skipped_periods.push(SkippedPeriod {
                    period: period.clone(),
                    reason: e.to_string(),
                });
                last_error = Some(e);
            }
        }
    }

    if outcome.fetched_periods.is_empty() {
        if let Some(err) = last_error {
            if requested.len() == 1 {
                return Err(err);
            }
            return Err(DashboardError::AllPeriodsFailed {
                periods: requested.len(),
                last_error: err.to_string(),
            });
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_session, FakeTransport};
    use std::sync::Arc;

    const RECORD_202501: &str = r#"{"dataValues":[
        {"dataElement":"de1","period":"202501","orgUnit":"ou1","value":"4"}
    ]}"#;
    const RECORD_202503: &str = r#"{"dataValues":[
        {"dataElement":"de1","period":"202503","orgUnit":"ou1","value":"6"}
    ]}"#;

    fn periods(raw: &[&str]) -> PeriodSpec {
        PeriodSpec::Year(raw.iter().map(|p| Period::parse(p).unwrap()).collect())
    }

    #[tokio::test]
    async fn test_failing_month_is_skipped() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, RECORD_202501)
                .respond("period=202502", 500, ""),
        );
        let client = Dhis2Client::new(transport.clone());

        let outcome = fetch_records(
            &client,
            &test_session(&[]),
            &["de1"],
            &["ou1".into()],
            &periods(&["202501", "202502"]),
        )
        .await
        .expect("partial failure should not fail the fetch");

        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records.iter().all(|r| r.period == "202501"));
        assert_eq!(outcome.skipped_periods.len(), 1);
        assert_eq!(outcome.skipped_periods[0].period.as_str(), "202502");
    }

    #[tokio::test]
    async fn test_periods_are_requested_in_order_and_concatenated() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, RECORD_202501)
                .respond("period=202502", 200, "{}")
                .respond("period=202503", 200, RECORD_202503),
        );
        let client = Dhis2Client::new(transport.clone());

        let outcome = fetch_records(
            &client,
            &test_session(&[]),
            &["de1"],
            &["ou1".into()],
            &periods(&["202501", "202502", "202503"]),
        )
        .await
        .unwrap();

        let record_periods: Vec<&str> = outcome.records.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(record_periods, ["202501", "202503"]);

        let requested: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(requested.len(), 3);
        assert!(requested[0].ends_with("period=202501"));
        assert!(requested[1].ends_with("period=202502"));
        assert!(requested[2].ends_with("period=202503"));
    }

    #[tokio::test]
    async fn test_single_period_failure_is_an_error() {
        let client = Dhis2Client::new(Arc::new(
            FakeTransport::new().respond("period=202502", 503, ""),
        ));

        let err = fetch_records(
            &client,
            &test_session(&[]),
            &["de1"],
            &["ou1".into()],
            &PeriodSpec::Single(Period::parse("202502").unwrap()),
        )
        .await
        .expect_err("single failing period should fail");

        assert!(matches!(
            err,
            DashboardError::UnexpectedStatus { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn test_every_month_failing_is_an_error() {
        let client = Dhis2Client::new(Arc::new(FakeTransport::new()));

        let err = fetch_records(
            &client,
            &test_session(&[]),
            &["de1"],
            &["ou1".into()],
            &periods(&["202501", "202502"]),
        )
        .await
        .expect_err("no answering period should fail");

        assert!(matches!(
            err,
            DashboardError::AllPeriodsFailed { periods: 2, .. }
        ));
    }
}
