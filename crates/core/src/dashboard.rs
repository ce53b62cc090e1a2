//! # Dashboard Service
//!
//! Ties the pieces together for one running dashboard: login and logout, the organisation unit
//! catalog, the apply-filters flow and the CSV export of the current view.
//!
//! ## Apply flow
//!
//! 1. take a new generation number,
//! 2. resolve the filters against the session's catalog (no network before this succeeds),
//! 3. fetch the data values period by period,
//! 4. aggregate, look up unit names, build the table and chart series,
//! 5. store the view, unless another apply started in the meantime.
//!
//! A failure at any step leaves the previous view in place and is written to the activity log.

use crate::activity::{ActivityEntry, ActivityLog};
use crate::aggregation::{aggregate, GlobalSummary};
use crate::client::Dhis2Client;
use crate::config::CoreConfig;
use crate::export::{export_table, CsvExport};
use crate::fetcher::{fetch_records, SkippedPeriod};
use crate::filters::{self, FilterSelection, ResolvedFilters};
use crate::models::DataRecord;
use crate::report::{
    build_table, counseling_chart, results_chart, trend_chart, ChartSeries, TableRow,
};
use crate::session::{Credentials, Session};
use crate::DashboardResult;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Everything the dashboard shows for one applied selection.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardView {
    pub generation: u64,
    pub generated_at: DateTime<Utc>,
    pub selection: FilterSelection,
    pub filters: ResolvedFilters,
    pub skipped_periods: Vec<SkippedPeriod>,
    pub record_count: usize,
    /// `false` when the name lookup failed and the table shows raw ids.
    pub names_resolved: bool,
    pub summary: GlobalSummary,
    pub table: Vec<TableRow>,
    pub results_chart: ChartSeries,
    pub counseling_chart: ChartSeries,
    pub trend_chart: ChartSeries,
}

/// Result of an apply.
#[derive(Clone, Debug)]
pub enum ApplyOutcome {
    /// The view was stored and is now the latest.
    Applied(Arc<DashboardView>),
    /// A newer apply started before this one finished; its result was discarded.
    Superseded { generation: u64 },
}

#[derive(Debug, Default)]
struct DashboardState {
    view: Option<Arc<DashboardView>>,
    records: Arc<Vec<DataRecord>>,
}

#[derive(Debug)]
pub struct DashboardService {
    cfg: Arc<CoreConfig>,
    client: Dhis2Client,
    generation: AtomicU64,
    state: RwLock<DashboardState>,
    activity: ActivityLog,
}

impl DashboardService {
    pub fn new(cfg: Arc<CoreConfig>, client: Dhis2Client) -> Self {
        Self {
            cfg,
            client,
            generation: AtomicU64::new(0),
            state: RwLock::new(DashboardState::default()),
            activity: ActivityLog::default(),
        }
    }

    /// Builds the service with the transport selected by `cfg`.
    pub fn from_config(cfg: Arc<CoreConfig>) -> DashboardResult<Self> {
        let client = Dhis2Client::from_config(&cfg)?;
        Ok(Self::new(cfg, client))
    }

    pub fn client(&self) -> &Dhis2Client {
        &self.client
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Activity entries, newest first.
    pub fn activity_entries(&self) -> Vec<ActivityEntry> {
        self.activity.entries()
    }

    /// Verifies `credentials` and opens a session with the organisation unit catalog loaded.
    ///
    /// A catalog failure does not fail the login: the session starts with an empty catalog and
    /// the failure is written to the activity log.
    ///
    /// # Errors
    ///
    /// Returns the login probe's error (`InvalidCredentials`, `Forbidden`,
    /// `AuthenticationFailed` or a transport error).
    pub async fn login(&self, credentials: Credentials) -> DashboardResult<Session> {
        self.activity
            .record(format!("Connecting to {}...", credentials.instance_url()));

        let profile = match self.client.probe_login(&credentials).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("login to {} failed: {}", credentials.instance_url(), e);
                self.activity.record(format!("Login failed: {e}"));
                return Err(e);
            }
        };

        let mut session = Session::new(credentials, profile);
        self.activity.record(format!(
            "Connected successfully! Welcome {}",
            session.profile().display_name()
        ));

        // Catalog failure is reported but does not fail the login.
        let _ = self.refresh_organisation_units(&mut session).await;
        Ok(session)
    }

    /// Reloads the session's organisation unit catalog.
    pub async fn refresh_organisation_units(
        &self,
        session: &mut Session,
    ) -> DashboardResult<usize> {
        self.activity.record("Loading organisation units...");
        match session.refresh_organisation_units(&self.client).await {
            Ok(count) => {
                self.activity
                    .record(format!("Loaded {count} organisation units"));
                Ok(count)
            }
            Err(e) => {
                tracing::warn!("failed to load organisation units: {}", e);
                self.activity
                    .record(format!("Error loading organisation units: {e}"));
                Err(e)
            }
        }
    }

    /// Ends `session` and forgets the current view.
    ///
    /// Any apply still in flight is superseded.
    pub fn logout(&self, session: Session) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            *state = DashboardState::default();
        }
        session.logout();
        self.activity.record("Logged out");
    }

    /// Runs the apply flow for `selection`.
    ///
    /// # Errors
    ///
    /// Validation errors are returned before any request is made. Fetch errors follow the
    /// fetcher's failure rule. The previous view is kept on error.
    pub async fn apply(
        &self,
        session: &Session,
        selection: &FilterSelection,
    ) -> DashboardResult<ApplyOutcome> {
        let generation = self.begin_apply();
        self.activity.record("Applying filters and fetching data...");

        match self.build_view(generation, session, selection).await {
            Ok((view, records)) => {
                let record_count = view.record_count;
                let outcome = self.commit(generation, view, records);
                if let ApplyOutcome::Applied(_) = outcome {
                    self.activity
                        .record(format!("Successfully loaded {record_count} data values"));
                }
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("apply {} failed: {}", generation, e);
                self.activity.record(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Takes the next generation number. Results of earlier generations will be discarded.
    pub fn begin_apply(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(
        &self,
        generation: u64,
        view: DashboardView,
        records: Vec<DataRecord>,
    ) -> ApplyOutcome {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::info!("discarding result of superseded apply {}", generation);
            return ApplyOutcome::Superseded { generation };
        }

        let view = Arc::new(view);
        state.view = Some(Arc::clone(&view));
        state.records = Arc::new(records);
        ApplyOutcome::Applied(view)
    }

    async fn build_view(
        &self,
        generation: u64,
        session: &Session,
        selection: &FilterSelection,
    ) -> DashboardResult<(DashboardView, Vec<DataRecord>)> {
        let resolved = filters::resolve(selection, session.organisation_units())?;
        let requested = resolved.periods.periods().len();
        if requested > 1 {
            self.activity
                .record(format!("Fetching data for {requested} months..."));
        }

        let mapping = self.cfg.mapping();
        let outcome = fetch_records(
            &self.client,
            session,
            &mapping.data_elements.all(),
            &resolved.org_units,
            &resolved.periods,
        )
        .await?;
        for skipped in &outcome.skipped_periods {
            self.activity.record(format!(
                "Skipped {}: {}",
                skipped.period.label(),
                skipped.reason
            ));
        }

        let aggregation = aggregate(&outcome.records, mapping);

        let (names, names_resolved) = match self
            .client
            .organisation_unit_names(session, &aggregation.org_units())
            .await
        {
            Ok(names) => (names, true),
            Err(e) => {
                tracing::warn!("organisation unit name lookup failed: {}", e);
                self.activity
                    .record(format!("Error fetching organisation unit names: {e}"));
                (Default::default(), false)
            }
        };

        let view = DashboardView {
            generation,
            generated_at: Utc::now(),
            selection: selection.clone(),
            filters: resolved,
            skipped_periods: outcome.skipped_periods,
            record_count: outcome.records.len(),
            names_resolved,
            table: build_table(&aggregation, &names),
            results_chart: results_chart(&aggregation.summary),
            counseling_chart: counseling_chart(&aggregation.summary),
            trend_chart: trend_chart(&aggregation.trend()),
            summary: aggregation.summary,
        };
        Ok((view, outcome.records))
    }

    /// The most recently applied view, if any.
    pub fn latest_view(&self) -> Option<Arc<DashboardView>> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .view
            .clone()
    }

    /// Raw records behind the latest view.
    pub fn last_records(&self) -> Arc<Vec<DataRecord>> {
        Arc::clone(&self.state.read().unwrap_or_else(|e| e.into_inner()).records)
    }

    /// CSV export of the latest view's table, `None` before the first apply.
    pub fn export_csv(&self, date: NaiveDate) -> DashboardResult<Option<CsvExport>> {
        let Some(view) = self.latest_view() else {
            return Ok(None);
        };
        let export = export_table(&view.table, &view.selection, date)?;
        self.activity.record("Data exported to CSV");
        Ok(Some(export))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::testing::{test_session, FakeTransport, TEST_INSTANCE_URL};
    use crate::DashboardError;

    const DATA_202501: &str = r#"{"dataValues":[
        {"orgUnit":"ou1","period":"202501","dataElement":"kLmN8oPqR3s","value":"10"},
        {"orgUnit":"ou1","period":"202501","dataElement":"WvYDK6cYopD","value":"uVGKdrp4iYw"},
        {"orgUnit":"ou1","period":"202501","dataElement":"tUvW9xYzA1b","value":"30"},
        {"orgUnit":"ou2","period":"202501","dataElement":"kLmN8oPqR3s","value":"5"},
        {"orgUnit":"ou2","period":"202501","dataElement":"Oj5wqLKQ6f3","value":"qjrA54Rvhrl"}
    ]}"#;

    const NAMES: &str = r#"{"organisationUnits":[
        {"id":"ou1","displayName":"Bo Hospital"},
        {"id":"ou2","displayName":"Kenema Clinic"}
    ]}"#;

    fn service(transport: Arc<FakeTransport>) -> DashboardService {
        DashboardService::new(Arc::new(CoreConfig::default()), Dhis2Client::new(transport))
    }

    fn january(org_units: &[&str]) -> FilterSelection {
        FilterSelection {
            org_units: org_units.iter().map(|s| s.to_string()).collect(),
            year: 2025,
            month: Some(1),
        }
    }

    fn messages(service: &DashboardService) -> Vec<String> {
        service
            .activity_entries()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[tokio::test]
    async fn test_apply_builds_and_stores_view() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, DATA_202501)
                .respond("filter=id:in:", 200, NAMES),
        );
        let service = service(Arc::clone(&transport));
        let session = test_session(&[("ou1", "Bo Hospital"), ("ou2", "Kenema Clinic")]);

        let outcome = service
            .apply(&session, &january(&[ALL_ORGANISATION_UNITS]))
            .await
            .expect("apply should succeed");

        let ApplyOutcome::Applied(view) = outcome else {
            panic!("expected the view to be applied");
        };
        assert_eq!(view.generation, 1);
        assert_eq!(view.record_count, 5);
        assert!(view.names_resolved);
        assert_eq!(view.summary.total_tested, 15);
        assert_eq!(view.summary.positive, 1);
        assert_eq!(view.summary.average_age, Some(30));
        assert_eq!(view.table.len(), 2);
        assert_eq!(view.table[0].organisation_unit, "Bo Hospital");
        assert_eq!(view.table[1].organisation_unit, "Kenema Clinic");
        assert_eq!(view.table[1].counseling_sessions, 1);
        assert_eq!(view.trend_chart.labels, vec!["Jan 2025"]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].url.contains("orgUnit=ou1,ou2"));
        assert!(requests[1].url.contains("filter=id:in:[ou1,ou2]"));

        assert_eq!(service.last_records().len(), 5);
        assert_eq!(
            service.latest_view().map(|v| v.generation),
            Some(view.generation)
        );
        assert_eq!(messages(&service)[0], "Successfully loaded 5 data values");
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_request() {
        let transport = Arc::new(FakeTransport::new());
        let service = service(Arc::clone(&transport));
        let session = test_session(&[]);

        let result = service.apply(&session, &january(&[])).await;

        assert!(matches!(
            result,
            Err(DashboardError::NoOrganisationUnitsSelected)
        ));
        assert!(transport.requests().is_empty());
        assert!(service.latest_view().is_none());
        assert_eq!(
            messages(&service)[0],
            "Error: select at least one organisation unit"
        );
    }

    #[tokio::test]
    async fn test_failed_apply_keeps_previous_view() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, DATA_202501)
                .respond("period=202502", 500, "")
                .respond("filter=id:in:", 200, NAMES),
        );
        let service = service(transport);
        let session = test_session(&[("ou1", "Bo Hospital")]);

        service.apply(&session, &january(&["ou1"])).await.unwrap();
        let mut february = january(&["ou1"]);
        february.month = Some(2);
        let result = service.apply(&session, &february).await;

        assert!(result.is_err());
        let view = service.latest_view().expect("previous view should remain");
        assert_eq!(view.selection.month, Some(1));
    }

    #[tokio::test]
    async fn test_name_lookup_failure_falls_back_to_ids() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, DATA_202501)
                .respond("filter=id:in:", 500, ""),
        );
        let service = service(transport);
        let session = test_session(&[]);

        let outcome = service
            .apply(&session, &january(&["ou1", "ou2"]))
            .await
            .unwrap();

        let ApplyOutcome::Applied(view) = outcome else {
            panic!("expected the view to be applied");
        };
        assert!(!view.names_resolved);
        assert_eq!(view.table[0].organisation_unit, "ou1");
        assert!(messages(&service)
            .iter()
            .any(|m| m.starts_with("Error fetching organisation unit names")));
    }

    #[tokio::test]
    async fn test_year_apply_reports_skipped_months() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, DATA_202501)
                .respond("period=2025", 500, "")
                .respond("filter=id:in:", 200, NAMES),
        );
        let service = service(Arc::clone(&transport));
        let session = test_session(&[]);
        let mut selection = january(&["ou1"]);
        selection.month = None;

        let outcome = service.apply(&session, &selection).await.unwrap();

        let ApplyOutcome::Applied(view) = outcome else {
            panic!("expected the view to be applied");
        };
        assert_eq!(view.skipped_periods.len(), 11);
        assert_eq!(view.record_count, 5);
        // 12 period requests and one name lookup
        assert_eq!(transport.requests().len(), 13);
        assert!(messages(&service)
            .iter()
            .any(|m| m.starts_with("Skipped Dec 2025")));
    }

    #[tokio::test]
    async fn test_superseded_apply_is_discarded() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, DATA_202501)
                .respond("filter=id:in:", 200, NAMES),
        );
        let service = service(transport);
        let session = test_session(&[]);

        let stale_generation = service.begin_apply();
        let ApplyOutcome::Applied(current) =
            service.apply(&session, &january(&["ou1"])).await.unwrap()
        else {
            panic!("expected the view to be applied");
        };

        let mut stale_view = (*current).clone();
        stale_view.generation = stale_generation;
        stale_view.table.clear();
        let outcome = service.commit(stale_generation, stale_view, Vec::new());

        assert!(matches!(
            outcome,
            ApplyOutcome::Superseded { generation } if generation == stale_generation
        ));
        let latest = service.latest_view().unwrap();
        assert_eq!(latest.generation, current.generation);
        assert!(!latest.table.is_empty());
    }

    #[tokio::test]
    async fn test_slow_apply_loses_to_newer_one() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let transport = Arc::new(
            FakeTransport::new()
                .hold("period=202501", Arc::clone(&gate), 200, DATA_202501)
                .respond(
                    "period=202502",
                    200,
                    r#"{"dataValues":[
                        {"orgUnit":"ou1","period":"202502","dataElement":"kLmN8oPqR3s","value":"7"}
                    ]}"#,
                )
                .respond("filter=id:in:", 200, NAMES),
        );
        let service = service(transport);
        let session = test_session(&[]);
        let mut february = january(&["ou1"]);
        february.month = Some(2);

        let first = january(&["ou1"]);
        let (slow, fast) = tokio::join!(service.apply(&session, &first), async {
            let outcome = service.apply(&session, &february).await;
            gate.notify_one();
            outcome
        });

        assert!(matches!(
            slow.unwrap(),
            ApplyOutcome::Superseded { generation: 1 }
        ));
        let ApplyOutcome::Applied(view) = fast.unwrap() else {
            panic!("expected the newer view to be applied");
        };
        assert_eq!(view.generation, 2);

        let latest = service.latest_view().unwrap();
        assert_eq!(latest.selection.month, Some(2));
        assert_eq!(latest.summary.total_tested, 7);
    }

    #[tokio::test]
    async fn test_login_loads_catalog() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("/api/me", 200, r#"{"firstName":"John","surname":"Traore"}"#)
                .respond("/api/organisationUnits.json", 200, NAMES),
        );
        let service = service(transport);
        let credentials = Credentials::new(TEST_INSTANCE_URL, "admin", "district").unwrap();

        let session = service.login(credentials).await.expect("login should succeed");

        assert_eq!(session.profile().display_name(), "John Traore");
        assert_eq!(session.organisation_units().len(), 2);
        let log = messages(&service);
        assert_eq!(log[0], "Loaded 2 organisation units");
        assert!(log.contains(&"Connected successfully! Welcome John Traore".to_string()));
    }

    #[tokio::test]
    async fn test_login_survives_catalog_failure() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("/api/me", 200, "{}")
                .respond("/api/organisationUnits.json", 500, ""),
        );
        let service = service(transport);
        let credentials = Credentials::new(TEST_INSTANCE_URL, "admin", "district").unwrap();

        let session = service.login(credentials).await.expect("login should succeed");

        assert!(session.organisation_units().is_empty());
        assert!(messages(&service)[0].starts_with("Error loading organisation units"));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let transport = Arc::new(FakeTransport::new().respond("/api/me", 401, ""));
        let service = service(Arc::clone(&transport));
        let credentials = Credentials::new(TEST_INSTANCE_URL, "admin", "wrong").unwrap();

        let result = service.login(credentials).await;

        assert!(matches!(result, Err(DashboardError::InvalidCredentials)));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(
            messages(&service)[0],
            "Login failed: Invalid username or password"
        );
    }

    #[tokio::test]
    async fn test_logout_clears_view() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, DATA_202501)
                .respond("filter=id:in:", 200, NAMES),
        );
        let service = service(transport);
        let session = test_session(&[]);
        service.apply(&session, &january(&["ou1"])).await.unwrap();

        service.logout(session);

        assert!(service.latest_view().is_none());
        assert!(service.last_records().is_empty());
        assert_eq!(messages(&service)[0], "Logged out");
    }

    #[tokio::test]
    async fn test_export_csv_uses_latest_view() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("period=202501", 200, DATA_202501)
                .respond("filter=id:in:", 200, NAMES),
        );
        let service = service(transport);
        let session = test_session(&[]);
        let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();

        assert!(service.export_csv(date).unwrap().is_none());

        service
            .apply(&session, &january(&["ou1", "ou2"]))
            .await
            .unwrap();
        let export = service.export_csv(date).unwrap().expect("export expected");

        assert_eq!(export.filename, "hiv-testing-data-2025-01-2025-02-01.csv");
        assert_eq!(export.content.lines().count(), 3);
        assert!(export
            .content
            .contains(r#""Bo Hospital","Jan 2025","10","1","0","0","30","0""#));
    }
}
