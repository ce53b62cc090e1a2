//! # API REST
//!
//! REST API for the HTS dashboard.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, CORS, status codes)
//!
//! Uses `api-shared` for request and response types and `hts-core` for everything else.
//! The server holds at most one logged-in session at a time.

#![warn(rust_2018_idioms)]

pub mod error;

use api_shared::{
    ActivityEntryRes, ActivityRes, ChartRes, DashboardRes, DatasetRes, ErrorRes, Filters,
    HealthRes, HealthService, ListOrganisationUnitsRes, LoginReq, LoginRes, LogoutRes,
    OrganisationUnitRes, RefreshOrganisationUnitsRes, SkippedPeriodRes, SummaryRes, TableRowRes,
};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hts_core::{
    ApplyOutcome, CoreConfig, Credentials, DashboardError, DashboardService, FilterSelection,
    Session,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    dashboard: Arc<DashboardService>,
    session: Arc<RwLock<Option<Session>>>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, dashboard: Arc<DashboardService>) -> Self {
        Self {
            cfg,
            dashboard,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Builds the state with the transport selected by `cfg`.
    pub fn from_config(cfg: Arc<CoreConfig>) -> Result<Self, DashboardError> {
        let dashboard = Arc::new(DashboardService::from_config(cfg.clone())?);
        Ok(Self::new(cfg, dashboard))
    }

    pub fn cfg(&self) -> &CoreConfig {
        &self.cfg
    }

    /// A copy of the current session, so no lock is held while talking to the server.
    async fn current_session(&self) -> Result<Session, ApiError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(ApiError::Dashboard(DashboardError::NotAuthenticated))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        login,
        logout,
        list_organisation_units,
        refresh_organisation_units,
        default_filters,
        apply_filters,
        latest_dashboard,
        export_csv,
        activity,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        LoginReq,
        LoginRes,
        LogoutRes,
        OrganisationUnitRes,
        ListOrganisationUnitsRes,
        RefreshOrganisationUnitsRes,
        Filters,
        DashboardRes,
        SummaryRes,
        TableRowRes,
        ChartRes,
        DatasetRes,
        SkippedPeriodRes,
        ActivityRes,
        ActivityEntryRes,
    ))
)]
pub struct ApiDoc;

/// Every route of the REST API, with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", post(login).delete(logout))
        .route("/organisation-units", get(list_organisation_units))
        .route(
            "/organisation-units/refresh",
            post(refresh_organisation_units),
        )
        .route("/filters/default", get(default_filters))
        .route("/dashboard", post(apply_filters).get(latest_dashboard))
        .route("/dashboard/export.csv", get(export_csv))
        .route("/activity", get(activity))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/session",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = LoginRes),
        (status = 400, description = "Malformed instance URL or blank credentials", body = ErrorRes),
        (status = 401, description = "Invalid username or password", body = ErrorRes),
        (status = 403, description = "Access forbidden", body = ErrorRes),
        (status = 502, description = "Instance unreachable", body = ErrorRes)
    )
)]
/// Log in to a DHIS2 instance
///
/// Probes the instance with the given credentials and loads the organisation unit catalog.
/// Replaces any session already held by the server.
///
/// # Errors
/// Returns `401` on rejected credentials, `403` when the account is not allowed to use the API
/// and `502` when the instance cannot be reached.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>, ApiError> {
    let credentials = Credentials::new(&req.instance_url, &req.username, &req.password)?;
    let session = state.dashboard.login(credentials).await?;
    let res = LoginRes::from(&session);

    let previous = state.session.write().await.replace(session);
    if let Some(previous) = previous {
        tracing::info!(
            "replacing session for {}",
            previous.credentials().instance_url()
        );
        state.dashboard.logout(previous);
    }
    Ok(Json(res))
}

#[utoipa::path(
    delete,
    path = "/session",
    responses(
        (status = 200, description = "Logged out", body = LogoutRes),
        (status = 401, description = "Not logged in", body = ErrorRes)
    )
)]
/// Log out and discard the current dashboard.
async fn logout(State(state): State<AppState>) -> Result<Json<LogoutRes>, ApiError> {
    let session = state
        .session
        .write()
        .await
        .take()
        .ok_or(ApiError::Dashboard(DashboardError::NotAuthenticated))?;
    state.dashboard.logout(session);
    Ok(Json(LogoutRes { ok: true }))
}

#[utoipa::path(
    get,
    path = "/organisation-units",
    responses(
        (status = 200, description = "Cached organisation unit catalog", body = ListOrganisationUnitsRes),
        (status = 401, description = "Not logged in", body = ErrorRes)
    )
)]
/// List the organisation units loaded at login.
async fn list_organisation_units(
    State(state): State<AppState>,
) -> Result<Json<ListOrganisationUnitsRes>, ApiError> {
    let session = state.current_session().await?;
    Ok(Json(ListOrganisationUnitsRes {
        organisation_units: session
            .organisation_units()
            .iter()
            .map(Into::into)
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/organisation-units/refresh",
    responses(
        (status = 200, description = "Catalog reloaded", body = RefreshOrganisationUnitsRes),
        (status = 401, description = "Not logged in", body = ErrorRes),
        (status = 502, description = "Instance unreachable", body = ErrorRes)
    )
)]
/// Reload the organisation unit catalog from the instance.
async fn refresh_organisation_units(
    State(state): State<AppState>,
) -> Result<Json<RefreshOrganisationUnitsRes>, ApiError> {
    let mut session = state.current_session().await?;
    let count = state
        .dashboard
        .refresh_organisation_units(&mut session)
        .await?;

    let mut slot = state.session.write().await;
    match slot.as_mut() {
        Some(current) if current.credentials() == session.credentials() => {
            current.set_organisation_units(session.organisation_units().to_vec());
        }
        _ => tracing::info!("session changed during refresh; catalog not stored"),
    }
    Ok(Json(RefreshOrganisationUnitsRes { count }))
}

#[utoipa::path(
    get,
    path = "/filters/default",
    responses(
        (status = 200, description = "Default filters: every unit, current year, no month", body = Filters)
    )
)]
/// Filters the dashboard starts from, and returns to on reset.
async fn default_filters(State(_state): State<AppState>) -> Json<Filters> {
    let today = chrono::Local::now().date_naive();
    Json(Filters::from(&FilterSelection::reset(today)))
}

#[utoipa::path(
    post,
    path = "/dashboard",
    request_body = Filters,
    responses(
        (status = 200, description = "Applied dashboard", body = DashboardRes),
        (status = 400, description = "Invalid filters", body = ErrorRes),
        (status = 401, description = "Not logged in", body = ErrorRes),
        (status = 409, description = "A newer apply replaced this one", body = ErrorRes),
        (status = 502, description = "Data could not be fetched", body = ErrorRes)
    )
)]
/// Apply filters
///
/// Fetches the data values for the selection, aggregates them and returns the summary, table
/// and chart series. The result becomes the latest dashboard.
///
/// # Errors
/// Returns `400` for an invalid selection (checked before any upstream request), `409` when a
/// later apply finished first and `502` when no period could be fetched.
#[axum::debug_handler]
async fn apply_filters(
    State(state): State<AppState>,
    Json(req): Json<Filters>,
) -> Result<Json<DashboardRes>, ApiError> {
    let session = state.current_session().await?;
    let selection = FilterSelection::from(req);

    match state.dashboard.apply(&session, &selection).await? {
        ApplyOutcome::Applied(view) => Ok(Json(DashboardRes::from(view.as_ref()))),
        ApplyOutcome::Superseded { generation } => Err(ApiError::Superseded(generation)),
    }
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Latest applied dashboard", body = DashboardRes),
        (status = 404, description = "Nothing applied yet", body = ErrorRes)
    )
)]
/// Return the most recently applied dashboard.
async fn latest_dashboard(State(state): State<AppState>) -> Result<Json<DashboardRes>, ApiError> {
    let view = state.dashboard.latest_view().ok_or(ApiError::NoDashboard)?;
    Ok(Json(DashboardRes::from(view.as_ref())))
}

#[utoipa::path(
    get,
    path = "/dashboard/export.csv",
    responses(
        (status = 200, description = "CSV of the latest table", body = String, content_type = "text/csv"),
        (status = 404, description = "Nothing applied yet", body = ErrorRes)
    )
)]
/// Export the latest table as CSV, named after the filters and today's date.
async fn export_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    let today = chrono::Local::now().date_naive();
    let export = state
        .dashboard
        .export_csv(today)?
        .ok_or(ApiError::NoDashboard)?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];
    Ok((headers, export.content).into_response())
}

#[utoipa::path(
    get,
    path = "/activity",
    responses(
        (status = 200, description = "Recent activity, newest first", body = ActivityRes)
    )
)]
/// Recent activity, newest first.
async fn activity(State(state): State<AppState>) -> Json<ActivityRes> {
    Json(ActivityRes {
        entries: state
            .dashboard
            .activity_entries()
            .iter()
            .map(Into::into)
            .collect(),
    })
}
