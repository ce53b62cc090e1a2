//! Mapping from dashboard errors to HTTP responses.

use api_shared::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hts_core::DashboardError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("no dashboard has been applied yet")]
    NoDashboard,
    #[error("a newer request replaced apply {0}")]
    Superseded(u64),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoDashboard => StatusCode::NOT_FOUND,
            Self::Superseded(_) => StatusCode::CONFLICT,
            Self::Dashboard(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Self::Dashboard(e) => match e {
                DashboardError::NotAuthenticated | DashboardError::InvalidCredentials => {
                    StatusCode::UNAUTHORIZED
                }
                DashboardError::Forbidden => StatusCode::FORBIDDEN,
                _ if e.is_authentication() => StatusCode::BAD_GATEWAY,
                DashboardError::Transport(_)
                | DashboardError::UnexpectedStatus { .. }
                | DashboardError::Deserialization(_)
                | DashboardError::AllPeriodsFailed { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed ({}): {}", status, self);
        } else {
            tracing::warn!("request rejected ({}): {}", status, self);
        }

        let body = ErrorRes {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(DashboardError::NoOrganisationUnitsSelected).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DashboardError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(DashboardError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(DashboardError::AllPeriodsFailed {
                periods: 12,
                last_error: "timeout".into()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ApiError::Superseded(3).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NoDashboard.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_message_passes_through() {
        let err = ApiError::from(DashboardError::InvalidCredentials);
        assert_eq!(err.to_string(), "Invalid username or password");
    }
}
