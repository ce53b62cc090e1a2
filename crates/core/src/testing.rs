//! In-memory transport for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util` feature, for dependent
//! crates' tests.

use crate::models::{OrganisationUnit, UserProfile};
use crate::session::{Credentials, Session};
use crate::transport::{HttpResponse, Transport};
use crate::DashboardResult;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Instance URL used by [`test_session`].
pub const TEST_INSTANCE_URL: &str = "https://dhis.example.org";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub authorization: String,
}

#[derive(Clone, Debug)]
struct Route {
    pattern: String,
    response: HttpResponse,
    gate: Option<Arc<Notify>>,
}

/// Answers requests from canned responses.
///
/// The first route whose pattern occurs in the request URL wins; unmatched requests get a 404.
/// A held route answers only once its gate is notified.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: Vec<Route>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            response: HttpResponse::new(status, body),
            gate: None,
        });
        self
    }

    /// Like [`respond`](Self::respond), but waits for `gate` before answering.
    pub fn hold(mut self, pattern: &str, gate: Arc<Notify>, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            response: HttpResponse::new(status, body),
            gate: Some(gate),
        });
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str, authorization: &str) -> DashboardResult<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                url: url.to_string(),
                authorization: authorization.to_string(),
            });

        let Some(route) = self.routes.iter().find(|route| url.contains(&route.pattern)) else {
            return Ok(HttpResponse::new(404, ""));
        };
        if let Some(gate) = &route.gate {
            gate.notified().await;
        }
        Ok(route.response.clone())
    }
}

/// A session on [`TEST_INSTANCE_URL`] with the given `(id, display name)` catalog.
pub fn test_session(units: &[(&str, &str)]) -> Session {
    let credentials = Credentials::new(TEST_INSTANCE_URL, "admin", "district")
        .unwrap_or_else(|e| panic!("test credentials should be valid: {e}"));
    let mut session = Session::new(credentials, UserProfile::default());
    session.set_organisation_units(
        units
            .iter()
            .map(|(id, name)| OrganisationUnit {
                id: id.to_string(),
                display_name: name.to_string(),
            })
            .collect(),
    );
    session
}
