//! Credentials and the authenticated session.
//!
//! A [`Session`] is only opened after the server accepted the credentials (see
//! [`crate::DashboardService::login`]), so holding one is the "logged in" state. Operations
//! that talk to the server take the session by reference; logging out consumes it.

use crate::client::Dhis2Client;
use crate::models::{OrganisationUnit, UserProfile};
use crate::validation::normalise_http_url;
use crate::DashboardResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hts_types::NonEmptyText;

/// Instance URL and login for one DHIS2 server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    instance_url: String,
    username: NonEmptyText,
    password: NonEmptyText,
}

impl Credentials {
    /// Validates and normalises login input.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::InvalidInput` if the instance URL is not an `http(s)` URL or the
    /// username or password is blank.
    pub fn new(
        instance_url: &str,
        username: impl AsRef<str>,
        password: impl AsRef<str>,
    ) -> DashboardResult<Self> {
        Ok(Self {
            instance_url: normalise_http_url(instance_url)?,
            username: NonEmptyText::new(username)?,
            password: NonEmptyText::new(password)?,
        })
    }

    /// Instance URL without a trailing slash.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Value of the `Authorization` header for these credentials.
    pub fn authorization_header(&self) -> String {
        let token = STANDARD.encode(format!(
            "{}:{}",
            self.username.as_str(),
            self.password.as_str()
        ));
        format!("Basic {token}")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("instance_url", &self.instance_url)
            .field("username", &self.username.as_str())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated connection to one instance, with its organisation unit catalog.
#[derive(Clone, Debug)]
pub struct Session {
    credentials: Credentials,
    profile: UserProfile,
    organisation_units: Vec<OrganisationUnit>,
}

impl Session {
    /// Opens a session for credentials that were already verified.
    pub fn new(credentials: Credentials, profile: UserProfile) -> Self {
        Self {
            credentials,
            profile,
            organisation_units: Vec::new(),
        }
    }

    /// Reloads the organisation unit catalog.
    ///
    /// On failure the previous catalog is kept.
    pub async fn refresh_organisation_units(
        &mut self,
        client: &Dhis2Client,
    ) -> DashboardResult<usize> {
        let units = client.organisation_units(self).await?;
        self.organisation_units = units;
        Ok(self.organisation_units.len())
    }

    /// Ends the session.
    pub fn logout(self) {
        tracing::info!(
            "logged out of {} ({})",
            self.credentials.instance_url(),
            self.credentials.username()
        );
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn organisation_units(&self) -> &[OrganisationUnit] {
        &self.organisation_units
    }

    pub fn set_organisation_units(&mut self, units: Vec<OrganisationUnit>) {
        self.organisation_units = units;
    }

    /// Ids of every unit in the cached catalog, in catalog order.
    pub fn organisation_unit_ids(&self) -> Vec<String> {
        self.organisation_units.iter().map(|ou| ou.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DashboardError;

    #[test]
    fn test_credentials_build_basic_auth_header() {
        let credentials = Credentials::new("https://play.dhis2.org/demo/", "admin", "district")
            .expect("credentials should be valid");

        assert_eq!(credentials.instance_url(), "https://play.dhis2.org/demo");
        assert_eq!(
            credentials.authorization_header(),
            "Basic YWRtaW46ZGlzdHJpY3Q="
        );
    }

    #[test]
    fn test_credentials_reject_blank_fields() {
        assert!(matches!(
            Credentials::new("https://play.dhis2.org", "  ", "district"),
            Err(DashboardError::InvalidInput(_))
        ));
        assert!(matches!(
            Credentials::new("ftp://play.dhis2.org", "admin", "district"),
            Err(DashboardError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials =
            Credentials::new("https://play.dhis2.org", "admin", "district").unwrap();
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("district"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_organisation_unit_ids_follow_catalog_order() {
        let credentials =
            Credentials::new("https://play.dhis2.org", "admin", "district").unwrap();
        let mut session = Session::new(credentials, UserProfile::default());
        session.set_organisation_units(vec![
            OrganisationUnit {
                id: "b".into(),
                display_name: "Bo".into(),
            },
            OrganisationUnit {
                id: "a".into(),
                display_name: "Ajara".into(),
            },
        ]);

        assert_eq!(session.organisation_unit_ids(), vec!["b", "a"]);
    }
}
