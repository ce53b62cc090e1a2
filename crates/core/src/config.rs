//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Binaries read environment variables and hand the raw values to the
//! helpers here; nothing in the core reads the process environment during request handling.

use crate::constants::{
    DEFAULT_CLIENTS_TESTED_ID, DEFAULT_CLIENT_AGE_ID, DEFAULT_COMMENTS_ID,
    DEFAULT_COUNSELING_TYPE_ID, DEFAULT_COUPLES_OPTION, DEFAULT_GROUP_OPTION,
    DEFAULT_INCONCLUSIVE_OPTION, DEFAULT_INDIVIDUAL_OPTION, DEFAULT_NEGATIVE_OPTION,
    DEFAULT_POSITIVE_OPTION, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEST_RESULT_ID,
};
use crate::validation::{normalise_http_url, validate_identifier};
use crate::{DashboardError, DashboardResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What a data value measures, as far as aggregation is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataElementKind {
    ClientsTested,
    TestResult,
    ClientAge,
    CounselingType,
    Comments,
}

/// Classification of a test-result option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    Positive,
    Negative,
    Inconclusive,
}

/// Classification of a counseling-type option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounselingCategory {
    Individual,
    Group,
    Couples,
}

/// Data element identifiers requested from the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataElementIds {
    pub clients_tested: String,
    pub test_result: String,
    pub client_age: String,
    pub counseling_type: String,
    pub comments: String,
}

impl Default for DataElementIds {
    fn default() -> Self {
        Self {
            clients_tested: DEFAULT_CLIENTS_TESTED_ID.into(),
            test_result: DEFAULT_TEST_RESULT_ID.into(),
            client_age: DEFAULT_CLIENT_AGE_ID.into(),
            counseling_type: DEFAULT_COUNSELING_TYPE_ID.into(),
            comments: DEFAULT_COMMENTS_ID.into(),
        }
    }
}

impl DataElementIds {
    /// Every configured identifier, in request order.
    pub fn all(&self) -> [&str; 5] {
        [
            self.clients_tested.as_str(),
            self.test_result.as_str(),
            self.client_age.as_str(),
            self.counseling_type.as_str(),
            self.comments.as_str(),
        ]
    }

    pub fn kind_of(&self, data_element: &str) -> Option<DataElementKind> {
        if data_element == self.clients_tested {
            Some(DataElementKind::ClientsTested)
        } else if data_element == self.test_result {
            Some(DataElementKind::TestResult)
        } else if data_element == self.client_age {
            Some(DataElementKind::ClientAge)
        } else if data_element == self.counseling_type {
            Some(DataElementKind::CounselingType)
        } else if data_element == self.comments {
            Some(DataElementKind::Comments)
        } else {
            None
        }
    }
}

/// Option identifiers used to classify categorical values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionIds {
    pub positive: String,
    pub negative: String,
    pub inconclusive: String,
    pub individual: String,
    pub group: String,
    pub couples: String,
}

impl Default for OptionIds {
    fn default() -> Self {
        Self {
            positive: DEFAULT_POSITIVE_OPTION.into(),
            negative: DEFAULT_NEGATIVE_OPTION.into(),
            inconclusive: DEFAULT_INCONCLUSIVE_OPTION.into(),
            individual: DEFAULT_INDIVIDUAL_OPTION.into(),
            group: DEFAULT_GROUP_OPTION.into(),
            couples: DEFAULT_COUPLES_OPTION.into(),
        }
    }
}

impl OptionIds {
    pub fn test_outcome(&self, value: &str) -> Option<TestOutcome> {
        if value == self.positive {
            Some(TestOutcome::Positive)
        } else if value == self.negative {
            Some(TestOutcome::Negative)
        } else if value == self.inconclusive {
            Some(TestOutcome::Inconclusive)
        } else {
            None
        }
    }

    pub fn counseling_category(&self, value: &str) -> Option<CounselingCategory> {
        if value == self.individual {
            Some(CounselingCategory::Individual)
        } else if value == self.group {
            Some(CounselingCategory::Group)
        } else if value == self.couples {
            Some(CounselingCategory::Couples)
        } else {
            None
        }
    }
}

/// Data element and option identifiers, injected into the fetcher and the aggregation engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataElementMapping {
    #[serde(default)]
    pub data_elements: DataElementIds,
    #[serde(default)]
    pub options: OptionIds,
}

impl DataElementMapping {
    fn validate(&self) -> DashboardResult<()> {
        let elements = self.data_elements.all();
        let options = [
            self.options.positive.as_str(),
            self.options.negative.as_str(),
            self.options.inconclusive.as_str(),
            self.options.individual.as_str(),
            self.options.group.as_str(),
            self.options.couples.as_str(),
        ];

        // These ids end up in query strings unencoded.
        for id in elements.iter().chain(options.iter()) {
            validate_identifier(id)?;
        }

        if let Some(id) = first_duplicate(&elements) {
            return Err(DashboardError::InvalidInput(format!(
                "data element {id} is mapped more than once"
            )));
        }
        if let Some(id) = first_duplicate(&options) {
            return Err(DashboardError::InvalidInput(format!(
                "option {id} is mapped more than once"
            )));
        }

        Ok(())
    }
}

fn first_duplicate<'a>(ids: &[&'a str]) -> Option<&'a str> {
    ids.iter()
        .enumerate()
        .find(|&(i, id)| ids[i + 1..].contains(id))
        .map(|(_, id)| *id)
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    relay_url: Option<String>,
    request_timeout: Duration,
    mapping: DataElementMapping,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        relay_url: Option<String>,
        request_timeout: Duration,
        mapping: DataElementMapping,
    ) -> DashboardResult<Self> {
        if request_timeout.is_zero() {
            return Err(DashboardError::InvalidInput(
                "request timeout must be greater than zero".into(),
            ));
        }
        mapping.validate()?;

        Ok(Self {
            relay_url,
            request_timeout,
            mapping,
        })
    }

    /// Resolve the configuration from raw environment values (`HTS_RELAY_URL`,
    /// `HTS_REQUEST_TIMEOUT_SECS`, `HTS_MAPPING_FILE`), any of which may be unset.
    pub fn from_env_values(
        relay_url: Option<String>,
        request_timeout: Option<String>,
        mapping_file: Option<PathBuf>,
    ) -> DashboardResult<Self> {
        Self::new(
            relay_url_from_env_value(relay_url)?,
            request_timeout_from_env_value(request_timeout)?,
            mapping_from_file(mapping_file)?,
        )
    }

    /// The relay every upstream request is routed through, if one is configured.
    pub fn relay_url(&self) -> Option<&str> {
        self.relay_url.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn mapping(&self) -> &DataElementMapping {
        &self.mapping
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            mapping: DataElementMapping::default(),
        }
    }
}

/// Parse the relay URL from an optional environment value.
///
/// `None` or a blank value means requests go straight to the instance.
pub fn relay_url_from_env_value(value: Option<String>) -> DashboardResult<Option<String>> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| normalise_http_url(&v))
        .transpose()
}

/// Parse the request timeout (whole seconds) from an optional environment value.
pub fn request_timeout_from_env_value(value: Option<String>) -> DashboardResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        Some(v) => v.parse::<u64>().map(Duration::from_secs).map_err(|_| {
            DashboardError::InvalidInput(format!("request timeout must be whole seconds, got {v}"))
        }),
    }
}

/// Load the identifier mapping from a YAML file, or fall back to the built-in identifiers.
///
/// Sections missing from the file keep their defaults, so a file may override only `options`.
pub fn mapping_from_file(path: Option<PathBuf>) -> DashboardResult<DataElementMapping> {
    let Some(path) = path else {
        return Ok(DataElementMapping::default());
    };

    let contents = std::fs::read_to_string(&path).map_err(DashboardError::MappingFileRead)?;
    let mapping: DataElementMapping =
        serde_yaml::from_str(&contents).map_err(DashboardError::MappingFileParse)?;
    mapping.validate()?;

    tracing::info!("loaded data element mapping from {}", path.display());
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_mapping_classifies_every_element() {
        let mapping = DataElementMapping::default();
        let ids = &mapping.data_elements;

        assert_eq!(
            ids.kind_of(DEFAULT_CLIENTS_TESTED_ID),
            Some(DataElementKind::ClientsTested)
        );
        assert_eq!(ids.kind_of(DEFAULT_COMMENTS_ID), Some(DataElementKind::Comments));
        assert_eq!(ids.kind_of("unknown"), None);
        assert_eq!(
            mapping.options.test_outcome(DEFAULT_INCONCLUSIVE_OPTION),
            Some(TestOutcome::Inconclusive)
        );
        assert_eq!(
            mapping.options.counseling_category(DEFAULT_COUPLES_OPTION),
            Some(CounselingCategory::Couples)
        );
        assert_eq!(mapping.options.counseling_category("other"), None);
    }

    #[test]
    fn test_relay_url_from_env_value() {
        assert_eq!(relay_url_from_env_value(None).unwrap(), None);
        assert_eq!(relay_url_from_env_value(Some("  ".into())).unwrap(), None);
        assert_eq!(
            relay_url_from_env_value(Some("https://relay.example.org/exec/".into())).unwrap(),
            Some("https://relay.example.org/exec".into())
        );
        assert!(relay_url_from_env_value(Some("relay.example.org".into())).is_err());
    }

    #[test]
    fn test_request_timeout_from_env_value() {
        assert_eq!(
            request_timeout_from_env_value(None).unwrap(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(
            request_timeout_from_env_value(Some("5".into())).unwrap(),
            Duration::from_secs(5)
        );
        assert!(request_timeout_from_env_value(Some("soon".into())).is_err());
    }

    #[test]
    fn test_core_config_rejects_zero_timeout() {
        let err = CoreConfig::new(None, Duration::ZERO, DataElementMapping::default())
            .expect_err("zero timeout should be rejected");
        assert!(matches!(err, DashboardError::InvalidInput(_)));
    }

    #[test]
    fn test_core_config_from_env_values() {
        let cfg = CoreConfig::from_env_values(
            Some("https://relay.example.org/".into()),
            Some("12".into()),
            None,
        )
        .expect("config should resolve");

        assert_eq!(cfg.relay_url(), Some("https://relay.example.org"));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(12));
        assert!(CoreConfig::from_env_values(None, Some("0".into()), None).is_err());
    }

    #[test]
    fn test_mapping_from_file_overrides_options_only() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            "options:\n  positive: P\n  negative: N\n  inconclusive: I\n  individual: IND\n  group: GRP\n  couples: CPL"
        )
        .unwrap();

        let mapping = mapping_from_file(Some(file.path().to_path_buf()))
            .expect("mapping file should load");

        assert_eq!(mapping.options.positive, "P");
        assert_eq!(mapping.data_elements, DataElementIds::default());
    }

    #[test]
    fn test_mapping_from_file_rejects_duplicate_elements() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            "data_elements:\n  clients_tested: A\n  test_result: A\n  client_age: B\n  counseling_type: C\n  comments: D"
        )
        .unwrap();

        let err = mapping_from_file(Some(file.path().to_path_buf()))
            .expect_err("duplicate ids should be rejected");
        assert!(matches!(err, DashboardError::InvalidInput(_)));
    }

    #[test]
    fn test_mapping_rejects_shared_option_ids() {
        let mut mapping = DataElementMapping::default();
        mapping.options.negative = mapping.options.positive.clone();

        let err = mapping.validate().expect_err("shared option ids should be rejected");
        assert!(err.to_string().contains("mapped more than once"));
    }

    #[test]
    fn test_mapping_rejects_ids_unsafe_for_query_strings() {
        let mut mapping = DataElementMapping::default();
        mapping.data_elements.client_age = "abc&period=1".into();
        assert!(matches!(
            mapping.validate(),
            Err(DashboardError::InvalidInput(_))
        ));

        let mut mapping = DataElementMapping::default();
        mapping.options.group = " ".into();
        assert!(mapping.validate().is_err());

        assert!(DataElementMapping::default().validate().is_ok());
    }

    #[test]
    fn test_mapping_from_file_without_path_uses_defaults() {
        assert_eq!(
            mapping_from_file(None).unwrap(),
            DataElementMapping::default()
        );
    }
}
