//! Constants used throughout the HTS core crate.
//!
//! Identifier defaults match the HIV testing services configuration of the reference DHIS2
//! instance. Deployments with different metadata override them with a mapping file (see
//! [`crate::config::mapping_from_file`]).

/// Selection sentinel meaning "every organisation unit in the cached catalog".
pub const ALL_ORGANISATION_UNITS: &str = "ALL";

/// Number of entries kept in the activity log.
pub const ACTIVITY_LOG_CAPACITY: usize = 10;

/// Default timeout for a single upstream request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Placeholder shown when an average age cannot be computed.
pub const NO_DATA_PLACEHOLDER: &str = "--";

/// Prefix of exported CSV file names.
pub const EXPORT_FILENAME_PREFIX: &str = "hiv-testing-data";

/// Column headings of the data table and of the CSV export.
pub const TABLE_HEADERS: [&str; 8] = [
    "Organisation Unit",
    "Period",
    "Clients Tested",
    "Positive",
    "Negative",
    "Inconclusive",
    "Average Age",
    "Counseling Sessions",
];

/// Login probe endpoint, relative to the instance URL.
pub const ME_PATH: &str = "/api/me";

/// Organisation unit catalog endpoint, relative to the instance URL.
pub const ORGANISATION_UNITS_PATH: &str = "/api/organisationUnits.json";

/// Data value set endpoint, relative to the instance URL.
pub const DATA_VALUE_SETS_PATH: &str = "/api/dataValueSets.json";

/// Data element: number of clients tested.
pub const DEFAULT_CLIENTS_TESTED_ID: &str = "kLmN8oPqR3s";
/// Data element: HIV test result.
pub const DEFAULT_TEST_RESULT_ID: &str = "WvYDK6cYopD";
/// Data element: client age.
pub const DEFAULT_CLIENT_AGE_ID: &str = "tUvW9xYzA1b";
/// Data element: counseling type.
pub const DEFAULT_COUNSELING_TYPE_ID: &str = "Oj5wqLKQ6f3";
/// Data element: free-text comments.
pub const DEFAULT_COMMENTS_ID: &str = "cDeFgH2iJ4k";

/// Option: positive test result.
pub const DEFAULT_POSITIVE_OPTION: &str = "uVGKdrp4iYw";
/// Option: negative test result.
pub const DEFAULT_NEGATIVE_OPTION: &str = "RxqYKri1WqY";
/// Option: inconclusive test result.
pub const DEFAULT_INCONCLUSIVE_OPTION: &str = "tOaQYVdAs6D";
/// Option: individual counseling.
pub const DEFAULT_INDIVIDUAL_OPTION: &str = "qjrA54Rvhrl";
/// Option: group counseling.
pub const DEFAULT_GROUP_OPTION: &str = "lTRsgvyDd5M";
/// Option: couples counseling.
pub const DEFAULT_COUPLES_OPTION: &str = "RUGObX8DV5L";
