#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("select at least one organisation unit")]
    NoOrganisationUnitsSelected,
    #[error("invalid period: {0}")]
    Period(#[from] hts_types::PeriodError),
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Access forbidden")]
    Forbidden,
    #[error("Authentication failed ({0})")]
    AuthenticationFailed(u16),

    #[error("connection failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request to {url} failed with status {status}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("failed to decode server response: {0}")]
    Deserialization(serde_json::Error),
    #[error("all {periods} requested periods failed; last error: {last_error}")]
    AllPeriodsFailed { periods: usize, last_error: String },

    #[error("failed to read mapping file: {0}")]
    MappingFileRead(std::io::Error),
    #[error("failed to parse mapping file: {0}")]
    MappingFileParse(serde_yaml::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to convert CSV buffer to string: {0}")]
    CsvToString(std::string::FromUtf8Error),
    #[error("failed to write export file: {0}")]
    FileWrite(std::io::Error),
}

impl DashboardError {
    /// True for errors caused by the upstream server rejecting the credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::Forbidden | Self::AuthenticationFailed(_)
        )
    }

    /// True for errors detected before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::NoOrganisationUnitsSelected | Self::Period(_)
        )
    }
}

impl From<hts_types::TextError> for DashboardError {
    fn from(err: hts_types::TextError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type DashboardResult<T> = std::result::Result<T, DashboardError>;
