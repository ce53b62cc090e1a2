//! Monthly reporting periods.
//!
//! A period is always the fixed-width `YYYYMM` form. Because every period has the same width,
//! ordering the strings lexicographically orders them chronologically; `Period` derives `Ord`
//! from its string for that reason, and the four-digit year bound keeps it true.

/// Three-letter month names used in period labels, January first.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("year must have four digits (1000-9999), got {0}")]
    InvalidYear(i32),
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("period must be six digits in YYYYMM form, got {0:?}")]
    Malformed(String),
}

/// A reporting month in `YYYYMM` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(String);

impl Period {
    /// Builds the period for `year` and `month` (1-based).
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1000..=9999).contains(&year) {
            return Err(PeriodError::InvalidYear(year));
        }
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        Ok(Self(format!("{year}{month:02}")))
    }

    /// Parses a `YYYYMM` string.
    pub fn parse(input: &str) -> Result<Self, PeriodError> {
        if input.len() != 6 || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PeriodError::Malformed(input.to_owned()));
        }
        let year: i32 = input[..4]
            .parse()
            .map_err(|_| PeriodError::Malformed(input.to_owned()))?;
        let month: u32 = input[4..]
            .parse()
            .map_err(|_| PeriodError::Malformed(input.to_owned()))?;
        Self::new(year, month)
    }

    /// All twelve months of `year`, January first.
    pub fn months_of_year(year: i32) -> Result<Vec<Self>, PeriodError> {
        (1..=12).map(|month| Self::new(year, month)).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn month(&self) -> u32 {
        self.0[4..].parse().unwrap_or_default()
    }

    /// Human-readable label such as `Jan 2025`.
    pub fn label(&self) -> String {
        let index = (self.month() as usize).saturating_sub(1);
        format!("{} {}", MONTH_ABBREVIATIONS[index], &self.0[..4])
    }

    /// Labels a raw period string as received from the server.
    ///
    /// Strings that are not valid periods are returned unchanged.
    pub fn label_for(raw: &str) -> String {
        match Self::parse(raw) {
            Ok(period) => period.label(),
            Err(_) => raw.to_owned(),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Period {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Period {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Period::parse(&s).map_err(serde::de::Error::custom)
    }
}
