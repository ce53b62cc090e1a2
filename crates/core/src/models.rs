//! Wire models for the subset of the DHIS2 API the dashboard consumes.

use serde::{Deserialize, Deserializer, Serialize};

/// A facility or location node in the reporting hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationUnit {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
}

/// One data value as returned by `dataValueSets`.
///
/// Records of the same client test share no identifier beyond organisation unit and period;
/// they are only ever tallied, never joined.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub org_unit: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub period: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_element: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
}

impl DataRecord {
    pub fn new(
        org_unit: impl Into<String>,
        period: impl Into<String>,
        data_element: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            org_unit: org_unit.into(),
            period: period.into(),
            data_element: data_element.into(),
            value: value.into(),
        }
    }
}

/// Profile returned by the login probe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub surname: String,
}

impl UserProfile {
    /// Full name for greetings, `"User"` when the server returned none.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.surname.trim());
        let full = full.trim();
        if full.is_empty() {
            "User".to_string()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrganisationUnitsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub organisation_units: Vec<OrganisationUnit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataValueSetResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_values: Vec<DataRecord>,
}

/// DHIS2 sends `null` for absent names and lists; treat it like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Values are strings in DHIS2 payloads, but some proxies re-encode numeric ones.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_value_set_ignores_extra_fields() {
        let json = r#"{
            "dataSet": "ds1",
            "dataValues": [
                {"dataElement": "kLmN8oPqR3s", "period": "202501", "orgUnit": "ou1",
                 "value": "12", "storedBy": "admin", "followup": false},
                {"dataElement": "tUvW9xYzA1b", "period": "202501", "orgUnit": "ou1", "value": 34}
            ]
        }"#;

        let parsed: DataValueSetResponse = serde_json::from_str(json).unwrap();

        assert_eq!(
            parsed.data_values,
            vec![
                DataRecord::new("ou1", "202501", "kLmN8oPqR3s", "12"),
                DataRecord::new("ou1", "202501", "tUvW9xYzA1b", "34"),
            ]
        );
    }

    #[test]
    fn test_data_value_set_without_values_is_empty() {
        let parsed: DataValueSetResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.data_values.is_empty());
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"firstName":null,"surname":"Kamara"}"#).unwrap();
        assert_eq!(profile.first_name, "");
        assert_eq!(profile.display_name(), "Kamara");

        let catalog: OrganisationUnitsResponse = serde_json::from_str(
            r#"{"organisationUnits":[{"id":"ou1","displayName":null},{"id":"ou2","displayName":"Bo"}]}"#,
        )
        .unwrap();
        assert_eq!(catalog.organisation_units.len(), 2);
        assert_eq!(catalog.organisation_units[0].display_name, "");
        assert_eq!(catalog.organisation_units[1].display_name, "Bo");

        let no_units: OrganisationUnitsResponse =
            serde_json::from_str(r#"{"organisationUnits":null}"#).unwrap();
        assert!(no_units.organisation_units.is_empty());

        let no_values: DataValueSetResponse =
            serde_json::from_str(r#"{"dataSet":"ds1","dataValues":null}"#).unwrap();
        assert!(no_values.data_values.is_empty());
    }

    #[test]
    fn test_user_profile_display_name() {
        let profile = UserProfile {
            first_name: "John".into(),
            surname: "Traore".into(),
        };
        assert_eq!(profile.display_name(), "John Traore");

        let only_surname = UserProfile {
            first_name: String::new(),
            surname: "Traore".into(),
        };
        assert_eq!(only_surname.display_name(), "Traore");

        assert_eq!(UserProfile::default().display_name(), "User");
    }
}
