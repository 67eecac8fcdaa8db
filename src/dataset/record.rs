//! Cultural heritage object record

use serde::{Deserialize, Deserializer, Serialize};

/// Canonical column identifiers, in wire order
pub const COLUMN_IDS: [&str; 8] = [
    "AISID",
    "USRCHONumber",
    "ObjectNameOnDoc",
    "EnsembleNameOnDoc",
    "SecurityStatus",
    "Category",
    "ObjectType",
    "global_id",
];

/// Human-readable column titles written as the second tabular header row
pub const COLUMN_TITLES: [&str; 8] = [
    "Идентификатор в АИС Мосгорнаследия",
    "Номер ЕГРОКН",
    "Наименование объекта по документам",
    "Наименование ансамбля по документам",
    "Охранный статус",
    "Категория объекта",
    "Вид объекта недвижимости",
    "global_id",
];

/// One cultural heritage object.
///
/// Missing values are always empty strings once a record exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "AISID", default, deserialize_with = "null_as_empty")]
    pub ais_id: String,

    #[serde(rename = "USRCHONumber", default, deserialize_with = "null_as_empty")]
    pub registry_number: String,

    #[serde(rename = "ObjectNameOnDoc", default, deserialize_with = "null_as_empty")]
    pub object_name: String,

    /// Older exports spell this key `EnsemblyNameOnDoc`
    #[serde(
        rename = "EnsembleNameOnDoc",
        alias = "EnsemblyNameOnDoc",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub ensemble_name: String,

    #[serde(rename = "SecurityStatus", default, deserialize_with = "null_as_empty")]
    pub security_status: String,

    #[serde(rename = "Category", default, deserialize_with = "null_as_empty")]
    pub category: String,

    #[serde(rename = "ObjectType", default, deserialize_with = "null_as_empty")]
    pub object_type: String,

    #[serde(rename = "global_id", default, deserialize_with = "null_as_empty")]
    pub global_id: String,
}

impl Record {
    /// Build a record from its eight fields in wire order
    pub fn from_fields(fields: [String; 8]) -> Self {
        let [ais_id, registry_number, object_name, ensemble_name, security_status, category, object_type, global_id] =
            fields;
        Self {
            ais_id,
            registry_number,
            object_name,
            ensemble_name,
            security_status,
            category,
            object_type,
            global_id,
        }
    }

    /// Fields in wire order
    pub fn fields(&self) -> [&str; 8] {
        [
            &self.ais_id,
            &self.registry_number,
            &self.object_name,
            &self.ensemble_name,
            &self.security_status,
            &self.category,
            &self.object_type,
            &self.global_id,
        ]
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_in_wire_order() {
        let record = Record::from_fields([
            "1".to_string(),
            "2".to_string(),
            "3".to_string(),
            "4".to_string(),
            "5".to_string(),
            "6".to_string(),
            "7".to_string(),
            "8".to_string(),
        ]);
        assert_eq!(record.object_name, "3");
        assert_eq!(record.global_id, "8");
        assert_eq!(record.fields(), ["1", "2", "3", "4", "5", "6", "7", "8"]);
    }

    #[test]
    fn test_legacy_ensemble_key_and_nulls() {
        let json = r#"{"AISID":"10","EnsemblyNameOnDoc":"Усадьба","Category":null}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.ais_id, "10");
        assert_eq!(record.ensemble_name, "Усадьба");
        assert_eq!(record.category, "");
        assert_eq!(record.object_type, "");
    }
}
