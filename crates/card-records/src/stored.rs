//! Records stored with a project.
//!
//! Each stored row carries a structured data map (possibly serialized to a
//! string by the API) and optional photo URLs kept outside that map.

use crate::types::{RecordSet, RecordsError, Result};
use card_template::variables::{DIRECT_PHOTO_FIELDS, PROCESSED_PHOTO_FIELDS};
use card_template::{PhotoResolver, Record};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// One row as the project API returns it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "dataJson", alias = "data")]
    pub data_json: Option<Value>,
    #[serde(default, alias = "photoUrl")]
    pub photo_url: Option<String>,
    #[serde(default, alias = "croppedPhotoUrl")]
    pub cropped_photo_url: Option<String>,
}

impl StoredRecord {
    /// Flatten into a field map, rebasing photo paths onto the backend
    pub fn into_record(self, resolver: &PhotoResolver) -> Result<Record> {
        let data = match self.data_json {
            None | Some(Value::Null) => Map::new(),
            Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
            Some(Value::String(text)) => match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                other => return Err(non_object(&other)),
            },
            Some(Value::Object(map)) => map,
            Some(other) => return Err(non_object(&other)),
        };

        let mut record = Record::new();
        for (key, value) in data {
            if let Some(text) = field_text(&value) {
                record.insert(key, text);
            }
        }

        if let Some(id) = self.id.as_ref().and_then(field_text) {
            if !record.contains("id") {
                record.insert("id", id);
            }
        }
        if let Some(url) = self.photo_url.filter(|u| !u.trim().is_empty()) {
            record.insert("photo_url", url);
        }
        if let Some(url) = self.cropped_photo_url.filter(|u| !u.trim().is_empty()) {
            record.insert("cropped_photo_url", url);
        }

        for field in PROCESSED_PHOTO_FIELDS.iter().chain(DIRECT_PHOTO_FIELDS) {
            if let Some(url) = record.non_empty(field).map(|u| resolver.rebase(u)) {
                record.insert(*field, url);
            }
        }

        Ok(record)
    }
}

fn non_object(value: &Value) -> RecordsError {
    RecordsError::MalformedImport(format!("record data is not an object: {}", value))
}

/// String form of a stored value; nested photo objects contribute their `url`
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => match map.get("url") {
            Some(Value::String(url)) => Some(url.clone()),
            _ => Some(value.to_string()),
        },
        Value::Array(_) => Some(value.to_string()),
    }
}

/// Convert a JSON array of stored rows into a record set
pub fn records_from_stored(json: &str, resolver: &PhotoResolver) -> Result<RecordSet> {
    let rows: Vec<StoredRecord> = serde_json::from_str(json)?;
    if rows.is_empty() {
        return Err(RecordsError::MalformedImport(
            "project has no stored records".to_string(),
        ));
    }

    let records = rows
        .into_iter()
        .map(|row| row.into_record(resolver))
        .collect::<Result<Vec<_>>>()?;

    let headers: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.fields().map(str::to_string))
        .collect();

    Ok(RecordSet {
        headers: headers.into_iter().collect(),
        records,
    })
}

pub async fn load_stored_records(
    path: impl AsRef<Path>,
    resolver: &PhotoResolver,
) -> Result<RecordSet> {
    let path = path.as_ref().to_owned();
    let contents = tokio::fs::read_to_string(&path).await?;

    let resolver = resolver.clone();
    let set =
        tokio::task::spawn_blocking(move || records_from_stored(&contents, &resolver)).await??;
    log::info!("Loaded {} stored records from {}", set.len(), path.display());

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_data_and_photo_merge() {
        let json = r#"[
            {"id": 12, "data_json": "{\"name\":\"Ada\",\"age\":36,\"photo\":\"/uploads/ada.jpg\"}",
             "cropped_photo_url": "uploads/ada-crop.png"},
            {"id": "b", "data": {"name": "Grace", "active": true, "photo": {"url": "https://x/g.png"}}}
        ]"#;
        let set = records_from_stored(json, &PhotoResolver::default()).unwrap();
        assert_eq!(set.len(), 2);

        let ada = &set.records[0];
        assert_eq!(ada.get("id"), Some("12"));
        assert_eq!(ada.get("age"), Some("36"));
        assert_eq!(ada.get("photo"), Some("http://localhost:3001/uploads/ada.jpg"));
        assert_eq!(
            ada.get("cropped_photo_url"),
            Some("http://localhost:3001/uploads/ada-crop.png")
        );

        let grace = &set.records[1];
        assert_eq!(grace.get("active"), Some("true"));
        assert_eq!(grace.get("photo"), Some("https://x/g.png"));
        assert!(set.headers.contains(&"cropped_photo_url".to_string()));
    }

    #[test]
    fn test_empty_and_invalid() {
        let resolver = PhotoResolver::default();
        assert!(matches!(
            records_from_stored("[]", &resolver),
            Err(RecordsError::MalformedImport(_))
        ));
        assert!(matches!(
            records_from_stored(r#"[{"data_json": "[1,2]"}]"#, &resolver),
            Err(RecordsError::MalformedImport(_))
        ));
        let blank = records_from_stored(r#"[{"data_json": ""}]"#, &resolver).unwrap();
        assert!(blank.records[0].is_empty());
    }
}
