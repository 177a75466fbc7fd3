use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::attachment::{AttachmentFieldSet, AttachmentTask, DownloadUrlMap};
use crate::constants::REVIEWED_STATUS;

/// A student record as returned by the origin system.
///
/// The record is kept as an open JSON object so fields the mirror does not know
/// about are passed back to callers untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentRecord(pub Map<String, Value>);

impl StudentRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String value of a field, `None` for missing or non-string values.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// The record's `id` rendered as a string, empty when absent.
    pub fn id_string(&self) -> String {
        match self.0.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Copy `id` into the client-facing `_id` field.
    pub fn with_client_id(mut self) -> Self {
        let id = self.id_string();
        self.0.insert("_id".to_string(), Value::String(id));
        self
    }

    pub fn client_id(&self) -> Option<&str> {
        self.text("_id").filter(|id| !id.is_empty())
    }

    pub fn is_reviewed(&self) -> bool {
        self.text("status") == Some(REVIEWED_STATUS)
    }

    /// One task per configured field holding a non-blank string path.
    pub fn attachment_tasks(&self, fields: &AttachmentFieldSet) -> Vec<AttachmentTask> {
        fields
            .iter()
            .filter_map(|field| {
                self.text(field)
                    .map(str::trim)
                    .filter(|path| !path.is_empty())
                    .map(|path| AttachmentTask::new(field, path))
            })
            .collect()
    }
}

/// Record plus temporary URLs for its mirrored attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDetail {
    pub student: StudentRecord,
    #[serde(rename = "downloadUrls")]
    pub download_urls: DownloadUrlMap,
}

/// A ZIP of a record's attachments uploaded to managed storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentBundle {
    pub object_id: String,
    pub download_url: String,
    pub file_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> StudentRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn numeric_id_becomes_string_client_id() {
        let student = record(json!({ "id": 42, "name": "Li" })).with_client_id();
        assert_eq!(student.text("_id"), Some("42"));
        assert_eq!(student.client_id(), Some("42"));
    }

    #[test]
    fn missing_id_gives_empty_client_id() {
        let student = record(json!({ "name": "Li" })).with_client_id();
        assert_eq!(student.text("_id"), Some(""));
        assert_eq!(student.client_id(), None);
    }

    #[test]
    fn only_non_blank_string_fields_become_tasks() {
        let student = record(json!({
            "id": 42,
            "photo_path": "/files/a.jpg",
            "diploma_path": "",
            "id_card_front_path": "   ",
            "id_card_back_path": null,
            "hukou_residence_path": 7,
            "unrelated_path": "/files/x.png"
        }));
        let tasks = student.attachment_tasks(&AttachmentFieldSet::default());
        assert_eq!(tasks, vec![AttachmentTask::new("photo_path", "/files/a.jpg")]);
    }

    #[test]
    fn reviewed_status() {
        assert!(record(json!({ "status": "reviewed" })).is_reviewed());
        assert!(!record(json!({ "status": "pending" })).is_reviewed());
        assert!(!record(json!({})).is_reviewed());
    }

    #[test]
    fn detail_serializes_download_urls_key() {
        let mut urls = DownloadUrlMap::new();
        urls.insert("photo_path".into(), "https://cdn/a".into());
        let detail = StudentDetail {
            student: record(json!({ "id": "s1" })),
            download_urls: urls,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["downloadUrls"]["photo_path"], "https://cdn/a");
        assert_eq!(value["student"]["id"], "s1");
    }
}
