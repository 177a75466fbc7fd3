use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field name to temporary download URL. Only fields that mirrored and resolved
/// a URL end-to-end are present.
pub type DownloadUrlMap = BTreeMap<String, String>;

/// One attachment field of a record that needs mirroring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentTask {
    pub field_name: String,
    pub source_url: String,
}

impl AttachmentTask {
    pub fn new(field_name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            source_url: source_url.into(),
        }
    }
}

/// A file already copied into managed storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirroredObject {
    pub source_url: String,
    pub object_id: String,
    pub stored_at: DateTime<Utc>,
}

/// Outcome of mirroring one field. `object_id` is `None` when the field failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub field_name: String,
    pub object_id: Option<String>,
}

impl FieldResult {
    pub fn mirrored(field_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            object_id: Some(object_id.into()),
        }
    }

    pub fn failed(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            object_id: None,
        }
    }

    pub fn is_mirrored(&self) -> bool {
        self.object_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Versioned list of record fields that carry attachment paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFieldSet {
    version: u32,
    fields: Vec<String>,
}

impl AttachmentFieldSet {
    /// Fields of the current registration record layout.
    pub const V2: [&'static str; 7] = [
        "photo_path",
        "diploma_path",
        "id_card_front_path",
        "id_card_back_path",
        "hukou_residence_path",
        "hukou_personal_path",
        "training_form_path",
    ];

    pub fn new(version: u32, fields: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(fields.len());
        for field in fields {
            if !field.is_empty() && !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self {
            version,
            fields: unique,
        }
    }

    /// Parse a comma separated list. Blank entries and duplicates are dropped.
    pub fn from_list(list: &str) -> Self {
        Self::new(
            0,
            list.split(',')
                .map(|f| f.trim().to_string())
                .collect(),
        )
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Human label for a field: the name without its `_path` suffix.
    pub fn label(field: &str) -> &str {
        field.strip_suffix("_path").unwrap_or(field)
    }
}

impl Default for AttachmentFieldSet {
    fn default() -> Self {
        Self::new(2, Self::V2.iter().map(|f| f.to_string()).collect())
    }
}
