use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Live form values keyed by field name, mirrored under `formData`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormDraft(BTreeMap<String, String>);

impl FormDraft {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl FromIterator<(String, String)> for FormDraft {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A submitted incident report.
///
/// Schema fields are flattened next to `id`, `createdAt` and `photo`, so a
/// stored post is a single flat JSON object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub photo: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl Post {
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Photo payload as sent by the page after reading the file input.
#[derive(Deserialize, Clone, Debug)]
pub struct PhotoUpload {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Base64 file contents, optionally already prefixed as a data URL.
    pub data: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct SubmitRequest {
    #[serde(default)]
    pub fields: FormDraft,
    #[serde(default)]
    pub photo: Option<PhotoUpload>,
}
