//! Candidate source documents for a generation request

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported source document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Txt,
}

impl SourceKind {
    /// Derive the kind from a file name's extension (case-insensitive)
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "txt" => Some(SourceKind::Txt),
            _ => None,
        }
    }
}

/// One source document offered as generation input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    pub checked: bool,
    pub is_uploading: bool,
    /// Storage reference; absent until the upload has produced one
    pub file_ref: Option<String>,
}

impl SourceItem {
    /// New unchecked, not-uploading source without a file reference
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            checked: false,
            is_uploading: false,
            file_ref: None,
        }
    }

    pub fn with_file_ref(mut self, file_ref: impl Into<String>) -> Self {
        self.file_ref = Some(file_ref.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn uploading(mut self, is_uploading: bool) -> Self {
        self.is_uploading = is_uploading;
        self
    }

    /// Usable as generation input right now
    pub fn is_usable(&self) -> bool {
        self.checked && !self.is_uploading && self.file_ref.is_some()
    }
}
