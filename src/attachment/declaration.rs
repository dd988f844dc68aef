use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// One file per field
    Single,
    /// Ordered sequence of files per field
    Multiple,
}

/// File-relation fields a controller manages.
///
/// Declared fields are never mass-assigned; only the synchronizer touches them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentDeclaration {
    single: Vec<String>,
    multiple: Vec<String>,
}

impl AttachmentDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// `preview_image` as a single field and `images` as a multiple field
    pub fn standard() -> Self {
        Self::new().single("preview_image").multiple("images")
    }

    pub fn single(mut self, field: impl Into<String>) -> Self {
        self.single.push(field.into());
        self
    }

    pub fn multiple(mut self, field: impl Into<String>) -> Self {
        self.multiple.push(field.into());
        self
    }

    pub fn single_fields(&self) -> &[String] {
        &self.single
    }

    pub fn multiple_fields(&self) -> &[String] {
        &self.multiple
    }

    pub fn kind(&self, field: &str) -> Option<AttachmentKind> {
        if self.single.iter().any(|f| f == field) {
            Some(AttachmentKind::Single)
        } else if self.multiple.iter().any(|f| f == field) {
            Some(AttachmentKind::Multiple)
        } else {
            None
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.kind(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multiple.is_empty()
    }

    /// Singles first, then multiples, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, AttachmentKind)> {
        self.single
            .iter()
            .map(|f| (f.as_str(), AttachmentKind::Single))
            .chain(self.multiple.iter().map(|f| (f.as_str(), AttachmentKind::Multiple)))
    }
}

/// When an attachment field with no upload clears the stored files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Absent or falsy input clears existing files
    #[default]
    OnMissing,
    /// Only a present, falsy input value clears; an absent key keeps the files
    Explicit,
}

impl FromStr for ClearPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_missing" | "on-missing" | "legacy" => Ok(ClearPolicy::OnMissing),
            "explicit" => Ok(ClearPolicy::Explicit),
            other => Err(format!("unknown clear policy: {}", other)),
        }
    }
}
