//! Transport-independent view of one incoming request.

use axum::http::HeaderMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::attachment::AttachmentDeclaration;

/// One uploaded file part
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// Set when the upload was rejected while reading (size limit, broken part)
    pub error: Option<String>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
            error: None,
        }
    }

    pub fn rejected(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceRequest {
    /// Query string parameters; JSON-looking values stay strings
    pub query: Map<String, Value>,
    /// Body fields merged over the query parameters
    pub input: Map<String, Value>,
    /// Uploaded files by field, in submission order
    pub files: HashMap<String, Vec<UploadedFile>>,
    pub headers: HeaderMap,
    /// Bearer token, if one was presented
    pub token: Option<String>,
}

impl ResourceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        for (k, v) in &query {
            self.input.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self.query = query;
        self
    }

    pub fn with_input(mut self, input: Map<String, Value>) -> Self {
        for (k, v) in input {
            self.input.insert(k, v);
        }
        self
    }

    pub fn with_file(mut self, field: impl Into<String>, file: UploadedFile) -> Self {
        self.files.entry(field.into()).or_default().push(file);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.token = self.token.or_else(|| bearer_token(&headers));
        self.headers = headers;
        self
    }

    pub fn has_file(&self, field: &str) -> bool {
        self.files.get(field).map(|f| !f.is_empty()).unwrap_or(false)
    }

    pub fn files(&self, field: &str) -> &[UploadedFile] {
        self.files.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files(field).first()
    }

    pub fn input(&self, field: &str) -> Option<&Value> {
        self.input.get(field)
    }

    pub fn query(&self, field: &str) -> Option<&Value> {
        self.query.get(field)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Extract the token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Strip every declared attachment field from raw input so file data never
/// reaches direct field assignment.
pub fn normalize(raw: &Map<String, Value>, declaration: &AttachmentDeclaration) -> Map<String, Value> {
    raw.iter()
        .filter(|(key, _)| !declaration.contains(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Loose truthiness of an input value: absent, null, "", "0", false, 0, [] and {} are falsy
pub fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty() || s == "0",
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
    }
}
