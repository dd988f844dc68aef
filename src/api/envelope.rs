use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Uniform success/failure wrapper.
///
/// Built once per operation through the constructors below and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    success: bool,
    #[serde(skip_serializing_if = "Value::is_null")]
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u16>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
            message: None,
            code: None,
        }
    }

    /// Outcome of a write: `success` follows whether the store reported success
    pub fn outcome(success: bool, data: Value, message: impl Into<String>) -> Self {
        Self {
            success,
            data,
            message: Some(message.into()),
            code: None,
        }
    }

    /// Failure carrying an untranslated message key and the response status
    pub fn failure(key: impl Into<String>, code: u16, data: Option<Value>) -> Self {
        Self {
            success: false,
            data: data.unwrap_or(Value::Null),
            message: Some(key.into()),
            code: Some(code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "success": self.success }))
    }
}

/// What an operation hands back to the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Shaped resource or page returned as-is
    Raw(Value),
    Envelope(Envelope),
}

impl Reply {
    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Envelope(env) => env
                .code()
                .and_then(|c| StatusCode::from_u16(c).ok())
                .unwrap_or(StatusCode::OK),
            Reply::Raw(_) => StatusCode::OK,
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Reply::Raw(_) => true,
            Reply::Envelope(env) => env.is_success(),
        }
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Reply::Envelope(env) => Some(env),
            Reply::Raw(_) => None,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Reply::Raw(value) => value.clone(),
            Reply::Envelope(env) => env.to_json(),
        }
    }
}

impl From<Envelope> for Reply {
    fn from(env: Envelope) -> Self {
        Reply::Envelope(env)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}
