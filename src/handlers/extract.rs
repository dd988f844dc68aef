use axum::{
    async_trait,
    body::to_bytes,
    extract::{FromRef, FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{messages, Envelope, Reply};
use crate::controller::Services;
use crate::request::{ResourceRequest, UploadedFile};

fn invalid(detail: impl std::fmt::Display) -> Reply {
    tracing::debug!("Rejected request body: {}", detail);
    Envelope::failure(messages::INVALID_REQUEST, 400, None).into()
}

/// `images[]` and `images` name the same field
fn field_name(raw: &str) -> String {
    raw.strip_suffix("[]").unwrap_or(raw).to_string()
}

fn parse_query(query: Option<&str>) -> Map<String, Value> {
    let Some(query) = query else {
        return Map::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (field_name(&k), Value::String(v.into_owned())))
        .collect()
}

/// Builds a `ResourceRequest` from query string, headers and a JSON,
/// urlencoded or multipart body. Body fields win over query parameters.
#[async_trait]
impl<S> FromRequest<S> for ResourceRequest
where
    S: Send + Sync,
    Arc<Services>: FromRef<S>,
{
    type Rejection = Reply;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let services = Arc::<Services>::from_ref(state);
        let query = parse_query(req.uri().query());
        let headers = req.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut request = ResourceRequest::new().with_query(query).with_headers(headers);

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state).await.map_err(invalid)?;
            let (input, files) = read_multipart(&mut multipart, services.config.attachments.max_upload_bytes).await?;
            request = request.with_input(input);
            for (field, uploads) in files {
                for upload in uploads {
                    request = request.with_file(field.clone(), upload);
                }
            }
            return Ok(request);
        }

        let limit = services.config.api.max_request_size_bytes;
        let bytes = to_bytes(req.into_body(), limit).await.map_err(invalid)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(request);
        }

        let input = if content_type.starts_with("application/x-www-form-urlencoded") {
            url::form_urlencoded::parse(&bytes)
                .map(|(k, v)| (field_name(&k), Value::String(v.into_owned())))
                .collect()
        } else {
            match serde_json::from_slice::<Value>(&bytes).map_err(invalid)? {
                Value::Object(map) => map,
                other => return Err(invalid(format!("expected a JSON object, got {}", other))),
            }
        };

        Ok(request.with_input(input))
    }
}

/// Text parts become input; file parts become uploads. Oversized files are
/// kept as rejected uploads so attachment sync can skip them. Empty unnamed
/// file parts are dropped.
async fn read_multipart(
    multipart: &mut Multipart,
    max_upload_bytes: usize,
) -> Result<(Map<String, Value>, HashMap<String, Vec<UploadedFile>>), Reply> {
    let mut input = Map::new();
    let mut files: HashMap<String, Vec<UploadedFile>> = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let Some(name) = field.name().map(field_name) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let upload = match field.bytes().await {
                    // A file input left empty by the browser: no upload at all
                    Ok(bytes) if file_name.trim().is_empty() && bytes.is_empty() => continue,
                    Ok(bytes) if bytes.len() > max_upload_bytes => {
                        tracing::warn!("Upload '{}' exceeds {} bytes", file_name, max_upload_bytes);
                        UploadedFile::rejected(file_name, "file too large")
                    }
                    Ok(bytes) => UploadedFile::new(file_name, content_type, bytes.to_vec()),
                    Err(e) => UploadedFile::rejected(file_name, e.to_string()),
                };
                files.entry(name).or_default().push(upload);
            }
            None => {
                let text = field.text().await.map_err(invalid)?;
                input.insert(name, Value::String(text));
            }
        }
    }

    Ok((input, files))
}
