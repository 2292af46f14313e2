//! Typed record operations over the backend's REST API.
//!
//! # Design
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The blocking operations (`query`, `store`, `update`, `delete`) chain the
//! two through the client's `Transport`. Builders and parsers never touch
//! the network, so callers with their own HTTP stack can use them directly.
//!
//! Success of update/delete is decided by the absence of a `code` field in
//! the response body; the HTTP status is logged but not inspected.

use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::{collection_path, ChangeSet, Record, RecordReference};

const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";

/// Blocking client for the backend's class endpoints.
///
/// Holds only configuration and a transport; no per-call state survives a
/// call. Changing the API version needs `&mut self`, so it can never race
/// with a call in flight on the same client.
#[derive(Debug, Clone)]
pub struct RecordClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl RecordClient<UreqTransport> {
    /// Client using a ureq transport with the configured timeout and body
    /// limit.
    pub fn new(config: ClientConfig) -> Self {
        let transport =
            UreqTransport::new(config.timeout()).with_body_limit(config.max_response_bytes);
        Self { config, transport }
    }
}

impl<T: Transport> RecordClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.config.api_version
    }

    /// Change the API version used by every subsequently built request.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.config.api_version = version.into();
    }

    /// Fetch all records of class `R` matching `filter`, in backend order.
    pub fn query<R: Record>(&self, filter: &str) -> Result<Vec<R>, ApiError> {
        let response = self.send(self.build_query::<R>(filter))?;
        self.parse_query(response)
    }

    /// Create `record` and return the id the backend assigned to it.
    pub fn store<R: Record>(&self, record: &R) -> Result<String, ApiError> {
        let response = self.send(self.build_store(record)?)?;
        self.parse_store(response)
    }

    /// Apply `changes` to record `id` of class `R`.
    ///
    /// Returns `Ok(false)` when the backend reports an error code.
    pub fn update<R: Record>(&self, id: &str, changes: &ChangeSet) -> Result<bool, ApiError> {
        let response = self.send(self.build_update::<R>(id, changes)?)?;
        self.parse_mutation(response)
    }

    /// Delete record `id` of class `R`.
    ///
    /// Returns `Ok(false)` when the backend reports an error code.
    pub fn delete<R: Record>(&self, id: &str) -> Result<bool, ApiError> {
        let response = self.send(self.build_delete::<R>(id))?;
        self.parse_mutation(response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = ?request.method, url = %request.url, "sending request");
        let response = self.transport.execute(&request)?;
        tracing::debug!(
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );
        Ok(response)
    }
}

impl<T> RecordClient<T> {
    pub fn build_query<R: Record>(&self, filter: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.collection_url(R::CLASS_NAME),
            query: vec![("where".to_string(), filter.to_string())],
            headers: self.credential_headers(),
            body: None,
        }
    }

    pub fn build_store<R: Record>(&self, record: &R) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(record).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.collection_url(R::CLASS_NAME),
            query: Vec::new(),
            headers: self.json_headers(),
            body: Some(body),
        })
    }

    pub fn build_update<R: Record>(
        &self,
        id: &str,
        changes: &ChangeSet,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(changes).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url: self.record_url(&RecordReference::of::<R>(id)),
            query: Vec::new(),
            headers: self.json_headers(),
            body: Some(body),
        })
    }

    pub fn build_delete<R: Record>(&self, id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: self.record_url(&RecordReference::of::<R>(id)),
            query: Vec::new(),
            headers: self.json_headers(),
            body: None,
        }
    }

    /// Decode the `results` array of a query response.
    ///
    /// Fails as a whole if any element does not decode; never returns a
    /// partial list.
    pub fn parse_query<R: Record>(&self, response: HttpResponse) -> Result<Vec<R>, ApiError> {
        let mut object = parse_object(&response)?;
        let items = match object.remove("results") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ApiError::ProtocolError(format!(
                    "`results` is not an array: {other}"
                )))
            }
            None => {
                log_backend_error(&object, response.status);
                return Err(ApiError::ProtocolError(
                    "response has no `results` array".to_string(),
                ));
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).map_err(|e| {
                    ApiError::ProtocolError(format!(
                        "result {index} does not decode as {}: {e}",
                        R::CLASS_NAME
                    ))
                })
            })
            .collect()
    }

    /// Extract the backend-assigned `objectId` from a create response.
    pub fn parse_store(&self, response: HttpResponse) -> Result<String, ApiError> {
        let object = parse_object(&response)?;
        match object.get("objectId") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(other) => Err(ApiError::ProtocolError(format!(
                "`objectId` is not a string: {other}"
            ))),
            None => {
                log_backend_error(&object, response.status);
                Err(ApiError::MissingFieldError("objectId".to_string()))
            }
        }
    }

    /// `true` unless the update/delete response carries an error `code`.
    pub fn parse_mutation(&self, response: HttpResponse) -> Result<bool, ApiError> {
        let object = parse_object(&response)?;
        if object.contains_key("code") {
            log_backend_error(&object, response.status);
            return Ok(false);
        }
        Ok(true)
    }

    fn collection_url(&self, class_name: &str) -> String {
        format!(
            "{}{}",
            self.config.base_url(),
            collection_path(&self.config.api_version, class_name)
        )
    }

    fn record_url(&self, reference: &RecordReference) -> String {
        format!(
            "{}{}",
            self.config.base_url(),
            reference.path(&self.config.api_version)
        )
    }

    fn credential_headers(&self) -> Vec<(String, String)> {
        vec![
            (
                APPLICATION_ID_HEADER.to_string(),
                self.config.application_id.clone(),
            ),
            (
                REST_API_KEY_HEADER.to_string(),
                self.config.rest_api_key.clone(),
            ),
        ]
    }

    fn json_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.credential_headers();
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        headers
    }
}

/// Parse a response body that must be a JSON object.
fn parse_object(response: &HttpResponse) -> Result<Map<String, Value>, ApiError> {
    if response.body.trim().is_empty() {
        return Err(ApiError::EmptyResponseError);
    }
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::MalformedResponseError(e.to_string()))?;
    match value {
        Value::Object(object) => Ok(object),
        other => Err(ApiError::ProtocolError(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn log_backend_error(object: &Map<String, Value>, status: u16) {
    if let Some(code) = object.get("code") {
        let message = object.get("error").and_then(Value::as_str).unwrap_or("");
        tracing::warn!(status, %code, error = message, "backend reported an error");
    }
}
