use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Path segment reserved for authentication endpoints.
pub const AUTH_SEGMENT: &str = "auth";

/// A request against a backend endpoint, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    pub override_token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        let trimmed = path.trim_start_matches('/');
        let path = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').map(str::to_string).collect()
        };
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            override_token: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str, body: serde_json::Value) -> Self {
        Self::new(Method::Post, path).body(body)
    }

    /// Append one raw path segment (e.g., a symbol). Encoded on the wire.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        if self.path.last().is_some_and(|s| s.is_empty()) {
            self.path.pop();
        }
        self.path.push(segment.into());
        self
    }

    pub fn trailing_slash(mut self) -> Self {
        if !self.path.last().is_some_and(|s| s.is_empty()) {
            self.path.push(String::new());
        }
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn queries(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.override_token = Some(token.into());
        self
    }

    /// Authentication endpoints hand out tokens and never consume them.
    pub fn is_auth_endpoint(&self) -> bool {
        self.path.iter().any(|segment| segment == AUTH_SEGMENT)
    }

    pub fn path_string(&self) -> String {
        format!("/{}", self.path.join("/"))
    }
}

/// Outcome of a non-auth request. A failure is kept as data instead of
/// being raised, so callers can fall back to cache.
#[derive(Debug)]
pub enum ApiReply {
    Payload(serde_json::Value),
    Degraded(ApiError),
}

impl ApiReply {
    pub fn into_result(self) -> Result<serde_json::Value, ApiError> {
        match self {
            Self::Payload(value) => Ok(value),
            Self::Degraded(e) => Err(e),
        }
    }

    /// The payload, or `{}` when degraded.
    pub fn payload_or_empty(self) -> serde_json::Value {
        match self {
            Self::Payload(value) => value,
            Self::Degraded(_) => serde_json::Value::Object(Default::default()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Issues authenticated JSON requests and normalizes the responses.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<AuthSession>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<AuthSession>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Send a request. Every failure is returned as an error.
    pub async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        let is_auth = request.is_auth_endpoint();
        let path = request.path_string();

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if !is_auth {
            // Resolved per request so a token set mid-flight is picked up.
            if let Some(token) = self
                .session
                .resolve_token(request.override_token.as_deref())
                .await
            {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }
        for (name, value) in request.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        if is_auth {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        }

        let http = HttpRequest {
            method: request.method,
            path: request.path,
            query: request.query,
            headers,
            body: request.body.map(|body| body.to_string()),
        };

        debug!(method = http.method.as_str(), path = %path, "API request");
        let response = self.transport.send(&http).await?;
        let value = interpret_response(response)?;
        debug!(path = %path, "API success");
        Ok(value)
    }

    /// Send a request, applying the endpoint-class rule: auth endpoints
    /// return their error, every other endpoint reports it as
    /// [`ApiReply::Degraded`] and never fails.
    pub async fn call(&self, request: ApiRequest) -> Result<ApiReply, ApiError> {
        let is_auth = request.is_auth_endpoint();
        let path = request.path_string();
        match self.send(request).await {
            Ok(value) => Ok(ApiReply::Payload(value)),
            Err(e) if is_auth => {
                warn!(path = %path, error = %e, "Auth request failed");
                Err(e)
            }
            Err(e) => {
                warn!(path = %path, status = ?e.status(), error = %e, "API request failed");
                Ok(ApiReply::Degraded(e))
            }
        }
    }

    /// [`call`](Self::call) flattened to a `Result`, for fetchers that
    /// handle both failure kinds the same way.
    pub async fn get_json(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        self.call(request).await?.into_result()
    }
}

/// Turn a raw response into a JSON value.
///
/// Non-2xx becomes [`ApiError::Http`]; empty bodies become `{}` and
/// non-JSON bodies become `{"message": <text>}`.
pub fn interpret_response(response: HttpResponse) -> Result<serde_json::Value, ApiError> {
    if !response.is_success() {
        let message = error_message(&response);
        return Err(ApiError::Http {
            status: response.status,
            message,
        });
    }

    if response.status == 204 || response.content_length == Some(0) {
        return Ok(serde_json::json!({}));
    }

    let is_json = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        warn!(content_type = ?response.content_type, "Non-JSON response");
        return Ok(serde_json::json!({ "message": response.body }));
    }

    Ok(serde_json::from_str(&response.body)?)
}

/// Best-effort message: JSON `message`/`detail`/`error`, then the raw
/// body, then the status line.
fn error_message(response: &HttpResponse) -> String {
    let body = response.body.trim();
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => ["message", "detail", "error"]
            .iter()
            .find_map(|field| match json.get(field) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => None,
                Some(other) => Some(other.to_string()),
            })
            .unwrap_or_else(|| body.to_string()),
        Err(_) if !body.is_empty() => body.to_string(),
        Err(_) => status_line(response),
    }
}

fn status_line(response: &HttpResponse) -> String {
    match &response.reason {
        Some(reason) => format!("{} {}", response.status, reason),
        None => response.status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parsing() {
        let req = ApiRequest::get("/market-overview/");
        assert_eq!(req.path, vec!["market-overview", ""]);
        assert_eq!(req.path_string(), "/market-overview/");

        let req = ApiRequest::get("analysis/stock-history").segment("فولاد");
        assert_eq!(req.path_string(), "/analysis/stock-history/فولاد");

        let req = ApiRequest::get("analysis/ml_prediction/")
            .segment("FOLD")
            .trailing_slash();
        assert_eq!(req.path_string(), "/analysis/ml_prediction/FOLD/");
    }

    #[test]
    fn auth_endpoint_detection() {
        assert!(ApiRequest::get("/auth/login").is_auth_endpoint());
        assert!(ApiRequest::get("auth/protected").is_auth_endpoint());
        assert!(!ApiRequest::get("/settings").is_auth_endpoint());
        assert!(!ApiRequest::get("/authors").is_auth_endpoint());
    }

    #[test]
    fn http_error_prefers_json_message() {
        let response = HttpResponse::json(401, &serde_json::json!({"detail": "Token expired"}));
        match interpret_response(response) {
            Err(ApiError::Http { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Token expired");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn http_error_falls_back_to_text_then_status_line() {
        let response = HttpResponse::text(502, "text/html", "upstream down");
        let err = interpret_response(response).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502: upstream down");

        let response = HttpResponse::text(503, "text/plain", "").with_reason("Service Unavailable");
        let err = interpret_response(response).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503: 503 Service Unavailable");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn json_error_without_known_fields_uses_body() {
        let response = HttpResponse::json(500, &serde_json::json!({"code": 7}));
        let err = interpret_response(response).unwrap_err();
        assert_eq!(err.to_string(), r#"HTTP 500: {"code":7}"#);
    }

    #[test]
    fn no_content_is_empty_object() {
        assert_eq!(
            interpret_response(HttpResponse::no_content()).unwrap(),
            serde_json::json!({})
        );
        let empty = HttpResponse::text(200, "application/json", "");
        assert_eq!(interpret_response(empty).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn non_json_is_wrapped_as_message() {
        let response = HttpResponse::text(200, "text/plain", "OK");
        assert_eq!(
            interpret_response(response).unwrap(),
            serde_json::json!({"message": "OK"})
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        let response = HttpResponse::text(200, "application/json; charset=utf-8", "{oops");
        assert!(matches!(interpret_response(response), Err(ApiError::Json(_))));
    }

    #[test]
    fn degraded_reply_is_empty_object() {
        let reply = ApiReply::Degraded(ApiError::Transport("refused".to_string()));
        assert!(reply.is_degraded());
        assert_eq!(reply.payload_or_empty(), serde_json::json!({}));
    }
}
