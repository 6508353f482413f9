use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::transport::Method;

const SETTINGS_ENDPOINT: &str = "settings";
const PROFILE_ENDPOINT: &str = "auth/protected";
const LOGIN_ENDPOINT: &str = "auth/login";
const REGISTER_ENDPOINT: &str = "auth/register";
const REFRESH_ENDPOINT: &str = "auth/refresh";

/// Login response together with the token it carried, if any.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub raw: Value,
    pub token: Option<String>,
}

/// Registration never raises; failures are reported in the value.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl BourseClient {
    /// User settings, or `{}` if they could not be loaded.
    pub async fn fetch_settings(&self) -> Value {
        match self.api().call(ApiRequest::get(SETTINGS_ENDPOINT)).await {
            Ok(reply) => reply.payload_or_empty(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch settings");
                json!({})
            }
        }
    }

    /// Save settings. `None` when nothing was given or the save failed.
    pub async fn update_settings(&self, settings: &Value) -> Option<Value> {
        if settings.is_null() {
            warn!("Refusing to save empty settings");
            return None;
        }
        let request = ApiRequest::post(SETTINGS_ENDPOINT, settings.clone());
        match self.api().get_json(request).await {
            Ok(saved) => Some(saved),
            Err(e) => {
                warn!(error = %e, "Failed to update settings");
                None
            }
        }
    }

    /// Profile of the signed-in user.
    pub async fn fetch_user_profile(&self) -> Result<Value, ApiError> {
        self.api().get_json(ApiRequest::get(PROFILE_ENDPOINT)).await
    }

    /// Log in and store the returned token. Errors propagate.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        info!(username, "Logging in");
        let request = ApiRequest::post(
            LOGIN_ENDPOINT,
            json!({ "username": username, "password": password }),
        );
        let raw = self.api().get_json(request).await?;
        let token = ["access_token", "token"]
            .iter()
            .find_map(|field| raw.get(field).and_then(Value::as_str))
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        match &token {
            Some(token) => self.session().set_token(token).await,
            None => warn!(username, "Login response carried no token"),
        }
        Ok(LoginOutcome { raw, token })
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> RegistrationOutcome {
        info!(username, email, "Registering");
        let request = ApiRequest::post(
            REGISTER_ENDPOINT,
            json!({ "username": username, "email": email, "password": password }),
        );
        match self.api().get_json(request).await {
            Ok(Value::Object(body)) => RegistrationOutcome {
                success: true,
                error: None,
                body,
            },
            Ok(other) => {
                let mut body = Map::new();
                body.insert("data".to_string(), other);
                RegistrationOutcome {
                    success: true,
                    error: None,
                    body,
                }
            }
            Err(e) => {
                warn!(username, error = %e, "Registration failed");
                RegistrationOutcome {
                    success: false,
                    error: Some(e.to_string()),
                    body: Map::new(),
                }
            }
        }
    }

    /// Ask for a new access token and store it. Errors propagate.
    pub async fn refresh_token(&self) -> Result<Value, ApiError> {
        let raw = self
            .api()
            .get_json(ApiRequest::new(Method::Post, REFRESH_ENDPOINT))
            .await?;
        if let Some(token) = raw.get("access_token").and_then(Value::as_str) {
            self.session().set_token(token).await;
            info!("Access token refreshed");
        }
        Ok(raw)
    }

    /// Forget every stored credential.
    pub async fn logout(&self) {
        self.session().clear().await;
        info!("Logged out");
    }
}
