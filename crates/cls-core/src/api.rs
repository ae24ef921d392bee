//! Containerlab orchestration API client
//!
//! A generic authenticated JSON client: `POST /login` for a bearer token,
//! then `GET /api/v1/labs[/{lab}]` for workload listings. No retry or
//! backoff; any failure is terminal for the invocation.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ApiError;
use crate::model::Device;

/// Port the Containerlab API listens on
pub const API_PORT: u16 = 8080;

/// Environment variable consulted for the API password when no explicit
/// flag is given (exported in the shell or via a local `.env` file)
pub const PASSWORD_ENV_VAR: &str = "CLABPASS";

/// Blocking client bound to one Containerlab host
pub struct ApiClient {
    http: reqwest::blocking::Client,
    host: String,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl ApiClient {
    pub fn new(host: &str) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            host: host.to_string(),
            base_url: format!("http://{host}:{API_PORT}"),
            token: None,
        }
    }

    /// Authenticate and store the bearer token for subsequent requests
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        tracing::info!(host = %self.host, "authenticating to the Containerlab API");
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::Authentication {
                host: self.host.clone(),
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let login: LoginResponse = response.json()?;
        self.token = Some(login.token);
        Ok(())
    }

    /// Retrieve workloads for every lab on the host
    pub fn all_labs(&self) -> Result<IndexMap<String, Vec<Device>>, ApiError> {
        self.get_json("/api/v1/labs", None)
    }

    /// Retrieve workloads for one named lab
    pub fn lab_nodes(&self, lab: &str) -> Result<Vec<Device>, ApiError> {
        self.get_json(&format!("/api/v1/labs/{lab}"), Some(lab))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, lab: Option<&str>) -> Result<T, ApiError> {
        let mut request = self.http.get(format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::Request {
                host: self.host.clone(),
                lab: lab.map(str::to_string),
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }
        Ok(response.json()?)
    }
}

/// Pull the server-provided `error` field out of a JSON error body, falling
/// back to the raw text when the body is not JSON or lacks the field
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Resolve the API password from its sources, strictly in order: explicit
/// flag, then the CLABPASS variable (shell environment or `.env` file),
/// then an interactive prompt. First non-empty value wins.
pub fn resolve_password(explicit: Option<&str>) -> Result<String, ApiError> {
    if let Some(password) = explicit {
        if !password.is_empty() {
            return Ok(password.to_string());
        }
    }

    dotenvy::dotenv().ok();
    if let Ok(password) = std::env::var(PASSWORD_ENV_VAR) {
        if !password.is_empty() {
            tracing::info!("password retrieved via environment variable");
            return Ok(password);
        }
    }

    rpassword::prompt_password("Enter your Containerlab host password: ").map_err(ApiError::Prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_field_from_json_body() {
        let body = r#"{"error": "invalid credentials"}"#;
        assert_eq!(extract_error_message(body), "invalid credentials");
    }

    #[test]
    fn test_extract_falls_back_to_raw_text() {
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
        // JSON without an error field also falls back to the raw body
        let body = r#"{"message": "nope"}"#;
        assert_eq!(extract_error_message(body), body);
    }

    #[test]
    fn test_explicit_password_wins() {
        let password = resolve_password(Some("from-flag")).unwrap();
        assert_eq!(password, "from-flag");
    }

    #[test]
    fn test_request_error_names_the_lab_when_scoped() {
        let scoped = ApiError::Request {
            host: "clab.example.net".to_string(),
            lab: Some("lab1".to_string()),
            status: 404,
            message: "lab not found".to_string(),
        };
        assert_eq!(
            scoped.to_string(),
            "error retrieving lab nodes for lab lab1, host: clab.example.net, \
             status code: 404, error: lab not found"
        );

        let unscoped = ApiError::Request {
            host: "clab.example.net".to_string(),
            lab: None,
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert!(!unscoped.to_string().contains("for lab"));
    }

    #[test]
    fn test_base_url_uses_api_port() {
        let client = ApiClient::new("clab.example.net");
        assert_eq!(client.base_url, "http://clab.example.net:8080");
    }
}
