use std::time::Duration;

use actix_web::client::Client;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

const JDOODLE_URL: &str = "https://api.jdoodle.com/v1/execute";
const JUDGE0_URL: &str = "https://ce.judge0.com/submissions/?base64_encoded=false&wait=true";

/// Backend credentials and the outbound request bound, read once at
/// startup. Missing credentials are not a startup error; the affected
/// backend fails at request time instead.
#[derive(Clone)]
pub struct GatewayConfig {
    pub jdoodle_client_id: Option<String>,
    pub jdoodle_client_secret: Option<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            jdoodle_client_id: std::env::var("JDOODLE_CLIENTID").ok(),
            jdoodle_client_secret: std::env::var("JDOODLE_CLIENTSECRET").ok(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn has_jdoodle_credentials(&self) -> bool {
        self.jdoodle_client_id.is_some() && self.jdoodle_client_secret.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSelector {
    Jdoodle,
    Judge0,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub source_text: String,
    pub language_tag: String,
    pub backend_selector: BackendSelector,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub output: String,
    pub status: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("language `{language}` is not supported by the {backend} backend")]
    UnsupportedLanguage {
        language: String,
        backend: &'static str,
    },
    #[error("JDoodle credentials are not configured")]
    MissingCredentials,
    #[error("failed to reach the {backend} backend: {reason}")]
    BackendUnreachable {
        backend: &'static str,
        reason: String,
    },
    #[error("the {backend} backend reported an error: {reason}")]
    BackendFailure {
        backend: &'static str,
        reason: String,
    },
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnsupportedLanguage { .. } => StatusCode::BAD_REQUEST,
            GatewayError::MissingCredentials => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::BackendFailure { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

// Each backend speaks its own language-identifier dialect.
fn jdoodle_version_index(language: &str) -> Option<&'static str> {
    match language {
        "python3" => Some("3"),
        "java" => Some("3"),
        "cpp14" => Some("4"),
        "cpp17" => Some("5"),
        "c" => Some("4"),
        _ => None,
    }
}

fn judge0_language_id(language: &str) -> Option<u32> {
    match language {
        "python3" => Some(71),
        "java" => Some(62),
        "cpp" => Some(54),
        "cpp14" => Some(52),
        "cpp17" => Some(54),
        "c" => Some(50),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JdoodleResponse {
    output: Option<String>,
    status_code: Option<i64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Judge0Response {
    stdout: Option<String>,
    stderr: Option<String>,
    status: Judge0Status,
}

#[derive(Debug, Deserialize)]
struct Judge0Status {
    description: String,
}

/// Forwards the request verbatim to the selected backend and relays its
/// response or failure. No sandboxing or resource limiting happens here.
pub async fn execute(
    config: &GatewayConfig,
    request: &ExecuteRequest,
) -> Result<ExecuteResponse, GatewayError> {
    match request.backend_selector {
        BackendSelector::Jdoodle => execute_jdoodle(config, request).await,
        BackendSelector::Judge0 => execute_judge0(config, request).await,
    }
}

fn http_client(config: &GatewayConfig) -> Client {
    Client::builder().timeout(config.timeout).finish()
}

async fn execute_jdoodle(
    config: &GatewayConfig,
    request: &ExecuteRequest,
) -> Result<ExecuteResponse, GatewayError> {
    let version_index = jdoodle_version_index(&request.language_tag).ok_or_else(|| {
        GatewayError::UnsupportedLanguage {
            language: request.language_tag.clone(),
            backend: "jdoodle",
        }
    })?;
    let (client_id, client_secret) = match (
        config.jdoodle_client_id.as_ref(),
        config.jdoodle_client_secret.as_ref(),
    ) {
        (Some(id), Some(secret)) => (id, secret),
        _ => return Err(GatewayError::MissingCredentials),
    };

    let body = json!({
        "script": request.source_text,
        "language": request.language_tag,
        "versionIndex": version_index,
        "clientId": client_id,
        "clientSecret": client_secret,
    });

    let mut response = http_client(config)
        .post(JDOODLE_URL)
        .send_json(&body)
        .await
        .map_err(|e| GatewayError::BackendUnreachable {
            backend: "jdoodle",
            reason: e.to_string(),
        })?;
    let payload: JdoodleResponse =
        response
            .json()
            .await
            .map_err(|e| GatewayError::BackendFailure {
                backend: "jdoodle",
                reason: e.to_string(),
            })?;

    if let Some(error) = payload.error {
        return Err(GatewayError::BackendFailure {
            backend: "jdoodle",
            reason: error,
        });
    }
    Ok(ExecuteResponse {
        output: payload.output.unwrap_or_default(),
        status: payload
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

async fn execute_judge0(
    config: &GatewayConfig,
    request: &ExecuteRequest,
) -> Result<ExecuteResponse, GatewayError> {
    let language_id = judge0_language_id(&request.language_tag).ok_or_else(|| {
        GatewayError::UnsupportedLanguage {
            language: request.language_tag.clone(),
            backend: "judge0",
        }
    })?;

    let body = json!({
        "source_code": request.source_text,
        "language_id": language_id,
        "stdin": "",
    });

    let mut response = http_client(config)
        .post(JUDGE0_URL)
        .send_json(&body)
        .await
        .map_err(|e| GatewayError::BackendUnreachable {
            backend: "judge0",
            reason: e.to_string(),
        })?;
    let payload: Judge0Response =
        response
            .json()
            .await
            .map_err(|e| GatewayError::BackendFailure {
                backend: "judge0",
                reason: e.to_string(),
            })?;

    Ok(ExecuteResponse {
        output: payload.stdout.or(payload.stderr).unwrap_or_default(),
        status: payload.status.description,
    })
}
