use super::{BamApi, Method, Params};
use crate::config::BamConfig;
use crate::error::{BamError, ConfigError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

const TOKEN_MARKER: &str = "BAMAuthToken:";

/// Authenticated REST session against Address Manager
pub struct BamClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
    retries: u32,
}

impl BamClient {
    /// Validate the configuration, open a session and keep its token
    pub async fn login(config: &BamConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url().ok_or(ConfigError::Missing("server"))?;
        let username = config.username.as_deref().unwrap_or_default();
        let password = config.password.as_deref().unwrap_or_default();

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(concat!("bamctl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let params = Params::new()
            .set("username", username)
            .set("password", password);
        debug!("login {}", params);

        let response = http
            .get(format!("{}login", base_url))
            .query(params.as_slice())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BamError::Auth(error_message(status, &body)));
        }

        let token = parse_token(&body).ok_or_else(|| {
            BamError::Auth(format!("no session token in login response: {}", body.trim()))
        })?;
        info!("Logged in to {} as {}", base_url, username);

        Ok(Self {
            http,
            base_url,
            auth_header: format!("{} {}", TOKEN_MARKER, token),
            retries: config.retries,
        })
    }

    /// End the session
    pub async fn logout(&self) -> Result<()> {
        let reply = self.send("logout", Method::Get, &Params::new()).await?;
        debug!("logout: {}", reply);
        Ok(())
    }

    async fn send(&self, operation: &str, method: Method, params: &Params) -> Result<Value> {
        let url = format!("{}{}", self.base_url, operation);
        let request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        };

        let response = request
            .header(AUTHORIZATION, &self.auth_header)
            .query(params.as_slice())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(BamError::Auth(error_message(status, &body)));
        }
        if !status.is_success() {
            return Err(BamError::api(operation, error_message(status, &body)));
        }

        parse_body(operation, &body)
    }
}

#[async_trait]
impl BamApi for BamClient {
    async fn invoke(&self, operation: &str, params: &Params) -> Result<Value> {
        let method = Method::for_operation(operation);
        debug!("{:?} {} {}", method, operation, params);

        if self.retries == 0 || !method.is_idempotent() {
            return self.send(operation, method, params).await;
        }

        let strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.retries as usize);

        RetryIf::start(
            strategy,
            || self.send(operation, method, params),
            |err: &BamError| {
                let retry = matches!(err, BamError::Transport(_));
                if retry {
                    warn!("{} failed, retrying: {}", operation, err);
                }
                retry
            },
        )
        .await
    }
}

/// Pull the token out of `"Session Token-> BAMAuthToken: <token> <- for User : <user>"`
fn parse_token(body: &str) -> Option<String> {
    let body = body.trim().trim_matches('"');
    let start = body.find(TOKEN_MARKER)? + TOKEN_MARKER.len();
    let token = body[start..].split("<-").next()?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Decode a response body; an empty body is `null`
fn parse_body(operation: &str, body: &str) -> Result<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|e| BamError::invalid_response(operation, e.to_string()))
}

fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim().trim_matches('"');
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        let body = "\"Session Token-> BAMAuthToken: aGVsbG8+ <- for User : api\"";
        assert_eq!(parse_token(body).as_deref(), Some("aGVsbG8+"));
        assert_eq!(parse_token("\"Invalid username or password\""), None);
        assert_eq!(parse_token("BAMAuthToken:  <- for User : api"), None);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body("delete", "").unwrap(), Value::Null);
        assert_eq!(parse_body("delete", "  \n").unwrap(), Value::Null);
        assert_eq!(parse_body("addDHCPDeploymentRole", "1234").unwrap(), Value::from(1234));
        assert!(parse_body("getEntityById", "<html>").is_err());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, "\"Object not found\""),
            "400 Bad Request: Object not found"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "502 Bad Gateway");
    }
}
