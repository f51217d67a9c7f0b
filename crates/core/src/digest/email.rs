use crate::config::Settings;
use crate::digest::RenderedDigest;
use crate::error::DispatchError;
use crate::portfolio::looks_like_email;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.resend.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_API_KEY_LEN: usize = 10;

#[async_trait::async_trait]
pub trait DigestDispatcher: Send + Sync {
    /// Sends once; returns the provider's message id.
    async fn send(&self, to: &str, digest: &RenderedDigest) -> Result<String, DispatchError>;
}

#[derive(Debug, Clone)]
pub struct ResendClient {
    http: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl ResendClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_resend_api_key()?.to_string();
        let from = settings.require_from_email()?.to_string();
        let base_url = std::env::var("RESEND_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build email http client")?;

        let client = Self {
            http,
            api_key,
            from,
            base_url,
        };
        client.validate()?;
        Ok(client)
    }

    /// Cheap sanity check run before anything is sent.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.api_key.len() < MIN_API_KEY_LEN {
            return Err(DispatchError::Config("RESEND_API_KEY looks truncated".to_string()));
        }
        // Accept "Name <addr@host>" as well as a bare address.
        let addr = self
            .from
            .rsplit_once('<')
            .map(|(_, rest)| rest.trim_end_matches('>'))
            .unwrap_or(&self.from);
        if !looks_like_email(addr.trim()) {
            return Err(DispatchError::Config(format!(
                "FROM_EMAIL is not an email address: {}",
                self.from
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DigestDispatcher for ResendClient {
    async fn send(&self, to: &str, digest: &RenderedDigest) -> Result<String, DispatchError> {
        tracing::info!(%to, subject = %digest.subject, "sending email");

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| DispatchError::Config(e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let body = SendEmailRequest {
            from: &self.from,
            to: vec![to],
            subject: &digest.subject,
            html: &digest.html,
            text: Some(digest.text.as_str()).filter(|t| !t.is_empty()),
        };

        let url = format!("{}/emails", self.base_url.trim_end_matches('/'));
        let res = self.http.post(url).headers(headers).json(&body).send().await?;

        let status = res.status();
        let text = res.text().await?;
        let id = message_id_from_response(status, text)?;
        tracing::info!(%id, "email accepted");
        Ok(id)
    }
}

/// A 2xx carrying an `id` is success; anything else is a `DispatchError`.
fn message_id_from_response(status: StatusCode, text: String) -> Result<String, DispatchError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or(text);
        return Err(DispatchError::Rejected { status, message });
    }

    serde_json::from_str::<SendEmailResponse>(&text)
        .ok()
        .and_then(|r| r.id)
        .filter(|id| !id.trim().is_empty())
        .ok_or(DispatchError::MissingId(text))
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}
