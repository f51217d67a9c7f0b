use crate::config::Settings;
use crate::domain::sentiment::SentimentResult;
use crate::error::SentimentFetchError;
use crate::llm::json;
use crate::llm::SentimentProvider;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
const DEFAULT_MODEL: &str = "grok-4-fast";
const DEFAULT_MAX_TOKENS: u32 = 900;
const DEFAULT_TIMEOUT_SECS: u64 = 45;
const DEFAULT_LOOKBACK_HOURS: u32 = 24;
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct XaiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    lookback_hours: u32,
}

impl XaiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_xai_api_key()?.to_string();
        let base_url = settings
            .xai_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .xai_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("XAI_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let lookback_hours = std::env::var("XAI_LOOKBACK_HOURS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_LOOKBACK_HOURS);

        let timeout_secs = std::env::var("XAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
            lookback_hours,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt() -> String {
        [
            "You are a financial sentiment analyst with live access to X (Twitter) posts.",
            "Summarize recent social sentiment for the requested stock.",
            "Return ONLY a single JSON object. No markdown, no prose, no extra keys.",
            "Schema:",
            "{",
            "  \"score\": -1.0 to 1.0,",
            "  \"label\": \"very_bearish\" | \"bearish\" | \"neutral\" | \"bullish\" | \"very_bullish\",",
            "  \"confidence\": \"low\" | \"medium\" | \"high\",",
            "  \"insights\": [\"short insight\", ...],",
            "  \"post_count\": integer,",
            "  \"quote\": \"one representative post\" or null,",
            "  \"quote_author\": \"@handle\" or null",
            "}",
            "Rules:",
            "- score -1.0 is extremely negative, 0 neutral, 1.0 extremely positive",
            "- at most 3 insights, each under 20 words",
            "- confidence reflects how many relevant posts you found and how consistent they are",
        ]
        .join("\n")
    }

    fn user_prompt(&self, symbol: &str) -> String {
        let since = chrono::Utc::now() - chrono::Duration::hours(i64::from(self.lookback_hours));
        format!(
            "Analyze X sentiment for ${symbol} ({symbol}) from posts since {}.\n\
             Consider retail and institutional voices, recurring themes, breaking news and unusual activity.",
            since.format("%Y-%m-%d %H:%M UTC")
        )
    }

    async fn create_completion(
        &self,
        symbol: &str,
        req: &ChatRequest,
    ) -> Result<ChatResponse, SentimentFetchError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| stage_error(symbol, "auth", e.to_string(), None))?;
        headers.insert(AUTHORIZATION, bearer);

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .map_err(|e| stage_error(symbol, "http", e.to_string(), None))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| stage_error(symbol, "http", e.to_string(), None))?;
        decode_completion(symbol, &self.model, status, text)
    }
}

fn stage_error(
    symbol: &str,
    stage: &'static str,
    detail: String,
    raw: Option<String>,
) -> SentimentFetchError {
    SentimentFetchError {
        symbol: symbol.to_string(),
        stage,
        detail,
        raw_output: raw,
    }
}

/// Non-2xx or an undecodable body fails with the raw text attached.
fn decode_completion(
    symbol: &str,
    model: &str,
    status: StatusCode,
    text: String,
) -> Result<ChatResponse, SentimentFetchError> {
    if !status.is_success() {
        return Err(stage_error(
            symbol,
            "http",
            format!("status={status} model={model}"),
            Some(text),
        ));
    }

    serde_json::from_str::<ChatResponse>(&text)
        .map_err(|e| stage_error(symbol, "decode", e.to_string(), Some(text)))
}

/// Text of the first choice, and whether it was cut off at `max_tokens`.
fn reply_text(symbol: &str, res: ChatResponse) -> Result<(String, bool), SentimentFetchError> {
    let choice = res.choices.into_iter().next().ok_or_else(|| {
        stage_error(symbol, "decode", "no choices in response".to_string(), None)
    })?;

    let text = choice.message.text();
    if text.trim().is_empty() {
        return Err(stage_error(
            symbol,
            "decode",
            "empty message content".to_string(),
            None,
        ));
    }
    Ok((text, choice.finish_reason.as_deref() == Some("length")))
}

#[async_trait::async_trait]
impl SentimentProvider for XaiClient {
    fn provider_name(&self) -> &'static str {
        "xai"
    }

    async fn get_sentiment(&self, symbol: &str) -> Result<SentimentResult, SentimentFetchError> {
        tracing::debug!(%symbol, model = %self.model, "requesting sentiment");

        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: Self::system_prompt(),
                },
                Message {
                    role: "user",
                    content: self.user_prompt(symbol),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let res = self.create_completion(symbol, &req).await?;
        let (text, truncated) = reply_text(symbol, res)?;
        if truncated {
            tracing::warn!(%symbol, max_tokens = self.max_tokens, "sentiment reply hit max_tokens");
        }

        let result = json::parse_sentiment(&text, symbol)
            .map_err(|e| stage_error(symbol, "parse", format!("{e:#}"), Some(text)))?;

        tracing::info!(
            %symbol,
            score = result.score,
            label = result.label.as_str(),
            confidence = result.confidence.as_str(),
            "sentiment fetched"
        );
        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<MessageContent>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCall {
    #[serde(default)]
    function: Option<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    arguments: Option<String>,
}

impl ResponseMessage {
    /// Plain content, joined text parts, or the first tool call's arguments.
    fn text(&self) -> String {
        let content = match &self.content {
            Some(MessageContent::Text(s)) => s.clone(),
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter(|p| p.kind == "text")
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        };
        if !content.trim().is_empty() {
            return content;
        }

        self.tool_calls
            .iter()
            .filter_map(|c| c.function.as_ref()?.arguments.clone())
            .next()
            .unwrap_or_default()
    }
}
