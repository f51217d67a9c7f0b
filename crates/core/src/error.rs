use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("portfolio configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read portfolio configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("portfolio configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("portfolio must contain at least one stock")]
    EmptyPortfolio,

    #[error("invalid ticker symbol {0:?}")]
    InvalidSymbol(String),

    #[error("weight for {symbol} must be in (0, 1] (got {weight})")]
    InvalidWeight { symbol: String, weight: f64 },

    #[error("portfolio weights must sum to 1.0 (got {0:.3})")]
    WeightSum(f64),

    #[error("portfolio contains duplicate symbol {0}")]
    DuplicateSymbol(String),

    #[error("invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("{0} is required")]
    MissingEnv(&'static str),
}

#[derive(Debug, Error)]
pub enum PriceFetchError {
    #[error("price request for {symbol} failed: {source}")]
    Http {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("price provider returned HTTP {status} for {symbol}: {body}")]
    Status {
        symbol: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("price response for {symbol} could not be decoded: {detail}")]
    Decode { symbol: String, detail: String },

    #[error("no usable price data for {symbol}: {detail}")]
    NoData { symbol: String, detail: String },
}

/// Sentiment lookup failure, with enough context to diagnose a bad model reply.
#[derive(Debug, Error)]
#[error("sentiment lookup for {symbol} failed (stage={stage}): {detail}")]
pub struct SentimentFetchError {
    pub symbol: String,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no holdings left to aggregate; every price lookup failed")]
    EmptyPortfolio,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("email configuration invalid: {0}")]
    Config(String),

    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider returned HTTP {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("email provider response had no message id: {0}")]
    MissingId(String),
}

#[derive(Debug, Error)]
#[error("failed to render digest template: {0}")]
pub struct RenderError(#[from] askama::Error);
