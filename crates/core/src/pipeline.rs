use crate::domain::recommendation::PortfolioSummary;
use crate::domain::sentiment::SentimentResult;
use crate::engine::ScoringPolicy;
use crate::error::EngineError;
use crate::llm::SentimentProvider;
use crate::market::QuoteProvider;
use crate::portfolio::Holding;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct FailedHolding {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: PortfolioSummary,
    /// Holdings dropped because no price could be fetched.
    pub failed: Vec<FailedHolding>,
    pub sentiment_fallbacks: usize,
}

impl RunReport {
    pub fn failed_symbols(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.symbol.clone()).collect()
    }
}

/// One sequential pass over the holdings: price, then sentiment, then score.
pub async fn run_digest(
    holdings: &[Holding],
    quotes: &dyn QuoteProvider,
    sentiment: &dyn SentimentProvider,
    policy: &ScoringPolicy,
    now: DateTime<Utc>,
) -> Result<RunReport, EngineError> {
    let total = holdings.len();
    let mut scored = Vec::with_capacity(total);
    let mut failed = Vec::new();
    let mut sentiment_fallbacks = 0;

    for (idx, holding) in holdings.iter().enumerate() {
        let symbol = holding.symbol.as_str();

        let price = match quotes.get_price(symbol).await {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(
                    %symbol,
                    provider = quotes.provider_name(),
                    error = %err,
                    "price lookup failed; dropping holding"
                );
                failed.push(FailedHolding {
                    symbol: symbol.to_string(),
                    error: err.to_string(),
                });
                continue;
            }
        };

        let sent = match sentiment.get_sentiment(symbol).await {
            Ok(s) => s,
            Err(err) => {
                sentiment_fallbacks += 1;
                tracing::warn!(
                    %symbol,
                    provider = sentiment.provider_name(),
                    stage = err.stage,
                    error = %err,
                    "sentiment lookup failed; using neutral sentiment"
                );
                if let Some(raw) = err.raw_output.as_deref() {
                    tracing::debug!(%symbol, raw, "raw sentiment output");
                }
                SentimentResult::neutral(symbol)
            }
        };

        let rec = policy.score_stock(price, sent, holding.weight);
        tracing::info!(
            %symbol,
            progress = %format_args!("{}/{}", idx + 1, total),
            action = rec.action.as_str(),
            composite = rec.composite_score,
            "scored holding"
        );
        scored.push(rec);
    }

    if !failed.is_empty() {
        tracing::warn!(
            failed = failed.len(),
            total,
            symbols = %failed.iter().map(|f| f.symbol.as_str()).collect::<Vec<_>>().join(","),
            "some holdings had no price data"
        );
    }

    let summary = policy.aggregate_at(scored, now)?;
    Ok(RunReport {
        summary,
        failed,
        sentiment_fallbacks,
    })
}
