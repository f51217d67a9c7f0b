use chrono::{TimeZone, Utc};
use stockpulse_core::digest::render_digest;
use stockpulse_core::domain::quote::{MarketState, PriceSnapshot};
use stockpulse_core::domain::recommendation::{Action, Outlook};
use stockpulse_core::domain::sentiment::SentimentResult;
use stockpulse_core::engine::ScoringPolicy;
use stockpulse_core::error::{PriceFetchError, SentimentFetchError};
use stockpulse_core::llm::{json, SentimentProvider};
use stockpulse_core::market::QuoteProvider;
use stockpulse_core::pipeline::run_digest;
use stockpulse_core::portfolio::Portfolio;

struct CannedQuotes;

#[async_trait::async_trait]
impl QuoteProvider for CannedQuotes {
    fn provider_name(&self) -> &'static str {
        "canned"
    }

    async fn get_price(&self, symbol: &str) -> Result<PriceSnapshot, PriceFetchError> {
        let (current, previous) = match symbol {
            "AAPL" => (105.0, 100.0),
            "TSLA" => (176.0, 200.0),
            _ => {
                return Err(PriceFetchError::NoData {
                    symbol: symbol.to_string(),
                    detail: "delisted".to_string(),
                })
            }
        };
        Ok(PriceSnapshot::from_closes(
            symbol,
            current,
            previous,
            MarketState::Closed,
        ))
    }
}

/// Replays model-style replies through the real parser.
struct CannedModel;

#[async_trait::async_trait]
impl SentimentProvider for CannedModel {
    fn provider_name(&self) -> &'static str {
        "canned"
    }

    async fn get_sentiment(&self, symbol: &str) -> Result<SentimentResult, SentimentFetchError> {
        let reply = match symbol {
            "AAPL" => r#"```json
{"score": 0.6, "label": "bullish", "confidence": "high",
 "insights": ["Services revenue beat", "  "], "post_count": 140,
 "quote": "Adding more AAPL on this dip", "quote_author": "@longterm"}
```"#,
            "TSLA" => r#"Here you go: {"score": -0.8, "confidence": 0.9, "insights": ["Delivery miss"]}"#,
            _ => "no idea",
        };
        json::parse_sentiment(reply, symbol).map_err(|e| SentimentFetchError {
            symbol: symbol.to_string(),
            stage: "parse",
            detail: format!("{e:#}"),
            raw_output: Some(reply.to_string()),
        })
    }
}

#[tokio::test]
async fn portfolio_file_to_rendered_digest() {
    let portfolio = Portfolio::from_json(
        r#"{"stocks": [
            {"symbol": "aapl", "weight": 0.5},
            {"symbol": "TSLA", "weight": 0.3},
            {"symbol": "DEAD", "weight": 0.2}
        ]}"#,
    )
    .unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 21, 30, 0).unwrap();

    let report = run_digest(
        &portfolio.holdings,
        &CannedQuotes,
        &CannedModel,
        &ScoringPolicy::default(),
        now,
    )
    .await
    .unwrap();

    let summary = &report.summary;
    assert_eq!(report.failed_symbols(), ["DEAD"]);
    assert_eq!(summary.recommendations.len(), 2);

    let aapl = &summary.recommendations[0];
    assert_eq!(aapl.symbol, "AAPL");
    assert!((aapl.composite_score - 0.55).abs() < 1e-9);
    assert_eq!(aapl.action, Action::Buy);
    assert_eq!(aapl.sentiment.insights, ["Services revenue beat"]);

    let tsla = &summary.recommendations[1];
    assert!((tsla.composite_score + 0.9).abs() < 1e-9);
    assert_eq!(tsla.action, Action::Sell);

    // (0.5 * 0.55 + 0.3 * -0.9) / 0.8
    assert!((summary.overall_score - 0.00625).abs() < 1e-9);
    assert_eq!(summary.overall_label, Outlook::Mixed);
    assert_eq!(summary.best_performer().symbol, "AAPL");
    assert_eq!(summary.worst_performer().symbol, "TSLA");

    let digest = render_digest(summary, &report.failed_symbols()).unwrap();
    assert!(digest.subject.contains("2026-03-02"));
    assert!(digest.html.contains("AAPL"));
    assert!(digest.html.contains("TSLA"));
    assert!(digest.html.contains("DEAD"));
    assert!(digest.html.contains("@longterm"));
    assert!(digest.text.contains("TSLA: SELL"));
}
