use crate::domain::quote::{MarketState, PriceSnapshot};
use crate::error::PriceFetchError;
use crate::market::types::{ChartEnvelope, TradingPeriods};
use crate::market::QuoteProvider;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
// The chart endpoint rejects requests without a browser-ish agent.
const AGENT: &str = "Mozilla/5.0 (compatible; stockpulse/0.1)";

#[derive(Debug, Clone)]
pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("QUOTE_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("QUOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, Duration::from_secs(timeout_secs))
    }

    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build quote http client")?;

        Ok(Self { http, base_url })
    }

    fn url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            symbol
        )
    }
}

#[async_trait::async_trait]
impl QuoteProvider for YahooChartClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn get_price(&self, symbol: &str) -> Result<PriceSnapshot, PriceFetchError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        tracing::debug!(%symbol, "fetching price");

        let res = self
            .http
            .get(self.url(&symbol))
            .query(&[("range", "5d"), ("interval", "1d")])
            .send()
            .await
            .map_err(|source| PriceFetchError::Http {
                symbol: symbol.clone(),
                source,
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|source| PriceFetchError::Http {
            symbol: symbol.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(PriceFetchError::Status {
                symbol,
                status,
                body: truncate(&text, 300),
            });
        }

        let envelope =
            serde_json::from_str::<ChartEnvelope>(&text).map_err(|e| PriceFetchError::Decode {
                symbol: symbol.clone(),
                detail: e.to_string(),
            })?;

        let snapshot = snapshot_from_chart(&symbol, envelope, chrono::Utc::now().timestamp())?;
        tracing::info!(
            %symbol,
            price = snapshot.current_price,
            percent_change = snapshot.percent_change,
            market_state = snapshot.market_state.as_str(),
            "price fetched"
        );
        Ok(snapshot)
    }
}

pub fn snapshot_from_chart(
    symbol: &str,
    envelope: ChartEnvelope,
    now_ts: i64,
) -> Result<PriceSnapshot, PriceFetchError> {
    let no_data = |detail: String| PriceFetchError::NoData {
        symbol: symbol.to_string(),
        detail,
    };

    if let Some(err) = envelope.chart.error {
        return Err(no_data(format!(
            "{}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        )));
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| no_data("empty chart result".to_string()))?;

    let closes: Vec<f64> = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .map(|q| {
            q.close
                .into_iter()
                .flatten()
                .filter(|c| c.is_finite() && *c > 0.0)
                .collect()
        })
        .unwrap_or_default();

    let (current, previous) = match closes.as_slice() {
        [.., prev, last] => (*last, Some(*prev)),
        [last] => (*last, None),
        [] => match result.meta.regular_market_price {
            Some(p) if p > 0.0 => (p, None),
            _ => return Err(no_data("no closes and no regular market price".to_string())),
        },
    };
    let previous = previous
        .or(result.meta.chart_previous_close)
        .unwrap_or(current);

    let market_state = result
        .meta
        .current_trading_period
        .as_ref()
        .map(|p| market_state_at(p, now_ts))
        .unwrap_or(MarketState::Closed);

    Ok(PriceSnapshot::from_closes(
        symbol,
        current,
        previous,
        market_state,
    ))
}

pub fn market_state_at(periods: &TradingPeriods, now_ts: i64) -> MarketState {
    if periods.regular.contains(now_ts) {
        MarketState::Regular
    } else if periods.pre.contains(now_ts) {
        MarketState::Pre
    } else if periods.post.contains(now_ts) {
        MarketState::Post
    } else {
        MarketState::Closed
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRE_START: i64 = 1_767_603_600;

    fn envelope(v: serde_json::Value) -> ChartEnvelope {
        serde_json::from_value(v).unwrap()
    }

    fn periods() -> serde_json::Value {
        json!({
            "pre": {"start": PRE_START, "end": PRE_START + 19_800},
            "regular": {"start": PRE_START + 19_800, "end": PRE_START + 43_200},
            "post": {"start": PRE_START + 43_200, "end": PRE_START + 57_600},
        })
    }

    #[test]
    fn uses_last_two_closes() {
        let env = envelope(json!({"chart": {"result": [{
            "meta": {"regularMarketPrice": 111.0, "chartPreviousClose": 90.0, "currentTradingPeriod": periods()},
            "timestamp": [1, 2, 3],
            "indicators": {"quote": [{"close": [98.0, 100.0, 105.0]}]},
        }], "error": null}}));

        let p = snapshot_from_chart("AAPL", env, PRE_START + 20_000).unwrap();
        assert_eq!(p.current_price, 105.0);
        assert_eq!(p.previous_close, 100.0);
        assert_eq!(p.percent_change, 5.0);
        assert_eq!(p.market_state, MarketState::Regular);
    }

    #[test]
    fn skips_null_closes() {
        let env = envelope(json!({"chart": {"result": [{
            "meta": {},
            "indicators": {"quote": [{"close": [50.0, null, 40.0, null]}]},
        }]}}));
        let p = snapshot_from_chart("X", env, 0).unwrap();
        assert_eq!(p.current_price, 40.0);
        assert_eq!(p.previous_close, 50.0);
        assert_eq!(p.percent_change, -20.0);
        assert_eq!(p.market_state, MarketState::Closed);
    }

    #[test]
    fn falls_back_to_meta_prices() {
        let env = envelope(json!({"chart": {"result": [{
            "meta": {"regularMarketPrice": 22.0, "chartPreviousClose": 20.0},
            "indicators": {"quote": [{"close": []}]},
        }]}}));
        let p = snapshot_from_chart("X", env, 0).unwrap();
        assert_eq!(p.current_price, 22.0);
        assert_eq!(p.percent_change, 10.0);
    }

    #[test]
    fn chart_error_is_no_data() {
        let env = envelope(json!({"chart": {"result": null, "error": {
            "code": "Not Found", "description": "No data found, symbol may be delisted"
        }}}));
        let err = snapshot_from_chart("ZZZZ", env, 0).unwrap_err();
        assert!(matches!(err, PriceFetchError::NoData { .. }));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn missing_prices_is_no_data() {
        let env = envelope(json!({"chart": {"result": [{"meta": {}}]}}));
        assert!(snapshot_from_chart("X", env, 0).is_err());
    }

    #[test]
    fn market_state_windows() {
        let p: TradingPeriods = serde_json::from_value(periods()).unwrap();
        assert_eq!(market_state_at(&p, PRE_START - 1), MarketState::Closed);
        assert_eq!(market_state_at(&p, PRE_START), MarketState::Pre);
        assert_eq!(market_state_at(&p, PRE_START + 19_800), MarketState::Regular);
        assert_eq!(market_state_at(&p, PRE_START + 43_200), MarketState::Post);
        assert_eq!(market_state_at(&p, PRE_START + 57_600), MarketState::Closed);
    }

    #[test]
    fn truncates_long_bodies() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
