use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    Pre,
    Regular,
    Post,
    Closed,
}

impl MarketState {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketState::Pre => "pre-market",
            MarketState::Regular => "open",
            MarketState::Post => "after-hours",
            MarketState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub previous_close: f64,
    /// Day-over-day change in percent (5.0 means +5%).
    pub percent_change: f64,
    pub market_state: MarketState,
}

impl PriceSnapshot {
    /// Builds a snapshot from two closes, rounding like a quote screen (2 decimals).
    pub fn from_closes(
        symbol: impl Into<String>,
        current_price: f64,
        previous_close: f64,
        market_state: MarketState,
    ) -> Self {
        let percent_change = if previous_close > 0.0 {
            (current_price - previous_close) / previous_close * 100.0
        } else {
            0.0
        };

        Self {
            symbol: symbol.into(),
            current_price: round2(current_price),
            previous_close: round2(previous_close),
            percent_change: round2(percent_change),
            market_state,
        }
    }

    pub fn change(&self) -> f64 {
        round2(self.current_price - self.previous_close)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
