use crate::domain::quote::PriceSnapshot;
use crate::domain::sentiment::SentimentResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

/// Portfolio-level reading of the overall score. Same bands as [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outlook {
    Bullish,
    Bearish,
    Mixed,
}

impl Outlook {
    pub fn from_action(action: Action) -> Self {
        match action {
            Action::Buy => Outlook::Bullish,
            Action::Sell => Outlook::Bearish,
            Action::Hold => Outlook::Mixed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outlook::Bullish => "Bullish",
            Outlook::Bearish => "Bearish",
            Outlook::Mixed => "Mixed/Neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecommendation {
    pub symbol: String,
    pub action: Action,
    pub composite_score: f64,
    pub price: PriceSnapshot,
    pub sentiment: SentimentResult,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub overall_score: f64,
    pub overall_label: Outlook,
    /// In configuration order.
    pub recommendations: Vec<StockRecommendation>,
    pub best_index: usize,
    pub worst_index: usize,
    pub generated_at: DateTime<Utc>,
}

impl PortfolioSummary {
    pub fn best_performer(&self) -> &StockRecommendation {
        &self.recommendations[self.best_index]
    }

    pub fn worst_performer(&self) -> &StockRecommendation {
        &self.recommendations[self.worst_index]
    }

    pub fn count(&self, action: Action) -> usize {
        self.recommendations
            .iter()
            .filter(|r| r.action == action)
            .count()
    }
}
