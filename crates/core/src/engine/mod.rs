pub mod narrative;

use crate::domain::quote::PriceSnapshot;
use crate::domain::recommendation::{Action, Outlook, PortfolioSummary, StockRecommendation};
use crate::domain::sentiment::SentimentResult;
use crate::error::EngineError;
use chrono::{DateTime, Utc};

const SCORE_SCALE: f64 = 1e9;

/// Knobs of the scoring rule. Defaults are the production constants.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    /// Daily moves beyond +/- this many percent count as a full-strength price signal.
    pub price_clamp_pct: f64,
    pub price_weight: f64,
    pub sentiment_weight: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            price_clamp_pct: 10.0,
            price_weight: 0.5,
            sentiment_weight: 0.5,
            buy_threshold: 0.3,
            sell_threshold: -0.3,
        }
    }
}

impl ScoringPolicy {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Some(v) = env_f64("SCORING_PRICE_CLAMP_PCT").filter(|v| *v > 0.0) {
            out.price_clamp_pct = v;
        }
        if let Some(v) = env_f64("SCORING_PRICE_WEIGHT") {
            out.price_weight = v;
        }
        if let Some(v) = env_f64("SCORING_SENTIMENT_WEIGHT") {
            out.sentiment_weight = v;
        }
        if let Some(v) = env_f64("SCORING_BUY_THRESHOLD") {
            out.buy_threshold = v;
        }
        if let Some(v) = env_f64("SCORING_SELL_THRESHOLD") {
            out.sell_threshold = v;
        }

        out
    }

    pub fn price_signal(&self, percent_change: f64) -> f64 {
        let cap = self.price_clamp_pct;
        percent_change.clamp(-cap, cap) / cap
    }

    /// Snapped to 1e-9 so inputs that sit exactly on a threshold band as such.
    pub fn composite(&self, percent_change: f64, sentiment_score: f64) -> f64 {
        snap(
            self.price_weight * self.price_signal(percent_change)
                + self.sentiment_weight * sentiment_score,
        )
    }

    pub fn band(&self, score: f64) -> Action {
        if score >= self.buy_threshold {
            Action::Buy
        } else if score <= self.sell_threshold {
            Action::Sell
        } else {
            Action::Hold
        }
    }

    pub fn score_stock(
        &self,
        price: PriceSnapshot,
        sentiment: SentimentResult,
        weight: f64,
    ) -> StockRecommendation {
        let composite_score = self.composite(price.percent_change, sentiment.score);
        StockRecommendation {
            symbol: price.symbol.clone(),
            action: self.band(composite_score),
            composite_score,
            price,
            sentiment,
            weight,
        }
    }

    pub fn aggregate_at(
        &self,
        recommendations: Vec<StockRecommendation>,
        generated_at: DateTime<Utc>,
    ) -> Result<PortfolioSummary, EngineError> {
        if recommendations.is_empty() {
            return Err(EngineError::EmptyPortfolio);
        }

        let total_weight: f64 = recommendations.iter().map(|r| r.weight).sum();
        let weighted: f64 = recommendations
            .iter()
            .map(|r| r.weight * r.composite_score)
            .sum();
        // A single holding is its own average whatever its weight; guard the degenerate sum.
        let overall_score = snap(if total_weight > 0.0 {
            weighted / total_weight
        } else {
            recommendations.iter().map(|r| r.composite_score).sum::<f64>()
                / recommendations.len() as f64
        });

        // Strict comparisons keep the first occurrence on ties.
        let mut best_index = 0;
        let mut worst_index = 0;
        for (i, r) in recommendations.iter().enumerate().skip(1) {
            if r.price.percent_change > recommendations[best_index].price.percent_change {
                best_index = i;
            }
            if r.price.percent_change < recommendations[worst_index].price.percent_change {
                worst_index = i;
            }
        }

        Ok(PortfolioSummary {
            overall_score,
            overall_label: Outlook::from_action(self.band(overall_score)),
            recommendations,
            best_index,
            worst_index,
            generated_at,
        })
    }
}

fn snap(v: f64) -> f64 {
    (v * SCORE_SCALE).round() / SCORE_SCALE
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub fn score_stock(
    price: PriceSnapshot,
    sentiment: SentimentResult,
    weight: f64,
) -> StockRecommendation {
    ScoringPolicy::default().score_stock(price, sentiment, weight)
}

pub fn aggregate(
    recommendations: Vec<StockRecommendation>,
) -> Result<PortfolioSummary, EngineError> {
    ScoringPolicy::default().aggregate_at(recommendations, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::MarketState;

    fn price(symbol: &str, percent_change: f64) -> PriceSnapshot {
        PriceSnapshot {
            symbol: symbol.to_string(),
            current_price: 100.0,
            previous_close: 100.0,
            percent_change,
            market_state: MarketState::Closed,
        }
    }

    fn sentiment(symbol: &str, score: f64) -> SentimentResult {
        SentimentResult {
            score,
            ..SentimentResult::neutral(symbol)
        }
    }

    fn rec(symbol: &str, percent_change: f64, composite_score: f64, weight: f64) -> StockRecommendation {
        StockRecommendation {
            symbol: symbol.to_string(),
            action: ScoringPolicy::default().band(composite_score),
            composite_score,
            price: price(symbol, percent_change),
            sentiment: SentimentResult::neutral(symbol),
            weight,
        }
    }

    #[test]
    fn score_stock_is_deterministic() {
        let a = score_stock(price("AAPL", 3.2), sentiment("AAPL", 0.4), 0.5);
        let b = score_stock(price("AAPL", 3.2), sentiment("AAPL", 0.4), 0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn banding_boundaries_are_inclusive_at_thresholds() {
        let p = ScoringPolicy::default();
        assert_eq!(p.band(0.3), Action::Buy);
        assert_eq!(p.band(-0.3), Action::Sell);
        assert_eq!(p.band(0.2999), Action::Hold);
        assert_eq!(p.band(-0.2999), Action::Hold);
    }

    #[test]
    fn two_decimal_inputs_on_a_threshold_are_not_held() {
        // -2.20% with +0.82 sentiment and -9.20% with +0.32 land exactly on +/-0.3.
        let buy = score_stock(price("X", -2.2), sentiment("X", 0.82), 1.0);
        assert_eq!(buy.composite_score, 0.3);
        assert_eq!(buy.action, Action::Buy);

        let sell = score_stock(price("Y", -9.2), sentiment("Y", 0.32), 1.0);
        assert_eq!(sell.composite_score, -0.3);
        assert_eq!(sell.action, Action::Sell);
    }

    #[test]
    fn every_exact_threshold_combination_bands_outside_hold() {
        // a/100 percent with b/100 sentiment scores exactly +/-0.3 when a + 10b = +/-600.
        for a in -1000i32..=1000 {
            for b in -100i32..=100 {
                let expected = match a + 10 * b {
                    600 => Action::Buy,
                    -600 => Action::Sell,
                    _ => continue,
                };
                let pct = f64::from(a) / 100.0;
                let score = f64::from(b) / 100.0;
                let r = score_stock(price("X", pct), sentiment("X", score), 1.0);
                assert_eq!(r.action, expected, "pct={pct} sentiment={score}");
            }
        }
    }

    #[test]
    fn price_signal_is_clamped() {
        let p = ScoringPolicy::default();
        assert_eq!(p.price_signal(50.0), 1.0);
        assert_eq!(p.price_signal(10.0), 1.0);
        assert_eq!(p.price_signal(-50.0), -1.0);
        assert_eq!(p.price_signal(-10.0), -1.0);
        assert!((p.price_signal(2.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn neutral_sentiment_still_recommends_on_price() {
        let r = score_stock(price("AMD", 8.0), SentimentResult::neutral("AMD"), 0.2);
        assert!((r.composite_score - 0.4).abs() < 1e-12);
        assert_eq!(r.action, Action::Buy);
    }

    #[test]
    fn single_holding_overall_equals_its_composite() {
        let s = aggregate(vec![rec("AAPL", 1.0, 0.42, 0.07)]).unwrap();
        assert!((s.overall_score - 0.42).abs() < 1e-12);
        assert_eq!(s.overall_label, Outlook::Bullish);
    }

    #[test]
    fn aggregate_rejects_empty() {
        assert!(matches!(aggregate(vec![]), Err(EngineError::EmptyPortfolio)));
    }

    #[test]
    fn opposite_scores_cancel() {
        let s = aggregate(vec![rec("A", 1.0, 1.0, 0.5), rec("B", -1.0, -1.0, 0.5)]).unwrap();
        assert!(s.overall_score.abs() < 1e-12);
        assert_eq!(s.overall_label, Outlook::Mixed);
        assert_eq!(s.overall_label.as_str(), "Mixed/Neutral");
    }

    #[test]
    fn weights_are_normalized() {
        // Weights summing to 0.5 still average correctly.
        let s = aggregate(vec![rec("A", 0.0, 0.6, 0.25), rec("B", 0.0, 0.0, 0.25)]).unwrap();
        assert!((s.overall_score - 0.3).abs() < 1e-12);
    }

    #[test]
    fn performer_ties_favor_configuration_order() {
        let s = aggregate(vec![
            rec("FIRST", 4.0, 0.1, 0.25),
            rec("SECOND", 4.0, 0.1, 0.25),
            rec("LOW", -2.0, 0.1, 0.25),
            rec("LOW2", -2.0, 0.1, 0.25),
        ])
        .unwrap();
        assert_eq!(s.best_performer().symbol, "FIRST");
        assert_eq!(s.worst_performer().symbol, "LOW");
    }

    #[test]
    fn recommendations_keep_input_order() {
        let s = aggregate(vec![rec("Z", 0.0, 0.0, 0.5), rec("A", 0.0, 0.0, 0.5)]).unwrap();
        let symbols: Vec<_> = s.recommendations.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, ["Z", "A"]);
    }

    #[test]
    fn two_stock_portfolio_scenario() {
        let aapl = score_stock(price("AAPL", 5.0), sentiment("AAPL", 0.6), 0.6);
        let tsla = score_stock(price("TSLA", -12.0), sentiment("TSLA", -0.8), 0.4);

        assert!((aapl.composite_score - 0.55).abs() < 1e-9);
        assert_eq!(aapl.action, Action::Buy);
        assert!((tsla.composite_score + 0.9).abs() < 1e-9);
        assert_eq!(tsla.action, Action::Sell);

        let s = aggregate(vec![aapl, tsla]).unwrap();
        assert!((s.overall_score + 0.03).abs() < 1e-9);
        assert_eq!(s.overall_label, Outlook::Mixed);
        assert_eq!(s.best_performer().symbol, "AAPL");
        assert_eq!(s.worst_performer().symbol, "TSLA");
    }

    #[test]
    fn custom_policy_shifts_thresholds() {
        let p = ScoringPolicy {
            buy_threshold: 0.5,
            ..ScoringPolicy::default()
        };
        let r = p.score_stock(price("X", 8.0), SentimentResult::neutral("X"), 1.0);
        assert_eq!(r.action, Action::Hold);
    }
}
