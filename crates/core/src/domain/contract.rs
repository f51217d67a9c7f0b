use crate::domain::sentiment::{Confidence, SentimentLabel, SentimentResult};
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

const MAX_INSIGHTS: usize = 5;

/// JSON object the sentiment model is asked to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSentimentReport {
    pub score: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<LlmConfidence>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub post_count: Option<i64>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub quote_author: Option<String>,
}

/// Models answer either with a word or a 0..1 number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LlmConfidence {
    Level(String),
    Ratio(f64),
}

impl LlmSentimentReport {
    pub fn validate_and_into_result(self, symbol: &str) -> anyhow::Result<SentimentResult> {
        ensure!(
            self.score.is_finite(),
            "score must be a finite number (got {})",
            self.score
        );

        let score = if (-1.0..=1.0).contains(&self.score) {
            self.score
        } else {
            tracing::warn!(%symbol, score = self.score, "sentiment score out of range; clamping");
            self.score.clamp(-1.0, 1.0)
        };

        let label = self
            .label
            .as_deref()
            .and_then(SentimentLabel::parse)
            .unwrap_or_else(|| SentimentLabel::from_score(score));

        let confidence = match self.confidence {
            None => Confidence::Low,
            Some(LlmConfidence::Level(s)) => match Confidence::parse(&s) {
                Some(c) => c,
                None => bail!("unknown confidence level {s:?}"),
            },
            Some(LlmConfidence::Ratio(v)) => {
                ensure!(
                    (0.0..=1.0).contains(&v),
                    "confidence must be between 0 and 1 (got {v})"
                );
                Confidence::from_ratio(v)
            }
        };

        let post_count = match self.post_count {
            None => 0,
            Some(n) => {
                ensure!(n >= 0, "post_count must be non-negative (got {n})");
                u32::try_from(n).unwrap_or(u32::MAX)
            }
        };

        let insights = self
            .insights
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_INSIGHTS)
            .collect();

        let quote = non_blank(self.quote);
        let quote_author = quote.as_ref().and_then(|_| non_blank(self.quote_author));

        Ok(SentimentResult {
            symbol: symbol.to_string(),
            score,
            label,
            confidence,
            insights,
            post_count,
            quote,
            quote_author,
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(v: serde_json::Value) -> LlmSentimentReport {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn accepts_full_report() {
        let r = report(json!({
            "score": 0.45,
            "label": "bullish",
            "confidence": "high",
            "insights": ["Earnings beat", "  ", "New product launch"],
            "post_count": 120,
            "quote": "  To the moon  ",
            "quote_author": "@trader",
        }))
        .validate_and_into_result("NVDA")
        .unwrap();

        assert_eq!(r.symbol, "NVDA");
        assert_eq!(r.label, SentimentLabel::Bullish);
        assert_eq!(r.confidence, Confidence::High);
        assert_eq!(r.insights, vec!["Earnings beat", "New product launch"]);
        assert_eq!(r.post_count, 120);
        assert_eq!(r.quote.as_deref(), Some("To the moon"));
        assert_eq!(r.quote_author.as_deref(), Some("@trader"));
    }

    #[test]
    fn missing_optional_keys_fall_back() {
        let r = report(json!({"score": -0.7}))
            .validate_and_into_result("TSLA")
            .unwrap();
        assert_eq!(r.label, SentimentLabel::VeryBearish);
        assert_eq!(r.confidence, Confidence::Low);
        assert!(r.insights.is_empty());
        assert_eq!(r.quote, None);
    }

    #[test]
    fn numeric_confidence_is_banded() {
        let r = report(json!({"score": 0.0, "confidence": 0.55}))
            .validate_and_into_result("AAPL")
            .unwrap();
        assert_eq!(r.confidence, Confidence::Medium);
    }

    #[test]
    fn out_of_range_score_is_clamped() {
        let r = report(json!({"score": 1.8}))
            .validate_and_into_result("AMD")
            .unwrap();
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn rejects_negative_post_count() {
        let res = report(json!({"score": 0.1, "post_count": -3})).validate_and_into_result("AMD");
        assert!(res.is_err());
    }

    #[test]
    fn rejects_unknown_confidence_word() {
        let res =
            report(json!({"score": 0.1, "confidence": "certain"})).validate_and_into_result("AMD");
        assert!(res.is_err());
    }

    #[test]
    fn author_without_quote_is_dropped() {
        let r = report(json!({"score": 0.1, "quote": "", "quote_author": "@x"}))
            .validate_and_into_result("AMD")
            .unwrap();
        assert_eq!(r.quote, None);
        assert_eq!(r.quote_author, None);
    }

    #[test]
    fn caps_insight_count() {
        let r = report(json!({"score": 0.1, "insights": ["a", "b", "c", "d", "e", "f", "g"]}))
            .validate_and_into_result("AMD")
            .unwrap();
        assert_eq!(r.insights.len(), 5);
    }
}
