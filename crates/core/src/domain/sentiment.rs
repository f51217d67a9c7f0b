use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    VeryBearish,
    Bearish,
    Neutral,
    Bullish,
    VeryBullish,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.6 {
            SentimentLabel::VeryBullish
        } else if score >= 0.2 {
            SentimentLabel::Bullish
        } else if score <= -0.6 {
            SentimentLabel::VeryBearish
        } else if score <= -0.2 {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Lenient parse for model output ("Very Bullish", "very-bullish", ...).
    pub fn parse(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match norm.as_str() {
            "very_bearish" => Some(SentimentLabel::VeryBearish),
            "bearish" => Some(SentimentLabel::Bearish),
            "neutral" => Some(SentimentLabel::Neutral),
            "bullish" => Some(SentimentLabel::Bullish),
            "very_bullish" => Some(SentimentLabel::VeryBullish),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::VeryBearish => "very bearish",
            SentimentLabel::Bearish => "bearish",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Bullish => "bullish",
            SentimentLabel::VeryBullish => "very bullish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Confidence::Low),
            "medium" | "moderate" => Some(Confidence::Medium),
            "high" => Some(Confidence::High),
            _ => None,
        }
    }

    /// Bands a numeric confidence in [0, 1].
    pub fn from_ratio(v: f64) -> Self {
        if v >= 0.7 {
            Confidence::High
        } else if v >= 0.4 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub symbol: String,
    /// Polarity in [-1, 1].
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: Confidence,
    pub insights: Vec<String>,
    pub post_count: u32,
    pub quote: Option<String>,
    pub quote_author: Option<String>,
}

impl SentimentResult {
    /// Stand-in used when the sentiment lookup fails: it must not move the composite score.
    pub fn neutral(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            score: 0.0,
            label: SentimentLabel::Neutral,
            confidence: Confidence::Low,
            insights: Vec::new(),
            post_count: 0,
            quote: None,
            quote_author: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_bands_from_score() {
        assert_eq!(SentimentLabel::from_score(0.6), SentimentLabel::VeryBullish);
        assert_eq!(SentimentLabel::from_score(0.2), SentimentLabel::Bullish);
        assert_eq!(SentimentLabel::from_score(0.19), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.2), SentimentLabel::Bearish);
        assert_eq!(SentimentLabel::from_score(-0.9), SentimentLabel::VeryBearish);
    }

    #[test]
    fn label_parse_is_lenient() {
        assert_eq!(SentimentLabel::parse("Very Bullish"), Some(SentimentLabel::VeryBullish));
        assert_eq!(SentimentLabel::parse("very-bearish"), Some(SentimentLabel::VeryBearish));
        assert_eq!(SentimentLabel::parse(" NEUTRAL "), Some(SentimentLabel::Neutral));
        assert_eq!(SentimentLabel::parse("BUY"), None);
    }

    #[test]
    fn confidence_from_ratio() {
        assert_eq!(Confidence::from_ratio(0.85), Confidence::High);
        assert_eq!(Confidence::from_ratio(0.4), Confidence::Medium);
        assert_eq!(Confidence::from_ratio(0.1), Confidence::Low);
    }

    #[test]
    fn neutral_default_has_low_confidence_and_no_insights() {
        let s = SentimentResult::neutral("TSLA");
        assert_eq!(s.score, 0.0);
        assert_eq!(s.confidence, Confidence::Low);
        assert!(s.insights.is_empty());
        assert_eq!(s.post_count, 0);
    }
}
