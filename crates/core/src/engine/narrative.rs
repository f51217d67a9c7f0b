//! Human-readable text derived from scored holdings.

use crate::domain::recommendation::{Action, Outlook, PortfolioSummary, StockRecommendation};
use crate::domain::sentiment::Confidence;
use chrono::{DateTime, Utc};

pub fn reasoning(rec: &StockRecommendation) -> String {
    let pct = rec.price.percent_change;
    let price_clause = if pct > 2.0 {
        format!("Strong price performance ({pct:+.1}%)")
    } else if pct < -2.0 {
        format!("Poor price performance ({pct:+.1}%)")
    } else {
        format!("Modest price movement ({pct:+.1}%)")
    };

    let s = &rec.sentiment;
    let sentiment_clause = if s.confidence == Confidence::Low {
        "Low confidence sentiment data".to_string()
    } else if s.score > 0.3 {
        format!("Positive social sentiment ({:+.2})", s.score)
    } else if s.score < -0.3 {
        format!("Negative social sentiment ({:+.2})", s.score)
    } else {
        "Neutral social sentiment".to_string()
    };

    let suffix = match rec.action {
        Action::Buy => "Positive indicators suggest potential upside.",
        Action::Sell => "Negative indicators suggest caution.",
        Action::Hold => "Mixed signals warrant holding position.",
    };

    format!("{price_clause}; {sentiment_clause}. {suffix}")
}

pub fn market_summary(summary: &PortfolioSummary) -> String {
    let n = summary.recommendations.len() as f64;
    let avg_change = summary
        .recommendations
        .iter()
        .map(|r| r.price.percent_change)
        .sum::<f64>()
        / n;
    let avg_sentiment = summary
        .recommendations
        .iter()
        .map(|r| r.sentiment.score)
        .sum::<f64>()
        / n;

    let tone = if avg_change > 1.0 && avg_sentiment > 0.2 {
        "bullish"
    } else if avg_change < -1.0 && avg_sentiment < -0.2 {
        "bearish"
    } else {
        "mixed"
    };

    format!(
        "Market conditions appear {tone} for your portfolio. \
         Average price change: {avg_change:+.1}%, average sentiment: {avg_sentiment:+.2}"
    )
}

/// `failed` lists symbols dropped before scoring.
pub fn key_insights(summary: &PortfolioSummary, failed: &[String]) -> Vec<String> {
    let mut out = vec![format!(
        "Recommendations: {} BUY, {} HOLD, {} SELL",
        summary.count(Action::Buy),
        summary.count(Action::Hold),
        summary.count(Action::Sell),
    )];

    let best = summary.best_performer();
    let worst = summary.worst_performer();
    out.push(format!(
        "Top performer: {} ({:+.2}%, {})",
        best.symbol,
        best.price.percent_change,
        best.action.as_str()
    ));
    if summary.recommendations.len() > 1 {
        out.push(format!(
            "Underperformer: {} ({:+.2}%, {})",
            worst.symbol,
            worst.price.percent_change,
            worst.action.as_str()
        ));
    }

    let low = summary
        .recommendations
        .iter()
        .filter(|r| r.sentiment.confidence == Confidence::Low)
        .count();
    if low * 2 > summary.recommendations.len() {
        out.push("Low confidence in sentiment analysis suggests a cautious approach".to_string());
    }

    if !failed.is_empty() {
        out.push(format!("No price data for: {}", failed.join(", ")));
    }

    out
}

pub fn subject(overall_score: f64, outlook: Outlook, at: DateTime<Utc>) -> String {
    let emoji = match outlook {
        Outlook::Bullish => "📈",
        Outlook::Bearish => "📉",
        Outlook::Mixed => "📊",
    };
    format!(
        "{emoji} Portfolio Digest - {} (Score: {overall_score:+.3})",
        at.format("%Y-%m-%d")
    )
}
