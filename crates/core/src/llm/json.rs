use crate::domain::contract::LlmSentimentReport;
use crate::domain::sentiment::SentimentResult;
use anyhow::Context;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Strip a ```json ... ``` fence.
        let mut inner = trimmed;
        if let Some(after_first) = inner.split_once('\n').map(|(_, rest)| rest) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Prose around the object: take first '{' through last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_sentiment(text: &str, symbol: &str) -> anyhow::Result<SentimentResult> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<LlmSentimentReport>(&json_str)
        .with_context(|| format!("model output is not a valid sentiment report: {json_str}"))?;
    parsed.validate_and_into_result(symbol)
}
