pub mod email;

use crate::domain::quote::PriceSnapshot;
use crate::domain::recommendation::{Action, Outlook, PortfolioSummary, StockRecommendation};
use crate::engine::narrative;
use crate::error::RenderError;
use askama::Template;

/// Display-ready strings for one holding.
#[derive(Debug, Clone)]
pub struct StockCard {
    pub symbol: String,
    pub action: &'static str,
    pub action_class: &'static str,
    pub price: String,
    pub change: String,
    pub change_class: &'static str,
    pub market_state: &'static str,
    pub weight: String,
    pub composite: String,
    pub sentiment_score: String,
    pub sentiment_label: &'static str,
    pub confidence: &'static str,
    pub post_count: u32,
    pub reasoning: String,
    pub insights: Vec<String>,
    pub has_quote: bool,
    pub quote: String,
    pub quote_author: String,
}

#[derive(Debug, Clone)]
pub struct DigestView {
    pub date: String,
    pub generated_at: String,
    pub overall_score: String,
    pub overall_label: &'static str,
    pub outlook_class: &'static str,
    pub market_summary: String,
    pub buy_count: usize,
    pub hold_count: usize,
    pub sell_count: usize,
    pub best: String,
    pub worst: String,
    pub stocks: Vec<StockCard>,
    pub insights: Vec<String>,
    pub failed: Vec<String>,
}

impl DigestView {
    pub fn build(summary: &PortfolioSummary, failed: &[String]) -> Self {
        let performer = |r: &StockRecommendation| {
            format!("{} ({})", r.symbol, signed_pct(r.price.percent_change))
        };

        Self {
            date: summary.generated_at.format("%Y-%m-%d").to_string(),
            generated_at: summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            overall_score: format!("{:+.3}", summary.overall_score),
            overall_label: summary.overall_label.as_str(),
            outlook_class: match summary.overall_label {
                Outlook::Bullish => "bullish",
                Outlook::Bearish => "bearish",
                Outlook::Mixed => "mixed",
            },
            market_summary: narrative::market_summary(summary),
            buy_count: summary.count(Action::Buy),
            hold_count: summary.count(Action::Hold),
            sell_count: summary.count(Action::Sell),
            best: performer(summary.best_performer()),
            worst: performer(summary.worst_performer()),
            stocks: summary.recommendations.iter().map(card).collect(),
            insights: narrative::key_insights(summary, failed),
            failed: failed.to_vec(),
        }
    }
}

fn card(r: &StockRecommendation) -> StockCard {
    let s = &r.sentiment;
    StockCard {
        symbol: r.symbol.clone(),
        action: r.action.as_str(),
        action_class: match r.action {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Hold => "hold",
        },
        price: format!("${:.2}", r.price.current_price),
        change: signed_pct(r.price.percent_change),
        change_class: change_class(&r.price),
        market_state: r.price.market_state.as_str(),
        weight: format!("{:.1}%", r.weight * 100.0),
        composite: format!("{:+.3}", r.composite_score),
        sentiment_score: format!("{:+.2}", s.score),
        sentiment_label: s.label.as_str(),
        confidence: s.confidence.as_str(),
        post_count: s.post_count,
        reasoning: narrative::reasoning(r),
        insights: s.insights.clone(),
        has_quote: s.quote.is_some(),
        quote: s.quote.clone().unwrap_or_default(),
        quote_author: s.quote_author.clone().unwrap_or_default(),
    }
}

fn signed_pct(v: f64) -> String {
    format!("{v:+.2}%")
}

fn change_class(p: &PriceSnapshot) -> &'static str {
    if p.percent_change > 0.0 {
        "up"
    } else if p.percent_change < 0.0 {
        "down"
    } else {
        "flat"
    }
}

#[derive(Template)]
#[template(path = "digest.html")]
struct HtmlDigest<'a> {
    v: &'a DigestView,
}

#[derive(Template)]
#[template(path = "digest.txt")]
struct TextDigest<'a> {
    v: &'a DigestView,
}

#[derive(Template)]
#[template(path = "test_email.html")]
struct TestEmail<'a> {
    system_time: &'a str,
}

pub fn render_html(view: &DigestView) -> Result<String, RenderError> {
    Ok(HtmlDigest { v: view }.render()?)
}

pub fn render_text(view: &DigestView) -> Result<String, RenderError> {
    Ok(TextDigest { v: view }.render()?)
}

/// Rendered digest ready for dispatch or for writing to disk.
#[derive(Debug, Clone)]
pub struct RenderedDigest {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn render_digest(
    summary: &PortfolioSummary,
    failed: &[String],
) -> Result<RenderedDigest, RenderError> {
    let view = DigestView::build(summary, failed);
    Ok(RenderedDigest {
        subject: narrative::subject(
            summary.overall_score,
            summary.overall_label,
            summary.generated_at,
        ),
        html: render_html(&view)?,
        text: render_text(&view)?,
    })
}

pub fn render_test_email(at: chrono::DateTime<chrono::Utc>) -> Result<RenderedDigest, RenderError> {
    let system_time = at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let html = TestEmail {
        system_time: &system_time,
    }
    .render()?;
    let text = format!(
        "PORTFOLIO DIGEST SYSTEM TEST\n\n\
         If you are reading this, email delivery is configured correctly.\n\n\
         System time: {system_time}\n"
    );
    Ok(RenderedDigest {
        subject: "[TEST] Portfolio Digest email configuration".to_string(),
        html,
        text,
    })
}
