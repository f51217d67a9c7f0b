pub mod json;
pub mod xai;

use crate::domain::sentiment::SentimentResult;
use crate::error::SentimentFetchError;

#[async_trait::async_trait]
pub trait SentimentProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn get_sentiment(&self, symbol: &str) -> Result<SentimentResult, SentimentFetchError>;
}
