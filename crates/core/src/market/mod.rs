pub mod types;
pub mod yahoo;

use crate::domain::quote::PriceSnapshot;
use crate::error::PriceFetchError;

#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn get_price(&self, symbol: &str) -> Result<PriceSnapshot, PriceFetchError>;
}
