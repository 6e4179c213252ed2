use crate::models::rate::RateTable;
use crate::errors::Result;
use async_trait::async_trait;

/// Base trait for exchange rate scrapers
#[async_trait]
pub trait RateScraper {
    /// Human readable name of the data provider
    fn source_name(&self) -> &str;

    /// Fetch today's rate board, normalized and filtered, in source order
    async fn fetch_rates(&self) -> Result<RateTable>;
}
