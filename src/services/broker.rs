//! Broker market-data interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::models::{BarSeries, Interval};

/// Historical market-data source. The only broker operation the scan engine
/// performs; order placement lives outside the core.
///
/// Implementations classify failures into the [`FetchError`] taxonomy; the
/// fetcher decides retry behavior from the variant alone. Cancellation is
/// cooperative: the engine drops the returned future when a deadline or
/// shutdown fires, so implementations should not detach background work.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn fetch_historical(
        &self,
        instrument: &str,
        interval: Interval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BarSeries, FetchError>;
}

/// No-op broker returning empty series, for wiring the binary before a real
/// integration is configured.
pub struct PlaceholderBrokerClient;

#[async_trait]
impl BrokerClient for PlaceholderBrokerClient {
    async fn fetch_historical(
        &self,
        instrument: &str,
        interval: Interval,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<BarSeries, FetchError> {
        Ok(BarSeries::empty(instrument, interval))
    }
}
