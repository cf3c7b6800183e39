pub mod games;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::config::StoreConfig;

pub use games::DynamoDbGameRepository;
pub use users::DynamoDbUserRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterTimedOut;

/// Caps concurrent DynamoDB requests at the configured pool size. Callers
/// that cannot get a slot within the acquire timeout fail instead of queueing.
#[derive(Clone)]
pub struct RequestLimiter {
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl RequestLimiter {
    pub fn new(max_in_flight: u32, acquire_timeout: Duration) -> Self {
        RequestLimiter {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1) as usize)),
            acquire_timeout,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        RequestLimiter::new(config.max_connections, config.acquire_timeout)
    }

    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, LimiterTimedOut> {
        match tokio::time::timeout(self.acquire_timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            _ => Err(LimiterTimedOut),
        }
    }
}
