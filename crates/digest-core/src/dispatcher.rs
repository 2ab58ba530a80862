//! Flush cycle: drain the store, build the digest, hand it to Delivery.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::delivery::Delivery;
use crate::error::{DeliveryError, DispatchError};
use crate::payload::DigestPayload;
use crate::store::BufferStore;

/// Result of a successful flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending; Delivery was not called.
    Empty,
    /// A digest with `count` records was delivered.
    Delivered { count: usize },
}

/// Orchestrates flush cycles against a shared [`BufferStore`].
///
/// Records are drained before Delivery runs, so a failed or timed-out delivery
/// loses that digest instead of reporting the same records twice.
#[derive(Clone)]
pub struct DigestDispatcher {
    store: Arc<BufferStore>,
    delivery: Arc<dyn Delivery>,
    timeout: Duration,
}

impl DigestDispatcher {
    /// Default bound on one Delivery call.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(store: Arc<BufferStore>, delivery: Arc<dyn Delivery>) -> Self {
        Self {
            store,
            delivery,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the Delivery timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<BufferStore> {
        &self.store
    }

    /// Run one flush cycle.
    pub async fn flush(&self) -> Result<FlushOutcome, DispatchError> {
        // Durable drains truncate and fsync; keep that off the async workers.
        // The store lock is released before Delivery runs.
        let store = self.store.clone();
        let records = tokio::task::spawn_blocking(move || store.drain()).await??;
        if records.is_empty() {
            debug!("Nothing to flush");
            return Ok(FlushOutcome::Empty);
        }

        let payload = DigestPayload::new(records);
        let count = payload.len();
        info!(count, delivery = self.delivery.name(), "Flushing digest");

        let result = match tokio::time::timeout(self.timeout, self.delivery.deliver(&payload)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::TimedOut(self.timeout)),
        };

        match result {
            Ok(()) => {
                info!(count, "Digest delivered");
                Ok(FlushOutcome::Delivered { count })
            }
            Err(source) => {
                error!(count, error = %source, "Digest delivery failed, records discarded");
                Err(DispatchError::Delivery { count, source })
            }
        }
    }
}
