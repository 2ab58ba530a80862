//! The Delivery trait definition.

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::payload::DigestPayload;

/// Transport that receives a non-empty digest.
///
/// Called at most once per flush. This trait is object-safe and can be used
/// with `Arc<dyn Delivery>`.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Send the digest.
    async fn deliver(&self, payload: &DigestPayload) -> Result<(), DeliveryError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
