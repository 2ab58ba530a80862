//! # digest-core
//!
//! Accumulates "new item added" notifications and periodically flushes them
//! as a single digest.
//!
//! - [`BufferStore`] - the shared, mutex-guarded buffer (in memory or backed
//!   by an append-only log)
//! - [`DigestDispatcher`] - drains the buffer and hands the digest to a
//!   [`Delivery`]
//! - [`DigestScheduler`] - fires the dispatcher at configured times of day
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use digest_core::{
//!     async_trait, BufferStore, Delivery, DeliveryError, DigestDispatcher, DigestPayload,
//!     EventRecord, FlushOutcome,
//! };
//!
//! struct PrintDelivery;
//!
//! #[async_trait]
//! impl Delivery for PrintDelivery {
//!     async fn deliver(&self, payload: &DigestPayload) -> Result<(), DeliveryError> {
//!         println!("{}", payload.render_text());
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "PrintDelivery"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(BufferStore::in_memory());
//!     store.append(EventRecord::new("Inception", 2010, None)?)?;
//!
//!     let dispatcher = DigestDispatcher::new(store, Arc::new(PrintDelivery));
//!     assert_eq!(dispatcher.flush().await?, FlushOutcome::Delivered { count: 1 });
//!     Ok(())
//! }
//! ```

mod delivery;
mod dispatcher;
mod error;
mod payload;
mod record;
mod scheduler;
mod store;

pub use async_trait::async_trait;
pub use delivery::Delivery;
pub use dispatcher::{DigestDispatcher, FlushOutcome};
pub use error::{DeliveryError, DispatchError, RecordError, ScheduleError, StoreError};
pub use payload::DigestPayload;
pub use record::EventRecord;
pub use scheduler::{parse_trigger_times, DigestScheduler, TriggerTime};
pub use store::BufferStore;
pub use tokio_util::sync::CancellationToken;
