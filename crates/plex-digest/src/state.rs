//! Application state shared across handlers.

use std::sync::Arc;

use digest_core::BufferStore;

use crate::images::ImageStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Pending records, shared with the digest scheduler.
    pub store: Arc<BufferStore>,
    /// Thumbnail storage.
    pub images: ImageStore,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Arc<BufferStore>, images: ImageStore) -> Self {
        Self { store, images }
    }
}
