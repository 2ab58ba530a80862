//! Webhook ingestion endpoint.

use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, WebhookError};
use crate::plex::{self, PlexEvent};
use crate::state::AppState;

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: String,
}

impl WebhookResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Image part sent alongside the payload.
struct Thumbnail {
    content_type: Option<String>,
    data: Bytes,
}

/// Receive a media server notification.
///
/// Accepts Plex's `multipart/form-data` (`payload` JSON field plus optional
/// `thumb` image) or a bare JSON body. Only new-item events are buffered.
pub async fn receive(State(state): State<AppState>, request: Request) -> Result<Json<WebhookResponse>> {
    let (payload, thumbnail) = read_notification(&state, request).await?;
    let event = plex::parse_event(&payload)?;

    // Plex posts playback events to the same URL; acknowledge and drop them.
    if !event.is_new_item() {
        debug!(event = %event.event, "Ignoring notification");
        return Ok(Json(WebhookResponse::new("ignored")));
    }

    let image = match thumbnail {
        Some(thumb) => Some(state.images.save(thumb.content_type.as_deref(), &thumb.data).await?),
        None => None,
    };

    if let Err(e) = buffer(&state, &event, image.clone()).await {
        if let Some(path) = &image {
            state.images.remove(path).await;
        }
        return Err(e);
    }

    info!(
        title = %event.title(),
        year = event.year(),
        has_image = image.is_some(),
        "Buffered new item"
    );
    Ok(Json(WebhookResponse::new("Webhook processed successfully")))
}

async fn buffer(state: &AppState, event: &PlexEvent, image: Option<PathBuf>) -> Result<()> {
    let record = event.to_record(image.map(|p| p.display().to_string()))?;

    // Durable appends fsync; keep that off the async workers.
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.append(record))
        .await
        .map_err(|e| WebhookError::Internal(e.to_string()))??;

    Ok(())
}

async fn read_notification(state: &AppState, request: Request) -> Result<(Bytes, Option<Thumbnail>)> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|e| WebhookError::Malformed(e.body_text()))?;
        return Ok((body, None));
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| WebhookError::Malformed(e.body_text()))?;

    let mut payload = None;
    let mut thumbnail = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebhookError::Malformed(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "payload" => {
                payload = Some(field.bytes().await.map_err(|e| WebhookError::Malformed(e.body_text()))?);
            }
            "thumb" => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| WebhookError::Malformed(e.body_text()))?;
                if !data.is_empty() {
                    thumbnail = Some(Thumbnail { content_type, data });
                }
            }
            other => debug!(field = other, "Skipping multipart field"),
        }
    }

    let payload = payload.ok_or_else(|| WebhookError::Malformed("Missing payload field".to_string()))?;
    Ok((payload, thumbnail))
}
