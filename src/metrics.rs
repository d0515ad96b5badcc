use crate::rooms::RoomRegistry;
use crate::services::persistence::PersistenceGateway;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

pub static CHAT_MESSAGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "live_chat_messages_total",
        "Total chat messages accepted by live-chat-service",
    )
    .expect("failed to create live_chat_messages_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register live_chat_messages_total");
    counter
});

pub static SUPER_CHATS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "live_chat_super_chats_total",
        "Total super chats accepted by live-chat-service",
    )
    .expect("failed to create live_chat_super_chats_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register live_chat_super_chats_total");
    counter
});

pub static OPEN_ROOMS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "live_chat_open_rooms",
        "Rooms currently held in memory by this process",
    )
    .expect("failed to create live_chat_open_rooms");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register live_chat_open_rooms");
    gauge
});

pub static CONNECTED_VIEWERS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "live_chat_connected_viewers",
        "Viewers currently joined to rooms on this process",
    )
    .expect("failed to create live_chat_connected_viewers");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register live_chat_connected_viewers");
    gauge
});

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, encoder.format_type())
        .body(buffer.into())
        .unwrap_or_else(|err| {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        })
}

/// Periodically records per-room viewer counts into durable storage. Write
/// failures are logged and the loop keeps going.
pub fn spawn_viewer_snapshot_task(
    rooms: Arc<RoomRegistry>,
    persistence: Arc<dyn PersistenceGateway>,
    interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            for (stream_id, viewer_count) in rooms.viewer_counts().await {
                if let Err(e) = persistence
                    .record_viewer_count(stream_id, viewer_count, now)
                    .await
                {
                    tracing::warn!(%stream_id, error = %e, "failed to record viewer snapshot");
                }
            }
        }
    });
}
