use axum::routing::get;
use axum::Router;
use live_chat_service::services::broadcaster::MessageBroadcaster;
use live_chat_service::services::content_filter::ContentFilter;
use live_chat_service::services::identity::{IdentityVerifier, PgIdentityVerifier};
use live_chat_service::services::moderation::ModerationEngine;
use live_chat_service::services::persistence::{PersistenceGateway, PgPersistenceGateway};
use live_chat_service::services::stream_directory::{PgStreamDirectory, StreamDirectory};
use live_chat_service::services::super_chat::SuperChatProcessor;
use live_chat_service::websocket::pubsub::{start_pubsub_listener, FanoutAdapter, RedisFanout};
use live_chat_service::websocket::{handlers, ConnectionRegistry};
use live_chat_service::{config, db, error, logging, metrics, migrations};
use live_chat_service::rooms::{PresenceTracker, RoomRegistry};
use live_chat_service::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Run embedded migrations (idempotent)
    migrations::run_all(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let redis_client = redis::Client::open(cfg.redis_url.as_str())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    // Identifies this process in fanout envelopes so it can skip messages it
    // already delivered locally.
    let instance_id = Uuid::new_v4();

    let connections = ConnectionRegistry::new();
    let presence = PresenceTracker::new();
    let fanout: Arc<dyn FanoutAdapter> =
        Arc::new(RedisFanout::new(redis_client.clone(), instance_id));
    let persistence: Arc<dyn PersistenceGateway> = Arc::new(PgPersistenceGateway::new(db.clone()));
    let directory: Arc<dyn StreamDirectory> = Arc::new(PgStreamDirectory::new(db.clone()));
    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(PgIdentityVerifier::new(db.clone(), cfg.jwt_secret.clone()));
    let filter = Arc::new(ContentFilter::new(&cfg.blocked_terms));

    let rooms = Arc::new(RoomRegistry::new(
        directory,
        persistence.clone(),
        connections.clone(),
        presence.clone(),
        fanout.clone(),
    ));
    let broadcaster = Arc::new(MessageBroadcaster::new(
        rooms.clone(),
        connections.clone(),
        persistence.clone(),
        fanout.clone(),
        filter.clone(),
    ));
    let moderation = Arc::new(ModerationEngine::new(
        rooms.clone(),
        connections.clone(),
        presence.clone(),
        persistence.clone(),
        fanout.clone(),
    ));
    let super_chats = Arc::new(SuperChatProcessor::new(
        rooms.clone(),
        connections.clone(),
        presence.clone(),
        persistence.clone(),
        fanout.clone(),
        filter,
    ));

    // Cross-instance fanout listener
    let listener_client = redis_client.clone();
    let listener_registry = connections.clone();
    tokio::spawn(async move {
        if let Err(e) = start_pubsub_listener(listener_client, instance_id, listener_registry).await
        {
            tracing::error!(error = %e, "redis pubsub listener failed");
        }
    });

    metrics::spawn_viewer_snapshot_task(
        rooms.clone(),
        persistence.clone(),
        Duration::from_secs(cfg.viewer_snapshot_interval_secs),
    );

    let state = AppState {
        config: cfg.clone(),
        connections,
        presence,
        rooms,
        verifier,
        broadcaster,
        moderation,
        super_chats,
    };

    let app = Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/health", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting live-chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
