use crate::error::ChatError;
use crate::models::Identity;
use crate::rooms::SessionHandle;
use crate::state::AppState;
use crate::websocket::events::{self, ServerEvent};
use crate::websocket::message_types::ClientCommand;
use crate::websocket::SessionCommand;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

fn extract_token(params: &WsParams, headers: &HeaderMap) -> Option<String> {
    params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

/// WebSocket entry point. The credential is verified before the upgrade
/// completes; no room state is touched for unauthenticated connections.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = extract_token(&params, &headers) else {
        warn!("websocket connection rejected: no credential provided");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let identity = match state.verifier.verify(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "websocket connection rejected: credential verification failed");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, identity, socket))
}

async fn handle_socket(state: AppState, identity: Identity, socket: WebSocket) {
    let (mut sink, mut source) = socket.split();
    let (tx, mut rx) = unbounded_channel::<SessionCommand>();
    let session = SessionHandle {
        connection_id: Uuid::new_v4(),
        sender: tx,
    };
    let mut joined: HashSet<Uuid> = HashSet::new();

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(SessionCommand::Deliver(msg)) => {
                    if sink.send(msg).await.is_err() {
                        break;
                    }
                }
                Some(SessionCommand::ForceLeave { stream_id }) => {
                    joined.remove(&stream_id);
                }
                None => break,
            },

            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_text(&state, &identity, &session, &mut joined, &text).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(user_id = %identity.id, error = %e, "websocket read error");
                    break;
                }
            }
        }
    }

    state
        .rooms
        .disconnect(identity.id, session.connection_id, &joined)
        .await;
}

async fn handle_client_text(
    state: &AppState,
    identity: &Identity,
    session: &SessionHandle,
    joined: &mut HashSet<Uuid>,
    text: &str,
) {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            debug!(user_id = %identity.id, error = %e, "unparseable client command");
            events::send_to(
                &session.sender,
                Uuid::nil(),
                &ServerEvent::from_error(&ChatError::Validation("unrecognized command".into())),
            );
            return;
        }
    };

    let stream_id = command.stream_id();
    if let Err(err) = dispatch_command(state, identity, session, joined, command).await {
        events::send_to(&session.sender, stream_id, &ServerEvent::from_error(&err));
    }
}

fn ensure_joined(joined: &HashSet<Uuid>, stream_id: Uuid) -> Result<(), ChatError> {
    if joined.contains(&stream_id) {
        Ok(())
    } else {
        Err(ChatError::Validation(
            "join the stream before sending".into(),
        ))
    }
}

/// One exhaustive dispatch for every inbound command; new event types cannot
/// be silently mis-routed.
async fn dispatch_command(
    state: &AppState,
    identity: &Identity,
    session: &SessionHandle,
    joined: &mut HashSet<Uuid>,
    command: ClientCommand,
) -> Result<(), ChatError> {
    match command {
        ClientCommand::JoinStream { stream_id } => {
            let snapshot = state.rooms.join(stream_id, identity, session.clone()).await?;
            joined.insert(stream_id);
            events::send_to(
                &session.sender,
                stream_id,
                &ServerEvent::StreamJoined {
                    viewer_count: snapshot.viewer_count,
                    messages: snapshot.messages,
                    moderators: snapshot.moderators,
                    slow_mode_seconds: snapshot.slow_mode_seconds,
                    subscriber_only: snapshot.subscriber_only,
                },
            );
            Ok(())
        }

        ClientCommand::LeaveStream { stream_id } => {
            if joined.remove(&stream_id) {
                state
                    .rooms
                    .leave(stream_id, identity.id, session.connection_id)
                    .await;
            }
            Ok(())
        }

        ClientCommand::ChatMessage { stream_id, text } => {
            ensure_joined(joined, stream_id)?;
            state
                .broadcaster
                .submit_message(stream_id, identity, &text)
                .await
        }

        ClientCommand::SuperChat {
            stream_id,
            text,
            amount,
            currency,
        } => {
            ensure_joined(joined, stream_id)?;
            state
                .super_chats
                .submit(stream_id, identity, &text, amount, &currency)
                .await
        }

        ClientCommand::Emote {
            stream_id,
            emote_id,
        } => {
            ensure_joined(joined, stream_id)?;
            state
                .broadcaster
                .submit_emote(stream_id, identity, &emote_id)
                .await
        }

        ClientCommand::Timeout {
            stream_id,
            user_id,
            duration_seconds,
        } => {
            state
                .moderation
                .timeout(stream_id, identity, user_id, duration_seconds)
                .await
        }

        ClientCommand::Ban { stream_id, user_id } => {
            state.moderation.ban(stream_id, identity, user_id).await
        }

        ClientCommand::Delete {
            stream_id,
            message_id,
        } => {
            state
                .moderation
                .delete_message(stream_id, identity, message_id)
                .await
        }

        ClientCommand::SlowMode {
            stream_id,
            duration_seconds,
        } => {
            state
                .moderation
                .set_slow_mode(stream_id, identity, duration_seconds)
                .await
        }

        ClientCommand::SubscriberOnly { stream_id, enabled } => {
            state
                .moderation
                .set_subscriber_only(stream_id, identity, enabled)
                .await
        }
    }
}
