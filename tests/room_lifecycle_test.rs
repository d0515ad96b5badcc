mod common;

use common::*;
use live_chat_service::error::ChatError;
use live_chat_service::models::{ChatMessage, MessageKind};
use uuid::Uuid;

#[tokio::test]
async fn join_counts_viewers_and_returns_snapshot() {
    let owner = identity("streamer", true);
    let stream = live_stream(owner.id);
    let app = TestApp::new(&[stream]);

    let (_s1, _rx1, snapshot1) = app.join(stream.id, &identity("alice", false)).await;
    assert_eq!(snapshot1.viewer_count, 1);
    assert!(snapshot1.messages.is_empty());
    assert_eq!(snapshot1.moderators, vec![owner.id]);
    assert_eq!(snapshot1.slow_mode_seconds, 0);
    assert!(!snapshot1.subscriber_only);

    let (_s2, _rx2, snapshot2) = app.join(stream.id, &identity("bob", false)).await;
    assert_eq!(snapshot2.viewer_count, 2);
}

#[tokio::test]
async fn join_rejects_streams_that_are_not_live() {
    let app = TestApp::new(&[]);
    let stream_id = Uuid::new_v4();
    let (handle, _rx) = session();

    let err = app
        .rooms
        .join(stream_id, &identity("alice", false), handle)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotFound));
    assert!(app.rooms.get(stream_id).await.is_none());
}

#[tokio::test]
async fn viewer_count_is_never_negative() {
    let owner = identity("streamer", true);
    let stream = live_stream(owner.id);
    let app = TestApp::new(&[stream]);
    let alice = identity("alice", false);
    let bob = identity("bob", false);

    let (s1, _rx1, _) = app.join(stream.id, &alice).await;
    let (s2, _rx2, _) = app.join(stream.id, &bob).await;

    app.rooms.leave(stream.id, alice.id, s1.connection_id).await;
    let room = app.rooms.get(stream.id).await.expect("room still has a viewer");
    assert_eq!(room.lock().await.viewer_count, 1);

    // last leave empties the room; it is discarded, never negative
    app.rooms.leave(stream.id, bob.id, s2.connection_id).await;
    assert!(app.rooms.get(stream.id).await.is_none());

    // a straggling leave against a discarded room is a no-op
    app.rooms.leave(stream.id, bob.id, s2.connection_id).await;
    assert!(app.rooms.get(stream.id).await.is_none());
}

#[tokio::test]
async fn room_is_rebuilt_from_durable_history() {
    let owner = identity("streamer", true);
    let stream = live_stream(owner.id);
    let app = TestApp::new(&[stream]);
    let alice = identity("alice", false);

    let (s1, _rx1, _) = app.join(stream.id, &alice).await;
    app.broadcaster
        .submit_message(stream.id, &alice, "remember me")
        .await
        .unwrap();
    app.rooms.leave(stream.id, alice.id, s1.connection_id).await;
    assert!(app.rooms.get(stream.id).await.is_none());

    // rejoin recreates the room and reloads the buffer from storage
    let (_s2, _rx2, snapshot) = app.join(stream.id, &identity("bob", false)).await;
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].content, "remember me");
}

#[tokio::test]
async fn join_snapshot_is_capped_at_fifty_messages() {
    let owner = identity("streamer", true);
    let stream = live_stream(owner.id);
    let app = TestApp::new(&[stream]);

    {
        let mut messages = app.gateway.messages.lock().unwrap();
        for i in 0..60 {
            messages.push(ChatMessage::new(
                stream.id,
                owner.id,
                format!("m{i}"),
                MessageKind::Message,
                chrono::Utc::now(),
            ));
        }
    }

    let (_s, _rx, snapshot) = app.join(stream.id, &identity("alice", false)).await;
    assert_eq!(snapshot.messages.len(), 50);
    assert_eq!(snapshot.messages.first().unwrap().content, "m10");
    assert_eq!(snapshot.messages.last().unwrap().content, "m59");
}

#[tokio::test]
async fn presence_events_reach_existing_viewers() {
    let owner = identity("streamer", true);
    let stream = live_stream(owner.id);
    let app = TestApp::new(&[stream]);

    let (_s1, mut rx1, _) = app.join(stream.id, &identity("alice", false)).await;
    drain_events(&mut rx1);

    let bob = identity("bob", false);
    let (s2, _rx2, _) = app.join(stream.id, &bob).await;

    let events = drain_events(&mut rx1);
    let joins = events_of_type(&events, "presence:joined");
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0]["user"]["id"], bob.id.to_string());
    assert_eq!(joins[0]["stream_id"], stream.id.to_string());

    app.rooms.leave(stream.id, bob.id, s2.connection_id).await;
    let events = drain_events(&mut rx1);
    let leaves = events_of_type(&events, "presence:left");
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0]["user_id"], bob.id.to_string());
}

#[tokio::test]
async fn disconnect_leaves_every_joined_room() {
    let owner = identity("streamer", true);
    let stream_a = live_stream(owner.id);
    let stream_b = live_stream(owner.id);
    let app = TestApp::new(&[stream_a, stream_b]);

    let alice = identity("alice", false);
    let (handle, _rx) = session();
    app.rooms
        .join(stream_a.id, &alice, handle.clone())
        .await
        .unwrap();
    app.rooms
        .join(stream_b.id, &alice, handle.clone())
        .await
        .unwrap();

    let joined = [stream_a.id, stream_b.id].into_iter().collect();
    app.rooms
        .disconnect(alice.id, handle.connection_id, &joined)
        .await;

    assert!(app.rooms.get(stream_a.id).await.is_none());
    assert!(app.rooms.get(stream_b.id).await.is_none());
    assert!(app.presence.get(alice.id).await.is_none());
}
