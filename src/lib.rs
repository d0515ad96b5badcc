//! Live-stream chat & moderation room manager.
//!
//! Fans out real-time chat and super-chat events to every viewer of a live
//! stream, enforces per-room moderation policy (bans, timeouts, slow mode,
//! subscriber-only), and distributes committed events across server
//! processes through Redis pub/sub. Durable storage and the platform's
//! stream catalog are external collaborators reached through traits.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod rooms;
pub mod services;
pub mod state;
pub mod websocket;
