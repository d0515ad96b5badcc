pub mod broadcaster;
pub mod content_filter;
pub mod identity;
pub mod moderation;
pub mod persistence;
pub mod stream_directory;
pub mod super_chat;
