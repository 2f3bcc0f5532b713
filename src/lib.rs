//! Manager console for a classified-ads marketplace.
//!
//! Managers drive a chat dialogue that creates, edits, publishes, renews and
//! retires ads and maintains a scammer blacklist. A background scheduler
//! warns owners before their ads expire and flips overdue ads to expired.

/// Telegram-facing pieces: transport, dispatch, prompts and message cleanup
pub mod bot;
/// Configuration and settings management
pub mod config;
/// The manager conversation engine
pub mod engine;
/// Ads, vocabulary and lifecycle rules
pub mod market;
/// Periodic ad lifecycle scheduler
pub mod scheduler;
/// Per-chat conversation sessions
pub mod session;
/// Durable record store abstraction and implementations
pub mod store;
/// Test doubles shared by unit and integration tests
pub mod testing;
/// Text helpers and Telegram retry policy
pub mod utils;
