/// Inline button payloads
pub mod callbacks;
/// teloxide update adapter
pub mod dispatch;
/// Throttled logging of chats outside the manager list
pub mod ignored_chats;
/// Fade-out and deletion of stale messages
pub mod janitor;
/// Telegram calls with retry and benign error handling
pub mod resilient;
/// Telegram implementation of the chat transport
pub mod telegram;
/// Chat transport abstraction and inbound events
pub mod transport;
/// Prompt texts and keyboards
pub mod views;

pub use ignored_chats::IgnoredChatLog;
