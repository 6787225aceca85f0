//! Bot module - command handling and lock enforcement for group chats.

pub mod client;
pub mod commands;
pub mod engine;
pub mod fight;
pub mod registry;
pub mod replies;
pub mod telegram;

#[cfg(test)]
pub mod mock;

pub use client::{ChatClient, Connector};
pub use engine::{WardenConfig, WardenEngine};
pub use fight::{ActivationError, FightPlan};
pub use registry::ConversationRegistry;
pub use telegram::TelegramConnector;
