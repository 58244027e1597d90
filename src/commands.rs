//! # Feature: Prefix Commands
//!
//! Recognizes the fixed command set (`/copy`, `/ai`, `/img`, `/reset`) and
//! routes everything else starting with the prefix to the AI dispatch path.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Admin identity comes from configuration instead of a constant
//! - 1.0.0: Initial release with channel setters and quota reset

use crate::channels::ChannelStore;
use crate::quota::QuotaLedger;
use log::info;
use std::sync::Arc;

/// Prefix that marks a message as a command or AI trigger
pub const COMMAND_PREFIX: char = '/';

/// A fully parsed command with its integer argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetCopyChannel(u64),
    SetAiChannel(u64),
    SetImgChannel(u64),
    ResetQuota(u64),
}

/// Classification of an inbound message's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A known command with a valid argument
    Command(Command),
    /// A known command whose argument is missing or not an integer
    InvalidArgument { command: &'static str },
    /// Prefixed content whose first token is not a known command; the
    /// payload is the content minus the leading prefix character
    AiPrompt(String),
    /// Not prefixed, nothing to do
    Ignore,
}

impl Route {
    /// Classify raw message content.
    pub fn parse(content: &str) -> Route {
        let Some(body) = content.strip_prefix(COMMAND_PREFIX) else {
            return Route::Ignore;
        };

        let mut tokens = body.split_whitespace();
        let command = match tokens.next() {
            Some("copy") => "copy",
            Some("ai") => "ai",
            Some("img") => "img",
            Some("reset") => "reset",
            // Any other first token (or a bare prefix) goes to the AI path
            _ => return Route::AiPrompt(body.to_string()),
        };

        match tokens.next().and_then(|arg| arg.parse::<u64>().ok()) {
            Some(id) => Route::Command(match command {
                "copy" => Command::SetCopyChannel(id),
                "ai" => Command::SetAiChannel(id),
                "img" => Command::SetImgChannel(id),
                _ => Command::ResetQuota(id),
            }),
            None => Route::InvalidArgument { command },
        }
    }
}

/// Executes parsed commands against the shared state
///
/// Every execution returns exactly one reply for the originating channel.
/// `reset` is restricted to the configured admin identity; when no admin is
/// configured it is denied for everyone.
pub struct CommandRouter {
    channels: Arc<ChannelStore>,
    quota: Arc<QuotaLedger>,
    admin_user_id: Option<u64>,
}

impl CommandRouter {
    pub fn new(
        channels: Arc<ChannelStore>,
        quota: Arc<QuotaLedger>,
        admin_user_id: Option<u64>,
    ) -> Self {
        CommandRouter {
            channels,
            quota,
            admin_user_id,
        }
    }

    pub fn execute(&self, guild_id: u64, author_id: u64, command: Command) -> String {
        match command {
            Command::SetCopyChannel(channel_id) => {
                self.channels.set_copy_channel(guild_id, channel_id);
                info!("guild {guild_id}: copy channel set to {channel_id}");
                "Copy destination channel has been set.".to_string()
            }
            Command::SetAiChannel(channel_id) => {
                self.channels.set_ai_channel(guild_id, channel_id);
                info!("guild {guild_id}: AI chat channel set to {channel_id}");
                "AI chat channel has been set.".to_string()
            }
            Command::SetImgChannel(channel_id) => {
                self.channels.set_img_channel(guild_id, channel_id);
                info!("guild {guild_id}: image generation channel set to {channel_id}");
                "Image generation channel has been set.".to_string()
            }
            Command::ResetQuota(user_id) => {
                if self.admin_user_id == Some(author_id) {
                    self.quota.reset(user_id);
                    info!("quota for user {user_id} reset by admin {author_id}");
                    "The user's daily usage limit has been reset.".to_string()
                } else {
                    info!("user {author_id} denied access to /reset");
                    "You do not have permission to use this command.".to_string()
                }
            }
        }
    }
}
