//! # Feature: AI Dispatch Gateway
//!
//! Decides, per triggering message, whether to invoke chat completion or
//! image generation, enforcing the daily quota and the per-guild channel
//! configuration.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial release

use crate::ai::AiProvider;
use crate::channels::ChannelStore;
use crate::quota::{ConsumeResult, QuotaLedger};
use log::{debug, warn};
use std::sync::Arc;

/// The combined rejection reply.
///
/// It intentionally does not say whether the quota ran out or the channel
/// was wrong; the original bot conflates the two and downstream consumers
/// rely on the single message.
pub fn rejection_message(allowance: i32) -> String {
    format!(
        "**An error occurred for one of the following reasons.**\n\
         - Daily usage limit exceeded ({allowance} per day)\n\
         - Channel ID mismatch\n"
    )
}

/// Gates AI invocations behind the quota ledger and channel configuration
pub struct AiDispatcher {
    quota: Arc<QuotaLedger>,
    channels: Arc<ChannelStore>,
    provider: Arc<dyn AiProvider>,
}

impl AiDispatcher {
    pub fn new(
        quota: Arc<QuotaLedger>,
        channels: Arc<ChannelStore>,
        provider: Arc<dyn AiProvider>,
    ) -> Self {
        AiDispatcher {
            quota,
            channels,
            provider,
        }
    }

    /// Handle one triggering message and produce the reply text.
    ///
    /// Quota is consumed before the channel comparison, so an attempt in an
    /// unconfigured channel still counts against the user's allowance. The
    /// chat channel is checked before the image channel. Provider failures
    /// are folded into the reply; this function never fails.
    pub async fn dispatch(
        &self,
        guild_id: u64,
        channel_id: u64,
        author_id: u64,
        prompt: &str,
    ) -> String {
        let remaining = match self.quota.consume(author_id) {
            ConsumeResult::Denied => {
                debug!("user {author_id} rejected: quota exhausted");
                return rejection_message(self.quota.allowance());
            }
            ConsumeResult::Allowed { remaining } => remaining,
        };
        debug!("user {author_id} allowed ({remaining} left today)");

        if self.channels.ai_channel(guild_id) == Some(channel_id) {
            match self.provider.complete(prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("chat completion failed for user {author_id}: {e:#}");
                    format!("An error occurred: {e}")
                }
            }
        } else if self.channels.img_channel(guild_id) == Some(channel_id) {
            match self.provider.generate_image(prompt).await {
                Ok(url) => url,
                Err(e) => {
                    warn!("image generation failed for user {author_id}: {e:#}");
                    format!("An error occurred: {e}")
                }
            }
        } else {
            debug!(
                "user {author_id} rejected: channel {channel_id} not configured in guild {guild_id}"
            );
            rejection_message(self.quota.allowance())
        }
    }
}
