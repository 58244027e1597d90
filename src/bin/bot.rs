//! Discord gateway entry point
//!
//! Wires the shared state (channel store, quota ledger), the command router,
//! the AI dispatch gateway, and the daily reset scheduler into a single
//! serenity event handler. Configuration comes from environment variables or
//! an optional config.yaml.

use anyhow::Result;
use dotenvy::dotenv;
use log::{debug, error, info, warn};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::model::voice::VoiceState;
use serenity::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier::ai::{AiProvider, OpenAiClient};
use courier::channels::ChannelStore;
use courier::commands::{CommandRouter, Route};
use courier::config::Config;
use courier::dispatch::AiDispatcher;
use courier::quota::QuotaLedger;
use courier::scheduler::QuotaResetScheduler;

/// Set once the reset scheduler has been spawned, so gateway reconnects
/// (which fire `ready` again) do not start a second one
static SCHEDULER_STARTED: AtomicBool = AtomicBool::new(false);

/// Handler for the bot's Discord events
struct Handler {
    channels: Arc<ChannelStore>,
    quota: Arc<QuotaLedger>,
    router: CommandRouter,
    dispatcher: AiDispatcher,
    reset_offset: chrono::FixedOffset,
}

impl Handler {
    /// Forward every attachment URL to the guild's copy channel, if one is
    /// configured. Missing configuration is only logged.
    async fn relay_attachments(&self, ctx: &Context, msg: &Message, guild_id: u64) {
        let Some(target) = self.channels.copy_channel(guild_id) else {
            debug!("no copy channel configured for guild {guild_id}");
            return;
        };

        for attachment in &msg.attachments {
            if let Err(e) = ChannelId(target).say(&ctx.http, &attachment.url).await {
                error!("failed to relay attachment to channel {target}: {e}");
            }
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        // Commands and AI triggers only make sense inside a guild
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let guild_id = guild_id.0;

        if !msg.attachments.is_empty() {
            self.relay_attachments(&ctx, &msg, guild_id).await;
        }

        let reply = match Route::parse(&msg.content) {
            Route::Command(command) => {
                Some(self.router.execute(guild_id, msg.author.id.0, command))
            }
            Route::InvalidArgument { command } => {
                warn!(
                    "malformed /{command} from user {} in guild {guild_id}",
                    msg.author.id
                );
                None
            }
            Route::AiPrompt(prompt) => Some(
                self.dispatcher
                    .dispatch(guild_id, msg.channel_id.0, msg.author.id.0, &prompt)
                    .await,
            ),
            Route::Ignore => None,
        };

        if let Some(reply) = reply {
            if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
                error!("failed to reply in channel {}: {e}", msg.channel_id);
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        // Only a fresh join (no previous channel) clears the server mute
        let joined = new.channel_id.is_some() && old.and_then(|o| o.channel_id).is_none();
        if !joined {
            return;
        }
        let Some(guild_id) = new.guild_id else {
            return;
        };

        if let Err(e) = guild_id
            .edit_member(&ctx.http, new.user_id, |member| member.mute(false))
            .await
        {
            warn!(
                "failed to unmute user {} in guild {guild_id}: {e}",
                new.user_id
            );
        } else {
            info!("unmuted user {} on voice join in guild {guild_id}", new.user_id);
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected and ready!", ready.user.name);
        info!("Connected to {} guilds", ready.guilds.len());

        if !SCHEDULER_STARTED.swap(true, Ordering::SeqCst) {
            let scheduler = QuotaResetScheduler::new(self.quota.clone(), self.reset_offset);
            tokio::spawn(scheduler.run());
            info!("Daily quota reset scheduler started");
        }
    }
}

/// Run the bot with retry logic around the gateway connection.
///
/// The shared state lives outside the retry loop, so channel configuration
/// and quota counts survive reconnect attempts.
async fn run_bot(
    config: &Config,
    channels: Arc<ChannelStore>,
    quota: Arc<QuotaLedger>,
    provider: Arc<dyn AiProvider>,
) -> Result<()> {
    let max_retries: u64 = 5;
    let mut retry_count: u64 = 0;

    loop {
        info!(
            "Starting gateway connection (attempt {}/{})",
            retry_count + 1,
            max_retries
        );

        match run_bot_inner(config, channels.clone(), quota.clone(), provider.clone()).await {
            Ok(()) => {
                info!("Gateway connection closed normally");
                break;
            }
            Err(e) => {
                retry_count += 1;
                if retry_count >= max_retries {
                    error!("Giving up after {max_retries} attempts: {e}");
                    return Err(e);
                }

                let delay = Duration::from_secs(5 * retry_count);
                warn!("Gateway connection failed: {e}. Retrying in {delay:?}...");
                tokio::time::sleep(delay).await;
            }
        }
    }

    Ok(())
}

/// Inner bot run function (single attempt)
async fn run_bot_inner(
    config: &Config,
    channels: Arc<ChannelStore>,
    quota: Arc<QuotaLedger>,
    provider: Arc<dyn AiProvider>,
) -> Result<()> {
    let router = CommandRouter::new(channels.clone(), quota.clone(), config.admin_user_id);
    let dispatcher = AiDispatcher::new(quota.clone(), channels.clone(), provider);

    let handler = Handler {
        channels,
        quota,
        router,
        dispatcher,
        reset_offset: config.reset_offset(),
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| anyhow::anyhow!("Client creation failed: {e}"))?;

    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Gateway connection failed: {e}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::auto_load()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting courier Discord bot...");
    if config.admin_user_id.is_none() {
        warn!("No admin_user_id configured; /reset will be denied for everyone");
    }
    if config.openai_api_key.is_empty() {
        warn!("No OpenAI API key configured; AI invocations will fail");
    }

    let channels = Arc::new(ChannelStore::new());
    let quota = Arc::new(QuotaLedger::new(config.daily_quota));
    let provider: Arc<dyn AiProvider> = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.chat_model.clone(),
        config.image_model.clone(),
        config.image_size.clone(),
    ));

    run_bot(&config, channels, quota, provider).await
}
