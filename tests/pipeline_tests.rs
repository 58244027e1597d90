//! Message Pipeline Integration Tests
//!
//! These tests run the command router and AI dispatch gateway end-to-end
//! against a mocked AI provider, covering quota exhaustion, channel gating,
//! and admin-only quota resets.
//!
//! Run with: `cargo test --test pipeline_tests`

use courier::ai::AiProvider;
use courier::channels::ChannelStore;
use courier::commands::{Command, CommandRouter, Route};
use courier::dispatch::{rejection_message, AiDispatcher};
use courier::quota::{ConsumeResult, QuotaLedger};
use serenity::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Provider that echoes prompts and counts invocations per capability
struct EchoProvider {
    completions: AtomicUsize,
    images: AtomicUsize,
}

impl EchoProvider {
    fn new() -> Arc<Self> {
        Arc::new(EchoProvider {
            completions: AtomicUsize::new(0),
            images: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AiProvider for EchoProvider {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(format!("completion: {prompt}"))
    }

    async fn generate_image(&self, prompt: &str) -> anyhow::Result<String> {
        self.images.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://images.example/{prompt}.png"))
    }
}

/// Provider whose calls always fail
struct FailingProvider;

#[async_trait]
impl AiProvider for FailingProvider {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("upstream unavailable"))
    }

    async fn generate_image(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("upstream unavailable"))
    }
}

struct Fixture {
    channels: Arc<ChannelStore>,
    quota: Arc<QuotaLedger>,
    router: CommandRouter,
    provider: Arc<EchoProvider>,
    dispatcher: AiDispatcher,
}

fn fixture(admin: Option<u64>) -> Fixture {
    let channels = Arc::new(ChannelStore::new());
    let quota = Arc::new(QuotaLedger::new(3));
    let provider = EchoProvider::new();
    let router = CommandRouter::new(channels.clone(), quota.clone(), admin);
    let dispatcher = AiDispatcher::new(quota.clone(), channels.clone(), provider.clone());
    Fixture {
        channels,
        quota,
        router,
        provider,
        dispatcher,
    }
}

// ============================================================================
// Channel Gating
// ============================================================================

#[tokio::test]
async fn test_ai_channel_match_invokes_completion_only() {
    let f = fixture(None);
    f.channels.set_ai_channel(42, 100);

    let reply = f.dispatcher.dispatch(42, 100, 7, "hello").await;

    assert_eq!(reply, "completion: hello");
    assert_eq!(f.provider.completions.load(Ordering::SeqCst), 1);
    assert_eq!(f.provider.images.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_img_channel_match_invokes_image_path() {
    let f = fixture(None);
    f.channels.set_ai_channel(42, 100);
    f.channels.set_img_channel(42, 200);

    let reply = f.dispatcher.dispatch(42, 200, 7, "a cat").await;

    assert_eq!(reply, "https://images.example/a cat.png");
    assert_eq!(f.provider.completions.load(Ordering::SeqCst), 0);
    assert_eq!(f.provider.images.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ai_channel_takes_priority_when_both_match() {
    let f = fixture(None);
    f.channels.set_ai_channel(42, 100);
    f.channels.set_img_channel(42, 100);

    let reply = f.dispatcher.dispatch(42, 100, 7, "hello").await;

    assert_eq!(reply, "completion: hello");
    assert_eq!(f.provider.images.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unconfigured_channel_still_consumes_quota() {
    let f = fixture(None);
    // Guild 42 has no configuration at all

    let reply = f.dispatcher.dispatch(42, 555, 7, "hello").await;
    assert_eq!(reply, rejection_message(3));
    assert_eq!(f.provider.completions.load(Ordering::SeqCst), 0);

    // The rejected attempt counted: only two served attempts remain
    f.channels.set_ai_channel(42, 100);
    assert_eq!(f.dispatcher.dispatch(42, 100, 7, "a").await, "completion: a");
    assert_eq!(f.dispatcher.dispatch(42, 100, 7, "b").await, "completion: b");
    assert_eq!(f.dispatcher.dispatch(42, 100, 7, "c").await, rejection_message(3));
}

// ============================================================================
// Quota Exhaustion Scenario (spec walkthrough)
// ============================================================================

#[tokio::test]
async fn test_quota_exhaustion_scenario() {
    let f = fixture(None);

    // Guild "42" has no configuration; user 7 sends "/ai 100"
    let route = Route::parse("/ai 100");
    assert_eq!(route, Route::Command(Command::SetAiChannel(100)));
    let reply = f.router.execute(42, 7, Command::SetAiChannel(100));
    assert_eq!(reply, "AI chat channel has been set.");
    assert_eq!(f.channels.ai_channel(42), Some(100));

    // User 7 sends "/hello" in channel 100 four times in sequence
    let Route::AiPrompt(prompt) = Route::parse("/hello") else {
        panic!("expected AI prompt route");
    };

    for _ in 0..3 {
        let reply = f.dispatcher.dispatch(42, 100, 7, &prompt).await;
        assert_eq!(reply, "completion: hello");
    }

    let reply = f.dispatcher.dispatch(42, 100, 7, &prompt).await;
    assert_eq!(reply, rejection_message(3));
    assert_eq!(f.provider.completions.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_reset_all_behaves_like_first_day() {
    let f = fixture(None);
    f.channels.set_ai_channel(42, 100);

    for _ in 0..4 {
        f.dispatcher.dispatch(42, 100, 7, "hi").await;
    }
    assert_eq!(f.dispatcher.dispatch(42, 100, 7, "hi").await, rejection_message(3));

    // The daily reset clears everyone
    f.quota.reset_all();

    for _ in 0..3 {
        assert_eq!(f.dispatcher.dispatch(42, 100, 7, "hi").await, "completion: hi");
    }
    assert_eq!(f.dispatcher.dispatch(42, 100, 7, "hi").await, rejection_message(3));
}

// ============================================================================
// Admin Reset
// ============================================================================

#[tokio::test]
async fn test_non_admin_reset_is_denied_and_changes_nothing() {
    let f = fixture(Some(1000));
    f.channels.set_ai_channel(42, 100);

    // User 7 burns two attempts
    f.dispatcher.dispatch(42, 100, 7, "one").await;
    f.dispatcher.dispatch(42, 100, 7, "two").await;

    // A non-admin tries "/reset 7"
    let reply = f.router.execute(42, 9999, Command::ResetQuota(7));
    assert_eq!(reply, "You do not have permission to use this command.");

    // User 7 continues from where they left off: one attempt remains
    assert_eq!(f.quota.consume(7), ConsumeResult::Allowed { remaining: 1 });
    assert_eq!(f.quota.consume(7), ConsumeResult::Denied);
}

#[tokio::test]
async fn test_admin_reset_targets_only_one_user() {
    let f = fixture(Some(1000));
    f.channels.set_ai_channel(42, 100);

    for _ in 0..4 {
        f.dispatcher.dispatch(42, 100, 7, "hi").await;
        f.dispatcher.dispatch(42, 100, 8, "hi").await;
    }

    let reply = f.router.execute(42, 1000, Command::ResetQuota(7));
    assert_eq!(reply, "The user's daily usage limit has been reset.");

    // User 7 is fresh, user 8 is still exhausted
    assert_eq!(f.dispatcher.dispatch(42, 100, 7, "hi").await, "completion: hi");
    assert_eq!(f.dispatcher.dispatch(42, 100, 8, "hi").await, rejection_message(3));
}

// ============================================================================
// Provider Failures
// ============================================================================

#[tokio::test]
async fn test_provider_error_is_embedded_in_reply() {
    let channels = Arc::new(ChannelStore::new());
    let quota = Arc::new(QuotaLedger::new(3));
    let dispatcher = AiDispatcher::new(quota.clone(), channels.clone(), Arc::new(FailingProvider));

    channels.set_ai_channel(42, 100);
    let reply = dispatcher.dispatch(42, 100, 7, "hello").await;

    assert!(reply.starts_with("An error occurred:"));
    assert!(reply.contains("upstream unavailable"));

    // The failed invocation still consumed quota
    assert_eq!(quota.consume(7), ConsumeResult::Allowed { remaining: 2 });
}
