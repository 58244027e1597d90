// AI capability interface and OpenAI client
pub mod ai;

// Per-guild channel configuration store
pub mod channels;

// Prefix command parsing and routing
pub mod commands;

// Configuration (env vars + optional YAML file)
pub mod config;

// AI dispatch gateway (quota + channel gating)
pub mod dispatch;

// Per-user daily quota ledger
pub mod quota;

// Daily quota reset scheduler
pub mod scheduler;

pub use ai::{AiProvider, OpenAiClient};
pub use channels::ChannelStore;
pub use commands::{Command, CommandRouter, Route};
pub use config::Config;
pub use dispatch::AiDispatcher;
pub use quota::{ConsumeResult, QuotaLedger};
pub use scheduler::QuotaResetScheduler;
