use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "modbot")]
#[command(author, version, about = "modbot - Discord moderation bot with scheduled channel cleanup and auto responses")]
pub struct Args {
    /// Mode: "run" starts the bot, "check" validates the definitions file and exits
    #[arg(long, default_value = "run")]
    pub mode: String,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,

    /// JSON file holding cleanup definitions, auto responses and MOTDs
    #[arg(long, env = "MODBOT_DEFINITIONS", default_value = "definitions.json")]
    pub definitions: PathBuf,

    /// How often the cleanup scheduler looks for due definitions
    #[arg(long, env = "MODBOT_TICK_INTERVAL_MS", default_value_t = 1000)]
    pub tick_interval_ms: u64,

    #[arg(long, env = "MODBOT_QUEUE_CAPACITY", default_value_t = 64)]
    pub queue_capacity: usize,

    /// Retries after a failed cleanup attempt
    #[arg(long, env = "MODBOT_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    #[arg(long, env = "MODBOT_RETRY_BASE_DELAY_MS", default_value_t = 2000)]
    pub retry_base_delay_ms: u64,

    /// Budget for one cleanup including retries
    #[arg(long, env = "MODBOT_CLEANUP_TIMEOUT_SECS", default_value_t = 30)]
    pub cleanup_timeout_secs: u64,

    /// "sentence" or "regex"
    #[arg(long, env = "MODBOT_MATCH_STRATEGY", default_value = "sentence")]
    pub match_strategy: String,

    /// Compiled word-group filters idle this long are evicted
    #[arg(long, default_value_t = 86_400)]
    pub pattern_cache_ttl_secs: u64,

    #[arg(long, default_value_t = 3600)]
    pub pattern_cache_prune_secs: u64,

    /// How long auto response definitions are reused before re-reading them
    #[arg(long, default_value_t = 5)]
    pub definitions_refresh_secs: u64,

    /// How often MOTD definitions are compared against what was last applied
    #[arg(long, env = "MODBOT_MOTD_SYNC_SECS", default_value_t = 10)]
    pub motd_sync_secs: u64,

    #[arg(long, default_value_t = 128)]
    pub notification_queue_capacity: usize,

    #[arg(long, default_value_t = 8)]
    pub notification_concurrency: usize,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("modbot=info".parse().unwrap_or_default())
        .add_directive("modbot_core=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("modbot starting. mode={}, definitions={}", args.mode, args.definitions.display());

    let result = match args.mode.as_str() {
        "run" => server::run_bot(args).await,
        "check" => server::check_definitions(args).await,
        other => Err(anyhow::anyhow!("Invalid mode '{other}'. Use --mode=run or --mode=check.")),
    };
    if let Err(e) = &result {
        error!("modbot error: {e:#}");
    }
    info!("Main finished. Goodbye!");
    result
}
