use clap::Parser;
use modwatch::cli::{Cli, Command};
use modwatch::config::{self, MuteConfig, RedditCredentials};
use modwatch::error::BotResult;
use modwatch::mutebot::{ConversationCache, MuteBot};
use modwatch::reddit::RedditClient;
use modwatch::tracker::{BanTracker, HistoryStore};
use modwatch::{CONSOLE_TARGET, logging};
use tracing::info;

/// Main function to run the selected bot
async fn async_main(cli: Cli) -> BotResult<()> {
    // Credentials are validated before any network call
    config::load_env_file(&cli.config);
    let credentials = RedditCredentials::from_env()?;
    let client = RedditClient::login(&credentials).await?;

    match cli.command {
        Command::Track {
            subreddits,
            limit,
            storage,
        } => {
            info!(
                target: CONSOLE_TARGET,
                subreddits = %subreddits.join(","),
                limit,
                storage = %storage.display(),
                "Starting ban tracker"
            );

            let store = HistoryStore::load(storage).await;
            let tracker = BanTracker::new(client, store, limit);
            let summary = tracker.run(&subreddits, &mut std::io::stdout()).await?;

            info!(
                target: CONSOLE_TARGET,
                fetched = summary.fetched,
                new = summary.new_reported,
                "Ban tracker run complete"
            );
        }
        Command::Mute {
            subreddits,
            limit,
            cache,
            rule,
            dry_run,
        } => {
            let mut config = MuteConfig::from_env();
            if let Some(rule) = rule {
                config.target_rule = rule;
            }
            if let Some(limit) = limit {
                config.max_conversations_per_run = limit;
            }
            config.dry_run = config.dry_run || dry_run;

            info!(
                target: CONSOLE_TARGET,
                subreddits = %subreddits.join(","),
                rule = %config.target_rule,
                dry_run = config.dry_run,
                cache = %cache.display(),
                "Starting mute bot"
            );

            let cache = ConversationCache::load(cache, config.cache_retention_days).await;
            let bot = MuteBot::new(client, cache, config);
            let summary = bot.run(&subreddits).await?;

            println!("\nResults:");
            for (subreddit, count) in &summary.results {
                println!("  r/{subreddit}: {count} conversations processed");
            }
            println!("\nTotal: {} conversations processed", summary.total);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("Error initializing logging: {err}");
    }

    // Run the async main function
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
        .block_on(async_main(cli));

    // Handle any errors that occurred during execution
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
