use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensei_core::config::Settings;
use sensei_core::dashboard::Dashboard;
use sensei_core::domain::recommendation::{AnalyzedStock, ExplainKind};
use sensei_core::domain::TickerSymbol;
use sensei_core::flows::Services;
use sensei_core::llm::anthropic::AnthropicBackend;
use sensei_core::storage::{JsonFileStore, Watchlist};

mod repl;

#[derive(Debug, Parser)]
#[command(name = "sensei", about = "AI stock recommendations in the terminal")]
struct Args {
    /// Local store holding the watchlist. Defaults to SENSEI_STORE_PATH or .sensei/store.json.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print this week's top stock picks.
    Weekly,

    /// Get a buy/sell/hold recommendation for a ticker.
    Analyze { ticker: String },

    /// Ask for a detailed rationale behind a buy or sell call.
    Explain {
        ticker: String,

        #[arg(long, default_value = "buy")]
        recommendation: ExplainKind,
    },

    /// Show or edit the watchlist.
    Watchlist {
        #[command(subcommand)]
        action: Option<WatchlistAction>,
    },

    /// Interactive dashboard.
    Dashboard,
}

#[derive(Debug, Subcommand)]
enum WatchlistAction {
    List,
    Toggle { ticker: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let settings = Settings::from_env();
    let _sentry_guard = settings.as_ref().ok().and_then(init_sentry);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let store = JsonFileStore::new(
        args.store
            .clone()
            .unwrap_or_else(Settings::store_path_from_env),
    );

    let result = run(args.command, settings, store).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "command failed");
    }
    result
}

/// Only the backend-bound commands need valid settings; `watchlist` runs
/// even when they failed to load.
async fn run(
    command: Command,
    settings: anyhow::Result<Settings>,
    store: JsonFileStore,
) -> anyhow::Result<()> {
    match command {
        Command::Watchlist { action } => {
            run_watchlist(action.unwrap_or(WatchlistAction::List), &store)
        }
        Command::Weekly => {
            let services = services(settings)?;
            let weekly = services
                .weekly
                .generate_weekly_top()
                .await
                .context("failed to generate weekly top stocks")?;
            println!("{}", repl::render_weekly(&weekly));
            Ok(())
        }
        Command::Analyze { ticker } => {
            let ticker = TickerSymbol::parse_search(&ticker)?;
            let services = services(settings)?;
            let analysis = services
                .recommendations
                .analyze(&ticker)
                .await
                .with_context(|| format!("could not analyze stock \"{ticker}\""))?;
            println!("{}", repl::render_analysis(&AnalyzedStock::new(ticker, analysis)));
            Ok(())
        }
        Command::Explain {
            ticker,
            recommendation,
        } => {
            let ticker = TickerSymbol::parse_search(&ticker)?;
            let services = services(settings)?;
            let explanation = services
                .explainer
                .explain(&ticker, recommendation)
                .await
                .context("could not load detailed rationale")?;
            println!("{ticker} ({recommendation})\n\n{}", explanation.rationale);
            Ok(())
        }
        Command::Dashboard => {
            let dashboard = Arc::new(Dashboard::new(services(settings)?, Arc::new(store)));
            repl::run(dashboard).await
        }
    }
}

fn services(settings: anyhow::Result<Settings>) -> anyhow::Result<Services> {
    let backend = AnthropicBackend::from_settings(&settings?)?;
    Ok(Services::new(Arc::new(backend)))
}

fn run_watchlist(action: WatchlistAction, store: &JsonFileStore) -> anyhow::Result<()> {
    let mut watchlist = Watchlist::load(store);
    match action {
        WatchlistAction::List => {}
        WatchlistAction::Toggle { ticker } => {
            let ticker = TickerSymbol::parse_search(&ticker)?;
            let watched = watchlist.toggle(ticker.clone());
            watchlist.persist(store);
            tracing::info!(%ticker, watched, path = %store.path().display(), "watchlist updated");
        }
    }
    println!("{}", repl::render_watchlist(&watchlist));
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
