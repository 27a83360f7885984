use anyhow::Context;
use sensei_core::dashboard::{Dashboard, DashboardState, RationaleStatus, Severity, View};
use sensei_core::domain::recommendation::{AnalyzedStock, WeeklyTopStocks};
use sensei_core::domain::{DisplayCategory, TickerSymbol};
use sensei_core::storage::Watchlist;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

const HELP: &str = "\
commands:
  open <TICKER|N>    analyze a ticker (N = row of the weekly list)
  search <TICKER>    analyze a typed ticker (max 5 characters)
  explain [TICKER]   detailed rationale for a weekly pick, or for the stock in view
  star [TICKER]      toggle a ticker (default: the stock in view) in the watchlist
  back               return to the weekly list
  show               redraw
  help               this text
  quit";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Open(String),
    Search(String),
    Explain(Option<String>),
    Star(Option<String>),
    Back,
    Show,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(ReplCommand::Show);
    };
    let arg = parts.next().map(str::to_string);
    if parts.next().is_some() {
        return Err(format!("too many arguments for {verb:?}"));
    }

    let need = |arg: Option<String>| arg.ok_or_else(|| format!("{verb} needs a ticker"));
    match verb.to_ascii_lowercase().as_str() {
        "open" | "o" => need(arg).map(ReplCommand::Open),
        "search" | "s" => need(arg).map(ReplCommand::Search),
        "explain" | "e" => Ok(ReplCommand::Explain(arg)),
        "star" | "w" => Ok(ReplCommand::Star(arg)),
        "back" | "b" => Ok(ReplCommand::Back),
        "show" => Ok(ReplCommand::Show),
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "q" | "exit" => Ok(ReplCommand::Quit),
        other => Err(format!("unknown command {other:?}; try help")),
    }
}

/// Resolves `open`/`star`/`explain` arguments: a 1-based weekly row or a ticker.
fn resolve_ticker(state: &DashboardState, arg: &str) -> Result<TickerSymbol, String> {
    if let Ok(row) = arg.parse::<usize>() {
        let stocks = state.weekly.as_ref().map(|w| w.stocks.as_slice()).unwrap_or(&[]);
        return row
            .checked_sub(1)
            .and_then(|i| stocks.get(i))
            .ok_or_else(|| format!("no weekly row {row}"))
            .and_then(|t| TickerSymbol::new(t.as_str()).map_err(|e| e.to_string()));
    }
    TickerSymbol::new(arg.to_uppercase()).map_err(|e| e.to_string())
}

pub async fn run(dashboard: Arc<Dashboard>) -> anyhow::Result<()> {
    dashboard
        .load_weekly()
        .await
        .context("failed to load weekly top stocks")?;
    println!("{}\n\n{HELP}", render(&dashboard.snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(ReplCommand::Quit) => break,
                    Ok(ReplCommand::Help) => {
                        println!("{HELP}");
                        continue;
                    }
                    Ok(cmd) => {
                        if let Err(msg) = dispatch(&dashboard, cmd, &mut tasks) {
                            eprintln!("{msg}");
                        }
                    }
                    Err(msg) => {
                        eprintln!("{msg}");
                        continue;
                    }
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "dashboard task failed");
                }
            }
        }

        for note in dashboard.dismiss_notifications() {
            let tag = match note.severity {
                Severity::Warning => "warning",
                Severity::Destructive => "error",
            };
            eprintln!("[{tag}] {}: {}", note.title, note.description);
        }
        println!("{}", render(&dashboard.snapshot()));
    }

    if !tasks.is_empty() {
        tracing::info!(pending = tasks.len(), "exiting with calls still in flight");
    }
    Ok(())
}

fn dispatch(
    dashboard: &Arc<Dashboard>,
    cmd: ReplCommand,
    tasks: &mut JoinSet<()>,
) -> Result<(), String> {
    let state = dashboard.snapshot();
    let d = dashboard.clone();
    match cmd {
        ReplCommand::Open(arg) => {
            let ticker = resolve_ticker(&state, &arg)?;
            tasks.spawn(async move { d.select_ticker(ticker).await });
        }
        ReplCommand::Search(raw) => {
            d.set_search_input(&raw);
            tasks.spawn(async move { d.submit_search(&raw).await });
        }
        ReplCommand::Explain(Some(arg)) => {
            let ticker = resolve_ticker(&state, &arg)?;
            tasks.spawn(async move { d.explain(ticker).await });
        }
        ReplCommand::Explain(None) => {
            tasks.spawn(async move { d.explain_current().await });
        }
        ReplCommand::Star(arg) => {
            let ticker = match arg {
                Some(arg) => resolve_ticker(&state, &arg)?,
                None => state
                    .current_stock
                    .as_ref()
                    .map(|s| s.ticker.clone())
                    .ok_or("no stock in view; use star <TICKER>")?,
            };
            d.toggle_watchlist(ticker);
        }
        ReplCommand::Back => d.back(),
        ReplCommand::Show | ReplCommand::Help | ReplCommand::Quit => {}
    }
    Ok(())
}

fn star(watched: bool) -> &'static str {
    if watched {
        "*"
    } else {
        " "
    }
}

pub fn render(state: &DashboardState) -> String {
    let mut out = String::new();
    let title = match (&state.view, &state.current_stock, &state.loading) {
        (View::Weekly, _, _) => "Dashboard".to_string(),
        (View::Analysis, _, Some(pending)) => format!("Analysis: {}", pending.ticker),
        (View::Analysis, Some(stock), None) => format!("Analysis: {}", stock.ticker),
        (View::Analysis, None, None) => "Analysis".to_string(),
    };
    let _ = writeln!(out, "== {title} ==");
    let _ = writeln!(out, "{}", render_watchlist(&state.watchlist));

    if let Some(pending) = &state.loading {
        let _ = write!(out, "\nAnalyzing {}...", pending.ticker);
        return out;
    }

    match (state.view, &state.current_stock) {
        (View::Analysis, Some(stock)) => {
            let _ = write!(out, "\n{}", render_analysis(stock));
            let _ = write!(out, "\n{}", star(state.is_watched(&stock.ticker)));
        }
        _ => match &state.weekly {
            Some(weekly) => {
                let _ = writeln!(out, "\nWeekly Top 5 Stocks");
                for (i, ticker) in weekly.stocks.iter().enumerate() {
                    let (watched, status) = match TickerSymbol::new(ticker.as_str()) {
                        Ok(t) => (state.is_watched(&t), state.rationale_status(&t)),
                        Err(_) => (false, RationaleStatus::Idle),
                    };
                    let loading = match status {
                        RationaleStatus::InFlight => "  (loading rationale...)",
                        RationaleStatus::Idle => "",
                    };
                    let _ = writeln!(out, "  {}. {} {ticker}{loading}", i + 1, star(watched));
                }
                for (ticker, rationale) in state.explanations() {
                    let _ = writeln!(out, "\n{ticker} Rationale\n  {rationale}");
                }
                let _ = write!(out, "\nOverall Rationale\n  {}", weekly.rationale);
            }
            None => {
                let _ = write!(out, "\nNo weekly list loaded.");
            }
        },
    }
    out
}

pub fn render_weekly(weekly: &WeeklyTopStocks) -> String {
    let mut out = String::from("Weekly Top 5 Stocks\n");
    for (i, ticker) in weekly.stocks.iter().enumerate() {
        let _ = writeln!(out, "  {}. {ticker}", i + 1);
    }
    let _ = write!(out, "\nOverall Rationale\n  {}", weekly.rationale);
    out
}

pub fn render_analysis(stock: &AnalyzedStock) -> String {
    let badge = match stock.recommendation.display_category() {
        DisplayCategory::Positive => "+",
        DisplayCategory::Destructive => "-",
        DisplayCategory::Neutral => "~",
    };
    format!(
        "{}  [{badge} {}]\n\nAI Rationale\n  {}",
        stock.ticker,
        stock.recommendation_text.to_uppercase(),
        stock.rationale
    )
}

pub fn render_watchlist(watchlist: &Watchlist) -> String {
    if watchlist.is_empty() {
        return "Watchlist: Your watchlist is empty.".to_string();
    }
    let tickers: Vec<&str> = watchlist.iter().map(|t| t.as_str()).collect();
    format!("Watchlist: {}", tickers.join(", "))
}
