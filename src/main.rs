use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;
use tokio::sync::mpsc;
use tokio::time::Duration;

use rallyboard::config::AppConfig;
use rallyboard::engine::LeaderboardEngine;
use rallyboard::leaderboard::{GroupingDimension, SelectionPolicy};
use rallyboard::render::{render_attempts, render_snapshot, render_standings};
use rallyboard::scheduler::RefreshScheduler;
use rallyboard::transport::HttpQueryTransport;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct BackendArgs {
    #[arg(short, long)]
    endpoint: Option<String>,

    #[arg(short, long, value_enum)]
    grouping: Option<GroupingDimension>,

    #[arg(short, long, value_enum)]
    policy: Option<SelectionPolicy>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the timing backend and print the leaderboard on every refresh
    Watch {
        #[command(flatten)]
        backend: BackendArgs,

        #[arg(short, long)]
        interval: Option<u64>,

        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Print one leaderboard snapshot, or one driver's attempt history
    Show {
        #[command(flatten)]
        backend: BackendArgs,

        #[arg(short, long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        driver: Option<String>,
    },
    /// Print a championship's points standings
    Standings {
        #[command(flatten)]
        backend: BackendArgs,

        #[arg(short, long)]
        series: Option<i64>,
    },
}

fn effective_config(backend: &BackendArgs) -> AppConfig {
    let mut config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(endpoint) = &backend.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(grouping) = backend.grouping {
        config.grouping = grouping;
    }
    if let Some(policy) = backend.policy {
        config.selection_policy = policy;
    }
    config
}

fn engine_for(config: &AppConfig) -> LeaderboardEngine<HttpQueryTransport> {
    LeaderboardEngine::new(
        HttpQueryTransport::new(&config.endpoint),
        config.grouping,
        config.selection_policy,
    )
}

async fn watch(config: AppConfig, interval_ms: u64, date: NaiveDate) {
    let engine = engine_for(&config);
    let (scheduler, mut snapshot_rx) = RefreshScheduler::new(engine, date);
    // no interactive commands on the terminal yet, but the channel keeps the
    // scheduler loop alive
    let (_command_tx, command_rx) = mpsc::channel(8);
    info!(
        "Watching {} every {}ms starting from {date}",
        config.endpoint, interval_ms
    );
    tokio::spawn(scheduler.run(command_rx, Duration::from_millis(interval_ms)));

    while snapshot_rx.changed().await.is_ok() {
        let text = render_snapshot(&snapshot_rx.borrow_and_update());
        println!("{text}");
    }
}

async fn show(config: AppConfig, date: NaiveDate, driver: Option<String>) {
    let engine = engine_for(&config);
    match driver {
        Some(driver) => {
            let attempts = engine.compute_attempt_history(date, &driver).await;
            println!("{}", render_attempts(&driver, &attempts));
        }
        None => {
            let snapshot = engine.compute_daily_leaderboard(date, None).await;
            println!("Current driver: {}", engine.current_driver().await);
            println!("{}", render_snapshot(&snapshot));
        }
    }
}

async fn standings(config: AppConfig, series: Option<i64>) {
    let Some(series) = series.or(config.championship_id) else {
        eprintln!("No championship series configured; pass --series");
        return;
    };
    let engine = engine_for(&config);
    println!("{}", render_standings(&engine.championship_standings(series).await));
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let today = Local::now().date_naive();
    match cli.command {
        Commands::Watch {
            backend,
            interval,
            date,
        } => {
            let config = effective_config(&backend);
            let interval_ms = interval.unwrap_or(config.refresh_rate_ms);
            watch(config, interval_ms, date.unwrap_or(today)).await;
        }
        Commands::Show {
            backend,
            date,
            driver,
        } => {
            let config = effective_config(&backend);
            show(config, date.unwrap_or(today), driver).await;
        }
        Commands::Standings { backend, series } => {
            let config = effective_config(&backend);
            standings(config, series).await;
        }
    }
}
