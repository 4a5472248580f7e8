//! Cross-Venue Hedger - Main Entry Point
//!
//! Paper trading by default; `--live` or `LIVE_TRADING=true` sends real orders.

use anyhow::{Context, Result};
use clap::Parser;
use cross_venue_hedger::config::{Config, VenueConfig, VenueKind};
use cross_venue_hedger::exchange::{
    BinanceFuturesClient, OrderSide, PaperVenue, QueryParamDecorator, RequestDecorator, Venue,
    VenueRole,
};
use cross_venue_hedger::hedge::{HedgeRoundOrchestrator, ReportSink};
use cross_venue_hedger::notify::{LogReportSink, MultiSink, TelegramReporter};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Cross-Venue Hedger CLI
#[derive(Parser, Debug)]
#[command(name = "cross-venue-hedger")]
#[command(version, about = "Maker/taker hedge rounds across two futures venues")]
struct Cli {
    /// Base asset to trade; repeat or comma separate for several (e.g. BTC,ETH)
    #[arg(long = "ticker", value_delimiter = ',')]
    tickers: Vec<String>,

    /// Order quantity per round, in contract units
    #[arg(long)]
    size: Option<Decimal>,

    /// Number of rounds [config default: 10]
    #[arg(long = "iter")]
    iterations: Option<u32>,

    /// Seconds without a maker fill before a stall warning [config default: 10]
    #[arg(long)]
    fill_timeout: Option<u64>,

    /// Maker direction of the first round: buy or sell [config default: buy]
    #[arg(long)]
    start_side: Option<OrderSide>,

    /// Seconds to hold the hedged position [config default: 60]
    #[arg(long)]
    holding_time: Option<u64>,

    /// Trade with real orders on both venues
    #[arg(long)]
    live: bool,
}

/// Trading mode: Live (real money) or Paper.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TradingMode {
    Live,
    Paper,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    info!("╔════════════════════════════════════════════════════════════╗");
    info!(
        "║            Cross-Venue Hedger v{}                       ║",
        env!("CARGO_PKG_VERSION")
    );
    info!("╚════════════════════════════════════════════════════════════╝");

    let trading_mode =
        if cli.live || std::env::var("LIVE_TRADING").unwrap_or_default() == "true" {
            warn!("⚠️  LIVE TRADING MODE - Real money at risk!");
            TradingMode::Live
        } else {
            info!("📝 PAPER TRADING MODE - orders stay in process");
            TradingMode::Paper
        };

    let mut config = Config::load()?;
    apply_cli(&mut config, &cli);
    if trading_mode == TradingMode::Live {
        config.maker.kind = VenueKind::Live;
        config.taker.kind = VenueKind::Live;
    }
    config.validate().context("Invalid configuration")?;
    log_config(&config);

    let maker = build_venue(VenueRole::Maker, &config.maker)?;
    let taker = build_venue(VenueRole::Taker, &config.taker)?;
    let sink = build_sink(&config)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Shutdown signal received, finishing in-flight calls");
        stop_clone.store(true, Ordering::SeqCst);
    });

    // Every contract must resolve before the first order goes out
    let mut bots = Vec::with_capacity(config.hedge.tickers.len());
    for ticker in &config.hedge.tickers {
        let bot = HedgeRoundOrchestrator::build(
            ticker,
            &config,
            maker.clone(),
            taker.clone(),
            sink.clone(),
            stop.clone(),
        )
        .await
        .with_context(|| format!("Setup failed for {}", ticker))?;
        bots.push(bot);
    }

    info!("🚀 Starting {} hedge task(s)...", bots.len());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut tasks = JoinSet::new();
    for mut bot in bots {
        tasks.spawn(async move { bot.run().await });
    }

    let mut failed = false;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(summary) => info!(
                ticker = %summary.ticker,
                rounds = summary.rounds_completed,
                cumulative_wear = %summary.cumulative_wear,
                total_volume = %summary.total_volume,
                stopped = summary.stopped,
                "🏁 Ticker finished"
            ),
            Err(e) => {
                error!(error = %e, "Hedge task panicked");
                failed = true;
            }
        }
    }

    info!("👋 Cross-Venue Hedger shutdown complete");
    anyhow::ensure!(!failed, "one or more hedge tasks failed");
    Ok(())
}

/// Override the loaded hedge section with whatever was given on the command line.
fn apply_cli(config: &mut Config, cli: &Cli) {
    let tickers: Vec<String> = cli
        .tickers
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if !tickers.is_empty() {
        config.hedge.tickers = tickers;
    }
    if let Some(size) = cli.size {
        config.hedge.order_quantity = size;
    }
    if let Some(iterations) = cli.iterations {
        config.hedge.iterations = iterations;
    }
    if let Some(secs) = cli.fill_timeout {
        config.hedge.fill_timeout_secs = secs;
    }
    if let Some(side) = cli.start_side {
        config.hedge.start_side = side;
    }
    if let Some(secs) = cli.holding_time {
        config.hedge.holding_time_secs = secs;
    }
}

fn build_venue(role: VenueRole, config: &VenueConfig) -> Result<Arc<dyn Venue>> {
    let decorators: Vec<Arc<dyn RequestDecorator>> = config
        .query_params
        .iter()
        .map(|rule| {
            Arc::new(QueryParamDecorator::new(
                rule.path_contains.as_str(),
                rule.key.as_str(),
                rule.value.as_str(),
            )) as Arc<dyn RequestDecorator>
        })
        .collect();

    let client = BinanceFuturesClient::new(role.to_string(), config, decorators)
        .with_context(|| format!("Failed to create {} client", role))?;

    match config.kind {
        VenueKind::Live => {
            info!("🔌 [INIT] {} venue: live {}", role, config.base_url);
            Ok(Arc::new(client))
        }
        VenueKind::Paper => {
            info!("📝 [INIT] {} venue: paper, quotes from {}", role, config.base_url);
            Ok(Arc::new(PaperVenue::with_quote_source(
                format!("paper-{}", role),
                Arc::new(client),
            )))
        }
    }
}

fn build_sink(config: &Config) -> Result<Arc<dyn ReportSink>> {
    let telegram = TelegramReporter::new(&config.telegram)?;
    if telegram.is_active() {
        info!("📨 [INIT] Telegram round reports enabled");
    }
    let sink = MultiSink::new()
        .with(Arc::new(LogReportSink))
        .with(Arc::new(telegram));
    Ok(Arc::new(sink))
}

/// Initialize logging to stdout and an hourly rolling file.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "hedger.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("cross_venue_hedger=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    let hedge = &config.hedge;
    info!("📋 Configuration:");
    info!("   Tickers: {}", hedge.tickers.join(", "));
    info!("   Order Quantity: {}", hedge.order_quantity);
    info!("   Rounds: {}", hedge.iterations);
    info!("   Start Side: {}", hedge.start_side);
    info!("   Holding Time: {}s", hedge.holding_time_secs);
    info!("   Fill Stall Warning: {}s", hedge.fill_timeout_secs);
    info!("   Chase Interval: {}ms", hedge.chase_interval_ms);
    info!(
        "   Maker Contract: {} | Taker Contract: {}",
        config.maker.symbol_format, config.taker.symbol_format
    );
    info!(
        "   Retries: {} attempts (market orders: {})",
        config.retry.max_attempts, config.retry.market_order_attempts
    );
}
