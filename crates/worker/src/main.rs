use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use stockpulse_core::config::Settings;
use stockpulse_core::digest::email::{DigestDispatcher, ResendClient};
use stockpulse_core::domain::recommendation::Action;
use stockpulse_core::engine::ScoringPolicy;
use stockpulse_core::llm::xai::XaiClient;
use stockpulse_core::market::yahoo::YahooChartClient;
use stockpulse_core::market::QuoteProvider;
use stockpulse_core::portfolio::{self, Portfolio};
use stockpulse_core::time::us_market;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "stockpulse_worker", about = "Daily portfolio sentiment digest")]
struct Args {
    /// Portfolio file. Falls back to PORTFOLIO_CONFIG_PATH, then config/portfolio.json.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Send a test email and probe one price lookup, then exit.
    #[arg(short = 't', long)]
    test: bool,

    /// Run the whole pipeline but write the HTML digest to disk instead of emailing it.
    #[arg(short = 'd', long)]
    dry_run: bool,

    /// Where dry runs write their HTML.
    #[arg(long, default_value = "out")]
    output_dir: PathBuf,

    /// Write a sample portfolio file to the config path and exit.
    #[arg(long)]
    create_sample: bool,

    /// Overwrite an existing file with --create-sample.
    #[arg(long, requires = "create_sample")]
    force: bool,

    /// Used when RUST_LOG is unset.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let settings = Settings::from_env();
    let _sentry_guard = init_sentry(&settings);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.directive()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let res = run(&args, &settings).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "digest run failed");
    }
    res
}

async fn run(args: &Args, settings: &Settings) -> anyhow::Result<()> {
    let config_path = resolve_config_path(args.config.as_deref(), settings);

    if args.create_sample {
        portfolio::write_sample(&config_path, args.force)?;
        tracing::info!(path = %config_path.display(), "wrote sample portfolio");
        return Ok(());
    }

    if args.test {
        return run_test_mode(settings, &config_path).await;
    }

    run_digest_mode(args, settings, &config_path).await
}

fn resolve_config_path(arg: Option<&Path>, settings: &Settings) -> PathBuf {
    arg.map(Path::to_path_buf)
        .or_else(|| settings.portfolio_config_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(portfolio::DEFAULT_PATH))
}

async fn run_test_mode(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    tracing::info!("test mode: checking email delivery and price data");

    let portfolio = Portfolio::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let mailer = ResendClient::from_settings(settings)?;
    let to = settings.resolve_recipient(portfolio.email.as_deref())?;
    let email = stockpulse_core::digest::render_test_email(chrono::Utc::now())?;
    let id = mailer.send(to, &email).await.context("test email failed")?;
    tracing::info!(%to, %id, "test email sent");

    let quotes = YahooChartClient::from_env()?;
    let symbol = portfolio
        .symbols()
        .next()
        .context("portfolio has no holdings")?;
    let price = quotes
        .get_price(symbol)
        .await
        .context("price data probe failed")?;
    tracing::info!(
        %symbol,
        price = price.current_price,
        percent_change = price.percent_change,
        "price data probe ok"
    );

    Ok(())
}

async fn run_digest_mode(
    args: &Args,
    settings: &Settings,
    config_path: &Path,
) -> anyhow::Result<()> {
    let portfolio = Portfolio::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    tracing::info!(
        path = %config_path.display(),
        holdings = portfolio.holdings.len(),
        "portfolio loaded"
    );

    let now = chrono::Utc::now();
    let session_date = us_market::exchange_date(now);
    if !us_market::is_trading_day(session_date) {
        tracing::warn!(%session_date, "US market closed today; prices are from the last session");
    }

    // Resolve delivery before any network work so a bad setup fails fast.
    let delivery = if args.dry_run {
        None
    } else {
        let mailer = ResendClient::from_settings(settings)?;
        let to = settings
            .resolve_recipient(portfolio.email.as_deref())?
            .to_string();
        Some((mailer, to))
    };

    let sentiment = XaiClient::from_settings(settings)?;
    let quotes = YahooChartClient::from_env()?;
    let policy = ScoringPolicy::from_env();
    tracing::info!(model = sentiment.model(), ?policy, "starting digest run");

    let report = stockpulse_core::pipeline::run_digest(
        &portfolio.holdings,
        &quotes,
        &sentiment,
        &policy,
        now,
    )
    .await?;

    let summary = &report.summary;
    tracing::info!(
        overall_score = summary.overall_score,
        outlook = summary.overall_label.as_str(),
        buy = summary.count(Action::Buy),
        hold = summary.count(Action::Hold),
        sell = summary.count(Action::Sell),
        failed = report.failed.len(),
        sentiment_fallbacks = report.sentiment_fallbacks,
        "portfolio scored"
    );

    let digest = stockpulse_core::digest::render_digest(summary, &report.failed_symbols())?;

    match delivery {
        None => {
            let path = write_dry_run(&args.output_dir, &digest.html, now)?;
            tracing::info!(path = %path.display(), subject = %digest.subject, "dry run: digest saved");
        }
        Some((mailer, to)) => {
            let id = mailer.send(&to, &digest).await?;
            tracing::info!(%to, %id, "digest sent");
        }
    }

    Ok(())
}

fn write_dry_run(
    dir: &Path,
    html: &str,
    at: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("digest_{}.html", at.format("%Y%m%d_%H%M%S")));
    std::fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
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
