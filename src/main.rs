use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use espot_planner::dashboard::{self, AppState};
use espot_planner::{plan, AppConfig, EndDay, PlanRequest, PriceFeed};

#[derive(Parser)]
#[command(name = "espot-planner")]
#[command(about = "Find the cheapest hours to run an appliance", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web dashboard (default)
    Serve,

    /// Print the best start time for the upcoming prices
    Plan {
        /// Consecutive hours the appliance needs
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=24))]
        hours: u8,

        /// Latest hour the run may end in
        #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u8).range(1..=24))]
        max_end_hour: u8,

        /// Day the run must finish on
        #[arg(long, value_enum, default_value_t = EndDay::Tomorrow)]
        end_day: EndDay,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("espot_planner=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;
    let feed = PriceFeed::new(config.feed_config()).context("failed to create http client")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, feed).await,
        Commands::Plan {
            hours,
            max_end_hour,
            end_day,
        } => {
            let request = PlanRequest {
                hours,
                max_end_hour,
                end_day,
            };
            print_plan(&config, &feed, &request).await
        }
    }
}

async fn serve(config: AppConfig, feed: PriceFeed) -> Result<()> {
    let state = Arc::new(AppState::new(feed, config.timezone));
    let app = dashboard::router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    info!(zone = %config.zone, "dashboard listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received, stopping");
}

async fn print_plan(config: &AppConfig, feed: &PriceFeed, request: &PlanRequest) -> Result<()> {
    request.validate()?;
    let now = Utc::now().with_timezone(&config.timezone).naive_local();

    let series = feed.fetch_upcoming(now).await?;
    let plan = plan(&series, request, now.date())?;

    println!("Zone {}", config.zone);
    println!("Best time to start:     {}", plan.start_label());
    println!("Average price in SEK:   {}", plan.average_label());
    println!("Better than average:    {}", plan.better_than_average_label());
    println!("{}", plan.summary());
    println!();

    for point in &series {
        let marker = if plan.window.contains(point) { "*" } else { " " };
        println!(
            "{marker} {}  {:>8.2}",
            point.starts_at().format("%Y-%m-%d %H:%M"),
            point.price_sek
        );
    }

    Ok(())
}
