//! tankrecon - Reconcile fuel-cabinet inventory against billed orders

use chrono::Utc;
use clap::Parser;
use futures::TryStreamExt;
use tankrecon::{
    cli::{Cli, Command},
    engine::{DeviceRequest, Reconciler},
    error::Result,
    output::get_formatter,
    overrides::BarrelOverrides,
    period::DateRange,
    period_types::Totals,
    provider::ReadingSource,
    timezone::TimezoneConfig,
    types::{DeviceCode, RawReading},
};
use tankrecon_provider_file::DataLoader;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fetch rows for every device; a device that fails to load is skipped
async fn load_requests<S: ReadingSource + ?Sized>(
    source: &S,
    devices: &[DeviceCode],
    range: DateRange,
    cli: &Cli,
    overrides: &BarrelOverrides,
) -> Vec<DeviceRequest> {
    let mut requests = Vec::with_capacity(devices.len());
    for device in devices {
        let readings: Result<Vec<RawReading>> = source.load_readings(device).try_collect().await;
        let readings = match readings {
            Ok(readings) => readings,
            Err(e) => {
                warn!("Skipping device {}: {}", device, e);
                continue;
            }
        };
        let offline = match source.load_offline(device).await {
            Ok(offline) => offline,
            Err(e) => {
                warn!("Failed to load offline records for {}: {}", device, e);
                Vec::new()
            }
        };

        requests.push(
            DeviceRequest::new(device.clone(), range, readings)
                .with_offline(offline)
                .with_barrel(cli.barrel_plan(overrides, device))
                .with_customer_name(overrides.customer(device).map(str::to_string)),
        );
    }
    requests
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first to check for quiet flag
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tankrecon=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let tz_config = TimezoneConfig::from_cli(cli.timezone.as_deref(), cli.utc)?;
    info!("Using timezone: {}", tz_config.display_name());

    let today = Utc::now().with_timezone(&tz_config.tz).date_naive();
    let range = cli.date_range(today)?;

    let overrides = match &cli.overrides {
        Some(path) => BarrelOverrides::load(path)?,
        None => BarrelOverrides::default(),
    };

    let loader = DataLoader::new(&cli.data_dir)?;
    let devices = match cli.device_filter() {
        Some(devices) => devices,
        None => loader.devices().await?,
    };
    info!(
        "Running {:?} report for {} devices, {} to {}",
        cli.command,
        devices.len(),
        range.start(),
        range.end()
    );

    let requests = load_requests(&loader, &devices, range, &cli, &overrides).await;
    let reconciler = Reconciler::new(cli.engine_config(tz_config))?;

    let mut reports = Vec::with_capacity(requests.len());
    for (request, result) in requests.iter().zip(reconciler.reconcile_batch(&requests)) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => warn!("Failed to reconcile {}: {}", request.device, e),
        }
    }

    let color = !cli.json && is_terminal::is_terminal(std::io::stdout());
    let formatter = get_formatter(cli.json, color);

    match cli.command {
        Command::Daily | Command::Monthly => {
            println!("{}", formatter.format_reports(&reports));
        }
        Command::Summary => {
            let now = Utc::now();
            let summaries: Vec<_> = reports
                .iter()
                .map(|report| reconciler.summarize(report, now))
                .collect();
            let totals = Totals::from_summaries(&summaries);
            println!("{}", formatter.format_summary(&summaries, &range, &totals));
        }
    }

    Ok(())
}
