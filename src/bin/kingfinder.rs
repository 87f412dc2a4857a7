use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use kf_burgerking::{
    constants::*,
    export,
    grid::Bounds,
    sweep::{SweepConfigBuilder, SweepSummary},
    transport::HttpTransportConfig,
    HttpTransport, QueryExecutor, Registry, StoreRecord, SweepController,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "kingfinder",
    about = "Sweep a country with nearby-restaurant queries and export every open Burger King"
)]
struct Args {
    #[arg(
        short = 'e',
        long,
        env = "KINGFINDER_ENDPOINT",
        default_value = DEFAULT_RESTAURANT_SERVICE_URL,
        help = "GraphQL endpoint to query"
    )]
    endpoint: String,

    #[arg(
        long,
        env = "KINGFINDER_WARMUP_URL",
        default_value = DEFAULT_STORE_LOCATOR_URL,
        help = "Store locator page loaded once to establish a session"
    )]
    warmup_url: String,

    #[arg(long, help = "Skip loading the store locator page")]
    no_warmup: bool,

    #[arg(long, default_value = DEFAULT_UI_LANGUAGE)]
    ui_language: String,

    #[arg(long, default_value = DEFAULT_UI_REGION)]
    ui_region: String,

    #[arg(long, default_value_t = GERMANY_BOUNDS.lat_min, allow_negative_numbers = true)]
    lat_min: f64,

    #[arg(long, default_value_t = GERMANY_BOUNDS.lat_max, allow_negative_numbers = true)]
    lat_max: f64,

    #[arg(long, default_value_t = GERMANY_BOUNDS.lng_min, allow_negative_numbers = true)]
    lng_min: f64,

    #[arg(long, default_value_t = GERMANY_BOUNDS.lng_max, allow_negative_numbers = true)]
    lng_max: f64,

    #[arg(long, default_value_t = DEFAULT_LAT_STEP, help = "Grid spacing in degrees of latitude")]
    lat_step: f64,

    #[arg(long, default_value_t = DEFAULT_LNG_STEP, help = "Grid spacing in degrees of longitude")]
    lng_step: f64,

    #[arg(short = 'r', long, default_value_t = DEFAULT_SEARCH_RADIUS_METERS, help = "Search radius in meters")]
    radius: f64,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    #[arg(
        short = 'd',
        long,
        env = "KINGFINDER_DELAY_MS",
        default_value_t = DEFAULT_REQUEST_DELAY_MS,
        help = "Pause between requests in milliseconds"
    )]
    delay_ms: u64,

    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_EVERY, help = "Write a snapshot every N windows (0 disables)")]
    checkpoint_every: usize,

    #[arg(long, default_value_t = 0, help = "Extra attempts for a failed window")]
    max_retries: u32,

    #[arg(short = 'o', long, env = "KINGFINDER_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_SNAPSHOT_FILE)]
    snapshot_file: String,

    #[arg(long, default_value = DEFAULT_JSON_EXPORT_FILE)]
    json_file: String,

    #[arg(long, default_value = DEFAULT_CSV_EXPORT_FILE)]
    csv_file: String,

    #[arg(long, help = "Reload the snapshot file before sweeping")]
    resume: bool,

    #[arg(long, default_value_t = 0, help = "Grid position to start from")]
    start_index: usize,

    #[arg(long, env = "KINGFINDER_LOG", default_value = "info")]
    log_level: String,
}

fn print_sample(stores: &[StoreRecord], count: usize) {
    let mark = |flag: bool| if flag { "✓" } else { "✗" };
    let shown = count.min(stores.len());
    println!("Sample of {shown} stores:");
    for (i, store) in stores.iter().take(count).enumerate() {
        println!();
        println!("{}. {}", i + 1, store.name().unwrap_or_default());
        println!(
            "   {}, {} {}",
            store.address_text("address1").unwrap_or_default(),
            store.address_text("postalCode").unwrap_or_default(),
            store.address_text("city").unwrap_or_default(),
        );
        println!(
            "   {}, {}",
            store.text("latitude").unwrap_or_default(),
            store.text("longitude").unwrap_or_default()
        );
        println!(
            "   phone: {}",
            store.text("phoneNumber").as_deref().unwrap_or("N/A")
        );
        println!(
            "   delivery: {} | dine-in: {} | drive-thru: {}",
            mark(store.flag("hasDelivery")),
            mark(store.flag("hasDineIn")),
            mark(store.flag("hasDriveThru")),
        );
    }
    println!();
}

fn print_summary(summary: &SweepSummary) {
    println!("Unique stores found: {}", summary.unique_stores);
    println!(
        "Windows processed:   {}/{}",
        summary.windows_processed, summary.windows_total
    );
    println!("Windows failed:      {}", summary.windows_failed);
    println!("Windows truncated:   {}", summary.windows_truncated);
    println!("Records discarded:   {}", summary.discarded);
    if summary.checkpoints_failed > 0 {
        println!("Snapshots failed:    {}", summary.checkpoints_failed);
    }
    if summary.cancelled {
        println!("Sweep was interrupted, coverage is partial.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let snapshot_path = args.output_dir.join(&args.snapshot_file);
    let config = SweepConfigBuilder::default()
        .bounds(Bounds {
            lat_min: args.lat_min,
            lat_max: args.lat_max,
            lng_min: args.lng_min,
            lng_max: args.lng_max,
        })
        .lat_step(args.lat_step)
        .lng_step(args.lng_step)
        .radius_m(args.radius)
        .request_delay(Duration::from_millis(args.delay_ms))
        .checkpoint_every(args.checkpoint_every)
        .snapshot_path(snapshot_path.clone())
        .max_retries(args.max_retries)
        .start_index(args.start_index)
        .build()?;

    let registry = if args.resume {
        let registry = Registry::load(&snapshot_path)
            .await
            .with_context(|| format!("unable to resume from {}", snapshot_path.display()))?;
        tracing::info!(unique = registry.size(), start = args.start_index, "resuming sweep");
        registry
    } else {
        Registry::new()
    };

    let transport = HttpTransport::new(HttpTransportConfig {
        ui_language: args.ui_language,
        ui_region: args.ui_region,
        warmup_url: (!args.no_warmup).then_some(args.warmup_url),
        ..HttpTransportConfig::default()
    });
    let executor = QueryExecutor::new(transport, Some(&args.endpoint), args.page_size);
    let mut controller = SweepController::new(config, executor).with_registry(registry);

    let cancel = controller.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current window");
            cancel.cancel();
        }
    });

    let progress = ProgressBar::new(0);
    progress.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} points | {msg} ({eta})",
    )?);
    let summary = controller
        .run(|p| {
            progress.set_length(p.total as u64);
            progress.set_position(p.index as u64);
            progress.set_message(format!("found {} stores", p.unique_stores));
        })
        .await?;
    progress.finish();

    let registry = controller.into_registry();
    println!();
    print_summary(&summary);
    println!();
    print_sample(registry.snapshot(), 5);

    let json_path = args.output_dir.join(&args.json_file);
    let csv_path = args.output_dir.join(&args.csv_file);
    let json_result = export::write_json(&json_path, registry.snapshot()).await;
    match &json_result {
        Ok(()) => println!("Exported {} stores to {}", registry.size(), json_path.display()),
        Err(err) => tracing::error!(path = %json_path.display(), error = %err, "JSON export failed"),
    }
    let csv_result = export::write_csv(&csv_path, registry.snapshot()).await;
    match &csv_result {
        Ok(()) => println!("Exported {} stores to {}", registry.size(), csv_path.display()),
        Err(err) => tracing::error!(path = %csv_path.display(), error = %err, "CSV export failed"),
    }
    json_result.context("JSON export failed")?;
    csv_result.context("CSV export failed")?;

    Ok(())
}
