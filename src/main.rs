use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use dealer_media::normalize::{
    compress_data_url_if_needed, normalize_with_preset, prepare_logo_upload,
};
use dealer_media::{
    CaptureAdapter, EventBus, EventBusError, EventFilter, JsonFileStore, MediaConfig,
    MockDeviceProvider, ProfileRecord, QuotaAwareSaver,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dealer-media")]
#[command(about = "Media pipeline tools for the dealership client")]
#[command(version)]
#[command(long_about = "Operator tools around the dealership media pipeline: run the image \
normalizer on a file, push a profile through the quota-aware store, or drive a mock capture \
device end to end.")]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "dealer-media.toml",
        help = "Path to TOML configuration file"
    )]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resize and re-encode an image file as JPEG
    Normalize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Preset::Profile)]
        preset: Preset,
    },
    /// Save a profile JSON file into a file-backed store through the quota cascade
    SaveProfile {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        profile: PathBuf,
    },
    /// Take a still and a short clip from the mock camera
    CaptureDemo {
        #[arg(long, default_value = "./captures")]
        output: PathBuf,
        #[arg(long, default_value_t = 3)]
        seconds: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Preset {
    Profile,
    Logo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting dealer-media v{}", env!("CARGO_PKG_VERSION"));

    let config = match MediaConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    match args.command {
        Some(Command::Normalize {
            input,
            output,
            preset,
        }) => run_normalize(&config, input, output, preset).await,
        Some(Command::SaveProfile { store, profile }) => {
            run_save_profile(&config, store, profile).await
        }
        Some(Command::CaptureDemo { output, seconds }) => {
            run_capture_demo(&config, output, seconds).await
        }
        None => {
            println!("No command given; see --help");
            Ok(())
        }
    }
}

async fn run_normalize(
    config: &MediaConfig,
    input: PathBuf,
    output: PathBuf,
    preset: Preset,
) -> Result<()> {
    let raw = Bytes::from(
        tokio::fs::read(&input)
            .await
            .with_context(|| format!("reading {}", input.display()))?,
    );
    let raw_len = raw.len();

    let normalized = match preset {
        Preset::Profile => normalize_with_preset(raw, &config.normalizer.profile).await,
        Preset::Logo => prepare_logo_upload(raw, &config.normalizer).await?,
    };

    tokio::fs::write(&output, &normalized)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        "Normalized {} ({} bytes) -> {} ({} bytes)",
        input.display(),
        raw_len,
        output.display(),
        normalized.len()
    );
    println!("{} -> {} bytes", raw_len, normalized.len());
    Ok(())
}

async fn run_save_profile(config: &MediaConfig, store: PathBuf, profile: PathBuf) -> Result<()> {
    let raw = tokio::fs::read_to_string(&profile)
        .await
        .with_context(|| format!("reading {}", profile.display()))?;
    let mut record: ProfileRecord = serde_json::from_str(&raw).context("parsing profile")?;

    if let Some(image) = record.profile_image.take() {
        record.profile_image =
            Some(compress_data_url_if_needed(image, &config.normalizer.profile).await);
    }

    let mut store = JsonFileStore::open(&store, config.persistence.capacity_bytes)?;
    let saver = QuotaAwareSaver::new(config.persistence.clone());

    match saver.save(&mut store, &record) {
        Ok(report) => {
            println!(
                "Saved profile {} at tier {:?} (image dropped: {}, evicted: {})",
                record.id,
                report.tier,
                report.image_dropped,
                report.evicted_keys.len()
            );
            Ok(())
        }
        Err(e) => {
            error!("Profile save failed: {}", e);
            Err(e.into())
        }
    }
}

async fn run_capture_demo(config: &MediaConfig, output: PathBuf, seconds: u64) -> Result<()> {
    tokio::fs::create_dir_all(&output)
        .await
        .with_context(|| format!("creating {}", output.display()))?;

    let events = EventBus::default();
    let mut receiver = events.subscribe_filtered(EventFilter::capture(), "capture-demo");
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => println!("{}", event.description()),
                Err(EventBusError::Lagged { .. }) => continue,
                Err(EventBusError::ChannelClosed) => break,
            }
        }
    });

    let provider = MockDeviceProvider::new().with_resolution(640, 480);
    let adapter = CaptureAdapter::new(Arc::new(provider), config.capture.clone(), events);

    let session = adapter.open_photo().await?;
    let still = session.snapshot().await?;
    let still_path = output.join(&still.file_name);
    tokio::fs::write(&still_path, &still.data).await?;
    println!("Wrote {} ({} bytes)", still_path.display(), still.data.len());

    let session = adapter.open_video().await?;
    session.start_recording()?;
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    // The ceiling may already have ended the clip
    let clip = match session.take_clip() {
        Some(clip) => clip,
        None => session.stop_recording()?,
    };
    let clip_path = output.join(&clip.file_name);
    tokio::fs::write(&clip_path, &clip.data).await?;
    println!(
        "Wrote {} ({} bytes, {}s)",
        clip_path.display(),
        clip.data.len(),
        clip.duration_seconds
    );

    adapter.close_active();
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dealer_media={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# dealer-media configuration file");
    println!("# Defaults for every option");
    println!("# DEALER_MEDIA_<SECTION>__<KEY> environment variables override them");
    println!();
    print!("{}", MediaConfig::default().to_toml()?);
    Ok(())
}
