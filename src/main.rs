use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use astrocam::app::EXIT_FAILURE;
use astrocam::config::ConfigOverrides;
use astrocam::{AstroConfig, SessionOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "astrocam")]
#[command(about = "Long-exposure bulb capture for tethered cameras")]
#[command(version)]
#[command(long_about = "Drives a tethered camera through a series of bulb exposures, \
holding the shutter open for the requested duration, downloading each new frame into \
<target>/<kind>/ and reporting progress on a single status line. Ctrl+C closes the \
shutter before exiting.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "astrocam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Number of frames to capture (0 runs until interrupted)
    #[arg(short, long, value_name = "COUNT")]
    frames: Option<u32>,

    /// Directory that receives the downloaded frames
    #[arg(short, long, value_name = "DIR")]
    target: Option<String>,

    /// Exposure duration in seconds
    #[arg(long, value_name = "SECONDS")]
    duration: Option<u32>,

    /// Shutter speed setting sent to the camera
    #[arg(long, value_name = "SPEED")]
    shutter: Option<String>,

    /// Aperture f-number
    #[arg(short, long, value_name = "F")]
    aperture: Option<f64>,

    /// ISO sensitivity
    #[arg(short, long, value_name = "ISO")]
    iso: Option<u32>,

    /// Frame kind: lights or darks
    #[arg(short, long, value_name = "KIND")]
    kind: Option<String>,

    /// Leave captured files on the camera after download
    #[arg(long)]
    keep: bool,

    /// Camera name to connect to
    #[arg(short, long, value_name = "NAME")]
    name: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit without touching the camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            frames: self.frames,
            target: self.target.clone(),
            duration_seconds: self.duration,
            shutter: self.shutter.clone(),
            aperture: self.aperture,
            iso: self.iso,
            kind: self.kind.clone(),
            keep: self.keep,
            name: self.name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // Dropping the guard flushes the file writer
    let log_guard = init_logging(&args)?;

    info!("Starting astrocam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Load configuration, then let command line flags override it
    let mut config = match AstroConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    config.apply_overrides(&args.overrides());

    // Validate configuration if requested
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
                std::process::exit(EXIT_FAILURE);
            }
        }
    }

    // Run the session; the orchestrator handles interrupts itself
    let mut orchestrator = SessionOrchestrator::new(config);
    let reason = orchestrator.run().await;
    let exit_code = reason.exit_code();

    info!("astrocam exited with code: {}", exit_code);
    drop(log_guard);

    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
    };

    // Pick the level from the verbosity flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // RUST_LOG wins over the flags
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("astrocam={}", log_level)));

    // Console layer on stderr; stdout belongs to the status line
    let console_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![console_layer];

    // Optional plain-text log file, rotated daily
    let mut guard = None;

    if let Some(dir) = &args.log_dir {
        std::fs::create_dir_all(dir)?;
        let appender = tracing_appender::rolling::daily(dir, "astrocam.log");
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed(),
        );
        guard = Some(file_guard);
    }

    // Install the subscriber
    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# astrocam configuration file");
    println!("# Every value can also be set with ASTROCAM_<SECTION>__<KEY>, e.g. ASTROCAM_EXPOSURE__FRAMES=10");
    println!();

    let rendered = toml::to_string_pretty(&AstroConfig::default())?;
    println!("{}", rendered);

    Ok(())
}
