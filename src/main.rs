use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use cambridge::{
    CambridgeConfig, CameraAdapterBuilder, CameraService, MockCameraService, ViewState,
};

#[derive(Parser, Debug)]
#[command(name = "cambridge")]
#[command(about = "Camera view-model bridge demo")]
#[command(version)]
#[command(long_about = "Demonstrates the camera view-model bridge: wires a mock camera \
service into the state-projection adapter, drives a scripted sequence of user intents \
(start, flash toggle, zoom, flip, capture) and logs every observed snapshot transition.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cambridge.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration file and exit without running the demo")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Number of photo captures to perform in the demo
    #[arg(long, default_value_t = 2, help = "Number of photo captures to perform")]
    captures: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config();
        return Ok(());
    }

    init_logging(&args);

    info!("Starting cambridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match CambridgeConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate()?;

    run_demo(config, args.captures).await
}

/// Wire a mock service into the adapter and drive a scripted session.
async fn run_demo(config: CambridgeConfig, captures: u32) -> Result<()> {
    let service = Arc::new(MockCameraService::new(config));
    let adapter = CameraAdapterBuilder::new()
        .service(Arc::clone(&service) as Arc<dyn CameraService>)
        .build()?;

    // Log every snapshot transition the UI would observe
    let mut observed = adapter.observe();
    let observer = tokio::spawn(async move {
        let mut previous = ViewState::default();
        while observed.changed().await.is_ok() {
            let state = observed.borrow_and_update().clone();
            log_transition(&previous, &state);
            previous = state;
        }
    });

    adapter.start().await?;

    adapter.switch_flash();
    adapter.zoom(2.0).await?;
    adapter.flip_camera().await?;

    for i in 0..captures {
        info!("Requesting capture {}/{}", i + 1, captures);
        adapter.capture_photo().await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    service.emit_code("https://example.com/demo");
    tokio::time::sleep(Duration::from_millis(100)).await;

    adapter.switch_flash();
    adapter.stop().await?;

    let final_state = adapter.state();
    info!(
        "Demo finished: {} photo(s) observed, last code: {:?}",
        final_state.photo.iter().count(),
        final_state.detected_code
    );

    drop(adapter);
    let _ = observer.await;
    Ok(())
}

fn log_transition(previous: &ViewState, current: &ViewState) {
    if previous.capturing != current.capturing {
        info!("capturing -> {}", current.capturing);
    }
    if previous.flash_on != current.flash_on {
        info!("flash_on -> {}", current.flash_on);
    }
    if previous.photo != current.photo {
        if let Some(photo) = &current.photo {
            info!(
                "photo -> {} ({}x{}, {} bytes)",
                photo.id,
                photo.width,
                photo.height,
                photo.size_bytes()
            );
        }
    }
    if previous.detected_code != current.detected_code {
        info!("detected_code -> {:?}", current.detected_code);
    }
    if previous.alert_visible != current.alert_visible {
        match &current.alert {
            Some(alert) if current.alert_visible => {
                info!("alert -> {}: {}", alert.title, alert.message);
            }
            _ => info!("alert cleared"),
        }
    }
}

fn init_logging(args: &Args) {
    use tracing_subscriber::EnvFilter;

    let default_level = if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else if args.verbose {
        "info"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cambridge={}", default_level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_default_config() {
    let config = CambridgeConfig::default();
    match toml::to_string_pretty(&config) {
        Ok(toml) => println!("{}", toml),
        Err(e) => eprintln!("Failed to serialize default configuration: {}", e),
    }
}
