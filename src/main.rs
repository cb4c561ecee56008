use anyhow::{bail, Context, Result};
use camsession::config::SimulatorConfig;
use camsession::driver::{AutoComplete, MockBehavior};
use camsession::{
    CameraSessionBuilder, KeyboardInputHandler, MockCameraDriver, SessionConfig, SessionHandle,
    SessionService, SurfaceTarget, UiEventBus, UiEventReceiver, UiMessage, UiMessageFilter,
};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "camsession")]
#[command(about = "Camera session controller running against a simulated camera")]
#[command(version)]
#[command(long_about = "Runs the camera session controller (surface-driven device acquisition, \
preview, and mutually exclusive autofocus / still capture) against a simulated camera driver. \
By default a scripted session is played back; --interactive drives it from the keyboard.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "camsession.toml", help = "Path to TOML configuration file")]
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

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", help = "Write logs to a file in addition to stderr")]
    log_file: Option<String>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Drive the session from the keyboard instead of the scripted run
    #[arg(short, long, help = "Control the session interactively from the terminal")]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Camsession Configuration File");
        println!("# This is the default configuration with all available options");
        println!();
        print!("{}", SessionConfig::default().to_toml()?);
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting camsession v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = SessionConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }
    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let bus = Arc::new(if config.ui.debug_logging {
        UiEventBus::with_debug_logging(config.ui.event_bus_capacity)
    } else {
        UiEventBus::new(config.ui.event_bus_capacity)
    });
    let mut ui_messages = UiEventReceiver::new(
        bus.subscribe(),
        UiMessageFilter::All,
        "camsession".to_string(),
    );

    let driver = MockCameraDriver::with_behavior(simulator_behavior(&config.simulator));
    let (controller, completions) = CameraSessionBuilder::new()
        .config(config.clone())
        .driver(driver)
        .notifier(Arc::clone(&bus))
        .build()?;
    let (session, task) =
        SessionService::spawn(controller, completions, config.session.command_queue_capacity);

    if args.interactive {
        run_interactive(&session, ui_messages, &config).await?;
    } else {
        run_scripted(&session, &mut ui_messages, &config).await?;
        session.shutdown();
    }

    task.await.context("Camera session task panicked")?;
    info!("camsession exited");
    Ok(())
}

fn simulator_behavior(simulator: &SimulatorConfig) -> MockBehavior {
    let picture = (simulator.picture_bytes > 0).then(|| synthetic_jpeg(simulator.picture_bytes));
    MockBehavior {
        preview_size: Some(simulator.preview_size.into()),
        auto_complete: Some(AutoComplete {
            focus_latency: Duration::from_millis(simulator.focus_latency_ms),
            shutter_latency: Duration::from_millis(simulator.shutter_latency_ms),
            picture_latency: Duration::from_millis(simulator.picture_latency_ms),
            focus_succeeds: simulator.focus_succeeds,
            picture,
        }),
        ..Default::default()
    }
}

/// SOI + zero fill + EOI, enough to look like a JPEG to a consumer
fn synthetic_jpeg(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len.max(4)];
    data[..2].copy_from_slice(&[0xff, 0xd8]);
    let end = data.len();
    data[end - 2..].copy_from_slice(&[0xff, 0xd9]);
    data
}

fn completion_timeout(simulator: &SimulatorConfig) -> Duration {
    let slowest = simulator
        .focus_latency_ms
        .max(simulator.shutter_latency_ms + simulator.picture_latency_ms);
    Duration::from_millis(slowest * 4 + 500)
}

async fn wait_for_message(receiver: &mut UiEventReceiver, limit: Duration) -> Option<UiMessage> {
    match tokio::time::timeout(limit, receiver.recv()).await {
        Ok(Ok(message)) => Some(message),
        Ok(Err(e)) => {
            warn!("UI message stream error: {}", e);
            None
        }
        Err(_) => None,
    }
}

async fn log_snapshot(session: &SessionHandle, label: &str) -> Result<()> {
    let snapshot = session.snapshot().await?;
    info!("{}: {}", label, serde_json::to_string(&snapshot)?);
    Ok(())
}

async fn run_scripted(
    session: &SessionHandle,
    ui_messages: &mut UiEventReceiver,
    config: &SessionConfig,
) -> Result<()> {
    let limit = completion_timeout(&config.simulator);
    let (width, height) = config.simulator.preview_size;

    session.surface_ready(SurfaceTarget::new(1, "main")).await?;
    session.surface_resized(width, height).await?;
    log_snapshot(session, "Preview started").await?;

    session.request_auto_focus().await?;
    // Dropped by the exclusion guard while the first focus is in flight
    session.request_capture().await?;
    match wait_for_message(ui_messages, limit).await {
        Some(message) => info!("UI received: {}", message.description()),
        None => bail!("No autofocus result within {:?}", limit),
    }

    session.request_capture().await?;
    if config.simulator.picture_bytes > 0 {
        match wait_for_message(ui_messages, limit).await {
            Some(message) => info!("UI received: {}", message.description()),
            None => bail!("No capture data within {:?}", limit),
        }
        session.restart_preview().await?;
    } else {
        // Empty captures are not reported; preview restarts on its own
        tokio::time::sleep(limit).await;
    }
    log_snapshot(session, "After capture").await?;

    session.pause().await?;
    log_snapshot(session, "Paused").await?;
    session.resume().await?;
    log_snapshot(session, "Resumed").await?;

    session.surface_gone().await?;
    log_snapshot(session, "Surface gone").await?;
    Ok(())
}

async fn run_interactive(
    session: &SessionHandle,
    mut ui_messages: UiEventReceiver,
    config: &SessionConfig,
) -> Result<()> {
    let (width, height) = config.simulator.preview_size;
    session.surface_ready(SurfaceTarget::new(1, "main")).await?;
    session.surface_resized(width, height).await?;

    tokio::spawn(async move {
        while let Ok(message) = ui_messages.recv().await {
            info!("UI received: {}", message.description());
        }
    });

    let keyboard = KeyboardInputHandler::new(session.clone(), config.simulator.preview_size.into());
    keyboard.start().await?;

    let shutdown = session.clone();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Received SIGINT signal (Ctrl+C)");
        }
        _ = async {
            while !shutdown.is_shutdown() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        } => {}
    }

    keyboard.stop().await?;
    session.shutdown();
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

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
        .unwrap_or_else(|_| EnvFilter::new(format!("camsession={}", log_level)));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

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
            fmt::layer().with_target(true).boxed()
        }
    };
    layers.push(fmt_layer);

    let mut guard = None;
    if let Some(log_file) = &args.log_file {
        let path = Path::new(log_file);
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .with_context(|| format!("Invalid log file path: {}", log_file))?;

        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    Ok(guard)
}
