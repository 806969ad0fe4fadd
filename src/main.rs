use clap::Parser;
use serial_ws_bridge::config::{ConfigError, ConfigLoader, Wizard, PORT_RANGE};
use serial_ws_bridge::device::{self, DeviceResolver, DeviceSource};
use serial_ws_bridge::{
    logging, server, Bridge, BridgeError, BridgeResult, ConnectError, ConnectionManager,
    TrafficMonitor,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-ws-bridge",
    version,
    about = "Relays bytes between a USB microcontroller and a browser over WebSocket.",
    long_about = "Finds a supported board by its USB vendor id, opens it at 115200 8N1 and \
                  serves a WebSocket on 127.0.0.1. Every frame from the browser is written to \
                  the board, and everything the board sends is forwarded back as binary frames."
)]
struct Args {
    /// Registry index of the board to look for.
    #[arg(short, long)]
    device: Option<usize>,

    /// WebSocket port, 6300 to 6400.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print every relayed message.
    #[arg(short, long)]
    verbose: bool,

    /// Change the saved preferences interactively.
    #[arg(short, long)]
    wizard: bool,

    /// Preferences file to use instead of the default locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List serial ports with their vendor ids and exit.
    #[arg(long)]
    list_ports: bool,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(BridgeError::Interrupted) => {
            info!("interrupted");
            println!("\nCtrl-C");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(args: Args) -> BridgeResult<()> {
    // Validation failures print their own message
    let (loader, source) = load_preferences(&args).inspect_err(|e| {
        if !matches!(e, BridgeError::Config(ConfigError::ValidationError { .. })) {
            eprintln!("{}", e);
        }
    })?;
    let config = loader.into_config();
    logging::init_logging(&config.logging);

    if args.list_ports {
        return list_ports();
    }

    let mcu = config.mcu()?;
    println!("Ah, running {}. Good taste.\n", mcu.nickname_determiner);
    println!("Starting...");

    let conn = Arc::new(ConnectionManager::system(mcu));
    match conn.connect() {
        Ok(path) => {
            println!("USB Port: {}", path);
            println!("Serial connected!\n");
        }
        Err(ConnectError::Resolve(e)) => {
            eprintln!("{}", e.guidance(source));
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    let bridge = Arc::new(Bridge::new(
        conn,
        TrafficMonitor::from_verbose(config.bridge.verbose),
        config.bridge.settings(),
    ));

    let listener = TcpListener::bind(config.server.addr()).await?;
    info!("Bridge ready on ws://{}", config.server.addr());

    tokio::select! {
        result = server::serve(listener, bridge) => result.map_err(BridgeError::from),
        _ = shutdown_signal() => Err(BridgeError::Interrupted),
    }
}

/// Preferences in increasing priority: file, environment, flags. The wizard
/// replaces all of them and saves its answers.
fn load_preferences(args: &Args) -> BridgeResult<(ConfigLoader, DeviceSource)> {
    let mut loader = ConfigLoader::load(args.config.as_deref())?;
    loader.save_if_missing()?;

    if args.wizard {
        println!("Your settings will be saved to `{}`.", loader.config_path.display());
        let stdin = io::stdin();
        let answers = Wizard::new(stdin.lock(), io::stdout()).run(loader.config())?;
        *loader.config_mut() = answers;
        loader.save()?;
        return Ok((loader, DeviceSource::Wizard));
    }

    println!("Run with -w flag to set preferences\n");

    let mut source = DeviceSource::Preferences;
    let config = loader.config_mut();
    if args.verbose {
        config.bridge.verbose = true;
    }
    if let Some(port) = args.port {
        if !PORT_RANGE.contains(&port) {
            println!("Please specify a valid port within 6300 and 6400 inclusive.");
            return Err(ConfigError::validation("server.port", port.to_string()).into());
        }
        config.server.port = port;
    }
    if let Some(index) = args.device {
        if device::by_index(index).is_none() {
            println!("Please specify a valid device ID in accordance with below:");
            println!("{}", device::device_list());
            return Err(ConfigError::validation("device.index", index.to_string()).into());
        }
        config.device.index = index;
        source = DeviceSource::CommandLine;
    }

    if let Err(e) = loader.config().validate() {
        eprintln!("{}", e);
        return Err(e.into());
    }
    Ok((loader, source))
}

fn list_ports() -> BridgeResult<()> {
    let ports = DeviceResolver::system().available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in &ports {
        let vid = port
            .vid
            .map(|v| v.to_string())
            .unwrap_or_else(|| "None".to_string());
        match device::supported_board(port) {
            Some(mcu) => println!("{} (Vendor ID: {}) -> {}", port, vid, mcu.name),
            None => println!("{} (Vendor ID: {})", port, vid),
        }
    }
    Ok(())
}

// --- Graceful Shutdown Signal Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
