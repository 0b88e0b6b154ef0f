use clap::{Parser, Subcommand, ValueEnum};
use flatfield_serial::config::{get_default_config_path, Config, ConfigLoader};
use flatfield_serial::device::{DustCap, FlatFieldDevice, LightBox};
use flatfield_serial::port::SystemConnector;
use flatfield_serial::{console, logging, DeviceStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "flatfield",
    version,
    about = "Drive a serial flat-field dust cap / light box.",
    long_about = "Connects to a flat-field accessory over a serial line, performs the RTS handshake, and sends fixed-length commands with a bounded retry."
)]
struct Args {
    /// Configuration file (default: standard search path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port or alias (overrides [serial].port)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate (overrides [serial].baud_rate)
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List serial ports on this machine
    Ports,
    /// Close the dust cap
    Park,
    /// Open the dust cap
    Unpark,
    /// Switch the light on (last level) or off
    Light {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Set the light level
    Brightness {
        /// 0-255; 0 switches the light off
        value: u16,
    },
    /// Connect, handshake and report device status
    Status {
        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read commands from stdin, one per line
    Console,
    /// Write a default configuration file
    InitConfig {
        /// Destination (default: user config directory)
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(2);
        }
    };
    if let Some(port) = &args.port {
        config.serial.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }

    if let Err(e) = logging::init(&config.logging, args.verbose) {
        eprintln!("warning: logging not initialised: {e}");
    }
    debug!("Effective configuration: {:?}", config);

    match run(args.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: Option<&PathBuf>) -> Result<Config, String> {
    if let Some(path) = explicit {
        return ConfigLoader::load_from(path)
            .map(ConfigLoader::into_config)
            .map_err(|e| e.to_string());
    }
    match ConfigLoader::load() {
        Ok(loader) => Ok(loader.into_config()),
        Err(e) => {
            eprintln!("warning: failed to load config, using defaults: {e}");
            Ok(ConfigLoader::with_defaults().into_config())
        }
    }
}

fn run(command: Cmd, config: &Config) -> Result<(), String> {
    let port = config
        .serial
        .port
        .as_deref()
        .map(|name| config.serial.resolve_port(name));

    match command {
        Cmd::Ports => list_ports(),
        Cmd::InitConfig { path, force } => init_config(path, force),
        Cmd::Console => {
            let mut device = FlatFieldDevice::from_config(config, Box::new(SystemConnector));
            if let Some(address) = port.as_deref() {
                if let Err(e) = device.connect(address) {
                    warn!("Initial connect failed: {}", e);
                    eprintln!("warning: {e}");
                }
            }
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            console::run(&mut device, &config.serial, stdin.lock(), stdout.lock())
                .map_err(|e| e.to_string())
        }
        device_command => {
            let address = port.ok_or("no serial port given; use --port or set [serial].port")?;
            let mut device = FlatFieldDevice::from_config(config, Box::new(SystemConnector));
            device.connect(&address).map_err(|e| e.to_string())?;

            let result = match device_command {
                Cmd::Park => device.park(),
                Cmd::Unpark => device.unpark(),
                Cmd::Light { state } => device.enable_light(matches!(state, Switch::On)),
                Cmd::Brightness { value } => device.set_brightness(value),
                Cmd::Status { json } => {
                    print_status(&device.status(), json)?;
                    Ok(())
                }
                Cmd::Ports | Cmd::InitConfig { .. } | Cmd::Console => Ok(()),
            };
            device.disconnect();
            result.map_err(|e| e.to_string())
        }
    }
}

fn list_ports() -> Result<(), String> {
    let ports = serialport::available_ports().map_err(|e| e.to_string())?;
    if ports.is_empty() {
        println!("No serial ports detected on this system");
        return Ok(());
    }
    for port in ports {
        match port.port_type {
            serialport::SerialPortType::UsbPort(usb) => println!(
                "{}\tUSB {:04x}:{:04x}\t{}",
                port.port_name,
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            other => println!("{}\t{:?}", port.port_name, other),
        }
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<(), String> {
    let path = path
        .or_else(get_default_config_path)
        .ok_or("cannot determine a config directory; pass a path")?;
    if path.exists() && !force {
        return Err(format!("{} exists; use --force to overwrite", path.display()));
    }
    ConfigLoader::with_defaults()
        .save_to(&path)
        .map_err(|e| e.to_string())?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_status(status: &DeviceStatus, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(status).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "unknown".to_string());
    println!("{}", status.name);
    println!("  address:    {}", or_unknown(status.address.clone()));
    println!("  link:       {:?}", status.link);
    println!("  brightness: {}", or_unknown(status.brightness.map(|b| b.to_string())));
    println!("  cap:        {:?}", status.cap);
    println!("  interfaces: {}", status.interfaces.join(", "));
    Ok(())
}
