//! Line-oriented command console.
//!
//! Reads one command per line and drives a [`FlatFieldDevice`], so retained
//! brightness survives between commands. Replies are single lines: `ok`,
//! a JSON status object, or `error <Kind>: <message>`.

use crate::config::SerialConfig;
use crate::device::{DustCap, FlatFieldDevice, LightBox};
use crate::error::{DriverError, DriverResult};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use tracing::debug;

const HELP: &str = "commands: connect [port] | disconnect | park | unpark | on | off | \
brightness <0-255> | status | help | quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect(Option<String>),
    Disconnect,
    Park,
    Unpark,
    LightOn,
    LightOff,
    Brightness(u16),
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments for '{verb}'"));
        }

        let no_arg = |cmd: ConsoleCommand| match arg {
            None => Ok(cmd),
            Some(extra) => Err(format!("'{verb}' takes no argument, got '{extra}'")),
        };

        match verb.as_str() {
            "connect" => Ok(Self::Connect(arg.map(str::to_string))),
            "disconnect" => no_arg(Self::Disconnect),
            "park" | "close" => no_arg(Self::Park),
            "unpark" | "open" => no_arg(Self::Unpark),
            "on" => no_arg(Self::LightOn),
            "off" => no_arg(Self::LightOff),
            "brightness" | "b" => {
                let value = arg.ok_or_else(|| "brightness needs a value".to_string())?;
                value
                    .parse()
                    .map(Self::Brightness)
                    .map_err(|_| format!("'{value}' is not a brightness"))
            }
            "status" => no_arg(Self::Status),
            "help" | "?" => no_arg(Self::Help),
            "quit" | "exit" => no_arg(Self::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

/// Run the console until `quit` or end of input.
///
/// A bare `connect` uses `serial.port`; any port name goes through
/// `serial.port_aliases`.
pub fn run<R: BufRead, W: Write>(
    device: &mut FlatFieldDevice,
    serial: &SerialConfig,
    input: R,
    mut output: W,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let command = match trimmed.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(message) => {
                writeln!(output, "error Parse: {message}")?;
                continue;
            }
        };
        debug!("console: {:?}", command);

        match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => writeln!(output, "{HELP}")?,
            ConsoleCommand::Status => {
                let status = serde_json::to_string(&device.status())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(output, "{status}")?;
            }
            other => {
                let reply = match execute(device, serial, other) {
                    Ok(()) => "ok".to_string(),
                    Err(e) => format!("error {}: {}", e.kind(), e),
                };
                writeln!(output, "{reply}")?;
            }
        }
        output.flush()?;
    }
    Ok(())
}

fn execute(
    device: &mut FlatFieldDevice,
    serial: &SerialConfig,
    command: ConsoleCommand,
) -> DriverResult<()> {
    match command {
        ConsoleCommand::Connect(port) => match port.as_deref().or(serial.port.as_deref()) {
            Some(name) => device.connect(&serial.resolve_port(name)),
            None => Err(DriverError::invalid_argument(
                "no port given and none configured",
            )),
        },
        ConsoleCommand::Disconnect => {
            device.disconnect();
            Ok(())
        }
        ConsoleCommand::Park => device.park(),
        ConsoleCommand::Unpark => device.unpark(),
        ConsoleCommand::LightOn => device.enable_light(true),
        ConsoleCommand::LightOff => device.enable_light(false),
        ConsoleCommand::Brightness(value) => device.set_brightness(value),
        ConsoleCommand::Status | ConsoleCommand::Help | ConsoleCommand::Quit => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockConnector, MockSerialPort, PortConfiguration};
    use crate::transport::LinkState;
    use crate::transport::{RetryPolicy, Transport};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_parse_commands() {
        assert_eq!("park".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Park));
        assert_eq!("OPEN".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Unpark));
        assert_eq!("b 128".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Brightness(128)));
        assert_eq!(
            "connect /dev/ttyACM0".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Connect(Some("/dev/ttyACM0".to_string())))
        );
        assert_eq!("connect".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Connect(None)));
        assert!("brightness".parse::<ConsoleCommand>().is_err());
        assert!("brightness high".parse::<ConsoleCommand>().is_err());
        assert!("park now".parse::<ConsoleCommand>().is_err());
        assert!("dance".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_session_keeps_brightness_between_lines() {
        let mock = MockSerialPort::new("MOCK0");
        let transport = Transport::new(
            Box::new(MockConnector::new(mock.clone())),
            PortConfiguration::default(),
            RetryPolicy::new(3, Duration::from_millis(1)),
        );
        let mut device = FlatFieldDevice::new("Console Flat", transport, 255);

        let script = "connect\n# comment\nbrightness 64\noff\non\nbrightness 300\nunpark\nquit\npark\n";
        let mut out = Vec::new();
        let serial = SerialConfig {
            port: Some("/dev/ttyMOCK".to_string()),
            ..SerialConfig::default()
        };
        run(&mut device, &serial, script.as_bytes(), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[..4], ["ok", "ok", "ok", "ok"]);
        assert!(lines[4].starts_with("error InvalidArgument"));
        assert_eq!(lines[5], "ok");
        assert_eq!(lines.len(), 6);

        assert_eq!(
            mock.get_write_log(),
            vec![
                b"00064\n".to_vec(),
                b"00000\n".to_vec(),
                b"00064\n".to_vec(),
                b"opena\n".to_vec(),
            ]
        );
    }

    #[test]
    fn test_commands_before_connect_report_not_connected() {
        let transport = Transport::new(
            Box::new(MockConnector::new(MockSerialPort::new("MOCK0"))),
            PortConfiguration::default(),
            RetryPolicy::default(),
        );
        let mut device = FlatFieldDevice::new("Console Flat", transport, 255);

        let mut out = Vec::new();
        run(
            &mut device,
            &SerialConfig::default(),
            "park\nconnect\nstatus\n".as_bytes(),
            &mut out,
        )
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert!(lines[0].starts_with("error NotConnected"));
        assert!(lines[1].starts_with("error InvalidArgument"));
        assert!(lines[2].contains("\"link\":\"disconnected\""));
    }

    #[test]
    fn test_connect_resolves_port_alias() {
        let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
        let transport = Transport::new(
            Box::new(connector.clone()),
            PortConfiguration::default(),
            RetryPolicy::default(),
        );
        let mut device = FlatFieldDevice::new("Console Flat", transport, 255);
        let mut serial = SerialConfig::default();
        serial
            .port_aliases
            .insert("flat".to_string(), "/dev/ttyACM7".to_string());

        let mut out = Vec::new();
        run(&mut device, &serial, "connect flat\n".as_bytes(), &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "ok\n");
        assert_eq!(connector.opened()[0].0, "/dev/ttyACM7");
        assert_eq!(device.status().link, LinkState::Connected);
    }
}
