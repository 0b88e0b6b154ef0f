//! Flat-field device built on the command transport.
//!
//! [`FlatFieldDevice`] owns a [`Transport`] and the retained light state.
//! State changes are committed only after the transport confirms delivery,
//! so a failed command never leaves the model ahead of the hardware.

pub mod capabilities;

pub use capabilities::{CapRequest, DriverInterface, DustCap, LightBox};

use crate::command::{brightness_level, Command};
use crate::config::Config;
use crate::error::{DriverError, DriverResult};
use crate::port::PortConnector;
use crate::transport::{ConnectionHandle, Delivery, LinkState, Transport};
use serde::Serialize;
use tracing::{debug, info};

/// Point-in-time view of a device, for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub name: String,
    pub address: Option<String>,
    pub link: LinkState,
    pub brightness: Option<u8>,
    pub light_on: Option<bool>,
    pub cap: CapRequest,
    pub interfaces: Vec<&'static str>,
}

/// A serial flat-field accessory: dust cap plus light box.
#[derive(Debug)]
pub struct FlatFieldDevice {
    name: String,
    transport: Transport,
    handle: Option<ConnectionHandle>,
    /// Level confirmed on the wire most recently.
    brightness: Option<u8>,
    /// Level to restore when the light is switched back on.
    restore_level: u8,
    cap: CapRequest,
}

impl FlatFieldDevice {
    /// Wrap an already configured transport.
    pub fn new(name: impl Into<String>, transport: Transport, initial_brightness: u8) -> Self {
        Self {
            name: name.into(),
            transport,
            handle: None,
            brightness: None,
            restore_level: initial_brightness,
            cap: CapRequest::Unknown,
        }
    }

    /// Build a device and its transport from configuration.
    ///
    /// `initial_brightness` is expected to be validated already; anything
    /// above 255 saturates.
    pub fn from_config(config: &Config, connector: Box<dyn PortConnector>) -> Self {
        let transport = Transport::new(
            connector,
            config.serial.port_configuration(),
            config.transport.retry_policy(),
        );
        let initial = u8::try_from(config.device.initial_brightness).unwrap_or(u8::MAX);
        Self::new(config.device.name.clone(), transport, initial)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connect and handshake. Replaces any previous connection.
    pub fn connect(&mut self, address: &str) -> DriverResult<()> {
        self.handle = None;
        let handle = self.transport.connect(address)?;
        info!("{} ready on {}", self.name, handle.address());
        self.handle = Some(handle);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.handle = None;
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some() && self.transport.is_connected()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn capabilities(&self) -> DriverInterface {
        DriverInterface::FLIP_FLAT
    }

    /// Level `enable_light(true)` would send.
    pub fn restore_level(&self) -> u8 {
        self.restore_level
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            name: self.name.clone(),
            address: self.handle.as_ref().map(|h| h.address().to_string()),
            link: self.transport.state(),
            brightness: self.brightness,
            light_on: self.light_on(),
            cap: self.cap,
            interfaces: self.capabilities().names(),
        }
    }

    fn send(&mut self, command: Command) -> DriverResult<Delivery> {
        let handle = self.handle.as_ref().ok_or(DriverError::NotConnected)?;
        let result = self.transport.send_command(handle, &command);
        if !self.transport.is_connected() {
            self.handle = None;
        }
        result
    }

    fn apply_brightness(&mut self, level: u8) -> DriverResult<()> {
        self.send(Command::Brightness(level))?;
        self.brightness = Some(level);
        if level > 0 {
            self.restore_level = level;
        }
        debug!("{} brightness now {}", self.name, level);
        Ok(())
    }
}

impl LightBox for FlatFieldDevice {
    fn set_brightness(&mut self, value: u16) -> DriverResult<()> {
        let level = brightness_level(value)?;
        self.apply_brightness(level)
    }

    fn enable_light(&mut self, on: bool) -> DriverResult<()> {
        let level = if on { self.restore_level } else { 0 };
        self.apply_brightness(level)
    }

    fn brightness(&self) -> Option<u8> {
        self.brightness
    }
}

impl DustCap for FlatFieldDevice {
    fn park(&mut self) -> DriverResult<()> {
        self.send(Command::CloseCap)?;
        self.cap = CapRequest::Parked;
        Ok(())
    }

    fn unpark(&mut self) -> DriverResult<()> {
        self.send(Command::OpenCap)?;
        self.cap = CapRequest::Unparked;
        Ok(())
    }

    fn cap(&self) -> CapRequest {
        self.cap
    }
}
