//! Capability traits a flat-field device can implement.
//!
//! A device composes a transport and implements whichever of these it
//! supports; hosts program against the traits.

use crate::error::DriverResult;
use serde::Serialize;

/// Calibration light control.
pub trait LightBox {
    /// Drive the light at `value` (0..=255). Zero switches it off.
    fn set_brightness(&mut self, value: u16) -> DriverResult<()>;

    /// Switch the light off, or back on at the last non-zero level.
    fn enable_light(&mut self, on: bool) -> DriverResult<()>;

    /// Last confirmed brightness, `None` before the first delivery.
    fn brightness(&self) -> Option<u8>;

    /// Whether the last confirmed command left the light on.
    fn light_on(&self) -> Option<bool> {
        self.brightness().map(|level| level > 0)
    }
}

/// Dust cap control.
///
/// The controller never reports position, so these only confirm that the
/// request reached the OS.
pub trait DustCap {
    fn park(&mut self) -> DriverResult<()>;

    fn unpark(&mut self) -> DriverResult<()>;

    /// Last cap position requested successfully.
    fn cap(&self) -> CapRequest;
}

/// Last cap request the device delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapRequest {
    /// Nothing sent yet; physical position unknown.
    #[default]
    Unknown,
    Parked,
    Unparked,
}

/// Driver interface flags advertised to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverInterface {
    pub aux: bool,
    pub light_box: bool,
    pub dust_cap: bool,
}

impl DriverInterface {
    /// Flip-flat style device: dust cover plus light.
    pub const FLIP_FLAT: Self = Self {
        aux: true,
        light_box: true,
        dust_cap: true,
    };

    /// Names of the advertised interfaces.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.aux {
            names.push("aux");
        }
        if self.light_box {
            names.push("light_box");
        }
        if self.dust_cap {
            names.push("dust_cap");
        }
        names
    }
}
