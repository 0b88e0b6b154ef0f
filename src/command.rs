//! Command vocabulary and wire framing.
//!
//! Every frame on the wire is exactly [`FRAME_LEN`] bytes: a 5-character
//! ASCII payload followed by `\n`.
//!
//! | Command        | Frame      |
//! |----------------|------------|
//! | close cap      | `close\n`  |
//! | open cap       | `opena\n`  |
//! | brightness 128 | `00128\n`  |

use crate::error::{DriverError, DriverResult};
use std::fmt;

/// Total bytes per frame, terminator included.
pub const FRAME_LEN: usize = 6;

/// Line terminator appended to every payload.
pub const TERMINATOR: char = '\n';

/// Highest brightness the light box accepts.
pub const MAX_BRIGHTNESS: u16 = 255;

const BRIGHTNESS_PREFIX: &str = "00";

/// A command understood by the flat-field controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Close the dust cap (park).
    CloseCap,
    /// Open the dust cap (unpark).
    OpenCap,
    /// Drive the light at this level. Zero switches it off.
    Brightness(u8),
}

impl Command {
    /// The ASCII payload, without terminator.
    pub fn payload(&self) -> String {
        match self {
            Self::CloseCap => "close".to_string(),
            Self::OpenCap => "opena".to_string(),
            Self::Brightness(level) => format!("{BRIGHTNESS_PREFIX}{level:03}"),
        }
    }

    /// Build the length-checked wire frame for this command.
    pub fn frame(&self) -> DriverResult<Frame> {
        Frame::new(&self.payload(), FRAME_LEN)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload())
    }
}

/// Encode a brightness level.
///
/// Out-of-range values are rejected rather than clamped.
pub fn encode_brightness(value: u16) -> DriverResult<Command> {
    brightness_level(value).map(Command::Brightness)
}

/// Check a requested brightness against the 0-255 range.
pub fn brightness_level(value: u16) -> DriverResult<u8> {
    u8::try_from(value).map_err(|_| {
        DriverError::invalid_argument(format!("brightness {value} outside 0..={MAX_BRIGHTNESS}"))
    })
}

/// A newline-terminated ASCII frame of a declared fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    text: String,
}

impl Frame {
    /// Build `payload + "\n"` and check it is exactly `expected_len` bytes.
    ///
    /// The payload must be printable ASCII without its own terminator.
    pub fn new(payload: &str, expected_len: usize) -> DriverResult<Self> {
        if !payload.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(DriverError::invalid_argument(format!(
                "payload {payload:?} is not printable ASCII"
            )));
        }

        let framed_len = payload.len() + TERMINATOR.len_utf8();
        if framed_len != expected_len {
            return Err(DriverError::invalid_argument(format!(
                "frame for {payload:?} is {framed_len} bytes, expected {expected_len}"
            )));
        }

        let mut text = String::with_capacity(expected_len);
        text.push_str(payload);
        text.push(TERMINATOR);
        Ok(Self { text })
    }

    /// The bytes to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// The payload without terminator.
    pub fn payload(&self) -> &str {
        self.text.trim_end_matches(TERMINATOR)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_frames() {
        assert_eq!(Command::CloseCap.frame().unwrap().as_bytes(), b"close\n");
        assert_eq!(Command::OpenCap.frame().unwrap().as_bytes(), b"opena\n");
        assert_eq!(
            Command::Brightness(128).frame().unwrap().as_bytes(),
            b"00128\n"
        );
        assert_eq!(Command::Brightness(0).frame().unwrap().as_bytes(), b"00000\n");
        assert_eq!(Command::Brightness(7).to_string(), "00007");
    }

    #[test]
    fn test_encode_brightness_bounds() {
        assert_eq!(encode_brightness(0).unwrap(), Command::Brightness(0));
        assert_eq!(encode_brightness(255).unwrap(), Command::Brightness(255));

        let err = encode_brightness(256).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument(_)));
        assert!(encode_brightness(u16::MAX).is_err());
    }

    #[test]
    fn test_brightness_level_range() {
        assert_eq!(brightness_level(128).unwrap(), 128);
        assert!(matches!(
            brightness_level(256),
            Err(DriverError::InvalidArgument(ref m)) if m.contains("256")
        ));
    }

    #[test]
    fn test_frame_length_is_checked() {
        assert!(matches!(
            Frame::new("open", FRAME_LEN),
            Err(DriverError::InvalidArgument(_))
        ));
        assert!(Frame::new("opena", FRAME_LEN).is_ok());
        assert!(Frame::new("open", 5).is_ok());
    }

    #[test]
    fn test_frame_rejects_embedded_terminator() {
        assert!(Frame::new("ab\ncd", FRAME_LEN).is_err());
        assert!(Frame::new("caf\u{e9}", FRAME_LEN).is_err());
    }

    #[test]
    fn test_frame_payload() {
        let frame = Frame::new("00042", FRAME_LEN).unwrap();
        assert_eq!(frame.payload(), "00042");
        assert_eq!(frame.len(), FRAME_LEN);
        assert!(!frame.is_empty());
    }

    proptest! {
        #[test]
        fn brightness_frame_encodes_value(v in 0u16..=MAX_BRIGHTNESS) {
            let frame = encode_brightness(v).unwrap().frame().unwrap();
            prop_assert_eq!(frame.len(), FRAME_LEN);
            prop_assert_eq!(frame.as_bytes()[FRAME_LEN - 1], b'\n');

            let payload = frame.payload();
            prop_assert!(payload.starts_with("00"));
            prop_assert!(payload.bytes().all(|b| b.is_ascii_digit()));
            prop_assert_eq!(payload[2..].parse::<u16>().unwrap(), v);
        }

        #[test]
        fn out_of_range_brightness_is_rejected(v in (MAX_BRIGHTNESS + 1)..=u16::MAX) {
            prop_assert!(matches!(
                encode_brightness(v),
                Err(DriverError::InvalidArgument(_))
            ));
        }
    }
}
