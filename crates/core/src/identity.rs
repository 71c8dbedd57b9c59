//! Firmware and device identification (READ FIRMWARE_INFO).
//!
//! The reply is normally delivered as an input report. Some firmware only
//! answers through a feature report, whose framing carries one extra leading
//! byte, so every field offset shifts by one on that path.

use crate::error::Result;
use crate::report::{property, Report, REPORT_LEN};
use crate::transport::{send_report, HidChannel};
use serde::Serialize;
use tracing::debug;

/// Timeout for the input-report read before falling back to feature reports.
pub const READ_TIMEOUT_MS: i32 = 1000;

/// Field offsets in the plain-read framing.
mod offsets {
    pub const FIRMWARE_MINOR: usize = 0x08;
    pub const FIRMWARE_MAJOR: usize = 0x09;
    pub const PRODUCT_ID: usize = 0x0E;
    pub const DEVICE_TYPE: usize = 0x14;
    pub const PHYSICAL_LAYOUT: usize = 0x17;
}

/// Device type byte values.
pub mod device_type {
    pub const KEYBOARD: u8 = 0xC0;
    pub const MOUSE: u8 = 0xC1;
    pub const MOUSEMAT: u8 = 0xC2;
}

/// Product ID reported by the headset stand in the 0xC2 class.
const HEADSET_STAND_PID: u16 = 0x0A34;

/// Device class decoded from the device type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceClass {
    Keyboard,
    Mouse,
    Mousemat,
    HeadsetStand,
    Unknown,
}

impl DeviceClass {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keyboard => "Keyboard",
            Self::Mouse => "Mouse",
            Self::Mousemat => "Mousemat",
            Self::HeadsetStand => "Headset Stand",
            Self::Unknown => "Unknown",
        }
    }
}

/// Keyboard logical layout, derived from the reported product ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalLayout {
    K95Platinum,
    K95,
    K55,
    K70Mk2,
    K68,
    Normal,
}

impl LogicalLayout {
    pub fn from_pid(pid: u16) -> Self {
        match pid {
            0x1B2D => Self::K95Platinum,
            0x1B11 => Self::K95,
            0x1B3D => Self::K55,
            0x1B38 | 0x1B49 | 0x1B6B | 0x1B55 => Self::K70Mk2,
            0x1B4F => Self::K68,
            _ => Self::Normal,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::K95Platinum => "K95 Platinum",
            Self::K95 => "K95",
            Self::K55 => "K55",
            Self::K70Mk2 => "K70 MK2",
            Self::K68 => "K68",
            Self::Normal => "Normal",
        }
    }
}

/// Keyboard physical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhysicalLayout {
    Ansi,
    Iso,
    Abnt,
    Jis,
    Dubeolsik,
}

impl PhysicalLayout {
    /// Unrecognised values decode as ANSI.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x02 => Self::Iso,
            0x03 => Self::Abnt,
            0x04 => Self::Jis,
            0x05 => Self::Dubeolsik,
            _ => Self::Ansi,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ansi => "ANSI",
            Self::Iso => "ISO",
            Self::Abnt => "ABNT",
            Self::Jis => "JIS",
            Self::Dubeolsik => "DUBEOLSIK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Decoded identification block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    /// Raw device type byte.
    pub device_type: u8,
    pub class: DeviceClass,
    pub product_id: Option<u16>,
    pub logical_layout: Option<LogicalLayout>,
    pub physical_layout: Option<PhysicalLayout>,
    /// `None` for unknown device classes.
    pub firmware: Option<FirmwareVersion>,
    /// Whether the reply came through the feature-report fallback.
    pub via_feature_report: bool,
}

impl DeviceIdentity {
    /// Decode a reply. `shift` is 1 for feature-report framing, 0 otherwise.
    ///
    /// Short replies are zero-extended. Unknown device types decode to
    /// [`DeviceClass::Unknown`] rather than failing.
    pub fn decode(reply: &[u8], shift: usize) -> Self {
        let mut buf = [0u8; REPORT_LEN + 1];
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        let at = |offset: usize| buf[offset + shift];

        let device_type = at(offsets::DEVICE_TYPE);
        // The product ID moves with the shift too. Some hosts read it unshifted
        // on both paths, which misreads it on feature-report framing.
        let pid_bytes = [at(offsets::PRODUCT_ID), at(offsets::PRODUCT_ID + 1)];
        let firmware = FirmwareVersion {
            major: at(offsets::FIRMWARE_MAJOR),
            minor: at(offsets::FIRMWARE_MINOR),
        };

        let mut identity = Self {
            device_type,
            class: DeviceClass::Unknown,
            product_id: None,
            logical_layout: None,
            physical_layout: None,
            firmware: Some(firmware),
            via_feature_report: shift > 0,
        };

        match device_type {
            device_type::KEYBOARD => {
                let pid = u16::from_be_bytes(pid_bytes);
                identity.class = DeviceClass::Keyboard;
                identity.product_id = Some(pid);
                identity.logical_layout = Some(LogicalLayout::from_pid(pid));
                identity.physical_layout =
                    Some(PhysicalLayout::from_byte(at(offsets::PHYSICAL_LAYOUT)));
            }
            device_type::MOUSE => {
                identity.class = DeviceClass::Mouse;
            }
            device_type::MOUSEMAT => {
                // This class reports its product ID little-endian.
                let pid = u16::from_le_bytes(pid_bytes);
                identity.product_id = Some(pid);
                identity.class = if pid == HEADSET_STAND_PID {
                    DeviceClass::HeadsetStand
                } else {
                    DeviceClass::Mousemat
                };
            }
            _ => {
                identity.firmware = None;
            }
        }
        identity
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Device type: 0x{:02x}", self.device_type)?;
        match (self.class, self.product_id) {
            // Mousemat-class devices are told apart by product ID, so it comes first.
            (DeviceClass::Mousemat | DeviceClass::HeadsetStand, Some(pid)) => {
                writeln!(f, "Product ID: 0x{pid:x}")?;
                writeln!(f, "Device: {}", self.class.label())?;
            }
            (class, pid) => {
                writeln!(f, "Device: {}", class.label())?;
                if let Some(pid) = pid {
                    writeln!(f, "Product ID: 0x{pid:x}")?;
                }
            }
        }
        if let Some(layout) = self.logical_layout {
            writeln!(f, "Logical layout: {}", layout.label())?;
        }
        if let Some(layout) = self.physical_layout {
            writeln!(f, "Physical layout: {}", layout.label())?;
        }
        match self.firmware {
            Some(fw) => write!(f, "Firmware version: {fw}"),
            None => write!(f, "Unknown device type. Firmware version not available."),
        }
    }
}

/// Send READ FIRMWARE_INFO and decode the reply.
///
/// Tries a timed input-report read first. If nothing arrives, resends the
/// request as a feature report and reads the reply with a feature-report get.
pub fn read_identity(channel: &dyn HidChannel) -> Result<DeviceIdentity> {
    let request = Report::read(property::FIRMWARE_INFO);
    send_report(channel, &request)?;

    let mut buf = [0u8; REPORT_LEN];
    let n = channel.read_timeout(&mut buf, READ_TIMEOUT_MS)?;

    let shift = if n == 0 {
        debug!(
            timeout_ms = READ_TIMEOUT_MS,
            "No input report; falling back to feature report"
        );
        buf = [0u8; REPORT_LEN];
        channel.send_feature_report(request.as_bytes())?;
        let n = channel.get_feature_report(&mut buf)?;
        debug!(bytes = n, "Feature report reply");
        1
    } else {
        debug!(bytes = n, "Input report reply");
        0
    };

    let identity = DeviceIdentity::decode(&buf, shift);
    debug!(
        device_type = format_args!("0x{:02X}", identity.device_type),
        class = identity.class.label(),
        "Decoded identification"
    );
    Ok(identity)
}
