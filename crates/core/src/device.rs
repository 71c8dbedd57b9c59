//! Device model: supported keyboards and bus discovery.

use crate::keymap::{KeyAddressTable, K70_MK2};
use crate::transport::HidApiBackend;
use crate::{pids, CORSAIR_VID};
use serde::Serialize;
use tracing::{debug, info};

/// Supported Corsair keyboard models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyboardModel {
    K70RgbMk2,
    K70RgbMk2LowProfile,
    K70RgbMk2Se,
    K70RgbMk2LowProfileRapidfire,
}

impl KeyboardModel {
    pub const ALL: &'static [KeyboardModel] = &[
        KeyboardModel::K70RgbMk2,
        KeyboardModel::K70RgbMk2LowProfile,
        KeyboardModel::K70RgbMk2Se,
        KeyboardModel::K70RgbMk2LowProfileRapidfire,
    ];

    /// Look up model from USB product ID.
    pub fn from_pid(pid: u16) -> Option<Self> {
        match pid {
            pids::K70_RGB_MK2 => Some(Self::K70RgbMk2),
            pids::K70_RGB_MK2_LOW_PROFILE => Some(Self::K70RgbMk2LowProfile),
            pids::K70_RGB_MK2_SE => Some(Self::K70RgbMk2Se),
            pids::K70_RGB_MK2_LOW_PROFILE_RAPIDFIRE => Some(Self::K70RgbMk2LowProfileRapidfire),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::K70RgbMk2 => "Corsair K70 RGB MK.2",
            Self::K70RgbMk2LowProfile => "Corsair K70 RGB MK.2 Low Profile",
            Self::K70RgbMk2Se => "Corsair K70 RGB MK.2 SE",
            Self::K70RgbMk2LowProfileRapidfire => "Corsair K70 RGB MK.2 Low Profile Rapidfire",
        }
    }

    /// USB Product ID.
    pub fn pid(&self) -> u16 {
        match self {
            Self::K70RgbMk2 => pids::K70_RGB_MK2,
            Self::K70RgbMk2LowProfile => pids::K70_RGB_MK2_LOW_PROFILE,
            Self::K70RgbMk2Se => pids::K70_RGB_MK2_SE,
            Self::K70RgbMk2LowProfileRapidfire => pids::K70_RGB_MK2_LOW_PROFILE_RAPIDFIRE,
        }
    }

    /// Key-address table for this model.
    pub fn table(&self) -> &'static KeyAddressTable {
        // Every MK.2 variant shares the full-size matrix.
        &K70_MK2
    }
}

/// Information about a discovered Corsair keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub model: KeyboardModel,
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub serial: Option<String>,
}

/// Discover all connected supported Corsair keyboards.
///
/// A keyboard exposes several HID interfaces; each is listed.
pub fn discover_devices(backend: &HidApiBackend) -> Vec<DeviceInfo> {
    debug!("Starting HID device enumeration");

    let mut devices = Vec::new();
    for info in backend.api().device_list() {
        if info.vendor_id() != CORSAIR_VID {
            continue;
        }

        if let Some(model) = KeyboardModel::from_pid(info.product_id()) {
            info!(
                model = model.name(),
                vid = format_args!("0x{:04X}", info.vendor_id()),
                pid = format_args!("0x{:04X}", info.product_id()),
                path = %info.path().to_string_lossy(),
                "Found Corsair keyboard"
            );
            devices.push(DeviceInfo {
                model,
                vid: info.vendor_id(),
                pid: info.product_id(),
                path: info.path().to_string_lossy().into_owned(),
                serial: info.serial_number().map(|s| s.to_string()),
            });
        }
    }

    debug!(count = devices.len(), "Device enumeration complete");
    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::K70_MK2_ZONE_SIZE;

    #[test]
    fn model_from_known_pid() {
        assert_eq!(KeyboardModel::from_pid(0x1B6B), Some(KeyboardModel::K70RgbMk2Se));
        assert_eq!(KeyboardModel::from_pid(0x1B49), Some(KeyboardModel::K70RgbMk2));
    }

    #[test]
    fn model_from_unknown_pid() {
        assert_eq!(KeyboardModel::from_pid(0x1B2D), None);
        assert_eq!(KeyboardModel::from_pid(0x0000), None);
    }

    #[test]
    fn model_pid_roundtrip() {
        for model in KeyboardModel::ALL {
            assert_eq!(KeyboardModel::from_pid(model.pid()), Some(*model));
            assert!(!model.name().is_empty());
        }
    }

    #[test]
    fn all_models_use_full_table() {
        for model in KeyboardModel::ALL {
            assert_eq!(model.table().zone_size(), K70_MK2_ZONE_SIZE);
        }
    }
}
