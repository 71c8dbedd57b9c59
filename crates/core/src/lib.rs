//! corsair-rgb-core: Corsair peripheral protocol encoding and per-key lighting.
//!
//! This crate turns a logical lighting frame (one color per key) into the
//! fixed-length HID reports a Corsair K70 RGB MK.2 expects, and drives the
//! attach → configure → stream sequence over a HID channel.

pub mod color;
pub mod device;
pub mod error;
pub mod identity;
pub mod keymap;
pub mod report;
pub mod session;
pub mod transport;

/// Corsair USB Vendor ID.
pub const CORSAIR_VID: u16 = 0x1B1C;

/// Known Corsair K70 RGB MK.2 product IDs.
pub mod pids {
    /// K70 RGB MK.2.
    pub const K70_RGB_MK2: u16 = 0x1B49;
    /// K70 RGB MK.2 Low Profile.
    pub const K70_RGB_MK2_LOW_PROFILE: u16 = 0x1B38;
    /// K70 RGB MK.2 SE.
    pub const K70_RGB_MK2_SE: u16 = 0x1B6B;
    /// K70 RGB MK.2 Low Profile Rapidfire.
    pub const K70_RGB_MK2_LOW_PROFILE_RAPIDFIRE: u16 = 0x1B55;
}
