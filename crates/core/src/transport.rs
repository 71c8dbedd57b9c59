//! HID transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface. A channel is released when it is
//! dropped.

use crate::error::{Error, Result};
use crate::report::Report;
use tracing::{debug, trace};

/// An open HID channel to one device.
pub trait HidChannel: Send {
    /// Write an output report. Returns bytes written.
    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Read an input report, waiting at most `timeout_ms`. Returns bytes read (0 on timeout).
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize>;

    /// Send a feature report. `data[0]` is the report ID.
    fn send_feature_report(&self, data: &[u8]) -> Result<()>;

    /// Get a feature report. `buf[0]` selects the report ID. Returns bytes read.
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize>;
}

/// Opens HID channels by vendor/product ID.
pub trait HidBackend {
    type Channel: HidChannel;

    /// Open the first device matching `vid`/`pid`.
    fn open(&self, vid: u16, pid: u16) -> Result<Self::Channel>;
}

/// Write one report to a channel.
pub fn send_report(channel: &dyn HidChannel, report: &Report) -> Result<usize> {
    trace!(
        command = format_args!("0x{:02X}", report.command()),
        selector = format_args!("0x{:02X}", report.byte(2)),
        report_hex = format_args!("{:?}", report),
        "Corsair TX"
    );
    channel.write(report.as_bytes())
}

/// hidapi-backed backend. Dropping it shuts the HID subsystem down.
pub struct HidApiBackend {
    api: hidapi::HidApi,
}

impl HidApiBackend {
    /// Initialise the HID subsystem.
    pub fn new() -> Result<Self> {
        let api = hidapi::HidApi::new().map_err(|e| Error::Hid(format!("hidapi init: {e}")))?;
        Ok(Self { api })
    }

    /// Underlying hidapi context, for enumeration.
    pub fn api(&self) -> &hidapi::HidApi {
        &self.api
    }
}

impl HidBackend for HidApiBackend {
    type Channel = HidApiChannel;

    fn open(&self, vid: u16, pid: u16) -> Result<HidApiChannel> {
        let device = self.api.open(vid, pid).map_err(|e| {
            Error::DeviceNotFound(format!("VID=0x{vid:04X} PID=0x{pid:04X}: {e}"))
        })?;
        debug!(
            vid = format_args!("0x{:04X}", vid),
            pid = format_args!("0x{:04X}", pid),
            "Opened HID channel"
        );
        Ok(HidApiChannel { device })
    }
}

/// A channel over a real hidapi device.
pub struct HidApiChannel {
    device: hidapi::HidDevice,
}

impl HidChannel for HidApiChannel {
    fn write(&self, data: &[u8]) -> Result<usize> {
        self.device
            .write(data)
            .map_err(|e| Error::Hid(format!("write: {e}")))
    }

    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(|e| Error::Hid(format!("read_timeout: {e}")))
    }

    fn send_feature_report(&self, data: &[u8]) -> Result<()> {
        self.device
            .send_feature_report(data)
            .map_err(|e| Error::Hid(format!("send_feature_report: {e}")))
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize> {
        self.device
            .get_feature_report(buf)
            .map_err(|e| Error::Hid(format!("get_feature_report: {e}")))
    }
}

/// A mock HID transport for testing.
///
/// Records every report written and serves canned replies.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Observable state shared between a backend and the channels it opens.
    #[derive(Default)]
    pub struct MockState {
        /// Every output report, in order.
        pub writes: Vec<Vec<u8>>,
        /// Every feature report sent, in order.
        pub feature_sent: Vec<Vec<u8>>,
        /// Reply served by `read_timeout`. `None` simulates a timeout.
        pub read_reply: Option<Vec<u8>>,
        /// Reply served by `get_feature_report`.
        pub feature_reply: Option<Vec<u8>>,
        /// Make every write fail.
        pub fail_writes: bool,
        /// Number of channels dropped.
        pub released: usize,
        /// Number of successful opens.
        pub opens: usize,
        /// Number of open attempts, successful or not.
        pub open_attempts: usize,
    }

    /// Mock backend that fails the first `open_failures` opens.
    pub struct MockBackend {
        pub state: Arc<Mutex<MockState>>,
        open_failures: Mutex<usize>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::failing_opens(0)
        }

        pub fn failing_opens(count: usize) -> Self {
            Self {
                state: Arc::new(Mutex::new(MockState::default())),
                open_failures: Mutex::new(count),
            }
        }

        /// Output reports written so far.
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.state.lock().unwrap().writes.clone()
        }

        pub fn released(&self) -> usize {
            self.state.lock().unwrap().released
        }
    }

    impl HidBackend for MockBackend {
        type Channel = MockChannel;

        fn open(&self, vid: u16, pid: u16) -> Result<MockChannel> {
            self.state.lock().unwrap().open_attempts += 1;
            let mut failures = self.open_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::DeviceNotFound(format!(
                    "mock: VID=0x{vid:04X} PID=0x{pid:04X} not present"
                )));
            }
            self.state.lock().unwrap().opens += 1;
            Ok(MockChannel {
                state: Arc::clone(&self.state),
            })
        }
    }

    /// Channel handed out by [`MockBackend`].
    pub struct MockChannel {
        state: Arc<Mutex<MockState>>,
    }

    impl HidChannel for MockChannel {
        fn write(&self, data: &[u8]) -> Result<usize> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(Error::Hid("mock: write failed".into()));
            }
            state.writes.push(data.to_vec());
            Ok(data.len())
        }

        fn read_timeout(&self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize> {
            let state = self.state.lock().unwrap();
            match &state.read_reply {
                Some(reply) => {
                    let n = reply.len().min(buf.len());
                    buf[..n].copy_from_slice(&reply[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }

        fn send_feature_report(&self, data: &[u8]) -> Result<()> {
            self.state.lock().unwrap().feature_sent.push(data.to_vec());
            Ok(())
        }

        fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize> {
            let state = self.state.lock().unwrap();
            let reply = state
                .feature_reply
                .as_ref()
                .ok_or_else(|| Error::Hid("mock: no feature report registered".into()))?;
            let n = reply.len().min(buf.len());
            buf[..n].copy_from_slice(&reply[..n]);
            Ok(n)
        }
    }

    impl Drop for MockChannel {
        fn drop(&mut self) {
            if let Ok(mut state) = self.state.lock() {
                state.released += 1;
            }
        }
    }
}
