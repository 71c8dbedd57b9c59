//! Device session: attach, configure, and stream per-key colors.
//!
//! A session moves `Detached → Attached → Closed` and never goes back. It owns
//! the HID channel while attached; the channel is released when the session is
//! closed or dropped, whichever comes first.
//!
//! The protocol has no acknowledgement for configuration or streaming writes.
//! Configuration write failures are logged and otherwise ignored; streaming
//! reports surface only the transport's own write result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::color::{stream_chunks, Channel, ChannelBuffers, Color, LedFrame, STREAM_CHUNK_SIZES};
use crate::error::{Error, Result};
use crate::identity::{self, DeviceIdentity};
use crate::keymap::KeyAddressTable;
use crate::report::{lighting_control, property, Report};
use crate::transport::{send_report, HidBackend, HidChannel};
use tracing::{debug, info, warn};

/// Lighting control channel target: 3 for keyboards and headset stands, 1 for mice and mousepads.
const LIGHTING_CONTROL_TARGET_KEYBOARD: u8 = 0x03;

/// Sub-selector for the model-specific lighting control write.
const LIGHTING_CONTROL_MODEL_SPECIFIC: u8 = 0x08;

/// Identifiers carried per identifier-table packet.
const KEY_ID_PACKET_ENTRIES: usize = 30;

/// Flag byte following each identifier in the identifier table.
const KEY_ID_FLAG: u8 = 0xC0;

/// Submit finish marker: more channels follow.
const SUBMIT_CONTINUE: u8 = 0x01;
/// Submit finish marker: last channel of the frame.
const SUBMIT_FINISH: u8 = 0x02;

/// Cooperative cancellation flag shared with a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of [`DeviceSession::attach_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    Cancelled,
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Detached,
    Attached,
    Closed,
}

enum Link<C> {
    Detached,
    Attached(C),
    Closed,
}

/// A session with one keyboard.
pub struct DeviceSession<'a, B: HidBackend> {
    backend: &'a B,
    table: &'static KeyAddressTable,
    link: Link<B::Channel>,
}

impl<'a, B: HidBackend> DeviceSession<'a, B> {
    /// Create a detached session for a keyboard model.
    pub fn new(backend: &'a B, table: &'static KeyAddressTable) -> Self {
        Self {
            backend,
            table,
            link: Link::Detached,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.link {
            Link::Detached => SessionState::Detached,
            Link::Attached(_) => SessionState::Attached,
            Link::Closed => SessionState::Closed,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.state() == SessionState::Attached
    }

    /// Open the device and run the configuration sequence.
    ///
    /// Fails with [`Error::AlreadyAttached`] if a channel is already held, and
    /// with [`Error::SessionClosed`] after [`close`](Self::close). If the device
    /// can not be opened the session stays detached.
    pub fn attach(&mut self, vid: u16, pid: u16) -> Result<()> {
        match self.link {
            Link::Attached(_) => return Err(Error::AlreadyAttached),
            Link::Closed => return Err(Error::SessionClosed),
            Link::Detached => {}
        }

        let channel = self.backend.open(vid, pid)?;
        let failed = configure(&channel, self.table);
        if failed > 0 {
            warn!(failed, "Configuration writes failed; lighting may not apply");
        }

        info!(
            model = self.table.name,
            vid = format_args!("0x{:04X}", vid),
            pid = format_args!("0x{:04X}", pid),
            "Attached to keyboard"
        );
        self.link = Link::Attached(channel);
        Ok(())
    }

    /// Retry [`attach`](Self::attach) until it succeeds or `token` is cancelled.
    ///
    /// The token is checked once per attempt. Only open failures are retried.
    pub fn attach_until(
        &mut self,
        vid: u16,
        pid: u16,
        token: &CancellationToken,
    ) -> Result<AttachOutcome> {
        let mut attempts: u64 = 0;
        while !token.is_cancelled() {
            attempts += 1;
            match self.attach(vid, pid) {
                Ok(()) => {
                    debug!(attempts, "Attach succeeded");
                    return Ok(AttachOutcome::Attached);
                }
                Err(Error::DeviceNotFound(msg)) | Err(Error::Hid(msg)) => {
                    if attempts == 1 {
                        info!("Waiting for keyboard: {msg}");
                    }
                }
                Err(e) => return Err(e),
            }
        }
        debug!(attempts, "Attach cancelled");
        Ok(AttachOutcome::Cancelled)
    }

    /// Stream one color per logical slot and commit it.
    ///
    /// Sends no traffic unless attached. Colors for slots without a lighting
    /// identifier are dropped.
    pub fn send_colors(&self, colors: &[Color]) -> Result<()> {
        let channel = self.channel()?;
        let buffers = ChannelBuffers::from_colors(self.table, colors);

        for channel_id in Channel::ALL {
            let data = buffers.channel(channel_id);
            for (packet_id, chunk) in stream_chunks(data) {
                send_report(channel, &Report::stream(packet_id, chunk))?;
            }

            let finish = if channel_id == Channel::Blue {
                SUBMIT_FINISH
            } else {
                SUBMIT_CONTINUE
            };
            send_report(
                channel,
                &Report::write(
                    &[
                        property::SUBMIT_KEYBOARD_COLOR_24,
                        channel_id.number(),
                        STREAM_CHUNK_SIZES.len() as u8,
                        finish,
                    ],
                    &[],
                ),
            )?;
        }

        debug!(slots = colors.len(), "Streamed color frame");
        Ok(())
    }

    /// Stream a [`LedFrame`].
    pub fn send_frame(&self, frame: &LedFrame) -> Result<()> {
        if !std::ptr::eq(frame.table(), self.table) {
            warn!(
                frame_model = frame.table().name,
                session_model = self.table.name,
                "Frame was built for a different key table"
            );
        }
        self.send_colors(frame.colors())
    }

    /// Query firmware and device identification.
    pub fn read_identity(&self) -> Result<DeviceIdentity> {
        identity::read_identity(self.channel()?)
    }

    /// Release the channel. The session can not be attached again.
    pub fn close(&mut self) {
        if let Link::Attached(_) = self.link {
            debug!("Releasing HID channel");
        }
        self.link = Link::Closed;
    }

    fn channel(&self) -> Result<&B::Channel> {
        match &self.link {
            Link::Attached(channel) => Ok(channel),
            Link::Detached => Err(Error::NotAttached),
            Link::Closed => Err(Error::SessionClosed),
        }
    }
}

/// Run the post-attach configuration sequence. Returns the number of failed writes.
fn configure(channel: &dyn HidChannel, table: &KeyAddressTable) -> usize {
    let mut reports = vec![
        (
            "special function control",
            Report::write(
                &[property::SPECIAL_FUNCTION, lighting_control::SOFTWARE],
                &[],
            ),
        ),
        (
            "lighting control",
            Report::write(
                &[property::LIGHTING_CONTROL, lighting_control::SOFTWARE],
                &[LIGHTING_CONTROL_TARGET_KEYBOARD],
            ),
        ),
        (
            "model lighting control",
            Report::write(
                &[property::LIGHTING_CONTROL, LIGHTING_CONTROL_MODEL_SPECIFIC],
                &[0x01],
            ),
        ),
    ];

    for ids in table.key_id_table().chunks(KEY_ID_PACKET_ENTRIES) {
        let data: Vec<u8> = ids.iter().flat_map(|&id| [id, KEY_ID_FLAG]).collect();
        reports.push((
            "identifier table",
            Report::write(&[property::KEY_ID_TABLE, ids.len() as u8], &data),
        ));
    }

    let mut failed = 0;
    for (step, report) in &reports {
        if let Err(e) = send_report(channel, report) {
            warn!(step = *step, "Configuration write failed: {e}");
            failed += 1;
        }
    }
    debug!(
        reports = reports.len(),
        failed,
        skipped = table.skipped_identifiers().len(),
        "Configuration sequence sent"
    );
    failed
}
