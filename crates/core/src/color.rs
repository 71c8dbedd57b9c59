//! Colors, per-key frames, and per-channel stream buffers.

use crate::keymap::{KeyAddressTable, CHANNEL_BUFFER_LEN};
use serde::Serialize;
use tracing::debug;

/// Chunk sizes for streaming one channel buffer (packet IDs 1, 2, 3).
pub const STREAM_CHUNK_SIZES: [usize; 3] = [60, 60, 24];

/// Bytes of each channel buffer actually streamed to the device.
pub const STREAM_LEN: usize = 144;

/// A raw device-space RGB color. No gamma, no alpha.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// One static lighting frame: a color per logical slot of a keyboard model.
#[derive(Debug, Clone)]
pub struct LedFrame {
    table: &'static KeyAddressTable,
    colors: Vec<Color>,
}

impl LedFrame {
    /// All keys off.
    pub fn new(table: &'static KeyAddressTable) -> Self {
        Self::uniform(table, Color::BLACK)
    }

    /// Every slot set to `color`.
    pub fn uniform(table: &'static KeyAddressTable, color: Color) -> Self {
        Self {
            table,
            colors: vec![color; table.zone_size()],
        }
    }

    /// Set a logical slot. Returns `false` if the slot does not exist.
    pub fn set_slot(&mut self, slot: usize, color: Color) -> bool {
        match self.colors.get_mut(slot) {
            Some(c) => {
                *c = color;
                true
            }
            None => false,
        }
    }

    /// Set the key at a visual matrix position.
    ///
    /// Returns `false` for positions with no key; the frame is left unchanged.
    pub fn set_matrix(&mut self, row: usize, col: usize, color: Color) -> bool {
        match self.table.matrix_slot(row, col) {
            Some(slot) => self.set_slot(slot, color),
            None => false,
        }
    }

    /// Model table this frame addresses.
    pub fn table(&self) -> &'static KeyAddressTable {
        self.table
    }

    /// Per-slot colors in slot order.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

/// Stream channel numbers, in transmission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    Red = 1,
    Green = 2,
    Blue = 3,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Wire value used in the submit report.
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Three zero-initialised buffers indexed by lighting identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBuffers {
    pub red: [u8; CHANNEL_BUFFER_LEN],
    pub green: [u8; CHANNEL_BUFFER_LEN],
    pub blue: [u8; CHANNEL_BUFFER_LEN],
}

impl Default for ChannelBuffers {
    fn default() -> Self {
        Self {
            red: [0; CHANNEL_BUFFER_LEN],
            green: [0; CHANNEL_BUFFER_LEN],
            blue: [0; CHANNEL_BUFFER_LEN],
        }
    }
}

impl ChannelBuffers {
    /// Scatter per-slot colors into identifier-indexed buffers.
    ///
    /// Slot `i` of `colors` is written at `table.slot_to_identifier(i)`.
    /// Slots without a mapping are skipped.
    pub fn from_colors(table: &KeyAddressTable, colors: &[Color]) -> Self {
        let mut buffers = Self::default();
        let mut unmapped = 0usize;

        for (slot, color) in colors.iter().enumerate() {
            let Some(id) = table.slot_to_identifier(slot) else {
                unmapped += 1;
                continue;
            };
            let id = id as usize;
            buffers.red[id] = color.r;
            buffers.green[id] = color.g;
            buffers.blue[id] = color.b;
        }

        if unmapped > 0 {
            debug!(
                model = table.name,
                unmapped, "Ignored colors for slots with no lighting identifier"
            );
        }
        buffers
    }

    /// Buffer for one channel.
    pub fn channel(&self, channel: Channel) -> &[u8; CHANNEL_BUFFER_LEN] {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }
}

/// Split the streamed prefix of a channel buffer into `(packet_id, chunk)` pairs.
pub fn stream_chunks(buffer: &[u8; CHANNEL_BUFFER_LEN]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut start = 0usize;
    STREAM_CHUNK_SIZES
        .iter()
        .enumerate()
        .map(move |(i, &len)| {
            let chunk = &buffer[start..start + len];
            start += len;
            (i as u8 + 1, chunk)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::{K70_MK2, K70_MK2_ZONE_SIZE};

    #[test]
    fn chunk_sizes_cover_stream_len() {
        assert_eq!(STREAM_CHUNK_SIZES.iter().sum::<usize>(), STREAM_LEN);
        assert!(STREAM_LEN <= CHANNEL_BUFFER_LEN);
    }

    #[test]
    fn chunks_reassemble_in_packet_order() {
        let mut buffer = [0u8; CHANNEL_BUFFER_LEN];
        for (i, b) in buffer.iter_mut().enumerate() {
            *b = (i * 7 % 251) as u8;
        }

        let chunks: Vec<(u8, &[u8])> = stream_chunks(&buffer).collect();
        assert_eq!(
            chunks.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            chunks.iter().map(|(_, c)| c.len()).collect::<Vec<_>>(),
            vec![60, 60, 24]
        );

        let joined: Vec<u8> = chunks.iter().flat_map(|(_, c)| c.iter().copied()).collect();
        assert_eq!(&joined[..], &buffer[..STREAM_LEN]);
    }

    #[test]
    fn uniform_color_fills_mapped_identifiers_only() {
        let colors = vec![Color::new(255, 0, 128); K70_MK2_ZONE_SIZE];
        let buffers = ChannelBuffers::from_colors(&K70_MK2, &colors);

        let mapped: Vec<usize> = (0..K70_MK2_ZONE_SIZE)
            .map(|slot| K70_MK2.slot_to_identifier(slot).unwrap() as usize)
            .collect();

        for id in 0..CHANNEL_BUFFER_LEN {
            if mapped.contains(&id) {
                assert_eq!(buffers.red[id], 255, "red at {id}");
                assert_eq!(buffers.blue[id], 128, "blue at {id}");
            } else {
                assert_eq!(buffers.red[id], 0, "red at {id}");
                assert_eq!(buffers.blue[id], 0, "blue at {id}");
            }
        }
        assert!(buffers.green.iter().all(|&b| b == 0));
    }

    #[test]
    fn extra_slots_are_ignored() {
        let colors = vec![Color::new(1, 2, 3); K70_MK2_ZONE_SIZE + 10];
        let buffers = ChannelBuffers::from_colors(&K70_MK2, &colors);
        let expected = ChannelBuffers::from_colors(&K70_MK2, &colors[..K70_MK2_ZONE_SIZE]);
        assert_eq!(buffers, expected);
    }

    #[test]
    fn short_color_list_leaves_rest_zero() {
        let buffers = ChannelBuffers::from_colors(&K70_MK2, &[Color::new(9, 9, 9)]);
        assert_eq!(buffers.red[0], 9);
        assert_eq!(buffers.red.iter().filter(|&&b| b != 0).count(), 1);
    }

    #[test]
    fn frame_set_matrix_targets_slot() {
        let mut frame = LedFrame::new(&K70_MK2);
        assert!(frame.set_matrix(1, 0, Color::new(10, 20, 30)));
        assert_eq!(frame.colors()[0], Color::new(10, 20, 30));
    }

    #[test]
    fn frame_set_matrix_on_gap_is_noop() {
        let mut frame = LedFrame::new(&K70_MK2);
        assert!(!frame.set_matrix(0, 0, Color::new(1, 1, 1)));
        assert!(frame.colors().iter().all(|c| *c == Color::BLACK));
    }

    #[test]
    fn frame_set_slot_bounds() {
        let mut frame = LedFrame::uniform(&K70_MK2, Color::new(5, 5, 5));
        assert_eq!(frame.colors().len(), K70_MK2_ZONE_SIZE);
        assert!(frame.set_slot(115, Color::BLACK));
        assert!(!frame.set_slot(116, Color::BLACK));
    }

    #[test]
    fn channel_numbers() {
        assert_eq!(
            Channel::ALL.map(Channel::number),
            [1, 2, 3]
        );
    }

    #[test]
    fn color_display_is_hex() {
        assert_eq!(Color::new(255, 0, 128).to_string(), "#FF0080");
    }

    #[test]
    fn color_serializes_as_channel_fields() {
        let json = serde_json::to_value(Color::new(255, 0, 128)).unwrap();
        assert_eq!(json, serde_json::json!({ "r": 255, "g": 0, "b": 128 }));
    }
}
