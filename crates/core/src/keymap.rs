//! Key-address tables: visual matrix position → logical slot → lighting identifier.
//!
//! The host addresses keys by logical slot (0..116 on the K70 MK2). The
//! firmware addresses them by lighting identifier, which is also the byte
//! offset into each per-channel color buffer.
//!
//! Some firmware builds walk their identifier space sequentially when the
//! host uploads the identifier table. Identifiers that have no physical key on
//! a given layout must be skipped during that walk.

use tracing::{debug, trace};

/// Matrix rows on the K70 MK2 visual layout.
pub const MATRIX_HEIGHT: usize = 7;
/// Matrix columns on the K70 MK2 visual layout.
pub const MATRIX_WIDTH: usize = 23;

/// Number of logical key slots on the K70 MK2.
pub const K70_MK2_ZONE_SIZE: usize = 116;

/// Size of each per-channel color buffer (largest device identifier + 1).
pub const CHANNEL_BUFFER_LEN: usize = 168;

/// Identifier slots uploaded by the identifier table push (4 packets × 30).
pub const KEY_ID_TABLE_LEN: usize = 120;

const NA: Option<u8> = None;

const fn s(slot: u8) -> Option<u8> {
    Some(slot)
}

/// K70 MK2 visual matrix. Each cell holds a logical slot, or `None` where the
/// grid has no key.
#[rustfmt::skip]
static K70_MK2_MATRIX: [[Option<u8>; MATRIX_WIDTH]; MATRIX_HEIGHT] = [
    [NA,     NA,     NA,     s(115), s(107), s(8),   NA,     NA,     NA,     NA,     NA,     s(113), s(114), NA,     NA,     NA,     NA,     NA,     NA,     s(16),  NA,     NA,     NA    ],
    [s(0),   NA,     s(10),  s(18),  s(28),  s(36),  NA,     s(46),  s(55),  s(64),  s(74),  NA,     s(84),  s(93),  s(102), s(6),   s(15),  s(24),  s(33),  s(26),  s(35),  s(44),  s(53) ],
    [s(1),   s(11),  s(19),  s(29),  s(37),  s(47),  s(56),  s(65),  s(75),  s(85),  s(94),  NA,     s(103), s(7),   s(25),  NA,     s(42),  s(51),  s(60),  s(62),  s(72),  s(82),  s(91) ],
    [s(2),   NA,     s(12),  s(20),  s(30),  s(38),  NA,     s(48),  s(57),  s(66),  s(76),  s(86),  s(95),  s(104), s(70),  s(80),  s(34),  s(43),  s(52),  s(9),   s(17),  s(27),  s(100)],
    [s(3),   NA,     s(13),  s(21),  s(31),  s(39),  NA,     s(49),  s(58),  s(67),  s(77),  s(87),  s(96),  s(105), s(98),  s(112), NA,     NA,     NA,     s(45),  s(54),  s(63),  NA    ],
    [s(4),   s(111), s(22),  s(32),  s(40),  s(50),  NA,     s(59),  NA,     s(68),  s(78),  s(88),  s(97),  s(106), s(61),  NA,     NA,     s(81),  NA,     s(73),  s(83),  s(92),  s(109)],
    [s(5),   s(14),  s(23),  NA,     NA,     NA,     NA,     s(41),  NA,     NA,     NA,     NA,     s(69),  s(79),  s(89),  s(71),  s(90),  s(99),  s(108), s(101), NA,     s(110), NA    ],
];

/// K70 MK2 logical slot → lighting identifier.
#[rustfmt::skip]
static K70_MK2_IDENTIFIERS: [u8; K70_MK2_ZONE_SIZE] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0C, 0x0D, 0x0E, 0x0F, 0x11, 0x12, 0x14, 0x15, 0x18, 0x19,
    0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F, 0x20, 0x21, 0x24, 0x25, 0x26, 0x27, 0x28, 0x2A, 0x2B, 0x2C, 0x30, 0x31, 0x32, 0x33,
    0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3C, 0x3D, 0x3E, 0x3F, 0x40, 0x42, 0x43, 0x44, 0x45, 0x48, 0x49, 0x4A, 0x4B, 0x4C,
    0x4E, 0x4F, 0x50, 0x51, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x5B, 0x5C, 0x5D, 0x60, 0x61, 0x62, 0x63, 0x64, 0x65,
    0x66, 0x67, 0x68, 0x69, 0x6C, 0x6D, 0x6E, 0x6F, 0x70, 0x71, 0x73, 0x74, 0x75, 0x78, 0x79, 0x7A, 0x7B, 0x7C, 0x7E, 0x7F,
    0x80, 0x81, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8B, 0x8C, 0x8D, 0x10, 0x72, 0x2F, 0x3B, 0x7D,
];

/// Identifiers with no physical key on the K95 Platinum ANSI layout.
pub static K95_PLATINUM_ANSI_SKIPPED_IDENTIFIERS: [u8; 12] = [
    0x31, 0x3F, 0x41, 0x42, 0x51, 0x53, 0x55, 0x6F, 0x7E, 0x7F, 0x80, 0x81,
];

/// Static addressing data for one keyboard model.
#[derive(Debug, Clone, Copy)]
pub struct KeyAddressTable {
    /// Model name for logs.
    pub name: &'static str,
    matrix: &'static [[Option<u8>; MATRIX_WIDTH]; MATRIX_HEIGHT],
    identifiers: &'static [u8],
    skipped: &'static [u8],
}

/// The K70 RGB MK2 table.
///
/// The K70 MK2 firmware walks the K95 Platinum ANSI identifier space when the
/// identifier table is uploaded, so it carries that skip list.
pub static K70_MK2: KeyAddressTable = KeyAddressTable {
    name: "K70 RGB MK2",
    matrix: &K70_MK2_MATRIX,
    identifiers: &K70_MK2_IDENTIFIERS,
    skipped: &K95_PLATINUM_ANSI_SKIPPED_IDENTIFIERS,
};

impl KeyAddressTable {
    /// Number of logical slots.
    pub fn zone_size(&self) -> usize {
        self.identifiers.len()
    }

    /// Lighting identifier for a logical slot, or `None` if the slot is unmapped.
    pub fn slot_to_identifier(&self, slot: usize) -> Option<u8> {
        self.identifiers.get(slot).copied()
    }

    /// Logical slot at a visual matrix position, or `None` if no key sits there.
    pub fn matrix_slot(&self, row: usize, col: usize) -> Option<usize> {
        self.matrix
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Lighting identifier at a visual matrix position.
    pub fn matrix_identifier(&self, row: usize, col: usize) -> Option<u8> {
        self.matrix_slot(row, col)
            .and_then(|slot| self.slot_to_identifier(slot))
    }

    /// Identifiers that must be skipped when walking the identifier space.
    pub fn skipped_identifiers(&self) -> &'static [u8] {
        self.skipped
    }

    /// Identifier sequence uploaded during configuration.
    pub fn key_id_table(&self) -> Vec<u8> {
        identifier_sequence(self.skipped, KEY_ID_TABLE_LEN)
    }
}

/// Advance `candidate` until it is not in `skipped`.
///
/// Consecutive skipped identifiers are all stepped over. Returns `None` if the
/// walk runs past the last identifier.
pub fn next_valid_identifier(mut candidate: u8, skipped: &[u8]) -> Option<u8> {
    while skipped.contains(&candidate) {
        trace!(identifier = candidate, "Skipping reserved identifier");
        candidate = candidate.checked_add(1)?;
    }
    Some(candidate)
}

/// Walk the identifier space from zero and return the first `count` valid identifiers.
///
/// Stops early once the identifier space is exhausted, so the result may be
/// shorter than `count`.
pub fn identifier_sequence(skipped: &[u8], count: usize) -> Vec<u8> {
    let mut ids = Vec::with_capacity(count.min(u8::MAX as usize + 1));
    let mut next = Some(0u8);
    while ids.len() < count {
        let Some(id) = next.and_then(|c| next_valid_identifier(c, skipped)) else {
            debug!(requested = count, produced = ids.len(), "Identifier space exhausted");
            break;
        };
        ids.push(id);
        next = id.checked_add(1);
    }
    ids
}
