// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The 16-byte CD+G subcode packet: instruction constants and the wire
//! struct itself.
//!
//! Each packet on the wire is 16 bytes: byte 0 is the command (always
//! `0x09` for graphics on an authored stream), byte 1 is the instruction
//! (low 6 bits; the high 2 bits are the subcode channel, always 0 here),
//! bytes 2-3 are parity Q (zero-filled — the authoring side never computes
//! CD parity), and bytes 4-19 are 16 data bytes of which only the low 6
//! bits of each carry payload.

use bytes::{BufMut, BytesMut};

/// Number of bytes in one CD+G packet on the wire: command (1) + instruction
/// (1) + parity Q (2) + data (16).
pub const PACKET_LEN: usize = 20;

/// Number of data bytes carried by a packet.
pub const DATA_LEN: usize = 16;

/// Command byte used for every graphics packet this crate emits.
pub const COMMAND_GRAPHICS: u8 = 0x09;

/// Instruction: fill framebuffer with a color index.
pub const INSTR_MEMORY_PRESET: u8 = 1;
/// Instruction: set the border color.
pub const INSTR_BORDER_PRESET: u8 = 2;
/// Instruction: write a 6x12 tile using two colors.
pub const INSTR_COPY_FONT: u8 = 6;
/// Instruction: jump scroll offsets with no pixel copy.
pub const INSTR_SCROLL_PRESET: u8 = 20;
/// Instruction: scroll with wrap-copy of displaced pixels.
pub const INSTR_SCROLL_COPY: u8 = 24;
/// Instruction: declare a palette index transparent for overlays.
pub const INSTR_DEFINE_TRANSPARENT: u8 = 28;
/// Instruction: replace palette entries 0-7.
pub const INSTR_LOAD_CLUT_LO: u8 = 30;
/// Instruction: replace palette entries 8-15.
pub const INSTR_LOAD_CLUT_HI: u8 = 31;
/// Instruction: XOR-blend a 6x12 tile at a position.
pub const INSTR_XOR_FONT: u8 = 38;

/// The full set of instructions this codec understands. Anything else is
/// silently ignored by the decoder, matching real hardware's tolerance of
/// unknown subcodes.
pub const KNOWN_INSTRUCTIONS: [u8; 9] = [
    INSTR_MEMORY_PRESET,
    INSTR_BORDER_PRESET,
    INSTR_COPY_FONT,
    INSTR_SCROLL_PRESET,
    INSTR_SCROLL_COPY,
    INSTR_DEFINE_TRANSPARENT,
    INSTR_LOAD_CLUT_LO,
    INSTR_LOAD_CLUT_HI,
    INSTR_XOR_FONT,
];

/// Tile width in pixels (columns per 6x12 tile).
pub const TILE_WIDTH: usize = 6;
/// Tile height in pixels (rows per 6x12 tile).
pub const TILE_HEIGHT: usize = 12;

/// One 16-byte CD+G packet.
///
/// A packet with instruction byte `0` and all-zero data is an "empty"
/// packet: the output for a pack-slot with no scheduled work. Emptiness is
/// behavioral, not a separate type — `Packet::empty()` just returns a
/// zeroed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    data: [u8; DATA_LEN],
    instruction: u8,
}

impl Packet {
    /// Returns the zero-filled packet used for pack-slots with no work.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: [0u8; DATA_LEN],
            instruction: 0,
        }
    }

    /// Builds a packet with the given instruction and data bytes (only the
    /// low 6 bits of each data byte are meaningful on the wire; higher
    /// bits are masked off on write).
    #[must_use]
    pub fn new(instruction: u8, data: [u8; DATA_LEN]) -> Self {
        Self { data, instruction }
    }

    /// Whether this is the all-zero empty packet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruction == 0 && self.data == [0u8; DATA_LEN]
    }

    /// The instruction opcode (low 6 bits only; always in range 0-63).
    #[must_use]
    pub const fn instruction(&self) -> u8 {
        self.instruction
    }

    /// The 16 data bytes, masked to their low 6 bits.
    #[must_use]
    pub fn data(&self) -> [u8; DATA_LEN] {
        let mut masked = self.data;
        for byte in &mut masked {
            *byte &= 0x3F;
        }
        masked
    }

    /// Builds a `COPY_FONT`/`XOR_FONT` tile packet.
    ///
    /// `row` must be in 0..18 and `col` in 0..50; `row_masks` holds twelve
    /// 6-bit row masks (bit 5 is the leftmost pixel of the tile), MSB-first.
    #[must_use]
    pub fn tile(
        instruction: u8,
        color0: u8,
        color1: u8,
        row: u8,
        col: u8,
        row_masks: [u8; TILE_HEIGHT],
    ) -> Self {
        let mut data = [0u8; DATA_LEN];
        data[0] = color0 & 0x0F;
        data[1] = color1 & 0x0F;
        data[2] = row & 0x1F;
        data[3] = col & 0x3F;
        for (i, mask) in row_masks.iter().enumerate() {
            data[4 + i] = mask & 0x3F;
        }
        Self::new(instruction, data)
    }

    /// Builds a `MEMORY_PRESET` packet filling the framebuffer with `color`.
    /// `repeat` is the informational repeat count some encoders place in
    /// the low nibble of data byte 1; this crate always writes 0 since it
    /// authors a single emission and relies on the decoder applying the
    /// preset idempotently.
    #[must_use]
    pub fn memory_preset(color: u8, repeat: u8) -> Self {
        let mut data = [0u8; DATA_LEN];
        data[0] = color & 0x0F;
        data[1] = repeat & 0x0F;
        Self::new(INSTR_MEMORY_PRESET, data)
    }

    /// Builds a `BORDER_PRESET` packet.
    #[must_use]
    pub fn border_preset(color: u8) -> Self {
        let mut data = [0u8; DATA_LEN];
        data[0] = color & 0x0F;
        Self::new(INSTR_BORDER_PRESET, data)
    }

    /// Builds a `DEFINE_TRANSPARENT` packet.
    #[must_use]
    pub fn define_transparent(color: u8) -> Self {
        let mut data = [0u8; DATA_LEN];
        data[0] = color & 0x0F;
        Self::new(INSTR_DEFINE_TRANSPARENT, data)
    }

    /// Builds a `LOAD_CLUT_LO` or `LOAD_CLUT_HI` packet from a 16-byte
    /// payload produced by [`crate::palette::Palette::quantize_to_cdg`].
    #[must_use]
    pub fn load_clut(instruction: u8, payload: &[u8]) -> Self {
        let mut data = [0u8; DATA_LEN];
        let n = payload.len().min(DATA_LEN);
        data[..n].copy_from_slice(&payload[..n]);
        Self::new(instruction, data)
    }

    /// Builds a `SCROLL_PRESET` or `SCROLL_COPY` packet. `h_cmd`/`v_cmd`
    /// hold the 2-bit scroll direction codes in bits 5-4 of data bytes 1
    /// and 2 respectively (0 = none, 1 = forward, 2 = backward); `h_offset`
    /// and `v_offset` carry the fine pixel offsets in the low bits.
    #[must_use]
    pub fn scroll(instruction: u8, h_cmd: u8, h_offset: u8, v_cmd: u8, v_offset: u8) -> Self {
        let mut data = [0u8; DATA_LEN];
        data[1] = ((h_cmd & 0x3) << 4) | (h_offset & 0x07);
        data[2] = ((v_cmd & 0x3) << 4) | (v_offset & 0x0F);
        Self::new(instruction, data)
    }

    /// Decodes the `(color0, color1, row, col, row_masks)` tuple from a
    /// `COPY_FONT`/`XOR_FONT` packet. Does not check the instruction byte;
    /// callers dispatch on [`Packet::instruction`] first.
    #[must_use]
    pub fn tile_payload(&self) -> (u8, u8, u8, u8, [u8; TILE_HEIGHT]) {
        let d = self.data();
        let color0 = d[0] & 0x0F;
        let color1 = d[1] & 0x0F;
        let row = d[2] & 0x1F;
        let col = d[3] & 0x3F;
        let mut masks = [0u8; TILE_HEIGHT];
        masks.copy_from_slice(&d[4..16]);
        (color0, color1, row, col, masks)
    }

    /// Serializes this packet to exactly [`PACKET_LEN`] bytes: command,
    /// instruction, 2 bytes of zero-filled parity Q, then 16 data bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        if self.is_empty() {
            return [0u8; PACKET_LEN];
        }
        let mut buf = BytesMut::with_capacity(PACKET_LEN);
        buf.put_u8(COMMAND_GRAPHICS);
        buf.put_u8(self.instruction & 0x3F);
        buf.put_u16(0); // parity Q, not computed by the encoder
        buf.put_slice(&self.data());
        let mut out = [0u8; PACKET_LEN];
        out.copy_from_slice(&buf);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_packet_is_all_zero_bytes() {
        assert_eq!(Packet::empty().to_bytes(), [0u8; PACKET_LEN]);
    }

    #[test]
    fn serializes_to_exactly_16_bytes() {
        let p = Packet::tile(INSTR_COPY_FONT, 1, 2, 5, 10, [0x3F; TILE_HEIGHT]);
        assert_eq!(p.to_bytes().len(), PACKET_LEN);
    }

    #[test]
    fn tile_round_trips_through_packet() {
        let masks = [
            0x3F, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01, 0x3F, 0x00, 0x15, 0x2A, 0x3F,
        ];
        let p = Packet::tile(INSTR_XOR_FONT, 7, 9, 17, 49, masks);
        let (c0, c1, row, col, decoded_masks) = p.tile_payload();
        assert_eq!(c0, 7);
        assert_eq!(c1, 9);
        assert_eq!(row, 17);
        assert_eq!(col, 49);
        assert_eq!(decoded_masks, masks);
    }

    #[test]
    fn only_known_instructions_are_nine() {
        assert_eq!(KNOWN_INSTRUCTIONS.len(), 9);
    }
}
