//! Tile → minimal packet sequence.
//!
//! Dispatches on the count of distinct non-transparent colors in a 6x12
//! tile, the same shape as the teacher crate's `encoding::hextile` dispatch
//! on solid/mono/colored-subrect tiles, generalized from VNC's subrect
//! coding to CD+G's bitmask-row tile coding.

use crate::packet::{Packet, TILE_HEIGHT, INSTR_COPY_FONT, INSTR_XOR_FONT};
use crate::tile::Tile;

/// Encodes a tile at `(col, row)` into the minimal packet sequence that
/// reproduces it. Transparent pixels never cause a mask bit to be set, so
/// a decoder applying the returned packets to any baseline leaves
/// transparent pixels unchanged.
#[must_use]
pub fn encode_tile(tile: &Tile, col: u8, row: u8) -> Vec<Packet> {
    let histogram = tile.color_histogram();
    match histogram.len() {
        0 => Vec::new(),
        1 => {
            let c = histogram[0].0 as u8;
            vec![Packet::tile(INSTR_COPY_FONT, c, c, row, col, [0x3F; TILE_HEIGHT])]
        }
        2 => {
            let c0 = histogram[0].0;
            let c1 = histogram[1].0;
            let masks = mask_where(tile, |v| v == c1);
            vec![Packet::tile(
                INSTR_COPY_FONT,
                c0 as u8,
                c1 as u8,
                row,
                col,
                masks,
            )]
        }
        3 => {
            let c0 = histogram[0].0;
            let c1 = histogram[1].0;
            let c2 = histogram[2].0;

            // Two-color rule treating c2 pixels as c1: bit set iff pixel is
            // c1 or c2, never for transparent cells.
            let copy_masks = mask_where(tile, |v| v == c1 || v == c2);
            let copy = Packet::tile(INSTR_COPY_FONT, c0 as u8, c1 as u8, row, col, copy_masks);

            // Flip c1 -> c2 on exactly the pixels that are actually c2.
            let xor_color1 = (c1 ^ c2) as u8;
            let xor_masks = mask_where(tile, |v| v == c2);
            let xor = Packet::tile(INSTR_XOR_FONT, 0, xor_color1, row, col, xor_masks);

            vec![copy, xor]
        }
        _ => encode_bit_planes(tile, col, row),
    }
}

/// 4+ color case: one packet per set bit of the 4-bit palette index,
/// skipping all-zero planes. The first emitted plane is `COPY_FONT` (it
/// establishes a fresh baseline); later planes XOR their bit in.
fn encode_bit_planes(tile: &Tile, col: u8, row: u8) -> Vec<Packet> {
    let mut packets = Vec::with_capacity(4);
    let mut first = true;
    for k in 0..4u16 {
        let bit = 1u16 << k;
        let masks = mask_where(tile, |v| v & bit != 0);
        if masks.iter().all(|&m| m == 0) {
            continue;
        }
        let instruction = if first {
            INSTR_COPY_FONT
        } else {
            INSTR_XOR_FONT
        };
        packets.push(Packet::tile(instruction, 0, bit as u8, row, col, masks));
        first = false;
    }
    packets
}

/// Builds the twelve row masks for a tile: bit `5-x` of row `y` is set iff
/// `predicate(tile.get(x, y))` holds.
fn mask_where(tile: &Tile, predicate: impl Fn(u16) -> bool) -> [u8; TILE_HEIGHT] {
    let mut masks = [0u8; TILE_HEIGHT];
    for y in 0..TILE_HEIGHT {
        let mut row_mask = 0u8;
        for x in 0..6 {
            if predicate(tile.get(x, y)) {
                row_mask |= 1 << (5 - x);
            }
        }
        masks[y] = row_mask;
    }
    masks
}
