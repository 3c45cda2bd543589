//! Packet stream → framebuffer/palette/border, and the framebuffer → RGB
//! render step. This is the codec's inverse: anything the tile encoder and
//! scheduler produce must round-trip through this decoder.

use crate::packet::{
    Packet, INSTR_BORDER_PRESET, INSTR_COPY_FONT, INSTR_DEFINE_TRANSPARENT,
    INSTR_LOAD_CLUT_HI, INSTR_LOAD_CLUT_LO, INSTR_MEMORY_PRESET, INSTR_SCROLL_COPY,
    INSTR_SCROLL_PRESET, INSTR_XOR_FONT,
};
use crate::palette::{Palette, Rgba};
use crate::tile::Tile;

/// Framebuffer width in pixels.
pub const FB_WIDTH: usize = 300;
/// Framebuffer height in pixels.
pub const FB_HEIGHT: usize = 216;
/// Tile columns across the framebuffer.
pub const TILE_COLS: usize = 50;
/// Tile rows across the framebuffer.
pub const TILE_ROWS: usize = 18;

/// Rendered output width (active area plus border margins).
pub const RENDER_WIDTH: usize = 312;
/// Rendered output height (active area plus border margins).
pub const RENDER_HEIGHT: usize = 216;

/// Decodes a CD+G packet stream, maintaining the same state a hardware
/// decoder would: palette, border, transparent index, scroll offsets, and
/// a 300x216 indexed framebuffer.
///
/// The decoder never fails: unknown instructions are ignored, and
/// out-of-range tile/scroll coordinates simply drop the packet's effect.
pub struct Decoder {
    framebuffer: Vec<u8>,
    palette: Palette,
    border: u8,
    transparent_index: Option<u8>,
    h_scroll: i32,
    v_scroll: i32,
}

impl Decoder {
    /// Creates a decoder with a cleared (all-zero) framebuffer, black
    /// palette, and no scroll offset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            framebuffer: vec![0u8; FB_WIDTH * FB_HEIGHT],
            palette: Palette::new(),
            border: 0,
            transparent_index: None,
            h_scroll: 0,
            v_scroll: 0,
        }
    }

    /// The current palette.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The current border color index.
    #[must_use]
    pub const fn border(&self) -> u8 {
        self.border
    }

    /// The palette index currently marked transparent for export, if any.
    #[must_use]
    pub const fn transparent_index(&self) -> Option<u8> {
        self.transparent_index
    }

    /// Applies one packet's effect, dispatching on its instruction.
    /// Unknown instructions are silently ignored.
    pub fn apply(&mut self, packet: &Packet) {
        match packet.instruction() {
            INSTR_MEMORY_PRESET => self.apply_memory_preset(packet),
            INSTR_BORDER_PRESET => self.apply_border_preset(packet),
            INSTR_COPY_FONT => self.apply_tile(packet, false),
            INSTR_XOR_FONT => self.apply_tile(packet, true),
            INSTR_LOAD_CLUT_LO => {
                let _ = self.palette.load_cdg_clut_lo(&packet.data());
            }
            INSTR_LOAD_CLUT_HI => {
                let _ = self.palette.load_cdg_clut_hi(&packet.data());
            }
            INSTR_DEFINE_TRANSPARENT => {
                self.transparent_index = Some(packet.data()[0] & 0x0F);
            }
            INSTR_SCROLL_PRESET | INSTR_SCROLL_COPY => self.apply_scroll(packet),
            _ => {} // unknown instruction: ignored, matching real hardware
        }
    }

    fn apply_memory_preset(&mut self, packet: &Packet) {
        let color = packet.data()[0] & 0x0F;
        for cell in &mut self.framebuffer {
            *cell = color;
        }
    }

    fn apply_border_preset(&mut self, packet: &Packet) {
        self.border = packet.data()[0] & 0x0F;
    }

    fn apply_tile(&mut self, packet: &Packet, xor: bool) {
        let (color0, color1, row, col, masks) = packet.tile_payload();
        if row as usize >= TILE_ROWS || col as usize >= TILE_COLS {
            return; // out-of-range tile: dropped
        }
        for (y, mask) in masks.iter().enumerate() {
            for x in 0..6usize {
                let bit_set = mask & (1 << (5 - x)) != 0;
                let value = if bit_set { color1 } else { color0 };
                let px = col as usize * 6 + x;
                let py = row as usize * 12 + y;
                let idx = py * FB_WIDTH + px;
                if xor {
                    self.framebuffer[idx] ^= value;
                } else {
                    self.framebuffer[idx] = value;
                }
            }
        }
    }

    /// Both scroll instructions only ever update the fine pixel offset;
    /// the stored framebuffer is never rewritten. The "wrap-copy" of
    /// `SCROLL_COPY` falls out of `render_rgb`'s modular sampling for
    /// free: displaced columns/rows reappear on the opposite edge without
    /// the decoder needing to physically shift anything.
    fn apply_scroll(&mut self, packet: &Packet) {
        let data = packet.data();
        let h_offset = data[1] & 0x07;
        let v_offset = data[2] & 0x0F;
        self.h_scroll = i32::from(h_offset);
        self.v_scroll = i32::from(v_offset);
    }

    /// Reads the palette index at framebuffer pixel `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.framebuffer[y * FB_WIDTH + x]
    }

    /// Reads the 6x12 tile at tile coordinate `(col, row)` as a [`Tile`].
    /// Framebuffer cells are always real palette indices (0-15); the
    /// decoder never produces the transparency sentinel.
    #[must_use]
    pub fn read_tile(&self, col: u8, row: u8) -> Tile {
        let mut tile = Tile::transparent();
        for y in 0..12usize {
            for x in 0..6usize {
                let px = col as usize * 6 + x;
                let py = row as usize * 12 + y;
                tile.set(x, y, self.framebuffer[py * FB_WIDTH + px] as u16);
            }
        }
        tile
    }

    /// Renders the full 312x216 RGB image: border margins plus the
    /// 288x192 active area, sampled through the current scroll offset and
    /// the current palette. Pixels whose index equals the current
    /// transparent index are returned with alpha 0.
    #[must_use]
    pub fn render_rgb(&self) -> Vec<Rgba> {
        let mut out = vec![Rgba::default(); RENDER_WIDTH * RENDER_HEIGHT];
        let border_color = self.color_for_index(self.border);

        for y in 0..RENDER_HEIGHT {
            for x in 0..RENDER_WIDTH {
                let in_active = (6..294).contains(&x) && (12..204).contains(&y);
                let color = if in_active {
                    let fb_x =
                        (x as i32 - 6 + self.h_scroll).rem_euclid(FB_WIDTH as i32) as usize;
                    let fb_y =
                        (y as i32 - 12 + self.v_scroll).rem_euclid(FB_HEIGHT as i32) as usize;
                    self.color_for_index(self.pixel(fb_x, fb_y))
                } else {
                    border_color
                };
                out[y * RENDER_WIDTH + x] = color;
            }
        }
        out
    }

    fn color_for_index(&self, index: u8) -> Rgba {
        let mut color = self.palette.get(index).unwrap_or_default();
        if self.transparent_index == Some(index) {
            color.a = 0;
        }
        color
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
