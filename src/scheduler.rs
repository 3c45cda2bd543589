//! Events -> a dense, pack-slot-indexed packet stream.
//!
//! Reservation is greedy and slot-oriented, the same shape as the teacher
//! crate's `client.rs` batching framebuffer-update rectangles before they go
//! out on the wire, adapted from network-batch deferral to pack-slot
//! bookkeeping. Structured logging follows `client.rs`'s
//! `log::{info, debug, warn}` usage around connection lifecycle events.

use crate::bitmap::Bitmap;
use crate::compositor::{Compositor, TILE_COLS, TILE_ROWS};
use crate::error::{CdgError, Result};
use crate::packet::{Packet, INSTR_LOAD_CLUT_HI, INSTR_LOAD_CLUT_LO};
use crate::palette::Palette;
use crate::tile::Tile;
use crate::tile_encoder::encode_tile;
use crate::timeline::{Event, EventTimeline, Payload};
use log::{debug, info, warn};

/// Construction-time scheduler tuning, independent of any global state.
pub struct SchedulerConfig {
    /// Caps tile packets reserved per bitmap/text event even when more
    /// slots are technically free, forcing [`CdgError::Overbudget`] early
    /// rather than silently starving later events. `None` means "use the
    /// event's own `duration_packs`".
    pub pack_budget_per_bitmap_event: Option<u32>,
    /// Duplicates tile packets into otherwise-empty slots once per second,
    /// improving tolerance to decoder packet loss on real hardware. A
    /// pure optimization; the stream is conformant without it.
    pub enable_repetition: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pack_budget_per_bitmap_event: None,
            enable_repetition: false,
        }
    }
}

/// The fixed inputs the scheduler needs beyond the [`SchedulerConfig`].
pub struct SchedulerInput<'a> {
    /// The timeline to schedule.
    pub timeline: &'a EventTimeline,
    /// Total number of pack slots in the output, `ceil(duration_s * 300)`.
    pub total_packs: u32,
    /// Palette loaded by the prelude's `LOAD_CLUT_LO`/`LOAD_CLUT_HI`.
    pub initial_palette: &'a Palette,
    /// Border color preset by the prelude.
    pub initial_border: u8,
    /// Framebuffer clear color preset by the prelude.
    pub initial_clear_color: u8,
    /// Transparent index declared by the prelude.
    pub initial_transparent: u8,
}

const PRELUDE_LEN: u32 = 5;
const REPETITION_INTERVAL: u32 = 300;

/// Schedules `input.timeline` into a dense `Vec<Packet>` of exactly
/// `input.total_packs` frames.
///
/// # Errors
///
/// Returns [`CdgError::Overbudget`] if any event's packets cannot be
/// placed within the available pack budget.
pub fn schedule(input: &SchedulerInput, config: &SchedulerConfig) -> Result<Vec<Packet>> {
    let total_packs = input.total_packs;
    let mut packets = vec![Packet::empty(); total_packs as usize];
    let mut occupied = vec![false; total_packs as usize];

    let mut events: Vec<&Event> = input.timeline.all_events().collect();
    events.sort_by_key(|e| e.start_offset_packs);

    info!(
        "scheduling {} pack(s), {} event(s)",
        total_packs,
        events.len()
    );

    place_prelude(input, &mut packets, &mut occupied)?;

    let mut compositor = Compositor::new();
    compositor.set_preset_color(input.initial_clear_color);
    let mut mirror = vec![input.initial_clear_color; TILE_COLS * 6 * TILE_ROWS * 12];

    for event in events {
        schedule_event(
            event,
            config,
            total_packs,
            &mut packets,
            &mut occupied,
            &mut compositor,
            &mut mirror,
        )?;
    }

    if config.enable_repetition {
        apply_repetition(&mut packets, &occupied, total_packs);
    }

    Ok(packets)
}

fn place_prelude(
    input: &SchedulerInput,
    packets: &mut [Packet],
    occupied: &mut [bool],
) -> Result<()> {
    if input.total_packs < PRELUDE_LEN {
        return Err(CdgError::Overbudget {
            event_label: None,
            pack: 0,
            deficit: PRELUDE_LEN - input.total_packs,
        });
    }
    let clut = input.initial_palette.quantize_to_cdg();
    let prelude = [
        Packet::load_clut(INSTR_LOAD_CLUT_LO, &clut[..16]),
        Packet::load_clut(INSTR_LOAD_CLUT_HI, &clut[16..]),
        Packet::border_preset(input.initial_border),
        Packet::memory_preset(input.initial_clear_color, 0),
        Packet::define_transparent(input.initial_transparent),
    ];
    for (slot, packet) in prelude.into_iter().enumerate() {
        packets[slot] = packet;
        occupied[slot] = true;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn schedule_event(
    event: &Event,
    config: &SchedulerConfig,
    total_packs: u32,
    packets: &mut [Packet],
    occupied: &mut [bool],
    compositor: &mut Compositor,
    mirror: &mut [u8],
) -> Result<()> {
    let start = event.start_offset_packs;

    if let Payload::Palette(palette) = &event.payload {
        let clut = palette.quantize_to_cdg();
        let lo = reserve_single(occupied, start, total_packs, event)?;
        packets[lo as usize] = Packet::load_clut(INSTR_LOAD_CLUT_LO, &clut[..16]);
        let hi = reserve_single(occupied, lo + 1, total_packs, event)?;
        packets[hi as usize] = Packet::load_clut(INSTR_LOAD_CLUT_HI, &clut[16..]);
    }

    if event.border_index < 16 {
        let slot = reserve_single(occupied, start, total_packs, event)?;
        packets[slot as usize] = Packet::border_preset(event.border_index);
    }

    if event.memory_preset_index < 16 {
        let slot = reserve_single(occupied, start, total_packs, event)?;
        packets[slot as usize] = Packet::memory_preset(event.memory_preset_index, 0);
        for z in 0..crate::compositor::LAYERS {
            compositor.clear_layer(z);
        }
        compositor.set_preset_color(event.memory_preset_index);
        mirror.iter_mut().for_each(|c| *c = event.memory_preset_index);
    }

    if let Payload::Scroll {
        h_cmd,
        h_offset,
        v_cmd,
        v_offset,
        copy,
    } = &event.payload
    {
        let instruction = if *copy {
            crate::packet::INSTR_SCROLL_COPY
        } else {
            crate::packet::INSTR_SCROLL_PRESET
        };
        let slot = reserve_single(occupied, start, total_packs, event)?;
        packets[slot as usize] = Packet::scroll(instruction, *h_cmd, *h_offset, *v_cmd, *v_offset);
    }

    let bitmaps: Vec<Bitmap> = match &event.payload {
        Payload::Bitmap(bitmap) => vec![bitmap.clone()],
        Payload::Text {
            content,
            glyphs,
            x,
            y,
            z,
        } => {
            let mut out = Vec::with_capacity(content.chars().count());
            for (i, ch) in content.chars().enumerate() {
                let glyph = glyphs.render(ch, 12)?;
                out.push(glyph.with_offset(x + (i as i32) * 6, *y).with_layer(*z));
            }
            out
        }
        Payload::Palette(_) | Payload::Scroll { .. } | Payload::Clear => Vec::new(),
    };

    if bitmaps.is_empty() {
        return Ok(());
    }

    let mut groups: Vec<(u8, u8, Vec<Packet>)> = Vec::new();
    for bitmap in &bitmaps {
        paint_bitmap(bitmap, compositor);
    }
    for (col, row) in touched_tiles(&bitmaps) {
        let new_tile = compositor.read_composited_tile(col, row);
        let old_tile = mirror_tile(mirror, col, row);
        if new_tile == old_tile {
            continue;
        }
        let tile_packets = encode_tile(&new_tile, col, row);
        if !tile_packets.is_empty() {
            groups.push((col, row, tile_packets));
        }
        write_mirror_tile(mirror, col, row, &new_tile);
    }

    let budget = config
        .pack_budget_per_bitmap_event
        .unwrap_or(event.duration_packs);
    let total_needed: u32 = groups.iter().map(|g| g.2.len() as u32).sum();
    debug!(
        "event {:?}: slots [{}, {}), {} tile packet(s) of {} budgeted",
        event.label, start, start + event.duration_packs, total_needed, budget
    );
    if total_needed > budget {
        warn!(
            "event {:?} overbudget at pack {}: needs {} more pack(s)",
            event.label,
            start,
            total_needed - budget
        );
        return Err(CdgError::Overbudget {
            event_label: event.label.clone(),
            pack: start,
            deficit: total_needed - budget,
        });
    }

    let window_end = (start + budget).min(total_packs);
    let group_count = groups.len() as u32;
    for (index, (col, row, tile_packets)) in groups.into_iter().enumerate() {
        let target = start + (index as u32 * budget) / group_count.max(1);
        let slot = reserve_contiguous(
            occupied,
            target.max(start),
            tile_packets.len() as u32,
            window_end,
            event,
        )?;
        for (i, packet) in tile_packets.into_iter().enumerate() {
            packets[slot as usize + i] = packet;
        }
        let _ = (col, row); // tile coordinates are already encoded in the packets
    }

    Ok(())
}

fn paint_bitmap(bitmap: &Bitmap, compositor: &mut Compositor) {
    let Some((col_start, col_end, row_start, row_end)) = touched_tile_range(bitmap) else {
        return;
    };
    let (x_off, y_off) = bitmap.offset();
    for row in row_start..=row_end {
        for col in col_start..=col_end {
            let mut cells = Tile::transparent();
            for y in 0..12usize {
                for x in 0..6usize {
                    let fb_x = col * 6 + x;
                    let fb_y = row * 12 + y;
                    let local_x = fb_x as i64 - x_off as i64;
                    let local_y = fb_y as i64 - y_off as i64;
                    if local_x < 0
                        || local_y < 0
                        || local_x as usize >= bitmap.width()
                        || local_y as usize >= bitmap.height()
                    {
                        continue;
                    }
                    let value = bitmap.pixel(local_x, local_y);
                    if bitmap.is_transparent(value) {
                        continue;
                    }
                    cells.set(x, y, u16::from(value));
                }
            }
            compositor.write_tile(col as u8, row as u8, bitmap.layer() as usize, &cells);
        }
    }
}

fn touched_tile_range(bitmap: &Bitmap) -> Option<(usize, usize, usize, usize)> {
    let (x_off, y_off) = bitmap.offset();
    let x0 = x_off.max(0) as usize;
    let y0 = y_off.max(0) as usize;
    let x1 = (x_off + bitmap.width() as i32).clamp(0, 300) as usize;
    let y1 = (y_off + bitmap.height() as i32).clamp(0, 216) as usize;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 / 6, (x1 - 1) / 6, y0 / 12, (y1 - 1) / 12))
}

fn touched_tiles(bitmaps: &[Bitmap]) -> Vec<(u8, u8)> {
    let mut seen = std::collections::BTreeSet::new();
    for bitmap in bitmaps {
        let Some((col_start, col_end, row_start, row_end)) = touched_tile_range(bitmap) else {
            continue;
        };
        for row in row_start..=row_end {
            for col in col_start..=col_end {
                seen.insert((row as u8, col as u8));
            }
        }
    }
    seen.into_iter().map(|(row, col)| (col, row)).collect()
}

fn mirror_tile(mirror: &[u8], col: u8, row: u8) -> Tile {
    let mut out = Tile::transparent();
    for y in 0..12usize {
        for x in 0..6usize {
            let fb_x = col as usize * 6 + x;
            let fb_y = row as usize * 12 + y;
            out.set(x, y, u16::from(mirror[fb_y * (TILE_COLS * 6) + fb_x]));
        }
    }
    out
}

fn write_mirror_tile(mirror: &mut [u8], col: u8, row: u8, tile: &Tile) {
    for (x, y, value) in tile.iter() {
        let fb_x = col as usize * 6 + x;
        let fb_y = row as usize * 12 + y;
        mirror[fb_y * (TILE_COLS * 6) + fb_x] = value as u8;
    }
}

fn reserve_single(occupied: &mut [bool], from: u32, limit: u32, event: &Event) -> Result<u32> {
    let mut slot = from;
    while slot < limit {
        if !occupied[slot as usize] {
            occupied[slot as usize] = true;
            return Ok(slot);
        }
        slot += 1;
    }
    Err(CdgError::Overbudget {
        event_label: event.label.clone(),
        pack: from,
        deficit: 1,
    })
}

fn reserve_contiguous(
    occupied: &mut [bool],
    from: u32,
    count: u32,
    limit: u32,
    event: &Event,
) -> Result<u32> {
    if count == 0 {
        return Ok(from.min(limit));
    }
    let mut start = from;
    'search: while start + count <= limit {
        for offset in 0..count {
            if occupied[(start + offset) as usize] {
                start += offset + 1;
                continue 'search;
            }
        }
        for offset in 0..count {
            occupied[(start + offset) as usize] = true;
        }
        return Ok(start);
    }
    Err(CdgError::Overbudget {
        event_label: event.label.clone(),
        pack: from,
        deficit: count,
    })
}

fn apply_repetition(packets: &mut [Packet], occupied: &[bool], total_packs: u32) {
    let mut slot = PRELUDE_LEN;
    while slot + REPETITION_INTERVAL < total_packs {
        let target = slot + REPETITION_INTERVAL;
        if occupied[slot as usize] && !occupied[target as usize] {
            packets[target as usize] = packets[slot as usize];
        }
        slot += 1;
    }
}
