//! Events and the per-track sorted timeline that owns them.
//!
//! No back-pointers: an [`Event`] holds no reference to its track or
//! timeline. "Which track owns this event" is answered by querying the
//! timeline, never by the event itself — the tagged-`Payload` + single-owner
//! shape the teacher's `events.rs` `ServerEvent` enum suggests, generalized
//! to a sorted, overlap-rejecting per-track container.

use crate::bitmap::Bitmap;
use crate::error::{CdgError, Result};
use crate::glyph::GlyphSource;
use crate::palette::Palette;
use std::sync::Arc;

/// Sentinel meaning "do not emit a preset packet for this event" in
/// `border_index`/`memory_preset_index`.
pub const NO_PRESET: u8 = 16;

/// Number of independent track lanes.
pub const TRACK_COUNT: usize = 8;

/// What an event renders.
pub enum Payload {
    /// A literal bitmap placed on the framebuffer.
    Bitmap(Bitmap),
    /// Rendered text: each character is turned into a bitmap via the
    /// injected [`GlyphSource`] at scheduling time.
    Text {
        /// The string to render.
        content: String,
        /// Glyph rasterizer.
        glyphs: Arc<dyn GlyphSource>,
        /// Framebuffer x placement of the first glyph.
        x: i32,
        /// Framebuffer y placement.
        y: i32,
        /// Compositor layer.
        z: u8,
    },
    /// A palette replacement, emitted as `LOAD_CLUT_LO`/`LOAD_CLUT_HI`.
    Palette(Palette),
    /// A scroll offset change.
    Scroll {
        /// Horizontal direction code (0 none, 1 forward, 2 backward).
        h_cmd: u8,
        /// Horizontal fine pixel offset, 0..6.
        h_offset: u8,
        /// Vertical direction code.
        v_cmd: u8,
        /// Vertical fine pixel offset, 0..12.
        v_offset: u8,
        /// Whether this is a wrap-copy scroll (`SCROLL_COPY`) rather than
        /// a plain offset jump (`SCROLL_PRESET`).
        copy: bool,
    },
    /// A framebuffer clear: equivalent to a bare `MEMORY_PRESET` with no
    /// attached bitmap.
    Clear,
}

/// A single timed unit of work on the timeline.
pub struct Event {
    /// First pack this event occupies.
    pub start_offset_packs: u32,
    /// Number of packs this event spans.
    pub duration_packs: u32,
    /// What this event renders.
    pub payload: Payload,
    /// Border color to preset at `start_offset_packs`, or [`NO_PRESET`].
    pub border_index: u8,
    /// Framebuffer clear color at `start_offset_packs`, or [`NO_PRESET`].
    pub memory_preset_index: u8,
    /// Track lane, 0..8.
    pub track: u8,
    /// Subcode channel, 0..16. Always 0 for an authored stream in this
    /// crate's scope but carried for forward compatibility with decoders
    /// that filter by channel.
    pub channel: u8,
    /// Optional human-readable name surfaced in diagnostics.
    pub label: Option<String>,
}

impl Event {
    /// The inclusive-start, exclusive-end pack range this event occupies.
    #[must_use]
    pub const fn pack_range(&self) -> (u32, u32) {
        (
            self.start_offset_packs,
            self.start_offset_packs + self.duration_packs,
        )
    }
}

/// Per-track ordered event container. Events within one track are kept
/// sorted by `start_offset_packs` and may never overlap in packs; overlap
/// across tracks is permitted, with layering resolved by the compositor.
#[derive(Default)]
pub struct EventTimeline {
    tracks: Vec<Vec<Event>>,
}

impl EventTimeline {
    /// Creates an empty timeline with [`TRACK_COUNT`] tracks.
    #[must_use]
    pub fn new() -> Self {
        let mut tracks = Vec::with_capacity(TRACK_COUNT);
        tracks.resize_with(TRACK_COUNT, Vec::new);
        Self { tracks }
    }

    /// Inserts `event` into its track, keeping the track sorted by
    /// `start_offset_packs`.
    ///
    /// # Errors
    ///
    /// Returns [`CdgError::InvalidEvent`] if `event.track` is out of range,
    /// or if it overlaps an existing event on the same track.
    pub fn insert(&mut self, event: Event) -> Result<()> {
        let track_index = event.track as usize;
        let track = self
            .tracks
            .get_mut(track_index)
            .ok_or_else(|| CdgError::InvalidEvent {
                detail: format!("track {track_index} out of range 0..{TRACK_COUNT}"),
            })?;

        let (start, end) = event.pack_range();
        let insert_at = track
            .binary_search_by_key(&start, |e| e.start_offset_packs)
            .unwrap_or_else(|i| i);

        if let Some(prev) = insert_at.checked_sub(1).and_then(|i| track.get(i)) {
            let (_, prev_end) = prev.pack_range();
            if prev_end > start {
                return Err(overlap_error(&event));
            }
        }
        if let Some(next) = track.get(insert_at) {
            if next.start_offset_packs < end {
                return Err(overlap_error(&event));
            }
        }

        track.insert(insert_at, event);
        Ok(())
    }

    /// All events on `track` overlapping `[pack_start, pack_end)`, in
    /// timeline order.
    #[must_use]
    pub fn events_overlapping(&self, track: u8, pack_start: u32, pack_end: u32) -> Vec<&Event> {
        self.tracks
            .get(track as usize)
            .into_iter()
            .flatten()
            .filter(|e| {
                let (s, e) = e.pack_range();
                s < pack_end && e > pack_start
            })
            .collect()
    }

    /// All events across all tracks, in arbitrary per-track order
    /// concatenated by track index. The scheduler re-sorts by
    /// `start_offset_packs` itself.
    #[must_use]
    pub fn all_events(&self) -> impl Iterator<Item = &Event> {
        self.tracks.iter().flatten()
    }
}

fn overlap_error(event: &Event) -> CdgError {
    CdgError::InvalidEvent {
        detail: format!(
            "event{} on track {} overlaps an existing event at pack {}",
            event
                .label
                .as_ref()
                .map(|l| format!(" {l:?}"))
                .unwrap_or_default(),
            event.track,
            event.start_offset_packs,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_event(track: u8, start: u32, duration: u32) -> Event {
        Event {
            start_offset_packs: start,
            duration_packs: duration,
            payload: Payload::Clear,
            border_index: NO_PRESET,
            memory_preset_index: NO_PRESET,
            track,
            channel: 0,
            label: None,
        }
    }

    #[test]
    fn same_track_overlap_is_rejected() {
        let mut tl = EventTimeline::new();
        tl.insert(clear_event(0, 0, 100)).unwrap();
        let err = tl.insert(clear_event(0, 50, 100)).unwrap_err();
        assert!(matches!(err, CdgError::InvalidEvent { .. }));
    }

    #[test]
    fn adjacent_events_do_not_overlap() {
        let mut tl = EventTimeline::new();
        tl.insert(clear_event(0, 0, 100)).unwrap();
        assert!(tl.insert(clear_event(0, 100, 50)).is_ok());
    }

    #[test]
    fn cross_track_overlap_is_allowed() {
        let mut tl = EventTimeline::new();
        tl.insert(clear_event(0, 0, 100)).unwrap();
        assert!(tl.insert(clear_event(1, 0, 100)).is_ok());
    }

    #[test]
    fn events_overlapping_finds_the_right_window() {
        let mut tl = EventTimeline::new();
        tl.insert(clear_event(2, 0, 50)).unwrap();
        tl.insert(clear_event(2, 50, 50)).unwrap();
        tl.insert(clear_event(2, 200, 50)).unwrap();

        let hits = tl.events_overlapping(2, 40, 60);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn out_of_range_track_is_rejected() {
        let mut tl = EventTimeline::new();
        let err = tl.insert(clear_event(200, 0, 10)).unwrap_err();
        assert!(matches!(err, CdgError::InvalidEvent { .. }));
    }
}
