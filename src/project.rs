//! On-disk project description: the JSON form the CLI reads and tests build
//! by hand, following `patsoffice-phosphor-core`'s frontend config loading
//! and `DaCodeChick-Palace`'s manifest use of `serde`/`serde_json` from the
//! pack. A deterministic serialization for test input; the byte layout
//! itself is not part of this crate's contract.

use crate::error::{CdgError, Result};
use crate::glyph::GlyphSource;
use crate::palette::{Palette, Rgba};
use crate::timeline::{Event, EventTimeline, Payload, NO_PRESET};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// An RGB triple as carried in the on-disk form (CD+G has no alpha).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    /// Red channel, 0-255.
    pub r: u8,
    /// Green channel, 0-255.
    pub g: u8,
    /// Blue channel, 0-255.
    pub b: u8,
}

impl From<RgbColor> for Rgba {
    fn from(c: RgbColor) -> Self {
        Rgba::rgb(c.r, c.g, c.b)
    }
}

/// A project's ordered list of events plus its initial palette and prelude.
#[derive(Debug, Serialize, Deserialize)]
pub struct Project {
    /// Free-text label, carried through but not interpreted by the core.
    #[serde(default)]
    pub title: Option<String>,
    /// Total duration the output stream should cover.
    pub audio_duration_seconds: f64,
    /// The 16 palette entries loaded by the prelude.
    pub initial_palette: [RgbColor; 16],
    /// Border color preset by the prelude.
    #[serde(default)]
    pub initial_border: u8,
    /// Framebuffer clear color preset by the prelude.
    #[serde(default)]
    pub initial_clear_color: u8,
    /// Transparent index declared by the prelude.
    #[serde(default)]
    pub initial_transparent: u8,
    /// The ordered events to schedule.
    pub events: Vec<ProjectEvent>,
}

/// One entry in [`Project::events`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectEvent {
    /// First pack this event occupies.
    pub start_offset_packs: u32,
    /// Number of packs this event spans.
    pub duration_packs: u32,
    /// Border color to preset at `start_offset_packs`, or 16 for none.
    #[serde(default = "no_preset")]
    pub border_index: u8,
    /// Framebuffer clear color at `start_offset_packs`, or 16 for none.
    #[serde(default = "no_preset")]
    pub memory_preset_index: u8,
    /// Track lane, 0..8.
    pub track: u8,
    /// Subcode channel, 0..16.
    #[serde(default)]
    pub channel: u8,
    /// Optional human-readable name surfaced in diagnostics.
    #[serde(default)]
    pub label: Option<String>,
    /// What this event renders.
    pub payload: ProjectPayload,
}

fn no_preset() -> u8 {
    NO_PRESET
}

/// The tagged-union on-disk form of [`Payload`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectPayload {
    /// A BMP asset placed on the framebuffer.
    Bitmap {
        /// Path to the BMP file, resolved relative to the project file.
        path: String,
        /// Framebuffer x placement.
        x: i32,
        /// Framebuffer y placement.
        y: i32,
        /// Compositor layer.
        z: u8,
        /// Palette index painted outside the bitmap's bounds.
        #[serde(default)]
        fill_index: u8,
        /// Palette index whose pixels do not overwrite the compositor.
        #[serde(default)]
        transparent_index: Option<u8>,
    },
    /// Rendered text, turned into bitmaps via the caller's `GlyphSource`.
    Text {
        /// The string to render.
        content: String,
        /// Framebuffer x placement of the first glyph.
        x: i32,
        /// Framebuffer y placement.
        y: i32,
        /// Compositor layer.
        z: u8,
    },
    /// A palette replacement.
    Palette {
        /// The 16 replacement colors.
        entries: [RgbColor; 16],
    },
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
        /// Whether this is a wrap-copy scroll.
        #[serde(default)]
        copy: bool,
    },
    /// A framebuffer clear.
    Clear,
}

impl Project {
    /// Parses a project description from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CdgError::InvalidEvent`] if the JSON is malformed.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CdgError::InvalidEvent {
            detail: format!("malformed project JSON: {e}"),
        })
    }

    /// Serializes this project to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CdgError::InvalidEvent`] if serialization fails (should be
    /// unreachable for a well-formed `Project`).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CdgError::InvalidEvent {
            detail: format!("failed to serialize project: {e}"),
        })
    }

    /// Total pack count for this project's duration: `ceil(seconds * 300)`.
    #[must_use]
    pub fn total_packs(&self) -> u32 {
        (self.audio_duration_seconds * 300.0).ceil() as u32
    }

    /// Builds the initial [`Palette`] from `initial_palette`.
    ///
    /// # Errors
    ///
    /// Never fails in practice (16 entries map onto 16 palette slots), but
    /// returns [`CdgError::InvalidPalette`] defensively if that invariant is
    /// ever violated.
    pub fn initial_palette(&self) -> Result<Palette> {
        let mut palette = Palette::new();
        for (i, color) in self.initial_palette.iter().enumerate() {
            palette.set(i as u8, (*color).into())?;
        }
        Ok(palette)
    }

    /// Builds the [`EventTimeline`] this project describes, loading any
    /// referenced BMP assets relative to `base_dir` and using `glyphs` to
    /// rasterize `text` events.
    ///
    /// # Errors
    ///
    /// Returns [`CdgError::InvalidBmp`] if a referenced asset fails to load,
    /// [`CdgError::Io`] if it cannot be read, or [`CdgError::InvalidEvent`]
    /// if an event is malformed or overlaps another on its track.
    pub fn build_timeline(
        &self,
        base_dir: &Path,
        glyphs: Arc<dyn GlyphSource>,
    ) -> Result<EventTimeline> {
        let mut timeline = EventTimeline::new();
        for entry in &self.events {
            let payload = match &entry.payload {
                ProjectPayload::Bitmap {
                    path,
                    x,
                    y,
                    z,
                    fill_index,
                    transparent_index,
                } => {
                    let bytes = std::fs::read(base_dir.join(path))?;
                    let mut bitmap = crate::bmp::load(&bytes)?
                        .with_offset(*x, *y)
                        .with_layer(*z)
                        .with_fill_index(*fill_index);
                    if let Some(t) = transparent_index {
                        bitmap = bitmap.with_transparent_index(*t);
                    }
                    Payload::Bitmap(bitmap)
                }
                ProjectPayload::Text { content, x, y, z } => Payload::Text {
                    content: content.clone(),
                    glyphs: Arc::clone(&glyphs),
                    x: *x,
                    y: *y,
                    z: *z,
                },
                ProjectPayload::Palette { entries } => {
                    let mut palette = Palette::new();
                    for (i, color) in entries.iter().enumerate() {
                        palette.set(i as u8, (*color).into())?;
                    }
                    Payload::Palette(palette)
                }
                ProjectPayload::Scroll {
                    h_cmd,
                    h_offset,
                    v_cmd,
                    v_offset,
                    copy,
                } => Payload::Scroll {
                    h_cmd: *h_cmd,
                    h_offset: *h_offset,
                    v_cmd: *v_cmd,
                    v_offset: *v_offset,
                    copy: *copy,
                },
                ProjectPayload::Clear => Payload::Clear,
            };

            timeline.insert(Event {
                start_offset_packs: entry.start_offset_packs,
                duration_packs: entry.duration_packs,
                payload,
                border_index: entry.border_index,
                memory_preset_index: entry.memory_preset_index,
                track: entry.track,
                channel: entry.channel,
                label: entry.label.clone(),
            })?;
        }
        Ok(timeline)
    }
}
