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

//! # cdg-author
//!
//! A CD+Graphics (CD+G) subcode stream authoring engine.
//!
//! CD+G is the karaoke-disc graphics format: a 300 Hz stream of 16-byte
//! instruction payloads, each framed in a 20-byte wire packet, interleaved
//! with CD audio and driving a 300x216 indexed framebuffer
//! through a handful of instructions (fill, border, 6x12 tile writes,
//! palette loads, scroll). This crate builds that packet stream from an
//! authored timeline of bitmap, text, palette, and scroll events rather than
//! decoding one.
//!
//! ## Pipeline
//!
//! ```text
//! Project (events + initial palette)
//!   -> EventTimeline (sorted, overlap-free per track)
//!   -> Scheduler (events -> compositor -> tile encoder -> dense Vec<Packet>)
//!   -> StreamWriter (Vec<Packet> -> .cdg bytes)
//! ```
//!
//! A [`decoder::Decoder`] and [`compositor::Compositor`] are included so the
//! pipeline can be exercised end to end in tests without a real CD+G player.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cdg_author::glyph::FixedGlyphSource;
//! use cdg_author::project::Project;
//! use cdg_author::scheduler::{self, SchedulerConfig, SchedulerInput};
//! use cdg_author::writer;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> cdg_author::error::Result<()> {
//! let text = std::fs::read_to_string("project.json")?;
//! let project = Project::from_json(&text)?;
//! let timeline = project.build_timeline(Path::new("."), Arc::new(FixedGlyphSource::new()))?;
//! let palette = project.initial_palette()?;
//!
//! let input = SchedulerInput {
//!     timeline: &timeline,
//!     total_packs: project.total_packs(),
//!     initial_palette: &palette,
//!     initial_border: project.initial_border,
//!     initial_clear_color: project.initial_clear_color,
//!     initial_transparent: project.initial_transparent,
//! };
//! let packets = scheduler::schedule(&input, &SchedulerConfig::default())?;
//! writer::write_file(Path::new("out.cdg"), &packets)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitmap;
pub mod bmp;
pub mod compositor;
pub mod decoder;
pub mod error;
pub mod glyph;
pub mod packet;
pub mod palette;
pub mod project;
pub mod scheduler;
pub mod tile;
pub mod tile_encoder;
pub mod timeline;
pub mod writer;

pub use error::{CdgError, Result};
pub use packet::Packet;
pub use palette::{Palette, Rgba};
pub use project::Project;
