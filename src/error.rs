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

//! Error types for the CD+G authoring engine.

use std::io;
use thiserror::Error;

/// Result type for CD+G operations.
pub type Result<T> = std::result::Result<T, CdgError>;

/// Errors that can occur while authoring a CD+G stream.
#[derive(Debug, Error)]
pub enum CdgError {
    /// A BMP asset failed one of the loader's validation checks.
    #[error("invalid BMP: {0}")]
    InvalidBmp(String),

    /// An event could not be added to a timeline, or is otherwise malformed.
    #[error("invalid event: {detail}")]
    InvalidEvent {
        /// Human-readable explanation of what about the event is invalid.
        detail: String,
    },

    /// The scheduler ran out of pack slots before it could place all
    /// required packets.
    #[error("overbudget: event {event_label:?} needs {deficit} more pack(s) at/after pack {pack}")]
    Overbudget {
        /// Label of the offending event, if one was supplied.
        event_label: Option<String>,
        /// The pack at which the shortfall was discovered.
        pack: u32,
        /// How many additional pack slots would have been required.
        deficit: u32,
    },

    /// A palette index was outside the valid 0..15 range.
    #[error("invalid palette index: {index}")]
    InvalidPalette {
        /// The out-of-range index that was requested.
        index: u8,
    },

    /// I/O error occurred while reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
