//! Waveform-driven refresh engine for parallel-bus e-paper panels
//!
//! Turns the caller's pending framebuffer into the multi-phase drive
//! sequence an electrophoretic panel needs, brackets every update with
//! PMIC rail sequencing, and keeps the panel's row clock fed from external
//! memory with a double-buffered decode/transmit pipeline.
//!
//! # Layers
//!
//! ```text
//! DisplayController        (controller)  full / partial / depth switch
//!    ├── PowerSequencer    (power)       rail order, power-good timeout
//!    ├── WaveformTable     (waveform_table, waveform)
//!    ├── LutEngine         (lut)         per-phase packed lookup tables
//!    ├── build_mask        (mask)        partial-update drive codes
//!    └── StreamPipeline    (pipeline)    prefetch → decode ∥ transmit
//! ```
//!
//! Hardware is reached only through the `platform` traits, so the whole
//! engine runs on the host against `platform::mocks`.
//!
//! # Features
//!
//! - `defmt`: on-target logging, `defmt::Format` derives
//! - `tracing`: host logging
//! - `serde`: (de)serialize [`EngineConfig`]
//! - `std`: enables `platform` mocks for downstream host tests

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_code)]
// Pedantic lints suppressed for this crate:
#![allow(clippy::doc_markdown)] // panel part numbers in doc comments
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)] // error enums document themselves

#[macro_use]
mod fmt;

pub mod canvas;
pub mod config;
pub mod controller;
pub mod error;
pub mod framebuffer;
pub mod lut;
pub mod mask;
pub mod pipeline;
pub mod power;
pub mod waveform;
pub mod waveform_table;

pub use canvas::PendingCanvas;
pub use config::{EngineConfig, PanelGeometry};
pub use controller::{DisplayController, DisplayMode, UpdateStats};
pub use error::{ConfigError, PowerError, RefreshError, WaveformError};
pub use framebuffer::{FramebufferSet, Role};
pub use lut::LutEngine;
pub use mask::build_mask;
pub use pipeline::{PassStats, RowDecoder, StreamPipeline};
pub use power::{PowerSequencer, RailsUp};
pub use waveform::{DriveCode, PhaseColumn, PixelDepth, UpdateKind, Waveform, WAVEFORM_TAG};
pub use waveform_table::WaveformTable;
