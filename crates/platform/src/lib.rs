//! Hardware Abstraction Layer for parallel-bus e-paper panels
//!
//! This crate provides the trait seams the refresh engine drives, so the
//! timing-critical pipeline can be developed and tested without a panel.
//!
//! # Architecture Layers
//!
//! ```text
//! Refresh engine (eink-refresh crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions + TPS65186 adapter)
//!         ↓
//! Hardware Layer (MDMA, FMC/GPIO bus, I2C)
//! ```
//!
//! # Seams
//!
//! - [`dma`] - blocking memory-to-memory bulk copy
//! - [`panel_bus`] - row clock pulse trains and the drive-byte sink
//! - [`gpio`] - panel control lines, bus direction, line buffer
//! - [`power`] - PMIC rail control and power-good readback
//! - [`tps65186`] - concrete [`EpdRails`] over `embedded-hal` I2C and pins
//!
//! # Features
//!
//! - `std`: expose [`mocks`] to other crates' tests
//! - `defmt`: enable defmt::Format derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors; callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

pub mod dma;
pub mod gpio;
pub mod mocks;
pub mod panel_bus;
pub mod power;
pub mod tps65186;

pub use dma::{dma_aligned_len, BulkCopy, CpuCopy, DMA_ALIGN};
pub use gpio::{BusMode, ControlLine, PanelControl, PinState};
pub use panel_bus::{DriveSink, PanelBus, ScanClock};
pub use power::{EpdRails, RailMask};
pub use tps65186::Tps65186;
