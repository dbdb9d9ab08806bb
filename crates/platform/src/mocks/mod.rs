//! Mock implementations for testing
//!
//! Recording implementations of every platform seam the refresh engine
//! drives. They never fail and keep enough history for tests to assert
//! on pass counts, row protocol order and power sequencing.

#![cfg(any(test, feature = "std"))]
// Counters in test doubles cannot realistically overflow.
#![allow(clippy::arithmetic_side_effects)]

use std::vec::Vec;

use crate::dma::{BulkCopy, CpuCopy};
use crate::gpio::{BusMode, ControlLine, PanelControl, PinState};
use crate::panel_bus::{DriveSink, ScanClock};
use crate::power::{EpdRails, RailMask};

// ---------------------------------------------------------------------------
// Bulk copy
// ---------------------------------------------------------------------------

/// Bulk copy that performs a CPU copy and counts calls.
#[derive(Debug, Default)]
pub struct MockBulkCopy {
    copies: usize,
    bytes: usize,
}

impl MockBulkCopy {
    /// Create a new counting copier
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of copy calls
    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Total bytes copied
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl BulkCopy for MockBulkCopy {
    fn copy(&mut self, dst: &mut [u8], src: &[u8]) {
        self.copies += 1;
        self.bytes += dst.len().min(src.len());
        CpuCopy.copy(dst, src);
    }
}

// ---------------------------------------------------------------------------
// Panel bus
// ---------------------------------------------------------------------------

/// One streamed frame (one pass) as seen on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    /// Cycle delay passed to `frame_start`
    pub cycle_delay: u32,
    /// Rows completed with `row_advance`
    pub rows: usize,
    /// Drive bytes put on the bus (row-start bytes included)
    pub bytes: usize,
    /// `Some(b)` while every byte of the frame so far equals `b`
    pub uniform: Option<u8>,
    /// Full frame contents, only kept by [`MockPanelBus::capturing`]
    pub data: Vec<u8>,
}

impl FrameRecord {
    fn new(cycle_delay: u32) -> Self {
        Self {
            cycle_delay,
            rows: 0,
            bytes: 0,
            uniform: None,
            data: Vec::new(),
        }
    }

    fn push(&mut self, byte: u8, capture: bool) {
        self.uniform = match (self.bytes, self.uniform) {
            (0, _) => Some(byte),
            (_, Some(b)) if b == byte => Some(b),
            _ => None,
        };
        self.bytes += 1;
        if capture {
            self.data.push(byte);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowPhase {
    Closed,
    Started,
    Streamed,
}

/// Panel bus that records frames and checks the row protocol.
///
/// The expected order per row is `row_start`, `stream_row`, `row_advance`.
/// Anything else increments [`MockPanelBus::protocol_errors`].
#[derive(Debug)]
pub struct MockPanelBus {
    frames: Vec<FrameRecord>,
    capture: bool,
    row: RowPhase,
    protocol_errors: usize,
    overlaps: usize,
    loose_bytes: Vec<u8>,
}

impl Default for MockPanelBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPanelBus {
    /// Create a bus that records frame statistics only
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            capture: false,
            row: RowPhase::Closed,
            protocol_errors: 0,
            overlaps: 0,
            loose_bytes: Vec::new(),
        }
    }

    /// Create a bus that also keeps every streamed byte
    pub fn capturing() -> Self {
        Self {
            capture: true,
            ..Self::new()
        }
    }

    /// Frames streamed so far, oldest first
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    /// Number of `frame_start` calls
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Rows completed over all frames
    pub fn total_rows(&self) -> usize {
        self.frames.iter().map(|f| f.rows).sum()
    }

    /// Row protocol violations seen
    pub fn protocol_errors(&self) -> usize {
        self.protocol_errors
    }

    /// Overlap closures run inside `stream_row`
    pub fn overlaps(&self) -> usize {
        self.overlaps
    }

    /// Bytes clocked out before the first `frame_start`
    pub fn loose_bytes(&self) -> &[u8] {
        &self.loose_bytes
    }

    /// Forget everything recorded so far
    pub fn clear(&mut self) {
        self.frames.clear();
        self.loose_bytes.clear();
        self.protocol_errors = 0;
        self.overlaps = 0;
        self.row = RowPhase::Closed;
    }

    fn record(&mut self, byte: u8) {
        let capture = self.capture;
        match self.frames.last_mut() {
            Some(frame) => frame.push(byte, capture),
            None => self.loose_bytes.push(byte),
        }
    }
}

impl ScanClock for MockPanelBus {
    fn frame_start(&mut self, cycle_delay: u32) {
        if self.row != RowPhase::Closed {
            self.protocol_errors += 1;
        }
        self.row = RowPhase::Closed;
        self.frames.push(FrameRecord::new(cycle_delay));
    }

    fn row_start(&mut self, first: u8, second: u8) {
        if self.row != RowPhase::Closed || self.frames.is_empty() {
            self.protocol_errors += 1;
        }
        self.row = RowPhase::Started;
        self.record(first);
        self.record(second);
    }

    fn row_advance(&mut self) {
        if self.row != RowPhase::Streamed {
            self.protocol_errors += 1;
        }
        self.row = RowPhase::Closed;
        if let Some(frame) = self.frames.last_mut() {
            frame.rows += 1;
        }
    }
}

impl DriveSink for MockPanelBus {
    fn stream_row<R>(&mut self, row: &[u8], overlap: impl FnOnce() -> R) -> R {
        if self.row != RowPhase::Started {
            self.protocol_errors += 1;
        }
        self.row = RowPhase::Streamed;
        for &b in row {
            self.record(b);
        }
        self.overlaps += 1;
        overlap()
    }
}

// ---------------------------------------------------------------------------
// Rails and control lines
// ---------------------------------------------------------------------------

/// Everything the power sequencer did to the PMIC, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailEvent {
    /// WAKE pin
    Wake(PinState),
    /// PWRUP pin
    PowerUp(PinState),
    /// VCOM_CTRL pin
    Vcom(PinState),
    /// Rail enable mask write
    Rails(RailMask),
    /// Power-good read
    PowerGoodRead,
}

/// Scripted PMIC.
///
/// Power-good follows PWRUP and the rail mask: `up_value` while PWRUP is
/// high and any rail is enabled, `down_value` otherwise. Tests override either to simulate a rail that
/// never comes into regulation or never discharges.
#[derive(Debug)]
pub struct MockRails {
    events: heapless::Vec<RailEvent, 256>,
    rails: RailMask,
    awake: bool,
    powered: bool,
    /// Power-good byte reported while rails are enabled
    pub up_value: u8,
    /// Power-good byte reported while rails are disabled
    pub down_value: u8,
    reads: usize,
}

impl Default for MockRails {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRails {
    /// Healthy PMIC: reports `0xFA` when up and `0x00` when down
    pub fn new() -> Self {
        Self {
            events: heapless::Vec::new(),
            rails: RailMask::NONE,
            awake: false,
            powered: false,
            up_value: crate::tps65186::PWR_GOOD_OK,
            down_value: 0,
            reads: 0,
        }
    }

    /// PMIC whose rails never reach regulation
    pub fn never_good() -> Self {
        Self {
            up_value: 0x0A,
            ..Self::new()
        }
    }

    /// Recorded events (the log stops growing at 256 entries)
    pub fn events(&self) -> &[RailEvent] {
        &self.events
    }

    /// Currently written rail mask
    pub fn rails(&self) -> RailMask {
        self.rails
    }

    /// Level last driven on WAKE
    pub fn awake(&self) -> bool {
        self.awake
    }

    /// Power-good reads so far
    pub fn power_good_reads(&self) -> usize {
        self.reads
    }

    /// Drop the recorded event log
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn log(&mut self, event: RailEvent) {
        // Full log is not an error for a test double.
        let _ = self.events.push(event);
    }
}

impl EpdRails for MockRails {
    type Error = core::convert::Infallible;

    fn set_wake(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.awake = state.into();
        self.log(RailEvent::Wake(state));
        Ok(())
    }

    fn set_power_up(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.powered = state.into();
        self.log(RailEvent::PowerUp(state));
        Ok(())
    }

    fn set_vcom(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.log(RailEvent::Vcom(state));
        Ok(())
    }

    fn set_rails(&mut self, mask: RailMask) -> Result<(), Self::Error> {
        self.rails = mask;
        self.log(RailEvent::Rails(mask));
        Ok(())
    }

    fn power_good(&mut self) -> Result<u8, Self::Error> {
        self.reads += 1;
        self.log(RailEvent::PowerGoodRead);
        Ok(if self.powered && !self.rails.is_empty() {
            self.up_value
        } else {
            self.down_value
        })
    }
}

/// Control-line state tracker.
#[derive(Debug, Clone)]
pub struct MockPanelControl {
    lines: [PinState; 6],
    bus: BusMode,
    line_buffer: bool,
    writes: usize,
}

impl Default for MockPanelControl {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPanelControl {
    /// All lines low, bus high-Z, buffer disabled
    pub fn new() -> Self {
        Self {
            lines: [PinState::Low; 6],
            bus: BusMode::HighZ,
            line_buffer: false,
            writes: 0,
        }
    }

    /// Last level written to `line`
    pub fn line(&self, line: ControlLine) -> PinState {
        self.lines
            .get(line as usize)
            .copied()
            .unwrap_or(PinState::Low)
    }

    /// Current bus direction
    pub fn bus_mode(&self) -> BusMode {
        self.bus
    }

    /// Line buffer state
    pub fn line_buffer(&self) -> bool {
        self.line_buffer
    }

    /// Total writes of any kind
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PanelControl for MockPanelControl {
    type Error = core::convert::Infallible;

    fn set_line(&mut self, line: ControlLine, state: PinState) -> Result<(), Self::Error> {
        if let Some(slot) = self.lines.get_mut(line as usize) {
            *slot = state;
        }
        self.writes += 1;
        Ok(())
    }

    fn set_bus_mode(&mut self, mode: BusMode) -> Result<(), Self::Error> {
        self.bus = mode;
        self.writes += 1;
        Ok(())
    }

    fn set_line_buffer(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.line_buffer = enabled;
        self.writes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

/// Delay that returns immediately and counts what it was asked to wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingDelay {
    calls: usize,
    total_ns: u64,
}

impl CountingDelay {
    /// Create a fresh counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delay calls
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Total requested delay in milliseconds
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl embedded_hal::delay::DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ms) * 1_000_000;
    }

    fn delay_us(&mut self, us: u32) {
        self.calls += 1;
        self.total_ns += u64::from(us) * 1_000;
    }
}
