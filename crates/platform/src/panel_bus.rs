//! Panel data bus and row clock
//!
//! Two seams, split the way the hardware splits them:
//!
//! - [`ScanClock`]: the cycle-counted pulse trains on CKV/SPV/SPH/LE that
//!   start a frame, open a row and advance the gate driver. Opaque and
//!   panel-tuned; the engine only decides *when* each one runs.
//! - [`DriveSink`]: the 8-bit data bus the packed drive codes go out on.
//!
//! [`DriveSink::stream_row`] hands the caller's decode-ahead work to the
//! sink as a closure. Hardware implementations start the row DMA, run the
//! closure while the transfer is in flight, then poll completion, so the
//! next row is always decoded inside the current row's transmit window.

/// Row clock pulse trains.
pub trait ScanClock {
    /// Start a frame (vertical scan start). `cycle_delay` is the per-line
    /// hold time of the waveform phase about to be streamed.
    fn frame_start(&mut self, cycle_delay: u32);

    /// Open a row (horizontal scan start). The first two drive bytes are
    /// clocked out by the pulse train itself.
    fn row_start(&mut self, first: u8, second: u8);

    /// Latch the row and advance the gate driver (vertical scan end).
    fn row_advance(&mut self);
}

/// Raw drive-byte sink on the panel's parallel bus.
pub trait DriveSink {
    /// Stream `row` to the bus, running `overlap` while the transfer is in
    /// flight. Returns once both the transfer and `overlap` are done.
    fn stream_row<R>(&mut self, row: &[u8], overlap: impl FnOnce() -> R) -> R;
}

/// Everything the streaming pipeline needs from the panel side.
pub trait PanelBus: ScanClock + DriveSink {}

impl<T: ScanClock + DriveSink> PanelBus for T {}

impl<T: ScanClock + ?Sized> ScanClock for &mut T {
    fn frame_start(&mut self, cycle_delay: u32) {
        (**self).frame_start(cycle_delay);
    }

    fn row_start(&mut self, first: u8, second: u8) {
        (**self).row_start(first, second);
    }

    fn row_advance(&mut self) {
        (**self).row_advance();
    }
}

impl<T: DriveSink + ?Sized> DriveSink for &mut T {
    fn stream_row<R>(&mut self, row: &[u8], overlap: impl FnOnce() -> R) -> R {
        (**self).stream_row(row, overlap)
    }
}
