//! End-to-end update scenarios against the recording platform mocks.
//!
//! Every test drives a small 32×8 panel so frames can be inspected byte by
//! byte. Run with: cargo test -p eink-refresh --test update_scenarios

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use eink_refresh::waveform::{mono, uniform, PhaseColumn, DEFAULT_1BIT_FULL};
use eink_refresh::{
    DisplayController, DriveCode, EngineConfig, FramebufferSet, PanelGeometry, PixelDepth,
    PowerError, PowerSequencer, RefreshError, UpdateKind, Waveform, WaveformError,
};
use embedded_graphics::{
    pixelcolor::Gray4,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};
use platform::mocks::{CountingDelay, MockBulkCopy, MockPanelBus, MockPanelControl, MockRails};

type Controller = DisplayController<
    Vec<u8>,
    MockRails,
    MockPanelControl,
    CountingDelay,
    MockPanelBus,
    MockBulkCopy,
>;

const GEOMETRY: PanelGeometry = PanelGeometry::new(32, 8);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config() -> EngineConfig {
    // two 4-bit rows per staging chunk so prefetch runs mid-frame
    EngineConfig::new(GEOMETRY).with_staging_bytes(32)
}

fn controller_with(rails: MockRails) -> Box<Controller> {
    let cfg = config();
    let g = cfg.geometry;
    let buffers = FramebufferSet::new(
        &g,
        vec![0; g.framebuffer_capacity()],
        vec![0; g.framebuffer_capacity()],
        vec![0; g.mask_len()],
    )
    .unwrap();
    let power = PowerSequencer::new(rails, MockPanelControl::new(), CountingDelay::new(), &cfg);
    Box::new(
        DisplayController::new(cfg, buffers, power, MockPanelBus::capturing(), MockBulkCopy::new())
            .unwrap(),
    )
}

fn controller() -> Box<Controller> {
    controller_with(MockRails::new())
}

static TWO_CLEAN: [PhaseColumn; 2] = [uniform(DriveCode::Black), uniform(DriveCode::White)];
static THREE_PHASES: [PhaseColumn; 3] = [
    mono(DriveCode::Black, DriveCode::White),
    mono(DriveCode::White, DriveCode::Black),
    mono(DriveCode::Discharge, DriveCode::Skip),
];

fn short_full_waveform() -> Waveform {
    Waveform {
        phases: &THREE_PHASES,
        cycle_delay: 100,
        clean: &TWO_CLEAN,
        clean_cycle_delay: 200,
        name: "test1BitFull",
        ..DEFAULT_1BIT_FULL
    }
}

// ---------------------------------------------------------------------------
// Start-up and depth switching
// ---------------------------------------------------------------------------

#[test]
fn startup_is_one_bit_white_and_blocked() {
    let c = controller();
    let mode = c.mode();
    assert_eq!(mode.depth, PixelDepth::OneBit);
    assert!(mode.partial_blocked);
    assert!(!mode.rails_enabled);
    assert_eq!(mode.partial_counter, 0);
    assert!(c.current().iter().all(|&b| b == 0x00));
    assert_eq!(c.bus().frame_count(), 0);
}

#[test]
fn first_partial_update_is_promoted_to_full() {
    let mut c = controller();
    let stats = c.partial_update(false).unwrap();
    assert_eq!(stats.kind, UpdateKind::Full);
    assert_eq!(stats.mask_passes, 0);
    assert_eq!(stats.clean_passes, 79);
    assert_eq!(stats.phase_passes, 11);
    assert!(!c.mode().partial_blocked);
}

#[test]
fn depth_switch_clears_buffers_and_blocks() {
    let mut c = controller();
    c.display(false).unwrap();
    assert!(!c.mode().partial_blocked);

    c.set_pixel_depth(PixelDepth::FourBit).unwrap();
    let mode = c.mode();
    assert_eq!(mode.depth, PixelDepth::FourBit);
    assert!(mode.partial_blocked);
    assert_eq!(c.current().len(), GEOMETRY.framebuffer_len(PixelDepth::FourBit));
    assert!(c.current().iter().all(|&b| b == 0xFF));
    assert!(c.pending_mut().iter().all(|&b| b == 0xFF));

    assert_eq!(c.partial_update(false).unwrap().kind, UpdateKind::Full);
}

#[test]
fn same_depth_is_a_no_op() {
    let mut c = controller();
    c.display(false).unwrap();
    c.pending_mut()[0] = 0xFF;
    c.set_pixel_depth(PixelDepth::OneBit).unwrap();
    assert!(!c.mode().partial_blocked);
    assert_eq!(c.pending_mut()[0], 0xFF);
}

// ---------------------------------------------------------------------------
// Full update
// ---------------------------------------------------------------------------

#[test]
fn full_update_streams_clean_then_phases() {
    let mut c = controller();
    c.load_waveform(short_full_waveform()).unwrap();
    c.pending_mut().fill(0xFF); // all black

    let stats = c.display(false).unwrap();
    assert_eq!(stats.kind, UpdateKind::Full);
    assert_eq!(stats.clean_passes, 2);
    assert_eq!(stats.phase_passes, 3);
    assert_eq!(stats.rows, 5 * 8);
    assert!(!c.mode().partial_blocked);
    assert!(!c.mode().rails_enabled);

    let frames = c.bus().frames();
    let seen: Vec<(u32, Option<u8>)> = frames.iter().map(|f| (f.cycle_delay, f.uniform)).collect();
    assert_eq!(
        seen,
        [
            (200, Some(0x55)),
            (200, Some(0xAA)),
            (100, Some(0x55)),
            (100, Some(0xAA)),
            (100, Some(0x00)),
        ]
    );
    assert!(frames.iter().all(|f| f.rows == 8 && f.bytes == 8 * 8));
    assert_eq!(c.bus().protocol_errors(), 0);
}

#[test]
fn full_update_decodes_mixed_image() {
    let mut c = controller();
    c.load_waveform(short_full_waveform()).unwrap();
    // left half of every row black, right half white
    for row in c.pending_mut().chunks_mut(4) {
        row.copy_from_slice(&[0xFF, 0xFF, 0x00, 0x00]);
    }
    c.display(false).unwrap();

    let first_phase = &c.bus().frames()[2];
    assert_eq!(first_phase.uniform, None);
    assert_eq!(&first_phase.data[..8], &[0x55, 0x55, 0x55, 0x55, 0xAA, 0xAA, 0xAA, 0xAA]);
    assert!(c.current().chunks(4).all(|r| r == [0xFF, 0xFF, 0x00, 0x00]));
}

#[test]
fn failed_power_up_keeps_partial_blocked() {
    let mut c = controller_with(MockRails::never_good());
    assert_eq!(
        c.display(false),
        Err(RefreshError::Power(PowerError::Timeout { status: 0x0A }))
    );
    assert!(c.mode().partial_blocked);
    assert!(!c.mode().rails_enabled);
    assert_eq!(c.bus().frame_count(), 0);
    assert_eq!(c.last_update(), None);
}

#[test]
fn failed_forced_full_update_stays_blocked() {
    let mut c = controller();
    c.display(false).unwrap();
    c.set_pixel_depth(PixelDepth::FourBit).unwrap();
    c.set_full_update_threshold(1);
    c.pending_mut().fill(0x00);
    let frames = c.bus().frame_count();
    let last = c.last_update();

    c.pmic().up_value = 0x0A;
    assert_eq!(
        c.partial_update(false),
        Err(RefreshError::Power(PowerError::Timeout { status: 0x0A }))
    );
    assert!(c.mode().partial_blocked);
    assert!(c.current().iter().all(|&b| b == 0xFF));
    assert_eq!(c.bus().frame_count(), frames);
    assert_eq!(c.last_update(), last);

    c.pmic().up_value = platform::tps65186::PWR_GOOD_OK;
    assert_eq!(c.partial_update(false).unwrap().kind, UpdateKind::Full);
    assert!(!c.mode().partial_blocked);
    assert!(c.current().iter().all(|&b| b == 0x00));
}

#[test]
fn keep_rails_on_leaves_rails_up() {
    let mut c = controller();
    c.display(true).unwrap();
    assert!(c.mode().rails_enabled);
    assert!(c.read_power_rail_health().unwrap());

    c.partial_update(true).unwrap();
    assert!(c.mode().rails_enabled);

    c.set_rails(false).unwrap();
    assert!(!c.mode().rails_enabled);
    assert!(!c.read_power_rail_health().unwrap());

    let (_, power, _, _) = c.into_parts();
    let (rails, lines, _) = power.release();
    // one power-up, one power-down
    let ups = rails
        .events()
        .iter()
        .filter(|e| matches!(e, platform::mocks::RailEvent::Wake(platform::PinState::High)))
        .count();
    assert_eq!(ups, 1);
    assert!(!rails.awake());
    assert_eq!(lines.bus_mode(), platform::BusMode::HighZ);
}

// ---------------------------------------------------------------------------
// Partial update
// ---------------------------------------------------------------------------

#[test]
fn partial_update_four_bit_white_over_black() {
    let mut c = controller();
    c.set_pixel_depth(PixelDepth::FourBit).unwrap();
    c.pending_mut().fill(0x00);
    c.display(false).unwrap();
    assert!(c.current().iter().all(|&b| b == 0x00));

    c.clear_pending_framebuffer();
    let before = c.bus().frame_count();
    let stats = c.partial_update(false).unwrap();
    assert_eq!(stats.kind, UpdateKind::Partial);
    assert_eq!(stats.mask_passes, 1);
    assert_eq!(stats.clean_passes, 1);
    assert_eq!(stats.phase_passes, 0);

    let frames = &c.bus().frames()[before..];
    assert_eq!(frames.len(), 2);
    // every pixel changed and targets white: no skip codes at all
    let mask = &frames[0];
    assert_eq!(mask.bytes, GEOMETRY.mask_len());
    assert!(mask.data.iter().all(|&b| b == 0xAA));
    assert_eq!(frames[1].uniform, Some(0x00));

    assert!(c.current().iter().all(|&b| b == 0xFF));
}

#[test]
fn partial_update_touches_only_changed_pixels() {
    let mut c = controller();
    c.display(false).unwrap();

    // one black pixel at (0, 0)
    c.pending_mut()[0] = 0x80;
    let before = c.bus().frame_count();
    c.partial_update(false).unwrap();

    let mask = &c.bus().frames()[before];
    assert_eq!(mask.data[0], 0b01_11_11_11);
    assert!(mask.data[1..].iter().all(|&b| b == 0xFF));
    assert_eq!(c.current()[0], 0x80);
}

#[test]
fn unchanged_image_streams_all_skip() {
    let mut c = controller();
    c.display(false).unwrap();
    let before = c.bus().frame_count();
    c.partial_update(false).unwrap();
    assert_eq!(c.bus().frames()[before].uniform, Some(0xFF));
}

#[test]
fn failed_partial_update_changes_nothing() {
    let mut c = controller();
    c.display(false).unwrap();
    c.set_full_update_threshold(3);
    c.partial_update(false).unwrap();

    c.pending_mut()[0] = 0x80;
    let current = c.current().to_vec();
    let frames = c.bus().frame_count();
    let last = c.last_update();

    c.pmic().up_value = 0x0A;
    assert_eq!(
        c.partial_update(false),
        Err(RefreshError::Power(PowerError::Timeout { status: 0x0A }))
    );
    let mode = c.mode();
    assert_eq!(mode.partial_counter, 1);
    assert!(!mode.partial_blocked);
    assert!(!mode.rails_enabled);
    assert_eq!(c.current(), &current[..]);
    assert_eq!(c.bus().frame_count(), frames);
    assert_eq!(c.last_update(), last);

    c.pmic().up_value = platform::tps65186::PWR_GOOD_OK;
    assert_eq!(c.partial_update(false).unwrap().kind, UpdateKind::Partial);
    assert_eq!(c.mode().partial_counter, 2);
    assert_eq!(c.current()[0], 0x80);
}

#[test]
fn failed_threshold_promotion_keeps_counter() {
    let mut c = controller();
    c.display(false).unwrap();
    c.set_full_update_threshold(1);
    c.partial_update(false).unwrap();
    assert_eq!(c.mode().partial_counter, 1);

    c.pmic().up_value = 0x0A;
    assert!(c.partial_update(false).is_err());
    assert_eq!(c.mode().partial_counter, 1);

    c.pmic().up_value = platform::tps65186::PWR_GOOD_OK;
    assert_eq!(c.partial_update(false).unwrap().kind, UpdateKind::Full);
    assert_eq!(c.mode().partial_counter, 0);
}

#[test]
fn threshold_forces_full_update_and_resets_counter() {
    let mut c = controller();
    c.display(false).unwrap();
    c.set_full_update_threshold(5);

    for expected in 1..=5 {
        let stats = c.partial_update(false).unwrap();
        assert_eq!(stats.kind, UpdateKind::Partial);
        assert_eq!(c.mode().partial_counter, expected);
    }

    let stats = c.partial_update(false).unwrap();
    assert_eq!(stats.kind, UpdateKind::Full);
    assert_eq!(c.mode().partial_counter, 0);
    assert_eq!(c.last_update(), Some(stats));

    assert_eq!(c.partial_update(false).unwrap().kind, UpdateKind::Partial);
    assert_eq!(c.mode().partial_counter, 1);
}

#[test]
fn zero_threshold_never_counts() {
    let mut c = controller();
    c.display(false).unwrap();
    for _ in 0..10 {
        assert_eq!(c.partial_update(false).unwrap().kind, UpdateKind::Partial);
    }
    assert_eq!(c.mode().partial_counter, 0);
}

#[test]
fn setting_threshold_resets_counter_without_blocking() {
    let mut c = controller();
    c.display(false).unwrap();
    c.set_full_update_threshold(3);
    c.partial_update(false).unwrap();
    c.partial_update(false).unwrap();
    c.set_full_update_threshold(3);
    assert_eq!(c.mode().partial_counter, 0);
    assert!(!c.mode().partial_blocked);
    assert_eq!(c.partial_update(false).unwrap().kind, UpdateKind::Partial);
}

// ---------------------------------------------------------------------------
// Waveforms
// ---------------------------------------------------------------------------

static NO_PHASES: [PhaseColumn; 0] = [];

#[test]
fn rejected_waveform_keeps_previous() {
    let mut c = controller();
    c.load_waveform(short_full_waveform()).unwrap();

    let empty = Waveform {
        phases: &NO_PHASES,
        name: "empty",
        ..short_full_waveform()
    };
    assert_eq!(
        c.load_waveform(empty),
        Err(RefreshError::Waveform(WaveformError::NoPhases))
    );
    let bad_tag = Waveform {
        tag: 0x00,
        ..short_full_waveform()
    };
    assert_eq!(
        c.load_waveform(bad_tag),
        Err(RefreshError::Waveform(WaveformError::BadTag { found: 0x00 }))
    );
    assert_eq!(c.waveform(PixelDepth::OneBit, UpdateKind::Full).name, "test1BitFull");
}

#[test]
fn partial_cycle_delay_comes_from_partial_waveform() {
    let mut c = controller();
    c.display(false).unwrap();
    let partial = Waveform {
        cycle_delay: 33,
        clean_cycle_delay: 44,
        ..*c.waveform(PixelDepth::OneBit, UpdateKind::Partial)
    };
    c.load_waveform(partial).unwrap();
    let before = c.bus().frame_count();
    c.partial_update(false).unwrap();
    let frames = &c.bus().frames()[before..];
    assert_eq!(frames[0].cycle_delay, 33);
    assert_eq!(frames[1].cycle_delay, 44);
}

// ---------------------------------------------------------------------------
// Pending image access
// ---------------------------------------------------------------------------

#[test]
fn write_pending_rejects_oversized_image() {
    let mut c = controller();
    let image = vec![0xFF; GEOMETRY.framebuffer_len(PixelDepth::OneBit) + 1];
    assert_eq!(
        c.write_pending(&image),
        Err(RefreshError::BufferTooSmall {
            needed: 33,
            actual: 32
        })
    );
    c.write_pending(&image[..32]).unwrap();
    assert!(c.pending_mut().iter().all(|&b| b == 0xFF));
}

#[test]
fn canvas_drawing_reaches_the_panel() {
    let mut c = controller();
    c.display(false).unwrap();

    Rectangle::new(Point::new(0, 0), Size::new(8, 1))
        .into_styled(PrimitiveStyle::with_fill(Gray4::BLACK))
        .draw(&mut c.canvas())
        .unwrap();
    assert_eq!(c.pending_mut()[0], 0xFF);

    let before = c.bus().frame_count();
    c.partial_update(false).unwrap();
    let mask = &c.bus().frames()[before];
    assert_eq!(&mask.data[..2], &[0x55, 0x55]);
    assert!(mask.data[2..].iter().all(|&b| b == 0xFF));
}
