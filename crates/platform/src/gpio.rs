//! Panel control-line abstraction
//!
//! A parallel-bus e-paper panel (ED060XC3 and relatives) is clocked by six
//! source/gate driver lines next to the 8-bit data bus. The refresh engine
//! only ever sets them to fixed levels around power transitions; the
//! cycle-accurate pulse trains live behind [`crate::panel_bus::ScanClock`].

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// Source and gate driver control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlLine {
    /// Source driver latch enable
    Le,
    /// Source driver start pulse (active low)
    Sph,
    /// Gate driver output mode
    Gmode,
    /// Gate driver start pulse (active low)
    Spv,
    /// Gate driver clock
    Ckv,
    /// Source driver output enable
    Oe,
}

impl ControlLine {
    /// Every line, in the order the power sequencer touches them.
    pub const ALL: [Self; 6] = [Self::Le, Self::Sph, Self::Gmode, Self::Spv, Self::Ckv, Self::Oe];

    /// Level the line must sit at while rails are up and the panel is idle.
    pub const fn idle_level(self) -> PinState {
        match self {
            Self::Le | Self::Ckv => PinState::Low,
            Self::Sph | Self::Gmode | Self::Spv | Self::Oe => PinState::High,
        }
    }

    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Le => "LE",
            Self::Sph => "SPH",
            Self::Gmode => "GMODE",
            Self::Spv => "SPV",
            Self::Ckv => "CKV",
            Self::Oe => "OE",
        }
    }
}

/// Direction of the panel's data and control pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusMode {
    /// Push-pull outputs, panel is being driven
    Output,
    /// High impedance, panel unpowered
    HighZ,
}

/// Panel control lines, bus direction and the line buffer in front of them.
pub trait PanelControl {
    /// Error type
    type Error: core::fmt::Debug;

    /// Drive one control line.
    fn set_line(&mut self, line: ControlLine, state: PinState) -> Result<(), Self::Error>;

    /// Switch the data and control pins between output and high impedance.
    fn set_bus_mode(&mut self, mode: BusMode) -> Result<(), Self::Error>;

    /// Enable or disable the level-shifting line buffer (active-low OE on hardware).
    fn set_line_buffer(&mut self, enabled: bool) -> Result<(), Self::Error>;
}

impl<T: PanelControl + ?Sized> PanelControl for &mut T {
    type Error = T::Error;

    fn set_line(&mut self, line: ControlLine, state: PinState) -> Result<(), Self::Error> {
        (**self).set_line(line, state)
    }

    fn set_bus_mode(&mut self, mode: BusMode) -> Result<(), Self::Error> {
        (**self).set_bus_mode(mode)
    }

    fn set_line_buffer(&mut self, enabled: bool) -> Result<(), Self::Error> {
        (**self).set_line_buffer(enabled)
    }
}
