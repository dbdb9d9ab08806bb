//! Panel power sequencing
//!
//! Brings the PMIC rails up and down in the order the panel tolerates and
//! tracks whether they are up. Streaming requires a [`RailsUp`] token,
//! which only [`PowerSequencer::enable`] hands out.
//!
//! Power-up: WAKE, PWRUP, rail mask, bus to output with idle control
//! levels, VCOM, then poll power-good until every rail is in regulation.
//! Power-down runs the reverse, waits for the rails to discharge and
//! puts the PMIC back to sleep.

use embedded_hal::delay::DelayNs;
use platform::{BusMode, ControlLine, EpdRails, PanelControl, PinState, RailMask};

use crate::config::EngineConfig;
use crate::error::PowerError;

const POLL_INTERVAL_MS: u32 = 1;

/// Proof that the rails were up when it was issued.
#[derive(Debug, Clone, Copy)]
pub struct RailsUp {
    _private: (),
}

impl RailsUp {
    #[cfg(test)]
    pub(crate) const fn for_test() -> Self {
        Self { _private: () }
    }
}

/// PMIC and control-line sequencing.
#[derive(Debug)]
pub struct PowerSequencer<R, L, D> {
    rails: R,
    lines: L,
    delay: D,
    enabled: bool,
    timeout_ms: u32,
    step_delay_ms: u32,
}

impl<R, L, D> PowerSequencer<R, L, D>
where
    R: EpdRails,
    L: PanelControl,
    D: DelayNs,
{
    /// New sequencer with rails assumed down.
    pub fn new(rails: R, lines: L, delay: D, config: &EngineConfig) -> Self {
        Self {
            rails,
            lines,
            delay,
            enabled: false,
            timeout_ms: config.power_good_timeout_ms,
            step_delay_ms: config.power_step_delay_ms,
        }
    }

    /// True while the rails are up.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bring the rails up (if they are not already) and hand out the
    /// streaming token.
    pub fn enable(&mut self) -> Result<RailsUp, PowerError> {
        self.set_rails(true)?;
        Ok(RailsUp { _private: () })
    }

    /// Bring the rails to the requested state. Nothing is re-issued when
    /// they are already there.
    pub fn set_rails(&mut self, enable: bool) -> Result<(), PowerError> {
        match (enable, self.enabled) {
            (true, true) | (false, false) => Ok(()),
            (true, false) => self.power_up(),
            (false, true) => self.power_down(),
        }
    }

    /// True if power-good reports every rail in regulation.
    pub fn read_health(&mut self) -> Result<bool, PowerError> {
        let pg = self.rails.power_good().map_err(|_| PowerError::Pmic)?;
        Ok(pg == R::POWER_GOOD_OK)
    }

    /// PMIC handle, for VCOM and temperature access between updates.
    pub fn rails_mut(&mut self) -> &mut R {
        &mut self.rails
    }

    /// Give back the PMIC, control lines and delay.
    pub fn release(self) -> (R, L, D) {
        (self.rails, self.lines, self.delay)
    }

    fn power_up(&mut self) -> Result<(), PowerError> {
        log_debug!("rails: power up");
        if let Err(e) = self.power_up_steps() {
            self.safe_state();
            return Err(e);
        }

        match self.poll_power_good(|pg| pg == R::POWER_GOOD_OK) {
            Ok(()) => {}
            Err(status) => {
                log_warn!("rails: power-good timeout, status {}", status);
                self.safe_state();
                return Err(PowerError::Timeout { status });
            }
        }

        if let Err(e) = self.lines.set_line_buffer(true) {
            self.safe_state();
            return Err(control_err(e));
        }
        self.enabled = true;
        log_info!("rails: up");
        Ok(())
    }

    fn power_up_steps(&mut self) -> Result<(), PowerError> {
        self.rails.set_wake(PinState::High).map_err(pmic_err)?;
        self.delay.delay_ms(self.step_delay_ms);
        self.rails.set_power_up(PinState::High).map_err(pmic_err)?;
        self.delay.delay_ms(self.step_delay_ms);
        self.rails.set_rails(RailMask::ALL).map_err(pmic_err)?;

        self.lines.set_bus_mode(BusMode::Output).map_err(control_err)?;
        for line in ControlLine::ALL {
            self.lines
                .set_line(line, line.idle_level())
                .map_err(control_err)?;
        }

        self.rails.set_vcom(PinState::High).map_err(pmic_err)
    }

    fn power_down(&mut self) -> Result<(), PowerError> {
        log_debug!("rails: power down");
        let steps = self.power_down_steps();
        let discharged = self.poll_power_good(|pg| pg == 0);

        // Whatever happened above, leave the mask cleared, the bus floating
        // and the PMIC asleep.
        let mask = self.rails.set_rails(RailMask::NONE).map_err(pmic_err);
        let bus = self.lines.set_bus_mode(BusMode::HighZ).map_err(control_err);
        let wake = self.rails.set_wake(PinState::Low).map_err(pmic_err);
        self.enabled = false;

        steps?;
        if let Err(status) = discharged {
            log_warn!("rails: discharge timeout, status {}", status);
            return Err(PowerError::DischargeTimeout { status });
        }
        mask?;
        bus?;
        wake?;
        log_info!("rails: down");
        Ok(())
    }

    fn power_down_steps(&mut self) -> Result<(), PowerError> {
        for line in ControlLine::ALL {
            self.lines
                .set_line(line, PinState::Low)
                .map_err(control_err)?;
        }
        self.rails.set_vcom(PinState::Low).map_err(pmic_err)?;
        self.rails.set_power_up(PinState::Low).map_err(pmic_err)?;
        self.lines.set_line_buffer(false).map_err(control_err)
    }

    /// Poll power-good every millisecond until `done` accepts it. Returns
    /// the last status on timeout or read failure.
    fn poll_power_good(&mut self, done: impl Fn(u8) -> bool) -> Result<(), u8> {
        let mut status = 0;
        for _ in 0..self.timeout_ms.max(1) {
            match self.rails.power_good() {
                Ok(pg) if done(pg) => return Ok(()),
                Ok(pg) => status = pg,
                Err(_) => return Err(status),
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
        Err(status)
    }

    /// Best effort: VCOM and PWRUP low, rails off, control lines low, bus
    /// floating, WAKE low.
    fn safe_state(&mut self) {
        self.rails.set_vcom(PinState::Low).ok();
        self.rails.set_power_up(PinState::Low).ok();
        self.rails.set_rails(RailMask::NONE).ok();
        for line in ControlLine::ALL {
            self.lines.set_line(line, PinState::Low).ok();
        }
        self.lines.set_line_buffer(false).ok();
        self.lines.set_bus_mode(BusMode::HighZ).ok();
        self.rails.set_wake(PinState::Low).ok();
        self.enabled = false;
    }
}

fn pmic_err<E>(_: E) -> PowerError {
    PowerError::Pmic
}

fn control_err<E>(_: E) -> PowerError {
    PowerError::ControlLines
}
