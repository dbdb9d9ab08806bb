//! Error types
//!
//! Every error surfaces synchronously from the call that detected it.
//! Nothing is retried except the bounded power-good poll.

use thiserror_no_std::Error;

/// Rail sequencing failures. Rails are back in their safe state when
/// any of these is returned; the caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerError {
    /// Power-good never reached the OK pattern while enabling.
    #[error("rails not in regulation after timeout (power-good {status:#04x})")]
    Timeout {
        /// Last power-good byte read
        status: u8,
    },
    /// Power-good never dropped to zero while disabling.
    #[error("rails did not discharge after timeout (power-good {status:#04x})")]
    DischargeTimeout {
        /// Last power-good byte read
        status: u8,
    },
    /// PMIC register or pin access failed.
    #[error("PMIC access failed")]
    Pmic,
    /// Panel control line or bus direction change failed.
    #[error("panel control line access failed")]
    ControlLines,
}

/// Rejected waveform loads. The previously active table stays in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveformError {
    /// Format tag did not match the expected value.
    #[error("bad waveform tag {found:#04x}")]
    BadTag {
        /// Tag carried by the rejected waveform
        found: u8,
    },
    /// Waveform has no drive phases.
    #[error("waveform has zero phases")]
    NoPhases,
}

/// Invalid [`crate::EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Width must be a non-zero multiple of 8 pixels.
    #[error("panel width {0} is not a non-zero multiple of 8")]
    Width(u32),
    /// Height must be non-zero and at most [`crate::config::MAX_ROWS`].
    #[error("panel height {0} out of range")]
    Height(u32),
    /// A drive row does not fit the row buffers.
    #[error("drive row of {0} bytes exceeds row buffer")]
    RowTooWide(usize),
    /// Staging buffer must hold at least one 4-bit source row and fit its capacity.
    #[error("staging size {0} out of range")]
    Staging(usize),
}

/// Errors from the display state controller and streaming pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshError {
    /// Power sequencing failed.
    #[error("power sequencing: {0}")]
    Power(#[from] PowerError),
    /// Waveform rejected.
    #[error("waveform: {0}")]
    Waveform(#[from] WaveformError),
    /// Engine configuration rejected.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    /// A framebuffer or scratch buffer is shorter than the panel needs.
    #[error("buffer too small: need {needed} bytes, have {actual}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_error_converts_into_refresh_error() {
        let e: RefreshError = PowerError::Timeout { status: 0x0A }.into();
        assert_eq!(e, RefreshError::Power(PowerError::Timeout { status: 0x0A }));
    }

    #[test]
    fn display_messages_carry_details() {
        let msg = std::format!("{}", PowerError::Timeout { status: 0x0A });
        assert!(msg.contains("0x0a"), "got {msg}");
        let msg = std::format!(
            "{}",
            RefreshError::BufferTooSmall {
                needed: 10,
                actual: 4
            }
        );
        assert!(msg.contains("need 10"), "got {msg}");
        let msg = std::format!("{}", WaveformError::BadTag { found: 0x12 });
        assert!(msg.contains("0x12"), "got {msg}");
    }
}
