//! Errors

/// PLL setup errors.
///
/// All synthesis errors are detected before anything is written to the
/// hardware, the caller can retry with different parameters.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PllError {
    /// PLL input frequency is below the allowed minimum for the requested mode
    InputTooLow,
    /// PLL input frequency needs a pre-divider above the N maximum
    InputTooHigh,
    /// Requested output is above the CCO maximum
    OutputTooHigh,
    /// Requested output is below what the largest post-divider can reach
    OutputTooLow,
    /// No integer divider/multiplier combination fits the hardware limits
    OutsideIntLimit,
    /// The PLL did not report lock within the configured timeout
    LockTimeout,
}

/// Clock configuration error outside of the PLL
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The requested configuration was impossible or conflicting
    BadConfiguration {
        /// Explanation of error
        reason: &'static str,
    },
}

impl ClockError {
    pub(crate) fn bad_config(reason: &'static str) -> Self {
        Self::BadConfiguration { reason }
    }
}
