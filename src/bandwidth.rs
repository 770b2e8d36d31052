//! Loop filter (bandwidth) selection
//!
//! In integer mode the PLL loop filter is set manually and has to follow the
//! multiplier, otherwise the loop is not stable over the full M range.

use crate::constants::PVALMAX;

/// Largest value of the 6-bit SELI field
const SELI_MAX: u32 = 0x3F;

/// Loop filter coefficients (SYSPLLCTRL SELP / SELI / SELR)
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LoopFilter {
    /// Proportional term
    pub selp: u32,
    /// Integral term
    pub seli: u32,
    /// Resistor term, always 0 in integer mode
    pub selr: u32,
}

/// Filter coefficients for multiplier `m`.
///
/// The coefficients only depend on M; `_bypass_fbdiv2` is accepted so callers
/// pass the full feedback configuration.
pub fn select_filter(m: u32, _bypass_fbdiv2: bool) -> LoopFilter {
    let selp = if m < 60 { (m >> 1) + 1 } else { PVALMAX - 1 };

    let seli = if m > 16384 {
        1
    } else if m > 8192 {
        2
    } else if m > 2048 {
        4
    } else if m >= 501 {
        8
    } else if m >= 60 {
        4 * (1024 / (m + 9))
    } else {
        (m & 0x3C) + 4
    };

    LoopFilter {
        selp,
        seli: seli.min(SELI_MAX),
        selr: 0,
    }
}
