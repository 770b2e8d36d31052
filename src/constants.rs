//! Constants

/// Max raw pre-divider (N) value
pub const NVALMAX: u32 = 0x100;

/// Max raw post-divider (P) value, applied as 2 * P
pub const PVALMAX: u32 = 0x20;

/// Max raw feedback multiplier (M) value
pub const MVALMAX: u32 = 0x8000;

/// A pre-divider candidate derived from the input/CCO common base
/// is only used when it stays strictly below this value.
pub const PLL_MAX_N_DIV: u32 = 0x100;

/// CCO (current controlled oscillator) min frequency
pub const CCO_FREQ_MIN: u32 = 75_000_000;

/// CCO max frequency
pub const CCO_FREQ_MAX: u32 = 150_000_000;

/// Maximum PLL output, post-divider bypassed
pub const OUT_FREQ_MAX: u32 = CCO_FREQ_MAX;

/// Minimum PLL output
/// 75 MHz CCO and the largest post-divider (2 * 32) selected
pub const OUT_FREQ_MIN: u32 = CCO_FREQ_MIN / (PVALMAX << 1);

/// Min PLL input rate, integer mode
pub const IN_FREQ_MIN: u32 = 4_000;

/// Min PLL input rate in spread spectrum mode
pub const IN_FREQ_SS_MIN: u32 = 2_000_000;

/// Max PLL input rate (after the pre-divider) in spread spectrum mode
pub const IN_FREQ_SS_MAX: u32 = 4_000_000;

/// The input/CCO greatest common divisor has to be above this
/// for a pre-divider to be worth using.
pub const GCD_MIN_BASE_FREQ: u32 = 20_000;

/// Number of fractional bits of the spread spectrum multiplier
pub const MD_FRACT_BITS: u32 = 11;

/// SSCTRL0 value forcing the CCO to its maximum setting (MDEC enabled)
/// during the lock acceleration sequence.
pub const MAX_CCO_MDEC: u32 = (1 << 18) | 0x5dd2;

/// Minimum time the CCO is held at its maximum setting after power up, us
pub const PLL_LOCK_PULSE_US: u16 = 72;

/// Internal 12 MHz IRC oscillator
pub const IRC_12M_FREQ: u32 = 12_000_000;

/// Watchdog oscillator
pub const WDT_OSC_FREQ: u32 = 500_000;

/// RTC 32 kHz crystal oscillator
pub const OSC_32K_FREQ: u32 = 32_768;
