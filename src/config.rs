//! CGU configuration
//! Board clock inputs / PLL setup requests

use crate::register::{ModComp, ModDepth, ModFreq};

/// Default PLL lock wait, us
pub const DEFAULT_LOCK_TIMEOUT_US: u32 = 10_000;

/// PLL lock wait limit
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockTimeout {
    /// Give up after this many microseconds
    Micros(u32),
    /// Spin until the PLL locks
    Never,
}

impl Default for LockTimeout {
    fn default() -> Self {
        LockTimeout::Micros(DEFAULT_LOCK_TIMEOUT_US)
    }
}

/// What to do after the PLL registers are written
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SetupFlags {
    /// Power the PLL up
    pub power_up: bool,
    /// Power the PLL up and wait for lock
    pub wait_lock: bool,
    /// Scale the core voltage for the new PLL rate
    pub adjust_voltage: bool,
}

impl SetupFlags {
    /// Registers only, the PLL stays powered down
    pub const fn new() -> Self {
        SetupFlags {
            power_up: false,
            wait_lock: false,
            adjust_voltage: false,
        }
    }

    pub const fn power_up(mut self, v: bool) -> Self {
        self.power_up = v;
        self
    }

    pub const fn wait_lock(mut self, v: bool) -> Self {
        self.wait_lock = v;
        self
    }

    pub const fn adjust_voltage(mut self, v: bool) -> Self {
        self.adjust_voltage = v;
        self
    }
}

/// Spread spectrum modulation settings.
/// Defaults to the middle of each range, no dither.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpreadSpectrum {
    pub mod_freq: ModFreq,
    pub mod_depth: ModDepth,
    pub mod_comp: ModComp,
    pub dither: bool,
}

impl Default for SpreadSpectrum {
    fn default() -> Self {
        SpreadSpectrum::new()
    }
}

impl SpreadSpectrum {
    pub const fn new() -> Self {
        SpreadSpectrum {
            mod_freq: ModFreq(4),
            mod_depth: ModDepth(4),
            mod_comp: ModComp(2),
            dither: false,
        }
    }
}

/// PLL setup request
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PllConfig {
    /// Requested PLL output, Hz
    pub desired_rate: u32,
    /// PLL input, Hz. `None` uses the rate of the selected PLL input clock.
    pub input_rate: Option<u32>,
    /// Integer mode only, no fractional multiplier
    pub force_no_fract: bool,
    /// Keep the feedback divide-by-2
    pub use_feedback_div2: bool,
    /// Modulation used in fractional mode
    pub ss: SpreadSpectrum,
    /// Used when the request is applied with [`crate::Cgu::setup_pll`]
    pub flags: SetupFlags,
}

impl PllConfig {
    /// Fractional mode request for `desired_rate`, input from the PLL input mux
    pub const fn new(desired_rate: u32) -> Self {
        PllConfig {
            desired_rate,
            input_rate: None,
            force_no_fract: false,
            use_feedback_div2: false,
            ss: SpreadSpectrum::new(),
            flags: SetupFlags::new(),
        }
    }

    pub const fn input_rate(mut self, hz: u32) -> Self {
        self.input_rate = Some(hz);
        self
    }

    pub const fn force_no_fract(mut self, v: bool) -> Self {
        self.force_no_fract = v;
        self
    }

    pub const fn use_feedback_div2(mut self, v: bool) -> Self {
        self.use_feedback_div2 = v;
        self
    }

    pub const fn spread_spectrum(mut self, ss: SpreadSpectrum) -> Self {
        self.ss = ss;
        self
    }

    pub const fn flags(mut self, flags: SetupFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Board level clock configuration
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CguConfig {
    /// Rate driven on the CLKIN pin, 0 when unused
    pub ext_clk_hz: u32,
    /// PLL lock wait limit
    pub lock_timeout: LockTimeout,
}

impl CguConfig {
    pub const fn new(ext_clk_hz: u32) -> Self {
        CguConfig {
            ext_clk_hz,
            lock_timeout: LockTimeout::Micros(DEFAULT_LOCK_TIMEOUT_US),
        }
    }

    pub const fn lock_timeout(mut self, timeout: LockTimeout) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(LockTimeout::default(), LockTimeout::Micros(10_000));
        assert_eq!(CguConfig::default(), CguConfig::new(0));
        assert_eq!(SetupFlags::default(), SetupFlags::new());
        assert_eq!(SpreadSpectrum::default().mod_comp, ModComp(2));
    }

    #[test]
    fn test_builders() {
        const PLL: PllConfig = PllConfig::new(96_000_000)
            .input_rate(12_000_000)
            .force_no_fract(true)
            .flags(SetupFlags::new().wait_lock(true));

        assert_eq!(PLL.input_rate, Some(12_000_000));
        assert!(PLL.force_no_fract);
        assert!(!PLL.use_feedback_div2);
        assert!(PLL.flags.wait_lock);
        assert!(!PLL.flags.power_up);

        let cfg = CguConfig::new(10_000_000).lock_timeout(LockTimeout::Never);
        assert_eq!(cfg.lock_timeout, LockTimeout::Never);
    }
}
