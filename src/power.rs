//! Power domain control, provided by the platform
//!
//! On this part a power domain is *enabled* by setting its PDRUNCFG bit,
//! which powers the block down. `enable_pd` therefore turns a block off.

/// Power domains, value is the PDRUNCFG0 bit slot
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PowerDomain {
    /// IRC oscillator output
    IrcOsc = 3,
    /// IRC oscillator
    Irc = 4,
    /// Flash memory
    Flash = 5,
    /// Brown out detect reset
    BodRst = 7,
    /// Brown out detect interrupt
    BodIntr = 8,
    /// ADC
    Adc0 = 10,
    /// SRAM0A
    Sram0A = 13,
    /// SRAM0B
    Sram0B = 14,
    /// SRAM1
    Sram1 = 15,
    /// SRAM2
    Sram2 = 16,
    /// ROM
    Rom = 17,
    /// Analog supply for the ADC
    Vdda = 19,
    /// Watchdog oscillator
    WdtOsc = 20,
    /// System PLL
    SysPll = 22,
    /// ADC positive reference
    Vrefp = 23,
    /// RTC 32 kHz oscillator
    Osc32K = 24,
}

impl PowerDomain {
    /// Bit of the domain in PDRUNCFG
    #[inline]
    pub const fn mask(self) -> u32 {
        1 << (self as u32)
    }

    /// Is the domain powered down in the given PDRUNCFG word
    #[inline]
    pub const fn is_powered_down(self, pdruncfg: u32) -> bool {
        pdruncfg & self.mask() != 0
    }
}

/// Power management collaborator of the PLL sequencer.
pub trait PowerControl {
    /// Powers the domain down (sets its PDRUNCFG bit)
    fn enable_pd(&mut self, domain: PowerDomain);

    /// Powers the domain up (clears its PDRUNCFG bit)
    fn disable_pd(&mut self, domain: PowerDomain);

    /// Scales the core voltage for a new system frequency
    fn set_voltage_for_freq(&mut self, freq: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pd_bits() {
        assert_eq!(PowerDomain::SysPll.mask(), 0x0040_0000);
        assert_eq!(PowerDomain::WdtOsc.mask(), 0x0010_0000);
        assert!(PowerDomain::Irc.is_powered_down(1 << 4));
        assert!(!PowerDomain::IrcOsc.is_powered_down(1 << 4));
    }
}
