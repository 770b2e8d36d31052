//! SYSCON / ASYNC_SYSCON register access
//!
//! The CGU never touches memory mapped registers directly. Everything goes
//! through [`Syscon`], implemented by the board support on top of its PAC, or
//! by [`RegisterFile`] for a captured register snapshot.

/// SYSCON and ASYNC_SYSCON registers used by the CGU
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SysconReg {
    /// Main clock source select A
    MainClkSelA,
    /// Main clock source select B
    MainClkSelB,
    /// CLKOUT source select A
    ClkOutSelA,
    /// CLKOUT source select B
    ClkOutSelB,
    /// PLL clock source select
    SysPllClkSel,
    /// ADC clock source select
    AdcClkSel,
    /// SYSTICK clock divider
    SysTickClkDiv,
    /// System clock divider
    AhbClkDiv,
    /// CLKOUT clock divider
    ClkOutDiv,
    /// ADC clock divider
    AdcClkDiv,
    /// Flash configuration
    FlashCfg,
    /// Power configuration, a set bit powers the block down
    PdRunCfg,
    /// RTC oscillator control
    RtcOscCtrl,
    /// PLL control
    SysPllCtrl,
    /// PLL status
    SysPllStat,
    /// PLL N decoder
    SysPllNdec,
    /// PLL P decoder
    SysPllPdec,
    /// PLL spread spectrum control 0
    SysPllSsCtrl0,
    /// PLL spread spectrum control 1
    SysPllSsCtrl1,
    /// Async APB bridge control
    AsyncApbCtrl,
    /// Async APB clock source select A
    AsyncApbClkSelA,
    /// Async APB clock source select B
    AsyncApbClkSelB,
    /// Async APB clock divider
    AsyncClkDiv,
    /// Fractional rate generator control
    FrgCtrl,
}

impl SysconReg {
    /// Number of registers
    pub const COUNT: usize = 24;

    /// Every register, in declaration order
    pub const ALL: [SysconReg; Self::COUNT] = [
        SysconReg::MainClkSelA,
        SysconReg::MainClkSelB,
        SysconReg::ClkOutSelA,
        SysconReg::ClkOutSelB,
        SysconReg::SysPllClkSel,
        SysconReg::AdcClkSel,
        SysconReg::SysTickClkDiv,
        SysconReg::AhbClkDiv,
        SysconReg::ClkOutDiv,
        SysconReg::AdcClkDiv,
        SysconReg::FlashCfg,
        SysconReg::PdRunCfg,
        SysconReg::RtcOscCtrl,
        SysconReg::SysPllCtrl,
        SysconReg::SysPllStat,
        SysconReg::SysPllNdec,
        SysconReg::SysPllPdec,
        SysconReg::SysPllSsCtrl0,
        SysconReg::SysPllSsCtrl1,
        SysconReg::AsyncApbCtrl,
        SysconReg::AsyncApbClkSelA,
        SysconReg::AsyncApbClkSelB,
        SysconReg::AsyncClkDiv,
        SysconReg::FrgCtrl,
    ];

    /// Mask of the implemented bits of selector and divider registers,
    /// other registers are used as full words.
    pub const fn field_mask(self) -> u32 {
        match self {
            SysconReg::MainClkSelA
            | SysconReg::MainClkSelB
            | SysconReg::ClkOutSelA
            | SysconReg::ClkOutSelB
            | SysconReg::AsyncApbClkSelA
            | SysconReg::AsyncApbClkSelB => 0x3,
            SysconReg::SysPllClkSel | SysconReg::AdcClkSel => 0x7,
            SysconReg::SysTickClkDiv
            | SysconReg::AhbClkDiv
            | SysconReg::ClkOutDiv
            | SysconReg::AdcClkDiv
            | SysconReg::AsyncClkDiv => 0xFF,
            _ => 0xFFFF_FFFF,
        }
    }
}

/// Register bus of the clock generation unit.
pub trait Syscon {
    /// Reads a full register word
    fn read(&self, reg: SysconReg) -> u32;

    /// Writes a full register word
    fn write(&mut self, reg: SysconReg, value: u32);

    /// Read-modify-write
    #[inline]
    fn modify<F>(&mut self, reg: SysconReg, f: F)
    where F: FnOnce(u32) -> u32,
    {
        let value = f(self.read(reg));
        self.write(reg, value);
    }

    /// Selector or divider value, masked to its implemented bits
    #[inline]
    fn field(&self, reg: SysconReg) -> u32 {
        self.read(reg) & reg.field_mask()
    }
}

/// In-memory copy of the CGU registers.
///
/// Reads return the last written word. Useful as a snapshot of the live
/// registers, so the clock tree can be resolved without touching hardware.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    words: [u32; SysconReg::COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        RegisterFile {
            words: [0; SysconReg::COUNT],
        }
    }
}

impl RegisterFile {
    /// All registers zero.
    ///
    /// Note that this means every divider is 0, so every divided clock is off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current value of every register
    pub fn capture<S: Syscon>(syscon: &S) -> Self {
        let mut rf = RegisterFile::new();
        for reg in SysconReg::ALL {
            rf.words[reg as usize] = syscon.read(reg);
        }
        rf
    }

    /// Builder style register update
    pub fn with(mut self, reg: SysconReg, value: u32) -> Self {
        self.write(reg, value);
        self
    }
}

impl Syscon for RegisterFile {
    #[inline]
    fn read(&self, reg: SysconReg) -> u32 {
        self.words[reg as usize]
    }

    #[inline]
    fn write(&mut self, reg: SysconReg, value: u32) {
        self.words[reg as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_declaration_order() {
        for (i, reg) in SysconReg::ALL.iter().enumerate() {
            assert_eq!(*reg as usize, i);
        }
    }

    #[test]
    fn test_register_file() {
        let mut rf = RegisterFile::new().with(SysconReg::AhbClkDiv, 0x1_01);
        assert_eq!(rf.read(SysconReg::AhbClkDiv), 0x101);
        assert_eq!(rf.field(SysconReg::AhbClkDiv), 0x01);

        rf.modify(SysconReg::PdRunCfg, |w| w | (1 << 22));
        rf.modify(SysconReg::PdRunCfg, |w| w | (1 << 20));
        assert_eq!(rf.read(SysconReg::PdRunCfg), (1 << 22) | (1 << 20));

        let snapshot = RegisterFile::capture(&rf);
        assert_eq!(snapshot, rf);
    }
}
