//! Clock tree frequency resolution
//!
//! ```text
//!  Irc12M ─┬──────────────┐
//!  ClkIn  ─┤ PLLCLKSEL    ├─ PllIn ─▶ SYSPLL ─▶ PllOut
//!  WdtOsc ─┤              │
//!  Osc32K ─┘              │
//!                         ▼
//!  Irc12M/ClkIn/WdtOsc ─▶ MainClkA ─┐
//!                  PllIn/PllOut/32k ┴▶ MainClk ─┬─ /AHBCLKDIV ─▶ CoreSysClk, BusClk
//!                                              ├─ /SYSTICKCLKDIV ─▶ SysTick
//!                                              ├─ /ADCCLKDIV ─▶ AdcClk
//!                                              ├─ /CLKOUTDIV ─▶ ClockOut
//!                                              └─ /ASYNCCLKDIV ─▶ AsyncApbClk ─┬▶ Frg
//!                                                                              └▶ Usart, Spi, I2c
//! ```
//!
//! Every node is a pure function of the current selector and divider
//! values, nothing is written. A divider of 0 stops its clock, an
//! unknown selector value selects no clock.

use crate::constants::*;
use crate::pll::PllSetup;
use crate::power::PowerDomain;
use crate::register::{FrgCtrlReg, FrgDiv, FrgMult, Reg, RtcOscCtrl, RtcOscEnable};
use crate::syscon::{Syscon, SysconReg};

/// Clock tree nodes
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockNode {
    /// 12 MHz internal RC oscillator
    Irc12M,
    /// External clock input (CLKIN)
    ClkIn,
    /// Watchdog oscillator
    WdtOsc,
    /// RTC 32 kHz oscillator
    Osc32K,
    /// System PLL output
    PllOut,
    /// System PLL input
    PllIn,
    /// Main clock, first stage selector
    MainClkA,
    /// Main clock
    MainClk,
    /// Core system clock
    CoreSysClk,
    /// AHB bus clock
    BusClk,
    /// SYSTICK clock
    SysTick,
    /// ADC clock
    AdcClk,
    /// CLKOUT pin clock
    ClockOut,
    /// Asynchronous APB bus clock
    AsyncApbClk,
    /// Fractional rate generator output
    Frg,
    /// USART function clock
    Usart,
    /// SPI function clock
    Spi,
    /// I2C function clock
    I2c,
}

/// Frequency resolver over a register snapshot
pub struct ClockTree<'a, S> {
    syscon: &'a S,
    ext_clk_hz: u32,
    /// `None`: decoded from the PLL registers when needed
    pll_out_hz: Option<u32>,
}

impl<'a, S> ClockTree<'a, S>
where
    S: Syscon,
{
    /// Resolver over `syscon`.
    ///
    /// `ext_clk_hz` is the rate of the CLKIN pin, `pll_out_hz` the current
    /// PLL output rate (see [`crate::pll::PllSetup::output_hz`]).
    pub fn new(syscon: &'a S, ext_clk_hz: u32, pll_out_hz: u32) -> Self {
        ClockTree {
            syscon,
            ext_clk_hz,
            pll_out_hz: Some(pll_out_hz),
        }
    }

    /// Resolver that reads the PLL output rate back from the PLL registers,
    /// only for queries that depend on it.
    pub fn reading_pll(syscon: &'a S, ext_clk_hz: u32) -> Self {
        ClockTree {
            syscon,
            ext_clk_hz,
            pll_out_hz: None,
        }
    }

    /// Current frequency of `node` in Hz, 0 when the node is not clocked.
    pub fn frequency_at(&self, node: ClockNode) -> u32 {
        match node {
            ClockNode::Irc12M => self.irc_12m(),
            ClockNode::ClkIn => self.ext_clk_hz,
            ClockNode::WdtOsc => self.wdt_osc(),
            ClockNode::Osc32K => self.osc_32k(),
            ClockNode::PllOut => self.pll_out(),
            ClockNode::PllIn => self.pll_in(),
            ClockNode::MainClkA => self.main_clk_a(),
            ClockNode::MainClk => self.main_clk(),
            ClockNode::CoreSysClk | ClockNode::BusClk => {
                self.divided(ClockNode::MainClk, SysconReg::AhbClkDiv)
            }
            ClockNode::SysTick => self.divided(ClockNode::MainClk, SysconReg::SysTickClkDiv),
            ClockNode::AdcClk => self.adc_clk(),
            ClockNode::ClockOut => self.clock_out(),
            ClockNode::AsyncApbClk => self.async_apb_clk(),
            ClockNode::Frg => self.frg(),
            ClockNode::Usart | ClockNode::Spi | ClockNode::I2c => self.async_function_clk(),
        }
    }

    fn pdruncfg(&self) -> u32 {
        self.syscon.read(SysconReg::PdRunCfg)
    }

    fn irc_12m(&self) -> u32 {
        let pd = self.pdruncfg();
        if PowerDomain::IrcOsc.is_powered_down(pd) || PowerDomain::Irc.is_powered_down(pd) {
            0
        } else {
            IRC_12M_FREQ
        }
    }

    fn wdt_osc(&self) -> u32 {
        if PowerDomain::WdtOsc.is_powered_down(self.pdruncfg()) {
            0
        } else {
            WDT_OSC_FREQ
        }
    }

    fn osc_32k(&self) -> u32 {
        let ctrl = Reg::<RtcOscCtrl>::from_word(self.syscon.read(SysconReg::RtcOscCtrl));
        match ctrl.get::<RtcOscEnable>() {
            RtcOscEnable::Enabled => OSC_32K_FREQ,
            RtcOscEnable::Disabled => 0,
        }
    }

    /// Frequency of the source picked by selector `reg`
    fn select(&self, reg: SysconReg, sources: &[ClockNode]) -> u32 {
        sources
            .get(self.syscon.field(reg) as usize)
            .map_or(0, |&node| self.frequency_at(node))
    }

    /// `node` divided by the value of `div`, 0 when the divider is 0
    fn divided(&self, node: ClockNode, div: SysconReg) -> u32 {
        match self.syscon.field(div) {
            0 => 0,
            d => self.frequency_at(node) / d,
        }
    }

    fn pll_out(&self) -> u32 {
        match self.pll_out_hz {
            Some(hz) => hz,
            None => PllSetup::read(self.syscon).output_hz(self.pll_in()),
        }
    }

    fn pll_in(&self) -> u32 {
        use ClockNode::*;
        self.select(SysconReg::SysPllClkSel, &[Irc12M, ClkIn, WdtOsc, Osc32K])
    }

    fn main_clk_a(&self) -> u32 {
        use ClockNode::*;
        self.select(SysconReg::MainClkSelA, &[Irc12M, ClkIn, WdtOsc])
    }

    fn main_clk(&self) -> u32 {
        use ClockNode::*;
        self.select(SysconReg::MainClkSelB, &[MainClkA, PllIn, PllOut, Osc32K])
    }

    fn adc_clk(&self) -> u32 {
        use ClockNode::*;
        match self.syscon.field(SysconReg::AdcClkDiv) {
            0 => 0,
            d => self.select(SysconReg::AdcClkSel, &[MainClk, PllOut, Irc12M]) / d,
        }
    }

    fn clock_out(&self) -> u32 {
        use ClockNode::*;
        let div = self.syscon.field(SysconReg::ClkOutDiv);
        if div == 0 {
            return 0;
        }
        let freq = match self.syscon.field(SysconReg::ClkOutSelB) {
            0 => self.select(SysconReg::ClkOutSelA, &[MainClk, ClkIn, WdtOsc, Irc12M]),
            3 => self.osc_32k(),
            _ => 0,
        };
        freq / div
    }

    fn async_apb_clk(&self) -> u32 {
        use ClockNode::*;
        let div = self.syscon.field(SysconReg::AsyncClkDiv);
        if div == 0 {
            return 0;
        }
        let freq = match self.syscon.field(SysconReg::AsyncApbClkSelB) {
            0 => self.main_clk(),
            1 => self.ext_clk_hz,
            2 => self.pll_out(),
            3 => self.select(SysconReg::AsyncApbClkSelA, &[Irc12M, WdtOsc]),
            _ => 0,
        };
        freq / div
    }

    fn frg(&self) -> u32 {
        let ctrl = Reg::<FrgCtrlReg>::from_word(self.syscon.read(SysconReg::FrgCtrl));
        let FrgDiv(div) = ctrl.get();
        if div != 0xFF {
            return 0;
        }
        let FrgMult(mult) = ctrl.get();
        let input = self.async_apb_clk() as u64;
        (input * 256 / (256 + mult as u64)) as u32
    }

    /// USART / SPI / I2C clock: async APB clock / (1 + MULT / 256).
    /// MULT is 8 bits wide, so this is the async APB clock itself.
    fn async_function_clk(&self) -> u32 {
        let ctrl = Reg::<FrgCtrlReg>::from_word(self.syscon.read(SysconReg::FrgCtrl));
        let FrgMult(mult) = ctrl.get();
        self.async_apb_clk() / (1 + mult as u32 / 256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pll::synthesize;
    use crate::syscon::RegisterFile;
    use core::cell::Cell;

    const EXT: u32 = 10_000_000;
    const PLL: u32 = 100_000_000;

    /// Main clock from the PLL, every divider at 1
    fn pll_main() -> RegisterFile {
        RegisterFile::new()
            .with(SysconReg::SysPllClkSel, 0)
            .with(SysconReg::MainClkSelA, 0)
            .with(SysconReg::MainClkSelB, 2)
            .with(SysconReg::AhbClkDiv, 1)
            .with(SysconReg::SysTickClkDiv, 1)
            .with(SysconReg::AdcClkDiv, 1)
            .with(SysconReg::ClkOutDiv, 1)
            .with(SysconReg::AsyncClkDiv, 1)
            .with(SysconReg::RtcOscCtrl, 1)
    }

    #[test]
    fn test_sources() {
        let rf = RegisterFile::new().with(SysconReg::RtcOscCtrl, 1);
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::Irc12M), 12_000_000);
        assert_eq!(tree.frequency_at(ClockNode::ClkIn), EXT);
        assert_eq!(tree.frequency_at(ClockNode::WdtOsc), 500_000);
        assert_eq!(tree.frequency_at(ClockNode::Osc32K), 32_768);
        assert_eq!(tree.frequency_at(ClockNode::PllOut), PLL);

        let rf = RegisterFile::new().with(SysconReg::PdRunCfg, (1 << 3) | (1 << 20));
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::Irc12M), 0);
        assert_eq!(tree.frequency_at(ClockNode::WdtOsc), 0);
        assert_eq!(tree.frequency_at(ClockNode::Osc32K), 0);
    }

    #[test]
    fn test_main_clock_paths() {
        let rf = pll_main();
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::MainClk), PLL);
        assert_eq!(tree.frequency_at(ClockNode::CoreSysClk), PLL);
        assert_eq!(tree.frequency_at(ClockNode::BusClk), PLL);

        let rf = pll_main().with(SysconReg::MainClkSelB, 0).with(SysconReg::MainClkSelA, 1);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::MainClk), EXT);

        let rf = pll_main().with(SysconReg::MainClkSelB, 1).with(SysconReg::SysPllClkSel, 2);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::MainClk), 500_000);

        let rf = pll_main().with(SysconReg::MainClkSelB, 3);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::MainClk), 32_768);
    }

    #[test]
    fn test_dividers() {
        let rf = pll_main()
            .with(SysconReg::AhbClkDiv, 2)
            .with(SysconReg::SysTickClkDiv, 100)
            .with(SysconReg::AdcClkSel, 2)
            .with(SysconReg::AdcClkDiv, 4);
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::CoreSysClk), 50_000_000);
        assert_eq!(tree.frequency_at(ClockNode::SysTick), 1_000_000);
        assert_eq!(tree.frequency_at(ClockNode::AdcClk), 3_000_000);
    }

    #[test]
    fn test_zero_divider_absorbs() {
        let rf = pll_main().with(SysconReg::AhbClkDiv, 0);
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::CoreSysClk), 0);
        assert_eq!(tree.frequency_at(ClockNode::BusClk), 0);
        // other branches are not affected
        assert_eq!(tree.frequency_at(ClockNode::SysTick), PLL);

        let rf = pll_main()
            .with(SysconReg::AsyncClkDiv, 0)
            .with(SysconReg::FrgCtrl, 0xFF);
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::AsyncApbClk), 0);
        assert_eq!(tree.frequency_at(ClockNode::Frg), 0);

        for div in [SysconReg::SysTickClkDiv, SysconReg::AdcClkDiv, SysconReg::ClkOutDiv] {
            let rf = pll_main().with(div, 0);
            let tree = ClockTree::new(&rf, EXT, PLL);
            let node = match div {
                SysconReg::SysTickClkDiv => ClockNode::SysTick,
                SysconReg::AdcClkDiv => ClockNode::AdcClk,
                _ => ClockNode::ClockOut,
            };
            assert_eq!(tree.frequency_at(node), 0, "{:?}", div);
        }
    }

    #[test]
    fn test_unknown_selectors() {
        let rf = pll_main().with(SysconReg::MainClkSelB, 0).with(SysconReg::MainClkSelA, 3);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::MainClk), 0);

        let rf = pll_main().with(SysconReg::AdcClkSel, 5);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::AdcClk), 0);

        let rf = pll_main().with(SysconReg::SysPllClkSel, 7);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::PllIn), 0);

        // CLKOUTSELB 1 and 2 are reserved
        let rf = pll_main().with(SysconReg::ClkOutSelB, 1);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::ClockOut), 0);
    }

    #[test]
    fn test_clock_out() {
        let rf = pll_main().with(SysconReg::ClkOutSelA, 3).with(SysconReg::ClkOutDiv, 3);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::ClockOut), 4_000_000);

        let rf = pll_main().with(SysconReg::ClkOutSelB, 3);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::ClockOut), 32_768);
    }

    #[test]
    fn test_async_function_clocks() {
        let rf = pll_main()
            .with(SysconReg::AsyncApbClkSelB, 2)
            .with(SysconReg::AsyncClkDiv, 2)
            .with(SysconReg::FrgCtrl, (64 << 8) | 0xFF);
        let tree = ClockTree::new(&rf, EXT, PLL);
        for node in [ClockNode::Usart, ClockNode::Spi, ClockNode::I2c] {
            assert_eq!(tree.frequency_at(node), 50_000_000, "{:?}", node);
        }

        let rf = rf.with(SysconReg::AsyncClkDiv, 0);
        let tree = ClockTree::new(&rf, EXT, PLL);
        for node in [ClockNode::Usart, ClockNode::Spi, ClockNode::I2c] {
            assert_eq!(tree.frequency_at(node), 0, "{:?}", node);
        }
    }

    /// Counts reads of the PLL divider registers
    struct Counting {
        rf: RegisterFile,
        pll_reads: Cell<u32>,
    }

    impl Syscon for Counting {
        fn read(&self, reg: SysconReg) -> u32 {
            if matches!(reg, SysconReg::SysPllSsCtrl0 | SysconReg::SysPllSsCtrl1) {
                self.pll_reads.set(self.pll_reads.get() + 1);
            }
            self.rf.read(reg)
        }

        fn write(&mut self, reg: SysconReg, value: u32) {
            self.rf.write(reg, value);
        }
    }

    #[test]
    fn test_pll_read_back_on_demand() {
        let [ctrl, ndec, pdec, ss0, ss1] = synthesize(12_000_000, PLL, false, false)
            .unwrap()
            .regs
            .to_words();
        let rf = pll_main()
            .with(SysconReg::SysPllCtrl, ctrl)
            .with(SysconReg::SysPllNdec, ndec)
            .with(SysconReg::SysPllPdec, pdec)
            .with(SysconReg::SysPllSsCtrl0, ss0)
            .with(SysconReg::SysPllSsCtrl1, ss1);
        let bus = Counting { rf, pll_reads: Cell::new(0) };
        let tree = ClockTree::reading_pll(&bus, EXT);

        // nothing upstream of these goes through the PLL
        assert_eq!(tree.frequency_at(ClockNode::PllIn), 12_000_000);
        assert_eq!(tree.frequency_at(ClockNode::Irc12M), 12_000_000);
        assert_eq!(tree.frequency_at(ClockNode::ClkIn), EXT);
        assert_eq!(bus.pll_reads.get(), 0);

        assert_eq!(tree.frequency_at(ClockNode::PllOut), PLL);
        assert_eq!(tree.frequency_at(ClockNode::CoreSysClk), PLL);
        assert!(bus.pll_reads.get() > 0);
    }

    #[test]
    fn test_async_apb_and_frg() {
        let rf = pll_main()
            .with(SysconReg::AsyncApbClkSelB, 2)
            .with(SysconReg::AsyncClkDiv, 2);
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::AsyncApbClk), 50_000_000);
        // FRG stopped unless DIV is 0xFF
        assert_eq!(tree.frequency_at(ClockNode::Frg), 0);

        let rf = rf.with(SysconReg::FrgCtrl, (64 << 8) | 0xFF);
        let tree = ClockTree::new(&rf, EXT, PLL);
        assert_eq!(tree.frequency_at(ClockNode::Frg), 40_000_000);

        let rf = pll_main()
            .with(SysconReg::AsyncApbClkSelB, 3)
            .with(SysconReg::AsyncApbClkSelA, 1);
        assert_eq!(ClockTree::new(&rf, EXT, PLL).frequency_at(ClockNode::AsyncApbClk), 500_000);
    }
}
