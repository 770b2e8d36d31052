//! Clock generation unit
//!
//! [`Cgu`] owns the SYSCON register access together with the state the
//! PLL helpers keep between calls: the synthesis cache and the last known
//! PLL output rate.

use embedded_hal::blocking::delay::DelayUs;

use crate::bandwidth::select_filter;
use crate::cache::SynthesisCache;
use crate::codec::Divider;
use crate::config::{CguConfig, PllConfig, SetupFlags};
use crate::constants::*;
use crate::errors::{ClockError, PllError};
use crate::pll::PllSetup;
use crate::power::PowerControl;
use crate::register::*;
use crate::sequencer::{poll_lock, Sequencer};
use crate::syscon::{Syscon, SysconReg};
use crate::tree::{ClockNode, ClockTree};

/// Clock source to selector connections
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockAttach {
    Irc12MToMainClk,
    ClkInToMainClk,
    WdtOscToMainClk,
    PllInToMainClk,
    PllOutToMainClk,
    Osc32KToMainClk,

    Irc12MToSysPll,
    ClkInToSysPll,
    WdtOscToSysPll,
    Osc32KToSysPll,

    MainClkToAsyncApb,
    ClkInToAsyncApb,
    PllOutToAsyncApb,
    Irc12MToAsyncApb,
    WdtOscToAsyncApb,

    MainClkToClkOut,
    ClkInToClkOut,
    WdtOscToClkOut,
    Irc12MToClkOut,
    Osc32KToClkOut,

    MainClkToAdc,
    PllOutToAdc,
    Irc12MToAdc,
}

impl ClockAttach {
    /// Every connection, in declaration order
    pub const ALL: [ClockAttach; 23] = {
        use ClockAttach::*;
        [
            Irc12MToMainClk,
            ClkInToMainClk,
            WdtOscToMainClk,
            PllInToMainClk,
            PllOutToMainClk,
            Osc32KToMainClk,
            Irc12MToSysPll,
            ClkInToSysPll,
            WdtOscToSysPll,
            Osc32KToSysPll,
            MainClkToAsyncApb,
            ClkInToAsyncApb,
            PllOutToAsyncApb,
            Irc12MToAsyncApb,
            WdtOscToAsyncApb,
            MainClkToClkOut,
            ClkInToClkOut,
            WdtOscToClkOut,
            Irc12MToClkOut,
            Osc32KToClkOut,
            MainClkToAdc,
            PllOutToAdc,
            Irc12MToAdc,
        ]
    };

    /// Last selector in front of the clock
    fn output_selector(self) -> SysconReg {
        use ClockAttach::*;
        match self {
            Irc12MToMainClk | ClkInToMainClk | WdtOscToMainClk | PllInToMainClk
            | PllOutToMainClk | Osc32KToMainClk => SysconReg::MainClkSelB,
            Irc12MToSysPll | ClkInToSysPll | WdtOscToSysPll | Osc32KToSysPll => {
                SysconReg::SysPllClkSel
            }
            MainClkToAsyncApb | ClkInToAsyncApb | PllOutToAsyncApb | Irc12MToAsyncApb
            | WdtOscToAsyncApb => SysconReg::AsyncApbClkSelB,
            MainClkToClkOut | ClkInToClkOut | WdtOscToClkOut | Irc12MToClkOut
            | Osc32KToClkOut => SysconReg::ClkOutSelB,
            MainClkToAdc | PllOutToAdc | Irc12MToAdc => SysconReg::AdcClkSel,
        }
    }

    /// Selector writes, in order
    fn selections(self) -> &'static [(SysconReg, u32)] {
        use ClockAttach::*;
        use SysconReg::*;
        match self {
            Irc12MToMainClk => &[(MainClkSelA, 0), (MainClkSelB, 0)],
            ClkInToMainClk => &[(MainClkSelA, 1), (MainClkSelB, 0)],
            WdtOscToMainClk => &[(MainClkSelA, 2), (MainClkSelB, 0)],
            PllInToMainClk => &[(MainClkSelB, 1)],
            PllOutToMainClk => &[(MainClkSelB, 2)],
            Osc32KToMainClk => &[(MainClkSelB, 3)],

            Irc12MToSysPll => &[(SysPllClkSel, 0)],
            ClkInToSysPll => &[(SysPllClkSel, 1)],
            WdtOscToSysPll => &[(SysPllClkSel, 2)],
            Osc32KToSysPll => &[(SysPllClkSel, 3)],

            MainClkToAsyncApb => &[(AsyncApbClkSelB, 0)],
            ClkInToAsyncApb => &[(AsyncApbClkSelB, 1)],
            PllOutToAsyncApb => &[(AsyncApbClkSelB, 2)],
            Irc12MToAsyncApb => &[(AsyncApbClkSelA, 0), (AsyncApbClkSelB, 3)],
            WdtOscToAsyncApb => &[(AsyncApbClkSelA, 1), (AsyncApbClkSelB, 3)],

            MainClkToClkOut => &[(ClkOutSelA, 0), (ClkOutSelB, 0)],
            ClkInToClkOut => &[(ClkOutSelA, 1), (ClkOutSelB, 0)],
            WdtOscToClkOut => &[(ClkOutSelA, 2), (ClkOutSelB, 0)],
            Irc12MToClkOut => &[(ClkOutSelA, 3), (ClkOutSelB, 0)],
            Osc32KToClkOut => &[(ClkOutSelB, 3)],

            MainClkToAdc => &[(AdcClkSel, 0)],
            PllOutToAdc => &[(AdcClkSel, 1)],
            Irc12MToAdc => &[(AdcClkSel, 2)],
        }
    }
}

/// Integer clock dividers
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockDivider {
    SysTick,
    Ahb,
    ClkOut,
    Adc,
    AsyncApb,
}

impl ClockDivider {
    fn reg(self) -> SysconReg {
        match self {
            ClockDivider::SysTick => SysconReg::SysTickClkDiv,
            ClockDivider::Ahb => SysconReg::AhbClkDiv,
            ClockDivider::ClkOut => SysconReg::ClkOutDiv,
            ClockDivider::Adc => SysconReg::AdcClkDiv,
            ClockDivider::AsyncApb => SysconReg::AsyncClkDiv,
        }
    }
}

/// Flash wait states for a system clock rate
pub fn flash_access_cycles(freq: u32) -> u8 {
    match freq {
        0..=12_000_000 => 1,
        12_000_001..=24_000_000 => 2,
        24_000_001..=48_000_000 => 3,
        48_000_001..=72_000_000 => 4,
        72_000_001..=84_000_000 => 5,
        84_000_001..=100_000_000 => 6,
        _ => 7,
    }
}

/// PLL setup together with its output rate and what to do when applying it
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PreparedPll {
    pub setup: PllSetup,
    /// Output rate of `setup`, Hz
    pub rate: u32,
    pub flags: SetupFlags,
}

/// Clock generation unit, `N` is the synthesis cache capacity
pub struct Cgu<S, const N: usize = 4> {
    syscon: S,
    config: CguConfig,
    cache: SynthesisCache<N>,
    /// Last known PLL output, 0 when unknown
    pll_freq: u32,
}

impl<S, const N: usize> Cgu<S, N>
where
    S: Syscon,
{
    pub fn new(syscon: S, config: CguConfig) -> Self {
        Cgu {
            syscon,
            config,
            cache: SynthesisCache::new(),
            pll_freq: 0,
        }
    }

    /// Releases the register access
    pub fn free(self) -> S {
        self.syscon
    }

    pub fn syscon(&self) -> &S {
        &self.syscon
    }

    pub fn config(&self) -> &CguConfig {
        &self.config
    }

    pub fn cache(&self) -> &SynthesisCache<N> {
        &self.cache
    }

    /// PLL setup for `output_hz`, through the synthesis cache
    pub fn synthesize(
        &mut self,
        input_hz: u32,
        output_hz: u32,
        use_feedback_div2: bool,
        use_ss: bool,
    ) -> Result<PllSetup, PllError> {
        self.cache.get_or_compute(input_hz, output_hz, use_feedback_div2, use_ss)
    }

    /// PLL setup for a setup request.
    ///
    /// Fractional mode (with the request's modulation settings) unless
    /// integer mode is forced.
    pub fn setup_pll_data(&mut self, pll: &PllConfig) -> Result<PllSetup, PllError> {
        let input_hz = self.request_input_hz(pll);
        self.setup_for_request(pll, input_hz)
    }

    /// PLL setup for a setup request, with its output rate and the
    /// request's apply flags. See [`Cgu::set_pll_freq`].
    pub fn prepare_pll(&mut self, pll: &PllConfig) -> Result<PreparedPll, PllError> {
        let input_hz = self.request_input_hz(pll);
        let setup = self.setup_for_request(pll, input_hz)?;
        Ok(PreparedPll {
            setup,
            rate: setup.output_hz(input_hz),
            flags: pll.flags,
        })
    }

    fn request_input_hz(&self, pll: &PllConfig) -> u32 {
        match pll.input_rate {
            Some(hz) => hz,
            None => self.frequency(ClockNode::PllIn),
        }
    }

    fn setup_for_request(&mut self, pll: &PllConfig, input_hz: u32) -> Result<PllSetup, PllError> {
        let use_ss = !pll.force_no_fract;
        let setup = self.synthesize(input_hz, pll.desired_rate, pll.use_feedback_div2, use_ss)?;
        Ok(if use_ss { setup.with_modulation(&pll.ss) } else { setup })
    }

    /// Writes `setup` to the PLL, then powers up / waits for lock /
    /// adjusts the voltage as requested.
    ///
    /// Main clock and the other PLL users are not switched, do that before
    /// and after as needed.
    pub fn setup_system_pll_prec<P, D>(
        &mut self,
        power: &mut P,
        delay: &mut D,
        setup: &PllSetup,
        flags: SetupFlags,
    ) -> Result<(), PllError>
    where
        P: PowerControl,
        D: DelayUs<u16>,
    {
        let input_hz = self.frequency(ClockNode::PllIn);
        let timeout = self.config.lock_timeout;

        let res = Sequencer::new(&mut self.syscon, power, delay)
            .apply(setup, input_hz, flags, timeout);
        self.track_applied_rate(res)
    }

    /// Writes a prepared setup to the PLL, same sequence as
    /// [`Cgu::setup_system_pll_prec`] with the setup's own flags.
    ///
    /// The prepared rate becomes the stored PLL rate, the registers are not
    /// decoded again.
    pub fn set_pll_freq<P, D>(
        &mut self,
        power: &mut P,
        delay: &mut D,
        pll: &PreparedPll,
    ) -> Result<(), PllError>
    where
        P: PowerControl,
        D: DelayUs<u16>,
    {
        let timeout = self.config.lock_timeout;

        let res = Sequencer::new(&mut self.syscon, power, delay)
            .apply_at_rate(&pll.setup, pll.rate, pll.flags, timeout);
        self.track_applied_rate(res)
    }

    /// Synthesizes and applies a setup request in one go, returns the new
    /// PLL output rate.
    pub fn setup_pll<P, D>(
        &mut self,
        power: &mut P,
        delay: &mut D,
        pll: &PllConfig,
    ) -> Result<u32, PllError>
    where
        P: PowerControl,
        D: DelayUs<u16>,
    {
        let prepared = self.prepare_pll(pll)?;
        self.set_pll_freq(power, delay, &prepared)?;
        Ok(prepared.rate)
    }

    fn track_applied_rate(&mut self, res: Result<u32, PllError>) -> Result<(), PllError> {
        match res {
            Ok(rate) => {
                self.pll_freq = rate;
                Ok(())
            }
            Err(PllError::LockTimeout) => {
                // new setup is in the registers, recompute the rate on demand
                self.pll_freq = 0;
                Err(PllError::LockTimeout)
            }
            Err(e) => Err(e),
        }
    }

    /// Integer multiplier setup, pre-divider 1.
    ///
    /// The multiplier and post-divider are doubled until the CCO is in range.
    /// Registers only: power, lock and voltage are left to the caller.
    pub fn setup_system_pll_mult(
        &mut self,
        multiply_by: u32,
        input_hz: u32,
    ) -> Result<(), PllError> {
        if multiply_by == 0 || input_hz == 0 {
            return Err(PllError::OutsideIntLimit);
        }

        let mut mult = multiply_by;
        let mut pdec = 1;
        while (input_hz as u64 * mult as u64) < CCO_FREQ_MIN as u64 {
            mult <<= 1;
            pdec <<= 1;
        }

        let mdec = Divider::Mult.encode(mult).ok_or(PllError::OutsideIntLimit)?;
        let pdec = Divider::Post.encode(pdec / 2).ok_or(PllError::OutsideIntLimit)?;
        let ndec = Divider::Pre.encode(1).ok_or(PllError::OutsideIntLimit)?;
        let filter = select_filter(mult, true);

        let regs = PllRegisters::default()
            .set(Selr(filter.selr as u8))
            .set(Seli(filter.seli as u8))
            .set(Selp(filter.selp as u8))
            .set(BypassCcoDiv2::Enabled)
            .set(BandSel::Manual)
            .set(DirectOutput::from(multiply_by == mult))
            .set(NdecVal(ndec as u16))
            .set(Nreq::Latch)
            .set(PdecVal(pdec as u8))
            .set(Preq::Latch)
            .set(MdecVal(mdec))
            .set(Mreq::Latch)
            .set(SelExt::Mdec)
            .set(SscPower::PoweredDown);

        self.syscon.write(SysconReg::SysPllCtrl, regs.ctrl.w);
        self.syscon.write(SysconReg::SysPllPdec, regs.pdec.w);
        self.syscon.write(SysconReg::SysPllNdec, regs.ndec.w);
        self.syscon.write(SysconReg::SysPllSsCtrl0, regs.ssctrl0.w);
        self.syscon.write(SysconReg::SysPllSsCtrl1, regs.ssctrl1.w);

        debug!("pll: x{} from {} Hz", mult, input_hz);
        self.pll_freq = 0;
        Ok(())
    }

    /// Overrides the stored PLL output rate
    pub fn set_stored_pll_rate(&mut self, rate: u32) {
        self.pll_freq = rate;
    }

    /// PLL output rate.
    /// Read back from the PLL registers when `recompute` is set or the rate is not known.
    pub fn pll_out_hz(&mut self, recompute: bool) -> u32 {
        if recompute || self.pll_freq == 0 {
            self.pll_freq = self.read_pll_out_hz();
        }
        self.pll_freq
    }

    fn read_pll_out_hz(&self) -> u32 {
        ClockTree::reading_pll(&self.syscon, self.config.ext_clk_hz)
            .frequency_at(ClockNode::PllOut)
    }

    /// PLL lock status
    pub fn is_pll_locked(&self) -> bool {
        poll_lock(&self.syscon).is_ok()
    }

    /// Clock tree using the stored PLL rate, or reading it back when unknown
    fn tree(&self) -> ClockTree<'_, S> {
        match self.pll_freq {
            0 => ClockTree::reading_pll(&self.syscon, self.config.ext_clk_hz),
            hz => ClockTree::new(&self.syscon, self.config.ext_clk_hz, hz),
        }
    }

    /// Current frequency of a clock node, Hz
    pub fn frequency(&self, node: ClockNode) -> u32 {
        self.tree().frequency_at(node)
    }

    /// Connects a clock source to a clock selector
    pub fn attach_clk(&mut self, attach: ClockAttach) {
        for &(reg, sel) in attach.selections() {
            if matches!(reg, SysconReg::AsyncApbClkSelA | SysconReg::AsyncApbClkSelB) {
                let ctrl = Reg::<AsyncApbCtrl>::default().set(AsyncApbEnable::Enabled);
                self.syscon.write(SysconReg::AsyncApbCtrl, ctrl.w);
            }
            self.syscon.write(reg, sel);
        }
        trace!("attach {:?}", attach);
    }

    /// Connection currently selected in front of the clock `attach` drives,
    /// `None` when the selectors hold an undefined combination.
    pub fn clock_attach_id(&self, attach: ClockAttach) -> Option<ClockAttach> {
        let selector = attach.output_selector();
        ClockAttach::ALL
            .into_iter()
            .filter(|a| a.output_selector() == selector)
            .find(|a| {
                a.selections()
                    .iter()
                    .all(|&(reg, sel)| self.syscon.field(reg) == sel)
            })
    }

    /// Sets a clock divider, 0 stops the clock
    pub fn set_clk_div(&mut self, div: ClockDivider, value: u32) -> Result<(), ClockError> {
        if value > 0xFF {
            return Err(ClockError::bad_config("clock divider above 255"));
        }
        self.syscon.write(div.reg(), value);
        Ok(())
    }

    /// Sets the fractional rate generator output from the async APB clock
    pub fn set_frg_clock(&mut self, freq: u32) -> Result<(), ClockError> {
        let input = self.frequency(ClockNode::AsyncApbClk);
        if freq == 0 || freq > input {
            return Err(ClockError::bad_config("FRG rate not reachable from async APB clock"));
        }

        let mult = (input - freq) as u64 * 256 / freq as u64;
        let mult = u8::try_from(mult)
            .map_err(|_| ClockError::bad_config("FRG rate below half the async APB clock"))?;

        let ctrl = Reg::<FrgCtrlReg>::default().set(FrgDiv(0xFF)).set(FrgMult(mult));
        self.syscon.write(SysconReg::FrgCtrl, ctrl.w);
        Ok(())
    }

    /// Sets the flash wait states for a system clock rate
    pub fn set_flash_access_cycles_for_freq(&mut self, freq: u32) {
        let cycles = flash_access_cycles(freq);
        self.syscon.modify(SysconReg::FlashCfg, |w| {
            Reg::<FlashCfg>::from_word(w).set(FlashTim(cycles - 1)).w
        });
    }
}
