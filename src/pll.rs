//! System PLL parameter synthesis
//!
//! ```text
//!            ┌─────────┐    ┌──────────────────┐    ┌──────────┐
//!  in ──────▶│ N (pre) │───▶│ PFD / CCO        │─┬─▶│ P (post) │──▶ out
//!     │      └─────────┘    │ 75..=150 MHz     │ │  └──────────┘ │
//!     │       DIRECTI       └──────────────────┘ │    DIRECTO    │
//!     │                        ▲                 │               │
//!     │                        └── M (× 2) ◀─────┘               │
//!     └──────────────────────────── BYPASS ──────────────────────┘
//! ```
//!
//! out = in / N * M / (2 * P), with N, P bypassable and M optionally
//! fractional (spread spectrum mode).

use crate::bandwidth::{select_filter, LoopFilter};
use crate::codec::{or_default_divider, Divider};
use crate::config::SpreadSpectrum;
use crate::constants::*;
use crate::errors::PllError;
use crate::register::*;
use crate::syscon::{Syscon, SysconReg};

/// Feedback multiplier as programmed
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Multiplier {
    /// MDEC multiplier, including the feedback divide-by-2 when it is used
    Integer(u32),
    /// Spread spectrum MD value, `int + fract / 2048`
    Fractional {
        /// Integer part
        int: u32,
        /// Fraction, 11 bits
        fract: u32,
    },
}

/// SYSPLL configuration: the five PLL control words.
///
/// Produced by [`synthesize`] or read back from the hardware with
/// [`PllSetup::read`]. Plain data, can be stored and applied again later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PllSetup {
    /// Register values
    pub regs: PllRegisters,
}

impl PllSetup {
    /// Setup from raw register values
    pub fn from_registers(regs: PllRegisters) -> Self {
        PllSetup { regs }
    }

    /// Current PLL configuration of the hardware
    pub fn read<S: Syscon>(syscon: &S) -> Self {
        PllSetup::from_registers(PllRegisters::from_words([
            syscon.read(SysconReg::SysPllCtrl),
            syscon.read(SysconReg::SysPllNdec),
            syscon.read(SysconReg::SysPllPdec),
            syscon.read(SysconReg::SysPllSsCtrl0),
            syscon.read(SysconReg::SysPllSsCtrl1),
        ]))
    }

    /// PLL bypassed, output = input
    pub fn bypass(&self) -> bool {
        self.regs.get::<Bypass, _>() == Bypass::Enabled
    }

    /// Pre-divider bypassed
    pub fn direct_input(&self) -> bool {
        self.regs.get::<DirectInput, _>() == DirectInput::Enabled
    }

    /// Post-divider bypassed
    pub fn direct_output(&self) -> bool {
        self.regs.get::<DirectOutput, _>() == DirectOutput::Enabled
    }

    /// Feedback divide-by-2 in use
    pub fn feedback_div2(&self) -> bool {
        self.regs.get::<BypassCcoDiv2, _>() == BypassCcoDiv2::Disabled
    }

    /// Fractional multiplier from the spread spectrum generator in use
    pub fn spread_spectrum(&self) -> bool {
        self.regs.get::<SscPower, _>() == SscPower::PoweredUp
    }

    /// Manual loop filter coefficients
    pub fn filter(&self) -> LoopFilter {
        LoopFilter {
            selp: self.regs.get::<Selp, _>().0 as u32,
            seli: self.regs.get::<Seli, _>().0 as u32,
            selr: self.regs.get::<Selr, _>().0 as u32,
        }
    }

    /// Effective pre-divider N
    pub fn pre_divider(&self) -> u32 {
        if self.direct_input() {
            1
        } else {
            let ndec: NdecVal = self.regs.get();
            or_default_divider(Divider::Pre.decode(ndec.0 as u32))
        }
    }

    /// Effective post-divider, 2 * P
    pub fn post_divider(&self) -> u32 {
        if self.direct_output() {
            1
        } else {
            let pdec: PdecVal = self.regs.get();
            2 * or_default_divider(Divider::Post.decode(pdec.0 as u32))
        }
    }

    /// Feedback multiplier
    pub fn multiplier(&self) -> Multiplier {
        if self.spread_spectrum() {
            let int: MdInt = self.regs.get();
            let fract: MdFract = self.regs.get();
            Multiplier::Fractional {
                int: int.0 as u32,
                fract: fract.0 as u32,
            }
        } else {
            let mdec: MdecVal = self.regs.get();
            let fb2 = self.feedback_div2();
            let m = Divider::Mult.decode(mdec.0).map(|m| if fb2 { m << 1 } else { m });
            Multiplier::Integer(or_default_divider(m))
        }
    }

    /// CCO frequency for the given PLL input frequency
    pub fn cco_hz(&self, input_hz: u32) -> u64 {
        let in_div = input_hz as u64 / self.pre_divider() as u64;
        match self.multiplier() {
            Multiplier::Integer(m) => in_div * m as u64,
            Multiplier::Fractional { int, fract } => {
                let fb = if self.feedback_div2() { 2 } else { 1 };
                fb * (in_div * int as u64 + ((in_div * fract as u64) >> MD_FRACT_BITS))
            }
        }
    }

    /// PLL output frequency for the given PLL input frequency
    pub fn output_hz(&self, input_hz: u32) -> u32 {
        if self.bypass() {
            return input_hz;
        }
        (self.cco_hz(input_hz) / self.post_divider() as u64) as u32
    }

    /// Checks that every divider the hardware will use has a valid code.
    /// A bypassed PLL uses none of them.
    pub fn validate(&self) -> Result<(), PllError> {
        if self.bypass() {
            return Ok(());
        }
        let decodes = |div: Divider, code: u32| matches!(div.decode(code), Some(raw) if raw != 0);

        let ndec: NdecVal = self.regs.get();
        let pdec: PdecVal = self.regs.get();
        let mdec: MdecVal = self.regs.get();

        let n_ok = self.direct_input() || decodes(Divider::Pre, ndec.0 as u32);
        let p_ok = self.direct_output() || decodes(Divider::Post, pdec.0 as u32);
        let m_ok = self.spread_spectrum() || decodes(Divider::Mult, mdec.0);

        if n_ok && p_ok && m_ok {
            Ok(())
        } else {
            Err(PllError::OutsideIntLimit)
        }
    }

    /// Adds spread spectrum modulation settings.
    /// Only meaningful on a fractional mode setup.
    pub fn with_modulation(self, ss: &SpreadSpectrum) -> Self {
        PllSetup::from_registers(
            self.regs
                .set(ss.mod_freq)
                .set(ss.mod_depth)
                .set(ss.mod_comp)
                .set(Dither::from(ss.dither)),
        )
    }
}

/// Greatest common divisor
fn gcd(mut m: u64, mut n: u64) -> u64 {
    while n != 0 {
        let tmp = n;
        n = m % n;
        m = tmp;
    }
    m
}

/// Smallest post-divider bringing the CCO into range.
/// Returns (raw post-divider, 0 = bypassed; CCO frequency).
fn find_post_divider(output_hz: u32) -> Result<(u32, u64), PllError> {
    let mut post_div = 0;
    let mut cco_hz = output_hz as u64;
    while cco_hz < CCO_FREQ_MIN as u64 {
        post_div += 1;
        if post_div > PVALMAX {
            return Err(PllError::OutsideIntLimit);
        }
        cco_hz = output_hz as u64 * (post_div as u64 * 2);
    }
    Ok((post_div, cco_hz))
}

/// Pre-divider giving a PFD frequency that is a common base of the
/// (feedback scaled) input and the CCO.
fn common_base_pre_divider(cco_hz: u64, scaled_input_hz: u64) -> Option<u32> {
    let base = gcd(cco_hz, scaled_input_hz);
    if base <= GCD_MIN_BASE_FREQ as u64 {
        return None;
    }
    let n = scaled_input_hz / base;
    if n != 0 && n < PLL_MAX_N_DIV as u64 {
        Some(n as u32)
    } else {
        None
    }
}

/// Computes the PLL setup producing `output_hz` from `input_hz`.
///
/// `use_feedback_div2` keeps the divide-by-2 in the CCO feedback path,
/// `use_ss` selects the fractional (spread spectrum) multiplier.
/// Only the synthesised setup is returned, nothing is written to hardware.
pub fn synthesize(
    input_hz: u32,
    output_hz: u32,
    use_feedback_div2: bool,
    use_ss: bool,
) -> Result<PllSetup, PllError> {
    if output_hz > OUT_FREQ_MAX {
        return Err(PllError::OutputTooHigh);
    }
    if output_hz < OUT_FREQ_MIN {
        return Err(PllError::OutputTooLow);
    }

    let fb_factor: u64 = if use_feedback_div2 { 2 } else { 1 };

    let mut pre_div = 1;
    if use_ss {
        if input_hz < IN_FREQ_SS_MIN {
            return Err(PllError::InputTooLow);
        }
        // keep the PFD in the middle of the 2..4 MHz spread spectrum window
        pre_div = input_hz / ((IN_FREQ_SS_MIN + IN_FREQ_SS_MAX) / 2);
        if pre_div > NVALMAX {
            return Err(PllError::InputTooHigh);
        }
    } else if input_hz < IN_FREQ_MIN {
        return Err(PllError::InputTooLow);
    }

    let (post_div, cco_hz) = find_post_divider(output_hz)?;

    if !use_ss && input_hz > IN_FREQ_MIN && cco_hz >= input_hz as u64 {
        if let Some(n) = common_base_pre_divider(cco_hz, fb_factor * input_hz as u64) {
            pre_div = n;
        }
    }
    // inputs between 2 and 3 MHz need no division in spread spectrum mode
    let pre_div = pre_div.max(1);

    let n_div_out = input_hz as u64 / pre_div as u64;
    let mut mult = cco_hz / n_div_out / fb_factor;

    let mut regs = PllRegisters::default()
        .set(Bypass::Disabled)
        .set(BypassCcoDiv2::from(!use_feedback_div2))
        .set(DirectInput::from(pre_div == 1))
        .set(DirectOutput::from(post_div == 0));

    if !use_ss {
        // rounding: would M + 1 land closer to the CCO target?
        if n_div_out * (fb_factor * mult * 2 + 1) < cco_hz * 2 {
            mult += 1;
        }
        let mdec = u32::try_from(mult)
            .ok()
            .filter(|&m| m != 0)
            .and_then(|m| Divider::Mult.encode(m))
            .ok_or(PllError::OutsideIntLimit)?;

        let filter = select_filter(mult as u32, !use_feedback_div2);
        regs = regs
            .set(Selr(filter.selr as u8))
            .set(Seli(filter.seli as u8))
            .set(Selp(filter.selp as u8))
            .set(UpLimOff::Disabled)
            .set(BandSel::Manual)
            .set(MdecVal(mdec))
            .set(SelExt::Mdec)
            .set(SscPower::PoweredDown);
    } else {
        if mult == 0 || mult > 0xFF {
            return Err(PllError::OutsideIntLimit);
        }
        // fine tune upwards with the fraction:
        // CCO = fb * (MD_INT + MD_FRACT / 2^11) * in / N
        let step = fb_factor * n_div_out;
        let fract = ((cco_hz % step) << MD_FRACT_BITS) / step;

        regs = regs
            .set(UpLimOff::Enabled)
            .set(BandSel::Ssc)
            .set(MdInt(mult as u8))
            .set(MdFract(fract as u16))
            .set(SscPower::PoweredUp);
    }

    let ndec = Divider::Pre.encode(pre_div).ok_or(PllError::InputTooHigh)?;
    let pdec = Divider::Post.encode(post_div).ok_or(PllError::OutsideIntLimit)?;
    let regs = regs.set(NdecVal(ndec as u16)).set(PdecVal(pdec as u8));

    debug!(
        "pll: in {} out {} -> N {} M {} P {} ss {}",
        input_hz, output_hz, pre_div, mult as u32, post_div, use_ss
    );

    Ok(PllSetup::from_registers(regs))
}
