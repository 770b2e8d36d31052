//! CGU registers
//!
//! Typed bit fields of the SYSPLL control words and of the few other
//! SYSCON / ASYNC_SYSCON registers the CGU decodes.

use core::marker::PhantomData;

/// Register marker types
macro_rules! gen_register_marker {
    ($(#[$meta:meta])* $r:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        pub struct $r {}
    }
}

gen_register_marker!(
    /// SYSPLLCTRL, filter coefficients and bypass / direct path control
    Ctrl
);
gen_register_marker!(
    /// SYSPLLNDEC, encoded pre-divider
    Ndec
);
gen_register_marker!(
    /// SYSPLLPDEC, encoded post-divider
    Pdec
);
gen_register_marker!(
    /// SYSPLLSSCTRL0, encoded multiplier
    Ssctrl0
);
gen_register_marker!(
    /// SYSPLLSSCTRL1, spread spectrum / fractional multiplier
    Ssctrl1
);
gen_register_marker!(
    /// SYSPLLSTAT
    Stat
);
gen_register_marker!(
    /// ASYNC_SYSCON FRGCTRL, fractional rate generator
    FrgCtrlReg
);
gen_register_marker!(
    /// FLASHCFG
    FlashCfg
);
gen_register_marker!(
    /// RTCOSCCTRL
    RtcOscCtrl
);
gen_register_marker!(
    /// ASYNCAPBCTRL
    AsyncApbCtrl
);


/// Single register word
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reg<R> {
    /// Register word
    pub w: u32,
    phantom: PhantomData<R>,
}

impl<R> Default for Reg<R> {
    #[inline]
    fn default() -> Self {
        Reg::from_word(0)
    }
}

/// Bit operations on 32bit words
impl<R> Reg<R> {
    /// Wraps a raw register word
    #[inline]
    pub const fn from_word(w: u32) -> Self {
        Reg { w, phantom: PhantomData }
    }

    #[inline]
    pub fn get<F>(&self) -> F
    where F: BitField<R> + From<u32>
    {
        F::from(
            (self.w >> F::offset()) & F::mask()
        )
    }

    #[inline]
    pub fn set<F>(mut self, f: F) -> Self
    where F: BitField<R> + Into<u32>
    {
        let fbits = (f.into() & F::mask()) << F::offset();
        let rbits = self.w & !(F::mask() << F::offset());
        self.w = rbits | fbits;
        self
    }
}



/// The five SYSPLL configuration words.
/// Defaults to all bits set to 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PllRegisters {
    pub ctrl: Reg<Ctrl>,
    pub ndec: Reg<Ndec>,
    pub pdec: Reg<Pdec>,
    pub ssctrl0: Reg<Ssctrl0>,
    pub ssctrl1: Reg<Ssctrl1>,
}

/// Type-indexed register access
pub trait RIdx<R> {
    fn r(&self) -> Reg<R>;
    fn update_r<F>(self, f: F) -> Self where F: FnOnce(Reg<R>) -> Reg<R>;
}

macro_rules! gen_register_index {
    ($r:ident, $f:tt) => {
        impl RIdx<$r> for PllRegisters {
            #[inline]
            fn r(&self) -> Reg<$r> { self.$f }
            #[inline]
            fn update_r<F>(mut self, f: F) -> Self where F: FnOnce(Reg<$r>) -> Reg<$r> {
                self.$f = f(self.$f);
                self
            }
        }
    }
}

gen_register_index!(Ctrl, ctrl);
gen_register_index!(Ndec, ndec);
gen_register_index!(Pdec, pdec);
gen_register_index!(Ssctrl0, ssctrl0);
gen_register_index!(Ssctrl1, ssctrl1);


impl PllRegisters {

    /// Register words in SYSPLLCTRL, NDEC, PDEC, SSCTRL0, SSCTRL1 order.
    #[inline]
    pub fn to_words(&self) -> [u32; 5] {
        [self.ctrl.w, self.ndec.w, self.pdec.w, self.ssctrl0.w, self.ssctrl1.w]
    }

    /// Register set from words in [`PllRegisters::to_words`] order.
    #[inline]
    pub fn from_words(words: [u32; 5]) -> Self {
        PllRegisters {
            ctrl: Reg::from_word(words[0]),
            ndec: Reg::from_word(words[1]),
            pdec: Reg::from_word(words[2]),
            ssctrl0: Reg::from_word(words[3]),
            ssctrl1: Reg::from_word(words[4]),
        }
    }

    /// Get register bitfield value
    #[inline]
    pub fn get<F,R>(&self) -> F
    where F: BitField<R> + From<u32>,
          Self: RIdx<R>
    {
        <Self as RIdx<R>>::r(self).get()
    }

    /// Update register bitfield
    #[inline]
    pub fn set<F,R>(self, f: F) -> Self
    where F: BitField<R> + Into<u32>,
          Self: RIdx<R>
    {
        <Self as RIdx<R>>::update_r(self, |r| r.set(f))
    }
}



/// Bit operations on 32bit words
pub trait BitField<R> {
    /// Number of bits in the bit field
    fn num_bits() -> u8;

    /// Offset from 0
    fn offset() -> u8;

    #[inline]
    fn mask() -> u32 {
        !(0xFFFFFFFFu32 << Self::num_bits())
    }
}

/// Generate BitField implementation
macro_rules! gen_bitfield_impl {
	($r:ty, $n:ident, $nb:tt, $off:tt) => {
        impl BitField<$r> for $n {
            #[inline] fn num_bits() -> u8 { $nb }
            #[inline] fn offset() -> u8 { $off }
        }
    }
}

/// Small bitfield-encoded numbers boilerplate
macro_rules! gen_bitfield_struct {
	($(#[$meta:meta])*, $r:ty, $n:ident, $v:ty, $nb:tt, $off:tt) => {
        $(#[$meta])*
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
        pub struct $n(pub $v);

        gen_bitfield_impl!($r, $n, $nb, $off);

        impl From<u32> for $n { #[inline] fn from(x: u32) -> Self { $n(x as $v) } }
        impl From<$n> for u32 { #[inline] fn from(x: $n) -> u32 { x.0 as u32 } }
	};
}

/// Single bit, two state fields
macro_rules! gen_bitfield_flag {
	($(#[$meta:meta])*, $r:ty, $n:ident, $off:tt,
	 $(#[$m0:meta])* $v0:ident, $(#[$m1:meta])* $v1:ident) => {
        $(#[$meta])*
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        pub enum $n {
            $(#[$m0])*
            $v0 = 0,
            $(#[$m1])*
            $v1 = 1,
        }

        gen_bitfield_impl!($r, $n, 1, $off);

        impl From<u32> for $n {
            #[inline]
            fn from(x: u32) -> Self { if x & 1 == 0 { $n::$v0 } else { $n::$v1 } }
        }
        impl From<$n> for u32 { #[inline] fn from(x: $n) -> u32 { x as u32 } }

        impl From<bool> for $n {
            #[inline]
            fn from(b: bool) -> Self { if b { $n::$v1 } else { $n::$v0 } }
        }
    };
}



gen_bitfield_struct!(
    /// Bandwidth select R value
    , Ctrl, Selr, u8, 4, 0
);

gen_bitfield_struct!(
    /// Bandwidth select I value
    , Ctrl, Seli, u8, 6, 4
);

gen_bitfield_struct!(
    /// Bandwidth select P value
    , Ctrl, Selp, u8, 5, 10
);

gen_bitfield_flag!(
    /// PLL bypass. When enabled the PLL input clock is passed
    /// straight to the PLL output.
    , Ctrl, Bypass, 15, Disabled, Enabled
);

gen_bitfield_flag!(
    /// Bypass of the divide-by-2 in the CCO feedback path.
    /// When disabled the effective multiplier is 2 * M.
    , Ctrl, BypassCcoDiv2, 16, Disabled, Enabled
);

gen_bitfield_flag!(
    /// Disables the upper CCO frequency limit, needed with spread spectrum
    , Ctrl, UpLimOff, 17, Disabled, Enabled
);

gen_bitfield_flag!(
    /// Loop filter source
    , Ctrl, BandSel, 18,
    /// Loop filter handled by the spread spectrum generator
    Ssc,
    /// SELP / SELI / SELR used
    Manual
);

gen_bitfield_flag!(
    /// Pre-divider bypass
    , Ctrl, DirectInput, 19, Disabled, Enabled
);

gen_bitfield_flag!(
    /// Post-divider bypass
    , Ctrl, DirectOutput, 20, Disabled, Enabled
);


gen_bitfield_struct!(
    /// Encoded pre-divider N
    , Ndec, NdecVal, u16, 10, 0
);

gen_bitfield_flag!(
    /// Latches NDEC into the divider
    , Ndec, Nreq, 10, Idle, Latch
);


gen_bitfield_struct!(
    /// Encoded post-divider P
    , Pdec, PdecVal, u8, 7, 0
);

gen_bitfield_flag!(
    /// Latches PDEC into the divider
    , Pdec, Preq, 7, Idle, Latch
);


gen_bitfield_struct!(
    /// Encoded multiplier M
    , Ssctrl0, MdecVal, u32, 17, 0
);

gen_bitfield_flag!(
    /// Latches MDEC into the divider
    , Ssctrl0, Mreq, 17, Idle, Latch
);

gen_bitfield_flag!(
    /// Multiplier source
    , Ssctrl0, SelExt, 18,
    /// Multiplier from the spread spectrum generator (MD)
    Ssc,
    /// Multiplier from MDEC
    Mdec
);


gen_bitfield_struct!(
    /// Fractional part of the spread spectrum multiplier, 2^-11 units
    , Ssctrl1, MdFract, u16, 11, 0
);

gen_bitfield_struct!(
    /// Integer part of the spread spectrum multiplier
    , Ssctrl1, MdInt, u8, 8, 11
);

gen_bitfield_flag!(
    /// Latches MD into the spread spectrum generator
    , Ssctrl1, Mdreq, 19, Idle, Latch
);

gen_bitfield_struct!(
    /// Modulation frequency control, 0..=7
    , Ssctrl1, ModFreq, u8, 3, 20
);

gen_bitfield_struct!(
    /// Modulation depth control, 0..=7
    , Ssctrl1, ModDepth, u8, 3, 23
);

gen_bitfield_struct!(
    /// Modulation waveform compensation, 0..=3
    , Ssctrl1, ModComp, u8, 2, 26
);

gen_bitfield_flag!(
    /// Spread spectrum generator power down.
    /// Powered down means the PLL runs from MDEC (integer mode).
    , Ssctrl1, SscPower, 28, PoweredUp, PoweredDown
);

gen_bitfield_flag!(
    /// Random dither of the modulation frequency
    , Ssctrl1, Dither, 29, Disabled, Enabled
);


gen_bitfield_flag!(
    /// PLL lock status
    , Stat, Lock, 0, Unlocked, Locked
);


gen_bitfield_struct!(
    /// FRG divider, has to be 0xFF for the FRG to run
    , FrgCtrlReg, FrgDiv, u8, 8, 0
);

gen_bitfield_struct!(
    /// FRG multiplier, output = input * 256 / (256 + MULT)
    , FrgCtrlReg, FrgMult, u8, 8, 8
);


gen_bitfield_struct!(
    /// Flash access time in system clocks, minus one
    , FlashCfg, FlashTim, u8, 4, 12
);


gen_bitfield_flag!(
    /// RTC 32 kHz oscillator enable
    , RtcOscCtrl, RtcOscEnable, 0, Disabled, Enabled
);


gen_bitfield_flag!(
    /// Async APB bridge clock enable
    , AsyncApbCtrl, AsyncApbEnable, 0, Disabled, Enabled
);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_get() {
        let rs = PllRegisters::default()
            .set(Selp(13))
            .set(Seli(28))
            .set(DirectOutput::Enabled)
            .set(BypassCcoDiv2::Enabled);

        assert_eq!(rs.ctrl.w, (13 << 10) | (28 << 4) | (1 << 20) | (1 << 16));
        assert_eq!(rs.get::<Selp, _>(), Selp(13));
        assert_eq!(rs.get::<Seli, _>(), Seli(28));
        assert_eq!(rs.get::<DirectInput, _>(), DirectInput::Disabled);
        assert_eq!(rs.get::<DirectOutput, _>(), DirectOutput::Enabled);
    }

    #[test]
    fn test_set_masks_field() {
        // overwide values are truncated to the field, neighbours untouched
        let rs = PllRegisters::default()
            .set(Mreq::Latch)
            .set(MdecVal(0xFFFF_FFFF));
        assert_eq!(rs.ssctrl0.w, 0x1FFFF | (1 << 17));

        let rs = rs.set(MdecVal(0));
        assert_eq!(rs.ssctrl0.w, 1 << 17);
    }

    #[test]
    fn test_ssctrl1_layout() {
        let rs = PllRegisters::default()
            .set(MdInt(33))
            .set(MdFract(682))
            .set(ModFreq(4))
            .set(ModDepth(4))
            .set(ModComp(2))
            .set(Dither::Enabled);
        assert_eq!(rs.ssctrl1.w, 682 | (33 << 11) | (4 << 20) | (4 << 23) | (2 << 26) | (1 << 29));
        assert_eq!(rs.get::<SscPower, _>(), SscPower::PoweredUp);
    }

    #[test]
    fn test_words_roundtrip() {
        let words = [0x0010_d1c0, 0x001, 0x07f, 0x4_7f55, 0x1000_0000];
        assert_eq!(PllRegisters::from_words(words).to_words(), words);
    }

    #[test]
    fn test_single_register() {
        let frg = Reg::<FrgCtrlReg>::from_word(0x0000_40FF);
        assert_eq!(frg.get::<FrgDiv>(), FrgDiv(0xFF));
        assert_eq!(frg.get::<FrgMult>(), FrgMult(0x40));
        assert_eq!(Reg::<Stat>::from_word(1).get::<Lock>(), Lock::Locked);
        assert_eq!(Lock::from(false), Lock::Unlocked);
    }
}
