//! PLL divider codes
//!
//! The SYSPLL pre-divider (N), post-divider (P) and multiplier (M) are not
//! programmed as plain integers. The hardware expects the state of a linear
//! feedback shift register after a number of steps that depends on the value,
//! three small values use fixed codes instead.
//!
//! ```text
//!  family  bits  max    seed     tap bits -> top
//!  N       10    256    0x080    0,2,3,4  -> 7
//!  P        7     32    0x10     0,2      -> 4
//!  M       17  32768    0x4000   0,1      -> 14
//! ```

use crate::constants::*;

/// One of the three SYSPLL divider families
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Divider {
    /// Pre-divider N, 1..=256, NDEC field (10 bits)
    Pre,
    /// Post-divider P, 1..=32, applied as 2 * P, PDEC field (7 bits)
    Post,
    /// Feedback multiplier M, 1..=32768, MDEC field (17 bits)
    Mult,
}

impl Divider {
    /// Largest raw value of the family
    pub const fn max(self) -> u32 {
        match self {
            Divider::Pre => NVALMAX,
            Divider::Post => PVALMAX,
            Divider::Mult => MVALMAX,
        }
    }

    /// Mask of the encoded field
    pub const fn mask(self) -> u32 {
        match self {
            Divider::Pre => 0x3FF,
            Divider::Post => 0x7F,
            Divider::Mult => 0x1FFFF,
        }
    }

    /// Hand-assigned codes of raw 0, 1 and 2
    const fn fixed_codes(self) -> [u32; 3] {
        match self {
            Divider::Pre => [0x3FF, 0x302, 0x202],
            Divider::Post => [0x7F, 0x62, 0x42],
            Divider::Mult => [0x1FFFF, 0x18003, 0x10003],
        }
    }

    /// Code of the family maximum, minus one step
    const fn seed(self) -> u32 {
        match self {
            Divider::Pre => 0x080,
            Divider::Post => 0x10,
            Divider::Mult => 0x4000,
        }
    }

    /// Single shift register step
    #[inline]
    const fn step(self, x: u32) -> u32 {
        match self {
            Divider::Pre => (((x ^ (x >> 2) ^ (x >> 3) ^ (x >> 4)) & 1) << 7) | ((x >> 1) & 0x7F),
            Divider::Post => (((x ^ (x >> 2)) & 1) << 4) | ((x >> 1) & 0xF),
            Divider::Mult => (((x ^ (x >> 1)) & 1) << 14) | ((x >> 1) & 0x3FFF),
        }
    }

    /// Hardware code for a raw divider value.
    /// `None` if the value is above the family maximum.
    pub fn encode(self, raw: u32) -> Option<u32> {
        if raw > self.max() {
            return None;
        }
        let code = match raw {
            0..=2 => self.fixed_codes()[raw as usize],
            _ => (raw..=self.max()).fold(self.seed(), |x, _| self.step(x)),
        };
        Some(code & self.mask())
    }

    /// Raw divider value for a hardware code.
    /// `None` if the code is not produced by any raw value, see [`or_default_divider`].
    pub fn decode(self, code: u32) -> Option<u32> {
        if let Some(raw) = self.fixed_codes().iter().position(|&c| c == code) {
            return Some(raw as u32);
        }

        let mask = self.mask();
        let mut x = self.seed();
        for raw in (3..=self.max()).rev() {
            x = self.step(x);
            if x & mask == code {
                return Some(raw);
            }
        }
        None
    }
}

/// Divider used by the hardware for a decoded code:
/// an unmatched code or a zero divider counts as 1.
#[inline]
pub fn or_default_divider(decoded: Option<u32>) -> u32 {
    match decoded {
        None | Some(0) => 1,
        Some(raw) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_codes() {
        assert_eq!(Divider::Pre.encode(0), Some(0x3FF));
        assert_eq!(Divider::Pre.encode(1), Some(0x302));
        assert_eq!(Divider::Pre.encode(2), Some(0x202));
        assert_eq!(Divider::Post.encode(1), Some(0x62));
        assert_eq!(Divider::Post.encode(2), Some(0x42));
        assert_eq!(Divider::Mult.encode(1), Some(0x18003));
        assert_eq!(Divider::Mult.decode(0x10003), Some(2));
        assert_eq!(Divider::Mult.decode(0x1FFFF), Some(0));
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(Divider::Pre.encode(3), Some(0x001));
        assert_eq!(Divider::Pre.encode(4), Some(0x002));
        assert_eq!(Divider::Pre.encode(256), Some(0x040));

        // power of two post-dividers
        assert_eq!(Divider::Post.encode(4), Some(0x02));
        assert_eq!(Divider::Post.encode(8), Some(0x0b));
        assert_eq!(Divider::Post.encode(16), Some(0x11));
        assert_eq!(Divider::Post.encode(32), Some(0x08));

        assert_eq!(Divider::Mult.encode(3), Some(0x00001));
        assert_eq!(Divider::Mult.encode(25), Some(0x07f55));
        assert_eq!(Divider::Mult.encode(32768), Some(0x02000));
    }

    #[test]
    fn test_pre_post_roundtrip_full_range() {
        for div in [Divider::Pre, Divider::Post] {
            for raw in 0..=div.max() {
                let code = div.encode(raw).unwrap();
                assert!(code <= div.mask());
                assert_eq!(div.decode(code), Some(raw), "{:?} {}", div, raw);
                assert_eq!(div.encode(div.decode(code).unwrap()), Some(code));
            }
        }
    }

    #[test]
    fn test_mult_roundtrip_full_range() {
        let mut seen = vec![false; 1 << 17];
        for raw in 0..=MVALMAX {
            let code = Divider::Mult.encode(raw).unwrap();
            assert!(code <= Divider::Mult.mask());
            assert!(!seen[code as usize], "M {} duplicate code {:#x}", raw, code);
            seen[code as usize] = true;
            assert_eq!(Divider::Mult.decode(code), Some(raw), "M {}", raw);
        }
    }

    #[test]
    fn test_codes_are_distinct() {
        for div in [Divider::Pre, Divider::Post] {
            let mut seen = [false; 0x400];
            for raw in 0..=div.max() {
                let code = div.encode(raw).unwrap() as usize;
                assert!(!seen[code], "{:?} duplicate code {:#x}", div, code);
                seen[code] = true;
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(Divider::Pre.encode(NVALMAX + 1), None);
        assert_eq!(Divider::Post.encode(PVALMAX + 1), None);
        assert_eq!(Divider::Mult.encode(MVALMAX + 1), None);
    }

    #[test]
    fn test_unmatched_decode() {
        // the shift registers never reach zero, nor a bit above their width
        assert_eq!(Divider::Pre.decode(0), None);
        assert_eq!(Divider::Pre.decode(0x100), None);
        assert_eq!(Divider::Post.decode(0x20), None);
        assert_eq!(Divider::Mult.decode(0x8000), None);

        assert_eq!(or_default_divider(Divider::Pre.decode(0x100)), 1);
        assert_eq!(or_default_divider(Divider::Pre.decode(0x3FF)), 1);
        assert_eq!(or_default_divider(Divider::Pre.decode(0x001)), 3);
    }
}
