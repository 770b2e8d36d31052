#![cfg_attr(not(test), no_std)]

//! LPC5411x clock generation unit (CGU).
//!
//! System PLL parameter synthesis, PLL programming and lock sequencing, and
//! frequency resolution of the SYSCON clock tree.
//!
//! ```ignore
//! let mut cgu: Cgu<_> = Cgu::new(syscon, CguConfig::default());
//! let setup = cgu.synthesize(12_000_000, 100_000_000, false, false)?;
//! cgu.setup_system_pll_prec(&mut power, &mut delay, &setup, SetupFlags::new().wait_lock(true))?;
//! cgu.attach_clk(ClockAttach::PllOutToMainClk);
//! let core_hz = cgu.frequency(ClockNode::CoreSysClk);
//! ```

// must go first, the other modules use its macros
#[macro_use]
mod fmt;

pub mod bandwidth;
pub mod cache;
pub mod cgu;
pub mod codec;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pll;
pub mod power;
pub mod register;
pub mod sequencer;
pub mod syscon;
pub mod tree;

pub use cgu::{Cgu, ClockAttach, ClockDivider, PreparedPll};
pub use config::{CguConfig, LockTimeout, PllConfig, SetupFlags, SpreadSpectrum};
pub use errors::{ClockError, PllError};
pub use pll::{synthesize, PllSetup};
pub use power::{PowerControl, PowerDomain};
pub use syscon::{RegisterFile, Syscon, SysconReg};
pub use tree::{ClockNode, ClockTree};
