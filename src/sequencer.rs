//! SYSPLL apply / lock sequence
//!
//! The PLL is powered down while its dividers change. Each divider word is
//! written, then written again with its request bit to latch it. Powering
//! back up goes through a short pulse at the maximum CCO setting, which
//! shortens the lock time.

use core::convert::Infallible;

use embedded_hal::blocking::delay::DelayUs;

use crate::config::{LockTimeout, SetupFlags};
use crate::constants::{MAX_CCO_MDEC, PLL_LOCK_PULSE_US};
use crate::errors::PllError;
use crate::pll::PllSetup;
use crate::power::{PowerControl, PowerDomain};
use crate::register::*;
use crate::syscon::{Syscon, SysconReg};

/// Non-blocking PLL lock check
pub fn poll_lock<S: Syscon>(syscon: &S) -> nb::Result<(), Infallible> {
    let stat = Reg::<Stat>::from_word(syscon.read(SysconReg::SysPllStat));
    match stat.get::<Lock>() {
        Lock::Locked => Ok(()),
        Lock::Unlocked => Err(nb::Error::WouldBlock),
    }
}

/// Writes a PLL setup to the hardware and brings the PLL up
pub struct Sequencer<'a, S, P, D> {
    syscon: &'a mut S,
    power: &'a mut P,
    delay: &'a mut D,
}

impl<'a, S, P, D> Sequencer<'a, S, P, D>
where
    S: Syscon,
    P: PowerControl,
    D: DelayUs<u16>,
{
    pub fn new(syscon: &'a mut S, power: &'a mut P, delay: &'a mut D) -> Self {
        Sequencer { syscon, power, delay }
    }

    /// Programs `setup`, then powers up / waits for lock / adjusts the
    /// core voltage as requested by `flags`.
    ///
    /// `input_hz` is the PLL input rate, returns the new PLL output rate.
    /// Nothing is written when one of the setup's divider codes is invalid.
    pub fn apply(
        &mut self,
        setup: &PllSetup,
        input_hz: u32,
        flags: SetupFlags,
        timeout: LockTimeout,
    ) -> Result<u32, PllError> {
        self.apply_at_rate(setup, setup.output_hz(input_hz), flags, timeout)
    }

    /// Same as [`Sequencer::apply`] for a setup whose output rate is
    /// already known, `rate` is returned as is.
    pub fn apply_at_rate(
        &mut self,
        setup: &PllSetup,
        rate: u32,
        flags: SetupFlags,
        timeout: LockTimeout,
    ) -> Result<u32, PllError> {
        setup.validate()?;

        self.power.enable_pd(PowerDomain::SysPll);
        self.write_setup(setup);

        if flags.power_up || flags.wait_lock {
            self.bring_up();
        }
        if flags.wait_lock {
            self.wait_lock(timeout)?;
        }

        info!("pll: applied, {} Hz", rate);

        if flags.adjust_voltage {
            self.power.set_voltage_for_freq(rate);
        }
        Ok(rate)
    }

    fn write_latched(&mut self, reg: SysconReg, value: u32, latched: u32) {
        self.syscon.write(reg, value);
        self.syscon.write(reg, latched);
    }

    fn write_setup(&mut self, setup: &PllSetup) {
        let regs = setup.regs;
        self.syscon.write(SysconReg::SysPllCtrl, regs.ctrl.w);
        let ndec = regs.ndec.set(Nreq::Latch);
        let pdec = regs.pdec.set(Preq::Latch);
        let ssctrl0 = regs.ssctrl0.set(Mreq::Latch);
        let ssctrl1 = regs.ssctrl1.set(Mdreq::Latch);
        self.write_latched(SysconReg::SysPllNdec, regs.ndec.w, ndec.w);
        self.write_latched(SysconReg::SysPllPdec, regs.pdec.w, pdec.w);
        self.write_latched(SysconReg::SysPllSsCtrl0, regs.ssctrl0.w, ssctrl0.w);
        self.write_latched(SysconReg::SysPllSsCtrl1, regs.ssctrl1.w, ssctrl1.w);
    }

    fn bring_up(&mut self) {
        let max_cco = Reg::<Ssctrl0>::from_word(MAX_CCO_MDEC);
        let current = Reg::<Ssctrl0>::from_word(self.syscon.read(SysconReg::SysPllSsCtrl0))
            .set(Mreq::Idle);

        self.syscon.write(SysconReg::SysPllSsCtrl0, max_cco.w);
        self.power.disable_pd(PowerDomain::SysPll);
        self.syscon.write(SysconReg::SysPllSsCtrl0, max_cco.set(Mreq::Latch).w);

        self.delay.delay_us(PLL_LOCK_PULSE_US);

        self.write_latched(SysconReg::SysPllSsCtrl0, current.w, current.set(Mreq::Latch).w);
        self.power.disable_pd(PowerDomain::SysPll);
    }

    /// Polls the lock bit, once per microsecond
    pub fn wait_lock(&mut self, timeout: LockTimeout) -> Result<(), PllError> {
        let limit_us = match timeout {
            LockTimeout::Never => {
                return match nb::block!(poll_lock(&*self.syscon)) {
                    Ok(()) => Ok(()),
                    Err(never) => match never {},
                };
            }
            LockTimeout::Micros(us) => us,
        };

        let mut elapsed_us = 0;
        loop {
            match poll_lock(&*self.syscon) {
                Ok(()) => {
                    debug!("pll: locked after {} us", elapsed_us);
                    return Ok(());
                }
                Err(nb::Error::Other(never)) => match never {},
                Err(nb::Error::WouldBlock) => {}
            }
            if elapsed_us >= limit_us {
                warn!("pll: no lock after {} us", limit_us);
                return Err(PllError::LockTimeout);
            }
            self.delay.delay_us(1);
            elapsed_us += 1;
        }
    }
}
