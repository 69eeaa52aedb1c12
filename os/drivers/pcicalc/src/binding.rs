//! Attaching to the accelerator.
//!
//! ```text
//! Unbound ─► RegistersMapped ─► BufferAllocated ─► AddressPublished ─► Bound
//!    └──────────────┴──────────────────┴──────────────────┴──────────► Failed
//! ```
//!
//! Each step that acquires something yields a guard; a failing step drops
//! the guards acquired so far in reverse order. Once the address has been
//! published the guards live in a [`DeviceInstance`], whose `Drop` clears the
//! register before the buffer goes away.

use crate::PciCalcDriver;
use crate::config::ModuleConfig;
use crate::error::{DriverError, RegistrationError};
use core::sync::atomic::Ordering;
use kernel_pci::{
    CoherentBuffer, MappedWindow, PciFunction, PciPlatform, PhysicalAddress, RegionClaim,
};
use log::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    RegistersMapped,
    BufferAllocated,
    AddressPublished,
    Bound,
    Failed,
}

/// Result of offering a function to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Bound,
    /// Not one of ours; nothing was touched.
    Declined,
}

/// A bound accelerator and everything acquired for it.
///
/// Fields drop top to bottom: buffer, window, region.
pub struct DeviceInstance<'p, P: PciPlatform + ?Sized> {
    buffer: CoherentBuffer<'p, P>,
    window: MappedWindow<'p, P>,
    region: RegionClaim<'p, P>,
    platform: &'p P,
    func: PciFunction,
    phys: PhysicalAddress,
    address_register: usize,
    state: BindingState,
}

impl<'p, P: PciPlatform + ?Sized> DeviceInstance<'p, P> {
    fn attach(
        platform: &'p P,
        func: &PciFunction,
        config: &ModuleConfig,
    ) -> Result<Self, DriverError> {
        let mut state = BindingState::Unbound;
        Self::bring_up(platform, func, config, &mut state)
            .inspect_err(|e| error!("{func}: attach failed after reaching {state:?}: {e}"))
    }

    fn bring_up(
        platform: &'p P,
        func: &PciFunction,
        config: &ModuleConfig,
        state: &mut BindingState,
    ) -> Result<Self, DriverError> {
        let region = RegionClaim::request(platform, func, config.register_bar, config.name)?;
        let mut window = MappedWindow::map(&region, config.window_len)?;
        *state = BindingState::RegistersMapped;

        let buffer = CoherentBuffer::alloc(platform, func, config.dma_len)?;
        *state = BindingState::BufferAllocated;

        let phys = buffer.phys();
        window
            .window_mut()
            .write_u64(config.address_register, phys.as_u64())?;
        *state = BindingState::AddressPublished;
        debug!("{func}: published {phys:?} at register {:#x}", config.address_register);

        let mut instance = Self {
            buffer,
            window,
            region,
            platform,
            func: *func,
            phys,
            address_register: config.address_register,
            state: *state,
        };
        instance.enable()?;
        *state = BindingState::Bound;
        instance.state = BindingState::Bound;
        Ok(instance)
    }

    fn enable(&self) -> Result<(), DriverError> {
        let command = self.platform.read_command(&self.func)?;
        self.platform
            .write_command(&self.func, command.dma_enabled())?;
        Ok(())
    }

    #[must_use]
    pub const fn function(&self) -> &PciFunction {
        &self.func
    }

    /// Bus address of the DMA buffer, as published to the device.
    #[must_use]
    pub const fn dma_phys(&self) -> PhysicalAddress {
        self.phys
    }

    #[must_use]
    pub const fn state(&self) -> BindingState {
        self.state
    }

    #[must_use]
    pub const fn register_bar(&self) -> u8 {
        self.region.bar()
    }

    #[must_use]
    pub fn dma_len(&self) -> usize {
        self.buffer.region().len()
    }
}

impl<P: PciPlatform + ?Sized> Drop for DeviceInstance<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.window.window_mut().write_u64(self.address_register, 0) {
            warn!("{}: could not clear address register: {e}", self.func);
        }
        if self.state == BindingState::Bound {
            let disabled = self
                .platform
                .read_command(&self.func)
                .and_then(|cmd| self.platform.write_command(&self.func, cmd.dma_disabled()));
            if let Err(e) = disabled {
                warn!("{}: could not disable bus mastering: {e}", self.func);
            }
            info!("{}: detached", self.func);
        }
    }
}

impl<'p, P: PciPlatform + ?Sized> PciCalcDriver<'p, P> {
    /// Probe callback: bind `func` if it is in the id table.
    ///
    /// # Errors
    /// [`DriverError::DeviceRegistrationFailure`] if a device is already
    /// bound or the platform refuses a resource,
    /// [`DriverError::AllocationFailure`] if the window or buffer cannot be
    /// obtained. Nothing stays acquired on error.
    pub fn probe(&self, func: &PciFunction) -> Result<ProbeOutcome, DriverError> {
        if !func.id().is_in(self.config.ids) {
            debug!("{func}: not a {} device, declining", self.config.name);
            return Ok(ProbeOutcome::Declined);
        }

        let mut slot = self.device.lock();
        if let Some(bound) = slot.as_ref() {
            warn!("{func}: {} already bound to {}", self.config.name, bound.function());
            return Err(RegistrationError::AlreadyBound.into());
        }

        let instance = DeviceInstance::attach(self.platform, func, &self.config)
            .inspect_err(|_| self.attach_failed.store(true, Ordering::Release))?;
        self.attach_failed.store(false, Ordering::Release);
        info!(
            "{func}: bound on BAR{}, {} byte DMA buffer at {}",
            instance.register_bar(),
            instance.dma_len(),
            instance.phys
        );
        *slot = Some(instance);
        Ok(ProbeOutcome::Bound)
    }

    /// Remove callback. Returns whether `func` was the bound device.
    #[allow(clippy::must_use_candidate)]
    pub fn remove(&self, func: &PciFunction) -> bool {
        let mut slot = self.device.lock();
        if slot
            .as_ref()
            .is_some_and(|d| d.function().location() == func.location())
        {
            drop(slot.take());
            self.attach_failed.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Release the bound device, if any.
    pub fn detach(&self) {
        drop(self.device.lock().take());
    }

    /// `Failed` if the last probe of a matching device failed and nothing is bound.
    #[must_use]
    pub fn binding_state(&self) -> BindingState {
        match self.device.lock().as_ref() {
            Some(device) => device.state(),
            None if self.attach_failed.load(Ordering::Acquire) => BindingState::Failed,
            None => BindingState::Unbound,
        }
    }

    /// Address currently published to the bound device.
    #[must_use]
    pub fn published_address(&self) -> Option<PhysicalAddress> {
        self.device.lock().as_ref().map(DeviceInstance::dma_phys)
    }
}
