//! Load and unload.

use crate::PciCalcDriver;
use crate::config::ModuleConfig;
use crate::error::DriverError;
use kernel_pci::PciPlatform;
use log::{error, info};

/// Why the host refused a character-device registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChrdevError {
    #[error("major number {0} is already in use")]
    MajorInUse(u32),
    #[error("character device table is full")]
    TableFull,
}

/// The host's character-device table.
///
/// Once registered, the host routes `open` on the device node to
/// [`PciCalcDriver::open`] and the file operations to the returned
/// [`Session`](crate::Session).
pub trait CharDevRegistry {
    /// # Errors
    /// A [`ChrdevError`] if the major number cannot be taken.
    fn register(&self, major: u32, name: &'static str) -> Result<(), ChrdevError>;

    fn unregister(&self, major: u32, name: &'static str);
}

/// A loaded driver: the result store is allocated and the character device
/// is registered. Dropping it unloads.
pub struct PciCalcModule<'h, P: PciPlatform + ?Sized, C: CharDevRegistry + ?Sized> {
    driver: PciCalcDriver<'h, P>,
    registry: &'h C,
}

impl<'h, P: PciPlatform + ?Sized, C: CharDevRegistry + ?Sized> PciCalcModule<'h, P, C> {
    /// Module init.
    ///
    /// # Errors
    /// [`DriverError::AllocationFailure`] if the result store cannot be
    /// allocated, [`DriverError::DeviceRegistrationFailure`] if the major
    /// number is refused; the store is freed again in that case.
    pub fn init(
        config: ModuleConfig,
        platform: &'h P,
        registry: &'h C,
    ) -> Result<Self, DriverError> {
        let driver = PciCalcDriver::new(config, platform)?;
        registry
            .register(config.major, config.name)
            .inspect_err(|e| {
                error!("{}: cannot register major {}: {e}", config.name, config.major);
            })?;
        info!("{}: registered with major {}", config.name, config.major);
        Ok(Self { driver, registry })
    }

    #[must_use]
    pub const fn driver(&self) -> &PciCalcDriver<'h, P> {
        &self.driver
    }

    /// Module exit.
    pub fn exit(self) {}
}

impl<P: PciPlatform + ?Sized, C: CharDevRegistry + ?Sized> Drop for PciCalcModule<'_, P, C> {
    fn drop(&mut self) {
        let config = self.driver.config();
        self.driver.detach();
        self.registry.unregister(config.major, config.name);
        info!("{}: unloaded", config.name);
    }
}
