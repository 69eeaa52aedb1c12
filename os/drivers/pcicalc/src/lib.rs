//! # PCI Calculator Driver
//!
//! A character device (`/dev/pcicalculator`, major 200) that adds two
//! integers, plus the PCI glue that hands the accelerator a DMA buffer.
//!
//! ```text
//! write("7+5\n") ─► request::scan ─► ParsedRequest ─► compute ─► ResultBuffer
//! read()  ◄──────────────────────────────────────────────────────── ResultBuffer
//! ```
//!
//! Writes and reads go through a single shared [`ResultBuffer`] holding the
//! last result (`"zero\n"` until the first successful write). The hardware
//! side is independent of it: [`PciCalcDriver::probe`] maps the register
//! BAR, allocates a page of coherent memory and publishes its bus address
//! at register offset 0.
//!
//! The host kernel plugs in through three traits:
//!
//! | Trait | Provides |
//! |-------|----------|
//! | [`PciPlatform`] | BAR claims and mappings, coherent DMA, config space |
//! | [`CharDevRegistry`] | major-number registration |
//! | [`UserSliceReader`] / [`UserSliceWriter`] | fallible user copies |
//!
//! Loading is [`PciCalcModule::init`]; unloading is dropping the module.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod binding;
mod compute;
mod config;
mod error;
mod module;
pub mod request;
mod result_store;
mod session;
mod uaccess;

pub use binding::{BindingState, DeviceInstance, ProbeOutcome};
pub use compute::{MAX_RENDERED, Rendered, compute};
pub use config::{ModuleConfig, PCICALC_IDS};
pub use error::{DriverError, Operand, RegistrationError, SyntaxError};
pub use module::{CharDevRegistry, ChrdevError, PciCalcModule};
pub use request::{ParsedRequest, RequestSpans};
pub use result_store::{PLACEHOLDER, RESULT_CAPACITY, ResultBuffer};
pub use session::Session;
pub use uaccess::{UserFault, UserSliceReader, UserSliceWriter};

use core::sync::atomic::{AtomicBool, AtomicUsize};
use kernel_pci::PciPlatform;
use kernel_sync::{SpinMutex, TicketMutex};
use log::debug;

/// Driver-wide state shared by every session and the PCI callbacks.
pub struct PciCalcDriver<'p, P: PciPlatform + ?Sized> {
    config: ModuleConfig,
    platform: &'p P,
    store: TicketMutex<ResultBuffer>,
    device: SpinMutex<Option<DeviceInstance<'p, P>>>,
    attach_failed: AtomicBool,
    refs: AtomicUsize,
}

impl<'p, P: PciPlatform + ?Sized> PciCalcDriver<'p, P> {
    /// Allocate the result store. No device is bound and no character
    /// device is registered; see [`PciCalcModule::init`] for that.
    ///
    /// # Errors
    /// [`DriverError::AllocationFailure`].
    pub fn new(config: ModuleConfig, platform: &'p P) -> Result<Self, DriverError> {
        let store = ResultBuffer::try_new()?;
        debug!("{}: {} byte result store", config.name, store.capacity());
        Ok(Self {
            config,
            platform,
            store: TicketMutex::new(store),
            device: SpinMutex::new(None),
            attach_failed: AtomicBool::new(false),
            refs: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub const fn config(&self) -> ModuleConfig {
        self.config
    }

    /// Copy of the current result line.
    #[must_use]
    pub fn snapshot(&self) -> alloc::vec::Vec<u8> {
        self.store.with_lock(|s| s.as_bytes().to_vec())
    }
}
