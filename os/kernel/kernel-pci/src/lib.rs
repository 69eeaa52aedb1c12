//! # PCI Device Access for Kernel Drivers
//!
//! The narrow slice of PCI plumbing a driver needs once the bus has been
//! enumerated and a function has been handed to its probe callback:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PciFunction`] | The matched function: location, identity and memory BARs. |
//! | [`PciCommand`] | Typed view of the configuration-space command register. |
//! | [`MmioWindow`] | A BAR range mapped into the driver's address space. |
//! | [`DmaRegion`] | Physically contiguous memory the device can reach by bus address. |
//! | [`PciPlatform`] | What the host kernel provides: region claims, BAR mapping, coherent DMA, config access. |
//!
//! ## Resource ownership
//!
//! Every acquisition made through a [`PciPlatform`] has a matching release.
//! The guards in [`devres`] tie the two together so that dropping a guard
//! performs the release exactly once:
//!
//! ```text
//! RegionClaim ──► MappedWindow ──► CoherentBuffer      (acquire order)
//! RegionClaim ◄── MappedWindow ◄── CoherentBuffer      (drop order)
//! ```
//!
//! A driver that keeps its guards as struct fields in acquisition order and
//! declares them in reverse gets the correct unwind for free, both on
//! partial failure during probe and on detach.
//!
//! ## Simulation
//!
//! With the `sim` feature, [`sim::SimPlatform`] implements [`PciPlatform`]
//! on top of heap memory. It records every acquisition and release and can
//! inject a failure into any step, which is how the driver crates test
//! their probe unwind paths on the host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "sim")]
extern crate alloc;

mod address;
mod command;
pub mod devres;
mod dma;
mod error;
mod function;
mod mmio;
mod platform;
#[cfg(feature = "sim")]
pub mod sim;

pub use address::{PAGE_SIZE, PhysicalAddress};
pub use command::PciCommand;
pub use devres::{CoherentBuffer, MappedWindow, RegionClaim};
pub use dma::DmaRegion;
pub use error::PciError;
pub use function::{Bar, PciDeviceId, PciFunction, PciLocation};
pub use mmio::MmioWindow;
pub use platform::PciPlatform;
