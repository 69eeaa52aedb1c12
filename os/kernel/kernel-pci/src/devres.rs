//! Scoped ownership of PCI resources.
//!
//! Each guard performs its release in `Drop`, so a probe routine can bail
//! out with `?` at any step and still hand back everything it acquired, in
//! reverse order, exactly once.

use crate::{DmaRegion, MmioWindow, PciError, PciFunction, PciPlatform, PhysicalAddress};
use core::mem::ManuallyDrop;
use log::debug;

/// A claimed BAR resource range.
pub struct RegionClaim<'p, P: PciPlatform + ?Sized> {
    platform: &'p P,
    func: PciFunction,
    bar: u8,
}

impl<'p, P: PciPlatform + ?Sized> RegionClaim<'p, P> {
    /// # Errors
    /// Whatever [`PciPlatform::request_region`] reports.
    pub fn request(
        platform: &'p P,
        func: &PciFunction,
        bar: u8,
        owner: &'static str,
    ) -> Result<Self, PciError> {
        platform.request_region(func, bar, owner)?;
        debug!("{func}: claimed BAR {bar} for {owner}");
        Ok(Self {
            platform,
            func: *func,
            bar,
        })
    }

    #[must_use]
    pub const fn bar(&self) -> u8 {
        self.bar
    }
}

impl<P: PciPlatform + ?Sized> Drop for RegionClaim<'_, P> {
    fn drop(&mut self) {
        self.platform.release_region(&self.func, self.bar);
        debug!("{}: released BAR {}", self.func, self.bar);
    }
}

/// A mapped register window, unmapped on drop.
pub struct MappedWindow<'p, P: PciPlatform + ?Sized> {
    platform: &'p P,
    func: PciFunction,
    window: ManuallyDrop<MmioWindow>,
}

impl<'p, P: PciPlatform + ?Sized> MappedWindow<'p, P> {
    /// Map `len` bytes of a BAR whose region is held by `claim`.
    ///
    /// # Errors
    /// Whatever [`PciPlatform::map_bar`] reports.
    pub fn map(claim: &RegionClaim<'p, P>, len: usize) -> Result<Self, PciError> {
        let window = claim.platform.map_bar(&claim.func, claim.bar, len)?;
        debug!(
            "{}: mapped BAR {} at {} ({} bytes)",
            claim.func,
            claim.bar,
            window.phys(),
            window.len()
        );
        Ok(Self {
            platform: claim.platform,
            func: claim.func,
            window: ManuallyDrop::new(window),
        })
    }

    #[must_use]
    pub fn window(&self) -> &MmioWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut MmioWindow {
        &mut self.window
    }
}

impl<P: PciPlatform + ?Sized> Drop for MappedWindow<'_, P> {
    fn drop(&mut self) {
        // SAFETY: `window` is never touched again after this.
        let window = unsafe { ManuallyDrop::take(&mut self.window) };
        debug!("{}: unmapping {}", self.func, window.phys());
        self.platform.unmap_bar(&self.func, window);
    }
}

/// A coherent DMA allocation, freed on drop.
pub struct CoherentBuffer<'p, P: PciPlatform + ?Sized> {
    platform: &'p P,
    func: PciFunction,
    region: ManuallyDrop<DmaRegion>,
}

impl<'p, P: PciPlatform + ?Sized> CoherentBuffer<'p, P> {
    /// # Errors
    /// Whatever [`PciPlatform::alloc_coherent`] reports.
    pub fn alloc(platform: &'p P, func: &PciFunction, len: usize) -> Result<Self, PciError> {
        let region = platform.alloc_coherent(func, len)?;
        debug!(
            "{func}: coherent buffer of {} bytes at {}",
            region.len(),
            region.phys()
        );
        Ok(Self {
            platform,
            func: *func,
            region: ManuallyDrop::new(region),
        })
    }

    #[must_use]
    pub fn region(&self) -> &DmaRegion {
        &self.region
    }

    pub fn region_mut(&mut self) -> &mut DmaRegion {
        &mut self.region
    }

    #[must_use]
    pub fn phys(&self) -> PhysicalAddress {
        self.region.phys()
    }
}

impl<P: PciPlatform + ?Sized> Drop for CoherentBuffer<'_, P> {
    fn drop(&mut self) {
        // SAFETY: `region` is never touched again after this.
        let region = unsafe { ManuallyDrop::take(&mut self.region) };
        debug!("{}: freeing coherent buffer at {}", self.func, region.phys());
        self.platform.free_coherent(&self.func, region);
    }
}
