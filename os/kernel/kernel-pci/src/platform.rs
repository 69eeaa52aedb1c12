use crate::{DmaRegion, MmioWindow, PciCommand, PciError, PciFunction};

/// Services the host kernel's PCI core offers to a function driver.
///
/// Every successful acquisition is paired with exactly one release; the
/// guards in [`devres`](crate::devres) enforce the pairing.
///
/// # Safety
/// Implementors guarantee that a [`MmioWindow`] returned by [`map_bar`]
/// and a [`DmaRegion`] returned by [`alloc_coherent`] satisfy the safety
/// contracts of [`MmioWindow::new`] and [`DmaRegion::new`] until they are
/// passed back to [`unmap_bar`] and [`free_coherent`] respectively.
///
/// [`map_bar`]: PciPlatform::map_bar
/// [`alloc_coherent`]: PciPlatform::alloc_coherent
/// [`unmap_bar`]: PciPlatform::unmap_bar
/// [`free_coherent`]: PciPlatform::free_coherent
pub unsafe trait PciPlatform: Sync {
    /// Claim exclusive ownership of a memory BAR's resource range.
    ///
    /// # Errors
    /// [`PciError::RegionBusy`] if another owner holds it,
    /// [`PciError::NoSuchBar`] if the BAR is not a memory BAR.
    fn request_region(
        &self,
        func: &PciFunction,
        bar: u8,
        owner: &'static str,
    ) -> Result<(), PciError>;

    fn release_region(&self, func: &PciFunction, bar: u8);

    /// Map the first `len` bytes of a claimed BAR.
    ///
    /// # Errors
    /// [`PciError::BarTooSmall`] or [`PciError::MapFailed`].
    fn map_bar(&self, func: &PciFunction, bar: u8, len: usize) -> Result<MmioWindow, PciError>;

    fn unmap_bar(&self, func: &PciFunction, window: MmioWindow);

    /// Allocate `len` bytes of zeroed, physically contiguous, cache-coherent memory.
    ///
    /// # Errors
    /// [`PciError::DmaAllocFailed`] when memory is exhausted.
    fn alloc_coherent(&self, func: &PciFunction, len: usize) -> Result<DmaRegion, PciError>;

    fn free_coherent(&self, func: &PciFunction, region: DmaRegion);

    /// # Errors
    /// [`PciError::ConfigAccess`] if configuration space is unreachable.
    fn read_command(&self, func: &PciFunction) -> Result<PciCommand, PciError>;

    /// # Errors
    /// [`PciError::ConfigAccess`] if configuration space is unreachable.
    fn write_command(&self, func: &PciFunction, command: PciCommand) -> Result<(), PciError>;
}
