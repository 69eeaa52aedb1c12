use crate::{PciError, PhysicalAddress};
use core::ptr::NonNull;

/// A BAR range mapped into the driver's address space.
///
/// All accesses are volatile, naturally aligned and bounds-checked against
/// the window length. The window does not unmap itself; it is handed back to
/// the platform that produced it (see [`MappedWindow`](crate::MappedWindow)).
#[derive(Debug)]
pub struct MmioWindow {
    base: NonNull<u8>,
    len: usize,
    phys: PhysicalAddress,
}

// SAFETY: the window is exclusively owned; moving it to another thread moves
// the only handle to the mapping.
unsafe impl Send for MmioWindow {}

impl MmioWindow {
    /// # Safety
    /// `base` must be valid for volatile reads and writes of `len` bytes,
    /// suitably aligned for 8-byte accesses, and stay mapped until the
    /// window is returned to the platform that created it.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>, len: usize, phys: PhysicalAddress) -> Self {
        Self { base, len, phys }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bus address the window was mapped from.
    #[must_use]
    pub const fn phys(&self) -> PhysicalAddress {
        self.phys
    }

    fn checked<T>(&self, offset: usize) -> Result<NonNull<T>, PciError> {
        let width = size_of::<T>();
        let in_bounds = offset
            .checked_add(width)
            .is_some_and(|end| end <= self.len);
        if !in_bounds || !offset.is_multiple_of(width) {
            return Err(PciError::OutOfWindow {
                offset,
                width,
                len: self.len,
            });
        }
        // SAFETY: offset + width <= len, so the pointer stays inside the mapping.
        Ok(unsafe { self.base.add(offset) }.cast())
    }

    /// Read a 32-bit register.
    ///
    /// # Errors
    /// [`PciError::OutOfWindow`] if `offset` is misaligned or past the end.
    pub fn read_u32(&self, offset: usize) -> Result<u32, PciError> {
        let reg = self.checked::<u32>(offset)?;
        // SAFETY: in bounds and aligned; validity guaranteed by `new`'s contract.
        Ok(u32::from_le(unsafe { reg.read_volatile() }))
    }

    /// Write a 32-bit register.
    ///
    /// # Errors
    /// [`PciError::OutOfWindow`] if `offset` is misaligned or past the end.
    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<(), PciError> {
        let reg = self.checked::<u32>(offset)?;
        // SAFETY: in bounds and aligned; validity guaranteed by `new`'s contract.
        unsafe { reg.write_volatile(value.to_le()) };
        Ok(())
    }

    /// Read a 64-bit register.
    ///
    /// # Errors
    /// [`PciError::OutOfWindow`] if `offset` is misaligned or past the end.
    pub fn read_u64(&self, offset: usize) -> Result<u64, PciError> {
        let reg = self.checked::<u64>(offset)?;
        // SAFETY: in bounds and aligned; validity guaranteed by `new`'s contract.
        Ok(u64::from_le(unsafe { reg.read_volatile() }))
    }

    /// Write a 64-bit register (little-endian, single access).
    ///
    /// # Errors
    /// [`PciError::OutOfWindow`] if `offset` is misaligned or past the end.
    pub fn write_u64(&mut self, offset: usize, value: u64) -> Result<(), PciError> {
        let reg = self.checked::<u64>(offset)?;
        // SAFETY: in bounds and aligned; validity guaranteed by `new`'s contract.
        unsafe { reg.write_volatile(value.to_le()) };
        Ok(())
    }
}
