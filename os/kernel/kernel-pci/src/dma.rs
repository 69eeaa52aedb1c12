use crate::PhysicalAddress;
use core::ptr::NonNull;

/// Physically contiguous memory shared with a device.
///
/// `vaddr` is what the CPU dereferences, `phys` is what the device is told.
/// Both describe the same bytes for as long as the region is held; once the
/// region goes back to the platform, `phys` must not be handed out again.
#[derive(Debug)]
pub struct DmaRegion {
    vaddr: NonNull<u8>,
    phys: PhysicalAddress,
    len: usize,
}

// SAFETY: the region is exclusively owned; no other handle to the memory exists.
unsafe impl Send for DmaRegion {}

impl DmaRegion {
    /// # Safety
    /// `vaddr` must be valid for reads and writes of `len` bytes, `phys` must
    /// be the bus address of the same memory, and both must remain valid
    /// until the region is returned to the platform that allocated it.
    #[must_use]
    pub const unsafe fn new(vaddr: NonNull<u8>, phys: PhysicalAddress, len: usize) -> Self {
        Self { vaddr, phys, len }
    }

    #[must_use]
    pub const fn phys(&self) -> PhysicalAddress {
        self.phys
    }

    #[must_use]
    pub const fn vaddr(&self) -> NonNull<u8> {
        self.vaddr
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn as_slice(&self) -> &[u8] {
        // SAFETY: valid for `len` bytes per `new`; `&self` rules out concurrent CPU writers.
        unsafe { core::slice::from_raw_parts(self.vaddr.as_ptr(), self.len) }
    }

    pub const fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: valid for `len` bytes per `new`; `&mut self` gives exclusive CPU access.
        unsafe { core::slice::from_raw_parts_mut(self.vaddr.as_ptr(), self.len) }
    }
}
