use core::fmt;

/// Base page size for BAR windows and coherent DMA allocations.
pub const PAGE_SIZE: usize = 4096;

/// Physical (bus) address.
///
/// Carries intent so that the address a device is told about can never be
/// confused with the virtual address the driver dereferences.
///
/// ```rust
/// # use kernel_pci::PhysicalAddress;
/// let pa = PhysicalAddress::new(0x1_0000_2042);
/// assert_eq!(pa.page_base().as_u64(), 0x1_0000_2000);
/// assert_eq!(pa.page_offset(), 0x42);
/// assert!(!pa.is_page_aligned());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn page_base(self) -> Self {
        Self(self.0 & !Self::PAGE_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & Self::PAGE_MASK
    }

    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.page_offset() == 0
    }

    /// Checked `self + rhs`; `None` if the sum leaves the 64-bit address space.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(pa: PhysicalAddress) -> Self {
        pa.as_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_like_a_register_dump() {
        let pa = PhysicalAddress::new(0xFEB0_1000);
        assert_eq!(format!("{pa}"), "0x00000000FEB01000");
        assert_eq!(format!("{pa:?}"), "PA(0x00000000FEB01000)");
    }

    #[test]
    fn checked_add_detects_wrap() {
        assert_eq!(
            PhysicalAddress::new(u64::MAX - 1).checked_add(1),
            Some(PhysicalAddress::new(u64::MAX))
        );
        assert_eq!(PhysicalAddress::new(u64::MAX).checked_add(1), None);
    }
}
