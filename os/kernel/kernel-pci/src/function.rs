use crate::PhysicalAddress;
use core::fmt;

/// Bus/device/function triple, printed the way `lspci` does (`00:03.0`).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PciLocation {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciLocation {
    #[must_use]
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self {
            bus,
            device,
            function,
        }
    }
}

impl fmt::Display for PciLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

/// Vendor/device identifier pair from configuration space.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PciDeviceId {
    pub vendor: u16,
    pub device: u16,
}

impl PciDeviceId {
    #[must_use]
    pub const fn new(vendor: u16, device: u16) -> Self {
        Self { vendor, device }
    }

    /// Whether `self` appears in a driver's id table.
    #[must_use]
    pub fn is_in(self, table: &[Self]) -> bool {
        table.contains(&self)
    }
}

impl fmt::Display for PciDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.device)
    }
}

/// A decoded memory BAR.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Bar {
    pub base: PhysicalAddress,
    pub len: u64,
}

/// Maximum number of BARs on a type-0 header.
pub const MAX_BARS: usize = 6;

/// A PCI function as handed to a driver's probe callback.
///
/// Plain data: the handle can be copied freely, all side effects go through
/// a [`PciPlatform`](crate::PciPlatform).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PciFunction {
    location: PciLocation,
    id: PciDeviceId,
    bars: [Option<Bar>; MAX_BARS],
}

impl PciFunction {
    #[must_use]
    pub const fn new(location: PciLocation, id: PciDeviceId) -> Self {
        Self {
            location,
            id,
            bars: [None; MAX_BARS],
        }
    }

    /// Builder-style BAR assignment; out-of-range indices are ignored.
    #[must_use]
    pub const fn with_bar(mut self, index: u8, bar: Bar) -> Self {
        let index = index as usize;
        if index < MAX_BARS {
            self.bars[index] = Some(bar);
        }
        self
    }

    #[must_use]
    pub const fn location(&self) -> PciLocation {
        self.location
    }

    #[must_use]
    pub const fn id(&self) -> PciDeviceId {
        self.id
    }

    #[must_use]
    pub fn bar(&self, index: u8) -> Option<Bar> {
        self.bars.get(usize::from(index)).copied().flatten()
    }
}

impl fmt::Display for PciFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.location, self.id)
    }
}
