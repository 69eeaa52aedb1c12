use crate::PciLocation;

/// Failures reported by a [`PciPlatform`](crate::PciPlatform) or by the
/// MMIO accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PciError {
    #[error("BAR {bar} of {location} is already claimed")]
    RegionBusy { location: PciLocation, bar: u8 },
    #[error("{location} has no memory BAR {bar}")]
    NoSuchBar { location: PciLocation, bar: u8 },
    #[error("BAR {bar} of {location} is {size} bytes, window needs {len}")]
    BarTooSmall {
        location: PciLocation,
        bar: u8,
        size: u64,
        len: usize,
    },
    #[error("failed to map BAR {bar} of {location}")]
    MapFailed { location: PciLocation, bar: u8 },
    #[error("coherent DMA allocation of {len} bytes failed")]
    DmaAllocFailed { len: usize },
    #[error("configuration space access to {location} failed")]
    ConfigAccess { location: PciLocation },
    #[error("{width}-byte register access at {offset:#x} outside {len}-byte window or misaligned")]
    OutOfWindow {
        offset: usize,
        width: usize,
        len: usize,
    },
}
