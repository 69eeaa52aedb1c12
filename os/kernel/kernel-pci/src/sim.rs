//! An in-memory [`PciPlatform`] for hosted tests.
//!
//! BAR registers live in per-device heap arrays that outlast any mapping,
//! so a test can inspect what a driver left behind after it detached.
//! Coherent buffers come from the global allocator and are given fake bus
//! addresses above 4 GiB.

use crate::{
    Bar, DmaRegion, MmioWindow, PAGE_SIZE, PciCommand, PciDeviceId, PciError, PciFunction,
    PciLocation, PciPlatform, PhysicalAddress, function::MAX_BARS,
};
use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_sync::SpinMutex;
use log::trace;

const MMIO_BASE: u64 = 0xFEB0_0000;
const DMA_BASE: u64 = 0x1_0000_0000;

/// A platform operation that can be made to fail.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimFault {
    RequestRegion,
    MapBar,
    AllocDma,
    ReadCommand,
    WriteCommand,
}

/// One observable side effect, in the order it happened.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    RegionRequested {
        location: PciLocation,
        bar: u8,
    },
    RegionReleased {
        location: PciLocation,
        bar: u8,
    },
    BarMapped {
        location: PciLocation,
        bar: u8,
    },
    BarUnmapped {
        location: PciLocation,
    },
    DmaAllocated {
        location: PciLocation,
        phys: PhysicalAddress,
        len: usize,
    },
    DmaFreed {
        location: PciLocation,
        phys: PhysicalAddress,
    },
    CommandWritten {
        location: PciLocation,
        command: PciCommand,
    },
}

/// Resources currently held by drivers.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Outstanding {
    pub regions: usize,
    pub windows: usize,
    pub dma: usize,
}

impl Outstanding {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.regions == 0 && self.windows == 0 && self.dma == 0
    }
}

struct SimDevice {
    func: PciFunction,
    command: PciCommand,
    claims: [Option<&'static str>; MAX_BARS],
    registers: [Option<Box<[AtomicU64]>>; MAX_BARS],
    windows: usize,
}

struct Allocation {
    location: PciLocation,
    vaddr: usize,
    phys: PhysicalAddress,
    layout: Layout,
}

#[derive(Default)]
struct SimState {
    devices: Vec<SimDevice>,
    allocations: Vec<Allocation>,
    next_dma: u64,
    faults: Vec<SimFault>,
    events: Vec<SimEvent>,
}

impl SimState {
    fn device(&mut self, func: &PciFunction) -> Option<&mut SimDevice> {
        let location = func.location();
        self.devices
            .iter_mut()
            .find(|d| d.func.location() == location)
    }

    fn take_fault(&mut self, fault: SimFault) -> bool {
        if let Some(pos) = self.faults.iter().position(|f| *f == fault) {
            self.faults.remove(pos);
            trace!("sim: injecting {fault:?}");
            true
        } else {
            false
        }
    }
}

/// Heap-backed PCI bus with fault injection.
#[derive(Default)]
pub struct SimPlatform {
    state: SpinMutex<SimState>,
}

impl SimPlatform {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SpinMutex::new(SimState {
                devices: Vec::new(),
                allocations: Vec::new(),
                next_dma: 0,
                faults: Vec::new(),
                events: Vec::new(),
            }),
        }
    }

    /// Plug in a function with a single one-page memory BAR 0.
    #[allow(clippy::must_use_candidate)]
    pub fn add_device(&self, location: PciLocation, id: PciDeviceId) -> PciFunction {
        let index = self.state.lock().devices.len() as u64;
        let func = PciFunction::new(location, id).with_bar(
            0,
            Bar {
                base: PhysicalAddress::new(MMIO_BASE + index * PAGE_SIZE as u64),
                len: PAGE_SIZE as u64,
            },
        );
        self.add_function(func)
    }

    /// Plug in a function with caller-chosen BARs.
    #[allow(clippy::must_use_candidate)]
    pub fn add_function(&self, func: PciFunction) -> PciFunction {
        let mut registers: [Option<Box<[AtomicU64]>>; MAX_BARS] = Default::default();
        for (index, slot) in (0u8..).zip(registers.iter_mut()) {
            if let Some(bar) = func.bar(index) {
                let words = usize::try_from(bar.len / 8).unwrap_or(0);
                *slot = Some((0..words).map(|_| AtomicU64::new(0)).collect());
            }
        }
        self.state.lock().devices.push(SimDevice {
            func,
            command: PciCommand::new(),
            claims: [None; MAX_BARS],
            registers,
            windows: 0,
        });
        func
    }

    /// Make the next call of the given kind fail. Faults queue up.
    pub fn inject(&self, fault: SimFault) {
        self.state.lock().faults.push(fault);
    }

    #[must_use]
    pub fn events(&self) -> Vec<SimEvent> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    #[must_use]
    pub fn outstanding(&self) -> Outstanding {
        let state = self.state.lock();
        Outstanding {
            regions: state
                .devices
                .iter()
                .map(|d| d.claims.iter().flatten().count())
                .sum(),
            windows: state.devices.iter().map(|d| d.windows).sum(),
            dma: state.allocations.len(),
        }
    }

    /// Current value of a 64-bit BAR register, mapped or not.
    #[must_use]
    pub fn read_register(&self, func: &PciFunction, bar: u8, offset: usize) -> Option<u64> {
        let mut state = self.state.lock();
        let device = state.device(func)?;
        let regs = device.registers.get(usize::from(bar))?.as_ref()?;
        regs.get(offset / 8).map(|r| r.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn command(&self, func: &PciFunction) -> Option<PciCommand> {
        self.state.lock().device(func).map(|d| d.command)
    }

    /// Owner string of a claimed BAR.
    #[must_use]
    pub fn claim_owner(&self, func: &PciFunction, bar: u8) -> Option<&'static str> {
        let mut state = self.state.lock();
        let device = state.device(func)?;
        device.claims.get(usize::from(bar)).copied().flatten()
    }

    /// Contents of an outstanding coherent buffer, as the device would see it.
    #[must_use]
    pub fn dma_snapshot(&self, phys: PhysicalAddress) -> Option<Vec<u8>> {
        let state = self.state.lock();
        let a = state.allocations.iter().find(|a| a.phys == phys)?;
        // SAFETY: the allocation is live while it is in the table.
        let bytes = unsafe { core::slice::from_raw_parts(a.vaddr as *const u8, a.layout.size()) };
        Some(bytes.to_vec())
    }
}

impl Drop for SimPlatform {
    fn drop(&mut self) {
        for a in self.state.get_mut().allocations.drain(..) {
            // SAFETY: allocated in `alloc_coherent` with this layout, never freed.
            unsafe { dealloc(a.vaddr as *mut u8, a.layout) };
        }
    }
}

// SAFETY: windows point into register arrays owned by `SimDevice`s, which
// are never removed; DMA regions stay allocated until `free_coherent` or drop.
unsafe impl PciPlatform for SimPlatform {
    fn request_region(
        &self,
        func: &PciFunction,
        bar: u8,
        owner: &'static str,
    ) -> Result<(), PciError> {
        let location = func.location();
        let mut state = self.state.lock();
        if state.take_fault(SimFault::RequestRegion) {
            return Err(PciError::RegionBusy { location, bar });
        }
        let device = state
            .device(func)
            .filter(|d| d.func.bar(bar).is_some())
            .ok_or(PciError::NoSuchBar { location, bar })?;
        let claim = &mut device.claims[usize::from(bar)];
        if claim.is_some() {
            return Err(PciError::RegionBusy { location, bar });
        }
        *claim = Some(owner);
        state
            .events
            .push(SimEvent::RegionRequested { location, bar });
        Ok(())
    }

    fn release_region(&self, func: &PciFunction, bar: u8) {
        let location = func.location();
        let mut state = self.state.lock();
        let released = state
            .device(func)
            .and_then(|d| d.claims.get_mut(usize::from(bar)))
            .and_then(Option::take)
            .is_some();
        if released {
            state.events.push(SimEvent::RegionReleased { location, bar });
        }
    }

    fn map_bar(&self, func: &PciFunction, bar: u8, len: usize) -> Result<MmioWindow, PciError> {
        let location = func.location();
        let mut state = self.state.lock();
        if state.take_fault(SimFault::MapBar) {
            return Err(PciError::MapFailed { location, bar });
        }
        let device = state
            .device(func)
            .ok_or(PciError::NoSuchBar { location, bar })?;
        let info = device
            .func
            .bar(bar)
            .ok_or(PciError::NoSuchBar { location, bar })?;
        if len as u64 > info.len {
            return Err(PciError::BarTooSmall {
                location,
                bar,
                size: info.len,
                len,
            });
        }
        let regs = device.registers[usize::from(bar)]
            .as_ref()
            .ok_or(PciError::MapFailed { location, bar })?;
        let base = NonNull::new(regs.as_ptr().cast::<u8>().cast_mut())
            .ok_or(PciError::MapFailed { location, bar })?;
        device.windows += 1;
        state.events.push(SimEvent::BarMapped { location, bar });
        // SAFETY: `base` covers `info.len >= len` bytes of 8-byte aligned atomics
        // that live as long as `self`.
        Ok(unsafe { MmioWindow::new(base, len, info.base) })
    }

    fn unmap_bar(&self, func: &PciFunction, window: MmioWindow) {
        let location = func.location();
        let mut state = self.state.lock();
        if let Some(device) = state.device(func) {
            device.windows = device.windows.saturating_sub(1);
        }
        trace!("sim: {location} unmapped {}", window.phys());
        state.events.push(SimEvent::BarUnmapped { location });
    }

    fn alloc_coherent(&self, func: &PciFunction, len: usize) -> Result<DmaRegion, PciError> {
        let location = func.location();
        let mut state = self.state.lock();
        if state.take_fault(SimFault::AllocDma) || len == 0 {
            return Err(PciError::DmaAllocFailed { len });
        }
        let layout =
            Layout::from_size_align(len, PAGE_SIZE).map_err(|_| PciError::DmaAllocFailed { len })?;
        // SAFETY: `layout` has non-zero size.
        let vaddr =
            NonNull::new(unsafe { alloc_zeroed(layout) }).ok_or(PciError::DmaAllocFailed { len })?;
        let pages = len.div_ceil(PAGE_SIZE) as u64;
        let phys = PhysicalAddress::new(DMA_BASE + state.next_dma * PAGE_SIZE as u64);
        state.next_dma += pages;
        state.allocations.push(Allocation {
            location,
            vaddr: vaddr.as_ptr() as usize,
            phys,
            layout,
        });
        state
            .events
            .push(SimEvent::DmaAllocated { location, phys, len });
        // SAFETY: fresh allocation of `len` bytes, freed only in `free_coherent` or drop.
        Ok(unsafe { DmaRegion::new(vaddr, phys, len) })
    }

    fn free_coherent(&self, func: &PciFunction, region: DmaRegion) {
        let location = func.location();
        let mut state = self.state.lock();
        let Some(pos) = state
            .allocations
            .iter()
            .position(|a| a.phys == region.phys() && a.location == location)
        else {
            log::warn!("sim: {func} freed unknown buffer {}", region.phys());
            return;
        };
        let a = state.allocations.swap_remove(pos);
        // SAFETY: allocated in `alloc_coherent` with this layout; the region is consumed.
        unsafe { dealloc(a.vaddr as *mut u8, a.layout) };
        state.events.push(SimEvent::DmaFreed {
            location,
            phys: a.phys,
        });
    }

    fn read_command(&self, func: &PciFunction) -> Result<PciCommand, PciError> {
        let location = func.location();
        let mut state = self.state.lock();
        if state.take_fault(SimFault::ReadCommand) {
            return Err(PciError::ConfigAccess { location });
        }
        state
            .device(func)
            .map(|d| d.command)
            .ok_or(PciError::ConfigAccess { location })
    }

    fn write_command(&self, func: &PciFunction, command: PciCommand) -> Result<(), PciError> {
        let location = func.location();
        let mut state = self.state.lock();
        if state.take_fault(SimFault::WriteCommand) {
            return Err(PciError::ConfigAccess { location });
        }
        state
            .device(func)
            .ok_or(PciError::ConfigAccess { location })?
            .command = command;
        state
            .events
            .push(SimEvent::CommandWritten { location, command });
        Ok(())
    }
}
