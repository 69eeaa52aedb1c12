use bitfield_struct::bitfield;

/// PCI configuration-space command register (offset `0x04`, 16 bits).
///
/// Only the bits a function driver toggles are given meaningful names;
/// reserved bits are kept private and read back as 0.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct PciCommand {
    /// Bit 0, I/O Space: respond to I/O-space accesses.
    pub io_space: bool,

    /// Bit 1, Memory Space: respond to accesses to the memory BARs.
    pub memory_space: bool,

    /// Bit 2, Bus Master: allow the function to issue DMA.
    pub bus_master: bool,

    /// Bit 3: Special Cycles.
    pub special_cycles: bool,

    /// Bit 4: Memory Write and Invalidate Enable.
    pub mwi_enable: bool,

    /// Bit 5: VGA Palette Snoop.
    pub vga_palette_snoop: bool,

    /// Bit 6: Parity Error Response.
    pub parity_error_response: bool,

    /// Bit 7: Reserved (hardwired to 0 on PCIe).
    #[bits(1)]
    _reserved_7: u8,

    /// Bit 8: SERR# Enable.
    pub serr_enable: bool,

    /// Bit 9: Fast Back-to-Back Enable.
    pub fast_back_to_back: bool,

    /// Bit 10, Interrupt Disable: mask legacy INTx assertion.
    pub interrupt_disable: bool,

    /// Bits 11-15: Reserved.
    #[bits(5)]
    _reserved_11_15: u8,
}

impl PciCommand {
    /// The bits a DMA-capable function needs before it touches memory.
    #[must_use]
    pub const fn dma_enabled(self) -> Self {
        self.with_memory_space(true).with_bus_master(true)
    }

    /// Clears bus mastering only; MMIO stays decodable so the register window
    /// can still be quiesced.
    #[must_use]
    pub const fn dma_disabled(self) -> Self {
        self.with_bus_master(false)
    }

    #[must_use]
    pub const fn is_dma_enabled(self) -> bool {
        self.memory_space() && self.bus_master()
    }
}
