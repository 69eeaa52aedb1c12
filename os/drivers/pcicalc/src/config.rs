use kernel_pci::{PAGE_SIZE, PciDeviceId};

/// Devices this driver binds to.
pub const PCICALC_IDS: &[PciDeviceId] = &[PciDeviceId::new(0x1234, 0xCA1C)];

/// Load-time parameters of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Character-device major number.
    pub major: u32,
    /// Character-device and resource owner name.
    pub name: &'static str,
    pub ids: &'static [PciDeviceId],
    /// BAR holding the control registers.
    pub register_bar: u8,
    pub window_len: usize,
    pub dma_len: usize,
    /// Offset of the 64-bit register that receives the buffer's bus address.
    pub address_register: usize,
}

impl ModuleConfig {
    pub const DEFAULT: Self = Self {
        major: 200,
        name: "pcicalculator",
        ids: PCICALC_IDS,
        register_bar: 0,
        window_len: PAGE_SIZE,
        dma_len: PAGE_SIZE,
        address_register: 0,
    };
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
