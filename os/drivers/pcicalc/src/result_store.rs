use crate::error::DriverError;
use alloc::boxed::Box;
use alloc::vec::Vec;
use kernel_pci::PAGE_SIZE;

pub const RESULT_CAPACITY: usize = PAGE_SIZE;

/// What a read returns before the first successful write.
pub const PLACEHOLDER: &[u8] = b"zero\n";

/// The last computed result, as the text a reader gets back.
///
/// `as_bytes()` is always one complete newline-terminated line.
pub struct ResultBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl ResultBuffer {
    /// Allocate the page-sized buffer and fill in [`PLACEHOLDER`].
    ///
    /// # Errors
    /// [`DriverError::AllocationFailure`] if the page cannot be allocated.
    pub fn try_new() -> Result<Self, DriverError> {
        let mut data = Vec::new();
        data.try_reserve_exact(RESULT_CAPACITY)
            .map_err(|_| DriverError::AllocationFailure)?;
        data.resize(RESULT_CAPACITY, 0);
        let mut buffer = Self {
            data: data.into_boxed_slice(),
            len: 0,
        };
        buffer.replace(PLACEHOLDER);
        Ok(buffer)
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
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Swap in a new line of text; the length becomes exactly `text.len()`.
    pub(crate) fn replace(&mut self, text: &[u8]) {
        debug_assert!(text.ends_with(b"\n"));
        let len = text.len().min(self.data.len());
        self.data[..len].copy_from_slice(&text[..len]);
        self.len = len;
    }

    /// Up to `max` bytes starting at `offset`; empty once `offset` reaches the end.
    #[must_use]
    pub fn window(&self, offset: usize, max: usize) -> &[u8] {
        let rest = self.as_bytes().get(offset..).unwrap_or_default();
        &rest[..rest.len().min(max)]
    }
}
