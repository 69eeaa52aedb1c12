//! Copies across the user/kernel boundary.
//!
//! The host kernel implements these over its user-pointer primitives; the
//! slice impls below serve in-kernel callers and tests.

/// A user-memory access faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("user memory access faulted")]
pub struct UserFault;

/// Source of a `write()`: user memory of a fixed declared length.
pub trait UserSliceReader {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the first `dst.len()` bytes of user memory into `dst`.
    ///
    /// # Errors
    /// [`UserFault`] if any byte could not be read.
    fn read_into(&mut self, dst: &mut [u8]) -> Result<(), UserFault>;
}

/// Destination of a `read()`: user memory of a fixed capacity.
pub trait UserSliceWriter {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` to the start of user memory.
    ///
    /// # Errors
    /// [`UserFault`] if any byte could not be written.
    fn write_from(&mut self, src: &[u8]) -> Result<(), UserFault>;
}

impl UserSliceReader for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn read_into(&mut self, dst: &mut [u8]) -> Result<(), UserFault> {
        let src = self.get(..dst.len()).ok_or(UserFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserSliceWriter for &mut [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn write_from(&mut self, src: &[u8]) -> Result<(), UserFault> {
        let dst = self.get_mut(..src.len()).ok_or(UserFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}
