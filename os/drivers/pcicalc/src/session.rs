use crate::PciCalcDriver;
use crate::compute;
use crate::error::DriverError;
use crate::request::ParsedRequest;
use crate::uaccess::{UserSliceReader, UserSliceWriter};
use alloc::vec::Vec;
use core::sync::atomic::Ordering;
use kernel_pci::PciPlatform;
use log::{debug, warn};

/// One open file of the character device.
///
/// Holds a module reference for its whole life; the reference is dropped
/// exactly once, by [`release`](Self::release) or by `Drop`.
pub struct Session<'d, 'p, P: PciPlatform + ?Sized> {
    driver: &'d PciCalcDriver<'p, P>,
}

impl<'p, P: PciPlatform + ?Sized> PciCalcDriver<'p, P> {
    /// `open()`. Never fails.
    #[must_use]
    pub fn open(&self) -> Session<'_, 'p, P> {
        let refs = self.refs.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("{}: open, {refs} references", self.config.name);
        Session { driver: self }
    }

    /// Number of open sessions.
    #[must_use]
    pub fn module_refs(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }
}

impl<P: PciPlatform + ?Sized> Session<'_, '_, P> {
    /// `read()`: copy up to `user.len()` bytes of the stored result starting
    /// at `*offset` and advance `*offset` by the number copied.
    ///
    /// At or past the end of the result, and for zero-length reads, user
    /// memory is not touched and 0 is returned.
    ///
    /// # Errors
    /// [`DriverError::FaultCopyingUserData`]; `*offset` is left untouched.
    pub fn read<W>(&self, user: &mut W, offset: &mut usize) -> Result<usize, DriverError>
    where
        W: UserSliceWriter + ?Sized,
    {
        let store = self.driver.store.lock();
        let chunk = store.window(*offset, user.len());
        if chunk.is_empty() {
            debug!(
                "{}: read at offset {} of {} bytes, end of result",
                self.driver.config.name,
                *offset,
                store.len()
            );
            return Ok(0);
        }
        user.write_from(chunk)?;
        *offset += chunk.len();
        debug!(
            "{}: read {} of {} bytes, offset now {}",
            self.driver.config.name,
            chunk.len(),
            store.len(),
            *offset
        );
        Ok(chunk.len())
    }

    /// `write()`: parse an `A+B` request and store the sum.
    ///
    /// Returns the full declared length on success. On failure the stored
    /// result is unchanged.
    ///
    /// # Errors
    /// [`DriverError::AllocationFailure`] if no staging buffer could be
    /// allocated, [`DriverError::FaultCopyingUserData`] if the copy faults,
    /// [`DriverError::InvalidRequestSyntax`] if the request does not parse.
    pub fn write<R>(&self, user: &mut R) -> Result<usize, DriverError>
    where
        R: UserSliceReader + ?Sized,
    {
        let len = user.len();
        debug!("{}: write, length = {len}", self.driver.config.name);
        let mut request = Vec::new();
        request
            .try_reserve_exact(len)
            .map_err(|_| DriverError::AllocationFailure)?;
        request.resize(len, 0);
        if len > 0 {
            user.read_into(&mut request)?;
        }

        let parsed = ParsedRequest::parse(&request).map_err(|e| {
            warn!("{}: rejected {len}-byte request: {e}", self.driver.config.name);
            DriverError::from(e)
        })?;

        let sum = compute::apply(&parsed, &mut self.driver.store.lock());
        debug!(
            "{}: {} + {} = {sum}",
            self.driver.config.name, parsed.operand_a, parsed.operand_b
        );
        Ok(len)
    }

    /// `release()`.
    pub fn release(self) {}
}

impl<P: PciPlatform + ?Sized> Drop for Session<'_, '_, P> {
    fn drop(&mut self) {
        let refs = self.driver.refs.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!("{}: release, {refs} references", self.driver.config.name);
    }
}
