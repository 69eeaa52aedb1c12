//! # Kernel synchronization primitives
//!
//! A single [`Mutex`] type parameterized over its raw lock:
//!
//! | Alias | Raw lock | Use |
//! |-------|----------|-----|
//! | [`SpinMutex`] | [`RawSpin`] | short, rarely contended sections |
//! | [`TicketMutex`] | [`RawTicket`] | FIFO hand-off between many callers |
//!
//! Both constructors are `const`, so the mutexes can back `static` driver state.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod mutex;
mod raw_spin;
mod raw_ticket;

pub use mutex::{Mutex, MutexGuard};
pub use raw_spin::RawSpin;
pub use raw_ticket::RawTicket;

pub type SpinMutex<T> = Mutex<T, RawSpin>;
pub type TicketMutex<T> = Mutex<T, RawTicket>;

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

impl<T> TicketMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawTicket::new(), value)
    }
}

/// Acquire half of a raw lock.
pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
    /// Snapshot of the lock state; racy by nature, for diagnostics only.
    fn raw_is_locked(&self) -> bool;
}

/// Release half of a raw lock.
pub trait RawUnlock {
    /// # Safety
    /// The caller must currently hold the lock.
    unsafe fn raw_unlock(&self);
}
