//! Interrupt-safe shared ownership.

use core::cell::RefCell;

use critical_section::Mutex;

/// State touched from both thread and interrupt context.
///
/// Every access runs inside a critical section, so a completion interrupt
/// never observes a half-updated request slot or power state.
pub struct Shared<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Runs `f` with exclusive access to the value.
    ///
    /// Must not be re-entered from inside `f`; callbacks that need the value
    /// again should run after the lock is released.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_grants_mutable_access() {
        let shared = Shared::new(3_u8);
        shared.lock(|value| *value += 1);
        assert_eq!(shared.lock(|value| *value), 4);
        assert_eq!(shared.into_inner(), 4);
    }
}
