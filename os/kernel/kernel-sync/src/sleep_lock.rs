use crate::{SpinLock, WaitChannel};
use core::{
    cell::{Cell, UnsafeCell},
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

/// Blocking mutual exclusion that may be held across a suspension.
///
/// Contenders sleep on a [`WaitChannel`] instead of spinning, so a holder
/// can wait on device I/O without burning the CPUs of everyone queued
/// behind it. The internal [`SpinLock`] only protects the held flag.
pub struct SleepLock<T> {
    locked: SpinLock<bool>,
    released: WaitChannel,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `locked`.
unsafe impl<T: Send> Sync for SleepLock<T> {}
unsafe impl<T: Send> Send for SleepLock<T> {}

impl<T> SleepLock<T> {
    pub const fn new(name: &'static str, data: T) -> Self {
        Self {
            locked: SpinLock::named(name, false),
            released: WaitChannel::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, sleeping while another thread holds it.
    pub fn lock(&self) -> SleepLockGuard<'_, T> {
        let mut held = self.locked.lock();
        while *held {
            held = self.released.sleep(held);
        }
        *held = true;
        SleepLockGuard {
            lock: self,
            unsync: PhantomData,
        }
    }

    pub fn try_lock(&self) -> Option<SleepLockGuard<'_, T>> {
        let mut held = self.locked.lock();
        if *held {
            return None;
        }
        *held = true;
        Some(SleepLockGuard {
            lock: self,
            unsync: PhantomData,
        })
    }

    /// Snapshot of the lock state; stale as soon as it returns.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        *self.locked.lock()
    }

    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T> fmt::Debug for SleepLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SleepLock")
            .field("name", &self.locked.name())
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the data of a [`SleepLock`]; unlocks when dropped.
///
/// Sharing a guard between threads shares `&T`, so the guard is only
/// `Sync` when `T` is:
///
/// ```compile_fail
/// use core::cell::Cell;
/// use kernel_sync::SleepLockGuard;
///
/// fn shareable<S: Sync>() {}
/// shareable::<SleepLockGuard<'static, Cell<u64>>>();
/// ```
pub struct SleepLockGuard<'a, T> {
    lock: &'a SleepLock<T>,
    /// Opts out of the auto `Sync` derived from `&SleepLock<T>`.
    unsync: PhantomData<Cell<()>>,
}

// Safety: a shared guard only hands out `&T`.
unsafe impl<T: Sync> Sync for SleepLockGuard<'_, T> {}

impl<T> Deref for SleepLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SleepLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SleepLockGuard<'_, T> {
    fn drop(&mut self) {
        let mut held = self.lock.locked.lock();
        *held = false;
        self.lock.released.wakeup();
    }
}
