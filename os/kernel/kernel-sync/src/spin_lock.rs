use core::{
    cell::{Cell, UnsafeCell},
    fmt,
    hint::spin_loop,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// Short-critical-section lock.
///
/// Held only for bounded metadata updates; never across device I/O or a
/// suspension point. Suspending while logically holding a `SpinLock` goes
/// through [`WaitChannel::sleep`](crate::WaitChannel::sleep), which gives the
/// lock up for the duration of the wait.
pub struct SpinLock<T> {
    /// Name reported in diagnostics.
    name: &'static str,
    /// lock state
    /// * `false`: unlocked
    /// * `true`: locked
    locked: AtomicBool,
    inner: UnsafeCell<T>,
}

// Safety: mutual exclusion; only T: Send may cross threads.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(inner: T) -> Self {
        Self::named("anon", inner)
    }

    pub const fn named(name: &'static str, inner: T) -> Self {
        Self {
            name,
            locked: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Snapshot of the lock state; stale as soon as it returns.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Try once; returns immediately.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SpinLockGuard {
                lock: self,
                unsync: PhantomData,
            })
        } else {
            None
        }
    }

    /// Spin until acquired (TATAS), then return a guard.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Spin on a plain load until the holder lets go.
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
        SpinLockGuard {
            lock: self,
            unsync: PhantomData,
        }
    }

    /// Closure convenience, built on the guard.
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.lock();
        f(&mut g)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("name", &self.name)
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the data of a [`SpinLock`]; unlocks when dropped.
///
/// Sharing a guard between threads shares `&T`, so the guard is only
/// `Sync` when `T` is:
///
/// ```compile_fail
/// use core::cell::Cell;
/// use kernel_sync::SpinLockGuard;
///
/// fn shareable<S: Sync>() {}
/// shareable::<SpinLockGuard<'static, Cell<u64>>>();
/// ```
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    /// Opts out of the auto `Sync` derived from `&SpinLock<T>`.
    unsync: PhantomData<Cell<()>>,
}

// Safety: a shared guard only hands out `&T`.
unsafe impl<T: Sync> Sync for SpinLockGuard<'_, T> {}

impl<'a, T> SpinLockGuard<'a, T> {
    /// The lock this guard holds; used to re-acquire it after a wait.
    #[inline]
    pub(crate) const fn source(guard: &Self) -> &'a SpinLock<T> {
        guard.lock
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        // Release publishes the critical section.
        self.lock.locked.store(false, Ordering::Release);
    }
}
