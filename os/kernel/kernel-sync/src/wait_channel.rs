use crate::{SpinLockGuard, sched};
use core::sync::atomic::{AtomicUsize, Ordering};

/// A condition threads can sleep on while logically holding a [`SpinLock`].
///
/// Each wait reason gets its own channel (e.g. "pipe has data" and "pipe
/// has room" are two channels), so a wakeup only disturbs the threads that
/// care about it.
///
/// A sleeper registers by sampling the channel's generation while it still
/// holds the lock; any [`wakeup`](Self::wakeup) issued after that point
/// bumps the generation and ends the wait. A wakeup can therefore not slip
/// in between releasing the lock and starting to wait.
///
/// Waking is broadcast and may be spurious: callers re-check their
/// condition in a loop after every [`sleep`](Self::sleep).
///
/// [`SpinLock`]: crate::SpinLock
#[derive(Debug, Default)]
pub struct WaitChannel {
    generation: AtomicUsize,
}

impl WaitChannel {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: AtomicUsize::new(0),
        }
    }

    /// Atomically releases `guard`, waits for a wakeup, then re-acquires the
    /// same lock and returns the new guard.
    #[must_use = "the re-acquired lock is released when the guard is dropped"]
    pub fn sleep<'a, T>(&self, guard: SpinLockGuard<'a, T>) -> SpinLockGuard<'a, T> {
        self.sleep_unless(guard, || false)
    }

    /// Like [`sleep`](Self::sleep), but also returns once `interrupted`
    /// reports true, e.g. because the sleeping thread has been killed.
    ///
    /// `interrupted` is polled without the lock held.
    #[must_use = "the re-acquired lock is released when the guard is dropped"]
    pub fn sleep_unless<'a, T>(
        &self,
        guard: SpinLockGuard<'a, T>,
        interrupted: impl Fn() -> bool,
    ) -> SpinLockGuard<'a, T> {
        let observed = self.generation.load(Ordering::Acquire);
        let lock = SpinLockGuard::source(&guard);
        drop(guard);

        while self.generation.load(Ordering::Acquire) == observed && !interrupted() {
            sched::yield_now();
        }

        lock.lock()
    }

    /// Wakes every thread currently sleeping on this channel.
    #[inline]
    pub fn wakeup(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}
