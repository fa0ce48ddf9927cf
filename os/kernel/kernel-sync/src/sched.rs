//! Hook into the process scheduler.
//!
//! Waiters in this crate never park themselves; they hand the CPU back to
//! whatever scheduler the kernel installed. Before one is installed (early
//! boot, single hart) they relax with [`spin_loop`].

use crate::SyncOnceCell;
use core::hint::spin_loop;

/// The scheduler operations the synchronization primitives rely on.
pub trait Scheduler: Sync {
    /// Gives up the CPU so another runnable thread can make progress.
    fn yield_now(&self);
}

static SCHEDULER: SyncOnceCell<&'static dyn Scheduler> = SyncOnceCell::new();

/// Installs the kernel scheduler.
///
/// Returns `false` if a scheduler was already installed; the first one
/// stays in effect for the lifetime of the kernel.
pub fn install(scheduler: &'static dyn Scheduler) -> bool {
    SCHEDULER.set(scheduler).is_ok()
}

/// Whether a scheduler has been installed.
#[must_use]
pub fn is_installed() -> bool {
    SCHEDULER.get().is_some()
}

/// Yields through the installed scheduler, or spins once if there is none.
#[inline]
pub fn yield_now() {
    match SCHEDULER.get() {
        Some(scheduler) => scheduler.yield_now(),
        None => spin_loop(),
    }
}
