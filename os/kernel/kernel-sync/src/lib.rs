//! # Kernel synchronization primitives
//!
//! * [`SpinLock`]: short critical sections over shared metadata.
//! * [`WaitChannel`]: sleep/wakeup on a condition while holding a spin lock.
//! * [`SleepLock`]: exclusive access that may be held across I/O.
//! * [`SyncOnceCell`]: write-once globals such as the [`sched`] hook.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod sched;
mod sleep_lock;
mod spin_lock;
mod sync_once_cell;
mod wait_channel;

pub use sleep_lock::{SleepLock, SleepLockGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
pub use wait_channel::WaitChannel;
