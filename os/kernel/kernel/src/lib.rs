//! # Kernel Resource Core
//!
//! Brings up the pools every other kernel subsystem draws from, in the
//! order they depend on each other:
//!
//! 1. the physical page allocator ([`kernel_alloc`]),
//! 2. the block cache ([`kernel_bio`]) on top of the boot disk,
//!
//! and hands out pipes ([`kernel_pipe`]) whose buffers come from the page
//! pool. [`Kernel::sysinfo`] reports what is left.
//!
//! Blocking waits go through [`sched`]; the embedding kernel installs its
//! scheduler there before the first thread may block.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod config;
mod resources;

pub use config::{BootError, KernelConfig};
pub use kernel_sync::sched;
pub use resources::{Kernel, SysInfo};
