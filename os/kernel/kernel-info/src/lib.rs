//! # Kernel Configuration
//!
//! Compile-time constants shared by the kernel's resource managers: the
//! physical memory layout handed to the page allocator and the sizing
//! parameters of the block cache and pipes.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! KERNBASE    ┌─────────────────────────────────┐ 0x8000_0000
//!             │       Kernel Image              │
//!             │   (Text, Data, BSS)             │
//! end         ├─────────────────────────────────┤ (linker symbol)
//!             │    Available RAM                │
//!             │  (Managed by the page pool)     │
//! PHYSTOP     └─────────────────────────────────┘ KERNBASE + 128 MiB
//! ```
//!
//! Every whole page between the end of the kernel image and
//! [`PHYSTOP`](memory::PHYSTOP)
//! belongs to the page allocator; nothing below the end of the image may
//! ever be handed back to it.
//!
//! ## Modules
//!
//! * [`memory`]: page size, layout bounds and debug fill patterns.
//! * [`param`]: pool sizes for the block cache and pipe buffers.
//!
//! All values are `const` and checked with compile-time assertions, so a
//! misconfigured build fails instead of booting into corrupted pools.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
pub mod param;
