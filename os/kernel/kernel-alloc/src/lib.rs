//! # Physical Page Allocator
//!
//! Owns every physical page not occupied by the kernel image and hands them
//! out one at a time: to pipes for their ring buffers, and to the memory
//! management layers above for page tables, kernel stacks and user memory.
//!
//! ```text
//! PageAllocator::new(end, PHYSTOP)
//!        │
//!        ▼
//! ┌──────────────┐  head  ┌──────┐  next  ┌──────┐  next  ┌──────┐
//! │ kmem lock    │───────▶│ page │───────▶│ page │───────▶│ page │──▶ None
//! └──────────────┘        └──────┘        └──────┘        └──────┘
//! ```
//!
//! * [`PageAllocator::allocate`] pops the head; `None` means the pool is
//!   exhausted, which is an ordinary condition for the caller to handle.
//! * Releasing (dropping a [`Page`], [`PageAllocator::release`], or the raw
//!   [`PageAllocator::release_addr`]) pushes the page back. Releasing an
//!   address the pool does not manage halts the kernel.
//! * Pages are filled with [`ALLOC_JUNK`](kernel_info::memory::ALLOC_JUNK)
//!   on the way out and [`FREE_JUNK`](kernel_info::memory::FREE_JUNK) on
//!   the way back, so uninitialized reads and use-after-free show up as
//!   recognizable garbage.
//!
//! ```rust
//! use kernel_alloc::PageAllocator;
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! let pool = PageAllocator::new(PhysicalAddress::new(0x8000_0000), PhysicalAddress::new(0x8000_4000));
//! assert_eq!(pool.total_pages(), 4);
//!
//! let page = pool.allocate().expect("pool is fresh");
//! assert_eq!(pool.free_capacity(), 3 * 4096);
//! pool.release(page);
//! assert_eq!(pool.free_capacity(), 4 * 4096);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod free_list;
mod page;
mod pool;

pub use page::Page;
pub use pool::PageAllocator;
