//! # Pipes
//!
//! A pipe is a bounded byte channel with one read end and one write end.
//! The bytes live in a [`PIPESIZE`](kernel_info::param::PIPESIZE)-byte ring
//! at the start of a page borrowed from the [`PageAllocator`]:
//!
//! ```text
//!            nread % 512          nwrite % 512
//!                 │                    │
//!  ┌──────────────▼────────────────────▼─────────────┐
//!  │              │ buffered bytes     │            │
//!  └─────────────────────────────────────────────────┘
//!   0 ≤ nwrite - nread ≤ 512
//! ```
//!
//! * Writers block while the ring is full, readers while it is empty and
//!   the write end is still open.
//! * Closing the write end lets readers drain the rest and then see end of
//!   stream (`Ok(0)`). Closing the read end fails pending and future
//!   writes with [`PipeError::BrokenPipe`].
//! * The page goes back to the pool once both ends are closed.
//!
//! User memory is reached only through [`UserSpace`].
//!
//! ```rust
//! use kernel_alloc::PageAllocator;
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_pipe::{CopyFault, UserSpace, pipe};
//!
//! struct Flat(std::cell::RefCell<Vec<u8>>);
//!
//! impl UserSpace for Flat {
//!     fn killed(&self) -> bool { false }
//!     fn copy_in(&self, dst: &mut [u8], src: VirtualAddress) -> Result<(), CopyFault> {
//!         let at = src.as_u64() as usize;
//!         dst.copy_from_slice(&self.0.borrow()[at..at + dst.len()]);
//!         Ok(())
//!     }
//!     fn copy_out(&self, dst: VirtualAddress, src: &[u8]) -> Result<(), CopyFault> {
//!         let at = dst.as_u64() as usize;
//!         self.0.borrow_mut()[at..at + src.len()].copy_from_slice(src);
//!         Ok(())
//!     }
//! }
//!
//! let pool = PageAllocator::new(PhysicalAddress::new(0x8000_0000), PhysicalAddress::new(0x8000_2000));
//! let (rx, tx) = pipe(&pool).unwrap();
//!
//! let proc = Flat(std::cell::RefCell::new(b"hello\0\0\0\0\0".to_vec()));
//! assert_eq!(tx.write(&proc, VirtualAddress::new(0), 5), Ok(5));
//! assert_eq!(rx.read(&proc, VirtualAddress::new(5), 5), Ok(5));
//! assert_eq!(&proc.0.borrow()[5..], b"hello");
//! ```
//!
//! [`PageAllocator`]: kernel_alloc::PageAllocator

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

mod error;
mod pipe;
mod user;

pub use error::PipeError;
pub use pipe::{ReadEnd, WriteEnd, pipe};
pub use user::{CopyFault, UserSpace};
