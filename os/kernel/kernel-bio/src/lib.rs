//! # Block Cache
//!
//! Fixed pool of in-memory copies of disk blocks sitting between the file
//! system and the disk driver. It cuts repeated disk reads and is the one
//! place where access to a given block is serialized: at most one slot maps
//! a `(dev, blockno)` pair, and at most one thread holds that slot.
//!
//! ## Interface
//!
//! * [`BlockCache::read`] returns a locked [`Buf`] holding the block.
//! * After changing the payload, [`BlockCache::write`] pushes it to disk.
//! * [`BlockCache::release`] (or dropping the [`Buf`]) gives it back.
//! * Hold buffers only as long as needed; other threads wanting the same
//!   block sleep until then, and the pool is small.
//! * [`BlockCache::pin`] / [`BlockCache::unpin`] keep a slot from being
//!   recycled without holding it, e.g. while a block sits in a log.
//!
//! ```rust
//! use kernel_bio::{BlockCache, BlockData, BlockDevice, BlockId};
//!
//! struct Zeroes;
//!
//! impl BlockDevice for Zeroes {
//!     fn read_block(&self, _: BlockId, data: &mut BlockData) {
//!         data.fill(0);
//!     }
//!     fn write_block(&self, _: BlockId, _: &BlockData) {}
//! }
//!
//! let cache = BlockCache::new(Zeroes, 4);
//! let mut buf = cache.read(1, 42);
//! buf[0] = 0xff;
//! cache.write(&buf);
//! cache.release(buf);
//! assert!(cache.is_cached(1, 42));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod cache;
mod device;
mod lru;

pub use cache::{BlockCache, Buf, SlotId};
pub use device::{BlockData, BlockDevice, BlockId};
