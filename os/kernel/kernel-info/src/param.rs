//! # Pool Parameters

use crate::memory::PAGE_SIZE;

/// Size of a disk block in bytes.
pub const BSIZE: usize = 1024;

/// Maximum number of blocks any single file-system operation writes.
pub const MAXOPBLOCKS: usize = 10;

/// Number of slots in the block cache.
///
/// Bounds how many blocks can be held at once; running out is fatal.
pub const NBUF: usize = MAXOPBLOCKS * 3;

/// Capacity of a pipe's ring buffer in bytes.
pub const PIPESIZE: usize = 512;

const _: () = {
    assert!(NBUF >= MAXOPBLOCKS);
    // The ring lives inside a single page.
    assert!(PIPESIZE <= PAGE_SIZE);
    assert!(BSIZE.is_power_of_two());
};
