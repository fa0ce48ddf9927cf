use core::fmt;
use kernel_info::param::BSIZE;

/// Payload of one disk block.
pub type BlockData = [u8; BSIZE];

/// A block on a device: the cache key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockId {
    pub dev: u32,
    pub blockno: u32,
}

impl BlockId {
    #[inline]
    #[must_use]
    pub const fn new(dev: u32, blockno: u32) -> Self {
        Self { dev, blockno }
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dev, self.blockno)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The disk driver underneath the cache.
///
/// Both calls may suspend the calling thread until the transfer completes.
/// The cache only calls them while holding the slot's sleep lock and never
/// while holding its own spin lock.
pub trait BlockDevice {
    /// Fills `data` with the on-disk contents of `block`.
    fn read_block(&self, block: BlockId, data: &mut BlockData);

    /// Writes `data` to `block` on disk.
    fn write_block(&self, block: BlockId, data: &BlockData);
}

impl<D: BlockDevice + ?Sized> BlockDevice for &D {
    fn read_block(&self, block: BlockId, data: &mut BlockData) {
        (**self).read_block(block, data);
    }

    fn write_block(&self, block: BlockId, data: &BlockData) {
        (**self).write_block(block, data);
    }
}
