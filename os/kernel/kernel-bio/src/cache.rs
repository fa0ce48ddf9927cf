use crate::lru::Lru;
use crate::{BlockData, BlockDevice, BlockId};
use alloc::boxed::Box;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_info::param::{BSIZE, NBUF};
use kernel_sync::{SleepLock, SleepLockGuard, SpinLock};
use log::{info, trace};

/// Index of a slot in the cache's fixed pool.
///
/// Used to pin a slot beyond the lifetime of the [`Buf`] it came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SlotId(usize);

impl SlotId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Payload half of a slot; the bookkeeping half lives in the [`Lru`].
struct Slot {
    /// Whether `data` holds the block's disk contents.
    valid: AtomicBool,
    data: SleepLock<BlockData>,
}

/// Bounded cache of disk blocks.
///
/// A fixed pool of slots, each able to hold one block. Every slot has two
/// independent pieces of state:
///
/// * a reference count plus its `(dev, blockno)` identity and recency-list
///   position, all behind the cache-wide spin lock, and
/// * the payload behind a per-slot sleep lock, which a holder keeps across
///   disk I/O.
///
/// Splitting the two lets lookups and releases of other slots proceed while
/// one thread waits on a slow device for a particular block.
///
/// Slots are recycled in least-recently-released order. Running out of
/// unreferenced slots halts the kernel: the pool is sized so that correct
/// callers never hold that many blocks at once.
pub struct BlockCache<D> {
    device: D,
    lru: SpinLock<Lru>,
    slots: Box<[Slot]>,
}

impl<D: BlockDevice> BlockCache<D> {
    /// Creates a cache of `nbuf` slots in front of `device`.
    ///
    /// # Panics
    /// If `nbuf` is zero.
    #[must_use]
    pub fn new(device: D, nbuf: usize) -> Self {
        assert!(nbuf > 0, "binit: cache needs at least one slot");
        let slots = (0..nbuf)
            .map(|_| Slot {
                valid: AtomicBool::new(false),
                data: SleepLock::new("buffer", [0; BSIZE]),
            })
            .collect();

        info!("binit: {nbuf} slots of {BSIZE} bytes");
        Self {
            device,
            lru: SpinLock::named("bcache", Lru::new(nbuf)),
            slots,
        }
    }

    /// Creates a cache of [`NBUF`] slots.
    #[must_use]
    pub fn with_default_size(device: D) -> Self {
        Self::new(device, NBUF)
    }

    /// Returns the slot for `(dev, blockno)`, exclusively locked.
    ///
    /// A cached block only gains a reference (its recency is untouched);
    /// the call then sleeps until the current holder releases it. An
    /// uncached block takes over the least recently used unreferenced slot,
    /// which comes back invalid: its payload is stale until read.
    ///
    /// # Panics
    /// If every slot is referenced.
    pub fn acquire(&self, dev: u32, blockno: u32) -> Buf<'_, D> {
        let block = BlockId::new(dev, blockno);
        let mut lru = self.lru.lock();

        let index = if let Some(index) = lru.find(block) {
            lru.node_mut(index).refcnt += 1;
            index
        } else if let Some(index) = lru.least_recent_unused() {
            let node = lru.node_mut(index);
            trace!("bget: slot {index} {:?} -> {block}", node.block);
            node.block = Some(block);
            node.refcnt = 1;
            self.slots[index].valid.store(false, Ordering::Release);
            index
        } else {
            drop(lru);
            panic!("bget: no buffers");
        };
        drop(lru);

        let data = self.slots[index].data.lock();
        Buf {
            cache: self,
            slot: SlotId(index),
            block,
            data: Some(data),
        }
    }

    /// Returns the slot for `(dev, blockno)` with the block's contents,
    /// exclusively locked.
    ///
    /// # Panics
    /// If every slot is referenced.
    pub fn read(&self, dev: u32, blockno: u32) -> Buf<'_, D> {
        let mut buf = self.acquire(dev, blockno);
        let slot = &self.slots[buf.slot.0];
        if !slot.valid.load(Ordering::Acquire) {
            trace!("bread: loading {}", buf.block);
            self.device.read_block(buf.block, &mut buf);
            slot.valid.store(true, Ordering::Release);
        }
        buf
    }

    /// Writes the buffer's payload through to disk.
    ///
    /// # Panics
    /// If `buf` is not held from this cache.
    pub fn write(&self, buf: &Buf<'_, D>) {
        assert!(
            ptr::eq(buf.cache, self),
            "bwrite: {} not held from this cache",
            buf.block
        );
        trace!("bwrite: {}", buf.block);
        self.device.write_block(buf.block, buf);
    }

    /// Gives up exclusive access, then the reference.
    ///
    /// When the last reference goes, the slot becomes the most recently
    /// used one: found first by lookups, recycled last. Dropping a [`Buf`]
    /// does the same.
    ///
    /// # Panics
    /// If `buf` is not held from this cache.
    pub fn release(&self, buf: Buf<'_, D>) {
        assert!(
            ptr::eq(buf.cache, self),
            "brelse: {} not held from this cache",
            buf.block
        );
        drop(buf);
    }

    /// Adds a reference to the buffer's slot so it cannot be recycled after
    /// the buffer is released. Exclusive access is not affected.
    ///
    /// # Panics
    /// If `buf` is not held from this cache.
    pub fn pin(&self, buf: &Buf<'_, D>) -> SlotId {
        assert!(
            ptr::eq(buf.cache, self),
            "bpin: {} not held from this cache",
            buf.block
        );
        self.lru.lock().node_mut(buf.slot.0).refcnt += 1;
        buf.slot
    }

    /// Drops a reference taken by [`pin`](Self::pin).
    ///
    /// Unlike a release, this leaves the slot's recency untouched.
    ///
    /// # Panics
    /// If the slot has no references left to drop.
    pub fn unpin(&self, slot: SlotId) {
        let mut lru = self.lru.lock();
        let node = lru.node_mut(slot.0);
        let Some(refcnt) = node.refcnt.checked_sub(1) else {
            drop(lru);
            panic!("bunpin: slot {} has no references", slot.0);
        };
        node.refcnt = refcnt;
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots with at least one reference.
    #[must_use]
    pub fn in_use(&self) -> usize {
        let lru = self.lru.lock();
        lru.iter_mru().filter(|&i| lru.node(i).refcnt > 0).count()
    }

    /// Whether a slot currently maps `(dev, blockno)`; takes no reference.
    #[must_use]
    pub fn is_cached(&self, dev: u32, blockno: u32) -> bool {
        self.lru.lock().find(BlockId::new(dev, blockno)).is_some()
    }

    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Drops one reference; the last one moves the slot to the front.
    fn unref(&self, slot: SlotId) {
        let mut lru = self.lru.lock();
        let node = lru.node_mut(slot.0);
        debug_assert!(node.refcnt > 0, "brelse: slot {} not referenced", slot.0);
        node.refcnt -= 1;
        if node.refcnt == 0 {
            lru.move_to_front(slot.0);
        }
    }
}

impl<D> fmt::Debug for BlockCache<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockCache")
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

/// An exclusively held cache slot.
///
/// Dereferences to the block payload. Dropping it is a
/// [`BlockCache::release`].
pub struct Buf<'a, D: BlockDevice> {
    cache: &'a BlockCache<D>,
    slot: SlotId,
    block: BlockId,
    /// Always `Some` until dropped; taken first so the sleep lock is free
    /// before the reference goes.
    data: Option<SleepLockGuard<'a, BlockData>>,
}

impl<D: BlockDevice> Buf<'_, D> {
    #[inline]
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    #[inline]
    #[must_use]
    pub const fn dev(&self) -> u32 {
        self.block.dev
    }

    #[inline]
    #[must_use]
    pub const fn blockno(&self) -> u32 {
        self.block.blockno
    }

    #[inline]
    #[must_use]
    pub const fn slot(&self) -> SlotId {
        self.slot
    }
}

impl<D: BlockDevice> Deref for Buf<'_, D> {
    type Target = BlockData;

    fn deref(&self) -> &BlockData {
        match &self.data {
            Some(guard) => &**guard,
            None => unreachable!("buffer used after release"),
        }
    }
}

impl<D: BlockDevice> DerefMut for Buf<'_, D> {
    fn deref_mut(&mut self) -> &mut BlockData {
        match &mut self.data {
            Some(guard) => &mut **guard,
            None => unreachable!("buffer used after release"),
        }
    }
}

impl<D: BlockDevice> Drop for Buf<'_, D> {
    fn drop(&mut self) {
        self.data.take();
        self.cache.unref(self.slot);
    }
}

impl<D: BlockDevice> fmt::Debug for Buf<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buf")
            .field("block", &self.block)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}
