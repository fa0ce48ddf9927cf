use crate::Page;
use crate::free_list::FreeList;
use alloc::boxed::Box;
use core::cell::UnsafeCell;
use core::fmt;
use core::ptr::{self, NonNull};
use kernel_info::memory::{ALLOC_JUNK, FREE_JUNK, PAGE_SIZE, page_round_up};
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::SpinLock;
use log::{debug, info};

const PAGE_BYTES: u64 = PAGE_SIZE as u64;

/// Backing storage of one physical page.
#[repr(C, align(4096))]
struct Frame(UnsafeCell<[u8; PAGE_SIZE]>);

impl Frame {
    const fn new() -> Self {
        Self(UnsafeCell::new([0; PAGE_SIZE]))
    }
}

/// Pool of every physical page between the end of the kernel image and the
/// top of RAM.
///
/// Hands out whole [`PAGE_SIZE`] pages in LIFO order: the page released last
/// is the next one allocated. Free pages are chained through their own
/// first bytes, so the pool needs no memory beyond the pages themselves and
/// a lock-protected head pointer.
///
/// The pool is a kernel-lifetime object: it is built once during boot and
/// handed to the subsystems that need pages by reference. Every [`Page`]
/// borrows the pool it came from.
pub struct PageAllocator {
    /// First managed page; everything below belongs to the kernel image.
    start: PhysicalAddress,
    /// One past the last managed page.
    end: PhysicalAddress,
    frames: Box<[Frame]>,
    free: SpinLock<FreeList>,
}

// Safety: frame contents are only touched by the page's owner, or under
// `free` while the page is on the list.
unsafe impl Sync for PageAllocator {}
unsafe impl Send for PageAllocator {}

impl PageAllocator {
    /// Builds the pool over every whole page in `[kernel_end, phys_top)`.
    ///
    /// `kernel_end` is rounded up to a page boundary; a partial page at
    /// `phys_top` is ignored. Pages are released into the pool in ascending
    /// address order.
    #[must_use]
    pub fn new(kernel_end: PhysicalAddress, phys_top: PhysicalAddress) -> Self {
        let start = PhysicalAddress::new(page_round_up(kernel_end.as_u64()));
        let pages = phys_top.offset_from(start).map_or(0, |bytes| bytes / PAGE_BYTES);
        let end = start + pages * PAGE_BYTES;
        let frames = (0..pages).map(|_| Frame::new()).collect::<Box<[Frame]>>();

        let pool = Self {
            start,
            end,
            frames,
            free: SpinLock::named("kmem", FreeList::new()),
        };

        for frame in &*pool.frames {
            // SAFETY: freshly created, unreferenced and not yet linked.
            unsafe { pool.reclaim(NonNull::new_unchecked(frame.0.get().cast())) }
        }

        info!("kinit: {pages} pages in [{start}, {end})");
        pool
    }

    /// Takes a page off the head of the pool.
    ///
    /// Returns `None` when no page is left; callers decide whether that
    /// fails their own operation.
    pub fn allocate(&self) -> Option<Page<'_>> {
        let Some(ptr) = self.free.lock().pop() else {
            debug!("kalloc: out of pages");
            return None;
        };

        // SAFETY: unlinked, so the page is exclusively ours now.
        unsafe { ptr::write_bytes(ptr.as_ptr(), ALLOC_JUNK, PAGE_SIZE) };

        Some(Page {
            pool: self,
            ptr: ptr.cast(),
            addr: self.addr_of(ptr),
        })
    }

    /// Returns `page` to the head of the pool.
    ///
    /// Equivalent to dropping the page; spelled out for call sites where the
    /// release is the point.
    ///
    /// # Panics
    /// If `page` was allocated from a different pool.
    pub fn release(&self, page: Page<'_>) {
        assert!(
            ptr::eq(page.pool, self),
            "kfree: {:?} belongs to another pool",
            page.addr
        );
        drop(page);
    }

    /// Returns the page at `pa` to the pool.
    ///
    /// # Panics
    /// Halts on an address that is not page-aligned, lies below the end of
    /// the kernel image, or lies past the top of managed memory. Such an
    /// address means kernel state is corrupted.
    ///
    /// # Safety
    /// `pa` must come from [`Page::into_addr`] on a page of this pool, must
    /// not have been released since, and must not be accessed afterwards.
    pub unsafe fn release_addr(&self, pa: PhysicalAddress) {
        let ptr = self.frame_ptr(pa);
        // SAFETY: caller hands over an allocated page of this pool.
        unsafe { self.reclaim(ptr) }
    }

    /// Re-wraps an address produced by [`Page::into_addr`] as an owned page.
    ///
    /// # Panics
    /// On the same invalid addresses as [`release_addr`](Self::release_addr).
    ///
    /// # Safety
    /// `pa` must come from [`Page::into_addr`] on a page of this pool and
    /// must not have been released or re-wrapped since.
    #[must_use]
    pub unsafe fn page_from_addr(&self, pa: PhysicalAddress) -> Page<'_> {
        let ptr = self.frame_ptr(pa);
        Page {
            pool: self,
            ptr: ptr.cast(),
            addr: pa,
        }
    }

    /// Free bytes, by walking the pool.
    ///
    /// Diagnostics only: the walk is linear in the number of free pages.
    #[must_use]
    pub fn free_capacity(&self) -> u64 {
        let pages = self.free.lock().count() as u64;
        pages * PAGE_BYTES
    }

    /// Number of pages the pool manages, free or not.
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.frames.len()
    }

    /// The managed physical range `[start, end)`.
    #[must_use]
    pub const fn range(&self) -> (PhysicalAddress, PhysicalAddress) {
        (self.start, self.end)
    }

    /// Whether `pa` is the base of a page managed by this pool.
    #[must_use]
    pub const fn manages(&self, pa: PhysicalAddress) -> bool {
        pa.is_aligned(PAGE_BYTES)
            && pa.as_u64() >= self.start.as_u64()
            && pa.as_u64() < self.end.as_u64()
    }

    /// Fills the page with junk and links it in as the new head.
    ///
    /// # Safety
    /// `ptr` must be the base of a frame of this pool that nobody references
    /// and that is not on the free list.
    pub(crate) unsafe fn reclaim(&self, ptr: NonNull<u8>) {
        // Fill with junk to catch dangling refs.
        unsafe { ptr::write_bytes(ptr.as_ptr(), FREE_JUNK, PAGE_SIZE) };
        let mut free = self.free.lock();
        unsafe { free.push(ptr) };
    }

    /// Validates `pa` and translates it to its backing frame.
    fn frame_ptr(&self, pa: PhysicalAddress) -> NonNull<u8> {
        assert!(
            self.manages(pa),
            "kfree: invalid page {pa:?}, pool is [{}, {})",
            self.start,
            self.end
        );
        #[allow(clippy::cast_possible_truncation)]
        let index = ((pa.as_u64() - self.start.as_u64()) / PAGE_BYTES) as usize;
        // SAFETY: UnsafeCell::get never returns null.
        unsafe { NonNull::new_unchecked(self.frames[index].0.get().cast()) }
    }

    fn addr_of(&self, ptr: NonNull<u8>) -> PhysicalAddress {
        let base = self.frames.as_ptr() as usize;
        let offset = ptr.as_ptr() as usize - base;
        self.start + offset as u64
    }
}

impl fmt::Debug for PageAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAllocator")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("pages", &self.frames.len())
            .finish_non_exhaustive()
    }
}
