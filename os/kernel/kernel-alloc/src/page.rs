use crate::PageAllocator;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::PhysicalAddress;

/// An allocated physical page, owned by the holder.
///
/// Dropping the handle returns the page to the pool it came from, so a page
/// is released exactly once by construction. Code that has to park a page
/// as a bare address (page-table entries, for example) converts with
/// [`Page::into_addr`] and later hands it back through
/// [`PageAllocator::release_addr`] or [`PageAllocator::page_from_addr`].
///
/// Contents are [`ALLOC_JUNK`](kernel_info::memory::ALLOC_JUNK) on
/// allocation, not zero.
pub struct Page<'a> {
    pub(crate) pool: &'a PageAllocator,
    pub(crate) ptr: NonNull<[u8; PAGE_SIZE]>,
    pub(crate) addr: PhysicalAddress,
}

// Safety: the page is exclusively owned by this handle.
unsafe impl Send for Page<'_> {}
unsafe impl Sync for Page<'_> {}

impl Page<'_> {
    /// Physical address of the first byte.
    #[inline]
    #[must_use]
    pub const fn addr(&self) -> PhysicalAddress {
        self.addr
    }

    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr().cast()
    }

    /// Gives up ownership without releasing the page.
    ///
    /// The page stays allocated until passed back to the pool.
    #[must_use = "the page is leaked unless the address is released later"]
    pub fn into_addr(self) -> PhysicalAddress {
        ManuallyDrop::new(self).addr
    }
}

impl Deref for Page<'_> {
    type Target = [u8; PAGE_SIZE];

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: the handle owns the page.
        unsafe { self.ptr.as_ref() }
    }
}

impl DerefMut for Page<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the handle owns the page.
        unsafe { self.ptr.as_mut() }
    }
}

impl Drop for Page<'_> {
    fn drop(&mut self) {
        // SAFETY: an owned page is allocated and nobody else references it.
        unsafe { self.pool.reclaim(self.ptr.cast()) }
    }
}

impl fmt::Debug for Page<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Page").field(&self.addr).finish()
    }
}
