use core::ptr::NonNull;

/// Link stored in the first bytes of every **free** page.
///
/// A free page in memory has the following layout:
///
/// ```text
/// +------------------+----------------------------------+
/// | Run (next link)  |   FREE_JUNK fill                 |
/// +------------------+----------------------------------+
/// ^ page base                                 page base + PAGE_SIZE ^
/// ```
///
/// The link is only meaningful while the page is free. Allocated pages
/// belong to their owner entirely and are never read through a `Run`.
#[repr(C)]
struct Run {
    next: Option<NonNull<Run>>,
}

/// LIFO list of free pages, linked through the pages themselves.
///
/// No bookkeeping memory exists outside the pages: the head pointer is the
/// only state.
///
/// # Invariants
/// - Every linked page lies inside the owning pool and is page-aligned.
/// - A page is linked at most once.
/// - Only accessed while holding the pool's lock.
pub(crate) struct FreeList {
    head: Option<NonNull<Run>>,
}

// Safety: The list is always used under SpinLock; the pages it links are owned by the pool.
unsafe impl Send for FreeList {}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None }
    }

    /// Links `page` in as the new head.
    ///
    /// # Safety
    /// - `page` must be valid for writes of a whole page and aligned for `Run`.
    /// - `page` must not be in use by anyone and not already on the list.
    pub(crate) unsafe fn push(&mut self, page: NonNull<u8>) {
        let run = page.cast::<Run>();
        unsafe {
            run.write(Run { next: self.head });
        }
        self.head = Some(run);
    }

    /// Unlinks and returns the most recently pushed page.
    pub(crate) fn pop(&mut self) -> Option<NonNull<u8>> {
        let run = self.head?;
        // SAFETY: linked pages are free, so their link is initialized and ours.
        self.head = unsafe { run.as_ref().next };
        Some(run.cast())
    }

    /// Number of linked pages, by walking the list.
    pub(crate) fn count(&self) -> usize {
        let mut count = 0;
        let mut current = self.head;
        while let Some(run) = current {
            count += 1;
            // SAFETY: see `pop`.
            current = unsafe { run.as_ref().next };
        }
        count
    }
}
