use crate::{BootError, KernelConfig};
use kernel_alloc::PageAllocator;
use kernel_bio::{BlockCache, BlockDevice};
use kernel_info::memory::PAGE_SIZE;
use kernel_pipe::{PipeError, ReadEnd, WriteEnd};
use log::info;

/// The kernel's shared resource pools.
///
/// Built once by [`Kernel::boot`] and passed by reference to everything
/// that allocates pages, touches disk blocks or creates pipes.
pub struct Kernel<D: BlockDevice> {
    pages: PageAllocator,
    bcache: BlockCache<D>,
}

/// Snapshot of resource usage, laid out for copying to user space.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SysInfo {
    /// Bytes of free physical memory.
    pub free_memory: u64,
    /// Block cache slots currently referenced.
    pub buffers_in_use: u64,
}

impl<D: BlockDevice> Kernel<D> {
    /// Initializes the page allocator, then the block cache on `device`.
    ///
    /// # Errors
    /// Fails if `config` leaves a pool empty.
    pub fn boot(config: KernelConfig, device: D) -> Result<Self, BootError> {
        config.validate()?;

        info!(
            "Initializing physical memory in [{}, {}) ...",
            config.kernel_end, config.phys_top
        );
        let pages = PageAllocator::new(config.kernel_end, config.phys_top);

        info!("Initializing block cache with {} buffers ...", config.nbuf);
        let bcache = BlockCache::new(device, config.nbuf);

        info!(
            "Resource core ready: {} free pages, {} buffers.",
            pages.free_capacity() / PAGE_SIZE as u64,
            bcache.capacity()
        );
        Ok(Self { pages, bcache })
    }

    #[must_use]
    pub const fn pages(&self) -> &PageAllocator {
        &self.pages
    }

    #[must_use]
    pub const fn bcache(&self) -> &BlockCache<D> {
        &self.bcache
    }

    /// Creates a pipe backed by a page from this kernel's pool.
    ///
    /// # Errors
    /// [`PipeError::OutOfMemory`] when no page is free.
    pub fn pipe(&self) -> Result<(ReadEnd<'_>, WriteEnd<'_>), PipeError> {
        kernel_pipe::pipe(&self.pages)
    }

    /// Current resource usage.
    #[must_use]
    pub fn sysinfo(&self) -> SysInfo {
        SysInfo {
            free_memory: self.pages.free_capacity(),
            buffers_in_use: self.bcache.in_use() as u64,
        }
    }
}
