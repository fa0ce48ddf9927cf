use kernel_info::memory::{KERNBASE, PAGE_SIZE, PHYSTOP};
use kernel_info::param::NBUF;
use kernel_memory_addresses::PhysicalAddress;

/// Boot-time sizing of the resource pools.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// First byte past the kernel image. Page allocation starts at the next
    /// page boundary.
    pub kernel_end: PhysicalAddress,
    /// One past the last byte of usable RAM.
    pub phys_top: PhysicalAddress,
    /// Number of block cache slots.
    pub nbuf: usize,
}

impl Default for KernelConfig {
    /// All of RAM from [`KERNBASE`] to [`PHYSTOP`] and [`NBUF`] cache slots.
    fn default() -> Self {
        Self {
            kernel_end: PhysicalAddress::new(KERNBASE),
            phys_top: PhysicalAddress::new(PHYSTOP),
            nbuf: NBUF,
        }
    }
}

impl KernelConfig {
    /// Checks that every pool would get at least one element.
    ///
    /// # Errors
    /// See [`BootError`].
    pub fn validate(&self) -> Result<(), BootError> {
        let start = self.kernel_end.align_up(PAGE_SIZE as u64);
        match self.phys_top.offset_from(start) {
            Some(bytes) if bytes >= PAGE_SIZE as u64 => {}
            _ => {
                return Err(BootError::EmptyMemoryRange {
                    kernel_end: self.kernel_end,
                    phys_top: self.phys_top,
                });
            }
        }

        if self.nbuf == 0 {
            return Err(BootError::NoBuffers);
        }

        Ok(())
    }
}

/// A [`KernelConfig`] the resource core cannot boot with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootError {
    #[error("no whole page between kernel end {kernel_end} and top of memory {phys_top}")]
    EmptyMemoryRange {
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    },
    #[error("block cache needs at least one buffer")]
    NoBuffers,
}
