use kernel_memory_addresses::VirtualAddress;

/// A user address that could not be copied from or to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad user address {0}")]
pub struct CopyFault(pub VirtualAddress);

/// The process on whose behalf a pipe transfer runs.
///
/// Pipes never touch user memory themselves; all copies go through this
/// trait so the page-table walk stays with the memory manager.
/// Implementations must not suspend: copies run with the pipe's spin lock
/// held.
pub trait UserSpace {
    /// Whether the process has been asked to terminate.
    fn killed(&self) -> bool;

    /// Copies `dst.len()` bytes from user address `src` into `dst`.
    fn copy_in(&self, dst: &mut [u8], src: VirtualAddress) -> Result<(), CopyFault>;

    /// Copies `src` to user address `dst`.
    fn copy_out(&self, dst: VirtualAddress, src: &[u8]) -> Result<(), CopyFault>;
}

impl<U: UserSpace + ?Sized> UserSpace for &U {
    fn killed(&self) -> bool {
        (**self).killed()
    }

    fn copy_in(&self, dst: &mut [u8], src: VirtualAddress) -> Result<(), CopyFault> {
        (**self).copy_in(dst, src)
    }

    fn copy_out(&self, dst: VirtualAddress, src: &[u8]) -> Result<(), CopyFault> {
        (**self).copy_out(dst, src)
    }
}
