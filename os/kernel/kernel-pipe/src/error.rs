use kernel_memory_addresses::VirtualAddress;

/// Why a pipe could not be created or a transfer ended early.
///
/// Transfers that stop part-way report how many bytes made it across
/// before the stop, so the caller can account for them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipeError {
    #[error("no page available for the pipe buffer")]
    OutOfMemory,
    #[error("read end closed after {transferred} bytes")]
    BrokenPipe { transferred: usize },
    #[error("process killed after {transferred} bytes")]
    Killed { transferred: usize },
    #[error("bad user address {addr} after {transferred} bytes")]
    Fault {
        addr: VirtualAddress,
        transferred: usize,
    },
}

impl PipeError {
    /// Bytes moved before the transfer stopped.
    #[must_use]
    pub const fn transferred(&self) -> usize {
        match *self {
            Self::OutOfMemory => 0,
            Self::BrokenPipe { transferred }
            | Self::Killed { transferred }
            | Self::Fault { transferred, .. } => transferred,
        }
    }
}
