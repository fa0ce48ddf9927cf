use crate::{PipeError, UserSpace};
use alloc::sync::Arc;
use core::{fmt, slice};
use kernel_alloc::{Page, PageAllocator};
use kernel_info::param::PIPESIZE;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::{SpinLock, WaitChannel};
use log::debug;

/// Shared state behind both ends of a pipe.
struct Pipe<'a> {
    ring: SpinLock<Ring<'a>>,
    /// Readers wait here for data or for the write end to close.
    readable: WaitChannel,
    /// Writers wait here for room or for the read end to close.
    writable: WaitChannel,
}

struct Ring<'a> {
    /// Backing page; the ring is its first [`PIPESIZE`] bytes. Taken when
    /// the second end closes.
    page: Option<Page<'a>>,
    /// Total bytes read. Wraps; only the distance to `nwrite` matters.
    nread: usize,
    /// Total bytes written.
    nwrite: usize,
    read_open: bool,
    write_open: bool,
}

impl Ring<'_> {
    const fn len(&self) -> usize {
        self.nwrite.wrapping_sub(self.nread)
    }

    const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    const fn is_full(&self) -> bool {
        self.len() == PIPESIZE
    }

    fn buffer(&self) -> &[u8] {
        match &self.page {
            Some(page) => &page[..PIPESIZE],
            None => unreachable!("pipe buffer released while an end is open"),
        }
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        match &mut self.page {
            Some(page) => &mut page[..PIPESIZE],
            None => unreachable!("pipe buffer released while an end is open"),
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum End {
    Read,
    Write,
}

/// Creates a pipe whose ring buffer lives in a page taken from `pool`.
///
/// # Errors
/// [`PipeError::OutOfMemory`] when the pool has no page left.
pub fn pipe(pool: &PageAllocator) -> Result<(ReadEnd<'_>, WriteEnd<'_>), PipeError> {
    let page = pool.allocate().ok_or(PipeError::OutOfMemory)?;
    debug!("pipe: created on page {}", page.addr());

    let pipe = Arc::new(Pipe {
        ring: SpinLock::named(
            "pipe",
            Ring {
                page: Some(page),
                nread: 0,
                nwrite: 0,
                read_open: true,
                write_open: true,
            },
        ),
        readable: WaitChannel::new(),
        writable: WaitChannel::new(),
    });

    Ok((
        ReadEnd {
            pipe: Arc::clone(&pipe),
        },
        WriteEnd { pipe },
    ))
}

impl Pipe<'_> {
    fn close(&self, end: End) {
        let mut ring = self.ring.lock();
        match end {
            End::Read => {
                ring.read_open = false;
                self.writable.wakeup();
            }
            End::Write => {
                ring.write_open = false;
                self.readable.wakeup();
            }
        }

        let page = if ring.read_open || ring.write_open {
            None
        } else {
            ring.page.take()
        };
        drop(ring);

        if let Some(page) = page {
            debug!("pipe: both ends closed, freeing page {}", page.addr());
            // Returns the page to its pool.
            drop(page);
        }
    }

    fn len(&self) -> usize {
        self.ring.lock().len()
    }
}

/// Copies `dst.len()` bytes in from `src`, falling back to single bytes
/// when the bulk copy faults so that the readable prefix still lands.
///
/// Returns the length of that prefix and the first faulting address.
fn copy_in_prefix<U: UserSpace + ?Sized>(
    proc: &U,
    dst: &mut [u8],
    src: VirtualAddress,
) -> (usize, Option<VirtualAddress>) {
    if proc.copy_in(dst, src).is_ok() {
        return (dst.len(), None);
    }
    for (i, byte) in dst.iter_mut().enumerate() {
        if let Err(fault) = proc.copy_in(slice::from_mut(byte), src + i as u64) {
            return (i, Some(fault.0));
        }
    }
    (dst.len(), None)
}

/// Counterpart of [`copy_in_prefix`] for copies out to `dst`.
fn copy_out_prefix<U: UserSpace + ?Sized>(
    proc: &U,
    dst: VirtualAddress,
    src: &[u8],
) -> (usize, Option<VirtualAddress>) {
    if proc.copy_out(dst, src).is_ok() {
        return (src.len(), None);
    }
    for (i, byte) in src.iter().enumerate() {
        if let Err(fault) = proc.copy_out(dst + i as u64, slice::from_ref(byte)) {
            return (i, Some(fault.0));
        }
    }
    (src.len(), None)
}

/// The consuming end of a pipe. Dropping it closes the end.
pub struct ReadEnd<'a> {
    pipe: Arc<Pipe<'a>>,
}

/// The producing end of a pipe. Dropping it closes the end.
pub struct WriteEnd<'a> {
    pipe: Arc<Pipe<'a>>,
}

impl ReadEnd<'_> {
    /// Reads up to `n` bytes into the caller's memory at `addr`.
    ///
    /// Blocks while the pipe is empty and the write end is open. Returns as
    /// soon as some bytes were copied; `Ok(0)` means the write end is
    /// closed and everything written has been consumed.
    ///
    /// # Errors
    /// * [`PipeError::Killed`] if `proc` is killed while waiting for data.
    /// * [`PipeError::Fault`] if part of the destination is not writable.
    ///   Bytes delivered before the bad address are counted; the byte that
    ///   failed is consumed and lost.
    pub fn read<U: UserSpace + ?Sized>(
        &self,
        proc: &U,
        addr: VirtualAddress,
        n: usize,
    ) -> Result<usize, PipeError> {
        if n == 0 {
            return Ok(0);
        }

        let pipe = &*self.pipe;
        let mut ring = pipe.ring.lock();
        while ring.is_empty() && ring.write_open {
            if proc.killed() {
                return Err(PipeError::Killed { transferred: 0 });
            }
            ring = pipe.readable.sleep_unless(ring, || proc.killed());
        }

        let mut done = 0;
        let mut fault = None;
        while done < n && !ring.is_empty() {
            let pos = ring.nread % PIPESIZE;
            let chunk = (n - done).min(ring.len()).min(PIPESIZE - pos);
            let dst = addr + done as u64;
            let (copied, failed) = copy_out_prefix(proc, dst, &ring.buffer()[pos..pos + chunk]);
            done += copied;
            if let Some(at) = failed {
                // The byte that could not be delivered is consumed all the same.
                ring.nread = ring.nread.wrapping_add(copied + 1);
                fault = Some(at);
                break;
            }
            ring.nread = ring.nread.wrapping_add(copied);
        }

        pipe.writable.wakeup();
        drop(ring);

        match fault {
            None => Ok(done),
            Some(addr) => Err(PipeError::Fault {
                addr,
                transferred: done,
            }),
        }
    }

    /// Closes the read end. Equivalent to dropping it.
    pub fn close(self) {
        drop(self);
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipe.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the pipe can buffer before writers block.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        PIPESIZE
    }
}

impl WriteEnd<'_> {
    /// Writes `n` bytes from the caller's memory at `addr`.
    ///
    /// Blocks while the pipe is full and returns once all `n` bytes are
    /// buffered. The read end and `proc` are checked before every step, so
    /// a write blocked on a full pipe ends when either changes.
    ///
    /// # Errors
    /// Every error reports how many bytes were buffered before it:
    /// * [`PipeError::BrokenPipe`] if the read end is closed.
    /// * [`PipeError::Killed`] if `proc` is killed.
    /// * [`PipeError::Fault`] at the first unreadable source byte; the
    ///   bytes before it are buffered.
    pub fn write<U: UserSpace + ?Sized>(
        &self,
        proc: &U,
        addr: VirtualAddress,
        n: usize,
    ) -> Result<usize, PipeError> {
        if n == 0 {
            return Ok(0);
        }

        let pipe = &*self.pipe;
        let mut ring = pipe.ring.lock();
        let mut done = 0;
        let result = loop {
            if done == n {
                break Ok(n);
            }
            if !ring.read_open {
                break Err(PipeError::BrokenPipe { transferred: done });
            }
            if proc.killed() {
                break Err(PipeError::Killed { transferred: done });
            }
            if ring.is_full() {
                pipe.readable.wakeup();
                ring = pipe.writable.sleep_unless(ring, || proc.killed());
                continue;
            }

            let pos = ring.nwrite % PIPESIZE;
            let chunk = (n - done).min(PIPESIZE - ring.len()).min(PIPESIZE - pos);
            let src = addr + done as u64;
            let (copied, failed) =
                copy_in_prefix(proc, &mut ring.buffer_mut()[pos..pos + chunk], src);
            ring.nwrite = ring.nwrite.wrapping_add(copied);
            done += copied;
            if let Some(at) = failed {
                break Err(PipeError::Fault {
                    addr: at,
                    transferred: done,
                });
            }
        };

        // Bytes may have landed since the last wakeup, whatever the outcome.
        if done > 0 {
            pipe.readable.wakeup();
        }
        drop(ring);
        result
    }

    /// Closes the write end. Equivalent to dropping it.
    ///
    /// Readers drain what is buffered and then see end of stream.
    pub fn close(self) {
        drop(self);
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipe.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the pipe can buffer before writers block.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        PIPESIZE
    }
}

impl Drop for ReadEnd<'_> {
    fn drop(&mut self) {
        self.pipe.close(End::Read);
    }
}

impl Drop for WriteEnd<'_> {
    fn drop(&mut self) {
        self.pipe.close(End::Write);
    }
}

impl fmt::Debug for ReadEnd<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadEnd").field("len", &self.len()).finish()
    }
}

impl fmt::Debug for WriteEnd<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteEnd").field("len", &self.len()).finish()
    }
}
