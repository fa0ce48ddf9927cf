use kernel_alloc::PageAllocator;
use kernel_info::memory::PAGE_SIZE;
use kernel_info::param::PIPESIZE;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_pipe::{CopyFault, PipeError, ReadEnd, UserSpace, pipe};
use kernel_sync::sched::{self, Scheduler};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

struct HostScheduler;

impl Scheduler for HostScheduler {
    fn yield_now(&self) {
        thread::yield_now();
    }
}

fn host_scheduler() {
    static HOST: HostScheduler = HostScheduler;
    let _ = sched::install(&HOST);
}

/// A process with a flat user address space starting at 0.
struct Process {
    memory: Mutex<Vec<u8>>,
    killed: AtomicBool,
}

impl Process {
    fn with_memory(memory: Vec<u8>) -> Self {
        Self {
            memory: Mutex::new(memory),
            killed: AtomicBool::new(false),
        }
    }

    fn zeroed(len: usize) -> Self {
        Self::with_memory(vec![0; len])
    }

    fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    fn memory(&self) -> Vec<u8> {
        self.memory.lock().unwrap().clone()
    }
}

impl UserSpace for Process {
    fn killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    fn copy_in(&self, dst: &mut [u8], src: VirtualAddress) -> Result<(), CopyFault> {
        let memory = self.memory.lock().unwrap();
        let start = src.as_u64() as usize;
        let bytes = memory
            .get(start..start + dst.len())
            .ok_or(CopyFault(src))?;
        dst.copy_from_slice(bytes);
        Ok(())
    }

    fn copy_out(&self, dst: VirtualAddress, src: &[u8]) -> Result<(), CopyFault> {
        let mut memory = self.memory.lock().unwrap();
        let start = dst.as_u64() as usize;
        let bytes = memory
            .get_mut(start..start + src.len())
            .ok_or(CopyFault(dst))?;
        bytes.copy_from_slice(src);
        Ok(())
    }
}

fn pool(pages: u64) -> PageAllocator {
    let base = 0x8000_0000;
    PageAllocator::new(
        PhysicalAddress::new(base),
        PhysicalAddress::new(base + pages * PAGE_SIZE as u64),
    )
}

fn va(addr: usize) -> VirtualAddress {
    VirtualAddress::new(addr as u64)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Reads until `n` bytes arrived or the stream ended, `chunk` at a time.
fn read_all(rx: &ReadEnd<'_>, proc: &Process, n: usize, chunk: usize) -> usize {
    let mut got = 0;
    while got < n {
        let want = chunk.min(n - got);
        let read = rx.read(proc, va(got), want).unwrap();
        assert!(read <= want);
        if read == 0 {
            break;
        }
        got += read;
    }
    got
}

#[test]
fn bytes_come_out_in_order() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory(b"hello pipe".to_vec());
    let reader = Process::zeroed(10);

    assert_eq!(tx.write(&writer, va(0), 10), Ok(10));
    assert_eq!(rx.len(), 10);
    assert_eq!(rx.read(&reader, va(0), 10), Ok(10));
    assert_eq!(reader.memory(), b"hello pipe");
    assert!(rx.is_empty());
}

#[test]
fn read_returns_what_is_buffered() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory(b"abc".to_vec());
    let reader = Process::zeroed(64);

    tx.write(&writer, va(0), 3).unwrap();
    assert_eq!(rx.read(&reader, va(0), 64), Ok(3));
    assert_eq!(&reader.memory()[..3], b"abc");
}

#[test]
fn zero_length_transfers_return_immediately() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let proc = Process::zeroed(0);

    // Would block forever if the empty-pipe wait applied.
    assert_eq!(rx.read(&proc, va(0), 0), Ok(0));
    assert_eq!(tx.write(&proc, va(0), 0), Ok(0));
    assert!(rx.is_empty());
}

#[test]
fn full_pipe_blocks_writer_until_reader_drains() {
    host_scheduler();
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let data = pattern(1000);
    let writer = Process::with_memory(data.clone());
    let reader = Process::zeroed(1000);

    thread::scope(|s| {
        let producer = s.spawn(|| tx.write(&writer, va(0), 1000));

        thread::sleep(Duration::from_millis(20));
        assert!(!producer.is_finished());
        assert_eq!(rx.len(), PIPESIZE);
        assert_eq!(rx.capacity(), PIPESIZE);

        assert_eq!(read_all(&rx, &reader, 1000, 1000), 1000);
        assert_eq!(producer.join().unwrap(), Ok(1000));
    });

    assert_eq!(reader.memory(), data);
}

#[test]
fn closing_write_end_wakes_blocked_reader_with_end_of_stream() {
    host_scheduler();
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let reader = Process::zeroed(16);

    thread::scope(|s| {
        let consumer = s.spawn(|| rx.read(&reader, va(0), 16));

        thread::sleep(Duration::from_millis(20));
        assert!(!consumer.is_finished());
        tx.close();

        assert_eq!(consumer.join().unwrap(), Ok(0));
    });
}

#[test]
fn buffered_bytes_survive_writer_close() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory(b"xyz".to_vec());
    let reader = Process::zeroed(8);

    tx.write(&writer, va(0), 3).unwrap();
    drop(tx);

    assert_eq!(rx.read(&reader, va(0), 8), Ok(3));
    assert_eq!(rx.read(&reader, va(3), 8), Ok(0));
    assert_eq!(rx.read(&reader, va(3), 8), Ok(0));
}

#[test]
fn closing_read_end_fails_blocked_writer() {
    host_scheduler();
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory(pattern(600));

    thread::scope(|s| {
        let producer = s.spawn(|| tx.write(&writer, va(0), 600));

        thread::sleep(Duration::from_millis(20));
        assert!(!producer.is_finished());
        rx.close();

        let err = producer.join().unwrap().unwrap_err();
        assert_eq!(err, PipeError::BrokenPipe { transferred: PIPESIZE });
        assert_eq!(err.transferred(), PIPESIZE);
    });
}

#[test]
fn write_without_reader_transfers_nothing() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory(vec![1; 4]);

    drop(rx);
    assert_eq!(
        tx.write(&writer, va(0), 4),
        Err(PipeError::BrokenPipe { transferred: 0 })
    );
    assert!(tx.is_empty());
}

#[test]
fn six_hundred_bytes_through_hundred_byte_reads() {
    host_scheduler();
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let data = pattern(600);
    let writer = Process::with_memory(data.clone());
    let reader = Process::zeroed(600);

    thread::scope(|s| {
        let producer = s.spawn(|| tx.write(&writer, va(0), 600));
        assert_eq!(read_all(&rx, &reader, 600, 100), 600);
        assert_eq!(producer.join().unwrap(), Ok(600));
    });
    assert_eq!(reader.memory(), data);

    rx.close();
    assert_eq!(
        tx.write(&writer, va(0), 1),
        Err(PipeError::BrokenPipe { transferred: 0 })
    );
}

#[test]
fn ring_wraps_around_many_times() {
    host_scheduler();
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let len = 20 * PIPESIZE + 123;
    let data = pattern(len);
    let writer = Process::with_memory(data.clone());
    let reader = Process::zeroed(len);

    thread::scope(|s| {
        s.spawn(|| {
            // Odd write sizes so chunks straddle the end of the ring.
            let mut sent = 0;
            while sent < len {
                let n = 77.min(len - sent);
                assert_eq!(tx.write(&writer, va(sent), n), Ok(n));
                sent += n;
            }
        });
        assert_eq!(read_all(&rx, &reader, len, 37), len);
    });

    assert_eq!(reader.memory(), data);
}

#[test]
fn killed_reader_stops_waiting() {
    host_scheduler();
    let pool = pool(1);
    let (rx, _tx) = pipe(&pool).unwrap();
    let reader = Process::zeroed(16);

    thread::scope(|s| {
        let consumer = s.spawn(|| rx.read(&reader, va(0), 16));

        thread::sleep(Duration::from_millis(20));
        assert!(!consumer.is_finished());
        reader.kill();

        assert_eq!(
            consumer.join().unwrap(),
            Err(PipeError::Killed { transferred: 0 })
        );
    });
}

#[test]
fn killed_writer_reports_partial_transfer() {
    host_scheduler();
    let pool = pool(1);
    let (_rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory(pattern(600));

    thread::scope(|s| {
        let producer = s.spawn(|| tx.write(&writer, va(0), 600));

        thread::sleep(Duration::from_millis(20));
        assert!(!producer.is_finished());
        writer.kill();

        assert_eq!(
            producer.join().unwrap(),
            Err(PipeError::Killed { transferred: PIPESIZE })
        );
    });
}

#[test]
fn write_buffers_bytes_up_to_bad_source_address() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory((0..8).collect());
    let reader = Process::zeroed(8);

    // Bytes 4..8 are mapped, 8..12 are not.
    assert_eq!(
        tx.write(&writer, va(4), 8),
        Err(PipeError::Fault {
            addr: va(8),
            transferred: 4
        })
    );
    assert_eq!(tx.len(), 4);

    assert_eq!(rx.read(&reader, va(0), 8), Ok(4));
    assert_eq!(&reader.memory()[..4], &[4, 5, 6, 7]);
}

#[test]
fn unmapped_source_buffers_nothing() {
    let pool = pool(1);
    let (_rx, tx) = pipe(&pool).unwrap();
    let writer = Process::zeroed(8);

    assert_eq!(
        tx.write(&writer, va(100), 8),
        Err(PipeError::Fault {
            addr: va(100),
            transferred: 0
        })
    );
    assert!(tx.is_empty());
}

#[test]
fn read_delivers_bytes_up_to_bad_destination_address() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory((10..18).collect());
    let reader = Process::zeroed(8);

    tx.write(&writer, va(0), 8).unwrap();

    // Destination bytes 6 and 7 exist, byte 8 does not.
    assert_eq!(
        rx.read(&reader, va(6), 8),
        Err(PipeError::Fault {
            addr: va(8),
            transferred: 2
        })
    );
    assert_eq!(&reader.memory()[6..], &[10, 11]);

    // The undeliverable byte is gone; the rest stays buffered.
    assert_eq!(rx.len(), 5);
    assert_eq!(rx.read(&reader, va(0), 8), Ok(5));
    assert_eq!(&reader.memory()[..5], &[13, 14, 15, 16, 17]);
}

#[test]
fn read_into_unmapped_destination_loses_one_byte() {
    let pool = pool(1);
    let (rx, tx) = pipe(&pool).unwrap();
    let writer = Process::with_memory(vec![7; 8]);
    let reader = Process::zeroed(8);

    tx.write(&writer, va(0), 8).unwrap();
    assert_eq!(
        rx.read(&reader, va(100), 8),
        Err(PipeError::Fault {
            addr: va(100),
            transferred: 0
        })
    );
    assert_eq!(rx.len(), 7);
    assert_eq!(rx.read(&reader, va(0), 8), Ok(7));
}

#[test]
fn page_is_returned_once_both_ends_close() {
    let pool = pool(2);
    let page = PAGE_SIZE as u64;
    assert_eq!(pool.free_capacity(), 2 * page);

    let (rx, tx) = pipe(&pool).unwrap();
    assert_eq!(pool.free_capacity(), page);

    rx.close();
    assert_eq!(pool.free_capacity(), page);

    tx.close();
    assert_eq!(pool.free_capacity(), 2 * page);
}

#[test]
fn pipe_creation_fails_without_pages() {
    let pool = pool(1);
    let _held = pool.allocate().unwrap();

    assert_eq!(pipe(&pool).unwrap_err(), PipeError::OutOfMemory);
    assert_eq!(PipeError::OutOfMemory.transferred(), 0);
}
