use kernel_sync::sched::{self, Scheduler};
use kernel_sync::{SleepLock, SleepLockGuard, SpinLock, SpinLockGuard, WaitChannel};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
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
    assert!(sched::is_installed());
}

#[test]
fn try_lock_fails_while_held() {
    let l = SleepLock::new("buffer", 7u32);
    let g = l.lock();
    assert!(l.is_locked());
    assert!(l.try_lock().is_none());
    drop(g);
    assert!(!l.is_locked());
    assert_eq!(*l.try_lock().unwrap(), 7);
}

#[test]
fn holder_may_sleep_while_others_wait() {
    host_scheduler();
    let l = SleepLock::new("buffer", Vec::new());
    let in_cs = AtomicUsize::new(0);
    let start = Barrier::new(4);

    thread::scope(|s| {
        for id in 0..4 {
            let (l, in_cs, start) = (&l, &in_cs, &start);
            s.spawn(move || {
                start.wait();
                for _ in 0..50 {
                    let mut g = l.lock();
                    assert_eq!(in_cs.fetch_add(1, Ordering::SeqCst), 0);
                    // Simulates a slow device operation under the lock.
                    thread::sleep(Duration::from_micros(20));
                    g.push(id);
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(l.lock().len(), 200);
}

#[test]
fn wakeup_after_release_ends_the_wait() {
    host_scheduler();
    let state = SpinLock::new(false);
    let chan = WaitChannel::new();
    let woke = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            let mut ready = state.lock();
            while !*ready {
                ready = chan.sleep(ready);
            }
            woke.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(10));
        assert!(!woke.load(Ordering::SeqCst));
        *state.lock() = true;
        chan.wakeup();
    });

    assert!(woke.load(Ordering::SeqCst));
}

#[test]
fn wakeup_between_check_and_sleep_is_not_lost() {
    host_scheduler();
    // Many rounds of a ping-pong handshake; a lost wakeup would hang.
    let turn = SpinLock::new(0u32);
    let chan = WaitChannel::new();

    thread::scope(|s| {
        for me in 0..2u32 {
            let (turn, chan) = (&turn, &chan);
            s.spawn(move || {
                for round in 0..500u32 {
                    let mut t = turn.lock();
                    while *t % 2 != me {
                        t = chan.sleep(t);
                    }
                    assert_eq!(*t, round * 2 + me);
                    *t += 1;
                    chan.wakeup();
                }
            });
        }
    });

    assert_eq!(*turn.lock(), 1000);
}

#[test]
fn interrupted_sleeper_returns_without_wakeup() {
    host_scheduler();
    let state = SpinLock::new(());
    let chan = WaitChannel::new();
    let killed = AtomicBool::new(false);

    thread::scope(|s| {
        let sleeper = s.spawn(|| {
            let guard = state.lock();
            let _guard = chan.sleep_unless(guard, || killed.load(Ordering::SeqCst));
        });

        thread::sleep(Duration::from_millis(5));
        assert!(!sleeper.is_finished());
        killed.store(true, Ordering::SeqCst);
        sleeper.join().unwrap();
    });

    // The lock was handed back on return.
    assert!(!state.is_locked());
}

fn shareable<S: Sync>() {}
fn movable<S: Send>() {}

#[test]
fn guards_share_only_what_the_data_allows() {
    shareable::<SleepLockGuard<'static, [u8; 1024]>>();
    shareable::<SpinLockGuard<'static, u64>>();
    // A held buffer may still travel to the thread that releases it.
    movable::<SleepLockGuard<'static, [u8; 1024]>>();
}

#[test]
fn shared_guard_reads_from_several_threads() {
    let lock = SleepLock::new("buffer", 42_u64);
    let guard = lock.lock();
    let shared = &guard;

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(move || assert_eq!(**shared, 42));
        }
    });

    drop(guard);
    assert!(!lock.is_locked());
}
