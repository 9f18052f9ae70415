use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use threads::{Condition, KThread, Lock};

#[test]
fn fork_and_join() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let t = KThread::fork("worker", move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert_eq!(t.name(), "worker");
    assert!(t.join());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn join_reports_panics() {
    let t = KThread::fork("doomed", || panic!("boom")).unwrap();
    assert!(!t.join());
}

#[test]
fn lock_survives_a_panicking_holder() {
    let lock = Arc::new(Lock::new(5));
    let l = Arc::clone(&lock);
    let t = KThread::fork("poisoner", move || {
        let mut g = l.acquire();
        *g = 6;
        panic!("while holding");
    })
    .unwrap();
    assert!(!t.join());
    assert_eq!(*lock.acquire(), 6);
}

#[test]
fn condition_wakes_waiter() {
    let state = Arc::new((Lock::new(false), Condition::new()));
    let s = Arc::clone(&state);
    let waiter = KThread::fork("waiter", move || {
        let (lock, cond) = &*s;
        let guard = cond.sleep_until(lock.acquire(), |ready| *ready);
        assert!(*guard);
    })
    .unwrap();

    {
        let (lock, cond) = &*state;
        *lock.acquire() = true;
        cond.wake_all();
    }
    assert!(waiter.join());
}

#[test]
fn many_waiters_all_wake() {
    let state = Arc::new((Lock::new(0u32), Condition::new()));
    let woken = Arc::new(AtomicUsize::new(0));
    let mut threads = Vec::new();
    for i in 0..4 {
        let s = Arc::clone(&state);
        let w = Arc::clone(&woken);
        threads.push(
            KThread::fork(format!("waiter-{i}"), move || {
                let (lock, cond) = &*s;
                let _g = cond.sleep_until(lock.acquire(), |generation| *generation > 0);
                w.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap(),
        );
    }
    {
        let (lock, cond) = &*state;
        *lock.acquire() += 1;
        cond.wake_all();
    }
    for t in threads {
        assert!(t.join());
    }
    assert_eq!(woken.load(Ordering::SeqCst), 4);
}
