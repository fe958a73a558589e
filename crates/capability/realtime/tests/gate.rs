use recap_realtime::ConnectionGate;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn second_acquire_conflicts_until_release() {
    let gate = ConnectionGate::new();
    assert!(gate.try_acquire());
    assert!(!gate.try_acquire());
    assert!(gate.is_held());

    gate.release();
    assert!(!gate.is_held());
    assert!(gate.try_acquire());
}

#[test]
fn release_is_unconditional() {
    let gate = ConnectionGate::new();
    gate.release();
    assert!(!gate.is_held());
    assert!(gate.try_acquire());
}

#[test]
fn permit_releases_on_drop() {
    let gate = Arc::new(ConnectionGate::new());
    let permit = gate.try_permit().expect("free gate");
    assert!(gate.try_permit().is_none());
    drop(permit);
    assert!(!gate.is_held());
    assert!(gate.try_permit().is_some());
}

#[test]
fn only_one_thread_wins() {
    let gate = Arc::new(ConnectionGate::new());
    let winners = Arc::new(AtomicUsize::new(0));
    let threads: Vec<_> = (0..16)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let winners = Arc::clone(&winners);
            std::thread::spawn(move || {
                if gate.try_acquire() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("thread");
    }
    assert_eq!(winners.load(Ordering::SeqCst), 1);
}
