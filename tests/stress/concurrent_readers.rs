//! Concurrency test: readers sharing a registry behind a lock while a
//! single writer mutates it.
//!
//! Readers must only ever observe whole operations: an identity's nonce
//! always equals the number of its events, and the delegate a reader sees
//! agrees with the nonce it sees.

use std::sync::{Arc, RwLock};
use std::thread;

use did_registry::{DidRegistry, Identity, ManualClock, RegistryConfig, Tag};

const WRITES: u64 = 500;

#[test]
fn stress_readers_see_consistent_snapshots() {
    let clock = ManualClock::new(10_000);
    let registry = Arc::new(RwLock::new(DidRegistry::with_clock(
        RegistryConfig::default(),
        clock,
    )));
    let subject = Identity::from_label("subject");
    let delegate = Identity::from_label("delegate");

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..WRITES {
                let mut reg = registry.write().unwrap();
                if i % 2 == 0 {
                    reg.add_delegate(subject, subject, Tag::SIG_AUTH, delegate, 3_600)
                        .unwrap();
                } else {
                    reg.revoke_delegate(subject, subject, Tag::SIG_AUTH, delegate)
                        .unwrap();
                }
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        readers.push(thread::spawn(move || {
            let mut last_nonce = 0;
            for _ in 0..2_000 {
                let reg = registry.read().unwrap();
                let nonce = reg.nonce_of(&subject);
                assert!(nonce >= last_nonce, "nonce went backwards");
                assert_eq!(reg.events().for_identity(&subject).len() as u64, nonce);
                // Odd nonce: last op was a grant. Even: a revoke (or nothing).
                let valid = reg.is_valid_delegate(&subject, &Tag::SIG_AUTH, &delegate);
                assert_eq!(valid, nonce % 2 == 1);
                last_nonce = nonce;
            }
        }));
    }

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    let reg = registry.read().unwrap();
    assert_eq!(reg.nonce_of(&subject), WRITES);
    reg.events().verify_chain().unwrap();
}

#[test]
fn stress_parallel_writers_serialize() {
    let registry = Arc::new(RwLock::new(DidRegistry::with_clock(
        RegistryConfig::default(),
        ManualClock::new(0),
    )));
    let name = Tag::from_label("counter").unwrap();

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let id = Identity::from_label(&format!("writer-{t}"));
                for i in 0u32..50 {
                    registry
                        .write()
                        .unwrap()
                        .set_attribute(id, id, name, i.to_be_bytes().to_vec(), 60)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let reg = registry.read().unwrap();
    assert_eq!(reg.events().len(), 16 * 50);
    for t in 0..16 {
        let id = Identity::from_label(&format!("writer-{t}"));
        assert_eq!(reg.nonce_of(&id), 50);
    }
    reg.events().verify_chain().unwrap();
}
