//! Stress test: 200 identities with independent owners, nonces,
//! delegates and attributes in one registry.

use std::collections::HashSet;

use did_registry::crypto::keys::Ed25519KeyPair;
use did_registry::{
    DidRegistry, Identity, ManualClock, Operation, RegistryConfig, SignedAuthorization, Tag,
};

const N: usize = 200;

fn identities() -> Vec<Identity> {
    (0..N)
        .map(|i| Identity::from_label(&format!("agent-{i}")))
        .collect()
}

#[test]
fn stress_identities_are_isolated() {
    let clock = ManualClock::new(1_000);
    let mut registry = DidRegistry::with_clock(RegistryConfig::default(), clock.clone());
    let ids = identities();
    let name = Tag::from_label("role").unwrap();

    for (i, id) in ids.iter().enumerate() {
        let delegate = ids[(i + 1) % N];
        registry
            .add_delegate(*id, *id, Tag::VERI_KEY, delegate, 100 + i as u64)
            .unwrap();
        registry
            .set_attribute(*id, *id, name, format!("worker-{i}"), 3_600)
            .unwrap();
    }

    assert_eq!(registry.events().len(), 2 * N);
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(registry.nonce_of(id), 2, "agent-{i} nonce");
        assert_eq!(registry.owner_of(id), *id);
        let value = format!("worker-{i}");
        assert!(registry.is_currently_valid(id, &name, value.as_bytes()));
        let other = format!("worker-{}", (i + 1) % N);
        assert!(!registry.is_currently_valid(id, &name, other.as_bytes()));
        assert_eq!(registry.valid_delegates(id).len(), 1);
    }

    // Expiries were staggered by one second per identity.
    clock.set(1_100 + (N as u64) / 2);
    let still_valid = ids
        .iter()
        .enumerate()
        .filter(|(i, id)| registry.is_valid_delegate(id, &Tag::VERI_KEY, &ids[(i + 1) % N]))
        .count();
    assert_eq!(still_valid, N / 2 - 1);
}

#[test]
fn stress_unique_key_identities_sign_independently() {
    let mut registry = DidRegistry::with_clock(RegistryConfig::default(), ManualClock::new(0));
    let registry_id = *registry.registry_id();
    let keys: Vec<Ed25519KeyPair> = (0..50).map(|_| Ed25519KeyPair::generate()).collect();

    let unique: HashSet<Identity> = keys.iter().map(|k| k.identity()).collect();
    assert_eq!(unique.len(), keys.len());

    for round in 0..3 {
        for key in &keys {
            let subject = key.identity();
            let op = Operation::SetAttribute {
                name: Tag::from_label("round").unwrap(),
                value: vec![round],
                validity: 60,
            };
            let auth = SignedAuthorization::sign(key, &registry_id, &subject, round as u64, &op);
            registry.execute_signed(subject, op, auth).unwrap();
        }
    }

    for key in &keys {
        assert_eq!(registry.nonce_of(&key.identity()), 3);
        assert_eq!(registry.events().for_identity(&key.identity()).len(), 3);
    }
}

#[test]
fn stress_ownership_chain() {
    let mut registry = DidRegistry::with_clock(RegistryConfig::default(), ManualClock::new(0));
    let subject = Identity::from_label("subject");
    let ids = identities();

    let mut owner = subject;
    for next in &ids {
        registry.change_owner(subject, owner, *next).unwrap();
        owner = *next;
    }

    assert_eq!(registry.owner_of(&subject), ids[N - 1]);
    assert_eq!(registry.nonce_of(&subject), N as u64);
    assert!(registry.change_owner(subject, ids[0], subject).is_err());
}
