//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Grant a delegate and watch it expire
//! 2. Transfer ownership
//! 3. Revoke as the new owner, fail as the old one
//! 4. Drive the same history through signed authorizations
//! 5. Persist the journal and rebuild the registry from it

use did_registry::crypto::keys::Ed25519KeyPair;
use did_registry::storage::EventJournal;
use did_registry::{
    DidRegistry, EventKind, Identity, ManualClock, Operation, RegistryConfig, RegistryError,
    SignedAuthorization, Tag,
};

const DAY: u64 = 86_400;
const T0: u64 = 1_700_000_000;

#[test]
fn full_workflow_delegate_owner_revoke() {
    let clock = ManualClock::new(T0);
    let mut registry = DidRegistry::with_clock(RegistryConfig::default(), clock.clone());

    let a = Identity::from_label("A");
    let b = Identity::from_label("B");
    let c = Identity::from_label("C");

    // ── Step 1: A grants B sigAuth for one day ───────────────────────────
    assert_eq!(registry.nonce_of(&a), 0);
    let event = registry
        .add_delegate(a, a, Tag::SIG_AUTH, b, DAY)
        .expect("owner may add a delegate")
        .clone();
    assert_eq!(event.nonce, 1);
    assert!(matches!(
        event.kind,
        EventKind::DelegateChanged { valid_to, .. } if valid_to == T0 + DAY
    ));
    assert!(registry.is_valid_delegate(&a, &Tag::SIG_AUTH, &b));

    clock.set(T0 + DAY - 1);
    assert!(registry.is_valid_delegate(&a, &Tag::SIG_AUTH, &b));
    clock.set(T0 + DAY);
    assert!(
        !registry.is_valid_delegate(&a, &Tag::SIG_AUTH, &b),
        "delegate must be invalid once the expiry is reached"
    );

    // ── Step 2: A hands control to C ─────────────────────────────────────
    registry.change_owner(a, a, c).expect("owner may transfer");
    assert_eq!(registry.owner_of(&a), c);
    assert_eq!(registry.nonce_of(&a), 2);

    // ── Step 3: only C can act now ───────────────────────────────────────
    let err = registry
        .revoke_delegate(a, a, Tag::SIG_AUTH, b)
        .expect_err("former owner must be rejected");
    assert!(matches!(err, RegistryError::NotOwner { .. }));
    assert_eq!(registry.nonce_of(&a), 2);

    registry
        .revoke_delegate(a, c, Tag::SIG_AUTH, b)
        .expect("new owner may revoke");
    assert_eq!(registry.nonce_of(&a), 3);
    assert!(!registry.is_valid_delegate(&a, &Tag::SIG_AUTH, &b));

    // Revoking an already-expired delegate keeps its original expiry.
    assert_eq!(registry.delegate_expiry(&a, &Tag::SIG_AUTH, &b), T0 + DAY);

    let history = registry.events().for_identity(&a);
    assert_eq!(history.len(), 3);
    assert!(history.iter().zip(1..).all(|(e, n)| e.nonce == n));
    registry.events().verify_chain().expect("chain verifies");
}

#[test]
fn full_workflow_signed_path() {
    let clock = ManualClock::new(T0);
    let mut registry = DidRegistry::with_clock(RegistryConfig::default(), clock.clone());
    let registry_id = *registry.registry_id();

    let key_a = Ed25519KeyPair::generate();
    let key_c = Ed25519KeyPair::generate();
    let a = key_a.identity();
    let b = Identity::from_label("B");
    let c = key_c.identity();

    // A signs off-line; anyone may relay.
    let grant = Operation::AddDelegate {
        delegate_type: Tag::SIG_AUTH,
        delegate: b,
        validity: DAY,
    };
    let auth = SignedAuthorization::sign(&key_a, &registry_id, &a, registry.nonce_of(&a), &grant);
    registry
        .execute_signed(a, grant.clone(), auth.clone())
        .expect("signed grant applies");
    assert!(registry.is_valid_delegate(&a, &Tag::SIG_AUTH, &b));

    // The same signature cannot be relayed twice.
    let err = registry.execute_signed(a, grant, auth).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::ReplayRejected {
            expected: 1,
            presented: 0,
            ..
        }
    ));

    // Signed transfer to C.
    let transfer = Operation::ChangeOwner { new_owner: c };
    let auth = SignedAuthorization::sign(&key_a, &registry_id, &a, 1, &transfer);
    registry.execute_signed(a, transfer, auth).unwrap();
    assert_eq!(registry.owner_of(&a), c);

    // A's signature no longer authorizes anything on A.
    let revoke = Operation::RevokeDelegate {
        delegate_type: Tag::SIG_AUTH,
        delegate: b,
    };
    let stale_owner = SignedAuthorization::sign(&key_a, &registry_id, &a, 2, &revoke);
    assert!(matches!(
        registry.execute_signed(a, revoke.clone(), stale_owner),
        Err(RegistryError::InvalidSignature(_))
    ));

    clock.advance(60);
    let by_c = SignedAuthorization::sign(&key_c, &registry_id, &a, 2, &revoke);
    registry.execute_signed(a, revoke, by_c).unwrap();
    assert_eq!(registry.nonce_of(&a), 3);
    assert_eq!(registry.delegate_expiry(&a, &Tag::SIG_AUTH, &b), T0 + 60);
}

#[test]
fn full_workflow_attributes_and_resolution() {
    let clock = ManualClock::new(T0);
    let mut registry = DidRegistry::with_clock(
        RegistryConfig::default().with_network("testnet"),
        clock.clone(),
    );
    let a = Identity::from_label("A");
    let service = Tag::from_label("did/svc/HubService").unwrap();

    registry
        .set_attribute(a, a, service, "https://hub.example/v1", 7 * DAY)
        .unwrap();
    registry
        .set_attribute(a, a, service, "https://hub.example/v2", 7 * DAY)
        .unwrap();
    assert!(registry.is_currently_valid(&a, &service, b"https://hub.example/v1"));
    assert!(registry.is_currently_valid(&a, &service, b"https://hub.example/v2"));

    registry
        .revoke_attribute(a, a, service, "https://hub.example/v1")
        .unwrap();
    assert!(!registry.is_currently_valid(&a, &service, b"https://hub.example/v1"));
    assert!(registry.is_currently_valid(&a, &service, b"https://hub.example/v2"));

    let doc = registry.resolve(&a);
    assert!(doc.id.starts_with("did:ethr:testnet:0x"));
    assert_eq!(doc.attributes.len(), 1);
    assert_eq!(doc.attributes[0].value, b"https://hub.example/v2");

    clock.advance(7 * DAY);
    assert!(registry.current_attribute(&a, &service).is_none());
    assert!(registry.resolve(&a).attributes.is_empty());
}

#[test]
fn full_workflow_journal_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let journal = EventJournal::new(dir.path().join("journal.json"));
    let clock = ManualClock::new(T0);
    let a = Identity::from_label("A");
    let b = Identity::from_label("B");

    {
        let mut registry = journal
            .open_registry(RegistryConfig::default(), clock.clone())
            .unwrap();
        registry.add_delegate(a, a, Tag::VERI_KEY, b, DAY).unwrap();
        journal.commit(&registry).unwrap();
    }

    // A second session appends to the same journal.
    {
        let mut registry = journal
            .open_registry(RegistryConfig::default(), clock.clone())
            .unwrap();
        assert_eq!(registry.nonce_of(&a), 1);
        registry
            .set_attribute(a, a, Tag::from_label("name").unwrap(), "alice", DAY)
            .unwrap();
        journal.commit(&registry).unwrap();
    }

    let registry = journal
        .open_registry(RegistryConfig::default(), clock)
        .unwrap();
    assert_eq!(registry.events().len(), 2);
    assert_eq!(registry.nonce_of(&a), 2);
    assert!(registry.is_valid_delegate(&a, &Tag::VERI_KEY, &b));
}
