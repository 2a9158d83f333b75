//! Edge case tests: boundary values, malformed inputs, and rejected
//! operations leaving no trace.

use did_registry::crypto::keys::Ed25519KeyPair;
use did_registry::{
    Authorization, DidRegistry, Identity, ManualClock, Operation, RegistryConfig, RegistryError,
    SignedAuthorization, Tag,
};

fn registry_at(now: u64) -> (DidRegistry<ManualClock>, ManualClock) {
    let clock = ManualClock::new(now);
    (
        DidRegistry::with_clock(RegistryConfig::default(), clock.clone()),
        clock,
    )
}

fn alice() -> Identity {
    Identity::from_label("alice")
}

fn bob() -> Identity {
    Identity::from_label("bob")
}

// ── Tags ─────────────────────────────────────────────────────────────────────

#[test]
fn edge_tag_exactly_32_bytes() {
    let label = "x".repeat(32);
    let tag = Tag::from_label(&label).unwrap();
    assert_eq!(tag.label(), label);
}

#[test]
fn edge_tag_33_bytes_rejected() {
    assert!(matches!(
        Tag::from_label(&"x".repeat(33)),
        Err(RegistryError::MalformedInput(_))
    ));
    assert_eq!(Tag::truncated("y".repeat(40).as_bytes()).label(), "y".repeat(32));
}

#[test]
fn edge_padded_tags_compare_equal() {
    assert_eq!(Tag::from_label("veriKey").unwrap(), Tag::VERI_KEY);
    assert_eq!(Tag::new(b"sigAuth\0\0").unwrap(), Tag::SIG_AUTH);
}

// ── Validity boundaries ──────────────────────────────────────────────────────

#[test]
fn edge_max_validity_that_fits() {
    let (mut reg, _) = registry_at(1_000);
    reg.add_delegate(alice(), alice(), Tag::VERI_KEY, bob(), u64::MAX - 1_000)
        .unwrap();
    assert_eq!(
        reg.delegate_expiry(&alice(), &Tag::VERI_KEY, &bob()),
        u64::MAX
    );
    assert!(reg.is_valid_delegate(&alice(), &Tag::VERI_KEY, &bob()));
}

#[test]
fn edge_validity_one_past_max_rejected() {
    let (mut reg, _) = registry_at(1_000);
    let err = reg
        .add_delegate(alice(), alice(), Tag::VERI_KEY, bob(), u64::MAX - 999)
        .unwrap_err();
    assert!(matches!(err, RegistryError::MalformedInput(_)));
    assert_eq!(reg.nonce_of(&alice()), 0);
}

#[test]
fn edge_zero_validity_attribute_never_valid() {
    let (mut reg, _) = registry_at(1_000);
    let name = Tag::from_label("k").unwrap();
    reg.set_attribute(alice(), alice(), name, b"v".to_vec(), 0)
        .unwrap();
    assert!(!reg.is_currently_valid(&alice(), &name, b"v"));
    assert_eq!(reg.attributes().len(), 1);
}

#[test]
fn edge_empty_attribute_value() {
    let (mut reg, _) = registry_at(1_000);
    let name = Tag::from_label("flag").unwrap();
    reg.set_attribute(alice(), alice(), name, Vec::new(), 10)
        .unwrap();
    assert!(reg.is_currently_valid(&alice(), &name, b""));
}

// ── Revocation of absent targets ─────────────────────────────────────────────

#[test]
fn edge_revoke_absent_attribute_is_recorded() {
    let (mut reg, _) = registry_at(1_000);
    let name = Tag::from_label("k").unwrap();
    reg.revoke_attribute(alice(), alice(), name, b"never-set".to_vec())
        .unwrap();
    assert_eq!(reg.nonce_of(&alice()), 1);
    assert_eq!(reg.attributes().len(), 1);
    assert!(!reg.is_currently_valid(&alice(), &name, b"never-set"));
}

#[test]
fn edge_revoke_expired_delegate_does_not_resurrect() {
    let (mut reg, clock) = registry_at(1_000);
    reg.add_delegate(alice(), alice(), Tag::SIG_AUTH, bob(), 5)
        .unwrap();
    clock.advance(100);
    reg.revoke_delegate(alice(), alice(), Tag::SIG_AUTH, bob())
        .unwrap();
    assert!(!reg.is_valid_delegate(&alice(), &Tag::SIG_AUTH, &bob()));
    assert_eq!(reg.delegate_expiry(&alice(), &Tag::SIG_AUTH, &bob()), 1_005);
    assert_eq!(reg.nonce_of(&alice()), 2);
}

// ── Malformed identities ─────────────────────────────────────────────────────

#[test]
fn edge_zero_delegate_rejected() {
    let (mut reg, _) = registry_at(1_000);
    assert!(matches!(
        reg.add_delegate(alice(), alice(), Tag::VERI_KEY, Identity::ZERO, 60),
        Err(RegistryError::MalformedInput(_))
    ));
    assert!(matches!(
        reg.revoke_delegate(alice(), alice(), Tag::VERI_KEY, Identity::ZERO),
        Err(RegistryError::MalformedInput(_))
    ));
    assert!(reg.events().is_empty());
}

#[test]
fn edge_identity_parse_forms() {
    let id = alice();
    let text = id.to_string();
    assert_eq!(text.parse::<Identity>().unwrap(), id);
    assert_eq!(text.trim_start_matches("0x").parse::<Identity>().unwrap(), id);
    assert_eq!(format!("did:ethr:{text}").parse::<Identity>().unwrap(), id);
    assert!("0x1234".parse::<Identity>().is_err());
    assert!("not-an-identity".parse::<Identity>().is_err());
}

// ── Signed path ──────────────────────────────────────────────────────────────

#[test]
fn edge_future_nonce_rejected() {
    let (mut reg, _) = registry_at(1_000);
    let key = Ed25519KeyPair::generate();
    let subject = key.identity();
    let op = Operation::ChangeOwner { new_owner: bob() };
    let auth = SignedAuthorization::sign(&key, reg.registry_id(), &subject, 5, &op);
    assert!(matches!(
        reg.execute_signed(subject, op, auth),
        Err(RegistryError::ReplayRejected {
            expected: 0,
            presented: 5,
            ..
        })
    ));
    assert_eq!(reg.nonce_of(&subject), 0);
}

#[test]
fn edge_garbled_signature_material() {
    let (mut reg, _) = registry_at(1_000);
    let key = Ed25519KeyPair::generate();
    let subject = key.identity();
    let op = Operation::ChangeOwner { new_owner: bob() };
    let good = SignedAuthorization::sign(&key, reg.registry_id(), &subject, 0, &op);

    let bad_key = SignedAuthorization {
        signer_key: "!!not base64!!".into(),
        ..good.clone()
    };
    let bad_sig = SignedAuthorization {
        signature: "AAAA".into(),
        ..good.clone()
    };
    for auth in [bad_key, bad_sig] {
        assert!(matches!(
            reg.execute(subject, op.clone(), &Authorization::Signed(auth)),
            Err(RegistryError::InvalidSignature(_))
        ));
    }
    assert!(reg.events().is_empty());
    reg.execute_signed(subject, op, good).unwrap();
}

#[test]
fn edge_signed_nonce_mismatch_checked_after_owner() {
    let (mut reg, _) = registry_at(1_000);
    let owner = Ed25519KeyPair::generate();
    let other = Ed25519KeyPair::generate();
    let subject = owner.identity();
    let op = Operation::ChangeOwner { new_owner: bob() };
    let auth = SignedAuthorization::sign(&other, reg.registry_id(), &subject, 9, &op);
    assert!(matches!(
        reg.execute_signed(subject, op, auth),
        Err(RegistryError::InvalidSignature(_))
    ));
}

#[test]
fn edge_clock_never_moves_backwards() {
    let clock = ManualClock::new(500);
    clock.set(100);
    assert_eq!(did_registry::Clock::now(&clock), 500);
}
