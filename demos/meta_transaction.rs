//! Meta-transaction — an owner signs off-line, a relayer submits.
//!
//! Run with:
//!   cargo run --example meta_transaction -p did-registry

use did_registry::crypto::keys::Ed25519KeyPair;
use did_registry::{
    DidRegistry, Identity, ManualClock, Operation, RegistryConfig, RegistryError,
    SignedAuthorization, Tag,
};

fn main() -> did_registry::Result<()> {
    let clock = ManualClock::new(1_700_000_000);
    let mut registry = DidRegistry::with_clock(RegistryConfig::default(), clock.clone());
    let registry_id = *registry.registry_id();

    let owner = Ed25519KeyPair::generate();
    let subject = owner.identity();
    let service = Identity::from_label("signing-service");
    println!("Subject: {}", registry.config().did(&subject));
    println!();

    // ── 1. Owner signs a delegate grant off-line ────────────────────────────
    let grant = Operation::AddDelegate {
        delegate_type: Tag::SIG_AUTH,
        delegate: service,
        validity: 86_400,
    };
    let nonce = registry.nonce_of(&subject);
    let auth = SignedAuthorization::sign(&owner, &registry_id, &subject, nonce, &grant);
    println!("Signed {} at nonce {nonce}", grant.name());

    // ── 2. A relayer submits it ─────────────────────────────────────────────
    let event = registry.execute_signed(subject, grant.clone(), auth.clone())?;
    println!("Applied as event #{} (nonce now {})", event.sequence, event.nonce);
    println!(
        "Delegate valid: {}",
        registry.is_valid_delegate(&subject, &Tag::SIG_AUTH, &service)
    );
    println!();

    // ── 3. Replaying the same signature fails ───────────────────────────────
    match registry.execute_signed(subject, grant, auth) {
        Err(RegistryError::ReplayRejected { expected, presented, .. }) => {
            println!("Replay rejected: expected nonce {expected}, got {presented}");
        }
        other => println!("Unexpected: {other:?}"),
    }
    println!();

    // ── 4. The grant lapses after a day ─────────────────────────────────────
    clock.advance(86_400);
    println!(
        "After one day, delegate valid: {}",
        registry.is_valid_delegate(&subject, &Tag::SIG_AUTH, &service)
    );

    let doc = registry.resolve(&subject);
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&doc).map_err(|e| RegistryError::SerializationError(e.to_string()))?
    );
    Ok(())
}
