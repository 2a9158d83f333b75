//! Stress test: a registry rebuilt from its event stream answers every
//! query exactly like the live registry, after a long mixed history.

use did_registry::{
    DidRegistry, Identity, ManualClock, RegistryConfig, RegistryError, RegistryEvent, Tag,
};

fn pseudo_random(seed: &mut u64) -> u64 {
    // xorshift64
    *seed ^= *seed << 13;
    *seed ^= *seed >> 7;
    *seed ^= *seed << 17;
    *seed
}

fn build_history(ops: usize) -> (DidRegistry<ManualClock>, ManualClock, Vec<Identity>, Vec<Tag>) {
    let clock = ManualClock::new(1_000_000);
    let mut registry = DidRegistry::with_clock(RegistryConfig::default(), clock.clone());
    let ids: Vec<Identity> = (0..10)
        .map(|i| Identity::from_label(&format!("id-{i}")))
        .collect();
    let tags = vec![
        Tag::VERI_KEY,
        Tag::SIG_AUTH,
        Tag::from_label("did/svc/HubService").unwrap(),
    ];

    let mut seed = 0x2545_f491_4f6c_dd1d;
    for _ in 0..ops {
        let r = pseudo_random(&mut seed);
        let id = ids[(r % 10) as usize];
        let other = ids[((r >> 8) % 10) as usize];
        let tag = tags[((r >> 16) % 3) as usize];
        let owner = registry.owner_of(&id);
        let validity = (r >> 24) % 500;
        let applied = match (r >> 40) % 5 {
            0 => registry.add_delegate(id, owner, tag, other, validity).map(|_| ()),
            1 => registry.revoke_delegate(id, owner, tag, other).map(|_| ()),
            2 => registry
                .set_attribute(id, owner, tag, vec![(r >> 48) as u8 % 4], validity)
                .map(|_| ()),
            3 => registry
                .revoke_attribute(id, owner, tag, vec![(r >> 48) as u8 % 4])
                .map(|_| ()),
            _ => registry.change_owner(id, owner, other).map(|_| ()),
        };
        applied.unwrap();
        clock.advance((r >> 56) % 20);
    }
    (registry, clock, ids, tags)
}

#[test]
fn stress_replay_matches_live_state() {
    let (live, clock, ids, tags) = build_history(2_000);
    let replayed = DidRegistry::from_events(
        RegistryConfig::default(),
        clock.clone(),
        live.events().events().to_vec(),
    )
    .unwrap();

    assert_eq!(replayed.ledger(), live.ledger());
    assert_eq!(replayed.delegates(), live.delegates());
    assert_eq!(replayed.attributes().events(), live.attributes().events());
    assert_eq!(replayed.events().head_hash(), live.events().head_hash());

    // Query answers agree at several points in time.
    for step in [0u64, 50, 250, 1_000] {
        clock.advance(step);
        for id in &ids {
            assert_eq!(replayed.nonce_of(id), live.nonce_of(id));
            assert_eq!(replayed.owner_of(id), live.owner_of(id));
            assert_eq!(replayed.valid_delegates(id), live.valid_delegates(id));
            assert_eq!(replayed.resolve(id), live.resolve(id));
            for tag in &tags {
                for v in 0u8..4 {
                    assert_eq!(
                        replayed.is_currently_valid(id, tag, &[v]),
                        live.is_currently_valid(id, tag, &[v])
                    );
                }
            }
        }
    }
}

#[test]
fn stress_incremental_ingest_matches_bulk_replay() {
    let (live, clock, _, _) = build_history(500);
    let mut follower = DidRegistry::with_clock(RegistryConfig::default(), clock.clone());
    for event in live.events().events() {
        follower.ingest(event.clone()).unwrap();
    }
    assert_eq!(follower.events().head_hash(), live.events().head_hash());
    assert_eq!(follower.delegates(), live.delegates());
}

#[test]
fn stress_replay_rejects_every_single_tamper() {
    let (live, clock, _, _) = build_history(100);
    let events: Vec<RegistryEvent> = live.events().events().to_vec();

    for i in (0..events.len()).step_by(7) {
        let mut tampered = events.clone();
        tampered[i].timestamp += 1;
        let result = DidRegistry::from_events(RegistryConfig::default(), clock.clone(), tampered);
        assert!(
            matches!(result, Err(RegistryError::CorruptJournal(_))),
            "tampering with event {i} must be detected"
        );
    }

    let mut reordered = events.clone();
    reordered.swap(3, 4);
    assert!(DidRegistry::from_events(RegistryConfig::default(), clock, reordered).is_err());
}
