//! The registry facade.
//!
//! [`DidRegistry`] owns every mapping (owners, nonces, delegates, the
//! attribute log and the event stream) and is their only writer. All
//! mutations follow one template:
//!
//! 1. validate the inputs (`MalformedInput`),
//! 2. authorize through [`AccessControl`], which advances the nonce,
//! 3. apply the domain change,
//! 4. emit exactly one event carrying the new nonce.
//!
//! Steps 1 and 2 are the only ones that can fail, and neither touches
//! state on failure, so a rejected operation leaves the registry exactly
//! as it was. Mutations take `&mut self`; readers sharing a registry
//! behind a lock only ever see whole operations.

use log::{debug, info, warn};

use crate::access::{AccessControl, Authorization, SignedAuthorization};
use crate::attribute::{AttributeEvent, AttributeLog};
use crate::config::RegistryConfig;
use crate::delegate::{DelegateChange, DelegateEntry, DelegateKey, DelegateRegistry};
use crate::document::DidDocument;
use crate::error::{RegistryError, Result};
use crate::event::{EventKind, EventLog, RegistryEvent};
use crate::identity::{Identity, IdentityLedger, Tag};
use crate::nonce::NonceGuard;
use crate::operation::Operation;
use crate::time::{deadline, Clock, SystemClock};

/// Decentralized identity registry.
#[derive(Debug)]
pub struct DidRegistry<C: Clock = SystemClock> {
    config: RegistryConfig,
    clock: C,
    access: AccessControl,
    ledger: IdentityLedger,
    nonces: NonceGuard,
    delegates: DelegateRegistry,
    attributes: AttributeLog,
    events: EventLog,
}

impl DidRegistry<SystemClock> {
    /// A registry driven by the system clock.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> DidRegistry<C> {
    /// An empty registry driven by `clock`.
    pub fn with_clock(config: RegistryConfig, clock: C) -> Self {
        let access = AccessControl::new(config.registry_id);
        Self {
            config,
            clock,
            access,
            ledger: IdentityLedger::new(),
            nonces: NonceGuard::new(),
            delegates: DelegateRegistry::new(),
            attributes: AttributeLog::new(),
            events: EventLog::new(),
        }
    }

    /// Rebuild a registry from an event stream alone.
    ///
    /// Fails with `CorruptJournal` if the stream is not an unbroken,
    /// correctly hashed chain with consecutive nonces.
    pub fn from_events<I>(config: RegistryConfig, clock: C, events: I) -> Result<Self>
    where
        I: IntoIterator<Item = RegistryEvent>,
    {
        let mut registry = Self::with_clock(config, clock);
        for event in events {
            registry.ingest(event)?;
        }
        info!(
            "replayed {} events ({} attribute entries, {} delegate records)",
            registry.events.len(),
            registry.attributes.len(),
            registry.delegates.len()
        );
        Ok(registry)
    }

    /// Apply an event produced by another registry instance with the same
    /// history, as a follower tailing the stream would.
    ///
    /// Events that `execute` could not have produced are rejected with
    /// `CorruptJournal`, even when their hashes check out.
    pub fn ingest(&mut self, event: RegistryEvent) -> Result<()> {
        check_producible(&event)?;
        let (identity, nonce) = (event.identity, event.nonce);
        self.nonces.check_restore(&identity, nonce)?;
        let kind = self.events.append_verified(event)?.kind.clone();
        self.nonces.restore(&identity, nonce)?;
        self.apply_kind(identity, &kind);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn registry_id(&self) -> &Identity {
        self.access.registry_id()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Current owner of `identity` (itself unless changed).
    pub fn owner_of(&self, identity: &Identity) -> Identity {
        self.ledger.owner_of(identity)
    }

    /// Nonce the next signed authorization for `identity` must carry.
    pub fn nonce_of(&self, identity: &Identity) -> u64 {
        self.nonces.current(identity)
    }

    /// Whether `delegate` holds an unexpired `delegate_type` grant.
    pub fn is_valid_delegate(&self, identity: &Identity, delegate_type: &Tag, delegate: &Identity) -> bool {
        let key = DelegateKey::new(*identity, *delegate_type, *delegate);
        self.delegates.is_valid(&key, self.now())
    }

    /// Absolute expiry of a delegate grant, 0 if never granted.
    pub fn delegate_expiry(&self, identity: &Identity, delegate_type: &Tag, delegate: &Identity) -> u64 {
        self.delegates
            .expiry_of(&DelegateKey::new(*identity, *delegate_type, *delegate))
    }

    /// Unexpired delegates of `identity`.
    pub fn valid_delegates(&self, identity: &Identity) -> Vec<DelegateEntry> {
        self.delegates.valid_delegates(identity, self.now())
    }

    /// Whether the exact (name, value) claim of `identity` is valid now.
    pub fn is_currently_valid(&self, identity: &Identity, name: &Tag, value: &[u8]) -> bool {
        self.attributes
            .is_currently_valid(identity, name, value, self.now())
    }

    /// Most recently set, still valid value under `name`.
    pub fn current_attribute(&self, identity: &Identity, name: &Tag) -> Option<&AttributeEvent> {
        self.attributes.current_value(identity, name, self.now())
    }

    /// All valid claims of `identity`, in log order.
    pub fn current_attributes(&self, identity: &Identity) -> Vec<&AttributeEvent> {
        self.attributes.current_attributes(identity, self.now())
    }

    pub fn ledger(&self) -> &IdentityLedger {
        &self.ledger
    }

    pub fn delegates(&self) -> &DelegateRegistry {
        &self.delegates
    }

    pub fn attributes(&self) -> &AttributeLog {
        &self.attributes
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Resolve the DID document of `identity` as of now.
    pub fn resolve(&self, identity: &Identity) -> DidDocument {
        let now = self.now();
        DidDocument::build(
            &self.config,
            identity,
            &self.owner_of(identity),
            self.nonce_of(identity),
            &self.delegates.valid_delegates(identity, now),
            &self.attributes.current_attributes(identity, now),
            now,
        )
    }

    /// Digest the owner must sign to authorize `operation` on `identity`
    /// at its current nonce.
    pub fn signing_digest(&self, identity: &Identity, operation: &Operation) -> [u8; 32] {
        operation.signing_digest(self.registry_id(), identity, self.nonce_of(identity))
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Authorize and apply `operation` on `identity`.
    ///
    /// Returns the emitted event. On error the registry is unchanged.
    pub fn execute(
        &mut self,
        identity: Identity,
        operation: Operation,
        authorization: &Authorization,
    ) -> Result<&RegistryEvent> {
        let now = self.clock.now();
        identity.require_non_empty("identity")?;
        operation.validate()?;
        let kind = plan(&operation, now)?;

        let op_name = operation.name();
        let authorized = match self.access.authorize(
            &self.ledger,
            &mut self.nonces,
            &identity,
            &operation,
            authorization,
        ) {
            Ok(authorized) => authorized,
            Err(e) => {
                warn!(
                    "rejected {op_name} on {identity} via {} path: {e}",
                    authorization.as_str()
                );
                return Err(e);
            }
        };

        self.apply_kind(identity, &kind);
        debug!(
            "{op_name} on {identity} by {} (nonce {})",
            authorized.actor, authorized.nonce
        );
        Ok(self.events.emit(identity, authorized.nonce, now, kind))
    }

    /// Authorize `operation` with an off-line signature from the owner.
    pub fn execute_signed(
        &mut self,
        identity: Identity,
        operation: Operation,
        signed: SignedAuthorization,
    ) -> Result<&RegistryEvent> {
        self.execute(identity, operation, &Authorization::Signed(signed))
    }

    /// Transfer control of `identity` to `new_owner`.
    pub fn change_owner(
        &mut self,
        identity: Identity,
        caller: Identity,
        new_owner: Identity,
    ) -> Result<&RegistryEvent> {
        self.execute(
            identity,
            Operation::ChangeOwner { new_owner },
            &Authorization::direct(caller),
        )
    }

    /// Grant `delegate` a `delegate_type` authorization for `validity`
    /// seconds from now.
    pub fn add_delegate(
        &mut self,
        identity: Identity,
        caller: Identity,
        delegate_type: Tag,
        delegate: Identity,
        validity: u64,
    ) -> Result<&RegistryEvent> {
        self.execute(
            identity,
            Operation::AddDelegate {
                delegate_type,
                delegate,
                validity,
            },
            &Authorization::direct(caller),
        )
    }

    /// End a delegate authorization now.
    pub fn revoke_delegate(
        &mut self,
        identity: Identity,
        caller: Identity,
        delegate_type: Tag,
        delegate: Identity,
    ) -> Result<&RegistryEvent> {
        self.execute(
            identity,
            Operation::RevokeDelegate {
                delegate_type,
                delegate,
            },
            &Authorization::direct(caller),
        )
    }

    /// Record a (name, value) claim valid for `validity` seconds from now.
    pub fn set_attribute(
        &mut self,
        identity: Identity,
        caller: Identity,
        name: Tag,
        value: impl Into<Vec<u8>>,
        validity: u64,
    ) -> Result<&RegistryEvent> {
        self.execute(
            identity,
            Operation::SetAttribute {
                name,
                value: value.into(),
                validity,
            },
            &Authorization::direct(caller),
        )
    }

    /// End a (name, value) claim now.
    pub fn revoke_attribute(
        &mut self,
        identity: Identity,
        caller: Identity,
        name: Tag,
        value: impl Into<Vec<u8>>,
    ) -> Result<&RegistryEvent> {
        self.execute(
            identity,
            Operation::RevokeAttribute {
                name,
                value: value.into(),
            },
            &Authorization::direct(caller),
        )
    }

    fn apply_kind(&mut self, identity: Identity, kind: &EventKind) {
        match kind {
            EventKind::OwnerChanged { owner } => self.ledger.set_owner(identity, *owner),
            EventKind::DelegateChanged {
                delegate_type,
                delegate,
                valid_to,
                change,
            } => self.delegates.apply(
                DelegateKey::new(identity, *delegate_type, *delegate),
                *change,
                *valid_to,
            ),
            EventKind::AttributeChanged {
                name,
                value,
                valid_to,
            } => {
                self.attributes
                    .append(identity, *name, value.clone(), *valid_to);
            }
        }
    }
}

/// Reject events outside the range of `plan`: empty identities, revocations
/// not ending at the event time, grants ending before it.
fn check_producible(event: &RegistryEvent) -> Result<()> {
    let corrupt = |reason: &str| {
        Err(RegistryError::CorruptJournal(format!(
            "event {} {reason}",
            event.sequence
        )))
    };
    if event.identity.is_zero() {
        return corrupt("has an empty identity");
    }
    match &event.kind {
        EventKind::OwnerChanged { owner } if owner.is_zero() => {
            corrupt("transfers to an empty owner")
        }
        EventKind::DelegateChanged { delegate, .. } if delegate.is_zero() => {
            corrupt("names an empty delegate")
        }
        EventKind::DelegateChanged {
            valid_to,
            change: DelegateChange::Revoked,
            ..
        } if *valid_to != event.timestamp => corrupt("revokes at a time other than its own"),
        EventKind::DelegateChanged { valid_to, .. } | EventKind::AttributeChanged { valid_to, .. }
            if *valid_to < event.timestamp =>
        {
            corrupt("expires before it was recorded")
        }
        _ => Ok(()),
    }
}

/// Translate an operation into the change it makes at `now`.
fn plan(operation: &Operation, now: u64) -> Result<EventKind> {
    Ok(match operation {
        Operation::ChangeOwner { new_owner } => EventKind::OwnerChanged { owner: *new_owner },
        Operation::AddDelegate {
            delegate_type,
            delegate,
            validity,
        } => EventKind::DelegateChanged {
            delegate_type: *delegate_type,
            delegate: *delegate,
            valid_to: deadline(now, *validity)?,
            change: DelegateChange::Granted,
        },
        Operation::RevokeDelegate {
            delegate_type,
            delegate,
        } => EventKind::DelegateChanged {
            delegate_type: *delegate_type,
            delegate: *delegate,
            valid_to: now,
            change: DelegateChange::Revoked,
        },
        Operation::SetAttribute {
            name,
            value,
            validity,
        } => EventKind::AttributeChanged {
            name: *name,
            value: value.clone(),
            valid_to: deadline(now, *validity)?,
        },
        Operation::RevokeAttribute { name, value } => EventKind::AttributeChanged {
            name: *name,
            value: value.clone(),
            valid_to: now,
        },
    })
}
