//! BindingRegistry: the symmetric one-to-one pairing table.
//!
//! A binding pairs one client-role id with one target-role id.  Both members
//! map to the same [`Binding`] value in a single `HashMap`, so a lookup from
//! either side and every mutation happen in one critical section and the two
//! directions can never disagree.
//!
//! # Invariants
//!
//! - Each id appears in at most one binding.
//! - `peer_of(a) == Some(b)` if and only if `peer_of(b) == Some(a)`.
//! - A failed `bind` leaves the table untouched.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use relay_core::{EndpointId, Role};

/// One active pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub client: EndpointId,
    pub target: EndpointId,
}

impl Binding {
    /// Creates a binding value.  Does not register it anywhere.
    pub fn new(client: EndpointId, target: EndpointId) -> Self {
        Self { client, target }
    }

    /// Role `id` plays in this binding, or `None` if it is not a member.
    pub fn role_of(&self, id: EndpointId) -> Option<Role> {
        if id == self.client {
            Some(Role::Client)
        } else if id == self.target {
            Some(Role::Target)
        } else {
            None
        }
    }

    /// The other member, or `None` if `id` is not a member.
    pub fn peer_of(&self, id: EndpointId) -> Option<EndpointId> {
        match self.role_of(id)? {
            Role::Client => Some(self.target),
            Role::Target => Some(self.client),
        }
    }
}

/// Thread-safe pairing table.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    by_member: Mutex<HashMap<EndpointId, Binding>>,
}

impl BindingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<EndpointId, Binding>> {
        self.by_member.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pairs `client` with `target`.
    ///
    /// Returns `false` without changing anything if either id is already
    /// bound or if both ids are the same.
    pub fn bind(&self, client: EndpointId, target: EndpointId) -> bool {
        if client == target {
            return false;
        }
        let mut table = self.table();
        if table.contains_key(&client) || table.contains_key(&target) {
            return false;
        }
        let binding = Binding::new(client, target);
        table.insert(client, binding);
        table.insert(target, binding);
        true
    }

    /// Removes the binding `id` belongs to, whichever side it is on.
    ///
    /// Returns the removed binding, or `None` if `id` was not bound.
    pub fn unbind_all(&self, id: EndpointId) -> Option<Binding> {
        let mut table = self.table();
        let binding = table.remove(&id)?;
        if let Some(peer) = binding.peer_of(id) {
            table.remove(&peer);
        }
        Some(binding)
    }

    /// The id `id` is paired with, if any.
    pub fn peer_of(&self, id: EndpointId) -> Option<EndpointId> {
        self.table().get(&id).and_then(|b| b.peer_of(id))
    }

    /// The role `id` plays in its binding, if any.
    pub fn role_of(&self, id: EndpointId) -> Option<Role> {
        self.table().get(&id).and_then(|b| b.role_of(id))
    }

    /// The binding `id` belongs to, if any.
    pub fn binding_of(&self, id: EndpointId) -> Option<Binding> {
        self.table().get(&id).copied()
    }

    /// Number of active pairs.
    pub fn len(&self) -> usize {
        self.table().len() / 2
    }

    /// Returns `true` when no pair exists.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
