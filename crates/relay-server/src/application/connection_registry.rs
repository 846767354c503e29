//! ConnectionRegistry: the table of currently connected endpoints.
//!
//! The registry owns the [`BindingRegistry`] as well, so that removing an
//! endpoint and tearing down its binding happen together.  Lock order is
//! always connections → bindings; nothing takes them the other way round.
//!
//! # For beginners: `RwLock` vs `Mutex`
//!
//! Routing a message only *reads* the table (look up the receiver), while
//! connects and disconnects *write* it.  A `RwLock` lets many readers proceed
//! in parallel and gives a writer exclusive access.  The locks here are
//! `std::sync` locks: they are held for a few map operations only and never
//! across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use relay_core::EndpointId;
use thiserror::Error;
use tracing::debug;

use crate::application::binding_registry::{Binding, BindingRegistry};
use crate::application::endpoint::Endpoint;

/// Why [`ConnectionRegistry::bind`] refused to pair two ids.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// One of the ids has no live connection.
    #[error("endpoint {0} is not registered")]
    NotRegistered(EndpointId),

    /// One of the ids is already part of a binding (or both ids are equal).
    #[error("endpoint already bound")]
    AlreadyBound,
}

/// What [`ConnectionRegistry::unregister`] took out of the tables.
pub struct Unregistered {
    pub endpoint: Arc<dyn Endpoint>,
    /// The binding `endpoint` was part of, removed in the same critical section.
    pub binding: Option<Binding>,
}

/// Thread-safe id → endpoint table with cascading binding cleanup.
#[derive(Default)]
pub struct ConnectionRegistry {
    endpoints: RwLock<HashMap<EndpointId, Arc<dyn Endpoint>>>,
    bindings: BindingRegistry,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EndpointId, Arc<dyn Endpoint>>> {
        self.endpoints.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EndpointId, Arc<dyn Endpoint>>> {
        self.endpoints.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `endpoint` under its own id.
    ///
    /// Returns `false` (and leaves the existing entry alone) if the id is
    /// already present.
    pub fn register(&self, endpoint: Arc<dyn Endpoint>) -> bool {
        let id = endpoint.id();
        let mut table = self.write();
        if table.contains_key(&id) {
            return false;
        }
        table.insert(id, endpoint);
        debug!(endpoint = %id, "endpoint registered");
        true
    }

    /// Removes `id` together with its binding.
    ///
    /// Both removals happen under the table's write lock, so a concurrent
    /// [`bind`](Self::bind) either lands before (and its binding is returned
    /// here) or sees `id` as unregistered.  Returns `None` if `id` was not
    /// registered.
    pub fn unregister(&self, id: EndpointId) -> Option<Unregistered> {
        let mut table = self.write();
        let binding = self.bindings.unbind_all(id);
        if let Some(b) = binding {
            debug!(client = %b.client, target = %b.target, "binding removed");
        }
        let endpoint = table.remove(&id)?;
        debug!(endpoint = %id, "endpoint unregistered");
        Some(Unregistered { endpoint, binding })
    }

    /// Pairs two registered endpoints.
    ///
    /// The registration check and the insert run under the table's write
    /// lock, so neither id can be unregistered halfway through.
    ///
    /// # Errors
    ///
    /// - [`BindError::NotRegistered`] if either id is not connected.
    /// - [`BindError::AlreadyBound`] if either id is already paired.
    pub fn bind(&self, client: EndpointId, target: EndpointId) -> Result<Binding, BindError> {
        let table = self.write();
        for id in [client, target] {
            if !table.contains_key(&id) {
                return Err(BindError::NotRegistered(id));
            }
        }
        if self.bindings.bind(client, target) {
            Ok(Binding::new(client, target))
        } else {
            Err(BindError::AlreadyBound)
        }
    }

    /// Looks up an endpoint by id.
    pub fn get(&self, id: EndpointId) -> Option<Arc<dyn Endpoint>> {
        self.read().get(&id).cloned()
    }

    /// Returns `true` if `id` is currently registered.
    pub fn contains(&self, id: EndpointId) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All registered endpoints at this instant.
    pub fn snapshot(&self) -> Vec<Arc<dyn Endpoint>> {
        self.read().values().cloned().collect()
    }

    /// Removes every endpoint and every binding without notifying anyone.
    ///
    /// Used when the server stops; returns what was removed.
    pub fn drain(&self) -> Vec<Arc<dyn Endpoint>> {
        let mut table = self.write();
        let drained: Vec<_> = table.drain().map(|(_, ep)| ep).collect();
        for ep in &drained {
            self.bindings.unbind_all(ep.id());
        }
        drained
    }

    /// The pairing table owned by this registry.
    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
