// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `FQDNNetworkPolicy` controller.
//!
//! Every reconcile gets an `Arc<Context>` carrying the Kubernetes client and
//! a reflector [`Store`] over `FQDNNetworkPolicy` objects, used for the
//! startup drift scan and for store-size metrics. Metrics are recorded
//! through free functions against a global registry rather than threaded
//! through the context.

use kube::runtime::reflector::Store;
use kube::Client;

use crate::crd::FQDNNetworkPolicy;

/// Shared context passed to the controller and its reconcile function.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations.
    pub client: Client,

    /// Reflector store over every known `FQDNNetworkPolicy`.
    pub store: Store<FQDNNetworkPolicy>,
}

impl Context {
    /// Construct a new context.
    #[must_use]
    pub fn new(client: Client, store: Store<FQDNNetworkPolicy>) -> Self {
        Self { client, store }
    }

    /// Current number of `FQDNNetworkPolicy` objects known to the store,
    /// used to populate the `resources_active` gauge at the top of every
    /// reconcile.
    #[must_use]
    pub fn store_len(&self) -> usize {
        store_len(&self.store)
    }
}

/// Free-function form of [`Context::store_len`], kept separate so it can be
/// unit tested against a bare [`Store`] without constructing a [`Client`].
#[must_use]
pub fn store_len(store: &Store<FQDNNetworkPolicy>) -> usize {
    store.state().len()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
