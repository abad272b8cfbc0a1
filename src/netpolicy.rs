// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster client façade (C7) over the low-level `NetworkPolicy` object.
//!
//! Centralizes the `get`/`create`/`update`/`delete` calls against the
//! derived `NetworkPolicy`, the same shape as the direct `Api<T>` use
//! sprinkled through `reconcilers::*`, but kept in one place here since
//! this crate has exactly one derived object kind.

use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client, ResourceExt};

/// Fetch a `NetworkPolicy` by (namespace, name).
///
/// `Ok(None)` means "not found" (the [`ignore_not_found`] translation),
/// any other error propagates as transient.
///
/// # Errors
///
/// Returns `kube::Error` for any non-404 failure.
pub async fn get(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<Option<NetworkPolicy>, kube::Error> {
    let api: Api<NetworkPolicy> = Api::namespaced(client.clone(), namespace);
    ignore_not_found(api.get(name).await)
}

/// Create a `NetworkPolicy`.
///
/// # Errors
///
/// Returns `kube::Error` on any cluster API failure, including
/// already-exists races.
pub async fn create(
    client: &Client,
    namespace: &str,
    network_policy: &NetworkPolicy,
) -> Result<NetworkPolicy, kube::Error> {
    let api: Api<NetworkPolicy> = Api::namespaced(client.clone(), namespace);
    api.create(&PostParams::default(), network_policy).await
}

/// Replace a `NetworkPolicy` in place.
///
/// Preserves optimistic concurrency: a stale `resourceVersion` on
/// `network_policy` surfaces as a `kube::Error::Api` Conflict, which the
/// reconciler maps to a requeue.
///
/// # Errors
///
/// Returns `kube::Error` on any cluster API failure, including version
/// conflicts.
pub async fn update(
    client: &Client,
    namespace: &str,
    network_policy: &NetworkPolicy,
) -> Result<NetworkPolicy, kube::Error> {
    let api: Api<NetworkPolicy> = Api::namespaced(client.clone(), namespace);
    let name = network_policy.name_any();
    api.replace(&name, &PostParams::default(), network_policy)
        .await
}

/// Delete a `NetworkPolicy` by name. A prior deletion (404) is not an error.
///
/// # Errors
///
/// Returns `kube::Error` for any non-404 failure.
pub async fn delete(client: &Client, namespace: &str, name: &str) -> Result<(), kube::Error> {
    let api: Api<NetworkPolicy> = Api::namespaced(client.clone(), namespace);
    ignore_not_found(api.delete(name, &DeleteParams::default()).await)?;
    Ok(())
}

/// Translate a 404 `kube::Error` into `Ok(None)`, generalized here to any
/// result type.
pub fn ignore_not_found<T>(result: Result<T, kube::Error>) -> Result<Option<T>, kube::Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "netpolicy_tests.rs"]
mod netpolicy_tests;
