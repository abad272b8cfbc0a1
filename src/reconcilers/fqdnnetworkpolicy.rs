// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The `FQDNNetworkPolicy` reconciler (C6): finalizer management,
//! adoption/conflict detection, create/update/delete of the derived
//! `NetworkPolicy`, status transitions, and TTL-driven requeue.
//!
//! Modeled on the `reconcile_dnszone_wrapper` in `main.rs`: a thin
//! `kube::runtime::finalizer` wrapper around an `Apply`/`Cleanup` pair, with
//! metrics recorded around the whole call and errors normalized into one
//! error type for `error_policy`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicySpec,
};
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::finalizer;
use kube::runtime::finalizer::Event;
use kube::{Api, ResourceExt};
use serde_json::json;

use crate::constants::{
    DEFAULT_RESOLV_CONF_PATH, KIND_FQDN_NETWORK_POLICY, OWNERSHIP_CONFLICT_RETRY_SECS,
};
use crate::context::Context;
use crate::crd::{FQDNNetworkPolicy, FQDNNetworkPolicySpec, FQDNNetworkPolicyStatus, PolicyState};
use crate::derive::{self, Derived};
use crate::dns::nameservers::discover_nameservers;
use crate::dns::resolver::NameserverResolver;
use crate::errors::ReconcileError;
use crate::labels::{ANNOTATION_DELETE_POLICY, ANNOTATION_OWNED_BY, DELETE_POLICY_ABANDON, FINALIZER};
use crate::{metrics, netpolicy};

const FIELD_MANAGER: &str = "fqdnnetworkpolicies-controller";

/// Reconcile one `FQDNNetworkPolicy`.
///
/// Dispatches to the `kube::runtime::finalizer` state machine: `Apply` runs
/// the Derive+Upsert path, `Cleanup` runs the finalizer path.
/// `kube::runtime::finalizer` itself installs the finalizer before the first
/// `Apply` and removes it after the last `Cleanup`, so this function never
/// touches `metadata.finalizers` directly.
///
/// # Errors
///
/// Returns [`ReconcileError`] for any failure kube-runtime should retry with
/// generic backoff. `OwnershipConflict` is handled internally (status is
/// persisted and a fixed-interval requeue is returned as `Ok`).
pub async fn reconcile(
    policy: Arc<FQDNNetworkPolicy>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = std::time::Instant::now();
    let client = ctx.client.clone();
    let namespace = policy.namespace().unwrap_or_default();
    let api: Api<FQDNNetworkPolicy> = Api::namespaced(client, &namespace);

    let result = finalizer(&api, FINALIZER, policy, |event| async {
        match event {
            Event::Apply(policy) => apply(&policy, &ctx).await,
            Event::Cleanup(policy) => cleanup(&policy, &ctx).await,
        }
    })
    .await
    .map_err(map_finalizer_error);

    match &result {
        Ok(_) => metrics::record_reconciliation_success(KIND_FQDN_NETWORK_POLICY, start.elapsed()),
        Err(_) => metrics::record_reconciliation_error(KIND_FQDN_NETWORK_POLICY, start.elapsed()),
    }

    result
}

fn map_finalizer_error(err: finalizer::Error<ReconcileError>) -> ReconcileError {
    match err {
        finalizer::Error::ApplyFailed(e) | finalizer::Error::CleanupFailed(e) => e,
        finalizer::Error::AddFinalizer(e) | finalizer::Error::RemoveFinalizer(e) => {
            ReconcileError::Finalizer(e.to_string())
        }
        finalizer::Error::UnnamedObject => {
            ReconcileError::Finalizer("FQDNNetworkPolicy has no name".to_string())
        }
        finalizer::Error::InvalidFinalizer => {
            ReconcileError::Finalizer("invalid finalizer name".to_string())
        }
    }
}

/// Derive+Upsert path. Runs on every reconcile of a
/// live (non-deleting) object, after `kube::runtime::finalizer` has ensured
/// the finalizer is present (step 2).
async fn apply(policy: &FQDNNetworkPolicy, ctx: &Arc<Context>) -> Result<Action, ReconcileError> {
    let client = ctx.client.clone();
    let namespace = policy.namespace().unwrap_or_default();
    let name = policy.name_any();

    let nameservers = discover_nameservers(DEFAULT_RESOLV_CONF_PATH)?;
    let Some(nameserver) = nameservers.first() else {
        return Err(ReconcileError::NoNameserversConfigured);
    };
    let resolver = NameserverResolver {
        nameserver: nameserver.clone(),
        timeout: dns_query_timeout(),
    };

    let egress = derive::derive_egress(
        policy.spec.egress.as_deref().unwrap_or(&[]),
        &resolver,
    )
    .await;
    let ingress = derive::derive_ingress(
        policy.spec.ingress.as_deref().unwrap_or(&[]),
        &resolver,
    )
    .await;
    let next_sync_in = egress.next_sync_in.min(ingress.next_sync_in);

    let existing = netpolicy::get(&client, &namespace, &name).await?;

    if let Some(existing) = &existing {
        if !owned_by_matches(existing, &name) {
            let conflict = ReconcileError::OwnershipConflict {
                name: format!("{namespace}/{name}"),
            };
            mark_pending(&client, &namespace, &name, &conflict.to_string()).await?;
            return Ok(Action::requeue(Duration::from_secs(
                OWNERSHIP_CONFLICT_RETRY_SECS,
            )));
        }
    }

    let desired = build_network_policy(policy, &name, &namespace, existing.as_ref(), &egress, &ingress);
    if existing.is_some() {
        netpolicy::update(&client, &namespace, &desired).await?;
        metrics::record_resource_updated("NetworkPolicy");
    } else {
        netpolicy::create(&client, &namespace, &desired).await?;
        metrics::record_resource_created("NetworkPolicy");
    }

    mark_active(&client, &namespace, &name, next_sync_in).await?;

    Ok(Action::requeue(next_sync_in))
}

/// Finalizer path. `kube::runtime::finalizer` calls this
/// exactly once and removes the finalizer itself once it returns `Ok`.
async fn cleanup(policy: &FQDNNetworkPolicy, ctx: &Arc<Context>) -> Result<Action, ReconcileError> {
    let client = ctx.client.clone();
    let namespace = policy.namespace().unwrap_or_default();
    let name = policy.name_any();

    mark_destroying(&client, &namespace, &name).await?;

    if let Some(existing) = netpolicy::get(&client, &namespace, &name).await? {
        let abandon = existing
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_DELETE_POLICY))
            .is_some_and(|v| v == DELETE_POLICY_ABANDON);
        let owned_by_us = owned_by_matches(&existing, &name);

        if abandon || !owned_by_us {
            tracing::info!(
                namespace = %namespace,
                name = %name,
                abandon,
                owned_by_us,
                "leaving NetworkPolicy untouched during finalization"
            );
        } else {
            netpolicy::delete(&client, &namespace, &name).await?;
            metrics::record_resource_deleted("NetworkPolicy");
        }
    }

    Ok(Action::await_change())
}

fn owned_by_matches(network_policy: &NetworkPolicy, policy_name: &str) -> bool {
    network_policy
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_OWNED_BY))
        .is_some_and(|v| v == policy_name)
}

/// Policy types: taken verbatim from the object when
/// present, otherwise derived from which of `ingress`/`egress` are set.
#[must_use]
pub fn derive_policy_types(spec: &FQDNNetworkPolicySpec) -> Vec<String> {
    if let Some(types) = &spec.policy_types {
        return types.clone();
    }
    let mut types = Vec::new();
    if spec.ingress.is_some() {
        types.push("Ingress".to_string());
    }
    if spec.egress.is_some() {
        types.push("Egress".to_string());
    }
    types
}

/// Build the desired `NetworkPolicy` from a policy's spec and its derived
/// rules. A rule list direction (`egress`/`ingress`) is emitted as `Some`
/// (possibly empty, invariant 4) iff the source spec declared that
/// direction at all; otherwise it is omitted entirely.
///
/// When `existing` is `Some`, the fetched object is mutated in place:
/// its `resourceVersion` and every other annotation/label (e.g. an
/// operator-applied `delete-policy: abandon`) are carried forward
/// unchanged, and only `owned-by` and `spec` are touched. A fresh object
/// is built from scratch only when no `NetworkPolicy` exists yet.
#[must_use]
pub fn build_network_policy(
    policy: &FQDNNetworkPolicy,
    name: &str,
    namespace: &str,
    existing: Option<&NetworkPolicy>,
    egress: &Derived,
    ingress: &Derived,
) -> NetworkPolicy {
    let egress_rules: Vec<NetworkPolicyEgressRule> = egress
        .rules
        .iter()
        .map(|r| NetworkPolicyEgressRule {
            ports: r.ports.clone(),
            to: Some(r.peers.clone()),
        })
        .collect();
    let ingress_rules: Vec<NetworkPolicyIngressRule> = ingress
        .rules
        .iter()
        .map(|r| NetworkPolicyIngressRule {
            ports: r.ports.clone(),
            from: Some(r.peers.clone()),
        })
        .collect();

    let spec = Some(NetworkPolicySpec {
        pod_selector: policy.spec.pod_selector.clone(),
        policy_types: Some(derive_policy_types(&policy.spec)),
        egress: policy.spec.egress.as_ref().map(|_| egress_rules),
        ingress: policy.spec.ingress.as_ref().map(|_| ingress_rules),
    });

    if let Some(existing) = existing {
        let mut network_policy = existing.clone();
        network_policy
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(ANNOTATION_OWNED_BY.to_string(), name.to_string());
        network_policy.spec = spec;
        network_policy
    } else {
        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_OWNED_BY.to_string(), name.to_string());

        NetworkPolicy {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec,
            status: None,
        }
    }
}

async fn mark_active(
    client: &kube::Client,
    namespace: &str,
    name: &str,
    next_sync_in: Duration,
) -> Result<(), ReconcileError> {
    let now = Utc::now();
    let next = now
        + chrono::Duration::from_std(next_sync_in).unwrap_or_else(|_| chrono::Duration::seconds(0));
    let status = FQDNNetworkPolicyStatus {
        state: PolicyState::Active,
        reason: None,
        last_sync_time: Some(now.to_rfc3339()),
        next_sync_time: Some(next.to_rfc3339()),
    };
    patch_status(client, namespace, name, &status).await
}

async fn mark_pending(
    client: &kube::Client,
    namespace: &str,
    name: &str,
    reason: &str,
) -> Result<(), ReconcileError> {
    let now = Utc::now();
    let next = now
        + chrono::Duration::from_std(Duration::from_secs(OWNERSHIP_CONFLICT_RETRY_SECS))
            .unwrap_or_else(|_| chrono::Duration::seconds(0));
    let status = FQDNNetworkPolicyStatus {
        state: PolicyState::Pending,
        reason: Some(reason.to_string()),
        last_sync_time: Some(now.to_rfc3339()),
        next_sync_time: Some(next.to_rfc3339()),
    };
    patch_status(client, namespace, name, &status).await
}

async fn mark_destroying(
    client: &kube::Client,
    namespace: &str,
    name: &str,
) -> Result<(), ReconcileError> {
    let status = FQDNNetworkPolicyStatus {
        state: PolicyState::Destroying,
        reason: Some("Deleting NetworkPolicy".to_string()),
        last_sync_time: None,
        next_sync_time: None,
    };
    patch_status(client, namespace, name, &status).await
}

/// Re-fetches nothing explicitly: a status-only merge patch against the
/// live object satisfies "re-fetch before status write" on its own, since
/// a merge patch never clobbers a concurrently-changed spec.
async fn patch_status(
    client: &kube::Client,
    namespace: &str,
    name: &str,
    status: &FQDNNetworkPolicyStatus,
) -> Result<(), ReconcileError> {
    let api: Api<FQDNNetworkPolicy> = Api::namespaced(client.clone(), namespace);
    let patch = json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

fn dns_query_timeout() -> Duration {
    std::env::var("FQDNNP_DNS_QUERY_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map_or_else(
            || Duration::from_secs(crate::constants::DEFAULT_DNS_QUERY_TIMEOUT_SECS),
            Duration::from_secs,
        )
}

#[cfg(test)]
#[path = "fqdnnetworkpolicy_tests.rs"]
mod fqdnnetworkpolicy_tests;
