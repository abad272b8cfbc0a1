// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for the FQDN network policy engine.
//!
//! # Resource Types
//!
//! - [`FQDNNetworkPolicy`] - A high-level network policy expressed in terms of FQDNs,
//!   reconciled down to a low-level [`k8s_openapi::api::networking::v1::NetworkPolicy`]
//!   expressed in CIDR blocks.
//!
//! # Example
//!
//! ```rust,no_run
//! use fqdnnetworkpolicies::crd::{FQDNNetworkPolicyPeer, FQDNNetworkPolicySpec, FQDNNetworkPolicyEgressRule};
//! use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
//!
//! let spec = FQDNNetworkPolicySpec {
//!     pod_selector: LabelSelector::default(),
//!     policy_types: Some(vec!["Egress".to_string()]),
//!     ingress: None,
//!     egress: Some(vec![FQDNNetworkPolicyEgressRule {
//!         ports: None,
//!         to: vec![FQDNNetworkPolicyPeer { fqdns: vec!["example.com".to_string()] }],
//!     }]),
//! };
//! ```

use k8s_openapi::api::networking::v1::NetworkPolicyPort;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// State of a [`FQDNNetworkPolicy`], mirroring invariant 5.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PolicyState {
    /// The last reconcile failed, encountered an ownership conflict, or the
    /// object has never successfully reconciled.
    #[default]
    Pending,
    /// The last reconcile completed without error.
    Active,
    /// `deletionTimestamp` is set; the finalizer path is running.
    Destroying,
}

/// A peer expressed as an ordered sequence of FQDNs.
///
/// Resolved at reconcile time into `/32` (IPv4) and `/128` (IPv6) CIDR peers
/// on the derived [`k8s_openapi::api::networking::v1::NetworkPolicy`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct FQDNNetworkPolicyPeer {
    /// FQDNs to resolve. Wildcards are rejected at admission time.
    pub fqdns: Vec<String>,
}

/// One egress rule: ports plus a list of FQDN peers traffic is allowed to.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FQDNNetworkPolicyEgressRule {
    /// Ports this rule applies to. An empty/absent list matches all ports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<NetworkPolicyPort>>,

    /// FQDN peers traffic is allowed to reach.
    pub to: Vec<FQDNNetworkPolicyPeer>,
}

/// One ingress rule: ports plus a list of FQDN peers traffic is allowed from.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FQDNNetworkPolicyIngressRule {
    /// Ports this rule applies to. An empty/absent list matches all ports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<NetworkPolicyPort>>,

    /// FQDN peers traffic is allowed to arrive from.
    pub from: Vec<FQDNNetworkPolicyPeer>,
}

/// `FQDNNetworkPolicy` status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FQDNNetworkPolicyStatus {
    /// Current lifecycle state.
    pub state: PolicyState,

    /// Free-form, human-readable reason for the current state, e.g. an
    /// `OwnershipConflict` message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// RFC3339 timestamp of the last successful reconcile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<String>,

    /// RFC3339 timestamp at which the next reconcile is scheduled, driven by
    /// the minimum TTL observed across the last reconcile's DNS answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sync_time: Option<String>,
}

/// `FQDNNetworkPolicy` translates a high-level, FQDN-based network-egress/ingress
/// policy into a low-level `NetworkPolicy` expressed in CIDR blocks, kept
/// synchronized with DNS via a TTL-driven reconcile schedule.
///
/// The low-level object is adopted via two annotations (`owned-by`,
/// `delete-policy`) rather than a native Kubernetes owner reference, so that
/// a pre-existing `NetworkPolicy` can either be safely adopted or left
/// untouched ("abandoned") on deletion. See `labels.rs` for the exact
/// annotation/finalizer strings.
///
/// # Example
///
/// ```yaml
/// apiVersion: networking.gke.io/v1alpha2
/// kind: FQDNNetworkPolicy
/// metadata:
///   name: allow-example-egress
///   namespace: default
/// spec:
///   podSelector: {}
///   policyTypes: ["Egress"]
///   egress:
///     - ports:
///         - port: 443
///           protocol: TCP
///       to:
///         - fqdns: ["example.com"]
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.gke.io",
    version = "v1alpha2",
    kind = "FQDNNetworkPolicy",
    namespaced,
    shortname = "fqdnnp",
    shortname = "fqdnnps",
    doc = "FQDNNetworkPolicy translates an FQDN-based egress/ingress policy into a CIDR-based NetworkPolicy, kept synchronized with DNS via a TTL-driven reconcile schedule.",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.reason"}"#,
    printcolumn = r#"{"name":"NextSync","type":"date","jsonPath":".status.nextSyncTime"}"#
)]
#[kube(status = "FQDNNetworkPolicyStatus")]
#[serde(rename_all = "camelCase")]
pub struct FQDNNetworkPolicySpec {
    /// Opaque label selector, forwarded verbatim onto the derived `NetworkPolicy`.
    #[serde(default)]
    pub pod_selector: LabelSelector,

    /// Policy types this object governs. When absent, derived from which of
    /// `ingress`/`egress` are present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_types: Option<Vec<String>>,

    /// Ingress rules, in the order they should appear on the derived `NetworkPolicy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Vec<FQDNNetworkPolicyIngressRule>>,

    /// Egress rules, in the order they should appear on the derived `NetworkPolicy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress: Option<Vec<FQDNNetworkPolicyEgressRule>>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
