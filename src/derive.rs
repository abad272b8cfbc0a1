// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CIDR derivation (C3): turns FQDN peers into `/32`/`/128` CIDR peers and
//! computes the TTL-driven requeue duration.
//!
//! Pure with respect to the cluster API — the only external interaction is
//! DNS resolution, abstracted behind [`Resolve`] so this module is unit
//! testable without sockets.

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::{NetworkPolicyPeer, NetworkPolicyPort};
use std::time::Duration;

use crate::constants::TTL_CEILING_SECS;
use crate::crd::{FQDNNetworkPolicyEgressRule, FQDNNetworkPolicyIngressRule};
use crate::dns::resolver::ResolvedRecords;

/// Abstracts "resolve this FQDN against the first configured nameserver" so
/// [`derive_egress`]/[`derive_ingress`] can be unit tested against a fake.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve one FQDN. Per failures are swallowed by the
    /// implementation (logged, contributing no answers) rather than returned
    /// here — the derivation algorithm only ever sees answer sets.
    async fn resolve(&self, fqdn: &str) -> ResolvedRecords;
}

/// A derived rule: the original ports, and the CIDR peers resolved from its FQDNs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedRule {
    /// Ports carried verbatim from the source rule.
    pub ports: Option<Vec<NetworkPolicyPort>>,
    /// Derived `ipBlock` peers, in FQDN/answer order.
    pub peers: Vec<NetworkPolicyPeer>,
}

/// Output of [`derive_egress`]/[`derive_ingress`]: the (possibly shorter,
/// per invariant 4) list of derived rules, plus the next-reconcile interval.
#[derive(Debug, Clone)]
pub struct Derived {
    /// One entry per input rule whose peer set was non-empty, in input order.
    pub rules: Vec<DerivedRule>,
    /// `min(30s, minimum TTL observed across every answer)`.
    pub next_sync_in: Duration,
}

/// Derive egress rules from FQDN-based egress rules.
pub async fn derive_egress(
    rules: &[FQDNNetworkPolicyEgressRule],
    resolver: &dyn Resolve,
) -> Derived {
    let mut min_ttl = TTL_CEILING_SECS;
    let mut derived = Vec::new();

    for rule in rules {
        let fqdns = rule.to.iter().flat_map(|peer| peer.fqdns.iter());
        if let Some(peers) = derive_peers(fqdns, resolver, &mut min_ttl).await {
            derived.push(DerivedRule {
                ports: rule.ports.clone(),
                peers,
            });
        }
    }

    Derived {
        rules: derived,
        next_sync_in: Duration::from_secs(min_ttl),
    }
}

/// Derive ingress rules from FQDN-based ingress rules.
pub async fn derive_ingress(
    rules: &[FQDNNetworkPolicyIngressRule],
    resolver: &dyn Resolve,
) -> Derived {
    let mut min_ttl = TTL_CEILING_SECS;
    let mut derived = Vec::new();

    for rule in rules {
        let fqdns = rule.from.iter().flat_map(|peer| peer.fqdns.iter());
        if let Some(peers) = derive_peers(fqdns, resolver, &mut min_ttl).await {
            derived.push(DerivedRule {
                ports: rule.ports.clone(),
                peers,
            });
        }
    }

    Derived {
        rules: derived,
        next_sync_in: Duration::from_secs(min_ttl),
    }
}

/// Resolve every FQDN in order, accumulate `/32`/`/128` peers, and update
/// `min_ttl`. Returns `None` (rule must be omitted, invariant 4) if the
/// assembled peer list ends up empty.
async fn derive_peers<'a>(
    fqdns: impl Iterator<Item = &'a String>,
    resolver: &dyn Resolve,
    min_ttl: &mut u64,
) -> Option<Vec<NetworkPolicyPeer>> {
    let mut peers = Vec::new();

    for fqdn in fqdns {
        let resolved = resolver.resolve(fqdn).await;

        for answer in &resolved.ipv4 {
            peers.push(cidr_peer(&format!("{}/32", answer.address)));
            *min_ttl = (*min_ttl).min(u64::from(answer.ttl));
        }
        for answer in &resolved.ipv6 {
            peers.push(cidr_peer(&format!("{}/128", answer.address)));
            *min_ttl = (*min_ttl).min(u64::from(answer.ttl));
        }
    }

    if peers.is_empty() {
        None
    } else {
        Some(peers)
    }
}

fn cidr_peer(cidr: &str) -> NetworkPolicyPeer {
    NetworkPolicyPeer {
        ip_block: Some(k8s_openapi::api::networking::v1::IPBlock {
            cidr: cidr.to_string(),
            except: None,
        }),
        namespace_selector: None,
        pod_selector: None,
    }
}

#[cfg(test)]
#[path = "derive_tests.rs"]
mod derive_tests;
