// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the FQDN network policy engine.
//!
//! These cover nameserver-config failures, per-FQDN resolve failures
//! (non-fatal), reconcile-level failures (cluster API errors and ownership
//! conflicts), and admission-only validation errors.

use thiserror::Error;

/// Failures reading or parsing the host resolver configuration (C1).
#[derive(Error, Debug, Clone)]
pub enum NameserverError {
    /// The resolver configuration file could not be opened or read.
    ///
    /// Treated as transient: an unparseable resolver config is retried
    /// rather than treated as a permanent failure.
    #[error("could not read resolver configuration at {path}: {source}")]
    ConfigUnreadable {
        /// Path that was opened (e.g. `/etc/resolv.conf`).
        path: String,
        /// Underlying I/O error, rendered as text since `std::io::Error` isn't `Clone`.
        source: String,
    },
}

/// Failures resolving a single FQDN (C2). Per-FQDN and non-fatal to the
/// enclosing reconcile: an offending FQDN simply contributes no peers.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The query could not be sent or no response was received (timeout, refused connection).
    #[error("transport error resolving {fqdn} via {nameserver}: {reason}")]
    Transport {
        /// The FQDN being resolved.
        fqdn: String,
        /// The nameserver endpoint queried.
        nameserver: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The nameserver explicitly refused the query.
    #[error("nameserver {nameserver} refused query for {fqdn}")]
    Refused {
        /// The FQDN being resolved.
        fqdn: String,
        /// The nameserver endpoint queried.
        nameserver: String,
    },

    /// The response could not be parsed as a valid DNS message.
    #[error("malformed DNS response for {fqdn} from {nameserver}: {reason}")]
    Malformed {
        /// The FQDN being resolved.
        fqdn: String,
        /// The nameserver endpoint queried.
        nameserver: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// Failures from the reconciler (C6), surfaced to `kube::runtime::Controller`'s
/// `error_policy`.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A `NetworkPolicy` with the target (namespace, name) already exists and
    /// its `owned-by` annotation does not match the reconciling `FQDNNetworkPolicy`.
    ///
    /// Persisted as `status.state = Pending` with this as `status.reason`,
    /// and retried at [`crate::constants::OWNERSHIP_CONFLICT_RETRY_SECS`]
    /// rather than the generic error backoff.
    #[error("NetworkPolicy {name} is owned by another FQDNNetworkPolicy")]
    OwnershipConflict {
        /// The conflicting `NetworkPolicy`'s (namespace-qualified) name.
        name: String,
    },

    /// A cluster API call failed (network error, conflict, etc). Transient;
    /// the runtime requeues with backoff.
    #[error(transparent)]
    ClusterApi(#[from] kube::Error),

    /// The host resolver configuration could not be read. Treated as
    /// transient: retried rather than failed permanently.
    #[error(transparent)]
    Nameserver(#[from] NameserverError),

    /// No nameservers were found in the resolver configuration, so no FQDN
    /// in this reconcile can be resolved. Transient.
    #[error("no nameservers configured")]
    NoNameserversConfigured,

    /// `kube::runtime::finalizer`'s own plumbing failed (the object has no
    /// name, the finalizer string is malformed, or the add/remove patch
    /// itself errored). Transient.
    #[error("finalizer error: {0}")]
    Finalizer(String),
}

impl ReconcileError {
    /// Whether this error is transient (should be retried with generic backoff)
    /// as opposed to the fixed-interval `OwnershipConflict` retry.
    #[must_use]
    pub fn is_ownership_conflict(&self) -> bool {
        matches!(self, Self::OwnershipConflict { .. })
    }
}

/// A single field-level validation failure, collected (not short-circuited)
/// by `admission::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// JSON-pointer-ish path to the offending field, e.g. `spec.egress[0].ports[1].port`.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

/// Aggregated validation failure, returned only from admission, never from reconcile.
#[derive(Debug, Clone, Default)]
pub struct ValidationError {
    /// Every violation found, in the order they were discovered.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// `true` if no violations were recorded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "FQDNNetworkPolicy is invalid: {joined}")
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
