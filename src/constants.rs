// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the FQDN network policy operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `FQDNNetworkPolicy` CRD.
pub const API_GROUP: &str = "networking.gke.io";

/// API version for the `FQDNNetworkPolicy` CRD.
pub const API_VERSION: &str = "v1alpha2";

/// Fully qualified API version (group/version).
pub const API_GROUP_VERSION: &str = "networking.gke.io/v1alpha2";

/// Kind name for the `FQDNNetworkPolicy` resource.
pub const KIND_FQDN_NETWORK_POLICY: &str = "FQDNNetworkPolicy";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries.
pub const DNS_PORT: u16 = 53;

/// Default path to the host resolver configuration file (C1).
pub const DEFAULT_RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

/// Per-query DNS timeout, in seconds, matching standard stub-resolver behavior.
/// Overridable via the `FQDNNP_DNS_QUERY_TIMEOUT_SECS` environment variable.
pub const DEFAULT_DNS_QUERY_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// CIDR Derivation / Requeue Constants (C3)
// ============================================================================

/// Ceiling on the TTL-derived requeue interval.
pub const TTL_CEILING_SECS: u64 = 30;

/// Fixed retry interval used when an `OwnershipConflict` is encountered.
pub const OWNERSHIP_CONFLICT_RETRY_SECS: u64 = 10;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for generic (transient) controller errors.
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default leader election lease duration (15 seconds).
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election renew deadline (10 seconds).
pub const DEFAULT_LEASE_RENEW_DEADLINE_SECS: u64 = 10;

/// Default leader election retry period (2 seconds).
pub const DEFAULT_LEASE_RETRY_PERIOD_SECS: u64 = 2;

// ============================================================================
// Kubernetes Client Constants
// ============================================================================

/// Default client-side QPS used when no `FQDNNP_KUBE_QPS` env var is set.
pub const KUBE_CLIENT_QPS: f32 = 20.0;

/// Default client-side burst used when no `FQDNNP_KUBE_BURST` env var is set.
pub const KUBE_CLIENT_BURST: u32 = 40;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime.
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for the Prometheus metrics HTTP server.
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for the Prometheus metrics endpoint.
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for the metrics HTTP server.
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";

// ============================================================================
// Admission Webhook Server Constants
// ============================================================================

/// Port for the admission webhook HTTPS/HTTP listener.
pub const WEBHOOK_SERVER_PORT: u16 = 8443;

/// Bind address for the admission webhook listener.
pub const WEBHOOK_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
