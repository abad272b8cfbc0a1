// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # fqdnnetworkpolicies - FQDN-based NetworkPolicy operator for Kubernetes
//!
//! This controller watches `FQDNNetworkPolicy` custom resources, resolves the
//! FQDNs they reference, and keeps a corresponding low-level `NetworkPolicy`
//! synced with the resulting `/32`/`/128` CIDR peers. Because DNS answers
//! change and expire, the derived object is kept current by a TTL-driven
//! reconcile loop rather than a one-shot translation.
//!
//! ## Modules
//!
//! - [`crd`] - the `FQDNNetworkPolicy` custom resource definition
//! - [`admission`] - defaulting and validation run at admission time
//! - [`derive`] - pure FQDN-to-CIDR derivation and TTL accounting
//! - [`dns`] - nameserver discovery and DNS resolution
//! - [`netpolicy`] - cluster client façade over the derived `NetworkPolicy`
//! - [`reconcilers`] - the `FQDNNetworkPolicy` reconcile loop
//! - [`context`] - shared controller state (client, reflector store, metrics)
//! - [`metrics`] - Prometheus instrumentation
//! - [`errors`] - error types shared across the crate
//! - [`webhook`] - thin `axum` layer exposing [`admission`] over HTTP
//! - [`labels`] - annotation/finalizer string constants
//!
//! ## Example
//!
//! ```rust,no_run
//! use fqdnnetworkpolicies::crd::{FQDNNetworkPolicyEgressRule, FQDNNetworkPolicyPeer};
//!
//! let rule = FQDNNetworkPolicyEgressRule {
//!     ports: None,
//!     to: vec![FQDNNetworkPolicyPeer {
//!         fqdns: vec!["api.example.com.".to_string()],
//!     }],
//! };
//! ```

pub mod admission;
pub mod constants;
pub mod context;
pub mod crd;
pub mod derive;
pub mod dns;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod netpolicy;
pub mod reconcilers;
pub mod webhook;
