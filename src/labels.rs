// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Annotation and finalizer string constants used by the `FQDNNetworkPolicy` reconciler.
//!
//! These are the entire ownership protocol between a `FQDNNetworkPolicy` and the
//! `NetworkPolicy` it derives: two annotations on the low-level object, and one
//! finalizer on the high-level object.

/// Annotation on a `NetworkPolicy` naming the `FQDNNetworkPolicy` that owns it.
///
/// A `NetworkPolicy` carrying this annotation with a value equal to a live
/// `FQDNNetworkPolicy`'s name is that policy's unique derivative; no other
/// `FQDNNetworkPolicy` may modify it.
pub const ANNOTATION_OWNED_BY: &str = "fqdnnetworkpolicies.networking.gke.io/owned-by";

/// Annotation on a `NetworkPolicy` controlling its fate when the owning
/// `FQDNNetworkPolicy` is deleted.
///
/// A value of `"abandon"` suppresses deletion of the `NetworkPolicy` during
/// finalization; any other value (or its absence) means the normal delete path runs.
pub const ANNOTATION_DELETE_POLICY: &str = "fqdnnetworkpolicies.networking.gke.io/delete-policy";

/// Value of [`ANNOTATION_DELETE_POLICY`] that suppresses deletion on cleanup.
pub const DELETE_POLICY_ABANDON: &str = "abandon";

/// Finalizer installed on a `FQDNNetworkPolicy` on its first successful reconcile,
/// and removed once its owned `NetworkPolicy` has been deleted or abandoned.
pub const FINALIZER: &str = "finalizer.fqdnnetworkpolicies.networking.gke.io";
