// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The `FQDNNetworkPolicy` reconciler (C6).
//!
//! # Example
//!
//! ```rust,no_run
//! use fqdnnetworkpolicies::context::Context;
//! use fqdnnetworkpolicies::crd::FQDNNetworkPolicy;
//! use fqdnnetworkpolicies::reconcilers::fqdnnetworkpolicy::reconcile;
//! use kube::runtime::controller::Action;
//! use std::sync::Arc;
//!
//! async fn run(ctx: Arc<Context>, policy: Arc<FQDNNetworkPolicy>) -> Action {
//!     reconcile(policy, ctx).await.unwrap_or_else(|_| Action::await_change())
//! }
//! ```

pub mod fqdnnetworkpolicy;

/// Check if a status value has actually changed compared to the current status.
///
/// Prevents unnecessary status patches that would otherwise re-trigger
/// reconciliation: in kube-rs a status update is itself an "object updated"
/// event, so patching status on every reconcile creates a tight loop.
///
/// # Example
///
/// ```rust,ignore
/// use fqdnnetworkpolicies::reconcilers::status_changed;
///
/// let current = policy.status.as_ref().map(|s| s.state);
/// if status_changed(&current, &Some(new_state)) {
///     // safe to patch
/// }
/// ```
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}

#[cfg(test)]
mod mod_tests;
