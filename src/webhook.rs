// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Thin HTTP layer around the pure admission functions (C4/C5).
//!
//! Admission-webhook transport (HTTPS, TLS bootstrap, certificate rotation)
//! is out of scope; this module is the bare `axum` router decoding a
//! standard `admission.k8s.io/v1` `AdmissionReview` request and re-encoding
//! an `AdmissionReview` response, the same unadorned way `main::
//! start_metrics_server` exposes its Prometheus registry without any
//! TLS/cert-rotation concerns.

use axum::extract::Json;
use axum::routing::post;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use crate::admission::{default_spec, validate};
use crate::crd::FQDNNetworkPolicySpec;

/// Mutating webhook path (defaulting, C5).
pub const MUTATE_PATH: &str = "/mutate-networking-gke-io-v1alpha2-fqdnnetworkpolicy";
/// Validating webhook path (validation, C4).
pub const VALIDATE_PATH: &str = "/validate-networking-gke-io-v1alpha2-fqdnnetworkpolicy";

/// Build the admission webhook router, to be served behind whatever
/// TLS-terminating layer the cluster's admission controller requires
/// (bootstrapping that layer is out of scope).
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route(MUTATE_PATH, post(mutate))
        .route(VALIDATE_PATH, post(validate_handler))
}

/// Mutating webhook handler: runs [`default_spec`] (C5) and returns a
/// whole-`spec` JSON Patch replace when defaulting changed anything.
async fn mutate(Json(review): Json<Value>) -> Json<Value> {
    let uid = request_uid(&review);

    let Some(spec) = extract_spec(&review) else {
        // DELETE operations (and any object we can't decode) are always
        // accepted unchanged "Delete admission is a no-op".
        return Json(admission_response(&uid, true, None, None));
    };

    let mut defaulted = spec.clone();
    default_spec(&mut defaulted);

    let patch = if serde_json::to_value(&spec).ok() == serde_json::to_value(&defaulted).ok() {
        None
    } else {
        serde_json::to_value(&defaulted).ok()
    };

    Json(admission_response(&uid, true, patch, None))
}

/// Validating webhook handler: runs [`validate`] (C4) and denies with an
/// aggregated message listing every violated field path.
async fn validate_handler(Json(review): Json<Value>) -> Json<Value> {
    let uid = request_uid(&review);

    let Some(spec) = extract_spec(&review) else {
        return Json(admission_response(&uid, true, None, None));
    };

    let errors = validate(&spec);
    if errors.is_ok() {
        Json(admission_response(&uid, true, None, None))
    } else {
        Json(admission_response(&uid, false, None, Some(errors.to_string())))
    }
}

fn request_uid(review: &Value) -> String {
    review
        .get("request")
        .and_then(|r| r.get("uid"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn extract_spec(review: &Value) -> Option<FQDNNetworkPolicySpec> {
    let object = review.get("request")?.get("object")?;
    let spec = object.get("spec")?;
    serde_json::from_value(spec.clone()).ok()
}

fn admission_response(
    uid: &str,
    allowed: bool,
    patched_spec: Option<Value>,
    message: Option<String>,
) -> Value {
    let mut response = json!({
        "uid": uid,
        "allowed": allowed,
    });

    if let Some(patched_spec) = patched_spec {
        let patch_ops = json!([{ "op": "replace", "path": "/spec", "value": patched_spec }]);
        response["patchType"] = json!("JSONPatch");
        response["patch"] = json!(BASE64.encode(patch_ops.to_string()));
    }

    if let Some(message) = message {
        response["status"] = json!({ "message": message });
    }

    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "response": response,
    })
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod webhook_tests;
