// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission-time defaulting (C5) and validation (C4).
//!
//! Both operate purely on [`FQDNNetworkPolicySpec`] so they can run either
//! behind the [`crate::webhook`] HTTP layer or directly in tests, mirroring
//! the original `Default()`/`ValidatePorts()`/`ValidateFQDNs()` split, here
//! generalized from egress-only to ingress+egress.

use idna::Config;
use k8s_openapi::api::networking::v1::NetworkPolicyPort;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::crd::FQDNNetworkPolicySpec;
use crate::errors::ValidationError;

const VALID_PROTOCOLS: [&str; 3] = ["TCP", "UDP", "SCTP"];

/// Default every port with an empty protocol to TCP (C5).
///
/// Idempotent: running this twice is equivalent to running it once, since
/// only empty protocols are touched.
pub fn default_spec(spec: &mut FQDNNetworkPolicySpec) {
    if let Some(rules) = spec.egress.as_mut() {
        for rule in rules {
            default_ports(rule.ports.as_mut());
        }
    }
    if let Some(rules) = spec.ingress.as_mut() {
        for rule in rules {
            default_ports(rule.ports.as_mut());
        }
    }
}

fn default_ports(ports: Option<&mut Vec<NetworkPolicyPort>>) {
    let Some(ports) = ports else { return };
    for port in ports {
        if port.protocol.as_deref().unwrap_or("").is_empty() {
            port.protocol = Some("TCP".to_string());
        }
    }
}

/// Validate an `FQDNNetworkPolicy` spec (C4).
///
/// Collects every violation rather than short-circuiting on the first one,
/// so a single admission rejection lists all offending fields at once.
#[must_use]
pub fn validate(spec: &FQDNNetworkPolicySpec) -> ValidationError {
    let mut errors = ValidationError::default();

    if let Some(rules) = &spec.egress {
        for (ir, rule) in rules.iter().enumerate() {
            let prefix = format!("spec.egress[{ir}]");
            validate_ports(&prefix, rule.ports.as_deref(), &mut errors);
            for (ip, peer) in rule.to.iter().enumerate() {
                validate_fqdns(&format!("{prefix}.to[{ip}]"), &peer.fqdns, &mut errors);
            }
        }
    }

    if let Some(rules) = &spec.ingress {
        for (ir, rule) in rules.iter().enumerate() {
            let prefix = format!("spec.ingress[{ir}]");
            validate_ports(&prefix, rule.ports.as_deref(), &mut errors);
            for (ip, peer) in rule.from.iter().enumerate() {
                validate_fqdns(&format!("{prefix}.from[{ip}]"), &peer.fqdns, &mut errors);
            }
        }
    }

    errors
}

fn validate_ports(prefix: &str, ports: Option<&[NetworkPolicyPort]>, errors: &mut ValidationError) {
    let Some(ports) = ports else { return };

    for (i, port) in ports.iter().enumerate() {
        let field = format!("{prefix}.ports[{i}]");

        if let Some(value) = &port.port {
            match port_as_i64(value) {
                Some(0) => {
                    tracing::warn!(field = %field, "port 0 matches all ports");
                }
                Some(v) if (0..=65535).contains(&v) => {}
                _ => errors.push(
                    format!("{field}.port"),
                    "invalid port, must be between 0 and 65535",
                ),
            }
        }

        let protocol_ok = match port.protocol.as_deref() {
            None | Some("") => true,
            Some(p) => VALID_PROTOCOLS.contains(&p),
        };
        if !protocol_ok {
            errors.push(
                format!("{field}.protocol"),
                "invalid protocol, must be TCP, UDP, or SCTP",
            );
        }
    }
}

fn port_as_i64(value: &IntOrString) -> Option<i64> {
    match value {
        IntOrString::Int(v) => Some(i64::from(*v)),
        IntOrString::String(s) => s.parse().ok(),
    }
}

fn validate_fqdns(prefix: &str, fqdns: &[String], errors: &mut ValidationError) {
    let profile = Config::default()
        .use_std3_ascii_rules(true)
        .verify_dns_length(true)
        .check_hyphens(true);

    for (i, fqdn) in fqdns.iter().enumerate() {
        if let Err(e) = profile.to_ascii(fqdn) {
            errors.push(
                format!("{prefix}.fqdns[{i}]"),
                format!("invalid FQDN {fqdn:?}: {e:?}"),
            );
        }
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod admission_tests;
