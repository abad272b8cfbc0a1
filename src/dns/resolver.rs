// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS resolution (C2): one A and one AAAA query per FQDN against a single
//! nameserver.

use async_trait::async_trait;
use hickory_client::client::{Client, SyncClient};
use hickory_client::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_client::udp::UdpClientConnection;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DNS_PORT;
use crate::derive::Resolve;
use crate::errors::ResolveError;

/// One resolved answer: an address paired with its TTL, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
    /// The resolved address.
    pub address: IpAddr,
    /// The answer's TTL, in seconds.
    pub ttl: u32,
}

/// The A and AAAA answer sets for one FQDN, queried independently.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRecords {
    /// IPv4 (A) answers.
    pub ipv4: Vec<Answer>,
    /// IPv6 (AAAA) answers.
    pub ipv6: Vec<Answer>,
}

/// Resolve one FQDN against one nameserver, issuing one A and one AAAA query.
///
/// `nameserver` is a bare host/IP as returned by
/// [`crate::dns::nameservers::discover_nameservers`]; it is combined with
/// [`DNS_PORT`] (53) here. If `fqdn` does not end in `.`, one is appended.
///
/// A and AAAA failures are independent: either query may fail while the
/// other succeeds, matching the caller's per-query error handling in C3
/// ("on resolver error, log and continue to AAAA").
///
/// # Errors
///
/// Returns [`ResolveError`] if *both* queries fail. If only one of the two
/// fails, its half of [`ResolvedRecords`] is simply empty — see
/// [`resolve_a`]/[`resolve_aaaa`] for the per-query primitives this is built from.
pub async fn resolve_one(
    fqdn: &str,
    nameserver: &str,
    timeout: Duration,
) -> ResolvedRecords {
    let fqdn = normalize_fqdn(fqdn);

    let ipv4 = match resolve_a(&fqdn, nameserver, timeout).await {
        Ok(answers) => {
            record_outcome(&answers);
            answers
        }
        Err(e) => {
            tracing::info!(fqdn = %fqdn, nameserver, error = %e, "A query failed, continuing to AAAA");
            crate::metrics::record_dns_resolution(outcome_label(&e));
            Vec::new()
        }
    };

    let ipv6 = match resolve_aaaa(&fqdn, nameserver, timeout).await {
        Ok(answers) => {
            record_outcome(&answers);
            answers
        }
        Err(e) => {
            tracing::info!(fqdn = %fqdn, nameserver, error = %e, "AAAA query failed");
            crate::metrics::record_dns_resolution(outcome_label(&e));
            Vec::new()
        }
    };

    ResolvedRecords { ipv4, ipv6 }
}

fn record_outcome(answers: &[Answer]) {
    let outcome = if answers.is_empty() { "empty" } else { "resolved" };
    crate::metrics::record_dns_resolution(outcome);
}

fn outcome_label(error: &ResolveError) -> &'static str {
    match error {
        ResolveError::Transport { .. } => "transport_error",
        ResolveError::Refused { .. } => "refused",
        ResolveError::Malformed { .. } => "malformed",
    }
}

/// [`Resolve`] implementation backing production reconciles: issues A/AAAA
/// queries against a fixed nameserver with a fixed per-query timeout.
pub struct NameserverResolver {
    /// Bare host/IP of the nameserver to query, as returned by
    /// [`crate::dns::nameservers::discover_nameservers`].
    pub nameserver: String,
    /// Per-query timeout.
    pub timeout: Duration,
}

#[async_trait]
impl Resolve for NameserverResolver {
    async fn resolve(&self, fqdn: &str) -> ResolvedRecords {
        resolve_one(fqdn, &self.nameserver, self.timeout).await
    }
}

/// Issue a single A query for `fqdn` against `nameserver`.
///
/// # Errors
///
/// Returns [`ResolveError`] on transport failure, server refusal, or a
/// malformed response.
pub async fn resolve_a(
    fqdn: &str,
    nameserver: &str,
    timeout: Duration,
) -> Result<Vec<Answer>, ResolveError> {
    query(fqdn, nameserver, RecordType::A, timeout).await
}

/// Issue a single AAAA query for `fqdn` against `nameserver`.
///
/// # Errors
///
/// Returns [`ResolveError`] on transport failure, server refusal, or a
/// malformed response.
pub async fn resolve_aaaa(
    fqdn: &str,
    nameserver: &str,
    timeout: Duration,
) -> Result<Vec<Answer>, ResolveError> {
    query(fqdn, nameserver, RecordType::AAAA, timeout).await
}

fn normalize_fqdn(fqdn: &str) -> String {
    if fqdn.ends_with('.') {
        fqdn.to_string()
    } else {
        format!("{fqdn}.")
    }
}

async fn query(
    fqdn: &str,
    nameserver: &str,
    record_type: RecordType,
    timeout: Duration,
) -> Result<Vec<Answer>, ResolveError> {
    let fqdn = fqdn.to_string();
    let nameserver = nameserver.to_string();

    let blocking = tokio::task::spawn_blocking({
        let fqdn = fqdn.clone();
        let nameserver = nameserver.clone();
        move || query_blocking(&fqdn, &nameserver, record_type)
    });

    match tokio::time::timeout(timeout, blocking).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ResolveError::Transport {
            fqdn,
            nameserver,
            reason: format!("query task panicked: {join_err}"),
        }),
        Err(_elapsed) => Err(ResolveError::Transport {
            fqdn,
            nameserver,
            reason: format!("timed out after {}s", timeout.as_secs()),
        }),
    }
}

fn query_blocking(
    fqdn: &str,
    nameserver: &str,
    record_type: RecordType,
) -> Result<Vec<Answer>, ResolveError> {
    let socket_addr = resolve_nameserver_socket_addr(nameserver, fqdn)?;

    let conn = UdpClientConnection::new(socket_addr).map_err(|e| ResolveError::Transport {
        fqdn: fqdn.to_string(),
        nameserver: nameserver.to_string(),
        reason: format!("failed to create UDP connection: {e}"),
    })?;
    let client = SyncClient::new(conn);

    let name = Name::from_str(fqdn).map_err(|e| ResolveError::Malformed {
        fqdn: fqdn.to_string(),
        nameserver: nameserver.to_string(),
        reason: format!("invalid FQDN: {e}"),
    })?;

    let response = client
        .query(&name, DNSClass::IN, record_type)
        .map_err(|e| ResolveError::Transport {
            fqdn: fqdn.to_string(),
            nameserver: nameserver.to_string(),
            reason: e.to_string(),
        })?;

    if response.response_code() == hickory_client::op::ResponseCode::Refused {
        return Err(ResolveError::Refused {
            fqdn: fqdn.to_string(),
            nameserver: nameserver.to_string(),
        });
    }

    response
        .answers()
        .iter()
        .filter(|record| record.record_type() == record_type)
        .map(|record| answer_from_record(record, fqdn, nameserver))
        .collect()
}

fn answer_from_record(
    record: &Record,
    fqdn: &str,
    nameserver: &str,
) -> Result<Answer, ResolveError> {
    let address = match record.data() {
        Some(RData::A(addr)) => addr.to_string().parse::<IpAddr>().ok(),
        Some(RData::AAAA(addr)) => addr.to_string().parse::<IpAddr>().ok(),
        _ => None,
    }
    .ok_or_else(|| ResolveError::Malformed {
        fqdn: fqdn.to_string(),
        nameserver: nameserver.to_string(),
        reason: format!("unexpected or unparseable record data in {record:?}"),
    })?;

    Ok(Answer {
        address,
        ttl: record.ttl(),
    })
}

fn resolve_nameserver_socket_addr(
    nameserver: &str,
    fqdn: &str,
) -> Result<std::net::SocketAddr, ResolveError> {
    if let Ok(ip) = nameserver.parse::<IpAddr>() {
        return Ok(std::net::SocketAddr::new(ip, DNS_PORT));
    }
    nameserver
        .parse::<std::net::SocketAddr>()
        .map_err(|e| ResolveError::Transport {
            fqdn: fqdn.to_string(),
            nameserver: nameserver.to_string(),
            reason: format!("invalid nameserver address: {e}"),
        })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
