// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{routing::get, Router};
use fqdnnetworkpolicies::{
    constants::{
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_RENEW_DEADLINE_SECS,
        DEFAULT_LEASE_RETRY_PERIOD_SECS, ERROR_REQUEUE_DURATION_SECS, KIND_FQDN_NETWORK_POLICY,
        KUBE_CLIENT_BURST, KUBE_CLIENT_QPS, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PATH,
        METRICS_SERVER_PORT, TOKIO_WORKER_THREADS, WEBHOOK_SERVER_BIND_ADDRESS,
        WEBHOOK_SERVER_PORT,
    },
    context::Context,
    crd::FQDNNetworkPolicy,
    errors::ReconcileError,
    metrics,
    reconcilers::fqdnnetworkpolicy::reconcile,
    webhook,
};
use futures::StreamExt;
use kube::{
    runtime::{reflector, watcher, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use kube::runtime::controller::Action;
use kube_lease_manager::{LeaseManager, LeaseManagerBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("fqdnnetworkpolicies-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging with custom format.
///
/// Respects `RUST_LOG` environment variable if set, otherwise defaults to
/// INFO level. Respects `RUST_LOG_FORMAT` environment variable for output
/// format (`json` or `text`).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting FQDNNetworkPolicy operator");
    debug!("Logging initialized with file and line number tracking");
}

/// Initialize the Kubernetes client.
async fn initialize_client() -> Result<Client> {
    debug!("Initializing Kubernetes client");

    let config = kube::Config::infer().await?;

    let qps: f32 = std::env::var("FQDNNP_KUBE_QPS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(KUBE_CLIENT_QPS);
    let burst: u32 = std::env::var("FQDNNP_KUBE_BURST")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(KUBE_CLIENT_BURST);

    let client = Client::try_from(config)?;

    info!(qps = qps, burst = burst, "Kubernetes client initialized");

    Ok(client)
}

/// Initialize a reflector over every `FQDNNetworkPolicy` and wrap it, and
/// the client, in the shared [`Context`].
async fn initialize_shared_context(client: Client) -> Arc<Context> {
    info!("Initializing FQDNNetworkPolicy reflector");

    let api = Api::<FQDNNetworkPolicy>::all(client.clone());
    let (store, writer) = reflector::store();

    tokio::spawn(async move {
        let stream = watcher(api, watcher::Config::default());
        reflector::reflector(writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("FQDNNetworkPolicy reflector stream ended");
    });

    Arc::new(Context::new(client, store))
}

/// Start the Prometheus metrics HTTP server.
fn start_metrics_server() -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = METRICS_SERVER_BIND_ADDRESS,
        port = METRICS_SERVER_PORT,
        path = METRICS_SERVER_PATH,
        "Starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to gather metrics: {e}");
                    String::from("# Error gathering metrics\n")
                }
            }
        }

        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
        let bind_addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{METRICS_SERVER_PORT}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {e}");
        }
    })
}

/// Start the admission webhook HTTP server.
fn start_webhook_server() -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = WEBHOOK_SERVER_BIND_ADDRESS,
        port = WEBHOOK_SERVER_PORT,
        "Starting admission webhook HTTP server"
    );

    tokio::spawn(async move {
        let app = webhook::router();
        let bind_addr = format!("{WEBHOOK_SERVER_BIND_ADDRESS}:{WEBHOOK_SERVER_PORT}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind webhook server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Webhook server listening on http://{bind_addr}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Webhook server error: {e}");
        }
    })
}

/// Leader election configuration.
struct LeaderElectionConfig {
    enabled: bool,
    lease_name: String,
    lease_namespace: String,
    identity: String,
    lease_duration: u64,
    renew_deadline: u64,
    retry_period: u64,
}

/// Load leader election configuration from environment variables.
fn load_leader_election_config() -> LeaderElectionConfig {
    let enabled = std::env::var("FQDNNP_ENABLE_LEADER_ELECTION")
        .unwrap_or_else(|_| "true".to_string())
        .parse::<bool>()
        .unwrap_or(true);

    let lease_name =
        std::env::var("FQDNNP_LEASE_NAME").unwrap_or_else(|_| "fqdnnetworkpolicies-leader".to_string());

    let lease_namespace = std::env::var("FQDNNP_LEASE_NAMESPACE")
        .or_else(|_| std::env::var("POD_NAMESPACE"))
        .unwrap_or_else(|_| "default".to_string());

    let lease_duration = std::env::var("FQDNNP_LEASE_DURATION_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_DURATION_SECS);

    let renew_deadline = std::env::var("FQDNNP_LEASE_RENEW_DEADLINE_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_RENEW_DEADLINE_SECS);

    let retry_period = std::env::var("FQDNNP_LEASE_RETRY_PERIOD_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_RETRY_PERIOD_SECS);

    let identity = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("fqdnnetworkpolicies-{}", rand::random::<u32>()));

    LeaderElectionConfig {
        enabled,
        lease_name,
        lease_namespace,
        identity,
        lease_duration,
        renew_deadline,
        retry_period,
    }
}

/// Watcher configuration that only triggers on semantic changes (spec
/// modifications), ignoring our own status-only updates.
#[inline]
fn semantic_watcher_config() -> Config {
    Config::default().any_semantic()
}

/// Resync every known `FQDNNetworkPolicy` once on startup / on acquiring
/// leadership, the "resync everything on leadership" idiom: list every
/// object and call the reconciler directly on each, the same way the
/// teacher's own drift detection calls `reconcile_clusterbind9provider`/
/// `reconcile_bind9cluster` directly rather than only listing.
async fn perform_startup_drift_detection(client: &Client, context: &Arc<Context>) -> Result<()> {
    info!("Starting drift detection for FQDNNetworkPolicy resources...");
    let api: Api<FQDNNetworkPolicy> = Api::all(client.clone());
    match api.list(&kube::api::ListParams::default()).await {
        Ok(policies) => {
            info!("Found {} FQDNNetworkPolicy resources", policies.items.len());
            for policy in policies.items {
                let namespace = policy.namespace().unwrap_or_default();
                let name = policy.name_any();
                debug!("Triggering reconciliation for FQDNNetworkPolicy: {namespace}/{name}");

                // Drift detection is advisory: errors here are logged and
                // otherwise ignored since the controller's own watch/requeue
                // loop will retry regardless.
                match reconcile(Arc::new(policy), context.clone()).await {
                    Ok(action) => debug!(
                        ?action,
                        "FQDNNetworkPolicy {namespace}/{name} drift-reconciled successfully"
                    ),
                    Err(e) => warn!("Failed to drift-reconcile FQDNNetworkPolicy {namespace}/{name}: {e}"),
                }
            }
        }
        Err(e) => {
            warn!("Failed to list FQDNNetworkPolicy resources: {e}");
        }
    }
    info!("Startup drift detection completed");
    Ok(())
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let client = initialize_client().await?;
    let context = initialize_shared_context(client.clone()).await;

    let _metrics_handle = start_metrics_server();
    let _webhook_handle = start_webhook_server();

    let leader_election_config = load_leader_election_config();

    if leader_election_config.enabled {
        info!(
            lease_name = %leader_election_config.lease_name,
            lease_namespace = %leader_election_config.lease_namespace,
            identity = %leader_election_config.identity,
            lease_duration_secs = leader_election_config.lease_duration,
            renew_deadline_secs = leader_election_config.renew_deadline,
            "Leader election enabled"
        );

        info!("Starting leader election, waiting to acquire leadership...");

        let lease_manager =
            LeaseManagerBuilder::new(client.clone(), &leader_election_config.lease_name)
                .with_namespace(&leader_election_config.lease_namespace)
                .with_identity(&leader_election_config.identity)
                .with_duration(leader_election_config.lease_duration)
                .with_grace(leader_election_config.retry_period)
                .build()
                .await?;

        let (leader_rx, lease_handle) = lease_manager.watch().await;

        let mut rx = leader_rx.clone();
        while !*rx.borrow_and_update() {
            rx.changed().await?;
        }

        info!("Leadership acquired! Starting controller...");
        metrics::record_leader_elected(&leader_election_config.identity);

        if let Err(e) = perform_startup_drift_detection(&client, &context).await {
            warn!("Startup drift detection failed: {e}. Continuing with controller startup.");
        }

        run_with_leader_election(context, leader_rx, lease_handle).await?;
    } else {
        info!("Leader election disabled, starting controller immediately...");

        if let Err(e) = perform_startup_drift_detection(&client, &context).await {
            warn!("Startup drift detection failed: {e}. Continuing with controller startup.");
        }

        run_without_leader_election(context).await?;
    }

    Ok(())
}

/// Monitor leadership status; returns once leadership is lost or an error occurs.
async fn monitor_leadership(mut leader_rx: tokio::sync::watch::Receiver<bool>) -> Result<()> {
    loop {
        leader_rx.changed().await?;
        if !*leader_rx.borrow() {
            return Ok(());
        }
    }
}

/// Run the controller without leader election, with signal handling.
async fn run_without_leader_election(context: Arc<Context>) -> Result<()> {
    warn!("Leader election DISABLED - running without high availability");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }
        result = wait_for_sigterm() => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }
        result = run_controller(context) => {
            result
        }
    }?;

    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Run the controller with leader election monitoring and signal handling.
async fn run_with_leader_election(
    context: Arc<Context>,
    leader_rx: tokio::sync::watch::Receiver<bool>,
    _lease_handle: tokio::task::JoinHandle<
        Result<LeaseManager, kube_lease_manager::LeaseManagerError>,
    >,
) -> Result<()> {
    info!("Running controller with leader election and signal handling");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }
        result = wait_for_sigterm() => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }
        result = monitor_leadership(leader_rx) => {
            match result {
                Ok(()) => {
                    warn!("Leadership lost! Stopping controller...");
                    anyhow::bail!("Leadership lost - stepping down")
                }
                Err(e) => {
                    error!("Leadership monitor error: {e:?}");
                    anyhow::bail!("Leadership monitoring failed: {e}")
                }
            }
        }
        result = run_controller(context) => {
            result
        }
    }?;

    info!("Graceful shutdown completed successfully, leader election lease released");
    Ok(())
}

async fn wait_for_sigterm() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        sigterm.recv().await;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Run the `FQDNNetworkPolicy` controller.
///
/// `kube::runtime::Controller` provides at-most-one-in-flight-per-key
/// scheduling for free; the TTL-driven `Action::requeue` the reconciler
/// returns is what actually drives periodic re-resolution, not this watch.
async fn run_controller(context: Arc<Context>) -> Result<()> {
    info!("Starting FQDNNetworkPolicy controller");

    let api = Api::<FQDNNetworkPolicy>::all(context.client.clone());

    Controller::new(api, semantic_watcher_config())
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((object_ref, action)) => {
                    debug!(?object_ref, ?action, "reconciled");
                }
                Err(e) => {
                    error!("reconcile failed: {e}");
                }
            }
        })
        .await;

    anyhow::bail!("FQDNNetworkPolicy controller exited unexpectedly")
}

/// Error policy: requeue after [`ERROR_REQUEUE_DURATION_SECS`] on any error
/// the reconciler didn't already turn into a fixed-interval requeue itself
/// (i.e. everything except `OwnershipConflict`, which `reconcile` handles
/// internally and never returns as `Err`).
fn error_policy(resource: Arc<FQDNNetworkPolicy>, err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    error!(
        error = %err,
        resource = %resource.name_any(),
        "Reconciliation error for {} - will retry in {}s",
        KIND_FQDN_NETWORK_POLICY,
        ERROR_REQUEUE_DURATION_SECS
    );
    metrics::record_error(KIND_FQDN_NETWORK_POLICY, "reconcile_error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
