//! Daemon wiring: builds the pipeline, runs it until a shutdown signal.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use txnwatch_core::classify::{Classifier, ClassifierRules};
use txnwatch_daemon::dispatch::{AlertDispatcher, AlertSurface};
use txnwatch_daemon::emitter::EventEmitter;
use txnwatch_daemon::lifecycle::{LifecycleManager, PresenceClaim};
use txnwatch_daemon::watcher::MessageWatcher;
use txnwatch_source_sms::source::{DeliveryHandler, InjectSource, MessageSource};

use crate::cli::{DaemonOpts, default_spool_path};
use crate::server;
use crate::surface::{ForegroundPresence, SpoolAlertSurface};

/// Shared daemon state handed to the UDS server.
pub struct ServiceState {
    pub source: Arc<InjectSource>,
    pub emitter: Arc<EventEmitter>,
    pub lifecycle: Arc<LifecycleManager>,
    /// Serializes inject paths across connections: one delivery is
    /// processed to completion before the next is accepted.
    pub delivery_gate: tokio::sync::Mutex<()>,
    pub started_at: DateTime<Utc>,
}

/// Assemble the pipeline around a classifier and an alert surface.
pub fn build_state(rules: ClassifierRules, surface: Arc<dyn AlertSurface>) -> Arc<ServiceState> {
    let source = Arc::new(InjectSource::new());
    let emitter = Arc::new(EventEmitter::new());
    let dispatcher = Arc::new(AlertDispatcher::new(surface.clone()));
    let watcher = Arc::new(MessageWatcher::new(
        Classifier::new(rules),
        emitter.clone(),
        dispatcher,
    ));
    let presence = Arc::new(ForegroundPresence::new(surface));
    let lifecycle = Arc::new(LifecycleManager::new(
        source.clone() as Arc<dyn MessageSource>,
        presence as Arc<dyn PresenceClaim>,
        watcher as Arc<dyn DeliveryHandler>,
    ));

    Arc::new(ServiceState {
        source,
        emitter,
        lifecycle,
        delivery_gate: tokio::sync::Mutex::new(()),
        started_at: Utc::now(),
    })
}

/// Load classifier rules from a JSON file, or fall back to the defaults.
pub fn load_rules(path: Option<&Path>) -> anyhow::Result<ClassifierRules> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("cannot read rules file {}: {e}", path.display()))?;
            Ok(ClassifierRules::from_json_str(&json)?)
        }
        None => Ok(ClassifierRules::default()),
    }
}

/// Status snapshot served over RPC.
pub fn status_json(state: &ServiceState) -> serde_json::Value {
    serde_json::json!({
        "state": state.lifecycle.state().as_str(),
        "registered": state.source.is_registered(),
        "subscriber": state.emitter.has_subscriber(),
        "restart_on_exit": state.lifecycle.restart_policy().restart_on_exit,
        "started_at": state.started_at.to_rfc3339(),
        "pid": std::process::id(),
    })
}

/// Run the daemon: wire the pipeline, start monitoring, serve the UDS
/// API, and wait for a shutdown signal.
pub async fn run_daemon(opts: DaemonOpts, socket_path: &str) -> anyhow::Result<()> {
    let rules = load_rules(opts.rules.as_deref())?;
    let spool_path = opts.spool_path.unwrap_or_else(default_spool_path);
    tracing::info!(spool = %spool_path.display(), "alert spool");
    let surface = Arc::new(SpoolAlertSurface::new(spool_path));
    let state = build_state(rules, surface as Arc<dyn AlertSurface>);

    if opts.no_auto_start {
        tracing::info!("monitoring not started, waiting for start_monitoring");
    } else if let Err(e) = state.lifecycle.start() {
        // The host can retry over RPC once the transport recovers.
        tracing::error!("monitoring failed to start: {e}");
    }

    let server_state = Arc::clone(&state);
    let server_socket = socket_path.to_string();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, server_state).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = shutdown => {}
        _ = server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    state.lifecycle.stop();
    let _ = std::fs::remove_file(socket_path);

    Ok(())
}
