//! UDS JSON-RPC server: minimal hand-rolled implementation.
//! Newline-delimited JSON; one request per connection, except
//! `subscribe`, which turns the connection into the event stream.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::net::unix::OwnedWriteHalf;

use chrono::Utc;

use txnwatch_core::types::TransactionEvent;
use txnwatch_daemon::emitter::{EVENT_CHANNEL, EmitError, EventSubscriber};
use txnwatch_source_sms::delivery::SmsDelivery;

use crate::service::{ServiceState, status_json};

/// Run the UDS JSON-RPC server.
pub async fn run_server(socket_path: &str, state: Arc<ServiceState>) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    state: Arc<ServiceState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: serde_json::Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    let result = match method {
        "status" => status_json(&state),
        "start_monitoring" => match state.lifecycle.start() {
            Ok(()) => serde_json::json!({
                "ok": true,
                "state": state.lifecycle.state().as_str(),
            }),
            Err(e) => {
                // The control surface is fire-and-forget for the host;
                // the failure is logged here and reported as data.
                tracing::error!("start_monitoring failed: {e}");
                serde_json::json!({
                    "ok": false,
                    "error": e.to_string(),
                    "state": state.lifecycle.state().as_str(),
                })
            }
        },
        "stop_monitoring" => {
            state.lifecycle.stop();
            serde_json::json!({
                "ok": true,
                "state": state.lifecycle.state().as_str(),
            })
        }
        "inject_delivery" => {
            let delivery: SmsDelivery =
                serde_json::from_value(request["params"]["delivery"].clone())?;
            // One delivery at a time: processed to completion before the
            // next inject is admitted.
            let _gate = state.delivery_gate.lock().await;
            let now_ms = Utc::now().timestamp_millis();
            let accepted = state.source.inject(&delivery, now_ms);
            serde_json::json!({"accepted": accepted})
        }
        "subscribe" => {
            return handle_subscribe(reader, writer, id, state).await;
        }
        _ => {
            let error_response = serde_json::json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "method not found"},
                "id": id,
            });
            let mut resp = serde_json::to_string(&error_response)?;
            resp.push('\n');
            writer.write_all(resp.as_bytes()).await?;
            return Ok(());
        }
    };

    let response = serde_json::json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    });
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

/// Subscriber bridging the emitter onto one connection's event stream.
struct UdsSubscriber {
    tx: tokio::sync::mpsc::UnboundedSender<TransactionEvent>,
}

impl EventSubscriber for UdsSubscriber {
    fn on_transaction(&self, event: &TransactionEvent) -> Result<(), EmitError> {
        self.tx.send(event.clone()).map_err(|_| EmitError::Closed)
    }
}

/// Turn the connection into the host's event stream. Registering
/// replaces any previous subscriber (latest wins); on disconnect the
/// slot is cleared only if this connection still owns it.
async fn handle_subscribe(
    mut reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    id: serde_json::Value,
    state: Arc<ServiceState>,
) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscriber: Arc<dyn EventSubscriber> = Arc::new(UdsSubscriber { tx });
    state.emitter.register_subscriber(subscriber.clone());
    tracing::info!("event subscriber attached");

    let ack = serde_json::json!({
        "jsonrpc": "2.0",
        "result": {"subscribed": EVENT_CHANNEL},
        "id": id,
    });
    let mut ack_line = serde_json::to_string(&ack)?;
    ack_line.push('\n');
    if let Err(e) = writer.write_all(ack_line.as_bytes()).await {
        state.emitter.clear_subscriber_if(&subscriber);
        return Err(e.into());
    }

    let mut spare = String::new();
    let stream_result: anyhow::Result<()> = loop {
        tokio::select! {
            maybe = rx.recv() => {
                let Some(event) = maybe else { break Ok(()) };
                let mut line = match serde_json::to_string(&event) {
                    Ok(line) => line,
                    Err(e) => break Err(e.into()),
                };
                line.push('\n');
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    break Err(e.into());
                }
            }
            // Subscribers send nothing further; a read completing means
            // EOF (disconnect) or stray input we ignore.
            read = reader.read_line(&mut spare) => {
                match read {
                    Ok(0) | Err(_) => break Ok(()),
                    Ok(_) => spare.clear(),
                }
            }
        }
    };

    if state.emitter.clear_subscriber_if(&subscriber) {
        tracing::info!("event subscriber detached");
    }
    stream_result
}
