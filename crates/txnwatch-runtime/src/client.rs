//! UDS JSON-RPC client for CLI subcommands.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub(crate) async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: serde_json::Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// `txnwatch status` — print the daemon's status snapshot.
pub async fn cmd_status(socket_path: &str) -> anyhow::Result<()> {
    let status = rpc_call(socket_path, "status", serde_json::json!({})).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// `txnwatch start` — fire-and-forget start request.
pub async fn cmd_start(socket_path: &str) -> anyhow::Result<()> {
    let result = rpc_call(socket_path, "start_monitoring", serde_json::json!({})).await?;
    println!("{result}");
    Ok(())
}

/// `txnwatch stop` — fire-and-forget stop request.
pub async fn cmd_stop(socket_path: &str) -> anyhow::Result<()> {
    let result = rpc_call(socket_path, "stop_monitoring", serde_json::json!({})).await?;
    println!("{result}");
    Ok(())
}
