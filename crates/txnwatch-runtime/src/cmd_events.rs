//! `txnwatch events` — subscribe to the daemon and print transaction
//! events as JSON lines. Reference consumer for the host event channel.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub async fn cmd_events(socket_path: &str) -> anyhow::Result<()> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "subscribe",
        "params": {},
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    // First line is the subscription ack.
    reader.read_line(&mut line).await?;
    let ack: serde_json::Value = serde_json::from_str(line.trim())?;
    if let Some(error) = ack.get("error") {
        anyhow::bail!("RPC error: {error}");
    }
    eprintln!("subscribed to {}", ack["result"]["subscribed"]);

    loop {
        line.clear();
        tokio::select! {
            read = reader.read_line(&mut line) => {
                if read? == 0 {
                    eprintln!("daemon closed the stream");
                    break;
                }
                println!("{}", line.trim_end());
            }
            _ = tokio::signal::ctrl_c() => { break; }
        }
    }

    Ok(())
}
