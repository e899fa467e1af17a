//! `txnwatch inject` — feed a raw SMS delivery to the running daemon.

use std::io::Read;

use txnwatch_source_sms::delivery::{SmsDelivery, SmsFragment};

use crate::cli::InjectOpts;
use crate::client::rpc_call;

pub async fn cmd_inject(socket_path: &str, opts: InjectOpts) -> anyhow::Result<()> {
    let delivery = if opts.stdin {
        let mut json = String::new();
        std::io::stdin().read_to_string(&mut json)?;
        serde_json::from_str(&json)?
    } else {
        build_delivery(&opts)
    };

    let result = rpc_call(
        socket_path,
        "inject_delivery",
        serde_json::json!({"delivery": delivery}),
    )
    .await?;
    println!("{result}");
    Ok(())
}

/// One single-fragment delivery from the flag values.
fn build_delivery(opts: &InjectOpts) -> SmsDelivery {
    SmsDelivery {
        fragments: vec![SmsFragment {
            sender: opts.sender.clone(),
            body: opts.body.clone(),
            received_at_ms: opts.timestamp_ms,
        }],
        format: opts.format.clone(),
    }
}
