//! `txnwatch parse` — extract structured transaction detail from a
//! message body. Consumer-side tooling; the daemon pipeline never
//! depends on parse success.

use txnwatch_core::parse::parse_detail;

use crate::cli::ParseOpts;

pub fn cmd_parse(opts: ParseOpts) -> anyhow::Result<()> {
    let detail = parse_detail(&opts.body)?;
    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}
