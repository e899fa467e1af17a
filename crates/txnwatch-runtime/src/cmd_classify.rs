//! `txnwatch classify` — run the classifier on one sender/body pair
//! without a daemon.

use txnwatch_core::classify::Classifier;

use crate::cli::ClassifyOpts;
use crate::service::load_rules;

pub fn cmd_classify(opts: ClassifyOpts) -> anyhow::Result<()> {
    let rules = load_rules(opts.rules.as_deref())?;
    let classifier = Classifier::new(rules);
    let verdict = classifier.classify(Some(&opts.sender), Some(&opts.body));
    println!(
        "{}",
        serde_json::json!({"is_transaction": verdict.is_transaction})
    );
    Ok(())
}
