//! txnwatch: background SMS bank-transaction monitor.
//! Single-process binary embedding the whole pipeline in-process.

use clap::Parser;

mod cli;
mod client;
mod cmd_classify;
mod cmd_events;
mod cmd_inject;
mod cmd_parse;
mod server;
mod service;
mod surface;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon(opts) => {
            let filter = std::env::var("TXNWATCH_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("txnwatch daemon starting");
            service::run_daemon(opts, &socket_path).await?;
        }
        cli::Command::Status => {
            client::cmd_status(&socket_path).await?;
        }
        cli::Command::Start => {
            client::cmd_start(&socket_path).await?;
        }
        cli::Command::Stop => {
            client::cmd_stop(&socket_path).await?;
        }
        cli::Command::Inject(opts) => {
            cmd_inject::cmd_inject(&socket_path, opts).await?;
        }
        cli::Command::Events => {
            cmd_events::cmd_events(&socket_path).await?;
        }
        cli::Command::Classify(opts) => {
            cmd_classify::cmd_classify(opts)?;
        }
        cli::Command::Parse(opts) => {
            cmd_parse::cmd_parse(opts)?;
        }
    }

    Ok(())
}
