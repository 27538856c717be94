//! mongo-ferry
//!
//! Batched MongoDB collection export, import and cross-cluster moves over
//! JSON Lines files.
//!
//! # Usage
//!
//! ```bash
//! # Back up one collection
//! mongo-ferry backup-collection -d shop -c orders -p ./backup
//!
//! # Move a database between clusters named in ~/.config/mongo-ferry/clusters.yml
//! mongo-ferry move-db-cluster --origin-cluster staging --destination-cluster prod -d shop -p ./tmp
//! ```

use mongo_ferry::cli::CliInterface;
use mongo_ferry::error::Result;
use tokio_util::sync::CancellationToken;

/// Application entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Run the subcommand, stopping between batches on Ctrl+C
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);

    let cancel_token = CancellationToken::new();
    let cancel_token_clone = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("Interrupted, stopping after the current batch");
                cancel_token_clone.cancel();
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    });

    let result = cli.execute(cancel_token).await;
    ctrl_c_handle.abort();
    result
}

/// Initialize the tracing subscriber from the effective log level
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
