//! Command-line interface for mongo-ferry
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Dispatching subcommands to the transfer engine
//! - Printing reports
//!
//! It is the single place where errors are turned into user-facing output.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use mongodb::bson::doc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, LogLevel, WritePolicy};
use crate::connection::{ConnectionManager, sanitize_uri};
use crate::error::{FerryError, Result};
use crate::registry::ClusterRegistry;
use crate::store::{DatabaseStore, MongoConnector, MongoDatabase};
use crate::transfer::{
    ClusterRoute, CollectionExporter, CollectionImporter, DatabaseOrchestrator, DatabaseReport,
    LineStore, Mover, TransferSettings, TransferWindow, UNBOUNDED,
};

pub mod completion;

/// mongo-ferry - batched MongoDB export, import and moves
#[derive(Parser, Debug)]
#[command(
    name = "mongo-ferry",
    version,
    about = "Batched MongoDB collection backup, restore and cross-cluster moves",
    long_about = "Copies MongoDB collections to and from JSON Lines files in fixed-size
batches, and moves collections or whole databases between clusters named in
a YAML registry."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// MongoDB connection URI (overrides MONGODB_URI and the config file)
    #[arg(long, value_name = "URI", global = true)]
    pub uri: Option<String>,

    /// Documents per batch (overrides BATCH_SIZE and the config file)
    #[arg(long, value_name = "N", global = true)]
    pub batch_size: Option<usize>,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (progress and per-collection logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (per-batch debug logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Offset and limit applied to a single-collection transfer
#[derive(Args, Debug, Clone, Copy)]
pub struct WindowArgs {
    /// Number of leading documents or lines to skip
    #[arg(long, value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
    pub offset: i64,

    /// Maximum number of documents to transfer (-1 for no limit)
    #[arg(long, value_name = "N", default_value_t = UNBOUNDED, allow_negative_numbers = true)]
    pub limit: i64,
}

impl WindowArgs {
    pub fn window(&self) -> TransferWindow {
        TransferWindow::from_raw(self.offset, self.limit)
    }
}

/// Flags shared by every transfer command
#[derive(Args, Debug, Clone, Copy)]
pub struct RunArgs {
    /// Report what would happen without reading documents or writing anything
    #[arg(long = "dryrun", visible_alias = "dry-run")]
    pub dry_run: bool,
}

/// Subcommands for mongo-ferry
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export one collection to <path>/<collection>.jsonl
    BackupCollection {
        /// Database name
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Collection name
        #[arg(short = 'c', long, value_name = "NAME")]
        collection: String,

        /// Destination directory
        #[arg(short = 'p', long, value_name = "DIR")]
        path: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        run: RunArgs,

        /// Replace an existing file instead of appending to it
        #[arg(long)]
        overwrite: bool,
    },

    /// Import a JSON Lines file into one collection
    RestoreCollection {
        /// Database name
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Collection name
        #[arg(short = 'c', long, value_name = "NAME")]
        collection: String,

        /// Source file, or a directory holding <collection>.jsonl
        #[arg(short = 'p', long, value_name = "PATH")]
        path: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Export every collection of a database to <path>/<database>/
    BackupDatabase {
        /// Database name
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Destination directory
        #[arg(short = 'p', long, value_name = "DIR")]
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Replace existing files instead of appending to them
        #[arg(long)]
        overwrite: bool,
    },

    /// Import every *.jsonl file of a directory into a database
    RestoreDatabase {
        /// Database name
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Directory holding one <collection>.jsonl per collection
        #[arg(short = 'p', long, value_name = "DIR")]
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Copy a collection to another database on the same cluster
    MoveCollection {
        /// Database name
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Collection name
        #[arg(short = 'c', long, value_name = "NAME")]
        collection: String,

        /// Database receiving the collection
        #[arg(long, value_name = "NAME")]
        destination_database: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Copy a collection between clusters through a JSON Lines file
    MoveCollectionCluster {
        /// Origin cluster alias
        #[arg(long, value_name = "ALIAS")]
        origin_cluster: String,

        /// Destination cluster alias
        #[arg(long, value_name = "ALIAS")]
        destination_cluster: String,

        /// Database name
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Database receiving the collection
        #[arg(long, value_name = "NAME")]
        destination_database: String,

        /// Collection name
        #[arg(short = 'c', long, value_name = "NAME")]
        collection: String,

        /// Directory for the intermediate file
        #[arg(short = 'p', long, value_name = "DIR")]
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Replace an existing intermediate file instead of appending to it
        #[arg(long)]
        overwrite: bool,
    },

    /// Copy a whole database between clusters through JSON Lines files
    MoveDbCluster {
        /// Origin cluster alias
        #[arg(long, value_name = "ALIAS")]
        origin_cluster: String,

        /// Destination cluster alias
        #[arg(long, value_name = "ALIAS")]
        destination_cluster: String,

        /// Database name
        #[arg(short = 'd', long, value_name = "NAME")]
        database: String,

        /// Directory for the intermediate files
        #[arg(short = 'p', long, value_name = "DIR")]
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Replace existing intermediate files instead of appending to them
        #[arg(long)]
        overwrite: bool,
    },

    /// List the cluster aliases of the registry
    Clusters,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,
    },
}

impl Commands {
    /// Whether the command writes files and asked for truncation
    fn overwrite(&self) -> bool {
        match self {
            Commands::BackupCollection { overwrite, .. }
            | Commands::BackupDatabase { overwrite, .. }
            | Commands::MoveCollectionCluster { overwrite, .. }
            | Commands::MoveDbCluster { overwrite, .. } => *overwrite,
            _ => false,
        }
    }
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load the configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load file and environment configuration, then apply CLI overrides
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_logging_args(config, args);
        Self::apply_connection_args(config, args);
        Self::apply_transfer_args(config, args);
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Debug
        } else if args.verbose {
            LogLevel::Info
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply connection-related CLI arguments to configuration
    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.connection.default_uri = uri.clone();
        }
    }

    /// Apply transfer-related CLI arguments to configuration
    fn apply_transfer_args(config: &mut Config, args: &CliArgs) {
        if let Some(batch_size) = args.batch_size {
            config.transfer.batch_size = batch_size;
        }
        if args.command.overwrite() {
            config.transfer.write_policy = WritePolicy::Truncate;
        }
        if args.quiet {
            config.transfer.progress_bar = false;
        }
    }

    /// Transfer settings for this invocation
    pub fn settings(&self, cancel: CancellationToken) -> TransferSettings {
        TransferSettings::from_config(&self.config.transfer).with_cancellation(cancel)
    }

    /// Run the selected subcommand
    ///
    /// Database-level commands print their report and fail if any collection
    /// failed.
    pub async fn execute(&self, cancel: CancellationToken) -> Result<()> {
        let settings = self.settings(cancel);

        match &self.args.command {
            Commands::BackupCollection {
                database,
                collection,
                path,
                window,
                run,
                ..
            } => {
                let db = self.open_database(database).await?;
                let report = CollectionExporter::new(settings)
                    .export(
                        &db.collection(collection),
                        path,
                        window.window(),
                        doc! {},
                        run.dry_run,
                    )
                    .await?;
                println!("{report}");
            }
            Commands::RestoreCollection {
                database,
                collection,
                path,
                window,
                run,
            } => {
                let db = self.open_database(database).await?;
                let file = restore_file(path, collection);
                let report = CollectionImporter::new(settings)
                    .import(&file, &db.collection(collection), window.window(), run.dry_run)
                    .await?;
                println!("{report}");
            }
            Commands::BackupDatabase { database, path, run, .. } => {
                let db = self.open_database(database).await?;
                let report = DatabaseOrchestrator::new(settings)
                    .backup_database(&db, path, run.dry_run)
                    .await?;
                print_database_report(&report)?;
            }
            Commands::RestoreDatabase { database, path, run } => {
                let db = self.open_database(database).await?;
                let report = DatabaseOrchestrator::new(settings)
                    .restore_database(path, &db, run.dry_run)
                    .await?;
                print_database_report(&report)?;
            }
            Commands::MoveCollection {
                database,
                collection,
                destination_database,
                run,
            } => {
                let manager = self.connect().await?;
                let source = MongoDatabase::from_manager(&manager, database)?;
                let destination = MongoDatabase::from_manager(&manager, destination_database)?;
                let report = Mover::new(settings)
                    .move_collection(&source, &destination, collection, run.dry_run)
                    .await?;
                println!("{report}");
            }
            Commands::MoveCollectionCluster {
                origin_cluster,
                destination_cluster,
                database,
                destination_database,
                collection,
                path,
                run,
                ..
            } => {
                let registry = self.registry()?;
                let route = ClusterRoute::new(origin_cluster, destination_cluster, database)
                    .with_destination_database(destination_database);
                let report = Mover::new(settings)
                    .move_collection_cluster(
                        &registry,
                        &self.connector(),
                        &route,
                        collection,
                        path,
                        run.dry_run,
                    )
                    .await?;
                println!("{report}");
            }
            Commands::MoveDbCluster {
                origin_cluster,
                destination_cluster,
                database,
                path,
                run,
                ..
            } => {
                let registry = self.registry()?;
                let route = ClusterRoute::new(origin_cluster, destination_cluster, database);
                let report = Mover::new(settings)
                    .move_database_cluster(&registry, &self.connector(), &route, path, run.dry_run)
                    .await?;
                print!("{report}");
                if report.has_failures() {
                    return Err(FerryError::Generic(
                        "Some collections failed to move".to_string(),
                    ));
                }
            }
            Commands::Clusters => {
                for alias in self.registry()?.aliases() {
                    println!("{alias}");
                }
            }
            Commands::Completion { shell } => {
                completion::generate_completion(shell)?;
            }
            Commands::Config { show } => {
                self.handle_config_command(*show)?;
            }
        }

        Ok(())
    }

    fn connector(&self) -> MongoConnector {
        MongoConnector::new(self.config.connection.clone())
    }

    fn registry(&self) -> Result<ClusterRegistry> {
        ClusterRegistry::load(&self.config.registry.path)
    }

    async fn connect(&self) -> Result<ConnectionManager> {
        let uri = &self.config.connection.default_uri;
        info!("Connecting to {}", sanitize_uri(uri));
        let mut manager = ConnectionManager::new(uri.clone(), self.config.connection.clone());
        manager.connect().await?;
        Ok(manager)
    }

    async fn open_database(&self, name: &str) -> Result<MongoDatabase> {
        let manager = self.connect().await?;
        MongoDatabase::from_manager(&manager, name)
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool) -> Result<()> {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        if show {
            println!();
            println!("=== Effective Configuration ===");
            println!();
            println!("{}", self.config.to_toml()?);
        }
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}

/// Resolve the file a collection restore reads from
///
/// A directory stands for `<dir>/<collection>.jsonl`.
fn restore_file(path: &Path, collection: &str) -> PathBuf {
    if path.is_dir() {
        LineStore::file_path(path, collection)
    } else {
        path.to_path_buf()
    }
}

fn print_database_report(report: &DatabaseReport) -> Result<()> {
    print!("{report}");
    let failed = report.failures().count();
    if failed > 0 {
        return Err(FerryError::Generic(format!(
            "{} of {} collections failed",
            failed,
            report.outcomes.len()
        )));
    }
    Ok(())
}
